// Copyright 2025 Srcx Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use srcx::driver::{run, RunOptions};
use srcx::front::raw::RawFrontend;

#[derive(Parser, Debug)]
#[command(
    name = "sx-gen",
    about = "Indexes and generates browsable hypertext for your source code."
)]
struct Args {
    /// Directory where to output all generated indexes. The tag names the files.
    #[arg(long = "index")]
    index: PathBuf,

    /// Directory containing the compile_commands.json build manifest.
    #[arg(long = "jsondb")]
    jsondb: PathBuf,

    /// Directory to walk for non-compilable files. Defaults to the jsondb directory.
    #[arg(long = "scandir")]
    scandir: Option<PathBuf>,

    /// Path to strip from generated filenames. Defaults to the working directory.
    #[arg(short = 'c', value_name = "directory")]
    strip_prefix: Option<String>,

    /// Tag to use when naming the symbols / tree artifacts.
    #[arg(short = 't', value_name = "tag", default_value = "output")]
    tag: String,

    /// Regex describing which files to parse from the compilation database.
    #[arg(short = 'l', value_name = "regex")]
    filter: Option<String>,

    /// Regex describing which files to EXCLUDE from the directory scan.
    #[arg(short = 'x', value_name = "regex")]
    exclude: Option<String>,

    /// Project name, used in titles of generated pages.
    #[arg(short = 'p', value_name = "name")]
    project: Option<String>,

    /// Limit the number of translation units processed.
    #[arg(long, default_value_t = 0)]
    limit: usize,

    /// Maximum number of characters captured in a snippet before or after
    /// the relevant text.
    #[arg(long = "snippet-limit", default_value_t = 60)]
    snippet_limit: usize,

    /// Provide debug output.
    #[arg(long)]
    verbose: bool,
}

fn build_options(args: &Args) -> Result<RunOptions> {
    let file_filter = args
        .filter
        .as_deref()
        .map(regex::Regex::new)
        .transpose()
        .context("invalid -l regex")?;
    let scan_exclude = args
        .exclude
        .as_deref()
        .map(regex::Regex::new)
        .transpose()
        .context("invalid -x regex")?;

    let project = match &args.project {
        Some(name) => name.clone(),
        None => std::env::current_dir()
            .ok()
            .and_then(|cwd| cwd.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_default(),
    };

    Ok(RunOptions {
        index_dir: args.index.clone(),
        jsondb: args.jsondb.clone(),
        scandir: args.scandir.clone(),
        strip_prefix: args.strip_prefix.clone(),
        tag: args.tag.clone(),
        file_filter,
        scan_exclude,
        project,
        limit: args.limit,
        snippet_limit: args.snippet_limit,
    })
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let env = env_logger::Env::default().filter_or("RUST_LOG", default_level);
    env_logger::Builder::from_env(env).init();

    let options = match build_options(&args) {
        Ok(options) => options,
        Err(err) => {
            log::error!("{:#}", err);
            std::process::exit(1);
        }
    };

    let mut frontend = RawFrontend;
    match run(&options, &mut frontend) {
        Ok(stats) => {
            log::info!(
                "done: {} units, {} files, {} indexed symbols",
                stats.units,
                stats.files,
                stats.symbols
            );
        }
        Err(err) => {
            log::error!("{:#}", err);
            std::process::exit(2);
        }
    }
}
