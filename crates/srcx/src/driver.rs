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

//! The driver: iterate compile commands, feed each translation unit
//! through the annotation engine, then serialise the index and walk the
//! tree. One run is a full rebuild.

use std::path::PathBuf;

use anyhow::{Context, Result};
use regex::Regex;

use crate::annotate::Annotator;
use crate::compiledb;
use crate::counters::Counters;
use crate::front::Frontend;
use crate::index;
use crate::registry::FileRegistry;
use crate::render;
use crate::xref::XrefIndex;

pub struct RunOptions {
    /// Where the index artifacts go.
    pub index_dir: PathBuf,
    /// Directory holding `compile_commands.json`.
    pub jsondb: PathBuf,
    /// Directory walked for non-compiled files; defaults to `jsondb`.
    pub scandir: Option<PathBuf>,
    /// Prefix stripped from user-visible paths; defaults to the cwd.
    pub strip_prefix: Option<String>,
    /// Identifier embedded in artifact names.
    pub tag: String,
    /// Only parse compile commands whose input matches.
    pub file_filter: Option<Regex>,
    /// Exclude matching paths from the directory scan.
    pub scan_exclude: Option<Regex>,
    /// Project name shown in navbar headers.
    pub project: String,
    /// Stop after this many translation units; zero means no limit.
    pub limit: usize,
    pub snippet_limit: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            index_dir: PathBuf::new(),
            jsondb: PathBuf::new(),
            scandir: None,
            strip_prefix: None,
            tag: "output".to_string(),
            file_filter: None,
            scan_exclude: None,
            project: String::new(),
            limit: 0,
            snippet_limit: 60,
        }
    }
}

#[derive(Debug, Default)]
pub struct RunStats {
    pub units: usize,
    pub files: usize,
    pub symbols: usize,
}

/// Working-directory change undone on every exit path.
pub struct ScopedCwd {
    previous: PathBuf,
}

impl ScopedCwd {
    pub fn change(dir: &str) -> std::io::Result<Self> {
        let previous = std::env::current_dir()?;
        std::env::set_current_dir(dir)?;
        Ok(ScopedCwd { previous })
    }
}

impl Drop for ScopedCwd {
    fn drop(&mut self) {
        if let Err(err) = std::env::set_current_dir(&self.previous) {
            log::warn!("could not restore working directory: {}", err);
        }
    }
}

pub fn run(options: &RunOptions, frontend: &mut dyn Frontend) -> Result<RunStats> {
    let commands = compiledb::load(&options.jsondb)?;
    let mut to_parse = compiledb::filter(commands, options.file_filter.as_ref());
    if options.limit > 0 && to_parse.len() > options.limit {
        to_parse.truncate(options.limit);
    }
    log::info!("{} translation units to parse", to_parse.len());

    let cwd = std::env::current_dir().context("get working directory")?;
    let strip = options
        .strip_prefix
        .clone()
        .unwrap_or_else(|| cwd.to_string_lossy().into_owned());

    let mut registry = FileRegistry::new(&strip);
    let mut xref = XrefIndex::new();
    let mut counters = Counters::new();

    let total = to_parse.len();
    for (parsed, command) in to_parse.iter().enumerate() {
        log::info!("{} parsing {}", total - parsed, command.file);

        // Input errors abort the run; only range/encoding/oversize records
        // are skipped.
        let _cwd = ScopedCwd::change(&command.directory)
            .with_context(|| format!("enter build directory {}", command.directory))?;
        let unit = frontend
            .parse(command)
            .with_context(|| format!("parse translation unit {}", command.file))?;

        {
            let mut annotator = Annotator::new(
                &mut registry,
                &mut xref,
                &mut counters,
                options.snippet_limit,
            );
            annotator.run(&*unit);
        }

        let sm = unit.source_map();
        for file in unit.files() {
            let tokens = unit.raw_tokens(file);
            render::render_unit_file(&mut registry, sm, file, &tokens);
        }
    }

    log::info!(">>> generating index");
    index::write_binary_index(&options.index_dir, &options.tag, &xref, &registry, &counters)?;
    let symbols = xref.len();

    log::info!(">>> embedding files");
    let scandir = options.scandir.clone().unwrap_or_else(|| options.jsondb.clone());
    let scandir = std::fs::canonicalize(&scandir).unwrap_or(scandir);
    render::scan_tree(
        &mut registry,
        &mut counters,
        &scandir,
        options.scan_exclude.as_ref(),
    )?;
    render::output_tree(&mut registry, &mut counters, &options.project, &options.tag)?;
    render::output_json_tree(&registry, &options.index_dir, &options.tag)?;
    render::write_entry_symlink(&mut registry, &scandir.to_string_lossy())?;

    counters.log_summary();
    xref.clear();

    Ok(RunStats {
        units: total,
        files: registry.file_count(),
        symbols,
    })
}
