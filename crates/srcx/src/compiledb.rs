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

//! Build-command manifest loader (`compile_commands.json`).

use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CompileCommand {
    pub directory: String,
    pub file: String,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub arguments: Option<Vec<String>>,
    #[serde(default)]
    pub output: Option<String>,
}

impl CompileCommand {
    /// Argument vector of the compiler invocation. `arguments` wins when
    /// present; `command` is whitespace-split.
    pub fn argv(&self) -> Vec<String> {
        if let Some(arguments) = &self.arguments {
            return arguments.clone();
        }
        self.command
            .as_deref()
            .unwrap_or("")
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

/// Load the manifest from `dir/compile_commands.json`. A missing or
/// malformed manifest is an input error: the run aborts.
pub fn load(dir: &Path) -> Result<Vec<CompileCommand>> {
    let path = dir.join("compile_commands.json");
    let data = std::fs::read(&path)
        .with_context(|| format!("read build manifest {}", path.display()))?;
    let commands: Vec<CompileCommand> = serde_json::from_slice(&data)
        .with_context(|| format!("parse build manifest {}", path.display()))?;
    log::info!("{} compile commands in {}", commands.len(), path.display());
    Ok(commands)
}

/// Keep only the commands whose input path matches `filter`.
pub fn filter(commands: Vec<CompileCommand>, filter: Option<&Regex>) -> Vec<CompileCommand> {
    match filter {
        None => commands,
        Some(filter) => commands
            .into_iter()
            .filter(|command| filter.is_match(&command.file))
            .collect(),
    }
}
