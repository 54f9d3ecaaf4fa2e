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

//! Skip-and-continue accounting. Every tolerated error (bad range, dropped
//! tag, unreadable file) bumps a named counter; the set is serialised next
//! to the index so a regression in one run is visible in the next.
//!
//! Counters are an explicit context object threaded through the run rather
//! than process globals.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

#[derive(Default)]
pub struct Counters {
    order: Vec<&'static str>,
    values: HashMap<&'static str, (u64, &'static str)>,
}

impl Counters {
    pub fn new() -> Self {
        Counters::default()
    }

    /// Bump `name`, registering it with `description` on first use.
    /// Returns the new value.
    pub fn bump(&mut self, name: &'static str, description: &'static str) -> u64 {
        self.add(name, description, 1)
    }

    pub fn add(&mut self, name: &'static str, description: &'static str, count: u64) -> u64 {
        if !self.values.contains_key(name) {
            self.order.push(name);
        }
        let entry = self.values.entry(name).or_insert((0, description));
        entry.0 += count;
        entry.0
    }

    pub fn value(&self, name: &str) -> u64 {
        self.values.get(name).map(|v| v.0).unwrap_or(0)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut data = serde_json::Map::new();
        for name in &self.order {
            let (value, description) = self.values[name];
            data.insert(
                name.to_string(),
                serde_json::json!({ "value": value, "description": description }),
            );
        }
        serde_json::Value::Object(data)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("create counters file {}", path.display()))?;
        serde_json::to_writer_pretty(file, &self.to_json())?;
        Ok(())
    }

    /// One short line per non-zero counter, for operator feedback.
    pub fn log_summary(&self) {
        for name in &self.order {
            let (value, _) = self.values[name];
            if value > 0 {
                log::info!("counter {}: {}", name, value);
            }
        }
    }
}
