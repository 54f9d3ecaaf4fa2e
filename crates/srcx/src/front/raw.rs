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

//! Lexical-only front-end.
//!
//! Reads each compile command's input file and exposes raw tokens for
//! highlighting, with empty preprocessor and AST streams. Semantic
//! front-ends replace this through the [`Frontend`] trait.

use anyhow::Context;

use crate::compiledb::CompileCommand;
use crate::front::{
    AstNode, Frontend, Loc, PpEvent, RawToken, ResolvedLoc, SourceMap, TranslationUnit,
    UnitFileId,
};
use crate::lex;

pub struct RawFrontend;

struct RawUnit {
    path: String,
    contents: Vec<u8>,
}

impl Frontend for RawFrontend {
    fn parse(&mut self, command: &CompileCommand) -> anyhow::Result<Box<dyn TranslationUnit>> {
        let path = std::fs::canonicalize(&command.file)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| command.file.clone());
        let contents = std::fs::read(&command.file)
            .with_context(|| format!("read translation unit {}", command.file))?;
        Ok(Box::new(RawUnit { path, contents }))
    }
}

impl TranslationUnit for RawUnit {
    fn source_map(&self) -> &dyn SourceMap {
        self
    }

    fn pp_events(&self) -> &[PpEvent] {
        &[]
    }

    fn ast(&self) -> &[AstNode] {
        &[]
    }

    fn files(&self) -> Vec<UnitFileId> {
        vec![UnitFileId(0)]
    }

    fn raw_tokens(&self, _file: UnitFileId) -> Vec<RawToken> {
        lex::raw_tokens(&self.contents)
    }
}

impl SourceMap for RawUnit {
    fn spelling(&self, _loc: Loc) -> Option<ResolvedLoc> {
        None
    }

    fn expansion(&self, _loc: Loc) -> Option<ResolvedLoc> {
        None
    }

    fn is_macro(&self, _loc: Loc) -> bool {
        false
    }

    fn file_path(&self, file: UnitFileId) -> Option<&str> {
        (file == UnitFileId(0)).then_some(self.path.as_str())
    }

    fn contents(&self, _file: UnitFileId) -> &[u8] {
        &self.contents
    }

    fn token_length(&self, _loc: Loc) -> u32 {
        0
    }
}
