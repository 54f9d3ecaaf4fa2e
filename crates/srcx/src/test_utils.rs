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

//! Scripted front-end for tests: in-memory files, hand-placed locations,
//! hand-written preprocessor event streams and AST trees.

use crate::compiledb::CompileCommand;
use crate::front::{
    AstNode, Frontend, Loc, PpEvent, RawToken, ResolvedLoc, SourceMap, TranslationUnit,
    UnitFileId,
};
use crate::lex;

struct ScriptedFile {
    path: Option<String>,
    contents: Vec<u8>,
}

#[derive(Clone, Copy)]
struct LocInfo {
    spelling: (UnitFileId, u32),
    expansion: (UnitFileId, u32),
    is_macro: bool,
    token_len: u32,
}

#[derive(Default)]
pub struct ScriptedUnit {
    files: Vec<ScriptedFile>,
    locs: Vec<LocInfo>,
    pub events: Vec<PpEvent>,
    pub roots: Vec<AstNode>,
}

impl ScriptedUnit {
    pub fn new() -> Self {
        ScriptedUnit::default()
    }

    pub fn add_file(&mut self, path: &str, contents: &str) -> UnitFileId {
        self.files.push(ScriptedFile {
            path: Some(path.to_string()),
            contents: contents.as_bytes().to_vec(),
        });
        UnitFileId(self.files.len() as u32 - 1)
    }

    /// A buffer with no backing file, like the predefined-macro buffer.
    pub fn add_buffer(&mut self, contents: &str) -> UnitFileId {
        self.files.push(ScriptedFile {
            path: None,
            contents: contents.as_bytes().to_vec(),
        });
        UnitFileId(self.files.len() as u32 - 1)
    }

    /// Location at `offset`; the token length is the identifier starting
    /// there, or one byte.
    pub fn loc(&mut self, file: UnitFileId, offset: u32) -> Loc {
        let len = self.ident_len(file, offset);
        self.push_loc(LocInfo {
            spelling: (file, offset),
            expansion: (file, offset),
            is_macro: false,
            token_len: len,
        })
    }

    pub fn loc_len(&mut self, file: UnitFileId, offset: u32, token_len: u32) -> Loc {
        self.push_loc(LocInfo {
            spelling: (file, offset),
            expansion: (file, offset),
            is_macro: false,
            token_len,
        })
    }

    /// A location spelled inside a macro body: spelling and expansion
    /// resolve differently, and `is_macro` is set.
    pub fn macro_loc(
        &mut self,
        spelling: (UnitFileId, u32),
        expansion: (UnitFileId, u32),
    ) -> Loc {
        let len = self.ident_len(spelling.0, spelling.1);
        self.push_loc(LocInfo {
            spelling,
            expansion,
            is_macro: true,
            token_len: len,
        })
    }

    /// Byte offset of the nth occurrence (0-based) of `needle`.
    pub fn find(&self, file: UnitFileId, needle: &str, occurrence: usize) -> u32 {
        let hay = &self.files[file.0 as usize].contents;
        let needle = needle.as_bytes();
        let mut from = 0usize;
        let mut seen = 0usize;
        while from + needle.len() <= hay.len() {
            if &hay[from..from + needle.len()] == needle {
                if seen == occurrence {
                    return from as u32;
                }
                seen += 1;
                from += needle.len();
            } else {
                from += 1;
            }
        }
        panic!("needle {:?} occurrence {} not found", needle, occurrence);
    }

    /// Range covering a single token at `offset`.
    pub fn token_range(&mut self, file: UnitFileId, offset: u32) -> crate::front::SourceRange {
        let loc = self.loc(file, offset);
        crate::front::SourceRange::at(loc)
    }

    /// Range from the token at `begin` to the token starting at `end`.
    pub fn range(
        &mut self,
        file: UnitFileId,
        begin: u32,
        end: u32,
    ) -> crate::front::SourceRange {
        let begin = self.loc(file, begin);
        let end = self.loc(file, end);
        crate::front::SourceRange::new(begin, end)
    }

    fn push_loc(&mut self, info: LocInfo) -> Loc {
        // Slot zero stays reserved for the invalid location.
        if self.locs.is_empty() {
            self.locs.push(LocInfo {
                spelling: (UnitFileId(0), 0),
                expansion: (UnitFileId(0), 0),
                is_macro: false,
                token_len: 0,
            });
        }
        self.locs.push(info);
        Loc(self.locs.len() as u32 - 1)
    }

    fn ident_len(&self, file: UnitFileId, offset: u32) -> u32 {
        let data = &self.files[file.0 as usize].contents;
        let mut end = offset as usize;
        while end < data.len()
            && (data[end].is_ascii_alphanumeric() || data[end] == b'_' || data[end] == b'$')
        {
            end += 1;
        }
        (end as u32 - offset).max(1)
    }

    fn resolve(&self, loc: Loc, spelling: bool) -> Option<ResolvedLoc> {
        if !loc.is_valid() {
            return None;
        }
        let info = self.locs.get(loc.0 as usize)?;
        let (file, offset) = if spelling { info.spelling } else { info.expansion };
        let contents = &self.files.get(file.0 as usize)?.contents;
        let mut line = 1u32;
        let mut column = 1u32;
        for &b in contents.iter().take(offset as usize) {
            if b == b'\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        Some(ResolvedLoc {
            file,
            offset,
            line,
            column,
        })
    }
}

impl SourceMap for ScriptedUnit {
    fn spelling(&self, loc: Loc) -> Option<ResolvedLoc> {
        self.resolve(loc, true)
    }

    fn expansion(&self, loc: Loc) -> Option<ResolvedLoc> {
        self.resolve(loc, false)
    }

    fn is_macro(&self, loc: Loc) -> bool {
        self.locs
            .get(loc.0 as usize)
            .map(|info| info.is_macro)
            .unwrap_or(false)
    }

    fn file_path(&self, file: UnitFileId) -> Option<&str> {
        self.files.get(file.0 as usize)?.path.as_deref()
    }

    fn contents(&self, file: UnitFileId) -> &[u8] {
        &self.files[file.0 as usize].contents
    }

    fn token_length(&self, loc: Loc) -> u32 {
        self.locs
            .get(loc.0 as usize)
            .map(|info| info.token_len)
            .unwrap_or(0)
    }
}

impl TranslationUnit for ScriptedUnit {
    fn source_map(&self) -> &dyn SourceMap {
        self
    }

    fn pp_events(&self) -> &[PpEvent] {
        &self.events
    }

    fn ast(&self) -> &[AstNode] {
        &self.roots
    }

    fn files(&self) -> Vec<UnitFileId> {
        (0..self.files.len() as u32)
            .map(UnitFileId)
            .filter(|file| self.files[file.0 as usize].path.is_some())
            .collect()
    }

    fn raw_tokens(&self, file: UnitFileId) -> Vec<RawToken> {
        lex::raw_tokens(&self.files[file.0 as usize].contents)
    }
}

/// Frontend handing out pre-built units, one per compile command.
#[derive(Default)]
pub struct ScriptedFrontend {
    pub units: Vec<ScriptedUnit>,
}

impl Frontend for ScriptedFrontend {
    fn parse(&mut self, _command: &CompileCommand) -> anyhow::Result<Box<dyn TranslationUnit>> {
        anyhow::ensure!(!self.units.is_empty(), "no scripted units left");
        Ok(Box::new(self.units.remove(0)))
    }
}
