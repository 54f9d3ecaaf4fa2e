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

//! Memory-mapped view over the on-disk index: hash-keyed binary search and
//! row decoding. The browser UI loads through this; the round-trip tests
//! lean on it too.

use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use memmap2::Mmap;

use crate::strpool::fnv64;

use super::{
    artifact_name, FILE_DETAIL_HEADER, HASH_DETAIL, SYMBOL_DETAIL_HEADER, SYMBOL_DETAIL_KIND,
    SYMBOL_DETAIL_PROVIDER, SYMBOL_NAME_HEADER,
};

pub struct IndexReader {
    files: Mmap,
    symbol_details: Mmap,
    details: Mmap,
    hash_details: Mmap,
    snippets: Mmap,
    strings: Mmap,
}

#[derive(Debug, Clone)]
pub struct SymbolView {
    pub name: String,
    pub hash: u64,
    pub detail_offset: u32,
    pub kinds: Vec<KindView>,
}

#[derive(Debug, Clone)]
pub struct KindView {
    pub kind: String,
    pub linkage: u8,
    pub access: u8,
    pub defs: Vec<ProviderView>,
    pub decls: Vec<ProviderView>,
}

#[derive(Debug, Clone)]
pub struct ProviderView {
    pub file_hash: u64,
    pub file_path: String,
    pub begin: u64,
    pub end: u64,
    pub snippet: String,
}

impl IndexReader {
    pub fn open(dir: &Path, tag: &str) -> Result<Self> {
        let map = |suffix: &str| -> Result<Mmap> {
            let path = dir.join(artifact_name(tag, suffix));
            let file =
                File::open(&path).with_context(|| format!("open index artifact {}", path.display()))?;
            // Safety: artifacts are written once and not mutated afterwards.
            unsafe { Mmap::map(&file) }.with_context(|| format!("map {}", path.display()))
        };
        Ok(IndexReader {
            files: map("files")?,
            symbol_details: map("symbol-details")?,
            details: map("details")?,
            hash_details: map("hash-details")?,
            snippets: map("snippets")?,
            strings: map("strings")?,
        })
    }

    pub fn row_count(&self) -> usize {
        self.hash_details.len() / HASH_DETAIL
    }

    /// Binary search by name hash, then verify the name itself: equal
    /// hashes of distinct names sit adjacent and are disambiguated here.
    pub fn lookup(&self, name: &str) -> Result<Option<SymbolView>> {
        let target = fnv64(name.as_bytes());
        let rows = self.row_count();

        let mut lo = 0usize;
        let mut hi = rows;
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.hash_at(mid)? < target {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        let mut row = lo;
        while row < rows && self.hash_at(row)? == target {
            let detail_offset = read_u32(&self.hash_details, row * HASH_DETAIL + 8)?;
            let symbol = self.symbol_at(detail_offset)?;
            if symbol.name == name {
                return Ok(Some(symbol));
            }
            row += 1;
        }
        Ok(None)
    }

    /// Decode the symbol block at `detail_offset` in the details artifact.
    pub fn symbol_at(&self, detail_offset: u32) -> Result<SymbolView> {
        let mut at = detail_offset as usize;
        let name_offset = read_u32(&self.details, at)?;
        let hash = read_u64(&self.details, at + 4)?;
        let kind_count = read_u16(&self.details, at + 12)?;
        at += SYMBOL_DETAIL_HEADER;

        let name = self.name_at(name_offset)?;

        let mut kinds = Vec::with_capacity(kind_count as usize);
        for _ in 0..kind_count {
            let kind_offset = read_u32(&self.details, at)?;
            let linkage = read_u8(&self.details, at + 4)?;
            let access = read_u8(&self.details, at + 5)?;
            let def_count = read_u16(&self.details, at + 6)?;
            let decl_count = read_u16(&self.details, at + 8)?;
            at += SYMBOL_DETAIL_KIND;

            let mut defs = Vec::with_capacity(def_count as usize);
            for _ in 0..def_count {
                defs.push(self.provider_at(&mut at)?);
            }
            let mut decls = Vec::with_capacity(decl_count as usize);
            for _ in 0..decl_count {
                decls.push(self.provider_at(&mut at)?);
            }

            kinds.push(KindView {
                kind: pool_string(&self.strings, kind_offset)
                    .context("kind offset out of range in strings artifact")?,
                linkage,
                access,
                defs,
                decls,
            });
        }

        Ok(SymbolView {
            name,
            hash,
            detail_offset,
            kinds,
        })
    }

    /// Sequential decode of the symbol-details table, in stored order.
    pub fn symbols(&self) -> Result<Vec<(String, u32)>> {
        let mut out = Vec::new();
        let mut at = 0usize;
        while at < self.symbol_details.len() {
            let detail_offset = read_u32(&self.symbol_details, at)?;
            let len = read_u16(&self.symbol_details, at + 4)? as usize;
            let bytes = slice(&self.symbol_details, at + SYMBOL_NAME_HEADER, len)?;
            out.push((String::from_utf8_lossy(bytes).into_owned(), detail_offset));
            at += SYMBOL_NAME_HEADER + len;
        }
        Ok(out)
    }

    /// All `(path-hash, user path)` rows of the file table.
    pub fn files(&self) -> Result<Vec<(u64, String)>> {
        let mut out = Vec::new();
        let mut at = 0usize;
        while at < self.files.len() {
            let hash = read_u64(&self.files, at)?;
            let len = read_u16(&self.files, at + 8)? as usize;
            let bytes = slice(&self.files, at + FILE_DETAIL_HEADER, len)?;
            out.push((hash, String::from_utf8_lossy(bytes).into_owned()));
            at += FILE_DETAIL_HEADER + len;
        }
        Ok(out)
    }

    pub fn hash_at(&self, row: usize) -> Result<u64> {
        read_u64(&self.hash_details, row * HASH_DETAIL)
    }

    pub fn detail_offset_at(&self, row: usize) -> Result<u32> {
        read_u32(&self.hash_details, row * HASH_DETAIL + 8)
    }

    pub fn file_path_at(&self, offset: u32) -> Result<String> {
        let at = offset as usize;
        let len = read_u16(&self.files, at + 8)? as usize;
        let bytes = slice(&self.files, at + FILE_DETAIL_HEADER, len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn snippet_at(&self, offset: u32) -> Result<String> {
        pool_string(&self.snippets, offset).context("snippet offset out of range")
    }

    fn name_at(&self, name_offset: u32) -> Result<String> {
        let at = name_offset as usize;
        let len = read_u16(&self.symbol_details, at + 4)? as usize;
        let bytes = slice(&self.symbol_details, at + SYMBOL_NAME_HEADER, len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn provider_at(&self, at: &mut usize) -> Result<ProviderView> {
        let file_hash = read_u64(&self.details, *at)?;
        let file_offset = read_u32(&self.details, *at + 8)?;
        let begin = read_u64(&self.details, *at + 12)?;
        let end = read_u64(&self.details, *at + 20)?;
        let snippet_offset = read_u32(&self.details, *at + 28)?;
        *at += SYMBOL_DETAIL_PROVIDER;
        Ok(ProviderView {
            file_hash,
            file_path: self.file_path_at(file_offset)?,
            begin,
            end,
            snippet: self.snippet_at(snippet_offset)?,
        })
    }
}

fn slice(buf: &[u8], at: usize, len: usize) -> Result<&[u8]> {
    match buf.get(at..at + len) {
        Some(bytes) => Ok(bytes),
        None => bail!("index artifact truncated at offset {} (want {})", at, len),
    }
}

fn read_u8(buf: &[u8], at: usize) -> Result<u8> {
    Ok(slice(buf, at, 1)?[0])
}

fn read_u16(buf: &[u8], at: usize) -> Result<u16> {
    Ok(u16::from_le_bytes(slice(buf, at, 2)?.try_into().unwrap()))
}

fn read_u32(buf: &[u8], at: usize) -> Result<u32> {
    Ok(u32::from_le_bytes(slice(buf, at, 4)?.try_into().unwrap()))
}

fn read_u64(buf: &[u8], at: usize) -> Result<u64> {
    Ok(u64::from_le_bytes(slice(buf, at, 8)?.try_into().unwrap()))
}

fn pool_string(pool: &[u8], offset: u32) -> Option<String> {
    let at = offset as usize;
    let len = u32::from_le_bytes(pool.get(at..at + 4)?.try_into().ok()?) as usize;
    let bytes = pool.get(at + 4..at + 4 + len)?;
    Some(String::from_utf8_lossy(bytes).into_owned())
}
