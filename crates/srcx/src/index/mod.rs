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

//! The on-disk symbol index. All values little-endian; offsets are byte
//! offsets into the artifact named.
//!
//! - `index.<tag>.files` — `{u64 path-hash, u16 path-len, path}` records.
//! - `index.<tag>.symbol-details` — `{u32 detail-offset, u16 name-len,
//!   name}` rows, shortest symbol first, best-scored first within a
//!   length, then by name. Looked up by symbol name.
//! - `index.<tag>.details` — per-symbol blocks: a `SymbolDetail` header
//!   `{u32 name-offset, u64 name-hash, u16 kind-count}` followed by
//!   `SymbolDetailKind` records `{u32 kind-offset, u8 linkage, u8 access,
//!   u16 def-count, u16 decl-count}`, each followed by its
//!   `SymbolDetailProvider` entries `{u64 file-hash, u32 file-offset,
//!   u64 begin, u64 end, u32 snippet-offset}`, definitions first.
//! - `index.<tag>.hash-details` — `{u64 name-hash, u32 detail-offset}`
//!   rows sorted by hash, for binary search.
//! - `index.<tag>.snippets` / `index.<tag>.strings` — raw arena dumps the
//!   snippet and kind offsets point into.
//! - `index.<tag>.symbols.json` — the readable mirror, written last: the
//!   UI watches its timestamp to decide when to reload.

mod reader;
mod writer;

pub use reader::{IndexReader, KindView, ProviderView, SymbolView};
pub use writer::write_binary_index;

pub(crate) const FILE_DETAIL_HEADER: usize = 8 + 2;
pub(crate) const SYMBOL_NAME_HEADER: usize = 4 + 2;
pub(crate) const SYMBOL_DETAIL_HEADER: usize = 4 + 8 + 2;
pub(crate) const SYMBOL_DETAIL_KIND: usize = 4 + 1 + 1 + 2 + 2;
pub(crate) const SYMBOL_DETAIL_PROVIDER: usize = 8 + 4 + 8 + 8 + 4;
pub(crate) const HASH_DETAIL: usize = 8 + 4;

pub fn artifact_name(tag: &str, suffix: &str) -> String {
    format!("index.{}.{}", tag, suffix)
}
