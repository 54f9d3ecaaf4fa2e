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

//! srcx: drives a syntactic and semantic analyser over a source tree and
//! produces per-file annotated hypertext plus a compact, binary-searchable
//! cross-reference index for a code-browser UI.

pub mod annotate;
pub mod compiledb;
pub mod counters;
pub mod driver;
pub mod front;
pub mod index;
pub mod lex;
pub mod locmap;
pub mod registry;
pub mod render;
pub mod rewrite;
pub mod strpool;
pub mod xref;

// Re-export the surfaces most callers wire together.
pub use crate::annotate::Annotator;
pub use crate::compiledb::CompileCommand;
pub use crate::counters::Counters;
pub use crate::driver::{run, RunOptions, RunStats};
pub use crate::front::{Frontend, TranslationUnit};
pub use crate::index::{write_binary_index, IndexReader};
pub use crate::registry::FileRegistry;
pub use crate::xref::XrefIndex;

#[doc(hidden)]
pub mod test_utils;
