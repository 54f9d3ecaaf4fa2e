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

//! The annotation engine.
//!
//! Consumes one translation unit's preprocessor events and AST, and for
//! each semantic relation both records it in the cross-reference index and
//! queues the hypertext wrap over the source span. The preprocessor side
//! lives in `pp`, the AST dispatch in `visitor`; this module holds the
//! recorder primitives they share.

mod pp;
mod visitor;

use crate::counters::Counters;
use crate::front::{Linkage, Loc, SourceMap, SourceRange, TranslationUnit, TypeLoc, UnitFileId};
use crate::locmap::{self, ObjectId};
use crate::registry::{FileId, FileRegistry};
use crate::rewrite::{make_attrs, Tag};
use crate::xref::{Id, XrefIndex};

pub(crate) struct IfRegion {
    pub condition: crate::front::Condition,
    pub start: Loc,
}

pub struct Annotator<'a> {
    pub registry: &'a mut FileRegistry,
    pub index: &'a mut XrefIndex,
    pub counters: &'a mut Counters,
    pub snippet_limit: usize,

    // Per-unit preprocessor state.
    include_stack: Vec<Option<FileId>>,
    if_stack: Vec<IfRegion>,
    include_ignored: u32,

    // Most recently resolved unit file.
    last_unit_file: Option<(UnitFileId, Option<FileId>)>,
}

impl<'a> Annotator<'a> {
    pub fn new(
        registry: &'a mut FileRegistry,
        index: &'a mut XrefIndex,
        counters: &'a mut Counters,
        snippet_limit: usize,
    ) -> Self {
        Annotator {
            registry,
            index,
            counters,
            snippet_limit,
            include_stack: Vec::new(),
            if_stack: Vec::new(),
            include_ignored: 0,
            last_unit_file: None,
        }
    }

    /// Run the engine over one unit: preprocessor events in token order,
    /// then the AST in depth-first order.
    pub fn run(&mut self, unit: &dyn TranslationUnit) {
        self.include_stack.clear();
        self.if_stack.clear();
        self.include_ignored = 0;
        self.last_unit_file = None;

        let sm = unit.source_map();
        for event in unit.pp_events() {
            self.on_pp_event(sm, event);
        }
        self.visit_nodes(sm, unit.ast());
    }

    // Resolution helpers.

    /// Front-end file handle to registry descriptor. None for synthetic
    /// buffers (predefined macros and the like), which are never indexed.
    pub(crate) fn unit_file(&mut self, sm: &dyn SourceMap, file: UnitFileId) -> Option<FileId> {
        if let Some((last, resolved)) = self.last_unit_file {
            if last == file {
                return resolved;
            }
        }
        let resolved = match sm.file_path(file) {
            Some(path) => Some(self.registry.file_for_path(path)),
            None => {
                self.counters.bump(
                    "cache/nullreturn/internal-buffer",
                    "Location referred to an internal buffer with no file behind it",
                );
                None
            }
        };
        self.last_unit_file = Some((file, resolved));
        resolved
    }

    /// File where the code at `loc` is used: the expansion file.
    pub(crate) fn file_for_loc(&mut self, sm: &dyn SourceMap, loc: Loc) -> Option<FileId> {
        let resolved = sm.expansion(loc)?;
        self.unit_file(sm, resolved.file)
    }

    fn file_for_range(&mut self, sm: &dyn SourceMap, range: SourceRange) -> Option<FileId> {
        let begin = sm.expansion(range.begin)?;
        let end = sm.expansion(range.end)?;
        if begin.file != end.file {
            self.counters.bump(
                "cache/nullreturn/begin-end-different-files",
                "Begin and end of a range resolved to different files",
            );
            log::warn!("begin and end of location in different files");
            return None;
        }
        self.unit_file(sm, begin.file)
    }

    pub(crate) fn make_id(&mut self, sm: &dyn SourceMap, range: SourceRange) -> Option<Id> {
        let file = self.file_for_range(sm, range)?;
        Some(Id {
            file,
            file_hash: self.registry.file(file).hash,
            object: locmap::make_object_id(sm, range),
        })
    }

    /// Link to the object at `range`, from any rendered document.
    pub(crate) fn id_link(&mut self, sm: &dyn SourceMap, range: SourceRange) -> String {
        match self.file_for_loc(sm, range.begin) {
            Some(file) => {
                let hash = self.registry.file(file).hash;
                locmap::id_link(hash, locmap::make_object_id(sm, range))
            }
            None => {
                self.counters.bump(
                    "indexer/object-id/invalid-file",
                    "Link led to an invalid id, no file behind the location",
                );
                "#invalid-id".to_string()
            }
        }
    }

    // Wrapping primitives.

    /// Queue a tag over the expansion range of `range`, extended to cover
    /// the whole end token. Macro locations cannot be wrapped.
    pub(crate) fn wrap_with_tag(
        &mut self,
        sm: &dyn SourceMap,
        range: SourceRange,
        element: &'static str,
        classes: &[&str],
        attributes: &[(&str, &str)],
    ) -> bool {
        if sm.is_macro(range.begin) || sm.is_macro(range.end) {
            return false;
        }
        let (Some(begin), Some(end)) = (sm.expansion(range.begin), sm.expansion(range.end)) else {
            return false;
        };
        if begin.file != end.file {
            self.counters.bump(
                "cache/nullreturn/begin-end-different-files",
                "Begin and end of a range resolved to different files",
            );
            return false;
        }
        let Some(file) = self.unit_file(sm, begin.file) else {
            return false;
        };

        let open = begin.offset;
        let close = end.offset + sm.token_length(range.end);
        let limit = sm.contents(begin.file).len() as u32;

        let attrs = self
            .registry
            .tag_pool
            .insert(make_attrs(classes, attributes).as_bytes());
        self.registry.file_mut(file).rewrite.add(
            Tag {
                element,
                open,
                close,
                attrs,
            },
            limit,
        );
        true
    }

    /// Wrap from the end of the line at `start` to the start of the line at
    /// `end`; the region a false conditional branch covers.
    pub(crate) fn wrap_eol_sol(
        &mut self,
        sm: &dyn SourceMap,
        start: Loc,
        end: Loc,
        classes: &[&str],
    ) -> bool {
        let (Some(begin), Some(finish)) = (sm.expansion(start), sm.expansion(end)) else {
            return false;
        };
        if begin.file != finish.file {
            self.counters.bump(
                "cache/nullreturn/begin-end-different-files",
                "Begin and end of a range resolved to different files",
            );
            return false;
        }
        let Some(file) = self.unit_file(sm, begin.file) else {
            return false;
        };
        let data = sm.contents(begin.file);

        // Forward to the end of line, honouring backslash continuations.
        let mut open = begin.offset as usize;
        while open < data.len() {
            if (data[open] == b'\n' || data[open] == b'\r')
                && (open == 0 || data[open - 1] != b'\\')
            {
                break;
            }
            open += 1;
        }
        // Back to the previous newline.
        let mut close = finish.offset as usize;
        while close > 0 && data[close] != b'\n' && data[close] != b'\r' {
            close -= 1;
        }

        let attrs = self
            .registry
            .tag_pool
            .insert(make_attrs(classes, &[]).as_bytes());
        self.registry.file_mut(file).rewrite.add(
            Tag {
                element: "span",
                open: open as u32,
                close: close as u32,
                attrs,
            },
            data.len() as u32,
        );
        true
    }

    // Recorder primitives.

    /// Record a citation of `target` at `user`, and turn the use site into
    /// a link. A use spelled inside a macro cannot be wrapped; it is
    /// diverted to a counter with the target link preserved in the log.
    pub(crate) fn code_uses(
        &mut self,
        sm: &dyn SourceMap,
        user: SourceRange,
        class: &str,
        target: SourceRange,
    ) {
        let ntarget = locmap::normalize_range(sm, target);
        let nuser = locmap::normalize_range(sm, user);
        if !ntarget.is_valid() || !nuser.is_valid() {
            return;
        }

        let (target_id, user_id) = match (self.make_id(sm, ntarget), self.make_id(sm, nuser)) {
            (Some(t), Some(u)) => (t, u),
            (Some(t), None) => {
                // The target is real; keep a note on it about the citation
                // we had to drop.
                self.index.record_exception(
                    t,
                    format!("dropped a {} use from an unresolvable location", class),
                );
                return;
            }
            _ => return,
        };
        self.index.record_use(target_id, user_id);

        if sm.is_macro(user.begin) || sm.is_macro(user.end) {
            self.counters.bump(
                "annotate/tags/macro-location",
                "Use sites spelled inside macros cannot be wrapped",
            );
            log::debug!(
                "discarded wrap at macro location, target {}",
                self.id_link(sm, ntarget)
            );
            return;
        }

        let href = self.id_link(sm, ntarget);
        let class_uses = format!("{}-uses", class);
        self.wrap_with_tag(sm, user, "a", &[class_uses.as_str()], &[("href", href.as_str())]);
    }

    /// Record a use of the underlying tag/typedef of a written type, and
    /// link the written type location to it.
    pub(crate) fn code_uses_type(&mut self, sm: &dyn SourceMap, type_loc: &TypeLoc, class: &str) {
        let (range, underlying) = type_loc.inner();
        let Some(target) = underlying else {
            return;
        };
        self.code_uses(sm, *range, class, *target);
    }

    /// Record a definition provider. `definer` is the link target (the
    /// declaration users know about); `defined` keys the index entry;
    /// `highlight` is the span marked in the rendered output.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn code_defines(
        &mut self,
        sm: &dyn SourceMap,
        highlight: SourceRange,
        definer: SourceRange,
        defined: SourceRange,
        kind: &str,
        name: &str,
        access: u8,
        linkage: Linkage,
    ) {
        if name.is_empty() {
            return;
        }
        let definer_range = locmap::normalize_range(sm, definer);
        let defined_range = locmap::normalize_range(sm, defined);
        if !defined_range.is_valid() || !definer_range.is_valid() {
            self.counters.bump(
                "indexer/record/define/invalid-range",
                "Ranges passed to a define record are not valid",
            );
            return;
        }

        let (defined_id, definer_id) = match (
            self.make_id(sm, defined_range),
            self.make_id(sm, definer_range),
        ) {
            (Some(d), Some(p)) => (d, p),
            _ => {
                self.counters.bump(
                    "indexer/record/define/invalid-file",
                    "Ranges passed to a define record refer to an invalid file",
                );
                return;
            }
        };

        let snippet = self.snippet(sm, definer_range);
        self.index
            .record_defines(defined_id, definer_id, kind, name, &snippet, access, linkage);

        let id = locmap::id_name(self.object_id(sm, definer_range));
        let def_kind = format!("def-{}", kind);
        let highlight_range = locmap::normalize_range(sm, highlight);
        self.wrap_with_tag(sm, highlight_range, "span", &["def", def_kind.as_str()], &[("id", id.as_str())]);
    }

    /// Record a declaration provider. The declared (canonical) site is
    /// marked only when this declaration is itself the canonical one.
    pub(crate) fn code_declares(
        &mut self,
        sm: &dyn SourceMap,
        declarer: SourceRange,
        declared: SourceRange,
        kind: &str,
        name: &str,
        access: u8,
        linkage: Linkage,
    ) {
        if name.is_empty() {
            return;
        }
        let declarer_range = locmap::normalize_range(sm, declarer);
        let declared_range = locmap::normalize_range(sm, declared);
        if !declared_range.is_valid() || !declarer_range.is_valid() {
            self.counters.bump(
                "indexer/record/declare/invalid-range",
                "Ranges passed to a declare record are not valid",
            );
            return;
        }

        let (declared_id, declarer_id) = match (
            self.make_id(sm, declared_range),
            self.make_id(sm, declarer_range),
        ) {
            (Some(d), Some(p)) => (d, p),
            _ => {
                self.counters.bump(
                    "indexer/record/declare/invalid-file",
                    "Ranges passed to a declare record refer to an invalid file",
                );
                return;
            }
        };

        let snippet = self.snippet(sm, declared_range);
        self.index
            .record_declares(declared_id, declarer_id, kind, name, &snippet, access, linkage);

        if declared_range == declarer_range {
            let id = locmap::id_name(self.object_id(sm, declared_range));
            let decl_kind = format!("decl-{}", kind);
            self.wrap_with_tag(sm, declared_range, "span", &["decl", decl_kind.as_str()], &[("id", id.as_str())]);
        }
    }

    fn object_id(&mut self, sm: &dyn SourceMap, range: SourceRange) -> ObjectId {
        locmap::make_object_id(sm, range)
    }

    /// The single source line holding the declarator, trimmed, capped at
    /// the snippet limit on both sides of the declarator position.
    pub(crate) fn snippet(&mut self, sm: &dyn SourceMap, range: SourceRange) -> String {
        let Some(begin) = sm.expansion(range.begin) else {
            return "<invalid-file>".to_string();
        };
        let data = sm.contents(begin.file);
        let offset = begin.offset as usize;
        if offset >= data.len() {
            return "<invalid-offset>".to_string();
        }

        let mut start = offset;
        while start > 0 && data[start] != b'\n' && data[start] != b'\r' {
            start -= 1;
        }
        while start <= offset && data[start].is_ascii_whitespace() {
            start += 1;
        }
        let mut end = offset + 1;
        while end < data.len() && data[end] != b'\n' && data[end] != b'\r' {
            end += 1;
        }
        while end > start + 1 && data[end - 1].is_ascii_whitespace() {
            end -= 1;
        }

        start = start.max(offset.saturating_sub(self.snippet_limit));
        end = end.min(offset + self.snippet_limit);
        String::from_utf8_lossy(&data[start..end.max(start)]).into_owned()
    }
}
