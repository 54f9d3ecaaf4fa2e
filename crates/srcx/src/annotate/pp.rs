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

//! Preprocessor side of the annotation engine.
//!
//! Tracks the include stack so each header is annotated exactly once per
//! run, links include directives and macro uses, and mutes the regions of
//! conditionals whose branch evaluated false.

use super::{Annotator, IfRegion};
use crate::front::{Condition, Linkage, Loc, PpEvent, SourceMap, SourceRange, ACCESS_PUBLIC};

impl Annotator<'_> {
    /// True when events from the current file still need processing.
    ///
    /// The front-end enters a synthetic predefined-macros buffer before the
    /// main file; it has no descriptor, and includes issued directly from
    /// it must still be followed. Hence: skip only when the stack top is a
    /// real, already-preprocessed file.
    fn should_process(&self) -> bool {
        match self.include_stack.last() {
            None => true,
            Some(Some(file)) => {
                !self.registry.file(*file).preprocessed && self.include_ignored == 0
            }
            Some(None) => false,
        }
    }

    pub(crate) fn on_pp_event(&mut self, sm: &dyn SourceMap, event: &PpEvent) {
        match event {
            PpEvent::FileEnter { loc } => self.on_file_enter(sm, *loc),
            PpEvent::FileExit => self.on_file_exit(),
            PpEvent::Inclusion {
                filename_range,
                resolved_path,
            } => self.on_inclusion(sm, *filename_range, resolved_path.as_deref()),
            PpEvent::MacroDefined {
                name,
                name_loc,
                def_range,
                is_header_guard,
            } => self.on_macro_defined(sm, name, *name_loc, *def_range, *is_header_guard),
            PpEvent::MacroExpands { name, range, def_range } => {
                self.on_macro_expands(sm, name, *range, *def_range)
            }
            PpEvent::If { cond_range, value } => {
                if self.should_process() {
                    self.if_stack.push(IfRegion {
                        condition: *value,
                        start: cond_range.begin,
                    });
                }
            }
            PpEvent::Elif {
                loc,
                cond_range,
                value,
            } => self.on_elif(sm, *loc, *cond_range, *value),
            PpEvent::Ifdef {
                name_range,
                def_range,
            } => self.on_ifdef(sm, *name_range, *def_range, false),
            PpEvent::Ifndef {
                name_range,
                def_range,
            } => self.on_ifdef(sm, *name_range, *def_range, true),
            PpEvent::DefinedTest {
                name_range,
                def_range,
            } => {
                if self.should_process() {
                    self.macro_test(sm, *name_range, *def_range);
                }
            }
            PpEvent::Else { loc } => self.on_else(sm, *loc),
            PpEvent::Endif { loc } => self.on_endif(sm, *loc),
        }
    }

    fn on_file_enter(&mut self, sm: &dyn SourceMap, loc: Loc) {
        if !self.should_process() && matches!(self.include_stack.last(), Some(Some(_))) {
            self.include_ignored += 1;
            return;
        }

        let file = self.file_for_loc(sm, loc);
        if let Some(id) = file {
            let entry = self.registry.file_mut(id);
            if entry.preprocessing || entry.preprocessed {
                self.include_ignored += 1;
                return;
            }
            entry.preprocessing = true;
            log::debug!("entering {}", entry.path);
        }
        self.include_stack.push(file);
    }

    fn on_file_exit(&mut self) {
        if self.include_ignored > 0 {
            self.include_ignored -= 1;
            return;
        }
        if let Some(Some(id)) = self.include_stack.pop() {
            let entry = self.registry.file_mut(id);
            entry.preprocessed = true;
            log::debug!("exiting {}", entry.path);
        }
    }

    fn on_inclusion(
        &mut self,
        sm: &dyn SourceMap,
        filename_range: SourceRange,
        resolved_path: Option<&str>,
    ) {
        let Some(path) = resolved_path else {
            self.counters.bump(
                "pp/file/failed-inclusion",
                "An include directive did not resolve to a file",
            );
            return;
        };
        let file = self.registry.file_for_path(path);
        let href = self.registry.file(file).html_path();
        self.wrap_with_tag(sm, filename_range, "a", &["include"], &[("href", href.as_str())]);
    }

    fn on_macro_defined(
        &mut self,
        sm: &dyn SourceMap,
        name: &str,
        name_loc: Loc,
        def_range: SourceRange,
        is_header_guard: bool,
    ) {
        if !self.should_process() {
            return;
        }
        // Guard macros are noise in the index; trust the front-end's flag.
        if is_header_guard {
            return;
        }
        let highlight = SourceRange::new(name_loc, def_range.end);
        self.code_defines(
            sm,
            highlight,
            def_range,
            def_range,
            "MACRO",
            name,
            ACCESS_PUBLIC,
            Linkage::None,
        );
    }

    fn on_macro_expands(
        &mut self,
        sm: &dyn SourceMap,
        name: &str,
        range: SourceRange,
        def_range: SourceRange,
    ) {
        if !self.should_process() {
            return;
        }
        log::debug!("macro expand {}", name);
        self.code_uses(sm, range, "MACRO", def_range);
    }

    /// `#ifdef NAME` / `#ifndef NAME` / `defined(NAME)`: a known macro is a
    /// use of its definition, an unknown one gets the undefined marker.
    fn macro_test(&mut self, sm: &dyn SourceMap, name_range: SourceRange, def_range: Option<SourceRange>) {
        match def_range {
            Some(target) => self.code_uses(sm, name_range, "MACRO", target),
            None => {
                self.wrap_with_tag(sm, name_range, "span", &["macro-undefined"], &[]);
            }
        }
    }

    fn on_ifdef(
        &mut self,
        sm: &dyn SourceMap,
        name_range: SourceRange,
        def_range: Option<SourceRange>,
        negated: bool,
    ) {
        if !self.should_process() {
            return;
        }
        self.macro_test(sm, name_range, def_range);

        let defined = def_range.is_some();
        let condition = if defined != negated { Condition::True } else { Condition::False };
        self.if_stack.push(IfRegion {
            condition,
            start: name_range.end,
        });
    }

    fn on_elif(&mut self, sm: &dyn SourceMap, loc: Loc, cond_range: SourceRange, value: Condition) {
        if !self.should_process() {
            return;
        }
        let Some(region) = self.if_stack.pop() else { return };
        if region.condition == Condition::False {
            self.wrap_muted(sm, region.start, loc);
        }
        self.if_stack.push(IfRegion {
            condition: value,
            start: cond_range.begin,
        });
    }

    fn on_else(&mut self, sm: &dyn SourceMap, loc: Loc) {
        if !self.should_process() {
            return;
        }
        let Some(region) = self.if_stack.pop() else { return };
        let condition = if region.condition == Condition::False {
            self.wrap_muted(sm, region.start, loc);
            Condition::True
        } else {
            Condition::False
        };
        self.if_stack.push(IfRegion { condition, start: loc });
    }

    fn on_endif(&mut self, sm: &dyn SourceMap, loc: Loc) {
        if !self.should_process() {
            return;
        }
        let Some(region) = self.if_stack.pop() else { return };
        if region.condition == Condition::False {
            self.wrap_muted(sm, region.start, loc);
        }
    }

    fn wrap_muted(&mut self, sm: &dyn SourceMap, start: Loc, end: Loc) {
        self.wrap_eol_sol(sm, start, end, &["preprocessor-if", "muted"]);
    }
}
