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

//! Syntactic side of the annotation engine: a dispatch table over the
//! closed set of node kinds. Unknown kinds are a no-op; their children are
//! still visited.

use super::Annotator;
use crate::front::{AstNode, NodeKind, SourceMap, TemplateKind};

impl Annotator<'_> {
    pub(crate) fn visit_nodes(&mut self, sm: &dyn SourceMap, nodes: &[AstNode]) {
        for node in nodes {
            self.visit_node(sm, node);
        }
    }

    fn visit_node(&mut self, sm: &dyn SourceMap, node: &AstNode) {
        // Headers shared between translation units are annotated by the
        // first unit that renders them; skip the whole subtree afterwards.
        if let Some(file) = self.file_for_loc(sm, node.range.begin) {
            if self.registry.file(file).rendered() {
                log::debug!("file already parsed: {}", self.registry.file(file).path);
                return;
            }
        }

        self.dispatch(sm, node);
        self.visit_nodes(sm, &node.children);
    }

    fn dispatch(&mut self, sm: &dyn SourceMap, node: &AstNode) {
        match &node.kind {
            NodeKind::DeclRef { target } => {
                self.code_uses(sm, node.range, "variable", *target);
            }

            NodeKind::Member {
                name_range,
                target,
                target_anonymous,
            } => {
                // Anonymous records and fields have nothing to look at in
                // the source; the field link covers the interesting case.
                if *target_anonymous {
                    log::debug!("ignored use of anonymous member target");
                    return;
                }
                self.code_uses(sm, *name_range, "expression", *target);
            }

            NodeKind::Declarator { type_loc } => {
                self.code_uses_type(sm, type_loc, "declaration");
            }

            NodeKind::Function {
                info,
                is_definition,
                template,
                return_type,
            } => {
                // Each use of a templated function plants a specialised
                // copy at the same location; re-annotating those would
                // stack identical records and tags.
                if *template == TemplateKind::Specialization {
                    return;
                }
                if let Some(type_loc) = return_type {
                    self.code_uses_type(sm, type_loc, "return");
                }
                if *is_definition {
                    self.code_defines(
                        sm,
                        node.range,
                        node.range,
                        info.first_range,
                        &info.kind,
                        &info.name,
                        info.access,
                        info.linkage,
                    );
                } else {
                    self.code_declares(
                        sm,
                        node.range,
                        info.first_range,
                        &info.kind,
                        &info.name,
                        info.access,
                        info.linkage,
                    );
                }
            }

            NodeKind::TagDecl {
                info,
                is_complete_definition,
            } => {
                if *is_complete_definition {
                    self.code_defines(
                        sm,
                        node.range,
                        node.range,
                        info.first_range,
                        &info.kind,
                        &info.name,
                        info.access,
                        info.linkage,
                    );
                } else {
                    self.code_declares(
                        sm,
                        node.range,
                        info.first_range,
                        &info.kind,
                        &info.name,
                        info.access,
                        info.linkage,
                    );
                }
            }

            NodeKind::Var {
                info,
                is_parameter,
                in_function_definition,
                has_external_storage,
            } => {
                if *is_parameter {
                    // Parameters only exist once their function body does.
                    if *in_function_definition {
                        self.code_defines(
                            sm,
                            node.range,
                            node.range,
                            info.first_range,
                            &info.kind,
                            &info.name,
                            info.access,
                            info.linkage,
                        );
                    }
                } else if *has_external_storage {
                    self.code_declares(
                        sm,
                        node.range,
                        info.first_range,
                        &info.kind,
                        &info.name,
                        info.access,
                        info.linkage,
                    );
                } else {
                    self.code_defines(
                        sm,
                        node.range,
                        node.range,
                        info.first_range,
                        &info.kind,
                        &info.name,
                        info.access,
                        info.linkage,
                    );
                }
            }

            NodeKind::OtherNamed { info } => {
                self.code_defines(
                    sm,
                    node.range,
                    node.range,
                    node.range,
                    &info.kind,
                    &info.name,
                    info.access,
                    info.linkage,
                );
            }

            NodeKind::Other => {}
        }
    }
}
