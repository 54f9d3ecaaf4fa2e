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

//! The front-end contract.
//!
//! The syntactic and semantic analyser is an external collaborator. It hands
//! the engine, per translation unit, a source map resolving opaque location
//! handles, a stream of preprocessor events in token order, an AST in
//! depth-first order, and raw token streams for lexical highlighting. The
//! types here are that boundary; `front::raw` provides the built-in
//! lexical-only implementation and `test_utils` a scripted one.

pub mod raw;

use crate::compiledb::CompileCommand;

/// Opaque location handle, only meaningful to the unit's [`SourceMap`].
/// Zero is the invalid location.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Loc(pub u32);

impl Loc {
    pub const INVALID: Loc = Loc(0);

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct SourceRange {
    pub begin: Loc,
    pub end: Loc,
}

impl SourceRange {
    pub fn new(begin: Loc, end: Loc) -> Self {
        SourceRange { begin, end }
    }

    /// Degenerate range covering a single token.
    pub fn at(loc: Loc) -> Self {
        SourceRange { begin: loc, end: loc }
    }

    pub fn is_valid(&self) -> bool {
        self.begin.is_valid() && self.end.is_valid()
    }
}

/// File handle scoped to one translation unit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct UnitFileId(pub u32);

#[derive(Clone, Copy, Debug)]
pub struct ResolvedLoc {
    pub file: UnitFileId,
    pub offset: u32,
    /// 1-based.
    pub line: u32,
    /// 1-based.
    pub column: u32,
}

pub trait SourceMap {
    /// Where the characters were typed.
    fn spelling(&self, loc: Loc) -> Option<ResolvedLoc>;
    /// Where the characters land after macro substitution.
    fn expansion(&self, loc: Loc) -> Option<ResolvedLoc>;
    /// True when the location points into a macro body or argument.
    fn is_macro(&self, loc: Loc) -> bool;
    /// Canonical path of a unit file. None for synthetic buffers such as the
    /// predefined-macro pseudo-file, which has no descriptor.
    fn file_path(&self, file: UnitFileId) -> Option<&str>;
    fn contents(&self, file: UnitFileId) -> &[u8];
    /// Length of the token starting at `loc`, used to make wrap ranges cover
    /// the whole end token.
    fn token_length(&self, loc: Loc) -> u32;
}

/// Access specifier byte, as the front-end reports it.
pub const ACCESS_PUBLIC: u8 = 0;
pub const ACCESS_PROTECTED: u8 = 1;
pub const ACCESS_PRIVATE: u8 = 2;
pub const ACCESS_NONE: u8 = 3;
pub const ACCESS_UNSET: u8 = 255;

/// Linkage classification, carried through to the index as a small integer.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[repr(u8)]
pub enum Linkage {
    #[default]
    None = 0,
    Internal = 1,
    UniqueExternal = 2,
    External = 3,
}

/// Evaluated state of a preprocessor conditional.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Condition {
    False,
    True,
    NotEvaluated,
}

/// Preprocessor events, delivered in token order.
#[derive(Clone, Debug)]
pub enum PpEvent {
    FileEnter {
        loc: Loc,
    },
    FileExit,
    Inclusion {
        /// Range of the filename token between the quotes or brackets.
        filename_range: SourceRange,
        /// Search path + relative path of the included file, when resolved.
        resolved_path: Option<String>,
    },
    MacroDefined {
        name: String,
        /// Location of the macro name token in the `#define`.
        name_loc: Loc,
        /// Definition range: name through the last body token.
        def_range: SourceRange,
        is_header_guard: bool,
    },
    MacroExpands {
        name: String,
        /// The invocation site.
        range: SourceRange,
        /// The definition it expands.
        def_range: SourceRange,
    },
    If {
        cond_range: SourceRange,
        value: Condition,
    },
    Elif {
        loc: Loc,
        cond_range: SourceRange,
        value: Condition,
    },
    Ifdef {
        name_range: SourceRange,
        def_range: Option<SourceRange>,
    },
    Ifndef {
        name_range: SourceRange,
        def_range: Option<SourceRange>,
    },
    /// A `defined(NAME)` test inside an `#if`/`#elif` condition.
    DefinedTest {
        name_range: SourceRange,
        def_range: Option<SourceRange>,
    },
    Else {
        loc: Loc,
    },
    Endif {
        loc: Loc,
    },
}

/// Declarator type location, following the written syntax outward-in. The
/// engine walks pointer, reference, array and attributed layers to the
/// inner written type, whose `underlying` is the range of the tag or typedef
/// declaration it resolves to (absent for builtins).
#[derive(Clone, Debug)]
pub enum TypeLoc {
    Pointer(Box<TypeLoc>),
    Reference(Box<TypeLoc>),
    Array(Box<TypeLoc>),
    Attributed(Box<TypeLoc>),
    Inner {
        range: SourceRange,
        underlying: Option<SourceRange>,
    },
}

impl TypeLoc {
    /// Strip pointer/reference/array/attribute layers.
    pub fn inner(&self) -> (&SourceRange, Option<&SourceRange>) {
        match self {
            TypeLoc::Pointer(t)
            | TypeLoc::Reference(t)
            | TypeLoc::Array(t)
            | TypeLoc::Attributed(t) => t.inner(),
            TypeLoc::Inner { range, underlying } => (range, underlying.as_ref()),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TemplateKind {
    NonTemplate,
    Template,
    Specialization,
}

/// Naming and classification shared by every declaration node.
#[derive(Clone, Debug)]
pub struct DeclInfo {
    /// Front-end kind label, e.g. `FunctionDecl`, `CXXRecordDecl`.
    pub kind: String,
    /// Qualified name.
    pub name: String,
    /// Range of the first (canonical) declaration of this entity.
    pub first_range: SourceRange,
    pub access: u8,
    pub linkage: Linkage,
}

/// The closed set of node kinds the engine reacts to. Anything else arrives
/// as `Other` and is a no-op; its children are still visited.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// A declaration reference expression: a use of `target` at this node.
    DeclRef { target: SourceRange },
    /// A member expression. `name_range` is the member-name token.
    Member {
        name_range: SourceRange,
        target: SourceRange,
        target_anonymous: bool,
    },
    /// A declarator's written type.
    Declarator { type_loc: TypeLoc },
    Function {
        info: DeclInfo,
        is_definition: bool,
        template: TemplateKind,
        return_type: Option<TypeLoc>,
    },
    /// struct / class / union / enum.
    TagDecl {
        info: DeclInfo,
        is_complete_definition: bool,
    },
    Var {
        info: DeclInfo,
        is_parameter: bool,
        /// For parameters: whether the enclosing function is a definition.
        in_function_definition: bool,
        has_external_storage: bool,
    },
    /// Any other named declaration: treated as defining itself.
    OtherNamed { info: DeclInfo },
    Other,
}

#[derive(Clone, Debug)]
pub struct AstNode {
    pub range: SourceRange,
    pub kind: NodeKind,
    pub children: Vec<AstNode>,
}

impl AstNode {
    pub fn new(range: SourceRange, kind: NodeKind) -> Self {
        AstNode {
            range,
            kind,
            children: Vec::new(),
        }
    }
}

/// Raw lexical token classes; everything the highlighter cares about.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenKind {
    Keyword,
    Ident,
    Comment,
    Str,
    Char,
    Numeric,
    Hash,
    Punct,
}

#[derive(Clone, Copy, Debug)]
pub struct RawToken {
    pub kind: TokenKind,
    pub offset: u32,
    pub len: u32,
    /// Only whitespace between the previous newline and this token.
    pub at_line_start: bool,
}

/// One parsed translation unit, as handed over by the front-end.
pub trait TranslationUnit {
    fn source_map(&self) -> &dyn SourceMap;
    fn pp_events(&self) -> &[PpEvent];
    fn ast(&self) -> &[AstNode];
    /// Every file the unit touched, in discovery order.
    fn files(&self) -> Vec<UnitFileId>;
    fn raw_tokens(&self, file: UnitFileId) -> Vec<RawToken>;
}

pub trait Frontend {
    fn parse(&mut self, command: &CompileCommand) -> anyhow::Result<Box<dyn TranslationUnit>>;
}
