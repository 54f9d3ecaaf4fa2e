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

//! Raw C/C++ token scanner.
//!
//! Produces the token stream the highlighter consumes: keywords, comments,
//! string/char/numeric literals and `#` markers, with literal prefixes
//! (`L"..."`, `u8'...'`) excluded from the highlighted span the way the
//! rendered output expects. No preprocessing, no include following.

use crate::front::{RawToken, TokenKind};

static KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and", "asm", "auto", "bool", "break", "case", "catch", "char",
    "char16_t", "char32_t", "char8_t", "class", "co_await", "co_return", "co_yield", "concept",
    "const", "const_cast", "consteval", "constexpr", "constinit", "continue", "decltype",
    "default", "delete", "do", "double", "dynamic_cast", "else", "enum", "explicit", "export",
    "extern", "false", "final", "float", "for", "friend", "goto", "if", "inline", "int", "long",
    "mutable", "namespace", "new", "noexcept", "not", "nullptr", "operator", "or", "override",
    "private", "protected", "public", "register", "reinterpret_cast", "requires", "restrict",
    "return", "short", "signed", "sizeof", "static", "static_assert", "static_cast", "struct",
    "switch", "template", "this", "thread_local", "throw", "true", "try", "typedef", "typeid",
    "typename", "union", "unsigned", "using", "virtual", "void", "volatile", "wchar_t", "while",
];

pub fn is_keyword(word: &[u8]) -> bool {
    std::str::from_utf8(word)
        .map(|w| KEYWORDS.binary_search(&w).is_ok())
        .unwrap_or(false)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Length of the encoding prefix (`L`, `u`, `U`, `u8`) in front of a quote.
fn literal_prefix_len(word: &[u8]) -> Option<u32> {
    match word {
        b"L" | b"u" | b"U" => Some(1),
        b"u8" => Some(2),
        _ => None,
    }
}

pub fn raw_tokens(src: &[u8]) -> Vec<RawToken> {
    let mut tokens = Vec::new();
    let mut pos = 0usize;
    let mut at_line_start = true;

    let push = |tokens: &mut Vec<RawToken>, kind, offset: usize, len: usize, line_start: bool| {
        tokens.push(RawToken {
            kind,
            offset: offset as u32,
            len: len as u32,
            at_line_start: line_start,
        });
    };

    while pos < src.len() {
        let b = src[pos];

        if b == b'\n' {
            at_line_start = true;
            pos += 1;
            continue;
        }
        if b.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;
        let line_start = at_line_start;
        at_line_start = false;

        // Comments.
        if b == b'/' && pos + 1 < src.len() {
            if src[pos + 1] == b'/' {
                while pos < src.len() && src[pos] != b'\n' {
                    pos += 1;
                }
                push(&mut tokens, TokenKind::Comment, start, pos - start, line_start);
                continue;
            }
            if src[pos + 1] == b'*' {
                pos += 2;
                while pos + 1 < src.len() && !(src[pos] == b'*' && src[pos + 1] == b'/') {
                    pos += 1;
                }
                pos = (pos + 2).min(src.len());
                push(&mut tokens, TokenKind::Comment, start, pos - start, line_start);
                continue;
            }
        }

        // String and character literals, directly quoted.
        if b == b'"' || b == b'\'' {
            pos = scan_quoted(src, pos);
            let kind = if b == b'"' { TokenKind::Str } else { TokenKind::Char };
            push(&mut tokens, kind, start, pos - start, line_start);
            continue;
        }

        // Numeric constants.
        if b.is_ascii_digit() || (b == b'.' && pos + 1 < src.len() && src[pos + 1].is_ascii_digit())
        {
            pos = scan_number(src, pos);
            push(&mut tokens, TokenKind::Numeric, start, pos - start, line_start);
            continue;
        }

        // Identifiers, keywords, and prefixed literals.
        if is_ident_start(b) {
            while pos < src.len() && is_ident_continue(src[pos]) {
                pos += 1;
            }
            let word = &src[start..pos];

            // Raw strings: R"( ... )" with an optional delimiter.
            if pos < src.len() && src[pos] == b'"' && word.ends_with(b"R") {
                pos = scan_raw_string(src, pos);
                push(&mut tokens, TokenKind::Str, start, pos - start, line_start);
                continue;
            }
            // Chop the encoding prefix off the highlighted span.
            if pos < src.len() && (src[pos] == b'"' || src[pos] == b'\'') {
                if let Some(skip) = literal_prefix_len(word) {
                    let quote = src[pos];
                    pos = scan_quoted(src, pos);
                    let kind = if quote == b'"' { TokenKind::Str } else { TokenKind::Char };
                    let lit_start = start + skip as usize;
                    push(&mut tokens, kind, lit_start, pos - lit_start, line_start);
                    continue;
                }
            }

            let kind = if is_keyword(word) { TokenKind::Keyword } else { TokenKind::Ident };
            push(&mut tokens, kind, start, pos - start, line_start);
            continue;
        }

        if b == b'#' {
            pos += 1;
            push(&mut tokens, TokenKind::Hash, start, 1, line_start);
            continue;
        }

        pos += 1;
        push(&mut tokens, TokenKind::Punct, start, 1, line_start);
    }

    tokens
}

fn scan_quoted(src: &[u8], open: usize) -> usize {
    let quote = src[open];
    let mut pos = open + 1;
    while pos < src.len() {
        match src[pos] {
            b'\\' => pos += 2,
            b'\n' => break,
            b if b == quote => return pos + 1,
            _ => pos += 1,
        }
    }
    pos.min(src.len())
}

fn scan_raw_string(src: &[u8], open: usize) -> usize {
    // open points at the '"' after R. Collect the delimiter up to '('.
    let mut pos = open + 1;
    let delim_start = pos;
    while pos < src.len() && src[pos] != b'(' {
        pos += 1;
    }
    if pos >= src.len() {
        return src.len();
    }
    let mut closer: Vec<u8> = vec![b')'];
    closer.extend_from_slice(&src[delim_start..pos]);
    closer.push(b'"');
    pos += 1;
    while pos < src.len() {
        if src[pos..].starts_with(&closer) {
            return pos + closer.len();
        }
        pos += 1;
    }
    src.len()
}

fn scan_number(src: &[u8], start: usize) -> usize {
    let mut pos = start;
    while pos < src.len() {
        let b = src[pos];
        if b.is_ascii_alphanumeric() || b == b'.' || b == b'\'' {
            pos += 1;
            continue;
        }
        // Exponent signs: 1e+5, 0x1p-3.
        if (b == b'+' || b == b'-')
            && matches!(src[pos - 1], b'e' | b'E' | b'p' | b'P')
        {
            pos += 1;
            continue;
        }
        break;
    }
    pos
}
