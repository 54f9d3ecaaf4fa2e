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

//! Location-to-output mapping: packed object identifiers, their hex names,
//! and the hashed output paths every rendered document and link uses.

use crate::front::{SourceMap, SourceRange};

pub const LINE_MASK: u64 = 0xfffff;
pub const COLUMN_MASK: u64 = 0xfff;

pub const BEGIN_LINE_SHIFT: u32 = 44;
pub const BEGIN_COLUMN_SHIFT: u32 = 32;
pub const END_LINE_SHIFT: u32 = 12;
pub const END_COLUMN_SHIFT: u32 = 0;

/// Identifier of a source object within one file.
///
/// `begin` packs the spelling (line, column) pair of both range endpoints,
/// `end` the expansion pair. Lines take 20 bits, columns 12, with the range
/// begin in the high half so that ordering packed values orders ranges by
/// (line, column) lexicographically.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct ObjectId {
    pub begin: u64,
    pub end: u64,
}

pub fn pack_key(begin_line: u32, begin_column: u32, end_line: u32, end_column: u32) -> u64 {
    (begin_line as u64 & LINE_MASK) << BEGIN_LINE_SHIFT
        | (begin_column as u64 & COLUMN_MASK) << BEGIN_COLUMN_SHIFT
        | (end_line as u64 & LINE_MASK) << END_LINE_SHIFT
        | (end_column as u64 & COLUMN_MASK) << END_COLUMN_SHIFT
}

/// Build the ObjectId for a range. Both endpoints must resolve; a key whose
/// end line and column are both zero is the invalid sentinel, and reaching
/// it here is a bug in upstream filtering, so we abort.
pub fn make_object_id(sm: &dyn SourceMap, range: SourceRange) -> ObjectId {
    let sb = sm.spelling(range.begin).expect("unresolvable spelling begin");
    let se = sm.spelling(range.end).expect("unresolvable spelling end");
    let eb = sm.expansion(range.begin).expect("unresolvable expansion begin");
    let ee = sm.expansion(range.end).expect("unresolvable expansion end");

    if (ee.line as u64 & LINE_MASK == 0 && ee.column as u64 & COLUMN_MASK == 0)
        || (se.line as u64 & LINE_MASK == 0 && se.column as u64 & COLUMN_MASK == 0)
    {
        panic!("invalid line / column: {} {}", ee.line, ee.column);
    }

    ObjectId {
        begin: pack_key(sb.line, sb.column, se.line, se.column),
        end: pack_key(eb.line, eb.column, ee.line, ee.column),
    }
}

/// Repair a range: an invalid end collapses onto the begin, and an end that
/// precedes its begin (same file, expansion offsets) is swapped into place.
pub fn normalize_range(sm: &dyn SourceMap, range: SourceRange) -> SourceRange {
    if !range.end.is_valid() {
        return SourceRange::new(range.begin, range.begin);
    }
    if let (Some(b), Some(e)) = (sm.expansion(range.begin), sm.expansion(range.end)) {
        if b.file == e.file && e.offset < b.offset {
            return SourceRange::new(range.end, range.begin);
        }
    }
    range
}

/// Hex name used as the `id=` attribute and `#` fragment of an object.
/// Sixteen digits when the spelling key is absent or matches the expansion
/// key, thirty-two (spelling then expansion) otherwise.
pub fn id_name(objid: ObjectId) -> String {
    if objid.begin == 0 || objid.begin == objid.end {
        return format!("{:016x}", objid.end);
    }
    format!("{:016x}{:016x}", objid.begin, objid.end)
}

/// `<relative html path of the file> "#" <id name>`.
pub fn id_link(file_hash: u64, objid: ObjectId) -> String {
    format!("{}#{}", html_path(file_hash, ".html"), id_name(objid))
}

/// Path of a rendered document inside the output tree: `xx/yyyy<ext>` where
/// `xx` is the last two hex digits of the path hash.
pub fn output_path(hash: u64, extension: &str) -> String {
    let hex = format!("{:016x}", hash);
    format!("{}/{}{}", &hex[14..], &hex[..14], extension)
}

/// Relative href from one rendered document to another.
pub fn html_path(hash: u64, extension: &str) -> String {
    format!("../{}", output_path(hash, extension))
}

/// Path the generator writes a rendered document to.
pub fn source_path(hash: u64, extension: &str) -> String {
    format!("output/sources/{}", output_path(hash, extension))
}

/// Path of a meta document (entry points, about pages).
pub fn meta_path(name: &str) -> String {
    format!("output/sources/meta/{}", name)
}

/// `line:column` quadruple recovered from an expansion key, formatted the
/// way locations are shown in logs and in `symbols.json`.
pub fn format_key(key: u64) -> String {
    format!(
        "{}:{}-{}:{}",
        (key >> BEGIN_LINE_SHIFT) & LINE_MASK,
        (key >> BEGIN_COLUMN_SHIFT) & COLUMN_MASK,
        (key >> END_LINE_SHIFT) & LINE_MASK,
        (key >> END_COLUMN_SHIFT) & COLUMN_MASK
    )
}
