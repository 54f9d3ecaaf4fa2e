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

//! Per-file rewrite buffer: collects byte-range wrap requests during
//! indexing and renders them into well-nested HTML in one pass over the
//! original bytes.
//!
//! Tags must nest: `<a><span></span></a>`. At one offset, the tag that
//! closes last must open first, and the tag that opened last must close
//! first. Insertion order carries no meaning; containment alone decides
//! the output.

use std::collections::BTreeMap;

use crate::strpool::StrPool;

/// A planned HTML element spanning a byte range of the original file.
/// `attrs` is a handle into the tag-attribute pool.
#[derive(Clone, Copy, Debug)]
pub struct Tag {
    pub element: &'static str,
    pub open: u32,
    pub close: u32,
    pub attrs: u32,
}

/// Render a `class='...' key='val'` attribute payload.
pub fn make_attrs(classes: &[&str], attributes: &[(&str, &str)]) -> String {
    let mut out = String::new();
    if !classes.is_empty() {
        out.push_str("class='");
        out.push_str(&classes.join(" "));
        out.push('\'');
    }
    for (key, value) in attributes {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(key);
        out.push_str("='");
        out.push_str(value);
        out.push('\'');
    }
    out
}

#[derive(Default)]
pub struct RewriteBuffer {
    tags: Vec<Tag>,
    /// Requests with inverted or out-of-range offsets, dropped at insertion.
    pub dropped: u64,
    /// Duplicate opens suppressed at render time.
    pub duplicates: u64,
}

struct TagSet {
    /// Tags to open here, largest close offset first.
    opens: Vec<Tag>,
    /// Tags to close here, keyed by `(open << 10) + emission order`; the
    /// largest key closes first so the most recently opened tag closes
    /// before the ones containing it.
    closes: Vec<(u64, &'static str)>,
}

impl TagSet {
    fn new() -> Self {
        TagSet {
            opens: Vec::new(),
            closes: Vec::new(),
        }
    }
}

impl RewriteBuffer {
    /// Queue a wrap request. `limit` is the file size; anything outside
    /// `0 <= open <= close <= limit` is dropped.
    pub fn add(&mut self, tag: Tag, limit: u32) {
        if tag.open > tag.close || tag.close > limit {
            self.dropped += 1;
            return;
        }
        self.tags.push(tag);
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    /// Render the collected tags over `body`, escaping `&`, `<`, `>` in the
    /// literal bytes. Consumes the tag list.
    pub fn render(&mut self, body: &[u8], pool: &StrPool) -> Vec<u8> {
        let mut sets: BTreeMap<u32, TagSet> = BTreeMap::new();
        for tag in std::mem::take(&mut self.tags) {
            self.add_open(&mut sets, tag);
        }

        let mut out = Vec::with_capacity(body.len() + body.len() / 4);
        let mut pos = 0usize;

        while let Some(&offset) = sets.keys().next() {
            let mut set = sets.remove(&offset).unwrap();

            let stop = (offset as usize).min(body.len());
            escape_into(&mut out, &body[pos..stop]);
            pos = stop;

            set.closes.sort_unstable_by(|a, b| b.0.cmp(&a.0));
            for (_, element) in &set.closes {
                close_tag(&mut out, element);
            }

            let mut order: u64 = 0;
            for tag in &set.opens {
                order += 1;
                out.push(b'<');
                out.extend_from_slice(tag.element.as_bytes());
                let attrs = pool.read(tag.attrs);
                if !attrs.is_empty() {
                    out.push(b' ');
                    out.extend_from_slice(attrs);
                }
                out.push(b'>');

                if tag.close as usize <= pos {
                    close_tag(&mut out, tag.element);
                } else {
                    sets.entry(tag.close)
                        .or_insert_with(TagSet::new)
                        .closes
                        .push((((tag.open as u64) << 10) + order, tag.element));
                }
            }
        }

        escape_into(&mut out, &body[pos..]);
        out
    }

    fn add_open(&mut self, sets: &mut BTreeMap<u32, TagSet>, tag: Tag) {
        let set = sets.entry(tag.open).or_insert_with(TagSet::new);
        for existing in &set.opens {
            if existing.close == tag.close
                && existing.element == tag.element
                && existing.attrs == tag.attrs
            {
                self.duplicates += 1;
                return;
            }
        }
        let at = set
            .opens
            .partition_point(|existing| existing.close >= tag.close);
        set.opens.insert(at, tag);
    }
}

fn close_tag(out: &mut Vec<u8>, element: &str) {
    out.extend_from_slice(b"</");
    out.extend_from_slice(element.as_bytes());
    out.push(b'>');
}

pub fn escape_into(out: &mut Vec<u8>, bytes: &[u8]) {
    let mut start = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        let entity: &[u8] = match b {
            b'&' => b"&amp;",
            b'<' => b"&lt;",
            b'>' => b"&gt;",
            _ => continue,
        };
        out.extend_from_slice(&bytes[start..i]);
        out.extend_from_slice(entity);
        start = i + 1;
    }
    out.extend_from_slice(&bytes[start..]);
}

pub fn escape_text(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    escape_into(&mut out, bytes);
    out
}
