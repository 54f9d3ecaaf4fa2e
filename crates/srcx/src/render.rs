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

//! The tree renderer.
//!
//! Two kinds of files flow through here: parsed files, annotated by the
//! engine and rendered through their rewrite buffer, and scanned files
//! (docs, images, whatever else lives in the tree), carried into the
//! output with minimal changes. Every document is a `.jhtml`: a one-line
//! navbar JSON object, a separator line, then the body. Directory
//! documents are pure JSON listings.

use std::path::Path;

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use regex::Regex;

use crate::counters::Counters;
use crate::front::{RawToken, SourceMap, TokenKind, UnitFileId};
use crate::lex;
use crate::locmap;
use crate::registry::{DirId, FileId, FileKind, FileRegistry};
use crate::rewrite::{escape_text, make_attrs, Tag};

pub const JHTML_SEPARATOR: &[u8] = b"\n---\n";

/// Mark a file the front-end parsed: remember its size and mtime, queue the
/// lexical highlight tags, and keep the original bytes as the body. The
/// actual HTML is produced once, at output time.
pub fn render_unit_file(
    registry: &mut FileRegistry,
    sm: &dyn SourceMap,
    unit_file: UnitFileId,
    tokens: &[RawToken],
) {
    let Some(path) = sm.file_path(unit_file) else {
        return;
    };
    let file = registry.file_for_path(path);
    if registry.file(file).rendered() {
        return;
    }

    let contents = sm.contents(unit_file);
    let (size, mtime) = match std::fs::metadata(path) {
        Ok(meta) => (meta.len(), meta.modified().ok()),
        Err(_) => (contents.len() as u64, None),
    };
    {
        let entry = registry.file_mut(file);
        entry.kind = FileKind::Parsed;
        entry.size = size;
        entry.mtime = mtime;
        entry.body = contents.to_vec();
    }
    raw_highlight(registry, file, contents, tokens);
}

/// Queue highlight spans for the raw token stream: keywords, comments,
/// literals, and whole preprocessor-directive lines.
pub fn raw_highlight(registry: &mut FileRegistry, file: FileId, src: &[u8], tokens: &[RawToken]) {
    let limit = src.len() as u32;
    let mut wrap = |registry: &mut FileRegistry, classes: &[&str], open: u32, close: u32| {
        let attrs = registry.tag_pool.insert(make_attrs(classes, &[]).as_bytes());
        registry.file_mut(file).rewrite.add(
            Tag {
                element: "span",
                open,
                close,
                attrs,
            },
            limit,
        );
    };

    let mut i = 0usize;
    while i < tokens.len() {
        let token = tokens[i];
        let end = token.offset + token.len;
        match token.kind {
            TokenKind::Keyword => {
                let word = &src[token.offset as usize..end as usize];
                let name = std::str::from_utf8(word).unwrap_or("");
                wrap(registry, &["keyword", name], token.offset, end);
            }
            TokenKind::Comment => wrap(registry, &["comment"], token.offset, end),
            TokenKind::Str => wrap(registry, &["string"], token.offset, end),
            TokenKind::Char => wrap(registry, &["char"], token.offset, end),
            TokenKind::Numeric => wrap(registry, &["numeric"], token.offset, end),
            TokenKind::Hash if token.at_line_start => {
                // The directive runs to the last token before the next
                // line-start token; those tokens get no spans of their own.
                let mut close = end;
                let mut j = i + 1;
                while j < tokens.len() && !tokens[j].at_line_start {
                    close = tokens[j].offset + tokens[j].len;
                    j += 1;
                }
                wrap(registry, &["directive"], token.offset, close);
                i = j;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
}

/// Walk `scandir` picking up everything the parse phase did not touch.
/// Directory access is an input error: a failed walk aborts the run.
pub fn scan_tree(
    registry: &mut FileRegistry,
    counters: &mut Counters,
    scandir: &Path,
    exclude: Option<&Regex>,
) -> Result<()> {
    let mut builder = WalkBuilder::new(scandir);
    builder.standard_filters(false).hidden(true);
    if let Some(exclude) = exclude {
        let exclude = exclude.clone();
        builder.filter_entry(move |entry| !exclude.is_match(&entry.path().to_string_lossy()));
    }

    for entry in builder.build() {
        let entry = entry.with_context(|| format!("scan directory {}", scandir.display()))?;
        let path = entry
            .path()
            .canonicalize()
            .unwrap_or_else(|_| entry.path().to_path_buf());
        let path_str = path.to_string_lossy();

        let Some(file_type) = entry.file_type() else { continue };
        if file_type.is_dir() {
            log::debug!("scanning {}", path_str);
            registry.dir_for_path(&path_str);
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let file = registry.file_for_path(&path_str);
        if registry.file(file).rendered() {
            continue;
        }
        let Ok(meta) = std::fs::metadata(&path) else {
            counters.bump("render/scan/stat-failed", "Files that could not be stat()ed");
            log::warn!("could not stat {}", path_str);
            continue;
        };
        {
            let entry = registry.file_mut(file);
            entry.size = meta.len();
            entry.mtime = meta.modified().ok();
        }
        if let Err(err) = read_scanned_file(registry, file) {
            counters.bump("render/scan/read-failed", "Files that could not be read");
            log::warn!("could not read {}: {}", path_str, err);
        }
    }
    Ok(())
}

fn read_scanned_file(registry: &mut FileRegistry, file: FileId) -> Result<()> {
    let path = registry.file(file).path.clone();
    let data = std::fs::read(&path).with_context(|| format!("read {}", path))?;
    let prefix = &data[..data.len().min(16)];
    let (kind, extension) = classify(&registry.file(file).name, prefix);

    let entry = registry.file_mut(file);
    entry.kind = kind;
    match kind {
        FileKind::Binary => entry.body = b"&lt;unparsable blob&gt;".to_vec(),
        FileKind::Printable | FileKind::Utf8 => entry.body = escape_text(&data),
        FileKind::Media => {
            entry.body = data;
            if let Some(extension) = extension {
                entry.extension = extension;
            }
        }
        FileKind::Html => entry.body = data,
        _ => {}
    }
    Ok(())
}

const HTML_EXTENSIONS: &[&str] = &[".htm", ".html", ".svg"];
const MEDIA_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpeg", ".jpg", ".png", ".gif", ".gifv", ".bmp", ".webm", ".mkv", ".flv", ".vob",
    ".ogv", ".ogg", ".mp3", ".avi", ".mov", ".wmv", ".rm", ".mp4", ".m4v", ".m4p", ".mpg",
    ".mpeg", ".3gp",
];

fn classify(name: &str, prefix: &[u8]) -> (FileKind, Option<&'static str>) {
    if let Some(dot) = name.rfind('.') {
        let ext = name[dot..].to_ascii_lowercase();
        for &known in HTML_EXTENSIONS {
            if known == ext {
                return (FileKind::Html, Some(known));
            }
        }
        for &known in MEDIA_EXTENSIONS {
            if known == ext {
                return (FileKind::Media, Some(known));
            }
        }
    }

    let mut ascii = 0usize;
    for &b in prefix {
        if b.is_ascii() {
            if !b.is_ascii_graphic() && !b.is_ascii_whitespace() && b != b' ' {
                return (FileKind::Binary, None);
            }
            ascii += 1;
        }
    }
    if ascii == prefix.len() {
        return (FileKind::Printable, None);
    }
    match std::str::from_utf8(prefix) {
        Ok(_) => (FileKind::Utf8, None),
        // A multi-byte sequence cut off by the prefix window is still text.
        Err(err) if err.error_len().is_none() => (FileKind::Utf8, None),
        Err(_) => (FileKind::Binary, None),
    }
}

/// Emit every directory and file document, breadth-first from the root.
pub fn output_tree(
    registry: &mut FileRegistry,
    counters: &mut Counters,
    project: &str,
    tag: &str,
) -> Result<()> {
    for dir in registry.dirs_breadth_first() {
        if let Err(err) = output_jdirectory(registry, dir, project, tag) {
            log::error!("could not output directory {}: {}", registry.dir(dir).path, err);
        }
        let files: Vec<FileId> = registry.dir(dir).files.values().copied().collect();
        for file in files {
            if let Err(err) = output_jfile(registry, counters, dir, file, project, tag) {
                log::error!("could not output file {}: {}", registry.file(file).path, err);
            }
        }
    }
    Ok(())
}

fn output_jfile(
    registry: &mut FileRegistry,
    counters: &mut Counters,
    parent: DirId,
    file: FileId,
    project: &str,
    tag: &str,
) -> Result<()> {
    if registry.file(file).kind == FileKind::Media {
        // Media keeps its original extension so the browser plays it.
        let path = registry.file(file).source_path(None);
        make_parent_dirs(&path)?;
        std::fs::write(&path, &registry.file(file).body)
            .with_context(|| format!("write {}", path))?;
        return Ok(());
    }

    let path = registry.file(file).source_path(Some(".jhtml"));
    log::debug!("generating file {} -> {}", registry.file(file).path, path);
    make_parent_dirs(&path)?;

    // Parsed bodies go through the rewrite buffer exactly once.
    if registry.file(file).kind == FileKind::Parsed {
        let (body, mut rewrite) = {
            let entry = registry.file_mut(file);
            (std::mem::take(&mut entry.body), std::mem::take(&mut entry.rewrite))
        };
        let rendered = rewrite.render(&body, &registry.tag_pool);
        if rewrite.dropped > 0 {
            counters.add(
                "rewrite/tags/dropped",
                "Wrap requests with invalid offsets",
                rewrite.dropped,
            );
        }
        if rewrite.duplicates > 0 {
            counters.add(
                "rewrite/tags/duplicate",
                "Duplicate wrap requests suppressed",
                rewrite.duplicates,
            );
        }
        let entry = registry.file_mut(file);
        entry.body = rendered;
        entry.kind = FileKind::Generated;
    }

    let entry = registry.file(file);
    let navbar = navbar_json(registry, &entry.name, &entry.path, None, Some(parent), project, tag);

    let mut out = serde_json::to_string(&navbar)?.into_bytes();
    out.extend_from_slice(JHTML_SEPARATOR);
    match entry.kind {
        FileKind::Html => out.extend(escape_text(&entry.body)),
        _ => out.extend_from_slice(&entry.body),
    }
    std::fs::write(&path, out).with_context(|| format!("write {}", path))
}

fn output_jdirectory(
    registry: &FileRegistry,
    dir: DirId,
    project: &str,
    tag: &str,
) -> Result<()> {
    let entry = registry.dir(dir);
    let path = entry.source_path(".jhtml");
    log::debug!("generating dir {} -> {}", entry.path, path);
    make_parent_dirs(&path)?;

    let mut doc = navbar_json(
        registry,
        &entry.name,
        &entry.path,
        Some(dir),
        entry.parent,
        project,
        tag,
    );

    let mut files = Vec::with_capacity(entry.files.len());
    for (name, &file) in &entry.files {
        let descriptor = registry.file(file);
        files.push(serde_json::json!({
            "name": name,
            "type": descriptor.kind.listing_tag(),
            "href": descriptor.html_path(),
            "mtime": format_mtime(descriptor.mtime),
            "size": human_size(descriptor.size),
        }));
    }
    if !files.is_empty() {
        doc.insert("files".into(), files.into());
    }

    let listable_parent =
        entry.parent.is_some() && dir != registry.abs_root() && dir != registry.strip_root();
    if !entry.dirs.is_empty() || listable_parent {
        let mut dirs = Vec::with_capacity(entry.dirs.len() + 1);
        if listable_parent {
            if let Some(parent) = entry.parent {
                let parent_entry = registry.dir(parent);
                dirs.push(serde_json::json!({
                    "href": parent_entry.html_path(),
                    "size": parent_entry.files.len(),
                    "name": "..",
                }));
            }
        }
        for (name, &child) in &entry.dirs {
            let child_entry = registry.dir(child);
            dirs.push(serde_json::json!({
                "href": child_entry.html_path(),
                "size": child_entry.files.len(),
                "name": name,
            }));
        }
        doc.insert("dirs".into(), dirs.into());
    }

    let out = serde_json::to_string(&serde_json::Value::Object(doc))?;
    std::fs::write(&path, out).with_context(|| format!("write {}", path))
}

/// Navbar fields shared by file and directory documents: the current name
/// and user-visible path, the root link, and the parent chain from the top
/// down (the root and the document itself excluded).
fn navbar_json(
    registry: &FileRegistry,
    name: &str,
    path: &str,
    current: Option<DirId>,
    parent: Option<DirId>,
    project: &str,
    tag: &str,
) -> serde_json::Map<String, serde_json::Value> {
    let strip = registry.strip_root();
    let mut root = strip;
    let mut stack: Vec<DirId> = Vec::new();
    let mut cursor = current.or(parent);
    while let Some(node) = cursor {
        if node == strip {
            break;
        }
        match registry.dir(node).parent {
            None => {
                root = node;
                break;
            }
            Some(up) => {
                if Some(node) != current {
                    stack.push(node);
                }
                cursor = Some(up);
            }
        }
    }

    let mut parents = Vec::with_capacity(stack.len());
    while let Some(node) = stack.pop() {
        let entry = registry.dir(node);
        parents.push(serde_json::json!({
            "name": entry.name,
            "href": entry.html_path(),
        }));
    }

    let mut doc = serde_json::Map::new();
    doc.insert("name".into(), name.into());
    doc.insert("path".into(), registry.user_path(path).into());
    doc.insert("root".into(), registry.dir(root).html_path().into());
    doc.insert("project".into(), project.into());
    doc.insert("tag".into(), tag.into());
    doc.insert("parents".into(), parents.into());
    doc
}

/// Flat JSON view of the whole tree, for the navbar's search box.
pub fn output_json_tree(registry: &FileRegistry, index_dir: &Path, tag: &str) -> Result<()> {
    let mut data = Vec::new();
    for dir in registry.dirs_breadth_first() {
        let entry = registry.dir(dir);
        let mut row = serde_json::Map::new();
        row.insert("dir".into(), registry.user_path(&entry.path).into());
        row.insert("href".into(), entry.html_path().into());
        if let Some(parent) = entry.parent {
            row.insert("parent".into(), registry.dir(parent).html_path().into());
        }
        data.push(serde_json::Value::Object(row));

        for &file in entry.files.values() {
            let descriptor = registry.file(file);
            data.push(serde_json::json!({
                "file": registry.user_path(&descriptor.path),
                "parent": entry.html_path(),
                "href": descriptor.html_path(),
            }));
        }
    }

    let path = index_dir.join(crate::index::artifact_name(tag, "files.json"));
    let file = std::fs::File::create(&path).with_context(|| format!("write {}", path.display()))?;
    serde_json::to_writer_pretty(file, &serde_json::json!({ "data": data }))?;
    Ok(())
}

/// Point `output/sources/meta/index.jhtml` at the entry directory document.
#[cfg(unix)]
pub fn write_entry_symlink(registry: &mut FileRegistry, scandir: &str) -> Result<()> {
    let entry_dir = registry.dir_for_path(scandir);
    let target = locmap::html_path(registry.dir(entry_dir).hash, ".jhtml");

    let link = locmap::meta_path("index.jhtml");
    make_parent_dirs(&link)?;
    let _ = std::fs::remove_file(&link);
    std::os::unix::fs::symlink(&target, &link)
        .with_context(|| format!("symlink {} -> {}", link, target))?;
    log::info!("entry point {} aka {}", link, target);
    Ok(())
}

#[cfg(not(unix))]
pub fn write_entry_symlink(_registry: &mut FileRegistry, _scandir: &str) -> Result<()> {
    Ok(())
}

fn make_parent_dirs(path: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directories for {}", path))?;
    }
    Ok(())
}

pub fn format_mtime(mtime: Option<std::time::SystemTime>) -> String {
    match mtime {
        Some(time) => chrono::DateTime::<chrono::Local>::from(time)
            .format("%a %b %e %H:%M:%S %Y")
            .to_string(),
        None => String::new(),
    }
}

pub fn human_size(value: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    let v = value as f64;
    if value > TB {
        format!("{:.2} Tb", v / TB as f64)
    } else if value > GB {
        format!("{:.2} Gb", v / GB as f64)
    } else if value > MB {
        format!("{:.2} Mb", v / MB as f64)
    } else if value > KB {
        format!("{:.2} Kb", v / KB as f64)
    } else {
        format!("{} bytes", value)
    }
}

/// Raw-lex a file that never went through a front-end. Used by tests and by
/// callers that want highlighting without a parse.
pub fn highlight_source(registry: &mut FileRegistry, file: FileId, src: &[u8]) {
    let tokens = lex::raw_tokens(src);
    raw_highlight(registry, file, src, &tokens);
}
