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

//! The file registry: every file and directory the run touches, keyed by
//! canonical path, alive for the whole run.
//!
//! Files are discovered twice over: mentioned by the front-end while
//! parsing, and found by the directory scan afterwards. Both paths land
//! here. Descriptors are owned by the registry and addressed by stable
//! `FileId`/`DirId` indices; the cross-reference index and the renderer
//! never own them.

use std::collections::BTreeMap;
use std::time::SystemTime;

use crate::locmap;
use crate::rewrite::RewriteBuffer;
use crate::strpool::{fnv64, StrPool};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FileId(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DirId(pub u32);

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum FileKind {
    #[default]
    Unknown,
    Binary,
    Parsed,
    Generated,
    Printable,
    Utf8,
    Media,
    Html,
}

impl FileKind {
    /// Tag shown in directory listings.
    pub fn listing_tag(self) -> &'static str {
        match self {
            FileKind::Media => "media",
            FileKind::Utf8 | FileKind::Printable | FileKind::Html => "text",
            FileKind::Parsed | FileKind::Generated => "parsed",
            FileKind::Unknown | FileKind::Binary => "blob",
        }
    }
}

pub struct FileEntry {
    pub parent: DirId,
    pub name: String,
    pub path: String,
    pub hash: u64,
    pub size: u64,
    pub mtime: Option<SystemTime>,
    /// Extension of the rendered artifact. Media files keep their own.
    pub extension: &'static str,
    pub kind: FileKind,
    pub preprocessing: bool,
    pub preprocessed: bool,
    pub rewrite: RewriteBuffer,
    pub body: Vec<u8>,
}

impl FileEntry {
    /// A file is rendered once its kind has been decided; annotation passes
    /// over later translation units skip it.
    pub fn rendered(&self) -> bool {
        self.kind != FileKind::Unknown
    }

    pub fn html_path(&self) -> String {
        locmap::html_path(self.hash, self.extension)
    }

    pub fn source_path(&self, extension: Option<&str>) -> String {
        locmap::source_path(self.hash, extension.unwrap_or(self.extension))
    }
}

pub struct DirEntry {
    pub parent: Option<DirId>,
    pub name: String,
    pub path: String,
    pub hash: u64,
    pub dirs: BTreeMap<String, DirId>,
    pub files: BTreeMap<String, FileId>,
}

impl DirEntry {
    pub fn html_path(&self) -> String {
        locmap::html_path(self.hash, ".html")
    }

    pub fn source_path(&self, extension: &str) -> String {
        locmap::source_path(self.hash, extension)
    }
}

pub struct FileRegistry {
    dirs: Vec<DirEntry>,
    files: Vec<FileEntry>,
    strip: DirId,
    /// Attribute payloads of every queued tag, shared across files.
    pub tag_pool: StrPool,
    last_path: Option<(String, FileId)>,
}

const ABS_ROOT: DirId = DirId(0);

impl FileRegistry {
    /// `strip_prefix` is the directory hidden from user-visible paths,
    /// canonicalised against the filesystem when possible.
    pub fn new(strip_prefix: &str) -> Self {
        let mut registry = FileRegistry {
            dirs: vec![DirEntry {
                parent: None,
                name: String::new(),
                path: "/".to_string(),
                hash: fnv64(b"/"),
                dirs: BTreeMap::new(),
                files: BTreeMap::new(),
            }],
            files: Vec::new(),
            strip: ABS_ROOT,
            tag_pool: StrPool::new("tag"),
            last_path: None,
        };
        let canonical = std::fs::canonicalize(strip_prefix)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| strip_prefix.to_string());
        registry.strip = registry.dir_for_path(&canonical);
        registry
    }

    pub fn abs_root(&self) -> DirId {
        ABS_ROOT
    }

    pub fn strip_root(&self) -> DirId {
        self.strip
    }

    pub fn dir(&self, id: DirId) -> &DirEntry {
        &self.dirs[id.0 as usize]
    }

    pub fn file(&self, id: FileId) -> &FileEntry {
        &self.files[id.0 as usize]
    }

    pub fn file_mut(&mut self, id: FileId) -> &mut FileEntry {
        &mut self.files[id.0 as usize]
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn file_ids(&self) -> impl Iterator<Item = FileId> {
        (0..self.files.len() as u32).map(FileId)
    }

    /// Resolve a directory, creating any missing components. `.` and `..`
    /// are resolved against the tree; relative paths start at the strip
    /// root. Empty intermediate directories are possible, for paths like
    /// `/usr/include/linux/../foo`.
    pub fn dir_for_path(&mut self, path: &str) -> DirId {
        let mut node = if path.starts_with('/') { ABS_ROOT } else { self.strip };
        for component in path.split('/') {
            match component {
                "" | "." => continue,
                ".." => {
                    if let Some(parent) = self.dirs[node.0 as usize].parent {
                        node = parent;
                    }
                }
                name => {
                    node = self.subdir(node, name);
                }
            }
        }
        node
    }

    /// Resolve a file, creating the descriptor on first mention.
    pub fn file_for_path(&mut self, path: &str) -> FileId {
        if let Some((last, id)) = &self.last_path {
            if last == path {
                return *id;
            }
        }

        let (dirname, filename) = match path.rfind('/') {
            Some(slash) => (&path[..slash], &path[slash + 1..]),
            None => ("", path),
        };
        let dir = self.dir_for_path(dirname);
        let id = self.file_in_dir(dir, filename);
        self.last_path = Some((path.to_string(), id));
        id
    }

    /// Strip-prefix view of an absolute path; `/` when nothing remains.
    pub fn user_path<'a>(&self, path: &'a str) -> &'a str {
        let strip = &self.dirs[self.strip.0 as usize].path;
        if let Some(rest) = path.strip_prefix(strip.as_str()) {
            let rest = rest.strip_prefix('/').unwrap_or(rest);
            if rest.is_empty() {
                return "/";
            }
            return rest;
        }
        path
    }

    /// Directories in breadth-first order from the absolute root.
    pub fn dirs_breadth_first(&self) -> Vec<DirId> {
        let mut order = Vec::with_capacity(self.dirs.len());
        let mut queue = std::collections::VecDeque::from([ABS_ROOT]);
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &child in self.dirs[node.0 as usize].dirs.values() {
                queue.push_back(child);
            }
        }
        order
    }

    fn subdir(&mut self, parent: DirId, name: &str) -> DirId {
        if let Some(&existing) = self.dirs[parent.0 as usize].dirs.get(name) {
            return existing;
        }
        let parent_path = &self.dirs[parent.0 as usize].path;
        let path = if parent_path == "/" {
            format!("/{}", name)
        } else {
            format!("{}/{}", parent_path, name)
        };
        let id = DirId(self.dirs.len() as u32);
        self.dirs.push(DirEntry {
            parent: Some(parent),
            name: name.to_string(),
            path: path.clone(),
            hash: fnv64(path.as_bytes()),
            dirs: BTreeMap::new(),
            files: BTreeMap::new(),
        });
        self.dirs[parent.0 as usize].dirs.insert(name.to_string(), id);
        id
    }

    fn file_in_dir(&mut self, dir: DirId, name: &str) -> FileId {
        if let Some(&existing) = self.dirs[dir.0 as usize].files.get(name) {
            return existing;
        }
        let dir_path = &self.dirs[dir.0 as usize].path;
        let path = if dir_path == "/" {
            format!("/{}", name)
        } else {
            format!("{}/{}", dir_path, name)
        };
        let id = FileId(self.files.len() as u32);
        self.files.push(FileEntry {
            parent: dir,
            name: name.to_string(),
            path: path.clone(),
            hash: fnv64(path.as_bytes()),
            size: 0,
            mtime: None,
            extension: ".html",
            kind: FileKind::Unknown,
            preprocessing: false,
            preprocessed: false,
            rewrite: RewriteBuffer::default(),
            body: Vec::new(),
        });
        self.dirs[dir.0 as usize].files.insert(name.to_string(), id);
        id
    }
}
