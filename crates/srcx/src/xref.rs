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

//! The in-memory cross-reference graph: every annotated location maps to the
//! providers (declarations, definitions) contributing to it and the users
//! citing it.
//!
//! A large project has many symbols; keeping this map small matters.
//! Names, kinds and snippets are interned once, and entries carry pool
//! handles plus a couple of bytes of classification.

use std::collections::HashMap;

use crate::front::Linkage;
use crate::locmap::ObjectId;
use crate::registry::FileId;
use crate::strpool::StrPool;

/// The provider contributes a definition, not just a declaration.
pub const FLAG_DEFINITION: u8 = 1 << 0;

/// Identity of an annotated source object: which file, which packed range.
/// `file_hash` is carried so the hash matches the on-disk identity without
/// consulting the registry.
#[derive(Clone, Copy, Debug)]
pub struct Id {
    pub file: FileId,
    pub file_hash: u64,
    pub object: ObjectId,
}

impl PartialEq for Id {
    fn eq(&self, other: &Self) -> bool {
        self.file == other.file && self.object == other.object
    }
}

impl Eq for Id {}

impl std::hash::Hash for Id {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u64(self.file_hash ^ self.object.begin ^ (self.object.end << 9));
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Provider {
    pub flags: u8,
    pub location: Id,
    /// Handle into the name pool.
    pub name: u32,
    /// Handle into the kind pool.
    pub kind: u32,
    /// Handle into the snippet pool.
    pub snippet: u32,
    pub access: u8,
    pub linkage: u8,
}

#[derive(Clone, Copy, Debug)]
pub struct User {
    pub location: Id,
}

#[derive(Default)]
pub struct Properties {
    pub providers: Vec<Provider>,
    pub users: Vec<User>,
    pub exceptions: Vec<String>,
}

pub struct XrefIndex {
    map: HashMap<Id, Properties>,
    pub names: StrPool,
    pub kinds: StrPool,
    pub snippets: StrPool,
}

impl Default for XrefIndex {
    fn default() -> Self {
        XrefIndex::new()
    }
}

impl XrefIndex {
    pub fn new() -> Self {
        XrefIndex {
            map: HashMap::new(),
            names: StrPool::new("name"),
            kinds: StrPool::new("kind"),
            snippets: StrPool::new("snippet"),
        }
    }

    pub fn record_use(&mut self, target: Id, user: Id) {
        self.map.entry(target).or_default().users.push(User { location: user });
    }

    pub fn record_defines(
        &mut self,
        defined: Id,
        definer: Id,
        kind: &str,
        name: &str,
        snippet: &str,
        access: u8,
        linkage: Linkage,
    ) {
        let provider = Provider {
            flags: FLAG_DEFINITION,
            location: definer,
            name: self.names.insert(name.as_bytes()),
            kind: self.kinds.insert(kind.as_bytes()),
            snippet: self.snippets.insert(snippet.as_bytes()),
            access,
            linkage: linkage as u8,
        };
        self.map.entry(defined).or_default().providers.push(provider);
    }

    pub fn record_declares(
        &mut self,
        declared: Id,
        declarer: Id,
        kind: &str,
        name: &str,
        snippet: &str,
        access: u8,
        linkage: Linkage,
    ) {
        let provider = Provider {
            flags: 0,
            location: declarer,
            name: self.names.insert(name.as_bytes()),
            kind: self.kinds.insert(kind.as_bytes()),
            snippet: self.snippets.insert(snippet.as_bytes()),
            access,
            linkage: linkage as u8,
        };
        self.map.entry(declared).or_default().providers.push(provider);
    }

    pub fn record_exception(&mut self, target: Id, exception: String) {
        self.map.entry(target).or_default().exceptions.push(exception);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Id, &Properties)> {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, id: &Id) -> Option<&Properties> {
        self.map.get(id)
    }

    /// Release the graph and the pools between phases.
    pub fn clear(&mut self) {
        self.map = HashMap::new();
        self.names.clear();
        self.kinds.clear();
        self.snippets.clear();
    }
}
