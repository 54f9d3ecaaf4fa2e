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

//! Append-only interned string arenas.
//!
//! Each pool stores strings as `[u32 length LE][bytes]` in one growing byte
//! buffer. The `u32` byte offset of a record is its public handle: stable for
//! the lifetime of the pool, and directly usable by the on-disk index, which
//! dumps the raw arena and keeps the offsets.

use std::collections::HashMap;

/// Hash used for string deduplication, path identity and the symbol hash in
/// the on-disk index. Multiply-then-xor over the FNV-1a constants.
pub fn fnv64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash = hash.wrapping_mul(0x100_0000_01b3);
        hash ^= b as u64;
    }
    hash
}

pub struct StrPool {
    name: &'static str,
    arena: Vec<u8>,
    // content hash -> offsets of entries with that hash
    dedup: HashMap<u64, Vec<u32>>,
    elements: u64,
    saved_bytes: u64,
    saved_strings: u64,
}

impl StrPool {
    pub fn new(name: &'static str) -> Self {
        StrPool {
            name,
            arena: Vec::new(),
            dedup: HashMap::new(),
            elements: 0,
            saved_bytes: 0,
            saved_strings: 0,
        }
    }

    /// Intern `bytes`, returning the offset of its record. The allocation is
    /// tentative: if the pool already holds identical content the fresh
    /// record is rolled back off the tail and the existing offset returned.
    pub fn insert(&mut self, bytes: &[u8]) -> u32 {
        let offset = self.allocate(bytes);
        let hash = fnv64(bytes);

        let candidates = self.dedup.entry(hash).or_default();
        for &existing in candidates.iter() {
            if read_at(&self.arena, existing) == bytes {
                self.saved_bytes += bytes.len() as u64;
                self.saved_strings += 1;
                let len = bytes.len() as u32;
                rollback_if_last(&mut self.arena, offset, len + 4);
                self.elements -= 1;
                return existing;
            }
        }
        candidates.push(offset);
        offset
    }

    /// Read back the bytes stored at `offset`.
    pub fn read(&self, offset: u32) -> &[u8] {
        read_at(&self.arena, offset)
    }

    /// Truncate a tentative allocation if it is still the tail of the arena.
    /// `size` includes the length prefix.
    pub fn rollback_if_last(&mut self, offset: u32, size: u32) -> bool {
        rollback_if_last(&mut self.arena, offset, size)
    }

    pub fn clear(&mut self) {
        log::debug!(
            "{}: clearing pool, {} bytes, {} entries, saved {} bytes / {} strings",
            self.name,
            self.arena.len(),
            self.elements,
            self.saved_bytes,
            self.saved_strings
        );
        self.arena = Vec::new();
        self.dedup = HashMap::new();
        self.elements = 0;
        self.saved_bytes = 0;
        self.saved_strings = 0;
    }

    /// Raw arena contents, including the length prefixes. This is the exact
    /// byte sequence the serializer dumps to disk.
    pub fn storage(&self) -> &[u8] {
        &self.arena
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn element_count(&self) -> u64 {
        self.elements
    }

    fn allocate(&mut self, bytes: &[u8]) -> u32 {
        let offset = self.arena.len() as u32;
        self.arena.extend(&(bytes.len() as u32).to_le_bytes());
        self.arena.extend_from_slice(bytes);
        self.elements += 1;
        offset
    }
}

fn read_at(arena: &[u8], offset: u32) -> &[u8] {
    let start = offset as usize;
    let len = u32::from_le_bytes(arena[start..start + 4].try_into().unwrap()) as usize;
    &arena[start + 4..start + 4 + len]
}

fn rollback_if_last(arena: &mut Vec<u8>, offset: u32, size: u32) -> bool {
    if (offset + size) as usize == arena.len() {
        arena.truncate(offset as usize);
        return true;
    }
    false
}
