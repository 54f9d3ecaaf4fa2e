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

//! Serialises the in-memory cross-reference graph into the on-disk index.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use anyhow::{Context, Result};

use crate::counters::Counters;
use crate::locmap::{self, ObjectId};
use crate::registry::FileRegistry;
use crate::xref::{Id, Properties, Provider, XrefIndex, FLAG_DEFINITION};

use super::{artifact_name, SYMBOL_DETAIL_HEADER, SYMBOL_DETAIL_KIND, SYMBOL_DETAIL_PROVIDER};

/// Grouping key below a symbol name: same kind, linkage and access land in
/// one bucket. Ordered by kind content.
#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct LinkKey {
    kind: Vec<u8>,
    linkage: u8,
    access: u8,
}

/// Ids are ordered by file path, then packed range.
type IdKey<'a> = (&'a str, ObjectId);

struct KindGroup<'a> {
    kind_offset: u32,
    ids: BTreeMap<IdKey<'a>, &'a Properties>,
}

struct Symbol<'a> {
    score: u64,
    kinds: BTreeMap<LinkKey, KindGroup<'a>>,
}

/// Emit the whole on-disk index into `dir`. The counters snapshot goes out
/// before `symbols.json`: the JSON mirror is written last on purpose, the
/// UI watches its timestamp.
pub fn write_binary_index(
    dir: &Path,
    tag: &str,
    index: &XrefIndex,
    registry: &FileRegistry,
    counters: &Counters,
) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create index directory {}", dir.display()))?;

    // 1) Re-index by provider name rather than unique identifier.
    let mut locations: BTreeMap<&[u8], Symbol<'_>> = BTreeMap::new();
    let mut allfiles: BTreeMap<u32, u32> = BTreeMap::new();

    for (id, properties) in index.iter() {
        for provider in &properties.providers {
            allfiles.insert(provider.location.file.0, 0);
            let symbol = locations
                .entry(index.names.read(provider.name))
                .or_insert_with(|| Symbol {
                    score: 0,
                    kinds: BTreeMap::new(),
                });
            let group = symbol
                .kinds
                .entry(LinkKey {
                    kind: index.kinds.read(provider.kind).to_vec(),
                    linkage: provider.linkage,
                    access: provider.access,
                })
                .or_insert_with(|| KindGroup {
                    kind_offset: provider.kind,
                    ids: BTreeMap::new(),
                });
            group.ids.insert(id_key(registry, id), properties);
        }
    }

    // 2) Score: distinct files with users in the high word, total user
    // count in the low word. Second pass so the sets stay short-lived.
    for symbol in locations.values_mut() {
        let mut files: HashSet<u32> = HashSet::new();
        let mut appearances: u32 = 0;
        for group in symbol.kinds.values() {
            for properties in group.ids.values() {
                for user in &properties.users {
                    files.insert(user.location.file.0);
                    appearances = appearances.wrapping_add(1);
                }
            }
        }
        symbol.score = ((files.len() as u64) << 32) | appearances as u64;
        for file in files {
            allfiles.entry(file).or_insert(0);
        }
    }

    let json = symbols_json(&locations, index, registry);

    // 3) Shortest symbols first; within a length the best-scored first;
    // ties resolved by name.
    let mut symbols: Vec<(&[u8], Symbol<'_>)> = locations.into_iter().collect();
    symbols.sort_by(|(aname, asym), (bname, bsym)| {
        aname
            .len()
            .cmp(&bname.len())
            .then_with(|| bsym.score.cmp(&asym.score))
            .then_with(|| aname.cmp(bname))
    });

    // 4) File table; remember each file's offset for back-references.
    let mut files_buf: Vec<u8> = Vec::new();
    for (file_raw, offset) in allfiles.iter_mut() {
        let entry = registry.file(crate::registry::FileId(*file_raw));
        let path = registry.user_path(&entry.path);
        if path.len() > u16::MAX as usize {
            log::error!("path {} longer than u16, cannot be added to index", path);
            continue;
        }
        *offset = files_buf.len() as u32;
        files_buf.extend(&entry.hash.to_le_bytes());
        files_buf.extend(&(path.len() as u16).to_le_bytes());
        files_buf.extend(path.as_bytes());
    }

    // 5) + 6) Symbol names and their detail blocks.
    let mut sym_buf: Vec<u8> = Vec::new();
    let mut det_buf: Vec<u8> = Vec::new();
    let mut hash_rows: Vec<(u64, u32)> = Vec::new();

    for (name, symbol) in &symbols {
        if name.len() > u16::MAX as usize {
            log::error!(
                "symbol {} longer than u16, cannot be added to index",
                String::from_utf8_lossy(name)
            );
            continue;
        }
        if symbol.kinds.len() > u16::MAX as usize {
            log::error!(
                "too many instantiations for {}, cannot be added to index",
                String::from_utf8_lossy(name)
            );
            continue;
        }

        let name_offset = sym_buf.len() as u32;
        let detail_offset = det_buf.len() as u32;
        let name_hash = crate::strpool::fnv64(name);
        hash_rows.push((name_hash, detail_offset));

        sym_buf.extend(&detail_offset.to_le_bytes());
        sym_buf.extend(&(name.len() as u16).to_le_bytes());
        sym_buf.extend(*name);

        det_buf.extend(&name_offset.to_le_bytes());
        det_buf.extend(&name_hash.to_le_bytes());
        det_buf.extend(&(symbol.kinds.len() as u16).to_le_bytes());
        debug_assert_eq!(
            det_buf.len(),
            detail_offset as usize + SYMBOL_DETAIL_HEADER
        );

        for (link, group) in &symbol.kinds {
            let mut defs: BTreeMap<IdKey<'_>, &Provider> = BTreeMap::new();
            let mut decls: BTreeMap<IdKey<'_>, &Provider> = BTreeMap::new();
            for properties in group.ids.values() {
                for provider in &properties.providers {
                    if index.names.read(provider.name) != *name {
                        continue;
                    }
                    let key = id_key(registry, &provider.location);
                    if provider.flags & FLAG_DEFINITION != 0 {
                        defs.entry(key).or_insert(provider);
                    } else {
                        decls.entry(key).or_insert(provider);
                    }
                }
            }

            let mut def_count = defs.len();
            if def_count > u16::MAX as usize {
                log::error!(
                    "symbol {} has too many definitions, dropping them from the index",
                    String::from_utf8_lossy(name)
                );
                def_count = 0;
            }
            let mut decl_count = decls.len();
            if decl_count > u16::MAX as usize {
                log::error!(
                    "symbol {} has too many declarations, dropping them from the index",
                    String::from_utf8_lossy(name)
                );
                decl_count = 0;
            }

            let kind_at = det_buf.len();
            det_buf.extend(&group.kind_offset.to_le_bytes());
            det_buf.push(link.linkage);
            det_buf.push(link.access);
            det_buf.extend(&(def_count as u16).to_le_bytes());
            det_buf.extend(&(decl_count as u16).to_le_bytes());
            debug_assert_eq!(det_buf.len(), kind_at + SYMBOL_DETAIL_KIND);

            if def_count > 0 {
                for provider in defs.values() {
                    write_provider(&mut det_buf, provider, &allfiles, registry);
                }
            }
            if decl_count > 0 {
                for provider in decls.values() {
                    write_provider(&mut det_buf, provider, &allfiles, registry);
                }
            }
        }
    }

    // 7) Hash table for binary search.
    hash_rows.sort_unstable();
    let mut hash_buf: Vec<u8> = Vec::with_capacity(hash_rows.len() * 12);
    for (hash, offset) in &hash_rows {
        hash_buf.extend(&hash.to_le_bytes());
        hash_buf.extend(&offset.to_le_bytes());
    }

    let write = |suffix: &str, bytes: &[u8]| -> Result<()> {
        let path = dir.join(artifact_name(tag, suffix));
        std::fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))
    };
    write("files", &files_buf)?;
    write("symbol-details", &sym_buf)?;
    write("details", &det_buf)?;
    write("hash-details", &hash_buf)?;
    // 8) The raw arenas the stored offsets point into.
    write("snippets", index.snippets.storage())?;
    write("strings", index.kinds.storage())?;

    counters.write_json(&dir.join(artifact_name(tag, "counters.json")))?;

    // 9) Readable mirror, last.
    let json_path = dir.join(artifact_name(tag, "symbols.json"));
    let file = std::fs::File::create(&json_path)
        .with_context(|| format!("write {}", json_path.display()))?;
    serde_json::to_writer_pretty(file, &json)?;

    log::info!(
        "index written to {}: {} symbols, {} files",
        dir.display(),
        symbols.len(),
        allfiles.len()
    );
    Ok(())
}

fn id_key<'a>(registry: &'a FileRegistry, id: &Id) -> IdKey<'a> {
    (registry.file(id.file).path.as_str(), id.object)
}

fn write_provider(
    out: &mut Vec<u8>,
    provider: &Provider,
    allfiles: &BTreeMap<u32, u32>,
    registry: &FileRegistry,
) {
    let file_offset = match allfiles.get(&provider.location.file.0) {
        Some(offset) => *offset,
        None => {
            log::error!(
                "file {} not in the index file table, leaving offset 0",
                registry.file(provider.location.file).path
            );
            0
        }
    };
    let before = out.len();
    out.extend(&provider.location.file_hash.to_le_bytes());
    out.extend(&file_offset.to_le_bytes());
    out.extend(&provider.location.object.begin.to_le_bytes());
    out.extend(&provider.location.object.end.to_le_bytes());
    out.extend(&provider.snippet.to_le_bytes());
    debug_assert_eq!(out.len(), before + SYMBOL_DETAIL_PROVIDER);
}

/// The `symbols.json` mirror: per name, per (kind, linkage, access) bucket,
/// the deduplicated defs, decls and users.
fn symbols_json(
    locations: &BTreeMap<&[u8], Symbol<'_>>,
    index: &XrefIndex,
    registry: &FileRegistry,
) -> serde_json::Value {
    let mut data = Vec::with_capacity(locations.len());
    for (name, symbol) in locations {
        let mut kinds = Vec::with_capacity(symbol.kinds.len());
        for (link, group) in &symbol.kinds {
            let mut entry = serde_json::Map::new();
            entry.insert(
                "kind".into(),
                String::from_utf8_lossy(&link.kind).into_owned().into(),
            );
            entry.insert("linkage".into(), link.linkage.into());
            if link.access != crate::front::ACCESS_UNSET && link.access != crate::front::ACCESS_NONE
            {
                entry.insert("access".into(), link.access.into());
            }

            let mut defs = Vec::new();
            let mut decls = Vec::new();
            let mut seen_defs: BTreeSet<IdKey<'_>> = BTreeSet::new();
            let mut seen_decls: BTreeSet<IdKey<'_>> = BTreeSet::new();
            for properties in group.ids.values() {
                for provider in &properties.providers {
                    if index.names.read(provider.name) != *name {
                        continue;
                    }
                    let key = id_key(registry, &provider.location);
                    let (list, seen) = if provider.flags & FLAG_DEFINITION != 0 {
                        (&mut defs, &mut seen_defs)
                    } else {
                        (&mut decls, &mut seen_decls)
                    };
                    if !seen.insert(key) {
                        continue;
                    }
                    list.push(serde_json::json!({
                        "href": id_href(registry, &provider.location),
                        "location": id_location(registry, &provider.location),
                        "snippet": String::from_utf8_lossy(index.snippets.read(provider.snippet)),
                    }));
                }
            }

            let mut users = Vec::new();
            let mut seen_users: BTreeSet<IdKey<'_>> = BTreeSet::new();
            for properties in group.ids.values() {
                for user in &properties.users {
                    if !seen_users.insert(id_key(registry, &user.location)) {
                        continue;
                    }
                    users.push(serde_json::json!({
                        "href": id_href(registry, &user.location),
                        "location": id_location(registry, &user.location),
                    }));
                }
            }

            entry.insert("defs".into(), defs.into());
            entry.insert("decls".into(), decls.into());
            entry.insert("users".into(), users.into());
            kinds.push(serde_json::Value::Object(entry));
        }

        data.push(serde_json::json!({
            "name": String::from_utf8_lossy(name),
            "kinds": kinds,
        }));
    }
    serde_json::json!({ "data": data })
}

fn id_href(registry: &FileRegistry, id: &Id) -> String {
    locmap::id_link(registry.file(id.file).hash, id.object)
}

fn id_location(registry: &FileRegistry, id: &Id) -> String {
    let formatted = format!(
        "{}:{}",
        registry.file(id.file).path,
        locmap::format_key(id.object.end)
    );
    registry.user_path(&formatted).to_string()
}
