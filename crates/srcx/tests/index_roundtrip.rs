//! Round-trips of the on-disk index: write the artifacts, map them back,
//! binary-search by name hash, decode the rows.

use srcx::counters::Counters;
use srcx::front::Linkage;
use srcx::index::{write_binary_index, IndexReader};
use srcx::locmap::{pack_key, ObjectId};
use srcx::registry::{FileId, FileRegistry};
use srcx::strpool::fnv64;
use srcx::xref::{Id, XrefIndex};

fn object(line: u32, column: u32, len: u32) -> ObjectId {
    let key = pack_key(line, column, line, column + len);
    ObjectId { begin: key, end: key }
}

fn id(registry: &FileRegistry, file: FileId, object: ObjectId) -> Id {
    Id {
        file,
        file_hash: registry.file(file).hash,
        object,
    }
}

struct Fixture {
    registry: FileRegistry,
    xref: XrefIndex,
}

/// Three symbols with distinct lengths and scores:
/// - `f`: used from two files, three times in total
/// - `g`: used once
/// - `longname`: never used
fn build() -> Fixture {
    let mut registry = FileRegistry::new("/proj");
    let main = registry.file_for_path("/proj/main.cc");
    let util = registry.file_for_path("/proj/util.cc");
    let mut xref = XrefIndex::new();

    let f_def = id(&registry, main, object(1, 5, 1));
    xref.record_defines(
        f_def,
        f_def,
        "Function",
        "f",
        "int f() { return 1; }",
        3,
        Linkage::External,
    );
    xref.record_use(f_def, id(&registry, main, object(10, 3, 1)));
    xref.record_use(f_def, id(&registry, main, object(11, 3, 1)));
    xref.record_use(f_def, id(&registry, util, object(4, 9, 1)));

    let g_def = id(&registry, main, object(2, 5, 1));
    xref.record_defines(g_def, g_def, "Function", "g", "int g();", 3, Linkage::External);
    xref.record_use(g_def, id(&registry, util, object(6, 1, 1)));

    let long_def = id(&registry, util, object(3, 6, 8));
    xref.record_declares(
        long_def,
        long_def,
        "Var",
        "longname",
        "extern int longname;",
        3,
        Linkage::External,
    );

    Fixture { registry, xref }
}

#[test]
fn lookup_by_name_hash_finds_the_symbol() {
    let fixture = build();
    let dir = tempfile::tempdir().unwrap();
    write_binary_index(dir.path(), "rt", &fixture.xref, &fixture.registry, &Counters::new())
        .unwrap();

    let reader = IndexReader::open(dir.path(), "rt").unwrap();
    for name in ["f", "g", "longname"] {
        let symbol = reader.lookup(name).unwrap().unwrap_or_else(|| panic!("{} missing", name));
        assert_eq!(symbol.name, name);
        assert_eq!(symbol.hash, fnv64(name.as_bytes()));
    }
    assert!(reader.lookup("missing").unwrap().is_none());
}

#[test]
fn symbol_rows_are_ordered_by_length_then_score_then_name() {
    let fixture = build();
    let dir = tempfile::tempdir().unwrap();
    write_binary_index(dir.path(), "rt", &fixture.xref, &fixture.registry, &Counters::new())
        .unwrap();

    let reader = IndexReader::open(dir.path(), "rt").unwrap();
    let names: Vec<String> = reader.symbols().unwrap().into_iter().map(|(n, _)| n).collect();
    // `f` scores (2 files << 32) | 3, `g` (1 << 32) | 1; same length, so
    // the higher score sorts first. `longname` trails on length.
    assert_eq!(names, vec!["f", "g", "longname"]);
}

#[test]
fn hash_rows_are_sorted_for_binary_search() {
    let fixture = build();
    let dir = tempfile::tempdir().unwrap();
    write_binary_index(dir.path(), "rt", &fixture.xref, &fixture.registry, &Counters::new())
        .unwrap();

    let reader = IndexReader::open(dir.path(), "rt").unwrap();
    let mut previous = 0u64;
    for row in 0..reader.row_count() {
        let hash = reader.hash_at(row).unwrap();
        assert!(hash >= previous, "hash rows must be sorted");
        previous = hash;

        // Each row's hash is the hash of the name its detail block names.
        let offset = reader.detail_offset_at(row).unwrap();
        let symbol = reader.symbol_at(offset).unwrap();
        assert_eq!(hash, fnv64(symbol.name.as_bytes()));
    }
}

#[test]
fn file_table_round_trips_hashes_and_user_paths() {
    let fixture = build();
    let dir = tempfile::tempdir().unwrap();
    write_binary_index(dir.path(), "rt", &fixture.xref, &fixture.registry, &Counters::new())
        .unwrap();

    let reader = IndexReader::open(dir.path(), "rt").unwrap();
    let files = reader.files().unwrap();
    assert_eq!(files.len(), 2);
    assert!(files.contains(&(fnv64(b"/proj/main.cc"), "main.cc".to_string())));
    assert!(files.contains(&(fnv64(b"/proj/util.cc"), "util.cc".to_string())));
}

#[test]
fn provider_rows_round_trip_ranges_and_snippets() {
    let fixture = build();
    let dir = tempfile::tempdir().unwrap();
    write_binary_index(dir.path(), "rt", &fixture.xref, &fixture.registry, &Counters::new())
        .unwrap();

    let reader = IndexReader::open(dir.path(), "rt").unwrap();
    let symbol = reader.lookup("f").unwrap().unwrap();
    assert_eq!(symbol.kinds.len(), 1);
    let kind = &symbol.kinds[0];
    assert_eq!(kind.kind, "Function");
    assert_eq!(kind.linkage, Linkage::External as u8);
    assert_eq!(kind.defs.len(), 1);
    assert!(kind.decls.is_empty());

    let provider = &kind.defs[0];
    assert_eq!(provider.file_hash, fnv64(b"/proj/main.cc"));
    assert_eq!(provider.file_path, "main.cc");
    let expected = object(1, 5, 1);
    assert_eq!(provider.begin, expected.begin);
    assert_eq!(provider.end, expected.end);
    assert_eq!(provider.snippet, "int f() { return 1; }");
}

#[test]
fn duplicate_providers_collapse_by_location() {
    let mut fixture = build();
    let main = fixture.registry.file_for_path("/proj/main.cc");
    let f_def = id(&fixture.registry, main, object(1, 5, 1));
    // Same definition recorded again, as a second translation unit would.
    fixture.xref.record_defines(
        f_def,
        f_def,
        "Function",
        "f",
        "int f() { return 1; }",
        3,
        Linkage::External,
    );

    let dir = tempfile::tempdir().unwrap();
    write_binary_index(dir.path(), "rt", &fixture.xref, &fixture.registry, &Counters::new())
        .unwrap();
    let reader = IndexReader::open(dir.path(), "rt").unwrap();
    let symbol = reader.lookup("f").unwrap().unwrap();
    assert_eq!(symbol.kinds[0].defs.len(), 1);
}

#[test]
fn counters_snapshot_lands_next_to_the_index() {
    let fixture = build();
    let mut counters = Counters::new();
    counters.bump("indexer/test/example", "Example counter");

    let dir = tempfile::tempdir().unwrap();
    write_binary_index(dir.path(), "rt", &fixture.xref, &fixture.registry, &counters).unwrap();

    let json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("index.rt.counters.json")).unwrap())
            .unwrap();
    assert_eq!(json["indexer/test/example"]["value"], 1);
}
