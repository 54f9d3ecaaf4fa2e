use srcx::front::{SourceRange, TranslationUnit};
use srcx::locmap::{
    html_path, id_link, id_name, make_object_id, normalize_range, output_path, pack_key,
    source_path, ObjectId,
};
use srcx::test_utils::ScriptedUnit;

#[test]
fn packed_keys_order_like_line_column_pairs() {
    assert!(pack_key(1, 1, 1, 1) < pack_key(1, 2, 1, 2));
    assert!(pack_key(1, 9, 1, 9) < pack_key(2, 1, 2, 1));
    assert!(pack_key(10, 1, 10, 5) < pack_key(10, 1, 11, 2));
}

#[test]
fn object_ids_depend_only_on_the_four_positions() {
    let mut unit = ScriptedUnit::new();
    let file = unit.add_file("/x/a.cc", "int alpha;\nint beta;\n");

    let first = unit.token_range(file, 4);
    let again = unit.token_range(file, 4);
    let other = unit.token_range(file, 15);

    let sm = unit.source_map();
    assert_eq!(make_object_id(sm, first), make_object_id(sm, again));
    assert_ne!(make_object_id(sm, first), make_object_id(sm, other));
}

#[test]
fn id_names_are_sixteen_or_thirtytwo_digits() {
    let plain = ObjectId {
        begin: pack_key(3, 5, 3, 9),
        end: pack_key(3, 5, 3, 9),
    };
    assert_eq!(id_name(plain).len(), 16);

    let missing_spelling = ObjectId {
        begin: 0,
        end: pack_key(3, 5, 3, 9),
    };
    assert_eq!(id_name(missing_spelling), id_name(plain));

    let expanded = ObjectId {
        begin: pack_key(1, 9, 1, 12),
        end: pack_key(7, 1, 7, 4),
    };
    assert_eq!(id_name(expanded).len(), 32);
    assert!(id_name(expanded).ends_with(&format!("{:016x}", expanded.end)));
}

#[test]
fn normalize_swaps_an_inverted_range() {
    let mut unit = ScriptedUnit::new();
    let file = unit.add_file("/x/a.cc", "int alpha;\n");
    let early = unit.loc(file, 0);
    let late = unit.loc(file, 4);

    let inverted = SourceRange::new(late, early);
    let fixed = normalize_range(unit.source_map(), inverted);
    assert_eq!(fixed.begin, early);
    assert_eq!(fixed.end, late);

    let degenerate = SourceRange::new(late, srcx::front::Loc::INVALID);
    let fixed = normalize_range(unit.source_map(), degenerate);
    assert_eq!(fixed.begin, late);
    assert_eq!(fixed.end, late);
}

#[test]
fn output_paths_split_on_the_last_two_hex_digits() {
    let hash = 0x0123_4567_89ab_cdefu64;
    assert_eq!(output_path(hash, ".html"), "ef/0123456789abcd.html");
    assert_eq!(html_path(hash, ".html"), "../ef/0123456789abcd.html");
    assert_eq!(source_path(hash, ".jhtml"), "output/sources/ef/0123456789abcd.jhtml");
}

#[test]
fn links_join_path_and_fragment() {
    let objid = ObjectId {
        begin: pack_key(1, 1, 1, 4),
        end: pack_key(1, 1, 1, 4),
    };
    let link = id_link(0xff, objid);
    assert!(link.starts_with("../ff/"));
    assert!(link.contains(".html#"));
    assert!(link.ends_with(&id_name(objid)));
}
