//! End-to-end scenarios for the annotation engine: scripted units in, both
//! the rendered hypertext and the index out.

use srcx::annotate::Annotator;
use srcx::counters::Counters;
use srcx::front::{
    AstNode, Condition, DeclInfo, Linkage, NodeKind, PpEvent, SourceRange, TemplateKind,
    TranslationUnit, TypeLoc, UnitFileId, ACCESS_NONE,
};
use srcx::index::IndexReader;
use srcx::locmap;
use srcx::registry::FileRegistry;
use srcx::strpool::fnv64;
use srcx::test_utils::ScriptedUnit;
use srcx::xref::XrefIndex;
use srcx::{index, render};

struct Run {
    registry: FileRegistry,
    xref: XrefIndex,
    counters: Counters,
}

fn annotate(unit: &ScriptedUnit, strip: &str) -> Run {
    let mut run = Run {
        registry: FileRegistry::new(strip),
        xref: XrefIndex::new(),
        counters: Counters::new(),
    };
    let mut annotator = Annotator::new(&mut run.registry, &mut run.xref, &mut run.counters, 60);
    annotator.run(unit);
    run
}

/// Mark `file` parsed and produce its final HTML body.
fn render_html(run: &mut Run, unit: &ScriptedUnit, file: UnitFileId) -> String {
    let sm = unit.source_map();
    render::render_unit_file(&mut run.registry, sm, file, &unit.raw_tokens(file));

    let path = sm.file_path(file).unwrap().to_string();
    let id = run.registry.file_for_path(&path);
    let (body, mut rewrite) = {
        let entry = run.registry.file_mut(id);
        (std::mem::take(&mut entry.body), std::mem::take(&mut entry.rewrite))
    };
    let html = rewrite.render(&body, &run.registry.tag_pool);
    String::from_utf8_lossy(&html).into_owned()
}

fn function_info(name: &str, first_range: SourceRange) -> DeclInfo {
    DeclInfo {
        kind: "Function".to_string(),
        name: name.to_string(),
        first_range,
        access: ACCESS_NONE,
        linkage: Linkage::External,
    }
}

#[test]
fn typedef_and_pointer_use_link_to_the_same_id() {
    // typedef int U; U* p;
    let mut unit = ScriptedUnit::new();
    let file = unit.add_file("/work/s1.cc", "typedef int U;\nU* p;\n");

    let u_def = unit.find(file, "U", 0);
    let u_use = unit.find(file, "U", 1);
    let p_at = unit.find(file, "p", 0);

    let typedef_range = unit.range(file, 0, u_def);
    let use_range = unit.token_range(file, u_use);
    let declarator_range = unit.range(file, u_use, p_at);

    unit.roots.push(AstNode::new(
        typedef_range,
        NodeKind::OtherNamed {
            info: DeclInfo {
                kind: "Typedef".to_string(),
                name: "U".to_string(),
                first_range: typedef_range,
                access: ACCESS_NONE,
                linkage: Linkage::None,
            },
        },
    ));
    unit.roots.push(AstNode::new(
        declarator_range,
        NodeKind::Declarator {
            type_loc: TypeLoc::Pointer(Box::new(TypeLoc::Inner {
                range: use_range,
                underlying: Some(typedef_range),
            })),
        },
    ));

    let mut run = annotate(&unit, "/work");
    let html = render_html(&mut run, &unit, file);

    let objid = locmap::make_object_id(unit.source_map(), typedef_range);
    let id = locmap::id_name(objid);
    // Spelling matches expansion: sixteen hex digits.
    assert_eq!(id.len(), 16);

    assert!(
        html.contains(&format!("<span class='def def-Typedef' id='{}'>", id)),
        "missing def span in {}",
        html
    );
    let href = locmap::id_link(fnv64(b"/work/s1.cc"), objid);
    assert!(
        html.contains(&format!("<a class='declaration-uses' href='{}'>U</a>", href)),
        "missing use link in {}",
        html
    );
}

#[test]
fn function_declaration_and_definition_group_under_one_symbol() {
    // int f(int); in the header, the definition in the source.
    let mut unit = ScriptedUnit::new();
    let header = unit.add_file("/work/f.h", "int f(int);\n");
    let source = unit.add_file("/work/f.cc", "int f(int x) { return x; }\n");

    let header_close = unit.find(header, ")", 0);
    let source_close = unit.find(source, "}", 0);
    let decl_range = unit.range(header, 0, header_close);
    let def_range = unit.range(source, 0, source_close);

    unit.roots.push(AstNode::new(
        decl_range,
        NodeKind::Function {
            info: function_info("f", decl_range),
            is_definition: false,
            template: TemplateKind::NonTemplate,
            return_type: None,
        },
    ));
    unit.roots.push(AstNode::new(
        def_range,
        NodeKind::Function {
            info: function_info("f", decl_range),
            is_definition: true,
            template: TemplateKind::NonTemplate,
            return_type: None,
        },
    ));

    let run = annotate(&unit, "/work");

    let dir = tempfile::tempdir().unwrap();
    index::write_binary_index(dir.path(), "t", &run.xref, &run.registry, &run.counters).unwrap();

    let reader = IndexReader::open(dir.path(), "t").unwrap();
    let symbol = reader.lookup("f").unwrap().expect("symbol f indexed");
    assert_eq!(symbol.name, "f");
    assert_eq!(symbol.kinds.len(), 1, "one (kind, linkage, access) bucket");

    let kind = &symbol.kinds[0];
    assert_eq!(kind.kind, "Function");
    assert_eq!(kind.linkage, Linkage::External as u8);
    assert_eq!(kind.access, ACCESS_NONE);
    assert_eq!(kind.defs.len(), 1);
    assert_eq!(kind.decls.len(), 1);
    assert_eq!(kind.defs[0].file_path, "f.cc");
    assert_eq!(kind.decls[0].file_path, "f.h");
    assert_eq!(kind.decls[0].snippet, "int f(int);");
}

#[test]
fn macro_definition_and_expansion() {
    // #define M 1 then int y = M;
    let mut unit = ScriptedUnit::new();
    let file = unit.add_file("/work/m.cc", "#define M 1\nint y = M;\n");

    let m_def = unit.find(file, "M", 0);
    let body = unit.find(file, "1", 0);
    let m_use = unit.find(file, "M", 1);

    let def_range = unit.range(file, m_def, body);
    let name_loc = unit.loc(file, m_def);
    let use_range = unit.token_range(file, m_use);

    unit.events.push(PpEvent::MacroDefined {
        name: "M".to_string(),
        name_loc,
        def_range,
        is_header_guard: false,
    });
    unit.events.push(PpEvent::MacroExpands {
        name: "M".to_string(),
        range: use_range,
        def_range,
    });

    let mut run = annotate(&unit, "/work");

    let dir = tempfile::tempdir().unwrap();
    index::write_binary_index(dir.path(), "t", &run.xref, &run.registry, &run.counters).unwrap();
    let reader = IndexReader::open(dir.path(), "t").unwrap();
    let symbol = reader.lookup("M").unwrap().expect("macro indexed");
    assert_eq!(symbol.kinds.len(), 1);
    assert_eq!(symbol.kinds[0].kind, "MACRO");
    assert_eq!(symbol.kinds[0].linkage, Linkage::None as u8);
    assert_eq!(symbol.kinds[0].defs.len(), 1);

    let html = render_html(&mut run, &unit, file);
    let id = locmap::id_name(locmap::make_object_id(unit.source_map(), def_range));
    let href = locmap::id_link(fnv64(b"/work/m.cc"), locmap::make_object_id(unit.source_map(), def_range));
    assert!(html.contains(&format!("<span class='def def-MACRO' id='{}'>", id)));
    assert!(html.contains(&format!("<a class='MACRO-uses' href='{}'>M</a>", href)));
}

#[test]
fn undefined_ifdef_mutes_the_region() {
    let mut unit = ScriptedUnit::new();
    let file = unit.add_file("/work/s4.cc", "#ifdef ZZZ\nunreachable();\n#endif\n");

    let zzz = unit.find(file, "ZZZ", 0);
    let endif = unit.find(file, "#endif", 0);
    let name_range = unit.token_range(file, zzz);
    let endif_loc = unit.loc(file, endif);

    unit.events.push(PpEvent::Ifdef {
        name_range,
        def_range: None,
    });
    unit.events.push(PpEvent::Endif { loc: endif_loc });

    let mut run = annotate(&unit, "/work");
    let html = render_html(&mut run, &unit, file);

    assert!(html.contains("<span class='macro-undefined'>ZZZ</span>"), "{}", html);
    assert!(
        html.contains("<span class='preprocessor-if muted'>\nunreachable();</span>"),
        "{}",
        html
    );
}

#[test]
fn nested_false_ifdef_mutes_the_whole_outer_region() {
    // The preprocessor does not deliver events for directives inside the
    // skipped region; the outer wrap must cover them anyway.
    let mut unit = ScriptedUnit::new();
    let file = unit.add_file(
        "/work/nest.cc",
        "#ifdef AAA\n#ifdef BBB\nint x;\n#endif\n#endif\n",
    );

    let aaa = unit.find(file, "AAA", 0);
    let outer_endif = unit.find(file, "#endif", 1);
    let name_range = unit.token_range(file, aaa);
    let endif_loc = unit.loc(file, outer_endif);

    unit.events.push(PpEvent::Ifdef {
        name_range,
        def_range: None,
    });
    unit.events.push(PpEvent::Endif { loc: endif_loc });

    let mut run = annotate(&unit, "/work");
    let html = render_html(&mut run, &unit, file);

    // The muted span opens before the inner directive and closes right
    // after it (the inner directive lines carry their own spans).
    let muted_open = html.find("<span class='preprocessor-if muted'>").expect("muted span");
    let inner = html.find("int x;").expect("inner body");
    assert!(muted_open < inner, "{}", html);
    assert!(html.contains("#endif</span></span>"), "{}", html);
}

#[test]
fn else_flips_the_muted_branch() {
    let mut unit = ScriptedUnit::new();
    let file = unit.add_file("/work/else.cc", "#ifdef X\na();\n#else\nb();\n#endif\n");

    let x = unit.find(file, "X", 0);
    let else_at = unit.find(file, "#else", 0);
    let endif_at = unit.find(file, "#endif", 0);
    let name_range = unit.token_range(file, x);
    let else_loc = unit.loc(file, else_at);
    let endif_loc = unit.loc(file, endif_at);

    unit.events.push(PpEvent::Ifdef {
        name_range,
        def_range: None,
    });
    unit.events.push(PpEvent::Else { loc: else_loc });
    unit.events.push(PpEvent::Endif { loc: endif_loc });

    let mut run = annotate(&unit, "/work");
    let html = render_html(&mut run, &unit, file);

    assert!(html.contains("<span class='preprocessor-if muted'>\na();</span>"), "{}", html);
    assert!(!html.contains("muted'>\nb();"), "else branch must stay live: {}", html);
}

#[test]
fn elif_moves_the_region_start() {
    let mut unit = ScriptedUnit::new();
    let file = unit.add_file(
        "/work/elif.cc",
        "#if A\na();\n#elif B\nb();\n#endif\n",
    );

    let a_cond = unit.find(file, "A", 0);
    let elif_at = unit.find(file, "#elif", 0);
    let b_cond = unit.find(file, "B", 0);
    let endif_at = unit.find(file, "#endif", 0);

    let a_range = unit.token_range(file, a_cond);
    let elif_loc = unit.loc(file, elif_at);
    let b_range = unit.token_range(file, b_cond);
    let endif_loc = unit.loc(file, endif_at);

    unit.events.push(PpEvent::If {
        cond_range: a_range,
        value: Condition::False,
    });
    unit.events.push(PpEvent::Elif {
        loc: elif_loc,
        cond_range: b_range,
        value: Condition::True,
    });
    unit.events.push(PpEvent::Endif { loc: endif_loc });

    let mut run = annotate(&unit, "/work");
    let html = render_html(&mut run, &unit, file);

    assert!(html.contains("<span class='preprocessor-if muted'>\na();</span>"), "{}", html);
    assert!(!html.contains("muted'>\nb();"), "{}", html);
}

#[test]
fn include_directive_links_to_the_included_file() {
    let mut unit = ScriptedUnit::new();
    let file = unit.add_file("/work/inc.cc", "#include \"lib.h\"\n");
    let name_at = unit.find(file, "lib.h", 0);
    let filename_range = SourceRange::at(unit.loc_len(file, name_at, 5));

    unit.events.push(PpEvent::Inclusion {
        filename_range,
        resolved_path: Some("/work/lib.h".to_string()),
    });

    let mut run = annotate(&unit, "/work");
    let html = render_html(&mut run, &unit, file);

    let href = locmap::html_path(fnv64(b"/work/lib.h"), ".html");
    assert!(
        html.contains(&format!("<a class='include' href='{}'>lib.h</a>", href)),
        "{}",
        html
    );
}

#[test]
fn duplicate_uses_collapse_in_the_json_mirror() {
    let mut unit = ScriptedUnit::new();
    let file = unit.add_file("/work/s5.cc", "int v = 1;\nv; v;\n");

    let v_def = unit.find(file, "v", 0);
    let def_range = unit.range(file, 0, v_def);
    let v_use = unit.find(file, "v", 1);
    let use_range = unit.token_range(file, v_use);

    unit.roots.push(AstNode::new(
        def_range,
        NodeKind::Var {
            info: DeclInfo {
                kind: "Var".to_string(),
                name: "v".to_string(),
                first_range: def_range,
                access: ACCESS_NONE,
                linkage: Linkage::External,
            },
            is_parameter: false,
            in_function_definition: false,
            has_external_storage: false,
        },
    ));
    // The same use recorded twice, byte for byte.
    unit.roots.push(AstNode::new(use_range, NodeKind::DeclRef { target: def_range }));
    unit.roots.push(AstNode::new(use_range, NodeKind::DeclRef { target: def_range }));

    let run = annotate(&unit, "/work");

    // Insertion keeps both; the serializer deduplicates per bucket.
    assert!(run.xref.iter().any(|(_, properties)| properties.users.len() == 2));

    let dir = tempfile::tempdir().unwrap();
    index::write_binary_index(dir.path(), "t", &run.xref, &run.registry, &run.counters).unwrap();

    let json: serde_json::Value = serde_json::from_slice(
        &std::fs::read(dir.path().join("index.t.symbols.json")).unwrap(),
    )
    .unwrap();
    let users = &json["data"][0]["kinds"][0]["users"];
    assert_eq!(users.as_array().unwrap().len(), 1, "{}", json);
}

#[test]
fn macro_expanded_identifiers_get_the_long_id_name() {
    let mut unit = ScriptedUnit::new();
    let file = unit.add_file("/work/s6.cc", "int value = 1;\nuse_it(value);\n");

    let plain = unit.token_range(file, unit_find(&unit, file, "value", 0));
    let plain_id = locmap::id_name(locmap::make_object_id(unit.source_map(), plain));
    assert_eq!(plain_id.len(), 16);

    // Spelled on line one, expanded on line two.
    let spelled = unit.find(file, "value", 0);
    let expanded = unit.find(file, "value", 1);
    let mloc = unit.macro_loc((file, spelled), (file, expanded));
    let mrange = SourceRange::at(mloc);
    let macro_id = locmap::id_name(locmap::make_object_id(unit.source_map(), mrange));
    assert_eq!(macro_id.len(), 32);
}

fn unit_find(unit: &ScriptedUnit, file: UnitFileId, needle: &str, occurrence: usize) -> u32 {
    unit.find(file, needle, occurrence)
}

#[test]
fn anonymous_member_targets_are_suppressed() {
    let mut unit = ScriptedUnit::new();
    let file = unit.add_file("/work/anon.cc", "s.field;\n");
    let name_range = unit.token_range(file, unit_find(&unit, file, "field", 0));
    let target = unit.token_range(file, 0);

    unit.roots.push(AstNode::new(
        name_range,
        NodeKind::Member {
            name_range,
            target,
            target_anonymous: true,
        },
    ));

    let run = annotate(&unit, "/work");
    assert!(run.xref.is_empty());
}

#[test]
fn uses_and_declarations_stay_within_one_file() {
    // Invariant: for every recorded relation, begin and end resolve to the
    // same file after normalisation.
    let mut unit = ScriptedUnit::new();
    let a = unit.add_file("/work/a.cc", "int aa = 1;\n");
    let b = unit.add_file("/work/b.cc", "int bb = 2;\n");

    let begin = unit.loc(a, 4);
    let end = unit.loc(b, 4);
    let crossing = SourceRange::new(begin, end);
    let target = unit.token_range(a, 0);

    unit.roots.push(AstNode::new(crossing, NodeKind::DeclRef { target }));

    let run = annotate(&unit, "/work");
    // The citation is rejected; the target keeps an exception note instead.
    assert!(run.xref.iter().all(|(_, properties)| properties.users.is_empty()));
    assert!(run
        .xref
        .iter()
        .any(|(_, properties)| properties.exceptions.len() == 1));
    assert!(run.counters.value("cache/nullreturn/begin-end-different-files") > 0);
}
