//! A full driver run with a scripted semantic front-end: the symbols flow
//! from preprocessor and AST events all the way into the binary index.
//!
//! Single test: the driver changes the process working directory.

use srcx::driver::{run, RunOptions};
use srcx::front::{
    AstNode, DeclInfo, Linkage, NodeKind, PpEvent, TemplateKind, ACCESS_NONE, ACCESS_PUBLIC,
};
use srcx::index::IndexReader;
use srcx::test_utils::{ScriptedFrontend, ScriptedUnit};

fn scripted_unit() -> ScriptedUnit {
    let mut unit = ScriptedUnit::new();
    let header = unit.add_file("/vsrc/calc.h", "int add(int, int);\n#define SCALE 2\n");
    let source = unit.add_file(
        "/vsrc/calc.cc",
        "int add(int a, int b) { return a + b; }\nint twice(int v) { return v * SCALE; }\n",
    );

    let decl_close = unit.find(header, ")", 0);
    let decl_range = unit.range(header, 0, decl_close);
    let def_close = unit.find(source, "}", 0);
    let def_range = unit.range(source, 0, def_close);

    unit.roots.push(AstNode::new(
        decl_range,
        NodeKind::Function {
            info: DeclInfo {
                kind: "Function".to_string(),
                name: "add".to_string(),
                first_range: decl_range,
                access: ACCESS_NONE,
                linkage: Linkage::External,
            },
            is_definition: false,
            template: TemplateKind::NonTemplate,
            return_type: None,
        },
    ));
    unit.roots.push(AstNode::new(
        def_range,
        NodeKind::Function {
            info: DeclInfo {
                kind: "Function".to_string(),
                name: "add".to_string(),
                first_range: decl_range,
                access: ACCESS_NONE,
                linkage: Linkage::External,
            },
            is_definition: true,
            template: TemplateKind::NonTemplate,
            return_type: None,
        },
    ));

    let scale_def = unit.find(header, "SCALE", 0);
    let scale_body = unit.find(header, "2", 0);
    let macro_range = unit.range(header, scale_def, scale_body);
    let name_loc = unit.loc(header, scale_def);
    let scale_use = unit.find(source, "SCALE", 0);
    let use_range = unit.token_range(source, scale_use);

    unit.events.push(PpEvent::MacroDefined {
        name: "SCALE".to_string(),
        name_loc,
        def_range: macro_range,
        is_header_guard: false,
    });
    unit.events.push(PpEvent::MacroExpands {
        name: "SCALE".to_string(),
        range: use_range,
        def_range: macro_range,
    });

    unit
}

#[test]
fn scripted_front_end_symbols_reach_the_index() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let manifest = serde_json::json!([{
        "directory": root.to_string_lossy(),
        "file": "calc.cc",
        "command": "cc -c calc.cc",
    }]);
    std::fs::write(
        root.join("compile_commands.json"),
        serde_json::to_vec(&manifest).unwrap(),
    )
    .unwrap();

    let original_cwd = std::env::current_dir().unwrap();
    std::env::set_current_dir(&root).unwrap();

    let options = RunOptions {
        index_dir: root.join("idx"),
        jsondb: root.to_path_buf(),
        strip_prefix: Some("/vsrc".to_string()),
        tag: "sem".to_string(),
        project: "calc".to_string(),
        ..RunOptions::default()
    };
    let mut frontend = ScriptedFrontend {
        units: vec![scripted_unit()],
    };
    let stats = run(&options, &mut frontend).expect("run succeeds");
    std::env::set_current_dir(&original_cwd).unwrap();

    assert_eq!(stats.units, 1);
    assert_eq!(stats.symbols, 2, "add and SCALE");

    let reader = IndexReader::open(&root.join("idx"), "sem").unwrap();

    let add = reader.lookup("add").unwrap().expect("add indexed");
    assert_eq!(add.kinds.len(), 1);
    assert_eq!(add.kinds[0].kind, "Function");
    assert_eq!(add.kinds[0].defs.len(), 1);
    assert_eq!(add.kinds[0].decls.len(), 1);
    assert_eq!(add.kinds[0].defs[0].file_path, "calc.cc");
    assert_eq!(add.kinds[0].decls[0].file_path, "calc.h");

    let scale = reader.lookup("SCALE").unwrap().expect("SCALE indexed");
    assert_eq!(scale.kinds[0].kind, "MACRO");
    assert_eq!(scale.kinds[0].access, ACCESS_PUBLIC);

    // `add` is shorter than `SCALE`: it sorts first regardless of score.
    let names: Vec<String> = reader.symbols().unwrap().into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["add", "SCALE"]);

    // Both unit files rendered even though they never existed on disk.
    let add_hash = srcx::strpool::fnv64(b"/vsrc/calc.cc");
    let doc = root.join(srcx::locmap::source_path(add_hash, ".jhtml"));
    let rendered = std::fs::read_to_string(&doc).unwrap();
    assert!(rendered.contains("MACRO-uses"), "{}", rendered);
    assert!(rendered.contains("def def-Function"), "{}", rendered);
}
