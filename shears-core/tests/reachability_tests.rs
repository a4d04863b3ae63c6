//! Cross-module reachability: graph emission, dispatch edges and pruning

use std::collections::BTreeSet;

use shears_core::build::*;
use shears_core::patterns::{DYNCALL, WASM_EXPORTS, WASM_IMPORTS};
use shears_core::reachability::{apply_dce_graph_removals, emit_dce_graph, Graph};
use shears_core::{Diagnostics, ExtraInfo, Node};

const GLUE: &str = include_str!("fixtures/glue.json");

fn load_glue() -> Node {
    serde_json::from_str(GLUE).expect("fixture should deserialize")
}

fn imports(entries: Vec<(&str, Node)>) -> Node {
    var(
        WASM_IMPORTS,
        Some(object(
            entries
                .into_iter()
                .map(|(key, value)| property(key, value))
                .collect(),
        )),
    )
}

fn export(js: &str, binary: &str) -> Node {
    var(js, Some(index(ident(WASM_EXPORTS), str_lit(binary))))
}

fn graph_of(mut node: Node) -> Graph {
    emit_dce_graph(&mut node, None, &Diagnostics::default()).expect("graph emission failed")
}

#[test]
fn test_scenario_d_prune_unreachable_import() {
    let glue = || {
        program(vec![
            imports(vec![("a", ident("fn1")), ("b", ident("fn2"))]),
            function("fn1", &[], vec![]),
            function("fn2", &[], vec![]),
            expr_stmt(call(ident("fn1"), vec![])),
        ])
    };

    let graph = graph_of(glue());
    assert!(graph.get("emcc$defun$fn1").unwrap().root);
    assert!(!graph.get("emcc$defun$fn2").unwrap().root);

    let mut node = glue();
    let unused = BTreeSet::from(["emcc$import$b".to_string()]);
    let stats = apply_dce_graph_removals(&mut node, &unused, &mut Diagnostics::default()).unwrap();
    assert_eq!(stats.imports_removed, 1);
    assert_eq!(
        node.to_string(),
        r#"var wasmImports = { "a": fn1 }; function fn1() {} function fn2() {} fn1();"#
    );
}

#[test]
fn test_dynamic_dispatch_reaches_every_prefixed_export() {
    let graph = graph_of(program(vec![
        imports(vec![]),
        export("dynCall_vi", "dynCall_vi"),
        export("dynCall_iii", "dynCall_iii"),
        export("dynCall_v", "dynCall_v"),
        export("_main", "main"),
        function(
            "invoke",
            &["sig", "ptr"],
            vec![ret(Some(call(ident(DYNCALL), vec![ident("sig"), ident("ptr")])))],
        ),
    ]));
    let reaches = &graph.get("emcc$defun$invoke").unwrap().reaches;
    let expected: BTreeSet<String> = ["dynCall_iii", "dynCall_v", "dynCall_vi"]
        .iter()
        .map(|name| format!("emcc$export${}", name))
        .collect();
    assert_eq!(reaches, &expected);
}

#[test]
fn test_prefix_string_counts_as_dynamic_dispatch() {
    let graph = graph_of(program(vec![
        imports(vec![]),
        export("dynCall_ii", "dynCall_ii"),
        function(
            "lookup",
            &["sig"],
            vec![ret(Some(index(
                ident("Module"),
                binary("+", str_lit("dynCall_"), ident("sig")),
            )))],
        ),
    ]));
    assert!(graph
        .get("emcc$defun$lookup")
        .unwrap()
        .reaches
        .contains("emcc$export$dynCall_ii"));
}

#[test]
fn test_static_dispatch_reaches_one_export() {
    let graph = graph_of(program(vec![
        imports(vec![]),
        export("dynCall_vi", "dynCall_vi"),
        export("dynCall_ii", "dynCall_ii"),
        function(
            "callVi",
            &["ptr"],
            vec![expr_stmt(call(ident(DYNCALL), vec![str_lit("vi"), ident("ptr")]))],
        ),
    ]));
    let reaches = &graph.get("emcc$defun$callVi").unwrap().reaches;
    assert_eq!(
        reaches,
        &BTreeSet::from(["emcc$export$dynCall_vi".to_string()])
    );
}

#[test]
fn test_graph_is_deterministic() {
    let first = graph_of(load_glue()).to_json().unwrap();
    for _ in 0..5 {
        assert_eq!(graph_of(load_glue()).to_json().unwrap(), first);
    }
}

#[test]
fn test_fixture_graph() {
    let graph = graph_of(load_glue());
    assert_eq!(graph.len(), 10);

    let fd_write = graph.get("emcc$import$fd_write").unwrap();
    assert!(fd_write.reaches.contains("emcc$defun$_fd_write"));
    assert!(graph
        .get("emcc$defun$_fd_write")
        .unwrap()
        .reaches
        .contains("emcc$defun$printChar"));

    let roots: Vec<&str> = graph.roots().collect();
    assert_eq!(roots, ["emcc$export$_malloc"]);
    assert_eq!(
        graph.get("emcc$export$_free").unwrap().export.as_deref(),
        Some("free")
    );
}

#[test]
fn test_fixture_graph_json_round_trips() {
    let graph = graph_of(load_glue());
    let text = graph.to_json().unwrap();
    assert!(text.starts_with("[\n {\n  \"name\""));
    assert_eq!(Graph::from_json(&text).unwrap(), graph);
}

#[test]
fn test_fixture_prune() {
    let mut node = load_glue();
    let unused = BTreeSet::from([
        "emcc$import$proc_exit".to_string(),
        "emcc$export$_free".to_string(),
    ]);
    let mut diag = Diagnostics::default();
    let stats = apply_dce_graph_removals(&mut node, &unused, &mut diag).unwrap();
    assert_eq!(stats.imports_removed, 1);
    assert_eq!(stats.exports_removed, 1);
    assert_eq!(diag.warning_count(), 0);

    let text = node.to_string();
    assert!(!text.contains("\"proc_exit\""));
    assert!(text.contains("var _free = undefined;"));
    assert!(text.contains(r#"var _main = Module["_main"] = wasmExports["main"];"#));
}

#[test]
fn test_extra_info_exports_become_nodes() {
    let extra = ExtraInfo::from_json(r#"{"exports":[["_stackAlloc","stackAlloc"]]}"#).unwrap();
    let mut node = program(vec![imports(vec![])]);
    let graph = emit_dce_graph(&mut node, Some(&extra), &Diagnostics::default()).unwrap();
    assert_eq!(
        graph
            .get("emcc$export$_stackAlloc")
            .and_then(|n| n.export.as_deref()),
        Some("stackAlloc")
    );
}

#[test]
fn test_unreachable_set_matches_pruning_input() {
    let graph = graph_of(load_glue());
    let unreachable = graph.unreachable_from_roots();
    assert!(unreachable.contains("emcc$export$_main"));
    assert!(unreachable.contains("emcc$import$fd_write"));
    assert!(!unreachable.contains("emcc$export$_malloc"));
}

// ============================================================================
// Export shapes
// ============================================================================

/// `(output) => { var wasmExports = output.instance.exports; _main = ...; _free = ...; }`
fn minimal_runtime_glue() -> Node {
    let callback = arrow(
        &["output"],
        vec![
            var(
                WASM_EXPORTS,
                Some(member(member(ident("output"), "instance"), "exports")),
            ),
            expr_stmt(assign(ident("_main"), index(ident(WASM_EXPORTS), str_lit("main")))),
            expr_stmt(assign(ident("_free"), index(ident(WASM_EXPORTS), str_lit("free")))),
        ],
    );
    program(vec![
        imports(vec![]),
        var_decl(
            shears_core::VariableKind::Var,
            vec![declarator(ident("_main"), None), declarator(ident("_free"), None)],
        ),
        expr_stmt(call(ident("ready"), vec![callback])),
        expr_stmt(call(ident("_main"), vec![])),
    ])
}

/// `var js = function () { return (js = wasmExports['binary']).apply(null, arguments); }`
fn wrapper_export(js: &str, binary: &str) -> Node {
    let forward = call(
        member(assign(ident(js), index(ident(WASM_EXPORTS), str_lit(binary))), "apply"),
        vec![null(), ident("arguments")],
    );
    var(js, Some(function_expr(&[], vec![ret(Some(forward))])))
}

/// `var js = () => (js = wasmExports['binary']).apply(null, arguments)`
fn arrow_wrapper_export(js: &str, binary: &str) -> Node {
    let forward = call(
        member(assign(ident(js), index(ident(WASM_EXPORTS), str_lit(binary))), "apply"),
        vec![null(), ident("arguments")],
    );
    var(
        js,
        Some(Node::ArrowFunctionExpression {
            params: vec![],
            body: Box::new(forward),
            expression: true,
            is_async: false,
        }),
    )
}

#[test]
fn test_minimal_runtime_exports_become_nodes() {
    let graph = graph_of(minimal_runtime_glue());
    let main = graph.get("emcc$export$_main").unwrap();
    assert_eq!(main.export.as_deref(), Some("main"));
    assert!(main.root);
    let free = graph.get("emcc$export$_free").unwrap();
    assert_eq!(free.export.as_deref(), Some("free"));
    assert!(!free.root);
    assert!(free.reaches.is_empty());
}

#[test]
fn test_minimal_runtime_prune_keeps_assignment() {
    let mut node = minimal_runtime_glue();
    let unused = BTreeSet::from(["emcc$export$_free".to_string()]);
    let mut diag = Diagnostics::default();
    let stats = apply_dce_graph_removals(&mut node, &unused, &mut diag).unwrap();
    assert_eq!(stats.exports_removed, 1);
    assert_eq!(diag.warning_count(), 0);
    assert_eq!(
        node.to_string(),
        "var wasmImports = {}; var _main, _free; \
         ready((output) => { var wasmExports = output.instance.exports; \
         _main = wasmExports[\"main\"]; _free = undefined; }); _main();"
    );
}

#[test]
fn test_wrapper_exports_become_nodes() {
    let graph = graph_of(program(vec![
        imports(vec![]),
        wrapper_export("_stackSave", "stackSave"),
        arrow_wrapper_export("_stackRestore", "stackRestore"),
        expr_stmt(call(ident("_stackSave"), vec![])),
    ]));
    let save = graph.get("emcc$export$_stackSave").unwrap();
    assert_eq!(save.export.as_deref(), Some("stackSave"));
    assert!(save.root);
    let restore = graph.get("emcc$export$_stackRestore").unwrap();
    assert_eq!(restore.export.as_deref(), Some("stackRestore"));
    assert!(!restore.root);
}

#[test]
fn test_wrapper_export_prune_keeps_declaration() {
    let mut node = program(vec![
        wrapper_export("_stackSave", "stackSave"),
        arrow_wrapper_export("_stackRestore", "stackRestore"),
    ]);
    let unused = BTreeSet::from([
        "emcc$export$_stackSave".to_string(),
        "emcc$export$_stackRestore".to_string(),
    ]);
    let mut diag = Diagnostics::default();
    let stats = apply_dce_graph_removals(&mut node, &unused, &mut diag).unwrap();
    assert_eq!(stats.exports_removed, 2);
    assert_eq!(diag.warning_count(), 0);
    assert_eq!(
        node.to_string(),
        "var _stackSave = undefined; var _stackRestore = undefined;"
    );
}

#[test]
fn test_prune_removes_unused_function_valued_import() {
    let mut node = program(vec![imports(vec![
        (
            "callback",
            function_expr(&[], vec![expr_stmt(call(ident("g"), vec![]))]),
        ),
        ("kept", ident("fn1")),
    ])]);
    let unused = BTreeSet::from(["emcc$import$callback".to_string()]);
    let stats = apply_dce_graph_removals(&mut node, &unused, &mut Diagnostics::default()).unwrap();
    assert_eq!(stats.imports_removed, 1);
    assert_eq!(node.to_string(), r#"var wasmImports = { "kept": fn1 };"#);
}
