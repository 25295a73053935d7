//! Golden tests for the slicer.
//!
//! These tests pin down exact slice, chop, trace, filter and DOT output on
//! small nets loaded through the JSON declaration format.

use petri_slicer::{
    node_set, render_dot, AnalysisMode, AnalysisQuery, ChopBounds, CollapseOptions,
    CollapseResolver, Direction, DotOptions, GraphError, LoadError, NetDeclaration, NodeId,
    PetriGraph, SliceBounds, Slicer, TextSink, TraceEngine, TraceOptions,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

const CHAIN_NET: &str = r#"{
    "places": [
        ["p1", "request received", ["t1"]],
        ["p2", "validated", ["t2"]],
        ["p3", "response sent", []]
    ],
    "transitions": [
        ["t1", "validate", ["p2"]],
        ["t2", "respond", ["p3"]]
    ]
}"#;

//   ready ─► acquire ─► held ─► release ─► ready
//                        │
//                        └─► log ─► logged ─► flush ─► done
//   token ─► acquire
const MUTEX_NET: &str = r#"{
    "places": [
        ["ready", "ready", ["acquire"]],
        ["token", "token", ["acquire"]],
        ["held", "held", ["release", "log"]],
        ["logged", "logged", ["flush"]],
        ["done", "done", []]
    ],
    "transitions": [
        ["acquire", "acquire lock", ["held"]],
        ["release", "release lock", ["ready", "token"]],
        ["log", "write log", ["logged"]],
        ["flush", "flush log", ["done"]]
    ]
}"#;

fn chain() -> PetriGraph {
    PetriGraph::from_json_str(CHAIN_NET).unwrap()
}

fn mutex() -> PetriGraph {
    PetriGraph::from_json_str(MUTEX_NET).unwrap()
}

fn patterns(ps: &[&str]) -> Vec<String> {
    ps.iter().map(|p| p.to_string()).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// CLOSURE TESTS
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_chain_forward_and_backward_slices() {
    let g = chain();
    let slicer = Slicer::new(&g);
    let bounds = SliceBounds::default();

    assert_eq!(
        slicer.fwd_slice(&node_set(["p1"]), &bounds),
        node_set(["p1", "t1", "p2", "t2", "p3"])
    );
    assert_eq!(
        slicer.bwd_slice(&node_set(["p3"]), &bounds),
        node_set(["p1", "t1", "p2", "t2", "p3"])
    );
    assert_eq!(
        slicer.bwd_slice(&node_set(["t1"]), &bounds),
        node_set(["p1", "t1"])
    );
}

#[test]
fn test_chain_chop_is_the_whole_chain() {
    let g = chain();
    let chop = Slicer::new(&g).chop(&node_set(["p1"]), &node_set(["p3"]), &ChopBounds::default());
    assert_eq!(chop, node_set(["p1", "t1", "p2", "t2", "p3"]));
}

#[test]
fn test_slice_stops_at_wall_but_keeps_it() {
    let g = mutex();
    let bounds = SliceBounds::default().with_stop(node_set(["held"]));
    let slice = Slicer::new(&g).fwd_slice(&node_set(["ready"]), &bounds);
    assert_eq!(slice, node_set(["ready", "acquire", "held"]));
}

#[test]
fn test_slice_around_cycle_terminates() {
    let g = mutex();
    let slice = Slicer::new(&g).fwd_slice(&node_set(["held"]), &SliceBounds::default());
    // the lock cycle leads back to held, the log branch runs to done
    assert_eq!(slice, g.node_set());
}

#[test]
fn test_chop_with_exclude_cuts_path() {
    let g = mutex();
    let slicer = Slicer::new(&g);
    let seeds = node_set(["acquire"]);
    let targets = node_set(["done"]);

    assert_eq!(
        slicer.chop(&seeds, &targets, &ChopBounds::default()),
        node_set(["acquire", "held", "log", "logged", "flush", "done"])
    );

    let bounds = ChopBounds { exclude: node_set(["logged"]), ..ChopBounds::default() };
    assert!(slicer.chop(&seeds, &targets, &bounds).is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// COLLAPSE TESTS
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_trivial_place_is_looked_through() {
    let g = chain();
    let resolver = CollapseResolver::new(&g);

    assert!(resolver.is_trivial(&"p2".into()));
    assert!(!resolver.is_trivial(&"p1".into()));
    assert_eq!(resolver.successors(&"t1".into()), node_set(["t2"]));
    assert_eq!(resolver.predecessors(&"t2".into()), node_set(["t1"]));
}

#[test]
fn test_retain_and_forced_trivial_overrides() {
    let g = mutex();
    let resolver = CollapseResolver::new(&g);

    // logged is trivial, held is not
    assert_eq!(resolver.successors(&"log".into()), node_set(["flush"]));
    assert_eq!(resolver.successors(&"acquire".into()), node_set(["held"]));

    let options = CollapseOptions::default()
        .with_retain(node_set(["logged"]))
        .with_forced_trivial(node_set(["held"]));
    assert_eq!(
        resolver.neighbors(&"log".into(), Direction::Forward, true, &options),
        node_set(["logged"])
    );
    assert_eq!(
        resolver.neighbors(&"acquire".into(), Direction::Forward, true, &options),
        node_set(["release", "log"])
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// TRACE TESTS
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_chain_backward_trace_golden() {
    let g = chain();
    let mut sink = TextSink::new(false);
    TraceEngine::new(&g)
        .trace_bwd(&node_set(["p3"]), &TraceOptions::default(), &mut sink)
        .unwrap();

    assert_eq!(
        sink.into_text(),
        "p3: ANYOF(1) t2\n  t2: ALLOF(1) t1\n    t1: ALLOF(1) p1\n      p1: ANYOF(0)"
    );
}

#[test]
fn test_mutex_backward_trace_golden() {
    let g = mutex();
    let mut sink = TextSink::new(true);
    TraceEngine::new(&g)
        .trace_bwd(&node_set(["done"]), &TraceOptions::default(), &mut sink)
        .unwrap();

    assert_eq!(
        sink.lines(),
        &[
            "done (done): ANYOF(1) flush",
            "  flush (flush log): ALLOF(1) log",
            "    log (write log): ALLOF(1) held",
            "      held (held): ANYOF(1) acquire",
            "        acquire (acquire lock): ALLOF(1) release",
            "          release (release lock): ALLOF(1) held",
            "            held: VISITED",
        ]
    );
}

#[test]
fn test_trace_stop_set_hides_subtree() {
    let g = mutex();
    let options = TraceOptions { stop: node_set(["acquire"]), ..TraceOptions::default() };
    let mut sink = TextSink::new(false);
    TraceEngine::new(&g)
        .trace_bwd(&node_set(["held"]), &options, &mut sink)
        .unwrap();
    assert_eq!(sink.into_text(), "held: ANYOF(1) acquire");
}

// ─────────────────────────────────────────────────────────────────────────────
// FILTER AND RENDER TESTS
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_filter_then_render() {
    let g = mutex();
    let keep = g.nodes_matching("lock$").unwrap();
    assert_eq!(keep, node_set(["acquire", "release"]));

    let r = g.restrict(&keep);
    assert_eq!(r.raw_successors(&"acquire".into()), &[NodeId::from("release")]);
    assert_eq!(r.raw_successors(&"release".into()), &[NodeId::from("acquire")]);

    let dot = render_dot(&r, &r.node_set(), &DotOptions::default());
    assert_eq!(
        dot,
        concat!(
            "digraph {\n",
            "\"acquire\" [shape=rectangle,label=\"acquire:acquire lock\"]\n",
            "\"acquire\" -> \"release\"\n",
            "\"release\" [shape=rectangle,label=\"release:release lock\"]\n",
            "\"release\" -> \"acquire\"\n",
            "}\n",
        )
    );
}

#[test]
fn test_restrict_to_everything_is_identity() {
    let g = mutex();
    assert_eq!(g.restrict(&g.node_set()), g);
    assert_eq!(g.restrict(&g.node_set()).fingerprint(), g.fingerprint());
}

// ─────────────────────────────────────────────────────────────────────────────
// LOADING AND QUERY TESTS
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_declaration_round_trips_through_graph() {
    let decl = NetDeclaration::from_json_str(CHAIN_NET).unwrap();
    let g = PetriGraph::from_declaration(&decl).unwrap();
    assert_eq!(g.declaration(), decl);
    assert_eq!(g.node_count(), 5);
    assert_eq!(g.edge_count(), 4);
}

#[test]
fn test_numeric_ids_are_accepted() {
    let g = PetriGraph::from_json_str(
        r#"{"places": [[1, "a", [2]], [3, "b", []]], "transitions": [[2, "go", [3]]]}"#,
    )
    .unwrap();
    assert!(g.is_transition(&NodeId::from(2u64)));
    assert_eq!(g.label(&"3".into()).unwrap(), "b");
}

#[test]
fn test_numeric_and_text_ids_are_one_namespace() {
    let g = PetriGraph::from_json_str(
        r#"{"places": [[12, "a", []]], "transitions": [["go", "go", ["12"]]]}"#,
    )
    .unwrap();
    assert_eq!(g.raw_successors(&"go".into()), &[NodeId::from(12u64)]);

    let both = r#"{"places": [[12, "a", []], ["12", "b", []]]}"#;
    assert!(matches!(
        PetriGraph::from_json_str(both),
        Err(LoadError::Graph(GraphError::DuplicateNode { .. }))
    ));
}

#[test]
fn test_undeclared_target_rejected() {
    let err = PetriGraph::from_json_str(r#"{"places": [["p", "p", ["t"]]]}"#).unwrap_err();
    match err {
        LoadError::Graph(GraphError::UndeclaredNode { from, to }) => {
            assert_eq!(from, NodeId::from("p"));
            assert_eq!(to, NodeId::from("t"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_duplicate_and_conflicting_ids_rejected() {
    let dup = r#"{"places": [["p", "a", []], ["p", "b", []]]}"#;
    assert!(matches!(
        PetriGraph::from_json_str(dup),
        Err(LoadError::Graph(GraphError::DuplicateNode { .. }))
    ));

    let conflict = r#"{"places": [["x", "a", []]], "transitions": [["x", "b", []]]}"#;
    assert!(matches!(
        PetriGraph::from_json_str(conflict),
        Err(LoadError::Graph(GraphError::KindConflict(_)))
    ));
}

#[test]
fn test_query_file_drives_chop() {
    let g = chain();
    let query = AnalysisQuery::from_json_str(
        r#"{"mode": "chop", "seeds": ["^request"], "targets": ["^response"]}"#,
    )
    .unwrap();
    let report = query.run(&g).unwrap();

    assert_eq!(report.mode, AnalysisMode::Chop);
    assert_eq!(report.nodes, g.node_set());
    assert_eq!(report.highlight, node_set(["p1", "p3"]));
    assert_eq!(report.query_hash, query.params_hash());
}

#[test]
fn test_fingerprint_is_stable_and_content_sensitive() {
    let a = chain();
    let b = chain();
    assert_eq!(a.fingerprint(), b.fingerprint());

    let renamed = PetriGraph::from_json_str(&CHAIN_NET.replace("validated", "checked")).unwrap();
    assert_ne!(a.fingerprint(), renamed.fingerprint());
}

#[test]
fn test_repeated_runs_are_deterministic() {
    let g = mutex();
    let query = AnalysisQuery::trace(Direction::Forward, patterns(&["^ready$", "^token$"]));

    let first = query.run(&g).unwrap();
    for _ in 0..20 {
        assert_eq!(query.run(&g).unwrap(), first);
    }
    assert!(!first.trace.is_empty());
    assert!(first.nodes.is_superset(&node_set(["ready", "token"])));
    assert_eq!(first.highlight, node_set(["ready", "token"]));
}
