//! Vault lifecycle: full scans, incremental reconciliation and filtering
//!
//! Each test builds a small vault on disk, mutates it the way an editor
//! would, and compares the incrementally maintained graph against what a
//! fresh scan of the same files produces.

mod common;

use common::{assert_graph_invariants, connected_components, TestVault};
use std::sync::Arc;
use vaultgraph::runtime::{change_channel, spawn_reconciler};
use vaultgraph::vault::{ReconcileOutcome, Reconciler};
use vaultgraph::{filter, FileChange, NodeKey, NodeKind, VaultConfig, VaultEngine};

fn key(s: &str) -> NodeKey {
    NodeKey::from(s)
}

#[test]
fn vault_without_tags_or_links_has_no_edges() {
    let vault = TestVault::with_files(&[
        ("A.md", "plain prose"),
        ("B.md", "more prose, an email@example.com, and a lone # sign"),
        ("notes/C.md", ""),
    ]);
    let (graph, report) = vault.scan();

    assert_eq!(report.documents, 3);
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 0);
    assert!(graph.nodes().all(|n| n.kind == NodeKind::Document));
}

#[test]
fn scanning_twice_yields_the_same_graph() {
    let vault = TestVault::with_files(&[
        ("A.md", "#x [[B]]"),
        ("B.md", "#x #y"),
        ("sub/C.md", "[[A]] [[Missing]]"),
    ]);
    let (first, first_report) = vault.scan();
    let (second, second_report) = vault.scan();

    assert_eq!(first, second);
    assert_eq!(first_report, second_report);
    assert_eq!(first_report.unresolved_references, 1);
    assert_graph_invariants(&first);
}

#[test]
fn no_op_modify_leaves_the_graph_unchanged() {
    let vault = TestVault::with_files(&[
        ("A.md", "#x [[B]]"),
        ("B.md", "#x #y [[C]]"),
        ("C.md", "[[A]]"),
        ("D.md", "nothing"),
    ]);
    let (mut graph, _) = vault.scan();
    let before = graph.clone();
    let reconciler = Reconciler::default();

    for name in ["A.md", "B.md", "C.md", "D.md"] {
        let reports = reconciler.apply_change(&mut graph, FileChange::modified(vault.path(name)));
        assert_eq!(reports[0].outcome, ReconcileOutcome::Updated);
        assert_eq!(graph, before, "modifying {} changed the graph", name);
    }
}

#[test]
fn incremental_edits_match_a_fresh_scan() {
    let vault = TestVault::with_files(&[("A.md", "#x [[B]]"), ("B.md", "#x")]);
    let (mut graph, _) = vault.scan();
    let reconciler = Reconciler::default();

    let b = vault.write("B.md", "#y [[A]]");
    reconciler.apply_change(&mut graph, FileChange::modified(&b));
    let c = vault.write("sub/C.md", "#y [[B]]");
    reconciler.apply_change(&mut graph, FileChange::created(&c));
    let a = vault.write("A.md", "no more tags");
    reconciler.apply_change(&mut graph, FileChange::modified(&a));

    let (fresh, _) = vault.scan();
    assert_eq!(graph, fresh);
    assert!(!graph.contains(&key("#x")));
    assert_graph_invariants(&graph);
}

#[test]
fn shared_tag_survives_until_its_last_document_goes() {
    let vault = TestVault::with_files(&[("A.md", "#x"), ("B.md", "#x")]);
    let (mut graph, _) = vault.scan();
    let reconciler = Reconciler::default();

    let a = vault.remove("A.md");
    let reports = reconciler.apply_change(&mut graph, FileChange::deleted(&a));
    assert_eq!(reports[0].outcome, ReconcileOutcome::Removed);
    assert!(reports[0].pruned.is_empty());
    assert!(graph.has_edge(&key("B.md"), &key("#x")));

    let b = vault.remove("B.md");
    let reports = reconciler.apply_change(&mut graph, FileChange::deleted(&b));
    assert_eq!(reports[0].pruned, vec![key("#x")]);
    assert!(graph.is_empty());
}

#[test]
fn dangling_reference_resolves_only_when_the_referrer_is_reconciled() {
    let vault = TestVault::with_files(&[("A.md", "see [[B]]")]);
    let (mut graph, report) = vault.scan();
    assert_eq!(report.unresolved_references, 1);
    assert_eq!(graph.edge_count(), 0);

    let reconciler = Reconciler::default();
    let b = vault.write("B.md", "now I exist");
    reconciler.apply_change(&mut graph, FileChange::created(&b));
    assert!(graph.contains(&key("B.md")));
    assert!(!graph.has_edge(&key("A.md"), &key("B.md")));

    reconciler.apply_change(&mut graph, FileChange::modified(vault.path("A.md")));
    assert!(graph.has_edge(&key("A.md"), &key("B.md")));

    let (fresh, _) = vault.scan();
    assert_eq!(graph, fresh);
}

#[test]
fn move_into_a_subdirectory_keeps_the_document_key() {
    let vault = TestVault::with_files(&[("A.md", "#x")]);
    let (mut graph, _) = vault.scan();

    let (from, to) = vault.rename("A.md", "archive/A.md");
    let reports = Reconciler::default().apply_change(&mut graph, FileChange::moved(&from, &to));
    assert_eq!(reports.len(), 2);

    let node = graph.node(&key("A.md")).expect("document still present");
    assert_eq!(node.path.as_deref(), Some(to.as_path()));
    assert!(graph.has_edge(&key("A.md"), &key("#x")));
}

#[test]
fn duplicate_names_track_a_fresh_scan() {
    let vault = TestVault::with_files(&[
        ("a/Note.md", "#first"),
        ("b/Note.md", "#second"),
        ("C.md", "[[Note]]"),
    ]);
    let (mut graph, _) = vault.scan();
    let reconciler = Reconciler::default();

    // Editing the shadowed copy leaves the live one alone
    let early = vault.write("a/Note.md", "#first #edited");
    let reports = reconciler.apply_change(&mut graph, FileChange::modified(&early));
    assert_eq!(reports[0].outcome, ReconcileOutcome::Shadowed);
    assert_eq!(graph, vault.scan().0);

    // Deleting the live copy falls back to the shadowed one
    let late = vault.remove("b/Note.md");
    reconciler.apply_change(&mut graph, FileChange::deleted(&late));
    assert_eq!(graph, vault.scan().0);
    assert!(graph.has_edge(&key("Note.md"), &key("#edited")));
    assert!(graph.has_edge(&key("C.md"), &key("Note.md")));
    assert!(!graph.contains(&key("#second")));

    // A later file takes over again
    let late = vault.write("b/Note.md", "#second");
    reconciler.apply_change(&mut graph, FileChange::created(&late));
    assert_eq!(graph, vault.scan().0);

    // Deleting the shadowed copy only forgets it
    let early = vault.remove("a/Note.md");
    let reports = reconciler.apply_change(&mut graph, FileChange::deleted(&early));
    assert_eq!(reports[0].outcome, ReconcileOutcome::Shadowed);
    assert_eq!(graph, vault.scan().0);
    assert_graph_invariants(&graph);
}

#[test]
fn hidden_directory_changes_leave_the_engine_graph_alone() {
    let vault = TestVault::with_files(&[("A.md", "#x")]);
    let (engine, _) = VaultEngine::open(vault.root(), VaultConfig::default()).unwrap();

    let hidden = vault.write(".obsidian/workspace.md", "#hidden [[A]]");
    let reports = engine.apply_change(FileChange::created(&hidden));
    assert_eq!(reports[0].outcome, ReconcileOutcome::Ignored);
    assert_eq!(engine.snapshot(), vault.scan().0);
}

#[test]
fn mirrored_tags_link_documents_to_bare_text_nodes() {
    let vault = TestVault::with_files(&[("A.md", "#x"), ("B.md", "#x")]);
    let config = VaultConfig {
        mirror_bare_tags: true,
        ..Default::default()
    };
    let (graph, _) = vault.scan_with(config);

    assert_eq!(graph.kind(&key("x")), Some(NodeKind::Structure));
    assert!(graph.has_edge(&key("A.md"), &key("x")));
    assert!(graph.has_edge(&key("B.md"), &key("#x")));
    assert_eq!(graph.edge_count(), 4);
    assert_graph_invariants(&graph);
}

#[test]
fn filter_keeps_matching_tag_and_its_documents() {
    let vault = TestVault::with_files(&[
        ("Plan.md", "#urgent [[Notes]]"),
        ("Notes.md", "#later"),
        ("Other.md", "#urgent"),
    ]);
    let (graph, _) = vault.scan();

    let view = filter(&graph, "#urgent");
    let keys: Vec<_> = view.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["#urgent", "Other.md", "Plan.md"]);
    // Notes.md is not in the view, so neither is the Plan-Notes edge
    assert_eq!(view.edge_count(), 2);
    assert_eq!(connected_components(&view).len(), 1);

    assert_eq!(filter(&graph, "   "), graph);
    assert!(filter(&graph, "#nothing").is_empty());
}

#[test]
fn filter_mixes_tag_and_text_terms() {
    let vault = TestVault::with_files(&[
        ("Plan.md", "#urgent"),
        ("Groceries.md", "milk"),
        ("Journal.md", "#later"),
    ]);
    let (graph, _) = vault.scan();

    let view = filter(&graph, "#urgent GROC");
    assert!(view.contains(&key("Plan.md")));
    assert!(view.contains(&key("#urgent")));
    assert!(view.contains(&key("Groceries.md")));
    assert!(!view.contains(&key("Journal.md")));
}

#[tokio::test]
async fn queued_changes_are_applied_in_order() {
    let vault = TestVault::with_files(&[("A.md", "#x")]);
    let (engine, _) = VaultEngine::open(vault.root(), VaultConfig::default()).unwrap();
    let engine = Arc::new(engine);
    let (tx, rx) = change_channel(2);
    let task = spawn_reconciler(Arc::clone(&engine), rx);

    let path = vault.write("A.md", "#y");
    tx.send(FileChange::modified(&path)).await.unwrap();
    let path = vault.write("B.md", "[[A]]");
    tx.send(FileChange::created(&path)).await.unwrap();
    let path = vault.remove("A.md");
    tx.send(FileChange::deleted(&path)).await.unwrap();
    drop(tx);

    assert_eq!(task.await.unwrap(), 3);
    let graph = engine.snapshot();
    let keys: Vec<_> = graph.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["B.md"]);
}

#[test]
fn rescan_of_a_missing_root_reports_failure_with_an_empty_graph() {
    let vault = TestVault::with_files(&[("A.md", "#x")]);
    let root = vault.root().to_path_buf();
    let (engine, _) = VaultEngine::open(&root, VaultConfig::default()).unwrap();
    drop(vault);

    assert!(engine.rescan().is_err());
    assert!(engine.snapshot().is_empty());
}
