//! Vaultgraph CLI: scan, filter, lay out and watch a markdown vault.
//!
//! Usage:
//!   vaultgraph scan <root> [--json]
//!   vaultgraph filter <root> <query>
//!   vaultgraph layout <root> [--ticks N] [--query Q] [--seed S]
//!   vaultgraph watch <root>
//!
//! Global flags: `--config <file>` and repeatable `--set name=value`.

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vaultgraph::layout::ParamOverride;
use vaultgraph::runtime::{change_channel, run_layout, spawn_reconciler};
use vaultgraph::{
    CancellationToken, FilterQuery, GraphStore, LayoutDriver, LayoutEngine, LayoutHandle,
    LayoutSnapshot, Settings, VaultEngine, WatchBridge,
};

#[derive(Parser)]
#[command(
    name = "vaultgraph",
    version,
    about = "Live knowledge graph of a markdown vault"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Settings file (defaults to <config dir>/vaultgraph/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override a layout parameter, e.g. --set spring_strength=0.01
    #[arg(long = "set", global = true, value_name = "NAME=VALUE")]
    overrides: Vec<ParamOverride>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a vault and print graph statistics
    Scan {
        /// Vault root directory
        root: PathBuf,
        /// Print the full graph as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the nodes matching a search query
    Filter {
        /// Vault root directory
        root: PathBuf,
        /// Query, e.g. "#urgent plan"
        query: String,
    },
    /// Run the layout for a number of ticks and print the positions as JSON
    Layout {
        /// Vault root directory
        root: PathBuf,
        #[arg(long, default_value_t = 300)]
        ticks: u64,
        /// Restrict the layout to a filtered view
        #[arg(long)]
        query: Option<String>,
        /// Seed for reproducible initial placement
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Keep the graph and layout live until interrupted
    Watch {
        /// Vault root directory
        root: PathBuf,
        /// Layout tick period (overrides the settings file)
        #[arg(long)]
        period_ms: Option<u64>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(config: Option<&Path>, overrides: &[ParamOverride]) -> Result<Settings, String> {
    Settings::resolve(config)
        .and_then(|s| s.with_overrides(overrides))
        .map_err(|e| format!("Failed to load settings: {}", e))
}

fn open_engine(root: &Path, settings: &Settings) -> Result<VaultEngine, String> {
    VaultEngine::open(root, settings.vault.clone())
        .map(|(engine, _)| engine)
        .map_err(|e| format!("Failed to scan vault: {}", e))
}

fn graph_json(graph: &GraphStore) -> serde_json::Value {
    let nodes: Vec<_> = graph
        .nodes()
        .map(|n| json!({ "key": n.key, "kind": n.kind, "label": n.label }))
        .collect();
    let edges: Vec<_> = graph
        .edges()
        .map(|e| {
            let kind = graph.edge_kind(&e);
            json!({ "a": e.a, "b": e.b, "kind": kind })
        })
        .collect();
    json!({ "nodes": nodes, "edges": edges })
}

fn print_json(value: &impl serde::Serialize) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_scan(root: &Path, settings: &Settings, as_json: bool) -> i32 {
    let (engine, report) = match VaultEngine::open(root, settings.vault.clone()) {
        Ok(opened) => opened,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if as_json {
        return print_json(&json!({
            "report": report,
            "graph": engine.with_graph(graph_json),
        }));
    }
    println!("Documents:             {}", report.documents);
    println!("Tags:                  {}", report.tags);
    println!("Edges:                 {}", report.edges);
    if report.unresolved_references > 0 {
        println!("Unresolved references: {}", report.unresolved_references);
    }
    if report.unreadable > 0 {
        println!("Unreadable documents:  {}", report.unreadable);
    }
    if report.duplicates > 0 {
        println!("Duplicate file names:  {}", report.duplicates);
    }
    0
}

fn cmd_filter(root: &Path, settings: &Settings, query: &str) -> i32 {
    let engine = match open_engine(root, settings) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let view = engine.view(&FilterQuery::parse(query));
    if view.is_empty() {
        println!("No matches for '{}'", query);
        return 0;
    }
    for node in view.nodes() {
        let kind = match node.kind {
            vaultgraph::NodeKind::Document => "doc",
            vaultgraph::NodeKind::Tag => "tag",
            vaultgraph::NodeKind::Structure => "text",
        };
        println!("{:<5} {} ({} links)", kind, node.key, view.degree(&node.key));
    }
    0
}

fn cmd_layout(
    root: &Path,
    settings: &Settings,
    ticks: u64,
    query: Option<&str>,
    seed: Option<u64>,
) -> i32 {
    let engine = match open_engine(root, settings) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let layout = match seed {
        Some(seed) => LayoutEngine::with_seed(settings.layout.clone(), seed),
        None => LayoutEngine::new(settings.layout.clone()),
    };
    let handle = LayoutHandle::new(layout);
    if let Some(query) = query {
        handle.set_query(FilterQuery::parse(query));
    }

    let mut driver = LayoutDriver::new(Arc::new(engine), handle.clone());
    let mut last = None;
    for _ in 0..ticks {
        last = Some(driver.step());
    }
    if let Some(stats) = last {
        info!(
            tick = stats.tick,
            kinetic_energy = stats.kinetic_energy,
            "Layout finished"
        );
    }
    print_json(&handle.snapshot())
}

fn cmd_watch(root: &Path, settings: &Settings, period_ms: Option<u64>) -> i32 {
    // Watch events carry canonical paths; stored document paths must match
    let root = match root.canonicalize() {
        Ok(root) => root,
        Err(e) => {
            eprintln!("Error: vault root {}: {}", root.display(), e);
            return 1;
        }
    };
    let root = root.as_path();
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            return 1;
        }
    };

    rt.block_on(async {
        let engine = match open_engine(root, settings) {
            Ok(e) => Arc::new(e),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        };

        let (tx, rx) = change_channel(settings.change_queue_capacity);
        let reconciler = spawn_reconciler(Arc::clone(&engine), rx);
        let bridge = match WatchBridge::start(root, settings.vault.clone(), tx) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        };

        let handle = LayoutHandle::new(LayoutEngine::new(settings.layout.clone()));
        let period = period_ms
            .map(std::time::Duration::from_millis)
            .unwrap_or_else(|| settings.tick_period());
        let cancel = CancellationToken::new();
        let (snap_tx, mut snap_rx) = watch::channel(Arc::new(LayoutSnapshot::default()));
        let layout_task = tokio::spawn(run_layout(
            Arc::clone(&engine),
            handle,
            period,
            cancel.clone(),
            snap_tx,
        ));

        println!("Watching {} (Ctrl-C to stop)", root.display());
        let mut shown_revision = None;
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        loop {
            tokio::select! {
                _ = &mut ctrl_c => break,
                changed = snap_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let revision = engine.revision();
                    if shown_revision != Some(revision) {
                        shown_revision = Some(revision);
                        let (nodes, edges) =
                            engine.with_graph(|g| (g.node_count(), g.edge_count()));
                        let positions = snap_rx.borrow_and_update().positions.len();
                        println!("Graph: {} nodes, {} edges; layout: {} nodes", nodes, edges, positions);
                    }
                }
            }
        }

        cancel.cancel();
        if let Err(e) = layout_task.await {
            warn!(error = %e, "Layout task failed");
        }
        // Stopping the bridge drops the last sender, which ends the reconciler
        if let Err(e) = bridge.stop() {
            warn!(error = %e, "Failed to stop watcher");
        }
        match reconciler.await {
            Ok(processed) => info!(processed, "Reconciler stopped"),
            Err(e) => warn!(error = %e, "Reconciler task failed"),
        }
        0
    })
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let settings = match load_settings(cli.config.as_deref(), &cli.overrides) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Scan { root, json } => cmd_scan(&root, &settings, json),
        Commands::Filter { root, query } => cmd_filter(&root, &settings, &query),
        Commands::Layout {
            root,
            ticks,
            query,
            seed,
        } => cmd_layout(&root, &settings, ticks, query.as_deref(), seed),
        Commands::Watch { root, period_ms } => cmd_watch(&root, &settings, period_ms),
    };
    std::process::exit(code);
}
