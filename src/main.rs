// Pagetree CLI - replay page actions against an in-memory workspace
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Macro for conditional printing based on quiet flag
macro_rules! qprintln {
    ($quiet:expr, $($arg:tt)*) => {
        if !$quiet {
            println!($($arg)*);
        }
    };
}

use pagetree::{
    create_file_sink, get_metrics, init_logging_with_level, log_operation, with_trace_id,
    EngineConfig, Operation, OperationContext, PageAction, PageRepository, ParentId,
    SequentialIdGenerator, Snapshot, Workspace,
};

#[derive(Parser)]
#[command(
    name = "pagetree",
    version,
    about = "Replay page-tree actions and inspect the resulting workspace"
)]
struct Cli {
    /// Enable verbose logging (DEBUG level). Default is WARN level.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Engine configuration file (TOML)
    #[arg(short, long, global = true, env = "PAGETREE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON-lines file of actions and print the final tree
    Replay {
        /// One JSON action per line, e.g. {"type":"add-page","name":"Notes","parent":"root"}
        script: PathBuf,

        /// Print the final snapshot as JSON instead of a tree
        #[arg(long)]
        json: bool,

        /// Append created pages to this JSON-lines file
        #[arg(long)]
        persist: Option<PathBuf>,

        /// Use deterministic ids instead of random UUIDs
        #[arg(long)]
        sequential_ids: bool,
    },
    /// Print the effective engine configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _ = init_logging_with_level(cli.verbose, cli.quiet);
    let quiet = cli.quiet;

    with_trace_id("pagetree-cli", async move {
        let config = match &cli.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        let ctx = OperationContext::new("startup");
        log_operation::<anyhow::Error>(
            &ctx,
            &Operation::Startup {
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            &Ok(()),
        );

        match cli.command {
            Commands::Config => {
                print!("{}", toml::to_string_pretty(&config)?);
            }
            Commands::Replay {
                script,
                json,
                persist,
                sequential_ids,
            } => {
                let mut workspace = Workspace::new(config);
                if sequential_ids {
                    workspace = workspace.with_id_generator(Arc::new(SequentialIdGenerator::new()));
                }
                if let Some(path) = &persist {
                    workspace = workspace.with_sink(Arc::new(create_file_sink(path).await?));
                }

                let actions = read_script(&script)?;
                let mut failures = 0usize;
                for (line, action) in actions {
                    match workspace.dispatch_and_persist(&action).await {
                        Ok(committed) => {
                            for e in &committed.persistence_failures {
                                eprintln!("line {line}: persistence failed: {e}");
                            }
                        }
                        Err(e) => {
                            failures += 1;
                            eprintln!("line {line}: {} rejected: {e}", action.kind());
                        }
                    }
                }

                let snapshot = workspace.snapshot();
                if json {
                    println!("{}", serde_json::to_string_pretty(snapshot.as_ref())?);
                } else {
                    print_tree(&snapshot, ParentId::Root, 0);
                    qprintln!(
                        quiet,
                        "\n{} pages, {} rejected actions",
                        snapshot.len(),
                        failures
                    );
                }
                if cli.verbose {
                    println!("{}", serde_json::to_string_pretty(&get_metrics())?);
                }
            }
        }
        log_operation::<anyhow::Error>(
            &ctx.child("shutdown"),
            &Operation::Shutdown {
                reason: "completed".to_string(),
            },
            &Ok(()),
        );
        Ok::<(), anyhow::Error>(())
    })
    .await
}

/// Parse a JSON-lines action script, keeping 1-based line numbers
fn read_script(path: &Path) -> Result<Vec<(usize, PageAction)>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script: {}", path.display()))?;
    raw.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(n, line)| {
            let action: PageAction = serde_json::from_str(line)
                .with_context(|| format!("Invalid action at line {}", n + 1))?;
            Ok::<_, anyhow::Error>((n + 1, action))
        })
        .collect()
}

fn print_tree(snapshot: &Snapshot, parent: ParentId, depth: usize) {
    for page in snapshot.siblings(parent) {
        let marker = if snapshot.selected_page() == Some(page.id) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {:indent$}{} [sort {}] {}",
            "",
            page.name,
            page.sort,
            page.id,
            indent = depth * 2
        );
        print_tree(snapshot, ParentId::Page(page.id), depth + 1);
    }
}
