use clap::{Args, Parser, Subcommand};
use std::{
    env,
    path::PathBuf,
    process::ExitCode,
};
use topic_tree::{
    diagnostics::report_io_error,
    project::{locate, TreeLocation},
    tools::{
        render_orphans, render_outline, render_topic, run_validate, run_watch, LoadedTree,
        EXIT_INVALID, EXIT_IO, EXIT_OK,
    },
    tree::{Snapshot, SnapshotHolder},
};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "TOPIC_TREE_LOG";

#[derive(Parser)]
#[command(name = "topic-tree")]
#[command(version)]
#[command(about = "Validate and navigate declarative topic trees")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TreeArgs {
    /// Tree declaration; falls back to `source` in topictree.toml
    source: Option<PathBuf>,
    /// Directory holding the topic files
    #[arg(long)]
    content: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a declaration; silent on success, one line per diagnostic otherwise
    Validate {
        #[command(flatten)]
        tree: TreeArgs,
        /// Also render annotated reports on stderr
        #[arg(long)]
        fancy: bool,
    },
    /// Print the resolved outline in read order
    Tree {
        #[command(flatten)]
        tree: TreeArgs,
    },
    /// Show breadcrumb, children and neighbours of one topic
    Show {
        /// Topic identifier
        id: String,
        #[command(flatten)]
        tree: TreeArgs,
    },
    /// List topic files that no entry references
    Orphans {
        #[command(flatten)]
        tree: TreeArgs,
    },
    /// Revalidate whenever the declaration or its content changes
    Watch {
        #[command(flatten)]
        tree: TreeArgs,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    ExitCode::from(run(cli.command))
}

fn run(command: Commands) -> u8 {
    match command {
        Commands::Validate { tree, fancy } => {
            with_tree(&tree, |loaded| run_validate(loaded, fancy))
        }
        Commands::Tree { tree } => with_snapshot(&tree, |_, snapshot| {
            print!("{}", render_outline(snapshot));
            EXIT_OK
        }),
        Commands::Show { id, tree } => with_snapshot(&tree, |_, snapshot| {
            match render_topic(snapshot, &id) {
                Ok(view) => {
                    print!("{view}");
                    EXIT_OK
                }
                Err(err) => {
                    eprintln!("{err}");
                    EXIT_INVALID
                }
            }
        }),
        Commands::Orphans { tree } => with_snapshot(&tree, |loaded, snapshot| {
            match loaded.content.resources() {
                Ok(resources) => {
                    print!("{}", render_orphans(&snapshot.orphan_resources(resources)));
                    EXIT_OK
                }
                Err(err) => {
                    report_io_error(loaded.content.base(), &err);
                    EXIT_IO
                }
            }
        }),
        Commands::Watch { tree } => {
            let Some(location) = resolve_location(&tree) else {
                return EXIT_IO;
            };
            let holder = SnapshotHolder::new();
            match run_watch(&location.source, &location.content, &holder) {
                Ok(()) => EXIT_OK,
                Err(err) => {
                    eprintln!("watch error: {err}");
                    EXIT_IO
                }
            }
        }
    }
}

fn resolve_location(args: &TreeArgs) -> Option<TreeLocation> {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match locate(args.source.as_deref(), args.content.as_deref(), &cwd) {
        Ok(location) => Some(location),
        Err(err) => {
            eprintln!("topic-tree: {err}");
            None
        }
    }
}

fn with_tree(args: &TreeArgs, f: impl FnOnce(&LoadedTree) -> u8) -> u8 {
    let Some(location) = resolve_location(args) else {
        return EXIT_IO;
    };
    let source_path = location.source.clone();
    match LoadedTree::load(location) {
        Ok(loaded) => f(&loaded),
        Err(err) => {
            report_io_error(&source_path, &err);
            EXIT_IO
        }
    }
}

fn with_snapshot(
    args: &TreeArgs,
    f: impl FnOnce(&LoadedTree, &Snapshot) -> u8,
) -> u8 {
    with_tree(args, |loaded| match loaded.resolve() {
        Ok(snapshot) => f(loaded, &snapshot),
        Err(err) => {
            loaded.report(&err, false);
            EXIT_INVALID
        }
    })
}
