use clap::{Parser, Subcommand};
use dockpick::{
    capture_listing, dispatch_batch, resolve_indices, select_names, DockerOp, SnapshotStore,
};
use stacked_errors::{Result, StackableErr};

/// Numbered docker container listings with batch start/stop/rm by listing
/// number
#[derive(Debug, Parser)]
#[command(name = "dockpick", version, about)]
struct Args {
    /// Forward the stdout/stderr of the underlying `docker` commands
    #[arg(short, long)]
    debug: bool,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Show docker containers as a numbered listing and remember it
    Ps {
        /// List all containers, not just running ones
        #[arg(short, long)]
        all: bool,
    },
    /// Start containers by listing number
    Start {
        /// Index expressions such as `3`, `1,3,5`, or `2...4`
        indices: Vec<String>,
    },
    /// Stop containers by listing number
    Stop { indices: Vec<String> },
    /// Remove containers by listing number
    Rm { indices: Vec<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .init();
    let args = Args::parse();
    let store = SnapshotStore::new(SnapshotStore::default_path());
    match args.command {
        Cmd::Ps { all } => {
            capture_listing(&store, all, args.debug).await?;
        }
        Cmd::Start { indices } => batch(&store, DockerOp::Start, &indices, args.debug).await?,
        Cmd::Stop { indices } => batch(&store, DockerOp::Stop, &indices, args.debug).await?,
        Cmd::Rm { indices } => batch(&store, DockerOp::Remove, &indices, args.debug).await?,
    }
    Ok(())
}

/// Resolves the index expressions against the last snapshot and fans the op
/// out. Per-item failures are reported by the dispatcher and do not fail the
/// process, only infrastructure errors do.
async fn batch(
    store: &SnapshotStore,
    op: DockerOp,
    indices: &[String],
    debug_forward: bool,
) -> Result<()> {
    let offsets = resolve_indices(indices)?;
    let snapshot = store.load().await?;
    let names = select_names(&snapshot, &offsets);
    let _ = dispatch_batch(op, names, debug_forward).await.stack()?;
    Ok(())
}
