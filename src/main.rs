use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use buildswarm::audit::{AuditRunner, CommandAuditor};
use buildswarm::config::{config, init_config};
use buildswarm::coordinator::{provision_workspaces, Coordinator, CoordinatorEvent};
use buildswarm::protocol::{ChatClient, ChatSink};
use buildswarm::spec;
use buildswarm::telemetry::{init_telemetry, shutdown_telemetry};
use buildswarm::workspace::{GitWorkspaces, WorkspaceOps};

#[derive(Parser)]
#[command(name = "buildswarm")]
#[command(about = "Chat-coordinated multi-agent build orchestration")]
#[command(
    long_about = "Buildswarm coordinates multiple independent workers building separate \
                  components of one repository. It ingests a component spec directory, \
                  materializes one git worktree per component, and drives claiming, \
                  auditing, and dependency-ordered integration over a shared chat channel."
)]
struct Cli {
    /// Directory containing the component spec documents
    spec_dir: PathBuf,

    /// Chat channel to coordinate on
    #[arg(long, help = "Channel name, e.g. #build")]
    channel: Option<String>,

    /// Repository the component worktrees are created in
    #[arg(long, default_value = ".", help = "Path to the coordinated git repository")]
    repo_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tokio::runtime::Runtime::new()?.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    init_telemetry()?;
    init_config()?;
    let cfg = config()?;

    let spec_dir = cli
        .spec_dir
        .canonicalize()
        .with_context(|| format!("spec directory not found: {}", cli.spec_dir.display()))?;
    let repo_dir = cli
        .repo_dir
        .canonicalize()
        .with_context(|| format!("repository not found: {}", cli.repo_dir.display()))?;
    let channel = cli
        .channel
        .unwrap_or_else(|| cfg.chat.default_channel.clone());

    // Ingestion failures are fatal before anything touches the network.
    let mut components = spec::ingest(&spec_dir).context("failed to ingest component spec")?;
    info!(count = components.len(), "components ingested");

    let workspaces: Arc<dyn WorkspaceOps> = Arc::new(GitWorkspaces::new(
        &repo_dir,
        &cfg.workspace.worktree_base,
        &cfg.workspace.branch_prefix,
    ));
    provision_workspaces(&mut components, workspaces.as_ref()).await;

    let (client, mut inbound) = ChatClient::connect(&cfg.chat.url, &channel)
        .await
        .context("failed to connect to chat service")?;
    info!(agent_id = client.agent_id(), channel = %channel, "connected");
    let sink: Arc<dyn ChatSink> = Arc::new(client);

    let auditor: Arc<dyn AuditRunner> = Arc::new(CommandAuditor::new(
        repo_dir.join(&cfg.audit.auditor_path),
        cfg.audit.pass_markers.clone(),
        cfg.audit.detail_limit,
    ));

    let (events_tx, events_rx) = mpsc::channel(64);
    let coordinator = Coordinator::new(
        components,
        spec_dir,
        Arc::clone(&sink),
        workspaces,
        auditor,
        events_tx.clone(),
    );
    coordinator.announce().await?;

    // Pump filtered channel traffic into the event loop.
    let chat_events = events_tx.clone();
    tokio::spawn(async move {
        while let Some(message) = inbound.recv().await {
            if chat_events
                .send(CoordinatorEvent::Chat(message))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    // Operator interrupt turns into an orderly shutdown event.
    let interrupt_events = events_tx;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received - shutting down");
            if interrupt_events.send(CoordinatorEvent::Shutdown).await.is_err() {
                warn!("coordinator already stopped");
            }
        }
    });

    info!("coordinator running - press ctrl-c to stop");
    coordinator.run(events_rx).await?;

    shutdown_telemetry();
    Ok(())
}
