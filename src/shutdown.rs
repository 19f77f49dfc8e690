// Graceful shutdown - best-effort worktree cleanup that can never
// prevent process exit.

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{info, warn};

use crate::workspace::WorkspaceOps;

const CLEANUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Remove every remaining workspace. Failures are logged and skipped,
/// and a hung git invocation is cut off by the timeout so shutdown
/// always completes.
pub async fn cleanup_workspaces(ops: &dyn WorkspaceOps, workspaces: Vec<(String, PathBuf)>) {
    if workspaces.is_empty() {
        return;
    }
    info!(count = workspaces.len(), "cleaning up worktrees");

    let sweep = async {
        for (component, path) in &workspaces {
            match ops.remove_workspace(path).await {
                Ok(()) => info!(component = %component, "removed worktree"),
                Err(e) => warn!(component = %component, error = %e, "failed to remove worktree"),
            }
        }
    };

    if timeout(CLEANUP_TIMEOUT, sweep).await.is_err() {
        warn!("workspace cleanup timed out - continuing shutdown");
    }
}
