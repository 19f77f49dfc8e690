// Ordered integration - merge component branches dependency-first,
// abort on the first failure, clean up worktrees only on full success.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::protocol::ChatSink;
use crate::workspace::WorkspaceOps;

/// What the driver needs to know about one component at merge time.
#[derive(Debug, Clone)]
pub struct MergeItem {
    pub component: String,
    pub branch: Option<String>,
    pub workspace: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct IntegrationReport {
    /// Components merged, in merge order.
    pub merged: Vec<String>,
    /// First failing component and the reason, if the run aborted.
    pub failed: Option<(String, String)>,
}

impl IntegrationReport {
    pub fn succeeded(&self) -> bool {
        self.failed.is_none()
    }
}

/// Merges component branches in the order handed to it. Runs off the
/// coordinator's message path; the report travels back as an event.
pub struct IntegrationDriver {
    workspaces: Arc<dyn WorkspaceOps>,
    sink: Arc<dyn ChatSink>,
}

impl IntegrationDriver {
    pub fn new(workspaces: Arc<dyn WorkspaceOps>, sink: Arc<dyn ChatSink>) -> Self {
        Self { workspaces, sink }
    }

    pub async fn run(&self, items: Vec<MergeItem>) -> IntegrationReport {
        let order: Vec<&str> = items.iter().map(|item| item.component.as_str()).collect();
        self.send(&format!(
            "INTEGRATING - merging in order: {}",
            order.join(" -> ")
        ))
        .await;

        let mut report = IntegrationReport::default();
        for item in &items {
            let outcome = match &item.branch {
                Some(branch) => {
                    info!(component = %item.component, branch = %branch, "merging");
                    self.workspaces
                        .merge_branch(branch)
                        .await
                        .map_err(|e| e.to_string())
                }
                None => Err("no branch recorded for component".to_string()),
            };
            match outcome {
                Ok(()) => report.merged.push(item.component.clone()),
                Err(reason) => {
                    warn!(
                        component = %item.component,
                        reason = %reason,
                        "merge failed - aborting integration"
                    );
                    self.send(&format!("INTEGRATION_FAIL {}: {}", item.component, reason))
                        .await;
                    report.failed = Some((item.component.clone(), reason));
                    // Remaining merges are skipped and worktrees are left
                    // in place for inspection.
                    return report;
                }
            }
        }

        self.send("INTEGRATED - all components merged successfully")
            .await;
        info!("all component branches merged");

        for item in &items {
            if let Some(workspace) = &item.workspace {
                if let Err(e) = self.workspaces.remove_workspace(workspace).await {
                    warn!(component = %item.component, error = %e, "worktree cleanup failed");
                }
            }
        }

        report
    }

    async fn send(&self, text: &str) {
        if let Err(e) = self.sink.send(text).await {
            warn!(error = %e, "could not announce integration progress");
        }
    }
}
