// Build coordination - the authoritative component lifecycle, driven by
// a single event loop. Workers never mutate state directly; every
// transition is validated against the coordinator's own record.

pub mod integrator;
pub mod state;

pub use integrator::{IntegrationDriver, IntegrationReport, MergeItem};
pub use state::{Component, ComponentSet, ComponentStatus};

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{error, info, trace, warn};

use crate::audit::{AuditRunner, AuditVerdict};
use crate::graph;
use crate::protocol::{ChannelMessage, ChatSink, Command};
use crate::shutdown;
use crate::workspace::WorkspaceOps;

/// Everything that can reach the coordinator's state-update loop.
/// Background work (audits, the merge sequence) posts results back as
/// events instead of touching state from another task.
#[derive(Debug)]
pub enum CoordinatorEvent {
    Chat(ChannelMessage),
    AuditOutcome {
        component: String,
        verdict: AuditVerdict,
    },
    IntegrationFinished(IntegrationReport),
    Shutdown,
}

pub struct Coordinator {
    components: ComponentSet,
    spec_dir: PathBuf,
    sink: Arc<dyn ChatSink>,
    workspaces: Arc<dyn WorkspaceOps>,
    auditor: Arc<dyn AuditRunner>,
    events_tx: mpsc::Sender<CoordinatorEvent>,
    /// Latch: integration is triggered at most once per run, no matter
    /// how many audit results re-complete the all-audited condition.
    integration_started: bool,
}

impl Coordinator {
    pub fn new(
        components: ComponentSet,
        spec_dir: PathBuf,
        sink: Arc<dyn ChatSink>,
        workspaces: Arc<dyn WorkspaceOps>,
        auditor: Arc<dyn AuditRunner>,
        events_tx: mpsc::Sender<CoordinatorEvent>,
    ) -> Self {
        Self {
            components,
            spec_dir,
            sink,
            workspaces,
            auditor,
            events_tx,
            integration_started: false,
        }
    }

    pub fn components(&self) -> &ComponentSet {
        &self.components
    }

    /// Announce the build and the claimable components on the channel.
    pub async fn announce(&self) -> Result<()> {
        let spec_name = self
            .spec_dir
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.spec_dir.display().to_string());
        let available: Vec<&str> = self
            .components
            .iter()
            .filter(|c| c.status == ComponentStatus::Available)
            .map(|c| c.name.as_str())
            .collect();

        self.sink
            .send(&format!("BUILD STARTING - spec: {spec_name}"))
            .await?;
        self.sink
            .send(&format!("Available components: {}", available.join(", ")))
            .await?;
        self.sink.send("Claim with: CLAIM <component>").await?;
        for comp in self.components.iter() {
            if !comp.dependencies.is_empty() {
                self.sink
                    .send(&format!(
                        "  {} depends on: {}",
                        comp.name,
                        comp.dependencies.join(", ")
                    ))
                    .await?;
            }
        }

        self.log_status();
        Ok(())
    }

    /// Consume events until shutdown. This is the only place component
    /// state is ever mutated.
    pub async fn run(mut self, mut events: mpsc::Receiver<CoordinatorEvent>) -> Result<()> {
        while let Some(event) = events.recv().await {
            if matches!(event, CoordinatorEvent::Shutdown) {
                self.shutdown().await;
                break;
            }
            self.handle_event(event).await?;
        }
        Ok(())
    }

    pub async fn handle_event(&mut self, event: CoordinatorEvent) -> Result<()> {
        match event {
            CoordinatorEvent::Chat(message) => self.handle_message(&message).await,
            CoordinatorEvent::AuditOutcome { component, verdict } => {
                self.apply_audit(&component, &verdict).await
            }
            CoordinatorEvent::IntegrationFinished(report) => self.finish_integration(report),
            CoordinatorEvent::Shutdown => {
                self.shutdown().await;
                Ok(())
            }
        }
    }

    async fn handle_message(&mut self, message: &ChannelMessage) -> Result<()> {
        let Some(command) = Command::parse(&message.content) else {
            trace!(from = %message.from, "ignoring unrecognized message");
            return Ok(());
        };

        match command {
            Command::Claim { component } => self.handle_claim(&message.from, &component).await,
            Command::Ready { component, branch } => {
                self.handle_ready(&message.from, &component, branch).await
            }
            Command::Blocked {
                component,
                dependency,
            } => self.handle_blocked(&message.from, &component, dependency),
            Command::Fail { component, reason } => {
                self.handle_fail(&message.from, &component, &reason).await
            }
            Command::Audit {
                component,
                passed,
                detail,
            } => {
                let verdict = if passed {
                    AuditVerdict::pass(detail)
                } else {
                    AuditVerdict::fail(detail)
                };
                self.apply_audit(&component, &verdict).await
            }
        }
    }

    async fn handle_claim(&mut self, from: &str, name: &str) -> Result<()> {
        let Some(comp) = self.components.get(name) else {
            warn!(worker = from, component = name, "claim of unknown component rejected");
            self.sink
                .send(&format!("REJECTED {name} - unknown component"))
                .await?;
            return Ok(());
        };

        if comp.status != ComponentStatus::Available {
            let mut reply = format!("REJECTED {name} - already {}", comp.status);
            if let Some(assignee) = &comp.assignee {
                reply.push_str(&format!(" by {assignee}"));
            }
            warn!(
                worker = from,
                component = name,
                status = %comp.status,
                "claim of unavailable component rejected"
            );
            self.sink.send(&reply).await?;
            return Ok(());
        }

        // Dependencies not yet satisfied at claim time. The claim is
        // still granted: the worker can scaffold while it waits.
        let unmet: Vec<String> = comp
            .dependencies
            .iter()
            .filter(|dep| {
                self.components
                    .get(dep.as_str())
                    .map_or(true, |d| !d.status.satisfies_dependents())
            })
            .cloned()
            .collect();

        let workspace = comp
            .workspace
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "none".to_string());
        let spec_path = comp.spec_path.display().to_string();

        if let Some(comp) = self.components.get_mut(name) {
            comp.status = ComponentStatus::Claimed;
            comp.assignee = Some(from.to_string());
            comp.blocked_by = unmet.clone();
        }

        info!(component = name, worker = from, "component assigned");
        self.sink
            .send(&format!("ASSIGN {name} {workspace} {spec_path}"))
            .await?;

        if !unmet.is_empty() {
            info!(component = name, blocked_by = %unmet.join(", "), "assignment is blocked");
            self.sink
                .send(&format!("NOTE {name} blocked by: {}", unmet.join(", ")))
                .await?;
        }

        self.log_status();
        Ok(())
    }

    async fn handle_ready(
        &mut self,
        from: &str,
        name: &str,
        branch: Option<String>,
    ) -> Result<()> {
        let Some(comp) = self.components.get(name) else {
            info!(worker = from, component = name, "READY for unknown component ignored");
            return Ok(());
        };
        if comp.assignee.as_deref() != Some(from) {
            warn!(
                worker = from,
                component = name,
                assignee = comp.assignee.as_deref().unwrap_or("nobody"),
                "ignoring READY from non-assignee"
            );
            return Ok(());
        }
        if !matches!(
            comp.status,
            ComponentStatus::Claimed | ComponentStatus::Ready
        ) {
            warn!(
                component = name,
                status = %comp.status,
                "ignoring READY in current status"
            );
            return Ok(());
        }

        if let Some(comp) = self.components.get_mut(name) {
            comp.status = ComponentStatus::Ready;
            if let Some(branch) = branch {
                comp.branch = Some(branch);
            }
        }
        let branch = self
            .components
            .get(name)
            .and_then(|c| c.branch.clone())
            .unwrap_or_default();
        info!(component = name, branch = %branch, "component ready");

        // A ready component no longer blocks its dependents.
        let dependents: Vec<String> = self.components.names().to_vec();
        let mut unblocked = Vec::new();
        for other in dependents {
            let Some(dependent) = self.components.get_mut(&other) else {
                continue;
            };
            if let Some(pos) = dependent.blocked_by.iter().position(|dep| dep == name) {
                dependent.blocked_by.remove(pos);
                if dependent.blocked_by.is_empty() && dependent.status == ComponentStatus::Claimed {
                    unblocked.push(other);
                }
            }
        }
        for dependent in &unblocked {
            info!(component = %dependent, "unblocked");
            self.sink.send(&format!("UNBLOCKED {dependent}")).await?;
        }

        self.spawn_audit(name);
        self.log_status();
        Ok(())
    }

    fn handle_blocked(&mut self, from: &str, name: &str, dependency: Option<String>) -> Result<()> {
        let Some(comp) = self.components.get_mut(name) else {
            return Ok(());
        };
        info!(
            worker = from,
            component = name,
            dependency = dependency.as_deref().unwrap_or("unspecified"),
            "worker reports blocked"
        );
        if comp.status != ComponentStatus::Claimed {
            warn!(component = name, status = %comp.status, "ignoring BLOCKED for non-claimed component");
            return Ok(());
        }
        if let Some(dep) = dependency {
            if !comp.dependencies.contains(&dep) {
                warn!(
                    component = name,
                    dependency = %dep,
                    "reported blocker is not a declared dependency"
                );
            } else if !comp.blocked_by.contains(&dep) {
                comp.blocked_by.push(dep);
            }
        }
        Ok(())
    }

    async fn handle_fail(&mut self, from: &str, name: &str, reason: &str) -> Result<()> {
        if !self.components.contains(name) {
            return Ok(());
        }
        // v1: failures are logged for human review, never auto-retried.
        warn!(worker = from, component = name, reason, "build failure reported");
        self.sink
            .send(&format!("ACK {name} FAIL - logged for human review"))
            .await?;
        self.log_status();
        Ok(())
    }

    /// Apply one verification result, whether it came from the internal
    /// audit task or an AUDIT message on the channel.
    async fn apply_audit(&mut self, name: &str, verdict: &AuditVerdict) -> Result<()> {
        let Some(comp) = self.components.get(name) else {
            return Ok(());
        };
        if comp.status != ComponentStatus::Ready {
            info!(
                component = name,
                status = %comp.status,
                "ignoring audit result in current status"
            );
            return Ok(());
        }

        if verdict.passed() {
            if let Some(comp) = self.components.get_mut(name) {
                comp.status = ComponentStatus::Audited;
            }
            info!(component = name, "audit passed");
            self.maybe_start_integration().await?;
        } else {
            let assignee = self
                .components
                .get(name)
                .and_then(|c| c.assignee.clone())
                .unwrap_or_else(|| "unassigned".to_string());
            let target = if assignee.starts_with('@') {
                assignee
            } else {
                format!("@{assignee}")
            };
            warn!(
                component = name,
                detail = %verdict.detail,
                "audit failed - requesting retry"
            );
            self.sink
                .send(&format!("{target} AUDIT {name} FAIL {}", verdict.detail))
                .await?;
        }

        self.log_status();
        Ok(())
    }

    /// Run the auditor off the message path; the verdict comes back as
    /// an `AuditOutcome` event.
    fn spawn_audit(&self, name: &str) {
        let auditor = Arc::clone(&self.auditor);
        let sink = Arc::clone(&self.sink);
        let events = self.events_tx.clone();
        let spec_dir = self.spec_dir.clone();
        let workspace = self.components.get(name).and_then(|c| c.workspace.clone());
        let component = name.to_string();

        tokio::spawn(async move {
            let verdict = auditor
                .audit(&component, &spec_dir, workspace.as_deref())
                .await;
            let line = match (verdict.passed(), verdict.detail.is_empty()) {
                (true, true) => format!("AUDIT {component} PASS"),
                (true, false) => format!("AUDIT {component} PASS {}", verdict.detail),
                (false, _) => format!("AUDIT {component} FAIL {}", verdict.detail),
            };
            if let Err(e) = sink.send(&line).await {
                warn!(component = %component, error = %e, "could not announce audit result");
            }
            let _ = events
                .send(CoordinatorEvent::AuditOutcome { component, verdict })
                .await;
        });
    }

    async fn maybe_start_integration(&mut self) -> Result<()> {
        if self.integration_started || !self.components.all_audited() {
            return Ok(());
        }
        self.integration_started = true;
        info!("all components audited - starting integration");

        let order = match graph::integration_order(&self.components) {
            Ok(order) => order,
            Err(cycle) => {
                // Unrecoverable: no partial integration is attempted.
                error!(error = %cycle, "cannot compute integration order");
                self.sink
                    .send(&format!("INTEGRATION_FAIL {cycle}"))
                    .await?;
                return Ok(());
            }
        };

        let items: Vec<MergeItem> = order
            .iter()
            .map(|name| {
                let comp = self.components.get(name);
                MergeItem {
                    component: name.clone(),
                    branch: comp.and_then(|c| c.branch.clone()),
                    workspace: comp.and_then(|c| c.workspace.clone()),
                }
            })
            .collect();

        let driver = IntegrationDriver::new(Arc::clone(&self.workspaces), Arc::clone(&self.sink));
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let report = driver.run(items).await;
            let _ = events
                .send(CoordinatorEvent::IntegrationFinished(report))
                .await;
        });
        Ok(())
    }

    fn finish_integration(&mut self, report: IntegrationReport) -> Result<()> {
        if let Some((component, reason)) = &report.failed {
            error!(component = %component, reason = %reason, "integration aborted");
            self.log_status();
            return Ok(());
        }

        for name in &report.merged {
            if let Some(comp) = self.components.get_mut(name) {
                comp.status = ComponentStatus::Integrated;
                comp.workspace = None; // worktree removed by the driver
            }
        }
        info!("build complete - all components integrated");
        self.log_status();
        Ok(())
    }

    async fn shutdown(&mut self) {
        info!("shutting down");
        if let Err(e) = self.sink.send("BUILD COORDINATOR STOPPING").await {
            warn!(error = %e, "could not announce shutdown");
        }
        let leftovers: Vec<(String, PathBuf)> = self
            .components
            .iter()
            .filter_map(|c| c.workspace.clone().map(|path| (c.name.clone(), path)))
            .collect();
        shutdown::cleanup_workspaces(self.workspaces.as_ref(), leftovers).await;
    }

    fn log_status(&self) {
        info!("{}", self.components.status_table());
    }
}

/// Materialize one workspace per component before the channel opens.
/// Creation failures are component-scoped: the component keeps running
/// without a workspace and the rest of the build proceeds.
pub async fn provision_workspaces(components: &mut ComponentSet, workspaces: &dyn WorkspaceOps) {
    let names = components.names().to_vec();
    for name in names {
        match workspaces.create_workspace(&name).await {
            Ok(workspace) => {
                if let Some(comp) = components.get_mut(&name) {
                    comp.workspace = Some(workspace.path);
                    comp.branch = Some(workspace.branch);
                }
            }
            Err(e) => {
                warn!(
                    component = %name,
                    error = %e,
                    "failed to create workspace - component will run without one"
                );
            }
        }
    }
}
