// Buildswarm Library - Chat-Coordinated Multi-Agent Build Orchestration
// This exposes the core components for testing and integration

pub mod audit;
pub mod config;
pub mod coordinator;
pub mod graph;
pub mod protocol;
pub mod shutdown;
pub mod spec;
pub mod telemetry;
pub mod workspace;

// Re-export key types for easy access
pub use audit::{AuditResult, AuditRunner, AuditVerdict, CommandAuditor};
pub use config::{config, init_config, BuildswarmConfig};
pub use coordinator::{
    provision_workspaces, Component, ComponentSet, ComponentStatus, Coordinator, CoordinatorEvent,
    IntegrationDriver, IntegrationReport, MergeItem,
};
pub use graph::{integration_order, CycleError};
pub use protocol::{ChannelMessage, ChatClient, ChatSink, Command, ProtocolError};
pub use spec::{ingest, SpecError};
pub use telemetry::{init_telemetry, shutdown_telemetry};
pub use workspace::{GitWorkspaces, Workspace, WorkspaceError, WorkspaceOps};
