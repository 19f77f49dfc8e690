pub mod worktrees;

pub use worktrees::{GitWorkspaces, Workspace, WorkspaceError, WorkspaceOps};
