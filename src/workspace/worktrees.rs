// Git worktree lifecycle for per-component build isolation.
// Each component gets a branch (`build/<name>`) and a worktree under the
// configured base directory; integration merges those branches back.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use git2::{BranchType, Repository};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("git {operation} failed: {stderr}")]
    GitCommand { operation: String, stderr: String },
    #[error("failed to run git")]
    Io(#[from] std::io::Error),
}

/// An isolated, branch-bound working copy dedicated to one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub path: PathBuf,
    pub branch: String,
}

/// Version-control workspace operations, kept behind a trait so the
/// coordinator can be exercised without a real repository.
#[async_trait]
pub trait WorkspaceOps: Send + Sync {
    /// Create a fresh workspace for a component, forcibly clearing any
    /// leftover worktree or branch from a previous run first.
    async fn create_workspace(&self, component: &str) -> Result<Workspace, WorkspaceError>;

    /// Remove a workspace. Callers treat failures as best-effort.
    async fn remove_workspace(&self, path: &Path) -> Result<(), WorkspaceError>;

    /// Merge a component branch into the repository's checked-out branch.
    async fn merge_branch(&self, branch: &str) -> Result<(), WorkspaceError>;
}

/// `WorkspaceOps` backed by git worktrees in the coordinated repository.
pub struct GitWorkspaces {
    repo_dir: PathBuf,
    worktree_base: PathBuf,
    branch_prefix: String,
}

impl GitWorkspaces {
    pub fn new(repo_dir: &Path, worktree_base: &str, branch_prefix: &str) -> Self {
        Self {
            repo_dir: repo_dir.to_path_buf(),
            worktree_base: repo_dir.join(worktree_base),
            branch_prefix: branch_prefix.to_string(),
        }
    }

    fn branch_name(&self, component: &str) -> String {
        format!("{}{}", self.branch_prefix, component)
    }

    async fn git(&self, args: &[&str]) -> Result<(), WorkspaceError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_dir)
            .args(args)
            .output()
            .await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(WorkspaceError::GitCommand {
                operation: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    /// Delete a local branch left over from a previous run. The branch
    /// legitimately may not exist, so every failure is swallowed.
    fn delete_stale_branch(&self, branch: &str) {
        let repo = match Repository::open(&self.repo_dir) {
            Ok(repo) => repo,
            Err(e) => {
                debug!(error = %e, "could not open repository for branch cleanup");
                return;
            }
        };
        match repo.find_branch(branch, BranchType::Local) {
            Ok(mut stale) => {
                if let Err(e) = stale.delete() {
                    debug!(branch, error = %e, "stale branch deletion failed");
                }
            }
            Err(_) => debug!(branch, "no stale branch to delete"),
        };
    }
}

#[async_trait]
impl WorkspaceOps for GitWorkspaces {
    async fn create_workspace(&self, component: &str) -> Result<Workspace, WorkspaceError> {
        let path = self.worktree_base.join(component);
        let branch = self.branch_name(component);

        if path.exists() {
            let path_str = path.to_string_lossy();
            if let Err(e) = self
                .git(&["worktree", "remove", "--force", path_str.as_ref()])
                .await
            {
                debug!(component, error = %e, "stale worktree removal failed");
            }
        }
        self.delete_stale_branch(&branch);

        let path_str = path.to_string_lossy();
        self.git(&["worktree", "add", "-b", &branch, path_str.as_ref()])
            .await?;
        info!(component, path = %path.display(), branch = %branch, "created worktree");

        Ok(Workspace { path, branch })
    }

    async fn remove_workspace(&self, path: &Path) -> Result<(), WorkspaceError> {
        let path_str = path.to_string_lossy();
        self.git(&["worktree", "remove", "--force", path_str.as_ref()])
            .await?;
        info!(path = %path.display(), "removed worktree");
        Ok(())
    }

    async fn merge_branch(&self, branch: &str) -> Result<(), WorkspaceError> {
        self.git(&[
            "merge",
            "--no-ff",
            branch,
            "-m",
            &format!("Integrate {branch}"),
        ])
        .await
    }
}
