// Authoritative per-component build state.
// The coordinator event loop is the only writer; workers observe this
// state exclusively through channel broadcasts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Lifecycle of a single component. Progression is monotonic except for
/// the audit-failure loop, which keeps a component at `Ready` until its
/// audit passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Available,
    Claimed,
    Ready,
    Audited,
    Integrated,
}

impl ComponentStatus {
    /// A dependency in one of these states no longer blocks its dependents.
    pub fn satisfies_dependents(self) -> bool {
        matches!(
            self,
            ComponentStatus::Ready | ComponentStatus::Audited | ComponentStatus::Integrated
        )
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentStatus::Available => "available",
            ComponentStatus::Claimed => "claimed",
            ComponentStatus::Ready => "ready",
            ComponentStatus::Audited => "audited",
            ComponentStatus::Integrated => "integrated",
        };
        write!(f, "{name}")
    }
}

/// One unit of work: a component with its own spec document, dependency
/// set, branch, and isolated workspace.
#[derive(Debug, Clone)]
pub struct Component {
    pub name: String,
    pub spec_path: PathBuf,
    pub status: ComponentStatus,
    /// Worker currently responsible. Non-empty iff status is past `Available`.
    pub assignee: Option<String>,
    /// Branch the component's work lands on. Set at workspace creation,
    /// may be overridden by the branch argument of a READY command.
    pub branch: Option<String>,
    /// Fixed at ingestion time, deduplicated, insertion order preserved.
    pub dependencies: Vec<String>,
    /// Subset of `dependencies` not yet satisfied. Recomputed at claim
    /// time and mutated only while the component is `Claimed`.
    pub blocked_by: Vec<String>,
    pub workspace: Option<PathBuf>,
}

impl Component {
    pub fn new(name: impl Into<String>, spec_path: PathBuf, dependencies: Vec<String>) -> Self {
        Self {
            name: name.into(),
            spec_path,
            status: ComponentStatus::Available,
            assignee: None,
            branch: None,
            dependencies,
            blocked_by: Vec::new(),
            workspace: None,
        }
    }
}

/// The full component map. Iteration follows ingestion order (sorted
/// component-file order), which keeps dependency resolution and status
/// output reproducible across runs. Immutable after ingestion: no
/// components are added or removed mid-run.
#[derive(Debug, Default, Clone)]
pub struct ComponentSet {
    order: Vec<String>,
    by_name: HashMap<String, Component>,
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a component at ingestion time. A duplicate name replaces the
    /// earlier entry without changing its position.
    pub fn insert(&mut self, component: Component) {
        if !self.by_name.contains_key(&component.name) {
            self.order.push(component.name.clone());
        }
        self.by_name.insert(component.name.clone(), component);
    }

    pub fn get(&self, name: &str) -> Option<&Component> {
        self.by_name.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.by_name.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Component names in ingestion order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Components in ingestion order.
    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.order.iter().filter_map(|name| self.by_name.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn all_audited(&self) -> bool {
        self.iter().all(|c| c.status == ComponentStatus::Audited)
    }

    /// Render the operator-facing status table.
    pub fn status_table(&self) -> String {
        let mut out = String::from("--- Component Status ---\n");
        for comp in self.iter() {
            out.push_str(&format!("  {}: {}", comp.name, comp.status));
            if let Some(assignee) = &comp.assignee {
                out.push_str(&format!(" ({assignee})"));
            }
            if !comp.blocked_by.is_empty() {
                out.push_str(&format!(" [blocked by: {}]", comp.blocked_by.join(", ")));
            }
            out.push('\n');
        }
        out.push_str("------------------------");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, deps: &[&str]) -> Component {
        Component::new(
            name,
            PathBuf::from(format!("specs/components/{name}.md")),
            deps.iter().map(|d| d.to_string()).collect(),
        )
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut set = ComponentSet::new();
        set.insert(component("web", &["api"]));
        set.insert(component("api", &[]));
        set.insert(component("cli", &["api"]));

        let names: Vec<_> = set.names().to_vec();
        assert_eq!(names, vec!["web", "api", "cli"]);
    }

    #[test]
    fn satisfied_statuses_do_not_block() {
        assert!(!ComponentStatus::Available.satisfies_dependents());
        assert!(!ComponentStatus::Claimed.satisfies_dependents());
        assert!(ComponentStatus::Ready.satisfies_dependents());
        assert!(ComponentStatus::Audited.satisfies_dependents());
        assert!(ComponentStatus::Integrated.satisfies_dependents());
    }

    #[test]
    fn status_table_shows_assignee_and_blockers() {
        let mut set = ComponentSet::new();
        set.insert(component("api", &[]));
        let mut web = component("web", &["api"]);
        web.status = ComponentStatus::Claimed;
        web.assignee = Some("@worker-1".to_string());
        web.blocked_by = vec!["api".to_string()];
        set.insert(web);

        let table = set.status_table();
        assert!(table.contains("api: available"));
        assert!(table.contains("web: claimed (@worker-1) [blocked by: api]"));
    }
}
