// Dependency-order resolution over the component set.

use std::collections::HashMap;

use thiserror::Error;

use crate::coordinator::state::ComponentSet;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circular dependency detected at '{component}'")]
pub struct CycleError {
    pub component: String,
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    InProgress,
    Done,
}

/// Compute a dependency-first integration order: for every edge
/// `A depends on B`, `B` appears before `A`. Components are visited in
/// ingestion order, so the result is deterministic for a given spec.
/// Dependency names that do not refer to an ingested component are
/// skipped rather than traversed.
pub fn integration_order(components: &ComponentSet) -> Result<Vec<String>, CycleError> {
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut sorted = Vec::with_capacity(components.len());

    for name in components.names() {
        visit(name, components, &mut marks, &mut sorted)?;
    }

    Ok(sorted)
}

fn visit<'a>(
    name: &'a str,
    components: &'a ComponentSet,
    marks: &mut HashMap<&'a str, Mark>,
    sorted: &mut Vec<String>,
) -> Result<(), CycleError> {
    match marks.get(name) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::InProgress) => {
            return Err(CycleError {
                component: name.to_string(),
            })
        }
        None => {}
    }

    marks.insert(name, Mark::InProgress);

    if let Some(component) = components.get(name) {
        for dep in &component.dependencies {
            if components.contains(dep) {
                visit(dep.as_str(), components, marks, sorted)?;
            }
        }
    }

    marks.insert(name, Mark::Done);
    sorted.push(name.to_string());
    Ok(())
}
