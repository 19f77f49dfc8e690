//! Property tests for dependency-order resolution.
//! Testing library/framework: proptest on top of the built-in test
//! runner. Graphs are generated with edges pointing only at
//! lower-numbered components, so they are acyclic by construction.

use std::path::PathBuf;

use buildswarm::coordinator::{Component, ComponentSet};
use buildswarm::graph::integration_order;
use proptest::prelude::*;

const MAX_COMPONENTS: usize = 12;

fn build_set(n: usize, raw_edges: &[(usize, usize)]) -> (ComponentSet, Vec<(String, String)>) {
    let names: Vec<String> = (0..n).map(|i| format!("comp{i:02}")).collect();
    let mut deps: Vec<Vec<String>> = vec![Vec::new(); n];
    let mut edges = Vec::new();

    // An edge (a, b) with b < a < n means "a depends on b".
    for &(a, b) in raw_edges {
        if a < n && b < a {
            let dep = names[b].clone();
            if !deps[a].contains(&dep) {
                deps[a].push(dep.clone());
                edges.push((names[a].clone(), dep));
            }
        }
    }

    let mut set = ComponentSet::new();
    for (i, name) in names.iter().enumerate() {
        set.insert(Component::new(
            name.clone(),
            PathBuf::from(format!("{name}.md")),
            deps[i].clone(),
        ));
    }
    (set, edges)
}

proptest! {
    #[test]
    fn acyclic_graphs_order_every_component_dependencies_first(
        n in 1usize..MAX_COMPONENTS,
        raw_edges in proptest::collection::vec(
            (0usize..MAX_COMPONENTS, 0usize..MAX_COMPONENTS),
            0..48,
        ),
    ) {
        let (set, edges) = build_set(n, &raw_edges);
        let order = integration_order(&set).expect("acyclic graph must resolve");

        prop_assert_eq!(order.len(), n, "every component appears exactly once");
        for name in set.names() {
            prop_assert!(order.contains(name), "{} is missing", name);
        }

        for (dependent, dependency) in edges {
            let dep_pos = order
                .iter()
                .position(|x| *x == dependency)
                .expect("dependency is in the order");
            let comp_pos = order
                .iter()
                .position(|x| *x == dependent)
                .expect("dependent is in the order");
            prop_assert!(
                dep_pos < comp_pos,
                "{:?} must precede {:?} in {:?}",
                dependency,
                dependent,
                order
            );
        }
    }

    #[test]
    fn resolution_is_deterministic(
        n in 1usize..MAX_COMPONENTS,
        raw_edges in proptest::collection::vec(
            (0usize..MAX_COMPONENTS, 0usize..MAX_COMPONENTS),
            0..48,
        ),
    ) {
        let (set, _) = build_set(n, &raw_edges);
        let first = integration_order(&set).expect("acyclic graph must resolve");
        let second = integration_order(&set).expect("acyclic graph must resolve");
        prop_assert_eq!(first, second);
    }
}
