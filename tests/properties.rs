use proptest::prelude::*;
use reflexion_core::{Edge, EdgeKind, EdgeState, Node, NodeId, ReflexionGraph, SubgraphKind};

/// Index-based description of the three graphs; parents always point to a
/// smaller index so both hierarchies are trees.
#[derive(Debug, Clone)]
struct Model {
    arch_parents: Vec<Option<usize>>,
    impl_parents: Vec<Option<usize>>,
    specified: Vec<(usize, usize)>,
    dependencies: Vec<(usize, usize, i64)>,
    mapping: Vec<(usize, usize)>,
}

fn model() -> impl Strategy<Value = Model> {
    (2usize..7, 2usize..12).prop_flat_map(|(arch_len, impl_len)| {
        (
            prop::collection::vec(prop::option::of(0..arch_len), arch_len),
            prop::collection::vec(prop::option::of(0..impl_len), impl_len),
            prop::collection::vec((0..arch_len, 0..arch_len), 0..8),
            prop::collection::vec((0..impl_len, 0..impl_len, 1i64..4), 0..16),
            prop::collection::vec((0..impl_len, 0..arch_len), 0..6),
        )
            .prop_map(|(arch_parents, impl_parents, specified, dependencies, mapping)| {
                let tree = |parents: Vec<Option<usize>>| -> Vec<Option<usize>> {
                    parents
                        .into_iter()
                        .enumerate()
                        .map(|(j, p)| p.filter(|&p| p < j))
                        .collect()
                };
                let mut unique_specified = Vec::new();
                for s in specified {
                    if !unique_specified.contains(&s) {
                        unique_specified.push(s);
                    }
                }
                let mut unique_mapping: Vec<(usize, usize)> = Vec::new();
                for (i, a) in mapping {
                    if !unique_mapping.iter().any(|&(mi, _)| mi == i) {
                        unique_mapping.push((i, a));
                    }
                }
                Model {
                    arch_parents: tree(arch_parents),
                    impl_parents: tree(impl_parents),
                    specified: unique_specified,
                    dependencies,
                    mapping: unique_mapping,
                }
            })
    })
}

struct Built {
    g: ReflexionGraph,
    arch: Vec<NodeId>,
    implementation: Vec<NodeId>,
}

fn build(m: &Model, specified: &[(usize, usize)], dependencies: &[(usize, usize, i64)], mapping: &[(usize, usize)]) -> Built {
    let mut g = ReflexionGraph::new();
    let mut arch = Vec::new();
    for (j, p) in m.arch_parents.iter().enumerate() {
        let parent = p.map(|p| arch[p]);
        arch.push(
            g.add_node(Node::new(format!("a{j}"), SubgraphKind::Architecture, parent))
                .unwrap(),
        );
    }
    let mut implementation = Vec::new();
    for (j, p) in m.impl_parents.iter().enumerate() {
        let parent = p.map(|p| implementation[p]);
        implementation.push(
            g.add_node(Node::new(format!("i{j}"), SubgraphKind::Implementation, parent))
                .unwrap(),
        );
    }
    for &(from, to) in specified {
        g.add_edge(Edge::new(arch[from], arch[to], EdgeKind::calls(), SubgraphKind::Architecture))
            .unwrap();
    }
    for &(from, to, weight) in dependencies {
        g.add_edge(
            Edge::new(implementation[from], implementation[to], EdgeKind::calls(), SubgraphKind::Implementation)
                .with_weight(weight),
        )
        .unwrap();
    }
    for &(i, a) in mapping {
        g.set_mapping(implementation[i], arch[a]).unwrap();
    }
    Built { g, arch, implementation }
}

/// Architecture-level result, independent of edge ids.
fn snapshot(g: &ReflexionGraph) -> Vec<(SubgraphKind, NodeId, NodeId, EdgeState, i64)> {
    let mut result: Vec<_> = [SubgraphKind::Architecture, SubgraphKind::Propagated]
        .into_iter()
        .flat_map(|s| g.edge_ids(s))
        .map(|eid| {
            let e = g.edge(eid).unwrap();
            (e.subgraph, e.from, e.to, e.state, e.counter)
        })
        .collect();
    result.sort();
    result
}

fn fresh_run(m: &Model, specified: &[(usize, usize)], dependencies: &[(usize, usize, i64)], mapping: &[(usize, usize)]) -> ReflexionGraph {
    let mut built = build(m, specified, dependencies, mapping);
    built.g.run().unwrap();
    built.g
}

proptest! {
    #[test]
    fn add_then_delete_mapping_restores_the_analysis(
        m in model(),
        pick in (any::<prop::sample::Index>(), any::<prop::sample::Index>()),
    ) {
        let mut built = build(&m, &m.specified, &m.dependencies, &m.mapping);
        built.g.run().unwrap();
        let before = snapshot(&built.g);
        let summary = built.g.summary();

        let from = built.implementation[pick.0.index(built.implementation.len())];
        let to = built.arch[pick.1.index(built.arch.len())];
        prop_assume!(!built.g.is_explicitly_mapped(from).unwrap());

        built.g.add_to_mapping(from, to).unwrap();
        prop_assert_eq!(built.g.implicit_target(from).unwrap(), Some(to));
        built.g.delete_from_mapping(from, to).unwrap();

        prop_assert_eq!(snapshot(&built.g), before);
        prop_assert_eq!(built.g.summary(), summary);
    }

    #[test]
    fn incremental_mapping_matches_a_fresh_run(m in model()) {
        let mut built = build(&m, &m.specified, &m.dependencies, &[]);
        built.g.run().unwrap();
        for &(i, a) in &m.mapping {
            built.g.add_to_mapping(built.implementation[i], built.arch[a]).unwrap();
        }

        let fresh = fresh_run(&m, &m.specified, &m.dependencies, &m.mapping);
        prop_assert_eq!(snapshot(&built.g), snapshot(&fresh));
        prop_assert_eq!(built.g.summary(), fresh.summary());
    }

    #[test]
    fn incremental_dependencies_match_a_fresh_run(m in model(), split in any::<prop::sample::Index>()) {
        let at = split.index(m.dependencies.len() + 1);
        let (initial, added) = m.dependencies.split_at(at);

        let mut built = build(&m, &m.specified, initial, &m.mapping);
        built.g.run().unwrap();
        let mut added_ids = Vec::new();
        for &(from, to, weight) in added {
            let edge = Edge::new(
                built.implementation[from],
                built.implementation[to],
                EdgeKind::calls(),
                SubgraphKind::Implementation,
            )
            .with_weight(weight);
            added_ids.push(built.g.add_dependency(edge).unwrap().0);
        }
        let full = fresh_run(&m, &m.specified, &m.dependencies, &m.mapping);
        prop_assert_eq!(snapshot(&built.g), snapshot(&full));

        for eid in added_ids {
            built.g.remove_dependency(eid).unwrap();
        }
        let reduced = fresh_run(&m, &m.specified, initial, &m.mapping);
        prop_assert_eq!(snapshot(&built.g), snapshot(&reduced));
    }

    #[test]
    fn incremental_specified_edges_match_a_fresh_run(m in model()) {
        prop_assume!(!m.specified.is_empty());
        let (&last, initial) = m.specified.split_last().unwrap();

        let mut built = build(&m, initial, &m.dependencies, &m.mapping);
        built.g.run().unwrap();
        let (spec, _) = built
            .g
            .add_specified_dependency(Edge::new(
                built.arch[last.0],
                built.arch[last.1],
                EdgeKind::calls(),
                SubgraphKind::Architecture,
            ))
            .unwrap();
        let full = fresh_run(&m, &m.specified, &m.dependencies, &m.mapping);
        prop_assert_eq!(snapshot(&built.g), snapshot(&full));

        built.g.remove_specified_dependency(spec).unwrap();
        let reduced = fresh_run(&m, initial, &m.dependencies, &m.mapping);
        prop_assert_eq!(snapshot(&built.g), snapshot(&reduced));
    }

    #[test]
    fn live_reparenting_matches_a_fresh_run(
        m in model(),
        pick in (any::<prop::sample::Index>(), prop::option::of(any::<prop::sample::Index>())),
    ) {
        let mut live = build(&m, &m.specified, &m.dependencies, &m.mapping);
        live.g.run().unwrap();

        let node = live.implementation[pick.0.index(live.implementation.len())];
        let new_parent = pick.1.map(|p| live.implementation[p.index(live.implementation.len())]);
        if let Some(p) = new_parent {
            prop_assume!(p != node && !live.g.is_descendant_of(p, node).unwrap());
        }
        live.g.reparent_node(node, new_parent).unwrap();
        prop_assert_eq!(live.g.parent(node).unwrap(), new_parent);

        let mut fresh = build(&m, &m.specified, &m.dependencies, &m.mapping);
        fresh.g.reparent_node(node, new_parent).unwrap();
        fresh.g.run().unwrap();
        prop_assert_eq!(snapshot(&live.g), snapshot(&fresh.g));
        prop_assert_eq!(live.g.summary(), fresh.g.summary());
    }

    #[test]
    fn counters_agree_with_states(m in model()) {
        let g = fresh_run(&m, &m.specified, &m.dependencies, &m.mapping);
        for (subgraph, _, _, state, counter) in snapshot(&g) {
            match subgraph {
                SubgraphKind::Architecture => prop_assert_eq!(counter > 0, state == EdgeState::Convergent),
                _ => prop_assert!(counter > 0 && state.is_counted()),
            }
        }
    }
}
