//! Property-based tests for archive round trips.
//!
//! Generates random object graphs (shared nodes, cycles, null edges) and
//! random field values, then checks that a write/read cycle restores the same
//! shape and the same data.

use std::collections::HashMap;

use graphcode::{Archivable, ClassFactory, Graphcode, Handle, ObjectGraph};
use proptest::prelude::*;

#[derive(Archivable, Default, Debug)]
#[archive(class = "prop::Node")]
struct Node {
    weight: i64,
    #[archive(polymorphic)]
    edges: Vec<Option<Handle>>,
}

#[derive(Archivable, Default, Debug, Clone, PartialEq)]
#[archive(class = "prop::Values")]
struct Values {
    flag: bool,
    small: i8,
    word: u16,
    signed: i32,
    wide: u64,
    ratio: f32,
    exact: f64,
    letter: char,
    text: String,
    list: Vec<i16>,
}

fn factory() -> ClassFactory {
    let mut factory = ClassFactory::new();
    factory.register::<Node>().expect("register Node");
    factory.register::<Values>().expect("register Values");
    factory
}

// ===========================================================================
// Generators
// ===========================================================================

/// Node weights plus, per node, a list of edge targets (`None` = null edge).
fn arb_graph(max_nodes: usize) -> impl Strategy<Value = (Vec<i64>, Vec<Vec<Option<usize>>>)> {
    (1..=max_nodes).prop_flat_map(|n| {
        (
            proptest::collection::vec(any::<i64>(), n),
            proptest::collection::vec(
                proptest::collection::vec(proptest::option::of(0..n), 0..4),
                n,
            ),
        )
    })
}

fn arb_values() -> impl Strategy<Value = Values> {
    (
        (any::<bool>(), any::<i8>(), any::<u16>(), any::<i32>(), any::<u64>()),
        (any::<f32>(), any::<f64>(), any::<char>(), ".{0,24}"),
        proptest::collection::vec(any::<i16>(), 0..32),
    )
        .prop_map(
            |((flag, small, word, signed, wide), (ratio, exact, letter, text), list)| Values {
                flag,
                small,
                word,
                signed,
                wide,
                ratio,
                exact,
                letter,
                text,
                list,
            },
        )
}

fn build(weights: &[i64], edges: &[Vec<Option<usize>>]) -> (ObjectGraph, Vec<Handle>) {
    let mut graph = ObjectGraph::new();
    let handles: Vec<Handle> = weights
        .iter()
        .map(|&weight| {
            graph.insert(Node {
                weight,
                edges: Vec::new(),
            })
        })
        .collect();
    for (i, targets) in edges.iter().enumerate() {
        let node = graph.get_mut_as::<Node>(handles[i]).expect("node");
        node.edges = targets.iter().map(|t| t.map(|j| handles[j])).collect();
    }
    (graph, handles)
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #[test]
    fn graph_shape_survives_round_trip((weights, edges) in arb_graph(12)) {
        let (graph, handles) = build(&weights, &edges);
        let bytes = Graphcode::to_bytes(&graph, handles[0]).expect("write");
        let restored = Graphcode::from_bytes(&bytes, &factory()).expect("read");

        // Walk both graphs in lockstep, pairing original and restored handles.
        let mut pairs: HashMap<Handle, Handle> = HashMap::new();
        let mut stack = vec![(handles[0], restored.root)];
        while let Some((original, copy)) = stack.pop() {
            if let Some(&seen) = pairs.get(&original) {
                prop_assert_eq!(seen, copy);
                continue;
            }
            pairs.insert(original, copy);

            let a = graph.get_as::<Node>(original).expect("original");
            let b = restored.graph.get_as::<Node>(copy).expect("restored");
            prop_assert_eq!(a.weight, b.weight);
            prop_assert_eq!(a.edges.len(), b.edges.len());
            for (x, y) in a.edges.iter().zip(&b.edges) {
                match (x, y) {
                    (Some(x), Some(y)) => stack.push((*x, *y)),
                    (None, None) => {}
                    _ => prop_assert!(false, "null edge mismatch"),
                }
            }
        }

        // Every reachable object was rebuilt exactly once.
        prop_assert_eq!(restored.graph.len(), pairs.len());
    }

    #[test]
    fn field_values_survive_round_trip(values in arb_values()) {
        let mut graph = ObjectGraph::new();
        let root = graph.insert(values.clone());
        let bytes = Graphcode::to_bytes(&graph, root).expect("write");
        let restored = Graphcode::from_bytes(&bytes, &factory()).expect("read");
        let read_back = restored.graph.get_as::<Values>(restored.root).expect("values");

        prop_assert_eq!(read_back.flag, values.flag);
        prop_assert_eq!(read_back.small, values.small);
        prop_assert_eq!(read_back.word, values.word);
        prop_assert_eq!(read_back.signed, values.signed);
        prop_assert_eq!(read_back.wide, values.wide);
        prop_assert_eq!(read_back.ratio.to_bits(), values.ratio.to_bits());
        prop_assert_eq!(read_back.exact.to_bits(), values.exact.to_bits());
        prop_assert_eq!(read_back.letter, values.letter);
        prop_assert_eq!(&read_back.text, &values.text);
        prop_assert_eq!(&read_back.list, &values.list);
    }
}
