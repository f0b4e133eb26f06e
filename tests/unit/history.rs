use super::*;
use crate::scene::node::{Color, Node, NodeId, NodeKind, ShapeKind, ShapeNode};

fn node(id: u64) -> Node {
    Node::new(
        NodeId(id),
        NodeKind::Shape(ShapeNode {
            kind: ShapeKind::Rect,
            fill: Color::rgb(1, 2, 3),
            stroke: None,
            stroke_width: 0.0,
            size: 100.0,
        }),
    )
}

fn ids(nodes: &[Node]) -> Vec<u64> {
    nodes.iter().map(|n| n.id.0).collect()
}

#[test]
fn undo_restores_each_pre_mutation_state_in_order() {
    let mut history = History::new();
    let mut layer: Vec<Node> = Vec::new();

    // Three mutations, each snapshotting first.
    for id in 1..=3u64 {
        history.snapshot(&layer);
        layer.push(node(id));
    }
    assert_eq!(history.undo_depth(), 3);

    for expect in [vec![1, 2], vec![1], vec![]] {
        let restored = history.undo(&layer).unwrap();
        layer = restored;
        assert_eq!(ids(&layer), expect);
    }
    assert!(history.undo(&layer).is_none());

    for expect in [vec![1], vec![1, 2], vec![1, 2, 3]] {
        let restored = history.redo(&layer).unwrap();
        layer = restored;
        assert_eq!(ids(&layer), expect);
    }
    assert!(history.redo(&layer).is_none());
}

#[test]
fn snapshot_clears_redo() {
    let mut history = History::new();
    let mut layer = vec![node(1)];

    history.snapshot(&layer);
    layer.push(node(2));
    layer = history.undo(&layer).unwrap();
    assert_eq!(history.redo_depth(), 1);

    // A fresh action forks the timeline; redo must die.
    history.snapshot(&layer);
    layer.push(node(3));
    assert_eq!(history.redo_depth(), 0);
    assert!(history.redo(&layer).is_none());
}

#[test]
fn snapshots_are_deep_enough_to_survive_later_edits() {
    let mut history = History::new();
    let mut layer = vec![node(1)];
    history.snapshot(&layer);

    layer[0].x = 999.0;
    let restored = history.undo(&layer).unwrap();
    assert_eq!(restored[0].x, 0.0);
}
