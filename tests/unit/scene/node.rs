use kurbo::Shape as _;

use super::*;

fn shape_node(kind: ShapeKind) -> Node {
    Node::new(
        NodeId(1),
        NodeKind::Shape(ShapeNode {
            kind,
            fill: Color::rgb(255, 0, 0),
            stroke: None,
            stroke_width: 0.0,
            size: 100.0,
        }),
    )
}

#[test]
fn shape_outline_is_centered_on_the_origin() {
    for kind in [
        ShapeKind::Rect,
        ShapeKind::Circle,
        ShapeKind::Triangle,
        ShapeKind::InvertedTriangle,
        ShapeKind::Diamond,
    ] {
        let node = shape_node(kind);
        let NodeKind::Shape(shape) = &node.kind else {
            unreachable!()
        };
        let bbox = shape.outline().bounding_box();
        assert!((bbox.min_x() + 50.0).abs() < 1.0, "{kind:?}: {bbox:?}");
        assert!((bbox.max_x() - 50.0).abs() < 1.0, "{kind:?}: {bbox:?}");
    }
}

#[test]
fn fill_support_matrix() {
    let mut node = shape_node(ShapeKind::Rect);
    assert!(node.supports_fill());
    node.set_fill(Color::rgb(0, 255, 0));
    let NodeKind::Shape(shape) = &node.kind else {
        unreachable!()
    };
    assert_eq!(shape.fill, Color::rgb(0, 255, 0));

    let mut text = Node::new(
        NodeId(2),
        NodeKind::Text(TextNode {
            text: "hi".into(),
            font_source: "fonts/a.ttf".into(),
            size: 32.0,
            fill: Color::rgb(0, 0, 0),
        }),
    );
    assert!(text.supports_fill());
    assert!(!text.supports_stroke());
    assert!(text.supports_font());
    text.set_font_size(0.0);
    let NodeKind::Text(t) = &text.kind else {
        unreachable!()
    };
    // Degenerate sizes are floored rather than stored.
    assert_eq!(t.size, 1.0);
}

#[test]
fn intrinsic_size_per_variant() {
    let node = shape_node(ShapeKind::Circle);
    assert_eq!(node.intrinsic_size(), (100.0, 100.0));

    let text = Node::new(
        NodeId(3),
        NodeKind::Text(TextNode {
            text: "abcd".into(),
            font_source: "fonts/a.ttf".into(),
            size: 10.0,
            fill: Color::rgb(0, 0, 0),
        }),
    );
    let (w, h) = text.intrinsic_size();
    assert!(w > 0.0 && h > 0.0);
}

#[test]
fn defaults_are_neutral() {
    let node = shape_node(ShapeKind::Rect);
    assert_eq!(node.opacity, 1.0);
    assert_eq!((node.scale_x, node.scale_y), (1.0, 1.0));
    assert!(node.draggable);
    assert!(!node.mask_tag);
    assert!(node.animation.is_none());
}
