//! Fixed layers grouping scene-graph nodes.

use crate::scene::node::{Node, NodeId};

/// Fixed-purpose layer in paint order, back to front.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Background imagery.
    Main,
    /// Emote cutouts.
    Emotes,
    /// Shape tool output.
    Shapes,
    /// Text tool output.
    Text,
    /// AI-generated replacements.
    Generated,
}

impl LayerKind {
    /// All layers in paint order.
    pub const ALL: [LayerKind; 5] = [
        LayerKind::Main,
        LayerKind::Emotes,
        LayerKind::Shapes,
        LayerKind::Text,
        LayerKind::Generated,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            LayerKind::Main => 0,
            LayerKind::Emotes => 1,
            LayerKind::Shapes => 2,
            LayerKind::Text => 3,
            LayerKind::Generated => 4,
        }
    }

    /// Stable lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            LayerKind::Main => "main",
            LayerKind::Emotes => "emotes",
            LayerKind::Shapes => "shapes",
            LayerKind::Text => "text",
            LayerKind::Generated => "generated",
        }
    }
}

/// Ordered bucket of nodes; vec order is z-order within the layer.
#[derive(Clone, Debug)]
pub struct Layer {
    kind: LayerKind,
    nodes: Vec<Node>,
}

impl Layer {
    pub(crate) fn new(kind: LayerKind) -> Self {
        Self {
            kind,
            nodes: Vec::new(),
        }
    }

    /// Which fixed layer this is.
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// Nodes in z-order, back to front.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of nodes on this layer.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` when the layer holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut Vec<Node> {
        &mut self.nodes
    }

    pub(crate) fn index_of(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub(crate) fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub(crate) fn remove(&mut self, id: NodeId) -> Option<Node> {
        let idx = self.index_of(id)?;
        Some(self.nodes.remove(idx))
    }

    pub(crate) fn replace_nodes(&mut self, nodes: Vec<Node>) {
        self.nodes = nodes;
    }
}