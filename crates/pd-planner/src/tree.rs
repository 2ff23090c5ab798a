//! Arena-backed search tree.
//!
//! Nodes live in one `Vec<Node>` and refer to each other by [`NodeId`].
//! Re-rooting is O(1): the promoted child's parent link is cleared and the
//! rest of the old tree simply becomes unreachable.  When the arena grows
//! past a threshold, [`Tree::compact`] copies the live subtree into a fresh
//! arena and drops the garbage.

use std::fmt;

use pd_core::{DecayingValue, Intention, ParcelId, Position, Timestamp, Utility};

// ── NodeId ────────────────────────────────────────────────────────────────────

/// Index of a node in the arena.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

// ── Node ──────────────────────────────────────────────────────────────────────

/// One state in the search: the agent has just executed `intention`.
#[derive(Clone, Debug)]
pub struct Node {
    pub intention:      Intention,
    pub position:       Position,
    pub carried:        Vec<(ParcelId, DecayingValue)>,
    pub arrival:        Timestamp,
    /// Parcel tiles not yet committed to along the path from the root.
    pub available:      Vec<Position>,
    /// Unexpanded intentions, best last (expansion pops).
    pub candidates:     Vec<Intention>,
    pub children:       Vec<NodeId>,
    pub parent:         Option<NodeId>,
    pub visits:         u32,
    pub utility:        Utility,
    /// Value delivered here.  Non-zero only on putdown nodes.
    pub reward:         f64,
    pub reward_parcels: Vec<(ParcelId, DecayingValue)>,
    /// Optimistic normalizer for exploitation.
    pub upper_bound:    f64,
}

impl Node {
    /// No candidates left and no children: the end of a rollout.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.candidates.is_empty() && self.children.is_empty()
    }

    #[inline]
    pub fn is_fully_expanded(&self) -> bool {
        self.candidates.is_empty()
    }
}

// ── Tree ──────────────────────────────────────────────────────────────────────

pub struct Tree {
    nodes:   Vec<Node>,
    root:    NodeId,
    /// Set by `reroot`; cleared by `compact`.
    garbage: bool,
}

impl Tree {
    pub fn new(root: Node) -> Self {
        let mut root = root;
        root.parent = None;
        Self { nodes: vec![root], root: NodeId(0), garbage: false }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Arena size, garbage included.
    #[inline]
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Append `child` under `parent`.
    pub fn add_child(&mut self, parent: NodeId, mut child: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        child.parent = Some(parent);
        self.nodes.push(child);
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Promote `child` to root.  Everything outside its subtree becomes
    /// unreachable.
    pub fn reroot(&mut self, child: NodeId) {
        self.nodes[child.index()].parent = None;
        self.garbage |= child != self.root;
        self.root = child;
    }

    /// Nodes reachable from the root, root first (pre-order).
    pub fn live(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        out
    }

    pub fn is_reachable(&self, id: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if c == self.root {
                return true;
            }
            cur = self.node(c).parent;
        }
        false
    }

    /// Copy the live subtree into a fresh arena.  Returns how many nodes
    /// were reclaimed.
    pub fn compact(&mut self) -> usize {
        if !self.garbage {
            return 0;
        }
        self.garbage = false;
        let live = self.live();
        if live.len() == self.nodes.len() {
            return 0;
        }
        let mut remap = vec![u32::MAX; self.nodes.len()];
        for (new, old) in live.iter().enumerate() {
            remap[old.index()] = new as u32;
        }
        let mut nodes: Vec<Node> = Vec::with_capacity(live.len());
        for old in &live {
            let mut node = self.nodes[old.index()].clone();
            node.parent = node.parent.map(|p| NodeId(remap[p.index()]));
            for c in &mut node.children {
                *c = NodeId(remap[c.index()]);
            }
            nodes.push(node);
        }
        let reclaimed = self.nodes.len() - nodes.len();
        self.nodes = nodes;
        self.root = NodeId(0);
        reclaimed
    }
}
