//! Dependency graph with reference-count culling.
//!
//! Nodes stand for passes and resources of one frame; an edge `from -> to`
//! reads "`to` depends on `from`". Nodes that must survive (typically the
//! presented image or a pass with side effects) are marked as targets.
//! [`DependencyGraph::cull`] then discards every node whose output never
//! reaches a target.
//!
//! # Lifecycle
//!
//! ```text
//! add_node / link / make_target  ──►  cull()  ──►  queries  ──►  clear()
//! ```
//!
//! Culling happens once per build. Calling [`cull`](DependencyGraph::cull) a
//! second time without [`clear`](DependencyGraph::clear) in between would
//! count every edge twice, so it panics.
//!
//! # Example
//!
//! ```
//! use framegraph::graph::DependencyGraph;
//!
//! let mut graph = DependencyGraph::new();
//! let shadow = graph.add_node("shadow");
//! let debug = graph.add_node("debug");
//! let color = graph.add_node("color");
//! graph.link(shadow, color);
//! graph.make_target(color);
//!
//! graph.cull();
//! assert!(!graph.is_culled(shadow));
//! assert!(graph.is_culled(debug));
//! ```

use std::fmt;

/// Dense index of a node. Only valid within the graph that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Position of the node in the graph's arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Dense index of an edge. Only valid within the graph that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u32);

impl EdgeId {
    /// Position of the edge in the graph's arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Directed edge from a producer to its consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

#[derive(Debug)]
struct Node {
    name: String,
    ref_count: u32,
    target: bool,
}

/// DAG of frame nodes.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    culled: bool,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node and return its id.
    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            name: name.into(),
            ref_count: 0,
            target: false,
        });
        id
    }

    /// Add an edge meaning "`to` depends on `from`".
    ///
    /// # Panics
    ///
    /// Panics if either endpoint does not belong to this graph.
    pub fn link(&mut self, from: NodeId, to: NodeId) -> EdgeId {
        assert!(
            self.contains(from) && self.contains(to),
            "edge {from:?} -> {to:?} references a node outside the graph ({} nodes)",
            self.nodes.len()
        );
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge { from, to });
        id
    }

    /// Mark `node` as a root that culling always keeps.
    ///
    /// # Panics
    ///
    /// Panics if the graph was already culled.
    pub fn make_target(&mut self, node: NodeId) {
        assert!(!self.culled, "make_target called after cull()");
        self.node_mut(node).target = true;
    }

    /// Compute reference counts and cull every node that does not contribute
    /// to a target.
    ///
    /// Each edge counts as one reference on its producer. Nodes left with no
    /// references are removed one at a time, and removing a node drops the
    /// references it held on its own producers.
    ///
    /// # Panics
    ///
    /// Panics if called twice without [`clear`](Self::clear).
    pub fn cull(&mut self) {
        assert!(!self.culled, "DependencyGraph::cull called twice without clear()");
        self.culled = true;

        let mut incoming: Vec<Vec<NodeId>> = vec![Vec::new(); self.nodes.len()];
        for edge in &self.edges {
            self.nodes[edge.from.index()].ref_count += 1;
            incoming[edge.to.index()].push(edge.from);
        }

        let mut stack: Vec<NodeId> = (0..self.nodes.len() as u32)
            .map(NodeId)
            .filter(|&id| self.ref_count(id) == 0)
            .collect();

        while let Some(node) = stack.pop() {
            for &producer in &incoming[node.index()] {
                let entry = &mut self.nodes[producer.index()];
                entry.ref_count -= 1;
                if entry.ref_count == 0 && !entry.target {
                    stack.push(producer);
                }
            }
        }

        log::debug!(
            "DependencyGraph: culled {} of {} nodes",
            self.nodes.len() - self.surviving_count(),
            self.nodes.len()
        );
    }

    /// Undo [`cull`](Self::cull), keeping every node, edge and target.
    ///
    /// The graph can be extended and culled again afterwards.
    pub fn reset_cull(&mut self) {
        for node in &mut self.nodes {
            node.ref_count = 0;
        }
        self.culled = false;
    }

    /// Whether [`cull`](Self::cull) has run since creation or the last clear.
    pub fn is_culled_graph(&self) -> bool {
        self.culled
    }

    /// Whether `node` was culled. Always `false` before [`cull`](Self::cull).
    pub fn is_culled(&self, node: NodeId) -> bool {
        self.culled && self.ref_count(node) == 0
    }

    /// Number of surviving consumers of `node`. Targets always report at
    /// least one.
    pub fn ref_count(&self, node: NodeId) -> u32 {
        let node = self.node(node);
        if node.target {
            node.ref_count.max(1)
        } else {
            node.ref_count
        }
    }

    /// Whether `node` was marked with [`make_target`](Self::make_target).
    pub fn is_target(&self, node: NodeId) -> bool {
        self.node(node).target
    }

    /// Whether neither endpoint of `edge` was culled.
    pub fn is_edge_valid(&self, edge: EdgeId) -> bool {
        let edge = self.edge(edge);
        !self.is_culled(edge.from) && !self.is_culled(edge.to)
    }

    /// Edges whose consumer is `node`.
    pub fn incoming_edges(&self, node: NodeId) -> Vec<EdgeId> {
        self.edge_ids()
            .filter(|&id| self.edges[id.index()].to == node)
            .collect()
    }

    /// Edges whose producer is `node`.
    pub fn outgoing_edges(&self, node: NodeId) -> Vec<EdgeId> {
        self.edge_ids()
            .filter(|&id| self.edges[id.index()].from == node)
            .collect()
    }

    /// Endpoints of `edge`.
    pub fn edge(&self, edge: EdgeId) -> Edge {
        self.edges[edge.index()]
    }

    /// Name given to `node` in [`add_node`](Self::add_node).
    pub fn node_name(&self, node: NodeId) -> &str {
        &self.node(node).name
    }

    /// Number of nodes, culled ones included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges, invalid ones included.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Drop every node and edge. Previously returned ids become invalid.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.culled = false;
    }

    /// Check the graph for cycles with an iterative depth-first search.
    pub fn is_acyclic(&self) -> bool {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let mut outgoing: Vec<Vec<NodeId>> = vec![Vec::new(); self.nodes.len()];
        for edge in &self.edges {
            outgoing[edge.from.index()].push(edge.to);
        }

        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        for root in 0..self.nodes.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            // (node, index of the next child to visit)
            let mut stack = vec![(root, 0usize)];
            marks[root] = Mark::InProgress;

            while let Some((node, child)) = stack.last_mut() {
                let node = *node;
                if let Some(&next) = outgoing[node].get(*child) {
                    *child += 1;
                    match marks[next.index()] {
                        Mark::InProgress => return false,
                        Mark::Unvisited => {
                            marks[next.index()] = Mark::InProgress;
                            stack.push((next.index(), 0));
                        }
                        Mark::Done => {}
                    }
                } else {
                    marks[node] = Mark::Done;
                    stack.pop();
                }
            }
        }
        true
    }

    /// Write the graph in Graphviz DOT format. Culled nodes and invalid
    /// edges are drawn dashed.
    pub fn export_graphviz(&self, out: &mut impl fmt::Write, name: &str) -> fmt::Result {
        writeln!(out, "digraph \"{name}\" {{")?;
        writeln!(out, "  rankdir=LR")?;
        writeln!(out, "  node [shape=box, fontname=\"helvetica\", fontsize=10]")?;

        for (index, node) in self.nodes.iter().enumerate() {
            let id = NodeId(index as u32);
            let style = if self.is_culled(id) {
                "style=dashed, color=gray"
            } else if node.target {
                "style=bold"
            } else {
                "style=solid"
            };
            writeln!(
                out,
                "  n{index} [label=\"{}\\nrefs: {}\", {style}]",
                node.name,
                self.ref_count(id)
            )?;
        }

        for id in self.edge_ids() {
            let edge = self.edges[id.index()];
            let style = if self.is_edge_valid(id) {
                "solid"
            } else {
                "dashed"
            };
            writeln!(
                out,
                "  n{} -> n{} [style={style}]",
                edge.from.index(),
                edge.to.index()
            )?;
        }

        writeln!(out, "}}")
    }

    fn surviving_count(&self) -> usize {
        (0..self.nodes.len() as u32)
            .filter(|&index| !self.is_culled(NodeId(index)))
            .count()
    }

    fn edge_ids(&self) -> impl Iterator<Item = EdgeId> {
        (0..self.edges.len() as u32).map(EdgeId)
    }

    fn contains(&self, node: NodeId) -> bool {
        node.index() < self.nodes.len()
    }

    fn node(&self, node: NodeId) -> &Node {
        &self.nodes[node.index()]
    }

    fn node_mut(&mut self, node: NodeId) -> &mut Node {
        &mut self.nodes[node.index()]
    }
}
