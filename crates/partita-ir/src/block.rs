use indexmap::IndexSet;
use serde::Serialize;
use std::fmt;

/// A CFA node number.
pub type LocationId = usize;

/// Stable identifier of a block, unique within one decomposition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        BlockId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(value: &str) -> Self {
        BlockId(value.to_string())
    }
}

impl From<String> for BlockId {
    fn from(value: String) -> Self {
        BlockId(value)
    }
}

/// One CFA edge owned by a block. The label is opaque to the analysis core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GraphEdge {
    pub source: LocationId,
    pub target: LocationId,
    pub label: String,
}

impl GraphEdge {
    pub fn new(source: LocationId, target: LocationId, label: impl Into<String>) -> Self {
        Self {
            source,
            target,
            label: label.into(),
        }
    }
}

impl fmt::Display for GraphEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source, self.label, self.target)
    }
}

/// A partition of the CFA with one entry and one exit location.
///
/// Blocks are assembled once by the decomposition step through the builder
/// methods and then only read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    id: BlockId,
    start: LocationId,
    end: LocationId,
    predecessors: IndexSet<BlockId>,
    successors: IndexSet<BlockId>,
    edges: IndexSet<GraphEdge>,
}

impl Block {
    pub fn new(id: impl Into<BlockId>, start: LocationId, end: LocationId) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            predecessors: IndexSet::new(),
            successors: IndexSet::new(),
            edges: IndexSet::new(),
        }
    }

    pub fn with_predecessor(mut self, id: impl Into<BlockId>) -> Self {
        self.predecessors.insert(id.into());
        self
    }

    pub fn with_successor(mut self, id: impl Into<BlockId>) -> Self {
        self.successors.insert(id.into());
        self
    }

    pub fn with_edge(mut self, edge: GraphEdge) -> Self {
        self.edges.insert(edge);
        self
    }

    pub fn with_edges(mut self, edges: impl IntoIterator<Item = GraphEdge>) -> Self {
        self.edges.extend(edges);
        self
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    pub fn start_location(&self) -> LocationId {
        self.start
    }

    pub fn end_location(&self) -> LocationId {
        self.end
    }

    pub fn predecessors(&self) -> &IndexSet<BlockId> {
        &self.predecessors
    }

    pub fn successors(&self) -> &IndexSet<BlockId> {
        &self.successors
    }

    pub fn edges(&self) -> &IndexSet<GraphEdge> {
        &self.edges
    }

    /// True if the block owns no edges (a pass-through node).
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// True for entry blocks, which have no predecessors.
    pub fn is_root(&self) -> bool {
        self.predecessors.is_empty()
    }

    /// All locations touched by the block's edges plus its boundaries.
    pub fn locations(&self) -> IndexSet<LocationId> {
        let mut out = IndexSet::new();
        out.insert(self.start);
        for edge in &self.edges {
            out.insert(edge.source);
            out.insert(edge.target);
        }
        out.insert(self.end);
        out
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Block {} [{} -> {}, {} edges]",
            self.id,
            self.start,
            self.end,
            self.edges.len()
        )
    }
}
