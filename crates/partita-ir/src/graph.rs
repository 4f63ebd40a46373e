use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

use crate::block::{Block, BlockId, LocationId};

/// A malformed decomposition, detected while building a [`BlockGraph`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("root block '{0}' is not among the supplied blocks")]
    UnknownRoot(BlockId),
    #[error("root block '{root}' must not have predecessors, found '{predecessor}'")]
    RootHasPredecessor { root: BlockId, predecessor: BlockId },
    #[error("block id '{0}' is declared more than once")]
    DuplicateBlock(BlockId),
    #[error("block '{block}' lists successor '{successor}', which does not exist")]
    DanglingSuccessor { block: BlockId, successor: BlockId },
    #[error("block '{block}' lists predecessor '{predecessor}', which is not reachable from the root")]
    DanglingPredecessor { block: BlockId, predecessor: BlockId },
    #[error("block '{from}' lists '{to}' as successor, but '{to}' does not list '{from}' as predecessor")]
    AsymmetricAdjacency { from: BlockId, to: BlockId },
    #[error("block '{block}' starts at location {start}, which is no predecessor's end location")]
    BoundaryMismatch { block: BlockId, start: LocationId },
}

/// All blocks reachable from a distinguished root, validated once.
///
/// Blocks are held behind `Arc` so workers on other threads can share them
/// without copying; the graph itself is never mutated after [`BlockGraph::build`].
#[derive(Debug, Clone)]
pub struct BlockGraph {
    root: BlockId,
    nodes: IndexMap<BlockId, Arc<Block>>,
}

impl BlockGraph {
    /// Build the graph of all blocks reachable from `root` by following
    /// successor links. Blocks that are not reachable are discarded.
    pub fn build(
        root: impl Into<BlockId>,
        blocks: impl IntoIterator<Item = Block>,
    ) -> Result<Self, GraphError> {
        let root = root.into();
        let mut index: HashMap<BlockId, Block> = HashMap::new();
        for block in blocks {
            let id = block.id().clone();
            if index.insert(id.clone(), block).is_some() {
                return Err(GraphError::DuplicateBlock(id));
            }
        }

        let root_block = index
            .get(&root)
            .ok_or_else(|| GraphError::UnknownRoot(root.clone()))?;
        if let Some(predecessor) = root_block.predecessors().first() {
            return Err(GraphError::RootHasPredecessor {
                root: root.clone(),
                predecessor: predecessor.clone(),
            });
        }

        let mut order: IndexSet<BlockId> = IndexSet::new();
        let mut waiting = VecDeque::from([root.clone()]);
        while let Some(id) = waiting.pop_front() {
            if !order.insert(id.clone()) {
                continue;
            }
            let Some(block) = index.get(&id) else {
                continue;
            };
            for successor in block.successors() {
                if !index.contains_key(successor) {
                    return Err(GraphError::DanglingSuccessor {
                        block: id.clone(),
                        successor: successor.clone(),
                    });
                }
                waiting.push_back(successor.clone());
            }
        }

        let mut nodes = IndexMap::with_capacity(order.len());
        for id in order.iter() {
            if let Some(block) = index.remove(id) {
                nodes.insert(id.clone(), Arc::new(block));
            }
        }
        validate(&nodes)?;

        Ok(Self { root, nodes })
    }

    pub fn root(&self) -> &Arc<Block> {
        // `build` guarantees the root is the first discovered node.
        &self.nodes[0]
    }

    pub fn root_id(&self) -> &BlockId {
        &self.root
    }

    pub fn block(&self, id: &BlockId) -> Option<&Arc<Block>> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Blocks in discovery (breadth-first) order, root first.
    pub fn blocks(&self) -> impl Iterator<Item = &Arc<Block>> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the root has no successors: a degenerate single-block program.
    pub fn is_empty(&self) -> bool {
        self.root().successors().is_empty()
    }

    /// True if following successor links can return to a block.
    pub fn has_cycle(&self) -> bool {
        // 0 = unvisited, 1 = on the current path, 2 = finished
        let mut visited: HashMap<&BlockId, u8> = HashMap::new();

        fn dfs<'a>(
            id: &'a BlockId,
            nodes: &'a IndexMap<BlockId, Arc<Block>>,
            visited: &mut HashMap<&'a BlockId, u8>,
        ) -> bool {
            match visited.get(id).copied().unwrap_or(0) {
                1 => return true,
                2 => return false,
                _ => {}
            }
            visited.insert(id, 1);
            if let Some(block) = nodes.get(id) {
                for successor in block.successors() {
                    if dfs(successor, nodes, visited) {
                        return true;
                    }
                }
            }
            visited.insert(id, 2);
            false
        }

        self.nodes
            .keys()
            .any(|id| dfs(id, &self.nodes, &mut visited))
    }
}

fn validate(nodes: &IndexMap<BlockId, Arc<Block>>) -> Result<(), GraphError> {
    for (id, block) in nodes {
        for predecessor in block.predecessors() {
            if !nodes.contains_key(predecessor) {
                return Err(GraphError::DanglingPredecessor {
                    block: id.clone(),
                    predecessor: predecessor.clone(),
                });
            }
        }
        for successor in block.successors() {
            let lists_back = nodes
                .get(successor)
                .is_some_and(|s| s.predecessors().contains(id));
            if !lists_back {
                return Err(GraphError::AsymmetricAdjacency {
                    from: id.clone(),
                    to: successor.clone(),
                });
            }
        }
        if block.predecessors().is_empty() {
            continue;
        }
        let start = block.start_location();
        let matches_boundary = block
            .predecessors()
            .iter()
            .filter_map(|p| nodes.get(p))
            .any(|p| p.end_location() == start);
        if !matches_boundary {
            return Err(GraphError::BoundaryMismatch {
                block: id.clone(),
                start,
            });
        }
    }
    Ok(())
}
