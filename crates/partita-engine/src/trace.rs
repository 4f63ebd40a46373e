//! Message log for post-mortem inspection of a run.
//!
//! The JSON shape (`blocks` keyed by id, `messages` in production order)
//! is what the worker visualizer renders as a per-block timeline.

use std::collections::BTreeMap;

use partita_ir::{Block, BlockId, LocationId};
use partita_smt::backends::smtlib_printer::to_smtlib;
use serde::Serialize;

use crate::message::{Message, MessageKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockLogEntry {
    pub id: BlockId,
    pub predecessors: Vec<BlockId>,
    pub successors: Vec<BlockId>,
    /// Edge labels, one per owned edge.
    pub code: Vec<String>,
}

impl BlockLogEntry {
    pub fn from_block(block: &Block) -> Self {
        Self {
            id: block.id().clone(),
            predecessors: block.predecessors().iter().cloned().collect(),
            successors: block.successors().iter().cloned().collect(),
            code: block.edges().iter().map(|e| e.label.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageLogEntry {
    /// Milliseconds since the run started.
    pub timestamp: u128,
    pub from: BlockId,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub target: LocationId,
    /// SMT-LIB2 rendering of the formula.
    pub payload: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessageLog {
    pub blocks: BTreeMap<BlockId, BlockLogEntry>,
    pub messages: Vec<MessageLogEntry>,
}

impl MessageLog {
    pub fn new<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> Self {
        Self {
            blocks: blocks
                .into_iter()
                .map(|b| (b.id().clone(), BlockLogEntry::from_block(b)))
                .collect(),
            messages: Vec::new(),
        }
    }

    pub fn record(&mut self, timestamp: u128, message: &Message) {
        self.messages.push(MessageLogEntry {
            timestamp,
            from: message.origin().clone(),
            kind: message.kind(),
            target: message.target_location(),
            payload: to_smtlib(message.formula()),
        });
    }

    /// Messages sent by `block`, in production order.
    pub fn sent_by<'a>(&'a self, block: &'a BlockId) -> impl Iterator<Item = &'a MessageLogEntry> {
        self.messages.iter().filter(move |m| &m.from == block)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
