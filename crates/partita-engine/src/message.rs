use std::fmt;

use partita_ir::{BlockId, LocationId};
use partita_smt::Formula;
use serde::Serialize;

/// What a message says about the block boundary it is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MessageKind {
    /// Forward summary of the states reaching the origin's exit.
    #[serde(rename = "BLOCK_POSTCONDITION")]
    Postcondition,
    /// Condition under which the violation is reachable from the anchor.
    #[serde(rename = "ERROR_CONDITION")]
    ErrorCondition,
    /// The origin proved no path through it realizes the violation.
    #[serde(rename = "ERROR_CONDITION_UNREACHABLE")]
    ErrorUnreachable,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Postcondition => write!(f, "POSTCONDITION"),
            MessageKind::ErrorCondition => write!(f, "ERROR_CONDITION"),
            MessageKind::ErrorUnreachable => write!(f, "ERROR_UNREACHABLE"),
        }
    }
}

/// Unit of inter-block communication. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    kind: MessageKind,
    origin: BlockId,
    target_location: LocationId,
    formula: Formula,
    from_root: bool,
}

impl Message {
    pub fn postcondition(
        origin: BlockId,
        target_location: LocationId,
        formula: Formula,
        from_root: bool,
    ) -> Self {
        Self {
            kind: MessageKind::Postcondition,
            origin,
            target_location,
            formula,
            from_root,
        }
    }

    pub fn error_condition(
        origin: BlockId,
        target_location: LocationId,
        formula: Formula,
        from_root: bool,
    ) -> Self {
        Self {
            kind: MessageKind::ErrorCondition,
            origin,
            target_location,
            formula,
            from_root,
        }
    }

    pub fn error_unreachable(origin: BlockId, target_location: LocationId) -> Self {
        Self {
            kind: MessageKind::ErrorUnreachable,
            origin,
            target_location,
            formula: Formula::ff(),
            from_root: false,
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn origin(&self) -> &BlockId {
        &self.origin
    }

    pub fn target_location(&self) -> LocationId {
        self.target_location
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    /// True when the originating block has no predecessors.
    pub fn is_from_root(&self) -> bool {
        self.from_root
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} from {} at {}: {}",
            self.kind, self.origin, self.target_location, self.formula
        )
    }
}
