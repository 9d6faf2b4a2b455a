use crate::Operator;
use std::fmt::{self, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    Update,
    BatchUpdate,
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Query => "query",
            OperationKind::Update => "update",
            OperationKind::BatchUpdate => "batch update",
        })
    }
}

/// What a [`SessionEventListener`] receives: the operator around which the
/// event fires. Before execution it exposes the SQL and parameters, after
/// execution also the effect counts and the elapsed time.
pub struct SessionEventContext<'a> {
    pub operator: &'a dyn Operator,
    pub kind: OperationKind,
}

impl<'a> SessionEventContext<'a> {
    pub fn new(operator: &'a dyn Operator) -> Self {
        Self {
            kind: operator.kind(),
            operator,
        }
    }
}

/// Observer of the statements run by sessions. Every hook defaults to doing nothing.
pub trait SessionEventListener: Send + Sync {
    fn on_query_before(&self, _context: &SessionEventContext) {}

    fn on_query_after(&self, _context: &SessionEventContext) {}

    fn on_update_before(&self, _context: &SessionEventContext) {}

    fn on_update_after(&self, _context: &SessionEventContext) {}
}
