//! Error types for rollup runs.

use crate::store::StoreError;
use std::fmt;
use thiserror::Error;

/// Which repository call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    FetchChildren,
    Get,
    Save,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOp::FetchChildren => write!(f, "fetch_children"),
            StoreOp::Get => write!(f, "get"),
            StoreOp::Save => write!(f, "save"),
        }
    }
}

/// Errors that abort a rollup phase.
#[derive(Debug, Error)]
pub enum RollupError {
    #[error("{operation} failed for area {area_id}")]
    Persistence {
        area_id: String,
        operation: StoreOp,
        #[source]
        source: StoreError,
    },

    #[error("failed to stream areas at depth {depth}")]
    Scan {
        depth: usize,
        #[source]
        source: StoreError,
    },

    #[error("malformed aggregate under area {area_id}: {reason}")]
    MalformedAggregate { area_id: String, reason: String },

    #[error("climb count overflow while merging into area {area_id}")]
    CountOverflow { area_id: String },

    #[error("concurrency limiter closed")]
    LimiterClosed,
}

impl RollupError {
    pub(crate) fn store(area_id: &str, operation: StoreOp, source: StoreError) -> Self {
        RollupError::Persistence {
            area_id: area_id.to_string(),
            operation,
            source,
        }
    }

    /// Id of the area the failure is attributed to, if any.
    pub fn area_id(&self) -> Option<&str> {
        match self {
            RollupError::Persistence { area_id, .. }
            | RollupError::MalformedAggregate { area_id, .. }
            | RollupError::CountOverflow { area_id } => Some(area_id),
            RollupError::Scan { .. } | RollupError::LimiterClosed => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RollupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_message_names_area_and_operation() {
        let err = RollupError::store(
            "ca",
            StoreOp::Save,
            StoreError::Backend {
                reason: "disk full".to_string(),
            },
        );
        assert_eq!(err.to_string(), "save failed for area ca");
        assert_eq!(err.area_id(), Some("ca"));
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("store backend error: disk full"));
    }

    #[test]
    fn test_limiter_closed_has_no_area() {
        assert_eq!(RollupError::LimiterClosed.area_id(), None);
    }
}
