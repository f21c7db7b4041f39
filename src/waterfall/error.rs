use thiserror::Error;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::WaterfallTier;

pub const TIER_NUMBER_REQUIRED: &str = "tierNumber is required for new tiers";
pub const SHARES_REQUIRED: &str = "lpSharePercent and gpSharePercent are required for new tiers";

/// Domain errors for waterfall tier operations
#[derive(Debug, Error)]
pub enum WaterfallError {
    #[error("Invalid waterfall tier: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Waterfall tiers already exist for structure {0}")]
    TiersAlreadyExist(Uuid),

    #[error("Waterfall tier not found: {0}")]
    TierNotFound(Uuid),

    #[error("{0}")]
    MissingField(&'static str),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: DatabaseError,
    },

    /// A multi-step write stopped at `index`. Tiers in `applied` were
    /// written before the failure and are not rolled back.
    #[error("Batch aborted at item {index} ({} already applied): {source}", .applied.len())]
    BatchAborted {
        index: usize,
        applied: Vec<WaterfallTier>,
        #[source]
        source: Box<WaterfallError>,
    },
}

impl WaterfallError {
    pub fn store(context: &'static str) -> impl FnOnce(DatabaseError) -> WaterfallError {
        move |source| WaterfallError::Store { context, source }
    }

    /// Innermost error, looking through batch wrappers
    pub fn root(&self) -> &WaterfallError {
        match self {
            WaterfallError::BatchAborted { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_joins_errors() {
        let err = WaterfallError::Validation(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.to_string(), "Invalid waterfall tier: a; b");
    }

    #[test]
    fn store_error_carries_context() {
        let err = WaterfallError::store("Error creating waterfall tier")(DatabaseError::QueryError(
            "duplicate key".to_string(),
        ));
        assert_eq!(
            err.to_string(),
            "Error creating waterfall tier: Query error: duplicate key"
        );
    }

    #[test]
    fn root_unwraps_batch() {
        let id = Uuid::new_v4();
        let err = WaterfallError::BatchAborted {
            index: 2,
            applied: Vec::new(),
            source: Box::new(WaterfallError::TierNotFound(id)),
        };
        assert!(matches!(err.root(), WaterfallError::TierNotFound(found) if *found == id));
    }
}
