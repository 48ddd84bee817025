use std::any::type_name;
use std::fmt;

use crate::domain::order::ValidationErrors;
use crate::store::StoreError;

/// Step of the pipeline a message failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Validate,
    Persist,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Decode => "decode",
            Stage::Validate => "validate",
            Stage::Persist => "persist",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a message was dead-lettered. Displays as the underlying error.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Persist(#[from] StoreError),
}

impl IngestError {
    pub fn stage(&self) -> Stage {
        match self {
            IngestError::Decode(_) => Stage::Decode,
            IngestError::Validation(_) => Stage::Validate,
            IngestError::Persist(_) => Stage::Persist,
        }
    }

    /// Bad input never gets better on redelivery; a failed write might.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IngestError::Persist(_))
    }

    /// Type name of the underlying error, carried in the `error.class` header.
    pub fn class(&self) -> &'static str {
        match self {
            IngestError::Decode(_) => type_name::<serde_json::Error>(),
            IngestError::Validation(_) => type_name::<ValidationErrors>(),
            IngestError::Persist(_) => type_name::<StoreError>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RepositoryError;

    #[test]
    fn test_classification() {
        let decode: IngestError = serde_json::from_slice::<u32>(b"{").unwrap_err().into();
        assert_eq!(decode.stage(), Stage::Decode);
        assert!(!decode.is_retryable());
        assert!(decode.class().ends_with("Error"));

        let persist: IngestError =
            StoreError::from(RepositoryError::Unavailable("timeout".into())).into();
        assert_eq!(persist.stage(), Stage::Persist);
        assert!(persist.is_retryable());
        assert!(persist.class().ends_with("StoreError"));
        assert_eq!(persist.to_string(), "backing store unavailable: timeout");
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(Stage::Decode.to_string(), "decode");
        assert_eq!(Stage::Validate.as_str(), "validate");
        assert_eq!(Stage::Persist.as_str(), "persist");
    }
}
