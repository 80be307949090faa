//! AsyncAPI specification versions understood by the reader and writer

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReadError;

/// Major AsyncAPI version
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AsyncApiVersion {
    V2,
    V3,
}

impl AsyncApiVersion {
    /// Pick the version from the `asyncapi` discriminator of a document
    pub fn from_declared(declared: &str) -> Result<Self, ReadError> {
        let declared = declared.trim();
        if declared.starts_with('2') {
            Ok(AsyncApiVersion::V2)
        } else if declared.starts_with('3') {
            Ok(AsyncApiVersion::V3)
        } else {
            Err(ReadError::UnsupportedVersion(declared.to_string()))
        }
    }

    /// Version string written into the `asyncapi` field of serialized output
    pub fn wire_version(&self) -> &'static str {
        match self {
            AsyncApiVersion::V2 => "2.6.0",
            AsyncApiVersion::V3 => "3.0.0",
        }
    }
}

impl fmt::Display for AsyncApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsyncApiVersion::V2 => write!(f, "2.x"),
            AsyncApiVersion::V3 => write!(f, "3.x"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_major_version() {
        assert_eq!(AsyncApiVersion::from_declared("2.6.0").unwrap(), AsyncApiVersion::V2);
        assert_eq!(AsyncApiVersion::from_declared("2.0.0").unwrap(), AsyncApiVersion::V2);
        assert_eq!(AsyncApiVersion::from_declared("3.0.0").unwrap(), AsyncApiVersion::V3);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let err = AsyncApiVersion::from_declared("1.2.0").unwrap_err();
        assert!(matches!(err, ReadError::UnsupportedVersion(v) if v == "1.2.0"));
    }
}
