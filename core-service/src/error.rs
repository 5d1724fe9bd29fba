use std::fmt;
use std::path::PathBuf;

use bridge_traits::BridgeError;
use core_schema::ValidationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lifecycle::ReaderState;

/// Host-facing operation, named as the host bridge names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    InitTagReader,
    DeinitTagReader,
    SetConfig,
    GetConfig,
    GetData,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::InitTagReader => "initTagReader",
            Operation::DeinitTagReader => "deinitTagReader",
            Operation::SetConfig => "setConfig",
            Operation::GetConfig => "getConfig",
            Operation::GetData => "getData",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum InitError {
    #[error("Tag library files missing in {}: {}", dir.display(), missing.join(", "))]
    ResourcesMissing { dir: PathBuf, missing: Vec<String> },

    #[error("Reader session could not be opened: {0}")]
    Collaborator(#[source] BridgeError),

    #[error("Event delivery could not start: {0}")]
    Runtime(#[source] core_runtime::Error),
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{operation} requires an initialized reader (state: {state})")]
    NotReady {
        operation: Operation,
        state: ReaderState,
    },

    #[error("Reader initialization failed: {0}")]
    Init(#[from] InitError),

    #[error("Reader deinitialization failed: {0}")]
    Deinit(#[source] BridgeError),

    #[error("{operation} failed: {source}")]
    Collaborator {
        operation: Operation,
        #[source]
        source: BridgeError,
    },

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),
}

impl CoreError {
    /// Rejection code reported to the host.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation_error",
            CoreError::NotReady { .. } => "not_ready",
            CoreError::Init(InitError::ResourcesMissing { .. }) => "library_not_found",
            CoreError::Init(_) => "init_error",
            CoreError::Deinit(_) => "deinit_error",
            CoreError::Collaborator { operation, .. } => match operation {
                Operation::InitTagReader => "init_error",
                Operation::DeinitTagReader => "deinit_error",
                Operation::SetConfig => "set_config_error",
                Operation::GetConfig => "get_config_error",
                Operation::GetData => "get_data_error",
            },
            CoreError::Runtime(_) => "runtime_error",
        }
    }

    pub(crate) fn collaborator(operation: Operation) -> impl FnOnce(BridgeError) -> Self {
        move |source| CoreError::Collaborator { operation, source }
    }
}

/// Serializable rejection handed to the host bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostError {
    pub code: String,
    pub message: String,
}

impl From<&CoreError> for HostError {
    fn from(error: &CoreError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let missing = CoreError::from(InitError::ResourcesMissing {
            dir: PathBuf::from("/opt/tag-reader"),
            missing: vec!["Msg.dll".to_string(), "Ndef.dll".to_string()],
        });
        assert_eq!(missing.code(), "library_not_found");
        assert_eq!(
            missing.to_string(),
            "Reader initialization failed: Tag library files missing in /opt/tag-reader: Msg.dll, Ndef.dll"
        );

        let open = CoreError::from(InitError::Collaborator(BridgeError::NotAvailable(
            "NFC disabled".to_string(),
        )));
        assert_eq!(open.code(), "init_error");

        let not_ready = CoreError::NotReady {
            operation: Operation::GetData,
            state: ReaderState::Uninitialized,
        };
        assert_eq!(not_ready.code(), "not_ready");
        assert!(not_ready.to_string().starts_with("getData requires"));

        let pull = CoreError::collaborator(Operation::GetData)(BridgeError::TagNotPresent(
            "no tag in field".to_string(),
        ));
        assert_eq!(pull.code(), "get_data_error");

        let write = CoreError::collaborator(Operation::SetConfig)(BridgeError::Communication(
            "CRC mismatch".to_string(),
        ));
        assert_eq!(write.code(), "set_config_error");

        let read = CoreError::collaborator(Operation::GetConfig)(BridgeError::Communication(
            "timeout".to_string(),
        ));
        assert_eq!(read.code(), "get_config_error");

        let deinit = CoreError::Deinit(BridgeError::OperationFailed("busy".to_string()));
        assert_eq!(deinit.code(), "deinit_error");

        let invalid = CoreError::from(ValidationError::new("measurementConfig.interval", "must be > 0"));
        assert_eq!(invalid.code(), "validation_error");
    }

    #[test]
    fn test_host_error() {
        let error = CoreError::NotReady {
            operation: Operation::SetConfig,
            state: ReaderState::Failed,
        };
        let host = HostError::from(&error);
        assert_eq!(host.code, "not_ready");
        assert_eq!(host.message, "setConfig requires an initialized reader (state: Failed)");
    }
}
