use crate::types::MessageType;
use thiserror::Error;

/// HRESULT returned by `IDispatch` when a member or object does not exist.
pub const DISP_E_MEMBERNOTFOUND: i32 = 0x8002_0003_u32 as i32;
/// HRESULT returned by `GetIDsOfNames` for a name the object does not know.
pub const DISP_E_UNKNOWNNAME: i32 = 0x8002_0006_u32 as i32;

/// Messages the scripting host uses when `FindById` has nothing to return.
const MISSING_OBJECT_MESSAGES: &[&str] = &["could not be found", "element not found"];

#[derive(Error, Debug, Clone)]
pub enum SapError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The node does not expose the requested property or method.
    #[error("Member '{member}' is not available on '{target}'")]
    MemberNotFound { member: String, target: String },

    #[error("Type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Session not established: {0}")]
    SessionNotEstablished(String),

    #[error("Scripting call '{operation}' on '{target}' failed: {message}")]
    Transport {
        operation: String,
        target: String,
        message: String,
        code: Option<i32>,
    },

    #[error("SAP reported {message_type:?}: {text}")]
    HostStatus {
        message_type: MessageType,
        text: String,
    },

    #[error("Session has been disposed")]
    Disposed,

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Handle has already been released: {0}")]
    HandleReleased(String),

    #[error("Unexpected value: {0}")]
    InvalidValue(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Platform-specific error: {0}")]
    Platform(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),
}

impl SapError {
    pub(crate) fn transport(
        operation: impl Into<String>,
        target: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        SapError::Transport {
            operation: operation.into(),
            target: target.into(),
            message: message.into(),
            code: None,
        }
    }

    /// True when the error is the host's way of saying "no such node".
    pub fn is_missing_object(&self) -> bool {
        match self {
            SapError::ElementNotFound(_) => true,
            SapError::Transport { code, message, .. } => {
                let message = message.to_lowercase();
                *code == Some(DISP_E_MEMBERNOTFOUND)
                    || MISSING_OBJECT_MESSAGES.iter().any(|m| message.contains(m))
            }
            _ => false,
        }
    }

    /// True when the error only says the member is absent on this node.
    pub fn is_missing_member(&self) -> bool {
        matches!(
            self,
            SapError::MemberNotFound { .. }
                | SapError::Transport {
                    code: Some(DISP_E_MEMBERNOTFOUND),
                    ..
                }
        )
    }

    /// Attaches the operation and the path it ran against.
    ///
    /// Transport faults keep their code and message; a missing member on a
    /// required read becomes a transport fault so it is never mistaken for an
    /// optional capability further up.
    pub fn with_context(self, operation: &str, target: &str) -> Self {
        match self {
            SapError::Transport { message, code, .. } => SapError::Transport {
                operation: operation.to_string(),
                target: target.to_string(),
                message,
                code,
            },
            SapError::MemberNotFound { member, .. } => SapError::Transport {
                operation: operation.to_string(),
                target: target.to_string(),
                message: format!("required member '{member}' is not exposed"),
                code: Some(DISP_E_MEMBERNOTFOUND),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_missing_object_responses() {
        assert!(SapError::ElementNotFound("wnd[1]".into()).is_missing_object());
        assert!(SapError::transport(
            "FindById",
            "wnd[0]/usr/x",
            "The control could not be found by id."
        )
        .is_missing_object());

        let by_code = SapError::Transport {
            operation: "FindById".into(),
            target: "wnd[0]".into(),
            message: "Member not found".into(),
            code: Some(DISP_E_MEMBERNOTFOUND),
        };
        assert!(by_code.is_missing_object());

        assert!(!SapError::transport("FindById", "wnd[0]", "RPC server unavailable")
            .is_missing_object());
        assert!(!SapError::Disposed.is_missing_object());
    }

    #[test]
    fn required_member_becomes_transport_fault() {
        let err = SapError::MemberNotFound {
            member: "Text".into(),
            target: "wnd[0]".into(),
        }
        .with_context("read Text", "/app/con[0]/ses[0]/wnd[0]");

        match err {
            SapError::Transport {
                operation, target, ..
            } => {
                assert_eq!(operation, "read Text");
                assert_eq!(target, "/app/con[0]/ses[0]/wnd[0]");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
