//! Plain data types shared across the session and component layers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Virtual key code SAP GUI interprets as Enter.
pub const VKEY_ENTER: i32 = 0;

/// Login data typed into the logon screen. Validation is left to SAP.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    #[serde(default)]
    pub user: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub language: String,
}

impl Credentials {
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        client: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            client: client.into(),
            language: language.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("client", &self.client)
            .field("language", &self.language)
            .finish()
    }
}

/// Severity of the message shown in the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    Success,
    Error,
    Warning,
    Abort,
    Information,
}

impl MessageType {
    /// Parses the single-letter code SAP exposes as `MessageType`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "S" => Some(MessageType::Success),
            "E" => Some(MessageType::Error),
            "W" => Some(MessageType::Warning),
            "A" => Some(MessageType::Abort),
            "I" => Some(MessageType::Information),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            MessageType::Success => "S",
            MessageType::Error => "E",
            MessageType::Warning => "W",
            MessageType::Abort => "A",
            MessageType::Information => "I",
        }
    }

    /// Error and Abort stop a login or navigation.
    pub fn is_failure(&self) -> bool {
        matches!(self, MessageType::Error | MessageType::Abort)
    }
}

/// Snapshot of the status line after an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub message_type: MessageType,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_status_codes() {
        assert_eq!(MessageType::from_code("S"), Some(MessageType::Success));
        assert_eq!(MessageType::from_code("A"), Some(MessageType::Abort));
        assert_eq!(MessageType::from_code(" E "), Some(MessageType::Error));
        assert_eq!(MessageType::from_code(""), None);
        assert_eq!(MessageType::from_code("X"), None);
        assert!(MessageType::Abort.is_failure());
        assert!(!MessageType::Warning.is_failure());
    }

    #[test]
    fn credentials_default_empty_and_debug_redacts() {
        let empty = Credentials::default();
        assert!(empty.user.is_empty() && empty.password.is_empty());
        assert!(empty.client.is_empty() && empty.language.is_empty());

        let creds = Credentials::new("DEVELOPER", "s3cret", "001", "EN");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("DEVELOPER"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn serialized_credentials_omit_the_password() {
        let creds = Credentials::new("DEVELOPER", "s3cret", "001", "EN");
        let json = serde_json::to_string(&creds).unwrap();
        assert!(json.contains("DEVELOPER"));
        assert!(!json.contains("s3cret"));

        let back: Credentials =
            serde_json::from_str(r#"{"user":"DEVELOPER","password":"s3cret"}"#).unwrap();
        assert_eq!(back.password, "s3cret");
        assert_eq!(back.client, "");
    }
}
