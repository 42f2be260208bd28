use serde::{Deserialize, Serialize};
use tracing::warn;

/// Child prefixes SAP uses directly beneath a window id.
pub const WINDOW_CHILD_PREFIXES: &[&str] = &["usr/", "ssub/", "tabs/", "sbar", "titl", "okcd"];

/// Describes how to address a node in the scripting tree.
///
/// Only one addressing mode is meaningful at a time: `by_id` sets the path,
/// `by_type_and_text` sets the type tag and display text. Lookups by id are
/// authoritative; a type+text pair may match several nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Locator {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            type_tag: None,
            text: None,
        }
    }

    pub fn by_type_and_text(type_tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: None,
            type_tag: Some(type_tag.into()),
            text: Some(text.into()),
        }
    }

    pub fn is_by_id(&self) -> bool {
        self.id.is_some()
    }

    /// Joins a window-relative id onto the window's absolute id.
    ///
    /// Ids that already start at a window root (`wnd[N]...`) are returned
    /// unchanged.
    pub fn resolve_relative(window_id: &str, relative_id: &str) -> String {
        let relative_id = relative_id.trim_start_matches('/');
        if relative_id.starts_with("wnd[") {
            warn!(
                "Id '{}' looks absolute; not joining it onto window '{}'",
                relative_id, window_id
            );
            return relative_id.to_string();
        }
        if !WINDOW_CHILD_PREFIXES
            .iter()
            .any(|prefix| relative_id.starts_with(prefix))
        {
            warn!(
                "Id '{}' has no known window child prefix; joining onto '{}' anyway",
                relative_id, window_id
            );
        }
        format!("{}/{}", window_id.trim_end_matches('/'), relative_id)
    }
}

impl From<&str> for Locator {
    fn from(id: &str) -> Self {
        Locator::by_id(id)
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.id, &self.type_tag, &self.text) {
            (Some(id), _, _) => write!(f, "id:{id}"),
            (None, Some(type_tag), Some(text)) => write!(f, "{type_tag}|{text}"),
            (None, Some(type_tag), None) => write!(f, "{type_tag}"),
            (None, None, Some(text)) => write!(f, "text:{text}"),
            (None, None, None) => write!(f, "<empty locator>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn by_id_leaves_type_and_text_unset() {
        let locator = Locator::by_id("wnd[0]/usr/txtRSYST-BNAME");
        assert_eq!(locator.id.as_deref(), Some("wnd[0]/usr/txtRSYST-BNAME"));
        assert!(locator.type_tag.is_none());
        assert!(locator.text.is_none());
        assert!(locator.is_by_id());
    }

    #[test]
    fn by_type_and_text_leaves_id_unset() {
        let locator = Locator::by_type_and_text("GuiButton", "Save");
        assert!(locator.id.is_none());
        assert_eq!(locator.type_tag.as_deref(), Some("GuiButton"));
        assert_eq!(locator.text.as_deref(), Some("Save"));
        assert_eq!(locator.to_string(), "GuiButton|Save");
    }

    #[test]
    fn resolves_relative_ids_against_window() {
        assert_eq!(
            Locator::resolve_relative("/app/con[0]/ses[0]/wnd[0]", "usr/txtRSYST-BNAME"),
            "/app/con[0]/ses[0]/wnd[0]/usr/txtRSYST-BNAME"
        );
        assert_eq!(
            Locator::resolve_relative("/app/con[0]/ses[0]/wnd[0]/", "okcd"),
            "/app/con[0]/ses[0]/wnd[0]/okcd"
        );
        assert_eq!(
            Locator::resolve_relative("/app/con[0]/ses[0]/wnd[0]", "wnd[1]/sbar"),
            "wnd[1]/sbar"
        );
    }

    #[test]
    fn serializes_type_field_name() {
        let json = serde_json::to_string(&Locator::by_type_and_text("GuiButton", "Ok")).unwrap();
        assert_eq!(json, r#"{"type":"GuiButton","text":"Ok"}"#);
    }
}
