use super::{Component, ComponentBase, ComponentKind};
use crate::errors::SapError;
use crate::platforms::ForeignHandle;
use crate::types::{MessageType, StatusMessage};
use tracing::{debug, warn};

/// The `sbar` line at the bottom of a window.
#[derive(Debug, Clone)]
pub struct StatusBar {
    base: ComponentBase,
}

impl StatusBar {
    pub fn new(handle: ForeignHandle) -> Result<Self, SapError> {
        ComponentBase::read_and_bind(handle, is_status_bar, "GuiStatusbar").map(|base| Self { base })
    }

    pub(crate) fn with_kind(handle: ForeignHandle, kind: ComponentKind) -> Result<Self, SapError> {
        ComponentBase::bind(handle, kind, is_status_bar, "GuiStatusbar").map(|base| Self { base })
    }

    /// Raw one-letter code, "" when the line is clear.
    pub fn message_type_code(&self) -> Result<String, SapError> {
        self.base.required_string("MessageType")
    }

    /// Parsed message type; `None` for an empty or unrecognised code.
    pub fn message_type(&self) -> Result<Option<MessageType>, SapError> {
        let code = self.message_type_code()?;
        if code.trim().is_empty() {
            return Ok(None);
        }
        let parsed = MessageType::from_code(&code);
        if parsed.is_none() {
            warn!("Unrecognised status message type '{}'", code);
        }
        Ok(parsed)
    }

    /// Current message, or `None` when the line is empty.
    ///
    /// Text without a recognised type is reported as information.
    pub fn status_message(&self) -> Result<Option<StatusMessage>, SapError> {
        let text = self.text()?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        let message_type = self.message_type()?.unwrap_or(MessageType::Information);
        Ok(Some(StatusMessage { message_type, text }))
    }
}

fn is_status_bar(kind: &ComponentKind) -> bool {
    *kind == ComponentKind::StatusBar
}

impl Component for StatusBar {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn text(&self) -> Result<String, SapError> {
        self.base.required_string("Text")
    }

    /// The status line is read-only.
    fn set_text(&self, _text: &str) -> Result<(), SapError> {
        debug!("Ignoring write to status bar text");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::memory::MemoryHost;

    #[test]
    fn reads_message_and_type() {
        let host = MemoryHost::new();
        let session = host.add_session();
        let node = host.add_component(session, "wnd[0]/sbar", "GuiStatusbar");
        let status = StatusBar::new(host.handle(node)).unwrap();

        assert_eq!(status.status_message().unwrap(), None);

        host.set_property(node, "Text", "Name or password is incorrect");
        host.set_property(node, "MessageType", "E");
        let message = status.status_message().unwrap().unwrap();
        assert_eq!(message.message_type, MessageType::Error);
        assert_eq!(message.text, "Name or password is incorrect");
    }

    #[test]
    fn text_is_not_writable() {
        let host = MemoryHost::new();
        let session = host.add_session();
        let node = host.add_component(session, "wnd[0]/sbar", "GuiStatusbar");
        host.set_property(node, "Text", "Data saved");

        let status = StatusBar::new(host.handle(node)).unwrap();
        status.set_text("overwritten").unwrap();
        assert_eq!(status.text().unwrap(), "Data saved");
        assert!(host.writes(node).is_empty());
    }

    #[test]
    fn unknown_code_reads_as_none() {
        let host = MemoryHost::new();
        let session = host.add_session();
        let node = host.add_component(session, "wnd[0]/sbar", "GuiStatusbar");
        host.set_property(node, "MessageType", "Q");

        let status = StatusBar::new(host.handle(node)).unwrap();
        assert_eq!(status.message_type().unwrap(), None);
        assert_eq!(status.message_type_code().unwrap(), "Q");
    }
}
