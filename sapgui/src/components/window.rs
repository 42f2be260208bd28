use super::{Component, ComponentBase, ComponentKind};
use crate::errors::SapError;
use crate::locator::Locator;
use crate::platforms::{ForeignHandle, Variant};
use tracing::debug;

/// Main window, modal dialog or dialog shell.
#[derive(Debug, Clone)]
pub struct Window {
    base: ComponentBase,
}

impl Window {
    pub fn new(handle: ForeignHandle) -> Result<Self, SapError> {
        ComponentBase::read_and_bind(handle, ComponentKind::is_window, "a window")
            .map(|base| Self { base })
    }

    pub(crate) fn with_kind(handle: ForeignHandle, kind: ComponentKind) -> Result<Self, SapError> {
        ComponentBase::bind(handle, kind, ComponentKind::is_window, "a window")
            .map(|base| Self { base })
    }

    /// Sends a virtual key (0 is Enter) to the window.
    pub fn send_virtual_key(&self, code: i32) -> Result<(), SapError> {
        debug!("SendVKey({}) to {}", code, self.base.handle().describe());
        self.base.required_call("SendVKey", &[Variant::from(code)])?;
        Ok(())
    }

    pub fn maximize(&self) -> Result<(), SapError> {
        self.base.required_call("Maximize", &[])?;
        Ok(())
    }

    pub fn close(&self) -> Result<(), SapError> {
        self.base.required_call("Close", &[])?;
        Ok(())
    }

    /// Absolute id of a child addressed relative to this window, e.g. `usr/...`.
    pub fn find_child_path(&self, relative_id: &str) -> Result<String, SapError> {
        Ok(Locator::resolve_relative(&self.id()?, relative_id))
    }
}

impl Component for Window {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    /// Window title; every window has one.
    fn text(&self) -> Result<String, SapError> {
        self.base.required_string("Text")
    }

    fn set_text(&self, text: &str) -> Result<(), SapError> {
        self.base.required_put("Text", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::memory::MemoryHost;

    #[test]
    fn title_is_a_required_read() {
        let host = MemoryHost::new();
        let session = host.add_session();
        let node = host.add_component(session, "wnd[0]", "GuiMainWindow");
        host.set_property(node, "Text", "SAP Easy Access");

        let window = Window::new(host.handle(node)).unwrap();
        assert_eq!(window.text().unwrap(), "SAP Easy Access");

        host.remove_property(node, "Text");
        assert!(matches!(
            window.text().unwrap_err(),
            SapError::Transport { .. }
        ));
    }

    #[test]
    fn builds_child_paths_from_its_id() {
        let host = MemoryHost::new();
        let session = host.add_session();
        let node = host.add_component(session, "wnd[0]", "GuiMainWindow");

        let window = Window::new(host.handle(node)).unwrap();
        assert_eq!(
            window.find_child_path("usr/txtRSYST-BNAME").unwrap(),
            "/app/con[0]/ses[0]/wnd[0]/usr/txtRSYST-BNAME"
        );
    }

    #[test]
    fn sends_keys_and_window_commands() {
        let host = MemoryHost::new();
        let session = host.add_session();
        let node = host.add_component(session, "wnd[1]", "GuiModalWindow");

        let window = Window::new(host.handle(node)).unwrap();
        window.send_virtual_key(0).unwrap();
        window.maximize().unwrap();
        window.close().unwrap();

        let methods: Vec<_> = host.calls(node).into_iter().map(|c| c.method).collect();
        assert_eq!(methods, ["SendVKey", "Maximize", "Close"]);
        assert_eq!(host.calls_named(node, "SendVKey")[0].args[0].as_i64("k").unwrap(), 0);
    }

    #[test]
    fn rejects_non_window_handles() {
        let host = MemoryHost::new();
        let session = host.add_session();
        let node = host.add_component(session, "wnd[0]/usr/txtF", "GuiTextField");
        assert!(matches!(
            Window::new(host.handle(node)).unwrap_err(),
            SapError::TypeMismatch { .. }
        ));
    }
}
