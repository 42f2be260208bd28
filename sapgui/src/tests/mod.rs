
use crate::config::SessionConfig;
use crate::platforms::memory::{MemoryHost, NodeId};
use crate::session::SessionContext;
use std::sync::Arc;
use std::time::Duration;

// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .with_target(true)
        .with_test_writer()
        .try_init();
}

/// Short waits so tests never sit on the production settle delays.
pub fn fast_config() -> SessionConfig {
    SessionConfig {
        login_settle: Duration::from_millis(1),
        navigation_settle: Duration::from_millis(1),
        poll_interval: Duration::from_millis(1),
        action_timeout: Duration::from_millis(50),
        open_retry_delay: Duration::from_millis(1),
        ..SessionConfig::default()
    }
}

pub fn context(host: &MemoryHost) -> SessionContext {
    SessionContext::new(Arc::new(host.clone()))
        .with_config(fast_config())
        .unwrap()
}

/// A host showing the logon screen in `wnd[0]`.
pub struct LogonScreen {
    pub host: MemoryHost,
    pub session: NodeId,
    pub window: NodeId,
    pub user: NodeId,
    pub password: NodeId,
    pub client: NodeId,
    pub language: NodeId,
    pub command: NodeId,
    pub status: NodeId,
}

impl LogonScreen {
    pub fn new() -> Self {
        Self::on(MemoryHost::new())
    }

    /// Adds a connection showing the logon screen to an existing host.
    pub fn on(host: MemoryHost) -> Self {
        let session = host.add_session();
        let window = host.add_component(session, "wnd[0]", "GuiMainWindow");
        host.set_property(window, "Text", "SAP");
        host.set_active_window(session, window);
        let user = host.add_component(session, "wnd[0]/usr/txtRSYST-BNAME", "GuiTextField");
        let password = host.add_component(session, "wnd[0]/usr/pwdRSYST-BCODE", "GuiPasswordField");
        let client = host.add_component(session, "wnd[0]/usr/txtRSYST-MANDT", "GuiTextField");
        let language = host.add_component(session, "wnd[0]/usr/txtRSYST-LANGU", "GuiTextField");
        let command = host.add_component(session, "wnd[0]/okcd", "GuiCTextField");
        let status = host.add_component(session, "wnd[0]/sbar", "GuiStatusbar");
        Self {
            host,
            session,
            window,
            user,
            password,
            client,
            language,
            command,
            status,
        }
    }

    pub fn set_status(&self, code: &str, text: &str) {
        self.host.set_property(self.status, "MessageType", code);
        self.host.set_property(self.status, "Text", text);
    }

    pub fn text_of(&self, node: NodeId) -> String {
        self.host
            .property(node, "Text")
            .map(|v| v.into_string("Text").unwrap_or_default())
            .unwrap_or_default()
    }
}
