use crate::components::{
    Button, CheckBox, Component, GridTable, GridView, SapComponent, TextField, TypedComponent,
    Window,
};
use crate::config::SessionConfig;
use crate::errors::SapError;
use crate::session::{Session, SessionContext, SessionState};
use crate::types::Credentials;
use crate::utils::sleep_cancellable;
use tracing::{debug, info, instrument, warn};

/// High-level entry point for scripts driving SAP GUI.
///
/// Owns exactly one [`Session`]. Finders return `Ok(None)` for ids that do
/// not resolve; the action helpers (`set_text_field_value`, `click_button`,
/// `get_grid_data`) turn that into [`SapError::ElementNotFound`].
#[derive(Debug)]
pub struct SapClient {
    session: Session,
}

impl SapClient {
    pub fn new(context: SessionContext) -> Self {
        Self {
            session: Session::new(context),
        }
    }

    /// Client for the local SAP GUI installation.
    pub fn platform(config: SessionConfig) -> Result<Self, SapError> {
        Ok(Self::new(SessionContext::platform(config)?))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Attaches to SAP GUI, retrying once after `open_retry_delay` when no
    /// window is found.
    #[instrument(skip(self))]
    pub fn open(&mut self) -> Result<Window, SapError> {
        if let Some(window) = self.session.open()? {
            return Ok(window);
        }
        let config = self.session.config();
        info!(
            "No SAP window yet; retrying in {:?}",
            config.open_retry_delay
        );
        sleep_cancellable(
            config.open_retry_delay,
            config.poll_interval,
            &self.session.context().cancel,
            "open",
        )?;
        self.session.open()?.ok_or_else(|| {
            SapError::SessionNotEstablished(
                "Could not attach to SAP GUI; start SAP Logon and open a connection".to_string(),
            )
        })
    }

    pub fn login(
        &mut self,
        user: &str,
        password: &str,
        client: &str,
        language: &str,
    ) -> Result<Window, SapError> {
        self.login_with(&Credentials::new(user, password, client, language))
    }

    pub fn login_with(&mut self, credentials: &Credentials) -> Result<Window, SapError> {
        self.session.login(credentials)
    }

    pub fn go_to_transaction(&mut self, code: &str) -> Result<(), SapError> {
        self.session.access_transaction(code)
    }

    pub fn main_window(&self) -> Result<Window, SapError> {
        self.session.main_window().cloned()
    }

    pub fn find_component_by_id(&self, id: &str) -> Result<Option<SapComponent>, SapError> {
        self.session.find_by_id(id)
    }

    pub fn find_component_by_id_as<T: TypedComponent>(
        &self,
        id: &str,
    ) -> Result<Option<T>, SapError> {
        self.session.find_by_id_as::<T>(id)
    }

    pub fn find_button_by_id(&self, id: &str) -> Result<Option<Button>, SapError> {
        self.find_component_by_id_as::<Button>(id)
    }

    pub fn find_text_field_by_id(&self, id: &str) -> Result<Option<TextField>, SapError> {
        self.find_component_by_id_as::<TextField>(id)
    }

    pub fn find_grid_view_by_id(&self, id: &str) -> Result<Option<GridView>, SapError> {
        self.find_component_by_id_as::<GridView>(id)
    }

    pub fn find_checkbox_by_id(&self, id: &str) -> Result<Option<CheckBox>, SapError> {
        self.find_component_by_id_as::<CheckBox>(id)
    }

    fn require<T: TypedComponent>(&self, id: &str) -> Result<T, SapError> {
        self.find_component_by_id_as::<T>(id)?.ok_or_else(|| {
            debug!("{} '{}' not found", T::VARIANT, id);
            SapError::ElementNotFound(format!("{} '{}'", T::VARIANT, id))
        })
    }

    #[instrument(skip(self, text))]
    pub fn set_text_field_value(&self, id: &str, text: &str) -> Result<(), SapError> {
        self.require::<TextField>(id)?.set_text(text)
    }

    #[instrument(skip(self))]
    pub fn click_button(&self, id: &str) -> Result<(), SapError> {
        self.require::<Button>(id)?.press()
    }

    /// Text of the main window's status line; "" when there is none.
    pub fn get_status_bar_text(&mut self) -> String {
        let status_bar = match self.session.status_bar() {
            Ok(Some(status_bar)) => status_bar,
            Ok(None) => return String::new(),
            Err(e) => {
                warn!("Status bar unavailable: {}", e);
                return String::new();
            }
        };
        status_bar.text().unwrap_or_else(|e| {
            warn!("Could not read status bar text: {}", e);
            String::new()
        })
    }

    pub fn send_virtual_key(&self, code: i32) -> Result<(), SapError> {
        self.session.main_window()?.send_virtual_key(code)
    }

    #[instrument(skip(self))]
    pub fn get_grid_data(&self, id: &str) -> Result<GridTable, SapError> {
        self.require::<GridView>(id)?.as_table()
    }

    pub fn close(&mut self) -> Result<(), SapError> {
        self.session.close()
    }

    /// Releases the session; every later call fails with [`SapError::Disposed`].
    pub fn dispose(&mut self) {
        self.session.dispose();
    }
}
