//! Session lifecycle: connect, log in, navigate, close

use crate::capability::has_member;
use crate::components::{Component, SapComponent, StatusBar, TextField, TypedComponent, Window};
use crate::config::SessionConfig;
use crate::errors::SapError;
use crate::factory::ComponentFactory;
use crate::locator::Locator;
use crate::platforms::{create_provider, ForeignHandle, OwnedHandle, ScriptingProvider};
use crate::types::Credentials;
use crate::utils::{poll_until, sleep_cancellable, CancellationToken};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Logon screen fields, relative to the logon window.
pub const LOGIN_USER_FIELD: &str = "usr/txtRSYST-BNAME";
pub const LOGIN_PASSWORD_FIELD: &str = "usr/pwdRSYST-BCODE";
pub const LOGIN_CLIENT_FIELD: &str = "usr/txtRSYST-MANDT";
pub const LOGIN_LANGUAGE_FIELD: &str = "usr/txtRSYST-LANGU";
/// Command field of a main window.
pub const COMMAND_FIELD: &str = "okcd";
pub const STATUS_BAR: &str = "sbar";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Connecting,
    Connected,
    LoggedIn,
    Disposed,
}

/// Everything a session needs, built once by the caller.
#[derive(Clone)]
pub struct SessionContext {
    pub provider: Arc<dyn ScriptingProvider>,
    pub factory: ComponentFactory,
    pub config: SessionConfig,
    pub cancel: CancellationToken,
}

impl SessionContext {
    pub fn new(provider: Arc<dyn ScriptingProvider>) -> Self {
        Self {
            provider,
            factory: ComponentFactory::new(),
            config: SessionConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Context backed by the SAP GUI installation of this machine.
    pub fn platform(config: SessionConfig) -> Result<Self, SapError> {
        let provider = create_provider(&config)?;
        Self::new(provider).with_config(config)
    }

    /// Replaces the configuration after validating it.
    pub fn with_config(mut self, config: SessionConfig) -> Result<Self, SapError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Owns one SAP GUI session handle and the last resolved main window.
///
/// Not meant to be shared between threads. Dropping the session disposes it,
/// which releases the session handle.
pub struct Session {
    context: SessionContext,
    session: Option<OwnedHandle>,
    main_window: Option<Window>,
    state: SessionState,
}

impl Session {
    pub fn new(context: SessionContext) -> Self {
        Self {
            context,
            session: None,
            main_window: None,
            state: SessionState::Closed,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_disposed(&self) -> bool {
        self.state == SessionState::Disposed
    }

    pub fn has_session(&self) -> bool {
        self.session.as_ref().is_some_and(OwnedHandle::is_held)
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn config(&self) -> &SessionConfig {
        &self.context.config
    }

    /// Token checked by every wait; cancel a clone to abort.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.context.cancel.clone()
    }

    fn ensure_not_disposed(&self) -> Result<(), SapError> {
        if self.is_disposed() {
            return Err(SapError::Disposed);
        }
        Ok(())
    }

    fn session_handle(&self) -> Result<&ForeignHandle, SapError> {
        self.session
            .as_ref()
            .and_then(OwnedHandle::handle)
            .ok_or_else(|| SapError::SessionNotEstablished("No SAP session is open".to_string()))
    }

    /// The main window resolved by the last open, login or status lookup.
    pub fn main_window(&self) -> Result<&Window, SapError> {
        self.ensure_not_disposed()?;
        self.main_window.as_ref().ok_or_else(|| {
            SapError::SessionNotEstablished(
                "No main window available; open a session or log in first".to_string(),
            )
        })
    }

    /// Attaches to the first session of the first connection.
    ///
    /// `Ok(None)` means SAP GUI has no open connection (or no main window
    /// yet); the caller may retry, and `login` will try again on its own.
    #[instrument(level = "debug", skip(self))]
    pub fn open(&mut self) -> Result<Option<Window>, SapError> {
        self.ensure_not_disposed()?;
        self.release_session();
        self.state = SessionState::Connecting;

        match self.connect() {
            Ok(window) => {
                self.state = if self.has_session() {
                    SessionState::Connected
                } else {
                    SessionState::Closed
                };
                match &window {
                    Some(_) => info!("Attached to SAP session"),
                    None if self.has_session() => warn!(
                        "Session found but '{}' did not resolve to a window",
                        self.context.config.main_window_id
                    ),
                    None => info!("No SAP GUI connection is open"),
                }
                self.main_window = window.clone();
                Ok(window)
            }
            Err(e) => {
                error!("Failed to open SAP session: {}", e);
                self.release_session();
                self.state = SessionState::Closed;
                Err(e)
            }
        }
    }

    fn connect(&mut self) -> Result<Option<Window>, SapError> {
        let provider = self.context.provider.clone();

        let Some(root) = provider.application_root()? else {
            warn!("SAP GUI is not running and could not be started");
            return Ok(None);
        };
        let _root = OwnedHandle::new(root.clone(), provider.clone());

        let Some(engine) = provider.scripting_engine(&root)? else {
            warn!("SAP GUI scripting engine is unavailable; is scripting enabled?");
            return Ok(None);
        };
        let _engine = OwnedHandle::new(engine.clone(), provider.clone());

        let connections = provider.connection_count(&engine)?;
        debug!("{} open connection(s)", connections);
        if connections == 0 {
            return Ok(None);
        }
        let Some(connection) = provider.connection(&engine, 0)? else {
            return Ok(None);
        };
        let _connection = OwnedHandle::new(connection.clone(), provider.clone());

        let Some(session) = provider.session(&connection, 0)? else {
            info!("Connection has no session");
            return Ok(None);
        };
        self.session = Some(OwnedHandle::new(session, provider));

        let main_window_id = self.context.config.main_window_id.clone();
        self.find_by_id_as::<Window>(&main_window_id)
    }

    /// Fills the logon screen, confirms and checks the resulting status line.
    ///
    /// Opens a session first when none is held.
    #[instrument(skip(self, credentials), fields(user = %credentials.user, client = %credentials.client))]
    pub fn login(&mut self, credentials: &Credentials) -> Result<Window, SapError> {
        self.ensure_not_disposed()?;
        self.context.cancel.check("login")?;
        if !self.has_session() {
            debug!("No session held; opening one before login");
            self.open()?;
            if !self.has_session() {
                return Err(SapError::SessionNotEstablished(
                    "No SAP GUI session is available for login; start SAP Logon and open a connection"
                        .to_string(),
                ));
            }
        }

        let session = self.session_handle()?.clone();
        let active = self.context.provider.active_window(&session)?;
        let login_window = self
            .context
            .factory
            .create_typed::<Window>(active)?
            .ok_or_else(|| {
                SapError::SessionNotEstablished("The session has no active logon window".to_string())
            })?;
        let login_window_id = login_window.id()?;

        for (relative, value) in [
            (LOGIN_USER_FIELD, &credentials.user),
            (LOGIN_PASSWORD_FIELD, &credentials.password),
            (LOGIN_CLIENT_FIELD, &credentials.client),
        ] {
            let path = Locator::resolve_relative(&login_window_id, relative);
            let field = self
                .find_by_id_as::<TextField>(&path)?
                .ok_or(SapError::ElementNotFound(path))?;
            field.set_text(value)?;
        }
        match self.find_in_window::<TextField>(&login_window_id, LOGIN_LANGUAGE_FIELD) {
            Ok(Some(field)) => field.set_text(&credentials.language)?,
            Ok(None) => warn!("Logon language field not found; keeping the default"),
            Err(e) if e.is_missing_object() => {
                warn!("Logon language field not found ({}); keeping the default", e)
            }
            Err(e) => return Err(e),
        }

        login_window.send_virtual_key(self.context.config.confirm_key)?;
        self.wait_until_idle(self.context.config.login_settle, "login")?;

        let main_window_id = self.context.config.main_window_id.clone();
        let Some(main) = self.find_by_id_as::<Window>(&main_window_id)? else {
            let status = self
                .status_text_in(&login_window_id)
                .unwrap_or_else(|| "N/A".to_string());
            error!("Main window missing after login; status: {}", status);
            return Err(SapError::SessionNotEstablished(format!(
                "Main window did not appear after login. Last status: {status}"
            )));
        };

        self.check_status(&main.id()?, "login")?;

        self.main_window = Some(main.clone());
        self.state = SessionState::LoggedIn;
        info!("Logged in");
        Ok(main)
    }

    /// Runs a transaction code through the command field of the main window.
    #[instrument(skip(self))]
    pub fn access_transaction(&mut self, code: &str) -> Result<(), SapError> {
        self.ensure_not_disposed()?;
        let main = self.main_window()?.clone();
        self.context.cancel.check("access transaction")?;

        let path = main.find_child_path(COMMAND_FIELD)?;
        let field = self
            .find_by_id_as::<TextField>(&path)?
            .ok_or_else(|| SapError::ElementNotFound(path.clone()))?;
        field.set_text(&format!("{}{}", self.context.config.navigation_prefix, code))?;
        main.send_virtual_key(self.context.config.confirm_key)?;
        self.wait_until_idle(self.context.config.navigation_settle, "access transaction")?;

        self.check_status(&main.id()?, "access transaction")?;
        info!("Opened transaction {}", code);
        Ok(())
    }

    /// Looks up a component by absolute or session-relative id.
    ///
    /// A node the host reports as missing, or one no facade wraps, is
    /// `Ok(None)`.
    pub fn find_by_id(&self, id: &str) -> Result<Option<SapComponent>, SapError> {
        self.find_by_id_as::<SapComponent>(id)
    }

    pub fn find_by_id_as<T: TypedComponent>(&self, id: &str) -> Result<Option<T>, SapError> {
        self.ensure_not_disposed()?;
        let session = self.session_handle()?;
        let handle = self.context.provider.find_component_by_path(session, id)?;
        self.context.factory.create_typed::<T>(handle)
    }

    fn find_in_window<T: TypedComponent>(
        &self,
        window_id: &str,
        relative_id: &str,
    ) -> Result<Option<T>, SapError> {
        self.find_by_id_as::<T>(&Locator::resolve_relative(window_id, relative_id))
    }

    /// Fails with [`SapError::HostStatus`] when the status line under
    /// `window_id` reports an error or abort. The type decides, not the text.
    fn check_status(&self, window_id: &str, operation: &str) -> Result<(), SapError> {
        let Some(status_bar) = self.find_in_window::<StatusBar>(window_id, STATUS_BAR)? else {
            debug!("No status bar under {}", window_id);
            return Ok(());
        };
        let Some(message_type) = status_bar.message_type()? else {
            return Ok(());
        };
        let text = status_bar.text()?;
        info!("Status after {}: [{}] {}", operation, message_type.code(), text);
        if message_type.is_failure() {
            error!("{} rejected by SAP: [{}] {}", operation, message_type.code(), text);
            return Err(SapError::HostStatus { message_type, text });
        }
        Ok(())
    }

    fn status_text_in(&self, window_id: &str) -> Option<String> {
        match self.find_in_window::<StatusBar>(window_id, STATUS_BAR) {
            Ok(Some(status_bar)) => status_bar.text().ok(),
            Ok(None) => None,
            Err(e) => {
                debug!("No status text under {}: {}", window_id, e);
                None
            }
        }
    }

    /// Status line of the main window.
    ///
    /// Falls back to re-resolving the main window once; failures on either
    /// attempt are logged and end in `Ok(None)`.
    pub fn status_bar(&mut self) -> Result<Option<StatusBar>, SapError> {
        self.ensure_not_disposed()?;
        if let Some(main) = &self.main_window {
            match main
                .id()
                .and_then(|id| self.find_in_window::<StatusBar>(&id, STATUS_BAR))
            {
                Ok(Some(status_bar)) => return Ok(Some(status_bar)),
                Ok(None) => debug!("No status bar under the current main window"),
                Err(e) => warn!("Status bar lookup through main window failed: {}", e),
            }
        }
        if !self.has_session() {
            debug!("No session; no status bar");
            return Ok(None);
        }

        debug!("Re-resolving the main window to find the status bar");
        let main_window_id = self.context.config.main_window_id.clone();
        match self.find_by_id_as::<Window>(&main_window_id) {
            Ok(Some(window)) => {
                let found = window
                    .id()
                    .and_then(|id| self.find_in_window::<StatusBar>(&id, STATUS_BAR));
                self.main_window = Some(window);
                match found {
                    Ok(status_bar) => Ok(status_bar),
                    Err(e) => {
                        warn!("Status bar lookup failed after re-resolving: {}", e);
                        Ok(None)
                    }
                }
            }
            Ok(None) => {
                warn!("Main window not found; no status bar available");
                Ok(None)
            }
            Err(e) => {
                warn!("Could not re-resolve the main window: {}", e);
                Ok(None)
            }
        }
    }

    /// Waits for the host to finish processing input.
    ///
    /// Polls the session's `Busy` flag until it clears or the action timeout
    /// elapses. Hosts without the flag get the fixed `settle` delay.
    fn wait_until_idle(&self, settle: Duration, operation: &str) -> Result<(), SapError> {
        let session = self.session_handle()?;
        let config = &self.context.config;
        let cancel = &self.context.cancel;

        if !has_member(session, None, "Busy")? {
            debug!("Host does not report Busy; settling for {:?}", settle);
            return sleep_cancellable(settle, config.poll_interval, cancel, operation);
        }
        poll_until(
            config.action_timeout,
            config.poll_interval,
            cancel,
            operation,
            || {
                let busy = session
                    .get_bool("Busy")
                    .map_err(|e| e.with_context("read Busy", &session.describe()))?;
                Ok((!busy).then_some(()))
            },
        )
    }

    /// Releases the session handle and forgets the main window. Idempotent.
    pub fn close(&mut self) -> Result<(), SapError> {
        self.ensure_not_disposed()?;
        if self.has_session() {
            info!("Closing SAP session");
        }
        self.release_session();
        self.state = SessionState::Closed;
        Ok(())
    }

    /// Closes and refuses every later operation. Repeated calls do nothing.
    pub fn dispose(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.release_session();
        self.state = SessionState::Disposed;
        debug!("Session disposed");
    }

    /// Window and field handles are not released one by one: the host drops
    /// them with the session.
    fn release_session(&mut self) {
        self.main_window = None;
        if let Some(mut session) = self.session.take() {
            session.release();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("session", &self.session)
            .field("main_window", &self.main_window)
            .finish()
    }
}
