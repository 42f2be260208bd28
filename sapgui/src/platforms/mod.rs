use crate::config::SessionConfig;
use crate::errors::SapError;
use std::sync::Arc;
use tracing::{debug, error};

pub mod handle;
pub mod memory;
#[cfg(target_os = "windows")]
pub mod windows;

pub use handle::{ForeignHandle, ForeignObject, OwnedHandle, Variant};

/// Access to the scripting host: application root, connection and session
/// enumeration, lookup by path and handle release.
///
/// Only [`ScriptingProvider::application_root`] is platform specific. The
/// remaining operations walk the scripting object model through
/// [`ForeignHandle`] and can be overridden when a binding has a faster path.
pub trait ScriptingProvider: Send + Sync {
    /// The scripting entry object, or `None` if the host is not running and
    /// could not be started.
    fn application_root(&self) -> Result<Option<ForeignHandle>, SapError>;

    fn scripting_engine(&self, root: &ForeignHandle) -> Result<Option<ForeignHandle>, SapError> {
        match root.call("GetScriptingEngine", &[]) {
            Ok(value) => value.into_object("GetScriptingEngine"),
            Err(e) if e.is_missing_member() || e.is_missing_object() => {
                debug!("Scripting engine not available: {}", e);
                Ok(None)
            }
            Err(e) => Err(e.with_context("GetScriptingEngine", &root.describe())),
        }
    }

    fn connection_count(&self, engine: &ForeignHandle) -> Result<usize, SapError> {
        collection_count(engine, "Connections")
    }

    fn connection(
        &self,
        engine: &ForeignHandle,
        index: usize,
    ) -> Result<Option<ForeignHandle>, SapError> {
        collection_item(engine, "Connections", index)
    }

    fn session_count(&self, connection: &ForeignHandle) -> Result<usize, SapError> {
        collection_count(connection, "Sessions")
    }

    fn session(
        &self,
        connection: &ForeignHandle,
        index: usize,
    ) -> Result<Option<ForeignHandle>, SapError> {
        collection_item(connection, "Sessions", index)
    }

    /// Resolves an absolute (or session-relative) component id.
    ///
    /// A "no such node" response from the host is `Ok(None)`; any other
    /// failure is a transport fault carrying the path.
    fn find_component_by_path(
        &self,
        session: &ForeignHandle,
        path: &str,
    ) -> Result<Option<ForeignHandle>, SapError> {
        match session.call("FindById", &[Variant::from(path)]) {
            Ok(value) => value
                .into_object("FindById")
                .map_err(|e| e.with_context("FindById", path)),
            Err(e) if e.is_missing_object() => {
                debug!("No component with id '{}'", path);
                Ok(None)
            }
            Err(e) => {
                error!("FindById('{}') failed: {}", path, e);
                Err(e.with_context("FindById", path))
            }
        }
    }

    /// Active window of a session or connection.
    fn active_window(&self, target: &ForeignHandle) -> Result<Option<ForeignHandle>, SapError> {
        match target.get("ActiveWindow") {
            Ok(value) => value.into_object("ActiveWindow"),
            Err(e) if e.is_missing_member() || e.is_missing_object() => {
                debug!("No active window on {}: {}", target.describe(), e);
                Ok(None)
            }
            Err(e) => Err(e.with_context("ActiveWindow", &target.describe())),
        }
    }

    /// Best-effort release. Already released handles are ignored.
    fn release_handle(&self, handle: &ForeignHandle) {
        if !handle.is_released() {
            handle.release();
        }
    }
}

/// `Count` of a child collection; a missing collection counts as empty.
fn collection_count(owner: &ForeignHandle, collection: &str) -> Result<usize, SapError> {
    let items = match owner.get(collection) {
        Ok(value) => value.into_object(collection)?,
        Err(e) if e.is_missing_member() => None,
        Err(e) => return Err(e.with_context(collection, &owner.describe())),
    };
    let Some(items) = items else {
        return Ok(0);
    };
    let count = items
        .get_i64("Count")
        .map_err(|e| e.with_context("Count", collection))?;
    Ok(count.max(0) as usize)
}

fn collection_item(
    owner: &ForeignHandle,
    collection: &str,
    index: usize,
) -> Result<Option<ForeignHandle>, SapError> {
    let items = match owner.get(collection) {
        Ok(value) => value.into_object(collection)?,
        Err(e) if e.is_missing_member() => None,
        Err(e) => return Err(e.with_context(collection, &owner.describe())),
    };
    let Some(items) = items else {
        return Ok(None);
    };
    match items.call("ElementAt", &[Variant::from(index)]) {
        Ok(value) => value.into_object("ElementAt"),
        Err(e) if e.is_missing_object() || e.is_missing_member() => Ok(None),
        Err(e) => Err(e.with_context("ElementAt", &format!("{collection}[{index}]"))),
    }
}

/// Create the scripting provider for the current platform
pub fn create_provider(config: &SessionConfig) -> Result<Arc<dyn ScriptingProvider>, SapError> {
    #[cfg(target_os = "windows")]
    {
        Ok(Arc::new(windows::ComProvider::new(config)?))
    }
    #[cfg(not(target_os = "windows"))]
    {
        let _ = config;
        Err(SapError::UnsupportedPlatform(
            "SAP GUI scripting is only available on Windows".to_string(),
        ))
    }
}
