//! Dynamically typed values and handles to scripting objects

use super::ScriptingProvider;
use crate::errors::SapError;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A value crossing the scripting boundary.
#[derive(Debug, Clone, Default)]
pub enum Variant {
    #[default]
    Empty,
    Bool(bool),
    Int(i64),
    Str(String),
    Object(ForeignHandle),
}

impl Variant {
    pub fn kind(&self) -> &'static str {
        match self {
            Variant::Empty => "empty",
            Variant::Bool(_) => "bool",
            Variant::Int(_) => "int",
            Variant::Str(_) => "string",
            Variant::Object(_) => "object",
        }
    }

    /// Reads a string. `Empty` reads as "" since SAP returns it for unset text.
    pub fn into_string(self, member: &str) -> Result<String, SapError> {
        match self {
            Variant::Str(s) => Ok(s),
            Variant::Empty => Ok(String::new()),
            Variant::Int(i) => Ok(i.to_string()),
            other => Err(SapError::InvalidValue(format!(
                "'{member}' returned {} where a string was expected",
                other.kind()
            ))),
        }
    }

    pub fn as_i64(&self, member: &str) -> Result<i64, SapError> {
        match self {
            Variant::Int(i) => Ok(*i),
            Variant::Str(s) => s.trim().parse().map_err(|_| {
                SapError::InvalidValue(format!("'{member}' returned non-numeric '{s}'"))
            }),
            other => Err(SapError::InvalidValue(format!(
                "'{member}' returned {} where an integer was expected",
                other.kind()
            ))),
        }
    }

    pub fn as_bool(&self, member: &str) -> Result<bool, SapError> {
        match self {
            Variant::Bool(b) => Ok(*b),
            Variant::Int(i) => Ok(*i != 0),
            other => Err(SapError::InvalidValue(format!(
                "'{member}' returned {} where a boolean was expected",
                other.kind()
            ))),
        }
    }

    /// `Empty` means the host returned no object.
    pub fn into_object(self, member: &str) -> Result<Option<ForeignHandle>, SapError> {
        match self {
            Variant::Object(handle) => Ok(Some(handle)),
            Variant::Empty => Ok(None),
            other => Err(SapError::InvalidValue(format!(
                "'{member}' returned {} where an object was expected",
                other.kind()
            ))),
        }
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::Str(value.to_string())
    }
}

impl From<String> for Variant {
    fn from(value: String) -> Self {
        Variant::Str(value)
    }
}

impl From<i64> for Variant {
    fn from(value: i64) -> Self {
        Variant::Int(value)
    }
}

impl From<i32> for Variant {
    fn from(value: i32) -> Self {
        Variant::Int(value.into())
    }
}

impl From<usize> for Variant {
    fn from(value: usize) -> Self {
        Variant::Int(value as i64)
    }
}

impl From<bool> for Variant {
    fn from(value: bool) -> Self {
        Variant::Bool(value)
    }
}

impl From<ForeignHandle> for Variant {
    fn from(value: ForeignHandle) -> Self {
        Variant::Object(value)
    }
}

/// One object living in the scripting host.
///
/// Implementations report an absent member with [`SapError::MemberNotFound`]
/// and everything else as a transport fault.
pub trait ForeignObject: Send + Sync {
    fn get(&self, name: &str) -> Result<Variant, SapError>;
    fn put(&self, name: &str, value: Variant) -> Result<(), SapError>;
    fn call(&self, name: &str, args: &[Variant]) -> Result<Variant, SapError>;

    /// Answers whether `name` is a member of this object without invoking it.
    fn exposes(&self, name: &str) -> Result<bool, SapError>;

    /// Drops the host-side reference. Calling it again is a no-op.
    fn release(&self);
    fn is_released(&self) -> bool;

    /// Short label for diagnostics.
    fn describe(&self) -> String;
}

/// Non-owning reference to a scripting object.
///
/// Clones share the same underlying reference; release responsibility lives
/// with whoever holds the matching [`OwnedHandle`].
#[derive(Clone)]
pub struct ForeignHandle {
    object: Arc<dyn ForeignObject>,
}

impl ForeignHandle {
    pub fn new(object: impl ForeignObject + 'static) -> Self {
        Self {
            object: Arc::new(object),
        }
    }

    pub fn get(&self, name: &str) -> Result<Variant, SapError> {
        self.object.get(name)
    }

    pub fn put(&self, name: &str, value: impl Into<Variant>) -> Result<(), SapError> {
        self.object.put(name, value.into())
    }

    pub fn call(&self, name: &str, args: &[Variant]) -> Result<Variant, SapError> {
        self.object.call(name, args)
    }

    pub fn exposes(&self, name: &str) -> Result<bool, SapError> {
        self.object.exposes(name)
    }

    pub fn get_string(&self, name: &str) -> Result<String, SapError> {
        self.get(name)?.into_string(name)
    }

    pub fn get_i64(&self, name: &str) -> Result<i64, SapError> {
        self.get(name)?.as_i64(name)
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, SapError> {
        self.get(name)?.as_bool(name)
    }

    /// Runtime type tag of the node, e.g. `GuiTextField`.
    pub fn type_tag(&self) -> Result<String, SapError> {
        self.get_string("Type")
    }

    pub fn is_released(&self) -> bool {
        self.object.is_released()
    }

    pub(crate) fn release(&self) {
        self.object.release()
    }

    pub fn describe(&self) -> String {
        self.object.describe()
    }

    /// True when both handles share the same reference.
    pub fn same_reference(&self, other: &ForeignHandle) -> bool {
        Arc::ptr_eq(&self.object, &other.object)
    }
}

impl fmt::Debug for ForeignHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ForeignHandle")
            .field(&self.object.describe())
            .finish()
    }
}

/// Holds the obligation to release one handle, exactly once.
///
/// Released explicitly through [`OwnedHandle::release`] or on drop.
pub struct OwnedHandle {
    handle: Option<ForeignHandle>,
    provider: Arc<dyn ScriptingProvider>,
}

impl OwnedHandle {
    pub fn new(handle: ForeignHandle, provider: Arc<dyn ScriptingProvider>) -> Self {
        Self {
            handle: Some(handle),
            provider,
        }
    }

    /// The held handle, or `None` once released.
    pub fn handle(&self) -> Option<&ForeignHandle> {
        self.handle.as_ref()
    }

    pub fn is_held(&self) -> bool {
        self.handle.is_some()
    }

    pub fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!("Releasing {}", handle.describe());
            self.provider.release_handle(&handle);
        }
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for OwnedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedHandle")
            .field("handle", &self.handle)
            .finish()
    }
}
