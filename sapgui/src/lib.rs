//! Typed automation of SAP GUI through its scripting object model
//!
//! SAP GUI exposes every window, field and grid as a dynamically typed
//! scripting object. This crate wraps those objects in typed facades chosen
//! by their runtime type tag, probes optional members without invoking them,
//! and keeps the session handle under a single owner from connect to dispose.

pub mod capability;
pub mod client;
pub mod components;
pub mod config;
pub mod errors;
pub mod factory;
pub mod locator;
pub mod platforms;
pub mod session;
#[cfg(test)]
mod tests;
pub mod types;
pub mod utils;

pub use capability::Probe;
pub use client::SapClient;
pub use components::{
    Button, CheckBox, Component, ComponentKind, GridTable, GridView, SapComponent, StatusBar,
    TextField, TypedComponent, Window,
};
pub use config::SessionConfig;
pub use errors::SapError;
pub use factory::ComponentFactory;
pub use locator::Locator;
pub use platforms::{create_provider, ForeignHandle, OwnedHandle, ScriptingProvider, Variant};
pub use session::{Session, SessionContext, SessionState};
pub use types::{Credentials, MessageType, StatusMessage, VKEY_ENTER};
pub use utils::CancellationToken;
