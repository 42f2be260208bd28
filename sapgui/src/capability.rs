//! Capability probing for optional members
//!
//! SAP components expose different members depending on their runtime type
//! and, occasionally, on the SAP GUI release. The helpers here look a member
//! up before touching it: a static table of the members each known
//! component kind declares is consulted first, then the handle's own
//! `exposes` query. Neither step invokes the member. A missing member is
//! reported as [`Probe::Missing`]; transport faults still propagate.

use crate::components::ComponentKind;
use crate::errors::SapError;
use crate::platforms::{ForeignHandle, Variant};
use tracing::debug;

/// Outcome of touching an optional member.
#[derive(Debug, Clone, PartialEq)]
pub enum Probe<T> {
    Present(T),
    Missing,
}

impl<T> Probe<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Probe::Present(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Probe::Present(value) => Some(value),
            Probe::Missing => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Probe<U> {
        match self {
            Probe::Present(value) => Probe::Present(f(value)),
            Probe::Missing => Probe::Missing,
        }
    }

    pub fn unwrap_or(self, default: T) -> T {
        self.into_option().unwrap_or(default)
    }
}

/// Answers whether `member` is available on `handle` without invoking it.
pub fn has_member(
    handle: &ForeignHandle,
    kind: Option<ComponentKind>,
    member: &str,
) -> Result<bool, SapError> {
    if let Some(declared) = kind.and_then(|k| k.declares(member)) {
        return Ok(declared);
    }
    match handle.exposes(member) {
        Ok(exposed) => Ok(exposed),
        Err(e) if e.is_missing_member() => Ok(false),
        Err(e) => Err(e.with_context(&format!("query {member}"), &handle.describe())),
    }
}

/// Reads an optional property.
pub fn probe_property(
    handle: &ForeignHandle,
    kind: Option<ComponentKind>,
    name: &str,
) -> Result<Probe<Variant>, SapError> {
    if !has_member(handle, kind, name)? {
        debug!("{} does not expose property {}", handle.describe(), name);
        return Ok(Probe::Missing);
    }
    match handle.get(name) {
        Ok(value) => Ok(Probe::Present(value)),
        Err(e) if e.is_missing_member() => Ok(Probe::Missing),
        Err(e) => Err(e.with_context(&format!("read {name}"), &handle.describe())),
    }
}

/// Writes an optional property.
pub fn probe_write(
    handle: &ForeignHandle,
    kind: Option<ComponentKind>,
    name: &str,
    value: impl Into<Variant>,
) -> Result<Probe<()>, SapError> {
    if !has_member(handle, kind, name)? {
        debug!("{} does not expose property {}", handle.describe(), name);
        return Ok(Probe::Missing);
    }
    match handle.put(name, value) {
        Ok(()) => Ok(Probe::Present(())),
        Err(e) if e.is_missing_member() => Ok(Probe::Missing),
        Err(e) => Err(e.with_context(&format!("write {name}"), &handle.describe())),
    }
}

/// Invokes an optional zero-argument method, only after its existence has
/// been established.
pub fn probe_invoke(
    handle: &ForeignHandle,
    kind: Option<ComponentKind>,
    method: &str,
) -> Result<Probe<Variant>, SapError> {
    if !has_member(handle, kind, method)? {
        debug!("{} does not expose method {}", handle.describe(), method);
        return Ok(Probe::Missing);
    }
    match handle.call(method, &[]) {
        Ok(value) => Ok(Probe::Present(value)),
        Err(e) if e.is_missing_member() => Ok(Probe::Missing),
        Err(e) => Err(e.with_context(method, &handle.describe())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::memory::MemoryHost;

    #[test]
    fn missing_property_is_reported_without_error() {
        let host = MemoryHost::new();
        let session = host.add_session();
        let button = host.add_component(session, "wnd[0]/tbar[1]/btn[8]", "GuiButton");
        host.remove_property(button, "Text");
        let handle = host.handle(button);

        let probe = probe_property(&handle, Some(ComponentKind::Button), "Text").unwrap();
        assert_eq!(probe.map(|_| ()), Probe::Missing);
    }

    #[test]
    fn declared_members_skip_the_existence_query() {
        let host = MemoryHost::new();
        let session = host.add_session();
        let field = host.add_component(session, "wnd[0]/usr/txtF", "GuiTextField");
        let handle = host.handle(field);

        // Press belongs to buttons only, so the handle is never asked.
        host.set_unreachable(Some("host went away"));
        let probe = probe_invoke(&handle, Some(ComponentKind::TextField), "Press").unwrap();
        assert!(!probe.is_present());
    }

    #[test]
    fn method_existence_check_does_not_invoke() {
        let host = MemoryHost::new();
        let session = host.add_session();
        let button = host.add_component(session, "wnd[0]/tbar[1]/btn[8]", "GuiButton");
        let handle = host.handle(button);

        assert!(has_member(&handle, None, "Press").unwrap());
        assert!(!has_member(&handle, None, "Maximize").unwrap());
        assert!(host.calls(button).is_empty());

        host.remove_method(button, "SetFocus");
        let probe = probe_invoke(&handle, Some(ComponentKind::Button), "SetFocus").unwrap();
        assert!(!probe.is_present());
        assert!(host.calls(button).is_empty());
    }

    #[test]
    fn transport_faults_propagate() {
        let host = MemoryHost::new();
        let session = host.add_session();
        let field = host.add_component(session, "wnd[0]/usr/txtF", "GuiTextField");
        let handle = host.handle(field);
        host.set_unreachable(Some("RPC server is unavailable"));

        let err = probe_property(&handle, Some(ComponentKind::TextField), "Text").unwrap_err();
        assert!(matches!(err, SapError::Transport { .. }));
    }
}
