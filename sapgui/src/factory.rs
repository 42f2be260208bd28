use crate::components::{Component, ComponentKind, SapComponent, TypedComponent};
use crate::errors::SapError;
use crate::platforms::ForeignHandle;
use tracing::{debug, warn};

/// Turns raw handles into facades by their runtime type tag.
///
/// The factory never releases the handles it inspects; a handle that could
/// not be wrapped stays valid for the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentFactory;

impl ComponentFactory {
    pub fn new() -> Self {
        Self
    }

    /// Wraps `handle` in the variant its tag maps to.
    ///
    /// Returns `Ok(None)` for an absent handle or an unknown tag. Failing to
    /// read the tag is a transport fault.
    pub fn create(
        &self,
        handle: impl Into<Option<ForeignHandle>>,
    ) -> Result<Option<SapComponent>, SapError> {
        let Some(handle) = handle.into() else {
            return Ok(None);
        };
        let tag = handle
            .type_tag()
            .map_err(|e| e.with_context("read Type", &handle.describe()))?;
        let Some(kind) = ComponentKind::from_type_tag(&tag) else {
            warn!("No wrapper for type '{}' ({})", tag, handle.describe());
            return Ok(None);
        };
        debug!("Wrapping {} as {}", handle.describe(), kind);
        SapComponent::from_kind(handle, kind).map(Some)
    }

    /// Like [`ComponentFactory::create`], keeping the result only when it is a `T`.
    pub fn create_typed<T: TypedComponent>(
        &self,
        handle: impl Into<Option<ForeignHandle>>,
    ) -> Result<Option<T>, SapError> {
        let Some(component) = self.create(handle)? else {
            return Ok(None);
        };
        match T::from_component(component) {
            Ok(typed) => Ok(Some(typed)),
            Err(other) => {
                warn!(
                    "Expected a {} but {} is a {}",
                    T::VARIANT,
                    other.handle().describe(),
                    other.variant_name()
                );
                Ok(None)
            }
        }
    }
}
