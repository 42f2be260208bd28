use super::{Component, ComponentBase, ComponentKind};
use crate::errors::SapError;
use crate::platforms::ForeignHandle;

#[derive(Debug, Clone)]
pub struct Button {
    base: ComponentBase,
}

impl Button {
    pub fn new(handle: ForeignHandle) -> Result<Self, SapError> {
        ComponentBase::read_and_bind(handle, is_button, "GuiButton").map(|base| Self { base })
    }

    pub(crate) fn with_kind(handle: ForeignHandle, kind: ComponentKind) -> Result<Self, SapError> {
        ComponentBase::bind(handle, kind, is_button, "GuiButton").map(|base| Self { base })
    }

    pub fn press(&self) -> Result<(), SapError> {
        self.base.required_call("Press", &[])?;
        Ok(())
    }
}

fn is_button(kind: &ComponentKind) -> bool {
    *kind == ComponentKind::Button
}

impl Component for Button {
    fn base(&self) -> &ComponentBase {
        &self.base
    }
}
