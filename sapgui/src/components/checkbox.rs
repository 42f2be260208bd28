use super::{Component, ComponentBase, ComponentKind};
use crate::errors::SapError;
use crate::platforms::ForeignHandle;

/// `GuiCheckBox`. Any other runtime tag is refused at construction.
#[derive(Debug, Clone)]
pub struct CheckBox {
    base: ComponentBase,
}

impl CheckBox {
    pub fn new(handle: ForeignHandle) -> Result<Self, SapError> {
        ComponentBase::read_and_bind(handle, is_checkbox, "GuiCheckBox").map(|base| Self { base })
    }

    pub(crate) fn with_kind(handle: ForeignHandle, kind: ComponentKind) -> Result<Self, SapError> {
        ComponentBase::bind(handle, kind, is_checkbox, "GuiCheckBox").map(|base| Self { base })
    }

    pub fn selected(&self) -> Result<bool, SapError> {
        self.base
            .handle()
            .get_bool("Selected")
            .map_err(|e| e.with_context("read Selected", &self.base.handle().describe()))
    }

    pub fn set_selected(&self, selected: bool) -> Result<(), SapError> {
        self.base.required_put("Selected", selected)
    }
}

fn is_checkbox(kind: &ComponentKind) -> bool {
    *kind == ComponentKind::CheckBox
}

impl Component for CheckBox {
    fn base(&self) -> &ComponentBase {
        &self.base
    }
}
