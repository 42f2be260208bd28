use super::{Component, ComponentBase, ComponentKind};
use crate::errors::SapError;
use crate::platforms::ForeignHandle;

/// `GuiTextField`, `GuiCTextField` or `GuiPasswordField`.
#[derive(Debug, Clone)]
pub struct TextField {
    base: ComponentBase,
}

impl TextField {
    pub fn new(handle: ForeignHandle) -> Result<Self, SapError> {
        ComponentBase::read_and_bind(handle, ComponentKind::is_text_field, "a text field")
            .map(|base| Self { base })
    }

    pub(crate) fn with_kind(handle: ForeignHandle, kind: ComponentKind) -> Result<Self, SapError> {
        ComponentBase::bind(handle, kind, ComponentKind::is_text_field, "a text field")
            .map(|base| Self { base })
    }

    pub fn caret_position(&self) -> Result<i64, SapError> {
        self.base.required_i64("CaretPosition")
    }

    pub fn set_caret_position(&self, position: i64) -> Result<(), SapError> {
        self.base.required_put("CaretPosition", position)
    }

    pub fn max_length(&self) -> Result<i64, SapError> {
        self.base.required_i64("MaxLength")
    }
}

impl Component for TextField {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn text(&self) -> Result<String, SapError> {
        self.base.required_string("Text")
    }

    fn set_text(&self, text: &str) -> Result<(), SapError> {
        self.base.required_put("Text", text)
    }
}
