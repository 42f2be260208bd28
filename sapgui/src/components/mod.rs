//! Typed facades over SAP GUI scripting components
//!
//! Each facade binds one [`ForeignHandle`] and never releases it: the host
//! drops component references when the owning session is released.

use crate::capability::{probe_invoke, probe_property, probe_write, Probe};
use crate::errors::SapError;
use crate::platforms::ForeignHandle;
use tracing::warn;

mod button;
mod checkbox;
mod grid;
mod status_bar;
mod text_field;
mod window;

pub use button::Button;
pub use checkbox::CheckBox;
pub use grid::{GridColumns, GridTable, GridView};
pub use status_bar::StatusBar;
pub use text_field::TextField;
pub use window::Window;

/// Runtime type tags the library knows how to wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    MainWindow,
    ModalWindow,
    DialogShell,
    StatusBar,
    TextField,
    CTextField,
    PasswordField,
    Button,
    GridView,
    CheckBox,
}

/// Members every component may or may not carry, depending on the node.
const OPTIONAL_MEMBERS: &[&str] = &["Text", "SetFocus"];

impl ComponentKind {
    pub const ALL: [ComponentKind; 10] = [
        ComponentKind::MainWindow,
        ComponentKind::ModalWindow,
        ComponentKind::DialogShell,
        ComponentKind::StatusBar,
        ComponentKind::TextField,
        ComponentKind::CTextField,
        ComponentKind::PasswordField,
        ComponentKind::Button,
        ComponentKind::GridView,
        ComponentKind::CheckBox,
    ];

    pub fn from_type_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_tag() == tag)
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            ComponentKind::MainWindow => "GuiMainWindow",
            ComponentKind::ModalWindow => "GuiModalWindow",
            ComponentKind::DialogShell => "GuiDialogShell",
            ComponentKind::StatusBar => "GuiStatusbar",
            ComponentKind::TextField => "GuiTextField",
            ComponentKind::CTextField => "GuiCTextField",
            ComponentKind::PasswordField => "GuiPasswordField",
            ComponentKind::Button => "GuiButton",
            ComponentKind::GridView => "GuiGridView",
            ComponentKind::CheckBox => "GuiCheckBox",
        }
    }

    pub fn is_window(&self) -> bool {
        matches!(
            self,
            ComponentKind::MainWindow | ComponentKind::ModalWindow | ComponentKind::DialogShell
        )
    }

    pub fn is_text_field(&self) -> bool {
        matches!(
            self,
            ComponentKind::TextField | ComponentKind::CTextField | ComponentKind::PasswordField
        )
    }

    /// Members the SAP scripting API documents for this kind.
    pub fn members(&self) -> &'static [&'static str] {
        match self {
            ComponentKind::MainWindow | ComponentKind::ModalWindow | ComponentKind::DialogShell => {
                &["Text", "SendVKey", "Maximize", "Close"]
            }
            ComponentKind::StatusBar => &["Text", "MessageType"],
            ComponentKind::TextField | ComponentKind::CTextField | ComponentKind::PasswordField => {
                &["Text", "CaretPosition", "MaxLength"]
            }
            ComponentKind::Button => &["Press"],
            ComponentKind::GridView => &[
                "RowCount",
                "ColumnCount",
                "VisibleRowCount",
                "Columns",
                "GetCellValue",
                "SetCellValue",
                "SetCurrentCell",
                "DoubleClickCurrentCell",
            ],
            ComponentKind::CheckBox => &["Selected"],
        }
    }

    /// Static answer to "does this kind have `member`", when one exists.
    ///
    /// `Some(true)` for members documented for the kind, `Some(false)` for
    /// members that belong to other kinds only, `None` when the node itself
    /// has to be asked.
    pub fn declares(&self, member: &str) -> Option<bool> {
        if matches!(member, "Id" | "Name" | "Type") || self.members().contains(&member) {
            return Some(true);
        }
        if OPTIONAL_MEMBERS.contains(&member) {
            return None;
        }
        let known_elsewhere = Self::ALL
            .iter()
            .any(|kind| kind.members().contains(&member));
        known_elsewhere.then_some(false)
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_tag())
    }
}

/// Handle plus kind, shared by every facade.
#[derive(Debug, Clone)]
pub struct ComponentBase {
    handle: ForeignHandle,
    kind: ComponentKind,
}

impl ComponentBase {
    /// Binds `handle` after checking that `kind` is one `accepts` allows.
    pub(crate) fn bind(
        handle: ForeignHandle,
        kind: ComponentKind,
        accepts: fn(&ComponentKind) -> bool,
        expected: &str,
    ) -> Result<Self, SapError> {
        if !accepts(&kind) {
            return Err(SapError::TypeMismatch {
                expected: expected.to_string(),
                actual: kind.type_tag().to_string(),
            });
        }
        Ok(Self { handle, kind })
    }

    /// Reads the runtime tag of `handle` and binds it.
    pub(crate) fn read_and_bind(
        handle: ForeignHandle,
        accepts: fn(&ComponentKind) -> bool,
        expected: &str,
    ) -> Result<Self, SapError> {
        let tag = handle
            .type_tag()
            .map_err(|e| e.with_context("read Type", &handle.describe()))?;
        let kind = ComponentKind::from_type_tag(&tag).ok_or_else(|| SapError::TypeMismatch {
            expected: expected.to_string(),
            actual: tag.clone(),
        })?;
        Self::bind(handle, kind, accepts, expected)
    }

    pub fn handle(&self) -> &ForeignHandle {
        &self.handle
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// Reads a property the component must have.
    pub(crate) fn required_string(&self, name: &str) -> Result<String, SapError> {
        self.handle
            .get_string(name)
            .map_err(|e| e.with_context(&format!("read {name}"), &self.handle.describe()))
    }

    pub(crate) fn required_i64(&self, name: &str) -> Result<i64, SapError> {
        self.handle
            .get_i64(name)
            .map_err(|e| e.with_context(&format!("read {name}"), &self.handle.describe()))
    }

    pub(crate) fn required_put(
        &self,
        name: &str,
        value: impl Into<crate::platforms::Variant>,
    ) -> Result<(), SapError> {
        self.handle
            .put(name, value)
            .map_err(|e| e.with_context(&format!("write {name}"), &self.handle.describe()))
    }

    pub(crate) fn required_call(
        &self,
        method: &str,
        args: &[crate::platforms::Variant],
    ) -> Result<crate::platforms::Variant, SapError> {
        self.handle
            .call(method, args)
            .map_err(|e| e.with_context(method, &self.handle.describe()))
    }

    pub fn id(&self) -> Result<String, SapError> {
        self.required_string("Id")
    }

    pub fn name(&self) -> Result<String, SapError> {
        self.required_string("Name")
    }

    /// Text when the node has it, "" otherwise.
    pub fn optional_text(&self) -> Result<String, SapError> {
        match probe_property(&self.handle, Some(self.kind), "Text")? {
            Probe::Present(value) => value.into_string("Text"),
            Probe::Missing => {
                warn!("{} has no Text property; reading as empty", self.handle.describe());
                Ok(String::new())
            }
        }
    }

    pub fn set_optional_text(&self, text: &str) -> Result<(), SapError> {
        if let Probe::Missing = probe_write(&self.handle, Some(self.kind), "Text", text)? {
            warn!("{} has no Text property; write ignored", self.handle.describe());
        }
        Ok(())
    }

    pub fn set_focus(&self) -> Result<(), SapError> {
        if let Probe::Missing = probe_invoke(&self.handle, Some(self.kind), "SetFocus")? {
            warn!("{} cannot take focus; ignored", self.handle.describe());
        }
        Ok(())
    }
}

/// Accessors shared by every component facade.
pub trait Component {
    fn base(&self) -> &ComponentBase;

    fn handle(&self) -> &ForeignHandle {
        self.base().handle()
    }

    fn kind(&self) -> ComponentKind {
        self.base().kind()
    }

    fn type_tag(&self) -> &'static str {
        self.kind().type_tag()
    }

    fn id(&self) -> Result<String, SapError> {
        self.base().id()
    }

    fn name(&self) -> Result<String, SapError> {
        self.base().name()
    }

    fn text(&self) -> Result<String, SapError> {
        self.base().optional_text()
    }

    fn set_text(&self, text: &str) -> Result<(), SapError> {
        self.base().set_optional_text(text)
    }

    fn set_focus(&self) -> Result<(), SapError> {
        self.base().set_focus()
    }
}

/// A facade of whichever variant the runtime tag selected.
#[derive(Debug, Clone)]
pub enum SapComponent {
    Window(Window),
    TextField(TextField),
    Button(Button),
    CheckBox(CheckBox),
    GridView(GridView),
    StatusBar(StatusBar),
}

impl SapComponent {
    /// Builds the variant `kind` maps to.
    pub fn from_kind(handle: ForeignHandle, kind: ComponentKind) -> Result<Self, SapError> {
        Ok(match kind {
            ComponentKind::MainWindow | ComponentKind::ModalWindow | ComponentKind::DialogShell => {
                SapComponent::Window(Window::with_kind(handle, kind)?)
            }
            ComponentKind::TextField | ComponentKind::CTextField | ComponentKind::PasswordField => {
                SapComponent::TextField(TextField::with_kind(handle, kind)?)
            }
            ComponentKind::StatusBar => SapComponent::StatusBar(StatusBar::with_kind(handle, kind)?),
            ComponentKind::Button => SapComponent::Button(Button::with_kind(handle, kind)?),
            ComponentKind::GridView => SapComponent::GridView(GridView::with_kind(handle, kind)?),
            ComponentKind::CheckBox => SapComponent::CheckBox(CheckBox::with_kind(handle, kind)?),
        })
    }

    fn as_component(&self) -> &dyn Component {
        match self {
            SapComponent::Window(c) => c,
            SapComponent::TextField(c) => c,
            SapComponent::Button(c) => c,
            SapComponent::CheckBox(c) => c,
            SapComponent::GridView(c) => c,
            SapComponent::StatusBar(c) => c,
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            SapComponent::Window(_) => Window::VARIANT,
            SapComponent::TextField(_) => TextField::VARIANT,
            SapComponent::Button(_) => Button::VARIANT,
            SapComponent::CheckBox(_) => CheckBox::VARIANT,
            SapComponent::GridView(_) => GridView::VARIANT,
            SapComponent::StatusBar(_) => StatusBar::VARIANT,
        }
    }
}

impl Component for SapComponent {
    fn base(&self) -> &ComponentBase {
        self.as_component().base()
    }

    fn text(&self) -> Result<String, SapError> {
        self.as_component().text()
    }

    fn set_text(&self, text: &str) -> Result<(), SapError> {
        self.as_component().set_text(text)
    }
}

/// A facade type that can be narrowed out of a [`SapComponent`].
pub trait TypedComponent: Component + Sized {
    /// Name used in diagnostics.
    const VARIANT: &'static str;

    /// Returns the component unchanged when it is a different variant.
    fn from_component(component: SapComponent) -> Result<Self, SapComponent>;
}

impl TypedComponent for SapComponent {
    const VARIANT: &'static str = "Component";

    fn from_component(component: SapComponent) -> Result<Self, SapComponent> {
        Ok(component)
    }
}

macro_rules! typed_variant {
    ($ty:ident, $variant:ident, $label:literal) => {
        impl TypedComponent for $ty {
            const VARIANT: &'static str = $label;

            fn from_component(component: SapComponent) -> Result<Self, SapComponent> {
                match component {
                    SapComponent::$variant(inner) => Ok(inner),
                    other => Err(other),
                }
            }
        }

        impl From<$ty> for SapComponent {
            fn from(value: $ty) -> Self {
                SapComponent::$variant(value)
            }
        }
    };
}

typed_variant!(Window, Window, "Window");
typed_variant!(TextField, TextField, "TextField");
typed_variant!(Button, Button, "Button");
typed_variant!(CheckBox, CheckBox, "CheckBox");
typed_variant!(GridView, GridView, "GridView");
typed_variant!(StatusBar, StatusBar, "StatusBar");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::memory::MemoryHost;

    #[test]
    fn maps_every_known_tag() {
        for kind in ComponentKind::ALL {
            assert_eq!(ComponentKind::from_type_tag(kind.type_tag()), Some(kind));
        }
        assert_eq!(ComponentKind::from_type_tag("GuiLabel"), None);
    }

    #[test]
    fn declares_uses_static_table() {
        assert_eq!(ComponentKind::Button.declares("Press"), Some(true));
        assert_eq!(ComponentKind::TextField.declares("Press"), Some(false));
        assert_eq!(ComponentKind::Button.declares("Text"), None);
        assert_eq!(ComponentKind::MainWindow.declares("Text"), Some(true));
        assert_eq!(ComponentKind::CheckBox.declares("Tooltip"), None);
    }

    #[test]
    fn optional_text_and_focus_degrade_quietly() {
        let host = MemoryHost::new();
        let session = host.add_session();
        let node = host.add_component(session, "wnd[0]/tbar[1]/btn[8]", "GuiButton");
        host.remove_property(node, "Text");
        host.remove_method(node, "SetFocus");

        let button = Button::new(host.handle(node)).unwrap();
        assert_eq!(button.text().unwrap(), "");
        button.set_text("ignored").unwrap();
        button.set_focus().unwrap();
        assert!(host.calls(node).is_empty());
        assert!(host.writes(node).is_empty());
    }

    #[test]
    fn focus_is_invoked_when_available() {
        let host = MemoryHost::new();
        let session = host.add_session();
        let node = host.add_component(session, "wnd[0]/usr/txtF", "GuiTextField");

        let field = TextField::new(host.handle(node)).unwrap();
        field.set_focus().unwrap();
        assert_eq!(host.calls_named(node, "SetFocus").len(), 1);
    }

    #[test]
    fn narrowing_returns_other_variants_unchanged() {
        let host = MemoryHost::new();
        let session = host.add_session();
        let node = host.add_component(session, "wnd[0]/tbar[1]/btn[8]", "GuiButton");

        let component = SapComponent::from_kind(host.handle(node), ComponentKind::Button).unwrap();
        let back = match TextField::from_component(component) {
            Ok(_) => panic!("a button must not narrow to a text field"),
            Err(original) => original,
        };
        assert_eq!(back.variant_name(), "Button");
        assert!(Button::from_component(back).is_ok());
    }
}
