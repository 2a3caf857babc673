//! The widget trait and state shared by every widget.
//!
//! Each wrapper owns exactly one backend widget. [`WidgetBase`] holds the
//! parts common to all of them: the name the widget is addressed by in a
//! container, its label, its annotation, and the parameter kind used when a
//! signature is synthesized from a container's children.

use std::any::Any;
use std::sync::{Arc, Weak};

use horizon_autogui_core::{ConnectionId, Signal, TypeSpec};
use parking_lot::Mutex;

use crate::backend::Backend;
use crate::container::Container;
use crate::options::WidgetOptions;
use crate::protocols::{BackendWidget, NativeId, WidgetProtocol};
use crate::signature::ParameterKind;
use crate::widget::{ButtonWidget, CategoricalWidget, RangedWidget, ValueAccess};

/// Everything a wrapper needs to construct itself around a backend widget.
#[derive(Clone)]
pub struct WidgetInit {
    pub name: String,
    /// Class name reported by [`Widget::widget_type`].
    pub class_name: String,
    pub annotation: Option<TypeSpec>,
    pub param_kind: ParameterKind,
    pub gui_only: bool,
    pub options: WidgetOptions,
    pub backend: Arc<dyn Backend>,
    pub native: BackendWidget,
}

/// State common to all widgets.
pub struct WidgetBase {
    name: String,
    class_name: String,
    label: Mutex<Option<String>>,
    annotation: Mutex<Option<TypeSpec>>,
    param_kind: Mutex<ParameterKind>,
    gui_only: bool,
    options: WidgetOptions,
    backend: Arc<dyn Backend>,
    native: Arc<dyn WidgetProtocol>,
    parent: Mutex<Option<Weak<Container>>>,
    /// Native label shown alongside this widget in a container, if any.
    label_native: Mutex<Option<Arc<dyn WidgetProtocol>>>,

    /// Emitted after the widget moved to another container (or none).
    pub parent_changed: Signal<()>,
    /// Emitted with the new label.
    pub label_changed: Signal<String>,
}

impl WidgetBase {
    /// Wrap a backend widget, applying the common options.
    pub fn new(init: &WidgetInit) -> Self {
        let native = init.native.widget();
        let options = &init.options;
        if let Some(tooltip) = &options.tooltip {
            native.set_tooltip(Some(tooltip.clone()));
        }
        if let Some(enabled) = options.enabled {
            native.set_enabled(enabled);
        }
        if let Some(visible) = options.visible {
            native.set_visible(visible);
        }
        Self {
            name: init.name.clone(),
            class_name: init.class_name.clone(),
            label: Mutex::new(options.label.clone()),
            annotation: Mutex::new(init.annotation.clone()),
            param_kind: Mutex::new(init.param_kind),
            gui_only: init.gui_only,
            options: options.clone(),
            backend: init.backend.clone(),
            native,
            parent: Mutex::new(None),
            label_native: Mutex::new(None),
            parent_changed: Signal::new(),
            label_changed: Signal::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The explicit label, or the name with underscores as spaces.
    pub fn label(&self) -> String {
        self.label
            .lock()
            .clone()
            .unwrap_or_else(|| self.name.replace('_', " "))
    }

    pub fn set_label(&self, label: impl Into<String>) {
        let label = label.into();
        *self.label.lock() = Some(label.clone());
        self.label_changed.emit(label);
    }

    pub fn annotation(&self) -> Option<TypeSpec> {
        self.annotation.lock().clone()
    }

    pub fn set_annotation(&self, annotation: Option<TypeSpec>) {
        *self.annotation.lock() = annotation;
    }

    pub fn param_kind(&self) -> ParameterKind {
        *self.param_kind.lock()
    }

    pub fn set_param_kind(&self, kind: ParameterKind) {
        *self.param_kind.lock() = kind;
    }

    pub fn gui_only(&self) -> bool {
        self.gui_only
    }

    /// Options the widget was constructed with.
    pub fn options(&self) -> &WidgetOptions {
        &self.options
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn native(&self) -> &Arc<dyn WidgetProtocol> {
        &self.native
    }

    pub fn native_id(&self) -> NativeId {
        self.native.native_id()
    }

    pub fn visible(&self) -> bool {
        self.native.visible()
    }

    /// Show or hide the widget and its label.
    pub fn set_visible(&self, visible: bool) {
        self.native.set_visible(visible);
        if let Some(label) = self.label_native.lock().as_ref() {
            label.set_visible(visible);
        }
    }

    pub(crate) fn set_label_native(&self, label: Option<Arc<dyn WidgetProtocol>>) {
        *self.label_native.lock() = label;
    }

    pub fn enabled(&self) -> bool {
        self.native.enabled()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.native.set_enabled(enabled);
    }

    pub fn tooltip(&self) -> Option<String> {
        self.native.tooltip().filter(|t| !t.is_empty())
    }

    pub fn set_tooltip(&self, tooltip: Option<String>) {
        self.native.set_tooltip(tooltip);
    }

    pub fn parent(&self) -> Option<Arc<Container>> {
        self.parent.lock().as_ref().and_then(Weak::upgrade)
    }

    /// Record the owning container and notify listeners.
    pub fn set_parent(&self, parent: Option<&Arc<Container>>) {
        *self.parent.lock() = parent.map(Arc::downgrade);
        self.native
            .set_parent(parent.map(|p| p.widget_base().native_id()));
        self.parent_changed.emit(());
    }

    pub fn close(&self) {
        self.native.close();
    }
}

/// A widget of any kind.
///
/// Only [`widget_base`](Self::widget_base) and [`as_any`](Self::as_any) must
/// be implemented; the accessors below delegate to the base. Wrappers with
/// richer capabilities advertise them through the `as_*` methods.
pub trait Widget: Send + Sync + 'static {
    fn widget_base(&self) -> &WidgetBase;

    fn as_any(&self) -> &dyn Any;

    /// The value interface, if this widget holds a value.
    fn as_value(&self) -> Option<&dyn ValueAccess> {
        None
    }

    fn as_ranged(&self) -> Option<&RangedWidget> {
        None
    }

    fn as_categorical(&self) -> Option<&CategoricalWidget> {
        None
    }

    fn as_button(&self) -> Option<&ButtonWidget> {
        None
    }

    fn as_container(&self) -> Option<&Container> {
        None
    }

    /// Re-evaluate dynamic choices, recursively for containers.
    fn reset_choices(&self) {}

    /// Options reflecting the widget's current state.
    fn options(&self) -> WidgetOptions {
        let base = self.widget_base();
        let mut options = base.options().clone();
        options.visible = Some(base.visible());
        options.enabled = Some(base.enabled());
        options
    }

    /// Connect `slot` to whatever signal reports a change of this widget.
    fn connect_changed(&self, slot: Arc<dyn Fn() + Send + Sync>) -> Option<ConnectionId> {
        let value = self.as_value()?;
        Some(value.changed().connect(move |_| slot()))
    }

    fn disconnect_changed(&self, id: ConnectionId) {
        if let Some(value) = self.as_value() {
            value.changed().disconnect(id);
        }
    }

    /// The annotation, with `Optional` unwrapped for nullable widgets.
    fn annotation(&self) -> Option<TypeSpec> {
        self.widget_base().annotation()
    }

    fn name(&self) -> &str {
        self.widget_base().name()
    }

    fn label(&self) -> String {
        self.widget_base().label()
    }

    fn set_label(&self, label: &str) {
        self.widget_base().set_label(label);
    }

    fn widget_type(&self) -> &str {
        self.widget_base().class_name()
    }

    fn gui_only(&self) -> bool {
        self.widget_base().gui_only()
    }

    fn param_kind(&self) -> ParameterKind {
        self.widget_base().param_kind()
    }

    fn visible(&self) -> bool {
        self.widget_base().visible()
    }

    fn set_visible(&self, visible: bool) {
        self.widget_base().set_visible(visible);
    }

    fn enabled(&self) -> bool {
        self.widget_base().enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        self.widget_base().set_enabled(enabled);
    }

    fn tooltip(&self) -> Option<String> {
        self.widget_base().tooltip()
    }

    fn set_tooltip(&self, tooltip: Option<String>) {
        self.widget_base().set_tooltip(tooltip);
    }

    fn native(&self) -> &Arc<dyn WidgetProtocol> {
        self.widget_base().native()
    }

    fn parent(&self) -> Option<Arc<Container>> {
        self.widget_base().parent()
    }

    fn close(&self) {
        self.widget_base().close();
    }
}

/// A widget with nothing beyond the base protocol.
pub struct PlainWidget {
    base: WidgetBase,
}

impl PlainWidget {
    pub fn new(init: &WidgetInit) -> Self {
        Self {
            base: WidgetBase::new(init),
        }
    }
}

impl Widget for PlainWidget {
    fn widget_base(&self) -> &WidgetBase {
        &self.base
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for dyn Widget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(self.widget_type())
            .field("name", &self.name())
            .field("annotation", &self.annotation())
            .finish()
    }
}

static_assertions::assert_obj_safe!(Widget);
