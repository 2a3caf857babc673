//! Ordered, name-addressable collections of widgets.
//!
//! A [`Container`] owns a list of child widgets and lays their natives out
//! in a backend container. Children are reached by index or by name, and the
//! container synthesizes a [`Signature`] from them on every call to
//! [`signature`](Container::signature).
//!
//! With labels enabled, every child except buttons is shown next to a label;
//! in a vertical layout all labels share the width of the widest one.
//!
//! # Example
//!
//! ```
//! use horizon_autogui::{Container, ContainerConfig, TypeSpec, WidgetRequest, create_widget};
//!
//! let a = WidgetRequest::new().with_name("a").with_value(1).with_annotation(TypeSpec::Int);
//! let b = WidgetRequest::new().with_name("b").with_value("x").with_annotation(TypeSpec::Str);
//! let a = create_widget(&a).unwrap();
//! let b = create_widget(&b).unwrap();
//! let container = Container::new(ContainerConfig::default(), [a, b]).unwrap();
//!
//! assert_eq!(container.signature().unwrap().to_string(), "(a: int = 1, b: str = 'x')");
//! container.remove("a").unwrap();
//! assert!(container.try_get("a").is_none());
//! ```

mod labeled;

use std::any::Any;
use std::fmt;
use std::ops::RangeBounds;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use horizon_autogui_core::logging::targets;
use horizon_autogui_core::{ConnectionId, Signal, Value};
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::backend::{Backend, default_backend};
use crate::error::{ContainerError, WidgetError};
use crate::options::{Orientation, WidgetOptions};
use crate::protocols::{BackendWidget, ContainerProtocol, Layout, Protocol, WidgetProtocol};
use crate::signature::{Parameter, ParameterKind, Signature};
use crate::widget::{Widget, WidgetBase, WidgetInit, WidgetKind};

pub(crate) use labeled::LabeledWidget;

/// How a container is built.
#[derive(Clone)]
pub struct ContainerConfig {
    pub name: String,
    pub layout: Layout,
    /// Show a label next to each child.
    pub labels: bool,
    pub scrollable: bool,
    /// Label, tooltip, visibility and the like for the container itself.
    pub options: WidgetOptions,
    /// Backend for the container's native; the default backend if unset.
    pub backend: Option<Arc<dyn Backend>>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            layout: Layout::Vertical,
            labels: true,
            scrollable: false,
            options: WidgetOptions::new(),
            backend: None,
        }
    }
}

impl ContainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config for a container built through widget resolution.
    ///
    /// `labels` and `scrollable` are read from the extra options.
    pub fn from_options(options: &WidgetOptions) -> Self {
        let flag = |key: &str| options.extra.get(key).and_then(Value::as_bool);
        Self {
            layout: match options.orientation {
                Some(Orientation::Horizontal) => Layout::Horizontal,
                _ => Layout::Vertical,
            },
            labels: flag("labels").unwrap_or(true),
            scrollable: flag("scrollable").unwrap_or(false),
            options: options.clone(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_labels(mut self, labels: bool) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_scrollable(mut self, scrollable: bool) -> Self {
        self.scrollable = scrollable;
        self
    }

    pub fn with_options(mut self, options: WidgetOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }
}

impl fmt::Debug for ContainerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerConfig")
            .field("name", &self.name)
            .field("layout", &self.layout)
            .field("labels", &self.labels)
            .field("scrollable", &self.scrollable)
            .finish_non_exhaustive()
    }
}

struct Child {
    widget: Arc<dyn Widget>,
    labeled: Option<LabeledWidget>,
    changed: Option<ConnectionId>,
    label_changed: Option<ConnectionId>,
}

impl Child {
    fn native(&self) -> Arc<dyn WidgetProtocol> {
        match &self.labeled {
            Some(labeled) => labeled.native().clone(),
            None => self.widget.native().clone(),
        }
    }
}

/// A widget holding other widgets.
pub struct Container {
    base: WidgetBase,
    native: Arc<dyn ContainerProtocol>,
    layout: Layout,
    labels: AtomicBool,
    scrollable: bool,
    children: RwLock<Vec<Child>>,
    changed: Arc<Signal<()>>,
    this: Weak<Container>,
}

impl Container {
    /// Build a container holding `widgets`, in order.
    pub fn new(
        config: ContainerConfig,
        widgets: impl IntoIterator<Item = Arc<dyn Widget>>,
    ) -> Result<Arc<Self>, ContainerError> {
        let backend = config.backend.clone().unwrap_or_else(default_backend);
        let mut options = config.options.clone();
        options.orientation = Some(match config.layout {
            Layout::Horizontal => Orientation::Horizontal,
            Layout::Vertical => Orientation::Vertical,
        });
        let native = backend.create(WidgetKind::Container.name(), &options)?;
        let init = WidgetInit {
            name: config.name.clone(),
            class_name: WidgetKind::Container.name().to_string(),
            annotation: None,
            param_kind: ParameterKind::default(),
            gui_only: false,
            options,
            backend,
            native,
        };
        Self::from_init(&init, config, widgets)
    }

    /// Build a container around an already created backend container.
    pub(crate) fn from_init(
        init: &WidgetInit,
        config: ContainerConfig,
        widgets: impl IntoIterator<Item = Arc<dyn Widget>>,
    ) -> Result<Arc<Self>, ContainerError> {
        let BackendWidget::Container(native) = &init.native else {
            return Err(WidgetError::MissingProtocol {
                class: init.class_name.clone(),
                protocol: Protocol::Container.name(),
                missing: vec!["layout", "insert_widget", "remove_widget", "children"],
            }
            .into());
        };
        let native = Arc::clone(native);
        let container = Arc::new_cyclic(|this| Self {
            base: WidgetBase::new(init),
            layout: native.layout(),
            native,
            labels: AtomicBool::new(config.labels),
            scrollable: config.scrollable,
            children: RwLock::new(Vec::new()),
            changed: Arc::new(Signal::new()),
            this: this.clone(),
        });
        for widget in widgets {
            container.append(widget)?;
        }
        tracing::debug!(
            target: targets::CONTAINER,
            name = container.base.name(),
            children = container.len(),
            "created container"
        );
        Ok(container)
    }

    /// Emitted whenever any child changes.
    pub fn changed(&self) -> &Arc<Signal<()>> {
        &self.changed
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Layout is fixed once the container exists; only the current layout
    /// is accepted.
    pub fn set_layout(&self, layout: Layout) -> Result<(), ContainerError> {
        if layout == self.layout {
            return Ok(());
        }
        Err(ContainerError::LayoutImmutable)
    }

    pub fn labels(&self) -> bool {
        self.labels.load(Ordering::SeqCst)
    }

    /// Turn labels on or off, re-inserting every child.
    pub fn set_labels(&self, labels: bool) -> Result<(), ContainerError> {
        if self.labels.swap(labels, Ordering::SeqCst) == labels {
            return Ok(());
        }
        let widgets = self.widgets();
        while !self.is_empty() {
            self.remove_at(self.len() - 1)?;
        }
        for widget in widgets {
            self.append(widget)?;
        }
        Ok(())
    }

    pub fn scrollable(&self) -> bool {
        self.scrollable
    }

    pub fn len(&self) -> usize {
        self.children.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert `widget` before `index`; indices past the end append.
    ///
    /// A widget already held by a container, this one included, is removed
    /// from it first.
    pub fn insert(&self, index: usize, widget: Arc<dyn Widget>) -> Result<(), ContainerError> {
        if let Some(parent) = widget.parent() {
            if let Some(position) = parent.position_of(&widget) {
                parent.remove_at(position)?;
                tracing::trace!(
                    target: targets::CONTAINER,
                    from = parent.base.name(),
                    child = widget.name(),
                    "detached widget from previous container"
                );
            }
        }
        if let Some(this) = self.this.upgrade() {
            widget.widget_base().set_parent(Some(&this));
        }

        let labeled = if self.labels() && widget.as_button().is_none() {
            Some(LabeledWidget::new(self.base.backend().as_ref(), widget.clone())?)
        } else {
            None
        };

        let weak = self.this.clone();
        let changed = widget.connect_changed(Arc::new(move || {
            if let Some(container) = weak.upgrade() {
                container.changed.emit(());
            }
        }));
        let label_changed = labeled.as_ref().map(|_| {
            let weak = self.this.clone();
            widget.widget_base().label_changed.connect(move |_| {
                if let Some(container) = weak.upgrade() {
                    container.unify_label_widths();
                }
            })
        });

        let child = Child {
            widget: widget.clone(),
            labeled,
            changed,
            label_changed,
        };
        let native = child.native();
        let index = {
            let mut children = self.children.write();
            let index = index.min(children.len());
            children.insert(index, child);
            index
        };
        self.native.insert_widget(index, native.as_ref());
        tracing::trace!(
            target: targets::CONTAINER,
            container = self.base.name(),
            child = widget.name(),
            index,
            "inserted widget"
        );
        self.unify_label_widths();
        Ok(())
    }

    pub fn append(&self, widget: Arc<dyn Widget>) -> Result<(), ContainerError> {
        self.insert(usize::MAX, widget)
    }

    /// Remove and return the child at `index`.
    pub fn remove_at(&self, index: usize) -> Result<Arc<dyn Widget>, ContainerError> {
        let child = {
            let mut children = self.children.write();
            let len = children.len();
            if index >= len {
                return Err(ContainerError::IndexOutOfRange { index, len });
            }
            children.remove(index)
        };
        self.native.remove_widget(child.native().as_ref());
        if let Some(labeled) = &child.labeled {
            labeled.release();
        }
        if let Some(id) = child.changed {
            child.widget.disconnect_changed(id);
        }
        if let Some(id) = child.label_changed {
            child.widget.widget_base().label_changed.disconnect(id);
        }
        child.widget.widget_base().set_parent(None);
        tracing::trace!(
            target: targets::CONTAINER,
            container = self.base.name(),
            child = child.widget.name(),
            "removed widget"
        );
        self.unify_label_widths();
        Ok(child.widget)
    }

    /// Remove and return the child named `name`.
    pub fn remove(&self, name: &str) -> Result<Arc<dyn Widget>, ContainerError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| ContainerError::NoWidget(name.to_string()))?;
        self.remove_at(index)
    }

    /// Remove every child.
    pub fn clear(&self) {
        while let Some(last) = self.len().checked_sub(1) {
            if self.remove_at(last).is_err() {
                break;
            }
        }
    }

    /// Index of `widget` itself, compared by identity.
    pub fn position_of(&self, widget: &Arc<dyn Widget>) -> Option<usize> {
        self.children
            .read()
            .iter()
            .position(|c| Arc::ptr_eq(&c.widget, widget))
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.children
            .read()
            .iter()
            .position(|c| c.widget.name() == name)
    }

    /// The first child named `name`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Widget>, ContainerError> {
        self.try_get(name)
            .ok_or_else(|| ContainerError::NoWidget(name.to_string()))
    }

    pub fn try_get(&self, name: &str) -> Option<Arc<dyn Widget>> {
        self.children
            .read()
            .iter()
            .find(|c| c.widget.name() == name)
            .map(|c| c.widget.clone())
    }

    pub fn at(&self, index: usize) -> Result<Arc<dyn Widget>, ContainerError> {
        let children = self.children.read();
        children
            .get(index)
            .map(|c| c.widget.clone())
            .ok_or(ContainerError::IndexOutOfRange {
                index,
                len: children.len(),
            })
    }

    /// Children in `range`, clipped to the container's length.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Vec<Arc<dyn Widget>> {
        let children = self.children.read();
        let len = children.len();
        let start = match range.start_bound() {
            std::ops::Bound::Included(&s) => s,
            std::ops::Bound::Excluded(&s) => s.saturating_add(1),
            std::ops::Bound::Unbounded => 0,
        }
        .min(len);
        let end = match range.end_bound() {
            std::ops::Bound::Included(&e) => e.saturating_add(1),
            std::ops::Bound::Excluded(&e) => e,
            std::ops::Bound::Unbounded => len,
        }
        .min(len);
        if start >= end {
            return Vec::new();
        }
        children[start..end].iter().map(|c| c.widget.clone()).collect()
    }

    pub fn widgets(&self) -> Vec<Arc<dyn Widget>> {
        self.children
            .read()
            .iter()
            .map(|c| c.widget.clone())
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.children
            .read()
            .iter()
            .map(|c| c.widget.name().to_string())
            .collect()
    }

    /// The signature of the current state: one parameter per named,
    /// non-gui-only child, defaulting to the child's value.
    ///
    /// If a parameter without a default follows one with a default, the
    /// parameters are stably re-sorted so every required one comes first.
    /// Fails if a child's value cannot be read.
    pub fn signature(&self) -> Result<Signature, WidgetError> {
        let mut params: Vec<Parameter> = self
            .widgets()
            .iter()
            .filter(|w| !w.name().is_empty() && !w.gui_only())
            .map(|w| Parameter::from_widget(w.as_ref()))
            .collect::<Result<_, _>>()?;
        let mut seen_default = false;
        let misordered = params.iter().any(|p| {
            seen_default |= p.default.is_some();
            seen_default && p.default.is_none()
        });
        if misordered {
            params.sort_by_key(|p| p.default.is_some());
        }
        Ok(Signature::new(params))
    }

    /// Current values by name, `None` for widgets without one.
    ///
    /// Fails on the first value that cannot be read.
    pub fn asdict(&self) -> Result<IndexMap<String, Value>, WidgetError> {
        self.widgets()
            .iter()
            .filter(|w| !w.name().is_empty() && !w.gui_only())
            .map(|w| {
                let value = match w.as_value() {
                    Some(v) => v.value()?,
                    None => Value::None,
                };
                Ok((w.name().to_string(), value))
            })
            .collect()
    }

    /// Set values by name, emitting `changed` once at the end.
    ///
    /// Names without a value widget are skipped.
    pub fn update<K, I>(&self, values: I) -> Result<(), ContainerError>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Value)>,
    {
        {
            let _blocked = self.changed.blocked();
            for (name, value) in values {
                let name = name.as_ref();
                match self.try_get(name) {
                    Some(widget) => {
                        if let Some(target) = widget.as_value() {
                            target.set_value(value)?;
                        }
                    }
                    None => {
                        tracing::debug!(target: targets::CONTAINER, name, "update skipped unknown name");
                    }
                }
            }
        }
        self.changed.emit(());
        Ok(())
    }

    /// Width shared by the labels, if any child is labelled.
    pub fn label_width(&self) -> Option<u32> {
        self.children
            .read()
            .iter()
            .find_map(|c| c.labeled.as_ref().map(LabeledWidget::label_width))
    }

    fn unify_label_widths(&self) {
        if self.layout != Layout::Vertical || !self.labels() {
            return;
        }
        let labels: Vec<String> = self
            .widgets()
            .iter()
            .filter(|w| w.as_button().is_none())
            .map(|w| w.label())
            .collect();
        let backend = self.base.backend();
        let Some(widest) = labels.iter().map(|l| backend.text_width(l)).max() else {
            return;
        };
        for child in self.children.read().iter() {
            if let Some(labeled) = &child.labeled {
                labeled.set_label_width(widest);
            }
        }
    }
}

impl Widget for Container {
    fn widget_base(&self) -> &WidgetBase {
        &self.base
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_container(&self) -> Option<&Container> {
        Some(self)
    }

    fn reset_choices(&self) {
        for widget in self.widgets() {
            widget.reset_choices();
        }
    }

    fn connect_changed(&self, slot: Arc<dyn Fn() + Send + Sync>) -> Option<ConnectionId> {
        Some(self.changed.connect(move |_| slot()))
    }

    fn disconnect_changed(&self, id: ConnectionId) {
        self.changed.disconnect(id);
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.signature() {
            Ok(signature) => write!(f, "<Container {signature}>"),
            Err(err) => write!(f, "<Container ({err})>"),
        }
    }
}

static_assertions::assert_impl_all!(Container: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use horizon_autogui_core::TypeSpec;

    use super::*;
    use crate::widget::{WidgetRequest, create_widget};

    fn widget(name: &str, value: impl Into<Value>) -> Arc<dyn Widget> {
        create_widget(&WidgetRequest::new().with_name(name).with_value(value)).unwrap()
    }

    #[test]
    fn test_lookup_by_name_and_index() {
        let c = Container::new(ContainerConfig::new(), [widget("a", 1), widget("b", "x")]).unwrap();
        assert_eq!(c.len(), 2);
        assert_eq!(c.get("b").unwrap().name(), "b");
        assert_eq!(c.at(0).unwrap().name(), "a");
        assert_eq!(c.index_of("b"), Some(1));
        assert!(matches!(c.get("z"), Err(ContainerError::NoWidget(_))));
        assert!(matches!(
            c.at(5),
            Err(ContainerError::IndexOutOfRange { index: 5, len: 2 })
        ));
        assert_eq!(c.slice(1..).len(), 1);
        assert!(c.slice(3..9).is_empty());
    }

    #[test]
    fn test_children_know_their_parent() {
        let a = widget("a", 1);
        let c = Container::new(ContainerConfig::new(), [a.clone()]).unwrap();
        assert!(a.parent().is_some_and(|p| Arc::ptr_eq(&p, &c)));
        c.remove("a").unwrap();
        assert!(a.parent().is_none());
        assert_eq!(c.native.children().len(), 0);
    }

    #[test]
    fn test_changed_propagates_from_children() {
        let a = widget("a", 1);
        let c = Container::new(ContainerConfig::new(), [a.clone()]).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        c.changed().connect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        a.as_value().unwrap().set_value(Value::Int(4)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        c.remove("a").unwrap();
        a.as_value().unwrap().set_value(Value::Int(5)).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_update_emits_once() {
        let c = Container::new(ContainerConfig::new(), [widget("a", 1), widget("b", 2)]).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        c.changed().connect(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        c.update([("a", Value::Int(10)), ("b", Value::Int(20)), ("zz", Value::Int(0))])
            .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(c.asdict().unwrap().get("b"), Some(&Value::Int(20)));
    }

    #[test]
    fn test_labels_share_widest_width() {
        let c = Container::new(
            ContainerConfig::new(),
            [widget("a", 1), widget("much_longer_name", 2)],
        )
        .unwrap();
        let backend = default_backend();
        assert_eq!(c.label_width(), Some(backend.text_width("much longer name")));

        c.set_labels(false).unwrap();
        assert_eq!(c.label_width(), None);
        assert_eq!(c.len(), 2);
        assert_eq!(c.names(), vec!["a", "much_longer_name"]);
    }

    #[test]
    fn test_buttons_are_not_labelled() {
        let c = Container::new(ContainerConfig::new(), [widget("flag", true)]).unwrap();
        assert_eq!(c.label_width(), None);
    }

    #[test]
    fn test_layout_is_fixed() {
        let c = Container::new(
            ContainerConfig::new().with_layout(Layout::Horizontal),
            Vec::new(),
        )
        .unwrap();
        assert_eq!(c.layout(), Layout::Horizontal);
        assert!(c.set_layout(Layout::Horizontal).is_ok());
        assert_eq!(c.set_layout(Layout::Vertical), Err(ContainerError::LayoutImmutable));
    }

    #[test]
    fn test_signature_resorts_required_first() {
        let required = create_widget(
            &WidgetRequest::new()
                .with_name("c")
                .with_annotation(TypeSpec::Int)
                .with_widget_type(WidgetKind::EmptyWidget),
        )
        .unwrap();
        let c = Container::new(ContainerConfig::new(), [widget("a", 1), widget("b", "x")]).unwrap();
        assert_eq!(c.signature().unwrap().names().collect::<Vec<_>>(), ["a", "b"]);
        c.append(required).unwrap();
        assert_eq!(c.signature().unwrap().names().collect::<Vec<_>>(), ["c", "a", "b"]);
    }
}
