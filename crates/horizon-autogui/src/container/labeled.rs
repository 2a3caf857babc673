//! A widget paired with a text label.

use std::sync::Arc;

use horizon_autogui_core::{ConnectionId, Value};

use crate::backend::Backend;
use crate::error::WidgetError;
use crate::options::{Orientation, WidgetOptions};
use crate::protocols::{
    BackendWidget, ContainerProtocol, Protocol, ValueWidgetProtocol, WidgetProtocol,
};
use crate::widget::{Widget, WidgetKind};

/// A horizontal pair of a `Label` and the widget it names.
///
/// The label text follows the widget's label and its visibility follows the
/// widget's. Dropping the pair does not detach anything; call
/// [`release`](Self::release) first.
pub(crate) struct LabeledWidget {
    native: Arc<dyn ContainerProtocol>,
    native_widget: Arc<dyn WidgetProtocol>,
    label: Arc<dyn WidgetProtocol>,
    inner: Arc<dyn Widget>,
    label_changed: ConnectionId,
}

impl LabeledWidget {
    pub(crate) fn new(backend: &dyn Backend, inner: Arc<dyn Widget>) -> Result<Self, WidgetError> {
        let pair = backend.create(
            WidgetKind::Container.name(),
            &WidgetOptions::new().with_orientation(Orientation::Horizontal),
        )?;
        let native_widget = pair.widget();
        let BackendWidget::Container(native) = pair else {
            return Err(WidgetError::MissingProtocol {
                class: WidgetKind::Container.name().to_string(),
                protocol: Protocol::Container.name(),
                missing: vec!["layout", "insert_widget", "remove_widget", "children"],
            });
        };

        let label_native = backend.create(WidgetKind::Label.name(), &WidgetOptions::new())?;
        let label = label_native.widget();
        let text: Arc<dyn ValueWidgetProtocol> =
            label_native
                .value_widget()
                .ok_or_else(|| WidgetError::MissingProtocol {
                    class: WidgetKind::Label.name().to_string(),
                    protocol: Protocol::ValueWidget.name(),
                    missing: vec!["value", "set_value", "bind_change_callback"],
                })?;
        text.set_value(Value::Str(inner.label()));
        label.set_tooltip(inner.tooltip());

        native.insert_widget(0, label.as_ref());
        native.insert_widget(1, inner.native().as_ref());
        if !inner.visible() {
            label.set_visible(false);
        }
        inner.widget_base().set_label_native(Some(label.clone()));
        let label_changed = inner
            .widget_base()
            .label_changed
            .connect(move |new: &String| text.set_value(Value::Str(new.clone())));

        Ok(Self {
            native,
            native_widget,
            label,
            inner,
            label_changed,
        })
    }

    /// The pair's native widget, as inserted into the parent layout.
    pub(crate) fn native(&self) -> &Arc<dyn WidgetProtocol> {
        &self.native_widget
    }

    pub(crate) fn label_width(&self) -> u32 {
        self.label.min_width()
    }

    pub(crate) fn set_label_width(&self, width: u32) {
        self.label.set_min_width(width);
    }

    /// Take the inner widget back out of the pair and close the pair.
    pub(crate) fn release(&self) {
        let base = self.inner.widget_base();
        base.label_changed.disconnect(self.label_changed);
        base.set_label_native(None);
        self.native.remove_widget(self.inner.native().as_ref());
        self.native.remove_widget(self.label.as_ref());
        self.label.close();
        self.native_widget.close();
    }
}
