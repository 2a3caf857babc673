//! Buttons and check boxes.

use std::any::Any;
use std::sync::Arc;

use horizon_autogui_core::logging::targets;
use horizon_autogui_core::{Signal, TypeSpec, Value};

use crate::error::WidgetError;
use crate::options::WidgetOptions;
use crate::protocols::{BackendWidget, ButtonWidgetProtocol, Protocol};
use crate::widget::{ValueAccess, ValueWidget, Widget, WidgetBase, WidgetInit};

/// A clickable widget with a boolean value and its own text.
///
/// `text` and `label` are synonyms; without either the text is the name
/// with underscores as spaces.
pub struct ButtonWidget {
    inner: ValueWidget,
    backend: Arc<dyn ButtonWidgetProtocol>,
}

impl ButtonWidget {
    pub fn new(init: &WidgetInit, value: Option<Value>) -> Result<Self, WidgetError> {
        let BackendWidget::Button(backend) = &init.native else {
            return Err(WidgetError::MissingProtocol {
                class: init.class_name.clone(),
                protocol: Protocol::ButtonWidget.name(),
                missing: vec!["text", "set_text", "click"],
            });
        };
        let options = &init.options;
        if options.text.is_some() && options.label.is_some() {
            tracing::warn!(
                target: targets::WIDGET,
                name = %init.name,
                "'text' and 'label' are synonymous for button widgets; only provide one of the two"
            );
        }
        let text = options
            .text
            .clone()
            .or_else(|| options.label.clone())
            .unwrap_or_else(|| init.name.clone())
            .replace('_', " ");
        backend.set_text(&text);
        Ok(Self {
            inner: ValueWidget::new(init, value)?,
            backend: Arc::clone(backend),
        })
    }

    pub fn text(&self) -> String {
        self.backend.text()
    }

    pub fn set_text(&self, text: &str) {
        self.backend.set_text(text);
    }

    /// Press the button.
    pub fn click(&self) {
        self.backend.click();
    }

    /// Alias for `changed`.
    pub fn clicked(&self) -> &Arc<Signal<Value>> {
        self.inner.changed()
    }
}

impl ValueAccess for ButtonWidget {
    fn value_widget(&self) -> &ValueWidget {
        &self.inner
    }
}

impl Widget for ButtonWidget {
    fn widget_base(&self) -> &WidgetBase {
        self.inner.base()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_value(&self) -> Option<&dyn ValueAccess> {
        Some(self)
    }

    fn as_button(&self) -> Option<&ButtonWidget> {
        Some(self)
    }

    fn options(&self) -> WidgetOptions {
        let mut options = self.inner.value_options();
        options.text = Some(self.text());
        options
    }

    fn annotation(&self) -> Option<TypeSpec> {
        self.inner.annotation()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::backend::{Backend, HeadlessBackend};
    use crate::signature::ParameterKind;

    fn button(class: &str, name: &str, options: WidgetOptions) -> ButtonWidget {
        let backend: Arc<dyn Backend> = Arc::new(HeadlessBackend::new());
        let native = backend.create(class, &options).unwrap();
        let init = WidgetInit {
            name: name.into(),
            class_name: class.into(),
            annotation: None,
            param_kind: ParameterKind::PositionalOrKeyword,
            gui_only: false,
            options,
            backend,
            native,
        };
        ButtonWidget::new(&init, None).unwrap()
    }

    #[test]
    fn test_text_defaults_to_name() {
        let b = button("PushButton", "run_now", WidgetOptions::new());
        assert_eq!(b.text(), "run now");
        let b = button("PushButton", "x", WidgetOptions::new().with_label("Go"));
        assert_eq!(b.text(), "Go");
        let b = button("PushButton", "x", WidgetOptions::new().with_text("Start"));
        assert_eq!(b.text(), "Start");
    }

    #[test]
    fn test_checkbox_click_toggles() {
        let b = button("CheckBox", "flag", WidgetOptions::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        b.clicked().connect(move |v| sink.lock().push(v.clone()));
        b.click();
        b.click();
        assert_eq!(*seen.lock(), vec![Value::Bool(true), Value::Bool(false)]);
        assert_eq!(b.value().unwrap(), Value::Bool(false));
    }
}
