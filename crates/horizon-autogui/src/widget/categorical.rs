//! Widgets selecting among choices.
//!
//! Choices come from a [`ChoicesSource`]. Sources backed by a provider are
//! re-evaluated by [`reset_choices`](CategoricalWidget::reset_choices), which
//! also runs whenever the widget moves to another container. Nullable widgets
//! carry an extra `"-----"` row standing for `None`.

use std::any::Any;
use std::sync::{Arc, Weak};

use horizon_autogui_core::logging::targets;
use horizon_autogui_core::{TypeSpec, Value};
use parking_lot::Mutex;

use crate::choices::{Choice, ChoicesSource, WidgetContext};
use crate::error::WidgetError;
use crate::options::WidgetOptions;
use crate::protocols::{BackendWidget, CategoricalWidgetProtocol, Protocol};
use crate::widget::{ValueAccess, ValueWidget, Widget, WidgetBase, WidgetInit, WidgetKind};

/// A value widget whose value is one of its choices (or several, for
/// multi-selection widgets).
pub struct CategoricalWidget {
    inner: ValueWidget,
    backend: Arc<dyn CategoricalWidgetProtocol>,
    source: Mutex<ChoicesSource>,
    allow_multiple: bool,
}

impl CategoricalWidget {
    /// Build the widget, populate its choices and select `value`.
    pub fn new(init: &WidgetInit, value: Option<Value>) -> Result<Arc<Self>, WidgetError> {
        let BackendWidget::Categorical(backend) = &init.native else {
            return Err(WidgetError::MissingProtocol {
                class: init.class_name.clone(),
                protocol: Protocol::CategoricalWidget.name(),
                missing: vec!["choices", "set_choices", "current_choice"],
            });
        };
        let backend = Arc::clone(backend);
        let inner = ValueWidget::new(init, None)?;
        let allow_multiple = init.options.allow_multiple.unwrap_or_else(|| {
            init.class_name
                .parse::<WidgetKind>()
                .is_ok_and(WidgetKind::is_multi)
        });
        let source = init
            .options
            .choices
            .clone()
            .unwrap_or(ChoicesSource::Static(Vec::new()));

        let widget = Arc::new(Self {
            inner,
            backend,
            source: Mutex::new(source),
            allow_multiple,
        });
        widget.reset_choices();

        let weak: Weak<Self> = Arc::downgrade(&widget);
        widget.inner.base().parent_changed.connect(move |_| {
            if let Some(widget) = weak.upgrade() {
                widget.reset_choices();
            }
        });

        match value {
            Some(v) if !v.is_none() || widget.inner.nullable() => widget.set_value(v)?,
            _ => {}
        }
        Ok(widget)
    }

    /// Data of every choice, with `None` last for nullable widgets.
    pub fn choices(&self) -> Vec<Value> {
        let mut data: Vec<Value> = self
            .backend
            .choices()
            .into_iter()
            .map(|c| c.data)
            .filter(|d| !(self.inner.nullable() && d.is_none()))
            .collect();
        if self.inner.nullable() {
            data.push(Value::None);
        }
        data
    }

    /// Replace the choices.
    ///
    /// A provider source becomes the new default, so later resets consult it.
    pub fn set_choices(&self, source: impl Into<ChoicesSource>) {
        let source = source.into();
        if source.is_provider() {
            *self.source.lock() = source.clone();
        }
        self.apply(&source);
    }

    /// Re-evaluate the default choices.
    pub fn reset_choices(&self) {
        let source = self.source.lock().clone();
        self.apply(&source);
    }

    fn apply(&self, source: &ChoicesSource) {
        let mut choices = source.resolve(&self.context());
        if self.inner.nullable() {
            choices.insert(0, Choice::null());
        }
        tracing::trace!(
            target: targets::WIDGET,
            name = self.inner.base().name(),
            count = choices.len(),
            "setting choices"
        );
        self.backend.set_choices(choices);
    }

    fn context(&self) -> WidgetContext {
        let base = self.inner.base();
        WidgetContext {
            name: base.name().to_string(),
            annotation: base.annotation(),
            nullable: self.inner.nullable(),
            value: self.inner.get_value().ok(),
            parent: base.parent().map(|p| p.widget_base().name().to_string()),
        }
    }

    /// The source choices are reset from.
    pub fn source(&self) -> ChoicesSource {
        self.source.lock().clone()
    }

    pub fn allow_multiple(&self) -> bool {
        self.allow_multiple
    }

    /// Label of the selected choice.
    pub fn current_choice(&self) -> Option<String> {
        self.backend.current_choice()
    }

    pub fn len(&self) -> usize {
        self.backend.count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_choice(&self, label: &str) -> Result<Value, WidgetError> {
        self.backend
            .get_choice(label)
            .ok_or_else(|| WidgetError::NoSuchChoice(label.to_string()))
    }

    /// Set the data for `label`, which defaults to the label itself.
    ///
    /// Replacing the data of the current choice emits `changed`.
    pub fn set_choice(&self, label: &str, data: Option<Value>) {
        let data = data.unwrap_or_else(|| Value::str(label));
        self.backend.set_choice(label, data);
        if self.current_choice().as_deref() == Some(label) {
            match self.inner.value() {
                Ok(value) => self.inner.changed().emit(value),
                Err(err) => tracing::debug!(target: targets::WIDGET, %err, "change not emitted"),
            }
        }
    }

    pub fn del_choice(&self, label: &str) {
        self.backend.del_choice(label);
    }

    fn invalid(&self, value: &Value) -> WidgetError {
        let choices = self
            .choices()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        WidgetError::InvalidChoice {
            value: value.to_string(),
            choices,
        }
    }
}

impl ValueAccess for CategoricalWidget {
    fn value_widget(&self) -> &ValueWidget {
        &self.inner
    }

    /// Select `value`, which must be a choice (every element must be, for
    /// multi-selection).
    fn set_value(&self, value: Value) -> Result<(), WidgetError> {
        let choices = self.choices();
        match value.as_items() {
            Some(items) if self.allow_multiple => {
                if items.iter().any(|v| !choices.contains(v)) {
                    return Err(self.invalid(&value));
                }
            }
            _ => {
                if !choices.contains(&value) {
                    return Err(self.invalid(&value));
                }
            }
        }
        self.inner.set_value(value)
    }
}

impl Widget for CategoricalWidget {
    fn widget_base(&self) -> &WidgetBase {
        self.inner.base()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_value(&self) -> Option<&dyn ValueAccess> {
        Some(self)
    }

    fn as_categorical(&self) -> Option<&CategoricalWidget> {
        Some(self)
    }

    fn reset_choices(&self) {
        CategoricalWidget::reset_choices(self);
    }

    fn options(&self) -> WidgetOptions {
        let mut options = self.inner.value_options();
        options.choices = Some(self.source());
        options.allow_multiple = Some(self.allow_multiple);
        options
    }

    fn annotation(&self) -> Option<TypeSpec> {
        self.inner.annotation()
    }
}

impl std::fmt::Debug for CategoricalWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(self.inner.base().class_name())
            .field("name", &self.inner.base().name())
            .field("value", &self.inner.get_value().ok())
            .field("choices", &self.choices())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::backend::{Backend, HeadlessBackend};
    use crate::signature::ParameterKind;

    fn categorical(class: &str, options: WidgetOptions, value: Option<Value>) -> Arc<CategoricalWidget> {
        let backend: Arc<dyn Backend> = Arc::new(HeadlessBackend::new());
        let native = backend.create(class, &options).unwrap();
        let init = WidgetInit {
            name: "c".into(),
            class_name: class.into(),
            annotation: None,
            param_kind: ParameterKind::PositionalOrKeyword,
            gui_only: false,
            options,
            backend,
            native,
        };
        CategoricalWidget::new(&init, value).unwrap()
    }

    #[test]
    fn test_selects_first_choice_by_default() {
        let w = categorical("ComboBox", WidgetOptions::new().with_choices(vec!["a", "b"]), None);
        assert_eq!(w.value().unwrap(), Value::str("a"));
        assert_eq!(w.current_choice().as_deref(), Some("a"));
        assert_eq!(w.len(), 2);
    }

    #[test]
    fn test_rejects_values_outside_choices() {
        let w = categorical(
            "ComboBox",
            WidgetOptions::new().with_choices(vec![1_i64, 2, 3]),
            Some(Value::Int(2)),
        );
        assert_eq!(w.value().unwrap(), Value::Int(2));
        let err = w.set_value(Value::Int(4)).unwrap_err();
        assert!(matches!(err, WidgetError::InvalidChoice { .. }));
        assert_eq!(w.value().unwrap(), Value::Int(2));
    }

    #[test]
    fn test_nullable_adds_null_row() {
        let w = categorical(
            "ComboBox",
            WidgetOptions::new()
                .with_choices(vec!["a", "b"])
                .with_nullable(true),
            Some(Value::None),
        );
        assert_eq!(
            w.choices(),
            vec![Value::str("a"), Value::str("b"), Value::None]
        );
        assert_eq!(w.value().unwrap(), Value::None);
        assert_eq!(w.current_choice().as_deref(), Some(crate::choices::NULL_LABEL));
    }

    #[test]
    fn test_provider_reevaluated_on_reset() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let source = ChoicesSource::from_fn(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst) as i64;
            (0..=n).map(Value::Int).collect()
        });
        let w = categorical("ComboBox", WidgetOptions::new().with_choices(source), None);
        assert_eq!(w.len(), 1);
        w.reset_choices();
        assert_eq!(w.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_multi_select_checks_every_element() {
        let w = categorical(
            "Select",
            WidgetOptions::new().with_choices(vec!["x", "y", "z"]),
            None,
        );
        w.set_value(Value::List(vec![Value::str("x"), Value::str("z")]))
            .unwrap();
        assert!(w
            .set_value(Value::List(vec![Value::str("x"), Value::str("q")]))
            .is_err());
        assert_eq!(
            w.value().unwrap(),
            Value::List(vec![Value::str("x"), Value::str("z")])
        );
    }

    #[test]
    fn test_set_choice_on_current_emits_changed() {
        let w = categorical("ComboBox", WidgetOptions::new().with_choices(vec!["a", "b"]), None);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        w.changed().connect(move |v| sink.lock().push(v.clone()));
        w.set_choice("a", Some(Value::Int(10)));
        assert_eq!(*seen.lock(), vec![Value::Int(10)]);
        w.set_choice("c", None);
        assert_eq!(w.get_choice("c").unwrap(), Value::str("c"));
        assert_eq!(seen.lock().len(), 1);
        w.del_choice("c");
        assert!(matches!(w.get_choice("c"), Err(WidgetError::NoSuchChoice(_))));
    }
}
