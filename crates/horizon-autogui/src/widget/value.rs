//! Widgets holding a value.
//!
//! A [`ValueWidget`] reads and writes its backend widget's value through a
//! [`ValueCodec`] that coerces assigned values to what the widget holds,
//! parses literal text for the fallback editor, and maps positions of
//! transformed sliders. A value or callback can be bound in place of the
//! live value; reading [`value`](ValueWidget::value) then returns the bound
//! result, while [`get_value`](ValueWidget::get_value) always reads the
//! backend.
//!
//! # Example
//!
//! ```
//! use horizon_autogui::{create_widget, BoundValue, Value, ValueAccess, WidgetRequest};
//!
//! let widget = create_widget(&WidgetRequest::new().with_value(1).with_name("x")).unwrap();
//! let value = widget.as_value().unwrap();
//! value.set_value(Value::Int(5)).unwrap();
//! assert_eq!(value.value().unwrap(), Value::Int(5));
//!
//! value.bind(BoundValue::callback(|w| Ok(Value::Int(w.get_value()?.as_int().unwrap_or(0) * 2))));
//! assert_eq!(value.value().unwrap(), Value::Int(10));
//! ```

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use horizon_autogui_core::logging::targets;
use horizon_autogui_core::{LiteralCodec, PythonLiteral, Signal, TypeSpec, Value};
use parking_lot::{Mutex, RwLock};

use crate::error::WidgetError;
use crate::options::{BoundValue, WidgetOptions};
use crate::protocols::ValueWidgetProtocol;
use crate::widget::ranged::TransformState;
use crate::widget::{ValueKind, Widget, WidgetBase, WidgetInit, WidgetKind};

/// Converts between the values callers see and what the backend stores.
#[derive(Clone)]
pub struct ValueCodec {
    kind: ValueKind,
    literal: Option<Arc<dyn LiteralCodec>>,
    transform: Option<Arc<RwLock<TransformState>>>,
}

impl ValueCodec {
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            literal: None,
            transform: None,
        }
    }

    /// Codec for a widget class, by name.
    pub fn for_class(class_name: &str) -> Self {
        let kind = class_name.parse::<WidgetKind>().ok();
        let mut codec = Self::new(kind.map_or(ValueKind::Any, WidgetKind::value_kind));
        if kind == Some(WidgetKind::LiteralEvalLineEdit) {
            codec.literal = Some(Arc::new(PythonLiteral));
        }
        codec
    }

    /// Store values as literal text parsed by `literal`.
    pub fn with_literal(mut self, literal: Arc<dyn LiteralCodec>) -> Self {
        self.literal = Some(literal);
        self
    }

    pub(crate) fn with_transform(mut self, transform: Arc<RwLock<TransformState>>) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Backend value to caller value.
    pub fn decode(&self, raw: Value) -> Result<Value, WidgetError> {
        if raw.is_none() {
            return Ok(raw);
        }
        if let Some(literal) = &self.literal {
            return match raw.as_str() {
                Some(text) if text.trim().is_empty() => Ok(Value::None),
                Some(text) => Ok(literal.parse(text)?),
                None => Ok(raw),
            };
        }
        if let Some(transform) = &self.transform {
            if let Some(position) = raw.as_f64() {
                return Ok(Value::Float(transform.read().value_from_position(position)));
            }
        }
        Ok(raw)
    }

    /// Caller value to backend value, coercing where the widget allows it.
    pub fn encode(&self, value: Value, base: &WidgetBase) -> Result<Value, WidgetError> {
        if value.is_none() {
            return Ok(value);
        }
        if let Some(literal) = &self.literal {
            return Ok(Value::Str(literal.format(&value)));
        }
        let Some(coerced) = coerce(self.kind, &value) else {
            return Err(WidgetError::TypeMismatch {
                widget_type: base.class_name().to_string(),
                name: base.name().to_string(),
                value: value.to_string(),
                expected: expected_name(self.kind),
            });
        };
        if let Some(transform) = &self.transform {
            if let Some(v) = coerced.as_f64() {
                return Ok(Value::Float(transform.read().position_from_value(v)));
            }
        }
        Ok(coerced)
    }
}

fn coerce(kind: ValueKind, value: &Value) -> Option<Value> {
    let pair = |f: &dyn Fn(&Value) -> Option<Value>| -> Option<Value> {
        let items = value.as_items()?;
        if items.len() != 2 {
            return None;
        }
        Some(Value::Tuple(vec![f(&items[0])?, f(&items[1])?]))
    };
    match kind {
        ValueKind::Any => Some(value.clone()),
        ValueKind::Bool => match value {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::Int(i) => Some(Value::Bool(*i != 0)),
            _ => None,
        },
        ValueKind::Int => value.as_int().map(Value::Int),
        ValueKind::Float => value.as_f64().map(Value::Float),
        ValueKind::Str => match value {
            Value::Str(_) => Some(value.clone()),
            Value::List(_) | Value::Tuple(_) | Value::Dict(_) | Value::Object(_) => None,
            other => Some(Value::Str(other.to_label())),
        },
        ValueKind::Path => match value {
            Value::Path(_) => Some(value.clone()),
            Value::Str(s) => Some(Value::path(s)),
            _ => None,
        },
        ValueKind::Date => match value {
            Value::Date(_) => Some(value.clone()),
            Value::DateTime(dt) => Some(Value::Date(dt.date())),
            _ => None,
        },
        ValueKind::Time => match value {
            Value::Time(_) | Value::TimeDelta(_) => Some(value.clone()),
            _ => None,
        },
        ValueKind::DateTime => match value {
            Value::DateTime(_) => Some(value.clone()),
            Value::Date(d) => d.and_hms_opt(0, 0, 0).map(Value::DateTime),
            _ => None,
        },
        ValueKind::IntPair => pair(&|v: &Value| v.as_int().map(Value::Int)),
        ValueKind::FloatPair => pair(&|v: &Value| v.as_f64().map(Value::Float)),
        ValueKind::Range => matches!(value, Value::Range { .. }).then(|| value.clone()),
        ValueKind::Slice => matches!(value, Value::Slice { .. }).then(|| value.clone()),
        ValueKind::List => value.as_items().map(|items| Value::List(items.to_vec())),
        ValueKind::Tuple => value.as_items().map(|items| Value::Tuple(items.to_vec())),
    }
}

fn expected_name(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Any => "any value",
        ValueKind::Bool => "bool",
        ValueKind::Int => "int",
        ValueKind::Float => "float",
        ValueKind::Str => "str",
        ValueKind::Path => "path",
        ValueKind::Date => "date",
        ValueKind::Time => "time",
        ValueKind::DateTime => "datetime",
        ValueKind::IntPair => "pair of ints",
        ValueKind::FloatPair => "pair of floats",
        ValueKind::Range => "range",
        ValueKind::Slice => "slice",
        ValueKind::List => "list",
        ValueKind::Tuple => "tuple",
    }
}

/// Uniform access to anything holding a value.
///
/// Implemented by [`ValueWidget`] and by every wrapper built around one.
/// Wrappers override [`set_value`](Self::set_value) to validate first.
pub trait ValueAccess: Send + Sync {
    /// The underlying value widget.
    fn value_widget(&self) -> &ValueWidget;

    /// The bound value if any, else the widget's own value.
    fn value(&self) -> Result<Value, WidgetError> {
        self.value_widget().value()
    }

    fn set_value(&self, value: Value) -> Result<(), WidgetError> {
        self.value_widget().set_value(value)
    }

    /// The widget's own value, ignoring any binding.
    fn get_value(&self) -> Result<Value, WidgetError> {
        self.value_widget().get_value()
    }

    /// Emitted with the new value whenever it changes.
    fn changed(&self) -> &Arc<Signal<Value>> {
        self.value_widget().changed()
    }

    fn nullable(&self) -> bool {
        self.value_widget().nullable()
    }

    fn bind(&self, bound: BoundValue) {
        self.value_widget().bind(bound);
    }

    fn unbind(&self) {
        self.value_widget().unbind();
    }

    fn is_bound(&self) -> bool {
        self.value_widget().is_bound()
    }

    /// Whether reading the value yields a default for a signature.
    fn has_default(&self) -> bool {
        self.value_widget().has_default()
    }
}

/// Resets the re-entrancy flag of a bound callback.
struct EvaluatingGuard<'a>(&'a AtomicBool);

impl Drop for EvaluatingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A widget with a value.
pub struct ValueWidget {
    base: WidgetBase,
    backend: Arc<dyn ValueWidgetProtocol>,
    codec: ValueCodec,
    nullable: bool,
    bound: Mutex<Option<BoundValue>>,
    evaluating: AtomicBool,
    /// `EmptyWidget` has no value until one is assigned.
    requires_value: bool,
    has_value: AtomicBool,
    changed: Arc<Signal<Value>>,
}

impl ValueWidget {
    /// Build the widget and assign `value`, if given.
    ///
    /// `None` is skipped for widgets that are not nullable.
    pub fn new(init: &WidgetInit, value: Option<Value>) -> Result<Self, WidgetError> {
        let widget = Self::with_codec(init, ValueCodec::for_class(&init.class_name))?;
        widget.set_initial(value)?;
        Ok(widget)
    }

    /// Build the widget without assigning a value.
    pub(crate) fn with_codec(init: &WidgetInit, codec: ValueCodec) -> Result<Self, WidgetError> {
        let backend = init
            .native
            .value_widget()
            .ok_or_else(|| WidgetError::MissingProtocol {
                class: init.class_name.clone(),
                protocol: crate::protocols::Protocol::ValueWidget.name(),
                missing: vec!["value", "set_value", "bind_change_callback"],
            })?;
        let base = WidgetBase::new(init);
        let nullable = init.options.nullable.unwrap_or(false);
        let changed = Arc::new(Signal::new());

        let signal = Arc::clone(&changed);
        let decoder = codec.clone();
        backend.bind_change_callback(Arc::new(move |raw: Value| {
            if raw.is_none() && !nullable {
                return;
            }
            match decoder.decode(raw) {
                Ok(value) => signal.emit(value),
                Err(err) => {
                    tracing::debug!(target: targets::WIDGET, %err, "change not emitted");
                }
            }
        }));

        let bound = init.options.bind.clone();
        if bound.is_some() && init.options.visible.is_none() {
            base.set_visible(false);
        }
        Ok(Self {
            requires_value: init.class_name == WidgetKind::EmptyWidget.name(),
            base,
            backend,
            codec,
            nullable,
            bound: Mutex::new(bound),
            evaluating: AtomicBool::new(false),
            has_value: AtomicBool::new(false),
            changed,
        })
    }

    pub(crate) fn set_initial(&self, value: Option<Value>) -> Result<(), WidgetError> {
        match value {
            Some(v) if v.is_none() && !self.accepts_none() => Ok(()),
            Some(v) => self.set_value(v),
            None => Ok(()),
        }
    }

    pub fn base(&self) -> &WidgetBase {
        &self.base
    }

    pub fn backend(&self) -> &Arc<dyn ValueWidgetProtocol> {
        &self.backend
    }

    pub fn codec(&self) -> &ValueCodec {
        &self.codec
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    fn accepts_none(&self) -> bool {
        self.nullable || self.codec.kind() == ValueKind::Any
    }

    pub fn changed(&self) -> &Arc<Signal<Value>> {
        &self.changed
    }

    /// The bound value if any, else the widget's own value.
    ///
    /// A bound callback reading `value()` of the widget it is bound to gets
    /// [`WidgetError::RecursiveBinding`]; it should call
    /// [`get_value`](Self::get_value) instead.
    pub fn value(&self) -> Result<Value, WidgetError> {
        let bound = self.bound.lock().clone();
        match bound {
            Some(BoundValue::Value(value)) => Ok(value),
            Some(BoundValue::Callback(callback)) => {
                if self.evaluating.swap(true, Ordering::SeqCst) {
                    return Err(WidgetError::RecursiveBinding {
                        widget_type: self.base.class_name().to_string(),
                        name: self.base.name().to_string(),
                    });
                }
                let _guard = EvaluatingGuard(&self.evaluating);
                callback(self)
            }
            None => self.get_value(),
        }
    }

    /// The backend's value, ignoring any binding.
    pub fn get_value(&self) -> Result<Value, WidgetError> {
        if self.requires_value && !self.has_value.load(Ordering::SeqCst) {
            return Err(WidgetError::NoValue {
                widget_type: self.base.class_name().to_string(),
                name: self.base.name().to_string(),
            });
        }
        self.codec.decode(self.backend.value())
    }

    /// Assign a value, emitting `changed` if it differs.
    pub fn set_value(&self, value: Value) -> Result<(), WidgetError> {
        if value.is_none() && !self.accepts_none() {
            return Err(WidgetError::NotNullable {
                widget_type: self.base.class_name().to_string(),
                name: self.base.name().to_string(),
            });
        }
        let raw = self.codec.encode(value, &self.base)?;
        self.has_value.store(true, Ordering::SeqCst);
        self.backend.set_value(raw);
        Ok(())
    }

    /// Write a raw backend value, bypassing coercion.
    pub(crate) fn set_raw(&self, raw: Value) {
        self.has_value.store(true, Ordering::SeqCst);
        self.backend.set_value(raw);
    }

    pub fn bind(&self, bound: BoundValue) {
        *self.bound.lock() = Some(bound);
    }

    pub fn unbind(&self) {
        *self.bound.lock() = None;
    }

    pub fn is_bound(&self) -> bool {
        self.bound.lock().is_some()
    }

    pub fn has_default(&self) -> bool {
        self.is_bound() || !self.requires_value || self.has_value.load(Ordering::SeqCst)
    }

    /// Annotation with `Optional` unwrapped when nullable.
    pub fn annotation(&self) -> Option<TypeSpec> {
        let annotation = self.base.annotation()?;
        if self.nullable {
            let (inner, _) = annotation.split_nullable();
            Some(inner)
        } else {
            Some(annotation)
        }
    }

    pub(crate) fn value_options(&self) -> WidgetOptions {
        let mut options = self.base.options().clone();
        options.visible = Some(self.base.visible());
        options.enabled = Some(self.base.enabled());
        options.nullable = Some(self.nullable);
        options
    }
}

impl ValueAccess for ValueWidget {
    fn value_widget(&self) -> &ValueWidget {
        self
    }
}

impl Widget for ValueWidget {
    fn widget_base(&self) -> &WidgetBase {
        &self.base
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_value(&self) -> Option<&dyn ValueAccess> {
        Some(self)
    }

    fn options(&self) -> WidgetOptions {
        self.value_options()
    }

    fn annotation(&self) -> Option<TypeSpec> {
        ValueWidget::annotation(self)
    }
}

impl std::fmt::Debug for ValueWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(self.base.class_name())
            .field("name", &self.base.name())
            .field("value", &self.get_value().ok())
            .field("annotation", &self.annotation())
            .finish()
    }
}

static_assertions::assert_impl_all!(ValueWidget: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, HeadlessBackend};
    use crate::signature::ParameterKind;

    fn init(class: &str, options: WidgetOptions) -> WidgetInit {
        let backend: Arc<dyn Backend> = Arc::new(HeadlessBackend::new());
        let native = backend.create(class, &options).unwrap();
        WidgetInit {
            name: "w".into(),
            class_name: class.into(),
            annotation: None,
            param_kind: ParameterKind::PositionalOrKeyword,
            gui_only: false,
            options,
            backend,
            native,
        }
    }

    #[test]
    fn test_coerces_to_widget_kind() {
        let w = ValueWidget::new(&init("FileEdit", WidgetOptions::new()), None).unwrap();
        w.set_value(Value::str("/tmp/x")).unwrap();
        assert_eq!(w.value().unwrap(), Value::path("/tmp/x"));
        let err = w.set_value(Value::Int(1)).unwrap_err();
        assert!(matches!(err, WidgetError::TypeMismatch { expected: "path", .. }));
    }

    #[test]
    fn test_none_rejected_unless_nullable() {
        let w = ValueWidget::new(&init("LineEdit", WidgetOptions::new()), None).unwrap();
        assert!(matches!(
            w.set_value(Value::None),
            Err(WidgetError::NotNullable { .. })
        ));
        let n = ValueWidget::new(
            &init("LineEdit", WidgetOptions::new().with_nullable(true)),
            Some(Value::None),
        )
        .unwrap();
        assert_eq!(n.value().unwrap(), Value::None);
    }

    #[test]
    fn test_changed_emitted_synchronously() {
        let w = ValueWidget::new(&init("LineEdit", WidgetOptions::new()), None).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        w.changed().connect(move |v| sink.lock().push(v.clone()));
        w.set_value(Value::str("a")).unwrap();
        w.set_value(Value::str("a")).unwrap();
        w.set_value(Value::str("b")).unwrap();
        assert_eq!(*seen.lock(), vec![Value::str("a"), Value::str("b")]);
    }

    #[test]
    fn test_bound_value_hides_widget() {
        let options = WidgetOptions::new().with_bind(Value::Int(3));
        let w = ValueWidget::new(&init("SpinBox", options), None).unwrap();
        assert!(!w.base().visible());
        assert_eq!(w.value().unwrap(), Value::Int(3));
        w.unbind();
        assert_eq!(w.value().unwrap(), Value::Int(0));

        let shown = WidgetOptions::new().with_bind(Value::Int(3)).with_visible(true);
        let w = ValueWidget::new(&init("SpinBox", shown), None).unwrap();
        assert!(w.base().visible());
    }

    #[test]
    fn test_recursive_binding_is_reported() {
        let w = ValueWidget::new(&init("SpinBox", WidgetOptions::new()), None).unwrap();
        w.bind(BoundValue::callback(|w| w.value()));
        assert!(matches!(
            w.value(),
            Err(WidgetError::RecursiveBinding { .. })
        ));
        // the flag is cleared, so the escape hatch still works afterwards
        w.bind(BoundValue::callback(|w| w.get_value()));
        assert_eq!(w.value().unwrap(), Value::Int(0));
    }

    #[test]
    fn test_literal_editor_parses_on_read() {
        let w = ValueWidget::new(&init("LiteralEvalLineEdit", WidgetOptions::new()), None).unwrap();
        w.set_value(Value::List(vec![Value::Int(1), Value::str("a")]))
            .unwrap();
        assert_eq!(
            w.value().unwrap(),
            Value::List(vec![Value::Int(1), Value::str("a")])
        );
        w.set_raw(Value::str("not a literal"));
        assert!(matches!(w.value(), Err(WidgetError::Literal(_))));
    }

    #[test]
    fn test_empty_widget_without_value() {
        let w = ValueWidget::new(&init("EmptyWidget", WidgetOptions::new()), None).unwrap();
        assert!(!w.has_default());
        assert!(matches!(w.value(), Err(WidgetError::NoValue { .. })));
        w.set_value(Value::Int(9)).unwrap();
        assert!(w.has_default());
        assert_eq!(w.value().unwrap(), Value::Int(9));
    }
}
