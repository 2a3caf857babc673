//! Widgets bounded by a numeric range.
//!
//! A [`RangedWidget`] rejects values outside `[min, max]` instead of clamping
//! them. Without explicit bounds the range is derived from the initial
//! value: the floor is 0 unless the value is negative, and the ceiling is one
//! less than the next power of ten above the value, but at least 999.
//!
//! Sliders whose backend position is not the value itself (such as
//! `LogSlider`) keep their logical bounds in a [`TransformState`] and map
//! between value and position on every read and write.

use std::any::Any;
use std::f64::consts::E;
use std::sync::Arc;

use horizon_autogui_core::{TypeSpec, Value};
use parking_lot::RwLock;

use crate::error::WidgetError;
use crate::options::{StepSize, WidgetOptions};
use crate::protocols::{BackendWidget, Protocol, RangedWidgetProtocol};
use crate::widget::{ValueAccess, ValueCodec, ValueWidget, Widget, WidgetBase, WidgetInit, WidgetKind};

/// Default lower bound.
pub const DEFAULT_MIN: f64 = 0.0;
/// One more than the default upper bound.
pub const DEFAULT_MAX: f64 = 1000.0;

/// Compute `(min, max)`, filling unset bounds from `value`.
pub fn init_range(value: Option<&Value>, min: Option<f64>, max: Option<f64>) -> (f64, f64) {
    let values: Vec<f64> = match value {
        None | Some(Value::None) => vec![1.0],
        Some(v) => match v.as_items() {
            Some(items) => items.iter().map(|i| i.as_f64().unwrap_or(1.0)).collect(),
            None => vec![v.as_f64().unwrap_or(1.0)],
        },
    };
    let new_min = min.unwrap_or_else(|| values.iter().copied().fold(DEFAULT_MIN, f64::min));
    let new_max = max.unwrap_or_else(|| {
        let top = values.iter().copied().fold(0.0, f64::max);
        let ceiling = 10f64.powf((top + 1.0).log10().ceil());
        DEFAULT_MAX.max(ceiling) - 1.0
    });
    (new_min, new_max)
}

/// How a transformed slider maps position onto value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionTransform {
    Linear,
    /// Logarithmic in `base`; positions are whole numbers.
    Log { base: f64 },
}

/// Logical bounds and position domain of a transformed slider.
#[derive(Debug, Clone)]
pub struct TransformState {
    pub transform: PositionTransform,
    pub min: f64,
    pub max: f64,
    pub min_pos: f64,
    pub max_pos: f64,
}

impl TransformState {
    fn log_bounds(&self, base: f64) -> (f64, f64, f64) {
        let minv = self.min.log(base);
        let maxv = self.max.log(base);
        (minv, maxv, (maxv - minv) / (self.max_pos - self.min_pos))
    }

    pub fn value_from_position(&self, position: f64) -> f64 {
        match self.transform {
            PositionTransform::Linear => {
                let scale = (self.max - self.min) / (self.max_pos - self.min_pos);
                self.min + scale * (position - self.min_pos)
            }
            PositionTransform::Log { base } => {
                let (minv, _, scale) = self.log_bounds(base);
                base.powf(minv + scale * (position - self.min_pos))
            }
        }
    }

    pub fn position_from_value(&self, value: f64) -> f64 {
        match self.transform {
            PositionTransform::Linear => {
                let scale = (self.max - self.min) / (self.max_pos - self.min_pos);
                (value - self.min) / scale + self.min_pos
            }
            PositionTransform::Log { base } => {
                let (minv, _, scale) = self.log_bounds(base);
                ((value.log(base) - minv) / scale + self.min_pos).round()
            }
        }
    }
}

/// A value widget with bounds and a step.
pub struct RangedWidget {
    inner: ValueWidget,
    ranged: Arc<dyn RangedWidgetProtocol>,
    transform: Option<Arc<RwLock<TransformState>>>,
}

impl RangedWidget {
    pub fn new(init: &WidgetInit, value: Option<Value>) -> Result<Self, WidgetError> {
        let BackendWidget::Ranged(ranged) = &init.native else {
            return Err(WidgetError::MissingProtocol {
                class: init.class_name.clone(),
                protocol: Protocol::RangedWidget.name(),
                missing: vec!["min", "set_min", "max", "set_max", "step", "set_step"],
            });
        };
        let ranged = Arc::clone(ranged);
        let options = &init.options;
        let transformed = init
            .class_name
            .parse::<WidgetKind>()
            .is_ok_and(WidgetKind::is_transformed);

        if transformed {
            let state = TransformState {
                transform: PositionTransform::Log {
                    base: options.base.unwrap_or(E),
                },
                min: options.min.unwrap_or(1.0),
                max: options.max.unwrap_or(100.0),
                min_pos: options.min_pos.unwrap_or(0.0),
                max_pos: options.max_pos.unwrap_or(100.0),
            };
            ranged.set_min(state.min_pos);
            ranged.set_max(state.max_pos);
            let transform = Arc::new(RwLock::new(state));
            let codec = ValueCodec::for_class(&init.class_name).with_transform(transform.clone());
            let inner = ValueWidget::with_codec(init, codec)?;
            let widget = Self {
                inner,
                ranged,
                transform: Some(transform),
            };
            match options.step {
                Some(StepSize::Fixed(step)) => widget.ranged.set_step(step),
                _ => widget.ranged.set_step(1.0),
            }
            widget.set_initial(value)?;
            return Ok(widget);
        }

        let inner = ValueWidget::with_codec(init, ValueCodec::for_class(&init.class_name))?;
        let widget = Self {
            inner,
            ranged,
            transform: None,
        };
        match options.step {
            Some(StepSize::Fixed(step)) => widget.set_step(StepSize::Fixed(step)),
            _ => {
                widget.ranged.set_adaptive_step(true);
                widget.ranged.set_step(1.0);
            }
        }
        let (min, max) = init_range(value.as_ref(), options.min, options.max);
        widget.ranged.set_min(min);
        widget.ranged.set_max(max);
        widget.set_initial(value)?;
        Ok(widget)
    }

    fn set_initial(&self, value: Option<Value>) -> Result<(), WidgetError> {
        match value {
            Some(v) if !v.is_none() => self.set_value(v),
            other => self.inner.set_initial(other),
        }
    }

    pub fn min(&self) -> f64 {
        match &self.transform {
            Some(t) => t.read().min,
            None => self.ranged.min(),
        }
    }

    pub fn max(&self) -> f64 {
        match &self.transform {
            Some(t) => t.read().max,
            None => self.ranged.max(),
        }
    }

    /// Change the lower bound.
    ///
    /// Transformed widgets re-apply their previous value so the position
    /// follows the new mapping.
    pub fn set_min(&self, min: f64) {
        match &self.transform {
            Some(t) => self.retransform(|| t.write().min = min),
            None => self.ranged.set_min(min),
        }
    }

    pub fn set_max(&self, max: f64) {
        match &self.transform {
            Some(t) => self.retransform(|| t.write().max = max),
            None => self.ranged.set_max(max),
        }
    }

    fn retransform(&self, update: impl FnOnce()) {
        let previous = self.inner.get_value();
        update();
        if let Ok(previous) = previous {
            match self.inner.codec().encode(previous, self.inner.base()) {
                Ok(raw) => self.inner.set_raw(raw),
                Err(err) => tracing::debug!(
                    target: horizon_autogui_core::logging::targets::WIDGET,
                    %err,
                    "could not re-apply value after range change"
                ),
            }
        }
    }

    pub fn range(&self) -> (f64, f64) {
        (self.min(), self.max())
    }

    pub fn set_range(&self, min: f64, max: f64) {
        self.set_min(min);
        self.set_max(max);
    }

    /// The fixed step, or `None` when the step adapts to the value.
    pub fn step(&self) -> Option<f64> {
        if self.ranged.adaptive_step() {
            None
        } else {
            Some(self.ranged.step())
        }
    }

    pub fn set_step(&self, step: StepSize) {
        match step {
            StepSize::Adaptive => self.ranged.set_adaptive_step(true),
            StepSize::Fixed(step) => {
                self.ranged.set_adaptive_step(false);
                self.ranged.set_step(step);
            }
        }
    }

    pub fn adaptive_step(&self) -> bool {
        self.step().is_none()
    }

    pub fn set_adaptive_step(&self, adaptive: bool) {
        if adaptive {
            self.set_step(StepSize::Adaptive);
        } else {
            self.set_step(StepSize::Fixed(self.ranged.step()));
        }
    }

    /// The position transform, for transformed sliders.
    pub fn transform(&self) -> Option<TransformState> {
        self.transform.as_ref().map(|t| t.read().clone())
    }

    fn validate(&self, value: &Value) -> Result<(), WidgetError> {
        let (min, max) = self.range();
        let items: Vec<&Value> = match value.as_items() {
            Some(items) => items.iter().collect(),
            None => vec![value],
        };
        let out_of_range = items
            .iter()
            .filter_map(|v| v.as_f64())
            .any(|v| v < min || v > max);
        if out_of_range {
            return Err(WidgetError::out_of_range(value, min, max));
        }
        Ok(())
    }
}

impl ValueAccess for RangedWidget {
    fn value_widget(&self) -> &ValueWidget {
        &self.inner
    }

    /// Assign `value` after checking every element against the range.
    fn set_value(&self, value: Value) -> Result<(), WidgetError> {
        if !value.is_none() {
            self.validate(&value)?;
        }
        self.inner.set_value(value)
    }
}

impl Widget for RangedWidget {
    fn widget_base(&self) -> &WidgetBase {
        self.inner.base()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_value(&self) -> Option<&dyn ValueAccess> {
        Some(self)
    }

    fn as_ranged(&self) -> Option<&RangedWidget> {
        Some(self)
    }

    fn options(&self) -> WidgetOptions {
        let mut options = self.inner.value_options();
        options.min = Some(self.min());
        options.max = Some(self.max());
        options.step = Some(self.step().map_or(StepSize::Adaptive, StepSize::Fixed));
        options
    }

    fn annotation(&self) -> Option<TypeSpec> {
        self.inner.annotation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, HeadlessBackend};
    use crate::signature::ParameterKind;

    fn ranged(class: &str, options: WidgetOptions, value: Option<Value>) -> RangedWidget {
        let backend: Arc<dyn Backend> = Arc::new(HeadlessBackend::new());
        let native = backend.create(class, &options).unwrap();
        let init = WidgetInit {
            name: "r".into(),
            class_name: class.into(),
            annotation: None,
            param_kind: ParameterKind::PositionalOrKeyword,
            gui_only: false,
            options,
            backend,
            native,
        };
        RangedWidget::new(&init, value).unwrap()
    }

    #[test]
    fn test_init_range_heuristic() {
        assert_eq!(init_range(None, None, None), (0.0, 999.0));
        assert_eq!(init_range(Some(&Value::Int(50)), None, None), (0.0, 999.0));
        assert_eq!(init_range(Some(&Value::Int(5000)), None, None), (0.0, 9999.0));
        assert_eq!(init_range(Some(&Value::Int(-5)), None, None), (-5.0, 999.0));
        assert_eq!(init_range(Some(&Value::Int(5)), Some(2.0), Some(8.0)), (2.0, 8.0));
        let pair = Value::Tuple(vec![Value::Int(-3), Value::Int(1500)]);
        assert_eq!(init_range(Some(&pair), None, None), (-3.0, 9999.0));
    }

    #[test]
    fn test_rejects_out_of_range_and_keeps_value() {
        let w = ranged(
            "SpinBox",
            WidgetOptions::new().with_min(0.0).with_max(10.0),
            Some(Value::Int(4)),
        );
        let err = w.set_value(Value::Int(11)).unwrap_err();
        assert!(matches!(err, WidgetError::OutOfRange { .. }));
        assert_eq!(w.value().unwrap(), Value::Int(4));
        w.set_value(Value::Int(10)).unwrap();
        assert_eq!(w.value().unwrap(), Value::Int(10));
    }

    #[test]
    fn test_multi_value_checks_every_element() {
        let w = ranged(
            "RangeSlider",
            WidgetOptions::new().with_min(0.0).with_max(10.0),
            Some(Value::Tuple(vec![Value::Int(2), Value::Int(8)])),
        );
        assert!(w.set_value(Value::Tuple(vec![Value::Int(2), Value::Int(12)])).is_err());
        w.set_value(Value::Tuple(vec![Value::Int(1), Value::Int(9)]))
            .unwrap();
        assert_eq!(
            w.value().unwrap(),
            Value::Tuple(vec![Value::Int(1), Value::Int(9)])
        );
    }

    #[test]
    fn test_step_defaults_to_adaptive() {
        let w = ranged("FloatSpinBox", WidgetOptions::new(), None);
        assert_eq!(w.step(), None);
        assert!(w.adaptive_step());
        w.set_step(StepSize::Fixed(0.5));
        assert_eq!(w.step(), Some(0.5));
        w.set_adaptive_step(true);
        assert_eq!(w.step(), None);
    }

    #[test]
    fn test_log_slider_maps_positions() {
        let w = ranged("LogSlider", WidgetOptions::new(), Some(Value::Float(10.0)));
        assert_eq!(w.range(), (1.0, 100.0));
        assert_eq!(w.inner.backend().value(), Value::Float(50.0));
        let v = w.value().unwrap().as_f64().unwrap();
        assert!((v - 10.0).abs() < 1e-9);
        assert!(w.set_value(Value::Float(1000.0)).is_err());
    }

    #[test]
    fn test_transformed_bounds_reapply_value() {
        let w = ranged("LogSlider", WidgetOptions::new(), Some(Value::Float(10.0)));
        w.set_max(10_000.0);
        let v = w.value().unwrap().as_f64().unwrap();
        assert!((v - 10.0).abs() < 1e-9);
        assert_eq!(w.inner.backend().value(), Value::Float(25.0));
    }
}
