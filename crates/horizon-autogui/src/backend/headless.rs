//! In-memory backend.
//!
//! Every widget is a [`HeadlessWidget`] holding its state behind a mutex.
//! Change callbacks fire synchronously whenever the stored value changes,
//! after the lock has been released, so callbacks may read the widget back.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;
use horizon_autogui_core::Value;
use parking_lot::Mutex;

use super::Backend;
use crate::choices::Choice;
use crate::error::WidgetError;
use crate::options::WidgetOptions;
use crate::protocols::{
    BackendWidget, ButtonWidgetProtocol, CategoricalWidgetProtocol, ChangeCallback,
    ContainerProtocol, Layout, NativeId, Protocol, RangedWidgetProtocol, ValueWidgetProtocol,
    WidgetProtocol,
};
use crate::widget::WidgetKind;

/// Average glyph width used to measure label text.
const GLYPH_WIDTH: u32 = 8;

/// Backend keeping widget state in memory, for tests and scripting.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_id: AtomicU64,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn create(&self, class: &str, options: &WidgetOptions) -> Result<BackendWidget, WidgetError> {
        let kind: WidgetKind = class.parse().map_err(|_| WidgetError::MissingWidget {
            backend: self.name().to_string(),
            class: class.to_string(),
        })?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let widget = Arc::new(HeadlessWidget::new(id, kind, options));
        tracing::trace!(
            target: horizon_autogui_core::logging::targets::WIDGET,
            id,
            class,
            "created headless widget"
        );
        Ok(match kind.protocol() {
            Protocol::ButtonWidget => BackendWidget::Button(widget),
            Protocol::RangedWidget => BackendWidget::Ranged(widget),
            Protocol::CategoricalWidget => BackendWidget::Categorical(widget),
            Protocol::Container => BackendWidget::Container(widget),
            Protocol::ValueWidget => BackendWidget::Value(widget),
            Protocol::Widget => BackendWidget::Widget(widget),
        })
    }

    fn text_width(&self, text: &str) -> u32 {
        text.chars().count() as u32 * GLYPH_WIDTH
    }
}

struct State {
    visible: bool,
    enabled: bool,
    tooltip: Option<String>,
    parent: Option<NativeId>,
    min_width: u32,
    value: Value,
    min: f64,
    max: f64,
    step: f64,
    adaptive_step: bool,
    choices: Vec<Choice>,
    /// Index of the current choice (single selection).
    current: Option<usize>,
    text: String,
    children: Vec<NativeId>,
}

/// A widget of the headless backend.
pub struct HeadlessWidget {
    id: NativeId,
    kind: WidgetKind,
    layout: Layout,
    state: Mutex<State>,
    callbacks: Mutex<Vec<ChangeCallback>>,
}

fn initial_value(kind: WidgetKind) -> Value {
    match kind {
        WidgetKind::Label
        | WidgetKind::LineEdit
        | WidgetKind::Password
        | WidgetKind::LiteralEvalLineEdit
        | WidgetKind::TextEdit => Value::str(""),
        WidgetKind::PushButton | WidgetKind::CheckBox | WidgetKind::RadioButton => {
            Value::Bool(false)
        }
        WidgetKind::SpinBox | WidgetKind::Slider | WidgetKind::ProgressBar => Value::Int(0),
        WidgetKind::FloatSpinBox | WidgetKind::FloatSlider | WidgetKind::LogSlider => {
            Value::Float(0.0)
        }
        WidgetKind::RangeSlider => Value::Tuple(vec![Value::Int(0), Value::Int(0)]),
        WidgetKind::FloatRangeSlider => Value::Tuple(vec![Value::Float(0.0), Value::Float(0.0)]),
        WidgetKind::DateEdit => Value::Date(Local::now().date_naive()),
        WidgetKind::TimeEdit => Value::Time(Local::now().time()),
        WidgetKind::DateTimeEdit => Value::DateTime(Local::now().naive_local()),
        WidgetKind::FileEdit => Value::path(""),
        WidgetKind::RangeEdit => Value::Range {
            start: 0,
            stop: 10,
            step: 1,
        },
        WidgetKind::SliceEdit => Value::Slice {
            start: None,
            stop: None,
            step: None,
        },
        WidgetKind::ListEdit | WidgetKind::Select => Value::List(Vec::new()),
        WidgetKind::TupleEdit => Value::Tuple(Vec::new()),
        WidgetKind::Table
        | WidgetKind::EmptyWidget
        | WidgetKind::ComboBox
        | WidgetKind::RadioButtons
        | WidgetKind::Container => Value::None,
    }
}

impl HeadlessWidget {
    fn new(id: NativeId, kind: WidgetKind, options: &WidgetOptions) -> Self {
        let layout = match options.orientation {
            Some(crate::options::Orientation::Horizontal) => Layout::Horizontal,
            _ => Layout::Vertical,
        };
        Self {
            id,
            kind,
            layout,
            state: Mutex::new(State {
                visible: true,
                enabled: true,
                tooltip: None,
                parent: None,
                min_width: 0,
                value: initial_value(kind),
                min: 0.0,
                max: 100.0,
                step: 1.0,
                adaptive_step: false,
                choices: Vec::new(),
                current: None,
                text: options.text.clone().unwrap_or_default(),
                children: Vec::new(),
            }),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    /// Invoke change callbacks with `value`. Must be called without the state lock.
    fn notify(&self, value: Value) {
        let callbacks: Vec<ChangeCallback> = self.callbacks.lock().clone();
        for callback in callbacks {
            callback(value.clone());
        }
    }

    /// Current value of a categorical widget, computed from the selection.
    fn categorical_value(&self, state: &State) -> Value {
        if self.kind.is_multi() {
            return state.value.clone();
        }
        state
            .current
            .and_then(|i| state.choices.get(i))
            .map_or(Value::None, |c| c.data.clone())
    }

    fn is_categorical(&self) -> bool {
        matches!(
            self.kind,
            WidgetKind::ComboBox | WidgetKind::Select | WidgetKind::RadioButtons
        )
    }
}

impl WidgetProtocol for HeadlessWidget {
    fn native_id(&self) -> NativeId {
        self.id
    }

    fn visible(&self) -> bool {
        self.state.lock().visible
    }

    fn set_visible(&self, visible: bool) {
        self.state.lock().visible = visible;
    }

    fn enabled(&self) -> bool {
        self.state.lock().enabled
    }

    fn set_enabled(&self, enabled: bool) {
        self.state.lock().enabled = enabled;
    }

    fn tooltip(&self) -> Option<String> {
        self.state.lock().tooltip.clone()
    }

    fn set_tooltip(&self, tooltip: Option<String>) {
        self.state.lock().tooltip = tooltip;
    }

    fn set_parent(&self, parent: Option<NativeId>) {
        self.state.lock().parent = parent;
    }

    fn parent(&self) -> Option<NativeId> {
        self.state.lock().parent
    }

    fn min_width(&self) -> u32 {
        self.state.lock().min_width
    }

    fn set_min_width(&self, width: u32) {
        self.state.lock().min_width = width;
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.visible = false;
        state.parent = None;
        state.children.clear();
    }
}

impl ValueWidgetProtocol for HeadlessWidget {
    fn value(&self) -> Value {
        let state = self.state.lock();
        if self.is_categorical() {
            self.categorical_value(&state)
        } else {
            state.value.clone()
        }
    }

    fn set_value(&self, value: Value) {
        let changed = {
            let mut state = self.state.lock();
            if self.is_categorical() && !self.kind.is_multi() {
                let index = state.choices.iter().position(|c| c.data == value);
                let changed = index.is_some() && index != state.current;
                if changed {
                    state.current = index;
                }
                changed.then(|| self.categorical_value(&state))
            } else if state.value != value {
                state.value = value.clone();
                Some(value)
            } else {
                None
            }
        };
        if let Some(value) = changed {
            self.notify(value);
        }
    }

    fn bind_change_callback(&self, callback: ChangeCallback) {
        self.callbacks.lock().push(callback);
    }
}

impl RangedWidgetProtocol for HeadlessWidget {
    fn min(&self) -> f64 {
        self.state.lock().min
    }

    fn set_min(&self, min: f64) {
        self.state.lock().min = min;
    }

    fn max(&self) -> f64 {
        self.state.lock().max
    }

    fn set_max(&self, max: f64) {
        self.state.lock().max = max;
    }

    fn step(&self) -> f64 {
        self.state.lock().step
    }

    fn set_step(&self, step: f64) {
        self.state.lock().step = step;
    }

    fn adaptive_step(&self) -> bool {
        self.state.lock().adaptive_step
    }

    fn set_adaptive_step(&self, adaptive: bool) {
        self.state.lock().adaptive_step = adaptive;
    }
}

impl CategoricalWidgetProtocol for HeadlessWidget {
    fn choices(&self) -> Vec<Choice> {
        self.state.lock().choices.clone()
    }

    fn set_choices(&self, choices: Vec<Choice>) {
        let changed = {
            let mut state = self.state.lock();
            let before = self.categorical_value(&state);
            if self.kind.is_multi() {
                let kept: Vec<Value> = before
                    .as_items()
                    .unwrap_or_default()
                    .iter()
                    .filter(|v| choices.iter().any(|c| &c.data == *v))
                    .cloned()
                    .collect();
                state.value = Value::List(kept);
            } else {
                let previous = state.current.and_then(|i| state.choices.get(i)).cloned();
                state.current = previous
                    .and_then(|p| choices.iter().position(|c| c.data == p.data))
                    .or(if choices.is_empty() { None } else { Some(0) });
            }
            state.choices = choices;
            let after = self.categorical_value(&state);
            (after != before).then_some(after)
        };
        if let Some(value) = changed {
            self.notify(value);
        }
    }

    fn current_choice(&self) -> Option<String> {
        let state = self.state.lock();
        state
            .current
            .and_then(|i| state.choices.get(i))
            .map(|c| c.label.clone())
    }

    fn count(&self) -> usize {
        self.state.lock().choices.len()
    }

    fn get_choice(&self, label: &str) -> Option<Value> {
        self.state
            .lock()
            .choices
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.data.clone())
    }

    fn set_choice(&self, label: &str, data: Value) {
        let mut state = self.state.lock();
        match state.choices.iter_mut().find(|c| c.label == label) {
            Some(choice) => choice.data = data,
            None => {
                state.choices.push(Choice::new(label, data));
                if state.current.is_none() && !self.kind.is_multi() {
                    state.current = Some(0);
                }
            }
        }
    }

    fn del_choice(&self, label: &str) {
        let mut state = self.state.lock();
        let Some(index) = state.choices.iter().position(|c| c.label == label) else {
            return;
        };
        state.choices.remove(index);
        state.current = match state.current {
            Some(current) if current == index => (!state.choices.is_empty()).then_some(0),
            Some(current) if current > index => Some(current - 1),
            other => other,
        };
    }
}

impl ButtonWidgetProtocol for HeadlessWidget {
    fn text(&self) -> String {
        self.state.lock().text.clone()
    }

    fn set_text(&self, text: &str) {
        self.state.lock().text = text.to_string();
    }

    fn click(&self) {
        let value = {
            let mut state = self.state.lock();
            if self.kind != WidgetKind::PushButton {
                let checked = !state.value.as_bool().unwrap_or(false);
                state.value = Value::Bool(checked);
            }
            state.value.clone()
        };
        self.notify(value);
    }
}

impl ContainerProtocol for HeadlessWidget {
    fn layout(&self) -> Layout {
        self.layout
    }

    fn insert_widget(&self, index: usize, child: &dyn WidgetProtocol) {
        let mut state = self.state.lock();
        let index = index.min(state.children.len());
        state.children.insert(index, child.native_id());
        drop(state);
        child.set_parent(Some(self.id));
    }

    fn remove_widget(&self, child: &dyn WidgetProtocol) {
        let id = child.native_id();
        self.state.lock().children.retain(|c| *c != id);
        child.set_parent(None);
    }

    fn children(&self) -> Vec<NativeId> {
        self.state.lock().children.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(class: &str) -> BackendWidget {
        HeadlessBackend::new()
            .create(class, &WidgetOptions::default())
            .unwrap()
    }

    #[test]
    fn test_unknown_class() {
        let err = HeadlessBackend::new()
            .create("Nope", &WidgetOptions::default())
            .unwrap_err();
        assert!(matches!(err, WidgetError::MissingWidget { .. }));
    }

    #[test]
    fn test_change_callback_fires_once_per_change() {
        let BackendWidget::Ranged(w) = create("SpinBox") else {
            panic!("expected a ranged widget");
        };
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        w.bind_change_callback(Arc::new(move |v| sink.lock().push(v)));
        w.set_value(Value::Int(3));
        w.set_value(Value::Int(3));
        w.set_value(Value::Int(4));
        assert_eq!(*seen.lock(), vec![Value::Int(3), Value::Int(4)]);
    }

    #[test]
    fn test_set_choices_keeps_current_when_present() {
        let BackendWidget::Categorical(w) = create("ComboBox") else {
            panic!("expected a categorical widget");
        };
        w.set_choices(vec![Choice::new("a", 1), Choice::new("b", 2)]);
        assert_eq!(w.value(), Value::Int(1));
        w.set_value(Value::Int(2));
        w.set_choices(vec![Choice::new("c", 3), Choice::new("b", 2)]);
        assert_eq!(w.value(), Value::Int(2));
        assert_eq!(w.current_choice().as_deref(), Some("b"));
        w.set_choices(vec![Choice::new("d", 4)]);
        assert_eq!(w.value(), Value::Int(4));
    }

    #[test]
    fn test_click_toggles_checkable() {
        let BackendWidget::Button(w) = create("CheckBox") else {
            panic!("expected a button");
        };
        w.click();
        assert_eq!(w.value(), Value::Bool(true));
        w.click();
        assert_eq!(w.value(), Value::Bool(false));
    }
}
