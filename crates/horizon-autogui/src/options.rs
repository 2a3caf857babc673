//! Widget construction options.
//!
//! [`WidgetOptions`] is the record passed through resolution: explicit
//! per-parameter options from the caller, options stored in the registry,
//! and options inferred by the resolver are merged into one with
//! [`WidgetOptions::merge_under`], explicit settings winning.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use horizon_autogui_core::Value;
use indexmap::IndexMap;

use crate::choices::ChoicesSource;
use crate::error::WidgetError;
use crate::protocols::CustomWidgetClass;
use crate::widget::{ValueWidget, WidgetKind};

/// Callback evaluated in place of a bound widget's own value.
pub type BindCallback = Arc<dyn Fn(&ValueWidget) -> Result<Value, WidgetError> + Send + Sync>;

/// A value or callback substituted for a widget's live value.
#[derive(Clone)]
pub enum BoundValue {
    /// A constant.
    Value(Value),
    /// Called with the widget each time its value is read.
    Callback(BindCallback),
}

impl BoundValue {
    /// Bind a callback.
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&ValueWidget) -> Result<Value, WidgetError> + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }
}

impl From<Value> for BoundValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl fmt::Debug for BoundValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// Reference to a widget class: a name, a builtin kind, or a custom class.
#[derive(Clone)]
pub enum WidgetRef {
    /// A builtin kind name (`"SpinBox"`) or a dotted custom class name.
    Name(String),
    Kind(WidgetKind),
    Custom(Arc<dyn CustomWidgetClass>),
}

impl WidgetRef {
    /// Whether this refers to the given builtin kind, by value or by name.
    pub fn is_kind(&self, kind: WidgetKind) -> bool {
        match self {
            Self::Kind(k) => *k == kind,
            Self::Name(name) => WidgetKind::from_str(name).is_ok_and(|k| k == kind),
            Self::Custom(_) => false,
        }
    }
}

impl PartialEq for WidgetRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Name(a), Self::Name(b)) => a == b,
            (Self::Kind(a), Self::Kind(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for WidgetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Self::Kind(kind) => f.debug_tuple("Kind").field(kind).finish(),
            Self::Custom(class) => f.debug_tuple("Custom").field(&class.name()).finish(),
        }
    }
}

impl From<WidgetKind> for WidgetRef {
    fn from(kind: WidgetKind) -> Self {
        Self::Kind(kind)
    }
}

impl From<&str> for WidgetRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for WidgetRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<Arc<dyn CustomWidgetClass>> for WidgetRef {
    fn from(class: Arc<dyn CustomWidgetClass>) -> Self {
        Self::Custom(class)
    }
}

/// Step size of a ranged widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepSize {
    /// Step one power of ten below the current value.
    Adaptive,
    Fixed(f64),
}

/// What a file picker selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileMode {
    /// An existing file (`"r"`).
    #[default]
    Read,
    /// Several existing files (`"rm"`).
    ReadMultiple,
    /// A file to write (`"w"`).
    Write,
    /// A directory (`"d"`).
    Directory,
}

impl FileMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::ReadMultiple => "rm",
            Self::Write => "w",
            Self::Directory => "d",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

/// Options controlling which widget is built and how.
///
/// Unset fields (`None`) are filled from lower-priority sources by
/// [`merge_under`](Self::merge_under).
///
/// # Example
///
/// ```
/// use horizon_autogui::{WidgetKind, WidgetOptions};
///
/// let explicit = WidgetOptions::new().with_max(50.0);
/// let registered = WidgetOptions::new().with_min(1.0).with_max(10.0);
///
/// let merged = explicit.merge_under(registered);
/// assert_eq!(merged.min, Some(1.0));
/// assert_eq!(merged.max, Some(50.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct WidgetOptions {
    pub widget_type: Option<WidgetRef>,
    pub choices: Option<ChoicesSource>,
    pub allow_multiple: Option<bool>,
    pub nullable: Option<bool>,
    pub bind: Option<BoundValue>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<StepSize>,
    pub visible: Option<bool>,
    pub enabled: Option<bool>,
    pub label: Option<String>,
    pub tooltip: Option<String>,
    pub gui_only: Option<bool>,
    pub mode: Option<FileMode>,
    pub base: Option<f64>,
    pub text: Option<String>,
    pub orientation: Option<Orientation>,
    pub min_pos: Option<f64>,
    pub max_pos: Option<f64>,
    pub tracking: Option<bool>,
    /// Backend-specific options, passed through untouched.
    pub extra: IndexMap<String, Value>,
}

impl WidgetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_widget_type(mut self, widget_type: impl Into<WidgetRef>) -> Self {
        self.widget_type = Some(widget_type.into());
        self
    }

    pub fn with_choices(mut self, choices: impl Into<ChoicesSource>) -> Self {
        self.choices = Some(choices.into());
        self
    }

    pub fn with_allow_multiple(mut self, allow_multiple: bool) -> Self {
        self.allow_multiple = Some(allow_multiple);
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    pub fn with_bind(mut self, bind: impl Into<BoundValue>) -> Self {
        self.bind = Some(bind.into());
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_step(mut self, step: StepSize) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn with_gui_only(mut self, gui_only: bool) -> Self {
        self.gui_only = Some(gui_only);
        self
    }

    pub fn with_mode(mut self, mode: FileMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_base(mut self, base: f64) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    pub fn with_position_range(mut self, min_pos: f64, max_pos: f64) -> Self {
        self.min_pos = Some(min_pos);
        self.max_pos = Some(max_pos);
        self
    }

    pub fn with_tracking(mut self, tracking: bool) -> Self {
        self.tracking = Some(tracking);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Fill every unset field of `self` from `lower`.
    ///
    /// Extra entries merge key by key, `self` winning on collision.
    pub fn merge_under(mut self, lower: WidgetOptions) -> Self {
        macro_rules! fill {
            ($($field:ident),* $(,)?) => {
                $(if self.$field.is_none() {
                    self.$field = lower.$field;
                })*
            };
        }
        fill!(
            widget_type,
            choices,
            allow_multiple,
            nullable,
            bind,
            min,
            max,
            step,
            visible,
            enabled,
            label,
            tooltip,
            gui_only,
            mode,
            base,
            text,
            orientation,
            min_pos,
            max_pos,
            tracking,
        );
        for (key, value) in lower.extra {
            self.extra.entry(key).or_insert(value);
        }
        self
    }
}
