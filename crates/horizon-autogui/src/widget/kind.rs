//! Builtin widget kinds.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::protocols::{CustomWidgetClass, Protocol};

/// The builtin widget classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    Label,
    LineEdit,
    Password,
    LiteralEvalLineEdit,
    TextEdit,
    DateEdit,
    TimeEdit,
    DateTimeEdit,
    FileEdit,
    RangeEdit,
    SliceEdit,
    ListEdit,
    TupleEdit,
    Table,
    EmptyWidget,
    PushButton,
    CheckBox,
    RadioButton,
    SpinBox,
    FloatSpinBox,
    Slider,
    FloatSlider,
    ProgressBar,
    RangeSlider,
    FloatRangeSlider,
    LogSlider,
    ComboBox,
    Select,
    RadioButtons,
    Container,
}

/// What a value widget holds, used to coerce assigned values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Anything goes.
    Any,
    Bool,
    Int,
    Float,
    Str,
    Path,
    Date,
    Time,
    DateTime,
    /// A `(low, high)` pair of ints.
    IntPair,
    /// A `(low, high)` pair of floats.
    FloatPair,
    Range,
    Slice,
    /// A list of values.
    List,
    /// A tuple of values.
    Tuple,
}

impl WidgetKind {
    /// Every builtin kind, in declaration order.
    pub const ALL: [WidgetKind; 30] = [
        Self::Label,
        Self::LineEdit,
        Self::Password,
        Self::LiteralEvalLineEdit,
        Self::TextEdit,
        Self::DateEdit,
        Self::TimeEdit,
        Self::DateTimeEdit,
        Self::FileEdit,
        Self::RangeEdit,
        Self::SliceEdit,
        Self::ListEdit,
        Self::TupleEdit,
        Self::Table,
        Self::EmptyWidget,
        Self::PushButton,
        Self::CheckBox,
        Self::RadioButton,
        Self::SpinBox,
        Self::FloatSpinBox,
        Self::Slider,
        Self::FloatSlider,
        Self::ProgressBar,
        Self::RangeSlider,
        Self::FloatRangeSlider,
        Self::LogSlider,
        Self::ComboBox,
        Self::Select,
        Self::RadioButtons,
        Self::Container,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Label => "Label",
            Self::LineEdit => "LineEdit",
            Self::Password => "Password",
            Self::LiteralEvalLineEdit => "LiteralEvalLineEdit",
            Self::TextEdit => "TextEdit",
            Self::DateEdit => "DateEdit",
            Self::TimeEdit => "TimeEdit",
            Self::DateTimeEdit => "DateTimeEdit",
            Self::FileEdit => "FileEdit",
            Self::RangeEdit => "RangeEdit",
            Self::SliceEdit => "SliceEdit",
            Self::ListEdit => "ListEdit",
            Self::TupleEdit => "TupleEdit",
            Self::Table => "Table",
            Self::EmptyWidget => "EmptyWidget",
            Self::PushButton => "PushButton",
            Self::CheckBox => "CheckBox",
            Self::RadioButton => "RadioButton",
            Self::SpinBox => "SpinBox",
            Self::FloatSpinBox => "FloatSpinBox",
            Self::Slider => "Slider",
            Self::FloatSlider => "FloatSlider",
            Self::ProgressBar => "ProgressBar",
            Self::RangeSlider => "RangeSlider",
            Self::FloatRangeSlider => "FloatRangeSlider",
            Self::LogSlider => "LogSlider",
            Self::ComboBox => "ComboBox",
            Self::Select => "Select",
            Self::RadioButtons => "RadioButtons",
            Self::Container => "Container",
        }
    }

    /// The protocol backend widgets of this kind must implement.
    pub fn protocol(self) -> Protocol {
        match self {
            Self::PushButton | Self::CheckBox | Self::RadioButton => Protocol::ButtonWidget,
            Self::SpinBox
            | Self::FloatSpinBox
            | Self::Slider
            | Self::FloatSlider
            | Self::ProgressBar
            | Self::RangeSlider
            | Self::FloatRangeSlider
            | Self::LogSlider => Protocol::RangedWidget,
            Self::ComboBox | Self::Select | Self::RadioButtons => Protocol::CategoricalWidget,
            Self::Container => Protocol::Container,
            _ => Protocol::ValueWidget,
        }
    }

    /// What values of this kind hold.
    pub fn value_kind(self) -> ValueKind {
        match self {
            Self::Label | Self::LineEdit | Self::Password | Self::TextEdit => ValueKind::Str,
            Self::PushButton | Self::CheckBox | Self::RadioButton => ValueKind::Bool,
            Self::SpinBox | Self::Slider | Self::ProgressBar => ValueKind::Int,
            Self::FloatSpinBox | Self::FloatSlider | Self::LogSlider => ValueKind::Float,
            Self::RangeSlider => ValueKind::IntPair,
            Self::FloatRangeSlider => ValueKind::FloatPair,
            Self::DateEdit => ValueKind::Date,
            Self::TimeEdit => ValueKind::Time,
            Self::DateTimeEdit => ValueKind::DateTime,
            Self::FileEdit => ValueKind::Path,
            Self::RangeEdit => ValueKind::Range,
            Self::SliceEdit => ValueKind::Slice,
            Self::ListEdit => ValueKind::List,
            Self::TupleEdit => ValueKind::Tuple,
            Self::LiteralEvalLineEdit
            | Self::Table
            | Self::EmptyWidget
            | Self::ComboBox
            | Self::Select
            | Self::RadioButtons
            | Self::Container => ValueKind::Any,
        }
    }

    /// Whether the value is a list of selections rather than one.
    pub fn is_multi(self) -> bool {
        matches!(self, Self::Select)
    }

    /// Whether the position maps onto the value through a transform.
    pub fn is_transformed(self) -> bool {
        matches!(self, Self::LogSlider)
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a name is not a builtin widget kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown widget kind '{0}'")]
pub struct UnknownWidgetKind(pub String);

impl FromStr for WidgetKind {
    type Err = UnknownWidgetKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| UnknownWidgetKind(s.to_string()))
    }
}

/// A resolved widget class: builtin or user supplied.
#[derive(Clone)]
pub enum WidgetClass {
    Builtin(WidgetKind),
    Custom(Arc<dyn CustomWidgetClass>),
}

impl WidgetClass {
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin(kind) => kind.name(),
            Self::Custom(class) => class.name(),
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            Self::Builtin(kind) => kind.protocol(),
            Self::Custom(class) => class.protocol(),
        }
    }

    pub fn kind(&self) -> Option<WidgetKind> {
        match self {
            Self::Builtin(kind) => Some(*kind),
            Self::Custom(_) => None,
        }
    }
}

impl PartialEq for WidgetClass {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq<WidgetKind> for WidgetClass {
    fn eq(&self, other: &WidgetKind) -> bool {
        matches!(self, Self::Builtin(k) if k == other)
    }
}

impl fmt::Debug for WidgetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(kind) => write!(f, "Builtin({kind})"),
            Self::Custom(class) => write!(f, "Custom({})", class.name()),
        }
    }
}

impl From<WidgetKind> for WidgetClass {
    fn from(kind: WidgetKind) -> Self {
        Self::Builtin(kind)
    }
}
