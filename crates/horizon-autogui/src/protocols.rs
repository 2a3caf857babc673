//! Capability contracts a widget backend implements.
//!
//! The wrapper layer drives backend widgets exclusively through these traits:
//! get/set a value, register a change callback, toggle visibility, and for
//! ranged and categorical widgets, their bounds and choices. A backend hands
//! out widgets as a [`BackendWidget`], which records the richest protocol the
//! widget implements. Before a wrapper is built, [`assert_protocol`] checks
//! the widget against the protocol the requested class needs and reports
//! every missing member by name.

use std::fmt;
use std::sync::Arc;

use horizon_autogui_core::Value;

use crate::backend::Backend;
use crate::choices::Choice;
use crate::error::WidgetError;
use crate::options::WidgetOptions;

/// Identifier of a backend widget, unique per backend.
pub type NativeId = u64;

/// Callback a backend invokes with the new raw value after every change.
pub type ChangeCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// Container arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    #[default]
    Vertical,
    Horizontal,
}

/// Members every backend widget provides.
pub trait WidgetProtocol: Send + Sync {
    fn native_id(&self) -> NativeId;
    fn visible(&self) -> bool;
    fn set_visible(&self, visible: bool);
    fn enabled(&self) -> bool;
    fn set_enabled(&self, enabled: bool);
    fn tooltip(&self) -> Option<String>;
    fn set_tooltip(&self, tooltip: Option<String>);
    /// Re-parent the native widget; `None` detaches it.
    fn set_parent(&self, parent: Option<NativeId>);
    fn parent(&self) -> Option<NativeId>;
    fn min_width(&self) -> u32;
    fn set_min_width(&self, width: u32);
    /// Release native resources.
    fn close(&self);
}

/// A widget holding a value.
pub trait ValueWidgetProtocol: WidgetProtocol {
    fn value(&self) -> Value;
    /// Store `value`, invoking change callbacks if it differs.
    fn set_value(&self, value: Value);
    fn bind_change_callback(&self, callback: ChangeCallback);
}

/// A value widget bounded by a numeric range.
pub trait RangedWidgetProtocol: ValueWidgetProtocol {
    fn min(&self) -> f64;
    fn set_min(&self, min: f64);
    fn max(&self) -> f64;
    fn set_max(&self, max: f64);
    fn step(&self) -> f64;
    fn set_step(&self, step: f64);
    fn adaptive_step(&self) -> bool;
    fn set_adaptive_step(&self, adaptive: bool);
}

/// A value widget selecting among labelled choices.
pub trait CategoricalWidgetProtocol: ValueWidgetProtocol {
    fn choices(&self) -> Vec<Choice>;
    fn set_choices(&self, choices: Vec<Choice>);
    fn current_choice(&self) -> Option<String>;
    fn count(&self) -> usize;
    /// Data of the first choice labelled `label`.
    fn get_choice(&self, label: &str) -> Option<Value>;
    /// Replace the data of `label`, appending it if absent.
    fn set_choice(&self, label: &str, data: Value);
    fn del_choice(&self, label: &str);
}

/// A clickable widget with its own text.
pub trait ButtonWidgetProtocol: ValueWidgetProtocol {
    fn text(&self) -> String;
    fn set_text(&self, text: &str);
    /// Press the button as a user would.
    fn click(&self);
}

/// A widget laying out native children.
pub trait ContainerProtocol: WidgetProtocol {
    fn layout(&self) -> Layout;
    fn insert_widget(&self, index: usize, child: &dyn WidgetProtocol);
    fn remove_widget(&self, child: &dyn WidgetProtocol);
    fn children(&self) -> Vec<NativeId>;
}

/// Capability protocols, from least to most specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Widget,
    ValueWidget,
    RangedWidget,
    CategoricalWidget,
    ButtonWidget,
    Container,
}

const WIDGET_MEMBERS: &[&str] = &[
    "native_id",
    "visible",
    "set_visible",
    "enabled",
    "set_enabled",
    "tooltip",
    "set_tooltip",
    "set_parent",
    "parent",
    "min_width",
    "set_min_width",
    "close",
];
const VALUE_MEMBERS: &[&str] = &["value", "set_value", "bind_change_callback"];
const RANGED_MEMBERS: &[&str] = &[
    "min",
    "set_min",
    "max",
    "set_max",
    "step",
    "set_step",
    "adaptive_step",
    "set_adaptive_step",
];
const CATEGORICAL_MEMBERS: &[&str] = &[
    "choices",
    "set_choices",
    "current_choice",
    "count",
    "get_choice",
    "set_choice",
    "del_choice",
];
const BUTTON_MEMBERS: &[&str] = &["text", "set_text", "click"];
const CONTAINER_MEMBERS: &[&str] = &["layout", "insert_widget", "remove_widget", "children"];

impl Protocol {
    pub fn name(self) -> &'static str {
        match self {
            Self::Widget => "WidgetProtocol",
            Self::ValueWidget => "ValueWidgetProtocol",
            Self::RangedWidget => "RangedWidgetProtocol",
            Self::CategoricalWidget => "CategoricalWidgetProtocol",
            Self::ButtonWidget => "ButtonWidgetProtocol",
            Self::Container => "ContainerProtocol",
        }
    }

    /// The protocol this one extends.
    pub fn parent(self) -> Option<Protocol> {
        match self {
            Self::Widget => None,
            Self::ValueWidget | Self::Container => Some(Self::Widget),
            Self::RangedWidget | Self::CategoricalWidget | Self::ButtonWidget => {
                Some(Self::ValueWidget)
            }
        }
    }

    /// Members declared by this protocol itself.
    fn own_members(self) -> &'static [&'static str] {
        match self {
            Self::Widget => WIDGET_MEMBERS,
            Self::ValueWidget => VALUE_MEMBERS,
            Self::RangedWidget => RANGED_MEMBERS,
            Self::CategoricalWidget => CATEGORICAL_MEMBERS,
            Self::ButtonWidget => BUTTON_MEMBERS,
            Self::Container => CONTAINER_MEMBERS,
        }
    }

    /// All members, including inherited ones.
    pub fn members(self) -> Vec<&'static str> {
        let mut chain = vec![self];
        while let Some(parent) = chain.last().and_then(|p| p.parent()) {
            chain.push(parent);
        }
        chain.iter().rev().flat_map(|p| p.own_members()).copied().collect()
    }

    /// Whether a widget implementing `self` also implements `other`.
    pub fn implies(self, other: Protocol) -> bool {
        let mut current = Some(self);
        while let Some(p) = current {
            if p == other {
                return true;
            }
            current = p.parent();
        }
        false
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A backend widget, tagged with the richest protocol it implements.
#[derive(Clone)]
pub enum BackendWidget {
    Widget(Arc<dyn WidgetProtocol>),
    Value(Arc<dyn ValueWidgetProtocol>),
    Ranged(Arc<dyn RangedWidgetProtocol>),
    Categorical(Arc<dyn CategoricalWidgetProtocol>),
    Button(Arc<dyn ButtonWidgetProtocol>),
    Container(Arc<dyn ContainerProtocol>),
}

impl BackendWidget {
    pub fn protocol(&self) -> Protocol {
        match self {
            Self::Widget(_) => Protocol::Widget,
            Self::Value(_) => Protocol::ValueWidget,
            Self::Ranged(_) => Protocol::RangedWidget,
            Self::Categorical(_) => Protocol::CategoricalWidget,
            Self::Button(_) => Protocol::ButtonWidget,
            Self::Container(_) => Protocol::Container,
        }
    }

    /// The widget through its base protocol.
    pub fn widget(&self) -> Arc<dyn WidgetProtocol> {
        match self {
            Self::Widget(w) => w.clone(),
            Self::Value(w) => w.clone(),
            Self::Ranged(w) => w.clone(),
            Self::Categorical(w) => w.clone(),
            Self::Button(w) => w.clone(),
            Self::Container(w) => w.clone(),
        }
    }

    /// The widget through its value protocol, if it has one.
    pub fn value_widget(&self) -> Option<Arc<dyn ValueWidgetProtocol>> {
        match self {
            Self::Value(w) => Some(w.clone()),
            Self::Ranged(w) => Some(w.clone()),
            Self::Categorical(w) => Some(w.clone()),
            Self::Button(w) => Some(w.clone()),
            Self::Widget(_) | Self::Container(_) => None,
        }
    }
}

impl fmt::Debug for BackendWidget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendWidget")
            .field("protocol", &self.protocol())
            .field("native_id", &self.widget().native_id())
            .finish()
    }
}

/// Check that `widget` implements `required`.
///
/// The error names every member of `required` the widget does not provide.
pub fn assert_protocol(
    class: &str,
    widget: &BackendWidget,
    required: Protocol,
) -> Result<(), WidgetError> {
    let provided = widget.protocol();
    if provided.implies(required) {
        return Ok(());
    }
    let have = provided.members();
    let missing: Vec<&'static str> = required
        .members()
        .into_iter()
        .filter(|m| !have.contains(m))
        .collect();
    tracing::debug!(
        target: horizon_autogui_core::logging::targets::WIDGET,
        class,
        protocol = required.name(),
        ?missing,
        "backend widget does not satisfy protocol"
    );
    Err(WidgetError::MissingProtocol {
        class: class.to_string(),
        protocol: required.name(),
        missing,
    })
}

/// A widget class supplied by the application.
///
/// Custom classes are registered by dotted name in the type registry's
/// widget namespace, or passed directly as a `widget_type` option.
pub trait CustomWidgetClass: Send + Sync {
    /// Dotted class name, e.g. `myapp.ColorPicker`.
    fn name(&self) -> &str;

    /// The protocol instances of this class implement.
    fn protocol(&self) -> Protocol;

    /// Build the native widget.
    fn build(
        &self,
        backend: &dyn Backend,
        options: &WidgetOptions,
    ) -> Result<BackendWidget, WidgetError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_hierarchy() {
        assert!(Protocol::RangedWidget.implies(Protocol::ValueWidget));
        assert!(Protocol::RangedWidget.implies(Protocol::Widget));
        assert!(!Protocol::ValueWidget.implies(Protocol::RangedWidget));
        assert!(!Protocol::Container.implies(Protocol::ValueWidget));
    }

    #[test]
    fn test_members_include_inherited() {
        let members = Protocol::ButtonWidget.members();
        assert!(members.contains(&"native_id"));
        assert!(members.contains(&"set_value"));
        assert!(members.contains(&"click"));
        assert!(!members.contains(&"set_min"));
    }
}
