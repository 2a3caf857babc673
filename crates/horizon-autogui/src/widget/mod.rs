//! Widget wrappers.
//!
//! A wrapper owns one backend widget and exposes it through the [`Widget`]
//! trait. Richer capabilities are reached through the `as_*` accessors:
//!
//! - [`ValueWidget`]: a value, change notification and bound values
//! - [`RangedWidget`]: numeric bounds and a step
//! - [`CategoricalWidget`]: choices
//! - [`ButtonWidget`]: clickable, with its own text
//!
//! [`create_widget`] resolves the class for a value and annotation and builds
//! the matching wrapper.

mod base;
mod button;
mod categorical;
mod create;
mod kind;
mod ranged;
mod value;

pub use base::{PlainWidget, Widget, WidgetBase, WidgetInit};
pub use button::ButtonWidget;
pub use categorical::CategoricalWidget;
pub use create::{WidgetRequest, create_widget};
pub use kind::{UnknownWidgetKind, ValueKind, WidgetClass, WidgetKind};
pub use ranged::{
    DEFAULT_MAX, DEFAULT_MIN, PositionTransform, RangedWidget, TransformState, init_range,
};
pub use value::{ValueAccess, ValueCodec, ValueWidget};
