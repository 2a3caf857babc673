//! Core primitives for Horizon AutoGUI.
//!
//! This crate provides the building blocks the widget resolution engine is
//! written against:
//!
//! - **Signal/Slot System**: Type-safe change notification ([`Signal`])
//! - **Values**: Dynamically-typed widget values ([`Value`], [`EnumType`])
//! - **Annotations**: Type descriptions with subtyping ([`TypeSpec`], [`ClassType`])
//! - **Literal Codec**: Safe text to value parsing ([`PythonLiteral`])
//!
//! # Signal/Slot Example
//!
//! ```
//! use horizon_autogui_core::{Signal, Value};
//!
//! let changed = Signal::<Value>::new();
//! let conn = changed.connect(|value| {
//!     println!("value is now {value}");
//! });
//!
//! changed.emit(Value::Int(3));
//! changed.disconnect(conn);
//! ```

pub mod error;
pub mod literal;
pub mod logging;
pub mod signal;
pub mod types;
pub mod value;

pub use error::{CoreError, Result};
pub use literal::{LiteralCodec, PythonLiteral};
pub use signal::{BlockedGuard, ConnectionGuard, ConnectionId, Signal};
pub use types::{ClassType, TypeNamespace, TypeSpec};
pub use value::{EnumMember, EnumType, ObjectValue, Value};
