//! Horizon AutoGUI - widgets resolved from types.
//!
//! Given a value and a type annotation, this crate picks a widget class,
//! builds it through a [`Backend`], and groups widgets into [`Container`]s
//! whose state can be read back as a [`Signature`]. A [`FunctionGui`] wraps a
//! function so that calling it uses the current widget values.
//!
//! The pieces, bottom up:
//!
//! - **Registry**: user registrations from types to widgets ([`TypeRegistry`])
//! - **Resolver**: the rules picking a widget class ([`Resolver`])
//! - **Widgets**: wrappers over backend widgets ([`Widget`], [`create_widget`])
//! - **Containers**: ordered, named children ([`Container`])
//! - **Function GUIs**: callable containers ([`FunctionGuiBuilder`])
//!
//! # Example
//!
//! ```
//! use horizon_autogui::{Resolver, TypeRegistry, TypeSpec, WidgetKind, WidgetOptions};
//!
//! let registry = TypeRegistry::new();
//! let resolver = Resolver::new(&registry);
//! let found = resolver
//!     .resolve(None, &TypeSpec::Int, &WidgetOptions::new(), false)
//!     .unwrap();
//! assert_eq!(found.class.kind(), Some(WidgetKind::SpinBox));
//! ```

pub mod backend;
pub mod choices;
pub mod container;
pub mod docstring;
pub mod error;
pub mod function_gui;
pub mod options;
pub mod persist;
pub mod protocols;
pub mod registry;
pub mod resolver;
pub mod signature;
pub mod widget;

pub use horizon_autogui_core::{
    ClassType, ConnectionId, EnumMember, EnumType, LiteralCodec, PythonLiteral, Signal, TypeSpec,
    Value,
};

pub use backend::{Backend, HeadlessBackend, default_backend, set_default_backend};
pub use choices::{Choice, ChoicesProvider, ChoicesSource, WidgetContext};
pub use container::{Container, ContainerConfig};
pub use docstring::{inject_tooltips, param_descriptions};
pub use error::{
    AutoguiError, BoxError, CallError, ContainerError, PersistError, RegistryError, ResolveError,
    Result, SignatureError, WidgetError,
};
pub use function_gui::{CallArgs, FunctionGui, FunctionGuiBuilder};
pub use options::{BoundValue, FileMode, Orientation, StepSize, WidgetOptions, WidgetRef};
pub use persist::{persist_path, user_cache_dir};
pub use protocols::{BackendWidget, CustomWidgetClass, Layout, Protocol};
pub use registry::{
    LookupPolicy, RegisteredType, Registration, ReturnCallback, TypeDef, TypeRegistration,
    TypeRegistry,
};
pub use resolver::{Resolver, WidgetDescriptor, match_type, resolve};
pub use signature::{
    BoundArguments, FunctionBody, FunctionSpec, Parameter, ParameterKind, Signature,
};
pub use widget::{
    ButtonWidget, CategoricalWidget, RangedWidget, ValueAccess, ValueWidget, Widget, WidgetClass,
    WidgetKind, WidgetRequest, create_widget,
};
