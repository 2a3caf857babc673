//! Error types for widget resolution, construction and binding.
//!
//! Each layer has its own error enum; [`AutoguiError`] unifies them for
//! operations that cross layers, such as building a widget from a parameter.

use std::path::PathBuf;

use horizon_autogui_core::CoreError;

/// Result type alias for operations that cross layers.
pub type Result<T> = std::result::Result<T, AutoguiError>;

/// Boxed error returned by user callables.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while picking a widget class.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    /// No widget matches the type and unknown types are not tolerated.
    #[error("no widget found for type {type_name} and annotation {annotation}")]
    NoWidgetFound { type_name: String, annotation: String },

    /// A widget type was requested by a name nothing provides.
    #[error("could not find a widget class named '{0}'")]
    MissingWidget(String),

    /// The default value is not one of the available choices.
    #[error("default value {value} is not a valid choice; must be one of [{choices}]")]
    InvalidDefault { value: String, choices: String },

    /// A forward reference in the annotation could not be resolved.
    #[error(transparent)]
    Annotation(#[from] CoreError),
}

/// Errors raised by the type registry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    /// The registration would change nothing.
    #[error(
        "at least one of `widget_type`, `return_callback`, `bind` or `choices` must be \
         provided when registering {type_name}"
    )]
    EmptyRegistration { type_name: String },

    /// The type names something no namespace knows.
    #[error(transparent)]
    UnresolvedType(#[from] CoreError),
}

/// Errors raised by widget wrappers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WidgetError {
    /// A ranged widget was given a value outside `[min, max]`.
    #[error("value {value} is outside of the allowed range: ({min}, {max})")]
    OutOfRange { value: String, min: f64, max: f64 },

    /// A categorical widget was given a value that is not a choice.
    #[error("{value} is not a valid choice. must be in [{choices}]")]
    InvalidChoice { value: String, choices: String },

    /// A value of the wrong type for the widget.
    #[error("{widget_type} '{name}' cannot hold {value}: expected {expected}")]
    TypeMismatch {
        widget_type: String,
        name: String,
        value: String,
        expected: &'static str,
    },

    /// `None` given to a widget that is not nullable.
    #[error("{widget_type} '{name}' is not nullable")]
    NotNullable { widget_type: String, name: String },

    /// An empty widget has never been given a value.
    #[error("{widget_type} '{name}' has no value")]
    NoValue { widget_type: String, name: String },

    /// A bound callback read the value of the widget it is bound to.
    #[error(
        "recursion in callback bound to <{widget_type} name='{name}'>. If you need to \
         access the widget's value in your bound callback, use `get_value()`"
    )]
    RecursiveBinding { widget_type: String, name: String },

    /// The backend produced a widget lacking members its class requires.
    #[error("{class} does not implement {protocol}: missing {}", .missing.join(", "))]
    MissingProtocol {
        class: String,
        protocol: &'static str,
        missing: Vec<&'static str>,
    },

    /// The backend has no widget for the requested class.
    #[error("backend '{backend}' has no widget named '{class}'")]
    MissingWidget { backend: String, class: String },

    /// No choice carries the given label.
    #[error("no choice named '{0}'")]
    NoSuchChoice(String),

    /// Editor text is not a literal.
    #[error(transparent)]
    Literal(#[from] CoreError),
}

impl WidgetError {
    /// Create an out-of-range error.
    pub fn out_of_range(value: impl ToString, min: f64, max: f64) -> Self {
        Self::OutOfRange {
            value: value.to_string(),
            min,
            max,
        }
    }
}

/// Errors raised by containers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContainerError {
    /// No child carries the given name.
    #[error("container has no widget named '{0}'")]
    NoWidget(String),

    /// A positional index past the end.
    #[error("widget index {index} out of range for container of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Layout is fixed at construction.
    #[error("it is not possible to change layout after construction")]
    LayoutImmutable,

    /// A child widget rejected a value.
    #[error(transparent)]
    Widget(#[from] WidgetError),
}

/// Errors raised when binding arguments to a signature.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignatureError {
    #[error("missing a required argument: '{0}'")]
    MissingArgument(String),

    #[error("too many positional arguments")]
    TooManyPositional,

    #[error("got an unexpected keyword argument '{0}'")]
    UnexpectedKeyword(String),

    #[error("multiple values for argument '{0}'")]
    MultipleValues(String),

    #[error("'{0}' parameter is positional only, but was passed as a keyword")]
    PositionalOnly(String),

    /// Parameter options were given for names the signature does not have.
    #[error(
        "received parameter option key(s) {names:?} that do not match parameters in the \
         provided function: {signature}"
    )]
    UnknownParamOptions {
        names: Vec<String>,
        signature: String,
    },
}

/// Errors raised when calling a function GUI.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// A required argument has no widget value and no binding.
    #[error("{0}")]
    MissingBinding(String),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// The result widget rejected the returned value.
    #[error(transparent)]
    Widget(#[from] WidgetError),

    /// Writing call arguments back into the widgets failed.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// The wrapped function failed.
    #[error("call to '{function}' failed: {source}")]
    Function {
        function: String,
        #[source]
        source: BoxError,
    },
}

/// Errors raised while saving or restoring widget state.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("widget state file does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to access widget state at '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed widget state: {0}")]
    Json(#[from] serde_json::Error),

    /// A widget value could not be read.
    #[error(transparent)]
    Widget(#[from] WidgetError),

    /// No per-user cache directory exists on this platform.
    #[error("no cache directory available for persisted state")]
    NoCacheDir,
}

impl PersistError {
    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Any error raised by this crate.
#[derive(Debug, thiserror::Error)]
pub enum AutoguiError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Widget(#[from] WidgetError),
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error(transparent)]
    Call(#[from] CallError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error(transparent)]
    Core(#[from] CoreError),
}
