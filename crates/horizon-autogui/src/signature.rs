//! Call signatures linked to widgets.
//!
//! A [`Parameter`] carries a name, a kind, an optional default, an annotation
//! and the widget options used when a widget is created for it. A
//! [`Signature`] is an ordered list of parameters; it can create a container
//! of widgets ([`Signature::to_container`]) and a container can synthesize
//! one back from its children.
//!
//! Arguments are bound to a signature with Python's rules:
//!
//! ```
//! use horizon_autogui::{Parameter, ParameterKind, Signature, Value};
//! use indexmap::IndexMap;
//!
//! let sig = Signature::new([
//!     Parameter::new("a"),
//!     Parameter::new("b").with_default(2),
//!     Parameter::new("c").with_kind(ParameterKind::KeywordOnly).with_default("x"),
//! ]);
//! assert_eq!(sig.to_string(), "(a, b=2, *, c='x')");
//!
//! let mut bound = sig.bind(&[Value::Int(1)], &IndexMap::new()).unwrap();
//! bound.apply_defaults();
//! assert_eq!(bound.get("b"), Some(&Value::Int(2)));
//! ```

use std::fmt;
use std::sync::Arc;

use horizon_autogui_core::{TypeSpec, Value};
use indexmap::IndexMap;

use crate::container::{Container, ContainerConfig};
use crate::error::{BoxError, Result, SignatureError, WidgetError};
use crate::options::WidgetOptions;
use crate::widget::{Widget, WidgetRequest, create_widget};

/// How an argument binds to a parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParameterKind {
    PositionalOnly,
    #[default]
    PositionalOrKeyword,
    VarPositional,
    KeywordOnly,
    VarKeyword,
}

impl ParameterKind {
    pub fn description(self) -> &'static str {
        match self {
            Self::PositionalOnly => "positional-only",
            Self::PositionalOrKeyword => "positional or keyword",
            Self::VarPositional => "variadic positional",
            Self::KeywordOnly => "keyword-only",
            Self::VarKeyword => "variadic keyword",
        }
    }

    fn accepts_positional(self) -> bool {
        matches!(self, Self::PositionalOnly | Self::PositionalOrKeyword)
    }
}

/// One parameter of a signature.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
    /// `None` when the parameter is required.
    pub default: Option<Value>,
    pub annotation: TypeSpec,
    /// Options for the widget representing this parameter.
    pub options: WidgetOptions,
    /// Fail instead of falling back to a literal editor for unknown types.
    pub raise_on_unknown: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParameterKind::default(),
            default: None,
            annotation: TypeSpec::Empty,
            options: WidgetOptions::default(),
            raise_on_unknown: false,
        }
    }

    pub fn with_kind(mut self, kind: ParameterKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_annotation(mut self, annotation: TypeSpec) -> Self {
        self.annotation = annotation;
        self
    }

    pub fn with_options(mut self, options: WidgetOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_raise_on_unknown(mut self, raise: bool) -> Self {
        self.raise_on_unknown = raise;
        self
    }

    /// Describe a widget as a parameter, using its value as the default.
    ///
    /// Fails if the widget's value cannot be read.
    pub fn from_widget(widget: &dyn Widget) -> std::result::Result<Self, WidgetError> {
        let default = match widget.as_value() {
            Some(value) if value.has_default() => Some(value.value()?),
            _ => None,
        };
        Ok(Self {
            name: widget.name().to_string(),
            kind: widget.param_kind(),
            default,
            annotation: widget.annotation().unwrap_or(TypeSpec::Empty),
            options: widget.options(),
            raise_on_unknown: false,
        })
    }

    /// The request building this parameter's widget.
    pub fn widget_request(&self) -> WidgetRequest {
        let mut request = WidgetRequest::new()
            .with_name(&self.name)
            .with_annotation(self.annotation.clone())
            .with_options(self.options.clone())
            .with_param_kind(self.kind)
            .with_raise_on_unknown(self.raise_on_unknown);
        if let Some(default) = &self.default {
            request = request.with_value(default.clone());
        }
        request
    }

    /// Create the widget for this parameter.
    pub fn to_widget(&self) -> Result<Arc<dyn Widget>> {
        create_widget(&self.widget_request())
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParameterKind::VarPositional => f.write_str("*")?,
            ParameterKind::VarKeyword => f.write_str("**")?,
            _ => {}
        }
        f.write_str(&self.name)?;
        let annotated = !self.annotation.is_empty();
        if annotated {
            write!(f, ": {}", self.annotation)?;
        }
        if let Some(default) = &self.default {
            if annotated {
                write!(f, " = {default}")?;
            } else {
                write!(f, "={default}")?;
            }
        }
        Ok(())
    }
}

/// An ordered list of parameters and a return annotation.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    parameters: Vec<Parameter>,
    return_annotation: TypeSpec,
}

impl Signature {
    pub fn new(parameters: impl IntoIterator<Item = Parameter>) -> Self {
        Self {
            parameters: parameters.into_iter().collect(),
            return_annotation: TypeSpec::Empty,
        }
    }

    pub fn with_return_annotation(mut self, annotation: TypeSpec) -> Self {
        self.return_annotation = annotation;
        self
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.parameters.iter_mut().find(|p| p.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.name.as_str())
    }

    pub fn return_annotation(&self) -> &TypeSpec {
        &self.return_annotation
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Merge per-parameter widget options into the parameters.
    ///
    /// Fails if an entry names a parameter this signature does not have.
    pub fn with_param_options(
        mut self,
        param_options: &IndexMap<String, WidgetOptions>,
    ) -> std::result::Result<Self, SignatureError> {
        let unknown: Vec<String> = param_options
            .keys()
            .filter(|name| self.get(name).is_none())
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(SignatureError::UnknownParamOptions {
                names: unknown,
                signature: self.to_string(),
            });
        }
        for param in &mut self.parameters {
            if let Some(options) = param_options.get(&param.name) {
                param.options = options.clone().merge_under(std::mem::take(&mut param.options));
            }
        }
        Ok(self)
    }

    /// Create one widget per parameter, in order.
    pub fn widgets(&self) -> Result<Vec<Arc<dyn Widget>>> {
        self.parameters.iter().map(Parameter::to_widget).collect()
    }

    /// Create a container holding a widget for each parameter.
    pub fn to_container(&self, config: ContainerConfig) -> Result<Arc<Container>> {
        Ok(Container::new(config, self.widgets()?)?)
    }

    /// Bind arguments, requiring every parameter without a default.
    pub fn bind(
        &self,
        args: &[Value],
        kwargs: &IndexMap<String, Value>,
    ) -> std::result::Result<BoundArguments, SignatureError> {
        self.bind_impl(args, kwargs, false)
    }

    /// Bind arguments, allowing required parameters to be missing.
    pub fn bind_partial(
        &self,
        args: &[Value],
        kwargs: &IndexMap<String, Value>,
    ) -> std::result::Result<BoundArguments, SignatureError> {
        self.bind_impl(args, kwargs, true)
    }

    fn bind_impl(
        &self,
        args: &[Value],
        kwargs: &IndexMap<String, Value>,
        partial: bool,
    ) -> std::result::Result<BoundArguments, SignatureError> {
        let mut arguments = IndexMap::new();
        let mut params = self.parameters.iter().peekable();

        for (index, arg) in args.iter().enumerate() {
            let Some(param) = params.peek() else {
                return Err(SignatureError::TooManyPositional);
            };
            match param.kind {
                kind if kind.accepts_positional() => {
                    arguments.insert(param.name.clone(), arg.clone());
                    params.next();
                }
                ParameterKind::VarPositional => {
                    arguments.insert(param.name.clone(), Value::Tuple(args[index..].to_vec()));
                    params.next();
                    break;
                }
                _ => return Err(SignatureError::TooManyPositional),
            }
        }

        for name in kwargs.keys() {
            if arguments.contains_key(name) {
                return Err(SignatureError::MultipleValues(name.clone()));
            }
        }

        let mut remaining = kwargs.clone();
        let mut var_keyword = None;
        for param in params {
            match param.kind {
                ParameterKind::VarPositional => continue,
                ParameterKind::VarKeyword => {
                    var_keyword = Some(param.name.clone());
                    continue;
                }
                _ => {}
            }
            match remaining.shift_remove(&param.name) {
                Some(_) if param.kind == ParameterKind::PositionalOnly => {
                    return Err(SignatureError::PositionalOnly(param.name.clone()));
                }
                Some(value) => {
                    arguments.insert(param.name.clone(), value);
                }
                None if !partial && param.default.is_none() => {
                    return Err(SignatureError::MissingArgument(param.name.clone()));
                }
                None => {}
            }
        }

        if !remaining.is_empty() {
            match var_keyword {
                Some(name) => {
                    let items = remaining
                        .into_iter()
                        .map(|(k, v)| (Value::Str(k), v))
                        .collect();
                    arguments.insert(name, Value::Dict(items));
                }
                None => {
                    let name = remaining.keys().next().cloned().unwrap_or_default();
                    return Err(SignatureError::UnexpectedKeyword(name));
                }
            }
        }

        Ok(BoundArguments {
            arguments,
            signature: self.clone(),
        })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        let mut first = true;
        let mut separator = |f: &mut fmt::Formatter<'_>| -> fmt::Result {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            Ok(())
        };
        let mut kw_marker_needed = true;
        for (i, param) in self.parameters.iter().enumerate() {
            if param.kind == ParameterKind::VarPositional {
                kw_marker_needed = false;
            }
            if param.kind == ParameterKind::KeywordOnly && kw_marker_needed {
                separator(f)?;
                f.write_str("*")?;
                kw_marker_needed = false;
            }
            separator(f)?;
            write!(f, "{param}")?;
            let next_kind = self.parameters.get(i + 1).map(|p| p.kind);
            if param.kind == ParameterKind::PositionalOnly
                && next_kind != Some(ParameterKind::PositionalOnly)
            {
                separator(f)?;
                f.write_str("/")?;
            }
        }
        f.write_str(")")?;
        if !self.return_annotation.is_empty() {
            write!(f, " -> {}", self.return_annotation)?;
        }
        Ok(())
    }
}

/// Arguments bound to a signature's parameters.
#[derive(Debug, Clone)]
pub struct BoundArguments {
    arguments: IndexMap<String, Value>,
    signature: Signature,
}

impl BoundArguments {
    /// Fill unbound parameters with their defaults.
    ///
    /// Variadic parameters get an empty tuple or dict.
    pub fn apply_defaults(&mut self) {
        let mut ordered = IndexMap::with_capacity(self.signature.len());
        for param in self.signature.parameters() {
            let value = match self.arguments.shift_remove(&param.name) {
                Some(value) => value,
                None => match (&param.default, param.kind) {
                    (Some(default), _) => default.clone(),
                    (None, ParameterKind::VarPositional) => Value::Tuple(Vec::new()),
                    (None, ParameterKind::VarKeyword) => Value::Dict(Vec::new()),
                    (None, _) => continue,
                },
            };
            ordered.insert(param.name.clone(), value);
        }
        self.arguments = ordered;
    }

    pub fn arguments(&self) -> &IndexMap<String, Value> {
        &self.arguments
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Values passed positionally, with variadic ones expanded.
    pub fn args(&self) -> Vec<Value> {
        let mut args = Vec::new();
        for param in self.signature.parameters() {
            let Some(value) = self.arguments.get(&param.name) else {
                break;
            };
            match param.kind {
                kind if kind.accepts_positional() => args.push(value.clone()),
                ParameterKind::VarPositional => {
                    args.extend(value.as_items().unwrap_or_default().iter().cloned());
                }
                _ => break,
            }
        }
        args
    }

    /// Values passed by keyword, with variadic ones expanded.
    pub fn kwargs(&self) -> IndexMap<String, Value> {
        let mut kwargs = IndexMap::new();
        for param in self.signature.parameters() {
            let Some(value) = self.arguments.get(&param.name) else {
                continue;
            };
            match param.kind {
                ParameterKind::KeywordOnly => {
                    kwargs.insert(param.name.clone(), value.clone());
                }
                ParameterKind::VarKeyword => {
                    if let Value::Dict(items) = value {
                        for (k, v) in items {
                            kwargs.insert(k.to_label(), v.clone());
                        }
                    }
                }
                _ => {}
            }
        }
        kwargs
    }
}

/// Body of a wrapped function.
pub type FunctionBody = Arc<dyn Fn(&BoundArguments) -> std::result::Result<Value, BoxError> + Send + Sync>;

/// A named function with a signature, an optional docstring and a body.
#[derive(Clone)]
pub struct FunctionSpec {
    name: String,
    signature: Signature,
    doc: Option<String>,
    body: FunctionBody,
}

impl FunctionSpec {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&BoundArguments) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature: Signature::default(),
            doc: None,
            body: Arc::new(body),
        }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.signature.parameters.push(parameter);
        self
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    pub fn with_return_annotation(mut self, annotation: TypeSpec) -> Self {
        self.signature.return_annotation = annotation;
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn call(&self, arguments: &BoundArguments) -> std::result::Result<Value, BoxError> {
        (self.body)(arguments)
    }
}

impl fmt::Debug for FunctionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}{}>", self.name, self.signature)
    }
}
