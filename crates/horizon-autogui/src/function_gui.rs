//! A container of widgets standing for a function's parameters.
//!
//! [`FunctionGuiBuilder`] turns a [`FunctionSpec`] into a [`FunctionGui`]:
//! one widget per parameter, an optional call button and an optional result
//! widget. Calling the GUI calls the function with the current widget
//! values, overridden by any arguments passed to the call.
//!
//! # Example
//!
//! ```
//! use horizon_autogui::{
//!     CallArgs, FunctionGuiBuilder, FunctionSpec, Parameter, TypeSpec, Value,
//! };
//!
//! let add = FunctionSpec::new("add", |args| {
//!     let a = args.get("a").and_then(Value::as_int).unwrap_or(0);
//!     let b = args.get("b").and_then(Value::as_int).unwrap_or(0);
//!     Ok(Value::Int(a + b))
//! })
//! .with_parameter(Parameter::new("a").with_annotation(TypeSpec::Int).with_default(1))
//! .with_parameter(Parameter::new("b").with_annotation(TypeSpec::Int).with_default(2));
//!
//! let gui = FunctionGuiBuilder::new(add).build().unwrap();
//! assert_eq!(gui.call(CallArgs::new()).unwrap(), Value::Int(3));
//! assert_eq!(gui.call(CallArgs::new().with_kwarg("b", 10)).unwrap(), Value::Int(11));
//! assert_eq!(gui.call_count(), 2);
//! ```

use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use horizon_autogui_core::logging::{span_names, targets};
use horizon_autogui_core::{ConnectionId, Signal, TypeSpec, Value};
use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::backend::Backend;
use crate::container::{Container, ContainerConfig};
use crate::docstring::inject_tooltips;
use crate::error::{CallError, Result, SignatureError, WidgetError};
use crate::options::WidgetOptions;
use crate::persist::persist_path;
use crate::protocols::Layout;
use crate::registry::TypeRegistry;
use crate::signature::{FunctionSpec, Signature};
use crate::widget::{Widget, WidgetBase, WidgetKind, WidgetRequest, create_widget};

/// Arguments for [`FunctionGui::call`].
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub args: Vec<Value>,
    pub kwargs: IndexMap<String, Value>,
    /// Write the arguments back into the widgets before calling.
    pub update_widget: bool,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn with_kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(name.into(), value.into());
        self
    }

    pub fn with_update_widget(mut self, update: bool) -> Self {
        self.update_widget = update;
        self
    }
}

/// Configures and builds [`FunctionGui`]s.
///
/// The builder is kept by every GUI it builds, so
/// [`build`](Self::build) can be called any number of times and
/// [`FunctionGui::copy`] produces an identical GUI.
#[derive(Clone)]
pub struct FunctionGuiBuilder {
    function: FunctionSpec,
    call_button: Option<bool>,
    call_button_text: Option<String>,
    layout: Layout,
    labels: bool,
    scrollable: bool,
    tooltips: bool,
    visible: Option<bool>,
    auto_call: bool,
    result_widget: bool,
    param_options: IndexMap<String, WidgetOptions>,
    name: Option<String>,
    persist: bool,
    persist_path: Option<PathBuf>,
    raise_on_unknown: bool,
    registry: Option<Arc<TypeRegistry>>,
    backend: Option<Arc<dyn Backend>>,
}

impl FunctionGuiBuilder {
    pub fn new(function: FunctionSpec) -> Self {
        Self {
            function,
            call_button: None,
            call_button_text: None,
            layout: Layout::Vertical,
            labels: true,
            scrollable: false,
            tooltips: true,
            visible: None,
            auto_call: false,
            result_widget: false,
            param_options: IndexMap::new(),
            name: None,
            persist: false,
            persist_path: None,
            raise_on_unknown: false,
            registry: None,
            backend: None,
        }
    }

    /// Show or hide the call button; by default it is shown unless
    /// auto-calling.
    pub fn with_call_button(mut self, show: bool) -> Self {
        self.call_button = Some(show);
        self
    }

    /// Show the call button with custom text.
    pub fn with_call_button_text(mut self, text: impl Into<String>) -> Self {
        self.call_button = Some(true);
        self.call_button_text = Some(text.into());
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_labels(mut self, labels: bool) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_scrollable(mut self, scrollable: bool) -> Self {
        self.scrollable = scrollable;
        self
    }

    /// Take tooltips from the function's docstring.
    pub fn with_tooltips(mut self, tooltips: bool) -> Self {
        self.tooltips = tooltips;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    /// Call the function whenever a parameter changes.
    pub fn with_auto_call(mut self, auto_call: bool) -> Self {
        self.auto_call = auto_call;
        self
    }

    /// Show the returned value in a widget.
    pub fn with_result_widget(mut self, result_widget: bool) -> Self {
        self.result_widget = result_widget;
        self
    }

    /// Options for the parameter named `name`, overriding its own.
    pub fn with_param_options(mut self, name: impl Into<String>, options: WidgetOptions) -> Self {
        self.param_options.insert(name.into(), options);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Restore values on build and save them on every change.
    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Persist to `path` instead of the user cache directory.
    pub fn with_persist_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.persist = true;
        self.persist_path = Some(path.into());
        self
    }

    pub fn with_raise_on_unknown(mut self, raise: bool) -> Self {
        self.raise_on_unknown = raise;
        self
    }

    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    fn request(&self, request: WidgetRequest, registry: &Arc<TypeRegistry>) -> WidgetRequest {
        let mut request = request.with_registry(registry.clone());
        if let Some(backend) = &self.backend {
            request = request.with_backend(backend.clone());
        }
        request
    }

    /// Build a new GUI.
    pub fn build(&self) -> Result<Arc<FunctionGui>> {
        let registry = self.registry.clone().unwrap_or_else(TypeRegistry::global);
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| self.function.name().to_string());

        let mut signature = self
            .function
            .signature()
            .clone()
            .with_param_options(&self.param_options)?;
        if self.tooltips {
            inject_tooltips(self.function.doc(), &mut signature);
        }

        let mut widgets = Vec::with_capacity(signature.len() + 2);
        for param in signature.parameters() {
            let mut request = self.request(param.widget_request(), &registry);
            request.raise_on_unknown |= self.raise_on_unknown;
            widgets.push(create_widget(&request)?);
        }

        let call_button = if self.call_button.unwrap_or(!self.auto_call) {
            let text = self.call_button_text.clone().unwrap_or_else(|| "Run".into());
            let request = WidgetRequest::new()
                .with_name("call_button")
                .with_widget_type(WidgetKind::PushButton)
                .with_gui_only(true)
                .with_options(WidgetOptions::new().with_text(text));
            let button = create_widget(&self.request(request, &registry))?;
            widgets.push(button.clone());
            Some(button)
        } else {
            None
        };

        let result_widget = if self.result_widget {
            let request = WidgetRequest::new()
                .with_annotation(signature.return_annotation().clone())
                .with_gui_only(true)
                .with_is_result(true)
                .with_raise_on_unknown(self.raise_on_unknown);
            let result = create_widget(&self.request(request, &registry))?;
            widgets.push(result.clone());
            Some(result)
        } else {
            None
        };

        let mut options = WidgetOptions::new();
        if let Some(visible) = self.visible {
            options = options.with_visible(visible);
        }
        let mut config = ContainerConfig::new()
            .with_name(&name)
            .with_layout(self.layout)
            .with_labels(self.labels)
            .with_scrollable(self.scrollable)
            .with_options(options);
        if let Some(backend) = &self.backend {
            config = config.with_backend(backend.clone());
        }
        let container = Container::new(config, widgets)?;

        let persist_path = if self.persist {
            let path = match &self.persist_path {
                Some(path) => path.clone(),
                None => persist_path(&name)?,
            };
            container.load(&path, true)?;
            Some(path)
        } else {
            None
        };

        let gui = Arc::new(FunctionGui {
            container,
            function: self.function.clone(),
            return_annotation: signature.return_annotation().clone(),
            name,
            registry,
            call_button,
            result_widget,
            auto_call: AtomicBool::new(self.auto_call),
            persist_path,
            call_count: AtomicUsize::new(0),
            called: Arc::new(Signal::new()),
            result_name: Mutex::new(None),
            builder: self.clone(),
        });
        gui.connect(self.auto_call);
        tracing::debug!(
            target: targets::FUNCTION_GUI,
            function = gui.name,
            parameters = signature.len(),
            "built function gui"
        );
        Ok(gui)
    }
}

impl fmt::Debug for FunctionGuiBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionGuiBuilder")
            .field("function", &self.function)
            .field("auto_call", &self.auto_call)
            .field("result_widget", &self.result_widget)
            .field("persist", &self.persist)
            .finish_non_exhaustive()
    }
}

/// A GUI for calling a function.
pub struct FunctionGui {
    container: Arc<Container>,
    function: FunctionSpec,
    return_annotation: TypeSpec,
    name: String,
    registry: Arc<TypeRegistry>,
    call_button: Option<Arc<dyn Widget>>,
    result_widget: Option<Arc<dyn Widget>>,
    auto_call: AtomicBool,
    persist_path: Option<PathBuf>,
    call_count: AtomicUsize,
    called: Arc<Signal<Value>>,
    result_name: Mutex<Option<String>>,
    builder: FunctionGuiBuilder,
}

impl FunctionGui {
    /// Build a GUI with default settings.
    pub fn new(function: FunctionSpec) -> Result<Arc<Self>> {
        FunctionGuiBuilder::new(function).build()
    }

    fn connect(self: &Arc<Self>, auto_call: bool) {
        if let Some(button) = self.call_button.as_ref().and_then(|b| b.as_button()) {
            if !auto_call {
                let weak: Weak<Self> = Arc::downgrade(self);
                button.clicked().connect(move |_| {
                    if let Some(gui) = weak.upgrade() {
                        gui.on_call_button();
                    }
                });
            }
        }
        let weak: Weak<Self> = Arc::downgrade(self);
        self.container.changed().connect(move |_| {
            if let Some(gui) = weak.upgrade() {
                gui.on_change();
            }
        });
    }

    fn on_call_button(&self) {
        let Some(button) = &self.call_button else {
            return;
        };
        button.set_enabled(false);
        if let Err(err) = self.call(CallArgs::new()) {
            tracing::error!(target: targets::FUNCTION_GUI, function = %self.name, %err, "call failed");
        }
        button.set_enabled(true);
    }

    fn on_change(&self) {
        if let Some(path) = &self.persist_path {
            if let Err(err) = self.container.dump(path) {
                tracing::warn!(target: targets::FUNCTION_GUI, function = %self.name, %err, "could not persist state");
            }
        }
        if self.auto_call() {
            if let Err(err) = self.call(CallArgs::new()) {
                tracing::error!(target: targets::FUNCTION_GUI, function = %self.name, %err, "auto-call failed");
            }
        }
    }

    /// The container holding the parameter widgets.
    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn function(&self) -> &FunctionSpec {
        &self.function
    }

    /// The name of the GUI, by default the function's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn return_annotation(&self) -> &TypeSpec {
        &self.return_annotation
    }

    /// The parameter widget named `name`.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Widget>> {
        self.container.try_get(name)
    }

    pub fn call_button(&self) -> Option<&Arc<dyn Widget>> {
        self.call_button.as_ref()
    }

    pub fn result_widget(&self) -> Option<&Arc<dyn Widget>> {
        self.result_widget.as_ref()
    }

    pub fn auto_call(&self) -> bool {
        self.auto_call.load(Ordering::SeqCst)
    }

    pub fn set_auto_call(&self, auto_call: bool) {
        self.auto_call.store(auto_call, Ordering::SeqCst);
    }

    /// Where state is persisted, if it is.
    pub fn persist_path(&self) -> Option<&PathBuf> {
        self.persist_path.as_ref()
    }

    /// Emitted with the returned value after every successful call.
    pub fn called(&self) -> &Arc<Signal<Value>> {
        &self.called
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn reset_call_count(&self) {
        self.call_count.store(0, Ordering::SeqCst);
    }

    /// A name for the returned value, by default `"<name> result"`.
    pub fn result_name(&self) -> String {
        self.result_name
            .lock()
            .clone()
            .unwrap_or_else(|| format!("{} result", self.name))
    }

    pub fn set_result_name(&self, name: impl Into<String>) {
        *self.result_name.lock() = Some(name.into());
    }

    /// The signature of the current state, with the function's return
    /// annotation.
    pub fn signature(&self) -> std::result::Result<Signature, WidgetError> {
        Ok(self
            .container
            .signature()?
            .with_return_annotation(self.return_annotation.clone()))
    }

    /// A new GUI built with the same settings.
    pub fn copy(&self) -> Result<Arc<FunctionGui>> {
        self.builder.build()
    }

    /// Call the function with the current widget values.
    ///
    /// Arguments in `args` override widget values for this call only,
    /// unless `update_widget` writes them back first. After the call the
    /// result widget shows the value, return callbacks registered for the
    /// return annotation run, and `called` is emitted.
    pub fn call(&self, args: CallArgs) -> std::result::Result<Value, CallError> {
        let _span = tracing::info_span!(
            target: targets::FUNCTION_GUI,
            span_names::CALL,
            function = %self.name
        )
        .entered();

        let signature = self.signature()?;
        let bound = match signature.bind(&args.args, &args.kwargs) {
            Ok(bound) => bound,
            Err(SignatureError::MissingArgument(missing)) => {
                return Err(CallError::MissingBinding(self.missing_message(&missing, &signature)));
            }
            Err(err) => return Err(err.into()),
        };

        if args.update_widget {
            let before = self.auto_call.swap(false, Ordering::SeqCst);
            let updated = self.container.update(
                bound
                    .arguments()
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone())),
            );
            self.auto_call.store(before, Ordering::SeqCst);
            updated?;
        }

        let mut bound = bound;
        bound.apply_defaults();
        let value = self
            .function
            .call(&bound)
            .map_err(|source| CallError::Function {
                function: self.name.clone(),
                source,
            })?;
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(target) = self.result_widget.as_ref().and_then(|w| w.as_value()) {
            let _blocked = target.changed().blocked();
            show_result(target, &value)?;
        }

        let return_type = signature.return_annotation();
        if !return_type.is_empty() {
            for callback in self.registry.type2callback(return_type) {
                callback.call(self, &value, return_type);
            }
        }
        tracing::debug!(target: targets::FUNCTION_GUI, function = %self.name, result = %value, "called");
        self.called.emit(value.clone());
        Ok(value)
    }

    fn missing_message(&self, missing: &str, signature: &Signature) -> String {
        let name = &self.name;
        format!(
            "missing a required argument: '{missing}' in call to '{name}{signature}'.\n\
             To avoid this error, you can bind a value or callback to the parameter:\n\n    \
             {name}.get(\"{missing}\").bind(value)\n\n\
             Or use the 'bind' option when building the GUI:\n\n    \
             builder.with_param_options(\"{missing}\", WidgetOptions::new().with_bind(value))"
        )
    }
}

/// Put `value` in a result widget, as text if the widget cannot hold it.
fn show_result(
    target: &dyn crate::widget::ValueAccess,
    value: &Value,
) -> std::result::Result<(), WidgetError> {
    if value.is_none() && !target.nullable() {
        return target.set_value(Value::str(""));
    }
    match target.set_value(value.clone()) {
        Err(WidgetError::TypeMismatch { .. }) => target.set_value(Value::Str(value.to_string())),
        other => other,
    }
}

impl Widget for FunctionGui {
    fn widget_base(&self) -> &WidgetBase {
        self.container.widget_base()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_container(&self) -> Option<&Container> {
        Some(self.container.as_ref())
    }

    fn reset_choices(&self) {
        Widget::reset_choices(self.container.as_ref());
    }

    fn connect_changed(&self, slot: Arc<dyn Fn() + Send + Sync>) -> Option<ConnectionId> {
        self.container.connect_changed(slot)
    }

    fn disconnect_changed(&self, id: ConnectionId) {
        self.container.disconnect_changed(id);
    }
}

impl fmt::Debug for FunctionGui {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.signature() {
            Ok(signature) => write!(f, "<FunctionGui {}{signature}>", self.name),
            Err(err) => write!(f, "<FunctionGui {}({err})>", self.name),
        }
    }
}

static_assertions::assert_impl_all!(FunctionGui: Send, Sync);

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::registry::TypeRegistration;
    use crate::signature::Parameter;

    fn echo() -> FunctionSpec {
        FunctionSpec::new("echo", |args| Ok(args.get("x").cloned().unwrap_or(Value::None)))
            .with_parameter(Parameter::new("x").with_annotation(TypeSpec::Int).with_default(1))
    }

    fn builder(function: FunctionSpec) -> FunctionGuiBuilder {
        FunctionGuiBuilder::new(function).with_registry(Arc::new(TypeRegistry::new()))
    }

    #[test]
    fn test_call_button_defaults() {
        let gui = builder(echo()).build().unwrap();
        let button = gui.call_button().unwrap();
        assert_eq!(button.as_button().unwrap().text(), "Run");
        assert!(button.gui_only());
        assert_eq!(gui.signature().unwrap().names().collect::<Vec<_>>(), ["x"]);

        let gui = builder(echo()).with_auto_call(true).build().unwrap();
        assert!(gui.call_button().is_none());
    }

    #[test]
    fn test_call_button_calls() {
        let gui = builder(echo()).build().unwrap();
        gui.call_button().unwrap().as_button().unwrap().click();
        assert_eq!(gui.call_count(), 1);
        assert!(gui.call_button().unwrap().enabled());
    }

    #[test]
    fn test_overrides_do_not_touch_widgets() {
        let gui = builder(echo()).build().unwrap();
        assert_eq!(gui.call(CallArgs::new().with_arg(5)).unwrap(), Value::Int(5));
        let x = gui.get("x").unwrap();
        assert_eq!(x.as_value().unwrap().value().unwrap(), Value::Int(1));

        gui.call(CallArgs::new().with_kwarg("x", 7).with_update_widget(true))
            .unwrap();
        assert_eq!(x.as_value().unwrap().value().unwrap(), Value::Int(7));
    }

    #[test]
    fn test_auto_call_on_change() {
        let gui = builder(echo()).with_auto_call(true).build().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        gui.called().connect(move |v| sink.lock().push(v.clone()));
        gui.get("x").unwrap().as_value().unwrap().set_value(Value::Int(9)).unwrap();
        assert_eq!(*seen.lock(), vec![Value::Int(9)]);
        gui.reset_call_count();
        assert_eq!(gui.call_count(), 0);
    }

    #[test]
    fn test_missing_argument_suggests_bind() {
        let f = FunctionSpec::new("needs", |_| Ok(Value::None)).with_parameter(Parameter::new("thing"));
        let gui = builder(f).build().unwrap();
        let err = gui.call(CallArgs::new()).unwrap_err();
        let CallError::MissingBinding(message) = err else {
            panic!("unexpected error: {err}");
        };
        assert!(message.contains("'thing'"));
        assert!(message.contains("bind"));
    }

    #[test]
    fn test_result_widget_and_return_callbacks() {
        let registry = Arc::new(TypeRegistry::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        registry
            .register_type(
                &TypeSpec::Int,
                TypeRegistration::new().with_return_callback(move |gui, value, _| {
                    sink.lock().push((gui.name().to_string(), value.clone()));
                }),
            )
            .unwrap();
        let gui = FunctionGuiBuilder::new(echo().with_return_annotation(TypeSpec::Int))
            .with_registry(registry)
            .with_result_widget(true)
            .build()
            .unwrap();
        gui.call(CallArgs::new().with_arg(4)).unwrap();
        let result = gui.result_widget().unwrap();
        assert_eq!(result.as_value().unwrap().value().unwrap(), Value::str("4"));
        assert_eq!(*seen.lock(), vec![("echo".to_string(), Value::Int(4))]);
        assert_eq!(gui.result_name(), "echo result");
    }

    #[test]
    fn test_function_errors_are_reported() {
        let f = FunctionSpec::new("boom", |_| Err("exploded".into()));
        let gui = builder(f).build().unwrap();
        let err = gui.call(CallArgs::new()).unwrap_err();
        assert!(matches!(err, CallError::Function { .. }));
        assert_eq!(gui.call_count(), 0);
    }

    #[test]
    fn test_builder_is_reusable() {
        let b = builder(echo()).with_call_button_text("Go");
        let first = b.build().unwrap();
        let second = first.copy().unwrap();
        assert!(!Arc::ptr_eq(first.container(), second.container()));
        assert_eq!(
            second.call_button().unwrap().as_button().unwrap().text(),
            "Go"
        );
    }

    #[test]
    fn test_persisted_values_restored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("echo.json");
        let first = builder(echo()).with_persist_path(&path).build().unwrap();
        first.get("x").unwrap().as_value().unwrap().set_value(Value::Int(33)).unwrap();
        assert!(path.exists());

        let second = builder(echo()).with_persist_path(&path).build().unwrap();
        assert_eq!(
            second.get("x").unwrap().as_value().unwrap().value().unwrap(),
            Value::Int(33)
        );
    }
}
