//! Building widgets from values and annotations.

use std::sync::Arc;

use horizon_autogui_core::logging::{span_names, targets};
use horizon_autogui_core::{TypeSpec, Value};

use crate::backend::{Backend, default_backend};
use crate::container::{Container, ContainerConfig};
use crate::error::Result;
use crate::options::{WidgetOptions, WidgetRef};
use crate::protocols::{Protocol, assert_protocol};
use crate::registry::TypeRegistry;
use crate::resolver::Resolver;
use crate::signature::ParameterKind;
use crate::widget::{
    ButtonWidget, CategoricalWidget, PlainWidget, RangedWidget, ValueWidget, Widget, WidgetClass,
    WidgetInit, WidgetKind,
};

/// Everything [`create_widget`] needs.
///
/// Unset registry and backend fall back to the global registry and the
/// default backend.
#[derive(Clone, Default)]
pub struct WidgetRequest {
    pub value: Option<Value>,
    pub annotation: TypeSpec,
    pub name: String,
    pub label: Option<String>,
    pub gui_only: bool,
    pub param_kind: ParameterKind,
    pub widget_type: Option<WidgetRef>,
    pub options: WidgetOptions,
    pub is_result: bool,
    pub raise_on_unknown: bool,
    pub registry: Option<Arc<TypeRegistry>>,
    pub backend: Option<Arc<dyn Backend>>,
}

impl WidgetRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_annotation(mut self, annotation: TypeSpec) -> Self {
        self.annotation = annotation;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_gui_only(mut self, gui_only: bool) -> Self {
        self.gui_only = gui_only;
        self
    }

    pub fn with_param_kind(mut self, kind: ParameterKind) -> Self {
        self.param_kind = kind;
        self
    }

    pub fn with_widget_type(mut self, widget_type: impl Into<WidgetRef>) -> Self {
        self.widget_type = Some(widget_type.into());
        self
    }

    pub fn with_options(mut self, options: WidgetOptions) -> Self {
        self.options = options;
        self
    }

    /// Build an output widget rather than an input.
    pub fn with_is_result(mut self, is_result: bool) -> Self {
        self.is_result = is_result;
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

    /// Explicit options with the request's own fields folded in.
    fn explicit_options(&self) -> WidgetOptions {
        let mut options = self.options.clone();
        if let Some(widget_type) = &self.widget_type {
            options.widget_type = Some(widget_type.clone());
        }
        if let Some(label) = &self.label {
            options.label = Some(label.clone());
        }
        if self.gui_only {
            options.gui_only = Some(true);
        }
        let password_like = matches!(self.annotation, TypeSpec::Str)
            || (self.annotation.is_empty() && matches!(self.value, None | Some(Value::Str(_))));
        if options.widget_type.is_none() && self.name == "password" && password_like {
            options.widget_type = Some(WidgetRef::Kind(WidgetKind::Password));
        }
        options
    }
}

impl std::fmt::Debug for WidgetRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetRequest")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("annotation", &self.annotation)
            .field("widget_type", &self.widget_type)
            .field("is_result", &self.is_result)
            .finish_non_exhaustive()
    }
}

/// Resolve, build and wrap a widget.
///
/// The widget class comes from the [`Resolver`]; the backend widget is then
/// checked against the protocol the class requires before the wrapper for
/// that protocol is constructed around it.
pub fn create_widget(request: &WidgetRequest) -> Result<Arc<dyn Widget>> {
    let _span = tracing::debug_span!(
        target: targets::WIDGET,
        span_names::CREATE_WIDGET,
        name = %request.name
    )
    .entered();

    let registry = request.registry.clone().unwrap_or_else(TypeRegistry::global);
    let backend = request.backend.clone().unwrap_or_else(default_backend);

    let descriptor = Resolver::new(&registry)
        .with_raise_on_unknown(request.raise_on_unknown)
        .resolve(
            request.value.as_ref(),
            &request.annotation,
            &request.explicit_options(),
            request.is_result,
        )?;
    let class = descriptor.class;
    let options = descriptor.options;

    let native = match &class {
        WidgetClass::Builtin(kind) => backend.create(kind.name(), &options)?,
        WidgetClass::Custom(custom) => custom.build(backend.as_ref(), &options)?,
    };
    let protocol = class.protocol();
    assert_protocol(class.name(), &native, protocol)?;

    let init = WidgetInit {
        name: request.name.clone(),
        class_name: class.name().to_string(),
        annotation: (!request.annotation.is_empty()).then(|| request.annotation.clone()),
        param_kind: request.param_kind,
        gui_only: options.gui_only.unwrap_or(false),
        options,
        backend,
        native,
    };
    let value = request.value.clone();
    let widget: Arc<dyn Widget> = match protocol {
        Protocol::CategoricalWidget => CategoricalWidget::new(&init, value)?,
        Protocol::RangedWidget => Arc::new(RangedWidget::new(&init, value)?),
        Protocol::ButtonWidget => Arc::new(ButtonWidget::new(&init, value)?),
        Protocol::ValueWidget => Arc::new(ValueWidget::new(&init, value)?),
        Protocol::Container => {
            let config = ContainerConfig::from_options(&init.options);
            Container::from_init(&init, config, Vec::new())?
        }
        Protocol::Widget => Arc::new(PlainWidget::new(&init)),
    };
    tracing::debug!(
        target: targets::WIDGET,
        name = %request.name,
        class = class.name(),
        "created widget"
    );
    Ok(widget)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AutoguiError;

    fn isolated() -> WidgetRequest {
        WidgetRequest::new().with_registry(Arc::new(TypeRegistry::new()))
    }

    #[test]
    fn test_wrapper_follows_protocol() {
        let w = create_widget(&isolated().with_value(3).with_name("n")).unwrap();
        assert_eq!(w.widget_type(), "SpinBox");
        assert!(w.as_ranged().is_some());

        let w = create_widget(&isolated().with_value(true).with_name("flag")).unwrap();
        assert!(w.as_button().is_some());

        let w = create_widget(
            &isolated()
                .with_name("c")
                .with_options(WidgetOptions::new().with_choices(vec!["a", "b"])),
        )
        .unwrap();
        assert!(w.as_categorical().is_some());
    }

    #[test]
    fn test_password_by_name() {
        let w = create_widget(&isolated().with_name("password").with_annotation(TypeSpec::Str))
            .unwrap();
        assert_eq!(w.widget_type(), "Password");
        let w = create_widget(&isolated().with_name("password").with_value(1)).unwrap();
        assert_eq!(w.widget_type(), "SpinBox");
    }

    #[test]
    fn test_optional_annotation_is_unwrapped() {
        let w = create_widget(
            &isolated()
                .with_name("x")
                .with_annotation(TypeSpec::optional(TypeSpec::Int))
                .with_value(Value::None),
        )
        .unwrap();
        let value = w.as_value().unwrap();
        assert!(value.nullable());
        assert_eq!(value.value().unwrap(), Value::None);
        assert_eq!(w.annotation(), Some(TypeSpec::Int));
    }

    #[test]
    fn test_result_widget_is_gui_only() {
        let w = create_widget(&isolated().with_is_result(true)).unwrap();
        assert_eq!(w.widget_type(), "LineEdit");
        assert!(w.gui_only());
    }

    #[test]
    fn test_invalid_value_fails_construction() {
        let err = create_widget(
            &isolated()
                .with_value(500)
                .with_options(WidgetOptions::new().with_min(0.0).with_max(10.0)),
        )
        .err()
        .unwrap();
        assert!(matches!(err, AutoguiError::Widget(_)));
    }
}
