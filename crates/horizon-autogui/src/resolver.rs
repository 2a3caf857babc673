//! Widget resolution.
//!
//! [`Resolver::resolve`] maps a default value, an annotation and explicit
//! options to the widget class to build and the options to build it with.
//! The rules apply in a fixed order:
//!
//! 1. Without value, annotation, choices or widget type: a hidden
//!    `EmptyWidget`.
//! 2. `Optional[T]` (or a `None` default) makes the widget nullable; enums
//!    and `Literal` annotations supply choices.
//! 3. An explicit `widget_type` always wins.
//! 4. The registry entry for the type or its closest registered ancestor.
//! 5. For results, the return matcher chain, falling back to a read-only
//!    `LineEdit`.
//! 6. Choices select a `ComboBox`, or a `Select` with `allow_multiple`.
//! 7. The builtin type table, exact match first, then by subclass.
//! 8. A `LiteralEvalLineEdit` (or an error with `raise_on_unknown`).
//!
//! # Example
//!
//! ```
//! use horizon_autogui::{Resolver, TypeRegistry, TypeSpec, Value, WidgetKind, WidgetOptions};
//!
//! let registry = TypeRegistry::new();
//! let resolver = Resolver::new(&registry);
//! let picked = resolver
//!     .resolve(Some(&Value::Int(3)), &TypeSpec::optional(TypeSpec::Int), &WidgetOptions::new(), false)
//!     .unwrap();
//! assert_eq!(picked.class, WidgetKind::SpinBox);
//! assert_eq!(picked.options.nullable, Some(true));
//! ```

use std::sync::Arc;

use horizon_autogui_core::logging::{span_names, targets};
use horizon_autogui_core::{TypeNamespace, TypeSpec, Value};

use crate::choices::ChoicesSource;
use crate::error::ResolveError;
use crate::options::{FileMode, WidgetOptions, WidgetRef};
use crate::registry::{ReturnMatcher, TypeRegistry};
use crate::widget::{WidgetClass, WidgetKind};

/// Types recognized by the builtin table, in lookup order.
fn simple_types() -> Vec<(TypeSpec, WidgetKind, WidgetOptions)> {
    vec![
        (TypeSpec::Bool, WidgetKind::CheckBox, WidgetOptions::new()),
        (TypeSpec::Int, WidgetKind::SpinBox, WidgetOptions::new()),
        (TypeSpec::Float, WidgetKind::FloatSpinBox, WidgetOptions::new()),
        (TypeSpec::Str, WidgetKind::LineEdit, WidgetOptions::new()),
        (TypeSpec::Path, WidgetKind::FileEdit, WidgetOptions::new()),
        (TypeSpec::Time, WidgetKind::TimeEdit, WidgetOptions::new()),
        (TypeSpec::TimeDelta, WidgetKind::TimeEdit, WidgetOptions::new()),
        (TypeSpec::Date, WidgetKind::DateEdit, WidgetOptions::new()),
        (TypeSpec::DateTime, WidgetKind::DateTimeEdit, WidgetOptions::new()),
        (TypeSpec::Range, WidgetKind::RangeEdit, WidgetOptions::new()),
        (TypeSpec::Slice, WidgetKind::SliceEdit, WidgetOptions::new()),
        (
            TypeSpec::sequence_of(TypeSpec::Path),
            WidgetKind::FileEdit,
            WidgetOptions::new().with_mode(FileMode::ReadMultiple),
        ),
        (TypeSpec::Tuple(None), WidgetKind::TupleEdit, WidgetOptions::new()),
        (TypeSpec::Sequence(None), WidgetKind::ListEdit, WidgetOptions::new()),
    ]
}

/// Look `type_` up in the builtin table.
pub fn match_type(type_: &TypeSpec) -> Option<(WidgetKind, WidgetOptions)> {
    let table = simple_types();
    let hit = table
        .iter()
        .find(|(key, ..)| key == type_)
        .or_else(|| table.iter().find(|(key, ..)| type_.is_subclass(key)));
    if let Some((_, kind, options)) = hit {
        return Some((*kind, options.clone()));
    }

    if let TypeSpec::Set(Some(elem)) = type_ {
        if let Some((choices, _)) = elem.literal_choices() {
            return Some((
                WidgetKind::Select,
                WidgetOptions::new().with_choices(choices),
            ));
        }
    }
    None
}

/// The matchers every registry starts with: scalars as a read-only line
/// edit, then table-like types as a `Table`.
pub fn builtin_return_matchers() -> Vec<ReturnMatcher> {
    let simple: ReturnMatcher = Arc::new(|type_: &TypeSpec, _: &TypeNamespace| {
        simple_types()
            .iter()
            .any(|(key, ..)| key == type_)
            .then(|| {
                (
                    WidgetRef::Kind(WidgetKind::LineEdit),
                    WidgetOptions::new().with_gui_only(true),
                )
            })
    });
    let table: ReturnMatcher = Arc::new(|type_: &TypeSpec, namespace: &TypeNamespace| {
        ["pandas.DataFrame", "numpy.ndarray"]
            .iter()
            .filter_map(|name| namespace.get(name))
            .any(|table_type| type_.is_subclass(table_type))
            .then(|| (WidgetRef::Kind(WidgetKind::Table), WidgetOptions::new()))
    });
    vec![simple, table]
}

/// The outcome of resolution.
#[derive(Debug, Clone)]
pub struct WidgetDescriptor {
    pub class: WidgetClass,
    pub options: WidgetOptions,
    /// Warnings raised while resolving; each was also logged.
    pub warnings: Vec<String>,
}

/// Picks widget classes using a registry.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'r> {
    registry: &'r TypeRegistry,
    raise_on_unknown: bool,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            raise_on_unknown: false,
        }
    }

    /// Fail with [`ResolveError::NoWidgetFound`] instead of falling back to
    /// a literal editor.
    pub fn with_raise_on_unknown(mut self, raise: bool) -> Self {
        self.raise_on_unknown = raise;
        self
    }

    /// Turn a widget reference into a class.
    pub fn widget_class(&self, widget: &WidgetRef) -> Result<WidgetClass, ResolveError> {
        match widget {
            WidgetRef::Kind(kind) => Ok(WidgetClass::Builtin(*kind)),
            WidgetRef::Custom(class) => Ok(WidgetClass::Custom(class.clone())),
            WidgetRef::Name(name) => match name.parse::<WidgetKind>() {
                Ok(kind) => Ok(WidgetClass::Builtin(kind)),
                Err(_) => self
                    .registry
                    .widget_class(name)
                    .map(WidgetClass::Custom)
                    .ok_or_else(|| ResolveError::MissingWidget(name.clone())),
            },
        }
    }

    /// Pick the widget for a value and/or annotation.
    pub fn resolve(
        &self,
        value: Option<&Value>,
        annotation: &TypeSpec,
        options: &WidgetOptions,
        is_result: bool,
    ) -> Result<WidgetDescriptor, ResolveError> {
        let _span = tracing::trace_span!(
            target: targets::RESOLVER,
            span_names::RESOLVE,
            %annotation,
            is_result
        )
        .entered();

        let mut options = options.clone();
        let mut warnings = Vec::new();
        let annotation = if is_result && annotation.is_empty() {
            TypeSpec::Str
        } else {
            annotation.clone()
        };

        if value.is_none()
            && annotation.is_empty()
            && options.choices.is_none()
            && options.widget_type.is_none()
        {
            options.visible.get_or_insert(false);
            return self.finish(WidgetClass::Builtin(WidgetKind::EmptyWidget), options, warnings);
        }

        let declared = if annotation.is_empty() {
            value.map_or(TypeSpec::Empty, Value::type_spec)
        } else {
            self.registry.resolve_type(&annotation)?
        };
        let (type_, optional) = declared.split_nullable();
        let nullable = optional || matches!(value, Some(Value::None));
        options.nullable.get_or_insert(nullable);

        let mut choices = options.choices.clone().or_else(|| {
            type_.as_enum().map(|e| ChoicesSource::Enum(e.clone()))
        });
        if let Some((literals, literal_nullable)) = type_.literal_choices() {
            choices = Some(ChoicesSource::Static(literals));
            options.nullable = Some(literal_nullable || optional);
        }

        if let Some(mut widget_type) = options.widget_type.take() {
            if let Some(choices) = choices {
                if widget_type.is_kind(WidgetKind::RadioButton) {
                    let message = format!(
                        "widget_type of 'RadioButton' (with dtype {type_}) is being coerced \
                         to 'RadioButtons' due to choices or Enum type."
                    );
                    tracing::warn!(target: targets::RESOLVER, "{message}");
                    warnings.push(message);
                    widget_type = WidgetRef::Kind(WidgetKind::RadioButtons);
                }
                options.choices.get_or_insert(choices);
            }
            let class = self.widget_class(&widget_type)?;
            return self.finish(class, options, warnings);
        }

        if let Some(def) = self.registry.lookup(&type_) {
            tracing::trace!(target: targets::RESOLVER, %type_, widget = ?def.widget, "registry hit");
            let class = self.widget_class(&def.widget)?;
            return self.finish(class, options.merge_under(def.options), warnings);
        }

        if is_result {
            if let Some((widget, matched)) = self.registry.match_return_type(&type_) {
                let class = self.widget_class(&widget)?;
                return self.finish(class, options.merge_under(matched), warnings);
            }
            options.gui_only.get_or_insert(true);
            return self.finish(WidgetClass::Builtin(WidgetKind::LineEdit), options, warnings);
        }

        if let Some(choices) = choices {
            let multiple = options.allow_multiple.unwrap_or(false);
            if let (Some(value), Some(allowed)) = (value, choices.static_values()) {
                check_default(value, &allowed, multiple, options.nullable == Some(true))?;
            }
            options.choices = Some(choices);
            let kind = if multiple {
                WidgetKind::Select
            } else {
                WidgetKind::ComboBox
            };
            return self.finish(WidgetClass::Builtin(kind), options, warnings);
        }

        if let Some((kind, matched)) = match_type(&type_) {
            return self.finish(WidgetClass::Builtin(kind), options.merge_under(matched), warnings);
        }

        if self.raise_on_unknown {
            return Err(ResolveError::NoWidgetFound {
                type_name: type_.to_string(),
                annotation: annotation.to_string(),
            });
        }
        tracing::debug!(target: targets::RESOLVER, %type_, "no widget for type, using literal editor");
        self.finish(WidgetClass::Builtin(WidgetKind::LiteralEvalLineEdit), options, warnings)
    }

    fn finish(
        &self,
        class: WidgetClass,
        options: WidgetOptions,
        warnings: Vec<String>,
    ) -> Result<WidgetDescriptor, ResolveError> {
        tracing::debug!(target: targets::RESOLVER, class = class.name(), "resolved widget");
        Ok(WidgetDescriptor {
            class,
            options,
            warnings,
        })
    }
}

/// Fail if a default value is not among the choices.
fn check_default(
    value: &Value,
    allowed: &[Value],
    multiple: bool,
    nullable: bool,
) -> Result<(), ResolveError> {
    if value.is_none() && nullable {
        return Ok(());
    }
    let valid = match value.as_items() {
        Some(items) if multiple => items.iter().all(|v| allowed.contains(v)),
        _ => allowed.contains(value),
    };
    if valid {
        return Ok(());
    }
    Err(ResolveError::InvalidDefault {
        value: value.to_string(),
        choices: allowed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Resolve against the global registry.
pub fn resolve(
    value: Option<&Value>,
    annotation: &TypeSpec,
    options: &WidgetOptions,
    is_result: bool,
) -> Result<WidgetDescriptor, ResolveError> {
    let registry = TypeRegistry::global();
    Resolver::new(&registry).resolve(value, annotation, options, is_result)
}
