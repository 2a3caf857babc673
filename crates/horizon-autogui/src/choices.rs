//! Choice sources for categorical widgets.
//!
//! Whatever the caller supplies (a static list, an enumeration, a keyed
//! list, or a provider evaluated against live state), a categorical widget
//! only ever sees normalized `(label, data)` pairs. [`ChoicesSource::resolve`]
//! performs that normalization; [`CategoricalWidget::reset_choices`] calls it
//! again so provider-backed widgets pick up fresh state.
//!
//! [`CategoricalWidget::reset_choices`]: crate::widget::CategoricalWidget::reset_choices
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI64, Ordering};
//!
//! use horizon_autogui::{Choice, ChoicesSource, Value, WidgetContext};
//!
//! let counter = Arc::new(AtomicI64::new(1));
//! let source = ChoicesSource::from_fn(move |_ctx: &WidgetContext| {
//!     let n = counter.fetch_add(1, Ordering::SeqCst);
//!     (0..n).map(Value::Int).collect()
//! });
//!
//! let ctx = WidgetContext::default();
//! assert_eq!(source.resolve(&ctx).len(), 1);
//! assert_eq!(source.resolve(&ctx).len(), 2);
//! ```

use std::fmt;
use std::sync::Arc;

use horizon_autogui_core::{EnumType, TypeSpec, Value};

/// Label of the row standing for "no selection" in nullable widgets.
pub const NULL_LABEL: &str = "-----";

/// One selectable item.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub label: String,
    pub data: Value,
}

impl Choice {
    pub fn new(label: impl Into<String>, data: impl Into<Value>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }

    /// Choice labelled with the value's `str()`.
    pub fn from_value(data: Value) -> Self {
        Self {
            label: data.to_label(),
            data,
        }
    }

    /// The null row.
    pub fn null() -> Self {
        Self::new(NULL_LABEL, Value::None)
    }
}

/// Read-only view of a widget handed to choice providers.
#[derive(Debug, Clone, Default)]
pub struct WidgetContext {
    pub name: String,
    pub annotation: Option<TypeSpec>,
    pub nullable: bool,
    /// The current value, if one can be read.
    pub value: Option<Value>,
    /// Name of the enclosing container, if any.
    pub parent: Option<String>,
}

/// Computes choices from live state.
pub trait ChoicesProvider: Send + Sync {
    fn provide(&self, context: &WidgetContext) -> Vec<Choice>;
}

impl<F> ChoicesProvider for F
where
    F: Fn(&WidgetContext) -> Vec<Choice> + Send + Sync,
{
    fn provide(&self, context: &WidgetContext) -> Vec<Choice> {
        self(context)
    }
}

/// Maps a choice's data to its label.
pub type ChoiceKey = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// Where a categorical widget's choices come from.
#[derive(Clone)]
pub enum ChoicesSource {
    /// Plain values, or `(label, data)` tuples when every item is one.
    Static(Vec<Value>),
    /// Explicit pairs.
    Pairs(Vec<Choice>),
    /// Members of an enumeration, labelled by member name.
    Enum(EnumType),
    /// Values labelled by a key function.
    Keyed { choices: Vec<Value>, key: ChoiceKey },
    /// Re-evaluated on every reset.
    Provider(Arc<dyn ChoicesProvider>),
}

impl ChoicesSource {
    /// A provider returning plain values.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&WidgetContext) -> Vec<Value> + Send + Sync + 'static,
    {
        Self::Provider(Arc::new(move |ctx: &WidgetContext| {
            normalize_values(f(ctx))
        }))
    }

    /// A provider returning pairs.
    pub fn provider(provider: impl ChoicesProvider + 'static) -> Self {
        Self::Provider(Arc::new(provider))
    }

    /// Values labelled by `key`.
    pub fn keyed<F>(choices: Vec<Value>, key: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        Self::Keyed {
            choices,
            key: Arc::new(key),
        }
    }

    /// Normalize to `(label, data)` pairs, consulting the provider if any.
    pub fn resolve(&self, context: &WidgetContext) -> Vec<Choice> {
        match self {
            Self::Static(values) => normalize_values(values.clone()),
            Self::Pairs(pairs) => pairs.clone(),
            Self::Enum(e) => e.values().into_iter().map(Choice::from_value).collect(),
            Self::Keyed { choices, key } => choices
                .iter()
                .map(|v| Choice::new(key(v), v.clone()))
                .collect(),
            Self::Provider(provider) => provider.provide(context),
        }
    }

    /// Choice data known without consulting a provider.
    pub fn static_values(&self) -> Option<Vec<Value>> {
        match self {
            Self::Provider(_) => None,
            other => Some(
                other
                    .resolve(&WidgetContext::default())
                    .into_iter()
                    .map(|c| c.data)
                    .collect(),
            ),
        }
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, Self::Provider(_))
    }
}

/// Treat the items as pairs if every one is a `(str, data)` tuple.
fn normalize_values(values: Vec<Value>) -> Vec<Choice> {
    let all_pairs = !values.is_empty()
        && values.iter().all(|v| {
            matches!(v, Value::Tuple(items) if items.len() == 2 && matches!(items[0], Value::Str(_)))
        });
    if all_pairs {
        values
            .into_iter()
            .filter_map(|v| match v {
                Value::Tuple(mut items) => {
                    let data = items.pop()?;
                    let label = items.pop()?;
                    Some(Choice::new(label.to_label(), data))
                }
                _ => None,
            })
            .collect()
    } else {
        values.into_iter().map(Choice::from_value).collect()
    }
}

impl fmt::Debug for ChoicesSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(values) => f.debug_tuple("Static").field(values).finish(),
            Self::Pairs(pairs) => f.debug_tuple("Pairs").field(pairs).finish(),
            Self::Enum(e) => f.debug_tuple("Enum").field(&e.name()).finish(),
            Self::Keyed { choices, .. } => f.debug_struct("Keyed").field("choices", choices).finish(),
            Self::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}

impl From<Vec<Value>> for ChoicesSource {
    fn from(values: Vec<Value>) -> Self {
        Self::Static(values)
    }
}

impl From<Vec<Choice>> for ChoicesSource {
    fn from(pairs: Vec<Choice>) -> Self {
        Self::Pairs(pairs)
    }
}

impl From<Vec<&str>> for ChoicesSource {
    fn from(values: Vec<&str>) -> Self {
        Self::Static(values.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<i64>> for ChoicesSource {
    fn from(values: Vec<i64>) -> Self {
        Self::Static(values.into_iter().map(Value::Int).collect())
    }
}

impl From<EnumType> for ChoicesSource {
    fn from(e: EnumType) -> Self {
        Self::Enum(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_values_label_with_str() {
        let choices = ChoicesSource::from(vec!["a", "b"]).resolve(&WidgetContext::default());
        assert_eq!(choices, vec![Choice::new("a", "a"), Choice::new("b", "b")]);

        let ints = ChoicesSource::from(vec![1_i64, 2]).resolve(&WidgetContext::default());
        assert_eq!(ints[1], Choice::new("2", 2));
    }

    #[test]
    fn test_tuples_become_pairs() {
        let source = ChoicesSource::Static(vec![
            Value::Tuple(vec![Value::str("one"), Value::Int(1)]),
            Value::Tuple(vec![Value::str("two"), Value::Int(2)]),
        ]);
        let choices = source.resolve(&WidgetContext::default());
        assert_eq!(choices, vec![Choice::new("one", 1), Choice::new("two", 2)]);
    }

    #[test]
    fn test_mixed_tuples_stay_values() {
        let source = ChoicesSource::Static(vec![
            Value::Tuple(vec![Value::str("one"), Value::Int(1)]),
            Value::Int(2),
        ]);
        let choices = source.resolve(&WidgetContext::default());
        assert_eq!(choices[0].label, "('one', 1)");
    }

    #[test]
    fn test_enum_labels_are_member_names() {
        let e = EnumType::new("Mode", [("Fast", Value::Int(1)), ("Slow", Value::Int(2))]);
        let choices = ChoicesSource::from(e.clone()).resolve(&WidgetContext::default());
        let labels: Vec<_> = choices.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, ["Fast", "Slow"]);
        assert_eq!(choices[0].data, e.member("Fast").unwrap());
    }

    #[test]
    fn test_keyed_choices() {
        let source = ChoicesSource::keyed(vec![Value::Int(1), Value::Int(2)], |v| format!("#{v}"));
        let choices = source.resolve(&WidgetContext::default());
        assert_eq!(choices[1], Choice::new("#2", 2));
    }

    #[test]
    fn test_provider_sees_context() {
        let source = ChoicesSource::from_fn(|ctx| vec![Value::str(ctx.name.clone())]);
        let ctx = WidgetContext {
            name: "x".into(),
            ..Default::default()
        };
        assert_eq!(source.resolve(&ctx), vec![Choice::new("x", "x")]);
        assert!(source.static_values().is_none());
    }
}
