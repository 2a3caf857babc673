//! The type registry.
//!
//! Maps annotation types to the widget used for them and to callbacks run on
//! function results of that type. Lookup checks for an exact entry first and
//! then scans for a registered ancestor, either in registration order or
//! preferring the closest ancestor, depending on the [`LookupPolicy`].
//!
//! A process-wide registry is available through [`TypeRegistry::global`];
//! independent registries can be created with [`TypeRegistry::new`] and
//! handed to widget requests explicitly.
//!
//! # Example
//!
//! ```
//! use horizon_autogui::{ClassType, TypeRegistration, TypeRegistry, TypeSpec, Value, WidgetKind};
//!
//! let registry = TypeRegistry::new();
//! let color = TypeSpec::Class(ClassType::new("Color"));
//! registry
//!     .register_type(&color, TypeRegistration::new().with_choices(vec!["red", "green"]))
//!     .unwrap();
//!
//! let entry = registry.lookup(&color).unwrap();
//! assert!(entry.widget.is_kind(WidgetKind::ComboBox));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use horizon_autogui_core::logging::targets;
use horizon_autogui_core::{ClassType, CoreError, TypeNamespace, TypeSpec, Value};
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::choices::ChoicesSource;
use crate::error::RegistryError;
use crate::function_gui::FunctionGui;
use crate::options::{BoundValue, WidgetOptions, WidgetRef};
use crate::protocols::CustomWidgetClass;
use crate::resolver::builtin_return_matchers;
use crate::widget::WidgetKind;

/// Called with the GUI, the returned value and the declared return type
/// after a function GUI was called.
#[derive(Clone)]
pub struct ReturnCallback(Arc<dyn Fn(&FunctionGui, &Value, &TypeSpec) + Send + Sync>);

impl ReturnCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&FunctionGui, &Value, &TypeSpec) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, gui: &FunctionGui, value: &Value, return_type: &TypeSpec) {
        (self.0)(gui, value, return_type)
    }

    fn same(&self, other: &ReturnCallback) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ReturnCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReturnCallback(..)")
    }
}

/// Picks a result widget for a return type, if it recognizes the type.
pub type ReturnMatcher =
    Arc<dyn Fn(&TypeSpec, &TypeNamespace) -> Option<(WidgetRef, WidgetOptions)> + Send + Sync>;

/// How registered ancestors are searched when a type has no exact entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LookupPolicy {
    /// The first matching ancestor in registration order.
    FirstMatch,
    /// The ancestor with the fewest inheritance hops; ties go to the earlier
    /// registration.
    #[default]
    MostDerived,
}

/// What to register for a type.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistration {
    pub widget_type: Option<WidgetRef>,
    pub return_callback: Option<ReturnCallback>,
    pub options: WidgetOptions,
}

impl TypeRegistration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_widget_type(mut self, widget_type: impl Into<WidgetRef>) -> Self {
        self.widget_type = Some(widget_type.into());
        self
    }

    pub fn with_return_callback<F>(mut self, f: F) -> Self
    where
        F: Fn(&FunctionGui, &Value, &TypeSpec) + Send + Sync + 'static,
    {
        self.return_callback = Some(ReturnCallback::new(f));
        self
    }

    pub fn with_options(mut self, options: WidgetOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_choices(mut self, choices: impl Into<ChoicesSource>) -> Self {
        self.options.choices = Some(choices.into());
        self
    }

    pub fn with_bind(mut self, bind: impl Into<BoundValue>) -> Self {
        self.options.bind = Some(bind.into());
        self
    }

    fn is_empty(&self) -> bool {
        self.widget_type.is_none()
            && self.return_callback.is_none()
            && self.options.bind.is_none()
            && self.options.choices.is_none()
    }
}

/// The widget registered for a type.
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub widget: WidgetRef,
    pub options: WidgetOptions,
    /// Distinguishes entries that look alike.
    generation: u64,
}

/// Outcome of a registration.
#[derive(Debug, Default)]
pub struct Registration {
    /// The entry that was replaced, if any.
    pub previous: Option<TypeDef>,
    pub warnings: Vec<String>,
}

struct RegistryState {
    type_defs: Vec<(TypeSpec, TypeDef)>,
    return_callbacks: Vec<(TypeSpec, Vec<ReturnCallback>)>,
    return_matchers: Vec<ReturnMatcher>,
    widget_classes: IndexMap<String, Arc<dyn CustomWidgetClass>>,
    namespace: TypeNamespace,
    policy: LookupPolicy,
}

impl RegistryState {
    fn new(policy: LookupPolicy) -> Self {
        Self {
            type_defs: Vec::new(),
            return_callbacks: Vec::new(),
            return_matchers: builtin_return_matchers(),
            widget_classes: IndexMap::new(),
            namespace: TypeNamespace::new(),
            policy,
        }
    }

    /// Index of the entry for `type_` in `keys`, exact first, then by policy.
    fn find<'a>(&self, keys: impl Iterator<Item = &'a TypeSpec> + Clone, type_: &TypeSpec) -> Option<usize> {
        if let Some(i) = keys.clone().position(|k| k == type_) {
            return Some(i);
        }
        let mut candidates = keys
            .enumerate()
            .filter_map(|(i, k)| type_.mro_distance(k).map(|d| (i, d)));
        match self.policy {
            LookupPolicy::FirstMatch => candidates.next().map(|(i, _)| i),
            LookupPolicy::MostDerived => candidates.min_by_key(|&(i, d)| (d, i)).map(|(i, _)| i),
        }
    }
}

/// Registry of type to widget and return-callback associations.
pub struct TypeRegistry {
    state: RwLock<RegistryState>,
    generations: AtomicU64,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// A registry holding only the builtin associations.
    pub fn new() -> Self {
        Self::with_policy(LookupPolicy::default())
    }

    pub fn with_policy(policy: LookupPolicy) -> Self {
        Self {
            state: RwLock::new(RegistryState::new(policy)),
            generations: AtomicU64::new(0),
        }
    }

    /// The process-wide registry.
    pub fn global() -> Arc<TypeRegistry> {
        static GLOBAL: OnceLock<Arc<TypeRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(TypeRegistry::new())).clone()
    }

    /// Drop every registration, keeping the lookup policy.
    pub fn clear(&self) {
        let mut state = self.state.write();
        let policy = state.policy;
        *state = RegistryState::new(policy);
        tracing::debug!(target: targets::REGISTRY, "registry cleared");
    }

    pub fn policy(&self) -> LookupPolicy {
        self.state.read().policy
    }

    pub fn set_policy(&self, policy: LookupPolicy) {
        self.state.write().policy = policy;
    }

    /// Make `class` resolvable by name in forward references.
    pub fn declare_class(&self, class: ClassType) {
        self.state.write().namespace.declare_class(class);
    }

    /// Make `spec` resolvable under `name` in forward references.
    pub fn declare_type(&self, name: impl Into<String>, spec: TypeSpec) {
        self.state.write().namespace.insert(name, spec);
    }

    /// Replace forward references in `spec`.
    pub fn resolve_type(&self, spec: &TypeSpec) -> Result<TypeSpec, CoreError> {
        self.state.read().namespace.resolve(spec)
    }

    /// A copy of the namespace forward references are resolved against.
    pub fn namespace(&self) -> TypeNamespace {
        self.state.read().namespace.clone()
    }

    /// Register a widget and/or return callback for `type_`.
    ///
    /// A union registers each of its non-`None` arms. `choices` always
    /// selects a `ComboBox`; `bind` alone selects an `EmptyWidget`.
    #[tracing::instrument(target = "horizon_autogui::registry", skip_all, fields(type_ = %type_))]
    pub fn register_type(
        &self,
        type_: &TypeSpec,
        registration: TypeRegistration,
    ) -> Result<Registration, RegistryError> {
        if registration.is_empty() {
            return Err(RegistryError::EmptyRegistration {
                type_name: type_.to_string(),
            });
        }
        let resolved = self.resolve_type(type_)?;
        let arms = union_arms(&resolved);

        let mut outcome = Registration::default();
        if let Some(callback) = &registration.return_callback {
            self.add_return_callback(&arms, callback);
        }
        for (i, arm) in arms.iter().enumerate() {
            let (previous, warning) =
                self.register_widget(arm, registration.widget_type.clone(), &registration.options);
            if i == 0 {
                outcome.previous = previous;
            }
            outcome.warnings.extend(warning);
        }
        Ok(outcome)
    }

    fn add_return_callback(&self, arms: &[TypeSpec], callback: &ReturnCallback) -> Vec<TypeSpec> {
        let mut modified = Vec::new();
        let mut state = self.state.write();
        for arm in arms {
            let index = match state.return_callbacks.iter().position(|(k, _)| k == arm) {
                Some(i) => i,
                None => {
                    state.return_callbacks.push((arm.clone(), Vec::new()));
                    state.return_callbacks.len() - 1
                }
            };
            let callbacks = &mut state.return_callbacks[index].1;
            if !callbacks.iter().any(|c| c.same(callback)) {
                callbacks.push(callback.clone());
                modified.push(arm.clone());
            }
        }
        modified
    }

    fn register_widget(
        &self,
        type_: &TypeSpec,
        widget_type: Option<WidgetRef>,
        options: &WidgetOptions,
    ) -> (Option<TypeDef>, Option<String>) {
        let mut warning = None;
        let widget = if options.choices.is_some() {
            if widget_type.is_some() {
                let message = format!(
                    "Providing `choices` overrides `widget_type`. Categorical widget will be \
                     used for type {type_}"
                );
                tracing::warn!(target: targets::REGISTRY, "{message}");
                warning = Some(message);
            }
            Some(WidgetRef::Kind(WidgetKind::ComboBox))
        } else if widget_type.is_some() {
            widget_type
        } else if options.bind.is_some() {
            Some(WidgetRef::Kind(WidgetKind::EmptyWidget))
        } else {
            None
        };
        let Some(widget) = widget else {
            return (self.lookup_exact(type_), warning);
        };

        let def = TypeDef {
            widget,
            options: options.clone(),
            generation: self.generations.fetch_add(1, Ordering::Relaxed),
        };
        tracing::debug!(target: targets::REGISTRY, %type_, widget = ?def.widget, "registered widget");
        (self.insert_def(type_, Some(def)), warning)
    }

    /// Replace (or with `None`, remove) the entry for `type_`.
    fn insert_def(&self, type_: &TypeSpec, def: Option<TypeDef>) -> Option<TypeDef> {
        let mut state = self.state.write();
        let index = state.type_defs.iter().position(|(k, _)| k == type_);
        match (index, def) {
            (Some(i), Some(def)) => Some(std::mem::replace(&mut state.type_defs[i].1, def)),
            (Some(i), None) => Some(state.type_defs.remove(i).1),
            (None, Some(def)) => {
                state.type_defs.push((type_.clone(), def));
                None
            }
            (None, None) => None,
        }
    }

    fn lookup_exact(&self, type_: &TypeSpec) -> Option<TypeDef> {
        self.state
            .read()
            .type_defs
            .iter()
            .find(|(k, _)| k == type_)
            .map(|(_, d)| d.clone())
    }

    /// Remove the widget entry and return callbacks for `type_`.
    ///
    /// Returns `false`, changing nothing, if nothing was registered.
    pub fn reset_type(&self, type_: &TypeSpec) -> bool {
        let resolved = self.resolve_type(type_).unwrap_or_else(|_| type_.clone());
        let arms = union_arms(&resolved);
        let mut state = self.state.write();
        let before = state.type_defs.len() + state.return_callbacks.len();
        state.type_defs.retain(|(k, _)| !arms.contains(k));
        state.return_callbacks.retain(|(k, _)| !arms.contains(k));
        let removed = before != state.type_defs.len() + state.return_callbacks.len();
        if removed {
            tracing::debug!(target: targets::REGISTRY, %type_, "registration reset");
        }
        removed
    }

    /// Register for the lifetime of the returned guard.
    ///
    /// Dropping the guard restores the previous widget entry and removes the
    /// return callback again.
    pub fn type_registered(
        &self,
        type_: &TypeSpec,
        registration: TypeRegistration,
    ) -> Result<RegisteredType<'_>, RegistryError> {
        let resolved = self.resolve_type(type_)?;
        let modified = match &registration.return_callback {
            Some(callback) => self.add_return_callback(&union_arms(&resolved), callback),
            None => Vec::new(),
        };
        let (previous, _) =
            self.register_widget(&resolved, registration.widget_type.clone(), &registration.options);
        let current = self.lookup_exact(&resolved).map(|d| d.generation);
        Ok(RegisteredType {
            registry: self,
            type_: resolved,
            previous,
            current,
            callback: registration.return_callback,
            modified,
        })
    }

    /// The widget entry for `type_` or its closest registered ancestor.
    pub fn lookup(&self, type_: &TypeSpec) -> Option<TypeDef> {
        let state = self.state.read();
        let index = state.find(state.type_defs.iter().map(|(k, _)| k), type_)?;
        Some(state.type_defs[index].1.clone())
    }

    /// Return callbacks registered for `type_` or an ancestor.
    pub fn type2callback(&self, type_: &TypeSpec) -> Vec<ReturnCallback> {
        if type_.is_empty() {
            return Vec::new();
        }
        let Ok(resolved) = self.resolve_type(type_) else {
            return Vec::new();
        };
        let (resolved, _) = resolved.split_nullable();
        let state = self.state.read();
        state
            .find(state.return_callbacks.iter().map(|(k, _)| k), &resolved)
            .map(|i| state.return_callbacks[i].1.clone())
            .unwrap_or_default()
    }

    /// Add a matcher consulted for result widgets after the builtin ones.
    pub fn add_return_matcher<F>(&self, matcher: F)
    where
        F: Fn(&TypeSpec, &TypeNamespace) -> Option<(WidgetRef, WidgetOptions)> + Send + Sync + 'static,
    {
        self.state.write().return_matchers.push(Arc::new(matcher));
    }

    /// Run the matcher chain for a return type.
    pub fn match_return_type(&self, type_: &TypeSpec) -> Option<(WidgetRef, WidgetOptions)> {
        let (matchers, namespace) = {
            let state = self.state.read();
            (state.return_matchers.clone(), state.namespace.clone())
        };
        matchers.iter().find_map(|m| m(type_, &namespace))
    }

    /// Make a custom widget class available by name.
    pub fn register_widget_class(
        &self,
        class: Arc<dyn CustomWidgetClass>,
    ) -> Option<Arc<dyn CustomWidgetClass>> {
        let name = class.name().to_string();
        tracing::debug!(target: targets::REGISTRY, name = %name, "registered widget class");
        self.state.write().widget_classes.insert(name, class)
    }

    pub fn widget_class(&self, name: &str) -> Option<Arc<dyn CustomWidgetClass>> {
        self.state.read().widget_classes.get(name).cloned()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("TypeRegistry")
            .field("types", &state.type_defs.iter().map(|(k, _)| k.to_string()).collect::<Vec<_>>())
            .field("policy", &state.policy)
            .finish()
    }
}

static_assertions::assert_impl_all!(TypeRegistry: Send, Sync);

/// Arms a registration applies to.
fn union_arms(type_: &TypeSpec) -> Vec<TypeSpec> {
    match type_ {
        TypeSpec::Union(args) => args
            .iter()
            .filter(|a| !matches!(a, TypeSpec::NoneType))
            .cloned()
            .collect(),
        other => vec![other.clone()],
    }
}

/// A scoped registration, undone on drop.
#[must_use = "the registration is undone when the guard is dropped"]
pub struct RegisteredType<'a> {
    registry: &'a TypeRegistry,
    type_: TypeSpec,
    previous: Option<TypeDef>,
    current: Option<u64>,
    callback: Option<ReturnCallback>,
    modified: Vec<TypeSpec>,
}

impl Drop for RegisteredType<'_> {
    fn drop(&mut self) {
        if let Some(callback) = &self.callback {
            let mut state = self.registry.state.write();
            for (key, callbacks) in state.return_callbacks.iter_mut() {
                if self.modified.contains(key) {
                    callbacks.retain(|c| !c.same(callback));
                }
            }
            state.return_callbacks.retain(|(_, callbacks)| !callbacks.is_empty());
        }
        let now = self.registry.lookup_exact(&self.type_).map(|d| d.generation);
        if now != self.current {
            tracing::warn!(target: targets::REGISTRY, type_ = %self.type_, "type definition changed during context");
        }
        self.registry.insert_def(&self.type_, self.previous.take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> (TypeSpec, TypeSpec, TypeSpec) {
        let shape = ClassType::new("Shape");
        let circle = ClassType::with_bases("Circle", [TypeSpec::Class(shape.clone())]);
        let unit = ClassType::with_bases("UnitCircle", [TypeSpec::Class(circle.clone())]);
        (shape.into(), circle.into(), unit.into())
    }

    #[test]
    fn test_empty_registration_rejected() {
        let registry = TypeRegistry::new();
        let err = registry
            .register_type(&TypeSpec::Int, TypeRegistration::new())
            .unwrap_err();
        assert!(matches!(err, RegistryError::EmptyRegistration { .. }));
    }

    #[test]
    fn test_choices_override_widget_type() {
        let registry = TypeRegistry::new();
        let (shape, _, _) = shape();
        let outcome = registry
            .register_type(
                &shape,
                TypeRegistration::new()
                    .with_widget_type(WidgetKind::Slider)
                    .with_choices(vec![1_i64, 2, 3]),
            )
            .unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert!(registry.lookup(&shape).unwrap().widget.is_kind(WidgetKind::ComboBox));
    }

    #[test]
    fn test_bind_alone_uses_empty_widget() {
        let registry = TypeRegistry::new();
        let (shape, _, _) = shape();
        registry
            .register_type(&shape, TypeRegistration::new().with_bind(Value::Int(1)))
            .unwrap();
        assert!(registry.lookup(&shape).unwrap().widget.is_kind(WidgetKind::EmptyWidget));
    }

    #[test]
    fn test_lookup_policies() {
        let registry = TypeRegistry::new();
        let (shape, circle, unit) = shape();
        registry
            .register_type(&shape, TypeRegistration::new().with_widget_type(WidgetKind::SpinBox))
            .unwrap();
        registry
            .register_type(&circle, TypeRegistration::new().with_widget_type(WidgetKind::Slider))
            .unwrap();
        assert!(registry.lookup(&unit).unwrap().widget.is_kind(WidgetKind::Slider));
        registry.set_policy(LookupPolicy::FirstMatch);
        assert!(registry.lookup(&unit).unwrap().widget.is_kind(WidgetKind::SpinBox));
        assert!(registry.lookup(&TypeSpec::Str).is_none());
    }

    #[test]
    fn test_union_registers_each_arm() {
        let registry = TypeRegistry::new();
        let union = TypeSpec::Union(vec![TypeSpec::Int, TypeSpec::Str, TypeSpec::NoneType]);
        registry
            .register_type(&union, TypeRegistration::new().with_widget_type(WidgetKind::LineEdit))
            .unwrap();
        assert!(registry.lookup(&TypeSpec::Int).is_some());
        assert!(registry.lookup(&TypeSpec::Str).is_some());
        assert!(registry.lookup(&TypeSpec::NoneType).is_none());
    }

    #[test]
    fn test_forward_refs_resolve_against_namespace() {
        let registry = TypeRegistry::new();
        let err = registry
            .register_type(
                &TypeSpec::forward_ref("mylib.Thing"),
                TypeRegistration::new().with_widget_type(WidgetKind::LineEdit),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnresolvedType(_)));

        let thing = ClassType::new("mylib.Thing");
        registry.declare_class(thing.clone());
        registry
            .register_type(
                &TypeSpec::forward_ref("mylib.Thing"),
                TypeRegistration::new().with_widget_type(WidgetKind::LineEdit),
            )
            .unwrap();
        assert!(registry.lookup(&TypeSpec::Class(thing)).is_some());
    }

    #[test]
    fn test_reset_type() {
        let registry = TypeRegistry::new();
        let (shape, _, _) = shape();
        assert!(!registry.reset_type(&shape));
        registry
            .register_type(
                &shape,
                TypeRegistration::new().with_return_callback(|_, _, _| {}),
            )
            .unwrap();
        assert_eq!(registry.type2callback(&shape).len(), 1);
        assert!(registry.reset_type(&shape));
        assert!(registry.type2callback(&shape).is_empty());
    }

    #[test]
    fn test_type_registered_restores_previous() {
        let registry = TypeRegistry::new();
        let (shape, circle, _) = shape();
        registry
            .register_type(&shape, TypeRegistration::new().with_widget_type(WidgetKind::SpinBox))
            .unwrap();
        {
            let _guard = registry
                .type_registered(
                    &shape,
                    TypeRegistration::new()
                        .with_widget_type(WidgetKind::Slider)
                        .with_return_callback(|_, _, _| {}),
                )
                .unwrap();
            assert!(registry.lookup(&shape).unwrap().widget.is_kind(WidgetKind::Slider));
            assert_eq!(registry.type2callback(&circle).len(), 1);
        }
        assert!(registry.lookup(&shape).unwrap().widget.is_kind(WidgetKind::SpinBox));
        assert!(registry.type2callback(&circle).is_empty());
    }
}
