//! Type annotations.
//!
//! [`TypeSpec`] describes the declared type of a parameter or return value.
//! It is what the resolver inspects to pick a widget and what the registry
//! is keyed by.
//!
//! Subtyping follows the familiar rules: `bool` is an `int`, `datetime` is a
//! `date`, `list` and `tuple` are `Sequence`s, generic arguments are
//! covariant, and user classes ([`ClassType`]) inherit from their declared
//! bases.
//!
//! # Example
//!
//! ```
//! use horizon_autogui_core::{ClassType, TypeSpec};
//!
//! let base = ClassType::new("Shape");
//! let circle = ClassType::with_bases("Circle", [TypeSpec::Class(base.clone())]);
//!
//! let circle = TypeSpec::Class(circle);
//! assert!(circle.is_subclass(&TypeSpec::Class(base.clone())));
//! assert_eq!(circle.mro_distance(&TypeSpec::Class(base)), Some(1));
//! assert!(TypeSpec::list_of(TypeSpec::Path).is_subclass(&TypeSpec::sequence_of(TypeSpec::Path)));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{CoreError, Result};
use crate::value::{EnumType, Value};

/// A type annotation.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TypeSpec {
    /// No annotation was given.
    #[default]
    Empty,
    /// `typing.Any`.
    Any,
    /// The type of `None`.
    NoneType,
    Bool,
    Int,
    Float,
    Str,
    Path,
    Date,
    Time,
    DateTime,
    TimeDelta,
    Range,
    Slice,
    Dict,
    /// `list` or `list[T]`.
    List(Option<Box<TypeSpec>>),
    /// `tuple` or `tuple[A, B, ...]`.
    Tuple(Option<Vec<TypeSpec>>),
    /// `Sequence` or `Sequence[T]`.
    Sequence(Option<Box<TypeSpec>>),
    /// `set` or `set[T]`.
    Set(Option<Box<TypeSpec>>),
    /// `Union[A, B, ...]`.
    Union(Vec<TypeSpec>),
    /// `Literal[a, b, ...]`.
    Literal(Vec<Value>),
    /// A user-declared enumeration.
    Enum(EnumType),
    /// A user-declared class.
    Class(ClassType),
    /// A type given by name, resolved later against a [`TypeNamespace`].
    ForwardRef(String),
    /// A callable.
    Function,
}

impl TypeSpec {
    /// `Optional[inner]`, i.e. `Union[inner, None]`.
    pub fn optional(inner: TypeSpec) -> Self {
        Self::Union(vec![inner, Self::NoneType])
    }

    pub fn list_of(elem: TypeSpec) -> Self {
        Self::List(Some(Box::new(elem)))
    }

    pub fn sequence_of(elem: TypeSpec) -> Self {
        Self::Sequence(Some(Box::new(elem)))
    }

    pub fn set_of(elem: TypeSpec) -> Self {
        Self::Set(Some(Box::new(elem)))
    }

    pub fn tuple_of(items: impl IntoIterator<Item = TypeSpec>) -> Self {
        Self::Tuple(Some(items.into_iter().collect()))
    }

    pub fn forward_ref(name: impl Into<String>) -> Self {
        Self::ForwardRef(name.into())
    }

    /// Whether no annotation was given.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Arms of a union, or an empty slice.
    pub fn union_args(&self) -> &[TypeSpec] {
        match self {
            Self::Union(args) => args,
            _ => &[],
        }
    }

    /// Split a nullable union.
    ///
    /// Returns the remaining type and whether a `None` (or `Any`) arm was
    /// present. A two-armed union unwraps to its other arm; wider unions keep
    /// their shape.
    pub fn split_nullable(&self) -> (TypeSpec, bool) {
        let Self::Union(args) = self else {
            return (self.clone(), false);
        };
        let Some(pos) = args
            .iter()
            .position(|a| matches!(a, Self::NoneType | Self::Any))
        else {
            return (self.clone(), false);
        };
        if args.len() == 2 {
            (args[1 - pos].clone(), true)
        } else {
            (self.clone(), true)
        }
    }

    /// The `Literal` members and whether `None` was one of them.
    ///
    /// Returns `None` if this is not a `Literal`.
    pub fn literal_choices(&self) -> Option<(Vec<Value>, bool)> {
        let Self::Literal(values) = self else {
            return None;
        };
        let nullable = values.iter().any(Value::is_none);
        let choices = values.iter().filter(|v| !v.is_none()).cloned().collect();
        Some((choices, nullable))
    }

    /// The user class, if this is one.
    pub fn as_class(&self) -> Option<&ClassType> {
        match self {
            Self::Class(c) => Some(c),
            _ => None,
        }
    }

    /// The enumeration, if this is one.
    pub fn as_enum(&self) -> Option<&EnumType> {
        match self {
            Self::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// Whether `self` is `other` or a subtype of it.
    pub fn is_subclass(&self, other: &TypeSpec) -> bool {
        self.mro_distance(other).is_some()
    }

    /// Number of inheritance hops from `self` up to `other`.
    ///
    /// `Some(0)` for equal types, `None` if `self` is not a subtype of `other`.
    pub fn mro_distance(&self, other: &TypeSpec) -> Option<usize> {
        if self == other {
            return Some(0);
        }
        match (self, other) {
            (Self::Sequence(Some(a)), Self::Sequence(Some(b)))
            | (Self::List(Some(a)), Self::List(Some(b)))
            | (Self::Set(Some(a)), Self::Set(Some(b))) => return a.mro_distance(b),
            (Self::Tuple(Some(items)), Self::Sequence(Some(b))) if !items.is_empty() => {
                let mut worst = 0;
                for item in items {
                    worst = worst.max(item.mro_distance(b)?);
                }
                return Some(worst + 1);
            }
            _ => {}
        }
        self.direct_bases()
            .iter()
            .filter_map(|base| base.mro_distance(other))
            .min()
            .map(|d| d + 1)
    }

    fn direct_bases(&self) -> Vec<TypeSpec> {
        match self {
            Self::Bool => vec![Self::Int],
            Self::DateTime => vec![Self::Date],
            Self::Range => vec![Self::sequence_of(Self::Int)],
            Self::List(Some(elem)) => vec![Self::List(None), Self::Sequence(Some(elem.clone()))],
            Self::List(None) | Self::Tuple(None) => vec![Self::Sequence(None)],
            Self::Tuple(Some(_)) => vec![Self::Tuple(None)],
            Self::Sequence(Some(_)) => vec![Self::Sequence(None)],
            Self::Set(Some(_)) => vec![Self::Set(None)],
            Self::Class(class) => class.bases().to_vec(),
            _ => Vec::new(),
        }
    }
}

impl From<ClassType> for TypeSpec {
    fn from(c: ClassType) -> Self {
        Self::Class(c)
    }
}

impl From<EnumType> for TypeSpec {
    fn from(e: EnumType) -> Self {
        Self::Enum(e)
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[TypeSpec]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("<empty>"),
            Self::Any => f.write_str("typing.Any"),
            Self::NoneType => f.write_str("None"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Str => f.write_str("str"),
            Self::Path => f.write_str("pathlib.Path"),
            Self::Date => f.write_str("datetime.date"),
            Self::Time => f.write_str("datetime.time"),
            Self::DateTime => f.write_str("datetime.datetime"),
            Self::TimeDelta => f.write_str("datetime.timedelta"),
            Self::Range => f.write_str("range"),
            Self::Slice => f.write_str("slice"),
            Self::Dict => f.write_str("dict"),
            Self::List(None) => f.write_str("list"),
            Self::List(Some(elem)) => write!(f, "list[{elem}]"),
            Self::Tuple(None) => f.write_str("tuple"),
            Self::Tuple(Some(items)) => {
                f.write_str("tuple[")?;
                write_args(f, items)?;
                f.write_str("]")
            }
            Self::Sequence(None) => f.write_str("typing.Sequence"),
            Self::Sequence(Some(elem)) => write!(f, "typing.Sequence[{elem}]"),
            Self::Set(None) => f.write_str("set"),
            Self::Set(Some(elem)) => write!(f, "set[{elem}]"),
            Self::Union(args) => match self.split_nullable() {
                (inner, true) if args.len() == 2 && args.contains(&Self::NoneType) => {
                    write!(f, "typing.Optional[{inner}]")
                }
                _ => {
                    f.write_str("typing.Union[")?;
                    write_args(f, args)?;
                    f.write_str("]")
                }
            },
            Self::Literal(values) => {
                f.write_str("typing.Literal[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            Self::Enum(e) => f.write_str(e.name()),
            Self::Class(c) => f.write_str(c.name()),
            Self::ForwardRef(name) => write!(f, "'{name}'"),
            Self::Function => f.write_str("typing.Callable"),
        }
    }
}

// =============================================================================
// User classes
// =============================================================================

struct ClassInner {
    name: String,
    bases: Vec<TypeSpec>,
}

/// A user-declared class with an inheritance list.
///
/// Cheap to clone; equality is identity of the declaration.
#[derive(Clone)]
pub struct ClassType(Arc<ClassInner>);

impl ClassType {
    /// Declare a class with no bases.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_bases(name, [])
    }

    /// Declare a class deriving from `bases`, nearest first.
    pub fn with_bases(name: impl Into<String>, bases: impl IntoIterator<Item = TypeSpec>) -> Self {
        Self(Arc::new(ClassInner {
            name: name.into(),
            bases: bases.into_iter().collect(),
        }))
    }

    /// The qualified name, e.g. `pandas.DataFrame`.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The last dotted segment of the name.
    pub fn short_name(&self) -> &str {
        self.0.name.rsplit('.').next().unwrap_or(&self.0.name)
    }

    pub fn bases(&self) -> &[TypeSpec] {
        &self.0.bases
    }
}

impl PartialEq for ClassType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassType").field(&self.0.name).finish()
    }
}

// =============================================================================
// Namespaces
// =============================================================================

/// Names visible when resolving forward references.
#[derive(Debug, Clone)]
pub struct TypeNamespace {
    names: HashMap<String, TypeSpec>,
}

impl Default for TypeNamespace {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeNamespace {
    /// A namespace holding the builtin types.
    pub fn new() -> Self {
        let mut names = HashMap::new();
        for (name, spec) in [
            ("bool", TypeSpec::Bool),
            ("int", TypeSpec::Int),
            ("float", TypeSpec::Float),
            ("str", TypeSpec::Str),
            ("pathlib.Path", TypeSpec::Path),
            ("Path", TypeSpec::Path),
            ("datetime.date", TypeSpec::Date),
            ("datetime.time", TypeSpec::Time),
            ("datetime.datetime", TypeSpec::DateTime),
            ("datetime.timedelta", TypeSpec::TimeDelta),
            ("range", TypeSpec::Range),
            ("slice", TypeSpec::Slice),
            ("dict", TypeSpec::Dict),
            ("list", TypeSpec::List(None)),
            ("tuple", TypeSpec::Tuple(None)),
            ("typing.Sequence", TypeSpec::Sequence(None)),
            ("set", TypeSpec::Set(None)),
            ("typing.Any", TypeSpec::Any),
            ("Any", TypeSpec::Any),
            ("None", TypeSpec::NoneType),
        ] {
            names.insert(name.to_string(), spec);
        }
        Self { names }
    }

    /// Make `spec` visible under `name`, returning what it replaced.
    pub fn insert(&mut self, name: impl Into<String>, spec: TypeSpec) -> Option<TypeSpec> {
        self.names.insert(name.into(), spec)
    }

    /// Declare a class by name and make it visible.
    pub fn declare_class(&mut self, class: ClassType) {
        self.names
            .insert(class.name().to_string(), TypeSpec::Class(class));
    }

    pub fn get(&self, name: &str) -> Option<&TypeSpec> {
        self.names.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Replace every forward reference inside `spec` with its target.
    pub fn resolve(&self, spec: &TypeSpec) -> Result<TypeSpec> {
        let resolve_box = |b: &Option<Box<TypeSpec>>| -> Result<Option<Box<TypeSpec>>> {
            b.as_deref()
                .map(|inner| self.resolve(inner).map(Box::new))
                .transpose()
        };
        Ok(match spec {
            TypeSpec::ForwardRef(name) => {
                let target = self
                    .names
                    .get(name)
                    .ok_or_else(|| CoreError::unresolved(name.as_str()))?;
                self.resolve(target)?
            }
            TypeSpec::List(elem) => TypeSpec::List(resolve_box(elem)?),
            TypeSpec::Sequence(elem) => TypeSpec::Sequence(resolve_box(elem)?),
            TypeSpec::Set(elem) => TypeSpec::Set(resolve_box(elem)?),
            TypeSpec::Tuple(Some(items)) => TypeSpec::Tuple(Some(
                items.iter().map(|t| self.resolve(t)).collect::<Result<_>>()?,
            )),
            TypeSpec::Union(args) => {
                TypeSpec::Union(args.iter().map(|t| self.resolve(t)).collect::<Result<_>>()?)
            }
            other => other.clone(),
        })
    }
}

static_assertions::assert_impl_all!(TypeSpec: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_subtyping() {
        assert!(TypeSpec::Bool.is_subclass(&TypeSpec::Int));
        assert!(!TypeSpec::Int.is_subclass(&TypeSpec::Bool));
        assert!(TypeSpec::DateTime.is_subclass(&TypeSpec::Date));
        assert!(TypeSpec::List(None).is_subclass(&TypeSpec::Sequence(None)));
        assert!(TypeSpec::tuple_of([TypeSpec::Int]).is_subclass(&TypeSpec::Tuple(None)));
        assert!(!TypeSpec::Str.is_subclass(&TypeSpec::Sequence(None)));
    }

    #[test]
    fn test_generic_covariance() {
        let seq_path = TypeSpec::sequence_of(TypeSpec::Path);
        assert!(TypeSpec::list_of(TypeSpec::Path).is_subclass(&seq_path));
        assert!(TypeSpec::tuple_of([TypeSpec::Path, TypeSpec::Path]).is_subclass(&seq_path));
        assert!(!TypeSpec::list_of(TypeSpec::Int).is_subclass(&seq_path));
        assert!(TypeSpec::list_of(TypeSpec::Int).is_subclass(&TypeSpec::Sequence(None)));
    }

    #[test]
    fn test_class_mro_distance() {
        let a = ClassType::new("A");
        let b = ClassType::with_bases("B", [TypeSpec::Class(a.clone())]);
        let c = ClassType::with_bases("C", [TypeSpec::Class(b.clone())]);
        let c = TypeSpec::Class(c);
        assert_eq!(c.mro_distance(&TypeSpec::Class(b)), Some(1));
        assert_eq!(c.mro_distance(&TypeSpec::Class(a.clone())), Some(2));
        assert_eq!(TypeSpec::Class(a).mro_distance(&c), None);
    }

    #[test]
    fn test_class_deriving_builtin() {
        let my_int = TypeSpec::Class(ClassType::with_bases("MyInt", [TypeSpec::Int]));
        assert!(my_int.is_subclass(&TypeSpec::Int));
    }

    #[test]
    fn test_split_nullable() {
        let (inner, nullable) = TypeSpec::optional(TypeSpec::Int).split_nullable();
        assert_eq!(inner, TypeSpec::Int);
        assert!(nullable);

        let wide = TypeSpec::Union(vec![TypeSpec::Int, TypeSpec::Str, TypeSpec::NoneType]);
        let (inner, nullable) = wide.split_nullable();
        assert_eq!(inner, wide);
        assert!(nullable);

        assert_eq!(TypeSpec::Int.split_nullable(), (TypeSpec::Int, false));
    }

    #[test]
    fn test_literal_choices() {
        let lit = TypeSpec::Literal(vec![Value::str("a"), Value::None, Value::str("b")]);
        let (choices, nullable) = lit.literal_choices().unwrap();
        assert_eq!(choices, vec![Value::str("a"), Value::str("b")]);
        assert!(nullable);
        assert!(TypeSpec::Str.literal_choices().is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(TypeSpec::optional(TypeSpec::Int).to_string(), "typing.Optional[int]");
        assert_eq!(
            TypeSpec::sequence_of(TypeSpec::Path).to_string(),
            "typing.Sequence[pathlib.Path]"
        );
        assert_eq!(TypeSpec::tuple_of([TypeSpec::Int, TypeSpec::Str]).to_string(), "tuple[int, str]");
    }

    #[test]
    fn test_namespace_resolves_nested_forward_refs() {
        let mut ns = TypeNamespace::new();
        let frame = ClassType::new("pandas.DataFrame");
        ns.declare_class(frame.clone());

        let spec = TypeSpec::optional(TypeSpec::list_of(TypeSpec::forward_ref("pandas.DataFrame")));
        let resolved = ns.resolve(&spec).unwrap();
        assert_eq!(
            resolved,
            TypeSpec::optional(TypeSpec::list_of(TypeSpec::Class(frame)))
        );

        let err = ns.resolve(&TypeSpec::forward_ref("nope.Missing")).unwrap_err();
        assert_eq!(err, CoreError::unresolved("nope.Missing"));
    }

    #[test]
    fn test_default_is_empty_annotation() {
        assert_eq!(TypeSpec::default(), TypeSpec::Empty);
        assert!(TypeSpec::default().is_empty());
    }
}
