//! Dynamic values carried by widgets.
//!
//! A widget's value, a parameter's default, a choice's data and a function's
//! result are all [`Value`]s. The variants mirror the types the resolver
//! knows how to build widgets for, plus [`Value::Enum`] for members of
//! user-declared enumerations and [`Value::Object`] for opaque instances of
//! user-declared classes.
//!
//! `Display` renders a Python-like `repr` (`'text'`, `1.0`, `(1, 2)`,
//! `Color.Red`), which is what signatures and error messages show.

use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::types::{ClassType, TypeSpec};

/// A dynamically-typed value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum Value {
    /// The null value (`None`).
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Path(PathBuf),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    #[serde(skip)]
    TimeDelta(TimeDelta),
    /// `range(start, stop, step)`.
    Range { start: i64, stop: i64, step: i64 },
    /// `slice(start, stop, step)`.
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    },
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// Key/value pairs in insertion order.
    Dict(Vec<(Value, Value)>),
    #[serde(skip)]
    Enum(EnumMember),
    #[serde(skip)]
    Object(ObjectValue),
}

impl Value {
    /// Build a string value.
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Build a path value.
    pub fn path(p: impl Into<PathBuf>) -> Self {
        Self::Path(p.into())
    }

    /// Whether this is `None`.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view. Integral floats convert; other floats do not.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    /// Numeric view, used for range validation.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Elements of a list or tuple.
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) | Self::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumMember> {
        match self {
            Self::Enum(member) => Some(member),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// The runtime type of this value (`type(value)`).
    pub fn type_spec(&self) -> TypeSpec {
        match self {
            Self::None => TypeSpec::NoneType,
            Self::Bool(_) => TypeSpec::Bool,
            Self::Int(_) => TypeSpec::Int,
            Self::Float(_) => TypeSpec::Float,
            Self::Str(_) => TypeSpec::Str,
            Self::Path(_) => TypeSpec::Path,
            Self::Date(_) => TypeSpec::Date,
            Self::Time(_) => TypeSpec::Time,
            Self::DateTime(_) => TypeSpec::DateTime,
            Self::TimeDelta(_) => TypeSpec::TimeDelta,
            Self::Range { .. } => TypeSpec::Range,
            Self::Slice { .. } => TypeSpec::Slice,
            Self::List(_) => TypeSpec::List(None),
            Self::Tuple(_) => TypeSpec::Tuple(None),
            Self::Dict(_) => TypeSpec::Dict,
            Self::Enum(member) => TypeSpec::Enum(member.enum_type().clone()),
            Self::Object(obj) => TypeSpec::Class(obj.class().clone()),
        }
    }

    /// The `str()` of this value, used as a choice label.
    ///
    /// Strings render without quotes and enum members render as their bare
    /// member name; everything else renders like `repr`.
    pub fn to_label(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            Self::Path(p) => p.display().to_string(),
            Self::Enum(member) => member.name().to_string(),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (None, None) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Int(a), Float(b)) | (Float(b), Int(a)) => (*a as f64) == *b,
            (Str(a), Str(b)) => a == b,
            (Path(a), Path(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Time(a), Time(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            (TimeDelta(a), TimeDelta(b)) => a == b,
            (
                Range { start, stop, step },
                Range {
                    start: s2,
                    stop: e2,
                    step: st2,
                },
            ) => start == s2 && stop == e2 && step == st2,
            (
                Slice { start, stop, step },
                Slice {
                    start: s2,
                    stop: e2,
                    step: st2,
                },
            ) => start == s2 && stop == e2 && step == st2,
            (List(a), List(b)) | (Tuple(a), Tuple(b)) => a == b,
            (Dict(a), Dict(b)) => a == b,
            (Enum(a), Enum(b)) => a == b,
            (Object(a), Object(b)) => a == b,
            _ => false,
        }
    }
}

fn write_str_repr(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("'")?;
    for c in s.chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("'")
}

fn write_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_nan() {
        f.write_str("nan")
    } else if x.is_infinite() {
        f.write_str(if x > 0.0 { "inf" } else { "-inf" })
    } else {
        write!(f, "{x:?}")
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_opt(f: &mut fmt::Formatter<'_>, v: Option<i64>) -> fmt::Result {
    match v {
        Some(v) => write!(f, "{v}"),
        None => f.write_str("None"),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write_float(f, *x),
            Self::Str(s) => write_str_repr(f, s),
            Self::Path(p) => write!(f, "PosixPath('{}')", p.display()),
            Self::Date(d) => write!(f, "datetime.date({})", d.format("%Y, %-m, %-d")),
            Self::Time(t) => write!(f, "datetime.time({})", t.format("%-H, %-M, %-S")),
            Self::DateTime(dt) => write!(
                f,
                "datetime.datetime({})",
                dt.format("%Y, %-m, %-d, %-H, %-M, %-S")
            ),
            Self::TimeDelta(td) => write!(f, "datetime.timedelta(seconds={})", td.num_seconds()),
            Self::Range { start, stop, step } => {
                if *step == 1 {
                    write!(f, "range({start}, {stop})")
                } else {
                    write!(f, "range({start}, {stop}, {step})")
                }
            }
            Self::Slice { start, stop, step } => {
                f.write_str("slice(")?;
                write_opt(f, *start)?;
                f.write_str(", ")?;
                write_opt(f, *stop)?;
                f.write_str(", ")?;
                write_opt(f, *step)?;
                f.write_str(")")
            }
            Self::List(items) => {
                f.write_str("[")?;
                write_seq(f, items)?;
                f.write_str("]")
            }
            Self::Tuple(items) => {
                f.write_str("(")?;
                write_seq(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Self::Dict(pairs) => {
                f.write_str("{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Self::Enum(member) => write!(f, "{}.{}", member.enum_type().name(), member.name()),
            Self::Object(obj) => f.write_str(obj.repr()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<PathBuf> for Value {
    fn from(v: PathBuf) -> Self {
        Self::Path(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Self::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<EnumMember> for Value {
    fn from(v: EnumMember) -> Self {
        Self::Enum(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::None, Into::into)
    }
}

// =============================================================================
// Enumerations
// =============================================================================

#[derive(Debug)]
struct EnumInner {
    name: String,
    members: Vec<(String, Value)>,
}

/// A user-declared enumeration type.
///
/// Cheap to clone; two handles are equal only if they came from the same
/// [`EnumType::new`] call.
///
/// # Example
///
/// ```
/// use horizon_autogui_core::{EnumType, Value};
///
/// let color = EnumType::new("Color", [("Red", Value::Int(1)), ("Blue", Value::Int(2))]);
/// let red = color.member("Red").unwrap();
/// assert_eq!(red.to_string(), "Color.Red");
/// assert_eq!(color.values().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct EnumType(Arc<EnumInner>);

impl EnumType {
    /// Declare an enumeration with members in declaration order.
    pub fn new<I, N>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = (N, Value)>,
        N: Into<String>,
    {
        Self(Arc::new(EnumInner {
            name: name.into(),
            members: members.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.0.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.members.is_empty()
    }

    /// Member with the given name, as a value.
    pub fn member(&self, name: &str) -> Option<Value> {
        self.0
            .members
            .iter()
            .position(|(n, _)| n == name)
            .map(|index| Value::Enum(EnumMember { enum_type: self.clone(), index }))
    }

    /// All members in declaration order (`list(E.__members__.values())`).
    pub fn values(&self) -> Vec<Value> {
        (0..self.0.members.len())
            .map(|index| Value::Enum(EnumMember { enum_type: self.clone(), index }))
            .collect()
    }
}

impl PartialEq for EnumType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A member of an [`EnumType`].
#[derive(Debug, Clone)]
pub struct EnumMember {
    enum_type: EnumType,
    index: usize,
}

impl EnumMember {
    pub fn enum_type(&self) -> &EnumType {
        &self.enum_type
    }

    pub fn name(&self) -> &str {
        &self.enum_type.0.members[self.index].0
    }

    /// The member's underlying value.
    pub fn value(&self) -> &Value {
        &self.enum_type.0.members[self.index].1
    }
}

impl PartialEq for EnumMember {
    fn eq(&self, other: &Self) -> bool {
        self.enum_type == other.enum_type && self.index == other.index
    }
}

// =============================================================================
// Opaque objects
// =============================================================================

/// An opaque instance of a user-declared class.
///
/// Equality is identity: two `ObjectValue`s are equal only if they share the
/// same underlying allocation.
#[derive(Clone)]
pub struct ObjectValue {
    class: ClassType,
    data: Arc<dyn Any + Send + Sync>,
    repr: String,
}

impl ObjectValue {
    /// Wrap `data` as an instance of `class`.
    pub fn new<T: Any + Send + Sync + fmt::Debug>(class: ClassType, data: T) -> Self {
        let repr = format!("{data:?}");
        Self {
            class,
            data: Arc::new(data),
            repr,
        }
    }

    pub fn class(&self) -> &ClassType {
        &self.class
    }

    pub fn repr(&self) -> &str {
        &self.repr
    }

    /// Borrow the wrapped data as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }
}

impl PartialEq for ObjectValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectValue")
            .field("class", &self.class.name())
            .field("repr", &self.repr)
            .finish()
    }
}

static_assertions::assert_impl_all!(Value: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repr_matches_python() {
        assert_eq!(Value::None.to_string(), "None");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::str("it's").to_string(), "'it\\'s'");
        assert_eq!(Value::Tuple(vec![Value::Int(1)]).to_string(), "(1,)");
        assert_eq!(
            Value::List(vec![Value::Int(1), Value::str("a")]).to_string(),
            "[1, 'a']"
        );
        assert_eq!(
            Value::Range {
                start: 0,
                stop: 10,
                step: 1
            }
            .to_string(),
            "range(0, 10)"
        );
    }

    #[test]
    fn test_int_float_equality() {
        assert_eq!(Value::Int(2), Value::Float(2.0));
        assert_ne!(Value::Int(2), Value::Float(2.5));
        assert_ne!(Value::Int(1), Value::Bool(true));
    }

    #[test]
    fn test_enum_members_in_declaration_order() {
        let e = EnumType::new("Mode", [("B", Value::Int(2)), ("A", Value::Int(1))]);
        let names: Vec<_> = e.values().iter().map(Value::to_label).collect();
        assert_eq!(names, vec!["B", "A"]);

        let other = EnumType::new("Mode", [("B", Value::Int(2))]);
        assert_ne!(e.member("B"), other.member("B"));
        assert_eq!(e.member("B"), e.member("B"));
    }

    #[test]
    fn test_type_spec_of_values() {
        assert_eq!(Value::Int(1).type_spec(), TypeSpec::Int);
        assert_eq!(Value::List(vec![]).type_spec(), TypeSpec::List(None));
        let e = EnumType::new("E", [("X", Value::Int(0))]);
        assert_eq!(e.member("X").unwrap().type_spec(), TypeSpec::Enum(e));
    }

    #[test]
    fn test_object_identity() {
        let class = ClassType::new("Thing");
        let a = ObjectValue::new(class.clone(), 5_u32);
        let b = ObjectValue::new(class, 5_u32);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.downcast_ref::<u32>(), Some(&5));
    }

    #[test]
    fn test_plain_values_serialize() {
        let v = Value::List(vec![Value::Int(1), Value::str("x")]);
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);

        let e = EnumType::new("E", [("X", Value::Int(0))]);
        assert!(serde_json::to_string(&e.member("X").unwrap()).is_err());
    }
}
