//! Tests for containers and the signatures they synthesize.

use std::sync::Arc;

use horizon_autogui::{
    Container, ContainerConfig, ContainerError, Layout, Parameter, Signature, TypeRegistry,
    TypeSpec, Value, Widget, WidgetRequest, create_widget,
};

fn widget(name: &str, annotation: TypeSpec, value: Option<Value>) -> Arc<dyn Widget> {
    let mut request = WidgetRequest::new()
        .with_name(name)
        .with_annotation(annotation)
        .with_registry(Arc::new(TypeRegistry::new()));
    if let Some(value) = value {
        request = request.with_value(value);
    }
    create_widget(&request).unwrap()
}

fn defaults(signature: &Signature) -> Vec<(String, Option<Value>)> {
    signature
        .parameters()
        .iter()
        .map(|p| (p.name.clone(), p.default.clone()))
        .collect()
}

#[test]
fn test_signature_mirrors_widgets() {
    let c = Container::new(
        ContainerConfig::new(),
        [
            widget("a", TypeSpec::Int, Some(Value::Int(1))),
            widget("b", TypeSpec::Str, Some(Value::str("x"))),
        ],
    )
    .unwrap();
    let sig = c.signature().unwrap();
    assert_eq!(
        defaults(&sig),
        vec![
            ("a".to_string(), Some(Value::Int(1))),
            ("b".to_string(), Some(Value::str("x"))),
        ]
    );
    assert_eq!(sig.to_string(), "(a: int = 1, b: str = 'x')");
    assert_eq!(sig.get("a").map(|p| p.annotation.clone()), Some(TypeSpec::Int));
}

#[test]
fn test_required_parameters_sorted_first() {
    let c = Container::new(
        ContainerConfig::new(),
        [
            widget("a", TypeSpec::Int, Some(Value::Int(1))),
            widget("b", TypeSpec::Str, Some(Value::str("x"))),
        ],
    )
    .unwrap();
    c.append(widget("c", TypeSpec::Empty, None)).unwrap();
    let names: Vec<String> = c.signature().unwrap().names().map(str::to_string).collect();
    assert_eq!(names, ["c", "a", "b"]);
    // children keep their insertion order
    assert_eq!(c.names(), ["a", "b", "c"]);
}

#[test]
fn test_removed_widget_is_gone_everywhere() {
    let c = Container::new(
        ContainerConfig::new(),
        [
            widget("a", TypeSpec::Int, Some(Value::Int(1))),
            widget("b", TypeSpec::Int, Some(Value::Int(2))),
        ],
    )
    .unwrap();
    let removed = c.remove("a").unwrap();
    assert_eq!(removed.name(), "a");
    assert!(matches!(c.get("a"), Err(ContainerError::NoWidget(_))));
    assert_eq!(c.index_of("a"), None);
    assert_eq!(c.at(0).unwrap().name(), "b");
    assert!(matches!(
        c.remove_at(3),
        Err(ContainerError::IndexOutOfRange { index: 3, len: 1 })
    ));
    assert!(c.signature().unwrap().get("a").is_none());
}

#[test]
fn test_widgets_from_signature() {
    let sig = Signature::new([
        Parameter::new("count").with_annotation(TypeSpec::Int).with_default(4),
        Parameter::new("title").with_annotation(TypeSpec::Str).with_default("t"),
    ]);
    let c = sig.to_container(ContainerConfig::new()).unwrap();
    assert_eq!(c.names(), ["count", "title"]);
    assert_eq!(c.get("count").unwrap().widget_type(), "SpinBox");
    assert_eq!(c.signature().unwrap().to_string(), sig.to_string());
}

#[test]
fn test_layout_and_labels() {
    let c = Container::new(
        ContainerConfig::new().with_layout(Layout::Horizontal),
        [widget("a", TypeSpec::Int, Some(Value::Int(1)))],
    )
    .unwrap();
    assert_eq!(c.layout(), Layout::Horizontal);
    assert!(matches!(
        c.set_layout(Layout::Vertical),
        Err(ContainerError::LayoutImmutable)
    ));
    assert!(c.label_width().is_some());
    c.set_labels(false).unwrap();
    assert!(!c.labels());
    assert!(c.label_width().is_none());
}

#[test]
fn test_nested_containers_reset_choices() {
    let inner = Container::new(
        ContainerConfig::new().with_name("inner"),
        [widget("a", TypeSpec::Bool, Some(Value::Bool(true)))],
    )
    .unwrap();
    let outer = Container::new(ContainerConfig::new(), [inner.clone() as Arc<dyn Widget>]).unwrap();
    assert!(outer.get("inner").unwrap().as_container().is_some());
    Widget::reset_choices(outer.as_ref());
    assert_eq!(outer.asdict().unwrap().get("inner"), Some(&Value::None));
}

#[test]
fn test_widget_moves_between_containers() {
    let a = widget("a", TypeSpec::Int, Some(Value::Int(1)));
    let first = Container::new(ContainerConfig::new(), [a.clone()]).unwrap();
    let second = Container::new(
        ContainerConfig::new(),
        [widget("b", TypeSpec::Int, Some(Value::Int(2)))],
    )
    .unwrap();

    second.append(a.clone()).unwrap();
    assert!(first.is_empty());
    assert!(first.asdict().unwrap().is_empty());
    assert_eq!(second.names(), ["b", "a"]);
    assert!(a.parent().is_some_and(|p| Arc::ptr_eq(&p, &second)));

    // re-inserting into the same container moves it instead of duplicating
    second.insert(0, a.clone()).unwrap();
    assert_eq!(second.names(), ["a", "b"]);
    assert_eq!(second.signature().unwrap().len(), 2);
}
