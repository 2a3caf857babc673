//! Tests for value validation on ranged and categorical widgets.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use horizon_autogui::{
    ChoicesSource, TypeRegistry, Value, Widget, WidgetContext, WidgetError, WidgetKind,
    WidgetOptions, WidgetRequest, create_widget,
};

fn build(request: WidgetRequest) -> Arc<dyn Widget> {
    create_widget(&request.with_registry(Arc::new(TypeRegistry::new()))).unwrap()
}

#[test]
fn test_ranged_rejects_out_of_range() {
    let widget = build(
        WidgetRequest::new()
            .with_name("n")
            .with_value(3)
            .with_options(WidgetOptions::new().with_min(0.0).with_max(10.0)),
    );
    let value = widget.as_value().unwrap();

    let err = value.set_value(Value::Int(11)).unwrap_err();
    assert!(matches!(err, WidgetError::OutOfRange { .. }));
    assert_eq!(value.value().unwrap(), Value::Int(3));

    value.set_value(Value::Int(7)).unwrap();
    assert_eq!(value.value().unwrap(), Value::Int(7));
}

#[test]
fn test_ranged_bounds_can_move() {
    let widget = build(
        WidgetRequest::new()
            .with_name("f")
            .with_value(0.5)
            .with_options(WidgetOptions::new().with_widget_type(WidgetKind::FloatSlider)),
    );
    let ranged = widget.as_ranged().unwrap();
    ranged.set_range(-5.0, 5.0);
    assert_eq!(ranged.range(), (-5.0, 5.0));
    widget.as_value().unwrap().set_value(Value::Float(-4.5)).unwrap();
    assert!(widget.as_value().unwrap().set_value(Value::Float(6.0)).is_err());
}

#[test]
fn test_categorical_rejects_unknown_choice() {
    let widget = build(
        WidgetRequest::new()
            .with_name("letter")
            .with_value("a")
            .with_options(WidgetOptions::new().with_choices(vec!["a", "b", "c"])),
    );
    let value = widget.as_value().unwrap();

    let err = value.set_value(Value::str("z")).unwrap_err();
    assert!(matches!(err, WidgetError::InvalidChoice { .. }));
    assert_eq!(value.value().unwrap(), Value::str("a"));

    value.set_value(Value::str("b")).unwrap();
    assert_eq!(value.value().unwrap(), Value::str("b"));
    assert_eq!(widget.as_categorical().unwrap().current_choice().as_deref(), Some("b"));
}

#[test]
fn test_reset_choices_fetches_fresh_state() {
    let counter = Arc::new(AtomicI64::new(1));
    let source = {
        let counter = counter.clone();
        ChoicesSource::from_fn(move |_: &WidgetContext| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            (0..n).map(Value::Int).collect()
        })
    };
    let widget = build(
        WidgetRequest::new()
            .with_name("counted")
            .with_options(WidgetOptions::new().with_choices(source)),
    );
    let categorical = widget.as_categorical().unwrap();

    let mut sizes = vec![categorical.len()];
    for _ in 0..3 {
        widget.reset_choices();
        sizes.push(categorical.len());
    }
    assert!(sizes.windows(2).all(|w| w[0] < w[1]), "sizes {sizes:?}");
}

#[test]
fn test_null_value_only_for_nullable_widgets() {
    let widget = build(WidgetRequest::new().with_name("n").with_value(2));
    let err = widget.as_value().unwrap().set_value(Value::None).unwrap_err();
    assert!(matches!(err, WidgetError::NotNullable { .. }));

    let widget = build(
        WidgetRequest::new()
            .with_name("n")
            .with_value(2)
            .with_options(WidgetOptions::new().with_nullable(true)),
    );
    widget.as_value().unwrap().set_value(Value::None).unwrap();
    assert_eq!(widget.as_value().unwrap().value().unwrap(), Value::None);
}

#[test]
fn test_bound_value_replaces_widget_value() {
    let widget = build(
        WidgetRequest::new()
            .with_name("n")
            .with_value(1)
            .with_options(WidgetOptions::new().with_bind(Value::Int(42))),
    );
    assert!(!widget.visible());
    assert_eq!(widget.as_value().unwrap().value().unwrap(), Value::Int(42));
    widget.as_value().unwrap().unbind();
    assert_eq!(widget.as_value().unwrap().value().unwrap(), Value::Int(1));
}
