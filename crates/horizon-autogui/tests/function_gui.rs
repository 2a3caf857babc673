//! Tests for calling functions through their GUIs.

use std::sync::Arc;

use horizon_autogui::{
    AutoguiError, BoundArguments, CallArgs, CallError, ClassType, FunctionGuiBuilder,
    FunctionSpec, Parameter, SignatureError, TypeRegistry, TypeSpec, Value, Widget, WidgetError,
    WidgetOptions,
};
use parking_lot::Mutex;

const DOC: &str = "Scale a number.

    Args:
        x: The number to scale.
        factor: How much to scale by.
    ";

fn scale(args: &BoundArguments) -> Result<Value, horizon_autogui::BoxError> {
    let x = args.get("x").and_then(Value::as_f64).ok_or("x is required")?;
    let factor = args.get("factor").and_then(Value::as_f64).unwrap_or(1.0);
    Ok(Value::Float(x * factor))
}

fn scale_spec() -> FunctionSpec {
    FunctionSpec::new("scale", scale)
        .with_parameter(Parameter::new("x").with_annotation(TypeSpec::Float).with_default(2.0))
        .with_parameter(
            Parameter::new("factor")
                .with_annotation(TypeSpec::Float)
                .with_default(3.0),
        )
        .with_return_annotation(TypeSpec::Float)
        .with_doc(DOC)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn builder() -> FunctionGuiBuilder {
    init_tracing();
    FunctionGuiBuilder::new(scale_spec()).with_registry(Arc::new(TypeRegistry::new()))
}

#[test]
fn test_call_matches_direct_call_with_widget_values() {
    let gui = builder().build().unwrap();
    let direct = {
        let sig = gui.signature().unwrap();
        let mut bound = sig
            .bind(&[], &gui.container().asdict().unwrap())
            .unwrap();
        bound.apply_defaults();
        scale(&bound).unwrap()
    };
    assert_eq!(gui.call(CallArgs::new()).unwrap(), direct);
    assert_eq!(direct, Value::Float(6.0));
}

#[test]
fn test_override_applies_to_one_call_only() {
    let gui = builder().build().unwrap();
    let value = gui
        .call(CallArgs::new().with_kwarg("factor", 10.0))
        .unwrap();
    assert_eq!(value, Value::Float(20.0));

    let factor = gui.get("factor").unwrap();
    assert_eq!(factor.as_value().unwrap().value().unwrap(), Value::Float(3.0));
    assert_eq!(gui.call(CallArgs::new()).unwrap(), Value::Float(6.0));
}

#[test]
fn test_tooltips_from_docstring() {
    let gui = builder()
        .with_param_options("factor", WidgetOptions::new().with_tooltip("explicit"))
        .build()
        .unwrap();
    assert_eq!(
        gui.get("x").unwrap().tooltip().as_deref(),
        Some("The number to scale.")
    );
    assert_eq!(gui.get("factor").unwrap().tooltip().as_deref(), Some("explicit"));

    let gui = builder().with_tooltips(false).build().unwrap();
    assert_eq!(gui.get("x").unwrap().tooltip(), None);
}

#[test]
fn test_param_options_for_unknown_parameter() {
    let err = builder()
        .with_param_options("nope", WidgetOptions::new().with_max(5.0))
        .build()
        .err()
        .unwrap();
    assert!(matches!(
        err,
        AutoguiError::Signature(SignatureError::UnknownParamOptions { .. })
    ));
}

#[test]
fn test_called_signal_and_result_widget() {
    let gui = builder().with_result_widget(true).build().unwrap();
    let results = Arc::new(Mutex::new(Vec::new()));
    let sink = results.clone();
    gui.called().connect(move |value| sink.lock().push(value.clone()));

    gui.call(CallArgs::new().with_arg(1.5)).unwrap();
    assert_eq!(*results.lock(), vec![Value::Float(4.5)]);
    let shown = gui.result_widget().unwrap().as_value().unwrap().value().unwrap();
    assert_eq!(shown, Value::str("4.5"));
    // the result widget is not a parameter
    assert_eq!(gui.signature().unwrap().len(), 2);
}

#[test]
fn test_auto_call_follows_widget_changes() {
    let gui = builder().with_auto_call(true).build().unwrap();
    assert!(gui.call_button().is_none());
    gui.get("x")
        .unwrap()
        .as_value()
        .unwrap()
        .set_value(Value::Float(5.0))
        .unwrap();
    assert_eq!(gui.call_count(), 1);

    gui.set_auto_call(false);
    gui.get("x")
        .unwrap()
        .as_value()
        .unwrap()
        .set_value(Value::Float(6.0))
        .unwrap();
    assert_eq!(gui.call_count(), 1);
}

#[test]
fn test_persist_round_trip_between_builds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scale.json");
    let b = builder().with_persist_path(&path);

    let first = b.build().unwrap();
    first
        .get("factor")
        .unwrap()
        .as_value()
        .unwrap()
        .set_value(Value::Float(7.0))
        .unwrap();

    let second = b.build().unwrap();
    assert_eq!(
        second.get("factor").unwrap().as_value().unwrap().value().unwrap(),
        Value::Float(7.0)
    );
    assert_eq!(second.call(CallArgs::new()).unwrap(), Value::Float(14.0));
}

#[test]
fn test_unreadable_widget_value_fails_the_call() {
    init_tracing();
    let echo = FunctionSpec::new("echo", |args| {
        Ok(args.get("x").cloned().unwrap_or(Value::None))
    })
    .with_parameter(
        Parameter::new("x")
            .with_annotation(TypeSpec::Class(ClassType::new("Thing")))
            .with_default(1),
    );
    let gui = FunctionGuiBuilder::new(echo)
        .with_registry(Arc::new(TypeRegistry::new()))
        .build()
        .unwrap();
    assert_eq!(gui.call(CallArgs::new()).unwrap(), Value::Int(1));

    let x = gui.get("x").unwrap();
    assert_eq!(x.widget_type(), "LiteralEvalLineEdit");
    x.as_value()
        .unwrap()
        .value_widget()
        .backend()
        .set_value(Value::str("not a literal((("));

    let err = gui.call(CallArgs::new()).unwrap_err();
    assert!(
        matches!(err, CallError::Widget(WidgetError::Literal(_))),
        "unexpected error: {err:?}"
    );
    assert!(matches!(
        gui.container().asdict(),
        Err(WidgetError::Literal(_))
    ));
    assert!(gui.signature().is_err());
    assert_eq!(gui.call_count(), 1);
}
