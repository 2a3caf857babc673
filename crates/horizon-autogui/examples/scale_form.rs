//! Builds a form for a function and calls it on the headless backend.
//!
//! Run with `RUST_LOG=horizon_autogui=debug` to see resolution decisions.

use horizon_autogui::{
    CallArgs, EnumType, FunctionGuiBuilder, FunctionSpec, Parameter, TypeSpec, Value, Widget,
    WidgetOptions,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let unit = EnumType::new("Unit", [("METERS", Value::Int(1)), ("FEET", Value::Int(2))]);
    let meters = unit.member("METERS").ok_or("missing member")?;

    let function = FunctionSpec::new("scale", |args| {
        let x = args.get("x").and_then(Value::as_f64).unwrap_or(0.0);
        let factor = args.get("factor").and_then(Value::as_f64).unwrap_or(1.0);
        let unit = args.get("unit").map(Value::to_label).unwrap_or_default();
        Ok(Value::Str(format!("{} {unit}", x * factor)))
    })
    .with_parameter(Parameter::new("x").with_annotation(TypeSpec::Float).with_default(1.5))
    .with_parameter(
        Parameter::new("factor")
            .with_annotation(TypeSpec::Int)
            .with_default(2)
            .with_options(WidgetOptions::new().with_min(1.0).with_max(10.0)),
    )
    .with_parameter(
        Parameter::new("unit")
            .with_annotation(TypeSpec::Enum(unit))
            .with_default(meters),
    )
    .with_return_annotation(TypeSpec::Str)
    .with_doc(
        "Scale a length.

        Args:
            x: The length.
            factor: Multiplier.
            unit: Unit of the result.
        ",
    );

    let gui = FunctionGuiBuilder::new(function)
        .with_result_widget(true)
        .build()?;
    println!("{gui:?}");
    for widget in gui.container().widgets() {
        println!(
            "  {:<12} {:<14} tooltip={:?}",
            widget.name(),
            widget.widget_type(),
            widget.tooltip()
        );
    }

    println!("default call -> {}", gui.call(CallArgs::new())?);
    println!(
        "override      -> {}",
        gui.call(CallArgs::new().with_kwarg("factor", 4))?
    );
    Ok(())
}
