//! Logging facilities for Horizon AutoGUI.
//!
//! Horizon AutoGUI uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("horizon_autogui=debug")
//!         .init();
//! }
//! ```
//!
//! Warnings the resolver and registry emit (for example a `RadioButton`
//! coerced to `RadioButtons`) are logged at `warn` level under the targets
//! below, and are also returned to the caller.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core primitives target.
    pub const CORE: &str = "horizon_autogui_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_autogui_core::signal";
    /// Literal codec target.
    pub const LITERAL: &str = "horizon_autogui_core::literal";
    /// Type registry target.
    pub const REGISTRY: &str = "horizon_autogui::registry";
    /// Widget resolver target.
    pub const RESOLVER: &str = "horizon_autogui::resolver";
    /// Widget wrapper target.
    pub const WIDGET: &str = "horizon_autogui::widget";
    /// Container target.
    pub const CONTAINER: &str = "horizon_autogui::container";
    /// Function GUI target.
    pub const FUNCTION_GUI: &str = "horizon_autogui::function_gui";
    /// Persistence target.
    pub const PERSIST: &str = "horizon_autogui::persist";
}

/// Span names used throughout Horizon AutoGUI for tracing.
pub mod span_names {
    /// Widget resolution span.
    pub const RESOLVE: &str = "horizon_autogui::resolve";
    /// Widget construction span.
    pub const CREATE_WIDGET: &str = "horizon_autogui::create_widget";
    /// Function call span.
    pub const CALL: &str = "horizon_autogui::call";
}
