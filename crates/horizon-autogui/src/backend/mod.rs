//! Widget backends.
//!
//! A [`Backend`] creates native widgets by class name and hands them out as
//! [`BackendWidget`]s. The crate ships a [`HeadlessBackend`] that keeps all
//! state in memory; it is the process default until
//! [`set_default_backend`] installs another one.

mod headless;

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::error::WidgetError;
use crate::options::WidgetOptions;
use crate::protocols::BackendWidget;

pub use headless::HeadlessBackend;

/// A native widget toolkit.
pub trait Backend: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Create the native widget for a builtin class such as `"SpinBox"`.
    ///
    /// Fails with [`WidgetError::MissingWidget`] if the toolkit has no such
    /// widget.
    fn create(&self, class: &str, options: &WidgetOptions) -> Result<BackendWidget, WidgetError>;

    /// Rendered width of `text` in a label, in pixels.
    fn text_width(&self, text: &str) -> u32;
}

fn default_slot() -> &'static RwLock<Arc<dyn Backend>> {
    static DEFAULT: OnceLock<RwLock<Arc<dyn Backend>>> = OnceLock::new();
    DEFAULT.get_or_init(|| RwLock::new(Arc::new(HeadlessBackend::new())))
}

/// The backend widgets are created with unless one is given explicitly.
pub fn default_backend() -> Arc<dyn Backend> {
    default_slot().read().clone()
}

/// Replace the process-wide default backend.
pub fn set_default_backend(backend: Arc<dyn Backend>) {
    tracing::debug!(
        target: horizon_autogui_core::logging::targets::WIDGET,
        backend = backend.name(),
        "default backend changed"
    );
    *default_slot().write() = backend;
}
