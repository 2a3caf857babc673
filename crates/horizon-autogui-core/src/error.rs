//! Error types for the core primitives.

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the core primitives.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    /// Text could not be parsed as a literal.
    #[error("malformed literal at offset {offset}: {message} (in {text:?})")]
    Literal {
        text: String,
        offset: usize,
        message: String,
    },

    /// A forward reference named a type no namespace knows.
    #[error("could not resolve type '{name}': no such name in namespace")]
    UnresolvedForwardRef { name: String },
}

impl CoreError {
    /// Create a literal parse error.
    pub fn literal(text: impl Into<String>, offset: usize, message: impl Into<String>) -> Self {
        Self::Literal {
            text: text.into(),
            offset,
            message: message.into(),
        }
    }

    /// Create an unresolved forward reference error.
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self::UnresolvedForwardRef { name: name.into() }
    }
}
