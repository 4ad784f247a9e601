//! Error types for the automation engine.

/// Top-level error type for the automation system.
#[derive(Debug, thiserror::Error)]
pub enum AutomationError {
    /// Configuration could not be read, parsed or validated.
    #[error("config error: {0}")]
    Config(String),

    /// Task or account collection persistence error.
    #[error("store error: {0}")]
    Store(String),

    /// Target window lookup, foregrounding or capture error.
    #[error("window error: {0}")]
    Window(String),

    /// Synthetic input injection error.
    #[error("input error: {0}")]
    Input(String),

    /// Template matching or text recognition error.
    #[error("vision error: {0}")]
    Vision(String),

    /// Engine control error (start/stop/submit in the wrong state).
    #[error("engine error: {0}")]
    Engine(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AutomationError>;
