use thiserror::Error;

/// Failure to decode a single component descriptor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComponentError {
    #[error("Invalid component format: {input}")]
    InvalidFormat { input: String },
}

/// Failure to convert between a chat response and a graph.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("Failed to parse chat response: component {index}: {source}")]
    Component {
        index: usize,
        #[source]
        source: ComponentError,
    },

    #[error("Invalid edge: {from} -> {to}")]
    DanglingEdge { from: String, to: String },
}

/// Failure to read or write the settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
