//! Connection status of the client, as surfaced to the user.
//!
//! Set by the commands layer after every API call so the CLI can tell the
//! user whether they are looking at live data, sample data, or nothing.

/// All possible states of the client's view of the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    /// No session -- initial state and post-logout state.
    SignedOut,
    /// Last call reached the API and succeeded.
    Live,
    /// API unreachable -- results come from the built-in sample data.
    Demo,
    /// The API answered with an error (with human-readable description).
    Error(String),
}

impl ConnectionStatus {
    /// Short status label.
    pub fn label(&self) -> &str {
        match self {
            ConnectionStatus::SignedOut => "Signed out",
            ConnectionStatus::Live => "Connected",
            ConnectionStatus::Demo => "Demo mode",
            ConnectionStatus::Error(_) => "Error",
        }
    }

    /// Longer notice shown next to results, if any.
    pub fn notice(&self) -> Option<String> {
        match self {
            ConnectionStatus::Demo => Some(
                "Demo mode: the API is unreachable, showing sample data".to_string(),
            ),
            ConnectionStatus::Error(msg) => Some(format!("Error loading data: {}", msg)),
            _ => None,
        }
    }

    /// Returns `true` when results on screen may not reflect the server.
    pub fn is_degraded(&self) -> bool {
        matches!(self, ConnectionStatus::Demo | ConnectionStatus::Error(_))
    }
}
