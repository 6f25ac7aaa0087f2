use thiserror::Error;

/// Failures that prevent a connection attempt from reaching the network.
///
/// These never propagate as `Result`s to the UI; the connection manager
/// folds them into its published snapshot (state `Failed` plus the error
/// text) because the realtime core has no error bus of its own.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("invalid websocket url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
}
