//! UI-facing chat state: the reconciled message log, the typing-indicator
//! lifecycle, and the group presence set. These are owned by the consuming
//! view, not by the connection manager; the manager is transport only.

pub mod presence;
pub mod reconcile;
pub mod typing;
