pub mod controller;
pub mod state;

pub use controller::{IngestResult, SessionController};
pub use state::{SessionState, StatusSnapshot, DEFAULT_FOCUS_TARGET};
