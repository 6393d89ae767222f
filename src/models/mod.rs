pub mod observation;
pub mod policy;
pub mod session;

pub use observation::Observation;
pub use policy::{NudgeAction, NudgingPolicy};
pub use session::{FocusSession, FocusStart, SessionStatus};
