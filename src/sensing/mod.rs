pub mod controller;
pub mod loop_worker;
pub mod probe;

pub use controller::SensingController;
pub use probe::{ActivityProbe, ObservationAssembler, PhoneReading, WindowInfo};
