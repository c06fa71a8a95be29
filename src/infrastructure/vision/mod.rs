pub mod feed;
pub mod stability;

pub use feed::VisionFeed;
pub use stability::{GateStatus, StabilityGate};
