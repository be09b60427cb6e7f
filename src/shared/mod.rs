/// Shared kernel: error taxonomy, result alias, clock and file-safety helpers
pub mod clock;
pub mod error;
pub mod result;
pub mod security;

pub use clock::{Clock, ManualClock, SystemClock};
pub use result::Result;
