pub mod cancel;
pub mod telemetry;

pub use cancel::CancellationToken;
pub use telemetry::*;
