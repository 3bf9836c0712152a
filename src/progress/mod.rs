//! Progress reporting for frontend builds

mod handler;
mod logging;

pub use handler::{NoOpHandler, PlatformState, ProgressEvent, ProgressHandler};
pub use logging::LoggingHandler;
