//! Deciding when a freshly laid out scan window is pushed to the native side.

mod dispatcher;
mod hysteresis;
mod pipeline;
#[cfg(test)]
mod tests;

pub use dispatcher::ScanWindowDispatcher;
pub use hysteresis::ScanWindowHysteresis;
pub use pipeline::ScanWindowPipeline;
