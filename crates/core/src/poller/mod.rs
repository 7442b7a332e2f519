//! Render job poller.
//!
//! Turns the fire-and-poll avatar render into a single outcome: the video
//! bytes, an explicit remote failure, a timeout, or a cancellation.

mod config;
mod runner;
mod state;

pub use config::PollerConfig;
pub use runner::{JobPoller, RenderError};
pub use state::{PollState, RenderJob};
