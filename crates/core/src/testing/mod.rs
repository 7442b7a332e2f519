//! Testing utilities and mock implementations.
//!
//! [`MockGateway`] stands in for every remote service so the poller and
//! orchestrator can be exercised without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use newsreel_core::testing::MockGateway;
//!
//! let gateway = MockGateway::new();
//! gateway.set_job_id("job-42").await;
//! gateway.queue_poll_statuses(vec![RemoteStatus::Pending]).await;
//!
//! // Hand an Arc of it to RunOrchestrator::new...
//! ```

mod mock_gateway;

pub use mock_gateway::{MockGateway, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::config::Config;
    use crate::gateway::RemoteStatus;

    /// Configuration rooted at `output_root` with a 1 ms poll interval.
    pub fn fast_config(output_root: &Path, max_attempts: u32) -> Config {
        let mut config = Config::default();
        config.output.root = output_root.to_path_buf();
        config.poller.interval_ms = 1;
        config.poller.max_attempts = max_attempts;
        config
    }

    /// `n` pending statuses followed by a completed render.
    pub fn pending_then_done(n: usize, location: &str) -> Vec<RemoteStatus> {
        let mut statuses = vec![RemoteStatus::Pending; n];
        statuses.push(RemoteStatus::Done {
            result_location: location.to_string(),
        });
        statuses
    }
}
