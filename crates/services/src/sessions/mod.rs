mod active;
mod workflow;

// Public API of the test-taking subsystem.
pub use crate::error::TestError;
pub use active::ActiveTest;
pub use workflow::{TestLoopService, TestOutcome};
