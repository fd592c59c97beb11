use std::time::Duration;

use thiserror::Error;

/// A run aborted by the host's execution budget.
///
/// These are not program exceptions: `Try` cannot catch them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("step limit exceeded: more than {limit} instructions executed")]
    StepLimitExceeded { limit: u64 },
    #[error("nesting depth limit exceeded: deeper than {limit} sub-programs")]
    DepthLimitExceeded { limit: usize },
    #[error("execution timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },
}
