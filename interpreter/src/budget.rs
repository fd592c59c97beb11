use std::convert::Infallible;
use std::time::{Duration, Instant};

use strand::Instruction;

use crate::error::RuntimeError;

/// One unit of work about to be performed by the executor.
#[derive(Debug, Clone, Copy)]
pub struct Step<'a> {
    /// 1-based count of steps in the current run, including this one.
    pub count: u64,
    /// Sub-program nesting depth; the top-level program is depth 0.
    pub depth: usize,
    pub instruction: &'a Instruction,
}

/// Host policy consulted before every instruction and every loop-condition test.
pub trait Budget {
    type Error;

    /// Called once at the start of each run.
    fn begin(&mut self) {}

    fn charge(&mut self, step: &Step<'_>) -> Result<(), Self::Error>;
}

/// Never refuses a step.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl Budget for Unbounded {
    type Error = Infallible;

    fn charge(&mut self, _step: &Step<'_>) -> Result<(), Infallible> {
        Ok(())
    }
}

/// Step, depth and wall-clock caps. A limit left as `None` is not enforced.
#[derive(Debug, Clone, Default)]
pub struct Limits {
    pub max_steps: Option<u64>,
    pub max_depth: Option<usize>,
    pub timeout: Option<Duration>,
    started: Option<Instant>,
}

impl Limits {
    pub fn new() -> Self {
        Limits::default()
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Budget for Limits {
    type Error = RuntimeError;

    fn begin(&mut self) {
        self.started = self.timeout.map(|_| Instant::now());
    }

    fn charge(&mut self, step: &Step<'_>) -> Result<(), RuntimeError> {
        if let Some(limit) = self.max_steps {
            if step.count > limit {
                return Err(RuntimeError::StepLimitExceeded { limit });
            }
        }
        if let Some(limit) = self.max_depth {
            if step.depth > limit {
                return Err(RuntimeError::DepthLimitExceeded { limit });
            }
        }
        if let (Some(timeout), Some(started)) = (self.timeout, self.started) {
            let elapsed = started.elapsed();
            if elapsed > timeout {
                return Err(RuntimeError::Timeout { elapsed });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(count: u64, depth: usize) -> Step<'static> {
        static INSTRUCTION: Instruction = Instruction::Uppercase;
        Step {
            count,
            depth,
            instruction: &INSTRUCTION,
        }
    }

    #[test]
    fn unset_limits_accept_everything() {
        let mut limits = Limits::new();
        limits.begin();
        assert!(limits.charge(&step(u64::MAX, usize::MAX)).is_ok());
    }

    #[test]
    fn step_limit_is_inclusive() {
        let mut limits = Limits::new().with_max_steps(3);
        limits.begin();
        assert!(limits.charge(&step(3, 0)).is_ok());
        assert_eq!(
            limits.charge(&step(4, 0)),
            Err(RuntimeError::StepLimitExceeded { limit: 3 })
        );
    }

    #[test]
    fn depth_limit() {
        let mut limits = Limits::new().with_max_depth(1);
        limits.begin();
        assert!(limits.charge(&step(1, 1)).is_ok());
        assert_eq!(
            limits.charge(&step(2, 2)),
            Err(RuntimeError::DepthLimitExceeded { limit: 1 })
        );
    }

    #[test]
    fn zero_timeout_expires() {
        let mut limits = Limits::new().with_timeout(Duration::ZERO);
        limits.begin();
        std::thread::sleep(Duration::from_millis(2));
        assert!(matches!(
            limits.charge(&step(1, 0)),
            Err(RuntimeError::Timeout { .. })
        ));
    }
}
