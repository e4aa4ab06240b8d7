// /////////////////////////////////////////////////////////////////////////////
// NebulaStream Streaming Execution Core
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Worker pool sizing (config key `worker_threads`). Bounded to a sane range
//! so a misconfigured deployment fails fast at startup rather than spawning
//! an unreasonable number of OS threads.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerCount(u32);

impl WorkerCount {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 1024;

    pub fn new(count: u32) -> Result<Self, EngineError> {
        if !(Self::MIN..=Self::MAX).contains(&count) {
            return Err(EngineError::ConfigurationInvalid(format!(
                "worker_threads must be between {} and {}, got {count}",
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self(count))
    }

    /// One worker per available CPU core, the default absent explicit
    /// configuration.
    pub fn from_available_parallelism() -> Self {
        let count = std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(4);
        Self(count.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for WorkerCount {
    fn default() -> Self {
        Self(4)
    }
}

impl TryFrom<u32> for WorkerCount {
    type Error = EngineError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_workers() {
        assert!(WorkerCount::new(0).is_err());
    }

    #[test]
    fn rejects_count_above_max() {
        assert!(WorkerCount::new(2000).is_err());
    }

    #[test]
    fn accepts_in_range_count() {
        assert_eq!(WorkerCount::new(8).unwrap().get(), 8);
    }

    #[test]
    fn default_is_four() {
        assert_eq!(WorkerCount::default().get(), 4);
    }
}
