//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the admission and reallocation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Upper bound on extra seats granted for active emergency occupants.
    pub max_emergency_overflow: u32,
    /// When false, full slots always reject; no occupant is ever displaced.
    pub preemption_enabled: bool,
    /// Grace period before an external scheduler marks a token `no_show`.
    /// The engine itself never runs a timer; a periodic job is expected to
    /// call `release(.., NoShow)` after this long.
    pub no_show_timeout_minutes: u32,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            max_emergency_overflow: 2,
            preemption_enabled: true,
            no_show_timeout_minutes: 15,
        }
    }
}
