/// Simulation configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    /// Upper bound on execute ticks a single periodic effect may emit in one
    /// `advance` pass. The accumulator carries any remainder into the next
    /// pass, so ticks are delayed rather than dropped.
    pub catchup_tick_limit: u32,
}

impl SimConfig {
    // ===== compile-time constants used as type parameters =====
    /// Maximum abilities granted to one entity.
    pub const MAX_ABILITIES: usize = 16;
    /// Maximum concurrently applied effect instances on one entity.
    pub const MAX_ACTIVE_EFFECTS: usize = 32;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_CATCHUP_TICK_LIMIT: u32 = 16;

    pub fn new() -> Self {
        Self {
            catchup_tick_limit: Self::DEFAULT_CATCHUP_TICK_LIMIT,
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new()
    }
}
