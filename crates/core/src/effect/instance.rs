//! Runtime state of one applied effect.

use std::sync::Arc;

use super::definition::{DurationPolicy, EffectDefinition};
use crate::types::{EffectHandle, EntityId};

/// Ticks produced by one [`EffectInstance::advance`] pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Periodic interval boundaries crossed this pass.
    pub execute_ticks: u32,
    /// Duration reached zero this pass. One-way: the instance is already
    /// marked removed when this is set.
    pub expired: bool,
}

/// One applied occurrence of an effect definition against a (source, target)
/// pair.
///
/// Lifecycle: applied (ongoing or paused) until duration expiry or explicit
/// removal. Pausing via [`set_ongoing`](Self::set_ongoing) stops periodic
/// ticking but the duration clock keeps running; removal is terminal.
#[derive(Clone, Debug)]
pub struct EffectInstance {
    handle: EffectHandle,
    definition: Arc<EffectDefinition>,
    source: EntityId,
    level: u32,
    stacks: u32,
    /// Seconds left; only meaningful for durational instances.
    remaining: f32,
    /// Elapsed time toward the next periodic boundary.
    accumulator: f32,
    ongoing: bool,
    removed: bool,
}

impl EffectInstance {
    pub fn new(
        handle: EffectHandle,
        definition: Arc<EffectDefinition>,
        source: EntityId,
        level: u32,
    ) -> Self {
        let remaining = definition.authored_duration().unwrap_or(0.0);
        Self {
            handle,
            definition,
            source,
            level,
            stacks: 1,
            remaining,
            accumulator: 0.0,
            ongoing: true,
            removed: false,
        }
    }

    pub fn handle(&self) -> EffectHandle {
        self.handle
    }

    pub fn definition(&self) -> &Arc<EffectDefinition> {
        &self.definition
    }

    pub fn source(&self) -> EntityId {
        self.source
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn stacks(&self) -> u32 {
        self.stacks
    }

    /// The raw pause flag. Stays meaningful after removal so cleanup can
    /// tell a paused instance (contributions already gone) from an ongoing
    /// one.
    pub fn is_ongoing(&self) -> bool {
        self.ongoing
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Seconds until duration expiry; infinite-policy instances always
    /// report positive infinity.
    pub fn duration_remaining(&self) -> f32 {
        match self.definition.duration {
            DurationPolicy::Infinite => f32::INFINITY,
            DurationPolicy::Durational(_) => self.remaining,
            DurationPolicy::Instant => 0.0,
        }
    }

    /// Authored total duration; infinite instances report positive infinity.
    pub fn duration_total(&self) -> f32 {
        match self.definition.duration {
            DurationPolicy::Infinite => f32::INFINITY,
            DurationPolicy::Durational(secs) => secs,
            DurationPolicy::Instant => 0.0,
        }
    }

    /// Advances the duration and periodic clocks by `dt` seconds.
    ///
    /// Duration runs even while paused; the periodic accumulator only runs
    /// while ongoing, and only time inside the instance's lifetime feeds it,
    /// so a pass that overshoots expiry never ticks past it. Crossing
    /// several interval boundaries in one pass yields several execute
    /// ticks, capped at `catchup_limit` with the excess left in the
    /// accumulator for the next pass.
    pub fn advance(&mut self, dt: f32, catchup_limit: u32) -> TickReport {
        if self.removed {
            return TickReport::default();
        }

        let mut report = TickReport::default();
        let mut lived = dt;

        if let DurationPolicy::Durational(_) = self.definition.duration {
            lived = dt.min(self.remaining);
            self.remaining -= dt;
            if self.remaining <= 0.0 {
                self.remaining = 0.0;
                self.removed = true;
                report.expired = true;
            }
        }

        if self.ongoing
            && let Some(periodic) = self.definition.periodic
            && periodic.interval > 0.0
        {
            self.accumulator += lived;
            let mut ticks = (self.accumulator / periodic.interval) as u32;
            if ticks > catchup_limit {
                ticks = catchup_limit;
            }
            self.accumulator -= ticks as f32 * periodic.interval;
            report.execute_ticks = ticks;
        }

        report
    }

    /// Resets the duration clock to the full authored duration.
    pub fn refresh(&mut self) {
        if self.removed {
            return;
        }
        if let Some(total) = self.definition.authored_duration() {
            self.remaining = total;
        }
    }

    /// Adds the full authored duration on top of what remains.
    pub fn extend(&mut self) {
        if self.removed {
            return;
        }
        if let Some(total) = self.definition.authored_duration() {
            self.remaining += total;
        }
    }

    /// Adds one stack, bounded by the definition's stack cap. Returns the
    /// resulting count.
    pub fn stack(&mut self) -> u32 {
        let cap = self.definition.stack_cap();
        if self.stacks < cap {
            self.stacks += 1;
        }
        self.stacks
    }

    /// Pauses or resumes the instance without touching its clocks or stack
    /// count. Returns true when the flag actually flipped.
    pub fn set_ongoing(&mut self, ongoing: bool) -> bool {
        if self.removed || self.ongoing == ongoing {
            return false;
        }
        self.ongoing = ongoing;
        true
    }

    /// Terminal transition; idempotent.
    pub fn mark_removed(&mut self) {
        self.removed = true;
    }
}
