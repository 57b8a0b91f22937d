//! Tag-driven workers.
//!
//! A worker watches one tag: it activates when the tag's weight reaches its
//! threshold, ticks every frame while active, and resolves when the weight
//! drops back below the threshold. All three phases enqueue deferred actions
//! through the context instead of mutating entity state inline, so their
//! consequences land in the end-of-frame drain order.

use std::collections::VecDeque;

use super::multiset::TagMultiset;
use crate::attribute::AttributeStore;
use crate::frame::DeferredAction;
use crate::types::{EntityId, TagId};

/// Read-only view of the owning entity plus the deferred queue workers
/// enqueue into.
pub struct WorkerContext<'a> {
    pub owner: EntityId,
    pub tags: &'a TagMultiset,
    pub attributes: &'a AttributeStore,
    pub queue: &'a mut VecDeque<DeferredAction>,
    /// Frame delta time in seconds. Zero outside the tick phase.
    pub dt: f32,
}

/// One tag-driven behavior.
pub trait TagWorker: Send + Sync {
    /// The tag whose weight drives this worker.
    fn watched(&self) -> TagId;

    /// Minimum weight at which the worker activates.
    fn threshold(&self) -> u32 {
        1
    }

    /// Called once when the watched weight reaches the threshold.
    fn activate(&mut self, ctx: &mut WorkerContext<'_>) {
        let _ = ctx;
    }

    /// Called every frame while active.
    fn tick(&mut self, ctx: &mut WorkerContext<'_>) {
        let _ = ctx;
    }

    /// Called once when the watched weight drops below the threshold.
    fn resolve(&mut self, ctx: &mut WorkerContext<'_>) {
        let _ = ctx;
    }
}

struct WorkerSlot {
    worker: Box<dyn TagWorker>,
    active: bool,
}

/// Drives the evaluate/tick/resolve protocol over a set of registered
/// workers, in registration order.
#[derive(Default)]
pub struct TagWorkerSet {
    slots: Vec<WorkerSlot>,
}

impl TagWorkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, worker: Box<dyn TagWorker>) {
        self.slots.push(WorkerSlot {
            worker,
            active: false,
        });
    }

    /// Activates workers whose condition newly holds and resolves workers
    /// whose condition lapsed.
    pub fn evaluate(&mut self, ctx: &mut WorkerContext<'_>) {
        for slot in &mut self.slots {
            let holds = ctx.tags.weight(slot.worker.watched()) >= slot.worker.threshold();
            if holds && !slot.active {
                slot.active = true;
                slot.worker.activate(ctx);
            } else if !holds && slot.active {
                slot.active = false;
                slot.worker.resolve(ctx);
            }
        }
    }

    /// Ticks every active worker.
    pub fn tick_active(&mut self, ctx: &mut WorkerContext<'_>) {
        for slot in &mut self.slots {
            if slot.active {
                slot.worker.tick(ctx);
            }
        }
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[derive(Default)]
    struct Counts {
        activations: AtomicU32,
        ticks: AtomicU32,
        resolutions: AtomicU32,
    }

    struct Recorder {
        watched: TagId,
        threshold: u32,
        counts: Arc<Counts>,
    }

    impl Recorder {
        fn new(watched: TagId, threshold: u32) -> (Self, Arc<Counts>) {
            let counts = Arc::new(Counts::default());
            (
                Self {
                    watched,
                    threshold,
                    counts: Arc::clone(&counts),
                },
                counts,
            )
        }
    }

    impl TagWorker for Recorder {
        fn watched(&self) -> TagId {
            self.watched
        }

        fn threshold(&self) -> u32 {
            self.threshold
        }

        fn activate(&mut self, _ctx: &mut WorkerContext<'_>) {
            self.counts.activations.fetch_add(1, Ordering::Relaxed);
        }

        fn tick(&mut self, _ctx: &mut WorkerContext<'_>) {
            self.counts.ticks.fetch_add(1, Ordering::Relaxed);
        }

        fn resolve(&mut self, _ctx: &mut WorkerContext<'_>) {
            self.counts.resolutions.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn drive(set: &mut TagWorkerSet, tags: &TagMultiset, queue: &mut VecDeque<DeferredAction>) {
        let attributes = AttributeStore::new(EntityId(1));
        let mut ctx = WorkerContext {
            owner: EntityId(1),
            tags,
            attributes: &attributes,
            queue,
            dt: 0.1,
        };
        set.evaluate(&mut ctx);
        set.tick_active(&mut ctx);
    }

    #[test]
    fn threshold_crossing_activates_once() {
        let burning = TagId(4);
        let (recorder, counts) = Recorder::new(burning, 2);
        let mut set = TagWorkerSet::new();
        set.register(Box::new(recorder));
        let mut tags = TagMultiset::new();
        let mut queue = VecDeque::new();

        // weight 1: below threshold, inactive, no tick.
        tags.add_tags(&[burning]);
        drive(&mut set, &tags, &mut queue);
        assert_eq!(set.active_count(), 0);
        assert_eq!(counts.ticks.load(Ordering::Relaxed), 0);

        // weight 2: activates, ticks while held.
        tags.add_tags(&[burning]);
        drive(&mut set, &tags, &mut queue);
        drive(&mut set, &tags, &mut queue);
        assert_eq!(set.active_count(), 1);
        assert_eq!(counts.activations.load(Ordering::Relaxed), 1);
        assert_eq!(counts.ticks.load(Ordering::Relaxed), 2);

        // back to weight 1: resolves.
        tags.remove_tags(&[burning]);
        drive(&mut set, &tags, &mut queue);
        assert_eq!(set.active_count(), 0);
        assert_eq!(counts.resolutions.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn worker_rearms_after_resolution() {
        let stunned = TagId(7);
        let (recorder, counts) = Recorder::new(stunned, 1);
        let mut set = TagWorkerSet::new();
        set.register(Box::new(recorder));
        let mut tags = TagMultiset::new();
        let mut queue = VecDeque::new();

        tags.add_tags(&[stunned]);
        drive(&mut set, &tags, &mut queue);
        drive(&mut set, &tags, &mut queue);
        tags.remove_tags(&[stunned]);
        drive(&mut set, &tags, &mut queue);
        tags.add_tags(&[stunned]);
        drive(&mut set, &tags, &mut queue);

        // 2 activations (re-armed after resolve), 3 ticks, 1 resolution.
        assert_eq!(counts.activations.load(Ordering::Relaxed), 2);
        assert_eq!(counts.ticks.load(Ordering::Relaxed), 3);
        assert_eq!(counts.resolutions.load(Ordering::Relaxed), 1);
    }
}
