//! Time advancement and the end-of-frame deferred pipeline.

use std::sync::Arc;

use super::Engine;
use crate::effect::TickReport;
use crate::frame::{DeferredAction, FrameSummary, InvalidatedAction};
use crate::tag::WorkerContext;
use crate::types::{EffectHandle, EntityId};

impl Engine {
    /// Advances the simulation clocks by `dt` seconds: effect requirement
    /// re-evaluation, duration/periodic ticking, and gate elapsed trackers.
    /// Worker side effects land in the deferred queue for
    /// [`end_frame`](Self::end_frame).
    pub fn advance(&mut self, dt: f32) {
        self.frame_dt = dt;
        let catchup = self.config.catchup_tick_limit;

        for id in self.state.ids() {
            self.reevaluate_requirements(id);
            self.tick_effects(id, dt, catchup);
            if let Some(entity) = self.state.entity_mut(id) {
                entity.gate.advance(dt);
            }
        }
    }

    /// Re-checks every live instance's removal and ongoing requirements.
    /// Removal wins; failing the ongoing requirement pauses without
    /// deleting state.
    fn reevaluate_requirements(&mut self, id: EntityId) {
        let mut decisions: Vec<(EffectHandle, bool, bool)> = Vec::new();
        {
            let Some(entity) = self.state.entity(id) else {
                return;
            };
            for fx in entity.shelf.iter() {
                let definition = fx.definition();
                let remove = !definition.removal_requirement.is_vacuous()
                    && self.requirement_holds(&definition.removal_requirement, fx.source(), id);
                let ongoing = definition.ongoing_requirement.is_vacuous()
                    || self.requirement_holds(&definition.ongoing_requirement, fx.source(), id);
                decisions.push((fx.handle(), remove, ongoing));
            }
        }
        for (handle, remove, ongoing) in decisions {
            if remove {
                self.remove_effect(id, handle);
            } else {
                self.set_effect_ongoing(id, handle, ongoing);
            }
        }
    }

    fn tick_effects(&mut self, id: EntityId, dt: f32, catchup: u32) {
        let mut reports: Vec<(EffectHandle, TickReport)> = Vec::new();
        if let Some(entity) = self.state.entity_mut(id) {
            for fx in entity.shelf.iter_mut() {
                reports.push((fx.handle(), fx.advance(dt, catchup)));
            }
        }
        for (handle, report) in reports {
            // Boundaries crossed before expiry still fire.
            for _ in 0..report.execute_ticks {
                self.execute_tick(id, handle);
            }
            if report.expired {
                self.remove_effect(id, handle);
            }
        }
    }

    /// Pauses or resumes one instance. Pausing takes its standing
    /// contributions off the ledgers and rescinds its granted tags; resuming
    /// re-grants and reinstalls at freshly evaluated magnitudes.
    pub(crate) fn set_effect_ongoing(
        &mut self,
        target: EntityId,
        handle: EffectHandle,
        ongoing: bool,
    ) -> bool {
        let Some(fx) = self
            .state
            .entity_mut(target)
            .and_then(|entity| entity.shelf.get_mut(handle))
        else {
            return false;
        };
        if !fx.set_ongoing(ongoing) {
            return false;
        }
        let definition = Arc::clone(fx.definition());
        let source = fx.source();
        let level = fx.level();
        let stacks = fx.stacks();

        if ongoing {
            if let Some(entity) = self.state.entity_mut(target) {
                entity.tags.add_tags(&definition.granted_tags);
            }
            if definition.periodic.is_none() {
                self.install_continuous(source, target, &definition, handle, level, stacks);
            }
        } else {
            if definition.periodic.is_none() {
                self.uninstall_continuous(source, target, &definition, handle);
            }
            if let Some(entity) = self.state.entity_mut(target) {
                entity.tags.remove_tags(&definition.granted_tags);
            }
        }
        true
    }

    /// Runs the fixed end-of-frame phase sequence and returns the emitted
    /// summary:
    /// drain, evaluate tag workers, drain, tick tag workers, drain, run
    /// analysis workers, drain, emit to frame listeners, clear, destroy.
    pub fn end_frame(&mut self) -> FrameSummary {
        self.drain();
        self.evaluate_workers();
        self.drain();
        self.tick_workers();
        self.drain();
        self.run_analysis();
        self.drain();

        let snapshot = self.summary.clone();
        for listener in &mut self.listeners {
            listener.on_frame(&snapshot);
        }
        self.summary.clear();
        self.summary.frame += 1;

        for id in std::mem::take(&mut self.destroy_requests) {
            self.state.despawn(id);
        }
        self.frame_dt = 0.0;
        snapshot
    }

    /// Fully resolves the queue, including second-order actions enqueued by
    /// resolved ones. Terminates for any bounded action chain.
    fn drain(&mut self) {
        while let Some(action) = self.deferred.pop_front() {
            self.resolve(action);
        }
    }

    fn evaluate_workers(&mut self) {
        for id in self.state.ids() {
            let Some(entity) = self.state.entity_mut(id) else {
                continue;
            };
            let mut ctx = WorkerContext {
                owner: id,
                tags: &entity.tags,
                attributes: &entity.attributes,
                queue: &mut self.deferred,
                dt: 0.0,
            };
            entity.workers.evaluate(&mut ctx);
        }
    }

    fn tick_workers(&mut self) {
        let dt = self.frame_dt;
        for id in self.state.ids() {
            let Some(entity) = self.state.entity_mut(id) else {
                continue;
            };
            let mut ctx = WorkerContext {
                owner: id,
                tags: &entity.tags,
                attributes: &entity.attributes,
                queue: &mut self.deferred,
                dt,
            };
            entity.workers.tick_active(&mut ctx);
        }
    }

    fn run_analysis(&mut self) {
        let mut recommended = Vec::new();
        for worker in &mut self.analysis {
            recommended.extend(worker.analyze(&self.state, &self.summary));
        }
        self.deferred.extend(recommended);
    }

    /// Consumes one deferred action. Failures become invalidation records
    /// in the frame summary rather than errors.
    fn resolve(&mut self, action: DeferredAction) {
        match action {
            DeferredAction::ApplyEffect {
                source,
                target,
                definition,
            } => {
                if !self.apply_effect(source, target, &definition) {
                    self.summary.record_invalidated(InvalidatedAction::new(
                        target,
                        format!("effect '{}' refused", definition.name),
                    ));
                }
            }
            DeferredAction::RemoveEffect { target, handle } => {
                if !self.remove_effect(target, handle) {
                    self.summary.record_invalidated(InvalidatedAction::new(
                        target,
                        format!("no applied effect {handle}"),
                    ));
                }
            }
            DeferredAction::ModifyAttribute {
                source,
                target,
                attribute,
                change,
                clamp,
            } => {
                if self
                    .modify_attribute(source, target, attribute, change, clamp)
                    .is_none()
                {
                    self.summary.record_invalidated(InvalidatedAction::new(
                        target,
                        "attribute change refused",
                    ));
                }
            }
            DeferredAction::GrantTags { target, tags } => {
                match self.state.entity_mut(target) {
                    Some(entity) => entity.tags.add_tags(&tags),
                    None => self
                        .summary
                        .record_invalidated(InvalidatedAction::new(target, "no such entity")),
                }
            }
            DeferredAction::RescindTags { target, tags } => {
                match self.state.entity_mut(target) {
                    Some(entity) => entity.tags.remove_tags(&tags),
                    None => self
                        .summary
                        .record_invalidated(InvalidatedAction::new(target, "no such entity")),
                }
            }
            DeferredAction::MarkDestroyed(entity) => self.mark_destroyed(entity),
            DeferredAction::Invalidate(invalidated) => {
                self.summary.record_invalidated(invalidated);
            }
        }
    }
}
