use crate::config::RevealConfig;

use super::counter::{format_grouped, CounterAnimation, CounterPhase, FrameStep, StartOutcome};
use super::{CounterId, Effect, ElementId, RevealError, RevealResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    Pending,
    Revealed,
}

/// Whether the host can report viewport intersections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Available,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub element: ElementId,
    pub is_intersecting: bool,
}

#[derive(Debug)]
struct Revealable {
    state: RevealState,
    counters: Vec<CounterId>,
}

#[derive(Debug)]
struct Counter {
    animation: CounterAnimation,
    orphan: bool,
}

/// Makes every registered element visible exactly once and runs the counters
/// nested in it exactly once, whichever trigger comes first: an intersection
/// event, missing intersection support, or the safety sweep.
#[derive(Debug)]
pub struct ViewportRevealCoordinator {
    config: RevealConfig,
    elements: Vec<Revealable>,
    counters: Vec<Counter>,
    started: bool,
    swept: bool,
}

impl ViewportRevealCoordinator {
    pub fn new(config: RevealConfig) -> Self {
        Self {
            config,
            elements: Vec::new(),
            counters: Vec::new(),
            started: false,
            swept: false,
        }
    }

    pub fn config(&self) -> &RevealConfig {
        &self.config
    }

    pub fn register_element(&mut self) -> ElementId {
        self.elements.push(Revealable {
            state: RevealState::Pending,
            counters: Vec::new(),
        });
        ElementId(self.elements.len() - 1)
    }

    /// Registers a counter nested (at any depth) in each of `owners`. A
    /// counter with no owner starts as soon as the coordinator starts.
    pub fn register_counter(
        &mut self,
        raw_target: &str,
        owners: &[ElementId],
    ) -> RevealResult<CounterId> {
        for owner in owners {
            self.element(*owner)?;
        }
        let id = CounterId(self.counters.len());
        self.counters.push(Counter {
            animation: CounterAnimation::new(raw_target),
            orphan: owners.is_empty(),
        });
        for owner in owners {
            self.elements[owner.0].counters.push(id);
        }
        Ok(id)
    }

    pub fn start(&mut self, detection: Detection) -> RevealResult<Vec<Effect>> {
        if self.started {
            return Err(RevealError::AlreadyStarted);
        }
        self.started = true;

        let mut effects = Vec::new();
        let orphans: Vec<CounterId> = (0..self.counters.len())
            .map(CounterId)
            .filter(|id| self.counters[id.0].orphan)
            .collect();
        for id in orphans {
            effects.extend(self.start_counter(id)?);
        }

        match detection {
            Detection::Available => {
                effects.extend(self.observe());
                if self.pending_count() > 0 {
                    effects.push(Effect::ArmSafetyTimer(self.config.safety_timeout_ms));
                }
            }
            Detection::Unavailable => {
                for index in 0..self.elements.len() {
                    effects.extend(self.reveal(ElementId(index))?);
                }
            }
        }
        Ok(effects)
    }

    /// Asks the host to track every element that is still pending.
    pub fn observe(&self) -> Vec<Effect> {
        self.pending_ids().map(Effect::Observe).collect()
    }

    pub fn on_intersection(&mut self, entries: &[IntersectionEntry]) -> RevealResult<Vec<Effect>> {
        for entry in entries {
            self.element(entry.element)?;
        }

        let mut effects = Vec::new();
        for entry in entries.iter().filter(|entry| entry.is_intersecting) {
            if self.elements[entry.element.0].state == RevealState::Revealed {
                continue;
            }
            effects.extend(self.reveal(entry.element)?);
            effects.push(Effect::Unobserve(entry.element));
        }
        Ok(effects)
    }

    pub fn reveal(&mut self, id: ElementId) -> RevealResult<Vec<Effect>> {
        let element = self.element_mut(id)?;
        if element.state == RevealState::Revealed {
            return Ok(Vec::new());
        }
        element.state = RevealState::Revealed;

        let mut effects = vec![Effect::MarkVisible(id)];
        effects.extend(self.start_counters(id)?);
        Ok(effects)
    }

    /// The host could not mark `id` visible. Puts it back to pending so the
    /// safety sweep picks it up again; its counters keep their phase.
    pub fn reveal_failed(&mut self, id: ElementId) -> RevealResult<()> {
        self.element_mut(id)?.state = RevealState::Pending;
        Ok(())
    }

    pub fn start_counters(&mut self, id: ElementId) -> RevealResult<Vec<Effect>> {
        let owned = self.element(id)?.counters.clone();
        let mut effects = Vec::new();
        for counter in owned {
            effects.extend(self.start_counter(counter)?);
        }
        Ok(effects)
    }

    pub fn start_counter(&mut self, id: CounterId) -> RevealResult<Vec<Effect>> {
        let counter = self.counter_mut(id)?;
        Ok(match counter.animation.start() {
            StartOutcome::AlreadyStarted => Vec::new(),
            StartOutcome::Animate => vec![Effect::RequestFrame(id)],
            StartOutcome::Skip(raw) => vec![Effect::SetText(id, raw)],
        })
    }

    pub fn on_frame(&mut self, id: CounterId, timestamp_ms: f64) -> RevealResult<Vec<Effect>> {
        let duration = self.config.counter_duration_ms;
        let separator = self.config.thousands_separator;
        let counter = self.counter_mut(id)?;

        Ok(match counter.animation.step(timestamp_ms, duration) {
            None => Vec::new(),
            Some(FrameStep::Continue(value)) => vec![
                Effect::SetText(id, format_grouped(value, separator)),
                Effect::RequestFrame(id),
            ],
            Some(FrameStep::Finished(target)) => {
                vec![Effect::SetText(id, format_grouped(target, separator))]
            }
        })
    }

    /// Force-reveals whatever the intersection watcher has not caught yet.
    /// Only the first call does anything.
    pub fn safety_sweep(&mut self) -> RevealResult<Vec<Effect>> {
        if self.swept {
            return Ok(Vec::new());
        }
        self.swept = true;

        let pending: Vec<ElementId> = self.pending_ids().collect();
        let mut effects = Vec::new();
        for id in pending {
            effects.extend(self.reveal(id)?);
            effects.push(Effect::Unobserve(id));
        }
        Ok(effects)
    }

    #[cfg(test)]
    pub fn is_revealed(&self, id: ElementId) -> RevealResult<bool> {
        Ok(self.element(id)?.state == RevealState::Revealed)
    }

    pub fn counter_phase(&self, id: CounterId) -> RevealResult<CounterPhase> {
        Ok(self.counter(id)?.animation.phase())
    }

    pub fn displayed_value(&self, id: CounterId) -> RevealResult<Option<i64>> {
        Ok(self.counter(id)?.animation.displayed())
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn counter_count(&self) -> usize {
        self.counters.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending_ids().count()
    }

    /// Everything revealed and no counter still animating.
    pub fn is_settled(&self) -> bool {
        self.pending_count() == 0
            && self
                .counters
                .iter()
                .all(|c| {
                    matches!(
                        c.animation.phase(),
                        CounterPhase::Finished | CounterPhase::Skipped
                    )
                })
    }

    fn pending_ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, el)| el.state == RevealState::Pending)
            .map(|(index, _)| ElementId(index))
    }

    fn element(&self, id: ElementId) -> RevealResult<&Revealable> {
        self.elements.get(id.0).ok_or(RevealError::UnknownElement(id))
    }

    fn element_mut(&mut self, id: ElementId) -> RevealResult<&mut Revealable> {
        self.elements.get_mut(id.0).ok_or(RevealError::UnknownElement(id))
    }

    fn counter(&self, id: CounterId) -> RevealResult<&Counter> {
        self.counters.get(id.0).ok_or(RevealError::UnknownCounter(id))
    }

    fn counter_mut(&mut self, id: CounterId) -> RevealResult<&mut Counter> {
        self.counters.get_mut(id.0).ok_or(RevealError::UnknownCounter(id))
    }
}
