//! `StackCycleMonitor` — catches behaviors that bounce on and off the stack.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

use bhv_behavior::BehaviorContainer;
use bhv_core::{BehaviorId, RobotClock, SystemConfig, Tick};

use crate::{BehaviorStack, StackMonitor};

/// Counts activations per behavior over a sliding tick window.
///
/// A behavior activated more than `max_pushes` times within `window_ticks`
/// is oscillating: usually two behaviors whose activation conditions flip
/// each other.  Each offender is reported once, the first time it trips.
pub struct StackCycleMonitor {
    window_ticks: u64,
    max_pushes:   usize,

    last_counts: FxHashMap<BehaviorId, u32>,
    push_ticks:  FxHashMap<BehaviorId, VecDeque<Tick>>,
    reported:    FxHashSet<BehaviorId>,

    cycling:    Vec<String>,
    duplicates: Vec<String>,
}

impl StackCycleMonitor {
    pub fn new(window_ticks: u64, max_pushes: usize) -> Self {
        Self {
            window_ticks,
            max_pushes,
            last_counts: FxHashMap::default(),
            push_ticks:  FxHashMap::default(),
            reported:    FxHashSet::default(),
            cycling:     Vec::new(),
            duplicates:  Vec::new(),
        }
    }

    pub fn from_config(config: &SystemConfig) -> Self {
        Self::new(config.cycle_window_ticks, config.cycle_max_pushes)
    }

    /// Labels of behaviors that exceeded the push threshold, in report order.
    pub fn cycling_behaviors(&self) -> &[String] {
        &self.cycling
    }

    /// Labels seen more than once in the active chain.
    pub fn duplicate_entries(&self) -> &[String] {
        &self.duplicates
    }

    fn record_pushes(&mut self, container: &BehaviorContainer, now: Tick) {
        for id in container.ids() {
            let Some(slot) = container.slot(id) else { continue };
            let count = slot.activation_count();
            let previous = self.last_counts.insert(id, count).unwrap_or(0);
            let new_pushes = count.saturating_sub(previous);

            let ticks = self.push_ticks.entry(id).or_default();
            ticks.extend(std::iter::repeat(now).take(new_pushes as usize));
            while ticks.front().is_some_and(|&t| now.since(t) >= self.window_ticks) {
                ticks.pop_front();
            }

            if ticks.len() > self.max_pushes && self.reported.insert(id) {
                warn!(
                    behavior = slot.label(),
                    pushes = ticks.len(),
                    window_ticks = self.window_ticks,
                    "StackCycleMonitor.CycleDetected"
                );
                self.cycling.push(slot.label().to_owned());
            }
        }
    }

    fn check_duplicates(&mut self, stack: &BehaviorStack, container: &BehaviorContainer) {
        let mut seen = FxHashSet::default();
        for &behavior in stack.as_slice() {
            if !seen.insert(behavior) {
                let label = container.label(behavior).to_owned();
                warn!(behavior = %label, "StackCycleMonitor.DuplicateInStack");
                self.duplicates.push(label);
            }
        }
    }
}

impl StackMonitor for StackCycleMonitor {
    fn notify_of_change(&mut self, stack: &BehaviorStack, container: &BehaviorContainer, clock: &RobotClock) {
        self.record_pushes(container, clock.tick());
        self.check_duplicates(stack, container);
    }
}
