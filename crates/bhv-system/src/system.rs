//! The `BehaviorSystem` struct and its tick.

use tracing::{debug, info, warn};

use bhv_behavior::{Behavior, BehaviorContainer, BehaviorServices, BehaviorSet, RobotEvent, Whiteboard};
use bhv_core::{BehaviorId, RobotClock, SystemConfig, Tick};
use bhv_stack::{BehaviorStack, StackDebugTree};

use crate::{NoopObserver, SystemError, SystemObserver, SystemResult};

/// Owns every behavior, the stack, and the robot services, and advances them
/// one robot tick per [`update`][Self::update]:
///
/// 1. **Clock**: advance by one tick.
/// 2. **Actions**: update every running action; completions resolve the
///    delegations waiting on them.
/// 3. **Stack**: tick every active behavior, root first, applying their
///    delegation requests in between.
/// 4. **Flush**: drop events nobody active received, then hand this tick's
///    audio branch events to the observer.
///
/// Create via [`SystemBuilder`][crate::SystemBuilder].
pub struct BehaviorSystem {
    pub config: SystemConfig,

    container: BehaviorContainer,
    stack:     BehaviorStack,
    services:  BehaviorServices,
    root:      BehaviorId,

    /// Behaviors ticked by the most recent update.
    ticked: BehaviorSet,
}

impl BehaviorSystem {
    pub(crate) fn new(
        config:    SystemConfig,
        container: BehaviorContainer,
        stack:     BehaviorStack,
        services:  BehaviorServices,
        root:      BehaviorId,
    ) -> Self {
        Self { config, container, stack, services, root, ticked: BehaviorSet::new() }
    }

    // ── Ticking ───────────────────────────────────────────────────────────

    /// Run one robot tick.
    pub fn update<O: SystemObserver>(&mut self, observer: &mut O) {
        self.services.clock.advance();
        let tick = self.services.clock.tick();
        observer.on_tick_start(tick);

        let completed = self.services.actions.update(self.services.clock.now_s());
        for done in &completed {
            match self.services.delegation.resolve_action(done.tag, done.result) {
                Some(delegator) => debug!(
                    action = %done.tag,
                    result = ?done.result,
                    delegator = self.container.label(delegator),
                    "BehaviorSystem.Update.ActionCompleted"
                ),
                None => debug!(action = %done.tag, "BehaviorSystem.Update.ActionCompletedWithoutDelegator"),
            }
        }

        self.ticked.clear();
        self.stack
            .update_behavior_stack(&mut self.container, &mut self.services, &completed, &mut self.ticked);
        self.services.message_gate.clear_undelivered();

        for event in self.stack.take_audio_events() {
            observer.on_audio_event(&event);
        }
        observer.on_tick_end(tick, &self.stack, &self.container);
    }

    /// Run one tick without an observer.
    pub fn tick(&mut self) {
        self.update(&mut NoopObserver);
    }

    /// Run exactly `n` ticks.
    pub fn run_ticks<O: SystemObserver>(&mut self, n: u64, observer: &mut O) {
        for _ in 0..n {
            self.update(observer);
        }
    }

    /// Clear the stack and bring it up again on the root.
    pub fn restart(&mut self) -> SystemResult<()> {
        self.stack.clear_stack(&mut self.container, &mut self.services);
        if !self.stack.init_behavior_stack(self.root, &mut self.container, &mut self.services) {
            warn!(root = self.container.label(self.root), "BehaviorSystem.Restart.RootDeclined");
            return Err(SystemError::RootDeclined(self.container.label(self.root).to_owned()));
        }
        info!(root = self.container.label(self.root), "BehaviorSystem.Restart");
        Ok(())
    }

    // ── Inputs ────────────────────────────────────────────────────────────

    /// Queue `event` for every subscriber.  Returns the number of subscribers;
    /// delivery happens as they are ticked during the next update.
    pub fn post_event(&mut self, event: RobotEvent) -> usize {
        self.services.message_gate.post(event)
    }

    pub fn whiteboard(&self) -> &Whiteboard {
        &self.services.whiteboard
    }

    pub fn whiteboard_mut(&mut self) -> &mut Whiteboard {
        &mut self.services.whiteboard
    }

    // ── Introspection ─────────────────────────────────────────────────────

    pub fn clock(&self) -> &RobotClock {
        &self.services.clock
    }

    pub fn now_tick(&self) -> Tick {
        self.services.clock.tick()
    }

    pub fn stack(&self) -> &BehaviorStack {
        &self.stack
    }

    pub fn container(&self) -> &BehaviorContainer {
        &self.container
    }

    pub fn services(&self) -> &BehaviorServices {
        &self.services
    }

    pub fn root(&self) -> BehaviorId {
        self.root
    }

    pub fn ticked_last_update(&self) -> &BehaviorSet {
        &self.ticked
    }

    /// Active chain as `"Root/Child"`.
    pub fn stack_string(&self) -> String {
        self.stack.stack_to_behavior_string(&self.container)
    }

    /// Look a behavior up by label and concrete type.
    pub fn behavior<T: Behavior>(&self, label: &str) -> Option<&T> {
        self.container.get_by_label::<T>(label)
    }

    /// The debug tree of the current stack, or `None` while it is empty.
    pub fn debug_tree(&self) -> Option<StackDebugTree> {
        if self.stack.is_empty() {
            return None;
        }
        Some(self.stack.build_debug_behavior_tree(&self.container, &self.services.clock))
    }

    pub fn debug_tree_json(&self) -> SystemResult<String> {
        Ok(self.stack.debug_tree_json(&self.container, &self.services.clock)?)
    }
}
