//! The `BehaviorStack` and its tick.

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use bhv_behavior::{
    ActivationContext, BehaviorContainer, BehaviorServices, BehaviorSet, CompletedAction,
    StackView,
};
use bhv_core::{verify, BehaviorId, RobotClock, SystemConfig};

use crate::{AudioBranchEvent, BehaviorStackState, StackMetadataEntry, StackMonitor};

/// The chain of currently-active behaviors, root at index 0.
///
/// Each element was activated by (delegated to from) the element below it.
/// For every element the stack caches a [`StackMetadataEntry`]; the union of
/// all entries' delegates and linked behaviors is the *activatable scope*,
/// the set of behaviors that could be activated next without a scope change.
///
/// The stack never calls behaviors directly: lifecycle hooks go through the
/// [`BehaviorContainer`], which lends each hook a view of this stack through
/// [`StackView`].
pub struct BehaviorStack {
    behavior_stack:       Vec<BehaviorId>,
    /// Keyed by behavior; `None` is the synthetic parent of the root.
    stack_metadata_map:   FxHashMap<Option<BehaviorId>, StackMetadataEntry>,
    behavior_stack_dirty: bool,

    monitors:     Vec<Box<dyn StackMonitor>>,
    audio_events: Vec<AudioBranchEvent>,

    max_linked_scope_iterations: usize,
}

impl BehaviorStack {
    pub fn new(max_linked_scope_iterations: usize) -> Self {
        Self {
            behavior_stack:       Vec::new(),
            stack_metadata_map:   FxHashMap::default(),
            behavior_stack_dirty: false,
            monitors:             Vec::new(),
            audio_events:         Vec::new(),
            max_linked_scope_iterations,
        }
    }

    pub fn from_config(config: &SystemConfig) -> Self {
        Self::new(config.max_linked_scope_iterations)
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// Active behaviors, root first.
    pub fn as_slice(&self) -> &[BehaviorId] {
        &self.behavior_stack
    }

    pub fn len(&self) -> usize {
        self.behavior_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behavior_stack.is_empty()
    }

    pub fn top(&self) -> Option<BehaviorId> {
        self.behavior_stack.last().copied()
    }

    pub fn is_dirty(&self) -> bool {
        self.behavior_stack_dirty
    }

    pub fn contains(&self, behavior: BehaviorId) -> bool {
        self.stack_metadata_map.contains_key(&Some(behavior))
    }

    pub fn metadata(&self, behavior: BehaviorId) -> Option<&StackMetadataEntry> {
        self.stack_metadata_map.get(&Some(behavior))
    }

    /// Metadata of the synthetic root parent, present from init until clear.
    pub fn root_metadata(&self) -> Option<&StackMetadataEntry> {
        self.stack_metadata_map.get(&None)
    }

    /// Metadata entries ordered root-parent first, then by stack index.
    pub fn metadata_entries(&self) -> Vec<&StackMetadataEntry> {
        let mut entries: Vec<_> = self.stack_metadata_map.values().collect();
        entries.sort_by_key(|e| e.index_in_stack.map_or(0, |i| i + 1));
        entries
    }

    /// The behavior directly above `behavior`, or `None` if it is the top.
    pub fn behavior_in_stack_above(&self, behavior: BehaviorId) -> Option<BehaviorId> {
        let index = self.metadata(behavior)?.index_in_stack?;
        self.behavior_stack.get(index + 1).copied()
    }

    /// The behavior directly below `behavior`, or `None` if it is the root.
    pub fn behavior_in_stack_below(&self, behavior: BehaviorId) -> Option<BehaviorId> {
        let index = self.metadata(behavior)?.index_in_stack?;
        index.checked_sub(1).and_then(|i| self.behavior_stack.get(i).copied())
    }

    /// Whether `delegated` is among the declared delegates of `delegator`.
    pub fn is_valid_delegation(&self, delegator: BehaviorId, delegated: BehaviorId) -> bool {
        self.metadata(delegator).is_some_and(|e| e.delegates.contains(&delegated))
    }

    /// Every behavior in activatable scope that is not itself active.
    pub fn behaviors_in_activatable_scope(&self) -> BehaviorSet {
        let mut scope: BehaviorSet = self
            .stack_metadata_map
            .values()
            .flat_map(StackMetadataEntry::scope_members)
            .collect();
        for behavior in &self.behavior_stack {
            scope.remove(behavior);
        }
        scope
    }

    // ── Monitors and outbound events ──────────────────────────────────────────

    pub fn add_monitor(&mut self, monitor: Box<dyn StackMonitor>) {
        self.monitors.push(monitor);
    }

    /// The first installed monitor of type `T`.
    pub fn monitor<T: StackMonitor>(&self) -> Option<&T> {
        self.monitors.iter().find_map(|m| {
            let m: &dyn StackMonitor = m.as_ref();
            m.as_any().downcast_ref::<T>()
        })
    }

    /// Audio-branch events buffered since the last call.
    pub fn take_audio_events(&mut self) -> Vec<AudioBranchEvent> {
        std::mem::take(&mut self.audio_events)
    }

    fn notify_monitors(&mut self, container: &BehaviorContainer, clock: &RobotClock) {
        let mut monitors = std::mem::take(&mut self.monitors);
        for monitor in &mut monitors {
            monitor.notify_of_change(self, container, clock);
        }
        self.monitors = monitors;
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Bring up the stack with `root` as its base.
    ///
    /// Fails (returning `false`, state unchanged) if the stack is not empty or
    /// the root declines activation.
    pub fn init_behavior_stack(
        &mut self,
        root:      BehaviorId,
        container: &mut BehaviorContainer,
        services:  &mut BehaviorServices,
    ) -> bool {
        if !verify!(
            self.behavior_stack.is_empty() && self.root_metadata().is_none(),
            "BehaviorStack.InitBehaviorStack.StackNotEmptyOnInit",
            "depth={}",
            self.behavior_stack.len()
        ) {
            return false;
        }
        if !verify!(container.contains(root), "BehaviorStack.InitBehaviorStack.UnknownRoot", "{root}") {
            return false;
        }

        let entry = StackMetadataEntry::root_parent(root, container, self.max_linked_scope_iterations);
        self.stack_metadata_map.insert(None, entry);
        self.prepare_delegates_to_enter_scope(None, container, services);

        let wants = {
            let ctx = ActivationContext::new(services, container, &*self);
            container.wants_to_be_activated(root, &ctx)
        };
        if !verify!(
            wants,
            "BehaviorStack.InitBehaviorStack.RootDoesNotWantToBeActivated",
            "{}",
            container.label(root)
        ) {
            self.prepare_delegates_for_removal(None, container, services);
            self.stack_metadata_map.remove(&None);
            return false;
        }

        info!(root = container.label(root), "BehaviorStack.InitBehaviorStack");
        self.push_onto_stack(root, container, services);
        self.apply_delegation_requests(container, services);
        true
    }

    /// Pop everything and release the root's scope.  Idempotent.
    pub fn clear_stack(&mut self, container: &mut BehaviorContainer, services: &mut BehaviorServices) {
        while !self.behavior_stack.is_empty() {
            self.pop_stack(container, services);
        }
        if self.root_metadata().is_some() {
            self.prepare_delegates_for_removal(None, container, services);
            self.stack_metadata_map.remove(&None);
        }
        services.delegation.clear_requests();
    }

    /// Tick every active behavior, root first.
    ///
    /// Delegation requests produced by a behavior are applied before the next
    /// behavior is ticked, so a delegate pushed this tick is also updated this
    /// tick.  `actions_completed` is only visible to the top of the stack.
    /// Every behavior ticked is added to `ticked_in_stack`.
    pub fn update_behavior_stack(
        &mut self,
        container:         &mut BehaviorContainer,
        services:          &mut BehaviorServices,
        actions_completed: &[CompletedAction],
        ticked_in_stack:   &mut BehaviorSet,
    ) {
        if self.behavior_stack.is_empty() {
            warn!("BehaviorStack.UpdateBehaviorStack.EmptyStack");
            return;
        }
        self.apply_delegation_requests(container, services);

        let mut idx = 0;
        while idx < self.behavior_stack.len() {
            let behavior = self.behavior_stack[idx];
            ticked_in_stack.insert(behavior);

            let is_top = idx + 1 == self.behavior_stack.len();
            services.event_buffer.events = services.message_gate.take_events_for(behavior);
            services.event_buffer.actions_completed.clear();
            if is_top {
                services.event_buffer.actions_completed.extend_from_slice(actions_completed);
            }

            container.update(behavior, services, &*self);
            self.apply_delegation_requests(container, services);
            idx += 1;
        }
        services.event_buffer.clear();

        if self.behavior_stack_dirty {
            self.notify_monitors(container, &services.clock);
            self.behavior_stack_dirty = false;
        }
    }

    /// Activate `behavior` on top of the stack.
    pub fn push_onto_stack(
        &mut self,
        behavior:  BehaviorId,
        container: &mut BehaviorContainer,
        services:  &mut BehaviorServices,
    ) -> bool {
        if !verify!(
            !self.contains(behavior),
            "BehaviorStack.PushOntoStack.AlreadyInStack",
            "{}",
            container.label(behavior)
        ) {
            return false;
        }

        let index = self.behavior_stack.len();
        let entry = StackMetadataEntry::new(behavior, index, container, self.max_linked_scope_iterations);
        self.stack_metadata_map.insert(Some(behavior), entry);
        self.behavior_stack.push(behavior);

        self.prepare_delegates_to_enter_scope(Some(behavior), container, services);
        self.broadcast_audio_branch(BehaviorStackState::Active, container);
        debug!(behavior = container.label(behavior), depth = index + 1, "BehaviorStack.PushOntoStack");

        container.activate(behavior, services, &*self);
        self.behavior_stack_dirty = true;
        true
    }

    /// Deactivate and remove the top of the stack.
    pub fn pop_stack(&mut self, container: &mut BehaviorContainer, services: &mut BehaviorServices) -> bool {
        let Some(top) = self.top() else {
            verify!(false, "BehaviorStack.PopStack.EmptyStack");
            return false;
        };

        self.prepare_delegates_for_removal(Some(top), container, services);
        self.broadcast_audio_branch(BehaviorStackState::NotActive, container);
        debug!(behavior = container.label(top), depth = self.behavior_stack.len(), "BehaviorStack.PopStack");

        container.deactivate(top, services, &*self);

        self.stack_metadata_map.remove(&Some(top));
        self.behavior_stack.pop();
        let parent = self.top();
        services.delegation.on_behavior_popped(top, parent, &mut services.actions);

        self.behavior_stack_dirty = true;
        true
    }

    fn prepare_delegates_to_enter_scope(
        &self,
        key:       Option<BehaviorId>,
        container: &mut BehaviorContainer,
        services:  &mut BehaviorServices,
    ) {
        let Some(entry) = self.stack_metadata_map.get(&key) else { return };
        for member in entry.scope_members() {
            container.entered_activatable_scope(member, services);
        }
    }

    fn prepare_delegates_for_removal(
        &self,
        key:       Option<BehaviorId>,
        container: &mut BehaviorContainer,
        services:  &mut BehaviorServices,
    ) {
        let Some(entry) = self.stack_metadata_map.get(&key) else { return };
        for member in entry.scope_members() {
            container.left_activatable_scope(member, services);
        }
    }

    fn broadcast_audio_branch(&mut self, state: BehaviorStackState, container: &BehaviorContainer) {
        let path = self.behavior_stack.iter().map(|&b| container.label(b).to_owned()).collect();
        self.audio_events.push(AudioBranchEvent { state, path });
    }
}

impl StackView for BehaviorStack {
    fn top(&self) -> Option<BehaviorId> {
        BehaviorStack::top(self)
    }

    fn is_in_stack(&self, behavior: BehaviorId) -> bool {
        self.contains(behavior)
    }

    fn behavior_above(&self, behavior: BehaviorId) -> Option<BehaviorId> {
        self.behavior_in_stack_above(behavior)
    }

    fn behavior_below(&self, behavior: BehaviorId) -> Option<BehaviorId> {
        self.behavior_in_stack_below(behavior)
    }

    fn is_valid_delegation(&self, delegator: BehaviorId, delegated: BehaviorId) -> bool {
        BehaviorStack::is_valid_delegation(self, delegator, delegated)
    }

    fn depth(&self) -> usize {
        self.len()
    }
}
