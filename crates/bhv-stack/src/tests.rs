//! Unit tests for bhv-stack.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use bhv_behavior::{
    ActionResult, ActivationContext, Behavior, BehaviorContainer, BehaviorContext,
    BehaviorOperationModifiers, BehaviorResolver, BehaviorResult, BehaviorServices, BehaviorSet,
    CallbackTag, CompletedAction, DelegateOutcome, RobotEvent,
};
use bhv_core::{ActionTag, BehaviorId, RobotClock};

use crate::{
    recursively_gather_linked_behaviors, AudioBranchEvent, BehaviorStack, BehaviorStackState,
    StackCycleMonitor, StackError, StackMonitor, StackVizMonitor,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

type Journal = Rc<RefCell<Vec<String>>>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum DelegateWhen {
    Never,
    OnActivated,
    WhenIdleInUpdate,
}

/// Fixture behavior: records every hook in a shared journal, delegates to its
/// first declared delegate at a configurable point, and can stop itself or
/// cancel its delegate after a number of updates.  A node that `grabs` a
/// behavior tries to delegate to it on every update, logging the answer.
struct Node {
    name:           &'static str,
    journal:        Journal,
    wants:          bool,
    leaf:           bool,
    delegate_names: Vec<&'static str>,
    linked_names:   Vec<&'static str>,
    events:         Vec<&'static str>,
    delegate_when:  DelegateWhen,
    stop_after:     Option<u32>,
    cancel_after:   Option<u32>,
    grab_name:      Option<&'static str>,

    delegates: Vec<BehaviorId>,
    grab:      Option<BehaviorId>,
    linked:    BehaviorSet,
    updates:   u32,
}

fn node(name: &'static str, journal: &Journal) -> Node {
    Node {
        name,
        journal: journal.clone(),
        wants: true,
        leaf: false,
        delegate_names: Vec::new(),
        linked_names: Vec::new(),
        events: Vec::new(),
        delegate_when: DelegateWhen::Never,
        stop_after: None,
        cancel_after: None,
        grab_name: None,
        delegates: Vec::new(),
        grab: None,
        linked: BehaviorSet::new(),
        updates: 0,
    }
}

impl Node {
    fn delegates(mut self, names: &[&'static str], when: DelegateWhen) -> Self {
        self.delegate_names = names.to_vec();
        self.delegate_when = when;
        self
    }

    fn links(mut self, names: &[&'static str]) -> Self {
        self.linked_names = names.to_vec();
        self
    }

    fn leaf(mut self) -> Self {
        self.leaf = true;
        self
    }

    fn declining(mut self) -> Self {
        self.wants = false;
        self
    }

    fn stops_after(mut self, updates: u32) -> Self {
        self.stop_after = Some(updates);
        self
    }

    fn cancels_delegate_after(mut self, updates: u32) -> Self {
        self.cancel_after = Some(updates);
        self
    }

    fn grabs(mut self, name: &'static str) -> Self {
        self.grab_name = Some(name);
        self
    }

    fn listens_to(mut self, tag: &'static str) -> Self {
        self.events.push(tag);
        self
    }

    fn log(&self, what: impl std::fmt::Display) {
        self.journal.borrow_mut().push(format!("{}:{what}", self.name));
    }

    fn delegate(&self, ctx: &mut BehaviorContext<'_>) {
        if let Some(&first) = self.delegates.first() {
            ctx.delegate_if_in_control(first, Some(CallbackTag(1)));
        }
    }
}

impl Behavior for Node {
    fn init(&mut self, resolver: &BehaviorResolver<'_>) -> BehaviorResult<()> {
        for name in &self.delegate_names {
            self.delegates.push(resolver.find(name)?);
        }
        for name in &self.linked_names {
            self.linked.insert(resolver.find(name)?);
        }
        self.grab = self.grab_name.map(|name| resolver.find(name)).transpose()?;
        Ok(())
    }

    fn operation_modifiers(&self, modifiers: &mut BehaviorOperationModifiers) {
        if self.leaf {
            modifiers.behavior_always_delegates = false;
        }
    }

    fn subscribed_events(&self, tags: &mut BTreeSet<String>) {
        tags.extend(self.events.iter().map(|t| t.to_string()));
    }

    fn all_delegates(&self, delegates: &mut BehaviorSet) {
        delegates.extend(self.delegates.iter().copied());
    }

    fn linked_activatable_scope(&self, linked: &mut BehaviorSet) {
        linked.extend(self.linked.iter().copied());
    }

    fn wants_to_be_activated(&self, _ctx: &ActivationContext<'_>) -> bool {
        self.wants
    }

    fn on_entered_activatable_scope(&mut self) {
        self.log("entered");
    }

    fn on_left_activatable_scope(&mut self) {
        self.log("left");
    }

    fn on_activated(&mut self, ctx: &mut BehaviorContext<'_>) {
        self.updates = 0;
        self.log("activated");
        if self.delegate_when == DelegateWhen::OnActivated {
            self.delegate(ctx);
        }
    }

    fn on_deactivated(&mut self, _ctx: &mut BehaviorContext<'_>) {
        self.log("deactivated");
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) {
        self.updates += 1;
        self.log(format_args!(
            "update:{}:{}",
            ctx.actions_completed_this_tick().len(),
            ctx.events().len()
        ));
        if let Some(target) = self.grab {
            let accepted = ctx.delegate_if_in_control(target, Some(CallbackTag(2)));
            self.log(format_args!("grab:{accepted}"));
        }
        if self.delegate_when == DelegateWhen::WhenIdleInUpdate && !ctx.is_control_delegated() {
            self.delegate(ctx);
        }
        if self.cancel_after == Some(self.updates) {
            ctx.cancel_delegates(true);
        }
        if self.stop_after == Some(self.updates) {
            ctx.cancel_self();
        }
    }

    fn on_delegate_complete(&mut self, tag: CallbackTag, outcome: DelegateOutcome, _ctx: &mut BehaviorContext<'_>) {
        self.log(format_args!("cb{}:{outcome:?}", tag.0));
    }
}

struct CountingMonitor(Rc<Cell<usize>>);

impl StackMonitor for CountingMonitor {
    fn notify_of_change(&mut self, _: &BehaviorStack, _: &BehaviorContainer, _: &RobotClock) {
        self.0.set(self.0.get() + 1);
    }
}

struct World {
    container: BehaviorContainer,
    services:  BehaviorServices,
    stack:     BehaviorStack,
    journal:   Journal,
}

impl World {
    fn build(journal: &Journal, nodes: Vec<Node>) -> Self {
        let mut container = BehaviorContainer::new();
        for n in nodes {
            container.add(n.name, "Node", Box::new(n)).unwrap();
        }
        let mut services = BehaviorServices::default();
        container.init_all(&mut services).unwrap();
        let stack = BehaviorStack::from_config(&services.config);
        Self { container, services, stack, journal: journal.clone() }
    }

    fn id(&self, label: &str) -> BehaviorId {
        self.container.find_by_label(label).unwrap()
    }

    fn init(&mut self, root: &str) -> bool {
        let root = self.id(root);
        self.stack.init_behavior_stack(root, &mut self.container, &mut self.services)
    }

    fn tick(&mut self) -> BehaviorSet {
        self.tick_with(&[])
    }

    fn tick_with(&mut self, completed: &[CompletedAction]) -> BehaviorSet {
        self.services.clock.advance();
        let mut ticked = BehaviorSet::new();
        self.stack.update_behavior_stack(&mut self.container, &mut self.services, completed, &mut ticked);
        ticked
    }

    fn clear(&mut self) {
        self.stack.clear_stack(&mut self.container, &mut self.services);
    }

    fn path(&self) -> String {
        self.stack.stack_to_behavior_string(&self.container)
    }

    fn take_journal(&self) -> Vec<String> {
        std::mem::take(&mut *self.journal.borrow_mut())
    }

    fn scope_count(&self, label: &str) -> u32 {
        self.container.slot(self.id(label)).unwrap().scope_count()
    }
}

fn count(journal: &[String], entry: &str) -> usize {
    journal.iter().filter(|e| *e == entry).count()
}

// ── Init and clear ────────────────────────────────────────────────────────────

#[cfg(test)]
mod init_tests {
    use super::*;

    #[test]
    fn init_pushes_root_and_cascades_activation() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![
            node("Root", &journal).delegates(&["A", "B"], DelegateWhen::OnActivated),
            node("A", &journal).leaf(),
            node("B", &journal).leaf(),
        ]);

        assert!(w.init("Root"));
        assert_eq!(w.path(), "Root/A");
        assert_eq!(w.take_journal(), vec![
            "Root:entered",
            "A:entered",
            "B:entered",
            "Root:activated",
            "A:activated",
        ]);
        assert!(w.stack.root_metadata().is_some());
        assert!(w.container.is_activated(w.id("A")));
    }

    #[test]
    fn second_init_is_refused() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![
            node("Root", &journal).leaf(),
            node("Other", &journal).leaf(),
        ]);
        assert!(w.init("Root"));
        w.take_journal();

        assert!(!w.init("Other"));
        assert_eq!(w.path(), "Root");
        assert!(w.take_journal().is_empty());
    }

    #[test]
    fn declining_root_leaves_nothing_behind() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![node("Root", &journal).declining()]);

        assert!(!w.init("Root"));
        assert!(w.stack.is_empty());
        assert!(w.stack.root_metadata().is_none());
        assert_eq!(w.scope_count("Root"), 0);
        assert_eq!(w.take_journal(), vec!["Root:entered", "Root:left"]);
    }

    #[test]
    fn clear_releases_everything_and_is_idempotent() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![
            node("Root", &journal).delegates(&["A"], DelegateWhen::OnActivated),
            node("A", &journal).leaf(),
        ]);
        w.init("Root");
        w.take_journal();

        w.clear();
        assert!(w.stack.is_empty());
        assert!(w.stack.root_metadata().is_none());
        assert_eq!(w.scope_count("Root"), 0);
        assert_eq!(w.scope_count("A"), 0);
        assert_eq!(w.take_journal(), vec![
            "A:deactivated",
            "A:left",
            "Root:deactivated",
            "Root:left",
        ]);

        w.clear();
        assert!(w.take_journal().is_empty());
        // A cleared stack can be brought up again.
        assert!(w.init("Root"));
        assert_eq!(w.path(), "Root/A");
    }

    #[test]
    fn empty_stack_update_and_pop_are_refused() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![node("Root", &journal).leaf()]);

        let ticked = w.tick();
        assert!(ticked.is_empty());
        assert!(!w.stack.pop_stack(&mut w.container, &mut w.services));
        assert!(w.take_journal().is_empty());
    }
}

// ── Activatable scope ─────────────────────────────────────────────────────────

#[cfg(test)]
mod scope_tests {
    use super::*;

    #[test]
    fn shared_delegate_enters_and_leaves_once() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![
            node("Root", &journal).delegates(&["A", "B"], DelegateWhen::OnActivated),
            node("A", &journal).delegates(&["B"], DelegateWhen::Never).leaf(),
            node("B", &journal).leaf(),
        ]);
        w.init("Root");

        // Named by both Root's and A's entries.
        assert_eq!(w.scope_count("B"), 2);
        assert_eq!(count(&w.take_journal(), "B:entered"), 1);

        w.clear();
        let journal = w.take_journal();
        assert_eq!(count(&journal, "B:left"), 1);
        assert_eq!(count(&journal, "B:entered"), 0);
    }

    #[test]
    fn linked_behaviors_follow_their_delegate_into_scope() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![
            node("Root", &journal).delegates(&["A"], DelegateWhen::Never).leaf(),
            node("A", &journal).links(&["L1"]),
            node("L1", &journal).links(&["L2"]),
            node("L2", &journal),
        ]);
        w.init("Root");

        let entry = w.stack.metadata(w.id("Root")).unwrap();
        assert_eq!(entry.linked_activation_scope, BehaviorSet::from([w.id("L1"), w.id("L2")]));
        assert!(w.container.is_in_activatable_scope(w.id("L2")));

        let scope = w.stack.behaviors_in_activatable_scope();
        assert!(scope.contains(&w.id("A")));
        assert!(!scope.contains(&w.id("Root")));
    }

    #[test]
    fn linked_walk_terminates_on_cycles() {
        let journal = Journal::default();
        let w = World::build(&journal, vec![
            node("X", &journal).links(&["Y"]),
            node("Y", &journal).links(&["X"]),
        ]);

        let mut linked = BehaviorSet::new();
        recursively_gather_linked_behaviors(w.id("X"), &w.container, &mut linked, 1_000);
        assert_eq!(linked, BehaviorSet::from([w.id("X"), w.id("Y")]));
    }

    #[test]
    fn linked_walk_stops_at_iteration_cap() {
        let journal = Journal::default();
        let w = World::build(&journal, vec![
            node("L0", &journal).links(&["L1"]),
            node("L1", &journal).links(&["L2"]),
            node("L2", &journal).links(&["L3"]),
            node("L3", &journal).links(&["L4"]),
            node("L4", &journal),
        ]);

        let mut linked = BehaviorSet::new();
        recursively_gather_linked_behaviors(w.id("L0"), &w.container, &mut linked, 2);
        assert_eq!(linked, BehaviorSet::from([w.id("L1"), w.id("L2")]));
    }

    #[test]
    fn delegation_validity_follows_declared_delegates() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![
            node("Root", &journal).delegates(&["A"], DelegateWhen::OnActivated),
            node("A", &journal).leaf(),
            node("B", &journal).leaf(),
        ]);
        w.init("Root");
        let (root, a, b) = (w.id("Root"), w.id("A"), w.id("B"));

        assert!(w.stack.is_valid_delegation(root, a));
        assert!(!w.stack.is_valid_delegation(root, b));
        assert!(!w.stack.is_valid_delegation(a, root));
        assert!(!w.stack.is_valid_delegation(b, a));

        assert_eq!(w.stack.behavior_in_stack_above(root), Some(a));
        assert_eq!(w.stack.behavior_in_stack_below(a), Some(root));
        assert_eq!(w.stack.behavior_in_stack_below(root), None);
        assert_eq!(w.stack.behavior_in_stack_above(b), None);
    }

    #[test]
    fn neighbor_queries_for_inactive_behavior_are_silent() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![
            node("Root", &journal).delegates(&["A"], DelegateWhen::OnActivated),
            node("A", &journal).leaf(),
            node("X", &journal).delegates(&["A"], DelegateWhen::Never).leaf(),
        ]);
        w.init("Root");
        let (root, a, x) = (w.id("Root"), w.id("A"), w.id("X"));

        // Plain lookups: no verify failure, so strict builds do not panic here.
        assert_eq!(w.stack.behavior_in_stack_above(x), None);
        assert_eq!(w.stack.behavior_in_stack_below(x), None);
        assert!(!w.stack.is_valid_delegation(x, a));
        assert!(w.stack.is_valid_delegation(root, a));
        assert_eq!(w.stack.behavior_in_stack_above(a), None);
    }

    #[test]
    fn entries_record_their_position_through_pushes_and_pops() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![
            node("Root", &journal).delegates(&["A"], DelegateWhen::Never).leaf(),
            node("A", &journal).delegates(&["B"], DelegateWhen::Never).leaf(),
            node("B", &journal).leaf(),
        ]);
        w.init("Root");
        let (root, a, b) = (w.id("Root"), w.id("A"), w.id("B"));

        assert!(w.stack.push_onto_stack(a, &mut w.container, &mut w.services));
        assert!(w.stack.push_onto_stack(b, &mut w.container, &mut w.services));
        for (position, &id) in w.stack.as_slice().iter().enumerate() {
            assert_eq!(w.stack.metadata(id).unwrap().index_in_stack, Some(position));
        }
        assert_eq!(w.stack.metadata(b).unwrap().index_in_stack, Some(2));

        assert!(w.stack.pop_stack(&mut w.container, &mut w.services));
        assert_eq!(w.stack.metadata(root).unwrap().index_in_stack, Some(0));
        assert_eq!(w.stack.metadata(a).unwrap().index_in_stack, Some(1));
        assert!(w.stack.metadata(b).is_none());
    }

    #[test]
    fn push_then_pop_restores_the_stack() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![
            node("Root", &journal).delegates(&["A"], DelegateWhen::OnActivated),
            node("A", &journal).delegates(&["B"], DelegateWhen::Never).leaf(),
            node("B", &journal).leaf(),
        ]);
        w.init("Root");
        let b = w.id("B");
        let before = w.stack.as_slice().to_vec();
        let entries_before = w.stack.metadata_entries().len();

        assert!(w.stack.push_onto_stack(b, &mut w.container, &mut w.services));
        assert_eq!(w.stack.top(), Some(b));
        assert!(w.stack.pop_stack(&mut w.container, &mut w.services));

        assert!(w.stack.metadata(b).is_none());
        assert_eq!(w.stack.as_slice(), before.as_slice());
        assert_eq!(w.stack.metadata_entries().len(), entries_before);
        assert!(!w.container.is_activated(b));
    }

    #[test]
    fn recorded_delegates_match_push_time_and_stay_fixed() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![
            node("Root", &journal).delegates(&["A", "B"], DelegateWhen::OnActivated),
            node("A", &journal).delegates(&["C"], DelegateWhen::Never).leaf(),
            node("B", &journal).leaf(),
            node("C", &journal).leaf(),
        ]);
        w.init("Root");
        let (root, a) = (w.id("Root"), w.id("A"));
        let root_delegates = w.container.all_delegates(root);
        let a_delegates = w.container.all_delegates(a);
        assert_eq!(w.stack.metadata(root).unwrap().delegates, root_delegates);
        assert_eq!(w.stack.metadata(a).unwrap().delegates, a_delegates);
        assert_eq!(root_delegates, BehaviorSet::from([a, w.id("B")]));

        for _ in 0..3 {
            w.tick();
            assert_eq!(w.stack.metadata(root).unwrap().delegates, root_delegates);
            assert_eq!(w.stack.metadata(a).unwrap().delegates, a_delegates);
        }
    }
}

// ── Ticking and delegation ────────────────────────────────────────────────────

#[cfg(test)]
mod update_tests {
    use super::*;

    #[test]
    fn delegate_pushed_mid_tick_is_updated_the_same_tick() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![
            node("Root", &journal).delegates(&["A"], DelegateWhen::WhenIdleInUpdate),
            node("A", &journal).leaf(),
        ]);
        w.init("Root");
        w.take_journal();

        let ticked = w.tick();
        assert_eq!(ticked, BehaviorSet::from([w.id("Root"), w.id("A")]));
        assert_eq!(w.take_journal(), vec!["Root:update:0:0", "A:activated", "A:update:0:0"]);
    }

    #[test]
    fn stopped_delegate_reports_back_and_idle_root_ends() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![
            node("Root", &journal).delegates(&["A"], DelegateWhen::OnActivated),
            node("A", &journal).leaf().stops_after(1),
        ]);
        w.init("Root");
        w.take_journal();

        w.tick();
        assert_eq!(w.path(), "Root");
        assert_eq!(w.take_journal(), vec!["Root:update:0:0", "A:update:0:0", "A:deactivated"]);

        // The callback arrives first; with nothing delegated the root then stops.
        w.tick();
        assert_eq!(w.take_journal(), vec![
            "Root:cb1:BehaviorStopped",
            "Root:update:0:0",
            "A:left",
            "Root:deactivated",
        ]);
        assert!(w.stack.is_empty());
    }

    #[test]
    fn cancelled_delegate_reports_cancelled() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![
            node("Root", &journal).delegates(&["A"], DelegateWhen::OnActivated).leaf().cancels_delegate_after(1),
            node("A", &journal).leaf(),
        ]);
        w.init("Root");
        w.take_journal();

        w.tick();
        assert_eq!(w.path(), "Root");
        assert_eq!(w.take_journal(), vec!["Root:update:0:0", "A:deactivated"]);

        w.tick();
        assert_eq!(w.take_journal(), vec!["Root:cb1:Cancelled", "Root:update:0:0"]);
    }

    #[test]
    fn completed_actions_reach_only_the_top() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![
            node("Root", &journal).delegates(&["A"], DelegateWhen::OnActivated),
            node("A", &journal).leaf(),
        ]);
        w.init("Root");
        w.take_journal();

        let done = [CompletedAction { tag: ActionTag(4), result: ActionResult::Success }];
        w.tick_with(&done);
        assert_eq!(w.take_journal(), vec!["Root:update:0:0", "A:update:1:0"]);
    }

    #[test]
    fn events_are_routed_to_subscribers() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![
            node("Root", &journal).delegates(&["A"], DelegateWhen::OnActivated),
            node("A", &journal).leaf().listens_to("Poke"),
        ]);
        w.init("Root");
        w.take_journal();

        assert_eq!(w.services.message_gate.post(RobotEvent::new("Poke", Vec::new())), 1);
        w.tick();
        assert_eq!(w.take_journal(), vec!["Root:update:0:0", "A:update:0:1"]);

        w.tick();
        assert_eq!(w.take_journal(), vec!["Root:update:0:0", "A:update:0:0"]);
    }

    #[test]
    fn delegation_from_below_the_top_is_refused() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![
            node("Root", &journal).delegates(&["A", "B"], DelegateWhen::OnActivated).grabs("B"),
            node("A", &journal).leaf(),
            node("B", &journal).leaf(),
        ]);
        w.init("Root");
        let (root, b) = (w.id("Root"), w.id("B"));
        let before = w.stack.as_slice().to_vec();
        w.take_journal();

        for _ in 0..3 {
            w.tick();
            assert_eq!(w.stack.as_slice(), before.as_slice());
        }
        let journal = w.take_journal();
        assert_eq!(count(&journal, "Root:grab:false"), 3);
        assert_eq!(count(&journal, "Root:grab:true"), 0);
        assert!(!journal.iter().any(|e| e.starts_with("Root:cb")));
        assert!(!w.container.is_activated(b));
        assert_eq!(w.services.delegation.pending_callback_count(root), 0);
        assert_eq!(w.path(), "Root/A");
    }

    #[test]
    fn push_of_active_behavior_is_refused() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![node("Root", &journal).leaf()]);
        w.init("Root");
        let root = w.id("Root");

        assert!(!w.stack.push_onto_stack(root, &mut w.container, &mut w.services));
        assert_eq!(w.stack.len(), 1);
    }
}

// ── Monitors, audio, debug ────────────────────────────────────────────────────

#[cfg(test)]
mod monitor_tests {
    use super::*;

    #[test]
    fn monitors_fire_once_per_changed_tick() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![
            node("Root", &journal).delegates(&["A"], DelegateWhen::WhenIdleInUpdate),
            node("A", &journal).delegates(&["B"], DelegateWhen::WhenIdleInUpdate),
            node("B", &journal).leaf(),
        ]);
        let calls = Rc::new(Cell::new(0));
        w.stack.add_monitor(Box::new(CountingMonitor(calls.clone())));
        w.init("Root");
        assert_eq!(calls.get(), 0);

        // Two pushes, one notification.
        w.tick();
        assert_eq!(w.path(), "Root/A/B");
        assert_eq!(calls.get(), 1);
        assert!(!w.stack.is_dirty());

        w.tick();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn audio_events_carry_the_path() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![
            node("Root", &journal).delegates(&["A"], DelegateWhen::OnActivated),
            node("A", &journal).leaf(),
        ]);
        w.init("Root");
        w.clear();

        let path = |p: &[&str]| p.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let events = w.stack.take_audio_events();
        assert_eq!(events, vec![
            AudioBranchEvent { state: BehaviorStackState::Active, path: path(&["Root"]) },
            AudioBranchEvent { state: BehaviorStackState::Active, path: path(&["Root", "A"]) },
            AudioBranchEvent { state: BehaviorStackState::NotActive, path: path(&["Root", "A"]) },
            AudioBranchEvent { state: BehaviorStackState::NotActive, path: path(&["Root"]) },
        ]);
        assert_eq!(events[1].behavior(), Some("A"));
        assert!(w.stack.take_audio_events().is_empty());
    }

    #[test]
    fn debug_tree_lists_delegation_edges() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![
            node("Root", &journal).delegates(&["A", "B"], DelegateWhen::OnActivated),
            node("A", &journal).delegates(&["C"], DelegateWhen::Never).leaf(),
            node("B", &journal).leaf(),
            node("C", &journal).leaf(),
        ]);
        let clock = RobotClock::new(0.05);
        assert!(matches!(w.stack.debug_tree_json(&w.container, &clock), Err(StackError::Empty)));

        w.init("Root");
        let tree = w.stack.build_debug_behavior_tree(&w.container, &clock);
        assert_eq!(tree.stack, vec!["Root", "A"]);
        assert_eq!(tree.tree.len(), 4);
        assert_eq!(tree.parent_of("Root"), None);
        assert_eq!(tree.parent_of("B"), Some("Root"));
        assert_eq!(tree.parent_of("C"), Some("A"));

        let json = w.stack.debug_tree_json(&w.container, &clock).unwrap();
        assert!(json.contains("\"behaviorID\":\"C\""));
        assert!(json.contains("\"stack\":[\"Root\",\"A\"]"));
    }

    #[test]
    fn viz_monitor_keeps_latest_snapshot() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![
            node("Root", &journal).delegates(&["A"], DelegateWhen::WhenIdleInUpdate),
            node("A", &journal).leaf().stops_after(2),
        ]);
        w.stack.add_monitor(Box::new(StackVizMonitor::new()));
        w.init("Root");

        w.tick();
        let viz = w.stack.monitor::<StackVizMonitor>().unwrap();
        assert_eq!(viz.snapshot_count(), 1);
        assert_eq!(viz.latest().unwrap().stack, vec!["Root", "A"]);

        // A stops itself: one more snapshot.
        w.tick();
        let viz = w.stack.monitor::<StackVizMonitor>().unwrap();
        assert_eq!(viz.snapshot_count(), 2);
        assert!(w.stack.monitor::<StackCycleMonitor>().is_none());
    }

    #[test]
    fn cycle_monitor_reports_oscillating_behavior() {
        let journal = Journal::default();
        let mut w = World::build(&journal, vec![
            node("Root", &journal).delegates(&["A"], DelegateWhen::WhenIdleInUpdate),
            node("A", &journal).leaf().stops_after(1),
        ]);
        w.stack.add_monitor(Box::new(StackCycleMonitor::new(20, 3)));
        w.init("Root");

        for _ in 0..3 {
            w.tick();
        }
        assert!(w.stack.monitor::<StackCycleMonitor>().unwrap().cycling_behaviors().is_empty());

        for _ in 0..3 {
            w.tick();
        }
        let monitor = w.stack.monitor::<StackCycleMonitor>().unwrap();
        assert_eq!(monitor.cycling_behaviors(), ["A".to_string()]);
        assert!(monitor.duplicate_entries().is_empty());
    }
}
