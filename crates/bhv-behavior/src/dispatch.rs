//! Dispatcher behaviors: nodes whose only job is choosing a delegate.

use std::collections::BTreeSet;

use tracing::{debug, error};

use bhv_core::{BehaviorId, BehaviorRng};

use crate::{
    ActivationContext, Behavior, BehaviorConfig, BehaviorContext, BehaviorResolver,
    BehaviorResult, BehaviorSet,
};

// ── DispatcherPassThrough ─────────────────────────────────────────────────────

/// Has exactly one delegate and follows its lifecycle: activatable whenever
/// the delegate is, and finished as soon as the delegate stops.
///
/// JSON keys: `delegateID`.
#[derive(Debug, Clone)]
pub struct DispatcherPassThrough {
    delegate_label: String,
    delegate:       BehaviorId,
}

impl DispatcherPassThrough {
    pub const CLASS: &'static str = "DispatcherPassThrough";

    pub fn new(delegate_label: impl Into<String>) -> Self {
        Self { delegate_label: delegate_label.into(), delegate: BehaviorId::INVALID }
    }

    pub fn from_config(config: &BehaviorConfig) -> BehaviorResult<Self> {
        Ok(Self::new(config.require_str("delegateID")?))
    }
}

impl Behavior for DispatcherPassThrough {
    fn init(&mut self, resolver: &BehaviorResolver<'_>) -> BehaviorResult<()> {
        self.delegate = resolver.find(&self.delegate_label)?;
        Ok(())
    }

    fn expected_json_keys(&self, keys: &mut BTreeSet<&'static str>) {
        keys.insert("delegateID");
    }

    fn all_delegates(&self, delegates: &mut BehaviorSet) {
        delegates.insert(self.delegate);
    }

    fn wants_to_be_activated(&self, ctx: &ActivationContext<'_>) -> bool {
        ctx.wants_to_be_activated(self.delegate)
    }

    fn on_activated(&mut self, ctx: &mut BehaviorContext<'_>) {
        if !ctx.delegate_if_in_control(self.delegate, None) {
            error!(
                behavior = ctx.label(),
                delegate = %self.delegate_label,
                "DispatcherPassThrough.OnActivated.DelegateDoesNotWantToBeActivated"
            );
        }
    }
}

// ── DispatcherRandom ──────────────────────────────────────────────────────────

/// Picks uniformly among the configured behaviors that want to run, and
/// picks again whenever the current one stops.  Ends itself once none of
/// them wants to run.
///
/// JSON keys: `behaviors` (array of behavior IDs).
pub struct DispatcherRandom {
    labels:    Vec<String>,
    behaviors: Vec<BehaviorId>,
    rng:       Option<BehaviorRng>,
}

impl DispatcherRandom {
    pub const CLASS: &'static str = "DispatcherRandom";

    pub fn new(labels: Vec<String>) -> Self {
        Self { labels, behaviors: Vec::new(), rng: None }
    }

    pub fn from_config(config: &BehaviorConfig) -> BehaviorResult<Self> {
        Ok(Self::new(config.require_str_list("behaviors")?))
    }

    fn dispatch(&mut self, ctx: &mut BehaviorContext<'_>) {
        let candidates: Vec<BehaviorId> = self
            .behaviors
            .iter()
            .copied()
            .filter(|&b| ctx.wants_to_be_activated(b))
            .collect();
        let Some(rng) = self.rng.as_mut() else { return };
        match rng.choose(&candidates) {
            Some(&choice) => {
                debug!(
                    behavior = ctx.label(),
                    choice = ctx.container().label(choice),
                    candidates = candidates.len(),
                    "DispatcherRandom.Dispatch"
                );
                ctx.delegate_if_in_control(choice, None);
            }
            None => debug!(behavior = ctx.label(), "DispatcherRandom.Dispatch.NoCandidates"),
        }
    }
}

impl Behavior for DispatcherRandom {
    fn init(&mut self, resolver: &BehaviorResolver<'_>) -> BehaviorResult<()> {
        self.behaviors = self
            .labels
            .iter()
            .map(|label| resolver.find(label))
            .collect::<BehaviorResult<_>>()?;
        self.rng = Some(resolver.rng());
        Ok(())
    }

    fn expected_json_keys(&self, keys: &mut BTreeSet<&'static str>) {
        keys.insert("behaviors");
    }

    fn all_delegates(&self, delegates: &mut BehaviorSet) {
        delegates.extend(self.behaviors.iter().copied());
    }

    fn wants_to_be_activated(&self, ctx: &ActivationContext<'_>) -> bool {
        self.behaviors.iter().any(|&b| ctx.wants_to_be_activated(b))
    }

    fn on_activated(&mut self, ctx: &mut BehaviorContext<'_>) {
        self.dispatch(ctx);
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) {
        if !ctx.is_control_delegated() {
            self.dispatch(ctx);
        }
    }
}
