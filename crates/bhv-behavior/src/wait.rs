//! `BehaviorWait` — the simplest useful behavior.

use std::collections::BTreeSet;

use tracing::debug;

use crate::{
    ActivationContext, Behavior, BehaviorConfig, BehaviorContext, BehaviorOperationModifiers,
    BehaviorResult, WaitAction,
};

/// Idles, either for a fixed time (via a delegated [`WaitAction`]) or until
/// something else stops it.
///
/// JSON keys: optional `waitTime_s`, optional `gentlyInterruptible`
/// (default `true`).
#[derive(Debug, Clone)]
pub struct BehaviorWait {
    wait_time_s:          Option<f64>,
    gently_interruptible: bool,
}

impl BehaviorWait {
    pub const CLASS: &'static str = "Wait";

    /// Wait until cancelled.
    pub fn forever() -> Self {
        Self { wait_time_s: None, gently_interruptible: true }
    }

    /// Wait `secs` of robot time, then stop.
    pub fn for_secs(secs: f64) -> Self {
        Self { wait_time_s: Some(secs), gently_interruptible: true }
    }

    pub fn gently_interruptible(mut self, yes: bool) -> Self {
        self.gently_interruptible = yes;
        self
    }

    pub fn from_config(config: &BehaviorConfig) -> BehaviorResult<Self> {
        Ok(Self {
            wait_time_s:          config.opt_f64("waitTime_s")?,
            gently_interruptible: config.opt_bool("gentlyInterruptible")?.unwrap_or(true),
        })
    }
}

impl Behavior for BehaviorWait {
    fn expected_json_keys(&self, keys: &mut BTreeSet<&'static str>) {
        keys.extend(["waitTime_s", "gentlyInterruptible"]);
    }

    fn operation_modifiers(&self, modifiers: &mut BehaviorOperationModifiers) {
        // Open-ended waits hold no delegate and must not be auto-cancelled.
        modifiers.behavior_always_delegates = self.wait_time_s.is_some();
    }

    fn wants_to_be_activated(&self, _ctx: &ActivationContext<'_>) -> bool {
        true
    }

    fn can_be_gently_interrupted_now(&self) -> bool {
        self.gently_interruptible
    }

    fn on_activated(&mut self, ctx: &mut BehaviorContext<'_>) {
        if let Some(secs) = self.wait_time_s {
            debug!(behavior = ctx.label(), secs, "BehaviorWait.OnActivated");
            ctx.delegate_action_if_in_control(Box::new(WaitAction::new(secs)), None);
        }
    }
}
