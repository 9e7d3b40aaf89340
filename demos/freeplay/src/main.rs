//! freeplay — a small robot "HighLevelAI" driven by the behavior framework.
//!
//! The top-level state machine cycles between Observing, Exploring,
//! Socializing, and Napping.  Perception is simulated: a seeded RNG decides
//! when a face walks into view.  When a socialize session ends the robot
//! sometimes hears a voice command, which restarts the behavior stack; the
//! fresh "Socialized" suggestion then sends the AI straight to Napping.
//!
//! Usage:
//!
//! ```text
//! freeplay                 # embedded behavior definitions
//! freeplay path/to/dir     # every *.json definition file in `dir`
//! RUST_LOG=debug freeplay  # framework logging
//! ```

use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bhv_behavior::{
    ActivationContext, Behavior, BehaviorContainer, BehaviorContext, BehaviorFactory,
    BehaviorOperationModifiers, CallbackTag, DelegateOutcome, WaitAction,
};
use bhv_core::{SystemConfig, Tick};
use bhv_stack::{AudioBranchEvent, BehaviorStack, BehaviorStackState};
use bhv_states::{
    register_internal_states, register_internal_states_with, ConditionContext, ConditionFactory,
    InternalStatesBehavior, SuggestionResumeOverride,
};
use bhv_system::{load_behaviors_dir, load_behaviors_reader, BehaviorSystem, SystemBuilder, SystemObserver};

// ── Constants ─────────────────────────────────────────────────────────────────

const SEED:               u64 = 42;
const SIM_TICKS:          u64 = 600; // 36 s of robot time at 60 ms per tick
const FACE_APPEAR_PROB:   f64 = 0.02;
const FACE_LEAVE_PROB:    f64 = 0.08;
const VOICE_COMMAND_PROB: f64 = 0.5;
const SOCIALIZE_SECS:     f64 = 1.5;

const ROOT: &str = "HighLevelAI";
const SOCIALIZED_SUGGESTION: &str = "Socialized";

// ── Behavior definitions ──────────────────────────────────────────────────────

const BEHAVIORS_JSON: &str = r#"[
  { "behaviorClass": "Wait", "behaviorID": "ObservingWait" },
  { "behaviorClass": "Wait", "behaviorID": "TurnToFace",  "waitTime_s": 0.18 },
  { "behaviorClass": "Wait", "behaviorID": "Nap",         "waitTime_s": 1.8, "gentlyInterruptible": false },
  { "behaviorClass": "Wait", "behaviorID": "Wander",      "waitTime_s": 0.3 },
  { "behaviorClass": "Wait", "behaviorID": "LookAround",  "waitTime_s": 0.6 },
  { "behaviorClass": "Wait", "behaviorID": "Drive",       "waitTime_s": 0.9 },
  { "behaviorClass": "DispatcherRandom", "behaviorID": "Explore",
    "behaviors": ["Wander", "LookAround", "Drive"] },
  {
    "behaviorClass": "HighLevelAI",
    "behaviorID": "HighLevelAI",
    "initialState": "Observing",
    "states": [
      { "name": "Observing",   "behavior": "ObservingWait" },
      { "name": "Exploring",   "behavior": "Explore" },
      { "name": "Socializing", "behavior": "Socialize", "getInBehavior": "TurnToFace" },
      { "name": "Napping",     "behavior": "Nap" }
    ],
    "transitionDefinitions": [
      { "from": ["Observing"],
        "transitions": [
          { "to": "Socializing", "type": "NonInterrupting",
            "condition": { "conditionType": "Compound", "and": [
              { "customCondition": "SeesFace" },
              { "conditionType": "StateExitCooldown", "state": "Socializing", "cooldown_s": 3.0 } ] } },
          { "to": "Exploring", "type": "NonInterrupting",
            "condition": { "conditionType": "TimerInRange", "begin_s": 2.4 } } ] },
      { "from": ["Exploring"],
        "transitions": [
          { "to": "Socializing", "type": "Interrupting",
            "condition": { "customCondition": "SeesFace" } },
          { "to": "Napping", "type": "Interrupting",
            "condition": { "conditionType": "TimerInRange", "begin_s": 6.0 } } ] },
      { "from": ["Socializing", "Napping"],
        "transitions": [
          { "to": "Observing", "type": "Exit",
            "condition": { "conditionType": "TrueCondition" } } ] }
    ],
    "postBehaviorSuggestionResumeOverrides": { "Socialized": "Napping" }
  }
]"#;

// ── Native behaviors ──────────────────────────────────────────────────────────

const CB_ENGAGED: CallbackTag = CallbackTag(1);

/// Engages with the person in view for a while, then posts the
/// `Socialized` suggestion and stops.
struct Socialize {
    engagement_s: f64,
}

impl Behavior for Socialize {
    fn operation_modifiers(&self, modifiers: &mut BehaviorOperationModifiers) {
        modifiers.behavior_always_delegates = false;
    }

    fn wants_to_be_activated(&self, ctx: &ActivationContext<'_>) -> bool {
        ctx.whiteboard().fact("FaceDetected")
    }

    fn on_activated(&mut self, ctx: &mut BehaviorContext<'_>) {
        ctx.delegate_action_if_in_control(Box::new(WaitAction::new(self.engagement_s)), Some(CB_ENGAGED));
    }

    fn on_delegate_complete(&mut self, tag: CallbackTag, outcome: DelegateOutcome, ctx: &mut BehaviorContext<'_>) {
        if tag != CB_ENGAGED {
            return;
        }
        info!(behavior = ctx.label(), ?outcome, "Socialize.Done");
        let tick = ctx.tick();
        ctx.whiteboard_mut().post_suggestion(SOCIALIZED_SUGGESTION, tick);
        ctx.cancel_self();
    }
}

// ── Observer ──────────────────────────────────────────────────────────────────

/// Prints the active chain whenever it changes and remembers when a
/// socialize session just ended.
#[derive(Default)]
struct Narrator {
    last_path:         String,
    changes:           usize,
    socializes:        usize,
    socialize_ended:   bool,
    behaviors_started: BTreeSet<String>,
}

impl SystemObserver for Narrator {
    fn on_audio_event(&mut self, event: &AudioBranchEvent) {
        let Some(behavior) = event.behavior() else { return };
        match event.state {
            BehaviorStackState::Active => {
                self.behaviors_started.insert(behavior.to_owned());
                if behavior == "Socialize" {
                    self.socializes += 1;
                }
            }
            BehaviorStackState::NotActive => {
                if behavior == "Socialize" {
                    self.socialize_ended = true;
                }
            }
        }
    }

    fn on_tick_end(&mut self, tick: Tick, stack: &BehaviorStack, container: &BehaviorContainer) {
        let path = stack.stack_to_behavior_string(container);
        if path != self.last_path {
            println!("{:>6}  {path}", tick.to_string());
            self.last_path = path;
            self.changes += 1;
        }
    }
}

// ── Setup ─────────────────────────────────────────────────────────────────────

fn conditions() -> ConditionFactory {
    let mut conditions = ConditionFactory::new();
    conditions.inject_custom("SeesFace", |ctx: &ConditionContext<'_>| ctx.whiteboard().fact("FaceDetected"));
    conditions
}

fn factory(conditions: ConditionFactory) -> BehaviorFactory {
    let conditions = Rc::new(conditions);
    let mut factory = BehaviorFactory::with_builtin_behaviors();
    register_internal_states(&mut factory, Rc::clone(&conditions));
    register_internal_states_with(&mut factory, ROOT, conditions, SuggestionResumeOverride::from_config);
    factory
}

fn definitions() -> Result<Vec<Value>> {
    match std::env::args().nth(1) {
        Some(dir) => load_behaviors_dir(Path::new(&dir)).with_context(|| format!("loading behaviors from {dir}")),
        None => Ok(load_behaviors_reader(Cursor::new(BEHAVIORS_JSON))?),
    }
}

fn current_state(system: &BehaviorSystem) -> &str {
    system
        .behavior::<InternalStatesBehavior<SuggestionResumeOverride>>(ROOT)
        .and_then(|ai| ai.current_state_name())
        .unwrap_or("<none>")
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("=== freeplay — behavior stack demo ===");
    println!("Ticks: {SIM_TICKS}  |  Seed: {SEED}");
    println!();

    // 1. Behaviors and the system.
    let config = SystemConfig { seed: SEED, ..SystemConfig::default() };
    let tick_s = config.tick_duration_s;
    let definitions = definitions()?;
    println!("Loaded {} behavior definitions", definitions.len());

    let mut system = SystemBuilder::new(config)
        .factory(factory(conditions()))
        .behaviors(definitions)
        .behavior("Socialize", Box::new(Socialize { engagement_s: SOCIALIZE_SECS }))
        .root(ROOT)
        .build()
        .context("building the behavior system")?;
    println!("Initial state: {}", current_state(&system));
    println!();

    // 2. Run, simulating perception between ticks.
    let mut perception = SmallRng::seed_from_u64(SEED);
    let mut narrator = Narrator::default();
    let mut restarts = 0;

    println!("{:>6}  {}", "Tick", "Active behaviors");
    println!("{}", "-".repeat(48));
    for _ in 0..SIM_TICKS {
        let face = system.whiteboard().fact("FaceDetected");
        let flip = if face { FACE_LEAVE_PROB } else { FACE_APPEAR_PROB };
        if perception.gen_bool(flip) {
            system.whiteboard_mut().set_fact("FaceDetected", !face);
        }

        system.update(&mut narrator);

        if std::mem::take(&mut narrator.socialize_ended) && perception.gen_bool(VOICE_COMMAND_PROB) {
            println!("{:>6}  -- voice command, restarting the stack", system.now_tick().to_string());
            system.restart()?;
            restarts += 1;
            println!("{:>6}  resumed in {}", "", current_state(&system));
        }
    }

    // 3. Summary.
    println!();
    println!("Simulated {:.2} s of robot time", SIM_TICKS as f64 * tick_s);
    println!("  stack changes    : {}", narrator.changes);
    println!("  socialize runs   : {}", narrator.socializes);
    println!("  stack restarts   : {restarts}");
    println!("  final state      : {}", current_state(&system));
    println!("  behaviors started: {}", narrator.behaviors_started.iter().cloned().collect::<Vec<_>>().join(", "));

    if let Some(tree) = system.debug_tree() {
        println!();
        println!("{:<16} {:<16}", "Behavior", "Parent");
        println!("{}", "-".repeat(32));
        for relation in &tree.tree {
            println!("{:<16} {:<16}", relation.behavior_id, relation.parent.as_deref().unwrap_or("-"));
        }
    }

    Ok(())
}
