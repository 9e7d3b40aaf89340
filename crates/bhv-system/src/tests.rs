//! Integration tests for bhv-system.

use std::io::Cursor;

use serde_json::{json, Value};

use bhv_behavior::{ActivationContext, Behavior, BehaviorError, RobotEvent, MOVE_TO_STATE_EVENT};
use bhv_core::{SystemConfig, Tick};
use bhv_stack::{AudioBranchEvent, BehaviorStack, BehaviorStackState, StackCycleMonitor, StackVizMonitor};
use bhv_states::{ConditionContext, ConditionFactory, InternalStatesBehavior};

use crate::{
    load_behaviors_dir, load_behaviors_file, load_behaviors_reader, BehaviorSystem, SystemBuilder,
    SystemError, SystemObserver,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Observing ⇄ Socializing, with a short timed socialize.
fn freeplay_definitions() -> Vec<Value> {
    vec![
        json!({ "behaviorClass": "Wait", "behaviorID": "ObservingWait" }),
        json!({ "behaviorClass": "Wait", "behaviorID": "Socialize", "waitTime_s": 0.3 }),
        json!({
            "behaviorClass": "InternalStatesBehavior",
            "behaviorID": "Freeplay",
            "initialState": "Observing",
            "states": [
                { "name": "Observing",   "behavior": "ObservingWait" },
                { "name": "Socializing", "behavior": "Socialize" }
            ],
            "transitionDefinitions": [
                { "from": ["Observing"],
                  "transitions": [ { "to": "Socializing", "type": "NonInterrupting",
                                     "condition": { "customCondition": "SeesFace" } } ] },
                { "from": ["Socializing"],
                  "transitions": [ { "to": "Observing", "type": "Exit",
                                     "condition": { "conditionType": "TrueCondition" } } ] }
            ]
        }),
    ]
}

fn face_conditions() -> ConditionFactory {
    let mut conditions = ConditionFactory::new();
    conditions.inject_custom("SeesFace", |ctx: &ConditionContext<'_>| ctx.whiteboard().fact("FaceDetected"));
    conditions
}

fn freeplay(config: SystemConfig) -> BehaviorSystem {
    SystemBuilder::new(config)
        .conditions(face_conditions())
        .behaviors(freeplay_definitions())
        .root("Freeplay")
        .build()
        .unwrap()
}

fn state(system: &BehaviorSystem) -> String {
    system
        .behavior::<InternalStatesBehavior>("Freeplay")
        .and_then(|m| m.current_state_name())
        .unwrap_or_default()
        .to_owned()
}

#[derive(Default)]
struct Recorder {
    starts: Vec<Tick>,
    ends:   Vec<(Tick, String)>,
    audio:  Vec<AudioBranchEvent>,
}

impl SystemObserver for Recorder {
    fn on_tick_start(&mut self, tick: Tick) {
        self.starts.push(tick);
    }

    fn on_audio_event(&mut self, event: &AudioBranchEvent) {
        self.audio.push(event.clone());
    }

    fn on_tick_end(&mut self, tick: Tick, stack: &BehaviorStack, container: &bhv_behavior::BehaviorContainer) {
        self.ends.push((tick, stack.stack_to_behavior_string(container)));
    }
}

struct Reluctant;

impl Behavior for Reluctant {
    fn wants_to_be_activated(&self, _ctx: &ActivationContext<'_>) -> bool {
        false
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use super::*;

    #[test]
    fn builds_and_activates_the_root() {
        let system = freeplay(SystemConfig::default());
        assert_eq!(system.stack_string(), "Freeplay/ObservingWait");
        assert_eq!(state(&system), "Observing");
        assert_eq!(system.container().len(), 3);
        assert_eq!(system.now_tick(), Tick::ZERO);
    }

    #[test]
    fn root_is_required() {
        let result = SystemBuilder::new(SystemConfig::default()).behaviors(freeplay_definitions()).build();
        assert!(matches!(result, Err(SystemError::MissingRoot)));
    }

    #[test]
    fn unknown_root_is_rejected() {
        let result = SystemBuilder::new(SystemConfig::default())
            .conditions(face_conditions())
            .behaviors(freeplay_definitions())
            .root("HighLevelAI")
            .build();
        assert!(matches!(result, Err(SystemError::UnknownRoot(ref r)) if r == "HighLevelAI"));
    }

    #[test]
    fn unknown_class_is_rejected() {
        let result = SystemBuilder::new(SystemConfig::default())
            .behaviors([json!({ "behaviorClass": "Teleport", "behaviorID": "Zap" })])
            .root("Zap")
            .build();
        assert!(matches!(result, Err(SystemError::Behavior(BehaviorError::UnknownClass(ref c))) if c == "Teleport"));
    }

    #[test]
    fn missing_custom_condition_names_the_state_machine() {
        let result = SystemBuilder::new(SystemConfig::default())
            .behaviors(freeplay_definitions())
            .root("Freeplay")
            .build();
        let Err(SystemError::Behavior(BehaviorError::Config(msg))) = result else {
            panic!("expected a config error");
        };
        assert!(msg.starts_with("Freeplay:"), "{msg}");
        assert!(msg.contains("SeesFace"), "{msg}");
    }

    #[test]
    fn declining_root_is_an_error() {
        let result = SystemBuilder::new(SystemConfig::default())
            .behavior("Reluctant", Box::new(Reluctant))
            .root("Reluctant")
            .build();
        assert!(matches!(result, Err(SystemError::RootDeclined(ref r)) if r == "Reluctant"));
    }

    #[test]
    fn monitors_follow_the_config() {
        let dev = freeplay(SystemConfig::default());
        assert!(dev.stack().monitor::<StackVizMonitor>().is_some());
        assert!(dev.stack().monitor::<StackCycleMonitor>().is_some());

        let quiet = freeplay(SystemConfig { dev_monitors: false, ..SystemConfig::default() });
        assert!(quiet.stack().monitor::<StackVizMonitor>().is_none());
        assert!(quiet.stack().monitor::<StackCycleMonitor>().is_some());
    }
}

// ── Ticking ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tick_tests {
    use super::*;

    #[test]
    fn face_starts_a_timed_socialize_that_exits_back() {
        let mut system = freeplay(SystemConfig::default());
        system.tick();
        assert_eq!(state(&system), "Observing");

        system.whiteboard_mut().set_fact("FaceDetected", true);
        system.tick();
        system.whiteboard_mut().set_fact("FaceDetected", false);
        assert_eq!(state(&system), "Socializing");
        assert_eq!(system.stack_string(), "Freeplay/Socialize");
        assert_eq!(system.services().actions.len(), 1);

        let mut ticks = 0;
        while state(&system) == "Socializing" && ticks < 20 {
            system.tick();
            ticks += 1;
        }
        assert!((5..=9).contains(&ticks), "socialized for {ticks} ticks");
        assert_eq!(system.stack_string(), "Freeplay/ObservingWait");
        assert!(system.services().actions.is_empty());
    }

    #[test]
    fn observer_sees_every_tick_and_stack_change() {
        let mut system = freeplay(SystemConfig::default());
        let mut recorder = Recorder::default();
        system.run_ticks(3, &mut recorder);

        assert_eq!(recorder.starts, vec![Tick(1), Tick(2), Tick(3)]);
        assert_eq!(recorder.ends.len(), 3);
        assert!(recorder.ends.iter().all(|(_, path)| path == "Freeplay/ObservingWait"));

        let active: Vec<_> = recorder
            .audio
            .iter()
            .filter(|e| e.state == BehaviorStackState::Active)
            .filter_map(|e| e.behavior())
            .collect();
        assert_eq!(active, vec!["Freeplay", "ObservingWait"]);

        system.whiteboard_mut().set_fact("FaceDetected", true);
        system.update(&mut recorder);
        let last: Vec<_> = recorder.audio.iter().rev().take(2).collect();
        assert_eq!(last[0].state, BehaviorStackState::Active);
        assert_eq!(last[0].path, vec!["Freeplay".to_owned(), "Socialize".to_owned()]);
        assert_eq!(last[1].state, BehaviorStackState::NotActive);
        assert_eq!(last[1].behavior(), Some("ObservingWait"));
    }

    #[test]
    fn move_to_state_event_reaches_the_state_machine() {
        let mut system = freeplay(SystemConfig::default());
        assert_eq!(system.post_event(RobotEvent::new(MOVE_TO_STATE_EVENT, "Socializing")), 1);
        system.tick();
        assert_eq!(state(&system), "Socializing");
        assert!(system.ticked_last_update().contains(&system.root()));
    }

    #[test]
    fn unsubscribed_events_reach_nobody() {
        let mut system = freeplay(SystemConfig::default());
        assert_eq!(system.post_event(RobotEvent::new("Unheard", "x")), 0);
        system.tick();
        assert_eq!(state(&system), "Observing");
    }

    #[test]
    fn restart_brings_the_root_back_up() {
        let mut system = freeplay(SystemConfig::default());
        system.tick();
        system.restart().unwrap();
        assert_eq!(system.stack().len(), 2);
        assert_eq!(system.stack().as_slice()[0], system.root());
        system.tick();
        assert!(system.stack_string().starts_with("Freeplay/"));
    }

    #[test]
    fn same_seed_dispatches_identically() {
        let definitions = || {
            let mut defs: Vec<Value> = (0..4)
                .map(|i| json!({ "behaviorClass": "Wait", "behaviorID": format!("Idle{i}"), "waitTime_s": 0.12 }))
                .collect();
            defs.push(json!({
                "behaviorClass": "DispatcherRandom",
                "behaviorID": "Root",
                "behaviors": ["Idle0", "Idle1", "Idle2", "Idle3"]
            }));
            defs
        };
        let run = || {
            let config = SystemConfig { seed: 7, ..SystemConfig::default() };
            let mut system = SystemBuilder::new(config).behaviors(definitions()).root("Root").build().unwrap();
            let mut recorder = Recorder::default();
            system.run_ticks(60, &mut recorder);
            recorder
                .audio
                .iter()
                .filter(|e| e.state == BehaviorStackState::Active)
                .filter_map(|e| e.behavior().map(str::to_owned))
                .collect::<Vec<_>>()
        };

        let first = run();
        assert!(first.len() > 5, "{first:?}");
        assert_eq!(first, run());
    }
}

// ── Debug surfaces ────────────────────────────────────────────────────────────

#[cfg(test)]
mod debug_tests {
    use super::*;

    #[test]
    fn debug_tree_lists_the_active_chain_and_delegates() {
        let system = freeplay(SystemConfig::default());
        let tree = system.debug_tree().unwrap();
        assert_eq!(tree.stack, vec!["Freeplay".to_owned(), "ObservingWait".to_owned()]);
        assert_eq!(tree.parent_of("ObservingWait"), Some("Freeplay"));
        assert_eq!(tree.parent_of("Socialize"), Some("Freeplay"));
        assert_eq!(tree.parent_of("Freeplay"), None);

        let json: Value = serde_json::from_str(&system.debug_tree_json().unwrap()).unwrap();
        assert_eq!(json["stack"][0], "Freeplay");
        assert!(json["tree"].as_array().unwrap().iter().any(|r| r["behaviorID"] == "Socialize"));
    }

    #[test]
    fn viz_monitor_snapshots_changes() {
        let mut system = freeplay(SystemConfig::default());
        system.tick();
        let viz = system.stack().monitor::<StackVizMonitor>().unwrap();
        assert_eq!(viz.snapshot_count(), 1);
        assert_eq!(viz.latest().unwrap().stack.len(), 2);

        system.tick();
        assert_eq!(system.stack().monitor::<StackVizMonitor>().unwrap().snapshot_count(), 1);
    }
}

// ── Loader ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod loader_tests {
    use super::*;

    #[test]
    fn reader_accepts_an_object_or_an_array() {
        let one = load_behaviors_reader(Cursor::new(r#"{ "behaviorClass": "Wait", "behaviorID": "W" }"#)).unwrap();
        assert_eq!(one.len(), 1);

        let many = load_behaviors_reader(Cursor::new(serde_json::to_string(&freeplay_definitions()).unwrap())).unwrap();
        assert_eq!(many.len(), 3);

        assert!(matches!(load_behaviors_reader(Cursor::new("[1, 2]")), Err(SystemError::Definitions { .. })));
        assert!(matches!(load_behaviors_reader(Cursor::new("\"Wait\"")), Err(SystemError::Definitions { .. })));
        assert!(matches!(load_behaviors_reader(Cursor::new("{ nope")), Err(SystemError::Json(_))));
    }

    #[test]
    fn directory_loads_json_files_in_name_order() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let defs = freeplay_definitions();
        std::fs::write(dir.path().join("b_machine.json"), defs[2].to_string()).unwrap();
        std::fs::write(dir.path().join("a_waits.json"), json!([defs[0], defs[1]]).to_string()).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not json").unwrap();

        let loaded = load_behaviors_dir(dir.path()).unwrap();
        let ids: Vec<&str> = loaded.iter().filter_map(|d| d["behaviorID"].as_str()).collect();
        assert_eq!(ids, vec!["ObservingWait", "Socialize", "Freeplay"]);

        let mut system = SystemBuilder::new(SystemConfig::default())
            .conditions(face_conditions())
            .behaviors(loaded)
            .root("Freeplay")
            .build()
            .unwrap();
        system.tick();
        assert_eq!(system.stack_string(), "Freeplay/ObservingWait");
    }

    #[test]
    fn file_errors_name_the_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "[{").unwrap();

        let err = load_behaviors_file(&path).unwrap_err();
        assert!(matches!(err, SystemError::Definitions { ref path, .. } if path.ends_with("broken.json")));
        assert!(matches!(load_behaviors_file(&dir.path().join("missing.json")), Err(SystemError::Io(_))));
    }
}
