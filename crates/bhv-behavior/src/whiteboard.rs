//! Shared blackboard of robot facts, perception facts, and post-behavior
//! suggestions.

use rustc_hash::FxHashMap;

use bhv_core::Tick;

/// Physical robot state read by the base activation check.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RobotFacts {
    pub carrying_object: bool,
    pub off_treads:      bool,
    pub on_charger:      bool,
    pub cube_connected:  bool,
}

impl RobotFacts {
    /// Look a robot fact up by the name conditions use in JSON.
    pub fn by_name(&self, name: &str) -> Option<bool> {
        match name {
            "CarryingObject" => Some(self.carrying_object),
            "OffTreads"      => Some(self.off_treads),
            "OnCharger"      => Some(self.on_charger),
            "CubeConnected"  => Some(self.cube_connected),
            _ => None,
        }
    }
}

/// Blackboard shared by every behavior through the behavior services.
///
/// Perception is outside the behavior system; whoever owns the robot model
/// writes facts here between ticks and conditions read them.
#[derive(Debug, Default)]
pub struct Whiteboard {
    pub robot: RobotFacts,
    facts: FxHashMap<String, bool>,
    /// Suggestion name → tick on which it was last posted.
    suggestions: FxHashMap<String, Tick>,
}

impl Whiteboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fact(&mut self, name: impl Into<String>, value: bool) {
        self.facts.insert(name.into(), value);
    }

    /// Value of a named perception fact; unknown facts read as `false`.
    pub fn fact(&self, name: &str) -> bool {
        self.facts.get(name).copied().unwrap_or(false)
    }

    /// Post a suggestion on behalf of a behavior that just finished.
    pub fn post_suggestion(&mut self, name: impl Into<String>, tick: Tick) {
        self.suggestions.insert(name.into(), tick);
    }

    /// Tick on which `name` was last posted, if it is still pending.
    pub fn suggestion_tick(&self, name: &str) -> Option<Tick> {
        self.suggestions.get(name).copied()
    }

    pub fn clear_suggestions(&mut self) {
        self.suggestions.clear();
    }

    pub fn pending_suggestions(&self) -> usize {
        self.suggestions.len()
    }
}
