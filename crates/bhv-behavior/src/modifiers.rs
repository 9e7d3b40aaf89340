//! Operation modifiers: declarative knobs the base layer acts on for every
//! behavior (activation gating, auto-cancel, cube and vision requests).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{BehaviorError, BehaviorResult};

/// How strongly a behavior depends on a cube connection.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CubeConnectionRequirements {
    #[default]
    None,
    /// Always activatable; subscribe only if already connected.
    OptionalLazy,
    /// Always activatable; always subscribe.
    OptionalActive,
    /// Activatable only while connected.
    RequiredLazy,
    /// Activatable only while connected; an ancestor manages the connection.
    RequiredManaged,
}

impl CubeConnectionRequirements {
    pub fn requires_connection(self) -> bool {
        matches!(self, Self::RequiredLazy | Self::RequiredManaged)
    }
}

/// Per-behavior flags read once after init.
///
/// Defaults come from [`Default`], are overridden by JSON keys of the same
/// (camelCase) name, and finally by [`Behavior::operation_modifiers`][crate::Behavior::operation_modifiers].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BehaviorOperationModifiers {
    pub wants_to_be_activated_when_carrying_object: bool,
    pub wants_to_be_activated_when_off_treads:      bool,
    pub wants_to_be_activated_when_on_charger:      bool,

    /// Cancel the behavior at the end of any update in which it holds no delegate.
    pub behavior_always_delegates: bool,

    pub cube_connection_requirements:          CubeConnectionRequirements,
    pub connect_to_cube_in_background:         bool,
    pub ensures_cube_connection_at_delegation: bool,

    /// Vision modes requested while the behavior is in activatable scope.
    pub vision_modes_for_activatable_scope: BTreeSet<String>,
    /// Vision modes requested while the behavior is activated.
    pub vision_modes_for_active_scope: BTreeSet<String>,
}

impl Default for BehaviorOperationModifiers {
    fn default() -> Self {
        Self {
            wants_to_be_activated_when_carrying_object: false,
            wants_to_be_activated_when_off_treads:      false,
            wants_to_be_activated_when_on_charger:      true,
            behavior_always_delegates:                  true,
            cube_connection_requirements:          CubeConnectionRequirements::None,
            connect_to_cube_in_background:         false,
            ensures_cube_connection_at_delegation: false,
            vision_modes_for_activatable_scope: BTreeSet::new(),
            vision_modes_for_active_scope:      BTreeSet::new(),
        }
    }
}

/// JSON keys that may never be set from configuration.
pub const ILLEGAL_MODIFIER_KEYS: &[&str] = &["behaviorAlwaysDelegates"];

const FLAG_KEYS: &[&str] = &[
    "wantsToBeActivatedWhenCarryingObject",
    "wantsToBeActivatedWhenOffTreads",
    "wantsToBeActivatedWhenOnCharger",
    "connectToCubeInBackground",
    "ensuresCubeConnectionAtDelegation",
];

const CUBE_KEY: &str = "cubeConnectionRequirements";

impl BehaviorOperationModifiers {
    /// Every JSON key this struct consumes.
    pub fn json_keys() -> impl Iterator<Item = &'static str> {
        FLAG_KEYS.iter().copied().chain([CUBE_KEY]).chain(ILLEGAL_MODIFIER_KEYS.iter().copied())
    }

    fn flag_mut(&mut self, key: &str) -> Option<&mut bool> {
        match key {
            "wantsToBeActivatedWhenCarryingObject" => Some(&mut self.wants_to_be_activated_when_carrying_object),
            "wantsToBeActivatedWhenOffTreads"      => Some(&mut self.wants_to_be_activated_when_off_treads),
            "wantsToBeActivatedWhenOnCharger"      => Some(&mut self.wants_to_be_activated_when_on_charger),
            "connectToCubeInBackground"            => Some(&mut self.connect_to_cube_in_background),
            "ensuresCubeConnectionAtDelegation"    => Some(&mut self.ensures_cube_connection_at_delegation),
            _ => None,
        }
    }

    /// Apply JSON overrides from a behavior definition.
    ///
    /// Returns the set of keys that were present so later code-level
    /// overrides of the same flag can be reported.
    pub fn set_defaults_from_json(
        &mut self,
        config: &Map<String, Value>,
        label:  &str,
    ) -> BehaviorResult<BTreeSet<String>> {
        let mut set_keys = BTreeSet::new();

        for &key in ILLEGAL_MODIFIER_KEYS {
            if config.contains_key(key) {
                return Err(BehaviorError::IllegalKey { label: label.to_owned(), key: key.to_owned() });
            }
        }

        for &key in FLAG_KEYS {
            let Some(value) = config.get(key) else { continue };
            let flag = value.as_bool().ok_or_else(|| {
                BehaviorError::Config(format!("{label}: modifier {key} must be a boolean"))
            })?;
            if let Some(slot) = self.flag_mut(key) {
                *slot = flag;
            }
            set_keys.insert(key.to_owned());
        }

        if let Some(value) = config.get(CUBE_KEY) {
            self.cube_connection_requirements = serde_json::from_value(value.clone()).map_err(|e| {
                BehaviorError::Config(format!("{label}: invalid {CUBE_KEY}: {e}"))
            })?;
            set_keys.insert(CUBE_KEY.to_owned());
        }

        Ok(set_keys)
    }

    fn flag(&self, key: &str) -> Option<bool> {
        match key {
            "wantsToBeActivatedWhenCarryingObject" => Some(self.wants_to_be_activated_when_carrying_object),
            "wantsToBeActivatedWhenOffTreads"      => Some(self.wants_to_be_activated_when_off_treads),
            "wantsToBeActivatedWhenOnCharger"      => Some(self.wants_to_be_activated_when_on_charger),
            "connectToCubeInBackground"            => Some(self.connect_to_cube_in_background),
            "ensuresCubeConnectionAtDelegation"    => Some(self.ensures_cube_connection_at_delegation),
            _ => None,
        }
    }

    /// Names of JSON-set keys whose value differs between `self` and `other`.
    pub fn changed_keys<'k>(&self, other: &Self, keys: &'k BTreeSet<String>) -> Vec<&'k str> {
        keys.iter()
            .filter(|k| match (self.flag(k), other.flag(k)) {
                (Some(x), Some(y)) => x != y,
                _ => k.as_str() == CUBE_KEY
                    && self.cube_connection_requirements != other.cube_connection_requirements,
            })
            .map(String::as_str)
            .collect()
    }
}
