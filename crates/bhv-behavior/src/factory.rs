//! JSON-driven behavior construction.
//!
//! A behavior definition is a JSON object with two common keys:
//!
//! ```json
//! { "behaviorClass": "Wait", "behaviorID": "IdleWait", "waitTime_s": 2.0 }
//! ```
//!
//! `behaviorClass` selects a registered constructor, `behaviorID` becomes the
//! unique label in the container, operation-modifier keys are consumed by the
//! base layer, and everything else is handed to the constructor as `params`.
//! A key nobody expects is a load error.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{
    Behavior, BehaviorContainer, BehaviorError, BehaviorOperationModifiers, BehaviorResult,
    BehaviorWait, DispatcherPassThrough, DispatcherRandom,
};

pub const CLASS_KEY: &str = "behaviorClass";
pub const ID_KEY: &str = "behaviorID";

/// Class-specific part of one behavior definition.
#[derive(Clone, Debug)]
pub struct BehaviorConfig {
    pub class:  String,
    pub label:  String,
    pub params: Map<String, Value>,
}

impl BehaviorConfig {
    pub fn new(class: impl Into<String>, label: impl Into<String>, params: Map<String, Value>) -> Self {
        Self { class: class.into(), label: label.into(), params }
    }

    fn missing(&self, key: &str) -> BehaviorError {
        BehaviorError::MissingKey { label: self.label.clone(), key: key.to_owned() }
    }

    fn invalid(&self, key: &str, expected: &str) -> BehaviorError {
        BehaviorError::Config(format!("{}: key {key:?} must be {expected}", self.label))
    }

    pub fn require_str(&self, key: &str) -> BehaviorResult<&str> {
        self.params
            .get(key)
            .ok_or_else(|| self.missing(key))?
            .as_str()
            .ok_or_else(|| self.invalid(key, "a string"))
    }

    pub fn opt_f64(&self, key: &str) -> BehaviorResult<Option<f64>> {
        self.params
            .get(key)
            .map(|v| v.as_f64().ok_or_else(|| self.invalid(key, "a number")))
            .transpose()
    }

    pub fn opt_bool(&self, key: &str) -> BehaviorResult<Option<bool>> {
        self.params
            .get(key)
            .map(|v| v.as_bool().ok_or_else(|| self.invalid(key, "a boolean")))
            .transpose()
    }

    pub fn require_str_list(&self, key: &str) -> BehaviorResult<Vec<String>> {
        let list = self
            .params
            .get(key)
            .ok_or_else(|| self.missing(key))?
            .as_array()
            .ok_or_else(|| self.invalid(key, "an array of strings"))?;
        list.iter()
            .map(|v| v.as_str().map(str::to_owned).ok_or_else(|| self.invalid(key, "an array of strings")))
            .collect()
    }

    /// Deserialize all params into a typed config struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> BehaviorResult<T> {
        serde_json::from_value(Value::Object(self.params.clone()))
            .map_err(|e| BehaviorError::Config(format!("{}: {e}", self.label)))
    }
}

pub type BehaviorCtor = Box<dyn Fn(&BehaviorConfig) -> BehaviorResult<Box<dyn Behavior>>>;

/// A behavior built from JSON, ready to be stored.
pub struct CreatedBehavior {
    pub label:              String,
    pub class:              String,
    pub behavior:           Box<dyn Behavior>,
    pub modifiers:          BehaviorOperationModifiers,
    pub json_modifier_keys: BTreeSet<String>,
}

/// Registry of constructors keyed by `behaviorClass`.
#[derive(Default)]
pub struct BehaviorFactory {
    ctors: FxHashMap<String, BehaviorCtor>,
}

impl BehaviorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory with `Wait`, `DispatcherPassThrough`, and `DispatcherRandom`.
    pub fn with_builtin_behaviors() -> Self {
        let mut factory = Self::new();
        factory.register(BehaviorWait::CLASS, |c| Ok(Box::new(BehaviorWait::from_config(c)?)));
        factory.register(DispatcherPassThrough::CLASS, |c| {
            Ok(Box::new(DispatcherPassThrough::from_config(c)?))
        });
        factory.register(DispatcherRandom::CLASS, |c| Ok(Box::new(DispatcherRandom::from_config(c)?)));
        factory
    }

    /// Register (or replace) the constructor for `class`.
    pub fn register<F>(&mut self, class: impl Into<String>, ctor: F)
    where
        F: Fn(&BehaviorConfig) -> BehaviorResult<Box<dyn Behavior>> + 'static,
    {
        self.ctors.insert(class.into(), Box::new(ctor));
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.ctors.contains_key(class)
    }

    /// Build one behavior from its JSON definition.
    pub fn create(&self, definition: &Value) -> BehaviorResult<CreatedBehavior> {
        let object = definition
            .as_object()
            .ok_or_else(|| BehaviorError::Config("behavior definition must be a JSON object".to_owned()))?;

        let label = object
            .get(ID_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| BehaviorError::MissingKey { label: "<unnamed>".to_owned(), key: ID_KEY.to_owned() })?
            .to_owned();
        let class = object
            .get(CLASS_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| BehaviorError::MissingKey { label: label.clone(), key: CLASS_KEY.to_owned() })?
            .to_owned();
        let ctor = self
            .ctors
            .get(&class)
            .ok_or_else(|| BehaviorError::UnknownClass(class.clone()))?;

        let mut modifiers = BehaviorOperationModifiers::default();
        let json_modifier_keys = modifiers.set_defaults_from_json(object, &label)?;

        let modifier_keys: BTreeSet<&str> = BehaviorOperationModifiers::json_keys().collect();
        let params: Map<String, Value> = object
            .iter()
            .filter(|(k, _)| k.as_str() != ID_KEY && k.as_str() != CLASS_KEY && !modifier_keys.contains(k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let config = BehaviorConfig::new(class.clone(), label.clone(), params);
        let behavior = ctor(&config)?;

        let mut expected = BTreeSet::new();
        behavior.expected_json_keys(&mut expected);
        if let Some(key) = config.params.keys().find(|k| !expected.contains(k.as_str())) {
            return Err(BehaviorError::UnexpectedKey { label, key: key.clone() });
        }

        Ok(CreatedBehavior { label, class, behavior, modifiers, json_modifier_keys })
    }

    /// Build every definition and store it in `container`.
    pub fn create_all(&self, definitions: &[Value], container: &mut BehaviorContainer) -> BehaviorResult<()> {
        for definition in definitions {
            let created = self.create(definition)?;
            container.add_with_modifiers(
                created.label,
                created.class,
                created.behavior,
                created.modifiers,
                created.json_modifier_keys,
            )?;
        }
        Ok(())
    }
}
