//! Fluent builder for constructing a [`BehaviorSystem`].

use std::rc::Rc;

use serde_json::Value;
use tracing::info;

use bhv_behavior::{Behavior, BehaviorContainer, BehaviorFactory, BehaviorServices};
use bhv_core::SystemConfig;
use bhv_stack::{BehaviorStack, StackCycleMonitor, StackMonitor, StackVizMonitor};
use bhv_states::{register_internal_states, ConditionFactory};

use crate::{BehaviorSystem, SystemError, SystemResult};

/// Class name recorded for behaviors added as ready-made boxes.
pub const NATIVE_CLASS: &str = "Native";

/// The built-in behavior classes plus `InternalStatesBehavior` using
/// `conditions` for custom transition conditions.
pub fn default_factory(conditions: Rc<ConditionFactory>) -> BehaviorFactory {
    let mut factory = BehaviorFactory::with_builtin_behaviors();
    register_internal_states(&mut factory, conditions);
    factory
}

/// Fluent builder for [`BehaviorSystem`].
///
/// # Required inputs
///
/// - [`SystemConfig`] — tick duration, seed, monitor settings, …
/// - a root behavior label, via [`root`][Self::root]
///
/// # Optional inputs (have defaults)
///
/// | Method             | Default                                          |
/// |--------------------|--------------------------------------------------|
/// | `.factory(f)`      | [`default_factory`] over `.conditions(c)`        |
/// | `.conditions(c)`   | A condition factory with no custom conditions    |
/// | `.behaviors(v)`    | No JSON definitions                              |
/// | `.behavior(l, b)`  | No code-built behaviors                          |
/// | `.monitor(m)`      | Cycle monitor, plus the viz monitor in dev mode  |
///
/// # Example
///
/// ```rust,ignore
/// let mut system = SystemBuilder::new(SystemConfig::default())
///     .behaviors(load_behaviors_dir(Path::new("behaviors"))?)
///     .root("HighLevelAI")
///     .build()?;
/// system.run_ticks(100, &mut NoopObserver);
/// ```
pub struct SystemBuilder {
    config:      SystemConfig,
    factory:     Option<BehaviorFactory>,
    conditions:  ConditionFactory,
    definitions: Vec<Value>,
    native:      Vec<(String, Box<dyn Behavior>)>,
    monitors:    Vec<Box<dyn StackMonitor>>,
    root:        Option<String>,
}

impl SystemBuilder {
    pub fn new(config: SystemConfig) -> Self {
        Self {
            config,
            factory:     None,
            conditions:  ConditionFactory::new(),
            definitions: Vec::new(),
            native:      Vec::new(),
            monitors:    Vec::new(),
            root:        None,
        }
    }

    /// Replace the default factory.  `.conditions` is ignored afterwards.
    pub fn factory(mut self, factory: BehaviorFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Custom conditions available to state machines built by the default factory.
    pub fn conditions(mut self, conditions: ConditionFactory) -> Self {
        self.conditions = conditions;
        self
    }

    /// Add JSON behavior definitions.  May be called repeatedly.
    pub fn behaviors(mut self, definitions: impl IntoIterator<Item = Value>) -> Self {
        self.definitions.extend(definitions);
        self
    }

    /// Add a behavior constructed in code.
    pub fn behavior(mut self, label: impl Into<String>, behavior: Box<dyn Behavior>) -> Self {
        self.native.push((label.into(), behavior));
        self
    }

    /// Install an extra stack monitor.
    pub fn monitor(mut self, monitor: Box<dyn StackMonitor>) -> Self {
        self.monitors.push(monitor);
        self
    }

    pub fn root(mut self, label: impl Into<String>) -> Self {
        self.root = Some(label.into());
        self
    }

    /// Create and initialize every behavior, install the monitors, and bring
    /// the stack up on the root.
    pub fn build(self) -> SystemResult<BehaviorSystem> {
        let root_label = self.root.ok_or(SystemError::MissingRoot)?;
        let factory = match self.factory {
            Some(f) => f,
            None => default_factory(Rc::new(self.conditions)),
        };

        // ── Behaviors ─────────────────────────────────────────────────────
        let mut container = BehaviorContainer::new();
        factory.create_all(&self.definitions, &mut container)?;
        for (label, behavior) in self.native {
            container.add(label, NATIVE_CLASS, behavior)?;
        }
        let root = container
            .find_by_label(&root_label)
            .ok_or_else(|| SystemError::UnknownRoot(root_label.clone()))?;

        let mut services = BehaviorServices::new(self.config.clone());
        container.init_all(&mut services)?;

        // ── Stack and monitors ────────────────────────────────────────────
        let mut stack = BehaviorStack::from_config(&self.config);
        stack.add_monitor(Box::new(StackCycleMonitor::from_config(&self.config)));
        if self.config.dev_monitors {
            stack.add_monitor(Box::new(StackVizMonitor::new()));
        }
        for monitor in self.monitors {
            stack.add_monitor(monitor);
        }

        if !stack.init_behavior_stack(root, &mut container, &mut services) {
            return Err(SystemError::RootDeclined(root_label));
        }
        info!(root = %root_label, behaviors = container.len(), "BehaviorSystem.Build");

        Ok(BehaviorSystem::new(self.config, container, stack, services, root))
    }
}
