//! System observer trait for tracing, tests, and audio forwarding.

use bhv_behavior::BehaviorContainer;
use bhv_core::Tick;
use bhv_stack::{AudioBranchEvent, BehaviorStack};

/// Callbacks invoked by [`BehaviorSystem::update`][crate::BehaviorSystem::update].
///
/// All methods have default no-op implementations.
///
/// # Example — printing the active chain
///
/// ```rust,ignore
/// struct PrintStack;
///
/// impl SystemObserver for PrintStack {
///     fn on_tick_end(&mut self, tick: Tick, stack: &BehaviorStack, container: &BehaviorContainer) {
///         println!("{tick}: {}", stack.stack_to_behavior_string(container));
///     }
/// }
/// ```
pub trait SystemObserver {
    /// Called after the clock advanced, before anything is ticked.
    fn on_tick_start(&mut self, _tick: Tick) {}

    /// Called for every push and pop of the tick, in order.  This is the
    /// sink the robot's audio layer listens on.
    fn on_audio_event(&mut self, _event: &AudioBranchEvent) {}

    /// Called once the stack update for `tick` is complete.
    fn on_tick_end(&mut self, _tick: Tick, _stack: &BehaviorStack, _container: &BehaviorContainer) {}
}

/// A [`SystemObserver`] that does nothing.
pub struct NoopObserver;

impl SystemObserver for NoopObserver {}
