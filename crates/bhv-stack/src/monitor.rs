//! Stack monitor trait for debugging, visualization, and sanity checks.

use bhv_behavior::{AsAny, BehaviorContainer};
use bhv_core::RobotClock;

use crate::BehaviorStack;

/// Notified at most once per tick, at the end of a stack update in which the
/// stack changed.
///
/// # Example — logging every change
///
/// ```rust,ignore
/// struct PrintStack;
///
/// impl StackMonitor for PrintStack {
///     fn notify_of_change(&mut self, stack: &BehaviorStack, container: &BehaviorContainer, clock: &RobotClock) {
///         println!("{clock}: {}", stack.stack_to_behavior_string(container));
///     }
/// }
/// ```
pub trait StackMonitor: AsAny {
    fn notify_of_change(&mut self, stack: &BehaviorStack, container: &BehaviorContainer, clock: &RobotClock);
}

/// A [`StackMonitor`] that does nothing.
pub struct NoopMonitor;

impl StackMonitor for NoopMonitor {
    fn notify_of_change(&mut self, _: &BehaviorStack, _: &BehaviorContainer, _: &RobotClock) {}
}
