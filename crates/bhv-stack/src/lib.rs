//! `bhv-stack` — the active behavior stack.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                            |
//! |--------------|---------------------------------------------------------------------|
//! | [`stack`]    | `BehaviorStack`: init, clear, per-tick update, push, pop            |
//! | [`apply`]    | Draining `DelegationRequest`s into pushes and pops                  |
//! | [`metadata`] | `StackMetadataEntry`, `recursively_gather_linked_behaviors`         |
//! | [`monitor`]  | `StackMonitor` trait, `NoopMonitor`                                 |
//! | [`cycle`]    | `StackCycleMonitor`                                                 |
//! | [`viz`]      | `StackVizMonitor`                                                   |
//! | [`debug`]    | `StackDebugTree`, `"A/B/C"` strings, log dumps                      |
//! | [`audio`]    | `AudioBranchEvent`, `BehaviorStackState`                            |
//! | [`error`]    | `StackError`, `StackResult<T>`                                      |
//!
//! # Activatable scope
//!
//! Every stack entry holds its delegates and the behaviors linked to them in
//! scope.  A behavior's in-scope count in the container is the number of
//! entries naming it; `on_entered_activatable_scope` fires on the 0 → 1
//! edge and `on_left_activatable_scope` on the 1 → 0 edge, so a behavior
//! named by several entries sees exactly one enter and one leave.

pub mod apply;
pub mod audio;
pub mod cycle;
pub mod debug;
pub mod error;
pub mod metadata;
pub mod monitor;
pub mod stack;
pub mod viz;

#[cfg(test)]
mod tests;

pub use audio::{AudioBranchEvent, BehaviorStackState};
pub use cycle::StackCycleMonitor;
pub use debug::{StackDebugTree, TreeRelationship};
pub use error::{StackError, StackResult};
pub use metadata::{recursively_gather_linked_behaviors, StackMetadataEntry};
pub use monitor::{NoopMonitor, StackMonitor};
pub use stack::BehaviorStack;
pub use viz::StackVizMonitor;
