//! `bhv-behavior` — the behavior contract and everything a behavior touches.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                          |
//! |----------------|-------------------------------------------------------------------|
//! | [`behavior`]   | `Behavior` trait, `BehaviorSet`, `ActivationState`                |
//! | [`context`]    | `BehaviorContext` (delegation primitives), `ActivationContext`, `StackView` |
//! | [`delegation`] | `DelegationComponent`, `DelegationRequest`, `CallbackTag`, `DelegateOutcome` |
//! | [`container`]  | `BehaviorContainer` arena, `BehaviorResolver`                     |
//! | [`factory`]    | `BehaviorFactory`, `BehaviorConfig` (JSON definitions)            |
//! | [`modifiers`]  | `BehaviorOperationModifiers`                                      |
//! | [`action`]     | `Action` trait, `ActionList`, `WaitAction`                        |
//! | [`events`]     | `AsyncMessageGate`, `RobotEvent`                                  |
//! | [`whiteboard`] | `Whiteboard`, `RobotFacts`                                        |
//! | [`services`]   | `BehaviorServices` — clock, whiteboard, delegation, actions, events |
//! | [`wait`]       | `BehaviorWait`                                                    |
//! | [`dispatch`]   | `DispatcherPassThrough`, `DispatcherRandom`                       |
//! | [`error`]      | `BehaviorError`, `BehaviorResult<T>`                              |
//!
//! # Design notes
//!
//! Each tick the stack walks its behaviors bottom to top in two phases per
//! behavior:
//!
//! 1. **Hook phase**: the container checks the behavior out of its slot and
//!    runs the hook with a `BehaviorContext`.  Delegation calls validate
//!    against the stack as it stands and queue a `DelegationRequest`.
//!
//! 2. **Apply phase**: the stack drains the request queue (pushes, pops,
//!    scope changes) before moving on to the next behavior.
//!
//! No hook ever observes the stack half-mutated, and no completion callback
//! runs in the middle of a mutation: callbacks are delivered at the start of
//! the delegator's next update.

pub mod action;
pub mod behavior;
pub mod container;
pub mod context;
pub mod delegation;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod factory;
pub mod modifiers;
pub mod services;
pub mod wait;
pub mod whiteboard;


pub use action::{Action, ActionList, ActionResult, ActionStatus, CompletedAction, WaitAction};
pub use behavior::{ActivationState, AsAny, Behavior, BehaviorSet};
pub use container::{BehaviorContainer, BehaviorResolver, BehaviorSlot};
pub use context::{ActivationContext, BehaviorContext, EmptyStack, StackView};
pub use delegation::{
    CallbackTag, Delegate, DelegateOutcome, DelegationComponent, DelegationRecord, DelegationRequest,
};
pub use dispatch::{DispatcherPassThrough, DispatcherRandom};
pub use error::{BehaviorError, BehaviorResult};
pub use events::{AsyncMessageGate, BehaviorEventBuffer, RobotEvent, MOVE_TO_STATE_EVENT};
pub use factory::{BehaviorConfig, BehaviorCtor, BehaviorFactory, CreatedBehavior};
pub use modifiers::{BehaviorOperationModifiers, CubeConnectionRequirements};
pub use services::{BehaviorServices, VisionModeTally};
pub use wait::BehaviorWait;
pub use whiteboard::{RobotFacts, Whiteboard};
