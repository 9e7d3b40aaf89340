//! `bhv-core` — foundational types for the behavior system.
//!
//! This crate is a dependency of every other `bhv-*` crate.  It has no
//! `bhv-*` dependencies and only a handful of external ones (`rand`, `serde`,
//! `thiserror`, `tracing`).
//!
//! # What lives here
//!
//! | Module     | Contents                                                   |
//! |------------|------------------------------------------------------------|
//! | [`ids`]    | `BehaviorId`, `StateId`, `ActionTag`                       |
//! | [`time`]   | `Tick`, `RobotClock`, `SystemConfig`                       |
//! | [`rng`]    | `BehaviorRng` (per-behavior, deterministic)                |
//! | [`verify`] | `verify!` — log-and-refuse contract checks                 |
//! | [`error`]  | `BhvError`, `BhvResult`                                    |
//!
//! # Feature flags
//!
//! | Flag            | Effect                                                  |
//! |-----------------|---------------------------------------------------------|
//! | `strict-verify` | `verify!` panics on failure instead of only logging.    |

pub mod error;
pub mod ids;
pub mod rng;
pub mod time;
pub mod verify;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{BhvError, BhvResult};
pub use ids::{ActionTag, BehaviorId, StateId};
pub use rng::BehaviorRng;
pub use time::{RobotClock, SystemConfig, Tick};

#[doc(hidden)]
pub use tracing as __tracing;
