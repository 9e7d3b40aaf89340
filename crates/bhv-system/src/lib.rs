//! `bhv-system` — the tick scheduler for the behavior framework.
//!
//! # One robot tick
//!
//! ```text
//! BehaviorSystem::update():
//!   ① Clock    — advance one tick.
//!   ② Actions  — update running actions; each completion resolves the
//!                delegation waiting on it and queues its callback.
//!   ③ Stack    — update_behavior_stack: tick each active behavior root
//!                first, applying its delegation requests before the next.
//!   ④ Flush    — drop undelivered events, forward audio branch events.
//! ```
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use bhv_core::SystemConfig;
//! use bhv_system::{load_behaviors_dir, NoopObserver, SystemBuilder};
//!
//! let mut system = SystemBuilder::new(SystemConfig::default())
//!     .behaviors(load_behaviors_dir(Path::new("behaviors"))?)
//!     .root("HighLevelAI")
//!     .build()?;
//! system.run_ticks(1_000, &mut NoopObserver);
//! ```

pub mod builder;
pub mod error;
pub mod loader;
pub mod observer;
pub mod system;

#[cfg(test)]
mod tests;

pub use builder::{default_factory, SystemBuilder, NATIVE_CLASS};
pub use error::{SystemError, SystemResult};
pub use loader::{load_behaviors_dir, load_behaviors_file, load_behaviors_reader};
pub use observer::{NoopObserver, SystemObserver};
pub use system::BehaviorSystem;
