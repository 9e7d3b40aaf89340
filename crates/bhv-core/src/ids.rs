//! Strongly typed, zero-cost handle wrappers.
//!
//! Behaviors live in an arena owned by the behavior container; everything
//! else (the stack, metadata maps, delegation records) refers to them through
//! a `BehaviorId`.  A handle to a behavior that is not in the container is
//! simply absent at lookup, never dangling.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generate a typed handle wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty) = invalid $invalid:expr;) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid handle".
            pub const INVALID: $name = $name($invalid);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            #[inline(always)]
            pub fn is_valid(self) -> bool {
                self != Self::INVALID
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized handles are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Index of a behavior in the behavior container's arena.
    pub struct BehaviorId(u32) = invalid u32::MAX;
}

typed_id! {
    /// Handle of a named state inside one state machine.  `0` is reserved as
    /// the invalid state so that IDs handed out at parse time start at 1.
    pub struct StateId(u32) = invalid 0;
}

typed_id! {
    /// Handle of an action queued on the robot's action list.
    pub struct ActionTag(u32) = invalid u32::MAX;
}
