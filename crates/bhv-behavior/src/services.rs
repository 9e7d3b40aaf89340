//! Robot-side services every behavior reaches through its context.

use rustc_hash::FxHashMap;

use bhv_core::{RobotClock, SystemConfig};

use crate::{ActionList, AsyncMessageGate, BehaviorEventBuffer, DelegationComponent, Whiteboard};

/// Reference counts of requested vision modes.
///
/// Behaviors request modes through their operation modifiers; the container
/// adds and removes requests as behaviors enter and leave scope.
#[derive(Debug, Default)]
pub struct VisionModeTally {
    counts: FxHashMap<String, u32>,
}

impl VisionModeTally {
    pub fn request<'a>(&mut self, modes: impl IntoIterator<Item = &'a String>) {
        for mode in modes {
            *self.counts.entry(mode.clone()).or_insert(0) += 1;
        }
    }

    pub fn release<'a>(&mut self, modes: impl IntoIterator<Item = &'a String>) {
        for mode in modes {
            if let Some(n) = self.counts.get_mut(mode) {
                *n -= 1;
                if *n == 0 {
                    self.counts.remove(mode);
                }
            }
        }
    }

    pub fn is_requested(&self, mode: &str) -> bool {
        self.counts.contains_key(mode)
    }
}

/// Everything outside the behavior tree that behaviors read or drive.
///
/// Owned by the behavior system and lent mutably to one hook at a time.
#[derive(Debug)]
pub struct BehaviorServices {
    pub config:       SystemConfig,
    pub clock:        RobotClock,
    pub whiteboard:   Whiteboard,
    pub delegation:   DelegationComponent,
    pub actions:      ActionList,
    pub message_gate: AsyncMessageGate,
    /// Events and action completions for the behavior currently being ticked.
    pub event_buffer: BehaviorEventBuffer,
    pub vision_modes: VisionModeTally,
}

impl BehaviorServices {
    pub fn new(config: SystemConfig) -> Self {
        let clock = config.make_clock();
        Self {
            config,
            clock,
            whiteboard:   Whiteboard::new(),
            delegation:   DelegationComponent::new(),
            actions:      ActionList::new(),
            message_gate: AsyncMessageGate::new(),
            event_buffer: BehaviorEventBuffer::default(),
            vision_modes: VisionModeTally::default(),
        }
    }
}

impl Default for BehaviorServices {
    fn default() -> Self {
        Self::new(SystemConfig::default())
    }
}
