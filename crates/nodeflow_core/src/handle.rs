// SPDX-License-Identifier: MIT OR Apache-2.0
//! Opaque integer handles.
//!
//! Every handle is a `u64` newtype assigned monotonically from 1 by its
//! owner (registry or scene). The value 0 is reserved as the invalid handle.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// The reserved invalid handle
            pub const INVALID: Self = Self(0);

            /// Wrap a raw value
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Raw value
            pub const fn value(self) -> u64 {
                self.0
            }

            /// Whether this is not the invalid handle
            pub const fn is_valid(self) -> bool {
                self.0 != 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

handle_type!(
    /// Identifies a registered value type
    TypeHandle
);
handle_type!(
    /// Identifies a registered attribute (port) descriptor
    AttributeDescriptorHandle
);
handle_type!(
    /// Identifies a registered node type
    NodeDescriptorHandle
);
handle_type!(
    /// Identifies a registered event type
    EventTypeHandle
);
handle_type!(
    /// Identifies a live attribute inside one scene
    AttributeHandle
);
handle_type!(
    /// Identifies a live node inside one scene
    NodeHandle
);
handle_type!(
    /// Identifies one event bus subscription
    SubscriptionId
);

/// Monotonic handle source starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HandleCounter(u64);

impl HandleCounter {
    pub(crate) const fn new() -> Self {
        Self(1)
    }

    /// Take the next raw value
    pub(crate) fn next(&mut self) -> u64 {
        let value = self.0;
        self.0 += 1;
        value
    }
}

impl Default for HandleCounter {
    fn default() -> Self {
        Self::new()
    }
}
