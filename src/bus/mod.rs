// Copyright (c) 2026 cansleuth contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/cansleuth/cansleuth

//! Bus data model - events, message identity, payload values

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// One observed bus message occurrence.
///
/// Immutable once produced; owned by the event source and borrowed by the
/// engine for the duration of a single scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Source bus id.
    pub bus: u8,
    /// Message identifier within the bus (11-bit or 29-bit CAN id).
    pub address: u32,
    /// Monotonic timestamp in nanoseconds.
    pub mono_time: u64,
    /// Raw message payload, compared byte-exact.
    pub payload: Vec<u8>,
}

impl Event {
    /// The (address, bus) channel this event belongs to.
    pub fn identifier(&self) -> MessageIdentifier {
        MessageIdentifier {
            address: self.address,
            bus: self.bus,
        }
    }

    /// The full (address, bus, payload) value of this event.
    pub fn value(&self) -> MessageValue {
        MessageValue {
            address: self.address,
            bus: self.bus,
            payload: self.payload.clone(),
        }
    }
}

/// (address, bus) pair identifying a message channel irrespective of payload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MessageIdentifier {
    /// Message identifier within the bus.
    pub address: u32,
    /// Source bus id.
    pub bus: u8,
}

impl fmt::Display for MessageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}:{}", self.address, self.bus)
    }
}

/// A specific payload observed on a specific message channel.
///
/// Equality requires all three fields equal; payload comparison is
/// byte-exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageValue {
    /// Message identifier within the bus.
    pub address: u32,
    /// Source bus id.
    pub bus: u8,
    /// Raw message payload.
    pub payload: Vec<u8>,
}

impl MessageValue {
    /// The channel this value was observed on.
    pub fn identifier(&self) -> MessageIdentifier {
        MessageIdentifier {
            address: self.address,
            bus: self.bus,
        }
    }
}

/// Ordered, read-only view over a recorded event collection.
///
/// The engine requires only two things from a source: an ordered traversal
/// of its events, and a conversion from relative seconds to the source's
/// monotonic timestamp domain (performed once per scan for the window
/// bounds).
pub trait EventSource {
    /// Events in non-decreasing `mono_time` order.
    fn events(&self) -> &[Event];

    /// Convert a relative time in seconds to the monotonic time domain.
    fn to_mono_time(&self, seconds: f64) -> u64;
}

/// Parse a comma-separated bus list as entered at the boundary.
///
/// Unparseable tokens are ignored with a warning rather than rejected; an
/// empty result means "no bus restriction."
pub fn parse_bus_list(text: &str) -> HashSet<u8> {
    let mut buses = HashSet::new();
    for token in text.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match token.parse::<u8>() {
            Ok(bus) => {
                buses.insert(bus);
            }
            Err(_) => warn!("Ignoring unparseable bus token {:?}", token),
        }
    }
    buses
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_value_equality() {
        let a = MessageValue {
            address: 0x100,
            bus: 0,
            payload: vec![0xde, 0xad],
        };
        let b = MessageValue {
            address: 0x100,
            bus: 0,
            payload: vec![0xde, 0xad],
        };
        let c = MessageValue {
            address: 0x100,
            bus: 0,
            payload: vec![0xde, 0xae],
        };
        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
        assert!(!set.contains(&c));
    }

    #[test]
    fn test_identifier_display() {
        let id = MessageIdentifier {
            address: 0x244,
            bus: 1,
        };
        assert_eq!(id.to_string(), "0x244:1");
    }

    #[test]
    fn test_parse_bus_list() {
        let buses = parse_bus_list("0, 1,2");
        assert_eq!(buses, HashSet::from([0, 1, 2]));

        // bad tokens are dropped, not fatal
        let buses = parse_bus_list("0,abc,,300,2");
        assert_eq!(buses, HashSet::from([0, 2]));

        assert!(parse_bus_list("").is_empty());
    }
}
