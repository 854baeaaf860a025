// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Remote reader attributes received through discovery (SEDP).

use std::net::SocketAddr;

use crate::core::guid::GUID;

/// Reliability kind of the matched reader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ReliabilityKind {
    /// Fire-and-forget (no ACKNACK, no retransmission, no timers)
    #[default]
    BestEffort,
    /// ACKNACK-driven retransmission
    Reliable,
}

/// Attributes of a matched remote reader.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ReaderAttributes {
    pub guid: GUID,
    pub unicast_locators: Vec<SocketAddr>,
    pub multicast_locators: Vec<SocketAddr>,
    pub reliability: ReliabilityKind,
    pub expects_inline_qos: bool,
}

impl ReaderAttributes {
    /// Attributes with no locators.
    pub fn new(guid: GUID, reliability: ReliabilityKind) -> Self {
        Self {
            guid,
            reliability,
            ..Self::default()
        }
    }

    /// Add a unicast locator (fluent builder style).
    #[must_use]
    pub fn with_unicast_locator(mut self, addr: SocketAddr) -> Self {
        self.unicast_locators.push(addr);
        self
    }

    /// Add a multicast locator (fluent builder style).
    #[must_use]
    pub fn with_multicast_locator(mut self, addr: SocketAddr) -> Self {
        self.multicast_locators.push(addr);
        self
    }

    /// Set whether the reader expects inline QoS (fluent builder style).
    #[must_use]
    pub fn with_expects_inline_qos(mut self, expects: bool) -> Self {
        self.expects_inline_qos = expects;
        self
    }

    /// Locators to send to: unicast first, then multicast.
    pub fn remote_locators(&self) -> Vec<SocketAddr> {
        self.unicast_locators
            .iter()
            .chain(self.multicast_locators.iter())
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_remote_locators_order() {
        let uc = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)), 7411);
        let mc = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(239, 255, 0, 1)), 7401);
        let attrs = ReaderAttributes::new(GUID::new([1; 12], [0, 0, 1, 7]), ReliabilityKind::Reliable)
            .with_multicast_locator(mc)
            .with_unicast_locator(uc);
        assert_eq!(attrs.remote_locators(), vec![uc, mc]);
    }
}
