//! # Collective Authority
//!
//! A roster is the ordered set of participants entitled to co-sign the next
//! block. Consumers only rely on the [`Authority`] capability so that subsets
//! and other groupings can stand in for a full roster.

use serde::{Deserialize, Serialize};
use shared_types::Address;

/// One participant of a collective authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Where the participant is reached.
    pub address: Address,
    /// Compressed BLS public key.
    pub public_key: Vec<u8>,
}

impl Member {
    pub fn new(address: impl Into<Address>, public_key: Vec<u8>) -> Self {
        Self {
            address: address.into(),
            public_key,
        }
    }
}

/// Ordered, indexable group of members.
pub trait Authority: Send + Sync {
    /// Number of members.
    fn len(&self) -> usize;

    /// Member at position `index`, if any.
    fn member_at(&self, index: usize) -> Option<&Member>;

    /// Returns `true` when the authority has no members.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Members in order.
    fn members(&self) -> Vec<&Member> {
        (0..self.len()).filter_map(|i| self.member_at(i)).collect()
    }
}

/// The fixed roster recorded in a block header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    members: Vec<Member>,
}

impl Roster {
    pub fn new(members: Vec<Member>) -> Self {
        Self { members }
    }

    /// View of this roster without the member at `address`.
    ///
    /// Used by a proposer to reach every other member.
    pub fn excluding(&self, address: &Address) -> RosterView<'_> {
        let indices = self
            .members
            .iter()
            .enumerate()
            .filter(|(_, m)| &m.address != address)
            .map(|(i, _)| i)
            .collect();
        RosterView {
            roster: self,
            indices,
        }
    }

    /// Deterministic byte form hashed into block headers.
    ///
    /// Layout: `count:u32` then, per member, `addr_len:u32 addr key_len:u32 key`
    /// (all integers little endian).
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.members.len() * 64);
        out.extend_from_slice(&(self.members.len() as u32).to_le_bytes());
        for member in &self.members {
            let addr = member.address.as_str().as_bytes();
            out.extend_from_slice(&(addr.len() as u32).to_le_bytes());
            out.extend_from_slice(addr);
            out.extend_from_slice(&(member.public_key.len() as u32).to_le_bytes());
            out.extend_from_slice(&member.public_key);
        }
        out
    }
}

impl Authority for Roster {
    fn len(&self) -> usize {
        self.members.len()
    }

    fn member_at(&self, index: usize) -> Option<&Member> {
        self.members.get(index)
    }
}

impl FromIterator<Member> for Roster {
    fn from_iter<T: IntoIterator<Item = Member>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Borrowed subset of a roster, keeping the roster's order.
#[derive(Debug, Clone)]
pub struct RosterView<'a> {
    roster: &'a Roster,
    indices: Vec<usize>,
}

impl Authority for RosterView<'_> {
    fn len(&self) -> usize {
        self.indices.len()
    }

    fn member_at(&self, index: usize) -> Option<&Member> {
        self.indices
            .get(index)
            .and_then(|&i| self.roster.member_at(i))
    }
}
