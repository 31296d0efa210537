//! # Consensus Chains
//!
//! A chain is the ordered list of authority-transition proofs linking a
//! trusted anchor block to a target block. Chains are derived from stored
//! blocks on demand and never persisted.

use serde::{Deserialize, Serialize};
use shared_types::Digest;

use super::block::BlockHeader;
use super::roster::Roster;

/// One authority-transition proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Block the verifier already trusts.
    pub from: Digest,
    /// Block this link proves.
    pub to: Digest,
    /// Header of `to`; tells the verifier the next authority.
    pub header: BlockHeader,
    /// Roster that produced `signature`.
    pub authority: Roster,
    /// Aggregate signature over `to`.
    pub signature: Vec<u8>,
}

/// Ordered links from an anchor to a target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    links: Vec<Link>,
}

impl Chain {
    pub fn new(links: Vec<Link>) -> Self {
        Self { links }
    }

    pub fn push(&mut self, link: Link) {
        self.links.push(link);
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Target of the final link.
    pub fn target(&self) -> Option<&Digest> {
        self.links.last().map(|l| &l.to)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Link> {
        self.links.iter()
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Link;
    type IntoIter = std::slice::Iter<'a, Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}
