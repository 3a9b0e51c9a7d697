use crate::errors::{DKGError, DKGResult};
use serde::{Deserialize, Serialize};
use threshold_ec::{group::Curve, poly::Idx};

/// The minimum safe threshold for `n` participants, `ceil((n + 1) / 2)`.
/// Setting a lower value breaks the security assumptions of the scheme;
/// setting a higher one only makes the secret harder to reconstruct.
pub fn minimum_threshold(n: usize) -> usize {
    (n / 2 + 1).max(2)
}

/// Node is a participant in the DKG protocol. In a DKG protocol, each
/// participant must be identified both by an index and a public key. At the end
/// of the protocol, if successful, the index is used to verify the validity of
/// the share this node holds.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Debug)]
pub struct Node<C: Curve>(Idx, C::Point);

impl<C: Curve> Node<C> {
    pub fn new(index: Idx, public: C::Point) -> Self {
        Self(index, public)
    }

    /// Returns the node's index
    pub fn id(&self) -> Idx {
        self.0
    }

    /// Returns the node's public key
    pub fn key(&self) -> &C::Point {
        &self.1
    }
}

/// A Group is a collection of Nodes with an associated threshold. A DKG
/// takes in a group at the beginning of the protocol and outputs a share
/// whose index is the holder's position in the group. When creating a group
/// using the `From` impl, the threshold is set to `minimum_threshold()`.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Debug)]
pub struct Group<C: Curve> {
    /// The vector of nodes in the group
    pub nodes: Vec<Node<C>>,
    /// The number of shares required to reconstruct the secret
    pub threshold: usize,
}

impl<C> Group<C>
where
    C: Curve,
{
    /// Creates a new group from the provided vector of nodes and threshold.
    ///
    /// Valid thresholds are in `[2, nodes.len()]`. Duplicate public keys are
    /// rejected.
    pub fn new(nodes: Vec<Node<C>>, threshold: usize) -> DKGResult<Group<C>> {
        let maximum = nodes.len();

        if threshold < 2 || threshold > maximum {
            return Err(DKGError::InvalidThreshold(threshold, 2, maximum));
        }

        for (i, node) in nodes.iter().enumerate() {
            if nodes[..i].iter().any(|other| other.key() == node.key()) {
                return Err(DKGError::DuplicatePublicKey(node.id()));
            }
        }

        Ok(Self { nodes, threshold })
    }

    /// Returns the number of nodes in the group
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Checks if the group is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Gets the index of the node corresponding to the provided public key
    pub fn index(&self, public: &C::Point) -> Option<Idx> {
        self.nodes.iter().find(|n| &n.1 == public).map(|n| n.0)
    }

    /// Gets the public key of the node at the provided index
    pub fn key(&self, idx: Idx) -> Option<&C::Point> {
        self.nodes.iter().find(|n| n.0 == idx).map(|n| &n.1)
    }

    pub fn contains_index(&self, idx: Idx) -> bool {
        self.nodes.iter().any(|n| n.0 == idx)
    }

    /// Returns the public keys of the group in index order
    pub fn points(&self) -> Vec<C::Point> {
        self.nodes.iter().map(|n| n.1.clone()).collect()
    }
}

impl<C> TryFrom<Vec<C::Point>> for Group<C>
where
    C: Curve,
{
    type Error = DKGError;

    fn try_from(list: Vec<C::Point>) -> DKGResult<Self> {
        let thr = minimum_threshold(list.len());

        let nodes = list
            .into_iter()
            .enumerate()
            .map(|(i, public)| Node::new(i as Idx, public))
            .collect();

        Self::new(nodes, thr)
    }
}
