//! Distributed key generation.
//!
//! Every participant plays dealer for a secret of its own while verifying
//! every other dealer's deal, running one VSS instance per dealer in
//! parallel. Once enough deals are certified, each node sums the shares it
//! received from the qualified dealers into its share of a group secret that
//! no single party ever learns.
//!
//! The resharing variant refreshes the shares of an existing distributed
//! key, optionally handing them to a new committee, without changing the
//! group public key: each old node redeals its current share, and the new
//! nodes recover their share and the new public polynomial by Lagrange
//! interpolation across the certified deals.

mod types;

pub use types::{DistDeal, DistJustification, DistKeyShare, DistResponse};

use crate::errors::{DKGError, DKGResult};
use crate::group::Group;
use crate::vss::{Aggregator, Dealer, Status, StatusCode, Verifier};
use rand_core::RngCore;
use std::collections::{btree_map::Entry, BTreeMap};
use threshold_ec::{
    group::{Curve, Element},
    poly::{Eval, Idx, Poly, PublicPoly},
    schnorr,
};
use zeroize::Zeroize;

/// DistKeyGenerator drives one node through a DKG round: dealing (when the
/// node is part of the dealing group), verifying every dealer's deal, and
/// assembling the final share.
///
/// All methods must be called from a single thread; the generator performs
/// no internal synchronization and no I/O.
#[derive(Debug)]
pub struct DistKeyGenerator<C: Curve> {
    /// Long-term private key of this node
    long: C::Scalar,
    /// Long-term public key of this node
    public: C::Point,
    /// The distributed public polynomial of the previous round, known when
    /// resharing
    dpub: Option<PublicPoly<C>>,
    /// Our VSS dealer, present when this node issues deals
    dealer: Option<Dealer<C>>,
    /// One verifier per dealer, keyed by dealer index. Only populated when
    /// this node belongs to the receiving group.
    verifiers: BTreeMap<Idx, Verifier<C>>,
    /// Response trackers for nodes which deal but do not receive, keyed by
    /// dealer index
    old_aggregators: BTreeMap<Idx, Aggregator<C>>,
    /// Our index in the dealing group, if present
    oidx: Option<Idx>,
    /// Our index in the receiving group, if present
    nidx: Option<Idx>,
    /// The dealing group. Identical to `new_group` in a fresh run.
    old_group: Group<C>,
    /// The receiving group
    new_group: Group<C>,
    is_resharing: bool,
    /// Whether our own deal has been processed locally
    processed: bool,
}

impl<C: Curve> DistKeyGenerator<C> {
    /// Starts a fresh DKG among the given group. The node's secret
    /// contribution is drawn from the RNG; the group's threshold becomes the
    /// threshold of the final distributed key.
    pub fn new<R: RngCore>(
        longterm: C::Scalar,
        group: Group<C>,
        rng: &mut R,
    ) -> DKGResult<Self> {
        let secret = C::Scalar::rand(rng);
        Self::init(longterm, group.clone(), group, Some(secret), None, false, rng)
    }

    /// Starts a resharing round for a node holding a share of the previous
    /// distribution. `old_group` must be the previous committee with its
    /// threshold, `new_group` the receiving committee with the new one.
    pub fn new_resharing_from_share<R: RngCore>(
        longterm: C::Scalar,
        old_group: Group<C>,
        new_group: Group<C>,
        share: &DistKeyShare<C>,
        rng: &mut R,
    ) -> DKGResult<Self> {
        Self::init(
            longterm,
            old_group,
            new_group,
            Some(share.share.value.clone()),
            Some(share.commits.clone()),
            true,
            rng,
        )
    }

    /// Starts a resharing round for a node joining the committee without a
    /// previous share. The distributed public polynomial of the previous
    /// round must be provided.
    pub fn new_resharing_member<R: RngCore>(
        longterm: C::Scalar,
        old_group: Group<C>,
        new_group: Group<C>,
        public_coeffs: PublicPoly<C>,
        rng: &mut R,
    ) -> DKGResult<Self> {
        Self::init(
            longterm,
            old_group,
            new_group,
            None,
            Some(public_coeffs),
            true,
            rng,
        )
    }

    fn init<R: RngCore>(
        longterm: C::Scalar,
        old_group: Group<C>,
        new_group: Group<C>,
        secret: Option<C::Scalar>,
        dpub: Option<PublicPoly<C>>,
        is_resharing: bool,
        rng: &mut R,
    ) -> DKGResult<Self> {
        let mut public = C::Point::one();
        public.mul(&longterm);

        let oidx = old_group.index(&public);
        let nidx = new_group.index(&public);
        if oidx.is_none() && nidx.is_none() {
            return Err(DKGError::PublicKeyNotFound);
        }
        if is_resharing && old_group.is_empty() {
            return Err(DKGError::EmptyOldGroup);
        }
        if is_resharing && nidx.is_some() && dpub.is_none() {
            return Err(DKGError::MissingPublicPolynomial);
        }

        // a node deals only when it belongs to the dealing group and, in a
        // resharing, holds a previous share
        let dealer = match (oidx, secret) {
            (Some(_), Some(secret)) => Some(Dealer::new(
                longterm.clone(),
                secret,
                new_group.points(),
                new_group.threshold,
                rng,
            )?),
            _ => None,
        };

        // one verifier per dealer, only when we can receive
        let verifiers = if nidx.is_some() {
            old_group
                .nodes
                .iter()
                .map(|node| {
                    let verifier = Verifier::new(
                        longterm.clone(),
                        node.key().clone(),
                        new_group.points(),
                    )?;
                    Ok((node.id(), verifier))
                })
                .collect::<DKGResult<BTreeMap<_, _>>>()?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            long: longterm,
            public,
            dpub,
            dealer,
            verifiers,
            old_aggregators: BTreeMap::new(),
            oidx,
            nidx,
            old_group,
            new_group,
            is_resharing,
            processed: false,
        })
    }

    /// Whether this node issues deals in this round
    pub fn can_issue(&self) -> bool {
        self.dealer.is_some()
    }

    /// Whether this node receives a share in this round
    pub fn can_receive(&self) -> bool {
        self.nidx.is_some()
    }

    /// This node's long-term public key
    pub fn public_key(&self) -> &C::Point {
        &self.public
    }

    /// Produces one signed deal per receiving node, keyed by its index in
    /// the receiving group.
    ///
    /// In a fresh run, our own deal is processed locally and not returned.
    /// In a resharing, it is returned like any other so that old-group
    /// members can observe our response and certify our deal.
    pub fn deals<R: RngCore>(&mut self, rng: &mut R) -> DKGResult<BTreeMap<Idx, DistDeal<C>>> {
        let oidx = match (&self.dealer, self.oidx) {
            (Some(_), Some(oidx)) => oidx,
            _ => return Err(DKGError::NotDealer),
        };

        let encrypted = self
            .dealer
            .as_ref()
            .expect("checked above")
            .encrypt_deals(rng)?;

        let mut deals = BTreeMap::new();
        for (i, encrypted_deal) in encrypted.into_iter().enumerate() {
            let i = i as Idx;

            let mut dd = DistDeal {
                index: oidx,
                encrypted_deal,
                signature: Vec::new(),
            };
            dd.signature = schnorr::sign::<C, _>(&self.long, &dd.hash(), rng);

            if !self.is_resharing && Some(i) == self.nidx {
                if self.processed {
                    continue;
                }
                self.processed = true;

                // our own deal never travels: process it on the spot.
                // anything but an approval here is an internal fault.
                let response = self
                    .verifiers
                    .get_mut(&oidx)
                    .expect("a fresh dealer is always a share holder")
                    .process_encrypted_deal(&dd.encrypted_deal, rng)?;
                if response.status != Status::Approval {
                    return Err(DKGError::SelfDealComplaint(response.status_code));
                }
                self.dealer
                    .as_mut()
                    .expect("checked above")
                    .process_response(&response, rng)?;
                continue;
            }

            deals.insert(i, dd);
        }

        Ok(deals)
    }

    /// Verifies and processes one dealer's deal, returning the signed
    /// response to broadcast to every participant.
    pub fn process_deal<R: RngCore>(
        &mut self,
        dd: &DistDeal<C>,
        rng: &mut R,
    ) -> DKGResult<DistResponse> {
        if self.nidx.is_none() {
            return Err(DKGError::NotShareHolder);
        }

        // dealers live in the old group (identical to the new one in a
        // fresh run)
        let dealer_pub = self
            .old_group
            .key(dd.index)
            .ok_or(DKGError::UnknownDealer(dd.index))?;
        schnorr::verify::<C>(dealer_pub, &dd.hash(), &dd.signature)?;

        // when resharing, the dealer's constant term must equal its share
        // of the previous distributed polynomial
        let expected_commit = if self.is_resharing {
            let dpub = self
                .dpub
                .as_ref()
                .expect("a resharing share holder knows the distributed polynomial");
            Some(dpub.eval(dd.index).value)
        } else {
            None
        };

        let is_resharing = self.is_resharing;
        let verifier = self
            .verifiers
            .get_mut(&dd.index)
            .ok_or(DKGError::UnknownDealer(dd.index))?;

        let mut response = verifier.process_encrypted_deal(&dd.encrypted_deal, rng)?;

        if let (Some(expected), true) = (expected_commit, response.status == Status::Approval) {
            let commit = verifier
                .commits()
                .expect("an approved deal is pinned")
                .public_key()
                .clone();
            if commit != expected {
                // the share is consistent with the deal's own commitments
                // but not with the distributed key being reshared
                response =
                    verifier.replace_with_complaint(StatusCode::ShareDoesNotVerify, rng)?;
            }
        }

        if !is_resharing {
            // dealers never broadcast a response for their own deal in a
            // fresh run: record their approval preemptively
            verifier
                .aggregator_mut()
                .set_response_unchecked(dd.index, Status::Approval);
        }

        Ok(DistResponse {
            index: dd.index,
            response,
        })
    }

    /// Processes another participant's response about the deal of the
    /// dealer at `response.index`. A complaint about our own deal is
    /// answered immediately with a justification to broadcast.
    pub fn process_response<R: RngCore>(
        &mut self,
        response: &DistResponse,
        rng: &mut R,
    ) -> DKGResult<Option<DistJustification<C>>> {
        if self.is_resharing && self.can_issue() && !self.can_receive() {
            return self.process_resharing_response(response, rng);
        }

        let verifier = self
            .verifiers
            .get_mut(&response.index)
            .ok_or(DKGError::UnknownDealer(response.index))?;
        verifier.process_response(&response.response)?;

        if response.response.status == Status::Approval {
            return Ok(None);
        }

        let justification = match (self.oidx, self.dealer.as_mut()) {
            (Some(oidx), Some(dealer)) if oidx == response.index => {
                dealer.process_response(&response.response, rng)?
            }
            _ => None,
        };

        let Some(justification) = justification else {
            return Ok(None);
        };

        // our own verifier replays the justification right away
        self.verifiers
            .get_mut(&response.index)
            .expect("looked up above")
            .process_justification(&justification)?;

        Ok(Some(DistJustification {
            index: response.index,
            justification,
        }))
    }

    /// Response handling for a node which deals but does not receive: the
    /// responses are tracked per dealer in plain aggregators, and only
    /// complaints about our own deal produce a justification.
    fn process_resharing_response<R: RngCore>(
        &mut self,
        response: &DistResponse,
        rng: &mut R,
    ) -> DKGResult<Option<DistJustification<C>>> {
        let aggregator = match self.old_aggregators.entry(response.index) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let dealer_pub = self
                    .old_group
                    .key(response.index)
                    .ok_or(DKGError::UnknownDealer(response.index))?
                    .clone();
                entry.insert(Aggregator::new(
                    dealer_pub,
                    self.new_group.points(),
                    self.new_group.threshold,
                    Vec::new(),
                ))
            }
        };
        aggregator.verify_response(&response.response)?;

        if response.response.status == Status::Approval || Some(response.index) != self.oidx {
            return Ok(None);
        }

        let justification = self
            .dealer
            .as_mut()
            .expect("an old-group dealer holds a dealer")
            .process_response(&response.response, rng)?
            .expect("a complaint is always justified");

        Ok(Some(DistJustification {
            index: response.index,
            justification,
        }))
    }

    /// Forwards a dealer's justification to the corresponding verifier. An
    /// error means the replayed deal was invalid and the dealer is now
    /// marked bad.
    pub fn process_justification(&mut self, dj: &DistJustification<C>) -> DKGResult<()> {
        if self.is_resharing && self.nidx.is_none() {
            let aggregator = self
                .old_aggregators
                .get_mut(&dj.index)
                .ok_or(DKGError::UnknownDealer(dj.index))?;
            aggregator.process_justification(&dj.justification)?;
            return Ok(());
        }

        let verifier = self
            .verifiers
            .get_mut(&dj.index)
            .ok_or(DKGError::UnknownDealer(dj.index))?;
        verifier.process_justification(&dj.justification)?;
        Ok(())
    }

    /// Declares the end of the response period for every dealer's run.
    /// Idempotent and irreversible.
    pub fn set_timeout(&mut self) {
        if let Some(dealer) = self.dealer.as_mut() {
            dealer.set_timeout();
        }
        for verifier in self.verifiers.values_mut() {
            verifier.set_timeout();
        }
        for aggregator in self.old_aggregators.values_mut() {
            aggregator.set_timeout();
        }
    }

    fn uses_old_aggregators(&self) -> bool {
        self.is_resharing && self.can_issue() && !self.can_receive()
    }

    /// The set of dealer indices whose deals are certified
    pub fn qual(&self) -> Vec<Idx> {
        if self.uses_old_aggregators() {
            self.old_aggregators
                .iter()
                .filter(|(_, a)| a.deal_certified())
                .map(|(&i, _)| i)
                .collect()
        } else {
            self.verifiers
                .iter()
                .filter(|(_, v)| v.deal_certified())
                .map(|(&i, _)| i)
                .collect()
        }
    }

    fn required_threshold(&self) -> usize {
        if self.is_resharing {
            self.old_group.threshold
        } else {
            self.new_group.threshold
        }
    }

    /// Whether enough deals are certified for the distributed key to exist
    pub fn threshold_certified(&self) -> bool {
        self.qual().len() >= self.required_threshold()
    }

    /// Like [`threshold_certified`](Self::threshold_certified), but also
    /// requires that no qualified dealer's run is missing a response.
    pub fn certified(&self) -> bool {
        let good = if self.uses_old_aggregators() {
            self.old_aggregators
                .values()
                .filter(|a| a.deal_certified() && a.absent() == 0)
                .count()
        } else {
            self.verifiers
                .values()
                .filter(|v| v.deal_certified() && v.aggregator().absent() == 0)
                .count()
        };
        good >= self.required_threshold()
    }

    /// Assembles the distributed key share once enough deals are certified.
    pub fn dist_key_share(&self) -> DKGResult<DistKeyShare<C>> {
        if self.is_resharing {
            self.resharing_key()
        } else {
            self.dkg_key()
        }
    }

    fn dkg_key(&self) -> DKGResult<DistKeyShare<C>> {
        let nidx = self.nidx.ok_or(DKGError::NotShareHolder)?;
        let qual = self.qual();
        let threshold = self.new_group.threshold;
        if qual.len() < threshold {
            return Err(DKGError::NotCertified(qual.len(), threshold));
        }

        // the final share is the sum of the shares received from the
        // qualified dealers; the group commitment polynomial is the sum of
        // their commitment polynomials
        let mut share_value = C::Scalar::new();
        let mut commits: Option<PublicPoly<C>> = None;
        for &i in &qual {
            let deal = self.verifiers[&i].deal()?;
            share_value.add(&deal.sec_share.value);
            match commits.as_mut() {
                None => commits = Some(deal.commits),
                Some(c) => c.add(&deal.commits),
            }
        }

        Ok(DistKeyShare {
            commits: commits.expect("qual is non-empty"),
            share: Eval {
                index: nidx,
                value: share_value,
            },
            coefficients: self.dealer.as_ref().map(|d| d.private_poly().clone()),
        })
    }

    fn resharing_key(&self) -> DKGResult<DistKeyShare<C>> {
        let nidx = self.nidx.ok_or(DKGError::NotShareHolder)?;
        let qual = self.qual();
        let old_threshold = self.old_group.threshold;
        if qual.len() < old_threshold {
            return Err(DKGError::NotCertified(qual.len(), old_threshold));
        }

        let mut share_evals = Vec::with_capacity(qual.len());
        let mut deals = Vec::with_capacity(qual.len());
        for &i in &qual {
            let deal = self.verifiers[&i].deal()?;
            share_evals.push(Eval {
                index: i,
                value: deal.sec_share.value.clone(),
            });
            deals.push((i, deal));
        }

        // dealer i dealt us an evaluation at i of the column polynomial, so
        // our new share is the interpolation at zero
        let share_value = Poly::<C::Scalar>::recover(old_threshold, share_evals)?;

        // the new public polynomial is recovered coefficient-wise: dealer
        // i's k-th commitment is an evaluation at i of the k-th coefficient
        let commits = (0..self.new_group.threshold)
            .map(|k| {
                let evals = deals
                    .iter()
                    .map(|(i, deal)| Eval {
                        index: *i,
                        value: deal.commits.get(k as Idx),
                    })
                    .collect();
                Poly::<C::Point>::recover(old_threshold, evals)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let commits = PublicPoly::<C>::from(commits);

        // the recovered share must lie on the recovered polynomial
        let mut expected = C::Point::one();
        expected.mul(&share_value);
        if commits.eval(nidx).value != expected {
            return Err(DKGError::PublicShareMismatch);
        }

        Ok(DistKeyShare {
            commits,
            share: Eval {
                index: nidx,
                value: share_value,
            },
            coefficients: self.dealer.as_ref().map(|d| d.private_poly().clone()),
        })
    }
}

impl<C: Curve> Drop for DistKeyGenerator<C> {
    fn drop(&mut self) {
        self.long.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Node;
    use crate::vss::{self, Deal, EncryptedDeal, Justification, StatusCode};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use threshold_ec::{
        curve::secp256k1::Secp256k1,
        dh, elgamal,
        group::{new_key_pair, Encodable},
        poly::PrivatePoly,
        schnorr,
    };

    type C = Secp256k1;
    type Scalar = <C as Curve>::Scalar;
    type Point = <C as Curve>::Point;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(0xd46)
    }

    fn setup(
        n: usize,
        t: usize,
        rng: &mut ChaCha20Rng,
    ) -> (Vec<Scalar>, Group<C>, Vec<DistKeyGenerator<C>>) {
        let (longterms, points): (Vec<_>, Vec<_>) =
            (0..n).map(|_| new_key_pair::<C, _>(rng)).unzip();

        let nodes = points
            .iter()
            .enumerate()
            .map(|(i, p)| Node::new(i as Idx, p.clone()))
            .collect();
        let group = Group::<C>::new(nodes, t).unwrap();

        let dkgs = longterms
            .iter()
            .map(|long| DistKeyGenerator::new(long.clone(), group.clone(), rng).unwrap())
            .collect();

        (longterms, group, dkgs)
    }

    // runs the full happy path: deals, responses, key assembly
    fn full_dkg(
        dkgs: &mut [DistKeyGenerator<C>],
        rng: &mut ChaCha20Rng,
    ) -> Vec<DistKeyShare<C>> {
        let all_deals: Vec<_> = dkgs.iter_mut().map(|d| d.deals(rng).unwrap()).collect();

        let mut responses = Vec::new();
        for deals in &all_deals {
            for (&vidx, dd) in deals {
                let response = dkgs[vidx as usize].process_deal(dd, rng).unwrap();
                assert_eq!(response.response.status, Status::Approval);
                responses.push(response);
            }
        }

        for response in &responses {
            for (j, dkg) in dkgs.iter_mut().enumerate() {
                if j as Idx == response.response.index {
                    continue;
                }
                let justification = dkg.process_response(response, rng).unwrap();
                assert!(justification.is_none());
            }
        }

        for dkg in dkgs.iter() {
            assert!(dkg.certified());
        }

        dkgs.iter().map(|d| d.dist_key_share().unwrap()).collect()
    }

    #[test]
    fn full_dkg_all_honest() {
        let mut rng = rng();
        let n = 7;
        // every participant is required
        let (_, _, mut dkgs) = setup(n, n, &mut rng);
        let shares = full_dkg(&mut dkgs, &mut rng);

        for dkg in &dkgs {
            assert_eq!(dkg.qual(), (0..n as Idx).collect::<Vec<_>>());
        }

        // every node sees the same group key
        let public = shares[0].public_key().clone();
        for share in &shares {
            assert_eq!(share.public_key(), &public);
        }

        // any n shares reconstruct the same secret, and the group key is
        // its commitment
        let evals: Vec<_> = shares.iter().map(|s| s.share.clone()).collect();
        let secret = Poly::<Scalar>::recover(n, evals).unwrap();
        let mut expected = Point::one();
        expected.mul(&secret);
        assert_eq!(expected, public);
    }

    #[test]
    fn threshold_encryption_roundtrip() {
        let mut rng = rng();
        let (n, t) = (7, 4);
        let (_, _, mut dkgs) = setup(n, t, &mut rng);
        let shares = full_dkg(&mut dkgs, &mut rng);

        let public = shares[0].public_key().clone();
        let msg = b"Hello world";
        let cipher = elgamal::encrypt::<C, _>(&public, msg, &mut rng).unwrap();

        // each node contributes a partial decryption; any t of them open
        // the ciphertext
        let partials: Vec<_> = shares
            .iter()
            .map(|s| elgamal::partial_decrypt::<C>(&s.share, &cipher))
            .collect();

        let opened =
            elgamal::decrypt_from_partials::<C>(t, &cipher, partials[2..2 + t].to_vec()).unwrap();
        assert_eq!(opened, msg.to_vec());
    }

    #[test]
    fn one_silent_verifier_succeeds_after_timeout() {
        let mut rng = rng();
        let (n, t) = (7, 4);
        let silent = 2usize;
        let (_, _, mut dkgs) = setup(n, t, &mut rng);

        let all_deals: Vec<_> = dkgs.iter_mut().map(|d| d.deals(&mut rng).unwrap()).collect();

        // node 2 receives nothing and answers nothing
        let mut responses = Vec::new();
        for deals in &all_deals {
            for (&vidx, dd) in deals {
                if vidx as usize == silent {
                    continue;
                }
                responses.push(dkgs[vidx as usize].process_deal(dd, &mut rng).unwrap());
            }
        }

        for response in &responses {
            for (j, dkg) in dkgs.iter_mut().enumerate() {
                if j == silent || j as Idx == response.response.index {
                    continue;
                }
                dkg.process_response(response, &mut rng).unwrap();
            }
        }

        // without the timeout the runs are incomplete
        assert!(!dkgs[0].certified());
        assert!(!dkgs[0].threshold_certified());

        for (j, dkg) in dkgs.iter_mut().enumerate() {
            if j != silent {
                dkg.set_timeout();
            }
        }

        // one absent out of seven is tolerated with t = 4
        for (j, dkg) in dkgs.iter().enumerate() {
            if j == silent {
                continue;
            }
            assert!(dkg.threshold_certified());
            assert_eq!(dkg.qual().len(), n);
        }

        let shares: Vec<_> = dkgs
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != silent)
            .map(|(_, d)| d.dist_key_share().unwrap())
            .collect();
        let public = shares[0].public_key().clone();
        for share in &shares {
            assert_eq!(share.public_key(), &public);
        }

        let evals: Vec<_> = shares.iter().map(|s| s.share.clone()).collect();
        let secret = Poly::<Scalar>::recover(t, evals).unwrap();
        let mut expected = Point::one();
        expected.mul(&secret);
        assert_eq!(expected, public);
    }

    #[test]
    fn two_silent_verifiers_abort_with_high_threshold() {
        let mut rng = rng();
        let (n, t) = (7, 6);
        let silent = [2usize, 5usize];
        let (_, _, mut dkgs) = setup(n, t, &mut rng);

        let all_deals: Vec<_> = dkgs.iter_mut().map(|d| d.deals(&mut rng).unwrap()).collect();

        let mut responses = Vec::new();
        for deals in &all_deals {
            for (&vidx, dd) in deals {
                if silent.contains(&(vidx as usize)) {
                    continue;
                }
                responses.push(dkgs[vidx as usize].process_deal(dd, &mut rng).unwrap());
            }
        }

        for response in &responses {
            for (j, dkg) in dkgs.iter_mut().enumerate() {
                if silent.contains(&j) || j as Idx == response.response.index {
                    continue;
                }
                dkg.process_response(response, &mut rng).unwrap();
            }
        }

        for (j, dkg) in dkgs.iter_mut().enumerate() {
            if !silent.contains(&j) {
                dkg.set_timeout();
            }
        }

        // two absents exceed n - t = 1 for every dealer that answered, so
        // only the silent nodes' own deals certify: far too few
        assert!(!dkgs[0].threshold_certified());
        let err = dkgs[0].dist_key_share().unwrap_err();
        assert!(matches!(err, DKGError::NotCertified(_, 6)));
    }

    #[test]
    fn resharing_same_committee_preserves_public_key() {
        let mut rng = rng();
        let (n, t) = (7, 4);
        let (longterms, group, mut dkgs) = setup(n, t, &mut rng);
        let shares = full_dkg(&mut dkgs, &mut rng);
        let public = shares[0].public_key().clone();

        let mut reshare_dkgs: Vec<_> = longterms
            .iter()
            .zip(shares.iter())
            .map(|(long, share)| {
                DistKeyGenerator::new_resharing_from_share(
                    long.clone(),
                    group.clone(),
                    group.clone(),
                    share,
                    &mut rng,
                )
                .unwrap()
            })
            .collect();

        let new_shares = run_resharing(&mut reshare_dkgs, &mut rng);

        // the group key is unchanged, the shares are not
        for (old, new) in shares.iter().zip(new_shares.iter()) {
            assert_eq!(new.public_key(), &public);
            assert_eq!(old.share.index, new.share.index);
            assert_ne!(old.share.value, new.share.value);
        }

        // any t new shares still recover the same secret
        let evals: Vec<_> = new_shares[..t].iter().map(|s| s.share.clone()).collect();
        let secret = Poly::<Scalar>::recover(t, evals).unwrap();
        let mut expected = Point::one();
        expected.mul(&secret);
        assert_eq!(expected, public);
    }

    // drives a resharing where every node is in the new group
    fn run_resharing(
        dkgs: &mut [DistKeyGenerator<C>],
        rng: &mut ChaCha20Rng,
    ) -> Vec<DistKeyShare<C>> {
        let all_deals: Vec<_> = dkgs
            .iter_mut()
            .filter(|d| d.can_issue())
            .map(|d| d.deals(rng).unwrap())
            .collect();

        let mut responses = Vec::new();
        for deals in &all_deals {
            for (&vidx, dd) in deals {
                let response = dkgs[vidx as usize].process_deal(dd, rng).unwrap();
                assert_eq!(response.response.status, Status::Approval);
                responses.push(response);
            }
        }

        for response in &responses {
            for (j, dkg) in dkgs.iter_mut().enumerate() {
                if dkg.can_receive() && j as Idx == response.response.index {
                    continue;
                }
                let justification = dkg.process_response(response, rng).unwrap();
                assert!(justification.is_none());
            }
        }

        for dkg in dkgs.iter() {
            assert!(dkg.certified());
        }

        dkgs.iter()
            .filter(|d| d.can_receive())
            .map(|d| d.dist_key_share().unwrap())
            .collect()
    }

    #[test]
    fn resharing_to_grown_committee() {
        let mut rng = rng();
        let (n, t) = (5, 3);
        let (longterms, old_group, mut dkgs) = setup(n, t, &mut rng);
        let shares = full_dkg(&mut dkgs, &mut rng);
        let public = shares[0].public_key().clone();

        // two extra members join; node 0 leaves
        let (new_longs, new_points): (Vec<_>, Vec<_>) =
            (0..2).map(|_| new_key_pair::<C, _>(&mut rng)).unzip();
        let new_t = 4;
        let nodes = longterms[1..]
            .iter()
            .map(|l| {
                let mut p = Point::one();
                p.mul(l);
                p
            })
            .chain(new_points.into_iter())
            .enumerate()
            .map(|(i, p)| Node::new(i as Idx, p))
            .collect();
        let new_group = Group::<C>::new(nodes, new_t).unwrap();

        let mut reshare_dkgs: Vec<_> = longterms
            .iter()
            .zip(shares.iter())
            .map(|(long, share)| {
                DistKeyGenerator::new_resharing_from_share(
                    long.clone(),
                    old_group.clone(),
                    new_group.clone(),
                    share,
                    &mut rng,
                )
                .unwrap()
            })
            .collect();
        reshare_dkgs.extend(new_longs.iter().map(|long| {
            DistKeyGenerator::new_resharing_member(
                long.clone(),
                old_group.clone(),
                new_group.clone(),
                shares[0].commits.clone(),
                &mut rng,
            )
            .unwrap()
        }));

        // node 0 deals but does not receive
        assert!(reshare_dkgs[0].can_issue());
        assert!(!reshare_dkgs[0].can_receive());
        for dkg in &reshare_dkgs[1..n] {
            assert!(dkg.can_issue() && dkg.can_receive());
        }
        for dkg in &reshare_dkgs[n..] {
            assert!(!dkg.can_issue() && dkg.can_receive());
        }

        let all_deals: Vec<_> = reshare_dkgs[..n]
            .iter_mut()
            .map(|d| d.deals(&mut rng).unwrap())
            .collect();

        // receivers are the nodes of the new group, offset by one in our
        // dkg vector since node 0 only deals
        let mut responses = Vec::new();
        for deals in &all_deals {
            for (&vidx, dd) in deals {
                let response = reshare_dkgs[vidx as usize + 1]
                    .process_deal(dd, &mut rng)
                    .unwrap();
                assert_eq!(response.response.status, Status::Approval);
                responses.push(response);
            }
        }

        for response in &responses {
            for (j, dkg) in reshare_dkgs.iter_mut().enumerate() {
                if dkg.can_receive() && j as Idx == response.response.index + 1 {
                    continue;
                }
                let justification = dkg.process_response(response, &mut rng).unwrap();
                assert!(justification.is_none());
            }
        }

        // the old-only node certifies through its response trackers
        assert!(reshare_dkgs[0].certified());
        assert!(matches!(
            reshare_dkgs[0].dist_key_share().unwrap_err(),
            DKGError::NotShareHolder
        ));

        let new_shares: Vec<_> = reshare_dkgs[1..]
            .iter()
            .map(|d| d.dist_key_share().unwrap())
            .collect();

        for share in &new_shares {
            assert_eq!(share.public_key(), &public);
        }

        let evals: Vec<_> = new_shares[..new_t].iter().map(|s| s.share.clone()).collect();
        let secret = Poly::<Scalar>::recover(new_t, evals).unwrap();
        let mut expected = Point::one();
        expected.mul(&secret);
        assert_eq!(expected, public);
    }

    #[test]
    fn byzantine_dealer_is_excluded() {
        let mut rng = rng();
        let (n, t) = (7, 4);
        let bad_dealer = 0usize;
        let victim = 3usize;
        let (longterms, group, mut dkgs) = setup(n, t, &mut rng);

        // dealers 1..7 behave; dealer 0 is simulated by hand so it can
        // corrupt the share it sends to node 3
        let all_deals: Vec<_> = dkgs[1..]
            .iter_mut()
            .map(|d| d.deals(&mut rng).unwrap())
            .collect();

        let points = group.points();
        let secret_poly = PrivatePoly::<C>::new_from(t - 1, &mut rng);
        let commits = secret_poly.commit();
        let sid = vss::session_id::<C>(&points[bad_dealer], &points, &commits, t as u32);
        let context = dh::context::<C>(&points[bad_dealer], &points);

        let bad_deals: Vec<DistDeal<C>> = (0..n)
            .map(|i| {
                let mut deal = Deal::<C> {
                    session_id: sid.clone(),
                    sec_share: secret_poly.eval(i as Idx),
                    threshold: t as u32,
                    commits: commits.clone(),
                };
                if i == victim {
                    deal.sec_share.value.add(&Scalar::one());
                }

                let (eph, dh_key) = new_key_pair::<C, _>(&mut rng);
                let signature =
                    schnorr::sign::<C, _>(&longterms[bad_dealer], &dh_key.marshal(), &mut rng);
                let shared = dh::dh_exchange::<C>(&eph, &points[i]);
                let gcm = dh::new_aead::<C>(&shared, &context);
                let (cipher, tag) = dh::seal(&gcm, &deal.marshal()).unwrap();

                let mut dd = DistDeal {
                    index: bad_dealer as Idx,
                    encrypted_deal: EncryptedDeal {
                        dh_key,
                        signature,
                        nonce: vec![0u8; dh::NONCE_LEN],
                        cipher,
                        tag,
                    },
                    signature: Vec::new(),
                };
                dd.signature =
                    schnorr::sign::<C, _>(&longterms[bad_dealer], &dd.hash(), &mut rng);
                dd
            })
            .collect();

        // honest deals circulate normally among nodes 1..7
        let mut responses = Vec::new();
        for deals in &all_deals {
            for (&vidx, dd) in deals {
                if vidx as usize == bad_dealer {
                    continue;
                }
                responses.push(dkgs[vidx as usize].process_deal(dd, &mut rng).unwrap());
            }
        }

        // the corrupted dealer's deals reach everyone; node 3 complains
        for (i, dd) in bad_deals.iter().enumerate() {
            if i == bad_dealer {
                continue;
            }
            let response = dkgs[i].process_deal(dd, &mut rng).unwrap();
            if i == victim {
                assert_eq!(response.response.status, Status::Complaint);
                assert_eq!(
                    response.response.status_code,
                    StatusCode::ShareDoesNotVerify
                );
            } else {
                assert_eq!(response.response.status, Status::Approval);
            }
            responses.push(response);
        }

        for response in &responses {
            for (j, dkg) in dkgs.iter_mut().enumerate() {
                if j == bad_dealer || j as Idx == response.response.index {
                    continue;
                }
                dkg.process_response(response, &mut rng).unwrap();
            }
        }

        // the dealer doubles down: its justification reveals the same
        // malformed deal
        let mut revealed = Deal::<C> {
            session_id: sid.clone(),
            sec_share: secret_poly.eval(victim as Idx),
            threshold: t as u32,
            commits: commits.clone(),
        };
        revealed.sec_share.value.add(&Scalar::one());
        let jhash = crate::vss::justification_hash(&sid, victim as Idx, &revealed.marshal());
        let dj = DistJustification {
            index: bad_dealer as Idx,
            justification: Justification {
                session_id: sid,
                index: victim as Idx,
                deal: revealed,
                signature: schnorr::sign::<C, _>(&longterms[bad_dealer], &jhash, &mut rng),
            },
        };

        for (j, dkg) in dkgs.iter_mut().enumerate() {
            if j == bad_dealer {
                continue;
            }
            let err = dkg.process_justification(&dj).unwrap_err();
            assert!(matches!(
                err,
                DKGError::Vss(crate::errors::VSSError::BadJustification(
                    StatusCode::ShareDoesNotVerify
                ))
            ));
        }

        // node 0 never responded as a verifier either, so the timeout is
        // needed to close the honest runs
        for (j, dkg) in dkgs.iter_mut().enumerate() {
            if j != bad_dealer {
                dkg.set_timeout();
            }
        }

        for (j, dkg) in dkgs.iter().enumerate() {
            if j == bad_dealer {
                continue;
            }
            // dealer 0 is out, the six others qualify
            let qual = dkg.qual();
            assert_eq!(qual, (1..n as Idx).collect::<Vec<_>>());
            assert!(dkg.threshold_certified());
        }

        let shares: Vec<_> = dkgs[1..]
            .iter()
            .map(|d| d.dist_key_share().unwrap())
            .collect();
        let public = shares[0].public_key().clone();

        let evals: Vec<_> = shares[..t].iter().map(|s| s.share.clone()).collect();
        let secret = Poly::<Scalar>::recover(t, evals).unwrap();
        let mut expected = Point::one();
        expected.mul(&secret);
        assert_eq!(expected, public);
    }

    #[test]
    fn constructor_rejects_unknown_key() {
        let mut rng = rng();
        let (_, group, _) = setup(5, 3, &mut rng);
        let (stranger, _) = new_key_pair::<C, _>(&mut rng);
        let err = DistKeyGenerator::new(stranger, group, &mut rng).unwrap_err();
        assert!(matches!(err, DKGError::PublicKeyNotFound));
    }
}
