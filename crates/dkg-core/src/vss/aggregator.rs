use crate::errors::{VSSError, VSSResult};
use crate::vss::types::{session_id, Deal, Justification, Response, Status, StatusCode};
use std::collections::{BTreeMap, BTreeSet};
use threshold_ec::{
    group::{Curve, Element},
    poly::Idx,
    schnorr,
};

/// Aggregator collects all responses for one dealer's VSS run and derives
/// the certification predicate. Both the dealer and every verifier embed one.
#[derive(Debug, Clone)]
pub struct Aggregator<C: Curve> {
    /// Public key of the dealer
    dealer: C::Point,
    /// Public keys of the verifiers
    verifiers: Vec<C::Point>,
    /// At most one response per verifier index
    responses: BTreeMap<Idx, Response>,
    /// Session identifier, empty until the first deal pins it
    session_id: Vec<u8>,
    /// The first valid deal seen by this instance
    deal: Option<Deal<C>>,
    /// Security parameter t, zero until known
    threshold: usize,
    /// Set when a justification replayed an invalid deal. Permanent.
    bad_dealer: bool,
    /// The verifiers which had responded when the timeout was declared.
    /// Later responses are archived but no longer move the certification
    /// predicate.
    present_at_timeout: Option<BTreeSet<Idx>>,
}

impl<C: Curve> Aggregator<C> {
    /// Dealer-side constructor: the threshold and session id are known
    /// upfront.
    pub fn new(
        dealer: C::Point,
        verifiers: Vec<C::Point>,
        threshold: usize,
        session_id: Vec<u8>,
    ) -> Self {
        Self {
            dealer,
            verifiers,
            responses: BTreeMap::new(),
            session_id,
            deal: None,
            threshold,
            bad_dealer: false,
            present_at_timeout: None,
        }
    }

    /// Verifier-side constructor: the threshold and session id are learned
    /// from the first deal.
    pub fn new_empty(dealer: C::Point, verifiers: Vec<C::Point>) -> Self {
        Self::new(dealer, verifiers, 0, Vec::new())
    }

    pub(crate) fn initialize(&mut self, threshold: usize, session_id: Vec<u8>) {
        self.threshold = threshold;
        self.session_id = session_id;
    }

    /// Analyzes the deal and returns the resulting status code. The checks
    /// run in a fixed order: duplicate (only with `inclusion`), threshold
    /// range, threshold consistency, session id, share index bound, and the
    /// share against the commitment polynomial. The first valid deal is
    /// pinned along with its session id and threshold.
    pub fn verify_deal(&mut self, deal: &Deal<C>, inclusion: bool) -> StatusCode {
        if inclusion && self.deal.is_some() {
            return StatusCode::AlreadyProcessed;
        }

        let t = deal.threshold as usize;
        if t < 2 || t > self.verifiers.len() || deal.commits.threshold() != t {
            return StatusCode::InvalidThreshold;
        }

        if self.threshold != 0 && t != self.threshold {
            return StatusCode::IncompatibleThreshold;
        }

        let expected = session_id::<C>(&self.dealer, &self.verifiers, &deal.commits, deal.threshold);
        if deal.session_id != expected
            || (!self.session_id.is_empty() && deal.session_id != self.session_id)
        {
            return StatusCode::SessionIdDoesNotMatch;
        }

        let i = deal.sec_share.index;
        if i as usize >= self.verifiers.len() {
            return StatusCode::IndexOutOfBound;
        }

        // share * G must match the commitment polynomial evaluated at the
        // share's index
        let mut lhs = C::Point::one();
        lhs.mul(&deal.sec_share.value);
        if deal.commits.eval(i).value != lhs {
            return StatusCode::ShareDoesNotVerify;
        }

        if self.deal.is_none() {
            self.threshold = t;
            self.session_id = deal.session_id.clone();
            self.deal = Some(deal.clone());
        }

        StatusCode::NoComplaint
    }

    /// Checks the response's session id and signature, then records it.
    pub fn verify_response(&mut self, response: &Response) -> VSSResult<()> {
        if !self.session_id.is_empty() && response.session_id != self.session_id {
            return Err(VSSError::InconsistentSessionId);
        }

        let public = self
            .verifiers
            .get(response.index as usize)
            .ok_or(VSSError::IndexOutOfBounds(
                response.index,
                self.verifiers.len(),
            ))?;

        schnorr::verify::<C>(public, &response.hash(), &response.signature)?;

        self.add_response(response)
    }

    /// Records a response. A second response from the same verifier is
    /// silently dropped: real transports redeliver.
    pub fn add_response(&mut self, response: &Response) -> VSSResult<()> {
        if response.index as usize >= self.verifiers.len() {
            return Err(VSSError::IndexOutOfBounds(
                response.index,
                self.verifiers.len(),
            ));
        }

        self.responses
            .entry(response.index)
            .or_insert_with(|| response.clone());

        Ok(())
    }

    /// Records a synthesized response, bypassing signature verification.
    /// Used by the DKG when a node answers for itself.
    pub(crate) fn set_response_unchecked(&mut self, index: Idx, status: Status) {
        let response = Response {
            session_id: self.session_id.clone(),
            index,
            status,
            status_code: StatusCode::NoComplaint,
            signature: Vec::new(),
        };
        self.responses.entry(index).or_insert(response);
    }

    /// Replaces a stored response. Used by the DKG when a deal later turns
    /// out to be inconsistent with the distributed public polynomial.
    pub(crate) fn replace_response(&mut self, response: &Response) {
        self.responses.insert(response.index, response.clone());
    }

    /// Replays the deal revealed inside a justification. On success the
    /// recorded complaint is upgraded to an approval; if the deal is again
    /// invalid, the dealer is marked bad permanently.
    pub(crate) fn process_justification(&mut self, justification: &Justification<C>) -> VSSResult<()> {
        if justification.index as usize >= self.verifiers.len() {
            return Err(VSSError::IndexOutOfBounds(
                justification.index,
                self.verifiers.len(),
            ));
        }
        if !self.session_id.is_empty() && justification.session_id != self.session_id {
            return Err(VSSError::InconsistentSessionId);
        }

        match self.responses.get(&justification.index) {
            None => return Err(VSSError::NoComplaintForJustification),
            Some(r) if r.status.is_approval() => {
                return Err(VSSError::JustificationForApproval)
            }
            _ => {}
        }

        let code = self.verify_deal(&justification.deal, false);
        if code != StatusCode::NoComplaint {
            self.bad_dealer = true;
            return Err(VSSError::BadJustification(code));
        }

        let response = self
            .responses
            .get_mut(&justification.index)
            .expect("presence checked above");
        response.status = Status::Approval;
        response.status_code = StatusCode::NoComplaint;

        Ok(())
    }

    /// The responses the certification predicate evaluates: all of them
    /// before the timeout, only those of verifiers present at the timeout
    /// afterwards. Later arrivals stay archived in the map.
    fn counted(&self) -> impl Iterator<Item = &Response> + '_ {
        self.responses.values().filter(move |r| {
            self.present_at_timeout
                .as_ref()
                .map(|present| present.contains(&r.index))
                .unwrap_or(true)
        })
    }

    fn approvals(&self) -> usize {
        self.counted().filter(|r| r.status.is_approval()).count()
    }

    fn complaints(&self) -> usize {
        self.counted().filter(|r| !r.status.is_approval()).count()
    }

    /// The number of verifiers which have not responded (in time)
    pub fn absent(&self) -> usize {
        self.verifiers.len() - self.counted().count()
    }

    /// Whether at least `t` verifiers approved the deal
    pub fn enough_approvals(&self) -> bool {
        self.threshold > 0 && self.approvals() >= self.threshold
    }

    /// The certification predicate: the dealer is not bad, at least `t`
    /// approvals arrived, no complaint is left standing, and either every
    /// verifier responded or, after the timeout, at most `n - t` are absent.
    ///
    /// The predicate is monotone once the timeout is declared: a late
    /// approval never certifies a deal that missed too many verifiers, and a
    /// certified deal only flips back through `bad_dealer`.
    pub fn deal_certified(&self) -> bool {
        if self.threshold == 0 || self.bad_dealer {
            return false;
        }

        let absent_allowed = if self.present_at_timeout.is_some() {
            self.absent() <= self.verifiers.len() - self.threshold
        } else {
            self.absent() == 0
        };

        self.enough_approvals() && self.complaints() == 0 && absent_allowed
    }

    /// Declares the end of the response period. Idempotent and irreversible:
    /// the certification predicate switches to its post-timeout form.
    pub fn set_timeout(&mut self) {
        if self.present_at_timeout.is_none() {
            self.present_at_timeout = Some(self.responses.keys().copied().collect());
        }
    }

    pub fn bad_dealer(&self) -> bool {
        self.bad_dealer
    }

    pub fn deal(&self) -> Option<&Deal<C>> {
        self.deal.as_ref()
    }

    pub fn session_id(&self) -> &[u8] {
        &self.session_id
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn responses(&self) -> &BTreeMap<Idx, Response> {
        &self.responses
    }
}
