use crate::errors::{VSSError, VSSResult};
use crate::vss::aggregator::Aggregator;
use crate::vss::types::{
    response_hash, session_id, Deal, EncryptedDeal, Justification, Response, Status, StatusCode,
};
use rand_core::RngCore;
use threshold_ec::{
    dh,
    group::{Curve, Element, Encodable},
    poly::{Idx, PublicPoly},
    schnorr,
};
use zeroize::Zeroize;

/// Verifier receives a deal from one dealer, answers with an approval or a
/// complaint, and tracks the other verifiers' responses until the deal is
/// certified.
#[derive(Debug)]
pub struct Verifier<C: Curve> {
    /// Long-term private key of the verifier
    long: C::Scalar,
    /// Long-term public key of the verifier
    public: C::Point,
    /// Public key of the dealer
    dealer: C::Point,
    /// Index of this verifier in the verifier list
    index: Idx,
    /// Public keys of all verifiers, including our own
    verifiers: Vec<C::Point>,
    /// Context bound into the envelope key derivation
    hkdf_context: Vec<u8>,
    /// Collects the deal and every response
    aggregator: Aggregator<C>,
}

impl<C: Curve> Verifier<C> {
    /// Creates a verifier for one dealer's run. The list of verifiers MUST
    /// include this verifier's own public key; its position determines the
    /// index the deal is checked against.
    pub fn new(
        longterm: C::Scalar,
        dealer: C::Point,
        verifiers: Vec<C::Point>,
    ) -> VSSResult<Self> {
        let mut public = C::Point::one();
        public.mul(&longterm);

        let index = verifiers
            .iter()
            .position(|point| point == &public)
            .map(|i| i as Idx)
            .ok_or(VSSError::PublicKeyNotFound)?;

        let hkdf_context = dh::context::<C>(&dealer, &verifiers);
        let aggregator = Aggregator::new_empty(dealer.clone(), verifiers.clone());

        Ok(Self {
            long: longterm,
            public,
            dealer,
            index,
            verifiers,
            hkdf_context,
            aggregator,
        })
    }

    /// Decrypts and analyzes the deal, then returns the signed response that
    /// must be broadcast to every participant, including the dealer. An
    /// approval means the share verified against the commitments; any other
    /// outcome is a complaint carrying the reason. Decryption or signature
    /// failures return an error and no response is produced.
    pub fn process_encrypted_deal<R: RngCore>(
        &mut self,
        encrypted: &EncryptedDeal<C>,
        rng: &mut R,
    ) -> VSSResult<Response> {
        let deal = self.decrypt_deal(encrypted)?;

        if deal.sec_share.index != self.index {
            return Err(VSSError::WrongRecipient(deal.sec_share.index, self.index));
        }

        let sid = session_id::<C>(&self.dealer, &self.verifiers, &deal.commits, deal.threshold);

        let t = deal.threshold as usize;
        if self.aggregator.threshold() == 0 && t >= 2 && t <= self.verifiers.len() {
            self.aggregator.initialize(t, sid.clone());
        }

        let code = self.aggregator.verify_deal(&deal, true);
        let status = if code == StatusCode::NoComplaint {
            Status::Approval
        } else {
            Status::Complaint
        };

        let hash = response_hash(&sid, self.index, status.is_approval());
        let signature = schnorr::sign::<C, _>(&self.long, &hash, rng);

        let response = Response {
            session_id: sid,
            index: self.index,
            status,
            status_code: code,
            signature,
        };

        self.aggregator.add_response(&response)?;

        Ok(response)
    }

    /// Verifies the dealer's signature over the ephemeral key, opens the
    /// envelope and parses the deal.
    pub fn decrypt_deal(&self, encrypted: &EncryptedDeal<C>) -> VSSResult<Deal<C>> {
        schnorr::verify::<C>(
            &self.dealer,
            &encrypted.dh_key.marshal(),
            &encrypted.signature,
        )?;

        let shared = dh::dh_exchange::<C>(&self.long, &encrypted.dh_key);
        let gcm = dh::new_aead::<C>(&shared, &self.hkdf_context);
        let buf = dh::open(&gcm, &encrypted.nonce, &encrypted.cipher, &encrypted.tag)?;

        Deal::unmarshal(&buf)
    }

    /// Analyzes another verifier's response. A valid complaint means a
    /// Justification from the dealer should follow. Responses arriving
    /// before any deal are refused.
    pub fn process_response(&mut self, response: &Response) -> VSSResult<()> {
        if self.aggregator.threshold() == 0 {
            return Err(VSSError::NoDealBeforeResponse);
        }

        self.aggregator.verify_response(response)
    }

    /// Replays a dealer's justification. On success the recorded complaint
    /// is upgraded to an approval; a justification revealing an invalid deal
    /// marks the dealer bad permanently.
    pub fn process_justification(&mut self, justification: &Justification<C>) -> VSSResult<()> {
        self.aggregator.process_justification(justification)
    }

    /// Returns the deal this verifier received. Only available once it
    /// gathered enough approvals and is certified.
    pub fn deal(&self) -> VSSResult<Deal<C>> {
        if !self.aggregator.enough_approvals() || !self.aggregator.deal_certified() {
            return Err(VSSError::NotCertified);
        }

        Ok(self
            .aggregator
            .deal()
            .expect("a certified run has a pinned deal")
            .clone())
    }

    pub fn deal_certified(&self) -> bool {
        self.aggregator.deal_certified()
    }

    pub fn enough_approvals(&self) -> bool {
        self.aggregator.enough_approvals()
    }

    /// Declares the end of the response period for this dealer
    pub fn set_timeout(&mut self) {
        self.aggregator.set_timeout();
    }

    /// The index of this verifier in the list of participants
    pub fn index(&self) -> Idx {
        self.index
    }

    /// The session id of this run, empty until a deal has been seen
    pub fn session_id(&self) -> &[u8] {
        self.aggregator.session_id()
    }

    /// The verifier's long-term public key
    pub fn public_key(&self) -> &C::Point {
        &self.public
    }

    /// The commitments pinned from the first valid deal
    pub(crate) fn commits(&self) -> Option<&PublicPoly<C>> {
        self.aggregator.deal().map(|d| &d.commits)
    }

    /// Builds, signs and records a complaint replacing this verifier's
    /// stored response. Used by the DKG when a deal is inconsistent with the
    /// distributed public polynomial.
    pub(crate) fn replace_with_complaint<R: RngCore>(
        &mut self,
        code: StatusCode,
        rng: &mut R,
    ) -> VSSResult<Response> {
        let sid = self.aggregator.session_id().to_vec();
        let hash = response_hash(&sid, self.index, false);
        let signature = schnorr::sign::<C, _>(&self.long, &hash, rng);

        let response = Response {
            session_id: sid,
            index: self.index,
            status: Status::Complaint,
            status_code: code,
            signature,
        };
        self.aggregator.replace_response(&response);

        Ok(response)
    }

    pub(crate) fn aggregator(&self) -> &Aggregator<C> {
        &self.aggregator
    }

    pub(crate) fn aggregator_mut(&mut self) -> &mut Aggregator<C> {
        &mut self.aggregator
    }
}

impl<C: Curve> Drop for Verifier<C> {
    fn drop(&mut self) {
        self.long.zeroize();
    }
}
