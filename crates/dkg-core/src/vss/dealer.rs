use crate::errors::{VSSError, VSSResult};
use crate::vss::aggregator::Aggregator;
use crate::vss::types::{
    justification_hash, session_id, Deal, EncryptedDeal, Justification, Response,
};
use rand_core::RngCore;
use threshold_ec::{
    dh,
    group::{new_key_pair, Curve, Element, Encodable},
    poly::{Idx, PrivatePoly, PublicPoly},
    schnorr,
};
use zeroize::Zeroize;

/// Dealer encapsulates the creation and distribution of the shares of one
/// secret and answers the responses of the verifiers. It does not have to be
/// trusted by them: every share is checkable against the commitments.
#[derive(Debug)]
pub struct Dealer<C: Curve> {
    /// Long-term private key of the dealer
    long: C::Scalar,
    /// Long-term public key of the dealer
    public: C::Point,
    /// The secret being shared
    secret: C::Scalar,
    /// The secret polynomial, f(0) = secret
    secret_poly: PrivatePoly<C>,
    /// Commitments of the secret polynomial
    commits: PublicPoly<C>,
    /// Public keys of the verifiers
    verifiers: Vec<C::Point>,
    /// Context bound into the envelope key derivation
    hkdf_context: Vec<u8>,
    /// Unique identifier of this run
    session_id: Vec<u8>,
    /// One deal per verifier
    deals: Vec<Deal<C>>,
    /// Collects the verifiers' responses
    aggregator: Aggregator<C>,
}

impl<C: Curve> Dealer<C> {
    /// Creates a Dealer able to share `secret` with the given verifiers.
    /// The threshold is the number of shares required to reconstruct it and
    /// must lie in `[2, n]`. It is HIGHLY RECOMMENDED to use a threshold at
    /// least as large as `minimum_threshold()`; a lower one breaks the
    /// security assumptions of the scheme.
    pub fn new<R: RngCore>(
        longterm: C::Scalar,
        secret: C::Scalar,
        verifiers: Vec<C::Point>,
        threshold: usize,
        rng: &mut R,
    ) -> VSSResult<Self> {
        if threshold < 2 || threshold > verifiers.len() {
            return Err(VSSError::InvalidThreshold(threshold, verifiers.len()));
        }

        let mut public = C::Point::one();
        public.mul(&longterm);

        let mut secret_poly = PrivatePoly::<C>::new_from(threshold - 1, rng);
        secret_poly.set(0, secret.clone());
        let commits: PublicPoly<C> = secret_poly.commit();

        let session_id = session_id::<C>(&public, &verifiers, &commits, threshold as u32);

        let deals = (0..verifiers.len())
            .map(|i| Deal {
                session_id: session_id.clone(),
                sec_share: secret_poly.eval(i as Idx),
                threshold: threshold as u32,
                commits: commits.clone(),
            })
            .collect();

        let hkdf_context = dh::context::<C>(&public, &verifiers);

        let aggregator = Aggregator::new(
            public.clone(),
            verifiers.clone(),
            threshold,
            session_id.clone(),
        );

        Ok(Self {
            long: longterm,
            public,
            secret,
            secret_poly,
            commits,
            verifiers,
            hkdf_context,
            session_id,
            deals,
            aggregator,
        })
    }

    /// Returns the encryption of the deal destined to the verifier at index
    /// `i`: a one-time Diffie-Hellman key signed by the dealer's long-term
    /// key, and the deal sealed under the derived AEAD key.
    pub fn encrypt_deal<R: RngCore>(&self, i: Idx, rng: &mut R) -> VSSResult<EncryptedDeal<C>> {
        let v_pub = self
            .verifiers
            .get(i as usize)
            .ok_or(VSSError::IndexOutOfBounds(i, self.verifiers.len()))?;

        let (mut eph, dh_key) = new_key_pair::<C, _>(rng);
        let signature = schnorr::sign::<C, _>(&self.long, &dh_key.marshal(), rng);

        let shared = dh::dh_exchange::<C>(&eph, v_pub);
        let gcm = dh::new_aead::<C>(&shared, &self.hkdf_context);
        let (cipher, tag) = dh::seal(&gcm, &self.deals[i as usize].marshal())?;

        eph.zeroize();

        Ok(EncryptedDeal {
            dh_key,
            signature,
            nonce: vec![0u8; dh::NONCE_LEN],
            cipher,
            tag,
        })
    }

    /// Encrypts the deal of every verifier. Each position in the returned
    /// vector corresponds to the verifier index.
    pub fn encrypt_deals<R: RngCore>(&self, rng: &mut R) -> VSSResult<Vec<EncryptedDeal<C>>> {
        (0..self.verifiers.len() as Idx)
            .map(|i| self.encrypt_deal(i, rng))
            .collect()
    }

    /// Analyzes the given response. A valid complaint is answered with a
    /// Justification that must be broadcast to every participant; a valid
    /// approval returns nothing.
    pub fn process_response<R: RngCore>(
        &mut self,
        response: &Response,
        rng: &mut R,
    ) -> VSSResult<Option<Justification<C>>> {
        self.aggregator.verify_response(response)?;

        if response.status.is_approval() {
            return Ok(None);
        }

        let deal = self.deals[response.index as usize].clone();
        let hash = justification_hash(&self.session_id, response.index, &deal.marshal());
        let signature = schnorr::sign::<C, _>(&self.long, &hash, rng);

        Ok(Some(Justification {
            session_id: self.session_id.clone(),
            index: response.index,
            deal,
            signature,
        }))
    }

    /// Returns the commitment of the shared secret. Only available once the
    /// deal gathered enough approvals and is certified.
    pub fn secret_commit(&self) -> VSSResult<C::Point> {
        if !self.aggregator.enough_approvals() || !self.deal_certified() {
            return Err(VSSError::NotCertified);
        }

        let mut commit = C::Point::one();
        commit.mul(&self.secret);
        Ok(commit)
    }

    /// Returns the commitments of the secret polynomial, guarded the same
    /// way as [`secret_commit`](Self::secret_commit).
    pub fn commits(&self) -> VSSResult<&PublicPoly<C>> {
        if !self.aggregator.enough_approvals() || !self.deal_certified() {
            return Err(VSSError::NotCertified);
        }

        Ok(&self.commits)
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

    /// The session id generated by this dealer for this run
    pub fn session_id(&self) -> &[u8] {
        &self.session_id
    }

    /// The dealer's long-term public key
    pub fn public_key(&self) -> &C::Point {
        &self.public
    }

    pub(crate) fn private_poly(&self) -> &PrivatePoly<C> {
        &self.secret_poly
    }
}

impl<C: Curve> Drop for Dealer<C> {
    fn drop(&mut self) {
        self.long.zeroize();
        self.secret.zeroize();
        self.secret_poly.zeroize();
    }
}
