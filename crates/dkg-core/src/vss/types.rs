use crate::errors::VSSError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use threshold_ec::{
    group::{Curve, Element, Encodable},
    poly::{Eval, Idx, PublicPoly},
};

/// The outcome a verifier attaches to a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Approval,
    Complaint,
}

impl Status {
    pub fn is_approval(self) -> bool {
        matches!(self, Status::Approval)
    }
}

/// The reason attached to a complaint. `NoComplaint` accompanies approvals.
///
/// These codes never surface as errors: they drive the justification path of
/// the protocol and travel inside [`Response`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    NoComplaint,
    AlreadyProcessed,
    InvalidThreshold,
    IncompatibleThreshold,
    SessionIdDoesNotMatch,
    IndexOutOfBound,
    ShareDoesNotVerify,
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            StatusCode::NoComplaint => "no complaint",
            StatusCode::AlreadyProcessed => "deal already processed",
            StatusCode::InvalidThreshold => "invalid threshold",
            StatusCode::IncompatibleThreshold => "incompatible threshold",
            StatusCode::SessionIdDoesNotMatch => "session id does not match",
            StatusCode::IndexOutOfBound => "index out of bound",
            StatusCode::ShareDoesNotVerify => "share does not verify",
        };
        write!(f, "{}", s)
    }
}

/// Deal encapsulates the verifiable secret share and is sent by the dealer
/// to a verifier, always inside an [`EncryptedDeal`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Deal<C: Curve> {
    /// Unique session identifier of this protocol run
    pub session_id: Vec<u8>,
    /// Share of the distributed secret destined to one verifier
    pub sec_share: Eval<C::Scalar>,
    /// Threshold security parameter
    pub threshold: u32,
    /// Commitments of the secret polynomial, used for share verification
    pub commits: PublicPoly<C>,
}

/// EncryptedDeal contains the deal in an encrypted form only decipherable by
/// the correct recipient. The dealer generates a one-time keypair, signs its
/// public part with its long-term key, and seals the deal under a key derived
/// from the Diffie-Hellman exchange with the verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct EncryptedDeal<C: Curve> {
    /// Ephemeral Diffie-Hellman key
    pub dh_key: C::Point,
    /// Signature of the ephemeral key by the long-term key of the dealer
    pub signature: Vec<u8>,
    /// Nonce used by the AEAD
    pub nonce: Vec<u8>,
    /// AEAD ciphertext of the canonical deal encoding
    pub cipher: Vec<u8>,
    /// AEAD authentication tag
    pub tag: Vec<u8>,
}

/// Response is sent by a verifier to all participants and holds its
/// validation or refusal of one deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Session identifier of the protocol run this response belongs to
    pub session_id: Vec<u8>,
    /// Index of the verifier issuing this response
    pub index: Idx,
    /// Approval or complaint
    pub status: Status,
    /// The complaint reason, `NoComplaint` for approvals
    pub status_code: StatusCode,
    /// Signature over the response hash by the verifier's long-term key
    pub signature: Vec<u8>,
}

/// Justification is broadcast by the dealer in answer to a complaint and
/// reveals, in cleartext, the deal destined to the complaining verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Justification<C: Curve> {
    /// Session identifier of the protocol run
    pub session_id: Vec<u8>,
    /// Index of the verifier whose complaint is being answered
    pub index: Idx,
    /// The deal in cleartext
    pub deal: Deal<C>,
    /// Signature over the justification hash by the dealer's long-term key
    pub signature: Vec<u8>,
}

/// Computes the unique session identifier of a dealer's VSS run:
/// `SHA256(dealer || verifiers... || commits... || t_le)`.
pub fn session_id<C: Curve>(
    dealer: &C::Point,
    verifiers: &[C::Point],
    commits: &PublicPoly<C>,
    t: u32,
) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(dealer.marshal());
    for v in verifiers {
        hasher.update(v.marshal());
    }
    for k in 0..commits.threshold() {
        hasher.update(commits.get(k as Idx).marshal());
    }
    hasher.update(t.to_le_bytes());
    hasher.finalize().to_vec()
}

/// The byte string a verifier signs when responding to a deal
pub(crate) fn response_hash(session_id: &[u8], index: Idx, approved: bool) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(b"response");
    hasher.update(session_id);
    hasher.update((index as i32).to_le_bytes());
    hasher.update([approved as u8]);
    hasher.finalize().to_vec()
}

/// The byte string a dealer signs when justifying a complaint
pub(crate) fn justification_hash(session_id: &[u8], index: Idx, deal: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(b"justification");
    hasher.update(session_id);
    hasher.update((index as i32).to_le_bytes());
    hasher.update(deal);
    hasher.finalize().to_vec()
}

impl Response {
    pub(crate) fn hash(&self) -> Vec<u8> {
        response_hash(&self.session_id, self.index, self.status.is_approval())
    }
}

// Canonical encodings: every length prefix is an `i32` in little-endian
// form, fields are concatenated without padding. These bytes feed the AEAD
// and every signature hash, so they must stay bit-exact across versions.

fn put_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    buf.extend_from_slice(&(data.len() as i32).to_le_bytes());
    buf.extend_from_slice(data);
}

pub(crate) struct SliceReader<'a> {
    buf: &'a [u8],
}

impl<'a> SliceReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], VSSError> {
        if self.buf.len() < n {
            return Err(VSSError::InvalidEncoding);
        }
        let (head, rest) = self.buf.split_at(n);
        self.buf = rest;
        Ok(head)
    }

    pub fn u32(&mut self) -> Result<u32, VSSError> {
        let raw = self.take(4)?;
        let v = i32::from_le_bytes(raw.try_into().expect("four bytes"));
        if v < 0 {
            return Err(VSSError::InvalidEncoding);
        }
        Ok(v as u32)
    }

    pub fn bytes(&mut self) -> Result<&'a [u8], VSSError> {
        let n = self.u32()? as usize;
        self.take(n)
    }

    /// Rejects trailing bytes
    pub fn finish(self) -> Result<(), VSSError> {
        if !self.buf.is_empty() {
            return Err(VSSError::InvalidEncoding);
        }
        Ok(())
    }
}

impl<C: Curve> Deal<C> {
    pub fn marshal(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        put_bytes(&mut buf, &self.session_id);
        buf.extend_from_slice(&(self.sec_share.index as i32).to_le_bytes());
        buf.extend_from_slice(&self.sec_share.value.marshal());
        buf.extend_from_slice(&(self.threshold as i32).to_le_bytes());
        buf.extend_from_slice(&(self.commits.threshold() as i32).to_le_bytes());
        for k in 0..self.commits.threshold() {
            buf.extend_from_slice(&self.commits.get(k as Idx).marshal());
        }
        buf
    }

    pub fn unmarshal(buf: &[u8]) -> Result<Self, VSSError> {
        let mut r = SliceReader::new(buf);

        let session_id = r.bytes()?.to_vec();
        let index = r.u32()?;
        let mut value = C::Scalar::new();
        value.unmarshal(r.take(C::Scalar::marshal_len())?)?;
        let threshold = r.u32()?;

        let count = r.u32()? as usize;
        if count == 0 {
            return Err(VSSError::InvalidEncoding);
        }
        let mut commits = Vec::with_capacity(count.min(1 + buf.len() / C::Point::marshal_len()));
        for _ in 0..count {
            let mut p = C::Point::new();
            p.unmarshal(r.take(C::Point::marshal_len())?)?;
            commits.push(p);
        }
        r.finish()?;

        Ok(Self {
            session_id,
            sec_share: Eval { index, value },
            threshold,
            commits: PublicPoly::<C>::from(commits),
        })
    }
}

impl Status {
    fn to_wire(self) -> i32 {
        match self {
            Status::Approval => 0,
            Status::Complaint => 1,
        }
    }

    fn from_wire(v: u32) -> Result<Self, VSSError> {
        match v {
            0 => Ok(Status::Approval),
            1 => Ok(Status::Complaint),
            _ => Err(VSSError::InvalidEncoding),
        }
    }
}

impl StatusCode {
    fn to_wire(self) -> i32 {
        match self {
            StatusCode::NoComplaint => 0,
            StatusCode::AlreadyProcessed => 1,
            StatusCode::InvalidThreshold => 2,
            StatusCode::IncompatibleThreshold => 3,
            StatusCode::SessionIdDoesNotMatch => 4,
            StatusCode::IndexOutOfBound => 5,
            StatusCode::ShareDoesNotVerify => 6,
        }
    }

    fn from_wire(v: u32) -> Result<Self, VSSError> {
        Ok(match v {
            0 => StatusCode::NoComplaint,
            1 => StatusCode::AlreadyProcessed,
            2 => StatusCode::InvalidThreshold,
            3 => StatusCode::IncompatibleThreshold,
            4 => StatusCode::SessionIdDoesNotMatch,
            5 => StatusCode::IndexOutOfBound,
            6 => StatusCode::ShareDoesNotVerify,
            _ => return Err(VSSError::InvalidEncoding),
        })
    }
}

impl Response {
    pub fn marshal(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        put_bytes(&mut buf, &self.session_id);
        buf.extend_from_slice(&(self.index as i32).to_le_bytes());
        buf.extend_from_slice(&self.status.to_wire().to_le_bytes());
        buf.extend_from_slice(&self.status_code.to_wire().to_le_bytes());
        put_bytes(&mut buf, &self.signature);
        buf
    }

    pub fn unmarshal(buf: &[u8]) -> Result<Self, VSSError> {
        let mut r = SliceReader::new(buf);
        let response = Self::read(&mut r)?;
        r.finish()?;
        Ok(response)
    }

    /// Reads one response off a cursor; the encoding is self-delimiting so
    /// it can be embedded in larger messages.
    pub(crate) fn read(r: &mut SliceReader) -> Result<Self, VSSError> {
        let session_id = r.bytes()?.to_vec();
        let index = r.u32()?;
        let status = Status::from_wire(r.u32()?)?;
        let status_code = StatusCode::from_wire(r.u32()?)?;
        let signature = r.bytes()?.to_vec();

        Ok(Self {
            session_id,
            index,
            status,
            status_code,
            signature,
        })
    }
}

impl<C: Curve> Justification<C> {
    pub fn marshal(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        put_bytes(&mut buf, &self.session_id);
        buf.extend_from_slice(&(self.index as i32).to_le_bytes());
        put_bytes(&mut buf, &self.deal.marshal());
        put_bytes(&mut buf, &self.signature);
        buf
    }

    pub fn unmarshal(buf: &[u8]) -> Result<Self, VSSError> {
        let mut r = SliceReader::new(buf);

        let session_id = r.bytes()?.to_vec();
        let index = r.u32()?;
        let deal = Deal::unmarshal(r.bytes()?)?;
        let signature = r.bytes()?.to_vec();
        r.finish()?;

        Ok(Self {
            session_id,
            index,
            deal,
            signature,
        })
    }
}

impl<C: Curve> EncryptedDeal<C> {
    pub fn marshal(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        put_bytes(&mut buf, &self.dh_key.marshal());
        put_bytes(&mut buf, &self.signature);
        put_bytes(&mut buf, &self.nonce);
        put_bytes(&mut buf, &self.cipher);
        put_bytes(&mut buf, &self.tag);
        buf
    }

    pub fn unmarshal(buf: &[u8]) -> Result<Self, VSSError> {
        let mut r = SliceReader::new(buf);
        let deal = Self::read(&mut r)?;
        r.finish()?;
        Ok(deal)
    }

    /// Reads one encrypted deal off a cursor; the encoding is
    /// self-delimiting so it can be embedded in larger messages.
    pub(crate) fn read(r: &mut SliceReader) -> Result<Self, VSSError> {
        let mut dh_key = C::Point::new();
        dh_key.unmarshal(r.bytes()?)?;
        let signature = r.bytes()?.to_vec();
        let nonce = r.bytes()?.to_vec();
        let cipher = r.bytes()?.to_vec();
        let tag = r.bytes()?.to_vec();

        Ok(Self {
            dh_key,
            signature,
            nonce,
            cipher,
            tag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;
    use threshold_ec::curve::secp256k1::Secp256k1;
    use threshold_ec::group::new_key_pair;
    use threshold_ec::poly::PrivatePoly;

    type C = Secp256k1;

    fn some_deal() -> Deal<C> {
        let secret = PrivatePoly::<C>::new_from(3, &mut thread_rng());
        let commits = secret.commit();
        Deal {
            session_id: vec![7; 32],
            sec_share: secret.eval(2),
            threshold: 4,
            commits,
        }
    }

    #[test]
    fn deal_encoding_roundtrip() {
        let deal = some_deal();
        let buf = deal.marshal();
        let parsed = Deal::<C>::unmarshal(&buf).unwrap();
        assert_eq!(parsed, deal);

        // trailing bytes are rejected
        let mut long = buf.clone();
        long.push(0);
        Deal::<C>::unmarshal(&long).unwrap_err();
        Deal::<C>::unmarshal(&buf[..buf.len() - 1]).unwrap_err();
    }

    #[test]
    fn encrypted_deal_encoding_roundtrip() {
        let (_, public) = new_key_pair::<C, _>(&mut thread_rng());
        let ed = EncryptedDeal::<C> {
            dh_key: public,
            signature: vec![1; 65],
            nonce: vec![0; 12],
            cipher: vec![9; 140],
            tag: vec![3; 16],
        };
        let buf = ed.marshal();
        let parsed = EncryptedDeal::<C>::unmarshal(&buf).unwrap();
        assert_eq!(parsed, ed);

        let mut long = buf;
        long.push(0);
        EncryptedDeal::<C>::unmarshal(&long).unwrap_err();
    }

    #[test]
    fn response_and_justification_encoding_roundtrip() {
        let response = Response {
            session_id: vec![4; 32],
            index: 6,
            status: Status::Complaint,
            status_code: StatusCode::IncompatibleThreshold,
            signature: vec![8; 65],
        };
        let buf = response.marshal();
        assert_eq!(Response::unmarshal(&buf).unwrap(), response);
        let mut long = buf;
        long.push(0);
        Response::unmarshal(&long).unwrap_err();

        let justification = Justification::<C> {
            session_id: vec![4; 32],
            index: 6,
            deal: some_deal(),
            signature: vec![2; 65],
        };
        let buf = justification.marshal();
        assert_eq!(Justification::<C>::unmarshal(&buf).unwrap(), justification);
        Justification::<C>::unmarshal(&buf[..buf.len() - 1]).unwrap_err();
    }

    #[test]
    fn session_id_binds_parameters() {
        let deal = some_deal();
        let (_, dealer) = new_key_pair::<C, _>(&mut thread_rng());
        let (_, v1) = new_key_pair::<C, _>(&mut thread_rng());
        let (_, v2) = new_key_pair::<C, _>(&mut thread_rng());

        let verifiers = vec![v1, v2];
        let sid = session_id::<C>(&dealer, &verifiers, &deal.commits, 4);
        assert_eq!(sid.len(), 32);

        // any parameter change yields a different id
        assert_ne!(
            sid,
            session_id::<C>(&dealer, &verifiers, &deal.commits, 5)
        );
        assert_ne!(
            sid,
            session_id::<C>(&verifiers[0], &verifiers, &deal.commits, 4)
        );
        assert_ne!(
            sid,
            session_id::<C>(&dealer, &verifiers[..1], &deal.commits, 4)
        );
    }
}
