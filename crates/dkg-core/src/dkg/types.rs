use crate::errors::VSSError;
use crate::vss::{EncryptedDeal, Justification, Response, SliceReader};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use threshold_ec::{
    group::Curve,
    poly::{Eval, Idx, PrivatePoly, PublicPoly},
};

/// DistKeyShare is the final output of the DKG protocol in case it runs
/// successfully. The constant term of `commits` is the group public key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct DistKeyShare<C: Curve> {
    /// The commitments of the distributed secret polynomial
    pub commits: PublicPoly<C>,
    /// The private share held by this node
    pub share: Eval<C::Scalar>,
    /// The coefficients of this node's own dealt polynomial, present only
    /// when the node acted as a dealer
    pub coefficients: Option<PrivatePoly<C>>,
}

impl<C: Curve> DistKeyShare<C> {
    /// The distributed public key of the group
    pub fn public_key(&self) -> &C::Point {
        self.commits.public_key()
    }
}

/// DistDeal is one dealer's encrypted deal addressed to one participant,
/// signed by the dealer's long-term key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct DistDeal<C: Curve> {
    /// The dealer's index in the (old) group
    pub index: Idx,
    /// The encrypted deal
    pub encrypted_deal: EncryptedDeal<C>,
    /// Signature over the dealer index and the canonical encrypted deal
    pub signature: Vec<u8>,
}

impl<C: Curve> DistDeal<C> {
    /// The byte string the dealer signs
    pub(crate) fn hash(&self) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update((self.index as i32).to_le_bytes());
        hasher.update(self.encrypted_deal.marshal());
        hasher.finalize().to_vec()
    }

    pub fn marshal(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(self.index as i32).to_le_bytes());
        buf.extend_from_slice(&self.encrypted_deal.marshal());
        buf.extend_from_slice(&(self.signature.len() as i32).to_le_bytes());
        buf.extend_from_slice(&self.signature);
        buf
    }

    pub fn unmarshal(buf: &[u8]) -> Result<Self, VSSError> {
        let mut r = SliceReader::new(buf);

        let index = r.u32()?;
        let encrypted_deal = EncryptedDeal::read(&mut r)?;
        let signature = r.bytes()?.to_vec();
        r.finish()?;

        Ok(Self {
            index,
            encrypted_deal,
            signature,
        })
    }
}

/// DistResponse carries one verifier's response about the deal of the dealer
/// at `index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistResponse {
    /// The index of the dealer the response is about
    pub index: Idx,
    /// The verifier's signed response
    pub response: Response,
}

impl DistResponse {
    pub fn marshal(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(self.index as i32).to_le_bytes());
        buf.extend_from_slice(&self.response.marshal());
        buf
    }

    pub fn unmarshal(buf: &[u8]) -> Result<Self, VSSError> {
        let mut r = SliceReader::new(buf);

        let index = r.u32()?;
        let response = Response::read(&mut r)?;
        r.finish()?;

        Ok(Self { index, response })
    }
}

/// DistJustification carries a dealer's answer to a complaint about its
/// deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct DistJustification<C: Curve> {
    /// The index of the dealer issuing the justification
    pub index: Idx,
    /// The justification revealing the disputed deal
    pub justification: Justification<C>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vss::{Status, StatusCode};
    use serde::de::DeserializeOwned;
    use static_assertions::assert_impl_all;
    use threshold_ec::curve::secp256k1::Secp256k1;

    assert_impl_all!(DistDeal<Secp256k1>: serde::Serialize, DeserializeOwned, Clone);
    assert_impl_all!(DistKeyShare<Secp256k1>: serde::Serialize, DeserializeOwned, Clone);
    assert_impl_all!(DistJustification<Secp256k1>: serde::Serialize, DeserializeOwned, Clone);

    #[test]
    fn response_transport_roundtrip() {
        let response = DistResponse {
            index: 3,
            response: crate::vss::Response {
                session_id: vec![9; 32],
                index: 5,
                status: Status::Complaint,
                status_code: StatusCode::ShareDoesNotVerify,
                signature: vec![1; 65],
            },
        };

        let buf = bincode::serialize(&response).unwrap();
        let parsed: DistResponse = bincode::deserialize(&buf).unwrap();
        assert_eq!(parsed.index, response.index);
        assert_eq!(parsed.response, response.response);

        let buf = response.marshal();
        let parsed = DistResponse::unmarshal(&buf).unwrap();
        assert_eq!(parsed.index, response.index);
        assert_eq!(parsed.response, response.response);
        let mut long = buf;
        long.push(0);
        DistResponse::unmarshal(&long).unwrap_err();
    }

    #[test]
    fn deal_encoding_roundtrip() {
        use rand::thread_rng;
        use threshold_ec::group::new_key_pair;

        let (_, point) = new_key_pair::<Secp256k1, _>(&mut thread_rng());
        let dd = DistDeal::<Secp256k1> {
            index: 2,
            encrypted_deal: crate::vss::EncryptedDeal {
                dh_key: point,
                signature: vec![7; 65],
                nonce: vec![0; 12],
                cipher: vec![5; 180],
                tag: vec![6; 16],
            },
            signature: vec![9; 65],
        };

        let buf = dd.marshal();
        let parsed = DistDeal::<Secp256k1>::unmarshal(&buf).unwrap();
        assert_eq!(parsed.index, dd.index);
        assert_eq!(parsed.encrypted_deal, dd.encrypted_deal);
        assert_eq!(parsed.signature, dd.signature);

        DistDeal::<Secp256k1>::unmarshal(&buf[..buf.len() - 1]).unwrap_err();
    }
}
