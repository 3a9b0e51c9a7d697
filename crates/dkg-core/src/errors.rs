use crate::vss::StatusCode;
use threshold_ec::{
    dh::DHError,
    group::CurveError,
    poly::{Idx, PolyError},
    schnorr::SchnorrError,
};
use thiserror::Error;

/// Result type alias which returns `VSSError`
pub type VSSResult<A> = Result<A, VSSError>;

/// Result type alias which returns `DKGError`
pub type DKGResult<A> = Result<A, DKGError>;

#[derive(Debug, Error)]
/// Errors which may occur while running one VSS instance
pub enum VSSError {
    /// InvalidThreshold is raised when creating a dealer with a threshold
    /// outside of the valid `[2, n]` range.
    #[error("threshold {0} is not in range [2,{1}]")]
    InvalidThreshold(usize, usize),

    /// PublicKeyNotFound is raised when the long-term key given to the
    /// verifier does not appear in the list of verifiers.
    #[error("public key not found in list of verifiers")]
    PublicKeyNotFound,

    /// IndexOutOfBounds is raised when a message points at a verifier index
    /// that does not exist.
    #[error("index {0} out of bounds: only {1} verifiers")]
    IndexOutOfBounds(Idx, usize),

    /// WrongRecipient is raised when a decrypted deal targets another
    /// verifier.
    #[error("deal targets index {0}, expected {1}")]
    WrongRecipient(Idx, Idx),

    /// InconsistentSessionId is raised when a message carries a session id
    /// different from the one this instance runs under.
    #[error("inconsistent session id")]
    InconsistentSessionId,

    /// NoDealBeforeResponse is raised when a response arrives before any
    /// deal has been processed.
    #[error("response received before any deal")]
    NoDealBeforeResponse,

    /// NoComplaintForJustification is raised when a justification answers a
    /// complaint this instance never recorded.
    #[error("no complaint recorded for this justification")]
    NoComplaintForJustification,

    /// JustificationForApproval is raised when a justification answers an
    /// approval.
    #[error("justification received for an approval")]
    JustificationForApproval,

    /// BadJustification is raised when the deal replayed inside a
    /// justification is itself invalid. The dealer is marked bad.
    #[error("justification replays an invalid deal: {0}")]
    BadJustification(StatusCode),

    /// NotCertified is raised when accessing data that only exists once the
    /// deal gathered enough approvals.
    #[error("not enough approvals or deal not certified")]
    NotCertified,

    /// DecryptionFailed is raised when the AEAD envelope of a deal does not
    /// authenticate.
    #[error(transparent)]
    Decryption(#[from] DHError),

    /// Signature is raised when a message signature does not verify.
    #[error("invalid message signature: {0}")]
    Signature(#[from] SchnorrError),

    /// InvalidEncoding is raised when a canonical byte encoding cannot be
    /// parsed or leaves trailing bytes.
    #[error("malformed message encoding")]
    InvalidEncoding,

    /// Encoding is raised when a group element inside a message is not
    /// canonical.
    #[error(transparent)]
    Curve(#[from] CurveError),

    /// MixedSessionIds is raised when recovering a secret from deals that do
    /// not belong to the same protocol run.
    #[error("deals with mixed session ids")]
    MixedSessionIds,

    /// InvalidRecovery is raised when there are not enough deals or shares
    /// to recover the secret.
    #[error(transparent)]
    Recovery(#[from] PolyError),
}

#[derive(Debug, Error)]
/// Errors which may occur during the DKG
pub enum DKGError {
    /// PublicKeyNotFound is raised when the private key given to the DKG init
    /// function does not yield a public key that is included in any group.
    #[error("public key not found in list of participants")]
    PublicKeyNotFound,

    /// DuplicatePublicKey is raised when two nodes of a group carry the same
    /// public key.
    #[error("duplicate public key in participant list at index {0}")]
    DuplicatePublicKey(Idx),

    /// InvalidThreshold is raised when creating a group with a threshold
    /// outside the valid range.
    #[error("threshold {0} is not in range [{1},{2}]")]
    InvalidThreshold(usize, usize, usize),

    /// EmptyOldGroup is raised when a resharing is started without any
    /// previous participant.
    #[error("resharing requires a non-empty previous group")]
    EmptyOldGroup,

    /// MissingPublicPolynomial is raised when a new member joins a resharing
    /// without the distributed public polynomial.
    #[error("resharing requires the distributed public polynomial")]
    MissingPublicPolynomial,

    /// NotDealer is raised when a node which is not part of the dealing
    /// group attempts to issue deals.
    #[error("this node cannot issue deals")]
    NotDealer,

    /// NotShareHolder is raised when a node which is not part of the new
    /// group attempts to receive deals.
    #[error("this node is not a share holder")]
    NotShareHolder,

    /// UnknownDealer is raised when a message refers to a dealer index that
    /// does not exist.
    #[error("unknown dealer index {0}")]
    UnknownDealer(Idx),

    /// SelfDealComplaint is raised when processing our own deal does not
    /// result in an approval. This is an internal fault: the deal we just
    /// created must verify.
    #[error("own deal gave a complaint: {0}")]
    SelfDealComplaint(StatusCode),

    /// NotCertified is raised when extracting the distributed key before
    /// enough deals are certified.
    #[error("distributed key not certified: QUAL size {0} < threshold {1}")]
    NotCertified(usize, usize),

    /// PublicShareMismatch is raised when the recovered share does not lie
    /// on the recovered public polynomial after a resharing.
    #[error("share does not verify against recovered public polynomial")]
    PublicShareMismatch,

    /// Signature is raised when a distributed message signature does not
    /// verify.
    #[error("invalid message signature: {0}")]
    Signature(#[from] SchnorrError),

    /// Vss is raised when the underlying VSS instance rejects a message.
    #[error(transparent)]
    Vss(#[from] VSSError),

    /// InvalidRecovery is raised when interpolation during the resharing
    /// assembly fails.
    #[error("invalid recovery during resharing: {0}")]
    InvalidRecovery(#[from] PolyError),
}
