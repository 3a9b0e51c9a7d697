//! Verifiable secret sharing.
//!
//! One dealer shares a secret with a group of verifiers: every verifier
//! receives an encrypted, authenticated deal carrying its share together
//! with the commitments of the secret polynomial, and answers with a signed
//! approval or complaint. Complaints force the dealer to reveal the disputed
//! share in a justification; an invalid justification brands the dealer as
//! bad. A deal that gathered enough approvals under the applicable timeout
//! regime is *certified*, and any `t` certified shares recover the secret.

mod aggregator;
mod dealer;
mod types;
mod verifier;

pub use aggregator::Aggregator;
pub use dealer::Dealer;
pub use types::{
    session_id, Deal, EncryptedDeal, Justification, Response, Status, StatusCode,
};
pub(crate) use types::{justification_hash, SliceReader};
pub use verifier::Verifier;

use crate::errors::{VSSError, VSSResult};
use threshold_ec::{
    group::Curve,
    poly::Poly,
};

/// Recovers the secret shared by a dealer by gathering at least `t` deals
/// from the verifiers. All deals must belong to the same session.
pub fn recover_secret<C: Curve>(deals: &[Deal<C>], t: usize) -> VSSResult<C::Scalar> {
    let shares = deals
        .iter()
        .map(|deal| {
            if deal.session_id != deals[0].session_id {
                return Err(VSSError::MixedSessionIds);
            }
            Ok(deal.sec_share.clone())
        })
        .collect::<VSSResult<Vec<_>>>()?;

    Ok(Poly::recover(t, shares)?)
}
