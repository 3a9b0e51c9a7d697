/// The default backend over secp256k1.
pub mod secp256k1;
