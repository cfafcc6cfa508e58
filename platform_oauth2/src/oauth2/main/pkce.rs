use sha2::{Digest, Sha256};

use crate::oauth2::errors::OAuth2Error;
use crate::platform::ChallengeEncoding;
use crate::utils::{base64url_encode, gen_random_string};

/// 32 random bytes, i.e. a 43 character verifier.
const VERIFIER_BYTES: usize = 32;

pub(super) fn generate_code_verifier() -> Result<String, OAuth2Error> {
    Ok(gen_random_string(VERIFIER_BYTES)?)
}

/// S256 challenge for `verifier` in the requested encoding.
///
/// Both encodings are computed from the digest itself; one is never derived
/// from the other's text.
pub fn code_challenge(verifier: &str, encoding: ChallengeEncoding) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    match encoding {
        ChallengeEncoding::Base64Url => base64url_encode(digest),
        ChallengeEncoding::Hex => hex::encode(digest),
    }
}
