//! RS256 tokens that authenticate as the GitHub App itself

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::Result;

/// App tokens are only used to mint installation tokens, so they live briefly
pub const APP_TOKEN_TTL_SECONDS: i64 = 60;

#[derive(Debug, Serialize, Deserialize)]
pub struct AppClaims {
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

#[derive(Clone)]
pub struct AppSigner {
    app_id: u64,
    key: EncodingKey,
}

impl AppSigner {
    pub fn from_pem(app_id: u64, private_key_pem: &[u8]) -> Result<Self> {
        Ok(Self {
            app_id,
            key: EncodingKey::from_rsa_pem(private_key_pem)?,
        })
    }

    pub fn app_id(&self) -> u64 {
        self.app_id
    }

    pub fn sign(&self) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = AppClaims {
            iat: now,
            exp: now + APP_TOKEN_TTL_SECONDS,
            iss: self.app_id.to_string(),
        };
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &self.key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    const PRIVATE_KEY: &[u8] = include_bytes!("../tests/fixtures/app-key.pem");
    const PUBLIC_KEY: &[u8] = include_bytes!("../tests/fixtures/app-key.pub.pem");

    #[test]
    fn test_app_token_claims() {
        let signer = AppSigner::from_pem(1234, PRIVATE_KEY).unwrap();
        let token = signer.sign().unwrap();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&["1234"]);
        let decoded = decode::<AppClaims>(
            &token,
            &DecodingKey::from_rsa_pem(PUBLIC_KEY).unwrap(),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.claims.iss, "1234");
        assert_eq!(
            decoded.claims.exp - decoded.claims.iat,
            APP_TOKEN_TTL_SECONDS
        );
    }

    #[test]
    fn test_rejects_invalid_key() {
        assert!(AppSigner::from_pem(1, b"not a key").is_err());
    }
}
