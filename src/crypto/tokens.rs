use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CryptoError;
use crate::models::users::UserType;

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Claims {
    sub: String,
    used_for: UserType,
    exp: i64,
    iat: i64,
    jti: String,
}

pub struct GenerateTokenRequest {
    pub user_id: String,
    pub used_for: UserType,
    pub expire_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct GenerateTokenResponse {
    pub token_id: String,
    pub token_string: String,
}

pub struct VerifyTokenRequest<'a> {
    pub token_string: &'a str,
    pub used_for: UserType,
}

#[derive(Debug, Clone)]
pub struct VerifyTokenResponse {
    pub token_id: String,
    pub user_id: String,
}

/// Issues and verifies HS256 tokens. Revocation is not checked here; refresh
/// tokens are revoked through their session rows.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn generate_token(
        &self,
        request: GenerateTokenRequest,
    ) -> Result<GenerateTokenResponse, CryptoError> {
        let token_id = Uuid::new_v4().hyphenated().to_string();
        let claims = Claims {
            sub: request.user_id,
            used_for: request.used_for,
            exp: request.expire_at.timestamp(),
            iat: Utc::now().timestamp(),
            jti: token_id.clone(),
        };

        let token_string = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| CryptoError::InvalidToken(format!("failed to sign token: {e}")))?;

        Ok(GenerateTokenResponse {
            token_id,
            token_string,
        })
    }

    pub fn verify_token(
        &self,
        request: VerifyTokenRequest<'_>,
    ) -> Result<VerifyTokenResponse, CryptoError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(request.token_string, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| CryptoError::InvalidToken(e.to_string()))?;

        if claims.used_for != request.used_for {
            return Err(CryptoError::InvalidToken(format!(
                "token issued for {:?}, expected {:?}",
                claims.used_for, request.used_for
            )));
        }

        Ok(VerifyTokenResponse {
            token_id: claims.jti,
            user_id: claims.sub,
        })
    }
}
