use anyhow::Result;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::UserId;

/// JWT Claims - data stored in the token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,     // Subject (user_id as string)
    pub user_id: Uuid,   // User UUID
    pub name: String,    // Display name, used for system messages
    pub is_admin: bool,  // Staff flag, unlocks admin-only query options
    pub exp: i64,        // Expiration timestamp
    pub iat: i64,        // Issued at timestamp
    pub iss: String,     // Issuer
    pub jti: String,     // JWT ID (unique token identifier)
}

impl Claims {
    pub fn user_id(&self) -> UserId {
        UserId::from_uuid(self.user_id)
    }
}

/// JWT Service - creates and verifies HS256 tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtService {
    pub fn new(secret: &str, issuer: String) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
        }
    }

    /// Create a token for a user
    ///
    /// Tokens are normally minted by the identity provider; this is used by
    /// the admin CLI and tests. Expires after 24 hours.
    pub fn create_token(&self, user_id: UserId, name: String, is_admin: bool) -> Result<String> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::hours(24);

        let claims = Claims {
            sub: user_id.to_string(),
            user_id: user_id.into_uuid(),
            name,
            is_admin,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    /// Verify and decode a token
    ///
    /// Returns claims if the token is valid, unexpired and from our issuer
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_verify_token() {
        let service = JwtService::new("test_secret_key", "chat-core".to_string());
        let user_id = UserId::new();

        let token = service
            .create_token(user_id, "Ada".to_string(), true)
            .unwrap();

        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.user_id(), user_id);
        assert_eq!(claims.name, "Ada");
        assert!(claims.is_admin);
        assert_eq!(claims.iss, "chat-core");
    }

    #[test]
    fn test_invalid_token() {
        let service = JwtService::new("test_secret_key", "chat-core".to_string());
        assert!(service.verify_token("invalid_token").is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let service1 = JwtService::new("secret1", "chat-core".to_string());
        let service2 = JwtService::new("secret2", "chat-core".to_string());

        let token = service1
            .create_token(UserId::new(), "Ada".to_string(), false)
            .unwrap();

        assert!(service2.verify_token(&token).is_err());
    }

    #[test]
    fn test_wrong_issuer() {
        let minted = JwtService::new("secret", "someone-else".to_string());
        let verifier = JwtService::new("secret", "chat-core".to_string());

        let token = minted
            .create_token(UserId::new(), "Ada".to_string(), false)
            .unwrap();

        assert!(verifier.verify_token(&token).is_err());
    }

    #[test]
    fn test_expiry_is_24_hours() {
        let service = JwtService::new("test_secret_key", "chat-core".to_string());
        let token = service
            .create_token(UserId::new(), "Ada".to_string(), false)
            .unwrap();

        let claims = service.verify_token(&token).unwrap();
        let expires_in = claims.exp - chrono::Utc::now().timestamp();
        assert!(expires_in > 23 * 3600);
        assert!(expires_in <= 24 * 3600);
    }
}
