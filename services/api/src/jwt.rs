//! JWT service for bearer token issuance and verification
//!
//! Tokens are signed with HS256. The signing secret and expiry are required
//! configuration: protected routes are useless without them, so their absence
//! is a startup failure rather than a silent default.

use anyhow::Result;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared secret for signing and verifying tokens
    pub secret: String,
    /// Token lifetime in seconds
    pub expires_in_secs: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: shared signing secret (required)
    /// - `JWT_EXPIRES_IN`: token lifetime in seconds (required)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        let expires_in_secs = std::env::var("JWT_EXPIRES_IN")
            .map_err(|_| anyhow::anyhow!("JWT_EXPIRES_IN environment variable not set"))?
            .parse()
            .map_err(|_| anyhow::anyhow!("JWT_EXPIRES_IN must be a number of seconds"))?;

        Ok(JwtConfig {
            secret,
            expires_in_secs,
        })
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// User role
    pub role: String,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expires_in_secs: u64,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: &JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        // Pinning the algorithm here makes alg-confusion impossible: a token
        // carrying any header other than HS256 fails verification outright.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        JwtService {
            encoding_key,
            decoding_key,
            validation,
            expires_in_secs: config.expires_in_secs,
        }
    }

    /// Issue a signed, time-boxed bearer token for a user
    pub fn issue_token(&self, user_id: Uuid, role: &str) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
            .as_secs();

        let claims = Claims {
            sub: user_id,
            role: role.to_string(),
            iat: now,
            exp: now + self.expires_in_secs,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?;
        Ok(token)
    }

    /// Verify a token and return its claims
    ///
    /// Fails when the signature is invalid, the token is malformed or
    /// expired, or the token was signed with a different algorithm.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn test_service(secret: &str) -> JwtService {
        JwtService::new(&JwtConfig {
            secret: secret.to_string(),
            expires_in_secs: 3600,
        })
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let service = test_service("test-secret");
        let user_id = Uuid::new_v4();

        let token = service.issue_token(user_id, "admin").unwrap();
        let claims = service.verify_token(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, "admin");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_rejects_wrong_secret() {
        let service = test_service("test-secret");
        let other = test_service("another-secret");

        let token = service.issue_token(Uuid::new_v4(), "user").unwrap();
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn test_rejects_malformed_token() {
        let service = test_service("test-secret");
        assert!(service.verify_token("not.a.token").is_err());
        assert!(service.verify_token("").is_err());
    }

    #[test]
    fn test_rejects_expired_token() {
        let service = test_service("test-secret");

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: "user".to_string(),
            // Well past the default validation leeway
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(service.verify_token(&token).is_err());
    }

    #[test]
    fn test_rejects_foreign_algorithm() {
        let service = test_service("test-secret");

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: "user".to_string(),
            iat: now,
            exp: now + 3600,
        };
        // Same secret, different algorithm in the header
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(service.verify_token(&token).is_err());
    }

    #[test]
    #[serial]
    fn test_config_requires_secret() {
        unsafe {
            std::env::remove_var("JWT_SECRET");
            std::env::set_var("JWT_EXPIRES_IN", "3600");
        }
        assert!(JwtConfig::from_env().is_err());

        unsafe {
            std::env::remove_var("JWT_EXPIRES_IN");
        }
    }

    #[test]
    #[serial]
    fn test_config_requires_expiry() {
        unsafe {
            std::env::set_var("JWT_SECRET", "test-secret");
            std::env::remove_var("JWT_EXPIRES_IN");
        }
        assert!(JwtConfig::from_env().is_err());

        unsafe {
            std::env::set_var("JWT_EXPIRES_IN", "not-a-number");
        }
        assert!(JwtConfig::from_env().is_err());

        unsafe {
            std::env::set_var("JWT_EXPIRES_IN", "86400");
        }
        let config = JwtConfig::from_env().unwrap();
        assert_eq!(config.expires_in_secs, 86400);
        assert_eq!(config.secret, "test-secret");

        unsafe {
            std::env::remove_var("JWT_SECRET");
            std::env::remove_var("JWT_EXPIRES_IN");
        }
    }
}
