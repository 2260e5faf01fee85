//! JWT token issuance and verification
//!
//! Tokens are signed bearer credentials carrying subject id, email, platform
//! role and expiry. This is distinct from invitation tokens, which are
//! opaque and carry no claims.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::account::{Account, PlatformRole};
use crate::domain::DomainError;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account ID)
    pub sub: String,
    /// Account email
    pub email: String,
    /// Platform role at issuance time
    pub role: PlatformRole,
    /// Issued at timestamp (Unix epoch)
    pub iat: i64,
    /// Expiration timestamp (Unix epoch)
    pub exp: i64,
}

impl Claims {
    /// Create new claims for an account
    pub fn new(account: &Account, ttl_hours: u64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(ttl_hours as i64);

        Self {
            sub: account.id().to_string(),
            email: account.email().to_string(),
            role: account.platform_role(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        }
    }

    /// Check if the token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Configuration for the JWT issuer
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Token lifetime in hours
    pub ttl_hours: u64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>, ttl_hours: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl_hours,
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-in-production".to_string(),
            ttl_hours: 24,
        }
    }
}

/// Trait for credential issuance
pub trait TokenIssuer: Send + Sync + Debug {
    /// Sign a credential for an account
    fn sign(&self, account: &Account) -> Result<String, DomainError>;

    /// Verify a credential and return the claims
    fn verify(&self, token: &str) -> Result<Claims, DomainError>;

    /// Credential lifetime in hours
    fn ttl_hours(&self) -> u64;
}

/// HS256 JWT issuer
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("ttl_hours", &self.config.ttl_hours)
            .field("secret", &"[hidden]")
            .finish()
    }
}

impl JwtService {
    /// Create a new JWT service with the given configuration
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }
}

impl TokenIssuer for JwtService {
    fn sign(&self, account: &Account) -> Result<String, DomainError> {
        let claims = Claims::new(account, self.config.ttl_hours);

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| DomainError::internal(format!("Failed to sign credential: {}", e)))
    }

    fn verify(&self, token: &str) -> Result<Claims, DomainError> {
        let validation = Validation::default();

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| DomainError::auth(format!("Invalid credential: {}", e)))?;

        Ok(token_data.claims)
    }

    fn ttl_hours(&self) -> u64 {
        self.config.ttl_hours
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::AccountId;

    fn create_test_account() -> Account {
        Account::new(AccountId::new(), "alice@example.com", "hash", "Alice")
    }

    fn create_service() -> JwtService {
        JwtService::new(JwtConfig::new("test-secret-key-12345", 24))
    }

    #[test]
    fn test_sign_and_verify() {
        let service = create_service();
        let account = create_test_account();

        let token = service.sign(&account).unwrap();
        assert!(!token.is_empty());

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, account.id().to_string());
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.role, PlatformRole::User);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_claims_carry_admin_role() {
        let service = create_service();
        let mut account = create_test_account();
        account.set_platform_role(PlatformRole::Admin);

        let claims = service.verify(&service.sign(&account).unwrap()).unwrap();
        assert_eq!(claims.role, PlatformRole::Admin);
    }

    #[test]
    fn test_invalid_token() {
        let service = create_service();

        let result = service.verify("invalid-token");
        assert!(result.unwrap_err().is_auth());
    }

    #[test]
    fn test_wrong_secret() {
        let service1 = JwtService::new(JwtConfig::new("secret-1", 24));
        let service2 = JwtService::new(JwtConfig::new("secret-2", 24));

        let token = service1.sign(&create_test_account()).unwrap();
        assert!(service2.verify(&token).is_err());
    }

    #[test]
    fn test_expired_token() {
        let service = create_service();
        let account = create_test_account();

        // Craft claims already in the past
        let past = Utc::now() - Duration::hours(2);
        let claims = Claims {
            sub: account.id().to_string(),
            email: account.email().to_string(),
            role: account.platform_role(),
            iat: past.timestamp(),
            exp: (past + Duration::hours(1)).timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key-12345"),
        )
        .unwrap();

        assert!(service.verify(&token).is_err());
    }
}
