use std::sync::Arc;
use std::time::Duration;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use serde::{Deserialize, Serialize};

use paygate_common::error::{Result, ServiceError};
use paygate_common::model::User;
use paygate_common::observe::observed;
use paygate_common::requests::{LoginRequest, RegisterRequest};
use paygate_ledger::{NewUser, UserRepository};

const SERVICE: &str = "auth_service";

/// Default token lifetime.
pub const TOKEN_TTL: Duration = Duration::from_secs(60 * 60 * 12);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: u64,
    pub email: String,
    pub exp: i64,
}

/// Issues and verifies access tokens: `hex(claims).hex(signature)`, signed
/// with the process key. Stateless validation on every request.
pub struct TokenSigner {
    keypair: SigningKey,
}

impl TokenSigner {
    pub fn new(keypair: SigningKey) -> Self {
        Self { keypair }
    }

    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        let seed: &[u8; 32] = seed
            .try_into()
            .map_err(|_| ServiceError::internal("token_sign", "token seed must be 32 bytes"))?;
        Ok(Self::new(SigningKey::from_bytes(seed)))
    }

    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self::new(SigningKey::generate(&mut csprng))
    }

    pub fn issue(&self, user: &User, ttl: Duration) -> Result<String> {
        let claims = TokenClaims {
            sub: user.id,
            email: user.email.clone(),
            exp: Utc::now().timestamp() + ttl.as_secs() as i64,
        };
        let payload =
            serde_json::to_vec(&claims).map_err(|e| ServiceError::internal("token_sign", e))?;
        let signature = self.keypair.sign(&payload);
        Ok(format!(
            "{}.{}",
            hex::encode(&payload),
            hex::encode(signature.to_bytes())
        ))
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims> {
        let (payload_hex, signature_hex) = token
            .split_once('.')
            .ok_or_else(|| ServiceError::unauthorized("malformed token"))?;
        let payload = hex::decode(payload_hex)
            .map_err(|_| ServiceError::unauthorized("malformed token"))?;
        let signature_bytes = hex::decode(signature_hex)
            .map_err(|_| ServiceError::unauthorized("malformed token"))?;
        let signature = Signature::from_slice(&signature_bytes)
            .map_err(|_| ServiceError::unauthorized("malformed token"))?;
        self.keypair
            .verifying_key()
            .verify(&payload, &signature)
            .map_err(|_| ServiceError::unauthorized("invalid token signature"))?;
        let claims: TokenClaims = serde_json::from_slice(&payload)
            .map_err(|_| ServiceError::unauthorized("malformed token"))?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(ServiceError::unauthorized("token expired"));
        }
        Ok(claims)
    }
}

/// Registration, login and bearer-token validation. Failed logins are not
/// distinguishable by cause.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    signer: TokenSigner,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, signer: TokenSigner) -> Self {
        Self {
            users,
            signer,
            token_ttl: TOKEN_TTL,
        }
    }

    fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::internal("create_user", e))
    }

    fn verify_password(password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<User> {
        let args = format!("email={}", req.email);
        observed(SERVICE, "register", args, async {
            if req.email.trim().is_empty() || !req.email.contains('@') {
                return Err(ServiceError::validation("email is invalid"));
            }
            if req.password.len() < 8 {
                return Err(ServiceError::validation(
                    "password must be at least 8 characters",
                ));
            }
            let password_hash = Self::hash_password(&req.password)?;
            self.users
                .create(NewUser {
                    firstname: req.firstname.trim().to_string(),
                    lastname: req.lastname.trim().to_string(),
                    email: req.email.trim().to_string(),
                    password_hash,
                })
                .await
        })
        .await
    }

    pub async fn login(&self, req: LoginRequest) -> Result<(User, String)> {
        let args = format!("email={}", req.email);
        observed(SERVICE, "login", args, async {
            let user = match self.users.find_by_email(req.email.trim()).await {
                Ok(user) => user,
                Err(_) => return Err(ServiceError::unauthorized("invalid credentials")),
            };
            if user.deleted_at.is_some()
                || !Self::verify_password(&req.password, &user.password_hash)
            {
                return Err(ServiceError::unauthorized("invalid credentials"));
            }
            let token = self.signer.issue(&user, self.token_ttl)?;
            Ok((user, token))
        })
        .await
    }

    pub async fn validate(&self, token: &str) -> Result<TokenClaims> {
        observed(SERVICE, "validate", String::new(), async {
            self.signer.verify(token)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            firstname: "Ada".into(),
            lastname: "Lovelace".into(),
            email: "ada@example.com".into(),
            password_hash: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let signer = TokenSigner::generate();
        let token = signer.issue(&user(), Duration::from_secs(60)).unwrap();
        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.email, "ada@example.com");
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let signer = TokenSigner::generate();
        let token = signer.issue(&user(), Duration::from_secs(0)).unwrap();
        let err = signer.verify(&token).unwrap_err();
        assert_eq!(err.reason(), "Unauthorized");
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let signer = TokenSigner::generate();
        let other = TokenSigner::generate();
        let token = signer.issue(&user(), Duration::from_secs(60)).unwrap();
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = AuthService::hash_password("correct horse battery").unwrap();
        assert!(AuthService::verify_password("correct horse battery", &hash));
        assert!(!AuthService::verify_password("wrong", &hash));
    }
}
