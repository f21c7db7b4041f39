use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Access levels, weakest first. `Deny` grants nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Deny,
    Read,
    Edit,
    Full,
    Root,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Deny => "deny",
            AccessLevel::Read => "read",
            AccessLevel::Edit => "edit",
            AccessLevel::Full => "full",
            AccessLevel::Root => "root",
        }
    }

    pub fn allows(&self, required: AccessLevel) -> bool {
        *self != AccessLevel::Deny && *self >= required
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deny" => Ok(AccessLevel::Deny),
            "read" => Ok(AccessLevel::Read),
            "edit" => Ok(AccessLevel::Edit),
            "full" => Ok(AccessLevel::Full),
            "root" => Ok(AccessLevel::Root),
            other => Err(format!("unknown access level '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    pub access: AccessLevel,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: Option<String>, access: AccessLevel, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id,
            email,
            access,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
    #[error("JWT secret not configured")]
    InvalidSecret,
}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_levels_are_ordered() {
        assert!(AccessLevel::Root.allows(AccessLevel::Edit));
        assert!(AccessLevel::Edit.allows(AccessLevel::Read));
        assert!(!AccessLevel::Read.allows(AccessLevel::Edit));
        assert!(!AccessLevel::Full.allows(AccessLevel::Root));
        assert!(!AccessLevel::Deny.allows(AccessLevel::Deny));
        assert_eq!("EDIT".parse::<AccessLevel>(), Ok(AccessLevel::Edit));
        assert!("admin".parse::<AccessLevel>().is_err());
    }

    #[test]
    fn token_round_trips_claims() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, Some("gp@example.com".to_string()), AccessLevel::Full, 1);
        let token = generate_jwt(&claims, "secret").unwrap();
        let decoded = decode_jwt(&token, "secret").unwrap();
        assert_eq!(decoded.sub, user_id);
        assert_eq!(decoded.access, AccessLevel::Full);
        assert!(decode_jwt(&token, "other-secret").is_err());
    }

    #[test]
    fn empty_secret_is_rejected() {
        let claims = Claims::new(Uuid::new_v4(), None, AccessLevel::Read, 1);
        assert!(matches!(generate_jwt(&claims, ""), Err(JwtError::InvalidSecret)));
    }
}
