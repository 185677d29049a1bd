use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

type TokenResult = Result<jsonwebtoken::TokenData<Claims>, jsonwebtoken::errors::Error>;

// The subset of the Supabase access token claims this application reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
  pub sub: String,
  #[serde(default)]
  pub email: String,
  pub exp: i64, // Expiration time (as UTC timestamp)
  #[serde(default)]
  pub iat: i64, // Issued at (as UTC timestamp)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub session_id: Option<String>,
}

impl Claims {
  pub fn new(sub: &str, email: &str, ttl: chrono::Duration) -> Self {
    let now = Utc::now();
    Self {
      sub: sub.to_owned(),
      email: email.to_owned(),
      exp: (now + ttl).timestamp(),
      iat: now.timestamp(),
      session_id: None,
    }
  }

  pub fn expires_at(&self) -> DateTime<Utc> {
    Utc.timestamp(self.exp, 0)
  }
}

pub fn create_token(claims: &Claims, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
  let header = Header::default();
  let encoding_key = EncodingKey::from_secret(secret.as_ref());

  jsonwebtoken::encode(&header, claims, &encoding_key)
}

pub fn decode_token(token: &str, secret: &str) -> TokenResult {
  let validation = Validation::default();
  let decoding_key = DecodingKey::from_secret(secret.as_ref());

  jsonwebtoken::decode::<Claims>(token, &decoding_key, &validation)
}

// Reads the claims without verifying the signature. The identity provider
// stays the authority on whether the token is valid; this is only used to
// know when to refresh.
pub fn get_token_payload(token: &str) -> TokenResult {
  jsonwebtoken::dangerous_insecure_decode::<Claims>(token)
}

pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
  get_token_payload(token)
    .ok()
    .map(|payload| payload.claims.expires_at())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn created_tokens_decode_with_the_same_secret() {
    let claims = Claims::new("u1", "a@b.com", chrono::Duration::hours(1));
    let token = create_token(&claims, "secret").unwrap();

    let decoded = decode_token(&token, "secret").unwrap();
    assert_eq!(decoded.claims.sub, "u1");
    assert_eq!(decoded.claims.email, "a@b.com");
    assert!(decode_token(&token, "other").is_err());
  }

  #[test]
  fn expiry_is_read_without_the_secret() {
    let claims = Claims::new("u1", "a@b.com", chrono::Duration::minutes(5));
    let token = create_token(&claims, "secret").unwrap();

    let expires_at = expires_at(&token).unwrap();
    assert_eq!(expires_at.timestamp(), claims.exp);
  }

  #[test]
  fn opaque_tokens_have_no_expiry() {
    assert!(expires_at("not-a-jwt").is_none());
  }
}
