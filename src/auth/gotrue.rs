use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{Identity, IdentityProvider, Metadata, Session};
use crate::errors::Error;
use crate::lib::{token, util};
use crate::settings::Settings;

// Used when neither the token nor the response carries an expiry.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Supabase auth (GoTrue) over its REST API.
#[derive(Clone)]
pub struct GoTrue {
  pub base_url: String,
  pub anon_key: String,
  pub client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token: String,
  refresh_token: Option<String>,
  expires_in: Option<i64>,
  user: UserResponse,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
  id: String,
  email: Option<String>,
  #[serde(default)]
  user_metadata: Metadata,
}

impl From<UserResponse> for Identity {
  fn from(user: UserResponse) -> Self {
    Self {
      id: user.id,
      email: user.email.unwrap_or_default(),
      metadata: user.user_metadata,
    }
  }
}

impl TokenResponse {
  fn into_session(self) -> Session {
    let expires_at = token::expires_at(&self.access_token).unwrap_or_else(|| {
      let expires_in = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
      Utc::now() + chrono::Duration::seconds(expires_in)
    });

    Session {
      access_token: self.access_token,
      refresh_token: self.refresh_token,
      expires_at,
      identity: self.user.into(),
    }
  }
}

impl GoTrue {
  pub fn new(settings: &Settings) -> Result<Self, Error> {
    let url = util::parse_url(&settings.supabase.url)?;
    let client = reqwest::Client::builder()
      .timeout(settings.session.request_timeout())
      .build()
      .map_err(Error::auth_unavailable)?;

    Ok(Self {
      base_url: format!("{}/auth/v1", url.as_str().trim_end_matches('/')),
      anon_key: settings.supabase.anon_key.clone(),
      client,
    })
  }

  async fn token(&self, grant_type: &str, body: serde_json::Value) -> Result<Session, Error> {
    let res = self
      .client
      .post(format!("{}/token", self.base_url).as_str())
      .query(&[("grant_type", grant_type)])
      .header("apikey", self.anon_key.as_str())
      .json(&body)
      .send()
      .await
      .map_err(Error::auth_unavailable)?;

    check_response(res)
      .await?
      .json::<TokenResponse>()
      .await
      .map(TokenResponse::into_session)
      .map_err(Error::auth_unavailable)
  }
}

#[async_trait]
impl IdentityProvider for GoTrue {
  async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, Error> {
    debug!("Requesting password grant for {}", email);
    self
      .token("password", json!({ "email": email, "password": password }))
      .await
  }

  async fn get_user(&self, access_token: &str) -> Result<Identity, Error> {
    let res = self
      .client
      .get(format!("{}/user", self.base_url).as_str())
      .header("apikey", self.anon_key.as_str())
      .bearer_auth(access_token)
      .send()
      .await
      .map_err(Error::auth_unavailable)?;

    check_response(res)
      .await?
      .json::<UserResponse>()
      .await
      .map(Identity::from)
      .map_err(Error::auth_unavailable)
  }

  async fn refresh(&self, refresh_token: &str) -> Result<Session, Error> {
    debug!("Refreshing access token");
    self
      .token("refresh_token", json!({ "refresh_token": refresh_token }))
      .await
  }

  async fn sign_out(&self, access_token: &str) -> Result<(), Error> {
    let res = self
      .client
      .post(format!("{}/logout", self.base_url).as_str())
      .header("apikey", self.anon_key.as_str())
      .bearer_auth(access_token)
      .send()
      .await
      .map_err(Error::auth_unavailable)?;

    match check_response(res).await {
      Ok(_) => Ok(()),
      // The token is already dead, which is what signing out wants.
      Err(Error::Unauthenticated) => Ok(()),
      Err(err) => Err(err),
    }
  }
}

async fn check_response(res: Response) -> Result<Response, Error> {
  let status = res.status();
  if status.is_success() {
    return Ok(res);
  }

  let body = res.text().await.unwrap_or_default();
  Err(classify_failure(status, &body))
}

fn classify_failure(status: StatusCode, body: &str) -> Error {
  match status {
    StatusCode::BAD_REQUEST
    | StatusCode::UNAUTHORIZED
    | StatusCode::FORBIDDEN
    | StatusCode::NOT_FOUND
    | StatusCode::UNPROCESSABLE_ENTITY => {
      debug!("Identity provider rejected the request ({}): {}", status, body);
      Error::Unauthenticated
    }
    _ => Error::AuthUnavailable(format!("{} {}", status, body)),
  }
}
