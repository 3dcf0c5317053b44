use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation};
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::mongodb::Id;

use super::Role;

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

const BEARER_PREFIX: &str = "Bearer ";

/// An authenticated user, as asserted by a signed token.
///
/// Tokens are minted by the authentication service, which shares our
/// `jwt_secret`. They are accepted from an `Authorization: Bearer` header or
/// the [`AUTH_TOKEN_COOKIE`] cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthToken {
    pub id: Id,
    pub role: Role,
}

impl AuthToken {
    pub fn new(id: Id, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Check that this user may manage something owned by `owner`.
    pub fn ensure_owner_or_admin(&self, owner: Id) -> Result<()> {
        if self.id == owner || self.is_admin() {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "User {} does not own this incident",
                self.id
            )))
        }
    }

    /// Verify and decode a signed token.
    pub fn decode(token: &str, config: &Config) -> Result<Self> {
        let claims = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )?
        .claims;
        let id = claims
            .sub
            .parse()
            .map_err(|_| Error::Unauthenticated("Malformed token subject".to_string()))?;
        Ok(Self::new(id, claims.rol))
    }
}

/// Token claims: the user, their role, and an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    sub: String,
    rol: Role,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

/// Find the raw token in the request, preferring the header.
fn raw_token<'r>(req: &'r Request<'_>) -> Option<&'r str> {
    let header = req
        .headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix(BEARER_PREFIX));
    header.or_else(|| {
        req.cookies()
            .get(AUTH_TOKEN_COOKIE)
            .map(|cookie| cookie.value())
    })
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthToken {
    type Error = Error;

    /// Get and verify the caller's token. Fails with 401 if it is missing or
    /// invalid; use `Option<AuthToken>` where anonymous access is allowed.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(config) = req.rocket().state::<Config>() else {
            error!("Config is not managed");
            return Outcome::Error((
                Status::InternalServerError,
                Error::Unauthenticated("Server misconfigured".to_string()),
            ));
        };

        let Some(token) = raw_token(req) else {
            return Outcome::Error((
                Status::Unauthorized,
                Error::Unauthenticated("No authentication token".to_string()),
            ));
        };

        match Self::decode(token, config) {
            Ok(token) => Outcome::Success(token),
            Err(err) => {
                debug!("Rejected authentication token: {err}");
                Outcome::Error((Status::Unauthorized, err))
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_survive_signing() {
        let config = Config::example();
        let token = AuthToken::admin_example();
        let encoded = token.encode(&config).unwrap();
        assert_eq!(AuthToken::decode(&encoded, &config).unwrap(), token);
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let token = AuthToken::user_example();
        let encoded = token.encode(&Config::example()).unwrap();
        let other = Config::example_with_secret("someone else's secret");
        assert!(matches!(
            AuthToken::decode(&encoded, &other),
            Err(Error::Jwt(_))
        ));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let config = Config::example();
        let encoded = AuthToken::user_example()
            .encode_until(&config, Utc::now() - chrono::Duration::hours(1))
            .unwrap();
        assert!(matches!(
            AuthToken::decode(&encoded, &config),
            Err(Error::Jwt(_))
        ));
    }

    #[test]
    fn only_owner_or_admin_may_manage() {
        let owner = AuthToken::user_example();
        assert!(owner.ensure_owner_or_admin(owner.id).is_ok());
        assert!(AuthToken::admin_example()
            .ensure_owner_or_admin(owner.id)
            .is_ok());
        assert!(matches!(
            AuthToken::user_example().ensure_owner_or_admin(owner.id),
            Err(Error::Forbidden(_))
        ));
    }
}
