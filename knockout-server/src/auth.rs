use std::fmt::{self, Debug, Formatter};

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use knockout_core::{Caller, Role};
use serde::{Deserialize, Serialize};

use crate::{config, Error};

/// The claims carried by a bearer token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The id of the user the token was issued to.
    pub sub: u64,
    #[serde(default)]
    pub role: Role,
    /// The team the user is a member of.
    #[serde(default)]
    pub team: Option<String>,
    pub iat: u64,
    pub nbf: u64,
    pub exp: u64,
}

impl Claims {
    /// Creates new claims for `caller`, valid from now for `ttl` seconds.
    pub fn new(sub: u64, caller: Caller, ttl: u64) -> Self {
        let now = Utc::now().timestamp() as u64;

        Self {
            sub,
            role: caller.role,
            team: caller.team,
            iat: now,
            nbf: now,
            exp: now + ttl,
        }
    }

    /// Returns the authorization context of the token holder.
    pub fn caller(&self) -> Caller {
        Caller {
            role: self.role,
            team: self.team.clone(),
        }
    }
}

/// A utility type to handle all token encoding, decoding and validating.
///
/// Tokens are issued elsewhere, the server only validates them using the shared secret.
#[derive(Clone)]
pub struct Authorization {
    alg: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl Authorization {
    /// Creates a new `Authorization` instance which uses the given [`Algorithm`] and secret.
    pub fn new(alg: Algorithm, secret: &[u8]) -> Self {
        let mut validation = Validation::new(alg);
        // `exp` and `nbf` are validated manually.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            alg,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Creates a new `Authorization` from the configured algorithm and secret.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptySecret`] if no secret is configured.
    pub fn from_config(config: &config::Authorization) -> Result<Self, Error> {
        if config.secret.is_empty() {
            return Err(Error::EmptySecret);
        }

        Ok(Self::new(config.alg, config.secret.as_bytes()))
    }

    /// Encodes the `claims` into a new token, leaving the claims unmodified.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if encoding the token fails.
    pub fn encode_token(&self, claims: &Claims) -> Result<String, Error> {
        let header = Header::new(self.alg);
        Ok(jsonwebtoken::encode(&header, claims, &self.encoding_key)?)
    }

    /// Decodes a token and validates its signature.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if the token is malformed or has an invalid signature.
    pub fn decode_token(&self, token: &str) -> Result<Claims, Error> {
        let data = jsonwebtoken::decode(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// Decodes a token and validates its signature and all time based claims.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if decoding the token fails or the token is not valid at the
    /// current time.
    pub fn validate_token(&self, token: &str) -> Result<Claims, Error> {
        let claims = self.decode_token(token)?;

        let now = Utc::now().timestamp() as u64;

        for claim in [claims.iat, claims.nbf, claims.exp] {
            if claim == 0 {
                return Err(Error::InvalidToken);
            }
        }

        if claims.exp < now || claims.nbf > now {
            return Err(Error::InvalidToken);
        }

        Ok(claims)
    }
}

impl Debug for Authorization {
    #[inline]
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Authorization {{ alg: {:?}, encoding_key, decoding_key }}", self.alg)
    }
}
