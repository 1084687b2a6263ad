use axum::{RequestPartsExt, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, Result},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub name: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        name: String,
        jwt_secret: &str,
        expiration_hours: i64,
    ) -> Result<(String, Self)> {
        if expiration_hours <= 0 {
            return Err(AppError::Internal(
                "JWT expiration must be greater than 0".to_string(),
            ));
        }

        let now = Utc::now();
        let exp = now + Duration::hours(expiration_hours);

        let claims = Self {
            sub: user_id.to_string(),
            name,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(jwt_secret.as_ref()),
        )?;

        Ok((token, claims))
    }

    pub fn verify(token: &str, jwt_secret: &str) -> Result<Self> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(jwt_secret.as_ref()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }
}

#[derive(Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Authentication("Authorization token is required".to_string()))?;

        let claims = Claims::verify(bearer.token(), &state.config.jwt_secret)?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Authentication("Invalid token subject".to_string()))?;

        Ok(AuthUser {
            user_id,
            name: claims.name,
        })
    }
}

// Password hashing utilities
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    bcrypt::hash(password, cost).map_err(AppError::from)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(password, hash).map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let user_id = Uuid::new_v4();
        let (token, claims) = Claims::new(user_id, "alice".to_string(), "secret", 1).unwrap();

        let verified = Claims::verify(&token, "secret").unwrap();
        assert_eq!(verified.sub, user_id.to_string());
        assert_eq!(verified.name, "alice");
        assert_eq!(verified.exp, claims.exp);
    }

    #[test]
    fn token_with_wrong_secret_is_rejected() {
        let (token, _) = Claims::new(Uuid::new_v4(), "alice".to_string(), "secret", 1).unwrap();
        assert!(matches!(
            Claims::verify(&token, "other"),
            Err(AppError::Jwt(_))
        ));
    }

    #[test]
    fn non_positive_expiration_is_rejected() {
        assert!(Claims::new(Uuid::new_v4(), "alice".to_string(), "secret", 0).is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse", 4).unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }
}
