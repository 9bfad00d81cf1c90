use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use tracing::{debug, info};

use skillmatrix_types::api::Claims;

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// Verify the bearer JWT, make sure the caller has a profile row, and attach
/// the claims for handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(ApiError::Unauthorized)?;

    let claims = decode_claims(&state.jwt_secret, bearer.token())?;

    let id = claims.sub.to_string();
    let email = claims.email.clone();
    let full_name = claims.full_name().map(str::to_string);
    run_blocking(&state, move |db| {
        if db.ensure_profile(&id, &email, full_name.as_deref())? {
            info!("Provisioned profile {}", id);
        }
        Ok(())
    })
    .await?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// HS256 with `exp` checked. Tokens from the identity provider carry an
/// audience we don't pin.
pub fn decode_claims(secret: &str, token: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            debug!("rejected token: {}", e);
            ApiError::Unauthorized
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use uuid::Uuid;

    fn token(secret: &str, exp: i64) -> String {
        let claims = serde_json::json!({
            "sub": Uuid::new_v4(),
            "email": "dev@example.com",
            "aud": "authenticated",
            "exp": exp,
        });
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn accepts_tokens_with_any_audience() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let claims = decode_claims("s3cret", &token("s3cret", exp)).unwrap();
        assert_eq!(claims.email, "dev@example.com");
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        assert!(matches!(decode_claims("other", &token("s3cret", exp)), Err(ApiError::Unauthorized)));

        let expired = chrono::Utc::now().timestamp() - 3600;
        assert!(matches!(decode_claims("s3cret", &token("s3cret", expired)), Err(ApiError::Unauthorized)));
    }
}
