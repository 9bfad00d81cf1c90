use std::sync::Arc;

use skillmatrix_db::Database;
use tracing::error;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

/// Runs database work on the blocking pool so SQLite never stalls the
/// async runtime.
pub(crate) async fn run_blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed"))
        })?
}

/// Parses an optional JSON body: an empty body yields the default.
pub(crate) fn json_or_default<T>(body: &[u8]) -> Result<T, ApiError>
where
    T: serde::de::DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("invalid request body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillmatrix_types::api::EndCallRequest;

    #[test]
    fn empty_body_means_defaults() {
        let req: EndCallRequest = json_or_default(b"").unwrap();
        assert!(req.duration_seconds.is_none());

        let req: EndCallRequest = json_or_default(br#"{"duration_seconds": 42}"#).unwrap();
        assert_eq!(req.duration_seconds, Some(42));

        let err = json_or_default::<EndCallRequest>(b"{not json").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
