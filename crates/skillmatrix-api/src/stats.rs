use axum::{Extension, extract::State};

use skillmatrix_db::models::PlatformCounts;
use skillmatrix_types::api::{Claims, PlatformStats};

use crate::error::ApiError;
use crate::extract::Json;
use crate::state::{AppState, run_blocking};

pub fn platform_stats(counts: &PlatformCounts) -> PlatformStats {
    let decided = counts.accepted + counts.rejected;
    let placement_rate = if decided > 0 {
        (counts.accepted as f64 * 100.0 / decided as f64).round() as u8
    } else {
        0
    };

    PlatformStats {
        active_candidates: counts.active_candidates.max(0) as usize,
        open_positions: counts.open_positions.max(0) as usize,
        interviews_scheduled: (counts.interviewed + counts.pending_calls).max(0) as usize,
        placement_rate,
    }
}

pub async fn get_platform_stats(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<PlatformStats>, ApiError> {
    let counts = run_blocking(&state, |db| Ok(db.platform_counts()?)).await?;
    Ok(Json(platform_stats(&counts)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_rate_counts_decided_applications_only() {
        let counts = PlatformCounts {
            active_candidates: 4,
            open_positions: 2,
            interviewed: 1,
            pending_calls: 2,
            accepted: 1,
            rejected: 2,
        };
        let stats = platform_stats(&counts);
        assert_eq!(stats.interviews_scheduled, 3);
        assert_eq!(stats.placement_rate, 33);

        assert_eq!(platform_stats(&PlatformCounts::default()), PlatformStats::default());
    }
}
