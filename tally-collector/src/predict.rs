//! Final-result trend extrapolation
//!
//! A naive linear model: with `p` percent of precincts counted, a party's
//! final tally is assumed to scale to `votes * 100 / p`, and its share of
//! the vote is assumed already stable. This is not a statistical estimate;
//! callers must treat the output as approximate.

use std::collections::HashSet;

use serde::Serialize;
use sqlx::SqlitePool;

use tally_common::Result;

use crate::db::queries;

/// Recent observations scanned per region, bounding the per-party dedup.
const RECENT_RESULTS: i64 = 20;

#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub region_code: String,
    pub counted_percentage: f64,
    pub parties: Vec<PartyPrediction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartyPrediction {
    pub party_code: String,
    pub party_name: String,
    pub current_votes: i64,
    pub current_percentage: f64,
    pub predicted_votes: i64,
    pub predicted_percentage: f64,
}

/// Extrapolate final results for a region. `None` when the region is
/// unknown, has no progress observation, or nothing has been counted yet
/// (the zero guard).
pub async fn predict(pool: &SqlitePool, region_code: &str) -> Result<Option<Prediction>> {
    let Some(region) = queries::region_by_code(pool, region_code).await? else {
        return Ok(None);
    };
    let Some(progress) = queries::latest_progress_for_region(pool, region.id).await? else {
        return Ok(None);
    };
    if progress.counted_percentage == 0.0 {
        return Ok(None);
    }

    let recent = queries::latest_results_for_region(pool, region.id, RECENT_RESULTS).await?;

    let mut seen = HashSet::new();
    let mut parties = Vec::new();
    for result in recent {
        // keep only the newest observation per party
        if !seen.insert(result.party_id) {
            continue;
        }
        let Some(party) = queries::party_by_id(pool, result.party_id).await? else {
            continue;
        };
        let predicted_votes =
            (result.votes as f64 * 100.0 / progress.counted_percentage).round() as i64;
        parties.push(PartyPrediction {
            party_code: party.code,
            party_name: party.name,
            current_votes: result.votes,
            current_percentage: result.percentage,
            predicted_votes,
            predicted_percentage: result.percentage,
        });
    }

    Ok(Some(Prediction {
        region_code: region.code,
        counted_percentage: progress.counted_percentage,
        parties,
    }))
}
