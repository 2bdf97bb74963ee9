use serde::{Deserialize, Serialize};

use super::ProfileEntry;

/// KPI summary for the profile entries of a job or segment
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AggregateResult {
    /// Profile not found on any fetched page
    NoData,
    Summary(StatsSummary),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub entries: usize,
    pub best_rank: u32,
    pub fastest_laps: usize,
}

/// Aggregate profile entries. Lap-time KPIs are left to the reporting side.
pub fn compute_stats(entries: &[ProfileEntry]) -> AggregateResult {
    let Some(best_rank) = entries.iter().map(|e| e.rank).min() else {
        return AggregateResult::NoData;
    };

    AggregateResult::Summary(StatsSummary {
        entries: entries.len(),
        best_rank,
        fastest_laps: entries.iter().filter(|e| e.fastest_lap).count(),
    })
}
