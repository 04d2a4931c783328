use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::client::ActiveClient;
use crate::registry::{LevelStats, OccupancyStats, TimeStats};

/// Report timestamp as returned by the backend, either an ISO-8601 string or
/// epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportTimestamp {
    Millis(i64),
    Text(String),
}

impl ReportTimestamp {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            Self::Text(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| text.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis)),
        }
    }
}

/// Stored report record, as served by the report backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: i64,
    pub timestamp: ReportTimestamp,
    #[serde(default)]
    pub total_spaces: i64,
    #[serde(default)]
    pub occupied_spaces: i64,
    #[serde(default)]
    pub free_spaces: i64,
    #[serde(default)]
    pub occupancy_rate: f64,
    /// JSON array of per-level stats
    #[serde(default)]
    pub subsuelo_stats: Option<String>,
    /// JSON object with the elapsed-time buckets
    #[serde(default)]
    pub time_stats: Option<String>,
    /// JSON array of active-client snapshots
    #[serde(default)]
    pub filtered_clients: Option<String>,
}

impl Report {
    // The blobs are free-form strings on the backend; anything unparsable is
    // rendered as an empty section.

    pub fn level_stats(&self) -> Vec<LevelStats> {
        parse_blob(self.subsuelo_stats.as_deref(), "subsueloStats", self.id)
    }

    pub fn time_stats(&self) -> TimeStats {
        parse_blob(self.time_stats.as_deref(), "timeStats", self.id)
    }

    pub fn clients(&self) -> Vec<ActiveClient> {
        parse_blob(self.filtered_clients.as_deref(), "filteredClients", self.id)
    }
}

fn parse_blob<T: serde::de::DeserializeOwned + Default>(blob: Option<&str>, field: &str, id: i64) -> T {
    let Some(text) = blob.filter(|t| !t.trim().is_empty()) else {
        return T::default();
    };
    serde_json::from_str(text).unwrap_or_else(|e| {
        tracing::warn!("Report {} has malformed {}: {}", id, field, e);
        T::default()
    })
}

/// Body of `POST /reports`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    pub timestamp: String,
    pub total_spaces: usize,
    pub occupied_spaces: usize,
    pub free_spaces: usize,
    pub occupancy_rate: u32,
    pub subsuelo_stats: String,
    pub time_stats: String,
    pub filtered_clients: String,
}

impl NewReport {
    pub fn from_stats(stats: &OccupancyStats, now: DateTime<Utc>) -> serde_json::Result<Self> {
        Ok(Self {
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            total_spaces: stats.total_spaces,
            occupied_spaces: stats.occupied_spaces,
            free_spaces: stats.free_spaces,
            occupancy_rate: stats.occupancy_rate,
            subsuelo_stats: serde_json::to_string(&stats.subsuelo_stats)?,
            time_stats: serde_json::to_string(&stats.time_stats)?,
            filtered_clients: serde_json::to_string(&stats.active_clients)?,
        })
    }
}
