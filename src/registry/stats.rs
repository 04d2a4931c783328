//! Derived occupancy aggregates.
//!
//! Everything here is a pure function of the registry and a clock reading,
//! so callers recompute whenever the collections change or time passes.

use serde::{Deserialize, Serialize};

use super::Registry;
use crate::models::ActiveClient;

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 60 * MINUTE_MS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelStats {
    pub id: String,
    pub label: String,
    pub total: usize,
    pub occupied: usize,
    pub free: usize,
    pub occupancy_rate: u32,
}

/// Occupied spaces bucketed by how long they have been occupied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeStats {
    pub under1h: usize,
    pub between1h3h: usize,
    pub over3h: usize,
}

impl TimeStats {
    fn record(&mut self, elapsed_ms: i64) {
        if elapsed_ms < HOUR_MS {
            self.under1h += 1;
        } else if elapsed_ms <= 3 * HOUR_MS {
            self.between1h3h += 1;
        } else {
            self.over3h += 1;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancyStats {
    /// When the aggregates were computed, epoch milliseconds
    pub computed_at: i64,
    pub total_spaces: usize,
    pub occupied_spaces: usize,
    pub free_spaces: usize,
    pub occupancy_rate: u32,
    pub subsuelo_stats: Vec<LevelStats>,
    pub time_stats: TimeStats,
    pub active_clients: Vec<ActiveClient>,
}

impl OccupancyStats {
    pub fn compute(registry: &Registry, now: i64) -> Self {
        let spaces = registry.spaces();
        let total_spaces = spaces.len();
        let occupied_spaces = spaces.values().filter(|s| s.occupied).count();

        let subsuelo_stats = registry
            .levels()
            .iter()
            .map(|level| {
                let (total, occupied) = spaces
                    .values()
                    .filter(|s| s.subsuelo_id == level.id)
                    .fold((0, 0), |(t, o), s| (t + 1, o + usize::from(s.occupied)));
                LevelStats {
                    id: level.id.clone(),
                    label: level.label.clone(),
                    total,
                    occupied,
                    free: total - occupied,
                    occupancy_rate: occupancy_rate(occupied, total),
                }
            })
            .collect();

        let mut time_stats = TimeStats::default();
        for start in spaces.values().filter(|s| s.occupied).filter_map(|s| s.start_time) {
            time_stats.record(now.saturating_sub(start));
        }

        Self {
            computed_at: now,
            total_spaces,
            occupied_spaces,
            free_spaces: total_spaces - occupied_spaces,
            occupancy_rate: occupancy_rate(occupied_spaces, total_spaces),
            subsuelo_stats,
            time_stats,
            active_clients: registry.filter_clients("", now),
        }
    }
}

/// Percentage of occupied spaces, rounded half away from zero.
pub fn occupancy_rate(occupied: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((occupied as f64 / total as f64) * 100.0).round() as u32
}

/// Human readable elapsed time, `"2h 5m"` or `"45m"`.
pub fn format_elapsed(start: i64, now: i64) -> String {
    let ms = now.saturating_sub(start);
    if ms < 0 {
        return "0m".to_string();
    }
    let minutes = ms / MINUTE_MS;
    let hours = minutes / 60;
    let rest = minutes % 60;
    if hours > 0 {
        format!("{hours}h {rest}m")
    } else {
        format!("{rest}m")
    }
}

/// Bootstrap contextual class for an occupancy progress bar.
pub fn progress_class(rate: f64) -> &'static str {
    if rate < 50.0 {
        "success"
    } else if rate < 80.0 {
        "warning"
    } else {
        "danger"
    }
}
