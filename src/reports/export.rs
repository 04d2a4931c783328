//! JSON backup of the whole registry and suggested download file names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::clock::date_stamp;
use crate::models::{Client, Level, Space};
use crate::registry::{occupancy_rate, Registry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    /// RFC 3339 time of the export
    pub timestamp: String,
    pub subsuelos: Vec<Level>,
    pub spaces: BTreeMap<String, Space>,
    pub clients: BTreeMap<String, Client>,
    pub stats: BackupStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupStats {
    pub total: usize,
    pub occupied: usize,
    pub free: usize,
    pub occupancy_rate: u32,
}

impl Backup {
    pub fn from_registry(registry: &Registry, now: DateTime<Utc>) -> Self {
        let total = registry.spaces().len();
        let occupied = registry.spaces().values().filter(|s| s.occupied).count();
        Self {
            timestamp: now.to_rfc3339(),
            subsuelos: registry.levels().to_vec(),
            spaces: registry.spaces().clone(),
            clients: registry.clients().clone(),
            stats: BackupStats {
                total,
                occupied,
                free: total - occupied,
                occupancy_rate: occupancy_rate(occupied, total),
            },
        }
    }

    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub fn backup_file_name(now: DateTime<Utc>) -> String {
    format!("exellssior_backup_{}.json", date_stamp(now))
}

/// `ext` is `html` or `txt`.
pub fn report_file_name(now: DateTime<Utc>, ext: &str) -> String {
    format!("reporte_exellssior_{}.{}", date_stamp(now), ext)
}
