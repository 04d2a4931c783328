use chrono::{DateTime, FixedOffset, Utc};
use std::fmt::Write;

use crate::clock::format_datetime;
use crate::registry::OccupancyStats;

/// Plain-text summary of the current state.
pub fn render_text_report(stats: &OccupancyStats, now: DateTime<Utc>, offset: FixedOffset) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "REPORTE EXELLSSIOR - {}", format_datetime(now, offset));
    out.push_str("===================================================\n\n");

    out.push_str("RESUMEN GENERAL:\n");
    let _ = writeln!(out, "- Total de espacios: {}", stats.total_spaces);
    let _ = writeln!(out, "- Espacios ocupados: {}", stats.occupied_spaces);
    let _ = writeln!(out, "- Espacios libres: {}", stats.free_spaces);
    let _ = writeln!(out, "- Tasa de ocupación: {}%", stats.occupancy_rate);

    out.push_str("\nDETALLE POR SUBSUELO:\n");
    for level in &stats.subsuelo_stats {
        let _ = writeln!(
            out,
            "- {}: {}/{} ({}%)",
            level.label, level.occupied, level.total, level.occupancy_rate
        );
    }

    out.push_str("\nDISTRIBUCIÓN POR TIEMPO:\n");
    let _ = writeln!(out, "- Menos de 1 hora: {} espacios", stats.time_stats.under1h);
    let _ = writeln!(out, "- Entre 1 y 3 horas: {} espacios", stats.time_stats.between1h3h);
    let _ = writeln!(out, "- Más de 3 horas: {} espacios", stats.time_stats.over3h);

    let _ = writeln!(out, "\nCLIENTES ACTIVOS ({}):", stats.active_clients.len());
    for active in &stats.active_clients {
        let _ = writeln!(
            out,
            "- {} ({}) - {} - {}",
            active.client.name, active.client.code, active.client.space_key, active.elapsed_time
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClientData;
    use crate::registry::{Registry, RegistrySettings};

    #[test]
    fn test_text_report_sections() {
        let mut registry = Registry::seeded(RegistrySettings::default());
        let start = 1_000_000;
        registry
            .occupy(
                "SUB1-002",
                ClientData {
                    name: "Ana".to_string(),
                    phone: "1123456789".to_string(),
                    ..ClientData::default()
                },
                start,
            )
            .unwrap();
        let stats = OccupancyStats::compute(&registry, start + 90 * 60_000);
        let now = DateTime::from_timestamp_millis(0).unwrap();
        let text = render_text_report(&stats, now, FixedOffset::east_opt(0).unwrap());

        assert!(text.starts_with("REPORTE EXELLSSIOR - 01/01/1970, 00:00:00\n"));
        assert!(text.contains("- Tasa de ocupación: 10%"));
        assert!(text.contains("- Subsuelo 1: 1/10 (10%)"));
        assert!(text.contains("- Entre 1 y 3 horas: 1 espacios"));
        assert!(text.contains("CLIENTES ACTIVOS (1):"));
        assert!(text.contains("(C-") && text.contains(") - SUB1-002 - 1h 30m"));
    }
}
