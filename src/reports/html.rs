//! Printable HTML reports.
//!
//! Live and stored reports share one layout: summary cards, a per-level table
//! with progress bars, the elapsed-time distribution and the active clients.
//! Both pages call `window.print()` on load.

use chrono::{DateTime, FixedOffset, Utc};
use std::fmt::Write;

use crate::clock::format_datetime;
use crate::models::{ActiveClient, Report, Ticket};
use crate::registry::{format_elapsed, progress_class, LevelStats, OccupancyStats, TimeStats};

const BOOTSTRAP_CSS: &str = "https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css";

const REPORT_STYLE: &str = r#"
    body { font-family: Arial, sans-serif; background: #0f172a; color: #e2e8f0; margin: 20px; }
    h1 { color: #0ea5e9; text-align: center; }
    .section { margin-bottom: 30px; }
    .stats { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 15px; margin-bottom: 20px; }
    .stat-card { background: #1e293b; padding: 15px; border-radius: 8px; text-align: center; border-left: 4px solid #0ea5e9; }
    .stat-number { font-size: 2em; font-weight: bold; color: #0ea5e9; }
    table { width: 100%; border-collapse: collapse; background: #1e293b; border-radius: 8px; overflow: hidden; }
    th, td { padding: 12px; text-align: left; border-bottom: 1px solid #334155; }
    th { background: #16213e; font-weight: bold; color: #0ea5e9; }
    .progress { background: #374151; border-radius: 4px; height: 20px; overflow: hidden; }
    .progress-bar { height: 100%; line-height: 20px; text-align: center; font-size: 0.875em; }
    .time-stats { display: grid; grid-template-columns: repeat(auto-fit, minmax(150px, 1fr)); gap: 15px; }
    .time-card { background: #1e293b; padding: 15px; border-radius: 8px; text-align: center; border-left: 4px solid #0ea5e9; }
    .time-number { font-size: 1.5em; font-weight: bold; }
    .code { background: #1e293b; padding: 2px 6px; border-radius: 4px; font-family: monospace; }
    .no-data { text-align: center; color: #94a3b8; font-style: italic; padding: 40px; }
    @media print { body { background: white; color: black; } }
"#;

/// One row of the active-clients table.
struct ClientRow {
    code: String,
    name: String,
    space: String,
    phone: String,
    vehicle: String,
    elapsed: String,
}

/// Everything a report page shows, independent of where it came from.
struct ReportView {
    title: String,
    total: String,
    occupied: String,
    free: String,
    rate: f64,
    levels: Vec<LevelStats>,
    time: TimeStats,
    clients: Vec<ClientRow>,
}

/// Report of the current state.
pub fn render_live_report(stats: &OccupancyStats, now: DateTime<Utc>, offset: FixedOffset) -> String {
    let view = ReportView {
        title: format!("Reporte Exellssior - {}", format_datetime(now, offset)),
        total: stats.total_spaces.to_string(),
        occupied: stats.occupied_spaces.to_string(),
        free: stats.free_spaces.to_string(),
        rate: f64::from(stats.occupancy_rate),
        levels: stats.subsuelo_stats.clone(),
        time: stats.time_stats,
        clients: stats
            .active_clients
            .iter()
            .map(|c| client_row(c, c.elapsed_time.clone()))
            .collect(),
    };
    render(&view)
}

/// Report of a stored snapshot. Elapsed times are recomputed against `now`
/// from each client's ticket.
pub fn render_report_detail(report: &Report, now: i64, offset: FixedOffset) -> String {
    let taken = report
        .timestamp
        .to_datetime()
        .map(|dt| format_datetime(dt, offset))
        .unwrap_or_else(|| "fecha desconocida".to_string());
    let view = ReportView {
        title: format!("Reporte #{} - {}", report.id, taken),
        total: report.total_spaces.to_string(),
        occupied: report.occupied_spaces.to_string(),
        free: report.free_spaces.to_string(),
        rate: report.occupancy_rate,
        levels: report.level_stats(),
        time: report.time_stats(),
        clients: report
            .clients()
            .iter()
            .map(|c| {
                let elapsed = Ticket::parse(&c.client.qr_text)
                    .map(|t| format_elapsed(t.start, now))
                    .unwrap_or_else(|_| "N/A".to_string());
                client_row(c, elapsed)
            })
            .collect(),
    };
    render(&view)
}

fn client_row(active: &ActiveClient, elapsed: String) -> ClientRow {
    let client = &active.client;
    let space = if active.space_display_name.is_empty() {
        client.space_key.clone()
    } else {
        active.space_display_name.clone()
    };
    ClientRow {
        code: client.code.clone(),
        name: client.name.clone(),
        space,
        phone: format!("+{}", client.phone_intl),
        vehicle: if client.vehicle.is_empty() {
            "-".to_string()
        } else {
            client.vehicle.clone()
        },
        elapsed,
    }
}

fn render(view: &ReportView) -> String {
    let mut html = String::with_capacity(8 * 1024);
    let title = escape(&view.title);

    // Writing into a String cannot fail
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="es">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
  <link href="{BOOTSTRAP_CSS}" rel="stylesheet">
  <style>{REPORT_STYLE}</style>
</head>
<body>
  <h1>{title}</h1>

  <div class="section">
    <h2>Resumen General</h2>
    <div class="stats">
      <div class="stat-card"><div class="stat-number">{total}</div><div>Total Espacios</div></div>
      <div class="stat-card"><div class="stat-number" style="color: #10b981;">{occupied}</div><div>Ocupados</div></div>
      <div class="stat-card"><div class="stat-number" style="color: #3b82f6;">{free}</div><div>Libres</div></div>
      <div class="stat-card"><div class="stat-number" style="color: #f59e0b;">{rate}%</div><div>Ocupación</div></div>
    </div>
  </div>
"#,
        total = view.total,
        occupied = view.occupied,
        free = view.free,
        rate = view.rate,
    );

    html.push_str(
        r#"
  <div class="section">
    <h2>Detalle por Subsuelo</h2>
"#,
    );
    if view.levels.is_empty() {
        html.push_str("    <div class=\"no-data\">Sin datos de subsuelos</div>\n");
    } else {
        html.push_str(
            "    <table>\n      <thead><tr><th>Subsuelo</th><th>Total</th><th>Ocupados</th><th>Libres</th><th>% Ocupación</th></tr></thead>\n      <tbody>\n",
        );
        for level in &view.levels {
            let _ = writeln!(
                html,
                r#"        <tr><td>{label}</td><td>{total}</td><td><span class="badge bg-danger">{occupied}</span></td><td><span class="badge bg-success">{free}</span></td><td>{bar}</td></tr>"#,
                label = escape(&level.label),
                total = level.total,
                occupied = level.occupied,
                free = level.free,
                bar = progress_bar(f64::from(level.occupancy_rate)),
            );
        }
        html.push_str("      </tbody>\n    </table>\n");
    }
    html.push_str("  </div>\n");

    let _ = write!(
        html,
        r#"
  <div class="section">
    <h2>Distribución por Tiempo</h2>
    <div class="time-stats">
      <div class="time-card"><div class="time-number" style="color: #10b981;">{under}</div><div>Menos de 1h</div></div>
      <div class="time-card"><div class="time-number" style="color: #f59e0b;">{mid}</div><div>1h - 3h</div></div>
      <div class="time-card"><div class="time-number" style="color: #ef4444;">{over}</div><div>Más de 3h</div></div>
    </div>
  </div>
"#,
        under = view.time.under1h,
        mid = view.time.between1h3h,
        over = view.time.over3h,
    );

    let _ = write!(
        html,
        "\n  <div class=\"section\">\n    <h2>Clientes Activos ({})</h2>\n",
        view.clients.len()
    );
    if view.clients.is_empty() {
        html.push_str("    <div class=\"no-data\">No hay clientes actualmente</div>\n");
    } else {
        html.push_str(
            "    <table>\n      <thead><tr><th>Código</th><th>Cliente</th><th>Espacio</th><th>Teléfono</th><th>Vehículo</th><th>Tiempo</th></tr></thead>\n      <tbody>\n",
        );
        for row in &view.clients {
            let _ = writeln!(
                html,
                r#"        <tr><td><span class="code">{}</span></td><td>{}</td><td style="color: #3b82f6;">{}</td><td>{}</td><td>{}</td><td style="color: #f59e0b;">{}</td></tr>"#,
                escape(&row.code),
                escape(&row.name),
                escape(&row.space),
                escape(&row.phone),
                escape(&row.vehicle),
                escape(&row.elapsed),
            );
        }
        html.push_str("      </tbody>\n    </table>\n");
    }
    html.push_str(
        r#"  </div>

  <script>
    window.onload = function() { window.print(); };
  </script>
</body>
</html>
"#,
    );
    html
}

fn progress_bar(rate: f64) -> String {
    format!(
        r#"<div class="progress"><div class="progress-bar bg-{class}" style="width: {rate}%">{rate}%</div></div>"#,
        class = progress_class(rate),
    )
}

/// Standalone page that lists stored reports straight from the backend, with
/// view and delete actions.
pub fn render_reports_list(api_base: &str) -> String {
    // The base URL ends up inside a JS string literal
    let api_base = serde_json::to_string(api_base.trim_end_matches('/')).unwrap_or_else(|_| "\"\"".to_string());
    LIST_TEMPLATE
        .replace("__API_BASE__", &api_base)
        .replace("__BOOTSTRAP_CSS__", BOOTSTRAP_CSS)
}

const LIST_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="es">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Lista de Reportes - Exellssior</title>
  <link href="__BOOTSTRAP_CSS__" rel="stylesheet">
  <style>
    body { font-family: Arial, sans-serif; background: #0f172a; color: #e2e8f0; margin: 20px; }
    h1 { color: #0ea5e9; text-align: center; }
    .table-dark { --bs-table-bg: #1e293b; --bs-table-striped-bg: #2d446a; }
    .progress { height: 25px; background: #374151; }
    .progress-bar { height: 100%; line-height: 25px; text-align: center; font-size: 0.875em; }
    .no-data, .loading { text-align: center; color: #94a3b8; padding: 40px; }
  </style>
</head>
<body>
  <h1>Lista de Reportes - Exellssior</h1>
  <div class="container-fluid px-4">
    <div class="d-flex justify-content-between align-items-center mb-3">
      <h2 class="h4 mb-0">Lista de Reportes</h2>
      <button onclick="loadReports()" class="btn btn-outline-primary btn-sm">Recargar</button>
    </div>
    <div id="reportsTableContainer" class="loading">Cargando reportes...</div>
  </div>
  <script>
    const API_BASE = __API_BASE__;

    function esc(value) {
      const div = document.createElement('div');
      div.textContent = String(value);
      return div.innerHTML;
    }

    function barClass(rate) {
      return rate < 50 ? 'success' : rate < 80 ? 'warning' : 'danger';
    }

    function loadReports() {
      const container = document.getElementById('reportsTableContainer');
      container.innerHTML = '<div class="loading">Cargando...</div>';
      fetch(`${API_BASE}/reports`)
        .then(response => response.json())
        .then(reports => {
          if (reports.length === 0) {
            container.innerHTML = '<div class="no-data">No hay reportes disponibles</div>';
            return;
          }
          const rows = reports.map(report => `
            <tr>
              <td>${esc(report.id)}</td>
              <td>${esc(new Date(report.timestamp).toLocaleString())}</td>
              <td>${esc(report.totalSpaces)}</td>
              <td><span class="badge bg-danger">${esc(report.occupiedSpaces)}</span></td>
              <td><span class="badge bg-success">${esc(report.freeSpaces)}</span></td>
              <td>
                <div class="progress">
                  <div class="progress-bar bg-${barClass(report.occupancyRate)}" style="width: ${Number(report.occupancyRate)}%">${esc(report.occupancyRate)}%</div>
                </div>
              </td>
              <td>
                <button onclick="viewReport(${Number(report.id)})" class="btn btn-sm btn-outline-primary me-1">Ver</button>
                <button onclick="deleteReport(${Number(report.id)})" class="btn btn-sm btn-outline-danger">Eliminar</button>
              </td>
            </tr>`).join('');
          container.innerHTML = `
            <div class="table-responsive">
              <table class="table table-dark table-striped">
                <thead>
                  <tr><th>ID</th><th>Fecha</th><th>Total Espacios</th><th>Ocupados</th><th>Libres</th><th>% Ocupación</th><th>Acciones</th></tr>
                </thead>
                <tbody>${rows}</tbody>
              </table>
            </div>`;
        })
        .catch(error => {
          container.innerHTML = '<div class="no-data">Error al cargar: ' + esc(error) + '</div>';
        });
    }

    function viewReport(id) {
      window.open(`${API_BASE}/reports/${id}/html`, '_blank');
    }

    function deleteReport(id) {
      if (!confirm('¿Eliminar reporte ID ' + id + '?')) {
        return;
      }
      fetch(`${API_BASE}/reports/${id}`, { method: 'DELETE' })
        .then(response => {
          if (response.ok) {
            loadReports();
          } else {
            alert('Error al eliminar');
          }
        })
        .catch(error => alert('Error: ' + error));
    }

    window.onload = loadReports;
  </script>
</body>
</html>
"#;

/// Escape text for HTML element and attribute content.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
