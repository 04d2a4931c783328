use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use autolavado::clock;
use autolavado::config::Config;
use autolavado::models::{ClientData, NewReport};
use autolavado::reports::{self, Backup, ReportsClient};
use autolavado::service::ParkingService;
use autolavado::storage;

#[derive(Parser)]
#[command(name = "autolavado-admin")]
#[command(about = "Autolavado parking registry management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List levels with their occupancy
    Levels,
    /// Add the next level with its default spaces
    AddLevel,
    /// Change the label of a level
    RenameLevel { id: String, label: String },
    /// Delete a level and all its spaces
    DeleteLevel { id: String },
    /// List the spaces of a level
    Spaces {
        level: String,
        /// Highlight spaces matching this term
        #[arg(long)]
        search: Option<String>,
    },
    /// Append spaces to a level
    AddSpaces { level: String, count: usize },
    /// Delete the highest-numbered spaces of a level
    DeleteSpaces { level: String, count: usize },
    /// Occupy a free space
    Occupy {
        key: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        vehicle: Option<String>,
        #[arg(long)]
        plate: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Release an occupied space
    Release { key: String },
    /// Move a free space to another level
    Transfer { key: String, level: String },
    /// Reserve a space, or lift the reservation with --off
    Hold {
        key: String,
        #[arg(long)]
        off: bool,
    },
    /// Print occupancy statistics
    Stats,
    /// List active clients
    Clients {
        #[arg(long)]
        search: Option<String>,
    },
    /// Write a JSON backup of the registry
    Export {
        /// Defaults to exellssior_backup_<date>.json
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write a printable report of the current state
    Report {
        #[arg(long, value_enum, default_value_t = ReportFormat::Html)]
        format: ReportFormat,
        /// Defaults to reporte_exellssior_<date>.<ext>
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Manage reports stored on the report backend
    Reports {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Release every space
    Reset {
        /// Also drop all levels and spaces
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
enum ReportCommands {
    /// List stored reports
    List,
    /// Write the printable detail of a stored report
    Show {
        id: i64,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Delete a stored report
    Delete { id: i64 },
    /// Snapshot the current state and store it
    Save,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Html,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let offset = config.display.offset();

    let store = storage::open_store(&config.storage).await?;
    let service = ParkingService::load(store, config.spaces.registry_settings())
        .await
        .context("failed to load registry state")?;

    match cli.command {
        Commands::Levels => {
            let stats = service.refresh_stats().await;
            println!("{:<10} {:<20} {:>6} {:>9} {:>6} {:>5}", "ID", "Label", "Total", "Occupied", "Free", "%");
            println!("{}", "-".repeat(62));
            for level in stats.subsuelo_stats {
                println!(
                    "{:<10} {:<20} {:>6} {:>9} {:>6} {:>4}%",
                    level.id, level.label, level.total, level.occupied, level.free, level.occupancy_rate
                );
            }
        }
        Commands::AddLevel => {
            let level = service.add_level().await?;
            println!("✓ Created level {} ({})", level.id, level.label);
        }
        Commands::RenameLevel { id, label } => {
            service.rename_level(&id, &label).await?;
            println!("✓ Renamed level {} to '{}'", id, label.trim());
        }
        Commands::DeleteLevel { id } => {
            service.delete_level(&id).await?;
            println!("✓ Deleted level {}", id);
        }
        Commands::Spaces { level, search } => {
            let term = search.unwrap_or_default();
            let rows = service
                .read(|r| {
                    r.level_spaces(&level)
                        .into_iter()
                        .map(|s| {
                            let occupant = r.client_for_space(&s.key).map(|c| c.name.clone());
                            let hit = r.is_search_hit(s, &term);
                            (s.key.clone(), s.effective_name().to_string(), s.hold, occupant, hit)
                        })
                        .collect::<Vec<_>>()
                })
                .await;
            if rows.is_empty() {
                println!("No spaces found for level '{}'.", level);
            }
            for (key, name, hold, occupant, hit) in rows {
                let status = match (&occupant, hold) {
                    (Some(name), _) => format!("occupied by {name}"),
                    (None, true) => "held".to_string(),
                    (None, false) => "free".to_string(),
                };
                let marker = if hit { "*" } else { " " };
                println!("{} {:<12} {:<20} {}", marker, key, name, status);
            }
        }
        Commands::AddSpaces { level, count } => {
            let keys = service.add_spaces(&level, count).await?;
            println!("✓ Added {} spaces: {}", keys.len(), keys.join(", "));
        }
        Commands::DeleteSpaces { level, count } => {
            let keys = service.delete_spaces(&level, count).await?;
            println!("✓ Deleted {} spaces: {}", keys.len(), keys.join(", "));
        }
        Commands::Occupy {
            key,
            name,
            phone,
            vehicle,
            plate,
            notes,
        } => {
            let client = service
                .occupy(
                    &key,
                    ClientData {
                        name,
                        phone,
                        vehicle,
                        plate,
                        notes,
                    },
                )
                .await?;
            println!("✓ Space {} occupied by {} ({})", key, client.name, client.code);
            println!("  WhatsApp: +{}", client.phone_intl);
            println!("  Ticket: {}", client.qr_text);
        }
        Commands::Release { key } => match service.release(&key).await {
            Some(client) => println!("✓ Released {} ({})", key, client.name),
            None => println!("⚠ Space '{}' was not occupied", key),
        },
        Commands::Transfer { key, level } => {
            service.transfer_space(&key, &level).await?;
            println!("✓ Moved {} to {}", key, level);
        }
        Commands::Hold { key, off } => {
            service.set_hold(&key, !off).await?;
            if off {
                println!("✓ Space {} is no longer held", key);
            } else {
                println!("✓ Space {} held", key);
            }
        }
        Commands::Stats => {
            let stats = service.refresh_stats().await;
            println!("{}", reports::render_text_report(&stats, Utc::now(), offset));
        }
        Commands::Clients { search } => {
            let now = clock::now_millis();
            let clients = service
                .read(|r| r.filter_clients(search.as_deref().unwrap_or(""), now))
                .await;
            if clients.is_empty() {
                println!("No active clients.");
            } else {
                println!("{:<24} {:<24} {:<12} {:<15} {}", "Code", "Name", "Space", "Phone", "Elapsed");
                println!("{}", "-".repeat(86));
                for active in clients {
                    println!(
                        "{:<24} {:<24} {:<12} {:<15} {}",
                        active.client.code,
                        active.client.name,
                        active.client.space_key,
                        active.client.phone_intl,
                        active.elapsed_time
                    );
                }
            }
        }
        Commands::Export { output } => {
            let now = Utc::now();
            let backup = service.read(|r| Backup::from_registry(r, now)).await;
            let path = output.unwrap_or_else(|| PathBuf::from(reports::backup_file_name(now)));
            tokio::fs::write(&path, backup.to_pretty_json()?)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("✓ Backup written to {}", path.display());
        }
        Commands::Report { format, output } => {
            let now = Utc::now();
            let stats = service.refresh_stats().await;
            let (body, ext) = match format {
                ReportFormat::Html => (reports::render_live_report(&stats, now, offset), "html"),
                ReportFormat::Text => (reports::render_text_report(&stats, now, offset), "txt"),
            };
            let path = output.unwrap_or_else(|| PathBuf::from(reports::report_file_name(now, ext)));
            tokio::fs::write(&path, body)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("✓ Report written to {}", path.display());
        }
        Commands::Reset { all } => {
            if all {
                service.clear_all().await;
                println!("✓ All data removed, level SUB1 recreated");
            } else {
                service.reset_occupancy().await;
                println!("✓ All spaces released");
            }
        }
        Commands::Reports { command } => {
            let client = ReportsClient::new(&config.reports.api_base, config.reports.timeout_secs)?;
            run_reports(command, &client, &service, &config).await?;
        }
    }

    Ok(())
}

async fn run_reports(
    command: ReportCommands,
    client: &ReportsClient,
    service: &ParkingService,
    config: &Config,
) -> Result<()> {
    match command {
        ReportCommands::List => {
            let stored = client.list().await?;
            if stored.is_empty() {
                println!("No stored reports.");
                return Ok(());
            }
            println!("{:<8} {:<22} {:>6} {:>9} {:>6} {:>6}", "ID", "Date", "Total", "Occupied", "Free", "%");
            println!("{}", "-".repeat(62));
            for report in stored {
                let date = report
                    .timestamp
                    .to_datetime()
                    .map(|dt| clock::format_datetime(dt, config.display.offset()))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<8} {:<22} {:>6} {:>9} {:>6} {:>5}%",
                    report.id,
                    date,
                    report.total_spaces,
                    report.occupied_spaces,
                    report.free_spaces,
                    report.occupancy_rate
                );
            }
        }
        ReportCommands::Show { id, output } => {
            let report = client.get(id).await?;
            let html = reports::render_report_detail(&report, clock::now_millis(), config.display.offset());
            let path = output.unwrap_or_else(|| PathBuf::from(format!("reporte_{id}.html")));
            tokio::fs::write(&path, html)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("✓ Report {} written to {}", id, path.display());
        }
        ReportCommands::Delete { id } => {
            client.delete(id).await?;
            println!("✓ Deleted report {}", id);
        }
        ReportCommands::Save => {
            let stats = service.refresh_stats().await;
            let report = client.create(&NewReport::from_stats(&stats, Utc::now())?).await?;
            println!("✓ Saved report {}", report.id);
        }
    }
    Ok(())
}
