pub mod client;
pub mod error;
pub mod export;
pub mod html;
pub mod text;

pub use client::ReportsClient;
pub use error::{ReportsError, ReportsResult};
pub use export::{backup_file_name, report_file_name, Backup, BackupStats};
pub use html::{render_live_report, render_report_detail, render_reports_list};
pub use text::render_text_report;
