//! CLI status subcommand: aggregate migration status report.

use std::process;

use quorum_migrate::MigrationRunner;

use crate::store::JsonFileStore;
use crate::{report_error, OutputFormat};

pub(crate) async fn cmd_status(store: JsonFileStore, output: OutputFormat, quiet: bool) {
    let runner = MigrationRunner::new(store);
    match runner.status().await {
        Ok(report) => match output {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&report)
                    .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
                println!("{}", json);
            }
            OutputFormat::Text => {
                if quiet {
                    return;
                }
                println!(
                    "Migration Status: {} total, {} completed, {} failed, {} rolled back",
                    report.total, report.completed, report.failed, report.rolled_back
                );
                for record in &report.migrations {
                    let mut line = format!(
                        "  {}  {}  {}  {}ms",
                        record.name, record.status, record.executed_at, record.execution_time_ms
                    );
                    if let Some(error) = &record.error {
                        line.push_str(&format!("  error: {}", error));
                    }
                    println!("{}", line);
                }
            }
        },
        Err(e) => {
            report_error(&format!("status failed: {}", e), output, quiet);
            process::exit(1);
        }
    }
}
