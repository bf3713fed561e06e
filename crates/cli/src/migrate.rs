//! CLI migrate subcommand: apply all pending catalog migrations.

use std::process;

use quorum_migrate::catalog::builtin_registry;
use quorum_migrate::MigrationRunner;

use crate::store::JsonFileStore;
use crate::{report_error, OutputFormat};

pub(crate) async fn cmd_migrate(store: JsonFileStore, output: OutputFormat, quiet: bool) {
    let registry = match builtin_registry() {
        Ok(r) => r,
        Err(e) => {
            report_error(&format!("invalid catalog: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let runner = MigrationRunner::new(store);
    match runner.run(&registry).await {
        Ok(report) => match output {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&report)
                    .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
                println!("{}", json);
            }
            OutputFormat::Text => {
                if !quiet {
                    for name in &report.executed {
                        println!("applied {}", name);
                    }
                    for name in &report.skipped {
                        println!("skipped {} (already completed)", name);
                    }
                    println!(
                        "{} applied, {} skipped",
                        report.executed.len(),
                        report.skipped.len()
                    );
                }
            }
        },
        Err(e) => {
            // The failure is already recorded in the store; `quorum
            // status` shows it.
            report_error(&format!("migration run failed: {}", e), output, quiet);
            process::exit(1);
        }
    }
}
