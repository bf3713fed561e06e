//! CLI rollback subcommand: revert the most recently executed migration.

use std::process;

use quorum_migrate::catalog::builtin_registry;
use quorum_migrate::{MigrationRunner, RollbackReport};

use crate::store::JsonFileStore;
use crate::{report_error, OutputFormat};

pub(crate) async fn cmd_rollback(store: JsonFileStore, output: OutputFormat, quiet: bool) {
    let registry = match builtin_registry() {
        Ok(r) => r,
        Err(e) => {
            report_error(&format!("invalid catalog: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let runner = MigrationRunner::new(store);
    match runner.rollback_last(&registry).await {
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
                match report {
                    RollbackReport::Nothing => {
                        println!("nothing to roll back");
                    }
                    RollbackReport::RolledBack { name, outcome } => {
                        println!("rolled back {}", name);
                        for lost in &outcome.unrestored {
                            println!(
                                "  could not restore: application {} stage '{}' (order {}): {}",
                                lost.application_id, lost.stage, lost.order, lost.reason
                            );
                        }
                    }
                }
            }
        },
        Err(e) => {
            report_error(&format!("rollback failed: {}", e), output, quiet);
            process::exit(1);
        }
    }
}
