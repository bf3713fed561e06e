//! CLI stages subcommand: print the current approval chain.

use std::process;

use quorum_migrate::stage::load_chain;

use crate::store::JsonFileStore;
use crate::{report_error, OutputFormat};

pub(crate) async fn cmd_stages(
    store: JsonFileStore,
    workflow: &str,
    output: OutputFormat,
    quiet: bool,
) {
    let chain = match load_chain(&store, workflow).await {
        Ok(c) => c,
        Err(e) => {
            report_error(&format!("cannot load chain: {}", e), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&chain.transitions)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            if quiet {
                return;
            }
            if chain.is_empty() {
                println!("workflow '{}' has no stages", workflow);
                return;
            }
            println!("Approval chain for '{}':", workflow);
            for t in &chain.transitions {
                println!(
                    "  {}. {} -> {}  ({})",
                    t.order, t.current_stage, t.next_stage, t.approval_stage
                );
            }
            if let Err(violation) = chain.validate() {
                eprintln!("WARNING: chain invariant violated: {}", violation);
            }
        }
    }
}
