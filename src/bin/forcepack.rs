//! Command-line entry point.
//!
//! ```sh
//! forcepack build
//! forcepack deploy deploy.json
//! forcepack retrieve retrieve.json
//! forcepack destroy destroy.json
//! ```
//!
//! The options file is a JSON object using the option names of the chosen
//! mode. Blank credentials are filled from `SF_USERNAME`, `SF_PASSWORD`,
//! `SF_TOKEN` and `SF_SERVER_URL` (or their `SF_<TARGET>_*` variants).
//! Set `RUST_LOG` to change verbosity.

use forcepack::deploy::{
    DeploymentSession, OperationMode, SessionOptions, SessionOutcome, TOOL_LOG_TARGET,
};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: forcepack <build|deploy|retrieve|destroy> [options.json]";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("info,{TOOL_LOG_TARGET}=info"))),
        )
        .init();

    let mut args = std::env::args().skip(1);

    let mode: OperationMode = match args.next() {
        Some(mode) => mode.parse().unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            eprintln!("{USAGE}");
            std::process::exit(2);
        }),
        None => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    let json = match args.next() {
        Some(path) => std::fs::read_to_string(&path).unwrap_or_else(|e| {
            eprintln!("Error: failed to read {path}: {e}");
            std::process::exit(1);
        }),
        None => String::new(),
    };

    let mut options = SessionOptions::from_json(mode, &json).unwrap_or_else(|e| {
        eprintln!("Error: invalid options: {e}");
        std::process::exit(1);
    });
    if let Some(org) = options.org_mut() {
        org.merge_env();
    }

    let cancel = forcepack::deploy::CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    tracing::debug!(%mode, "Starting session");
    let mut session = DeploymentSession::new(mode).with_cancellation(cancel);
    if let Err(e) = session.configure(options) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    match session.execute().await {
        Ok(outcome) => report(&outcome),
        Err(e) => {
            eprintln!("Error: {e}");
            if let Some(output) = e.tool_output() {
                eprintln!("{output}");
            }
            std::process::exit(1);
        }
    }
}

fn report(outcome: &SessionOutcome) {
    match outcome {
        SessionOutcome::InputStructureCreated { created } => {
            println!("The input structure was missing, created:");
            for dir in created {
                println!("  {}", dir.display());
            }
            println!("Add your pages and static resource folders, then build again.");
        }
        SessionOutcome::Built { pages, resources } => {
            println!(
                "Built {} pages and {} static resources",
                pages.pages.len(),
                resources.archives.len()
            );
            for failure in &resources.failures {
                println!("  failed: {} ({})", failure.resource_name, failure.message);
            }
        }
        SessionOutcome::Deployed(_) => println!("Deploy complete"),
        SessionOutcome::Destroyed(_) => println!("Destroy complete"),
        SessionOutcome::Retrieved(report) => {
            println!(
                "Retrieved {} page files and {} static resources",
                report.pages.len(),
                report.extraction.extracted.len()
            );
            for failure in &report.extraction.failures {
                println!("  failed: {} ({})", failure.name, failure.message);
            }
        }
    }
}
