//! Cry Wolf results binary.
//!
//! Reads the study data, computes the analysis and writes one results
//! workbook. All settings come from `CRYWOLF__*` environment variables.

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use crywolf_analytics::adapters::{load_snapshot, JsonReportWriter, PostgresStudyReader};
use crywolf_analytics::application::ComputeResultsHandler;
use crywolf_analytics::config::{AppConfig, LoggingConfig, SourceKind};
use crywolf_analytics::ports::StudyReader;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }
    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("Failed to initialise logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Results run failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    let builder = tracing_subscriber::fmt().with_env_filter(logging.env_filter()?);
    if logging.json {
        builder.json().try_init()?;
    } else {
        builder.try_init()?;
    }
    Ok(())
}

async fn run(config: AppConfig) -> Result<(), Box<dyn Error>> {
    let reader: Arc<dyn StudyReader> = match config.source.kind {
        SourceKind::Postgres => {
            info!(url = %config.database.redacted_url(), "Connecting to study database");
            let pool = config
                .database
                .pool_options()
                .connect(&config.database.url)
                .await?;
            Arc::new(PostgresStudyReader::new(pool))
        }
        SourceKind::Snapshot => {
            let path = config
                .source
                .snapshot_path
                .as_ref()
                .ok_or("snapshot path is not configured")?;
            info!(path = %path.display(), "Loading study snapshot");
            Arc::new(load_snapshot(path).await?)
        }
    };

    let writer = Arc::new(JsonReportWriter::new(
        &config.output.dir,
        config.output.prefix.clone(),
    ));
    let params = config.analysis.to_parameters()?;

    let result = ComputeResultsHandler::new(reader, writer, params)
        .handle()
        .await?;

    info!(
        location = %result.report.location.display(),
        participants = result.participants,
        master_rows = result.master_rows,
        resubmitted = result.resubmitted,
        changed_events = result.changed_events,
        unregistered_users = result.unregistered_users,
        "Cry Wolf results complete"
    );
    Ok(())
}
