mod cli;
mod config;
mod journal;
mod model;
mod providers;
mod sprint;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use journal::Journal;
use sprint::SprintCloser;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = cli::parse_args(&args)?;
    if options.help {
        cli::print_help();
        return Ok(());
    }

    if let Some(limit) = options.history {
        let journal = Journal::new(options.journal_path.unwrap_or_else(journal::default_path));
        for entry in journal.read_events(Some(limit)) {
            println!(
                "{}  {:<10}  {}  {}{}",
                entry.timestamp,
                format!("{:?}", entry.event).to_lowercase(),
                entry.task_gid,
                entry.task_name.as_deref().unwrap_or(""),
                entry
                    .duplicate_gid
                    .map(|gid| format!(" -> {gid}"))
                    .unwrap_or_default()
            );
        }
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    // Validate everything before the first remote call
    let config = config::load_config(options.config_path.as_deref())?;
    let provider = providers::create_provider(&config);

    let journal = if options.no_journal || options.dry_run {
        None
    } else {
        Some(Journal::new(
            options.journal_path.clone().unwrap_or_else(journal::default_path),
        ))
    };

    let mut closer = SprintCloser::new(provider.as_ref(), &config).dry_run(options.dry_run);
    if let Some(journal) = &journal {
        tracing::info!(path = %journal.path().display(), "journaling mutations");
        closer = closer.with_journal(journal);
    }

    tracing::info!(
        provider = provider.name(),
        sections = config.in_flight_section_gids.len(),
        dry_run = options.dry_run,
        "closing sprint"
    );
    let report = closer.run().await?;
    tracing::info!(
        duplicated = report.duplicated,
        completed = report.completed,
        "sprint closed"
    );

    Ok(())
}
