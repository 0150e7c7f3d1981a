use anyhow::{bail, Result};
use std::path::PathBuf;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub dry_run: bool,
    pub config_path: Option<PathBuf>,
    pub journal_path: Option<PathBuf>,
    pub no_journal: bool,
    /// Print the last N journal entries instead of running.
    pub history: Option<usize>,
    pub help: bool,
}

/// Parse `sprint-close` arguments (program name excluded).
///
/// Supported forms:
///   sprint-close
///   sprint-close --dry-run
///   sprint-close --config ./sprint.toml --journal ./close.jsonl
///   sprint-close --no-journal
pub fn parse_args(args: &[String]) -> Result<CliOptions> {
    let mut options = CliOptions::default();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => options.help = true,
            "-n" | "--dry-run" => options.dry_run = true,
            "--no-journal" => options.no_journal = true,
            "-c" | "--config" => {
                i += 1;
                match args.get(i) {
                    Some(path) => options.config_path = Some(PathBuf::from(path)),
                    None => bail!("Missing value for --config flag"),
                }
            }
            "--journal" => {
                i += 1;
                match args.get(i) {
                    Some(path) => options.journal_path = Some(PathBuf::from(path)),
                    None => bail!("Missing value for --journal flag"),
                }
            }
            "--history" => {
                i += 1;
                let count = match args.get(i) {
                    Some(value) => value
                        .parse::<usize>()
                        .map_err(|_| anyhow::anyhow!("Invalid value for --history: {value}"))?,
                    None => bail!("Missing value for --history flag"),
                };
                options.history = Some(count);
            }
            other => bail!("Unknown argument: {other}\n\nRun `sprint-close --help` for usage."),
        }
        i += 1;
    }

    if options.no_journal && options.journal_path.is_some() {
        bail!("--journal and --no-journal cannot be combined");
    }

    Ok(options)
}

pub fn print_help() {
    println!("sprint-close — carry unfinished sprint tasks into the backlog\n");
    println!("USAGE:");
    println!("  sprint-close [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -n, --dry-run         Show what would change without touching any task");
    println!("  -c, --config <path>   Read settings from this TOML file");
    println!("      --journal <path>  Write the mutation journal here");
    println!("      --no-journal      Do not write a journal");
    println!("      --history <n>     Print the last n journal entries and exit");
    println!("  -h, --help            Print this help");
    println!();
    println!("ENVIRONMENT (also read from .env):");
    println!("  ASANA_TOKEN, ASANA_WORKSPACE_GID, SPRINTS_PROJECT_GID,");
    println!("  BACKLOG_SECTION_GID, DONE_SECTION_GID, IN_FLIGHT_SECTION_GIDS (comma-separated),");
    println!("  EXPECTED_COST_FIELD_GID, ACTUAL_COST_FIELD_GID, SPRINT_NUMBER_FIELD_GID,");
    println!("  ASANA_BASE_URL (optional), RUST_LOG (default: info)");
}
