use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use health_sheet_export::cloud_adapters::auth::{
    initial_oauth_login, installed_flow_authenticator,
};
use health_sheet_export::cloud_adapters::{CsvDirectorySink, GoogleSheets4Adapter};
use health_sheet_export::config::{Config, load_config, parse_sheet_id, save_config};
use health_sheet_export::core::SplitMode;
use health_sheet_export::core::format::RecordFormatter;
use health_sheet_export::export::{
    ExportError, ExportKind, ExportLock, ExportState, export_to_csv, export_to_sheets,
};
use health_sheet_export::schedule::ExportSchedule;
use health_sheet_export::source::{CachedSource, ExportConfig, HealthDataSource, JsonFileSource};
use health_sheet_export::sync::{SyncReport, SyncWriter};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "health-export", about = "Export health records to Google Sheets or CSV")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Perform OAuth login and store credentials
    Login,
    /// Switch the target spreadsheet using a link or ID
    Switch {
        #[arg(long)]
        link: String,
    },
    /// Export to the configured spreadsheet
    Sheets {
        /// Export every metric for the last three days
        #[arg(long)]
        recent_all: bool,
    },
    /// Export CSV files
    Csv {
        /// Split all-time exports by month or year
        #[arg(long)]
        split: Option<SplitMode>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run automatic exports on the configured schedule
    Daemon,
    /// Show when the last exports ran
    Status,
}

#[derive(Debug)]
enum CliError {
    MissingSpreadsheet,
    ExportInProgress(PathBuf),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::MissingSpreadsheet => {
                write!(f, "no spreadsheet selected, run `switch --link <url>` first")
            }
            CliError::ExportInProgress(path) => {
                write!(f, "an export is already running ({} exists)", path.display())
            }
        }
    }
}

impl std::error::Error for CliError {}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn formatter(cfg: &Config) -> RecordFormatter {
    let timezone = cfg
        .export
        .timezone
        .clone()
        .unwrap_or_else(|| Local::now().format("%:z").to_string());
    RecordFormatter::new(timezone)
}

fn acquire_lock(path: &Path) -> Result<ExportLock, Box<dyn std::error::Error>> {
    ExportLock::acquire(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::AlreadyExists {
            Box::new(CliError::ExportInProgress(path.to_path_buf())) as Box<dyn std::error::Error>
        } else {
            Box::new(e)
        }
    })
}

fn print_report(report: &SyncReport) {
    for (category, result) in &report.categories {
        match result {
            Ok(o) => println!(
                "{category}: {} appended, {} merged, {} unchanged, {} skipped",
                o.appended, o.merged, o.unchanged, o.skipped
            ),
            Err(e) => println!("{category}: failed: {e}"),
        }
    }
}

fn record_success(cfg: &Config, kind: ExportKind) {
    let path = &cfg.export.state_path;
    let mut state = ExportState::load(path);
    state.record(kind, Utc::now());
    if let Err(e) = state.save(path) {
        error!(error = %e, "Failed to save export state");
    }
}

/// Run a sheets export with whole-export retries.
fn run_sheets_export(
    rt: &tokio::runtime::Runtime,
    cfg: &Config,
    source: &dyn HealthDataSource,
    export_config: &ExportConfig,
) -> Result<SyncReport, Box<dyn std::error::Error>> {
    let spreadsheet_id = cfg
        .google_sheets
        .spreadsheet_id
        .clone()
        .ok_or(CliError::MissingSpreadsheet)?;
    let auth = rt.block_on(installed_flow_authenticator(
        &cfg.google_sheets.credentials_path,
        &cfg.google_sheets.token_path,
    ))?;
    let adapter = GoogleSheets4Adapter::new(auth)?;
    let mut writer = SyncWriter::new(adapter, spreadsheet_id);
    let record_formatter = formatter(cfg);

    let result = cfg.retry.policy().run(
        || export_to_sheets(source, &record_formatter, &mut writer, export_config),
        ExportError::is_retryable,
    );
    match result {
        Ok(report) => Ok(report),
        Err(ExportError::Sheets(report)) => {
            print_report(&report);
            Err(Box::new(ExportError::Sheets(report)))
        }
        Err(e) => Err(Box::new(e)),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();
    let mut cfg = load_config(&cli.config)?;

    match cli.command {
        Commands::Login => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(initial_oauth_login(
                &cfg.google_sheets.credentials_path,
                &cfg.google_sheets.token_path,
            ))?;
            println!("Login successful");
        }
        Commands::Switch { link } => {
            let id = parse_sheet_id(&link);
            cfg.google_sheets.spreadsheet_id = Some(id.clone());
            save_config(&cli.config, &cfg)?;
            println!("Active spreadsheet set to {id}");
        }
        Commands::Sheets { recent_all } => {
            let _lock = acquire_lock(&cfg.export.lock_path)?;
            let rt = tokio::runtime::Runtime::new()?;
            let source = JsonFileSource::new(&cfg.export.input);
            let export_config = if recent_all {
                ExportConfig::recent_all()
            } else {
                cfg.export.export_config()
            };
            let bar = spinner("Exporting to Google Sheets");
            let result = run_sheets_export(&rt, &cfg, &source, &export_config);
            bar.finish_and_clear();
            let report = result?;
            print_report(&report);
            record_success(&cfg, ExportKind::Manual);
        }
        Commands::Csv { split, out } => {
            let _lock = acquire_lock(&cfg.export.lock_path)?;
            let source = JsonFileSource::new(&cfg.export.input);
            let mut sink =
                CsvDirectorySink::new(out.unwrap_or_else(|| cfg.export.output_dir.clone()));
            let bar = spinner("Writing CSV files");
            let result = export_to_csv(
                &source,
                &formatter(&cfg),
                &mut sink,
                &cfg.export.export_config(),
                split.unwrap_or(cfg.export.split),
            );
            bar.finish_and_clear();
            let report = result?;
            for path in &report.files {
                println!("{}", path.display());
            }
            record_success(&cfg, ExportKind::Manual);
        }
        Commands::Daemon => {
            let schedule = ExportSchedule::parse(&cfg.schedule.cron)?;
            let rt = tokio::runtime::Runtime::new()?;
            let source = CachedSource::with_ttl(
                JsonFileSource::new(&cfg.export.input),
                cfg.export.cache_ttl(),
            );
            let export_config = cfg.export.export_config().for_auto_export();
            info!(cron = schedule.expression(), "Starting automatic exports");
            while let Some(next) = schedule.next_after(Utc::now()) {
                let wait = (next - Utc::now()).to_std().unwrap_or_default();
                info!(%next, "Waiting for next export");
                std::thread::sleep(wait);

                let _lock = match acquire_lock(&cfg.export.lock_path) {
                    Ok(lock) => lock,
                    Err(e) => {
                        error!(error = %e, "Skipping scheduled export");
                        continue;
                    }
                };
                match run_sheets_export(&rt, &cfg, &source, &export_config) {
                    Ok(report) => {
                        let totals = report.totals();
                        info!(
                            appended = totals.appended,
                            merged = totals.merged,
                            "Automatic export done"
                        );
                        record_success(&cfg, ExportKind::Auto);
                    }
                    Err(e) => error!(error = %e, "Automatic export failed"),
                }
            }
        }
        Commands::Status => {
            let state = ExportState::load(&cfg.export.state_path);
            let show = |kind| match state.last(kind) {
                Some(at) => at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
                None => "never".to_string(),
            };
            println!("Last manual export: {}", show(ExportKind::Manual));
            println!("Last automatic export: {}", show(ExportKind::Auto));
            match &cfg.google_sheets.spreadsheet_id {
                Some(id) => println!("Spreadsheet: {id}"),
                None => println!("Spreadsheet: none selected"),
            }
        }
    }

    Ok(())
}
