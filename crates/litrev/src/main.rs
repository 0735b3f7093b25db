mod builtins;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::error;

use litrev_core::kernel::Application;
use litrev_core::package_system::PackageManager;
use litrev_core::stage_manager::context::ExecutionMode;
use litrev_core::stage_manager::review_stages::{
    self, FULL_REVIEW_PIPELINE,
};
use litrev_core::stage_manager::{StageManager, StageResult};
use litrev_core::storage::manager::DefaultStorageManager;
use litrev_core::storage::StorageManager;
use litrev_core::record::Dataset;
use litrev_core::{EndpointType, KernelError};

/// litrev: a workflow engine for systematic literature reviews
#[derive(Parser, Debug)]
#[command(name = "litrev", version, about, long_about = None)]
struct Cli {
    /// Validate and report without changing the record store
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a review project in the given directory
    Init {
        /// Project title
        #[arg(long, default_value = "untitled review")]
        title: String,
        /// Target directory, defaults to the current one
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the record counts per status
    Status,
    /// Fetch new results from the configured search sources
    Search,
    /// Import search result files into the record store
    Load,
    /// Improve record metadata
    Prep,
    /// Merge duplicate records
    Dedupe,
    /// Include or exclude records on metadata
    Prescreen,
    /// Retrieve full-text documents
    PdfGet,
    /// Validate retrieved documents
    PdfPrep,
    /// Include or exclude records on full text
    Screen,
    /// Synthesize included records
    Data,
    /// Run the whole review pipeline
    Run,
    /// Inspect the package ecosystem
    Packages {
        #[command(subcommand)]
        command: PackagesCommand,
    },
}

#[derive(Subcommand, Debug)]
enum PackagesCommand {
    /// List known endpoints
    List {
        /// Restrict to one endpoint type, e.g. "dedupe"
        #[arg(long = "type")]
        endpoint_type: Option<String>,
        /// Only show installed endpoints
        #[arg(long)]
        installed: bool,
    },
    /// Show the settings schema of one endpoint
    Show {
        /// Endpoint type, e.g. "screen"
        endpoint_type: String,
        identifier: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, KernelError> {
    match cli.command {
        Command::Init { title, path } => {
            let dir = match path {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            };
            DefaultStorageManager::init(&dir, &title)?;
            println!("Initialized review project '{}' in {}", title, dir.display());
            return Ok(ExitCode::SUCCESS);
        }
        Command::Status => {
            let storage = DefaultStorageManager::open(&std::env::current_dir()?)?;
            let settings = storage.load_settings()?;
            let dataset = Dataset::load(&storage)?;
            println!("Project: {}", settings.project.title);
            println!("Review type: {}", settings.project.review_type);
            println!("Records: {}", dataset.len());
            for (state, count) in dataset.state_counts() {
                println!("  {:<28} {}", state.to_string(), count);
            }
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    // Everything else runs against the assembled application
    let storage = DefaultStorageManager::open(&std::env::current_dir()?)?;
    let mut app = Application::for_project(storage);
    builtins::register_all(&app.package_manager()).await?;
    app.start().await?;

    let mode = if cli.dry_run {
        ExecutionMode::DryRun
    } else {
        ExecutionMode::Live
    };

    let outcome = dispatch(&cli.command, &app, mode).await;
    app.shutdown().await?;
    outcome
}

async fn dispatch(
    command: &Command,
    app: &Application,
    mode: ExecutionMode,
) -> Result<ExitCode, KernelError> {
    let stage_manager = app.stage_manager();
    match command {
        Command::Search => execute_stage(app, review_stages::SEARCH_STAGE_ID, mode).await,
        Command::Load => execute_stage(app, review_stages::LOAD_STAGE_ID, mode).await,
        Command::Prep => execute_stage(app, review_stages::PREP_STAGE_ID, mode).await,
        Command::Dedupe => execute_stage(app, review_stages::DEDUPE_STAGE_ID, mode).await,
        Command::Prescreen => execute_stage(app, review_stages::PRESCREEN_STAGE_ID, mode).await,
        Command::PdfGet => execute_stage(app, review_stages::PDF_GET_STAGE_ID, mode).await,
        Command::PdfPrep => execute_stage(app, review_stages::PDF_PREP_STAGE_ID, mode).await,
        Command::Screen => execute_stage(app, review_stages::SCREEN_STAGE_ID, mode).await,
        Command::Data => execute_stage(app, review_stages::DATA_STAGE_ID, mode).await,
        Command::Run => {
            let Some(mut pipeline) = stage_manager
                .get_pipeline_by_name(FULL_REVIEW_PIPELINE.name)
                .await?
            else {
                return Err(KernelError::Other("review pipeline not registered".to_string()));
            };
            let mut context = app.stage_context(mode);
            let results = stage_manager
                .execute_pipeline(&mut pipeline, &mut context)
                .await?;
            let mut failed = false;
            for stage_id in FULL_REVIEW_PIPELINE.stages {
                if let Some(result) = results.get(*stage_id) {
                    println!("{:<20} {}", stage_id, result);
                    if matches!(result, StageResult::Failure(_)) {
                        failed = true;
                    }
                }
            }
            Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
        }
        Command::Packages { command } => packages_command(command, app).await,
        // Init and Status return before the application is assembled
        _ => Ok(ExitCode::SUCCESS),
    }
}

async fn execute_stage(
    app: &Application,
    stage_id: &str,
    mode: ExecutionMode,
) -> Result<ExitCode, KernelError> {
    let mut context = app.stage_context(mode);
    let result = app.stage_manager().execute_stage(stage_id, &mut context).await?;
    println!("{:<20} {}", stage_id, result);
    Ok(match result {
        StageResult::Failure(_) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

async fn packages_command(
    command: &PackagesCommand,
    app: &Application,
) -> Result<ExitCode, KernelError> {
    let packages = app.package_manager();
    match command {
        PackagesCommand::List {
            endpoint_type,
            installed,
        } => {
            let filter = endpoint_type
                .as_deref()
                .map(str::parse::<EndpointType>)
                .transpose()
                .map_err(KernelError::PackageSystem)?;
            let summaries = packages.discover(filter, *installed).await;
            if summaries.is_empty() {
                println!("No matching endpoints");
                return Ok(ExitCode::SUCCESS);
            }
            println!(
                "{:<16} {:<22} {:<10} {}",
                "TYPE", "IDENTIFIER", "INSTALLED", "DESCRIPTION"
            );
            for summary in summaries {
                println!(
                    "{:<16} {:<22} {:<10} {}",
                    summary.endpoint_type.to_string(),
                    summary.identifier,
                    if summary.installed { "yes" } else { "no" },
                    summary.description
                );
            }
        }
        PackagesCommand::Show {
            endpoint_type,
            identifier,
        } => {
            let endpoint_type = endpoint_type
                .parse::<EndpointType>()
                .map_err(KernelError::PackageSystem)?;
            let schema = packages.endpoint_details(endpoint_type, identifier).await?;
            println!("{} / {}", endpoint_type, identifier);
            println!(
                "{}",
                serde_json::to_string_pretty(&schema)
                    .unwrap_or_else(|_| schema.to_string())
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}
