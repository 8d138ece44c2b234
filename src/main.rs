use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cypress_report::actions::{ENV_RUNNER_DEBUG, error_command, runner_debug};
use cypress_report::config::Config;
use cypress_report::naming::{DirNameStrategy, DirNamer};
use cypress_report::pipeline::{Pipeline, PipelineOutcome};

/// Cypress Report - failure reporting for Cypress CI runs
#[derive(Parser, Debug)]
#[command(
    name = "cypress-report",
    about = "Merge mochawesome results, upload artifacts to Cloud Storage and notify Slack",
    after_help = "ENVIRONMENT VARIABLES:\n\
        CYPRESS_REPORT_BUCKET          Storage bucket (or INPUT_BUCKET-NAME)\n\
        CYPRESS_REPORT_GCLOUD_AUTH     Base64 service-account key (or INPUT_GCLOUD-AUTH)\n\
        CYPRESS_REPORT_SLACK_TOKEN     Slack bot token (or INPUT_SLACK-TOKEN)\n\
        CYPRESS_REPORT_SLACK_CHANNEL   Slack channel id (or INPUT_SLACK-CHANNEL)\n\
        CYPRESS_REPORT_SLACK_MENTION   Mention added to the message (or INPUT_SLACK-MENTION)\n\
        CYPRESS_REPORT_DIR_STRATEGY    timestamp | job\n\
        GITHUB_WORKSPACE               Work dir (default: .)\n\
        RUST_LOG                       Log filter (default: info, debug with RUNNER_DEBUG=1)"
)]
struct Args {
    /// Work dir containing the Cypress folder (overrides GITHUB_WORKSPACE)
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,

    /// Cypress folder name inside the work dir
    #[arg(long, global = true, env = "CYPRESS_REPORT_CYPRESS_DIR")]
    cypress_dir: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the failure report: merge, render, upload and notify
    Report {
        /// Directory naming strategy: timestamp or job
        #[arg(long)]
        strategy: Option<DirNameStrategy>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Merge the result fragments and render the HTML report locally
    Merge,

    /// Print a freshly generated artifact directory name
    DirName {
        /// Directory naming strategy: timestamp or job
        #[arg(long, default_value = "timestamp")]
        strategy: DirNameStrategy,

        /// Job name for the job strategy
        #[arg(long, env = "GITHUB_JOB")]
        job: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            println!("{}", error_command(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    match args.command {
        Some(Commands::Report { strategy, json }) => {
            let mut config = load_config(args.work_dir, args.cypress_dir)?;
            if let Some(strategy) = strategy {
                config = config.with_strategy(strategy);
            }

            let outcome = Pipeline::new(config).run().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                match &outcome {
                    PipelineOutcome::Skipped => println!("No mochawesome reports found, nothing to report"),
                    PipelineOutcome::Reported(summary) => {
                        println!("Report uploaded to {}", summary.dir_name);
                        println!("  Failed tests: {}", summary.failed_tests);
                        println!(
                            "  Uploads: {} succeeded, {} failed",
                            summary.uploads.succeeded, summary.uploads.failed
                        );
                        println!("  Full report: {}", summary.report_url);
                    }
                }
            }
        }

        Some(Commands::Merge) => {
            let config = load_config(args.work_dir, args.cypress_dir)?;
            let pipeline = Pipeline::new(config);
            match pipeline.prepare()? {
                Some(report) => {
                    println!("Merged {} suites, {} tests", report.results.len(), report.test_count());
                    println!("  Failed tests: {}", report.failed_tests().len());
                    println!("  HTML: {}", pipeline.config().paths().html_report.display());
                }
                None => println!("No mochawesome reports found"),
            }
        }

        Some(Commands::DirName { strategy, job }) => {
            let name = DirNamer::new(strategy).job_name(job).generate();
            println!("{}", name);
        }

        None => {
            println!("Cypress Report - failure reporting for Cypress CI runs");
            println!();
            println!("Usage: cypress-report <COMMAND>");
            println!();
            println!("Commands:");
            println!("  report    Merge, render, upload artifacts and notify Slack");
            println!("  merge     Merge and render the HTML report locally");
            println!("  dir-name  Print a generated artifact directory name");
            println!();
            println!("Run with --help for more information.");
        }
    }

    Ok(())
}

fn load_config(work_dir: Option<PathBuf>, cypress_dir: Option<String>) -> Result<Config, Box<dyn Error>> {
    let mut config = Config::from_env()?;
    if let Some(dir) = work_dir {
        config = config.with_work_dir(dir);
    }
    if let Some(name) = cypress_dir {
        config = config.with_cypress_dir(name);
    }
    info!("workingDirectory : {}", config.workspace.work_dir.display());
    Ok(config)
}

fn init_tracing() {
    let default_level = if runner_debug(std::env::var(ENV_RUNNER_DEBUG).ok().as_deref()) {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
