extern crate iac_solar;

use anyhow::Context;
use chrono::Local;
use clap::{Args, Parser};
use iac_solar::estimate::{PvWattsClient, PVWATTS_ENDPOINT};
use iac_solar::formatting::NumberFormat;
use iac_solar::input::ingest_parameters;
use iac_solar::manual_entry::ConsolePrompt;
use iac_solar::output::{FileOutput, SinkOutput, REPORT_FILE_TEMPLATE};
use iac_solar::report::DirectoryTemplates;
use iac_solar::{run_recommendation, RecommendationOutcome, RunFlags, RunOptions};
use std::fs::File;
use std::io;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct SolarArgs {
    /// Scenario-specific parameters
    #[arg(long, default_value = "Solar Panel.json5")]
    config: PathBuf,
    /// Shared utility parameters, merged over the scenario
    #[arg(long, default_value = "../Utility.json5")]
    utility: PathBuf,
    /// Directory holding the recommendation templates
    #[arg(long, default_value = ".")]
    templates: PathBuf,
    /// Directory the filled report is saved to
    #[arg(long, default_value = "../ARs")]
    output_dir: PathBuf,
    #[arg(long, default_value = PVWATTS_ENDPOINT)]
    endpoint: String,
    /// Give up on the estimate request after this many seconds (waits indefinitely by default)
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Calculate and render without saving the report
    #[arg(long, short = 'n', default_value_t = false)]
    dry_run: bool,
    #[command(flatten)]
    fallback: FallbackChoice,
}

#[derive(Args, Clone, Default, Debug)]
struct FallbackChoice {
    #[arg(long, conflicts_with_all = ["prompt_monthly"])]
    abort_on_estimate_failure: bool,
    #[arg(long)]
    prompt_monthly: bool,
    #[arg(long)]
    allow_missing_monthly: bool,
}

impl From<&FallbackChoice> for RunFlags {
    fn from(choice: &FallbackChoice) -> Self {
        let mut flags = RunFlags::empty();
        flags.set(
            RunFlags::ABORT_ON_ESTIMATE_FAILURE,
            choice.abort_on_estimate_failure,
        );
        flags.set(RunFlags::PROMPT_MONTHLY_ON_FALLBACK, choice.prompt_monthly);
        flags.set(RunFlags::ALLOW_MISSING_MONTHLY, choice.allow_missing_monthly);
        flags
    }
}

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let args = SolarArgs::parse();

    let parameters = ingest_parameters(
        BufReader::new(
            File::open(&args.config)
                .with_context(|| format!("opening {}", args.config.display()))?,
        ),
        BufReader::new(
            File::open(&args.utility)
                .with_context(|| format!("opening {}", args.utility.display()))?,
        ),
    )?;

    let estimator = PvWattsClient::new(&args.endpoint, args.timeout_secs.map(Duration::from_secs))?;
    let mut prompt = ConsolePrompt::stdio();
    let templates = DirectoryTemplates::new(args.templates.clone());
    let options = RunOptions {
        flags: (&args.fallback).into(),
        number_format: NumberFormat::en_us(),
        current_month: Local::now().format("%B %Y").to_string(),
    };

    let RecommendationOutcome { output_key, .. } = if args.dry_run {
        run_recommendation(&parameters, &estimator, &mut prompt, &templates, SinkOutput, &options)?
    } else {
        run_recommendation(
            &parameters,
            &estimator,
            &mut prompt,
            &templates,
            FileOutput::new(args.output_dir.clone(), REPORT_FILE_TEMPLATE.to_string()),
            &options,
        )?
    };

    if args.dry_run {
        println!("dry run, report AAR{output_key} was not saved");
    }
    println!("Please check if the grabbed info is correct.");

    Ok(())
}
