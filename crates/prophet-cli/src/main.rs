use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use prophet_core::llm::client_from_config;
use prophet_core::{
    grader_from_config, Config, FeasibilityClassifier, GradeScore, Pipeline, PipelineOutcome,
    Prediction, Question, ResearchProgress, ResearchReport,
};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "prophet")]
#[command(about = "Research-backed forecasting for yes/no questions", long_about = None)]
struct Cli {
    /// Config file to use instead of ./prophet.toml or ~/.config/prophet/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a question can be forecast through research
    Evaluate {
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Research a question and print the report
    Research {
        #[arg(required = true)]
        question: Vec<String>,
        /// Hand over raw evidence instead of a synthesized report
        #[arg(long)]
        raw: bool,
        /// Maximum number of search queries
        #[arg(long)]
        subqueries: Option<usize>,
        /// Write the report as markdown to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Evaluate, research and forecast a question
    Predict {
        #[arg(required = true)]
        question: Vec<String>,
        /// Hand over raw evidence instead of a synthesized report
        #[arg(long)]
        raw: bool,
        /// Write the research report as markdown to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Grade an existing report against a question
    Grade {
        #[arg(short, long)]
        question: String,
        /// Markdown or text file holding the report
        #[arg(short, long)]
        report: PathBuf,
    },
    /// Print the default configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    let start = Instant::now();

    match cli.command {
        Commands::Evaluate { question } => {
            let config = load_config(config_path)?;
            let question = Question::new(question.join(" "))?;
            let classifier = FeasibilityClassifier::new(client_from_config(&config.llm)?);

            let spinner = spinner("Evaluating question...")?;
            let feasibility = classifier.evaluate(&question).await;
            spinner.finish_and_clear();
            let feasibility = feasibility?;

            println!("Question: {}", question);
            println!("Is predictable: {}", feasibility.is_predictable);
            println!("Reasoning: {}", feasibility.reasoning);
        }
        Commands::Research {
            question,
            raw,
            subqueries,
            output,
        } => {
            let mut config = load_config(config_path)?;
            let question = Question::new(question.join(" "))?;
            if raw {
                config.research.use_summaries = false;
            }
            if let Some(limit) = subqueries {
                config.research.subqueries_limit = limit;
            }
            config.validate()?;

            let spinner = spinner("Researching...")?;
            let pipeline = Pipeline::from_config(&config)?.with_progress(forward_progress(&spinner));
            let report = pipeline.runner().run(&question).await;
            spinner.finish_and_clear();
            let report = report?;

            print_report(&report);
            if let Some(path) = output {
                write_report(&path, &report)?;
            }
        }
        Commands::Predict {
            question,
            raw,
            output,
            json,
        } => {
            let mut config = load_config(config_path)?;
            let question = Question::new(question.join(" "))?;
            if raw {
                config.research.use_summaries = false;
            }

            let spinner = spinner("Evaluating question...")?;
            let pipeline = Pipeline::from_config(&config)?.with_progress(forward_progress(&spinner));
            let outcome = pipeline.run(&question).await;
            spinner.finish_and_clear();
            let outcome = outcome?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_outcome(&question, &outcome);
            }
            if let (Some(path), PipelineOutcome::Predicted { report, .. }) = (output, &outcome) {
                write_report(&path, report)?;
            }
        }
        Commands::Grade { question, report } => {
            let config = load_config(config_path)?;
            let question = Question::new(question)?;
            let report = std::fs::read_to_string(&report)
                .wrap_err_with(|| format!("Failed to read report {}", report.display()))?;
            let grader = grader_from_config(&config)?;

            let spinner = spinner("Grading report...")?;
            let grade = grader.grade(&question, &report).await;
            spinner.finish_and_clear();

            print_grade(&grade?);
        }
        Commands::Config => {
            print!("{}", Config::default_config_string());
            return Ok(());
        }
    }

    eprintln!("Time elapsed: {:.1?}", start.elapsed());
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    }
    .wrap_err("Failed to load configuration")
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("prophet_core=info,prophet=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Mirrors research progress onto the spinner message.
fn forward_progress(spinner: &ProgressBar) -> mpsc::UnboundedSender<ResearchProgress> {
    let (tx, mut rx) = mpsc::unbounded_channel::<ResearchProgress>();
    let spinner = spinner.clone();
    tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            spinner.set_message(describe(&progress));
        }
    });
    tx
}

fn describe(progress: &ResearchProgress) -> String {
    match progress {
        ResearchProgress::Started => "Planning search queries...".to_string(),
        ResearchProgress::Planned { queries } => format!("Searching {} queries...", queries.len()),
        ResearchProgress::Searched { query, results } => {
            format!("Found {} results for \"{}\"", results, query)
        }
        ResearchProgress::Scraped { documents, failed } => {
            format!("Scraped {} pages ({} failed), embedding...", documents, failed)
        }
        ResearchProgress::Indexed { chunks } => format!("Indexed {} chunks, retrieving...", chunks),
        ResearchProgress::Retrieved { chunks } => format!("Retrieved {} chunks", chunks),
        ResearchProgress::Synthesizing => "Writing report...".to_string(),
        ResearchProgress::Complete => "Predicting...".to_string(),
    }
}

fn print_report(report: &ResearchReport) {
    println!("{}", report.to_markdown());
    println!(
        "({} from {} chunks across {} sources)",
        report.mode.as_str(),
        report.evidence_count,
        report.sources.len()
    );
}

fn print_outcome(question: &Question, outcome: &PipelineOutcome) {
    println!("Question: {}", question);
    match outcome {
        PipelineOutcome::Unpredictable { reasoning } => {
            println!("Is predictable: false");
            println!("The question is not predictable:\n\n{}", reasoning);
        }
        PipelineOutcome::Predicted {
            feasibility,
            report,
            prediction,
        } => {
            println!("Is predictable: true ({})", feasibility.reasoning);
            println!();
            print_report(report);
            println!();
            print_prediction(prediction);
        }
    }
}

fn print_prediction(prediction: &Prediction) {
    println!("## Prediction\n");
    println!("Probability: {:.1}%", prediction.p_yes() * 100.0);
    println!("Confidence:  {:.1}%", prediction.confidence() * 100.0);
    if let Some(utility) = prediction.info_utility() {
        println!("Info utility: {:.1}%", utility * 100.0);
    }
}

fn print_grade(grade: &GradeScore) {
    for (metric, score) in grade.iter() {
        println!("{:<16} {:>4.1}  {}", metric.as_str(), score.score, score.reasoning);
    }
    println!("{:<16} {:>4.1}", "mean", grade.mean());
}

fn write_report(path: &Path, report: &ResearchReport) -> Result<()> {
    std::fs::write(path, report.to_markdown())
        .wrap_err_with(|| format!("Failed to write report to {}", path.display()))?;
    eprintln!("Report written to {}", path.display());
    Ok(())
}
