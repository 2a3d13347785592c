//! Book Recommender — collaborative-filtering book recommendations.
//!
//! Runs individual pipeline stages, the full training pipeline, one-off
//! recommendation queries, or the web UI.

use anyhow::Context;
use bookrec_api::ApiServer;
use bookrec_core::config::CONFIG_FILE_PATH;
use bookrec_core::AppConfig;
use bookrec_pipeline::{
    DataIngestion, DataTransformation, DataValidation, ModelEvaluator, ModelTrainer,
    TrainingPipeline,
};
use bookrec_recommender::Recommender;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "book-recommender")]
#[command(about = "Collaborative-filtering book recommender")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(long, env = "BOOK_RECOMMENDER_CONFIG", default_value = CONFIG_FILE_PATH)]
    config: PathBuf,

    /// Place every artifact under this directory (overrides config)
    #[arg(long)]
    artifacts_root: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download the raw books, ratings and users tables
    Ingest,
    /// Join and filter the raw tables into the clean rating table
    Validate,
    /// Build the title × user pivot table
    Transform,
    /// Fit the nearest-neighbour model
    Train,
    /// Compute recall@k of the trained model
    Evaluate,
    /// Run every stage in order
    Pipeline {
        /// Reuse raw files already on disk
        #[arg(long, default_value_t = false)]
        skip_ingestion: bool,
        /// Do not run the evaluation stage
        #[arg(long, default_value_t = false)]
        skip_evaluation: bool,
    },
    /// Print five books similar to TITLE
    Recommend { title: String },
    /// Serve the web UI
    Serve {
        /// HTTP port (overrides config)
        #[arg(long, env = "BOOK_RECOMMENDER__API__HTTP_PORT")]
        http_port: Option<u16>,
        /// Train from raw files on disk instead of downloading them
        #[arg(long, default_value_t = false)]
        skip_ingestion: bool,
    },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "book_recommender=info,bookrec=info,tower_http=info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    info!("Book Recommender starting up");

    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    if let Some(root) = &cli.artifacts_root {
        config = config.with_artifacts_root(root);
    }
    info!(config = %cli.config.display(), "Configuration loaded");

    match cli.command {
        Command::Serve {
            http_port,
            skip_ingestion,
        } => {
            if let Some(port) = http_port {
                config.api.http_port = port;
            }
            let server = ApiServer::new(config, skip_ingestion);
            if let Err(e) = server.start_metrics().await {
                error!(error = %e, "Failed to start metrics exporter");
            }
            info!("Book Recommender is ready to serve traffic");
            server.start_http().await?;
        }
        command => {
            // Stages block on file and network I/O.
            tokio::task::spawn_blocking(move || run_batch(command, &config)).await??;
        }
    }

    Ok(())
}

fn run_batch(command: Command, config: &AppConfig) -> anyhow::Result<()> {
    match command {
        Command::Ingest => {
            let files = DataIngestion::new(config.data_ingestion()).initiate_data_ingestion()?;
            for (source, path) in files {
                println!("{}\t{}", source, path.display());
            }
        }
        Command::Validate => {
            let rows = DataValidation::new(config.data_validation()?).initiate_data_validation()?;
            println!("clean rows: {}", rows.len());
        }
        Command::Transform => {
            let pivot =
                DataTransformation::new(config.data_transformation()).initiate_data_transformation()?;
            let (titles, users) = pivot.shape();
            println!("pivot: {} titles x {} users", titles, users);
        }
        Command::Train => {
            let model = ModelTrainer::new(config.model_trainer()).initiate_model_trainer()?;
            println!("model fitted on {} titles", model.n_samples());
        }
        Command::Evaluate => {
            let report = ModelEvaluator::new(config.evaluation()).initiate_model_evaluation()?;
            println!(
                "recall@{}: {:.4} ({} users evaluated, {} skipped)",
                report.top_k, report.recall_at_k, report.users_evaluated, report.users_skipped
            );
        }
        Command::Pipeline {
            skip_ingestion,
            skip_evaluation,
        } => {
            let outcome = TrainingPipeline::new(config.clone())
                .skip_ingestion(skip_ingestion)
                .with_evaluation(!skip_evaluation)
                .start_training_pipeline()?;
            println!("Training Completed!");
            println!(
                "clean rows: {}, pivot: {} titles x {} users",
                outcome.clean_rows, outcome.titles, outcome.users
            );
            if let Some(report) = outcome.evaluation {
                println!("recall@{}: {:.4}", report.top_k, report.recall_at_k);
            }
        }
        Command::Recommend { title } => {
            let recommendation = Recommender::new(config.recommendation()).recommend_book(&title)?;
            println!("Books similar to {}:", recommendation.query);
            for (title, url) in recommendation.titles.iter().zip(&recommendation.poster_urls) {
                println!("  {}\t{}", title, url);
            }
        }
        Command::Serve { .. } => anyhow::bail!("serve is not a batch command"),
    }
    Ok(())
}
