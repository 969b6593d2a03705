use anyhow::{bail, Context};
use batchgen::config::GenerateConfig;
use batchgen::generation::{
    BatchRunner, GenerationMode, JsonPostProcessor, LenientJsonPostProcessor, OpenAiChatBackend,
    PassthroughPostProcessor, PromptStore, RunOutcome,
};
use batchgen::memory::{load_records, RecordSet, ResultSetLoader};
use clap::{Parser, Subcommand, ValueEnum};
use std::error::Error as _;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "batchgen", version, about = "Resumable batched prompt generation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Single,
    Consecutive,
}

impl From<ModeArg> for GenerationMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Single => GenerationMode::SingleTurn,
            ModeArg::Consecutive => GenerationMode::Consecutive,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PostProcessArg {
    Text,
    Json,
    Lenient,
}

#[derive(Subcommand)]
enum Commands {
    /// Run or resume a generation job.
    Generate {
        #[arg(long)]
        config: PathBuf,
        /// JSON array or JSON Lines dataset.
        #[arg(long)]
        data: PathBuf,
        #[arg(long, default_value = "prompts")]
        prompts_dir: PathBuf,
        #[arg(long, value_enum, default_value_t = ModeArg::Consecutive)]
        mode: ModeArg,
        #[arg(long, value_enum, default_value_t = PostProcessArg::Json)]
        post_process: PostProcessArg,
        #[arg(long)]
        overwrite: bool,
        #[arg(long)]
        debug_mode: Option<usize>,
        #[arg(long)]
        budget: Option<usize>,
    },
    /// Summarise a results file.
    Status {
        #[arg(long)]
        results: PathBuf,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Generate {
            config,
            data,
            prompts_dir,
            mode,
            post_process,
            overwrite,
            debug_mode,
            budget,
        } => {
            let mut generate_config = GenerateConfig::load_from_path(&config)
                .with_context(|| format!("cannot load generation config {:?}", config))?;
            let job = &mut generate_config.job;
            job.overwrite |= overwrite;
            if debug_mode.is_some() {
                job.debug_mode = debug_mode;
            }
            if budget.is_some() {
                job.budget = budget;
            }

            let prompts = PromptStore::load(&generate_config.prompt_paths(&prompts_dir))?;
            let records = load_records(&data)?;
            info!(records = records.len(), dataset = %data.display(), "dataset loaded");

            let backend = OpenAiChatBackend::from_env()?;
            let runner = BatchRunner::new(generate_config.job, prompts, Arc::new(backend))?;
            let runner = match post_process {
                PostProcessArg::Text => runner.with_post_processor(PassthroughPostProcessor),
                PostProcessArg::Json => runner.with_post_processor(JsonPostProcessor),
                PostProcessArg::Lenient => runner.with_post_processor(LenientJsonPostProcessor),
            };

            match runner.run(records, mode.into())? {
                RunOutcome::Completed(stats) => {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                }
                RunOutcome::Suspended {
                    index,
                    error,
                    stats,
                } => {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                    let cause = error
                        .source()
                        .map(|source| format!(": {source}"))
                        .unwrap_or_default();
                    bail!(
                        "run suspended at record {index} ({error}{cause}); results saved to {:?}, run again to resume",
                        runner.config().results_json_path
                    );
                }
            }
        }
        Commands::Status { results } => {
            let records = ResultSetLoader::load_from_path(&results)?
                .with_context(|| format!("no results at {:?}", results))?;
            let progress = RecordSet::new(records).progress();
            println!("{}", serde_json::to_string_pretty(&progress)?);
        }
    }

    Ok(())
}
