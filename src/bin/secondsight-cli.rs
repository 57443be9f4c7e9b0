use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use secondsight::{
    AnalysisOutcome, DEFAULT_CONCURRENCY_LIMIT, DEFAULT_OUTPUT_DIR, DEFAULT_PROMPT,
    FfmpegLogLevel, FrameResult, FrameSampler, InferenceConfig, PipelineEvent, PipelineOptions,
    ProgressCallback, ProgressInfo, Stage, VideoAnalyzer,
};
use tracing_subscriber::EnvFilter;

const CLI_AFTER_HELP: &str = "Examples:\n  secondsight analyze clip.mp4\n  secondsight analyze clip.mp4 --workers 3 --out results --progress\n  secondsight analyze clip.mp4 --prompt-file prompt.txt --aggregate --no-save\n  secondsight probe clip.mp4 --json\n  secondsight completions zsh > _secondsight\n\nEnvironment:\n  OPENAI_API_KEY (required), OPENAI_BASE_URL, OPENAI_MODEL,\n  OPENAI_MAX_TOKENS, OPENAI_TIMEOUT_SECS. A .env file is loaded if present.";

#[derive(Debug, Parser)]
#[command(
    name = "secondsight",
    version,
    about = "Classify what happens in every second of a video",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging (RUST_LOG overrides).
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar.
    #[arg(long, global = true)]
    progress: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    ffmpeg_log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sample one frame per second and classify each with the vision model.
    #[command(
        about = "Analyze a video",
        after_help = "Examples:\n  secondsight analyze clip.mp4\n  secondsight analyze clip.mp4 --workers 3 --aggregate"
    )]
    Analyze {
        /// Input video path.
        input: PathBuf,
        /// Read the prompt template from this file instead of the built-in one.
        #[arg(long)]
        prompt_file: Option<PathBuf>,
        /// Maximum concurrent inference calls.
        #[arg(long, default_value_t = DEFAULT_CONCURRENCY_LIMIT)]
        workers: usize,
        /// Directory for the per-video JSON file.
        #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
        out: PathBuf,
        /// Do not write results to disk.
        #[arg(long)]
        no_save: bool,
        /// Print the aggregate object as JSON on stdout; the report moves to stderr.
        #[arg(long)]
        aggregate: bool,
        /// Refuse inputs whose extension is not a supported container.
        #[arg(long)]
        strict_format: bool,
    },

    /// Print video metadata.
    #[command(about = "Print video metadata", visible_alias = "info")]
    Probe {
        /// Input video path.
        input: PathBuf,
        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_log_level(value: &str) -> Option<FfmpegLogLevel> {
    let lowered = value.to_ascii_lowercase();
    let lowered = if lowered == "warn" { "warning".to_string() } else { lowered };
    FfmpegLogLevel::ALL
        .into_iter()
        .find(|level| level.name() == lowered)
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "secondsight=debug" } else { "secondsight=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(global.verbose);

    if let Some(level) = &global.ffmpeg_log_level {
        let parsed = parse_log_level(level)
            .ok_or(format!("unsupported --ffmpeg-log-level: {level}"))?;
        secondsight::set_ffmpeg_log_level(parsed);
    }

    Ok(())
}

fn load_prompt(prompt_file: Option<&Path>) -> Result<String, Box<dyn std::error::Error>> {
    match prompt_file {
        Some(path) => {
            let template = fs::read_to_string(path)
                .map_err(|error| format!("cannot read prompt file {}: {error}", path.display()))?;
            if template.trim().is_empty() {
                return Err(format!("prompt file {} is empty", path.display()).into());
            }
            Ok(template)
        }
        None => Ok(DEFAULT_PROMPT.to_string()),
    }
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Sampling => "sampling",
        Stage::Encoding => "encoding",
        Stage::Analysis => "analyzing",
        _ => "working",
    }
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
        self.bar.set_message(stage_label(info.stage));
    }

    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::SamplingStarted { metadata } => {
                self.bar
                    .println(format!("{} {metadata}", "video:".cyan().bold()));
            }
            PipelineEvent::SamplingFinished { frames } => {
                self.bar
                    .println(format!("{} {frames} frame(s) sampled", "info:".cyan().bold()));
            }
            PipelineEvent::AnalysisFinished { .. } => self.bar.finish_and_clear(),
            _ => {}
        }
    }
}

fn describe_result(result: &FrameResult) -> String {
    match result.record() {
        Some(record) => {
            let sub_action = if record.sub_action.is_empty() {
                String::new()
            } else {
                format!(" / {}", record.sub_action)
            };
            format!(
                "[ok] second {}: {}{} - {}",
                record.second, record.overall_action, sub_action, record.description
            )
        }
        None => format!(
            "[failed] second {}: {}",
            result.second,
            result.error().unwrap_or("unknown error")
        ),
    }
}

/// Human-readable report of a run.
///
/// With `--aggregate` this goes to stderr so stdout carries only JSON.
fn print_outcome(outcome: &AnalysisOutcome, out: &mut dyn Write) -> std::io::Result<()> {
    for result in &outcome.batch {
        let line = describe_result(result);
        if result.is_success() {
            writeln!(out, "{}", line.green())?;
        } else {
            writeln!(out, "{}", line.red())?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", outcome.summary)?;

    if let Some(path) = &outcome.saved_to {
        writeln!(
            out,
            "{} saved {} record(s) to {}",
            "success:".green().bold(),
            outcome.summary.successful,
            path.display()
        )?;
    }
    if let Some(reason) = &outcome.persistence_error {
        writeln!(out, "{} {}", "warning:".yellow().bold(), reason.yellow())?;
    }
    if !outcome.summary.is_complete() {
        writeln!(
            out,
            "{} {}/{} frame(s) failed",
            "warning:".yellow().bold(),
            outcome.summary.failed,
            outcome.summary.total_frames
        )?;
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Analyze {
            input,
            prompt_file,
            workers,
            out,
            no_save,
            aggregate,
            strict_format,
        } => {
            if strict_format {
                secondsight::ensure_supported(&input)?;
            }

            let template = load_prompt(prompt_file.as_deref())?;
            let config = InferenceConfig::from_env()?;

            let mut options = PipelineOptions::new().with_concurrency_limit(workers);
            options = if no_save {
                options.without_persistence()
            } else {
                options.with_output_dir(&out)
            };
            if cli.global.progress {
                options = options.with_progress(Arc::new(TerminalProgress::new()?));
            }

            let analyzer = VideoAnalyzer::from_config(config, options)?;
            let runtime = tokio::runtime::Runtime::new()?;
            let outcome = runtime.block_on(analyzer.analyze(&input, &template))?;

            if aggregate {
                print_outcome(&outcome, &mut std::io::stderr().lock())?;
                println!(
                    "{}",
                    serde_json::to_string_pretty(&outcome.batch.aggregate())?
                );
            } else {
                print_outcome(&outcome, &mut std::io::stdout().lock())?;
            }
        }
        Commands::Probe { input, json } => {
            let metadata = FrameSampler::new().probe(&input)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&metadata)?);
            } else {
                println!("Resolution: {}x{}", metadata.width, metadata.height);
                println!("Frame rate: {:.3} fps", metadata.frames_per_second);
                println!("Frames: ~{}", metadata.frame_count);
                println!("Duration: {:.2}s", metadata.duration.as_secs_f64());
                println!("Codec: {}", metadata.codec);
                println!("Samples: ~{}", metadata.expected_samples());
                if !secondsight::is_supported_video_format(&input) {
                    eprintln!(
                        "{} {}",
                        "warning:".yellow().bold(),
                        "extension is not one of the commonly supported formats".yellow()
                    );
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "secondsight", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
