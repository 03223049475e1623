//! CLI binary for doc2study.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `GenerationConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use doc2study::{
    ArtifactKind, Artifacts, AttemptError, CourseKey, CourseRecord, FileDocumentReader,
    GenerationConfig, GenerationProgressCallback, GenerationRequest, PageSelection,
    ProgressCallback, ProviderModel, SqliteStore, StudyPipeline,
};
use doc2study::{CompletionModel, ModelError};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that reports each generation attempt and retry on stderr.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading document…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_generation_start(&self, kind: ArtifactKind, count: usize) {
        self.bar.set_prefix("Generating");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Requesting {count} {kind}…"))
        ));
    }

    fn on_attempt_start(&self, attempt: u32, max_attempts: u32) {
        self.bar
            .set_message(format!("attempt {attempt}/{max_attempts}"));
    }

    fn on_attempt_failed(&self, error: &AttemptError, max_attempts: u32) {
        let msg = error.to_string();
        // Truncate very long error messages to keep output tidy.
        let msg = if msg.chars().count() > 80 {
            format!("{}\u{2026}", msg.chars().take(79).collect::<String>())
        } else {
            msg
        };
        self.bar.println(format!(
            "  {} Attempt {}/{}  {}",
            red("✗"),
            error.attempt(),
            max_attempts,
            red(&msg)
        ));
    }

    fn on_retry_scheduled(&self, next_attempt: u32, delay_ms: u64) {
        self.bar
            .set_message(format!("retrying in {delay_ms}ms (attempt {next_attempt})"));
    }

    fn on_generation_complete(&self, artifact_count: usize, attempts: u32) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} artifacts generated  {}",
            green("✔"),
            bold(&artifact_count.to_string()),
            dim(&format!("{attempts} attempt(s)"))
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Preview how a deck splits into pages
  doc2study pages lecture.pptx

  # Eight flashcards from the whole document
  doc2study generate lecture.pptx --user ana --course biology

  # Quiz from pages 3 and 1, in that order
  doc2study generate notes.docx --user ana --course "intro to chemistry" \
      --pages 3,1 --kind quiz --count 5

  # Everything stored for a course, as JSON
  doc2study show --user ana --course biology --json

  # Courses a user has material for
  doc2study courses --user ana

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY           OpenAI API key
  ANTHROPIC_API_KEY        Anthropic API key
  GEMINI_API_KEY           Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER   Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL          Override model ID
  DOC2STUDY_DATABASE_URL   Course store (default sqlite://doc2study.db)
  PDFIUM_LIB_PATH          Path to libpdfium for PDF input
"#;

/// Generate flashcards and quizzes from course documents using LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "doc2study",
    version,
    about = "Generate flashcards and quizzes from PDF, DOCX and PPTX course material",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// SQLite URL of the course store.
    #[arg(
        long,
        global = true,
        env = "DOC2STUDY_DATABASE_URL",
        default_value = "sqlite://doc2study.db"
    )]
    database_url: String,

    /// Maximum text lines per selectable page.
    #[arg(long, global = true, env = "DOC2STUDY_LINES_PER_PAGE", default_value_t = 25)]
    lines_per_page: usize,

    /// Output structured JSON instead of text.
    #[arg(long, global = true, env = "DOC2STUDY_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOC2STUDY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, global = true, env = "DOC2STUDY_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the numbered pages of a document.
    Pages {
        /// PDF, DOCX or PPTX file.
        input: PathBuf,
    },
    /// Generate artifacts and merge them into a course.
    Generate(GenerateArgs),
    /// Print everything stored for a course.
    Show {
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "")]
        course: String,
    },
    /// List a user's courses.
    Courses {
        #[arg(long)]
        user: String,
    },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// PDF, DOCX or PPTX file.
    input: PathBuf,

    #[arg(long)]
    user: String,

    /// Course name; title-cased, blank means "General".
    #[arg(long, default_value = "")]
    course: String,

    /// Page selection: all, 5, 3-7, or 2,1,4 (caller order).
    #[arg(long, default_value = "all")]
    pages: String,

    /// Number of artifacts to request.
    #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u64).range(1..))]
    count: u64,

    #[arg(long, value_enum, default_value = "flashcards")]
    kind: KindArg,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Total generation attempts.
    #[arg(long, env = "DOC2STUDY_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Fixed delay between attempts in milliseconds.
    #[arg(long, env = "DOC2STUDY_RETRY_BACKOFF_MS", default_value_t = 1000)]
    retry_backoff_ms: u64,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "DOC2STUDY_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "DOC2STUDY_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max LLM output tokens per attempt.
    #[arg(long, env = "DOC2STUDY_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Reject quiz questions whose answer is not one of the options.
    #[arg(long, env = "DOC2STUDY_STRICT_ANSWERS")]
    strict_answers: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "DOC2STUDY_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Flashcards,
    Quiz,
}

impl From<KindArg> for ArtifactKind {
    fn from(v: KindArg) -> Self {
        match v {
            KindArg::Flashcards => ArtifactKind::Flashcards,
            KindArg::Quiz => ArtifactKind::Quiz,
        }
    }
}

/// Stand-in model for commands that never generate.
struct NoModel;

#[async_trait::async_trait]
impl CompletionModel for NoModel {
    async fn complete(&self, _prompt: &str) -> Result<String, ModelError> {
        Err(ModelError::new("no model configured for this command"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO library logs would interleave with the spinner, so they stay off
    // unless asked for.
    let show_progress = matches!(&cli.command, Command::Generate(args) if !args.no_progress)
        && !cli.quiet
        && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Pages { input } => run_pages(&cli, input).await,
        Command::Generate(args) => run_generate(&cli, args, show_progress).await,
        Command::Show { user, course } => {
            let pipeline = offline_pipeline(&cli).await?;
            let record = pipeline
                .course(&CourseKey::new(user.as_str(), course))
                .await
                .context("Failed to read course")?;
            print_record(&record, cli.json)
        }
        Command::Courses { user } => {
            let pipeline = offline_pipeline(&cli).await?;
            let courses = pipeline
                .courses(user)
                .await
                .context("Failed to list courses")?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&courses)?);
            } else if courses.is_empty() {
                eprintln!("{}", dim(&format!("No courses for {user}")));
            } else {
                for course in courses {
                    println!("{course}");
                }
            }
            Ok(())
        }
    }
}

fn base_config(cli: &Cli) -> doc2study::GenerationConfigBuilder {
    GenerationConfig::builder().lines_per_page(cli.lines_per_page)
}

/// Pipeline for commands that only read documents or the store.
async fn offline_pipeline(cli: &Cli) -> Result<StudyPipeline> {
    let config = base_config(cli).build().context("Invalid configuration")?;
    let store = SqliteStore::connect(&cli.database_url)
        .await
        .with_context(|| format!("Failed to open store {}", cli.database_url))?;
    Ok(StudyPipeline::new(
        Arc::new(FileDocumentReader),
        Arc::new(NoModel),
        Arc::new(store),
        config,
    ))
}

async fn run_pages(cli: &Cli, input: &Path) -> Result<()> {
    let config = base_config(cli).build().context("Invalid configuration")?;
    let pipeline = StudyPipeline::new(
        Arc::new(FileDocumentReader),
        Arc::new(NoModel),
        Arc::new(doc2study::MemoryStore::new()),
        config,
    );
    let upload = pipeline
        .open(input)
        .with_context(|| format!("Cannot open {}", input.display()))?;
    let pages = pipeline
        .pages(&upload)
        .await
        .context("Failed to read document")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&pages)?);
        return Ok(());
    }
    for page in &pages {
        println!(
            "{} {}",
            bold(&format!("── Page {} ", page.index)),
            dim(&format!("({} lines)", page.line_count()))
        );
        println!("{}\n", page.text());
    }
    if !cli.quiet {
        eprintln!("{} pages", pages.len());
    }
    Ok(())
}

async fn run_generate(cli: &Cli, args: &GenerateArgs, show_progress: bool) -> Result<()> {
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn GenerationProgressCallback>)
    } else {
        None
    };

    let mut builder = base_config(cli)
        .max_attempts(args.max_attempts)
        .retry_backoff_ms(args.retry_backoff_ms)
        .api_timeout_secs(args.api_timeout)
        .temperature(args.temperature)
        .max_tokens(args.max_tokens)
        .enforce_quiz_answers(args.strict_answers);
    if let Some(ref model) = args.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    let pages: PageSelection = args
        .pages
        .parse()
        .with_context(|| format!("Invalid --pages '{}'", args.pages))?;
    let model = ProviderModel::from_config(&config).context("No LLM provider available")?;
    let store = SqliteStore::connect(&cli.database_url)
        .await
        .with_context(|| format!("Failed to open store {}", cli.database_url))?;
    let pipeline = StudyPipeline::new(
        Arc::new(FileDocumentReader),
        Arc::new(model),
        Arc::new(store),
        config,
    );

    let upload = pipeline
        .open(&args.input)
        .with_context(|| format!("Cannot open {}", args.input.display()))?;
    let request = GenerationRequest::new(CourseKey::new(args.user.as_str(), &args.course))
        .pages(pages)
        .count(args.count as usize)
        .kind(args.kind.into());
    let report = pipeline
        .generate(&upload, &request)
        .await
        .context("Generation failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print_artifacts(&report.artifacts);
    if !cli.quiet {
        eprintln!(
            "{}  {} new / {} generated  →  {}  {}",
            green("✔"),
            report.added,
            report.artifacts.len(),
            bold(&report.key.to_string()),
            dim(&format!("pages {:?} of {}, {}ms", report.pages, report.total_pages, report.duration_ms)),
        );
    }
    Ok(())
}

fn print_artifacts(artifacts: &Artifacts) {
    match artifacts {
        Artifacts::Flashcards(cards) => {
            for (i, card) in cards.iter().enumerate() {
                println!("{}. {}", i + 1, bold(&card.front));
                println!("   {}\n", card.back);
            }
        }
        Artifacts::Quiz(questions) => {
            for (i, q) in questions.iter().enumerate() {
                println!("{}. {}", i + 1, bold(&q.question));
                for (letter, option) in ('A'..='D').zip(&q.options) {
                    let line = format!("   {letter}) {option}");
                    if *option == q.answer {
                        println!("{}", green(&line));
                    } else {
                        println!("{line}");
                    }
                }
                println!();
            }
        }
    }
}

fn print_record(record: &CourseRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }
    println!("{}", bold(&record.key.to_string()));
    if record.is_empty() {
        eprintln!("{}", dim("Nothing stored yet"));
        return Ok(());
    }
    if !record.flashcards.is_empty() {
        println!("\n{}", cyan(&format!("Flashcards ({})", record.flashcards.len())));
        print_artifacts(&Artifacts::Flashcards(record.flashcards.clone()));
    }
    if !record.quizzes.is_empty() {
        println!("\n{}", cyan(&format!("Quiz ({})", record.quizzes.len())));
        print_artifacts(&Artifacts::Quiz(record.quizzes.clone()));
    }
    Ok(())
}
