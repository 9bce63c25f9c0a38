//! aboutme CLI entry point.
//!
//! Provides `chat` (interactive), `ask` (one-shot), and the `prompt`,
//! `profile` and `suggestions` inspection subcommands.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use aboutme::adapters::cli::{profile_preview, run_repl, write_report, ReplExit};
use aboutme::client::{CompletionClient, GenerationParameters};
use aboutme::config::{runtime_paths, Config};
use aboutme::credentials::{load_default_credentials, process_env, resolve_model, Credentials};
use aboutme::prompt::Persona;
use aboutme::session::{ChatSession, Interaction, Outcome};
use aboutme::suggestions::SuggestionCatalog;

/// aboutme: chat with an assistant that knows your profile.
#[derive(Parser)]
#[command(name = "aboutme", version, about)]
struct Cli {
    /// Settings that override the config file.
    #[command(flatten)]
    overrides: Overrides,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Command-line overrides shared by every subcommand.
#[derive(Args)]
struct Overrides {
    /// Config file (default: $ABOUTME_CONFIG_PATH or ./aboutme.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Completion model.
    #[arg(long, global = true)]
    model: Option<String>,
    /// Sampling temperature in [0.0, 1.2].
    #[arg(long, global = true)]
    temperature: Option<f64>,
    /// Prompt persona: concierge, avatar or grounded.
    #[arg(long, global = true)]
    persona: Option<Persona>,
    /// Knowledge-base text file.
    #[arg(long, global = true)]
    knowledge_base: Option<PathBuf>,
    /// Structured profile JSON file.
    #[arg(long, global = true)]
    profile_json: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Start an interactive chat.
    Chat,
    /// Ask a single question and print the reply.
    Ask {
        /// Question text. Takes precedence over --suggestion.
        question: Option<String>,
        /// Ask suggested question N instead (see `suggestions`).
        #[arg(long)]
        suggestion: Option<usize>,
    },
    /// Print the compiled system prompt.
    Prompt,
    /// Print the profile as JSON.
    Profile,
    /// List the suggested questions.
    Suggestions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _logging_guard = match cli.command {
        Command::Chat => {
            let paths = runtime_paths()?;
            Some(aboutme::logging::init_session(&paths.logs_dir)?)
        }
        _ => {
            aboutme::logging::init_cli();
            None
        }
    };

    let mut config = Config::load(cli.overrides.config.as_deref())
        .context("failed to load configuration")?;
    apply_cli_overrides(&mut config, &cli.overrides);

    match cli.command {
        Command::Chat => handle_chat(&config, &cli.overrides).await,
        Command::Ask {
            question,
            suggestion,
        } => handle_ask(&config, &cli.overrides, question, suggestion).await,
        Command::Prompt => handle_prompt(&config, &cli.overrides),
        Command::Profile => {
            let session = build_session(&config, &cli.overrides, Credentials::default())?;
            println!("{}", profile_preview(&session));
            Ok(())
        }
        Command::Suggestions => {
            for (number, question) in (1_usize..).zip(catalog_from(&config).questions()) {
                println!("{number}. {question}");
            }
            Ok(())
        }
    }
}

/// Run the interactive REPL on stdin/stdout.
async fn handle_chat(config: &Config, overrides: &Overrides) -> anyhow::Result<()> {
    let credentials = load_default_credentials().context("failed to load secret store")?;
    let mut session = build_session(config, overrides, credentials)?;
    info!(
        model = session.params().model(),
        persona = ?session.persona(),
        "chat session started"
    );

    println!("Chatting about {}. Type /help for commands.", session.profile().name);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let exit = run_repl(&mut session, config.chat.greeting.as_deref(), stdin, &mut stdout).await?;

    info!(?exit, turns = session.log().len(), "chat session ended");
    if exit == ReplExit::Halted {
        anyhow::bail!("chat stopped: no API key configured");
    }
    Ok(())
}

/// Run one interaction and print the reply.
async fn handle_ask(
    config: &Config,
    overrides: &Overrides,
    question: Option<String>,
    suggestion: Option<usize>,
) -> anyhow::Result<()> {
    let credentials = load_default_credentials().context("failed to load secret store")?;
    let mut session = build_session(config, overrides, credentials)?;

    let suggested = match suggestion {
        Some(number) => Some(
            session
                .catalog()
                .get(number)
                .map(str::to_owned)
                .ok_or_else(|| anyhow::anyhow!("no suggestion {number}, see `aboutme suggestions`"))?,
        ),
        None => None,
    };
    if question.is_none() && suggested.is_none() {
        anyhow::bail!("nothing to ask: pass a QUESTION or --suggestion N");
    }

    let report = session
        .interact(Interaction {
            typed: question,
            suggestion: suggested,
            clear: false,
        })
        .await;

    match &report.outcome {
        Outcome::Replied(reply) => {
            for warning in &report.warnings {
                eprintln!("warning: {warning}");
            }
            println!("{reply}");
            Ok(())
        }
        Outcome::Idle | Outcome::Failed(_) => {
            let mut stderr = std::io::stderr();
            write_report(&report, &mut stderr)?;
            stderr.flush()?;
            anyhow::bail!("no reply")
        }
    }
}

/// Print the compiled system prompt, with document warnings on stderr.
fn handle_prompt(config: &Config, overrides: &Overrides) -> anyhow::Result<()> {
    let mut session = build_session(config, overrides, Credentials::default())?;
    for warning in session.render() {
        eprintln!("warning: {warning}");
    }
    println!("{}", session.system_prompt());
    Ok(())
}

fn apply_cli_overrides(config: &mut Config, overrides: &Overrides) {
    if let Some(persona) = overrides.persona {
        config.chat.persona = persona;
    }
    if let Some(path) = &overrides.knowledge_base {
        config.documents.knowledge_base = Some(path.clone());
    }
    if let Some(path) = &overrides.profile_json {
        config.documents.structured_profile = Some(path.clone());
    }
}

fn catalog_from(config: &Config) -> SuggestionCatalog {
    config
        .chat
        .suggestions
        .clone()
        .map(SuggestionCatalog::new)
        .unwrap_or_default()
}

/// Assemble a session. Model precedence: flag > secret store > env > config.
fn build_session(
    config: &Config,
    overrides: &Overrides,
    credentials: Credentials,
) -> anyhow::Result<ChatSession> {
    let model = overrides
        .model
        .clone()
        .or_else(|| resolve_model(&credentials, process_env))
        .unwrap_or_else(|| config.model.name.clone());
    let temperature = overrides.temperature.unwrap_or(config.model.temperature);
    let params =
        GenerationParameters::new(model, temperature).context("invalid generation parameters")?;

    let client = CompletionClient::openai(credentials, config.model.base_url.clone());
    Ok(ChatSession::new(
        config.profile.clone(),
        config.documents.sources(),
        config.chat.persona,
        params,
        client,
    )
    .with_catalog(catalog_from(config)))
}
