use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commit_coach::engine::guidance;
use commit_coach::{
    CoachConfig, CoachError, CommitmentAnalyzer, ConsoleTransport, HeuristicAnalyzer,
    InMemorySessionStore, JsonlCommitmentStore, RetryOrchestrator, SessionOutcome, UserChoice,
    spawn_sweeper,
};

/// Commit-Coach CLI: guided SMART commitment refinement
#[derive(Parser, Debug)]
#[command(name = "commit-coach")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run an interactive refinement dialogue for one commitment
    #[command(name = "run")]
    Run {
        #[command(flatten)]
        args: RunArgs,
    },

    /// Score a commitment once and print the analysis
    #[command(name = "score")]
    Score {
        /// Commitment text to score
        #[arg(short, long)]
        text: String,
    },
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// User identifier for the session
    #[arg(short, long, default_value = "local")]
    user: String,

    /// Commitment text (prompted for interactively if omitted)
    #[arg(short, long)]
    text: Option<String>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the commitment ledger
    #[arg(short, long)]
    ledger_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Run { args }) => handle_run_command(args).await,
        Some(Command::Score { text }) => handle_score_command(&text).await,
        None => {
            eprintln!("No command specified. Use --help for usage information.");
            eprintln!("Example: commit-coach run --text \"read a book\"");
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    // Logs go to stderr so they don't interleave with the dialogue.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn default_ledger_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("commit-coach")
}

async fn handle_score_command(text: &str) -> Result<()> {
    let analysis = HeuristicAnalyzer::new()
        .analyze(text)
        .await
        .context("scoring failed")?;

    println!("Score: {:.1}/10", analysis.score);
    println!("Suggestion: {}", analysis.suggestion);
    println!("Feedback:\n{}", analysis.feedback);
    Ok(())
}

async fn handle_run_command(args: RunArgs) -> Result<()> {
    init_logging(args.verbose);

    let mut config = CoachConfig::load_or_default(args.config.as_ref())
        .context("failed to load configuration")?
        .apply_env_overrides();
    config.ledger.dir = args.ledger_dir.unwrap_or_else(default_ledger_dir);

    info!("Ledger directory: {:?}", config.ledger.dir);

    let sessions = Arc::new(InMemorySessionStore::new());
    let coach = RetryOrchestrator::new(
        HeuristicAnalyzer::new(),
        ConsoleTransport::new(),
        JsonlCommitmentStore::new(config.ledger.dir.clone()),
        Arc::clone(&sessions),
        config.clone(),
    );

    let shutdown = CancellationToken::new();
    let sweeper = spawn_sweeper(
        sessions,
        config.session_ttl(),
        config.sweep_interval(),
        shutdown.clone(),
    );

    let stdin = std::io::stdin();
    let text = match args.text {
        Some(text) => text,
        None => {
            println!("What do you commit to?");
            read_line(&stdin)?
        }
    };

    let mut outcome = coach.start_session(&args.user, &text).await?;
    let session_id = outcome.session_id().to_string();

    while !outcome.is_terminal() {
        let next = match &outcome {
            SessionOutcome::AwaitingChoice { choices, .. }
            | SessionOutcome::FinalChoice { choices, .. } => {
                drive_choice(&coach, &stdin, &session_id, choices.clone()).await?
            }
            SessionOutcome::AwaitingRewrite { .. } => {
                drive_rewrite(&coach, &stdin, &session_id).await?
            }
            terminal => terminal.clone(),
        };
        outcome = next;
    }

    shutdown.cancel();
    sweeper.await.ok();

    print_summary(&outcome);
    Ok(())
}

/// Keep asking until a choice goes through; a failed save narrows the menu
/// to retry-save or cancel.
async fn drive_choice(
    coach: &RetryOrchestrator<HeuristicAnalyzer, ConsoleTransport, JsonlCommitmentStore>,
    stdin: &std::io::Stdin,
    session_id: &str,
    mut choices: Vec<UserChoice>,
) -> Result<SessionOutcome> {
    loop {
        let input = read_line(stdin)?;
        let Some(choice) = parse_choice(&input, &choices) else {
            println!("Pick a number between 1 and {}.", choices.len());
            continue;
        };

        match coach.handle_choice(session_id, choice).await {
            Ok(outcome) => return Ok(outcome),
            Err(CoachError::InvalidTransition { .. }) => {
                println!("That action isn't available right now.");
            }
            Err(CoachError::Persistence { message, .. }) => {
                println!("Couldn't save your commitment ({message}). Try again?");
                choices = guidance::PENDING_SAVE_CHOICES.to_vec();
                for (i, choice) in choices.iter().enumerate() {
                    println!("  {}. {}", i + 1, choice.label());
                }
            }
            Err(CoachError::SessionNotFound(_)) => {
                anyhow::bail!("Session expired. Start over with a fresh commitment.");
            }
            Err(err) => return Err(err.into()),
        }
    }
}

async fn drive_rewrite(
    coach: &RetryOrchestrator<HeuristicAnalyzer, ConsoleTransport, JsonlCommitmentStore>,
    stdin: &std::io::Stdin,
    session_id: &str,
) -> Result<SessionOutcome> {
    loop {
        let input = read_line(stdin)?;
        match coach.submit_rewrite(session_id, &input).await {
            Ok(outcome) => return Ok(outcome),
            Err(CoachError::EmptyCommitment) => {
                println!("The commitment can't be empty. Try again.");
            }
            Err(CoachError::SessionNotFound(_)) => {
                anyhow::bail!("Session expired. Start over with a fresh commitment.");
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn read_line(stdin: &std::io::Stdin) -> Result<String> {
    let mut line = String::new();
    stdin
        .lock()
        .read_line(&mut line)
        .context("failed to read input")?;
    Ok(line.trim().to_string())
}

/// Accept a 1-based menu index or a keyword ("retry", "ai", "keep", "save",
/// "cancel").
fn parse_choice(input: &str, choices: &[UserChoice]) -> Option<UserChoice> {
    if let Ok(index) = input.parse::<usize>() {
        return (1..=choices.len())
            .contains(&index)
            .then(|| choices[index - 1]);
    }

    let keyword = match input.to_lowercase().as_str() {
        "retry" | "rewrite" => UserChoice::RetryManual,
        "ai" | "suggestion" => UserChoice::UseAiSuggestion,
        "keep" | "original" => UserChoice::KeepOriginal,
        "save" => UserChoice::SaveFinal,
        "cancel" | "quit" => UserChoice::Cancel,
        _ => return None,
    };
    choices.contains(&keyword).then_some(keyword)
}

fn print_summary(outcome: &SessionOutcome) {
    println!("\n========================================");
    match outcome {
        SessionOutcome::Accepted { text, score, attempt_count, .. } => {
            println!("Commitment accepted (score {score:.1}/10, {attempt_count} retries)");
            println!("  \"{text}\"");
        }
        SessionOutcome::DegradedAccepted { text, score, .. } => {
            println!("Commitment saved with default score {score:.1}/10 (scoring unavailable)");
            println!("  \"{text}\"");
        }
        SessionOutcome::KeptOriginal { text, score, .. } => {
            println!("Original kept (score {score:.1}/10)");
            println!("  \"{text}\"");
        }
        SessionOutcome::FinalSaved { text, score, .. } => {
            println!("Saved as-is (score {score:.1}/10)");
            println!("  \"{text}\"");
        }
        SessionOutcome::Cancelled { .. } => {
            println!("Cancelled. Nothing was saved.");
        }
        other => {
            println!("Session ended in a non-terminal state: {other:?}");
        }
    }
    println!("========================================");
}
