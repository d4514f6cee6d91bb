//! rehearse - terminal front-end for interview practice
//!
//! Runs classic sessions interactively, lists and shows past sessions, and
//! moves a guest session into the signed-in account.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rehearse_client::auth::{resolve_identity, select_backend, Identity, StaticToken, AUTH_TIMEOUT};
use rehearse_client::reconcile::adopt_guest_session;
use rehearse_client::{ClassicController, ClassicState, LocalStorage, RemoteBackend, SessionBackend};
use rehearse_common::config::{ClientConfig, ModelConfig, TomlConfig};
use rehearse_common::model::{GeminiClient, InterviewModel};
use rehearse_common::models::{InterviewSession, SessionMode, SessionSetup, Speaker};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "rehearse")]
#[command(about = "Practice job interviews against an AI interviewer")]
#[command(version)]
struct Cli {
    /// Path to TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API base URL, e.g. http://127.0.0.1:5780/api
    #[arg(long)]
    api_url: Option<String>,

    /// ID token of the signed-in user (omit to practice as a guest)
    #[arg(long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer a set of generated questions with feedback after each one
    Practice {
        /// Role being interviewed for
        #[arg(long)]
        job_title: String,
        #[arg(long)]
        company: Option<String>,
        /// Job description text
        #[arg(long, default_value = "")]
        description: String,
        /// Interviewer persona
        #[arg(long, default_value = "Friendly Hiring Manager")]
        persona: String,
        /// Plain-text resume to tailor questions to
        #[arg(long)]
        resume: Option<PathBuf>,
    },
    /// List past sessions, newest first
    History,
    /// Show one session in full
    Show { id: String },
    /// Move the guest session into the signed-in account
    Import,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let toml_config = TomlConfig::load(cli.config.as_deref())?;
    let default_level = toml_config
        .logging
        .level
        .clone()
        .unwrap_or_else(|| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    debug!("{}", rehearse_client::build_info());

    let client_config =
        ClientConfig::resolve(&toml_config, cli.api_url.as_deref(), cli.token.as_deref());
    let identity =
        resolve_identity(&StaticToken(client_config.id_token.clone()), AUTH_TIMEOUT).await;

    match cli.command {
        Command::Practice {
            job_title,
            company,
            description,
            persona,
            resume,
        } => {
            let resume_text = match resume {
                Some(path) => Some(
                    tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("Failed to read resume {}", path.display()))?,
                ),
                None => None,
            };
            let setup = SessionSetup {
                job_title,
                company,
                job_description: description,
                mode: SessionMode::Classic,
                persona,
                resume_text,
            };
            let backend = open_backend(&identity, &client_config, &toml_config)?;
            practice(backend, setup).await
        }
        Command::History => {
            let backend = open_backend(&identity, &client_config, &toml_config)?;
            history(backend.as_ref()).await
        }
        Command::Show { id } => {
            let backend = open_backend(&identity, &client_config, &toml_config)?;
            print_session(&backend.get(&id).await?);
            Ok(())
        }
        Command::Import => import(&identity, &client_config).await,
    }
}

/// Backend for the resolved identity; guests call the model directly
fn open_backend(
    identity: &Identity,
    client_config: &ClientConfig,
    toml_config: &TomlConfig,
) -> Result<Arc<dyn SessionBackend>> {
    let guest_model = match identity {
        Identity::Guest => Some(guest_model(toml_config)?),
        Identity::SignedIn { .. } => None,
    };
    Ok(select_backend(identity, client_config, guest_model)?)
}

fn guest_model(toml_config: &TomlConfig) -> Result<InterviewModel> {
    let model_config = ModelConfig::resolve(toml_config, None);
    let client = GeminiClient::from_config(&model_config)
        .context("Practicing as a guest calls the model directly")?;
    Ok(InterviewModel::new(Arc::new(client)))
}

async fn import(identity: &Identity, config: &ClientConfig) -> Result<()> {
    let Identity::SignedIn { token } = identity else {
        bail!("Sign in first: pass --token or set REHEARSE_ID_TOKEN");
    };
    let storage = LocalStorage::new(&config.guest_storage);
    let remote = RemoteBackend::new(&config.api_base_url, token.clone())?;

    match adopt_guest_session(&storage, &remote).await? {
        Some(session) => println!("Imported session {} ({})", session.id, session.job_title),
        None => println!("No guest session to import"),
    }
    Ok(())
}

async fn read_answer(lines: &mut Lines<BufReader<Stdin>>) -> Result<Option<String>> {
    let mut answer = String::new();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            if answer.trim().is_empty() {
                continue;
            }
            return Ok(Some(answer.trim_end().to_string()));
        }
        if line.trim() == "/finish" {
            return Ok(None);
        }
        answer.push_str(&line);
        answer.push('\n');
    }
    Ok((!answer.trim().is_empty()).then(|| answer.trim_end().to_string()))
}

async fn practice(backend: Arc<dyn SessionBackend>, setup: SessionSetup) -> Result<()> {
    let mut controller = ClassicController::new(backend);
    println!("Generating questions for {}...", setup.job_title);
    let total = controller.start(setup).await?.questions.len();
    info!(questions = total, "Practice started");

    println!("Answer each question, ending with an empty line. Type /finish to stop early.\n");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let ClassicState::QuestionActive(index) = controller.state() {
        if let Some(question) = controller.current_question() {
            println!(
                "Question {}/{} [{:?}, {:?}, ~{} min]",
                index + 1,
                total,
                question.category,
                question.difficulty,
                question.expected_duration
            );
            println!("{}\n", question.text);
        }

        let Some(answer) = read_answer(&mut lines).await? else {
            break;
        };

        match controller.submit_answer(&answer).await {
            Ok(feedback) => {
                println!("\nScore: {}/10", feedback.overall_score);
                print_list("Strengths", &feedback.strengths);
                print_list("Improvements", &feedback.improvements);
                print_list("Missed points", &feedback.missed_points);
                if !feedback.suggested_structure.is_empty() {
                    println!("Suggested structure: {}", feedback.suggested_structure);
                }
                println!();
            }
            Err(e) if e.is_retryable() => {
                println!("Could not evaluate that answer ({}). Please try again.", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        }
        controller.next()?;
    }

    let session = controller.finish().await?;
    println!(
        "Session complete. Average score: {:.1}/10 over {} answered question(s).",
        session.average_score.unwrap_or(0.0),
        session.answered_count()
    );
    Ok(())
}

async fn history(backend: &dyn SessionBackend) -> Result<()> {
    let sessions = backend.list().await?;
    if sessions.is_empty() {
        println!("No sessions yet");
        return Ok(());
    }
    for session in sessions {
        let result = match (session.average_score, &session.live_session_feedback) {
            (Some(score), _) => format!("{:.1}/10", score),
            (None, Some(_)) => "reviewed".to_string(),
            _ => wire_name(&session.status),
        };
        println!(
            "{}  {}  {:<8}  {}  {}",
            session.created_at.format("%Y-%m-%d %H:%M"),
            session.id,
            wire_name(&session.mode),
            session.job_title,
            result
        );
    }
    Ok(())
}

/// Serialized name of a unit enum value, e.g. `in-progress`
fn wire_name<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(name)) => name,
        _ => String::new(),
    }
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{}:", title);
    for item in items {
        println!("  - {}", item);
    }
}

fn print_session(session: &InterviewSession) {
    println!("{} ({})", session.job_title, session.id);
    if let Some(company) = &session.company {
        println!("Company: {}", company);
    }
    println!(
        "Started {} | {} | {} | persona: {}",
        session.created_at.format("%Y-%m-%d %H:%M"),
        wire_name(&session.mode),
        wire_name(&session.status),
        session.persona
    );

    for (index, question) in session.questions.iter().enumerate() {
        println!("\n{}. {}", index + 1, question.text);
        if let Some(answer) = &question.user_answer {
            println!("   Answer: {}", answer);
        }
        if let Some(feedback) = &question.feedback {
            println!("   Score: {}/10", feedback.overall_score);
        }
    }

    if !session.transcript.is_empty() {
        println!("\nTranscript:");
        for entry in &session.transcript {
            let speaker = match entry.speaker {
                Speaker::Ai => "Interviewer",
                Speaker::User => "You",
            };
            println!("  {}: {}", speaker, entry.text);
        }
    }

    if let Some(review) = &session.live_session_feedback {
        println!("\n{}", review.summary);
        print_list("Strengths", &review.strengths);
        print_list("Improvements", &review.improvements);
        print_list("Next steps", &review.next_steps);
    }
    if let Some(score) = session.average_score {
        println!("\nAverage score: {:.1}/10", score);
    }
}
