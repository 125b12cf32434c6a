use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use tokio::io::{AsyncBufReadExt, BufReader};

use registration_assistant::command::{Command, CommandParser, HELP};
use registration_assistant::config::ClientConfig;
use registration_assistant::fallback::AssistClient;
use registration_assistant::form::{
    Field, FormValues, FormStore, RegistrationForm, check_documents, load_files,
};
use registration_assistant::submission::{HttpRegistrationClient, SubmissionBridge};
use registration_assistant::wizard::{Message, RegistrationAssistant, StepCatalog, TurnOutcome};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't interleave with the dialogue.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env().context("Invalid configuration")?;

    eprintln!("📝 Registration Assistant v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: {}", config.api_base_url);
    eprintln!(
        "   Fallback: {}",
        if config.fallback_enabled { "on" } else { "off" }
    );
    eprintln!("   Type /help for commands. /quit to exit.\n");

    // ── Form and submission wiring ──────────────────────────────────────
    let store = FormStore::new();
    let bridge = SubmissionBridge::new();
    let client = HttpRegistrationClient::new(&config).context("Failed to build HTTP client")?;
    let form = RegistrationForm::mount(
        store.clone(),
        &bridge,
        Arc::new(client),
        config.upload_limits.clone(),
    );

    let mut assistant = RegistrationAssistant::new(StepCatalog::registration(), store, bridge);
    if config.fallback_enabled {
        let fallback = AssistClient::new(&config).context("Failed to build assist client")?;
        assistant = assistant.with_fallback(Arc::new(fallback));
    }
    assistant.toggle_chat().await;

    let mut cursor = PrintCursor::default();
    print_new_messages(&assistant, &mut cursor).await;

    let mut lines = stdin_lines();
    eprint!("> ");
    while let Some(line) = lines.next().await {
        let command = CommandParser::parse(&line);
        if command == Command::Quit {
            break;
        }
        if let Err(e) = run_command(&assistant, &form, &config, command).await {
            println!("⚠️  {e}");
        }
        print_new_messages(&assistant, &mut cursor).await;
        eprint!("> ");
    }

    eprintln!("Goodbye.");
    Ok(())
}

async fn run_command(
    assistant: &RegistrationAssistant,
    form: &RegistrationForm,
    config: &ClientConfig,
    command: Command,
) -> anyhow::Result<()> {
    let outcome = match command {
        Command::Answer(text) => assistant.submit_answer(&text).await,
        Command::Skip => assistant.skip_step().await,
        Command::Choose(value) => assistant.select_choice(&value).await,
        Command::Ask(question) => assistant.handle_unexpected_input(&question).await,
        Command::Upload(paths) => {
            let files = load_files(paths.as_slice()).await?;
            check_documents(&config.upload_limits, &files)?;
            assistant.attach_documents(files).await
        }
        Command::SetField { field, value } => {
            form.set_field(field, value)?;
            println!("   {} updated.", field.label());
            return Ok(());
        }
        Command::ShowForm => {
            print_form(&form.values());
            return Ok(());
        }
        Command::SubmitForm => {
            if let Err(e) = form.submit().await {
                tracing::debug!(error = %e, "Direct submission did not go through");
            }
            if let Some(status) = form.status().await {
                let mark = if status.success { "✅" } else { "❌" };
                println!("{mark} {}", status.message);
            }
            return Ok(());
        }
        Command::StartOver => {
            assistant.start_over().await;
            return Ok(());
        }
        Command::ToggleChat => {
            let open = assistant.toggle_chat().await;
            println!("   Chat {}.", if open { "opened" } else { "hidden" });
            return Ok(());
        }
        Command::Help => {
            println!("{HELP}");
            return Ok(());
        }
        Command::Invalid(message) => {
            println!("   {message}");
            return Ok(());
        }
        Command::Quit => return Ok(()),
    };

    match outcome {
        TurnOutcome::Busy => println!("   Still working on the last request..."),
        TurnOutcome::NotApplicable => println!("   That doesn't apply to this question."),
        _ => {}
    }
    Ok(())
}

/// How much of the transcript the terminal has shown.
#[derive(Debug, Default)]
struct PrintCursor {
    printed: usize,
    first: Option<DateTime<Utc>>,
}

impl PrintCursor {
    /// Index of the first message not yet shown. Starting over replaces the
    /// whole transcript, which shows up as a different first message.
    fn unseen_from(&self, messages: &[Message]) -> usize {
        let first = messages.first().map(|m| m.timestamp);
        if first != self.first || messages.len() < self.printed {
            0
        } else {
            self.printed
        }
    }

    fn mark_seen(&mut self, messages: &[Message]) {
        self.printed = messages.len();
        self.first = messages.first().map(|m| m.timestamp);
    }
}

/// Print assistant messages the terminal has not shown yet.
async fn print_new_messages(assistant: &RegistrationAssistant, cursor: &mut PrintCursor) {
    let messages = assistant.messages().await;
    let start = cursor.unseen_from(&messages);
    cursor.mark_seen(&messages);
    if start == messages.len() {
        return;
    }

    for message in messages[start..].iter().filter(|m| !m.is_user) {
        println!("🤖 {}", message.text);
    }
    if let Some(step) = assistant.current_step().await {
        let choices = step.choices();
        if !choices.is_empty() {
            let options: Vec<String> = choices
                .iter()
                .map(|c| format!("{} (/choose {})", c.label, c.value))
                .collect();
            println!("   Options: {}", options.join(" | "));
        } else if !step.required {
            println!("   (optional, /skip to leave blank)");
        }
    }
}

fn print_form(values: &FormValues) {
    for (field, value) in values.text_parts() {
        let shown = if value.is_empty() { "-" } else { value };
        println!("   {:<16} {}", field.label(), shown);
    }
    let documents: Vec<&str> = values
        .documents
        .iter()
        .map(|f| f.file_name.as_str())
        .collect();
    let shown = if documents.is_empty() {
        "none".to_string()
    } else {
        documents.join(", ")
    };
    println!("   {:<16} {}", Field::Documents.label(), shown);
}

/// Lines from stdin as a stream; ends at EOF.
fn stdin_lines() -> impl futures::Stream<Item = String> + Unpin {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break, // EOF
                Err(e) => {
                    tracing::error!("Error reading stdin: {}", e);
                    break;
                }
            }
        }
    });

    Box::pin(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|line| (line, rx))
    }))
}
