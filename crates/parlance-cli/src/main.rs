use anyhow::{bail, Context, Result};
use parlance_llm::types::strip_model_prefix;
use parlance_llm::GeminiClient;
use parlance_persist::PersistClient;
use parlance_session::{SessionBuilder, SessionHandle, SessionSnapshot};
use parlance_types::ConnectionStatus;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use parlance_cli::{
    commands::{parse_input, Input, HELP},
    config::Config,
    render::{
        format_models, format_status, format_thread_list, format_transcript, reply_in_progress,
        thread_at, ReplyPrinter,
    },
    seed_api_key,
};

type InputLines = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config);
    tracing::info!(base_url = %config.api.base_url, "Starting Parlance");

    let mut persist = PersistClient::builder();
    if let Some(dir) = &config.chat.data_dir {
        persist = persist.data_dir(dir.clone());
    }
    let persist = persist.build().context("Failed to open chat storage")?;
    if let Err(e) = seed_api_key(persist.secrets().as_ref(), config.gemini_api_key.as_deref()) {
        tracing::warn!(error = %e, "Failed to store API key from environment");
    }

    let client = GeminiClient::with_config(config.client_config())
        .context("Failed to create Gemini client")?;
    let session = SessionBuilder::new()
        .client(Arc::new(client))
        .persist(persist)
        .config(config.session_config())
        .spawn()
        .await?;

    let snapshot = session.snapshot();
    if let Some(warning) = &snapshot.history_warning {
        eprintln!("Warning: {warning}");
    }
    if snapshot.has_api_key {
        session.check_connection()?;
    } else {
        println!("No API key yet. Set one with /key <key> or GEMINI_API_KEY.");
    }
    if !snapshot.messages.is_empty() {
        print!("{}", format_transcript(&snapshot.messages));
    }
    println!("Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    if let Err(e) = run_repl(&session, &mut lines).await {
        tracing::error!(error = %e, "REPL failed");
    }

    session.shutdown().await?;
    Ok(())
}

async fn run_repl(session: &SessionHandle, lines: &mut InputLines) -> Result<()> {
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };

        let input = match parse_input(&line) {
            Ok(input) => input,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        if let Err(e) = handle_input(session, lines, input.clone()).await {
            eprintln!("{e}");
        }
        if input == Input::Quit {
            return Ok(());
        }
    }
}

async fn handle_input(session: &SessionHandle, lines: &mut InputLines, input: Input) -> Result<()> {
    match input {
        Input::Empty | Input::Quit => {}
        Input::Help => println!("{HELP}"),
        Input::Message(text) => {
            if !session.snapshot().has_api_key {
                println!("Set an API key first with /key <key>.");
            } else if session.send_message(text).await? {
                stream_reply(session, lines).await?;
            }
        }
        Input::New => {
            session.start_new_chat().await?;
            println!("Started a new chat.");
        }
        Input::List => {
            let snapshot = session.snapshot();
            print!("{}", format_thread_list(&snapshot.threads, snapshot.current_thread_id));
        }
        Input::Open(n) => {
            let id = thread_at(&session.snapshot(), n)
                .with_context(|| format!("No chat number {n}"))?;
            session.open_chat(id).await?;
            print!("{}", format_transcript(&session.snapshot().messages));
        }
        Input::Delete(n) => {
            let id = thread_at(&session.snapshot(), n)
                .with_context(|| format!("No chat number {n}"))?;
            session.delete_chat(id).await?;
            println!("Deleted chat {n}.");
        }
        Input::Stop => println!("Nothing to stop."),
        Input::Model(model) => {
            let wanted = strip_model_prefix(&model).to_string();
            if wanted.is_empty() {
                bail!("'{model}' is not a model id");
            }
            session.set_model(model)?;
            let snapshot = session.wait_for(|s| s.selected_model == wanted).await?;
            println!("Model: {}", snapshot.selected_model);
        }
        Input::Models => {
            if session.snapshot().has_api_key {
                session.check_connection()?;
                session.wait_for(check_settled).await?;
            }
            print!("{}", format_models(&session.snapshot()));
        }
        Input::Prompt(prompt) => {
            session.set_system_prompt(prompt.clone())?;
            session.wait_for(|s| s.system_prompt == prompt).await?;
            if prompt.is_empty() {
                println!("System prompt cleared.");
            } else {
                println!("System prompt set.");
            }
        }
        Input::Safety(preset) => {
            session.set_safety_preset(preset)?;
            session.wait_for(|s| s.safety_preset == preset).await?;
            println!("Safety: {preset}");
        }
        Input::Key(key) if key.is_empty() => {
            session.clear_api_key().await?;
            println!("API key removed.");
        }
        Input::Key(key) => {
            session.set_api_key(key).await?;
            session.check_connection()?;
            let snapshot = session.wait_for(check_settled).await?;
            println!("{}", snapshot.connection);
        }
        Input::Status => print!("{}", format_status(&session.snapshot())),
    }
    Ok(())
}

/// A connection check has produced a result
fn check_settled(snapshot: &SessionSnapshot) -> bool {
    matches!(
        snapshot.connection,
        ConnectionStatus::Connected { .. }
            | ConnectionStatus::Failed { .. }
            | ConnectionStatus::NotConfigured
    )
}

/// Print the reply as it is revealed; `/stop` or end of input cancels it
async fn stream_reply(session: &SessionHandle, lines: &mut InputLines) -> Result<()> {
    let mut updates = session.subscribe();
    let mut printer = ReplyPrinter::new();
    let mut stdout = std::io::stdout();
    let mut input_open = true;

    loop {
        let snapshot = updates.borrow_and_update().clone();
        if let Some(text) = reply_in_progress(&snapshot) {
            write!(stdout, "{}", printer.update(text))?;
            stdout.flush()?;
        }

        if !snapshot.is_sending {
            if !printer.printed().is_empty() {
                writeln!(stdout)?;
            }
            if let Some(error) = &snapshot.error_message {
                eprintln!("Error: {error}");
            }
            if let Some(notice) = &snapshot.notice {
                println!("({notice})");
            }
            if let Some(warning) = &snapshot.history_warning {
                eprintln!("Warning: {warning}");
            }
            return Ok(());
        }

        tokio::select! {
            changed = updates.changed() => changed?,
            line = lines.next_line(), if input_open => match line? {
                None => {
                    input_open = false;
                    session.cancel_response()?;
                }
                Some(line) => match parse_input(&line) {
                    Ok(Input::Stop) => session.cancel_response()?,
                    _ => eprintln!("\n(a reply is in progress; /stop to interrupt)"),
                },
            },
        }
    }
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
}
