// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! wenxin - streaming chat from the terminal
//!
//! Entry point for the CLI application.

use clap::Parser;
use tokio::io::BufReader;

use wenxin::chat::ChatBot;
use wenxin::cli::repl::{run_session, stream_answer};
use wenxin::cli::{AskArgs, ChatArgs, Cli, ClientArgs, Commands};
use wenxin::config::Settings;
use wenxin::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let mut env_filter =
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into());
    if cli.verbose > 0 {
        if let Ok(parsed) = "wenxin=debug".parse() {
            env_filter = env_filter.add_directive(parsed);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    match cli.command {
        None => run_chat(ChatArgs::default(), settings).await,
        Some(Commands::Chat(args)) => run_chat(args, settings).await,
        Some(Commands::Ask(args)) => run_ask(args, settings).await,
    }
}

/// Build the client, letting `--engine` win over the settings file
fn build_bot(client_args: &ClientArgs, mut settings: Settings) -> Result<ChatBot> {
    if let Some(engine) = &client_args.engine {
        settings.engine = engine.clone();
    }
    settings.validate()?;
    ChatBot::from_settings(&settings)
}

async fn run_ask(args: AskArgs, settings: Settings) -> Result<()> {
    let bot = build_bot(&args.client, settings)?;
    let mut stdout = tokio::io::stdout();
    stream_answer(
        &bot,
        &args.prompt,
        &args.session,
        &args.client.overrides(),
        &mut stdout,
    )
    .await
}

async fn run_chat(args: ChatArgs, settings: Settings) -> Result<()> {
    let bot = build_bot(&args.client, settings)?;
    let overrides = args.client.overrides();
    let session_id = args
        .session
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    bot.warm_up().await?;
    eprintln!("{} / session {} (type /help for commands)", bot.engine(), session_id);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    run_session(&bot, &session_id, &overrides, stdin, &mut stdout).await
}
