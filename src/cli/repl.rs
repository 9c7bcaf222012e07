// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Interactive chat loop and its input classification

use futures::StreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::chat::{ChatBot, RequestOverrides};
use crate::error::Result;

/// What a line typed at the chat prompt asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput<'a> {
    /// Nothing to do
    Empty,
    /// Leave the loop
    Exit,
    /// Clear the session history
    Reset,
    /// Print the session's estimated token count
    Tokens,
    /// Print the available commands
    Help,
    /// A slash command we do not know
    Unknown(&'a str),
    /// A prompt for the model
    Prompt(&'a str),
}

/// Classify one line of user input
pub fn parse_input(line: &str) -> ReplInput<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ReplInput::Empty;
    }
    if !trimmed.starts_with('/') {
        return ReplInput::Prompt(trimmed);
    }
    match trimmed.to_lowercase().as_str() {
        "/exit" | "/quit" => ReplInput::Exit,
        "/reset" | "/clear" => ReplInput::Reset,
        "/tokens" => ReplInput::Tokens,
        "/help" => ReplInput::Help,
        _ => ReplInput::Unknown(trimmed),
    }
}

pub const HELP_TEXT: &str = "Commands:\n  /reset   clear this session's history\n  /tokens  show the session's estimated token count\n  /exit    quit";

/// Stream one answer to `out`, flushing after every fragment
pub async fn stream_answer<W>(
    bot: &ChatBot,
    prompt: &str,
    session_id: &str,
    overrides: &RequestOverrides,
    out: &mut W,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut fragments = bot.ask_stream(prompt, session_id, overrides)?;
    while let Some(fragment) = fragments.next().await {
        out.write_all(fragment?.as_bytes()).await?;
        out.flush().await?;
    }
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}

/// Run the chat loop on one session until `/exit` or end of input.
///
/// A failed answer is reported on `out` and the loop keeps going.
pub async fn run_session<R, W>(
    bot: &ChatBot,
    session_id: &str,
    overrides: &RequestOverrides,
    input: R,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    loop {
        out.write_all(b"> ").await?;
        out.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let notice = match parse_input(&line) {
            ReplInput::Empty => continue,
            ReplInput::Exit => break,
            ReplInput::Reset => {
                bot.reset(session_id);
                "Session cleared.".to_string()
            }
            ReplInput::Tokens => format!("{} tokens", bot.get_token_count(session_id)),
            ReplInput::Help => HELP_TEXT.to_string(),
            ReplInput::Unknown(command) => format!("Unknown command: {command}"),
            ReplInput::Prompt(prompt) => {
                match stream_answer(bot, prompt, session_id, overrides, out).await {
                    Ok(()) => continue,
                    Err(e) => format!("\nError: {e}"),
                }
            }
        };
        out.write_all(notice.as_bytes()).await?;
        out.write_all(b"\n").await?;
    }
    out.flush().await?;
    Ok(())
}
