// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::chat::{RequestOverrides, DEFAULT_SESSION};

/// wenxin - streaming chat client for the WenXin (ERNIE) API
#[derive(Parser, Debug)]
#[command(name = "wenxin")]
#[command(version, about = "Streaming chat client for the WenXin (ERNIE) API")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file path (TOML, or JSON with a .json extension)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive chat on one session (default when no command given)
    Chat(ChatArgs),

    /// Ask a single question and stream the answer
    Ask(AskArgs),
}

/// Options shared by every command that talks to the service
#[derive(clap::Args, Debug, Default, Clone)]
pub struct ClientArgs {
    /// Engine name (ERNIE-Bot, ERNIE-Bot-turbo, BLOOMZ-7B)
    #[arg(short, long)]
    pub engine: Option<String>,

    /// Sampling temperature, in (0, 1]
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Nucleus sampling mass, in [0, 1]
    #[arg(long)]
    pub top_p: Option<f64>,

    /// Repetition penalty, in [1, 2]
    #[arg(long)]
    pub penalty_score: Option<f64>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<f64>,
}

impl ClientArgs {
    /// Per-call overrides built from the flags that were given
    pub fn overrides(&self) -> RequestOverrides {
        RequestOverrides {
            temperature: self.temperature,
            top_p: self.top_p,
            penalty_score: self.penalty_score,
            timeout: self
                .timeout
                .filter(|secs| secs.is_finite() && *secs > 0.0)
                .map(std::time::Duration::from_secs_f64),
        }
    }
}

/// Arguments for interactive chat
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ChatArgs {
    /// Session id (defaults to a fresh random id)
    #[arg(short, long)]
    pub session: Option<String>,

    #[command(flatten)]
    pub client: ClientArgs,
}

/// Arguments for a single question
#[derive(clap::Args, Debug, Clone)]
pub struct AskArgs {
    /// The question to ask
    pub prompt: String,

    /// Session id
    #[arg(short, long, default_value = DEFAULT_SESSION)]
    pub session: String,

    #[command(flatten)]
    pub client: ClientArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cli_default_no_command() {
        let cli = Cli::parse_from(["wenxin"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_verbose_multiple() {
        let cli = Cli::parse_from(["wenxin", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_config_path() {
        let cli = Cli::parse_from(["wenxin", "--config", "/tmp/wenxin.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/wenxin.toml")));
    }

    #[test]
    fn test_ask_defaults() {
        let cli = Cli::parse_from(["wenxin", "ask", "你好"]);
        match cli.command {
            Some(Commands::Ask(args)) => {
                assert_eq!(args.prompt, "你好");
                assert_eq!(args.session, "default");
                assert_eq!(args.client.overrides(), RequestOverrides::default());
            }
            other => panic!("expected ask, got {other:?}"),
        }
    }

    #[test]
    fn test_ask_with_overrides() {
        let cli = Cli::parse_from([
            "wenxin",
            "ask",
            "hi",
            "--engine",
            "ERNIE-Bot",
            "--temperature",
            "0.5",
            "--timeout",
            "2.5",
            "-s",
            "alice",
        ]);
        match cli.command {
            Some(Commands::Ask(args)) => {
                assert_eq!(args.session, "alice");
                assert_eq!(args.client.engine.as_deref(), Some("ERNIE-Bot"));
                let overrides = args.client.overrides();
                assert_eq!(overrides.temperature, Some(0.5));
                assert_eq!(overrides.timeout, Some(Duration::from_millis(2500)));
                assert!(overrides.top_p.is_none());
            }
            other => panic!("expected ask, got {other:?}"),
        }
    }

    #[test]
    fn test_chat_session() {
        let cli = Cli::parse_from(["wenxin", "chat", "--session", "bob"]);
        match cli.command {
            Some(Commands::Chat(args)) => assert_eq!(args.session.as_deref(), Some("bob")),
            other => panic!("expected chat, got {other:?}"),
        }
    }

    #[test]
    fn test_ask_requires_prompt() {
        assert!(Cli::try_parse_from(["wenxin", "ask"]).is_err());
    }
}
