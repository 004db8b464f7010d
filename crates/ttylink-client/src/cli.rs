//! Client CLI implementation.
//!
//! Provides command-line argument parsing using clap.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use ttylink_core::LogFormat;

use crate::websocket::endpoint_url;

/// Terminal back-end selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TermKind {
    /// Interactive raw-mode terminal on the local TTY.
    Stdio,
    /// Pass-through output for pipes and recording.
    Plain,
}

/// Log output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    /// Human-readable text.
    Text,
    /// Structured JSON.
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

/// ttylink: attach a local terminal to a session server.
#[derive(Debug, Parser)]
#[command(name = "ttylink", version, about)]
pub struct Cli {
    /// Endpoint: a ws:// or wss:// URL, or a bare host[:port]
    pub endpoint: String,

    /// Session parameters forwarded in the handshake, query-string style
    #[arg(long, default_value = "")]
    pub args: String,

    /// Authentication token forwarded in the handshake
    #[arg(long, env = "TTYLINK_AUTH_TOKEN", default_value = "", hide_env_values = true)]
    pub auth_token: String,

    /// Terminal back-end
    #[arg(long, value_enum, default_value_t = TermKind::Stdio)]
    pub term: TermKind,

    /// Use TLS when the endpoint is a bare host[:port]
    #[arg(long)]
    pub tls: bool,

    /// Base path on the server when the endpoint is a bare host[:port]
    #[arg(long, default_value = "/")]
    pub path: String,

    /// Increase verbosity (-v: warn, -vv: info, -vvv: debug, -vvvv: trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}

impl Cli {
    /// Resolve the endpoint to a full URL.
    ///
    /// A bare host gets the scheme mirrored from `--tls` and the fixed
    /// path suffix; an explicit URL is used verbatim.
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.starts_with("ws://") || self.endpoint.starts_with("wss://") {
            self.endpoint.clone()
        } else {
            endpoint_url(self.tls, &self.endpoint, &self.path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ttylink").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn explicit_url_is_used_verbatim() {
        let cli = parse(&["wss://example.com/console/ws"]);
        assert_eq!(cli.endpoint_url(), "wss://example.com/console/ws");
    }

    #[test]
    fn bare_host_mirrors_tls_flag() {
        let cli = parse(&["example.com:8080"]);
        assert_eq!(cli.endpoint_url(), "ws://example.com:8080/ws");

        let cli = parse(&["--tls", "example.com"]);
        assert_eq!(cli.endpoint_url(), "wss://example.com/ws");
    }

    #[test]
    fn bare_host_honors_base_path() {
        let cli = parse(&["--path", "/console", "example.com"]);
        assert_eq!(cli.endpoint_url(), "ws://example.com/console/ws");
    }

    #[test]
    fn defaults() {
        let cli = parse(&["host"]);
        assert_eq!(cli.term, TermKind::Stdio);
        assert_eq!(cli.args, "");
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.log_format, LogFormatArg::Text);
    }

    #[test]
    fn verbosity_counts() {
        let cli = parse(&["-vvv", "host"]);
        assert_eq!(cli.verbose, 3);
    }
}
