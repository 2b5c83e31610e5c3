// `ghtasks auth` — store, clear and inspect the GitHub token.

use std::io::{self, BufRead, IsTerminal};

use anyhow::{bail, Context};
use clap::{Args, Subcommand};
use serde::Serialize;

use super::{block_on, GlobalArgs};
use crate::credentials::{self, TokenSource};
use crate::github::GitHubClient;
use crate::output::{self, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Save a token in the OS keychain
    Login(LoginArgs),
    /// Remove the token from the OS keychain
    Logout,
    /// Show which token would be used
    Status(StatusArgs),
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Personal access token. Read from stdin when omitted.
    #[arg(long)]
    pub token: Option<String>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Ask GitHub who the token belongs to.
    #[arg(long)]
    pub verify: bool,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub source: Option<TokenSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
}

pub fn run(cmd: AuthCommand, global: &GlobalArgs) -> anyhow::Result<()> {
    match cmd {
        AuthCommand::Login(args) => report(OutputFormat::Human, login(args)),
        AuthCommand::Logout => report(OutputFormat::Human, logout()),
        AuthCommand::Status(args) => {
            let format = OutputFormat::detect(args.json);
            match status(&args, global) {
                Ok(status) => {
                    output::print_output(format, &status, format_status)?;
                    Ok(())
                }
                Err(error) => {
                    output::print_anyhow_error(format, &error);
                    Err(error)
                }
            }
        }
    }
}

fn report(format: OutputFormat, result: anyhow::Result<&'static str>) -> anyhow::Result<()> {
    match result {
        Ok(message) => {
            println!("{message}");
            Ok(())
        }
        Err(error) => {
            output::print_anyhow_error(format, &error);
            Err(error)
        }
    }
}

fn login(args: LoginArgs) -> anyhow::Result<&'static str> {
    let token = match args.token {
        Some(token) => token,
        None => {
            let stdin = io::stdin();
            if stdin.is_terminal() {
                eprintln!("Paste a GitHub token and press Enter:");
            }
            read_token(stdin.lock())?
        }
    };
    credentials::store_token(&token)?;
    Ok("Token saved to the OS keychain.")
}

fn logout() -> anyhow::Result<&'static str> {
    credentials::delete_token()?;
    Ok("Token removed from the OS keychain.")
}

fn status(args: &StatusArgs, global: &GlobalArgs) -> anyhow::Result<AuthStatus> {
    let config = global.load_config()?;
    let Some(resolved) = credentials::resolve_token(config.token.as_deref())? else {
        return Ok(AuthStatus { authenticated: false, source: None, login: None });
    };

    let login = if args.verify {
        let client = GitHubClient::new(&config.api_url, resolved.token)?;
        let login = block_on(async { client.login().await.map(str::to_string) })?
            .context("failed to verify token with GitHub")?;
        Some(login)
    } else {
        None
    };
    Ok(AuthStatus { authenticated: true, source: Some(resolved.source), login })
}

/// First non-empty line of `reader`, trimmed.
fn read_token(reader: impl BufRead) -> anyhow::Result<String> {
    for line in reader.lines() {
        let line = line.context("failed to read token from stdin")?;
        let token = line.trim();
        if !token.is_empty() {
            return Ok(token.to_string());
        }
    }
    bail!("no token provided; pass --token or pipe one on stdin")
}

fn format_status(status: &AuthStatus) -> String {
    match (status.source, &status.login) {
        (None, _) => "Not logged in. Run `ghtasks auth login` or set GITHUB_TOKEN.".to_string(),
        (Some(source), Some(login)) => {
            format!("Logged in as {login} (token from {})", source.describe())
        }
        (Some(source), None) => format!("Token found in {}", source.describe()),
    }
}
