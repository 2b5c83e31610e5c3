// GitHub token storage and lookup.
//
// Lookup order: `GITHUB_TOKEN`, OS keychain, plaintext `token` in config.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use thiserror::Error;

const KEYRING_SERVICE: &str = "com.ghtasks.cli";
const TOKEN_ACCOUNT: &str = "github_token";
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Where the token in use came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenSource {
    Env,
    Keychain,
    Config,
}

impl TokenSource {
    pub fn describe(self) -> &'static str {
        match self {
            Self::Env => "GITHUB_TOKEN environment variable",
            Self::Keychain => "OS keychain",
            Self::Config => "config file",
        }
    }
}

/// No token in the environment, the keychain or the config file.
#[derive(Debug, Error)]
#[error("no GitHub token configured; run `ghtasks auth login` or set GITHUB_TOKEN")]
pub struct MissingToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub token: String,
    pub source: TokenSource,
}

pub fn store_token(token: &str) -> Result<()> {
    store_token_with(&KeyringSecretStore, token)
}

pub fn delete_token() -> Result<()> {
    delete_token_with(&KeyringSecretStore)
}

/// Find a token, or `None` when nothing is configured anywhere.
pub fn resolve_token(config_token: Option<&str>) -> Result<Option<ResolvedToken>> {
    let env = std::env::var(TOKEN_ENV).ok();
    resolve_token_with(&KeyringSecretStore, env.as_deref(), config_token)
}

/// Like [`resolve_token`], but a missing token is a [`MissingToken`] error.
pub fn require_token(config_token: Option<&str>) -> Result<ResolvedToken> {
    resolve_token(config_token)?.ok_or_else(|| MissingToken.into())
}

pub fn ensure_owner_only_file(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if !path.exists() {
            return Ok(());
        }

        let metadata = fs::metadata(path)
            .with_context(|| format!("failed to read metadata for `{}`", path.display()))?;
        let mode = metadata.permissions().mode() & 0o777;
        if mode != 0o600 {
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))
                .with_context(|| format!("failed to set owner-only mode on `{}`", path.display()))?;
        }
    }

    #[cfg(not(unix))]
    {
        let _ = path;
    }

    Ok(())
}

pub fn ensure_owner_only_dir(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if !path.exists() {
            return Ok(());
        }

        let metadata = fs::metadata(path)
            .with_context(|| format!("failed to read metadata for `{}`", path.display()))?;
        let mode = metadata.permissions().mode() & 0o777;
        if mode != 0o700 {
            fs::set_permissions(path, fs::Permissions::from_mode(0o700))
                .with_context(|| format!("failed to set owner-only mode on `{}`", path.display()))?;
        }
    }

    #[cfg(not(unix))]
    {
        let _ = path;
    }

    Ok(())
}

trait SecretStore: Send + Sync {
    fn set_secret(&self, service: &str, account: &str, value: &str) -> Result<()>;
    fn get_secret(&self, service: &str, account: &str) -> Result<Option<String>>;
    fn delete_secret(&self, service: &str, account: &str) -> Result<()>;
}

struct KeyringSecretStore;

impl SecretStore for KeyringSecretStore {
    fn set_secret(&self, service: &str, account: &str, value: &str) -> Result<()> {
        let entry = keyring::Entry::new(service, account)
            .context("failed to initialize keychain entry")?;
        entry.set_password(value).context("failed to write keychain entry")?;
        Ok(())
    }

    fn get_secret(&self, service: &str, account: &str) -> Result<Option<String>> {
        let entry = keyring::Entry::new(service, account)
            .context("failed to initialize keychain entry")?;
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(error).context("failed to read keychain entry"),
        }
    }

    fn delete_secret(&self, service: &str, account: &str) -> Result<()> {
        let entry = keyring::Entry::new(service, account)
            .context("failed to initialize keychain entry")?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(error).context("failed to delete keychain entry"),
        }
    }
}

fn store_token_with(store: &dyn SecretStore, token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        bail!("token must not be empty");
    }
    store
        .set_secret(KEYRING_SERVICE, TOKEN_ACCOUNT, token)
        .context("failed to persist GitHub token in keychain")
}

fn delete_token_with(store: &dyn SecretStore) -> Result<()> {
    store
        .delete_secret(KEYRING_SERVICE, TOKEN_ACCOUNT)
        .context("failed to clear GitHub token from keychain")
}

fn resolve_token_with(
    store: &dyn SecretStore,
    env_token: Option<&str>,
    config_token: Option<&str>,
) -> Result<Option<ResolvedToken>> {
    if let Some(token) = non_empty(env_token) {
        return Ok(Some(ResolvedToken { token, source: TokenSource::Env }));
    }

    let stored = store
        .get_secret(KEYRING_SERVICE, TOKEN_ACCOUNT)
        .context("failed to read GitHub token from keychain")?;
    if let Some(token) = non_empty(stored.as_deref()) {
        return Ok(Some(ResolvedToken { token, source: TokenSource::Keychain }));
    }

    Ok(non_empty(config_token).map(|token| ResolvedToken { token, source: TokenSource::Config }))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}
