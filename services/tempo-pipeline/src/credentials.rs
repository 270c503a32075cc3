//! Earthdata Login credential resolution.
//!
//! Sources are tried in order: `EARTHDATA_USERNAME`/`EARTHDATA_PASSWORD`,
//! the netrc entry for the login host, then an interactive prompt.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::CredentialsConfig;

pub const USERNAME_VAR: &str = "EARTHDATA_USERNAME";
pub const PASSWORD_VAR: &str = "EARTHDATA_PASSWORD";

#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("Failed to read netrc file {path}: {source}")]
    Netrc {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read credentials from the terminal: {0}")]
    Prompt(#[source] io::Error),

    #[error("No Earthdata credentials for {host}: set EARTHDATA_USERNAME/EARTHDATA_PASSWORD or add a netrc entry")]
    Missing { host: String },

    #[error("Empty username entered")]
    EmptyUsername,
}

/// Username and password for HTTP basic auth.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Where the credentials came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    Netrc(PathBuf),
    Prompt,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Netrc(path) => write!(f, "netrc ({})", path.display()),
            CredentialSource::Prompt => write!(f, "prompt"),
        }
    }
}

/// Resolve credentials from the process environment, netrc, or the terminal.
pub fn resolve(
    config: &CredentialsConfig,
) -> Result<(Credentials, CredentialSource), CredentialsError> {
    let netrc = config
        .netrc_path
        .clone()
        .or_else(|| dirs::home_dir().map(|home| home.join(".netrc")));

    if let Some(found) = resolve_without_prompt(config, |key| std::env::var(key).ok(), netrc.as_deref())? {
        info!(source = %found.1, "Using Earthdata credentials");
        return Ok(found);
    }

    if !config.allow_prompt {
        return Err(CredentialsError::Missing {
            host: config.login_host.clone(),
        });
    }

    let credentials = prompt(&config.login_host)?;
    Ok((credentials, CredentialSource::Prompt))
}

/// The non-interactive part of [`resolve`], with the environment supplied by `lookup`.
pub fn resolve_without_prompt<F>(
    config: &CredentialsConfig,
    lookup: F,
    netrc: Option<&Path>,
) -> Result<Option<(Credentials, CredentialSource)>, CredentialsError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(credentials) = from_lookup(lookup) {
        return Ok(Some((credentials, CredentialSource::Environment)));
    }

    if let Some(path) = netrc {
        if let Some(credentials) = from_netrc_file(path, &config.login_host)? {
            return Ok(Some((credentials, CredentialSource::Netrc(path.to_path_buf()))));
        }
    }

    Ok(None)
}

/// Both variables must be set and non-empty.
fn from_lookup<F>(lookup: F) -> Option<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let username = lookup(USERNAME_VAR).filter(|v| !v.is_empty())?;
    let password = lookup(PASSWORD_VAR).filter(|v| !v.is_empty())?;
    Some(Credentials::new(username, password))
}

/// Read `path` and look up `host`. A missing file is not an error.
pub fn from_netrc_file(path: &Path, host: &str) -> Result<Option<Credentials>, CredentialsError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(parse_netrc(&text, host)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No netrc file");
            Ok(None)
        }
        Err(source) => Err(CredentialsError::Netrc {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Find the login/password for `host` in netrc text.
///
/// A `machine` entry for the host wins over `default`. `macdef` bodies are
/// skipped up to the next blank line.
pub fn parse_netrc(text: &str, host: &str) -> Option<Credentials> {
    #[derive(Default)]
    struct Entry {
        login: Option<String>,
        password: Option<String>,
    }

    let mut matched: Option<Entry> = None;
    let mut default: Option<Entry> = None;
    // 0 = other machine, 1 = requested host, 2 = default
    let mut current = 0u8;

    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        let mut tokens = line.split_whitespace();
        while let Some(token) = tokens.next() {
            match token {
                "machine" => {
                    current = if tokens.next() == Some(host) { 1 } else { 0 };
                    if current == 1 && matched.is_none() {
                        matched = Some(Entry::default());
                    }
                }
                "default" => {
                    current = 2;
                    default.get_or_insert_with(Entry::default);
                }
                "login" | "password" | "account" => {
                    let value = tokens.next().map(str::to_string);
                    let entry = match current {
                        1 => matched.as_mut(),
                        2 => default.as_mut(),
                        _ => None,
                    };
                    if let Some(entry) = entry {
                        match token {
                            "login" => entry.login = value,
                            "password" => entry.password = value,
                            _ => {}
                        }
                    }
                }
                "macdef" => {
                    for body in lines.by_ref() {
                        if body.trim().is_empty() {
                            break;
                        }
                    }
                    break;
                }
                _ => {}
            }
        }
    }

    let entry = matched.or(default)?;
    Some(Credentials::new(entry.login?, entry.password?))
}

fn prompt(host: &str) -> Result<Credentials, CredentialsError> {
    eprintln!("No Earthdata credentials found. Register at https://{}/", host);
    eprint!("Earthdata username: ");
    io::stderr().flush().map_err(CredentialsError::Prompt)?;

    let mut username = String::new();
    io::stdin()
        .lock()
        .read_line(&mut username)
        .map_err(CredentialsError::Prompt)?;
    let username = username.trim().to_string();
    if username.is_empty() {
        return Err(CredentialsError::EmptyUsername);
    }

    let password =
        rpassword::prompt_password("Earthdata password: ").map_err(CredentialsError::Prompt)?;
    Ok(Credentials::new(username, password))
}
