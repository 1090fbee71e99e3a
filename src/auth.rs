// ABOUTME: Credential discovery with precedence chain
// ABOUTME: CLI flags → env vars → credential file → injected prompt

use crate::{Credential, Error, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const NAMESPACE_ENV: &str = "YUQUE_NAMESPACE";
pub const TOKEN_ENV: &str = "YUQUE_TOKEN";

/// The `namespace|token` file, `~/.yuque/config` unless overridden.
#[derive(Debug, Clone)]
pub struct CredentialFile {
    path: PathBuf,
}

impl CredentialFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CredentialFile { path: path.into() }
    }

    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Auth("Could not determine home directory".into()))?;
        Ok(Self::new(home.join(".yuque").join("config")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Credential>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        parse_credential(&content).map(Some)
    }

    pub fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(
            &self.path,
            format!("{}|{}", credential.namespace, credential.token),
        )?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        debug!(path = %self.path.display(), "saved credentials");
        Ok(())
    }
}

pub fn parse_credential(content: &str) -> Result<Credential> {
    let fields: Vec<&str> = content.trim_end_matches(['\r', '\n']).split('|').collect();
    match fields.as_slice() {
        [namespace, token] if !namespace.is_empty() && !token.is_empty() => Ok(Credential {
            namespace: (*namespace).to_string(),
            token: (*token).to_string(),
        }),
        _ => Err(Error::Auth(
            "Credential file must contain exactly `namespace|token`".into(),
        )),
    }
}

/// Resolves credentials without touching the console; `prompt` is only
/// called when every other source comes up empty, and its answers are
/// persisted to `file`.
pub fn resolve_credentials<P>(
    cli_namespace: Option<String>,
    cli_token: Option<String>,
    file: &CredentialFile,
    mut prompt: P,
) -> Result<Credential>
where
    P: FnMut(&str) -> Result<String>,
{
    // 1. CLI flags
    match (cli_namespace, cli_token) {
        (Some(namespace), Some(token)) => return Ok(Credential { namespace, token }),
        (None, None) => {}
        _ => {
            return Err(Error::Auth(
                "--namespace and --token must be given together".into(),
            ))
        }
    }

    // 2. Environment variables
    if let (Ok(namespace), Ok(token)) = (env::var(NAMESPACE_ENV), env::var(TOKEN_ENV)) {
        if !namespace.is_empty() && !token.is_empty() {
            return Ok(Credential { namespace, token });
        }
    }

    // 3. Credential file
    if let Some(credential) = file.load()? {
        return Ok(credential);
    }

    // 4. Interactive, then persisted
    info!(path = %file.path().display(), "no credentials found, prompting");
    let namespace = prompt("Yuque namespace: ")?.trim().to_string();
    let token = prompt("Yuque token: ")?.trim().to_string();
    let credential = parse_credential(&format!("{}|{}", namespace, token))?;
    file.save(&credential)?;
    Ok(credential)
}
