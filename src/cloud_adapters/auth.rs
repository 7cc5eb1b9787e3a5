use std::path::Path;

use tracing::info;
use yup_oauth2::authenticator::DefaultAuthenticator;
use yup_oauth2::{InstalledFlowAuthenticator, InstalledFlowReturnMethod};

/// Scope granting read and write access to the user's spreadsheets.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Errors that can occur when authenticating with Google.
#[derive(Debug)]
pub enum AuthError {
    /// The OAuth client secret file does not exist.
    MissingCredentials(String),
    /// The client secret file could not be parsed.
    InvalidCredentials(String),
    /// The token flow failed.
    Flow(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredentials(path) => {
                write!(f, "credentials json file {path} was not found")
            }
            AuthError::InvalidCredentials(e) => write!(f, "invalid credentials file: {e}"),
            AuthError::Flow(e) => write!(f, "authorization failed: {e}"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Build an installed-flow authenticator that caches tokens in `token_path`.
///
/// Cached tokens are refreshed silently; the browser flow only runs when
/// no usable token exists.
pub async fn installed_flow_authenticator(
    credentials_path: &str,
    token_path: &str,
) -> Result<DefaultAuthenticator, AuthError> {
    if !Path::new(credentials_path).exists() {
        return Err(AuthError::MissingCredentials(credentials_path.to_string()));
    }
    let secret = yup_oauth2::read_application_secret(credentials_path)
        .await
        .map_err(|e| AuthError::InvalidCredentials(e.to_string()))?;
    InstalledFlowAuthenticator::builder(secret, InstalledFlowReturnMethod::HTTPRedirect)
        .persist_tokens_to_disk(token_path)
        .build()
        .await
        .map_err(|e| AuthError::Flow(e.to_string()))
}

/// Perform the OAuth installed flow and persist tokens to disk.
pub async fn initial_oauth_login(credentials_path: &str, token_path: &str) -> Result<(), AuthError> {
    let auth = installed_flow_authenticator(credentials_path, token_path).await?;
    auth.token(&[SPREADSHEETS_SCOPE])
        .await
        .map_err(|e| AuthError::Flow(e.to_string()))?;
    info!(token_path, "Stored OAuth tokens");
    Ok(())
}
