//! OAuth access tokens for the Sheets API.
//!
//! A token handed over in the environment wins. Otherwise a service account
//! key file is used when one is configured, and Application Default
//! Credentials (gcloud login or the metadata server) when none is.
use anyhow::{Context, Result};
use gcp_auth::{CustomServiceAccount, TokenProvider};
use std::path::Path;
use std::sync::Arc;

const SHEETS_SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets"];

/// Resolve a bearer token: explicit token first, then Google credentials.
pub(super) fn resolve_access_token(
    explicit: Option<&str>,
    credentials_path: Option<&Path>,
) -> Result<String> {
    if let Some(token) = explicit.filter(|token| !token.trim().is_empty()) {
        return Ok(token.trim().to_string());
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("start runtime for Google authentication")?;
    runtime.block_on(fetch_token(credentials_path))
}

async fn fetch_token(credentials_path: Option<&Path>) -> Result<String> {
    let provider: Arc<dyn TokenProvider> = match credentials_path {
        Some(path) => {
            let account = CustomServiceAccount::from_file(path)
                .with_context(|| format!("load service account key {}", path.display()))?;
            tracing::debug!(path = %path.display(), "using service account key");
            Arc::new(account)
        }
        None => gcp_auth::provider().await.context(
            "find Google credentials; set GOOGLE_APPLICATION_CREDENTIALS or GOOGLE_OAUTH_ACCESS_TOKEN",
        )?,
    };
    let token = provider
        .token(SHEETS_SCOPES)
        .await
        .context("obtain Sheets access token")?;
    tracing::debug!("obtained sheets access token");
    Ok(token.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_token_wins() {
        let token = resolve_access_token(Some(" tok "), Some(Path::new("/nonexistent/key.json")))
            .expect("explicit token");
        assert_eq!(token, "tok");
    }

    #[test]
    fn missing_key_file_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = resolve_access_token(None, Some(&temp.path().join("absent.json")))
            .expect_err("no key file");
        assert!(format!("{err:#}").contains("absent.json"));
    }

    #[test]
    fn key_file_that_is_not_a_service_account_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("user.json");
        std::fs::write(&path, r#"{"type": "authorized_user", "client_id": "id"}"#)
            .expect("write key");
        let err = resolve_access_token(None, Some(&path)).expect_err("not a service account");
        assert!(format!("{err:#}").contains("service account key"));
    }
}
