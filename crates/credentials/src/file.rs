//! Credential storage backed by a JSON file
//!
//! The file holds one `{ "access_token", "refresh_token" }` record. It is
//! read once at startup; afterwards the in-memory copy answers reads and
//! every write goes through a temp-file + rename so a crash mid-write never
//! leaves a truncated file. A tokio Mutex serializes writers, so a refresh
//! and a login landing at the same time each persist a whole record.

use std::path::{Path, PathBuf};

use common::Secret;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::store::{CredentialStore, StoreFuture};
use crate::token::TokenPair;

/// On-disk record. Absent fields mean "not logged in".
#[derive(Clone, Default, Serialize, Deserialize)]
struct StoredTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

/// Credential store that survives process restarts.
pub struct FileCredentialStore {
    path: PathBuf,
    state: Mutex<StoredTokens>,
}

impl FileCredentialStore {
    /// Load tokens from `path`.
    ///
    /// A missing file is a logged-out session, not an error; the file is
    /// created on the first write.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
            let tokens: StoredTokens = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;
            info!(
                path = %path.display(),
                logged_in = tokens.access_token.is_some(),
                "loaded credentials"
            );
            tokens
        } else {
            info!(path = %path.display(), "credential file not found, starting logged out");
            StoredTokens::default()
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn get_token(&self) -> StoreFuture<'_, Option<Secret<String>>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            state.access_token.clone().map(Secret::new)
        })
    }

    fn set_token(&self, token: Secret<String>) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.access_token = Some(token.expose().clone());
            debug!("updated access token");
            write_atomic(&self.path, &state).await
        })
    }

    fn get_refresh_token(&self) -> StoreFuture<'_, Option<Secret<String>>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            state.refresh_token.clone().map(Secret::new)
        })
    }

    fn set_refresh_token(&self, token: Secret<String>) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.refresh_token = Some(token.expose().clone());
            debug!("updated refresh token");
            write_atomic(&self.path, &state).await
        })
    }

    fn remove_tokens(&self) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            *state = StoredTokens::default();
            self.delete_file().await
        })
    }

    fn replace_tokens(&self, pair: TokenPair) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            *state = StoredTokens {
                access_token: Some(pair.access_token),
                refresh_token: pair.refresh_token,
            };
            debug!("replaced session tokens");
            write_atomic(&self.path, &state).await
        })
    }

    fn store_pair_if(
        &self,
        expected: Secret<String>,
        pair: TokenPair,
    ) -> StoreFuture<'_, Result<bool>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if state.refresh_token.as_deref() != Some(expected.expose().as_str()) {
                return Ok(false);
            }
            state.access_token = Some(pair.access_token);
            if let Some(refresh) = pair.refresh_token {
                state.refresh_token = Some(refresh);
            }
            debug!("stored refreshed tokens");
            write_atomic(&self.path, &state).await?;
            Ok(true)
        })
    }

    fn remove_tokens_if(&self, expected: Option<Secret<String>>) -> StoreFuture<'_, Result<bool>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if state.refresh_token.as_deref() != expected.as_ref().map(|t| t.expose().as_str()) {
                return Ok(false);
            }
            *state = StoredTokens::default();
            self.delete_file().await?;
            Ok(true)
        })
    }
}

impl FileCredentialStore {
    /// Delete the record. Callers hold the state lock.
    async fn delete_file(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(path = %self.path.display(), "removed credential file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to remove credential file");
                Err(Error::Io(format!("removing credential file: {e}")))
            }
        }
    }
}

/// Write the token record atomically with 0600 permissions.
async fn write_atomic(path: &Path, data: &StoredTokens) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::CredentialParse(format!("serializing credentials: {e}")))?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let tmp_path = dir.join(format!(".credentials.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credentials");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = FileCredentialStore::load(path.clone()).await.unwrap();
        assert!(store.get_token().await.is_none());
        assert!(store.get_refresh_token().await.is_none());
        assert!(!path.exists(), "load must not create the file");
    }

    #[tokio::test]
    async fn tokens_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = FileCredentialStore::load(path.clone()).await.unwrap();
        store
            .replace_tokens(TokenPair {
                access_token: "A1".into(),
                refresh_token: Some("R1".into()),
            })
            .await
            .unwrap();

        let reloaded = FileCredentialStore::load(path).await.unwrap();
        assert_eq!(reloaded.get_token().await.unwrap().expose(), "A1");
        assert_eq!(reloaded.get_refresh_token().await.unwrap().expose(), "R1");
    }

    #[tokio::test]
    async fn remove_tokens_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = FileCredentialStore::load(path.clone()).await.unwrap();
        store.set_token("A1".into()).await.unwrap();
        assert!(path.exists());

        store.remove_tokens().await.unwrap();
        assert!(!path.exists());
        assert!(store.get_token().await.is_none());

        // Second removal on a missing file is fine
        store.remove_tokens().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let result = FileCredentialStore::load(path).await;
        assert!(matches!(result, Err(Error::CredentialParse(_))));
    }

    #[tokio::test]
    async fn conditional_writes_keep_a_newer_login() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = FileCredentialStore::load(path.clone()).await.unwrap();
        store
            .replace_tokens(TokenPair {
                access_token: "L1".into(),
                refresh_token: Some("LR1".into()),
            })
            .await
            .unwrap();

        let stale = TokenPair {
            access_token: "A2".into(),
            refresh_token: Some("R2".into()),
        };
        assert!(!store.store_pair_if("R1".into(), stale).await.unwrap());
        assert!(!store.remove_tokens_if(Some("R1".into())).await.unwrap());

        let reloaded = FileCredentialStore::load(path.clone()).await.unwrap();
        assert_eq!(reloaded.get_token().await.unwrap().expose(), "L1");
        assert_eq!(reloaded.get_refresh_token().await.unwrap().expose(), "LR1");

        assert!(store.remove_tokens_if(Some("LR1".into())).await.unwrap());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn file_contains_wire_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = FileCredentialStore::load(path.clone()).await.unwrap();
        store.set_token("A1".into()).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(json["access_token"], "A1");
        assert!(json.get("refresh_token").is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_permissions_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = FileCredentialStore::load(path.clone()).await.unwrap();
        store.set_refresh_token("R1".into()).await.unwrap();

        let metadata = tokio::fs::metadata(&path).await.unwrap();
        let mode = metadata.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "credential file must be 0600, got {mode:o}");
    }

    #[tokio::test]
    async fn concurrent_writes_leave_valid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = std::sync::Arc::new(FileCredentialStore::load(path.clone()).await.unwrap());

        let mut handles = vec![];
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.set_token(format!("A{i}").into()).await.unwrap();
                store.set_refresh_token(format!("R{i}").into()).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert!(json["access_token"].as_str().unwrap().starts_with('A'));
        assert!(json["refresh_token"].as_str().unwrap().starts_with('R'));
    }
}
