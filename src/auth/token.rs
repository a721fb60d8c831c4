//! Credential record and on-disk storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{DeployError, Result};

/// A record counts as expired this long before its expiry instant
pub const EXPIRY_SAFETY_MARGIN: Duration = Duration::from_secs(5 * 60);

/// Records closer than this to expiry trigger a renewal warning
pub const RENEWAL_WARNING_WINDOW: Duration = Duration::from_secs(3 * 24 * 60 * 60);

/// Lifetime of a record created by the login flow
pub const CREDENTIAL_LIFETIME: Duration = Duration::from_secs(30 * 24 * 60 * 60);

const CONFIG_DIR_NAME: &str = "sitedeploy";
const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// Credentials obtained from the browser login.
///
/// Immutable once written; renewing means saving a new record over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    /// Bearer token for backend calls
    pub access_token: String,

    /// Refresh token (equals the access token when none was issued)
    pub refresh_token: String,

    /// Expiry instant in epoch milliseconds
    pub expires_at: i64,

    /// Scopes granted to this credential
    pub scopes: Vec<String>,

    /// Subject identifier, empty when the provider sent none
    #[serde(default)]
    pub user_id: String,

    /// Client identifier the credential was issued to
    pub client_id: String,
}

impl CredentialRecord {
    /// Create a record expiring [`CREDENTIAL_LIFETIME`] from now
    #[must_use]
    pub fn issue(
        access_token: String,
        refresh_token: Option<String>,
        user_id: Option<String>,
        scopes: Vec<String>,
        client_id: String,
    ) -> Self {
        let lifetime_ms = i64::try_from(CREDENTIAL_LIFETIME.as_millis()).unwrap_or(i64::MAX);
        let refresh_token = refresh_token
            .filter(|token| !token.is_empty())
            .unwrap_or_else(|| access_token.clone());

        Self {
            access_token,
            refresh_token,
            expires_at: now_millis().saturating_add(lifetime_ms),
            scopes,
            user_id: user_id.unwrap_or_default(),
            client_id,
        }
    }

    /// Milliseconds until expiry at `now_ms` (negative once past)
    #[must_use]
    pub fn remaining_millis_at(&self, now_ms: i64) -> i64 {
        self.expires_at.saturating_sub(now_ms)
    }

    /// Check expiry at `now_ms`, applying [`EXPIRY_SAFETY_MARGIN`]
    #[must_use]
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.remaining_millis_at(now_ms) <= duration_millis(EXPIRY_SAFETY_MARGIN)
    }

    /// Check if the record is expired (within 5 minutes of expiry counts)
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    /// Whether the record is still usable but inside the renewal window
    #[must_use]
    pub fn needs_renewal_soon(&self) -> bool {
        let now = now_millis();
        !self.is_expired_at(now)
            && self.remaining_millis_at(now) <= duration_millis(RENEWAL_WARNING_WINDOW)
    }

    /// Get remaining validity, if any
    #[must_use]
    pub fn remaining_validity(&self) -> Option<Duration> {
        u64::try_from(self.remaining_millis_at(now_millis()))
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Expiry as a UTC timestamp
    #[must_use]
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.expires_at)
    }
}

/// Current time in epoch milliseconds
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// File-backed store holding the single credential record.
///
/// There is no locking: concurrent writers race and the last one wins.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    storage_path: PathBuf,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    /// Create a store at the default path (platform-specific config directory)
    #[must_use]
    pub fn new() -> Self {
        Self {
            storage_path: Self::default_path(),
        }
    }

    /// Create a store with a custom path
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { storage_path: path }
    }

    /// Default credential file location
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
            .join(CREDENTIALS_FILE_NAME)
    }

    /// Get the storage path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    /// Load the record.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file exists but cannot be read and `CorruptData`
    /// if it does not parse. A missing file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<CredentialRecord>> {
        let content = match std::fs::read_to_string(&self.storage_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content).map(Some).map_err(|e| {
            DeployError::corrupt_data(self.storage_path.display().to_string(), e.to_string())
        })
    }

    /// Save the record, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, record: &CredentialRecord) -> Result<()> {
        if let Some(parent) = self.storage_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(record)?;
        std::fs::write(&self.storage_path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.storage_path, perms)?;
        }

        tracing::debug!(path = %self.storage_path.display(), "saved credentials");
        Ok(())
    }

    /// Delete the stored record; absent is not an error
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be deleted.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.storage_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the `sitedeploy` directory holding the credential file.
    ///
    /// When the file lives anywhere else only the file is removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be removed.
    pub fn remove_all(&self) -> Result<()> {
        let Some(dir) = self
            .storage_path
            .parent()
            .filter(|dir| dir.file_name().is_some_and(|name| name == CONFIG_DIR_NAME))
        else {
            return self.clear();
        };
        match std::fs::remove_dir_all(dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
