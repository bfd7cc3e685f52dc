//! Token storage
//!
//! The sign-in token is kept in a plain file, by default
//! `<config_dir>/noticeboard/<service>.token`. The file is created with
//! owner-only permissions on unix.

use std::{
    fmt, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use snafu::prelude::*;
use tracing::debug;
use zeroize::Zeroize;

use crate::error::{ConfigSnafu, FileSnafu, KeyStoreError};

const TOKEN_FILE_EXT: &str = "token";

fn fmt_masked(val: Option<&String>) -> &'static str {
    match val {
        Some(_) => "Some(MASKED)",
        None => "None",
    }
}

/// Auth token. The value is masked in Debug output and wiped on drop.
#[derive(Clone, Default)]
pub struct Credentials {
    token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &fmt_masked(self.token.as_ref()))
            .finish()
    }
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn has_creds(&self) -> bool {
        self.token.as_ref().is_some_and(|token| !token.is_empty())
    }

    pub(crate) fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|token| !token.is_empty())
    }
}

impl Zeroize for Credentials {
    fn zeroize(&mut self) {
        if let Some(token) = self.token.as_mut() {
            token.zeroize();
        }
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// File-backed token store
#[derive(Clone, Debug)]
pub struct KeyStore {
    service: String,
    path: PathBuf,
}

impl KeyStore {
    /// Keystore at the default location for `service`.
    pub fn new(service: impl Into<String>) -> Result<Self, KeyStoreError> {
        let service = service.into();
        let dir = dirs::config_dir().context(ConfigSnafu {
            message: "cannot determine user config directory",
        })?;
        let path = dir
            .join(crate::config::DEFAULT_SERVICE_NAME)
            .join(format!("{service}.{TOKEN_FILE_EXT}"));
        Ok(Self { service, path })
    }

    /// Keystore using an explicit file path.
    pub fn with_path(service: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            service: service.into(),
            path: path.into(),
        }
    }

    /// returns service name
    pub fn service(&self) -> &str {
        &self.service
    }

    /// returns path to the token file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored token.
    /// Returns Ok with empty credentials if no token has been saved.
    pub fn get_credentials(&self) -> Result<Credentials, KeyStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(mut contents) => {
                let token = contents.trim().to_string();
                contents.zeroize();
                debug!(service = &self.service, path = ?self.path, "token loaded");
                Ok(Credentials {
                    token: (!token.is_empty()).then_some(token),
                })
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(service = &self.service, path = ?self.path, "no token file");
                Ok(Credentials::default())
            }
            Err(source) => Err(KeyStoreError::File {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Saves the token. Empty credentials are ignored (use `clear_credentials` to remove).
    pub fn update_credentials(&self, creds: &Credentials) -> Result<(), KeyStoreError> {
        let Some(token) = creds.token() else {
            return Ok(());
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context(FileSnafu { path: parent })?;
        }
        fs::write(&self.path, token).context(FileSnafu { path: &self.path })?;
        restrict_permissions(&self.path)?;
        debug!(service = &self.service, path = ?self.path, "token saved");
        Ok(())
    }

    /// Removes the stored token. Succeeds if there was none.
    pub fn clear_credentials(&self) -> Result<(), KeyStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(service = &self.service, path = ?self.path, "token removed");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(KeyStoreError::File {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), KeyStoreError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).context(FileSnafu { path })
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), KeyStoreError> {
    Ok(())
}
