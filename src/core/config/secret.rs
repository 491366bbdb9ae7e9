use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use super::parsing::env_optional;

const DEFAULT_SECRET_FILE: &str = ".dev_jwt_secret";

/// JWT secret for local runs without `AUTH_JWT_SECRET`. Generated once and reused, so tokens
/// minted by local tooling stay valid across restarts. Never used in strict mode.
pub(super) fn load_or_create_dev_secret() -> String {
    let path = secret_file_path();
    if let Some(existing) = read_secret(&path) {
        return existing;
    }

    let generated = generate_secret();
    match persist_secret(&path, &generated) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "Generated development JWT secret");
            generated
        }
        // Another process won the race; use its value.
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            read_secret(&path).unwrap_or(generated)
        }
        Err(err) => {
            tracing::warn!(
                error = %err,
                path = %path.display(),
                "Development JWT secret not persisted; tokens will not survive a restart"
            );
            generated
        }
    }
}

fn read_secret(path: &Path) -> Option<String> {
    let value = fs::read_to_string(path).ok()?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn persist_secret(path: &Path, secret: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(secret.as_bytes())
}

fn generate_secret() -> String {
    let mut bytes = [0u8; 48];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn secret_file_path() -> PathBuf {
    env_optional("SCHOOLHUB_DEV_SECRET_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_SECRET_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secrets_are_url_safe_and_long_enough() {
        let first = generate_secret();
        let second = generate_secret();
        assert_ne!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'));
    }

    #[test]
    fn persisted_secret_is_read_back_and_never_overwritten() {
        let dir = std::env::temp_dir().join(format!("schoolhub-secret-{}", uuid::Uuid::new_v4()));
        let path = dir.join("secret");

        persist_secret(&path, "first-secret").expect("persist");
        assert_eq!(read_secret(&path).as_deref(), Some("first-secret"));

        let err = persist_secret(&path, "second-secret").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(read_secret(&path).as_deref(), Some("first-secret"));

        let _ = fs::remove_dir_all(dir);
    }
}
