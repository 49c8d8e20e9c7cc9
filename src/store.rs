//! Access to the per-user script and password directories.
//!
//! Layout under the configuration root (`~/.config/zcra` by default):
//!
//! ```text
//! scripts/<name>.zcra
//! passwords/<alias>
//! ```
//!
//! Every name is validated before the filesystem is touched, and every file
//! is checked for group/other permission bits before its contents are read.

use crate::error::StoreError;
use std::fs::File;
use std::io::Read;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

const SCRIPTS_DIR: &str = "scripts";
const PASSWORDS_DIR: &str = "passwords";
const SCRIPT_EXTENSION: &str = "zcra";

/// Resolves and reads scripts and passwords below a configuration root.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the script called `name`, after validating the name.
    pub fn script_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        validate_name(name)?;
        Ok(self
            .root
            .join(SCRIPTS_DIR)
            .join(format!("{name}.{SCRIPT_EXTENSION}")))
    }

    /// Path of the password file for `alias`, after validating the alias.
    pub fn password_path(&self, alias: &str) -> Result<PathBuf, StoreError> {
        validate_name(alias)?;
        Ok(self.root.join(PASSWORDS_DIR).join(alias))
    }

    /// Read the whole script called `name`.
    pub fn load_script(&self, name: &str) -> Result<String, StoreError> {
        let path = self.script_path(name)?;
        let bytes = read_private(&path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read the secret stored for `alias`: the first line of its file.
    ///
    /// The returned buffer is wiped when dropped.
    pub fn load_password(&self, alias: &str) -> Result<Zeroizing<Vec<u8>>, StoreError> {
        let path = self.password_path(alias)?;
        let mut secret = Zeroizing::new(read_private(&path)?);
        if let Some(end) = secret.iter().position(|&b| b == b'\n') {
            secret.truncate(end);
        }
        Ok(secret)
    }
}

/// Reject names that could escape their directory.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name.contains('/') || name.contains("..") || name.contains('\0') {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Read a file only if neither group nor others have any access to it.
fn read_private(path: &Path) -> Result<Vec<u8>, StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    // Check and read through the same handle so a swapped file is never read.
    let mut file = File::open(path).map_err(io_err)?;
    let mode = file.metadata().map_err(io_err)?.permissions().mode();
    if mode & 0o077 != 0 {
        return Err(StoreError::Insecure {
            path: path.to_path_buf(),
            mode: mode & 0o7777,
        });
    }
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(io_err)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_mode(path: &Path, content: &str, mode: u32) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("login").is_ok());
        assert!(validate_name("db.prod").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("x..y").is_err());
    }

    #[test]
    fn test_script_path_layout() {
        let store = Store::new("/cfg");
        assert_eq!(
            store.script_path("boot").unwrap(),
            PathBuf::from("/cfg/scripts/boot.zcra")
        );
        assert_eq!(
            store.password_path("db").unwrap(),
            PathBuf::from("/cfg/passwords/db")
        );
    }

    #[test]
    fn test_traversal_rejected_before_filesystem_access() {
        let store = Store::new("/nonexistent-root");
        assert!(matches!(
            store.load_script("../etc/passwd"),
            Err(StoreError::InvalidName(_))
        ));
        assert!(matches!(
            store.load_password("../../shadow"),
            Err(StoreError::InvalidName(_))
        ));
    }

    #[test]
    fn test_group_readable_script_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        write_mode(&store.script_path("open").unwrap(), "TYPE hi\n", 0o640);
        match store.load_script("open") {
            Err(StoreError::Insecure { mode, .. }) => assert_eq!(mode, 0o640),
            other => panic!("expected insecure error, got {other:?}"),
        }
    }

    #[test]
    fn test_world_readable_password_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        write_mode(&store.password_path("db").unwrap(), "s3cret\n", 0o604);
        assert!(matches!(
            store.load_password("db"),
            Err(StoreError::Insecure { .. })
        ));
    }

    #[test]
    fn test_password_first_line_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        write_mode(&store.password_path("db").unwrap(), "s3cret\nignored\n", 0o600);
        assert_eq!(store.load_password("db").unwrap().as_slice(), b"s3cret");
    }

    #[test]
    fn test_missing_script_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        assert!(matches!(
            store.load_script("absent"),
            Err(StoreError::Io { .. })
        ));
    }

    #[test]
    fn test_directory_in_place_of_script_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let path = store.script_path("nested").unwrap();
        fs::create_dir_all(&path).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o700)).unwrap();
        assert!(matches!(
            store.load_script("nested"),
            Err(StoreError::Io { .. })
        ));
    }
}
