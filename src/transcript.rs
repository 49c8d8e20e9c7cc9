//! Append-only transcript of the child's output that survives log rotation.
//!
//! The file is opened lazily on the first write and watched for deletion,
//! renames and attribute changes. Any of those closes the handle; the next
//! write opens the path again and re-registers the watch.

use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// Filesystem events about the transcript path, forwarded to the reactor.
pub type LogEvents = UnboundedSender<notify::Event>;

pub struct Transcript {
    path: Option<PathBuf>,
    events: Option<LogEvents>,
    file: Option<File>,
    watcher: Option<RecommendedWatcher>,
    failing: bool,
}

impl Transcript {
    /// A transcript that records nothing.
    pub fn disabled() -> Self {
        Self {
            path: None,
            events: None,
            file: None,
            watcher: None,
            failing: false,
        }
    }

    /// A transcript appending to `path`, reporting watch events on `events`.
    pub fn new(path: impl Into<PathBuf>, events: LogEvents) -> Self {
        Self {
            path: Some(path.into()),
            events: Some(events),
            ..Self::disabled()
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Append `data`. Failures degrade logging but never reach the caller.
    pub fn write(&mut self, data: &[u8]) {
        let Some(path) = self.path.clone() else {
            return;
        };
        match self.append(&path, data) {
            Ok(()) => self.failing = false,
            Err(e) => {
                self.file = None;
                if !self.failing {
                    warn!(path = %path.display(), "transcript write failed: {e}");
                    self.failing = true;
                }
            }
        }
    }

    fn append(&mut self, path: &Path, data: &[u8]) -> io::Result<()> {
        if self.file.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .mode(0o600)
                .open(path)?;
            debug!(path = %path.display(), "transcript opened");
            self.file = Some(file);
            self.watch(path);
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(data)?;
        }
        Ok(())
    }

    fn watch(&mut self, path: &Path) {
        let Some(events) = self.events.clone() else {
            return;
        };
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = events.send(event);
            }
        })
        .and_then(|mut w| w.watch(path, RecursiveMode::NonRecursive).map(|()| w));

        match watcher {
            Ok(w) => self.watcher = Some(w),
            Err(e) => warn!(path = %path.display(), "cannot watch transcript: {e}"),
        }
    }

    /// React to a filesystem event on the transcript path.
    ///
    /// Plain data writes (including our own) are ignored.
    pub fn on_fs_event(&mut self, event: &notify::Event) {
        if !invalidates(&event.kind) || self.file.is_none() {
            return;
        }
        debug!(kind = ?event.kind, "transcript moved or removed, closing");
        self.file = None;
        self.watcher = None;
    }
}

fn invalidates(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Metadata(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{DataChange, MetadataKind, RemoveKind, RenameMode};
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tokio::sync::mpsc;

    fn transcript(path: &Path) -> (Transcript, mpsc::UnboundedReceiver<notify::Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Transcript::new(path, tx), rx)
    }

    #[test]
    fn test_disabled_is_noop() {
        let mut t = Transcript::disabled();
        t.write(b"data");
        assert!(!t.is_open());
        assert!(t.path().is_none());
    }

    #[test]
    fn test_lazy_open_owner_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.log");
        let (mut t, _rx) = transcript(&path);
        assert!(!path.exists());

        t.write(b"hello");
        assert!(t.is_open());
        assert_eq!(fs::read(&path).unwrap(), b"hello");
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);
    }

    #[test]
    fn test_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.log");
        fs::write(&path, "old\n").unwrap();
        let (mut t, _rx) = transcript(&path);
        t.write(b"new");
        assert_eq!(fs::read_to_string(&path).unwrap(), "old\nnew");
    }

    #[test]
    fn test_data_events_keep_handle() {
        let dir = tempfile::tempdir().unwrap();
        let (mut t, _rx) = transcript(&dir.path().join("a.log"));
        t.write(b"x");
        t.on_fs_event(&notify::Event::new(EventKind::Modify(ModifyKind::Data(
            DataChange::Any,
        ))));
        assert!(t.is_open());
    }

    #[test]
    fn test_reopens_after_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.log");
        let (mut t, _rx) = transcript(&path);
        t.write(b"before");
        fs::remove_file(&path).unwrap();

        t.on_fs_event(&notify::Event::new(EventKind::Remove(RemoveKind::File)));
        assert!(!t.is_open());

        t.write(b"after");
        assert_eq!(fs::read(&path).unwrap(), b"after");
    }

    #[test]
    fn test_reopens_after_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.log");
        let rotated = dir.path().join("session.log.1");
        let (mut t, _rx) = transcript(&path);
        t.write(b"one");
        fs::rename(&path, &rotated).unwrap();

        t.on_fs_event(&notify::Event::new(EventKind::Modify(ModifyKind::Name(
            RenameMode::From,
        ))));
        t.write(b"two");
        assert_eq!(fs::read(&rotated).unwrap(), b"one");
        assert_eq!(fs::read(&path).unwrap(), b"two");
    }

    #[test]
    fn test_attribute_change_closes() {
        let dir = tempfile::tempdir().unwrap();
        let (mut t, _rx) = transcript(&dir.path().join("a.log"));
        t.write(b"x");
        t.on_fs_event(&notify::Event::new(EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::Permissions,
        ))));
        assert!(!t.is_open());
    }

    #[test]
    fn test_unwritable_path_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let (mut t, _rx) = transcript(&dir.path().join("missing").join("a.log"));
        t.write(b"x");
        t.write(b"y");
        assert!(!t.is_open());
    }
}
