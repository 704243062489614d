//! Session over previously captured device output.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::debug;

use super::{CommandOutput, Session};
use crate::error::{Result, SessionError};

/// Replays a capture file as the output of every command.
///
/// Stands in for a live device when the output was collected elsewhere.
#[derive(Debug, Clone)]
pub struct OfflineSession {
    device: String,
    path: PathBuf,
    open: bool,
}

impl OfflineSession {
    pub fn new(device: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            path: path.into(),
            open: false,
        }
    }

    /// The capture file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Session for OfflineSession {
    async fn open(&mut self) -> Result<()> {
        if self.open {
            return Err(SessionError::AlreadyOpen.into());
        }
        tokio::fs::metadata(&self.path)
            .await
            .map_err(|source| SessionError::Io {
                path: self.path.clone(),
                source,
            })?;
        debug!("{}: replaying {}", self.device, self.path.display());
        self.open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    async fn send_command(&mut self, command: &str) -> Result<CommandOutput> {
        if !self.open {
            return Err(SessionError::NotOpen.into());
        }
        let start = Instant::now();
        let result = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SessionError::Io {
                path: self.path.clone(),
                source,
            })?;
        Ok(CommandOutput::new(
            &self.device,
            command,
            result,
            start.elapsed(),
        ))
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn device(&self) -> &str {
        &self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::Error;

    #[tokio::test]
    async fn test_replays_capture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r1.txt");
        std::fs::write(&path, "Vlan1 active\n").unwrap();

        let mut session = OfflineSession::new("r1", &path);
        assert!(!session.is_open());
        session.open().await.unwrap();
        assert!(session.is_open());

        let output = session.send_command("show vlan").await.unwrap();
        assert_eq!(output.device, "r1");
        assert_eq!(output.command, "show vlan");
        assert_eq!(output.result, "Vlan1 active\n");

        session.close().await.unwrap();
        assert!(!session.is_open());
    }

    #[tokio::test]
    async fn test_send_before_open() {
        let mut session = OfflineSession::new("r1", "unused.txt");
        let err = session.send_command("show vlan").await.unwrap_err();
        assert!(matches!(err, Error::Session(SessionError::NotOpen)));
    }

    #[tokio::test]
    async fn test_open_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r1.txt");
        std::fs::write(&path, "").unwrap();

        let mut session = OfflineSession::new("r1", &path);
        session.open().await.unwrap();
        let err = session.open().await.unwrap_err();
        assert!(matches!(err, Error::Session(SessionError::AlreadyOpen)));
    }

    #[test]
    fn test_missing_capture() {
        let mut session = OfflineSession::new("r1", "/nonexistent/capture.txt");
        let err = tokio_test::block_on(session.open()).unwrap_err();
        assert!(matches!(err, Error::Session(SessionError::Io { .. })));
    }
}
