//! Session layer: where raw command output comes from.
//!
//! The classifier never talks to devices. A [`Session`] produces
//! [`CommandOutput`] and [`fan_out`] runs one session per device
//! concurrently, classifying each output as it arrives.

mod offline;
mod output;

pub use offline::OfflineSession;
pub use output::CommandOutput;

use std::future::Future;
use std::sync::Arc;

use log::{debug, warn};

use crate::classify::{Classifier, ParseResult};
use crate::error::{Error, Result, SessionError};

/// Trait for sources of command output.
pub trait Session: Send + Sync {
    /// Open the session.
    fn open(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Close the session.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Run a command and collect its output.
    fn send_command(
        &mut self,
        command: &str,
    ) -> impl Future<Output = Result<CommandOutput>> + Send;

    /// Run multiple commands sequentially.
    fn send_commands(
        &mut self,
        commands: &[&str],
    ) -> impl Future<Output = Result<Vec<CommandOutput>>> + Send {
        async move {
            let mut outputs = Vec::with_capacity(commands.len());
            for cmd in commands {
                outputs.push(self.send_command(cmd).await?);
            }
            Ok(outputs)
        }
    }

    /// Check if the session is open.
    fn is_open(&self) -> bool;

    /// Name of the device behind the session.
    fn device(&self) -> &str;
}

/// Outcome of one device in a [`fan_out`].
#[derive(Debug)]
pub struct DeviceResponse {
    pub device: String,
    /// Classified output, or why the device produced none.
    pub response: Result<ParseResult>,
}

impl DeviceResponse {
    /// The classified output, if the device succeeded.
    pub fn result(&self) -> Option<&ParseResult> {
        self.response.as_ref().ok()
    }

    /// The failure, if the device produced no output.
    pub fn error(&self) -> Option<&Error> {
        self.response.as_ref().err()
    }
}

/// Run `command` on every session concurrently and classify each output.
///
/// Each session is opened, queried once and closed on its own tokio task.
/// Every task is awaited and responses come back in the order the sessions
/// were given. A device that fails only fails its own response.
pub async fn fan_out<S>(
    sessions: Vec<S>,
    classifier: Arc<Classifier>,
    platform: &str,
    command: &str,
) -> Vec<DeviceResponse>
where
    S: Session + 'static,
{
    let handles: Vec<_> = sessions
        .into_iter()
        .map(|mut session| {
            let device = session.device().to_string();
            let classifier = Arc::clone(&classifier);
            let platform = platform.to_string();
            let command = command.to_string();
            let handle = tokio::spawn(async move {
                let output = run_once(&mut session, &command).await?;
                classifier.classify_output(&platform, &output)
            });
            (device, handle)
        })
        .collect();

    debug!("fanned {command:?} out to {} devices", handles.len());

    let mut responses = Vec::with_capacity(handles.len());
    for (device, handle) in handles {
        let response = match handle.await {
            Ok(response) => response,
            Err(e) => Err(SessionError::Worker {
                device: device.clone(),
                message: e.to_string(),
            }
            .into()),
        };
        if let Err(err) = &response {
            warn!("{device}: {err}");
        }
        responses.push(DeviceResponse { device, response });
    }
    responses
}

async fn run_once<S: Session>(session: &mut S, command: &str) -> Result<CommandOutput> {
    session.open().await?;
    let output = session.send_command(command).await;
    session.close().await?;
    output
}
