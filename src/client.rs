//! Helper client
//!
//! The requesting side of the helper protocol: encodes commands, flushes
//! them and waits for the one-byte acknowledgement. A helper that closes its
//! output instead of acknowledging has failed the command.

use crate::protocol::{read_ack, write_command, Command, ProtocolError};
use crate::store::StorePath;
use std::io::{self, BufWriter, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command as ProcessCommand, ExitStatus, Stdio};
use thiserror::Error;

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("helper closed the connection without acknowledging")]
    HelperClosed,

    #[error("unexpected acknowledgement byte from helper: {0}")]
    UnexpectedAck(u8),

    #[error("protocol error: {0}")]
    Protocol(ProtocolError),

    #[error("failed to spawn helper: {0}")]
    Spawn(#[source] io::Error),

    #[error("helper exited with {0}")]
    HelperFailed(ExitStatus),
}

impl From<ProtocolError> for ClientError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::Io(e) => ClientError::Io(e),
            ProtocolError::UnexpectedAck(byte) => ClientError::UnexpectedAck(byte),
            ProtocolError::Truncated { .. } => ClientError::HelperClosed,
            other => ClientError::Protocol(other),
        }
    }
}

/// Protocol client over an arbitrary pair of streams
pub struct HelperClient<R, W> {
    reader: R,
    writer: W,
}

impl<R: Read, W: Write> HelperClient<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Register a temporary root for `path` and wait for the helper to confirm
    pub fn add_temp_root(&mut self, path: &StorePath) -> Result<(), ClientError> {
        self.send(&Command::AddTempRoot(path.clone()))
    }

    /// Send one command and wait for its acknowledgement
    ///
    /// A helper that exits while the request is still being written has
    /// closed the connection just as surely as one that never acknowledges.
    pub fn send(&mut self, command: &Command) -> Result<(), ClientError> {
        write_command(&mut self.writer, command).map_err(|e| match e.kind() {
            io::ErrorKind::BrokenPipe => ClientError::HelperClosed,
            _ => ClientError::Io(e),
        })?;
        read_ack(&mut self.reader)?;
        Ok(())
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

/// A helper running as a child process, connected over its stdin/stdout
pub struct HelperProcess {
    client: HelperClient<ChildStdout, BufWriter<ChildStdin>>,
    child: Child,
}

impl HelperProcess {
    /// Spawn `command` with piped stdin/stdout; stderr is inherited
    pub fn spawn(mut command: ProcessCommand) -> Result<Self, ClientError> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(ClientError::Spawn)?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ClientError::Spawn(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "helper stdio was not captured",
                )));
            }
        };

        log::debug!("Spawned helper process {}", child.id());
        Ok(Self {
            client: HelperClient::new(stdout, BufWriter::new(stdin)),
            child,
        })
    }

    pub fn add_temp_root(&mut self, path: &StorePath) -> Result<(), ClientError> {
        self.client.add_temp_root(path)
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Close the request stream and wait for the helper to exit.
    ///
    /// The helper treats the close as a clean shutdown; any other exit
    /// status is an error.
    pub fn wait_for_exit(self) -> Result<(), ClientError> {
        let HelperProcess { client, mut child } = self;
        let (mut stdout, mut stdin) = client.into_inner();
        match stdin.flush() {
            Ok(()) => {}
            // Helper already gone; its exit status tells the rest
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
            Err(e) => return Err(e.into()),
        }
        drop(stdin);

        let mut trailing = Vec::new();
        stdout.read_to_end(&mut trailing)?;
        if !trailing.is_empty() {
            log::warn!("Helper wrote {} unexpected trailing byte(s)", trailing.len());
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(ClientError::HelperFailed(status));
        }
        Ok(())
    }
}
