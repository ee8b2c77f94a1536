//! Protocol dispatcher

use super::HelperError;
use crate::config::HelperConfig;
use crate::protocol::{read_length, read_payload, read_tag, write_ack, CommandTag, ProtocolError};
use crate::store::{Store, StorePath};
use std::io::{self, BufWriter, Read, Write};

/// Outcome of a single dispatcher step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A command was handled and acknowledged
    Continue,
    /// The peer closed the stream on a command boundary
    Closed,
}

/// Counters for a finished connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub commands: u64,
}

/// Serves one connection: reads commands from `reader`, runs them against
/// `store` and acknowledges each on `writer`.
pub struct Dispatcher<R, W, S> {
    reader: R,
    writer: W,
    store: S,
    /// Grow-only scratch space for payloads
    buf: Vec<u8>,
    max_payload_len: usize,
    stats: DispatchStats,
}

impl<R: Read, W: Write, S: Store> Dispatcher<R, W, S> {
    pub fn new(reader: R, writer: W, store: S) -> Self {
        Self::with_config(reader, writer, store, &HelperConfig::default())
    }

    pub fn with_config(reader: R, writer: W, store: S, config: &HelperConfig) -> Self {
        Self {
            reader,
            writer,
            store,
            buf: vec![0u8; config.initial_buffer_len],
            max_payload_len: config.max_payload_len,
            stats: DispatchStats::default(),
        }
    }

    /// Run until the peer closes the input stream.
    ///
    /// Any error ends the connection; nothing further is written.
    pub fn run(&mut self) -> Result<DispatchStats, HelperError> {
        log::debug!("Serving helper protocol for store {}", self.store.store_dir().display());

        loop {
            match self.process_one_command() {
                Ok(Step::Continue) => {}
                Ok(Step::Closed) => {
                    log::debug!("Peer closed input after {} command(s)", self.stats.commands);
                    return Ok(self.stats);
                }
                Err(e) => {
                    log::warn!("Helper connection failed: {}", e);
                    return Err(e);
                }
            }
        }
    }

    /// Read, execute and acknowledge one command
    pub fn process_one_command(&mut self) -> Result<Step, HelperError> {
        let tag = match read_tag(&mut self.reader)? {
            Some(tag) => tag,
            None => return Ok(Step::Closed),
        };

        match CommandTag::try_from(tag)? {
            CommandTag::AddTempRoot => self.add_temp_root()?,
        }

        write_ack(&mut self.writer)?;
        self.stats.commands += 1;
        Ok(Step::Continue)
    }

    fn add_temp_root(&mut self) -> Result<(), HelperError> {
        let len = read_length(&mut self.reader)?;
        if len > self.max_payload_len {
            return Err(ProtocolError::PayloadTooLarge {
                len,
                max: self.max_payload_len,
            }
            .into());
        }

        let raw = read_payload(&mut self.reader, len, &mut self.buf)?;
        let path = StorePath::from_bytes(raw)?;
        log::debug!("Adding temp root {}", path);
        self.store.add_temp_root(&path)?;
        Ok(())
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Current scratch buffer size
    pub fn buffer_len(&self) -> usize {
        self.buf.len()
    }

    pub fn into_inner(self) -> (R, W, S) {
        (self.reader, self.writer, self.store)
    }
}

/// Run the dispatcher over this process's stdin and stdout
pub fn serve_stdio<S: Store>(store: S, config: &HelperConfig) -> Result<DispatchStats, HelperError> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let reader = stdin.lock();
    let writer = BufWriter::new(stdout.lock());

    log::info!("Store helper started on stdin/stdout");
    let stats = Dispatcher::with_config(reader, writer, store, config).run()?;
    log::info!("Store helper finished: {} command(s) handled", stats.commands);
    Ok(stats)
}
