//! Process probe module
//!
//! Watches a single 32-bit value inside the game process. The value is the
//! id of the ship the player sits in, or zero when on foot.

mod proc_reader;

use std::mem::{discriminant, Discriminant};

use tracing::{debug, info, warn};

pub use proc_reader::ProcReader;

/// The game process could not be attached to
#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    #[error("process {0} is not running")]
    ProcessNotFound(String),

    #[error("image of {0} not found in process memory map")]
    ImageNotFound(String),

    #[error("failed to open process: {0}")]
    Io(#[from] std::io::Error),

    #[error("reading process memory is not supported on this platform")]
    Unsupported,
}

/// A value could not be read from the attached process
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("not connected to the game")]
    NotConnected,

    #[error("failed to read process memory: {0}")]
    Io(#[from] std::io::Error),
}

/// Access to another process's memory
pub trait MemoryReader {
    type Handle;

    /// Attach to the first process named `process_name`
    fn attach(&mut self, process_name: &str) -> Result<Self::Handle, AttachError>;

    /// Address the process image is loaded at
    fn image_base(&self, handle: &Self::Handle) -> u64;

    /// Read a little-endian 32-bit integer at `address`
    fn read_i32(&mut self, handle: &Self::Handle, address: u64) -> Result<i32, ReadError>;
}

struct Connection<H> {
    handle: H,
    address: u64,
}

/// Connection to the game plus the resolved address of the watched value
///
/// Any failed read drops the connection; the next `ensure_connected`
/// attaches again from scratch.
pub struct ProcessProbe<R: MemoryReader> {
    reader: R,
    process_name: String,
    pointer_offset: u64,
    connection: Option<Connection<R::Handle>>,
    last_failure: Option<Discriminant<AttachError>>,
}

impl<R: MemoryReader> ProcessProbe<R> {
    pub fn new(reader: R, process_name: impl Into<String>, pointer_offset: u64) -> Self {
        Self {
            reader,
            process_name: process_name.into(),
            pointer_offset,
            connection: None,
            last_failure: None,
        }
    }

    /// Attach if not attached yet. Returns whether the probe is connected.
    pub fn ensure_connected(&mut self) -> bool {
        if self.connection.is_some() {
            return true;
        }

        match self.reader.attach(&self.process_name) {
            Ok(handle) => {
                let base = self.reader.image_base(&handle);
                let address = base.wrapping_add(self.pointer_offset);
                info!(
                    process = %self.process_name,
                    base = format_args!("{:#x}", base),
                    address = format_args!("{:#x}", address),
                    "game connected"
                );
                self.connection = Some(Connection { handle, address });
                self.last_failure = None;
                true
            }
            Err(e) => {
                // Warn once per error kind; a game not running stays quiet
                let kind = discriminant(&e);
                if matches!(e, AttachError::ProcessNotFound(_)) {
                    debug!(process = %self.process_name, error = %e, "game not attached");
                } else if self.last_failure != Some(kind) {
                    warn!(process = %self.process_name, error = %e, "cannot attach to game, retrying");
                }
                self.last_failure = Some(kind);
                false
            }
        }
    }

    /// Read the watched value, dropping the connection on failure
    pub fn read_value(&mut self) -> Result<i32, ReadError> {
        let connection = self.connection.as_ref().ok_or(ReadError::NotConnected)?;
        match self.reader.read_i32(&connection.handle, connection.address) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(error = %e, "game connection lost");
                self.connection = None;
                Err(e)
            }
        }
    }
}
