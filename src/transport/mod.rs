//! # Printer Transport Layer
//!
//! Device connections for direct protocol mode.
//!
//! ## Available Transports
//!
//! - [`bluetooth`]: Bluetooth RFCOMM serial link (Linux)
//! - [`MemoryConnector`]: in-memory sink that records every receipt
//!
//! The dispatcher only sees the [`DeviceConnector`] seam: it asks for a
//! connection, writes one complete receipt, flushes and drops it.

pub mod bluetooth;

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::RelayError;

pub use bluetooth::BluetoothTransport;

/// Opens a writable connection to the printer.
///
/// Called from blocking context; implementations may block on I/O.
pub trait DeviceConnector: Send + Sync {
    /// Connect to `device` (a MAC or path), or to a default when `None`.
    fn connect(&self, device: Option<&str>) -> Result<Box<dyn Write + Send>, RelayError>;
}

/// Connects over Bluetooth RFCOMM.
#[derive(Debug, Default, Clone, Copy)]
pub struct RfcommConnector;

impl DeviceConnector for RfcommConnector {
    fn connect(&self, device: Option<&str>) -> Result<Box<dyn Write + Send>, RelayError> {
        let path = bluetooth::resolve_device(device)?;
        tracing::debug!(device = %path, "opening printer");
        Ok(Box::new(BluetoothTransport::open(&path)?))
    }
}

/// Connector that captures receipts in memory.
///
/// Each connection appends one entry to [`receipts`](Self::receipts) when
/// flushed. Set [`fail_connect`](Self::fail_connect) to simulate an
/// unreachable printer.
#[derive(Debug, Default, Clone)]
pub struct MemoryConnector {
    receipts: Arc<Mutex<Vec<Vec<u8>>>>,
    fail: Arc<Mutex<bool>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_connect(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    /// Every flushed receipt, oldest first.
    pub fn receipts(&self) -> Vec<Vec<u8>> {
        self.receipts.lock().clone()
    }
}

impl DeviceConnector for MemoryConnector {
    fn connect(&self, _device: Option<&str>) -> Result<Box<dyn Write + Send>, RelayError> {
        if *self.fail.lock() {
            return Err(RelayError::Device("printer unreachable".to_string()));
        }
        Ok(Box::new(MemoryConnection {
            buffer: Vec::new(),
            sink: Arc::clone(&self.receipts),
        }))
    }
}

struct MemoryConnection {
    buffer: Vec<u8>,
    sink: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Write for MemoryConnection {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            self.sink.lock().push(std::mem::take(&mut self.buffer));
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_connector_records_flushed_receipts() {
        let connector = MemoryConnector::new();
        let mut conn = connector.connect(None).unwrap();
        conn.write_all(b"abc").unwrap();
        assert!(connector.receipts().is_empty());
        conn.flush().unwrap();
        assert_eq!(connector.receipts(), vec![b"abc".to_vec()]);
    }

    #[test]
    fn test_memory_connector_failure() {
        let connector = MemoryConnector::new();
        connector.fail_connect(true);
        assert!(matches!(
            connector.connect(Some("00:11:22:33:44:55")),
            Err(RelayError::Device(_))
        ));
    }
}
