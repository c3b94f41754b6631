//! # Bluetooth RFCOMM Transport
//!
//! Communication with receipt printers over Bluetooth Serial Port Profile
//! (SPP) via RFCOMM.
//!
//! ## Bluetooth Setup (Linux)
//!
//! The printer must be paired and bound to an RFCOMM device before the
//! relay can reach it:
//!
//! ```bash
//! $ bluetoothctl
//! [bluetooth]# pair 00:11:62:XX:XX:XX
//! $ sudo rfcomm bind 0 00:11:62:XX:XX:XX
//! # This creates /dev/rfcomm0
//! ```
//!
//! ## Device Resolution
//!
//! | Configured value        | Device used                         |
//! |-------------------------|-------------------------------------|
//! | `00:11:62:AA:BB:CC`     | the `/dev/rfcommN` bound to that MAC |
//! | `/dev/rfcomm1`          | that path                           |
//! | nothing                 | the first bound RFCOMM device       |
//!
//! ## TTY Configuration
//!
//! The RFCOMM device is opened in raw mode so binary data is transmitted
//! without modification:
//!
//! - **No input processing**: Disable IGNBRK, BRKINT, PARMRK, ISTRIP, etc.
//! - **No output processing**: Disable OPOST (no CR/LF translation)
//! - **8-bit characters**: CS8 (8 data bits, no parity)
//! - **No echo**: Disable ECHO, ECHONL
//! - **Non-canonical mode**: Disable ICANON (no line buffering)
//!
//! ## Chunked Writes
//!
//! Large writes are split into chunks with a small delay between them to
//! avoid overwhelming the Bluetooth buffer.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::Duration;

use crate::error::RelayError;

/// Default chunk size for writes (bytes)
const CHUNK_SIZE: usize = 4096;

/// Delay between chunks (milliseconds)
const CHUNK_DELAY_MS: u64 = 2;

/// Kernel table of bound RFCOMM devices.
const PROC_RFCOMM: &str = "/proc/net/rfcomm";

/// # Bluetooth Printer Transport
///
/// A raw-mode RFCOMM serial link. Implements [`std::io::Write`]; dropping
/// the transport closes the device.
///
/// ## Example
///
/// ```no_run
/// use std::io::Write;
/// use kds_relay::protocol::commands;
/// use kds_relay::transport::BluetoothTransport;
///
/// let mut transport = BluetoothTransport::open("/dev/rfcomm0")?;
/// transport.write_all(&commands::init())?;
/// transport.flush()?;
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct BluetoothTransport {
    file: File,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl BluetoothTransport {
    /// Open a Bluetooth connection to the printer.
    ///
    /// ## Errors
    ///
    /// Returns [`RelayError::Device`] if:
    /// - The device doesn't exist
    /// - Permission denied (may need root or dialout group)
    /// - TTY configuration fails
    pub fn open<P: AsRef<Path>>(device: P) -> Result<Self, RelayError> {
        let path = device.as_ref();

        let file = OpenOptions::new().write(true).open(path).map_err(|e| {
            RelayError::Device(format!("Failed to open {}: {}", path.display(), e))
        })?;

        configure_tty_raw(file.as_raw_fd())?;

        Ok(Self {
            file,
            chunk_size: CHUNK_SIZE,
            chunk_delay: Duration::from_millis(CHUNK_DELAY_MS),
        })
    }
}

impl Write for BluetoothTransport {
    /// Small writes go straight through; large ones are chunked.
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if data.len() <= self.chunk_size {
            return self.file.write(data);
        }

        for chunk in data.chunks(self.chunk_size) {
            self.file.write_all(chunk)?;
            if !self.chunk_delay.is_zero() {
                thread::sleep(self.chunk_delay);
            }
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Configure a file descriptor for raw TTY mode.
///
/// ## What Gets Disabled
///
/// - **Input flags**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR, ICRNL, IXON, IXOFF, IXANY
/// - **Output flags**: OPOST
/// - **Local flags**: ECHO, ECHONL, ICANON, ISIG, IEXTEN
/// - **Control flags**: CSIZE, PARENB (then CS8 is set)
///
/// IXON/IXOFF/IXANY must be off: 0x11 and 0x13 are ordinary bytes in
/// command parameters and UTF-8 payloads.
#[cfg(unix)]
fn configure_tty_raw(fd: i32) -> Result<(), RelayError> {
    use std::mem::MaybeUninit;

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(RelayError::Device(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);

    termios.c_oflag &= !libc::OPOST;

    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);

    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(RelayError::Device(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}

#[cfg(not(unix))]
fn configure_tty_raw(_fd: i32) -> Result<(), RelayError> {
    Ok(())
}

// ============================================================================
// DEVICE RESOLUTION
// ============================================================================

/// Validate a Bluetooth MAC address format (XX:XX:XX:XX:XX:XX).
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 {
        return false;
    }
    parts
        .iter()
        .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Bound devices from an `rfcomm -a` or `/proc/net/rfcomm` listing.
///
/// Lines look like `rfcomm0: 00:11:62:AA:BB:CC channel 1 clean`. Returns
/// `(device name, line)` pairs in listing order.
fn bound_devices(listing: &str) -> Vec<(String, String)> {
    listing
        .lines()
        .filter_map(|line| {
            let (name, _) = line.split_once(':')?;
            let name = name.trim();
            name.starts_with("rfcomm")
                .then(|| (name.to_string(), line.to_uppercase()))
        })
        .collect()
}

/// Current RFCOMM binding table.
///
/// Reads `/proc/net/rfcomm` and falls back to the `rfcomm -a` command.
fn rfcomm_listing() -> Result<String, RelayError> {
    if let Ok(contents) = fs::read_to_string(PROC_RFCOMM)
        && !contents.trim().is_empty()
    {
        return Ok(contents);
    }

    let output = Command::new("rfcomm")
        .arg("-a")
        .output()
        .map_err(|e| RelayError::Device(format!("Failed to run 'rfcomm -a': {}", e)))?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn existing_device(name: &str) -> Option<String> {
    let device_path = format!("/dev/{}", name);
    Path::new(&device_path).exists().then_some(device_path)
}

/// Find an existing RFCOMM device bound to the given MAC address.
///
/// Returns the device path (e.g., "/dev/rfcomm0") if found.
pub fn find_rfcomm_for_mac(mac: &str) -> Result<Option<String>, RelayError> {
    let mac_upper = mac.to_uppercase();
    Ok(bound_devices(&rfcomm_listing()?)
        .into_iter()
        .filter(|(_, line)| line.contains(&mac_upper))
        .find_map(|(name, _)| existing_device(&name)))
}

/// The first bound RFCOMM device that exists on disk.
pub fn first_bound_rfcomm() -> Result<Option<String>, RelayError> {
    Ok(bound_devices(&rfcomm_listing()?)
        .into_iter()
        .find_map(|(name, _)| existing_device(&name)))
}

/// Resolve a configured printer identifier to a device path.
pub fn resolve_device(configured: Option<&str>) -> Result<String, RelayError> {
    match configured.map(str::trim).filter(|c| !c.is_empty()) {
        Some(mac) if is_valid_mac(mac) => find_rfcomm_for_mac(mac)?.ok_or_else(|| {
            RelayError::Device(format!("No RFCOMM device bound to {}", mac.to_uppercase()))
        }),
        Some(path) => Ok(path.to_string()),
        None => first_bound_rfcomm()?
            .ok_or_else(|| RelayError::Device("No bound RFCOMM device".to_string())),
    }
}

// ============================================================================
// TESTS
// ============================================================================
