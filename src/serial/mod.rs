//! # Serial Link Module
//!
//! The boundary to the locally attached instrument. The core sees a bounded
//! `read` (empty on timeout, which is not an error) and a `write`; the
//! physical transport lives behind the [`SerialLink`] trait.
//!
//! The [`UartLink`] implementation drives a real UART through the
//! `serialport` crate and is gated behind the `serial` cargo feature, so the
//! core (and its tests, which use in-memory links) builds without native
//! serial support.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use crate::registry::Capability;

/// The serial channel collaborator.
#[async_trait]
pub trait SerialLink: Send + Sync {
    /// Operations this link actually supports; checked at registration.
    fn capabilities(&self) -> &[Capability];

    /// Read up to `max_bytes`, waiting at most `timeout`. `Ok(None)` means
    /// nothing arrived in time.
    async fn read(&self, max_bytes: usize, timeout: Duration) -> crate::error::Result<Option<Bytes>>;

    /// Write the full buffer to the instrument.
    async fn write(&self, data: &[u8]) -> crate::error::Result<()>;
}

#[cfg(feature = "serial")]
pub use uart::UartLink;

#[cfg(feature = "serial")]
mod uart {
    use super::*;
    use crate::error::CoreError;
    use log::info;
    use std::io::{Read, Write};
    use std::sync::{Arc, Mutex};

    /// `serialport`-backed UART link.
    ///
    /// The port handle is blocking, so reads and writes run on the blocking
    /// pool; the mutex serializes access between the uplink read loop and
    /// downlink writes.
    pub struct UartLink {
        port: Arc<Mutex<Box<dyn serialport::SerialPort>>>,
    }

    impl UartLink {
        pub fn open(path: &str, baud_rate: u32) -> crate::error::Result<Self> {
            let port = serialport::new(path, baud_rate)
                .timeout(Duration::from_millis(100))
                .open()
                .map_err(|e| CoreError::Serial(format!("cannot open {}: {}", path, e)))?;
            info!("opened serial port {} at {} baud", path, baud_rate);
            Ok(Self {
                port: Arc::new(Mutex::new(port)),
            })
        }
    }

    #[async_trait]
    impl SerialLink for UartLink {
        fn capabilities(&self) -> &[Capability] {
            &[Capability::SerialRead, Capability::SerialWrite]
        }

        async fn read(
            &self,
            max_bytes: usize,
            timeout: Duration,
        ) -> crate::error::Result<Option<Bytes>> {
            let port = self.port.clone();
            tokio::task::spawn_blocking(move || {
                let mut guard = port.lock().expect("serial lock poisoned");
                guard
                    .set_timeout(timeout)
                    .map_err(|e| CoreError::Serial(e.to_string()))?;
                let mut buf = vec![0u8; max_bytes];
                match guard.read(&mut buf) {
                    Ok(0) => Ok(None),
                    Ok(n) => {
                        buf.truncate(n);
                        Ok(Some(Bytes::from(buf)))
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
                    Err(e) => Err(CoreError::Serial(e.to_string())),
                }
            })
            .await
            .map_err(|e| CoreError::Serial(format!("serial read task failed: {}", e)))?
        }

        async fn write(&self, data: &[u8]) -> crate::error::Result<()> {
            let port = self.port.clone();
            let data = data.to_vec();
            tokio::task::spawn_blocking(move || {
                let mut guard = port.lock().expect("serial lock poisoned");
                guard
                    .write_all(&data)
                    .map_err(|e| CoreError::Serial(e.to_string()))
            })
            .await
            .map_err(|e| CoreError::Serial(format!("serial write task failed: {}", e)))?
        }
    }
}
