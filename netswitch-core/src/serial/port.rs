use super::framing::{SerialLine, encode_snapshot};
use crate::traits::{KnownNetworkSet, SerialChannel};
use crate::{Error, Result};
use async_trait::async_trait;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const RX_BUF_MAX: usize = 16 * 1024;

/// Accumulates bytes from the read half until a full line is available.
struct LineReader {
    source: Box<dyn Read + Send>,
    pending: Vec<u8>,
}

impl LineReader {
    /// Returns `Ok(None)` when the port's read timeout elapses first.
    /// Bytes of an unfinished line are kept for the next call.
    fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = self.pending.drain(..=pos).collect();
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }
            if self.pending.len() >= RX_BUF_MAX {
                tracing::warn!("Serial line exceeded {} bytes without a newline, flushing", RX_BUF_MAX);
                let line = std::mem::take(&mut self.pending);
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }

            let mut buf = [0u8; 256];
            match self.source.read(&mut buf) {
                Ok(0) => return Err(Error::Transport("serial link closed".into())),
                Ok(n) => self.pending.extend_from_slice(&buf[..n]),
                Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                    return Ok(None);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Transport(format!("read failed: {}", e))),
            }
        }
    }
}

/// `SerialChannel` over a serial port.
///
/// The read half and the write half are separate handles to the same device.
/// Each sits behind its own mutex, so the reconciler's writes never wait on
/// the listener's blocking read.
pub struct SerialPortChannel {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    reader: Arc<Mutex<LineReader>>,
}

impl SerialPortChannel {
    /// Opens `path` and waits `settle` before returning: most boards reset
    /// when the port is opened and drop anything written during boot.
    pub async fn open(path: &str, baud_rate: u32, read_timeout: Duration, settle: Duration) -> Result<Self> {
        tracing::info!("Opening serial port {} @ {} baud", path, baud_rate);
        let port = serialport::new(path, baud_rate).timeout(read_timeout).open()?;
        let writer = port.try_clone()?;

        if !settle.is_zero() {
            tracing::debug!("Waiting {:?} for the device to settle", settle);
            tokio::time::sleep(settle).await;
        }

        Ok(Self::from_parts(port, writer))
    }

    /// Builds a channel from an arbitrary read half and write half.
    pub fn from_parts<R, W>(reader: R, writer: W) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
            reader: Arc::new(Mutex::new(LineReader {
                source: Box::new(reader),
                pending: Vec::with_capacity(1024),
            })),
        }
    }
}

#[async_trait]
impl SerialChannel for SerialPortChannel {
    async fn write_snapshot(&self, networks: &KnownNetworkSet) -> Result<()> {
        let payload = encode_snapshot(networks);
        let writer = self.writer.clone();
        tokio::task::spawn_blocking(move || {
            let mut port = writer
                .lock()
                .map_err(|_| Error::Transport("serial writer lock poisoned".into()))?;
            let to_transport = |e: io::Error| Error::Transport(format!("write failed: {}", e));
            port.write_all(payload.as_bytes()).map_err(to_transport)?;
            port.flush().map_err(to_transport)
        })
        .await
        .map_err(|e| Error::Transport(format!("write task failed: {}", e)))??;

        tracing::debug!("Sent {} networks to device", networks.len());
        Ok(())
    }

    async fn read_line(&self) -> Result<SerialLine> {
        let reader = self.reader.clone();
        let raw = tokio::task::spawn_blocking(move || {
            let mut reader = reader
                .lock()
                .map_err(|_| Error::Transport("serial reader lock poisoned".into()))?;
            reader.next_line()
        })
        .await
        .map_err(|e| Error::Transport(format!("read task failed: {}", e)))??;

        Ok(match raw {
            Some(line) => SerialLine::parse(&line),
            None => SerialLine::Empty,
        })
    }
}
