//! Outbound byte transport to the panel controller.
//!
//! The wire format is raw RGB with no framing: the device counts bytes and
//! treats every 11520 of them as one frame. A frame is written as a
//! sequence of fixed-size chunks with a pause between them so slow USB
//! serial firmware can keep up.

use std::path::Path;
use std::time::Duration;

use panelfeed_common::{PanelfeedError, PanelfeedResult, SerialConfig};
use panelfeed_panel_model::CHUNK_SIZE;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialPortType, SerialStream};

/// A sink for chunked raw bytes.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Human-readable name (device path, file path).
    fn name(&self) -> &str;

    /// Write one chunk completely.
    async fn write_chunk(&mut self, chunk: &[u8]) -> PanelfeedResult<()>;

    /// Flush buffered bytes after a complete frame.
    async fn flush(&mut self) -> PanelfeedResult<()> {
        Ok(())
    }
}

/// Transport over any async writer.
pub struct WriterTransport<W> {
    name: String,
    writer: W,
}

impl<W> WriterTransport<W> {
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait::async_trait]
impl<W> Transport for WriterTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn write_chunk(&mut self, chunk: &[u8]) -> PanelfeedResult<()> {
        self.writer
            .write_all(chunk)
            .await
            .map_err(|e| PanelfeedError::transport_write(format!("{}: {e}", self.name)))
    }

    async fn flush(&mut self) -> PanelfeedResult<()> {
        self.writer
            .flush()
            .await
            .map_err(|e| PanelfeedError::transport_write(format!("{}: {e}", self.name)))
    }
}

/// A serial port to the panel controller.
pub type SerialTransport = WriterTransport<SerialStream>;

/// Open the configured serial port.
///
/// The controller may reset when the port opens; `settle_ms` waits before
/// returning so the first frame is not lost.
pub async fn open_serial(config: &SerialConfig) -> PanelfeedResult<SerialTransport> {
    let port = config
        .port
        .as_deref()
        .ok_or_else(|| PanelfeedError::transport_unavailable("no serial port configured"))?;

    let stream = tokio_serial::new(port, config.baud_rate)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| PanelfeedError::transport_unavailable(format!("{port}: {e}")))?;

    tracing::info!(port, baud_rate = config.baud_rate, "Opened serial port");

    if config.settle_ms > 0 {
        tokio::time::sleep(Duration::from_millis(config.settle_ms)).await;
    }

    Ok(WriterTransport::new(port, stream))
}

/// Open (create or truncate) a file or FIFO as the transport.
pub async fn open_file(path: &Path) -> PanelfeedResult<WriterTransport<tokio::fs::File>> {
    let file = tokio::fs::File::create(path)
        .await
        .map_err(|e| PanelfeedError::transport_unavailable(format!("{}: {e}", path.display())))?;
    tracing::info!(path = %path.display(), "Writing stream to file");
    Ok(WriterTransport::new(path.display().to_string(), file))
}

/// A serial port visible to the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub description: String,
}

/// Enumerate serial ports.
pub fn list_ports() -> PanelfeedResult<Vec<PortInfo>> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| PanelfeedError::transport_unavailable(e.to_string()))?;

    Ok(ports
        .into_iter()
        .map(|port| {
            let description = match port.port_type {
                SerialPortType::UsbPort(usb) => format!(
                    "USB {:04x}:{:04x} {}",
                    usb.vid,
                    usb.pid,
                    usb.product.unwrap_or_default()
                )
                .trim_end()
                .to_string(),
                SerialPortType::PciPort => "PCI".to_string(),
                SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                SerialPortType::Unknown => "unknown".to_string(),
            };
            PortInfo {
                name: port.port_name,
                description,
            }
        })
        .collect())
}

/// How a frame is split across transport writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPolicy {
    pub chunk_size: usize,

    /// Pause after every chunk. Zero still yields to the scheduler.
    pub chunk_delay: Duration,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            chunk_delay: Duration::from_millis(1),
        }
    }
}

impl ChunkPolicy {
    pub fn from_config(config: &SerialConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            chunk_delay: Duration::from_millis(config.chunk_delay_ms),
        }
    }
}

/// Write `bytes` as sequential chunks, pausing between chunks, then flush.
///
/// Chunks of one frame are written in order and complete before this
/// returns. The first failing write aborts the frame.
pub async fn write_frame(
    transport: &mut dyn Transport,
    bytes: &[u8],
    policy: &ChunkPolicy,
) -> PanelfeedResult<()> {
    for chunk in bytes.chunks(policy.chunk_size.max(1)) {
        transport.write_chunk(chunk).await?;
        if policy.chunk_delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(policy.chunk_delay).await;
        }
    }
    transport.flush().await
}
