//! Panelfeed Stream Engine
//!
//! Pushes panel frames to the device in real time:
//! - [`transport`]: chunked raw-byte writes to a serial port, file or FIFO
//! - [`feed`]: where frames come from (a playing source or a `.bin` dump)
//! - [`session`]: the self-pacing stream loop and its `Idle`/`Streaming`
//!   state machine

pub mod feed;
pub mod session;
pub mod transport;

pub use feed::{DumpFeed, FrameFeed, LiveFeed};
pub use session::{LiveStreamer, StreamEnd, StreamReport, StreamSettings, StreamState};
pub use transport::{
    list_ports, open_file, open_serial, write_frame, ChunkPolicy, PortInfo, SerialTransport,
    Transport, WriterTransport,
};
