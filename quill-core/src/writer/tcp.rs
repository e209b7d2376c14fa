//! Length-prefixed batch transport over TCP.
//!
//! Frame layout, all integers little endian:
//!
//! ```text
//! u32 body_len | u16 topic_len | topic | u32 count | (u32 len | payload) * count
//! ```
//!
//! `body_len` covers everything after itself.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{debug, warn};

use super::{BatchSink, WriterError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

pub struct TcpBatchSink {
    address: String,
    stream: Option<TcpStream>,
    frame: BytesMut,
}

impl TcpBatchSink {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            stream: None,
            frame: BytesMut::new(),
        }
    }

    fn stream(&mut self) -> Result<&mut TcpStream, WriterError> {
        if self.stream.is_none() {
            let stream = connect(&self.address).map_err(|e| {
                WriterError::Sink(format!("connect to {} failed: {e}", self.address))
            })?;
            stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
            stream.set_nodelay(true)?;
            debug!(address = %self.address, "batch sink connected");
            self.stream = Some(stream);
        }
        self.stream.as_mut().ok_or(WriterError::NotReady)
    }

    fn encode(&mut self, topic: &str, payloads: &[Bytes]) -> Result<(), WriterError> {
        let topic_len = u16::try_from(topic.len())
            .map_err(|_| WriterError::Sink(format!("topic too long: {} bytes", topic.len())))?;
        let count = u32::try_from(payloads.len())
            .map_err(|_| WriterError::Sink("too many payloads in one batch".into()))?;

        let body_len = 2 + topic.len() + 4 + payloads.iter().map(|p| 4 + p.len()).sum::<usize>();
        if body_len > MAX_FRAME_LEN {
            return Err(WriterError::Sink(format!(
                "batch of {body_len} bytes exceeds frame limit"
            )));
        }

        self.frame.clear();
        self.frame.reserve(4 + body_len);
        self.frame.put_u32_le(body_len as u32);
        self.frame.put_u16_le(topic_len);
        self.frame.put_slice(topic.as_bytes());
        self.frame.put_u32_le(count);
        for payload in payloads {
            self.frame.put_u32_le(payload.len() as u32);
            self.frame.put_slice(payload);
        }
        Ok(())
    }
}

/// Try every resolved address in turn, each bounded by [`CONNECT_TIMEOUT`].
fn connect(address: &str) -> io::Result<TcpStream> {
    let mut last = None;
    for addr in address.to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(stream) => return Ok(stream),
            Err(e) => last = Some(e),
        }
    }
    Err(last.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "address resolved to nothing")
    }))
}

impl BatchSink for TcpBatchSink {
    fn connect(&mut self) -> Result<(), WriterError> {
        self.stream().map(|_| ())
    }

    fn send(&mut self, topic: &str, payloads: &[Bytes]) -> Result<(), WriterError> {
        self.encode(topic, payloads)?;
        let frame = self.frame.split().freeze();
        let stream = self.stream()?;
        let result = stream.write_all(&frame).and_then(|()| stream.flush());
        if let Err(e) = result {
            // Reconnect on the next batch.
            warn!(address = %self.address, error = %e, "dropping broken batch connection");
            self.stream = None;
            return Err(e.into());
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), WriterError> {
        if let Some(stream) = self.stream.take() {
            stream.shutdown(std::net::Shutdown::Both).or_else(|e| match e.kind() {
                io::ErrorKind::NotConnected => Ok(()),
                _ => Err(e),
            })?;
        }
        Ok(())
    }
}

/// One decoded batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub topic: String,
    pub payloads: Vec<Bytes>,
}

/// Read the next frame, or `None` on a clean end of stream.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Option<Frame>> {
    let mut len = [0u8; 4];
    // End of stream is clean only before the first byte of a frame.
    loop {
        match reader.read(&mut len[..1]) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    reader.read_exact(&mut len[1..])?;

    let body_len = u32::from_le_bytes(len) as usize;
    if body_len > MAX_FRAME_LEN {
        return Err(invalid(format!("frame of {body_len} bytes exceeds limit")));
    }
    let mut body = vec![0u8; body_len];
    reader.read_exact(&mut body)?;

    let mut body = Bytes::from(body);
    let topic_len = take_u16(&mut body)? as usize;
    let topic = take(&mut body, topic_len)?;
    let topic = String::from_utf8(topic.to_vec()).map_err(|e| invalid(e.to_string()))?;

    let count = take_u32(&mut body)? as usize;
    let mut payloads = Vec::with_capacity(count.min(body.len() / 4));
    for _ in 0..count {
        let len = take_u32(&mut body)? as usize;
        payloads.push(take(&mut body, len)?);
    }
    if body.has_remaining() {
        return Err(invalid(format!("{} trailing bytes in frame", body.remaining())));
    }

    Ok(Some(Frame { topic, payloads }))
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn take(body: &mut Bytes, len: usize) -> io::Result<Bytes> {
    if body.remaining() < len {
        return Err(invalid("truncated frame".into()));
    }
    Ok(body.split_to(len))
}

fn take_u16(body: &mut Bytes) -> io::Result<u16> {
    if body.remaining() < 2 {
        return Err(invalid("truncated frame".into()));
    }
    Ok(body.get_u16_le())
}

fn take_u32(body: &mut Bytes) -> io::Result<u32> {
    if body.remaining() < 4 {
        return Err(invalid("truncated frame".into()));
    }
    Ok(body.get_u32_le())
}
