//! The length-prefixed frame that crosses the wire.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::TransportError;

/// Size of the fixed frame header: `type: u32` then `length: u32`.
pub const FRAME_HEADER_LEN: usize = 8;

/// Default cap on a single frame body (16 MiB).
pub const DEFAULT_MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

/// One message on the wire: a numeric type and an opaque body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: u32,
    pub body: Vec<u8>,
}

impl Frame {
    /// Creates a frame from a type code and body bytes.
    pub fn new(kind: u32, body: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            body: body.into(),
        }
    }

    /// Serializes header and body into one contiguous buffer.
    pub fn encode(&self) -> Result<Vec<u8>, TransportError> {
        let len = u32::try_from(self.body.len()).map_err(|_| {
            TransportError::FrameTooLarge {
                len: self.body.len() as u64,
                max: u32::MAX,
            }
        })?;
        let mut buf = Vec::with_capacity(FRAME_HEADER_LEN + self.body.len());
        buf.extend_from_slice(&self.kind.to_be_bytes());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(&self.body);
        Ok(buf)
    }

    /// Splits a raw header into `(kind, length)`.
    pub fn decode_header(header: [u8; FRAME_HEADER_LEN]) -> (u32, u32) {
        let kind = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        (kind, len)
    }

    /// Reads exactly one frame.
    ///
    /// Returns `Ok(None)` if the stream ends before any header byte
    /// arrives. An end of stream after a partial header or body is
    /// reported as [`TransportError::ConnectionClosed`].
    pub async fn read_from<R>(
        reader: &mut R,
        max_len: u32,
    ) -> Result<Option<Frame>, TransportError>
    where
        R: AsyncRead + Unpin,
    {
        let mut header = [0u8; FRAME_HEADER_LEN];
        let mut filled = 0;
        while filled < FRAME_HEADER_LEN {
            let n = reader
                .read(&mut header[filled..])
                .await
                .map_err(TransportError::ReceiveFailed)?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(TransportError::ConnectionClosed(
                    "end of stream inside frame header".into(),
                ));
            }
            filled += n;
        }

        let (kind, len) = Self::decode_header(header);
        if len > max_len {
            return Err(TransportError::FrameTooLarge {
                len: u64::from(len),
                max: max_len,
            });
        }

        let mut body = vec![0u8; len as usize];
        reader.read_exact(&mut body).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                TransportError::ConnectionClosed("end of stream inside frame body".into())
            } else {
                TransportError::ReceiveFailed(e)
            }
        })?;

        Ok(Some(Frame { kind, body }))
    }

    /// Writes header and body with a single `write_all`.
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<(), TransportError>
    where
        W: AsyncWrite + Unpin,
    {
        let bytes = self.encode()?;
        writer
            .write_all(&bytes)
            .await
            .map_err(TransportError::SendFailed)
    }
}
