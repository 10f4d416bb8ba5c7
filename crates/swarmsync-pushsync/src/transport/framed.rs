//! Length-delimited framing over any async byte pipe.
//!
//! Each frame is a 4-byte big-endian length followed by that many bytes.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec, LengthDelimitedCodecError};

use super::{Stream, TransportError};

/// Largest frame accepted in either direction.
pub const MAX_FRAME_SIZE: usize = 16 * 1024;

/// A [`Stream`] over an async byte pipe.
pub struct FramedStream<T> {
    inner: Framed<T, LengthDelimitedCodec>,
    closed: bool,
}

impl<T> FramedStream<T>
where
    T: AsyncRead + AsyncWrite,
{
    pub fn new(inner: T) -> Self {
        let codec = LengthDelimitedCodec::builder()
            .length_field_length(4)
            .max_frame_length(MAX_FRAME_SIZE)
            .new_codec();
        Self {
            inner: Framed::new(inner, codec),
            closed: false,
        }
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

fn read_error(e: std::io::Error) -> TransportError {
    let too_large = e
        .get_ref()
        .is_some_and(|inner| inner.is::<LengthDelimitedCodecError>());
    if too_large {
        TransportError::FrameTooLarge {
            max: MAX_FRAME_SIZE,
        }
    } else {
        TransportError::Io(e)
    }
}

#[async_trait]
impl<T> Stream for FramedStream<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write_frame(&mut self, frame: Bytes) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if frame.len() > MAX_FRAME_SIZE {
            return Err(TransportError::FrameTooLarge {
                max: MAX_FRAME_SIZE,
            });
        }

        self.inner.send(frame).await?;
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Option<Bytes>, TransportError> {
        match self.inner.next().await {
            None => Ok(None),
            Some(Ok(frame)) => Ok(Some(frame.freeze())),
            Some(Err(e)) => Err(read_error(e)),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match SinkExt::<Bytes>::close(&mut self.inner).await {
            Ok(()) => Ok(()),
            // The peer already went away; nothing left to close.
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_frames_cross_a_duplex() {
        let (a, b) = tokio::io::duplex(1024);
        let mut a = FramedStream::new(a);
        let mut b = FramedStream::new(b);

        a.write_frame(Bytes::from_static(b"hello")).await.unwrap();
        a.write_frame(Bytes::new()).await.unwrap();

        assert_eq!(b.read_frame().await.unwrap(), Some(Bytes::from_static(b"hello")));
        assert_eq!(b.read_frame().await.unwrap(), Some(Bytes::new()));
    }

    #[tokio::test]
    async fn test_wire_layout_is_big_endian_length_prefix() {
        let (a, mut b) = tokio::io::duplex(1024);
        let mut a = FramedStream::new(a);

        a.write_frame(Bytes::from_static(b"abc")).await.unwrap();
        a.close().await.unwrap();

        let mut raw = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut b, &mut raw)
            .await
            .unwrap();
        assert_eq!(raw, [0, 0, 0, 3, b'a', b'b', b'c']);
    }

    #[tokio::test]
    async fn test_close_gives_clean_eof() {
        let (a, b) = tokio::io::duplex(1024);
        let mut a = FramedStream::new(a);
        let mut b = FramedStream::new(b);

        a.close().await.unwrap();
        a.close().await.unwrap();
        assert_eq!(b.read_frame().await.unwrap(), None);
        assert!(matches!(
            a.write_frame(Bytes::from_static(b"late")).await,
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_truncated_header_is_error() {
        let (mut a, b) = tokio::io::duplex(1024);
        let mut b = FramedStream::new(b);

        a.write_all(&[0, 0]).await.unwrap();
        drop(a);
        assert!(matches!(b.read_frame().await, Err(TransportError::Io(_))));
    }

    #[tokio::test]
    async fn test_oversized_frames_rejected() {
        let (a, b) = tokio::io::duplex(64 * 1024);
        let mut a = FramedStream::new(a);
        let mut b = FramedStream::new(b);

        let big = Bytes::from(vec![0u8; MAX_FRAME_SIZE + 1]);
        assert!(matches!(
            a.write_frame(big).await,
            Err(TransportError::FrameTooLarge { .. })
        ));

        let mut raw = a.into_inner();
        raw.write_u32((MAX_FRAME_SIZE + 1) as u32).await.unwrap();
        assert!(matches!(
            b.read_frame().await,
            Err(TransportError::FrameTooLarge { .. })
        ));
    }
}
