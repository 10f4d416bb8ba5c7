//! CBOR encoding of push-sync messages over framed streams.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{PushSyncError, Result};
use crate::transport::Stream;

/// Encode a message to CBOR.
pub fn encode<T: Serialize>(message: &T) -> Result<Bytes> {
    let mut buf = Vec::new();
    ciborium::into_writer(message, &mut buf).map_err(|e| PushSyncError::Codec(e.to_string()))?;
    Ok(Bytes::from(buf))
}

/// Decode a message from CBOR.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes).map_err(|e| PushSyncError::Codec(e.to_string()))
}

/// Write one message as a single frame.
pub async fn write_message<T: Serialize>(stream: &mut dyn Stream, message: &T) -> Result<()> {
    let frame = encode(message)?;
    stream.write_frame(frame).await?;
    Ok(())
}

/// Read one message from a single frame.
///
/// Returns `None` if the peer closed the stream before sending anything.
pub async fn read_message<T: DeserializeOwned>(stream: &mut dyn Stream) -> Result<Option<T>> {
    match stream.read_frame().await? {
        Some(frame) => decode(&frame).map(Some),
        None => Ok(None),
    }
}
