/*!
 * Wire Contract
 *
 * Frame layout: `[version: u8][bincode payload]`. The version byte is
 * checked before the payload is touched.
 */

use super::types::{IpcError, IpcResult};
use crate::core::limits::WIRE_PROTOCOL_VERSION;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};

/// Encode a message into a versioned frame
pub fn encode<T: Serialize>(message: &T) -> IpcResult<Bytes> {
    let size = bincode::serialized_size(message).map_err(|e| IpcError::Encode(e.to_string()))?;

    let mut frame = Vec::with_capacity(1 + size as usize);
    frame.push(WIRE_PROTOCOL_VERSION);
    bincode::serialize_into(&mut frame, message).map_err(|e| IpcError::Encode(e.to_string()))?;
    Ok(Bytes::from(frame))
}

/// Decode a versioned frame
pub fn decode<T: DeserializeOwned>(frame: &[u8]) -> IpcResult<T> {
    let (&version, payload) = frame
        .split_first()
        .ok_or_else(|| IpcError::Malformed("empty frame".into()))?;

    if version != WIRE_PROTOCOL_VERSION {
        return Err(IpcError::VersionMismatch {
            expected: WIRE_PROTOCOL_VERSION,
            got: version,
        });
    }

    bincode::deserialize(payload).map_err(|e| IpcError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::id::{Pid, SlotId};
    use crate::ipc::types::{Envelope, MessageKind, Reply};

    #[test]
    fn test_frame_starts_with_version() {
        let frame = encode(&Reply::Shutdown).unwrap();
        assert_eq!(frame[0], WIRE_PROTOCOL_VERSION);
    }

    #[test]
    fn test_envelope_survives_the_wire() {
        let envelope = Envelope::new(Pid(12), SlotId(3), MessageKind::Request { resource: 7 });
        let frame = encode(&envelope).unwrap();

        let decoded: Envelope = decode(&frame).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut frame = encode(&Reply::Shutdown).unwrap().to_vec();
        frame[0] = 9;

        assert_eq!(
            decode::<Reply>(&frame).unwrap_err(),
            IpcError::VersionMismatch {
                expected: WIRE_PROTOCOL_VERSION,
                got: 9
            }
        );
    }

    #[test]
    fn test_rejects_empty_and_truncated() {
        assert!(matches!(
            decode::<Reply>(&[]).unwrap_err(),
            IpcError::Malformed(_)
        ));

        let frame = encode(&Envelope::new(
            Pid(1),
            SlotId(0),
            MessageKind::Terminate { work_done_ns: 5 },
        ))
        .unwrap();
        assert!(matches!(
            decode::<Envelope>(&frame[..frame.len() - 3]).unwrap_err(),
            IpcError::Malformed(_)
        ));
    }
}
