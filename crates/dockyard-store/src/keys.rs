//! Key encoding utilities for `RocksDB`.

use dockyard_core::EngineId;

/// Encode an engine config key (the engine ID bytes).
#[must_use]
pub fn engine_key(engine_id: &EngineId) -> Vec<u8> {
    engine_id.as_bytes().to_vec()
}

/// Encode an event key as a big-endian sequence number.
///
/// Big-endian keeps the byte order of keys equal to the numeric order, so a
/// forward scan of the events table yields events in arrival order.
#[must_use]
pub fn event_key(seq: u64) -> [u8; 8] {
    seq.to_be_bytes()
}

/// Decode an event key back into its sequence number.
///
/// Returns `None` if the key is not exactly 8 bytes.
#[must_use]
pub fn decode_event_key(key: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = key.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_key_roundtrip() {
        let key = event_key(42);
        assert_eq!(decode_event_key(&key), Some(42));
    }

    #[test]
    fn event_keys_sort_numerically() {
        let a = event_key(9);
        let b = event_key(10);
        let c = event_key(256);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn decode_rejects_wrong_length() {
        assert_eq!(decode_event_key(&[1, 2, 3]), None);
    }

    #[test]
    fn engine_key_is_id_bytes() {
        let id = EngineId::new("engine-a").unwrap();
        assert_eq!(engine_key(&id), b"engine-a".to_vec());
    }
}
