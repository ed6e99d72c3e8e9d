//! Snowflake ID codec.
//!
//! The remote store issues sortable 64-bit IDs whose high 42 bits hold the
//! milliseconds elapsed since [`STORE_EPOCH_MS`]. The low 22 bits carry
//! worker/process/sequence fields; IDs minted here always leave them zero,
//! which makes an encoded instant the smallest possible ID for that
//! millisecond and therefore a valid pagination cursor.
//!
//! ```text
//!  63                                    22 21                 0
//! ┌──────────────────────────────────────┬────────────────────┐
//! │  ms since 2015-01-01T00:00:00Z (42)  │ intra-ms bits (22) │
//! └──────────────────────────────────────┴────────────────────┘
//! ```

use chrono::{DateTime, TimeZone, Utc};

use crate::error::CodecError;

/// 2015-01-01T00:00:00.000Z in Unix milliseconds.
pub const STORE_EPOCH_MS: i64 = 1_420_070_400_000;

/// Bits reserved below the timestamp.
pub const TIMESTAMP_SHIFT: u32 = 22;

const MAX_TIMESTAMP_OFFSET: i64 = (1 << 42) - 1;

/// Encode an instant as the lowest snowflake ID minted in its millisecond.
pub fn to_id(ts: DateTime<Utc>) -> Result<u64, CodecError> {
    let ms = ts.timestamp_millis();
    let offset = ms
        .checked_sub(STORE_EPOCH_MS)
        .ok_or(CodecError::InvalidTimestamp(ms))?;
    if !(0..=MAX_TIMESTAMP_OFFSET).contains(&offset) {
        return Err(CodecError::InvalidTimestamp(ms));
    }
    Ok((offset as u64) << TIMESTAMP_SHIFT)
}

/// Same as [`to_id`], rendered as the decimal string the wire uses.
pub fn to_id_string(ts: DateTime<Utc>) -> Result<String, CodecError> {
    to_id(ts).map(|id| id.to_string())
}

/// Recover the creation instant embedded in an ID.
pub fn from_id(id: u64) -> Result<DateTime<Utc>, CodecError> {
    let ms = (id >> TIMESTAMP_SHIFT) as i64 + STORE_EPOCH_MS;
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or(CodecError::InvalidTimestamp(ms))
}

/// Parse a decimal ID string and decode its instant.
pub fn from_id_str(id: &str) -> Result<DateTime<Utc>, CodecError> {
    let value: u64 = id
        .trim()
        .parse()
        .map_err(|_| CodecError::InvalidId(id.to_string()))?;
    from_id(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn test_epoch_encodes_to_zero() {
        assert_eq!(to_id(at(STORE_EPOCH_MS)).unwrap(), 0);
    }

    #[test]
    fn test_known_id_decodes() {
        // 175928847299117063 -> 2016-04-30T11:18:25.796Z
        let ts = from_id(175_928_847_299_117_063).unwrap();
        assert_eq!(ts.timestamp_millis(), 1_462_015_105_796);
    }

    #[test]
    fn test_round_trip_preserves_millisecond() {
        for ms in [
            STORE_EPOCH_MS,
            STORE_EPOCH_MS + 1,
            1_704_862_800_000,
            1_717_246_800_123,
            STORE_EPOCH_MS + MAX_TIMESTAMP_OFFSET,
        ] {
            let id = to_id(at(ms)).unwrap();
            assert_eq!(from_id(id).unwrap().timestamp_millis(), ms);
        }
    }

    #[test]
    fn test_encoded_ids_sort_like_timestamps() {
        let a = to_id(at(1_704_862_800_000)).unwrap();
        let b = to_id(at(1_704_862_800_001)).unwrap();
        assert!(a < b);
        assert_eq!(b - a, 1 << TIMESTAMP_SHIFT);
    }

    #[test]
    fn test_pre_epoch_is_rejected() {
        assert_eq!(
            to_id(at(STORE_EPOCH_MS - 1)),
            Err(CodecError::InvalidTimestamp(STORE_EPOCH_MS - 1))
        );
    }

    #[test]
    fn test_overflow_is_rejected() {
        let ms = STORE_EPOCH_MS + MAX_TIMESTAMP_OFFSET + 1;
        assert!(to_id(at(ms)).is_err());
    }

    #[test]
    fn test_bad_id_string() {
        assert!(matches!(from_id_str("abc"), Err(CodecError::InvalidId(_))));
        assert_eq!(
            to_id_string(at(STORE_EPOCH_MS + 1)).unwrap(),
            (1u64 << TIMESTAMP_SHIFT).to_string()
        );
    }
}
