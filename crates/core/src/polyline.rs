use serde::Serialize;
use thiserror::Error;

use crate::models::Coordinate;

const PRECISION: f64 = 1e5;
const ALPHABET_OFFSET: u8 = 63;
const CONTINUATION_BIT: u64 = 0x20;
const CHUNK_MASK: u64 = 0x1f;
// Seven 5-bit chunks cover every 32-bit value.
const MAX_SHIFT: u32 = 30;

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeError {
    #[error("encoded polyline ends mid-value at offset {offset}")]
    Truncated { offset: usize },
    #[error("byte 0x{byte:02x} at offset {offset} is outside the polyline alphabet")]
    InvalidByte { offset: usize, byte: u8 },
    #[error("value starting at offset {offset} does not fit in 32 bits")]
    Overflow { offset: usize },
    #[error("point ending at offset {offset} decodes to ({latitude}, {longitude}), outside valid range")]
    OutOfRange {
        offset: usize,
        latitude: f64,
        longitude: f64,
    },
}

/// Decodes an encoded polyline into coordinates, failing on any malformed input
/// rather than returning a truncated path.
pub fn decode_polyline(encoded: &str) -> Result<Vec<Coordinate>, DecodeError> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let mut offset = 0;
    let mut latitude = 0_i64;
    let mut longitude = 0_i64;

    while offset < bytes.len() {
        let (delta_lat, next) = decode_value(bytes, offset)?;
        let (delta_lng, next) = decode_value(bytes, next)?;
        latitude += delta_lat;
        longitude += delta_lng;

        let lat = latitude as f64 / PRECISION;
        let lng = longitude as f64 / PRECISION;
        let point = Coordinate::new(lat, lng).map_err(|_| DecodeError::OutOfRange {
            offset: next,
            latitude: lat,
            longitude: lng,
        })?;

        points.push(point);
        offset = next;
    }

    Ok(points)
}

fn decode_value(bytes: &[u8], start: usize) -> Result<(i64, usize), DecodeError> {
    let mut result = 0_u64;
    let mut shift = 0_u32;
    let mut index = start;

    loop {
        let byte = *bytes
            .get(index)
            .ok_or(DecodeError::Truncated { offset: index })?;
        if !(ALPHABET_OFFSET..=b'~').contains(&byte) {
            return Err(DecodeError::InvalidByte {
                offset: index,
                byte,
            });
        }
        if shift > MAX_SHIFT {
            return Err(DecodeError::Overflow { offset: start });
        }

        let chunk = u64::from(byte - ALPHABET_OFFSET);
        result |= (chunk & CHUNK_MASK) << shift;
        shift += 5;
        index += 1;

        if chunk < CONTINUATION_BIT {
            break;
        }
    }

    let value = if result & 1 == 1 {
        !(result >> 1) as i64
    } else {
        (result >> 1) as i64
    };

    Ok((value, index))
}
