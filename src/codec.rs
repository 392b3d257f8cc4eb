//! Encoding between float vectors and the opaque blobs that cross the
//! host engine boundary.
//!
//! The wire format is the obvious one: `dimension` IEEE-754 single-precision
//! values, little-endian, back to back. Blobs bound by a caller and blobs
//! handed back from a column fetch are byte-for-byte this format.

use crate::error::VectorError;

/// Size in bytes of one vector element.
pub const ELEMENT_SIZE: usize = size_of::<f32>();

/// Byte length of an encoded vector of the given dimension.
pub fn byte_len(dimension: usize) -> usize {
    dimension * ELEMENT_SIZE
}

/// Encodes a vector into its blob representation.
///
/// Fails with [`VectorError::DimensionMismatch`] if the element count does
/// not equal `dimension`.
pub fn encode(vector: &[f32], dimension: usize) -> Result<Vec<u8>, VectorError> {
    if vector.len() != dimension {
        return Err(VectorError::DimensionMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }
    let mut buf = Vec::with_capacity(byte_len(dimension));
    for v in vector {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    Ok(buf)
}

/// Decodes a blob back into a vector of `dimension` elements.
///
/// Fails with [`VectorError::MalformedBuffer`] if the byte length does not
/// equal `dimension × 4`.
pub fn decode(buffer: &[u8], dimension: usize) -> Result<Vec<f32>, VectorError> {
    if buffer.len() != byte_len(dimension) {
        return Err(VectorError::MalformedBuffer {
            expected: byte_len(dimension),
            actual: buffer.len(),
        });
    }
    let mut out = Vec::with_capacity(dimension);
    for chunk in buffer.chunks_exact(ELEMENT_SIZE) {
        out.push(f32::from_le_bytes(chunk.try_into().unwrap()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let vector = [0.1f32, -2.5, 3.75, 0.0];
        let buf = encode(&vector, 4).unwrap();
        assert_eq!(buf.len(), 16);
        let decoded = decode(&buf, 4).unwrap();
        assert_eq!(decoded, vector);
    }

    #[test]
    fn encode_rejects_wrong_element_count() {
        let err = encode(&[1.0, 2.0, 3.0], 4).unwrap_err();
        assert_eq!(err, VectorError::DimensionMismatch { expected: 4, actual: 3 });
    }

    #[test]
    fn decode_rejects_wrong_byte_length() {
        // 12 bytes is three floats, not four.
        let err = decode(&[0u8; 12], 4).unwrap_err();
        assert_eq!(err, VectorError::MalformedBuffer { expected: 16, actual: 12 });
    }

    #[test]
    fn zero_dimension_round_trips_empty() {
        let buf = encode(&[], 0).unwrap();
        assert!(buf.is_empty());
        assert!(decode(&buf, 0).unwrap().is_empty());
    }
}
