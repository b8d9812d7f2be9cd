//! Validity bitmaps, offsets/counts conversion, delta encoding, and the LZ4 block frame.
//!
//! The LZ4 framing generalizes the teacher crate's own chunked compression convention
//! (4-byte little-endian length headers per 64 KiB chunk) into a single self-describing
//! blob: an 8-byte total-uncompressed-length prefix lets [`lz4::decompress`] recover the
//! original buffer without any externally supplied length, as required by this codec's
//! `decompress(blob) -> bytes` contract.

use crate::error::CompressionError;

/// How the bits of a validity buffer should be produced by [`make_validity`].
pub enum ValidityMode<'a> {
    AllValid,
    AllInvalid,
    FromBits(&'a [u8]),
}

fn byte_len(length: usize) -> usize {
    length.div_ceil(8)
}

fn clear_trailing_bits(buf: &mut [u8], length: usize) {
    let used_bits = length % 8;
    if used_bits == 0 {
        return;
    }
    if let Some(last) = buf.last_mut() {
        *last &= (1u8 << used_bits) - 1;
    }
}

fn trailing_bits_are_zero(buf: &[u8], length: usize) -> bool {
    let used_bits = length % 8;
    if used_bits == 0 {
        return true;
    }
    match buf.last() {
        Some(&last) => last & !((1u8 << used_bits) - 1) == 0,
        None => true,
    }
}

/// Builds a validity bitmap of `length` positions, bit *i* set iff position *i* is present.
///
/// `mode = FromBits` asserts that the caller's buffer already has its trailing bits
/// zeroed, per the wire contract (§4.1).
pub fn make_validity(length: usize, mode: ValidityMode<'_>) -> Vec<u8> {
    let bytes = byte_len(length);
    match mode {
        ValidityMode::AllValid => {
            let mut buf = vec![0xFFu8; bytes];
            clear_trailing_bits(&mut buf, length);
            buf
        }
        ValidityMode::AllInvalid => vec![0u8; bytes],
        ValidityMode::FromBits(bits) => {
            debug_assert_eq!(bits.len(), bytes, "validity buffer has the wrong byte length");
            debug_assert!(
                trailing_bits_are_zero(bits, length),
                "validity buffer has set bits past the declared length"
            );
            bits.to_vec()
        }
    }
}

/// Returns whether position `index` is marked present in a validity bitmap.
pub fn bit_is_set(bits: &[u8], index: usize) -> bool {
    (bits[index / 8] >> (index % 8)) & 1 == 1
}

/// Packs booleans into a byte buffer, LSB-first within each byte.
pub fn pack_bits(bools: &[bool]) -> Vec<u8> {
    let mut buf = vec![0u8; byte_len(bools.len())];
    for (i, &b) in bools.iter().enumerate() {
        if b {
            buf[i / 8] |= 1 << (i % 8);
        }
    }
    buf
}

/// Unpacks the first `length` bits of `bytes`, LSB-first within each byte.
pub fn unpack_bits(bytes: &[u8], length: usize) -> Vec<bool> {
    (0..length).map(|i| bit_is_set(bytes, i)).collect()
}

/// Converts a cumulative offsets sequence into first differences, prepending `offsets[0]`.
pub fn counts_from_offsets(offsets: &[i32]) -> Vec<i32> {
    let mut counts = Vec::with_capacity(offsets.len());
    for (i, &o) in offsets.iter().enumerate() {
        counts.push(if i == 0 { o } else { o - offsets[i - 1] });
    }
    counts
}

/// Inverse of [`counts_from_offsets`]: a running cumulative sum of `counts`.
pub fn offsets_from_counts(counts: &[i32]) -> Vec<i32> {
    let mut acc = 0i32;
    counts
        .iter()
        .map(|&c| {
            acc = acc.wrapping_add(c);
            acc
        })
        .collect()
}

/// Integer types that support the wrapping delta encode/cumsum decode pipeline.
pub trait DeltaInt: Copy + Default {
    fn wrapping_sub(self, other: Self) -> Self;
    fn wrapping_add(self, other: Self) -> Self;
}

macro_rules! impl_delta_int {
    ($($t:ty),*) => {
        $(
            impl DeltaInt for $t {
                fn wrapping_sub(self, other: Self) -> Self {
                    <$t>::wrapping_sub(self, other)
                }
                fn wrapping_add(self, other: Self) -> Self {
                    <$t>::wrapping_add(self, other)
                }
            }
        )*
    };
}

impl_delta_int!(i8, i16, i32, i64);

/// Prepends a zero, then computes consecutive differences. Self-inverse with [`delta_decode`]
/// under modular arithmetic; overflow intentionally wraps (§9 Design Notes).
pub fn delta_encode<T: DeltaInt>(seq: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(seq.len());
    let mut prev = T::default();
    for &v in seq {
        out.push(v.wrapping_sub(prev));
        prev = v;
    }
    out
}

/// Cumulative sum under wrapping arithmetic; inverse of [`delta_encode`].
pub fn delta_decode<T: DeltaInt>(seq: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(seq.len());
    let mut acc = T::default();
    for &d in seq {
        acc = acc.wrapping_add(d);
        out.push(acc);
    }
    out
}

/// The LZ4 block frame: a self-describing compressed blob.
pub mod lz4 {
    use super::CompressionError;
    use lz4_flex::block::{compress_into, decompress, get_maximum_output_size};

    const CHUNK_SIZE: usize = 64 * 1024;
    const HEADER_LEN: usize = 8;

    /// Compresses `data` into an opaque, self-describing blob.
    ///
    /// `level` is accepted for API/wire compatibility with the spec's
    /// `compress(bytes, level)` contract; `lz4_flex` (the one compression backend this
    /// codec depends on) does not expose a distinct high-compression mode, so every
    /// level currently produces the same bytes as level 0. See DESIGN.md.
    pub fn compress(data: &[u8], level: u32) -> Vec<u8> {
        if level > 0 {
            tracing::trace!(level, "lz4 compression levels above 0 are not distinguished by this backend");
        }

        let mut output = Vec::with_capacity(HEADER_LEN + data.len() / 2 + 64);
        output.extend_from_slice(&(data.len() as u64).to_le_bytes());

        let mut temp = vec![0u8; get_maximum_output_size(CHUNK_SIZE)];
        let mut offset = 0;
        while offset < data.len() {
            let end = usize::min(offset + CHUNK_SIZE, data.len());
            let chunk = &data[offset..end];

            let compressed_size =
                compress_into(chunk, &mut temp).expect("a bounded 64 KiB chunk always fits the scratch buffer");

            output.extend_from_slice(&(compressed_size as u32).to_le_bytes());
            output.extend_from_slice(&temp[..compressed_size]);

            offset = end;
        }

        output
    }

    /// Decompresses a blob produced by [`compress`], recovering the exact original bytes.
    pub fn decompress_blob(blob: &[u8]) -> Result<Vec<u8>, CompressionError> {
        if blob.len() < HEADER_LEN {
            return Err(CompressionError::Truncated {
                expected: HEADER_LEN,
                found: blob.len(),
            });
        }

        let total_len = u64::from_le_bytes(blob[0..HEADER_LEN].try_into().unwrap()) as usize;
        let mut out = Vec::with_capacity(total_len);
        let mut offset = HEADER_LEN;
        let mut remaining = total_len;

        while offset < blob.len() {
            if blob.len() < offset + 4 {
                return Err(CompressionError::Truncated {
                    expected: offset + 4,
                    found: blob.len(),
                });
            }
            let chunk_len = u32::from_le_bytes(blob[offset..offset + 4].try_into().unwrap()) as usize;
            offset += 4;

            if blob.len() < offset + chunk_len {
                return Err(CompressionError::Truncated {
                    expected: offset + chunk_len,
                    found: blob.len(),
                });
            }
            let chunk = &blob[offset..offset + chunk_len];
            let expected_uncompressed = usize::min(remaining, CHUNK_SIZE);

            let decompressed = decompress(chunk, expected_uncompressed)
                .map_err(|e| CompressionError::Corrupt(e.to_string()))?;

            remaining = remaining.saturating_sub(decompressed.len());
            out.extend_from_slice(&decompressed);
            offset += chunk_len;
        }

        if out.len() != total_len {
            return Err(CompressionError::Truncated {
                expected: total_len,
                found: out.len(),
            });
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_validity_all_valid_zeroes_trailing_bits() {
        let v = make_validity(5, ValidityMode::AllValid);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0], 0b0001_1111);
    }

    #[test]
    fn make_validity_all_invalid_is_zero() {
        let v = make_validity(13, ValidityMode::AllInvalid);
        assert_eq!(v, vec![0u8, 0u8]);
    }

    #[test]
    fn make_validity_empty_is_empty() {
        assert!(make_validity(0, ValidityMode::AllValid).is_empty());
        assert!(make_validity(0, ValidityMode::AllInvalid).is_empty());
    }

    #[test]
    fn pack_unpack_roundtrip() {
        let bools = vec![true, false, true, true, false, false, false, true, true];
        let packed = pack_bits(&bools);
        assert_eq!(packed.len(), 2);
        let unpacked = unpack_bits(&packed, bools.len());
        assert_eq!(unpacked, bools);
    }

    #[test]
    fn bit_is_set_lsb_first() {
        // 0b0000_0101 -> bit 0 and bit 2 set
        let bits = [0b0000_0101u8];
        assert!(bit_is_set(&bits, 0));
        assert!(!bit_is_set(&bits, 1));
        assert!(bit_is_set(&bits, 2));
    }

    #[test]
    fn counts_and_offsets_roundtrip() {
        let offsets = vec![0, 0, 2, 2, 3];
        let counts = counts_from_offsets(&offsets);
        assert_eq!(counts, vec![0, 0, 2, 0, 1]);
        assert_eq!(offsets_from_counts(&counts), offsets);
    }

    #[test]
    fn delta_roundtrip_dates() {
        let dates: Vec<i32> = vec![10, 11, 13, 13, 20];
        let deltas = delta_encode(&dates);
        assert_eq!(deltas, vec![10, 1, 2, 0, 7]);
        assert_eq!(delta_decode(&deltas), dates);
    }

    #[test]
    fn delta_wraps_on_overflow() {
        let seq: Vec<i8> = vec![i8::MAX, i8::MIN];
        let deltas = delta_encode(&seq);
        assert_eq!(delta_decode(&deltas), seq);
    }

    #[test]
    fn lz4_roundtrip_empty() {
        let data: Vec<u8> = Vec::new();
        let blob = lz4::compress(&data, 0);
        assert_eq!(lz4::decompress_blob(&blob).unwrap(), data);
    }

    #[test]
    fn lz4_roundtrip_small() {
        let data = b"the quick brown fox jumps over the lazy dog".to_vec();
        let blob = lz4::compress(&data, 0);
        assert_eq!(lz4::decompress_blob(&blob).unwrap(), data);
    }

    #[test]
    fn lz4_roundtrip_multi_chunk() {
        let data = vec![0xABu8; 200 * 1024 + 37];
        let blob = lz4::compress(&data, 3);
        assert_eq!(lz4::decompress_blob(&blob).unwrap(), data);
    }

    #[test]
    fn lz4_decompress_rejects_truncated_header() {
        let err = lz4::decompress_blob(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, CompressionError::Truncated { .. }));
    }
}
