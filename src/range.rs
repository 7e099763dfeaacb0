use crate::error::StreamError;

/// An inclusive window of byte offsets within a file.
///
/// Invariant: `start <= end < size` of the file it was validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes the range selects. Never zero for a validated range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Parse and validate a raw `Range` header value against the file size.
///
/// Only a single `bytes` range is supported. The unit prefix before the `=`
/// is not inspected further. `size` must be non-zero; zero-length files are
/// rejected before range handling begins.
///
/// Accepted specifier shapes:
///
/// * `start-end` — explicit inclusive window, `end` clamped to the file.
/// * `start-` — from `start` to the end of the file. A non-numeric end
///   is treated the same way.
/// * `-N` — suffix range, the last `N` bytes. `N` larger than the file
///   selects the whole file.
///
/// A comma anywhere in the specifier means the client asked for multiple
/// disjoint ranges, which we reject with 416 rather than answer partially.
pub fn parse_range(header: &str, size: u64) -> Result<ByteRange, StreamError> {
    debug_assert!(size > 0);

    // everything after the unit prefix, e.g. "200-499" in "bytes=200-499"
    let spec = match header.split_once('=') {
        Some((_unit, spec)) => spec.trim(),
        None => return Err(StreamError::RangeNotSatisfiable { size }),
    };

    if spec.contains(',') {
        return Err(StreamError::MultiRangeUnsupported { size });
    }

    let (start, end) = if let Some(suffix) = spec.strip_prefix('-') {
        // last N bytes; a suffix longer than the file selects all of it
        let n: u64 = suffix
            .parse()
            .map_err(|_| StreamError::RangeNotSatisfiable { size })?;
        (size.saturating_sub(n), size - 1)
    } else {
        // only the first two dash-separated tokens count; anything after a
        // second dash is ignored
        let mut parts = spec.splitn(3, '-');
        let start_part = parts.next().unwrap_or(spec);
        let end_part = parts.next().unwrap_or("");
        let start: u64 = start_part
            .parse()
            .map_err(|_| StreamError::RangeNotSatisfiable { size })?;
        // a missing or non-numeric end means "through end of file"; the
        // sentinel is one past the last index and is clamped just below
        let end: u64 = end_part.parse().unwrap_or(size);
        (start, end.min(size - 1))
    };

    if start > end || start > size - 1 || end >= size {
        return Err(StreamError::RangeNotSatisfiable { size });
    }

    Ok(ByteRange { start, end })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::{parse_range, ByteRange};
    use crate::error::StreamError;

    fn ok(start: u64, end: u64) -> Result<ByteRange, ()> {
        Ok(ByteRange { start, end })
    }

    #[test]
    fn accepts_single_byte_ranges() {
        let cases = [
            ("bytes=0-99", 500, ok(0, 99)),
            ("bytes=0-0", 500, ok(0, 0)),
            ("bytes=499-499", 500, ok(499, 499)),
            ("bytes=100-", 500, ok(100, 499)),
            ("bytes=0-", 500, ok(0, 499)),
            ("bytes=-100", 500, ok(400, 499)),
            ("bytes=-1", 500, ok(499, 499)),
            // suffix longer than the file clamps to the whole file
            ("bytes=-9999", 500, ok(0, 499)),
            // end beyond the file clamps to the last byte
            ("bytes=450-9999", 500, ok(450, 499)),
            // non-numeric end falls back to end-of-file
            ("bytes=10-abc", 500, ok(10, 499)),
            // tokens after a second dash are ignored, the second one wins
            ("bytes=0-10-20", 500, ok(0, 10)),
            ("bytes=1000-2000", 500, Err(())),
            ("bytes=500-", 500, Err(())),
            ("bytes=300-200", 500, Err(())),
            ("bytes=-0", 500, Err(())),
            ("bytes=abc-200", 500, Err(())),
            ("bytes=", 500, Err(())),
            ("garbage", 500, Err(())),
        ];

        for (header, size, expected) in cases {
            let result = parse_range(header, size).map_err(|_| ());
            assert_eq!(expected, result, "header {header:?} against size {size}");
        }
    }

    #[test]
    fn comma_means_multi_range() {
        assert_matches!(
            parse_range("bytes=0-199,300-399", 500),
            Err(StreamError::MultiRangeUnsupported { size: 500 })
        );
        // even when the individual parts would not have been satisfiable
        assert_matches!(
            parse_range("bytes=900-999,1000-1100", 500),
            Err(StreamError::MultiRangeUnsupported { size: 500 })
        );
    }

    #[test]
    fn out_of_bounds_is_unsatisfiable() {
        assert_matches!(
            parse_range("bytes=1000-2000", 500),
            Err(StreamError::RangeNotSatisfiable { size: 500 })
        );
    }

    #[test]
    fn range_length_is_inclusive() {
        let range = parse_range("bytes=200-499", 1000).unwrap();
        assert_eq!(300, range.len());
    }
}
