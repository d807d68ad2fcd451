use crate::error::RangeError;

const HEADER_PREFIX: &'static [u8] = b"bytes=";

/// One satisfiable byte range of a file, `start` inclusive.
#[derive(Debug, PartialEq, Clone)]
pub struct HttpRange {
    pub start: u64,
    pub length: u64,
}
type Result<T> = std::result::Result<T, RangeError>;

impl HttpRange {
    pub fn parse(header: &str, file_size: u64) -> Result<Vec<HttpRange>> {
        Self::parse_bytes(header.as_bytes(), file_size)
    }

    /// last byte position, inclusive.
    pub fn end(&self) -> u64 {
        self.start + self.length - 1
    }

    /// `Content-Range` value for this range.
    pub fn content_range(&self, file_size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end(), file_size)
    }

    /// Sort and merge overlapping or adjacent ranges.
    pub fn coalesce(mut ranges: Vec<HttpRange>) -> Vec<HttpRange> {
        ranges.sort_by_key(|r| r.start);
        let mut merged: Vec<HttpRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if range.start <= last.start + last.length => {
                    let end = (range.start + range.length).max(last.start + last.length);
                    last.length = end - last.start;
                }
                _ => merged.push(range),
            }
        }
        merged
    }

    fn parse_bytes(header: &[u8], file_size: u64) -> Result<Vec<HttpRange>> {
        if header.is_empty() {
            return Err(RangeError::InvalidRange);
        }
        if !header.starts_with(HEADER_PREFIX) {
            return Err(RangeError::InvalidRange);
        }
        let mut no_overlap = false;
        let ranges = header[HEADER_PREFIX.len()..]
            .split(|n| *n == b',')
            .filter_map(|srange| -> Option<Result<HttpRange>> {
                let srange = srange.trim();
                match Self::parse_single_range(srange, file_size) {
                    Ok(Some(o)) => Some(Ok(o)),
                    Ok(None) => {
                        no_overlap = true;
                        None
                    }
                    Err(e) => Some(Err(e)),
                }
            })
            .collect::<Result<Vec<HttpRange>>>()?;
        if no_overlap && ranges.is_empty() {
            return Err(RangeError::NoOverlap);
        }
        Ok(ranges)
    }

    fn parse_single_range(range: &[u8], file_size: u64) -> Result<Option<HttpRange>> {
        let mut split_range = range.splitn(2, |s| *s == b'-');
        let range_start = split_range.next().ok_or(RangeError::InvalidRange)?;
        let range_end = split_range.next().ok_or(RangeError::InvalidRange)?;
        if range_start.is_empty() {
            if range_end.is_empty() || range_end[0] == b'-' {
                return Err(RangeError::InvalidRange);
            }
            let mut length = range_end.to_u64().ok_or(RangeError::InvalidRange)?;
            if length > file_size {
                length = file_size;
            }
            if length == 0 {
                return Ok(None);
            }
            Ok(Some(HttpRange {
                start: file_size - length,
                length,
            }))
        } else {
            let start = range_start.to_u64().ok_or(RangeError::InvalidRange)?;
            if start >= file_size {
                return Ok(None);
            }
            let length = if range_end.is_empty() {
                file_size - start
            } else {
                let mut end = range_end.to_u64().ok_or(RangeError::InvalidRange)?;
                if start > end {
                    return Err(RangeError::InvalidRange);
                }
                if end >= file_size {
                    end = file_size - 1;
                }
                end - start + 1
            };
            Ok(Some(HttpRange { start, length }))
        }
    }
}

trait SliceEx {
    fn trim(&self) -> &Self;
    //parse the slice to u64 b"123" = 123
    fn to_u64(&self) -> Option<u64>;
}

impl SliceEx for [u8] {
    fn trim(&self) -> &Self {
        #[inline(always)]
        fn is_not_whitspace(b: &u8) -> bool {
            *b != b' ' && *b != b'\t'
        }

        match (
            self.iter().position(is_not_whitspace),
            self.iter().rposition(is_not_whitspace),
        ) {
            (Some(left), Some(right)) => &self[left..right + 1],
            _ => &[],
        }
    }

    fn to_u64(&self) -> Option<u64> {
        if self.is_empty() {
            return None;
        }
        let mut sum: u64 = 0;
        for v in self {
            if !v.is_ascii_digit() {
                return None;
            }
            sum = sum.checked_mul(10)?.checked_add((*v - b'0') as _)?;
        }
        Some(sum)
    }
}
