use axum_extra::headers::ContentRange;

/// A single satisfiable byte range, both bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    pub start: u64,
    pub end: u64,
    pub total_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    /// Bounds were not numeric. GET falls back to the full body.
    #[error("malformed range header: {0:?}")]
    Malformed(String),
    /// Well formed, but selects no byte of a resource of `size` bytes.
    #[error("range not satisfiable for {size} byte resource")]
    Unsatisfiable { size: u64 },
}

impl RangeSpec {
    /// Parses a `Range` header value of the form `bytes=<start>-<end>`
    /// against a resource of `total_size` bytes.
    ///
    /// Either bound may be omitted: a missing start means `0`, a missing
    /// end means the last byte of the resource. The end is clamped to the
    /// resource, so `bytes=30-99` on a 54 byte file selects `30-53`.
    /// Only the first range of a comma separated set is understood; a set
    /// is reported as [`RangeError::Malformed`].
    pub fn parse(header: &str, total_size: u64) -> Result<RangeSpec, RangeError> {
        let header = header.trim().to_lowercase();

        // everything after the last `=`, tolerating a missing unit
        let spec = header.rsplit('=').next().unwrap_or_default();

        let (raw_start, raw_end) = spec.split_once('-')
            .ok_or_else(|| RangeError::Malformed(header.clone()))?;

        let start = parse_bound(raw_start, &header)?.unwrap_or(0);
        let end = parse_bound(raw_end, &header)?;

        // a zero byte resource has no byte to select
        let Some(last) = total_size.checked_sub(1) else {
            return Err(RangeError::Unsatisfiable { size: total_size });
        };
        let end = end.unwrap_or(last).min(last);

        if start > end {
            return Err(RangeError::Unsatisfiable { size: total_size });
        }

        Ok(RangeSpec { start, end, total_size })
    }

    /// Number of bytes selected, `end - start + 1`.
    pub fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// One past `end`, the exclusive bound the streamer works with.
    pub fn end_exclusive(&self) -> u64 {
        self.end + 1
    }

    /// `Content-Range: bytes {start}-{end}/{total_size}`
    pub fn content_range(&self) -> ContentRange {
        ContentRange::bytes(self.start..self.end_exclusive(), self.total_size)
            .expect("start <= end < total_size is upheld by RangeSpec::parse")
    }
}

fn parse_bound(raw: &str, header: &str) -> Result<Option<u64>, RangeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u64>()
        .map(Some)
        .map_err(|_| RangeError::Malformed(header.to_string()))
}
