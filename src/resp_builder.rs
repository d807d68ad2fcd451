use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hyper::{header, http::Result, HeaderMap, Method, Request, Response, StatusCode};

use crate::{
    body::{Body, FileStream, MultipartStream},
    error::RangeError,
    file::FileWithMeta,
    range::HttpRange,
};

const VALID_MTIME: Duration = Duration::from_secs(2);
const BOUNDARY: &str = "lanserve-byteranges-0123456789abcdef";
/// More parts than this, after merging, and `Range` is ignored.
const MAX_RANGES: usize = 32;

/// Builds the response for a resolved file from the request's conditional and range headers.
#[derive(Default, Debug, Clone)]
pub struct ResponseBuilder {
    // `Range` request header.
    range: Option<String>,
    // `If-Modified-Since` request header.
    if_modified_since: Option<SystemTime>,
    // `If-None-Match` disables the `If-Modified-Since` check.
    has_if_none_match: bool,
    // `If-Range` request header.
    if_range: Option<String>,

    is_head_method: bool,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn range_header(&mut self, value: Option<&header::HeaderValue>) -> &mut Self {
        self.range = value.and_then(|v| v.to_str().ok()).map(String::from);
        self
    }

    pub fn request<B>(&mut self, req: &Request<B>) -> &mut Self {
        self.request_headers(req.headers());
        self.is_head_method(req.method());
        self
    }

    pub fn request_headers(&mut self, headers: &HeaderMap) -> &mut Self {
        self.range_header(headers.get(header::RANGE));
        self.if_modified_since_header(headers.get(header::IF_MODIFIED_SINCE));
        self.if_range_header(headers.get(header::IF_RANGE));
        self.has_if_none_match = headers.contains_key(header::IF_NONE_MATCH);
        self
    }

    pub fn if_modified_since_header(&mut self, value: Option<&header::HeaderValue>) -> &mut Self {
        self.if_modified_since = value
            .and_then(|v| v.to_str().ok())
            .and_then(|v| httpdate::parse_http_date(v).ok());
        self
    }

    pub fn if_range_header(&mut self, value: Option<&header::HeaderValue>) -> &mut Self {
        self.if_range = value.and_then(|v| v.to_str().ok()).map(String::from);
        self
    }

    pub fn is_head_method(&mut self, method: &Method) -> &mut Self {
        self.is_head_method = method == Method::HEAD;
        self
    }

    fn unix_secs(time: SystemTime) -> Option<u64> {
        time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
    }

    fn not_modified(&self, modified: Option<SystemTime>) -> bool {
        if self.has_if_none_match {
            return false;
        }
        let mtime = modified.and_then(Self::unix_secs);
        match (mtime, self.if_modified_since.and_then(Self::unix_secs)) {
            (Some(mtime), Some(ims)) => mtime <= ims,
            _ => false,
        }
    }

    /// the range applies unless `If-Range` names an older version of the file.
    fn range_applies(&self, modified: Option<SystemTime>) -> bool {
        let if_range = match self.if_range {
            Some(ref if_range) => if_range,
            None => return true,
        };
        let if_range = httpdate::parse_http_date(if_range).ok().and_then(Self::unix_secs);
        match (modified.and_then(Self::unix_secs), if_range) {
            (Some(mtime), Some(if_range)) => mtime <= if_range,
            _ => false,
        }
    }

    /// Ranges to serve. `Ok(None)` means send the whole file.
    ///
    /// A malformed header and an oversized range set are both ignored. Only a well formed
    /// set with no satisfiable range is an error.
    fn ranges(
        &self,
        file_size: u64,
        modified: Option<SystemTime>,
    ) -> std::result::Result<Option<Vec<HttpRange>>, RangeError> {
        let header = match self.range {
            Some(ref header) if self.range_applies(modified) => header,
            _ => return Ok(None),
        };
        let ranges = match HttpRange::parse(header, file_size) {
            Ok(ranges) => HttpRange::coalesce(ranges),
            Err(RangeError::InvalidRange) => return Ok(None),
            Err(e) => return Err(e),
        };
        if ranges.is_empty() || ranges.len() > MAX_RANGES {
            return Ok(None);
        }
        Ok(Some(ranges))
    }

    pub fn build(&self, file: FileWithMeta) -> Result<Response<Body>> {
        let file_size = file.size;
        let content_type = mime_guess::from_path(&file.path)
            .first_or_octet_stream()
            .to_string();
        let mut resp_builder = Response::builder();
        let modified = file.modified.filter(|m| {
            m.duration_since(UNIX_EPOCH)
                .map_or(false, |d| d >= VALID_MTIME)
        });
        if self.not_modified(modified) {
            return resp_builder
                .status(StatusCode::NOT_MODIFIED)
                .body(Body::Empty);
        }
        if let Some(modified) = modified {
            let last_modified = httpdate::fmt_http_date(modified);
            resp_builder = resp_builder.header(header::LAST_MODIFIED, last_modified);
        }
        resp_builder = resp_builder.header(header::ACCEPT_RANGES, "bytes");
        if self.is_head_method {
            return resp_builder
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_LENGTH, file_size)
                .status(StatusCode::OK)
                .body(Body::Empty);
        }
        let mut ranges = match self.ranges(file_size, modified) {
            Ok(Some(ranges)) => ranges,
            Ok(None) => {
                let stream = FileStream::whole(file.into(), file_size);
                return resp_builder
                    .header(header::CONTENT_TYPE, content_type)
                    .header(header::CONTENT_LENGTH, file_size)
                    .status(StatusCode::OK)
                    .body(Body::File(stream));
            }
            Err(_) => {
                return resp_builder
                    .header(header::CONTENT_RANGE, format!("bytes */{file_size}"))
                    .status(StatusCode::RANGE_NOT_SATISFIABLE)
                    .body(Body::Empty);
            }
        };
        if ranges.len() == 1 {
            let range = ranges.remove(0);
            let stream = FileStream::range(file.into(), &range);
            return resp_builder
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_RANGE, range.content_range(file_size))
                .header(header::CONTENT_LENGTH, range.length)
                .status(StatusCode::PARTIAL_CONTENT)
                .body(Body::File(stream));
        }
        let stream = MultipartStream::new(file.into(), ranges, BOUNDARY, content_type, file_size);
        resp_builder
            .header(
                header::CONTENT_TYPE,
                format!("multipart/byteranges; boundary={BOUNDARY}"),
            )
            .header(header::CONTENT_LENGTH, stream.content_length())
            .status(StatusCode::PARTIAL_CONTENT)
            .body(Body::Multipart(stream))
    }
}
