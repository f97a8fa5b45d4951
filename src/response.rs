//! Request and response descriptors exchanged with the hosting HTTP layer,
//! and the builder that turns a resolved resource into a response.

use mime_guess::from_path;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;

use crate::catalog::ResourceCatalog;
use crate::compression::{copy_encoded, determine_compression, CompressionType};
use crate::config::ServeOptions;
use crate::error::{EmbedError, Result};
use crate::fingerprint::{evaluate, CacheDecision, Fingerprint};
use crate::log_error;

pub const ACCEPT_ENCODING: &str = "Accept-Encoding";
pub const CONTENT_ENCODING: &str = "Content-Encoding";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const ETAG: &str = "ETag";
pub const LAST_MODIFIED: &str = "Last-Modified";

const NOT_FOUND_BODY: &[u8] = b"NOT FOUND";

/// Header names mapped to ordered values; names compare case-insensitively
/// and keep the spelling they were first inserted with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, Vec<String>)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Adds a value after any existing values for `name`.
    pub fn append(&mut self, name: &str, value: &str) {
        match self.position(name) {
            Some(i) => self.entries[i].1.push(value.to_string()),
            None => self
                .entries
                .push((name.to_string(), vec![value.to_string()])),
        }
    }

    /// Replaces every value for `name`.
    pub fn insert(&mut self, name: &str, value: &str) {
        match self.position(name) {
            Some(i) => self.entries[i].1 = vec![value.to_string()],
            None => self
                .entries
                .push((name.to_string(), vec![value.to_string()])),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name)
            .and_then(|i| self.entries[i].1.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.position(name)
            .map(|i| self.entries[i].1.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(n, values)| values.iter().map(move |v| (n.as_str(), v.as_str())))
    }

    /// Parses a raw `Name: value` header line.
    pub fn append_line(&mut self, line: &str) -> Result<()> {
        let parts: Vec<&str> = line.splitn(2, ':').collect();
        match parts.as_slice() {
            [name, value] if !name.trim().is_empty() => {
                self.append(name.trim(), value.trim());
                Ok(())
            }
            _ => Err(EmbedError::MalformedHeader(line.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: String,
    pub path: String,
    pub headers: HeaderMap,
}

impl RequestDescriptor {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new("GET", path)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn is_head(&self) -> bool {
        self.method.eq_ignore_ascii_case("HEAD")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotModified,
    NotFound,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NotModified => 304,
            Status::NotFound => 404,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NotModified => "Not Modified",
            Status::NotFound => "Not Found",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

/// Deferred body producer; runs at most once and may block on the sink.
pub type ContentWriter = Box<dyn FnOnce(&mut dyn Write) -> io::Result<()> + Send>;

pub struct ResponseDescriptor {
    pub status: Status,
    pub content_type: Option<String>,
    pub headers: HeaderMap,
    contents: ContentWriter,
}

impl fmt::Debug for ResponseDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseDescriptor")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl ResponseDescriptor {
    pub fn new(status: Status, content_type: Option<String>, contents: ContentWriter) -> Self {
        let mut headers = HeaderMap::new();
        if let Some(content_type) = &content_type {
            headers.insert(CONTENT_TYPE, content_type);
        }
        Self {
            status,
            content_type,
            headers,
            contents,
        }
    }

    pub fn not_found() -> Self {
        Self::new(
            Status::NotFound,
            Some("text/plain".to_string()),
            Box::new(|sink| sink.write_all(NOT_FOUND_BODY)),
        )
    }

    pub fn not_modified(fingerprint: &Fingerprint) -> Self {
        let mut response = Self::new(Status::NotModified, None, empty_body());
        response.insert_fingerprint(fingerprint);
        response
    }

    fn insert_fingerprint(&mut self, fingerprint: &Fingerprint) {
        self.headers.insert(ETAG, &fingerprint.etag);
        self.headers
            .insert(LAST_MODIFIED, &fingerprint.last_modified_header());
    }

    /// Streams the body into `sink`. Sink failures are returned unchanged.
    pub fn write_to(self, sink: &mut dyn Write) -> io::Result<()> {
        (self.contents)(sink)
    }

    /// Collects the body into memory.
    pub fn into_bytes(self) -> io::Result<Vec<u8>> {
        let mut body = Vec::new();
        self.write_to(&mut body)?;
        Ok(body)
    }
}

fn empty_body() -> ContentWriter {
    Box::new(|_| Ok(()))
}

/// Builds the response for a catalog entry the resolver has already found.
///
/// Resolution never fails: an entry that cannot be opened or read while
/// fingerprinting is answered with 404 and the read error is logged. Errors
/// while streaming the body surface from [`ResponseDescriptor::write_to`].
pub fn build_response(
    catalog: &Arc<dyn ResourceCatalog>,
    resource_name: &str,
    file_name: &str,
    request: &RequestDescriptor,
    options: &ServeOptions,
) -> ResponseDescriptor {
    let start_time = Instant::now();

    let Some(mut stream) = catalog.open(resource_name) else {
        log::debug!("Resource vanished from catalog: {}", resource_name);
        return ResponseDescriptor::not_found();
    };

    let last_modified = catalog
        .last_modified(resource_name)
        .unwrap_or_else(|| catalog.loaded_at());

    let fingerprint = match Fingerprint::compute(&mut stream, last_modified) {
        Ok(fp) => fp,
        Err(e) => {
            log_error!(e, format!("Failed to fingerprint {}", resource_name));
            return ResponseDescriptor::not_found();
        }
    };
    log::trace!(
        "Fingerprinted {} as {} in {:?}",
        resource_name,
        fingerprint.etag,
        start_time.elapsed()
    );

    if evaluate(&request.headers, &fingerprint) == CacheDecision::NotModified {
        return ResponseDescriptor::not_modified(&fingerprint);
    }

    let mime_type = from_path(file_name).first_or_octet_stream().to_string();

    let compression = if options.should_bypass_compression(&request.path) {
        log::debug!(
            "Path '{}' matches bypass pattern, skipping compression",
            request.path
        );
        CompressionType::None
    } else {
        request
            .headers
            .get_all(ACCEPT_ENCODING)
            .iter()
            .map(|value| determine_compression(value))
            .fold(CompressionType::None, |best, accepted| {
                match (best, accepted.preferred()) {
                    (CompressionType::Zstd, _) | (_, CompressionType::None) => best,
                    (_, preferred) => preferred,
                }
            })
    };

    let contents: ContentWriter = if request.is_head() {
        empty_body()
    } else {
        let catalog = Arc::clone(catalog);
        let name = resource_name.to_string();
        let (zstd_level, gzip_level) = (options.zstd_level, options.gzip_level);
        Box::new(move |sink| {
            let mut source = catalog.open(&name).ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("{} is gone", name))
            })?;
            copy_encoded(&mut source, sink, compression, zstd_level, gzip_level)?;
            Ok(())
        })
    };

    let mut response = ResponseDescriptor::new(Status::Ok, Some(mime_type), contents);
    response.insert_fingerprint(&fingerprint);
    if let Some(encoding) = compression.content_encoding() {
        response.headers.insert(CONTENT_ENCODING, encoding);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use flate2::read::GzDecoder;
    use std::io::Read;

    static ENTRIES: &[(&str, &[u8])] = &[
        ("app.Content.site.css", b"body { margin: 0 }"),
        ("app.Content.blob.unknownext", b"\x00\x01"),
    ];

    fn catalog() -> Arc<dyn ResourceCatalog> {
        Arc::new(StaticCatalog::new("app", ENTRIES))
    }

    fn build(request: &RequestDescriptor) -> ResponseDescriptor {
        build_response(
            &catalog(),
            "app.Content.site.css",
            "site.css",
            request,
            &ServeOptions::default(),
        )
    }

    #[test]
    fn test_header_map_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.append("Accept-Encoding", "gzip");
        headers.append("accept-encoding", "zstd");
        headers.insert("ETag", "\"a\"");
        headers.insert("etag", "\"b\"");

        assert_eq!(headers.get_all("ACCEPT-ENCODING"), vec!["gzip", "zstd"]);
        assert_eq!(headers.get("ETag"), Some("\"b\""));
        assert!(!headers.contains("Content-Type"));
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec![
                ("Accept-Encoding", "gzip"),
                ("Accept-Encoding", "zstd"),
                ("ETag", "\"b\"")
            ]
        );
    }

    #[test]
    fn test_append_line() {
        let mut headers = HeaderMap::new();
        headers.append_line("If-Modified-Since: Wed, 21 Oct 2015 07:28:00 GMT").unwrap();
        assert_eq!(
            headers.get("if-modified-since"),
            Some("Wed, 21 Oct 2015 07:28:00 GMT")
        );
        assert!(headers.append_line("no colon here").is_err());
        assert!(headers.append_line(": empty name").is_err());
    }

    #[test]
    fn test_full_response() {
        let response = build(&RequestDescriptor::get("/Content/site.css"));
        assert_eq!(response.status, Status::Ok);
        assert_eq!(response.content_type.as_deref(), Some("text/css"));
        assert_eq!(response.headers.get(CONTENT_TYPE), Some("text/css"));
        assert!(response.headers.get(ETAG).is_some_and(|e| e.len() == 34));
        assert!(response.headers.contains(LAST_MODIFIED));
        assert!(!response.headers.contains(CONTENT_ENCODING));
        assert_eq!(response.into_bytes().unwrap(), b"body { margin: 0 }");
    }

    #[test]
    fn test_unknown_extension_is_octet_stream() {
        let response = build_response(
            &catalog(),
            "app.Content.blob.unknownext",
            "blob.unknownext",
            &RequestDescriptor::get("/Content/blob.unknownext"),
            &ServeOptions::default(),
        );
        assert_eq!(
            response.content_type.as_deref(),
            Some("application/octet-stream")
        );
    }

    #[test]
    fn test_not_modified_has_no_body() {
        let etag = build(&RequestDescriptor::get("/Content/site.css"))
            .headers
            .get(ETAG)
            .unwrap()
            .to_string();

        let request = RequestDescriptor::get("/Content/site.css").with_header("If-None-Match", &etag);
        let response = build(&request);
        assert_eq!(response.status, Status::NotModified);
        assert_eq!(response.content_type, None);
        assert!(!response.headers.contains(CONTENT_TYPE));
        assert_eq!(response.headers.get(ETAG), Some(etag.as_str()));
        assert!(response.headers.contains(LAST_MODIFIED));
        assert!(response.into_bytes().unwrap().is_empty());
    }

    #[test]
    fn test_gzip_body_is_encoded() {
        let request =
            RequestDescriptor::get("/Content/site.css").with_header("Accept-Encoding", "gzip");
        let plain_etag = build(&RequestDescriptor::get("/Content/site.css"))
            .headers
            .get(ETAG)
            .map(str::to_string);

        let response = build(&request);
        assert_eq!(response.headers.get(CONTENT_ENCODING), Some("gzip"));
        assert_eq!(response.headers.get(ETAG).map(str::to_string), plain_etag);

        let body = response.into_bytes().unwrap();
        let mut decoded = String::new();
        GzDecoder::new(&body[..]).read_to_string(&mut decoded).unwrap();
        assert_eq!(decoded, "body { margin: 0 }");
    }

    #[test]
    fn test_zstd_preferred_across_header_values() {
        let request = RequestDescriptor::get("/Content/site.css")
            .with_header("Accept-Encoding", "zstd")
            .with_header("Accept-Encoding", "gzip");
        let response = build(&request);
        assert_eq!(response.headers.get(CONTENT_ENCODING), Some("zstd"));
    }

    #[test]
    fn test_bypass_skips_compression() {
        let options = ServeOptions::default()
            .with_bypass_patterns(&[r"\.css$"])
            .unwrap();
        let request =
            RequestDescriptor::get("/Content/site.css").with_header("Accept-Encoding", "gzip");
        let response = build_response(&catalog(), "app.Content.site.css", "site.css", &request, &options);
        assert!(!response.headers.contains(CONTENT_ENCODING));
        assert_eq!(response.into_bytes().unwrap(), b"body { margin: 0 }");
    }

    #[test]
    fn test_head_has_headers_but_no_body() {
        let response = build(&RequestDescriptor::new("HEAD", "/Content/site.css"));
        assert_eq!(response.status, Status::Ok);
        assert!(response.headers.contains(ETAG));
        assert!(response.into_bytes().unwrap().is_empty());
    }

    #[test]
    fn test_not_found() {
        let response = build_response(
            &catalog(),
            "app.Content.missing.css",
            "missing.css",
            &RequestDescriptor::get("/Content/missing.css"),
            &ServeOptions::default(),
        );
        assert_eq!(response.status, Status::NotFound);
        assert_eq!(response.status.code(), 404);
        assert_eq!(response.into_bytes().unwrap(), b"NOT FOUND");
    }

    struct UnreadableCatalog;

    struct UnreadableStream;

    impl Read for UnreadableStream {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "bad sector"))
        }
    }

    impl ResourceCatalog for UnreadableCatalog {
        fn module(&self) -> &str {
            "broken"
        }

        fn resource_names(&self) -> Vec<&str> {
            vec!["broken.file.txt"]
        }

        fn open(&self, _name: &str) -> Option<crate::catalog::ResourceStream> {
            Some(Box::new(UnreadableStream))
        }

        fn loaded_at(&self) -> std::time::SystemTime {
            std::time::SystemTime::UNIX_EPOCH
        }
    }

    #[test]
    fn test_unreadable_resource_is_not_found() {
        let catalog: Arc<dyn ResourceCatalog> = Arc::new(UnreadableCatalog);
        let response = build_response(
            &catalog,
            "broken.file.txt",
            "file.txt",
            &RequestDescriptor::get("/file.txt"),
            &ServeOptions::default(),
        );
        assert_eq!(response.status, Status::NotFound);
        assert!(!response.headers.contains(ETAG));
        assert_eq!(response.into_bytes().unwrap(), b"NOT FOUND");
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_sink_failure_is_surfaced() {
        let response = build(&RequestDescriptor::get("/Content/site.css"));
        let err = response.write_to(&mut FailingSink).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
