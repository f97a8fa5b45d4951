use flate2::write::GzEncoder;
use flate2::Compression as GzipCompression;
use std::io::{self, Read, Write};
use zstd::stream::write::Encoder as ZstdEncoder;

#[derive(Debug, PartialEq, Copy, Clone)]
pub enum CompressionType {
    Zstd,
    Gzip,
    None,
}

impl CompressionType {
    /// Value for the `Content-Encoding` header, if any.
    pub fn content_encoding(self) -> Option<&'static str> {
        match self {
            CompressionType::Zstd => Some("zstd"),
            CompressionType::Gzip => Some("gzip"),
            CompressionType::None => None,
        }
    }
}

#[derive(Debug, Default, PartialEq, Copy, Clone)]
pub struct AcceptedCompression {
    pub supports_zstd: bool,
    pub supports_gzip: bool,
}

impl AcceptedCompression {
    /// Preferred encoding among those the client accepts.
    pub fn preferred(self) -> CompressionType {
        if self.supports_zstd {
            CompressionType::Zstd
        } else if self.supports_gzip {
            CompressionType::Gzip
        } else {
            CompressionType::None
        }
    }
}

/// Parses an `Accept-Encoding` value. Quality values are honoured only to
/// the extent that `q=0` disables a coding.
pub fn determine_compression(accept_encoding: &str) -> AcceptedCompression {
    let binding = accept_encoding.to_lowercase();
    let mut accepted = AcceptedCompression::default();

    for entry in binding.split(',') {
        let mut params = entry.split(';').map(|s| s.trim());
        let coding = params.next().unwrap_or("");
        let disabled = params.any(|p| {
            p.strip_prefix("q=")
                .and_then(|q| q.trim().parse::<f32>().ok())
                .is_some_and(|q| q <= 0.0)
        });
        if disabled {
            continue;
        }
        match coding {
            "zstd" => accepted.supports_zstd = true,
            "gzip" | "x-gzip" => accepted.supports_gzip = true,
            _ => {}
        }
    }

    accepted
}

/// Copies `source` into `sink`, encoded with `compression`.
pub fn copy_encoded(
    source: &mut dyn Read,
    sink: &mut dyn Write,
    compression: CompressionType,
    zstd_level: i32,
    gzip_level: u32,
) -> io::Result<u64> {
    match compression {
        CompressionType::Zstd => {
            log::debug!("Compressing with zstd level {}", zstd_level);
            let mut encoder = ZstdEncoder::new(sink, zstd_level)?;
            let copied = io::copy(source, &mut encoder)?;
            encoder.finish()?.flush()?;
            Ok(copied)
        }
        CompressionType::Gzip => {
            log::debug!("Compressing with gzip level {}", gzip_level);
            let mut encoder = GzEncoder::new(sink, GzipCompression::new(gzip_level));
            let copied = io::copy(source, &mut encoder)?;
            encoder.finish()?.flush()?;
            Ok(copied)
        }
        CompressionType::None => io::copy(source, sink),
    }
}
