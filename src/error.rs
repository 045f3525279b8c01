use thiserror::Error;

/// Errors raised by the analyzer, the codecs and the stream reader.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("Invalid buffer: {width}x{height} requires {expected} bytes, got {actual}")]
    InvalidBuffer {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("Encode failure: {0}")]
    EncodeFailure(#[from] EncodeFailure),
    #[error("Invalid data: {0}")]
    InvalidData(&'static str),
    #[error("Unsupported stream version {0}")]
    UnsupportedVersion(u8),
    #[error("Unknown codec family tag {0}")]
    UnknownFamily(u8),
    #[error("Compression error: {0}")]
    Compression(String),
    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),
}

impl CodecError {
    /// Deterministic errors fail identically when the same input is retried.
    pub fn is_deterministic(&self) -> bool {
        !matches!(self, CodecError::Compression(_) | CodecError::WorkerPanicked(_))
    }
}

/// Codec contract violations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeFailure {
    #[error("quality {0} outside [0, 1]")]
    QualityOutOfRange(f32),
    #[error("quantization scale {0} must be finite and positive")]
    QuantScaleOutOfRange(f32),
    #[error("compression level {0} outside 0..=9")]
    CompressionLevelOutOfRange(u8),
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::Compression(err.to_string())
    }
}

pub type CodecResult<T> = Result<T, CodecError>;
