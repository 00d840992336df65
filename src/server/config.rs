use super::RequestsLoggingLevel;
use crate::audio::DEFAULT_MAX_UPLOAD_BYTES;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub frontend_dir_path: Option<String>,
    /// Hard cap on the request body, a little above the upload limit so the
    /// multipart framing fits and oversize files get a 413 with a message.
    pub max_request_body_bytes: usize,
}

/// Room for multipart boundaries and the optional transcript field.
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

impl ServerConfig {
    pub fn request_body_limit(max_upload_bytes: usize) -> usize {
        max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 8000,
            frontend_dir_path: None,
            max_request_body_bytes: Self::request_body_limit(DEFAULT_MAX_UPLOAD_BYTES),
        }
    }
}
