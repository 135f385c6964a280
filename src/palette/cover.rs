use log::debug;
use reqwest::blocking::Client;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoverError {
    #[error("cover request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("cover host answered with HTTP status {0}")]
    Status(u16),
}

/// Fetches raw cover-art bytes.
pub trait CoverSource: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, CoverError>;
}

/// Plain HTTP GET, no authentication, client default timeouts.
pub struct HttpCoverSource {
    http: Client,
}

impl HttpCoverSource {
    pub fn new() -> Result<Self, CoverError> {
        let http = Client::builder()
            .user_agent(concat!("aquarela/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }
}

impl CoverSource for HttpCoverSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, CoverError> {
        let response = self.http.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(CoverError::Status(status.as_u16()));
        }
        let bytes = response.bytes()?;
        debug!("GET {url} -> {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}
