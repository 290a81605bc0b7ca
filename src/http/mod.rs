use std::time::Duration;

use crate::error::{Error, Result};

/// Minimal GET capability needed by the artwork pipeline.
pub trait HttpGet: Send + Sync {
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpClient {
    client: reqwest::blocking::Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("spotify-extras/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::HttpClient)?;
        Ok(Self { client })
    }
}

impl HttpGet for HttpClient {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        let http_err = |source| Error::Http {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().map_err(http_err)?;
        tracing::debug!("Fetched {} bytes from {url}", bytes.len());
        Ok(bytes.to_vec())
    }
}
