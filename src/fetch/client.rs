use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use tracing::{debug, warn};
use url::Url;

use super::{DecodeService, FetchError};
use crate::config::DecoderConfig;

/// Blocking client for the vPIC `DecodeVin` endpoint.
#[derive(Debug, Clone)]
pub struct HttpDecodeService {
    client: Client,
    base: Url,
}

impl HttpDecodeService {
    pub fn new(cfg: &DecoderConfig) -> Result<Self> {
        let base = Url::parse(&cfg.base_url)
            .with_context(|| format!("parsing decoder base URL {}", cfg.base_url))?;
        if base.cannot_be_a_base() {
            bail!("decoder base URL {} cannot take a path", cfg.base_url);
        }

        if cfg.accept_invalid_certs {
            warn!(base = %base, "TLS certificate verification is disabled for the decoder");
        }
        let client = Client::builder()
            .timeout(cfg.timeout())
            .danger_accept_invalid_certs(cfg.accept_invalid_certs)
            .build()
            .context("building HTTP client")?;

        Ok(Self { client, base })
    }

    /// `{base}/{vin}?format=json`, with the VIN escaped as a single path segment.
    pub fn lookup_url(&self, vin: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(vin);
        }
        url.query_pairs_mut().clear().append_pair("format", "json");
        url
    }
}

impl DecodeService for HttpDecodeService {
    fn fetch(&self, vin: &str) -> Result<String, FetchError> {
        let url = self.lookup_url(vin);
        debug!(%url, "decoding VIN");

        let resp = self
            .client
            .get(url.as_str())
            .send()
            .map_err(|e| classify(vin, e))?;
        if !resp.status().is_success() {
            // the body still decides whether this row is an error record
            debug!(vin, status = %resp.status(), "decoder returned non-success status");
        }
        resp.text().map_err(|e| classify(vin, e))
    }
}

fn classify(vin: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            vin: vin.to_string(),
        }
    } else {
        FetchError::Transport {
            vin: vin.to_string(),
            source: Box::new(err),
        }
    }
}
