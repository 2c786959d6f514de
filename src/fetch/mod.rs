// src/fetch/mod.rs
use thiserror::Error;

pub mod client;

pub use client::HttpDecodeService;

pub const DEFAULT_BASE_URL: &str = "https://vpic.nhtsa.dot.gov/api/vehicles/DecodeVin/";

/// Network failures. Either one ends the run; malformed bodies are not
/// errors at this layer and are judged by the resolver.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request for VIN {vin} timed out")]
    Timeout { vin: String },

    #[error("request for VIN {vin} failed: {source}")]
    Transport {
        vin: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl FetchError {
    pub fn vin(&self) -> &str {
        match self {
            FetchError::Timeout { vin } | FetchError::Transport { vin, .. } => vin,
        }
    }
}

/// Something that can look a VIN up and hand back the raw response body.
pub trait DecodeService {
    fn fetch(&self, vin: &str) -> Result<String, FetchError>;
}

impl<T: DecodeService + ?Sized> DecodeService for &T {
    fn fetch(&self, vin: &str) -> Result<String, FetchError> {
        (**self).fetch(vin)
    }
}
