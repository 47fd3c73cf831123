//! HTTP separation bridge
//!
//! Talks to a separation model server over HTTP. The mixture is written to
//! a work directory, the bridge writes one WAV per stem and answers with
//! their paths. Without the `separator-bridge` feature the separator can be
//! built but every call fails with `SeparationUnavailable`.

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

use log::info;
use serde::{Deserialize, Serialize};

use crate::engine::{load_audio, save_audio, AudioBuffer, ExportFormat};
use crate::error::{FxError, Result};
use crate::pipeline::separator::Separator;
use crate::pipeline::stem::{Stem, StemMap};

/// Environment variable overriding the bridge URL
pub const BRIDGE_URL_ENV: &str = "STEMFX_SEPARATOR_URL";
pub const DEFAULT_BRIDGE_URL: &str = "http://localhost:8002";
const DEFAULT_TIMEOUT_MS: u64 = 600_000;

#[derive(Debug, Serialize)]
struct SeparateRequest {
    input_path: String,
    output_dir: String,
    device: String,
}

#[derive(Debug, Deserialize)]
struct SeparateResponse {
    success: bool,
    #[serde(default)]
    stems: BTreeMap<String, String>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Separator backed by the HTTP bridge
#[derive(Debug, Clone)]
pub struct BridgeSeparator {
    url: String,
    device: String,
    work_dir: PathBuf,
    timeout_ms: u64,
}

impl BridgeSeparator {
    /// Bridge at `$STEMFX_SEPARATOR_URL`, or the local default
    pub fn new(device: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        let url = env::var(BRIDGE_URL_ENV).unwrap_or_else(|_| DEFAULT_BRIDGE_URL.to_string());
        Self::with_url(url, device, work_dir)
    }

    pub fn with_url(
        url: impl Into<String>,
        device: impl Into<String>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            url: url.into(),
            device: device.into(),
            work_dir: work_dir.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    #[cfg(feature = "separator-bridge")]
    fn send_request(&self, request: &SeparateRequest) -> Result<SeparateResponse> {
        let unavailable = |reason: String| FxError::SeparationUnavailable { reason };

        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .build()
            .map_err(|e| unavailable(e.to_string()))?;

        let response = client
            .post(format!("{}/separate", self.url))
            .json(request)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    unavailable(format!("bridge timed out after {} ms", self.timeout_ms))
                } else {
                    unavailable(format!("cannot reach bridge at {}: {}", self.url, e))
                }
            })?;

        if !response.status().is_success() {
            return Err(unavailable(format!("bridge returned {}", response.status())));
        }

        response
            .json::<SeparateResponse>()
            .map_err(|e| unavailable(format!("invalid response from bridge: {}", e)))
    }

    #[cfg(not(feature = "separator-bridge"))]
    fn send_request(&self, _request: &SeparateRequest) -> Result<SeparateResponse> {
        Err(FxError::SeparationUnavailable {
            reason: "separation bridge not compiled in; build with --features separator-bridge"
                .to_string(),
        })
    }
}

impl Separator for BridgeSeparator {
    fn separate(&self, mixture: &AudioBuffer) -> Result<StemMap> {
        let input_path = self.work_dir.join("mixture.wav");
        save_audio(mixture, &input_path, ExportFormat::float())?;

        let request = SeparateRequest {
            input_path: input_path.display().to_string(),
            output_dir: self.work_dir.display().to_string(),
            device: self.device.clone(),
        };
        info!("separating via bridge at {} on {}", self.url, self.device);
        let response = self.send_request(&request)?;

        if !response.success {
            return Err(FxError::SeparationUnavailable {
                reason: response
                    .error_message
                    .unwrap_or_else(|| "bridge reported failure".to_string()),
            });
        }

        let mut stems = StemMap::new();
        for stem in Stem::ALL {
            if let Some(path) = response.stems.get(stem.as_str()) {
                stems.insert(stem, load_audio(&PathBuf::from(path), self.sample_rate())?);
            }
        }
        Ok(stems)
    }

    fn name(&self) -> &str {
        "bridge"
    }
}
