//! Service configuration: optional TOML file plus environment for secrets and endpoints.
//!
//! `PEEKY_CONFIG_PATH` points at the TOML file; every section and key is optional.
//! Keys never live in the file: `GEMINI_API_KEY` and `SUPABASE_KEY` are env-only.
//!
//! ```toml
//! [generator]
//! transport = "direct"        # direct | edge_function | disabled
//! model = "gemini-2.5-flash"
//! timeout_secs = 20
//! temperature = 0.7
//! top_k = 40
//! top_p = 0.95
//! max_output_tokens = 2048
//! safety_threshold = "BLOCK_MEDIUM_AND_ABOVE"
//!
//! [cache]
//! backend = "memory"          # none | memory | supabase
//! capacity = 500
//!
//! [local]
//! dataset_path = "./data/questions.json"
//!
//! [pipeline]
//! default_count = 5
//! max_count = 20
//! ```

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

use crate::gemini::{Sampling, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::supabase::DEFAULT_TABLE;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ServiceConfig {
  #[serde(default)]
  pub generator: GeneratorConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub local: LocalConfig,
  #[serde(default)]
  pub pipeline: PipelineConfig,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorTransport {
  /// Call the generative endpoint from this process.
  #[default]
  Direct,
  /// Delegate to the hosted `generate-questions` function; direct call as fallback.
  EdgeFunction,
  Disabled,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
  pub transport: GeneratorTransport,
  pub model: String,
  pub base_url: String,
  pub timeout_secs: u64,
  pub temperature: f32,
  pub top_k: u32,
  pub top_p: f32,
  pub max_output_tokens: u32,
  /// Applied to every harm category.
  pub safety_threshold: String,
}

impl Default for GeneratorConfig {
  fn default() -> Self {
    let sampling = Sampling::default();
    Self {
      transport: GeneratorTransport::Direct,
      model: DEFAULT_MODEL.into(),
      base_url: DEFAULT_BASE_URL.into(),
      timeout_secs: 20,
      temperature: sampling.temperature,
      top_k: sampling.top_k,
      top_p: sampling.top_p,
      max_output_tokens: sampling.max_output_tokens,
      safety_threshold: sampling.safety_threshold,
    }
  }
}

impl GeneratorConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs.max(1))
  }

  pub fn sampling(&self) -> Sampling {
    Sampling {
      temperature: self.temperature,
      top_k: self.top_k,
      top_p: self.top_p,
      max_output_tokens: self.max_output_tokens,
      safety_threshold: self.safety_threshold.clone(),
    }
  }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
  #[default]
  None,
  Memory,
  Supabase,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub backend: CacheBackend,
  /// Only enforced by the in-memory backend.
  pub capacity: usize,
  pub table: String,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self { backend: CacheBackend::None, capacity: 500, table: DEFAULT_TABLE.into() }
  }
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct LocalConfig {
  /// Replaces the bundled dataset when set.
  #[serde(default)]
  pub dataset_path: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  pub default_count: usize,
  pub max_count: usize,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self { default_count: 5, max_count: 20 }
  }
}

impl PipelineConfig {
  /// Missing count → default; anything above `max_count` is clamped.
  pub fn effective_count(&self, requested: Option<usize>) -> usize {
    requested.unwrap_or(self.default_count).min(self.max_count)
  }
}

/// Endpoint and secrets, env-only.
#[derive(Clone, Debug, Default)]
pub struct Secrets {
  pub gemini_api_key: Option<String>,
  pub supabase_url: Option<String>,
  pub supabase_key: Option<String>,
}

impl Secrets {
  pub fn from_env() -> Self {
    let non_empty = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());
    Self {
      gemini_api_key: non_empty("GEMINI_API_KEY"),
      supabase_url: non_empty("SUPABASE_URL"),
      supabase_key: non_empty("SUPABASE_KEY").or_else(|| non_empty("SUPABASE_ANON_KEY")),
    }
  }
}

pub fn parse_config(s: &str) -> Result<ServiceConfig, toml::de::Error> {
  toml::from_str::<ServiceConfig>(s)
}

impl ServiceConfig {
  /// GEMINI_MODEL / GEMINI_BASE_URL override the file.
  fn apply_env_overrides(mut self) -> Self {
    if let Ok(model) = std::env::var("GEMINI_MODEL") {
      if !model.trim().is_empty() {
        self.generator.model = model;
      }
    }
    if let Ok(url) = std::env::var("GEMINI_BASE_URL") {
      if !url.trim().is_empty() {
        self.generator.base_url = url;
      }
    }
    self
  }
}

/// Load from PEEKY_CONFIG_PATH. On any IO/parse error, log and use defaults.
pub fn load_config_from_env() -> ServiceConfig {
  let Ok(path) = std::env::var("PEEKY_CONFIG_PATH") else {
    return ServiceConfig::default().apply_env_overrides();
  };
  let cfg = match std::fs::read_to_string(&path) {
    Ok(s) => match parse_config(&s) {
      Ok(cfg) => {
        info!(target: "peeky_backend", %path, "Loaded service config (TOML)");
        cfg
      }
      Err(e) => {
        error!(target: "peeky_backend", %path, error = %e, "Failed to parse TOML config; using defaults");
        ServiceConfig::default()
      }
    },
    Err(e) => {
      error!(target: "peeky_backend", %path, error = %e, "Failed to read TOML config file; using defaults");
      ServiceConfig::default()
    }
  };
  cfg.apply_env_overrides()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_file_yields_defaults() {
    let cfg = parse_config("").expect("parse");
    assert_eq!(cfg.generator.transport, GeneratorTransport::Direct);
    assert_eq!(cfg.generator.model, DEFAULT_MODEL);
    assert_eq!(cfg.cache.backend, CacheBackend::None);
    assert_eq!(cfg.cache.table, "ai_questions_cache");
    assert_eq!(cfg.pipeline.default_count, 5);
    assert!(cfg.local.dataset_path.is_none());
  }

  #[test]
  fn partial_sections_keep_remaining_defaults() {
    let cfg = parse_config(
      r#"
      [generator]
      transport = "edge_function"
      timeout_secs = 5

      [cache]
      backend = "memory"
      capacity = 50
      "#,
    )
    .expect("parse");
    assert_eq!(cfg.generator.transport, GeneratorTransport::EdgeFunction);
    assert_eq!(cfg.generator.timeout(), Duration::from_secs(5));
    assert_eq!(cfg.generator.base_url, DEFAULT_BASE_URL);
    assert_eq!(cfg.cache.backend, CacheBackend::Memory);
    assert_eq!(cfg.cache.capacity, 50);
    assert_eq!(cfg.pipeline.max_count, 20);
  }

  #[test]
  fn sampling_defaults_and_overrides() {
    let defaults = parse_config("").expect("parse").generator.sampling();
    assert_eq!(defaults, Sampling::default());
    assert_eq!(defaults.top_k, 40);
    assert_eq!(defaults.max_output_tokens, 2048);
    assert_eq!(defaults.safety_threshold, "BLOCK_MEDIUM_AND_ABOVE");

    let cfg = parse_config("[generator]\ntop_k = 20\nsafety_threshold = \"BLOCK_LOW_AND_ABOVE\"").expect("parse");
    let s = cfg.generator.sampling();
    assert_eq!(s.top_k, 20);
    assert_eq!(s.safety_threshold, "BLOCK_LOW_AND_ABOVE");
    assert_eq!(s.max_output_tokens, 2048);
  }

  #[test]
  fn unknown_transport_is_a_parse_error() {
    assert!(parse_config("[generator]\ntransport = \"carrier_pigeon\"").is_err());
  }

  #[test]
  fn count_defaults_and_clamps() {
    let p = PipelineConfig { default_count: 5, max_count: 10 };
    assert_eq!(p.effective_count(None), 5);
    assert_eq!(p.effective_count(Some(3)), 3);
    assert_eq!(p.effective_count(Some(99)), 10);
  }
}
