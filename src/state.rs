//! Application state: the question pipeline and the pieces the generation function needs.
//!
//! This module owns:
//!   - the pipeline (generator transport + optional cache + local bank)
//!   - a direct Gemini client for the server-side generation function (if a key is present)
//!   - the shared cache handle, so the function route can write generated rows
//!   - pipeline limits (default/max count)
//!
//! Anything that cannot be built from the environment is logged and left out;
//! the service still starts and serves from the local bank.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::cache::{InMemoryCache, QuestionCache};
use crate::config::{load_config_from_env, CacheBackend, GeneratorTransport, PipelineConfig, Secrets, ServiceConfig};
use crate::gemini::GeminiClient;
use crate::generator::{EdgeFunctionGenerator, QuestionGenerator};
use crate::local::LocalQuestionBank;
use crate::pipeline::QuestionPipeline;
use crate::supabase::SupabaseCache;

pub struct AppState {
    pub pipeline: QuestionPipeline,
    pub function_generator: Option<GeminiClient>,
    pub cache: Option<Arc<dyn QuestionCache>>,
    pub limits: PipelineConfig,
}

impl AppState {
    /// Build state from env: load config, local bank, cache backend, generator transport.
    pub fn new() -> Self {
        Self::from_config(load_config_from_env(), Secrets::from_env())
    }

    #[instrument(level = "info", skip_all)]
    pub fn from_config(cfg: ServiceConfig, secrets: Secrets) -> Self {
        let local = load_local_bank(&cfg);
        for (key, n) in local.inventory() {
            info!(target: "questions", %key, questions = n, "Startup local bank inventory");
        }

        let direct = build_direct_client(&cfg, &secrets);
        let cache = build_cache(&cfg, &secrets);
        let generator = build_generator(&cfg, &secrets, direct.clone());

        let mut pipeline = QuestionPipeline::new(local);
        if let Some(g) = generator {
            pipeline = pipeline.with_generator(g);
        }
        if let Some(c) = &cache {
            pipeline = pipeline.with_cache(c.clone());
        }
        info!(
            target: "peeky_backend",
            generator = pipeline.generator_name(),
            cache = pipeline.cache_name(),
            default_count = cfg.pipeline.default_count,
            max_count = cfg.pipeline.max_count,
            "Question pipeline ready"
        );

        Self { pipeline, function_generator: direct, cache, limits: cfg.pipeline }
    }
}

fn load_local_bank(cfg: &ServiceConfig) -> LocalQuestionBank {
    if let Some(path) = &cfg.local.dataset_path {
        match LocalQuestionBank::from_path(path) {
            Ok(b) => {
                info!(target: "peeky_backend", %path, "Loaded local question bank from file");
                return b;
            }
            Err(e) => error!(target: "peeky_backend", %path, error = %e, "Failed to load local question bank; using bundled data"),
        }
    }
    match LocalQuestionBank::bundled() {
        Ok(b) => b,
        Err(e) => {
            error!(target: "peeky_backend", error = %e, "Bundled question bank is invalid; local fallback disabled");
            LocalQuestionBank::default()
        }
    }
}

fn build_direct_client(cfg: &ServiceConfig, secrets: &Secrets) -> Option<GeminiClient> {
    let Some(key) = &secrets.gemini_api_key else {
        info!(target: "peeky_backend", "GEMINI_API_KEY not set; direct generation disabled");
        return None;
    };
    let g = &cfg.generator;
    match GeminiClient::new(key.clone(), g.base_url.clone(), g.model.clone(), g.sampling(), g.timeout()) {
        Ok(c) => {
            info!(target: "peeky_backend", base_url = %c.base_url, model = %c.model, timeout_secs = g.timeout_secs, "Gemini enabled");
            Some(c)
        }
        Err(e) => {
            error!(target: "peeky_backend", error = %e, "Failed to build Gemini client");
            None
        }
    }
}

fn build_generator(
    cfg: &ServiceConfig,
    secrets: &Secrets,
    direct: Option<GeminiClient>,
) -> Option<Arc<dyn QuestionGenerator>> {
    match cfg.generator.transport {
        GeneratorTransport::Disabled => {
            info!(target: "peeky_backend", "Generation disabled by config; serving cache/local only");
            None
        }
        GeneratorTransport::Direct => direct.map(|c| Arc::new(c) as Arc<dyn QuestionGenerator>),
        GeneratorTransport::EdgeFunction => {
            let (Some(url), Some(key)) = (&secrets.supabase_url, &secrets.supabase_key) else {
                warn!(target: "peeky_backend", "edge_function transport needs SUPABASE_URL and SUPABASE_KEY; falling back to direct");
                return direct.map(|c| Arc::new(c) as Arc<dyn QuestionGenerator>);
            };
            match EdgeFunctionGenerator::new(url.clone(), key.clone(), cfg.generator.timeout(), direct.clone()) {
                Ok(g) => {
                    info!(target: "peeky_backend", url = %g.function_url(), has_fallback = direct.is_some(), "Edge function generation enabled");
                    Some(Arc::new(g))
                }
                Err(e) => {
                    error!(target: "peeky_backend", error = %e, "Failed to build edge function client; falling back to direct");
                    direct.map(|c| Arc::new(c) as Arc<dyn QuestionGenerator>)
                }
            }
        }
    }
}

fn build_cache(cfg: &ServiceConfig, secrets: &Secrets) -> Option<Arc<dyn QuestionCache>> {
    match cfg.cache.backend {
        CacheBackend::None => None,
        CacheBackend::Memory => {
            info!(target: "peeky_backend", capacity = cfg.cache.capacity, "In-memory question cache enabled");
            Some(Arc::new(InMemoryCache::new(cfg.cache.capacity)))
        }
        CacheBackend::Supabase => {
            let (Some(url), Some(key)) = (&secrets.supabase_url, &secrets.supabase_key) else {
                error!(target: "peeky_backend", "supabase cache needs SUPABASE_URL and SUPABASE_KEY; cache disabled");
                return None;
            };
            match SupabaseCache::new(url.clone(), key.clone(), cfg.cache.table.clone(), cfg.generator.timeout()) {
                Ok(c) => {
                    info!(target: "peeky_backend", table = %cfg.cache.table, "Supabase question cache enabled");
                    Some(Arc::new(c))
                }
                Err(e) => {
                    error!(target: "peeky_backend", error = %e, "Failed to build Supabase cache client; cache disabled");
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn no_secrets_means_local_only() {
        let state = AppState::from_config(ServiceConfig::default(), Secrets::default());
        assert_eq!(state.pipeline.generator_name(), "none");
        assert_eq!(state.pipeline.cache_name(), "none");
        assert!(state.function_generator.is_none());
    }

    #[test]
    fn memory_cache_and_direct_generator_from_config() {
        let cfg = parse_config("[cache]\nbackend = \"memory\"").expect("parse");
        let secrets = Secrets { gemini_api_key: Some("k".into()), ..Secrets::default() };
        let state = AppState::from_config(cfg, secrets);
        assert_eq!(state.pipeline.generator_name(), "gemini");
        assert_eq!(state.pipeline.cache_name(), "memory");
        assert!(state.cache.is_some());
    }

    #[test]
    fn edge_function_without_backend_falls_back_to_direct() {
        let cfg = parse_config("[generator]\ntransport = \"edge_function\"").expect("parse");
        let secrets = Secrets { gemini_api_key: Some("k".into()), ..Secrets::default() };
        assert_eq!(AppState::from_config(cfg, secrets).pipeline.generator_name(), "gemini");
    }

    #[test]
    fn edge_function_with_backend_is_used() {
        let cfg = parse_config("[generator]\ntransport = \"edge_function\"").expect("parse");
        let secrets = Secrets {
            gemini_api_key: None,
            supabase_url: Some("http://localhost:54321".into()),
            supabase_key: Some("anon".into()),
        };
        assert_eq!(AppState::from_config(cfg, secrets).pipeline.generator_name(), "edge_function");
    }

    #[test]
    fn missing_dataset_file_falls_back_to_bundled() {
        let cfg = parse_config("[local]\ndataset_path = \"/nonexistent/questions.json\"").expect("parse");
        let bank = load_local_bank(&cfg);
        assert!(!bank.inventory().is_empty());
    }
}
