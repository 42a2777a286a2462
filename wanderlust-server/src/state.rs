use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use tracing::info;
use wanderlust_core::{Catalog, PreferenceExtractor, Quiz};
use wanderlust_guard::{ContentPolicy, RateDecision, RateLimiter, SafetyFilter};

use crate::{config::Config, llm::LlmClient};

pub struct AppState {
    pub config: Config,
    pub catalog: Catalog,
    pub quiz: Quiz,
    pub extractor: PreferenceExtractor,
    pub filter: SafetyFilter,
    pub limiter: Mutex<RateLimiter>,
    /// `None` when no API key is configured.
    pub llm: Option<LlmClient>,
}

impl AppState {
    /// Load data tables (built-in or overridden by `[data]`) and build the
    /// upstream client from the environment.
    pub fn from_config(config: Config) -> Result<Arc<Self>> {
        let catalog = match &config.data.catalog {
            Some(path) => Catalog::from_path(path)?,
            None => Catalog::builtin()?,
        };
        info!("Loaded {} destinations", catalog.len());

        let policy = match &config.data.policy {
            Some(path) => ContentPolicy::from_path(path)?,
            None => ContentPolicy::default(),
        };
        let filter = SafetyFilter::new(&policy).context("compile content policy")?;

        let extractor = match &config.data.extraction_rules {
            Some(path) => PreferenceExtractor::from_path(path)?,
            None => PreferenceExtractor::with_defaults()?,
        };
        info!("Loaded {} extraction rules", extractor.rule_count());

        let llm = LlmClient::from_env(&config.llm)?;
        match &llm {
            Some(c) => info!("AI replies enabled, model {}", c.model()),
            None => info!(
                "{} not set, AI replies disabled",
                config.llm.api_key_env
            ),
        }

        Ok(Self::new(config, catalog, extractor, filter, llm))
    }

    pub fn new(
        config: Config,
        catalog: Catalog,
        extractor: PreferenceExtractor,
        filter: SafetyFilter,
        llm: Option<LlmClient>,
    ) -> Arc<Self> {
        let limiter = Mutex::new(RateLimiter::new(config.rate_limit));
        Arc::new(Self {
            config,
            catalog,
            quiz: Quiz::default(),
            extractor,
            filter,
            limiter,
            llm,
        })
    }

    pub fn check_rate(&self, client: &str) -> RateDecision {
        // A panic while holding the lock cannot leave the table inconsistent.
        let mut limiter = self.limiter.lock().unwrap_or_else(PoisonError::into_inner);
        limiter.check(client)
    }

    pub fn ai_enabled(&self) -> bool {
        self.llm.is_some()
    }

    pub fn model(&self) -> &str {
        &self.config.llm.model
    }
}
