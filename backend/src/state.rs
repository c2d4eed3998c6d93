//! Application state management
//!
//! This module provides the shared application state that is passed
//! to all request handlers via Axum's state extraction.
//!
//! Everything in here is built once at startup from `AppConfig` and is
//! read-only afterwards. All fields are Arc'd or `Copy`, so cloning the
//! state per request is O(1).

use crate::auth::{PasswordService, TokenIssuer};
use crate::config::AppConfig;
use crate::repositories::UserStore;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Credential store
    pub store: Arc<dyn UserStore>,
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Password hashing settings
    pub passwords: PasswordService,
    /// Token issuer with pre-computed signing keys
    pub tokens: TokenIssuer,
    /// Prometheus handle, present when the recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new application state
    ///
    /// Derives the signing keys from the configured secret; call once at
    /// startup.
    pub fn new(store: Arc<dyn UserStore>, config: AppConfig) -> Self {
        let tokens = TokenIssuer::new(&config.jwt.secret, config.jwt.token_expiry_secs);
        let passwords = PasswordService::from_config(&config.password);

        Self {
            store,
            config: Arc::new(config),
            passwords,
            tokens,
            metrics: None,
        }
    }

    /// Attach the Prometheus handle rendered at `/metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    #[inline]
    pub fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }

    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[inline]
    pub fn passwords(&self) -> &PasswordService {
        &self.passwords
    }

    #[inline]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }
}
