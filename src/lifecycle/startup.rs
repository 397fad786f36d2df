//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the form configuration and report its warnings
//! - Initialize subsystems in dependency order (email, reCAPTCHA, router)
//! - Start background tasks (store sweeper, metrics)
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listener starts last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_routes, ValidationError};
use crate::config::ConfigError;
use crate::email::{build_provider, EmailSubmissionHandler};
use crate::error::FormError;
use crate::forms::{BuildError, ConfigBuilder, Configuration};
use crate::http::HttpServer;
use crate::lifecycle::sweeper::spawn_sweeper;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::security::GoogleRecaptcha;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("form configuration: {0}")]
    Forms(#[from] BuildError),

    #[error("form routes: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    Routes(Vec<ValidationError>),

    #[error("subsystem initialisation: {0}")]
    Subsystem(#[from] FormError),

    #[error("listener: {0}")]
    Io(#[from] std::io::Error),
}

/// A fully wired service, ready to bind.
pub struct Application {
    pub config: ServerConfig,
    pub forms: Arc<Configuration>,
    pub server: HttpServer,
}

/// Build every subsystem from a validated configuration.
pub fn build_application(config: ServerConfig) -> Result<Application, StartupError> {
    let forms = ConfigBuilder::new().build(&config.forms)?;
    validate_routes(&forms.forms.routes).map_err(StartupError::Routes)?;

    tracing::info!(
        categories = forms.forms.categories.len(),
        fields = forms.forms.field_configs.len(),
        warnings = forms.warnings.len(),
        "Form configuration built"
    );
    let forms = Arc::new(forms);

    let outbound = Duration::from_secs(config.timeouts.outbound_secs);
    let provider = build_provider(&config.email, outbound)?;
    let mut handler = EmailSubmissionHandler::new(forms.clone(), config.email.clone(), provider);
    if forms.forms.recaptcha.enabled {
        handler = handler.with_recaptcha(Arc::new(GoogleRecaptcha::new(outbound)?));
    }

    let server = HttpServer::new(config.clone(), forms.clone(), Arc::new(handler));

    Ok(Application { config, forms, server })
}

impl Application {
    /// Serve until `shutdown` fires.
    pub async fn run(self, shutdown: &Shutdown) -> Result<(), StartupError> {
        if self.config.observability.metrics_enabled {
            match self.config.observability.metrics_address.parse::<SocketAddr>() {
                Ok(addr) => metrics::init_metrics(addr),
                Err(e) => tracing::error!(
                    metrics_address = %self.config.observability.metrics_address,
                    error = %e,
                    "Failed to parse metrics address"
                ),
            }
        }

        let state = self.server.state();
        spawn_sweeper(
            state.csrf.clone(),
            state.limiter.clone(),
            Duration::from_secs(self.config.rate_limit.sweep_interval_secs),
            shutdown.subscribe(),
        );

        match self.config.listener.tls.clone() {
            Some(tls) => {
                let addr: SocketAddr = self.config.listener.bind_address.parse().map_err(|e| {
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("bind address: {}", e),
                    )
                })?;
                self.server.run_tls(addr, &tls, shutdown.wait()).await?;
            }
            None => {
                let listener = TcpListener::bind(&self.config.listener.bind_address).await?;
                self.server.run(listener, shutdown.wait()).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_application_builds() {
        let app = build_application(ServerConfig::default()).unwrap();
        assert_eq!(app.forms.forms.categories.len(), 5);
    }

    #[test]
    fn test_bad_form_overrides_fail_fast() {
        let config = ServerConfig {
            forms: json!({"categories": {"general": {"fields": "name"}}}),
            ..Default::default()
        };
        assert!(matches!(build_application(config), Err(StartupError::Forms(_))));
    }

    #[test]
    fn test_colliding_routes_fail_fast() {
        let config = ServerConfig {
            forms: json!({"routes": {"csrfPath": "/api/contact"}}),
            ..Default::default()
        };
        assert!(matches!(build_application(config), Err(StartupError::Routes(_))));
    }
}
