//! Prometheus metrics.

use crate::config::MetricsSettings;
use crate::{Error, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Default Prometheus scrape port.
const DEFAULT_METRICS_PORT: u16 = 9090;

/// Metrics configuration.
#[derive(Debug, Clone, Copy)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,
    /// Address to bind the scrape listener.
    pub listen_addr: SocketAddr,
}

impl MetricsConfig {
    /// Builds metrics configuration from config settings.
    #[must_use]
    pub fn from_settings(settings: &MetricsSettings) -> Self {
        let port = settings.port.unwrap_or(DEFAULT_METRICS_PORT);
        Self {
            enabled: settings.enabled,
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port),
        }
    }
}

/// Installs the Prometheus recorder with a scrape listener on `listen_addr`.
///
/// Nothing is installed unless metrics are enabled and `expose` is set; one-shot
/// commands exit before anything could scrape them. Returns whether the
/// listener was started.
pub fn install_prometheus(config: &MetricsConfig, expose: bool) -> Result<bool> {
    if !config.enabled || !expose {
        return Ok(false);
    }

    PrometheusBuilder::new()
        .with_http_listener(config.listen_addr)
        .install()
        .map_err(|e| Error::operation("metrics_listener_install", e))?;
    tracing::info!(addr = %config.listen_addr, "Prometheus metrics listener started");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings_default_port() {
        let config = MetricsConfig::from_settings(&MetricsSettings::default());
        assert!(!config.enabled);
        assert_eq!(config.listen_addr.port(), DEFAULT_METRICS_PORT);
    }

    #[test]
    fn test_disabled_installs_nothing() {
        let config = MetricsConfig::from_settings(&MetricsSettings {
            enabled: false,
            port: Some(9191),
        });
        assert_eq!(config.listen_addr.port(), 9191);
        assert!(!install_prometheus(&config, true).unwrap());
    }

    #[test]
    fn test_enabled_without_expose_installs_nothing() {
        let config = MetricsConfig::from_settings(&MetricsSettings {
            enabled: true,
            port: None,
        });
        assert!(!install_prometheus(&config, false).unwrap());
    }
}
