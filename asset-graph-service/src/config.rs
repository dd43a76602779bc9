use std::{net::SocketAddr, str::FromStr};

use asset_graph::GraphConfig;
use tracing::warn;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to bind the HTTP server. Env: `BIND_ADDR`, else `0.0.0.0:$PORT`, default `0.0.0.0:8000`.
    pub bind_addr: SocketAddr,
    /// Graph-store and model settings; `None` leaves the service uninitialized.
    pub graph: Option<GraphConfig>,
    /// Why `graph` is `None`, when it is.
    pub graph_error: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from the process environment (and `.env`, if present).
    ///
    /// # Errors
    /// Returns an error if `BIND_ADDR` or `PORT` is set but invalid. An invalid
    /// graph configuration is not an error; see [`ServiceConfig::graph_error`].
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = match (lookup("BIND_ADDR"), lookup("PORT")) {
            (Some(addr), _) => addr,
            (None, Some(port)) => {
                let port: u16 = port
                    .trim()
                    .parse()
                    .map_err(|e| anyhow::anyhow!("Invalid PORT '{}': {}", port, e))?;
                format!("0.0.0.0:{port}")
            }
            (None, None) => DEFAULT_BIND_ADDR.to_string(),
        };
        let bind_addr = SocketAddr::from_str(bind_addr.trim())
            .map_err(|e| anyhow::anyhow!("Invalid BIND_ADDR '{}': {}", bind_addr, e))?;

        let (graph, graph_error) = match GraphConfig::from_lookup(&lookup) {
            Ok(config) => (Some(config), None),
            Err(e) => {
                warn!(error = %e, "graph configuration incomplete; service will start uninitialized");
                (None, Some(e.to_string()))
            }
        };

        Ok(ServiceConfig {
            bind_addr,
            graph,
            graph_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_graph_settings() {
        let config = ServiceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8000".parse().unwrap());
        assert!(config.graph.is_none());
        assert!(config.graph_error.unwrap().contains("NEO4J_PASSWORD"));
    }

    #[test]
    fn port_builds_bind_addr() {
        let config = ServiceConfig::from_lookup(lookup(&[("PORT", "9100")])).unwrap();
        assert_eq!(config.bind_addr.port(), 9100);
    }

    #[test]
    fn bind_addr_wins_over_port() {
        let config =
            ServiceConfig::from_lookup(lookup(&[("BIND_ADDR", "127.0.0.1:7000"), ("PORT", "9100")])).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:7000".parse().unwrap());
    }

    #[test]
    fn invalid_bind_addr_is_an_error() {
        assert!(ServiceConfig::from_lookup(lookup(&[("BIND_ADDR", "not-an-addr")])).is_err());
        assert!(ServiceConfig::from_lookup(lookup(&[("PORT", "http")])).is_err());
    }

    #[test]
    fn complete_graph_settings_initialize() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("NEO4J_PASSWORD", "secret"),
            ("OPENAI_API_KEY", "sk-test"),
        ]))
        .unwrap();
        let graph = config.graph.expect("graph config");
        assert_eq!(graph.model_name, "gpt-4o");
        assert!(config.graph_error.is_none());
    }
}
