//! Delivery of encoded batches to InfluxDB.

use std::time::Duration;

use error_stack::Report;
use error_stack::ResultExt;
use reqwest::blocking::Client as BlockingClient;
use tracing::debug;
use tracing::info;
use url::Url;

use crate::error::TransportError;
use crate::error::TransportResult;

/// Sends one newline-joined batch of lines.
pub trait Transport: Send + Sync {
    fn send(&self, payload: &str) -> TransportResult<()>;

    /// Release resources; called once when the writer closes.
    fn close(&self) {}
}

/// Configuration for [`HttpTransport`]
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL of the InfluxDB server, e.g. `http://localhost:8086`
    pub url: String,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            database: "jfr".to_string(),
            user: None,
            password: None,
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(120),
            user_agent: concat!("jfr-exporter/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Writes batches with the InfluxDB 1.x `/write` endpoint.
pub struct HttpTransport {
    http: BlockingClient,
    write_url: Url,
    ping_url: Url,
}

impl HttpTransport {
    /// create transport
    pub fn new(config: &HttpConfig) -> TransportResult<Self> {
        let base = config.url.trim_end_matches('/');

        let mut params = vec![("db", config.database.as_str())];
        if let Some(user) = &config.user {
            params.push(("u", user.as_str()));
        }
        if let Some(password) = &config.password {
            params.push(("p", password.as_str()));
        }
        params.push(("precision", "n"));

        let write_url = Url::parse_with_params(&format!("{base}/write"), &params)
            .change_context(TransportError::Configuration {
                message: format!("Invalid InfluxDB url `{}`", config.url),
            })?;
        let ping_url =
            Url::parse(&format!("{base}/ping")).change_context(TransportError::Configuration {
                message: format!("Invalid InfluxDB url `{}`", config.url),
            })?;

        let http = BlockingClient::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .change_context(TransportError::Configuration {
                message: "Failed to create blocking HTTP client".into(),
            })?;

        info!(url = %config.url, database = %config.database, "InfluxDB transport created");

        Ok(Self {
            http,
            write_url,
            ping_url,
        })
    }

    /// Check that the server answers on `/ping`.
    pub fn ping(&self) -> TransportResult<()> {
        let response = self
            .http
            .get(self.ping_url.clone())
            .send()
            .change_context(TransportError::Network {
                message: format!("Failed to reach {}", self.ping_url),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Report::new(TransportError::Http {
                status: status.as_u16(),
                message: "ping failed".into(),
            }));
        }
        Ok(())
    }
}

impl Transport for HttpTransport {
    fn send(&self, payload: &str) -> TransportResult<()> {
        let response = self
            .http
            .post(self.write_url.clone())
            .body(payload.to_string())
            .send()
            .change_context(TransportError::Network {
                message: "Failed to send batch".into(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(Report::new(TransportError::Http {
                status: status.as_u16(),
                message: text,
            }));
        }

        debug!(status = %status, bytes = payload.len(), "batch written");
        Ok(())
    }
}
