//! Connectivity signal consumed by the sync controller.

use std::time::Duration;

use reqwest::Client;
use tokio::sync::watch;

const CHECK_INTERVAL: Duration = Duration::from_secs(5);

const CHECK_TIMEOUT: Duration = Duration::from_secs(3);

/// Publishes the current `is_connected` value to any number of observers.
#[derive(Debug, Clone)]
pub struct NetworkMonitor {
    tx: watch::Sender<bool>,
}

impl NetworkMonitor {
    pub fn new(initial: bool) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Update the signal. Observers are only woken when the value changes.
    pub fn set_connected(&self, connected: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == connected {
                return false;
            }
            tracing::info!("Connectivity changed: connected={}", connected);
            *current = connected;
            true
        })
    }

    pub fn is_connected(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Derives connectivity from whether an HTTP endpoint answers.
#[derive(Debug, Clone)]
pub struct HttpConnectivityCheck {
    url: String,
    client: Client,
}

impl HttpConnectivityCheck {
    pub fn new(url: impl Into<String>) -> crate::Result<Self> {
        let url = url.into().trim().to_string();
        if !crate::util::is_http_url(&url) {
            return Err(crate::Error::InvalidInput(format!(
                "Connectivity URL must include http:// or https://: {url}"
            )));
        }
        let client = Client::builder()
            .timeout(CHECK_TIMEOUT)
            .build()
            .map_err(|error| crate::Error::InvalidInput(error.to_string()))?;
        Ok(Self { url, client })
    }

    /// Any HTTP response counts as connected; transport errors do not.
    pub async fn check(&self) -> bool {
        match self.client.head(&self.url).send().await {
            Ok(_) => true,
            Err(error) => {
                tracing::debug!("Connectivity check failed: {}", error);
                false
            }
        }
    }

    /// Check on every interval tick, feeding `monitor`, until the task is
    /// aborted.
    pub async fn run(self, monitor: NetworkMonitor) {
        let mut ticker = tokio::time::interval(CHECK_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            monitor.set_connected(self.check().await);
        }
    }
}
