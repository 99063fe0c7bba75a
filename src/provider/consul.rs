/* src/provider/consul.rs */

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{
	CHANGE_BUFFER, ChangeEvent, Lifecycle, Provider, ProviderError, RETRY_BACKOFF, notify_change,
};

/// How long the server may hold a blocking query open.
pub const BLOCKING_WAIT: Duration = Duration::from_secs(10);

const TOKEN_ENV: &str = "CONSUL_HTTP_TOKEN";
const TOKEN_HEADER: &str = "X-Consul-Token";
const INDEX_HEADER: &str = "X-Consul-Index";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A Consul KV key, watched with blocking queries.
#[derive(Debug)]
pub struct ConsulProvider {
	client: KvClient,
	lifecycle: Lifecycle,
}

#[derive(Debug, Clone)]
struct KvClient {
	http: reqwest::Client,
	url: String,
	key: String,
	token: Option<String>,
}

impl ConsulProvider {
	/// Creates a provider for `key` on the first of `endpoints`.
	///
	/// The ACL token is read from `CONSUL_HTTP_TOKEN` when set.
	pub fn new(key: impl Into<String>, endpoints: Vec<String>) -> Result<Self, ProviderError> {
		let token = std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty());
		Self::with_token(key, endpoints, token)
	}

	pub fn with_token(
		key: impl Into<String>,
		endpoints: Vec<String>,
		token: Option<String>,
	) -> Result<Self, ProviderError> {
		let key = key.into();
		let endpoint = endpoints
			.first()
			.ok_or_else(|| ProviderError::Connection("no consul endpoint configured".to_string()))?;
		let http = reqwest::Client::builder().build()?;
		Ok(Self {
			client: KvClient {
				http,
				url: kv_url(endpoint, &key),
				key,
				token,
			},
			lifecycle: Lifecycle::default(),
		})
	}
}

impl KvClient {
	/// Reads the raw value. With `index`, blocks until the key's index passes it
	/// or [`BLOCKING_WAIT`] elapses.
	async fn fetch(&self, index: Option<u64>) -> Result<(Vec<u8>, u64), ProviderError> {
		let mut request = self.http.get(&self.url).query(&[("raw", "")]);
		match index {
			Some(index) => {
				request = request
					.query(&[("index", index.to_string()), ("wait", wait_param(BLOCKING_WAIT))])
					.timeout(BLOCKING_WAIT + REQUEST_TIMEOUT);
			}
			None => request = request.timeout(REQUEST_TIMEOUT),
		}
		if let Some(token) = &self.token {
			request = request.header(TOKEN_HEADER, token);
		}

		let response = request.send().await?;
		match response.status() {
			StatusCode::NOT_FOUND => return Err(ProviderError::NotFound(self.key.clone())),
			status if !status.is_success() => {
				return Err(ProviderError::Connection(format!(
					"consul returned {status} for key {}",
					self.key
				)));
			}
			_ => {}
		}

		let index = response
			.headers()
			.get(INDEX_HEADER)
			.and_then(|v| v.to_str().ok())
			.and_then(|v| v.parse().ok())
			.unwrap_or(0);
		let body = response.bytes().await?;
		Ok((body.to_vec(), index))
	}
}

#[async_trait]
impl Provider for ConsulProvider {
	fn name(&self) -> &'static str {
		"consul"
	}

	fn location(&self) -> &str {
		&self.client.key
	}

	async fn load(&self) -> Result<Vec<u8>, ProviderError> {
		self.lifecycle.ensure_open().await?;
		let (data, _) = self.client.fetch(None).await?;
		Ok(data)
	}

	async fn watch(
		&self,
		cancel: CancellationToken,
	) -> Result<Option<mpsc::Receiver<ChangeEvent>>, ProviderError> {
		self.lifecycle.ensure_open().await?;
		let (tx, rx) = mpsc::channel(CHANGE_BUFFER);
		let token = self.lifecycle.watch_token(&cancel);
		tokio::spawn(watch_loop(self.client.clone(), tx, token));
		Ok(Some(rx))
	}

	async fn close(&self) -> Result<(), ProviderError> {
		self.lifecycle.close().await;
		Ok(())
	}
}

async fn watch_loop(client: KvClient, tx: mpsc::Sender<ChangeEvent>, cancel: CancellationToken) {
	tracing::info!(backend = "consul", key = %client.key, "watching config key");
	let mut tracker = IndexTracker::default();

	loop {
		let result = tokio::select! {
			_ = cancel.cancelled() => break,
			result = client.fetch(Some(tracker.last)) => result,
		};

		match result {
			Ok((data, index)) => {
				if tracker.observe(index) {
					tracing::debug!(backend = "consul", key = %client.key, index, "config key changed");
					if !notify_change(&tx, ChangeEvent::with_data(data)) {
						break;
					}
				}
			}
			Err(ProviderError::NotFound(_)) => {
				tracing::warn!(backend = "consul", key = %client.key, "config key deleted, stopping watch");
				break;
			}
			Err(e) => {
				tracing::warn!(backend = "consul", key = %client.key, error = %e, "blocking query failed");
				tokio::select! {
					_ = cancel.cancelled() => break,
					_ = tokio::time::sleep(RETRY_BACKOFF) => {}
				}
			}
		}
	}

	tracing::info!(backend = "consul", key = %client.key, "stopped watching config key");
}

/// Decides which blocking-query results are real changes.
///
/// The first result only establishes the baseline. After that a strictly larger
/// index is a change. The stored index follows every result.
#[derive(Debug, Default)]
struct IndexTracker {
	last: u64,
	primed: bool,
}

impl IndexTracker {
	fn observe(&mut self, index: u64) -> bool {
		let changed = self.primed && index > self.last;
		self.last = index;
		self.primed = true;
		changed
	}
}

fn kv_url(endpoint: &str, key: &str) -> String {
	let endpoint = endpoint.trim_end_matches('/');
	let base = if endpoint.contains("://") {
		endpoint.to_string()
	} else {
		format!("http://{endpoint}")
	};
	format!("{base}/v1/kv/{}", key.trim_start_matches('/'))
}

fn wait_param(wait: Duration) -> String {
	format!("{}s", wait.as_secs())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builds_kv_urls() {
		assert_eq!(kv_url("localhost:8500", "app/config"), "http://localhost:8500/v1/kv/app/config");
		assert_eq!(
			kv_url("https://consul.internal/", "/app"),
			"https://consul.internal/v1/kv/app"
		);
	}

	#[test]
	fn first_result_is_baseline() {
		let mut tracker = IndexTracker::default();
		assert!(!tracker.observe(42));
		assert_eq!(tracker.last, 42);
	}

	#[test]
	fn only_larger_index_is_change() {
		let mut tracker = IndexTracker::default();
		tracker.observe(10);
		assert!(!tracker.observe(10));
		assert!(tracker.observe(11));
		assert!(!tracker.observe(5));
		// Follows the reset, so the next increase counts again.
		assert_eq!(tracker.last, 5);
		assert!(tracker.observe(6));
	}

	#[test]
	fn wait_is_seconds() {
		assert_eq!(wait_param(BLOCKING_WAIT), "10s");
	}

	#[test]
	fn requires_an_endpoint() {
		assert!(ConsulProvider::with_token("app", Vec::new(), None).is_err());
	}

	#[tokio::test]
	async fn closed_provider_rejects_calls() {
		let provider =
			ConsulProvider::with_token("app", vec!["localhost:8500".to_string()], None).unwrap();
		provider.close().await.unwrap();
		assert!(matches!(provider.load().await, Err(ProviderError::Closed)));
		assert!(matches!(
			provider.watch(CancellationToken::new()).await,
			Err(ProviderError::Closed)
		));
	}
}
