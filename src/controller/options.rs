/* src/controller/options.rs */

use serde::Deserialize;

use crate::provider::{ProviderConfig, ProviderKind};

/// How a [`Loader`](super::Loader) finds and follows its configuration.
///
/// Deserializable so host applications can embed it in their own settings:
///
/// ```yaml
/// type: consul
/// path: services/api/config
/// endpoints: ["consul-1:8500"]
/// watch: true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoaderOptions {
	#[serde(rename = "type")]
	pub kind: ProviderKind,
	/// File path, Consul key, etcd key or ZooKeeper node path.
	pub path: String,
	/// Empty means the defaults of `kind`.
	pub endpoints: Vec<String>,
	/// Start watching after the first successful load.
	pub watch: bool,
}

impl LoaderOptions {
	pub fn new(kind: ProviderKind, path: impl Into<String>) -> Self {
		Self {
			kind,
			path: path.into(),
			..Default::default()
		}
	}

	pub fn file(path: impl Into<String>) -> Self {
		Self::new(ProviderKind::File, path)
	}

	pub fn consul(key: impl Into<String>) -> Self {
		Self::new(ProviderKind::Consul, key)
	}

	pub fn etcd(key: impl Into<String>) -> Self {
		Self::new(ProviderKind::Etcd, key)
	}

	pub fn zookeeper(path: impl Into<String>) -> Self {
		Self::new(ProviderKind::Zookeeper, path)
	}

	pub fn endpoints<I, S>(mut self, endpoints: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.endpoints = endpoints.into_iter().map(Into::into).collect();
		self
	}

	pub fn watch(mut self, watch: bool) -> Self {
		self.watch = watch;
		self
	}

	/// The provider selection part of these options.
	pub fn provider_config(&self) -> ProviderConfig {
		ProviderConfig {
			kind: self.kind,
			path: self.path.clone(),
			endpoints: self.endpoints.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builder_style() {
		let options = LoaderOptions::etcd("/app/config")
			.endpoints(["etcd-1:2379", "etcd-2:2379"])
			.watch(true);
		assert_eq!(options.kind, ProviderKind::Etcd);
		assert!(options.watch);
		assert_eq!(options.provider_config().resolved_endpoints(), ["etcd-1:2379", "etcd-2:2379"]);
	}

	#[test]
	fn deserializes_from_yaml() {
		let options: LoaderOptions =
			serde_yaml::from_str("type: Consul\npath: services/api\nwatch: true\n").unwrap();
		assert_eq!(options.kind, ProviderKind::Consul);
		assert_eq!(options.provider_config().resolved_endpoints(), ["localhost:8500"]);
		assert!(options.watch);
	}

	#[test]
	fn kind_defaults_to_file() {
		let options: LoaderOptions = serde_yaml::from_str("path: app.yaml\n").unwrap();
		assert_eq!(options.kind, ProviderKind::File);
		assert!(!options.watch);
	}
}
