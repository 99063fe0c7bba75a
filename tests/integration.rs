/* tests/integration.rs */

#![cfg(feature = "file")]

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use liveconf::loader::ConfigError;
use liveconf::{
	FieldKind, Loader, LoaderOptions, PreProcess, Schema, SchemaDescriptor, ValidateConfig,
	load_config_file, load_config_with_loader,
};
use serde::Deserialize;
use tempfile::tempdir;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct ServiceConfig {
	name: String,
	#[serde(default)]
	workers: u32,
	#[serde(default)]
	debug: bool,
	#[serde(skip)]
	source: String,
}

impl Schema for ServiceConfig {
	fn schema() -> SchemaDescriptor {
		SchemaDescriptor::new()
			.field("name", FieldKind::String)
			.field("workers", FieldKind::Integer)
			.field("debug", FieldKind::Bool)
	}
}

impl PreProcess for ServiceConfig {
	fn set_context(&mut self, context: &str) {
		self.source = context.to_string();
	}
}

impl ValidateConfig for ServiceConfig {
	fn validate_config(&self) -> Result<(), ConfigError> {
		if self.workers > 64 {
			return Err(ConfigError::Validation(format!("too many workers: {}", self.workers)));
		}
		Ok(())
	}
}

/// Time for the OS watcher to settle before and after writes.
const SETTLE: Duration = Duration::from_millis(200);

async fn counting_loader(
	path: &std::path::Path,
) -> (Loader<ServiceConfig>, Arc<AtomicUsize>, mpsc::UnboundedReceiver<ServiceConfig>) {
	let count = Arc::new(AtomicUsize::new(0));
	let (tx, rx) = mpsc::unbounded_channel();
	let counter = count.clone();
	let loader = Loader::builder()
		.options(LoaderOptions::file(path.to_string_lossy()).watch(true))
		.on_change(move |cfg: ServiceConfig| {
			counter.fetch_add(1, Ordering::SeqCst);
			let _ = tx.send(cfg);
			Ok(())
		})
		.build()
		.await
		.unwrap();
	(loader, count, rx)
}

#[tokio::test]
async fn loads_yaml_and_json_files() {
	let dir = tempdir().unwrap();
	let yaml = dir.path().join("service.yaml");
	let json = dir.path().join("service.json");
	fs::write(&yaml, "name: api\nworkers: 4\n").unwrap();
	fs::write(&json, r#"{"name": "api", "workers": "4", "debug": "true"}"#).unwrap();

	let from_yaml: ServiceConfig = load_config_file(yaml.to_string_lossy()).await.unwrap();
	let from_json: ServiceConfig = load_config_file(json.to_string_lossy()).await.unwrap();
	assert_eq!(from_yaml.workers, 4);
	assert_eq!(from_json.workers, 4);
	assert!(from_json.debug);
	assert_eq!(from_yaml.source, yaml.to_string_lossy());
}

#[tokio::test]
async fn missing_file_is_not_found() {
	let dir = tempdir().unwrap();
	let path = dir.path().join("absent.yaml");
	let err = load_config_file::<ServiceConfig>(path.to_string_lossy()).await.unwrap_err();
	assert!(err.is_not_found(), "{err}");
}

#[tokio::test]
async fn domain_validation_rejects_file() {
	let dir = tempdir().unwrap();
	let path = dir.path().join("service.yaml");
	fs::write(&path, "name: api\nworkers: 100\n").unwrap();
	let err = load_config_file::<ServiceConfig>(path.to_string_lossy()).await.unwrap_err();
	assert!(matches!(err, ConfigError::Validation(_)));
}

#[tokio::test]
async fn file_change_triggers_reload() {
	let dir = tempdir().unwrap();
	let path = dir.path().join("service.yaml");
	fs::write(&path, "name: v1\n").unwrap();

	let (config, loader) =
		load_config_with_loader::<ServiceConfig>(LoaderOptions::file(path.to_string_lossy()).watch(true))
			.await
			.unwrap();
	assert_eq!(config.name, "v1");
	assert!(loader.is_watching().await);

	let (tx, mut rx) = mpsc::unbounded_channel();
	loader.set_on_change(move |cfg: ServiceConfig| {
		let _ = tx.send(cfg);
		Ok(())
	});

	tokio::time::sleep(SETTLE).await;
	fs::write(&path, "name: v2\nworkers: 2\n").unwrap();

	let reloaded = tokio::time::timeout(Duration::from_secs(3), rx.recv())
		.await
		.expect("no reload")
		.unwrap();
	assert_eq!(reloaded.name, "v2");
	assert_eq!(reloaded.workers, 2);

	loader.stop().await;
}

#[tokio::test]
async fn rapid_writes_are_coalesced() {
	let dir = tempdir().unwrap();
	let path = dir.path().join("service.yaml");
	fs::write(&path, "name: v1\n").unwrap();

	let (loader, count, mut rx) = counting_loader(&path).await;
	loader.load().await.unwrap();
	tokio::time::sleep(SETTLE).await;

	fs::write(&path, "name: v2\n").unwrap();
	tokio::time::sleep(Duration::from_millis(20)).await;
	fs::write(&path, "name: v3\n").unwrap();

	tokio::time::sleep(Duration::from_millis(600)).await;
	assert_eq!(count.load(Ordering::SeqCst), 1);
	assert_eq!(rx.recv().await.unwrap().name, "v3");

	loader.stop().await;
}

#[tokio::test]
async fn spaced_writes_reload_separately() {
	let dir = tempdir().unwrap();
	let path = dir.path().join("service.yaml");
	fs::write(&path, "name: v1\n").unwrap();

	let (loader, count, _rx) = counting_loader(&path).await;
	loader.load().await.unwrap();
	tokio::time::sleep(SETTLE).await;

	fs::write(&path, "name: v2\n").unwrap();
	tokio::time::sleep(Duration::from_millis(400)).await;
	fs::write(&path, "name: v3\n").unwrap();

	tokio::time::sleep(Duration::from_millis(600)).await;
	assert_eq!(count.load(Ordering::SeqCst), 2);

	loader.stop().await;
}

#[tokio::test]
async fn invalid_edit_keeps_watching() {
	let dir = tempdir().unwrap();
	let path = dir.path().join("service.yaml");
	fs::write(&path, "name: v1\n").unwrap();

	let (loader, count, mut rx) = counting_loader(&path).await;
	loader.load().await.unwrap();
	tokio::time::sleep(SETTLE).await;

	fs::write(&path, "name: v2\nwrokers: 3\n").unwrap();
	tokio::time::sleep(Duration::from_millis(400)).await;
	assert_eq!(count.load(Ordering::SeqCst), 0);
	assert!(loader.is_watching().await);

	fs::write(&path, "name: v3\nworkers: 3\n").unwrap();
	let reloaded = tokio::time::timeout(Duration::from_secs(3), rx.recv())
		.await
		.expect("no reload after fix")
		.unwrap();
	assert_eq!(reloaded.name, "v3");

	loader.stop().await;
}

#[tokio::test]
async fn stop_ends_file_watch() {
	let dir = tempdir().unwrap();
	let path = dir.path().join("service.yaml");
	fs::write(&path, "name: v1\n").unwrap();

	let (loader, count, _rx) = counting_loader(&path).await;
	loader.load().await.unwrap();
	tokio::time::sleep(SETTLE).await;
	loader.stop().await;
	assert!(!loader.is_watching().await);

	fs::write(&path, "name: v2\n").unwrap();
	tokio::time::sleep(Duration::from_millis(400)).await;
	assert_eq!(count.load(Ordering::SeqCst), 0);
	assert!(matches!(loader.load().await, Err(ConfigError::Stopped)));
}
