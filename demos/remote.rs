/* demos/remote.rs */

//! Follows a configuration document in a remote store.
//!
//! ```sh
//! LIVECONF_TYPE=consul LIVECONF_PATH=services/api/config cargo run --example remote --features full
//! ```

use std::collections::HashMap;

use liveconf::{
	FieldKind, Loader, LoaderOptions, PreProcess, ProviderKind, Schema, SchemaDescriptor,
	ValidateConfig,
};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServiceConfig {
	name: String,
	#[serde(default)]
	replicas: u32,
	#[serde(default)]
	labels: HashMap<String, String>,
}

impl Schema for ServiceConfig {
	fn schema() -> SchemaDescriptor {
		SchemaDescriptor::new()
			.field("name", FieldKind::String)
			.field("replicas", FieldKind::Integer)
			.field("labels", FieldKind::map(FieldKind::String))
	}
}

impl PreProcess for ServiceConfig {}
impl ValidateConfig for ServiceConfig {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt().init();

	let kind: ProviderKind = std::env::var("LIVECONF_TYPE")
		.unwrap_or_else(|_| "consul".to_string())
		.parse()?;
	let path = std::env::var("LIVECONF_PATH").unwrap_or_else(|_| "liveconf/demo".to_string());
	let mut options = LoaderOptions::new(kind, path).watch(true);
	if let Ok(endpoints) = std::env::var("LIVECONF_ENDPOINTS") {
		options = options.endpoints(endpoints.split(',').map(str::trim));
	}
	println!("Using {kind} at {:?}", options.provider_config().resolved_endpoints());

	let loader = Loader::<ServiceConfig>::builder()
		.options(options)
		.on_change(|config| {
			println!("Reloaded: {config:?}");
			Ok(())
		})
		.build()
		.await?;

	match loader.load().await {
		Ok(config) => println!("Initial: {config:?}"),
		Err(e) if e.is_not_found() => {
			println!("Nothing stored yet: {e}");
			loader.watch().await?;
		}
		Err(e) => return Err(e.into()),
	}

	println!("Watching; press Ctrl-C to stop");
	tokio::signal::ctrl_c().await?;
	loader.stop().await;
	Ok(())
}
