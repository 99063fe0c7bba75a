/* demos/basic.rs */

use std::fs;
use std::time::Duration;

use liveconf::{
	FieldKind, Loader, LoaderOptions, PreProcess, Schema, SchemaDescriptor, ValidateConfig,
	validate_with,
};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
struct AppConfig {
	#[validate(length(min = 1))]
	name: String,
	#[serde(default)]
	port: u16,
}

impl Schema for AppConfig {
	fn schema() -> SchemaDescriptor {
		SchemaDescriptor::new()
			.field("name", FieldKind::String)
			.field("port", FieldKind::Integer)
	}
}

impl PreProcess for AppConfig {
	fn pre_process(&mut self) {
		if self.port == 0 {
			self.port = 8080;
		}
	}
}

impl ValidateConfig for AppConfig {
	fn validate_config(&self) -> Result<(), liveconf::ConfigError> {
		validate_with(self)
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

	let config_path = std::env::temp_dir().join("liveconf_basic.yaml");
	fs::write(&config_path, "name: live-demo\nport: ${DEMO_PORT:-8080}\n")?;
	println!("Created {}", config_path.display());

	let loader = Loader::<AppConfig>::builder()
		.options(LoaderOptions::file(config_path.to_string_lossy()).watch(true))
		.on_change(|config| {
			println!("Reloaded: {config:?}");
			Ok(())
		})
		.on_error(|e| eprintln!("Rejected edit:\n{e}"))
		.build()
		.await?;

	let config = loader.load().await?;
	println!("Initial: {config:?}");

	tokio::time::sleep(Duration::from_millis(200)).await;
	println!("Updating config...");
	fs::write(&config_path, "name: live-demo-updated\nport: 9090\n")?;
	tokio::time::sleep(Duration::from_millis(500)).await;

	println!("Writing a typo...");
	fs::write(&config_path, "name: live-demo\nprot: 9090\n")?;
	tokio::time::sleep(Duration::from_millis(500)).await;

	loader.stop().await;
	fs::remove_file(&config_path)?;
	Ok(())
}
