/* src/controller/loader.rs */

//!
//! Configuration controller: one provider, one pipeline, at most one watch task.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::{Mutex, OnceCell, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::LoaderOptions;
use crate::loader::{ConfigError, Pipeline, PreProcess, Schema, Stage, ValidateConfig, VarSource};
use crate::provider::{self, ChangeEvent, Provider};

/// Error type returned by change callbacks.
pub type CallbackError = Box<dyn StdError + Send + Sync>;

/// Receives each successfully reloaded configuration.
struct OnChange<T>(Box<dyn Fn(T) -> Result<(), CallbackError> + Send + Sync>);

/// Receives each failed reload during a watch.
pub type OnError = Arc<dyn Fn(&ConfigError) + Send + Sync>;

struct Shared<T> {
	provider: Arc<dyn Provider>,
	pipeline: Pipeline<T>,
	on_change: ArcSwapOption<OnChange<T>>,
	on_error: Option<OnError>,
}

/// Loads a configuration value and optionally follows changes.
///
/// The loader does not cache the value. Each successful reload is handed to the
/// change callback; a failed reload is logged (and passed to the error callback)
/// while the watch continues.
pub struct Loader<T> {
	shared: Arc<Shared<T>>,
	watch_on_load: bool,
	cancel: CancellationToken,
	task: Mutex<Option<JoinHandle<()>>>,
	stopped: OnceCell<()>,
}

/// Builder for [`Loader`].
pub struct LoaderBuilder<T> {
	options: Option<LoaderOptions>,
	provider: Option<Arc<dyn Provider>>,
	watch: Option<bool>,
	on_change: Option<OnChange<T>>,
	on_error: Option<OnError>,
	stages: Vec<Stage<T>>,
	vars: Option<Arc<dyn VarSource>>,
}

impl<T> LoaderBuilder<T>
where
	T: Schema + PreProcess + ValidateConfig,
{
	pub fn new() -> Self {
		Self {
			options: None,
			provider: None,
			watch: None,
			on_change: None,
			on_error: None,
			stages: Vec::new(),
			vars: None,
		}
	}

	/// Selects and connects the provider from `options` at build time.
	pub fn options(mut self, options: LoaderOptions) -> Self {
		self.options = Some(options);
		self
	}

	/// Uses an already constructed provider. Takes precedence over `options`.
	pub fn provider(mut self, provider: impl Provider + 'static) -> Self {
		self.provider = Some(Arc::new(provider));
		self
	}

	/// Overrides `LoaderOptions::watch`.
	pub fn watch(mut self, watch: bool) -> Self {
		self.watch = Some(watch);
		self
	}

	pub fn on_change<F>(mut self, callback: F) -> Self
	where
		F: Fn(T) -> Result<(), CallbackError> + Send + Sync + 'static,
	{
		self.on_change = Some(OnChange(Box::new(callback)));
		self
	}

	pub fn on_error<F>(mut self, callback: F) -> Self
	where
		F: Fn(&ConfigError) + Send + Sync + 'static,
	{
		self.on_error = Some(Arc::new(callback));
		self
	}

	/// Appends a pipeline stage run after domain validation.
	pub fn stage<F>(mut self, stage: F) -> Self
	where
		F: Fn(T) -> Result<T, ConfigError> + Send + Sync + 'static,
	{
		self.stages.push(Arc::new(stage));
		self
	}

	/// Replaces the process environment as the source of `${VAR}` values.
	pub fn vars(mut self, vars: impl VarSource + 'static) -> Self {
		self.vars = Some(Arc::new(vars));
		self
	}

	pub async fn build(self) -> Result<Loader<T>, ConfigError> {
		let watch_option = self.options.as_ref().is_some_and(|o| o.watch);
		let provider: Arc<dyn Provider> = match (self.provider, &self.options) {
			(Some(provider), _) => provider,
			(None, Some(options)) => Arc::from(provider::connect(&options.provider_config()).await?),
			(None, None) => return Err(ConfigError::MissingPath),
		};

		let mut pipeline = Pipeline::new(provider.location()).with_stages(self.stages);
		if let Some(vars) = self.vars {
			pipeline = pipeline.with_vars(vars);
		}

		Ok(Loader {
			shared: Arc::new(Shared {
				provider,
				pipeline,
				on_change: ArcSwapOption::from(self.on_change.map(Arc::new)),
				on_error: self.on_error,
			}),
			watch_on_load: self.watch.unwrap_or(watch_option),
			cancel: CancellationToken::new(),
			task: Mutex::new(None),
			stopped: OnceCell::new(),
		})
	}
}

impl<T> Default for LoaderBuilder<T>
where
	T: Schema + PreProcess + ValidateConfig,
{
	fn default() -> Self {
		Self::new()
	}
}

impl<T> Loader<T>
where
	T: Schema + PreProcess + ValidateConfig,
{
	pub fn builder() -> LoaderBuilder<T> {
		LoaderBuilder::new()
	}

	/// Connects the provider selected by `options`.
	pub async fn connect(options: LoaderOptions) -> Result<Self, ConfigError> {
		LoaderBuilder::new().options(options).build().await
	}

	/// Wraps an existing provider.
	pub async fn with_provider(provider: impl Provider + 'static, watch: bool) -> Result<Self, ConfigError> {
		LoaderBuilder::new().provider(provider).watch(watch).build().await
	}

	/// Reads and processes the configuration.
	///
	/// When watching was requested and is not running yet, starts it after a
	/// successful load.
	pub async fn load(&self) -> Result<T, ConfigError> {
		if self.cancel.is_cancelled() {
			return Err(ConfigError::Stopped);
		}
		let config = self.shared.reload(None).await?;
		if self.watch_on_load && self.task.lock().await.is_none() {
			self.watch().await?;
		}
		Ok(config)
	}

	/// Starts the background watch task.
	///
	/// Only one watch task runs per loader; a second call fails with
	/// [`ConfigError::AlreadyWatching`]. When the provider cannot watch, the task
	/// idles until [`stop`](Self::stop).
	pub async fn watch(&self) -> Result<(), ConfigError> {
		let mut task = self.task.lock().await;
		if self.cancel.is_cancelled() {
			return Err(ConfigError::Stopped);
		}
		if task.is_some() {
			return Err(ConfigError::AlreadyWatching);
		}

		let provider = &self.shared.provider;
		let stream = provider
			.watch(self.cancel.clone())
			.await
			.map_err(|e| ConfigError::provider(provider.name(), e))?;

		let shared = self.shared.clone();
		let cancel = self.cancel.clone();
		*task = Some(tokio::spawn(async move {
			match stream {
				Some(rx) => shared.follow(rx, cancel).await,
				None => {
					tracing::warn!(backend = shared.provider.name(), "provider does not support watching");
					cancel.cancelled().await;
				}
			}
		}));
		Ok(())
	}

	/// Stops watching and closes the provider.
	///
	/// Safe to call repeatedly and concurrently: the provider is closed exactly
	/// once and every caller returns after the watch task has exited.
	pub async fn stop(&self) {
		self.stopped
			.get_or_init(|| async {
				self.cancel.cancel();
				let handle = self.task.lock().await.take();
				if let Some(handle) = handle
					&& let Err(e) = handle.await
					&& !e.is_cancelled()
				{
					tracing::warn!(error = %e, "watch task panicked");
				}

				let provider = &self.shared.provider;
				match provider.close().await {
					Ok(()) => tracing::info!(backend = provider.name(), "config loader stopped"),
					Err(e) => tracing::warn!(backend = provider.name(), error = %e, "failed to close provider"),
				}
			})
			.await;
	}

	/// Replaces the change callback. Takes effect for the next reload.
	pub fn set_on_change<F>(&self, callback: F)
	where
		F: Fn(T) -> Result<(), CallbackError> + Send + Sync + 'static,
	{
		self.shared.on_change.store(Some(Arc::new(OnChange(Box::new(callback)))));
	}

	pub fn clear_on_change(&self) {
		self.shared.on_change.store(None);
	}

	pub fn provider(&self) -> &dyn Provider {
		self.shared.provider.as_ref()
	}

	/// True while a watch task is running.
	pub async fn is_watching(&self) -> bool {
		self.task
			.lock()
			.await
			.as_ref()
			.is_some_and(|handle| !handle.is_finished())
	}
}

impl<T> Shared<T>
where
	T: Schema + PreProcess + ValidateConfig,
{
	/// Runs the pipeline over `data`, or over a fresh provider read when `None`.
	async fn reload(&self, data: Option<Vec<u8>>) -> Result<T, ConfigError> {
		let bytes = match data {
			Some(bytes) => bytes,
			None => self
				.provider
				.load()
				.await
				.map_err(|e| ConfigError::provider(self.provider.name(), e))?,
		};
		self.pipeline.run(&bytes)
	}

	async fn follow(&self, mut rx: mpsc::Receiver<ChangeEvent>, cancel: CancellationToken) {
		let backend = self.provider.name();
		let location = self.provider.location();
		tracing::info!(backend, location, "config watcher started");

		loop {
			let event = tokio::select! {
				_ = cancel.cancelled() => break,
				event = rx.recv() => event,
			};
			let Some(event) = event else {
				tracing::warn!(backend, location, "change stream ended, no further reloads");
				break;
			};
			tracing::debug!(backend, location, carries_data = event.data.is_some(), "change detected");

			match self.reload(event.data).await {
				Ok(config) => self.deliver(config),
				Err(e) => {
					tracing::error!(backend, location, error = %e, "failed to reload config");
					if let Some(on_error) = &self.on_error {
						on_error(&e);
					}
				}
			}
		}

		tracing::info!(backend, location, "config watcher stopped");
	}

	fn deliver(&self, config: T) {
		let backend = self.provider.name();
		match self.on_change.load_full() {
			Some(callback) => match (callback.0)(config) {
				Ok(()) => tracing::info!(backend, "configuration reloaded"),
				Err(e) => tracing::warn!(backend, error = %e, "config change callback failed"),
			},
			None => tracing::warn!(backend, "config changed but no change callback is set"),
		}
	}
}

impl<T> Drop for Loader<T> {
	fn drop(&mut self) {
		self.cancel.cancel();
		if let Ok(mut task) = self.task.try_lock()
			&& let Some(handle) = task.take()
		{
			handle.abort();
		}
	}
}

impl<T> fmt::Debug for Loader<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Loader")
			.field("backend", &self.shared.provider.name())
			.field("location", &self.shared.provider.location())
			.field("pipeline", &self.shared.pipeline)
			.field("watch_on_load", &self.watch_on_load)
			.field("stopped", &self.cancel.is_cancelled())
			.finish_non_exhaustive()
	}
}

/// Loads the configuration once and closes the provider.
pub async fn load_config<T>(options: LoaderOptions) -> Result<T, ConfigError>
where
	T: Schema + PreProcess + ValidateConfig,
{
	let loader = Loader::builder().options(options).watch(false).build().await?;
	let result = loader.load().await;
	loader.stop().await;
	result
}

/// Loads the configuration and returns the loader, watching if `options.watch`.
pub async fn load_config_with_loader<T>(options: LoaderOptions) -> Result<(T, Loader<T>), ConfigError>
where
	T: Schema + PreProcess + ValidateConfig,
{
	let loader = Loader::connect(options).await?;
	let config = loader.load().await?;
	Ok((config, loader))
}

/// Loads a local file once.
pub async fn load_config_file<T>(path: impl Into<String>) -> Result<T, ConfigError>
where
	T: Schema + PreProcess + ValidateConfig,
{
	load_config(LoaderOptions::file(path)).await
}
