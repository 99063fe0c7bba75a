/* src/loader/pipeline.rs */

use std::fmt;
use std::sync::Arc;

use super::env::{ProcessEnv, VarSource, expand_with};
use super::format::parse_document;
use super::{ConfigError, PreProcess, Schema, ValidateConfig};
use crate::validate::check_and_decode;

/// A caller-supplied processing step run after domain validation.
pub type Stage<T> = Arc<dyn Fn(T) -> Result<T, ConfigError> + Send + Sync>;

/// The synchronous bytes-to-config pipeline.
///
/// Steps, in order: parse, expand environment references, strict structural
/// validation, decode, [`PreProcess::set_context`], [`PreProcess::pre_process`],
/// [`ValidateConfig::validate_config`], then each stage in registration order.
pub struct Pipeline<T> {
	context: String,
	stages: Vec<Stage<T>>,
	vars: Arc<dyn VarSource>,
}

impl<T> Clone for Pipeline<T> {
	fn clone(&self) -> Self {
		Self {
			context: self.context.clone(),
			stages: self.stages.clone(),
			vars: self.vars.clone(),
		}
	}
}

impl<T> fmt::Debug for Pipeline<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Pipeline")
			.field("context", &self.context)
			.field("stages", &self.stages.len())
			.finish_non_exhaustive()
	}
}

impl<T> Pipeline<T>
where
	T: Schema + PreProcess + ValidateConfig,
{
	/// Creates a pipeline reading variables from the process environment.
	pub fn new(context: impl Into<String>) -> Self {
		Self {
			context: context.into(),
			stages: Vec::new(),
			vars: Arc::new(ProcessEnv),
		}
	}

	/// Replaces the variable source used for expansion.
	pub fn with_vars(mut self, vars: Arc<dyn VarSource>) -> Self {
		self.vars = vars;
		self
	}

	/// Appends a stage.
	pub fn stage<F>(mut self, stage: F) -> Self
	where
		F: Fn(T) -> Result<T, ConfigError> + Send + Sync + 'static,
	{
		self.stages.push(Arc::new(stage));
		self
	}

	pub(crate) fn with_stages(mut self, stages: Vec<Stage<T>>) -> Self {
		self.stages.extend(stages);
		self
	}

	pub fn context(&self) -> &str {
		&self.context
	}

	/// Runs every step over `bytes`.
	pub fn run(&self, bytes: &[u8]) -> Result<T, ConfigError> {
		let raw = parse_document(bytes)?;
		let expanded = expand_with(&raw, self.vars.as_ref());

		let (mut config, report) =
			check_and_decode::<T>(&expanded, &T::schema()).map_err(ConfigError::Structure)?;
		for warning in &report.warnings {
			tracing::warn!(
				context = %self.context,
				field = %warning.field,
				note = %warning.context,
				"{}",
				warning.message
			);
		}

		config.set_context(&self.context);
		config.pre_process();
		config.validate_config()?;

		for stage in &self.stages {
			config = stage(config)?;
		}
		Ok(config)
	}
}
