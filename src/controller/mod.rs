/* src/controller/mod.rs */

//!
//! The [`Loader`]: ties a provider to the processing pipeline and follows changes.

mod loader;
mod options;

pub use loader::{
	CallbackError, Loader, LoaderBuilder, OnError, load_config, load_config_file,
	load_config_with_loader,
};
pub use options::LoaderOptions;
