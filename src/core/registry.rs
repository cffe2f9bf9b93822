//! Name → encoder factory registry
//!
//! The composition root can own an [`EncoderRegistry`] and pass it to
//! [`LoggerBuilder::build_with`](crate::LoggerBuilder::build_with). A global
//! registry with the built-in `plain` and `json` formats backs
//! [`LoggerBuilder::build`](crate::LoggerBuilder::build) and
//! [`register_encoder`] for crates that register formats at startup.

use super::encoder::Encoder;
use super::encoder_config::EncoderConfig;
use super::error::{LoggerError, Result};
use crate::encoders::{JsonEncoder, PlainEncoder, JSON, PLAIN};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds encoder prototypes for one format.
pub trait EncoderFactory: Send + Sync {
    /// Configuration used when the caller does not supply one
    fn default_config(&self) -> EncoderConfig {
        EncoderConfig::default()
    }

    fn build(&self, config: EncoderConfig) -> Box<dyn Encoder>;
}

impl<F> EncoderFactory for F
where
    F: Fn(EncoderConfig) -> Box<dyn Encoder> + Send + Sync,
{
    fn build(&self, config: EncoderConfig) -> Box<dyn Encoder> {
        self(config)
    }
}

pub struct PlainFormat;

impl EncoderFactory for PlainFormat {
    fn default_config(&self) -> EncoderConfig {
        EncoderConfig::plain()
    }

    fn build(&self, config: EncoderConfig) -> Box<dyn Encoder> {
        Box::new(PlainEncoder::new(config))
    }
}

pub struct JsonFormat;

impl EncoderFactory for JsonFormat {
    fn default_config(&self) -> EncoderConfig {
        EncoderConfig::json()
    }

    fn build(&self, config: EncoderConfig) -> Box<dyn Encoder> {
        Box::new(JsonEncoder::new(config))
    }
}

pub struct EncoderRegistry {
    factories: RwLock<HashMap<String, Arc<dyn EncoderFactory>>>,
    default_name: String,
}

impl EncoderRegistry {
    /// Empty registry whose default name is `plain`
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
            default_name: PLAIN.to_string(),
        }
    }

    /// Registry preloaded with `plain` and `json`
    pub fn with_builtin_formats() -> Self {
        let registry = Self::new();
        registry.register(PLAIN, PlainFormat);
        registry.register(JSON, JsonFormat);
        registry
    }

    /// Name resolved when an empty name is requested
    #[must_use]
    pub fn with_default_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = name.into();
        self
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Register a factory. A later registration under the same name wins.
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: EncoderFactory + 'static,
    {
        self.factories.write().insert(name.into(), Arc::new(factory));
    }

    /// Look up a factory; an empty name means the default name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn EncoderFactory>> {
        let name = if name.is_empty() {
            self.default_name.as_str()
        } else {
            name
        };
        self.factories
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| LoggerError::driver_not_found(name))
    }

    /// Resolve and build in one step, using the factory's default
    /// configuration when `config` is `None`.
    pub fn build(&self, name: &str, config: Option<EncoderConfig>) -> Result<Box<dyn Encoder>> {
        let factory = self.resolve(name)?;
        let config = config.unwrap_or_else(|| factory.default_config());
        Ok(factory.build(config))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for EncoderRegistry {
    fn default() -> Self {
        Self::with_builtin_formats()
    }
}

impl std::fmt::Debug for EncoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncoderRegistry")
            .field("names", &self.names())
            .field("default_name", &self.default_name)
            .finish()
    }
}

static GLOBAL_REGISTRY: Lazy<EncoderRegistry> = Lazy::new(EncoderRegistry::with_builtin_formats);

pub fn global_registry() -> &'static EncoderRegistry {
    &GLOBAL_REGISTRY
}

/// Register a format in the global registry.
pub fn register_encoder<F>(name: impl Into<String>, factory: F)
where
    F: EncoderFactory + 'static,
{
    GLOBAL_REGISTRY.register(name, factory);
}

/// Resolve a format from the global registry.
pub fn resolve_encoder(name: &str) -> Result<Arc<dyn EncoderFactory>> {
    GLOBAL_REGISTRY.resolve(name)
}
