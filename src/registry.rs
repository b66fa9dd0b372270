//! Named sink schemes and encoders available to a logger build.
//!
//! A [`Registry`] is an explicit value handed to the build step rather than
//! process-wide state. Registering a name twice is a conflict unless the
//! registry was created with [`Registry::allow_reregistration`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::encoder::{self, Encoder};
use crate::sink::{FileSinkFactory, SinkFactory};
use crate::{Error, Result};

/// Sink schemes and encoders by name.
#[derive(Clone)]
pub struct Registry {
    schemes: HashMap<String, Arc<dyn SinkFactory>>,
    encoders: HashMap<String, Arc<dyn Encoder>>,
    allow_reregistration: bool,
}

impl Registry {
    /// A registry holding the `file` scheme and the `json`, `console` and
    /// `text` encoders.
    pub fn new() -> Self {
        let mut schemes: HashMap<String, Arc<dyn SinkFactory>> = HashMap::new();
        schemes.insert("file".to_string(), Arc::new(FileSinkFactory));

        let mut encoders = HashMap::new();
        for name in ["json", "console", "text"] {
            if let Some(enc) = encoder::builtin(name) {
                encoders.insert(name.to_string(), enc);
            }
        }

        Self {
            schemes,
            encoders,
            allow_reregistration: false,
        }
    }

    /// Let later registrations replace earlier ones instead of failing.
    pub fn allow_reregistration(mut self, allow: bool) -> Self {
        self.allow_reregistration = allow;
        self
    }

    /// Register a sink factory for URLs of `scheme` (case-insensitive).
    pub fn register_scheme(
        &mut self,
        scheme: &str,
        factory: Arc<dyn SinkFactory>,
    ) -> Result<()> {
        let scheme = normalize_scheme(scheme)?;
        if self.schemes.contains_key(&scheme) && !self.allow_reregistration {
            return Err(Error::SchemeConflict(scheme));
        }
        self.schemes.insert(scheme, factory);
        Ok(())
    }

    /// Register an encoder under `name`.
    pub fn register_encoder(&mut self, name: &str, encoder: Arc<dyn Encoder>) -> Result<()> {
        if name.is_empty() {
            return Err(Error::Config("encoder name must not be empty".to_string()));
        }
        if self.encoders.contains_key(name) && !self.allow_reregistration {
            return Err(Error::EncoderConflict(name.to_string()));
        }
        self.encoders.insert(name.to_string(), encoder);
        Ok(())
    }

    /// Factory registered for `scheme`.
    pub fn sink_factory(&self, scheme: &str) -> Option<Arc<dyn SinkFactory>> {
        self.schemes.get(&scheme.to_ascii_lowercase()).cloned()
    }

    /// Whether `scheme` has a factory.
    pub fn has_scheme(&self, scheme: &str) -> bool {
        self.schemes.contains_key(&scheme.to_ascii_lowercase())
    }

    /// Encoder registered under `name`.
    pub fn encoder(&self, name: &str) -> Option<Arc<dyn Encoder>> {
        self.encoders.get(name).cloned()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut schemes: Vec<_> = self.schemes.keys().collect();
        schemes.sort();
        let mut encoders: Vec<_> = self.encoders.keys().collect();
        encoders.sort();
        f.debug_struct("Registry")
            .field("schemes", &schemes)
            .field("encoders", &encoders)
            .field("allow_reregistration", &self.allow_reregistration)
            .finish()
    }
}

/// Validate a URL scheme (RFC 3986: a letter, then letters, digits, `+`,
/// `-` or `.`) and lowercase it.
fn normalize_scheme(scheme: &str) -> Result<String> {
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid {
        return Err(Error::Config(format!("invalid sink scheme: {:?}", scheme)));
    }
    Ok(scheme.to_ascii_lowercase())
}
