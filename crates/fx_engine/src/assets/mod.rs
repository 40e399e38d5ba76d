//! Effect resource cache
//!
//! Resolves effect names to loaded, shared [`Effect`] instances. Effects are
//! parsed once from their RON reflection documents and handed out as `Arc`s;
//! a name that was never loaded is a load-time failure the caller must treat
//! as such, since an unresolvable effect means the material cannot render.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::render::effect::{Effect, EffectDesc, EffectError};

/// Errors produced while loading or resolving effect resources
#[derive(Debug, Error)]
pub enum AssetError {
    /// The requested effect was never loaded into the cache
    #[error("effect is not loaded: {0}")]
    NotFound(String),

    /// The effect description file could not be read
    #[error("failed to read effect description: {0}")]
    Io(#[from] std::io::Error),

    /// The effect description failed to parse
    #[error("failed to parse effect description: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// The effect description parsed but was structurally invalid
    #[error("invalid effect description: {0}")]
    Effect(#[from] EffectError),
}

/// Name-keyed cache of loaded effects
#[derive(Debug, Default)]
pub struct ResourceCache {
    effects: HashMap<String, Arc<Effect>>,
}

impl ResourceCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a RON effect description and register the effect under its name
    pub fn load_effect_str(&mut self, source: &str) -> Result<Arc<Effect>, AssetError> {
        let desc: EffectDesc = ron::from_str(source)?;
        let effect = Arc::new(Effect::from_desc(desc)?);
        log::info!("loaded effect '{}'", effect.name());
        self.effects.insert(effect.name().to_string(), effect.clone());
        Ok(effect)
    }

    /// Load an effect description from a RON file
    pub fn load_effect_file(&mut self, path: impl AsRef<Path>) -> Result<Arc<Effect>, AssetError> {
        let source = std::fs::read_to_string(path)?;
        self.load_effect_str(&source)
    }

    /// Register an already-constructed effect (procedural or test effects)
    pub fn insert_effect(&mut self, effect: Effect) -> Arc<Effect> {
        let effect = Arc::new(effect);
        self.effects.insert(effect.name().to_string(), effect.clone());
        effect
    }

    /// Resolve a loaded effect by name
    ///
    /// Absence is a load-time failure: the material or node asking for the
    /// effect cannot be constructed without it.
    pub fn effect(&self, name: &str) -> Result<Arc<Effect>, AssetError> {
        self.effects
            .get(name)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(name.to_string()))
    }

    /// Whether an effect with the given name is loaded
    pub fn contains(&self, name: &str) -> bool {
        self.effects.contains_key(name)
    }
}
