//! Runtime session state and options for the LUX loop machinery.
//!
//! # Overview
//!
//! The [`Session`] type holds what outlives a single built-in call:
//!
//! - the runtime [`Options`]
//! - a cache of parsed argument signatures, keyed by format string
//!
//! Built-ins declare their arguments with a constant format string, so the
//! same few hundred strings are parsed over and over. The session parses
//! each once and hands out shared, immutable [`ParamSpecList`]s that any
//! number of threads may bind against concurrently.

#![warn(missing_docs)]

use std::sync::Arc;

use lux_signature::{bind, parse, ArgumentError, BindConfig, Binding, GrammarError, ParamSpecList};
use lux_value::{Value, ValueAllocator};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Runtime options that can be set from configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Cache parsed signatures.
    pub cache_signatures: bool,
    /// Number of signatures cached before the cache is cleared.
    pub signature_cache_capacity: usize,
    /// Binder settings.
    pub bind: BindConfig,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            cache_signatures: true,
            signature_cache_capacity: 256,
            bind: BindConfig::default(),
        }
    }
}

impl Options {
    /// Reads options from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfig`] for malformed JSON.
    pub fn from_json(text: &str) -> Result<Self, SessionError> {
        serde_json::from_str(text).map_err(|e| SessionError::InvalidConfig(e.to_string()))
    }
}

/// Errors that can occur during session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A malformed signature.
    #[error("invalid signature {format:?}: {source}")]
    Grammar {
        /// The signature text.
        format: String,
        /// The parse failure.
        source: GrammarError,
    },
    /// Arguments that do not fit the signature.
    #[error(transparent)]
    Argument(#[from] ArgumentError),
}

/// Session state shared by all built-in calls.
pub struct Session {
    /// Runtime options.
    pub options: Options,
    /// Parsed signatures by format string.
    signatures: RwLock<FxHashMap<String, Arc<ParamSpecList>>>,
}

impl Session {
    /// Create a new session with the given options.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self {
            options,
            signatures: RwLock::new(FxHashMap::default()),
        }
    }

    /// Returns the parsed form of `format`, parsing it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Grammar`] if `format` is malformed. Failed
    /// parses are not cached.
    pub fn signature(&self, format: &str) -> Result<Arc<ParamSpecList>, SessionError> {
        let caching = self.options.cache_signatures && self.options.signature_cache_capacity > 0;
        if caching {
            if let Some(specs) = self.signatures.read().get(format) {
                trace!(format, "signature cache hit");
                return Ok(Arc::clone(specs));
            }
        }

        let specs = Arc::new(parse(format).map_err(|source| SessionError::Grammar {
            format: format.to_string(),
            source,
        })?);

        if caching {
            let mut cache = self.signatures.write();
            if cache.len() >= self.options.signature_cache_capacity {
                debug!(entries = cache.len(), "signature cache full, clearing");
                cache.clear();
            }
            cache.insert(format.to_string(), Arc::clone(&specs));
        }
        Ok(specs)
    }

    /// Binds `args` against `format` with the session's binder settings.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Grammar`] for a malformed signature and
    /// [`SessionError::Argument`] if the arguments do not fit.
    pub fn bind<A>(&self, format: &str, args: &mut [Value], allocator: &A) -> Result<Binding, SessionError>
    where
        A: ValueAllocator + ?Sized,
    {
        let specs = self.signature(format)?;
        Ok(bind(args, &specs, &self.options.bind, allocator)?)
    }

    /// Number of cached signatures.
    #[must_use]
    pub fn cached_signatures(&self) -> usize {
        self.signatures.read().len()
    }

    /// Drops all cached signatures.
    pub fn clear_signatures(&self) {
        self.signatures.write().clear();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

/// A shared reference to a session.
pub type SessionRef = Arc<Session>;

/// Create a shared session reference.
#[must_use]
pub fn create_session(options: Options) -> SessionRef {
    Arc::new(Session::new(options))
}
