//! Reattaching behavior to restored definitions.
//!
//! A definition is split into a persisted data record and a behavior record of
//! closures that cannot be serialized. After a reload the data comes back from the save
//! and the behavior is rebuilt from a factory registered under the definition's kind:
//! the factory produces a fresh template, and only the template's behavior is copied
//! onto the restored instance.
//!
//! Failures are per definition. [`rehydrate_all`] keeps going after one fails so a single
//! missing factory cannot take the rest of the load down with it.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures rebuilding behavior for a restored definition.
#[derive(Debug, Error)]
pub enum RehydrateError {
    #[error("no template registered for definition kind '{kind}'")]
    MissingTemplate { kind: String },
    #[error("template registered for '{kind}' builds a different definition type or kind")]
    TemplateTypeMismatch { kind: String },
    #[error("definition '{kind}' has no behavior attached; it was restored but never rehydrated")]
    NotRehydrated { kind: String },
    #[error("nested definition of '{kind}' failed to rehydrate: {source}")]
    Nested {
        kind: String,
        #[source]
        source: Box<RehydrateError>,
    },
}

/// Access to the nested definitions a data record owns.
pub trait DefinitionData {
    fn nested(&mut self) -> Vec<&mut dyn Rehydrate> {
        Vec::new()
    }
}

/// Anything that can rebuild its behavior from a [`TemplateRegistry`].
pub trait Rehydrate {
    fn kind(&self) -> &str;
    /// Replace behavior with a fresh template's, then do the same for nested definitions.
    ///
    /// # Errors
    /// - [`RehydrateError::MissingTemplate`] if no factory is registered for the kind
    /// - [`RehydrateError::TemplateTypeMismatch`] if the factory builds another type or kind
    /// - [`RehydrateError::Nested`] if a nested definition fails
    fn rehydrate(&mut self, registry: &TemplateRegistry) -> Result<(), RehydrateError>;
}

/// A persisted data record paired with the behavior that gets lost on save.
#[derive(Serialize, Deserialize)]
#[serde(bound(serialize = "D: Serialize", deserialize = "D: Deserialize<'de>"))]
pub struct Definition<D, B> {
    kind: String,
    pub data: D,
    #[serde(skip)]
    behavior: Option<B>,
}

impl<D, B> Definition<D, B> {
    pub fn new(kind: impl Into<String>, data: D, behavior: B) -> Definition<D, B> {
        Definition {
            kind: kind.into(),
            data,
            behavior: Some(behavior),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The attached behavior.
    ///
    /// # Errors
    /// - [`RehydrateError::NotRehydrated`] if the definition came out of a save and has
    ///   not been rehydrated yet
    pub fn behavior(&self) -> Result<&B, RehydrateError> {
        self.behavior.as_ref().ok_or_else(|| RehydrateError::NotRehydrated {
            kind: self.kind.clone(),
        })
    }

    pub fn is_rehydrated(&self) -> bool {
        self.behavior.is_some()
    }
}

impl<D: fmt::Debug, B> fmt::Debug for Definition<D, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("kind", &self.kind)
            .field("data", &self.data)
            .field("rehydrated", &self.behavior.is_some())
            .finish()
    }
}

impl<D: DefinitionData + 'static, B: 'static> Rehydrate for Definition<D, B> {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn rehydrate(&mut self, registry: &TemplateRegistry) -> Result<(), RehydrateError> {
        let template = registry.template::<D, B>(&self.kind)?;
        self.behavior = template.behavior;
        debug!("behavior restored for '{}'", self.kind);

        let kind = self.kind.clone();
        let mut first_failure = None;
        for nested in self.data.nested() {
            if let Err(e) = nested.rehydrate(registry) {
                error!("nested definition '{}' of '{kind}' failed to rehydrate: {e}", nested.kind());
                first_failure.get_or_insert(e);
            }
        }
        match first_failure {
            Some(source) => Err(RehydrateError::Nested {
                kind,
                source: Box::new(source),
            }),
            None => Ok(()),
        }
    }
}

type Factory<D, B> = Rc<dyn Fn() -> Definition<D, B>>;

/// Template factories keyed by definition kind.
#[derive(Default)]
pub struct TemplateRegistry {
    factories: HashMap<String, Box<dyn Any>>,
}

impl TemplateRegistry {
    /// Register (or replace) the factory for `kind`.
    pub fn register<D: 'static, B: 'static>(
        &mut self,
        kind: impl Into<String>,
        factory: impl Fn() -> Definition<D, B> + 'static,
    ) {
        let factory: Factory<D, B> = Rc::new(factory);
        self.factories.insert(kind.into(), Box::new(factory));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Build a fresh template for `kind`.
    ///
    /// # Errors
    /// - [`RehydrateError::MissingTemplate`] if nothing is registered under `kind`
    /// - [`RehydrateError::TemplateTypeMismatch`] if the registered factory builds another type
    ///   or a definition of another kind
    pub fn template<D: 'static, B: 'static>(&self, kind: &str) -> Result<Definition<D, B>, RehydrateError> {
        let boxed = self.factories.get(kind).ok_or_else(|| RehydrateError::MissingTemplate {
            kind: kind.to_string(),
        })?;
        let factory = boxed
            .downcast_ref::<Factory<D, B>>()
            .ok_or_else(|| RehydrateError::TemplateTypeMismatch { kind: kind.to_string() })?;
        let template = factory();
        if template.kind != kind {
            error!("factory registered for '{kind}' builds '{}'", template.kind);
            return Err(RehydrateError::TemplateTypeMismatch { kind: kind.to_string() });
        }
        Ok(template)
    }
}

impl fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.factories.keys().collect();
        kinds.sort();
        f.debug_struct("TemplateRegistry").field("kinds", &kinds).finish()
    }
}

/// Outcome of rehydrating a batch of definitions.
#[derive(Debug, Default)]
pub struct RehydrationReport {
    pub restored: Vec<String>,
    pub failures: Vec<(String, RehydrateError)>,
}

impl RehydrationReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Rehydrate every definition, isolating failures to the definition that caused them.
pub fn rehydrate_all<'a, I>(definitions: I, registry: &TemplateRegistry) -> RehydrationReport
where
    I: IntoIterator<Item = &'a mut dyn Rehydrate>,
{
    let mut report = RehydrationReport::default();
    for definition in definitions {
        let kind = definition.kind().to_string();
        match definition.rehydrate(registry) {
            Ok(()) => report.restored.push(kind),
            Err(e) => {
                error!("failed to rehydrate '{kind}': {e}");
                report.failures.push((kind, e));
            },
        }
    }
    info!(
        "rehydrated {} definition(s), {} failure(s)",
        report.restored.len(),
        report.failures.len()
    );
    report
}
