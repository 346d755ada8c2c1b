//! Handler registry and module registration.
//!
//! Feature modules are declared as `static` [`ModuleDescriptor`]s. A module's
//! `register` function adds handlers and initializers to a
//! [`RegistryBuilder`], and may [`include`](RegistryBuilder::include) child
//! modules, forming a tree:
//!
//! ```rust,ignore
//! pub static RULES: ModuleDescriptor = ModuleDescriptor::new("rules", |builder| {
//!     builder.include(&COMMAND)?;
//!     builder.initializer(RULES_CONFIG.initializer());
//!     Ok(())
//! });
//! ```
//!
//! [`RegistryBuilder::build`] freezes everything into a [`HandlerRegistry`]
//! (one routing table keyed by kind and key) plus the [`InitializerChain`].
//! Duplicate keys within a kind and empty keys are rejected.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::handler::{HandlerDescriptor, HandlerKind};
use crate::initializer::{Initializer, InitializerChain};

// ─── ModuleDescriptor ─────────────────────────────────────────────────────────

/// A static, `Copy` handle to a feature module.
#[derive(Debug, Clone, Copy)]
pub struct ModuleDescriptor {
    /// Module name used in logs and error messages.
    pub name: &'static str,
    /// Adds the module's handlers, initializers and child modules.
    pub register: fn(&mut RegistryBuilder) -> RegistryResult<()>,
}

impl ModuleDescriptor {
    pub const fn new(
        name: &'static str,
        register: fn(&mut RegistryBuilder) -> RegistryResult<()>,
    ) -> Self {
        Self { name, register }
    }
}

// ─── RouteKey ─────────────────────────────────────────────────────────────────

/// Routing table key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub kind: HandlerKind,
    pub key: String,
}

impl RouteKey {
    pub fn new(kind: HandlerKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }
}

// ─── RegistryBuilder ──────────────────────────────────────────────────────────

/// Collects registrations from modules.
pub struct RegistryBuilder {
    current: &'static str,
    modules: Vec<&'static str>,
    handlers: Vec<(&'static str, HandlerDescriptor)>,
    initializers: InitializerChain,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            current: "<root>",
            modules: Vec::new(),
            handlers: Vec::new(),
            initializers: InitializerChain::new(),
        }
    }

    /// Registers a module and, through it, its children.
    pub fn include(&mut self, module: &ModuleDescriptor) -> RegistryResult<&mut Self> {
        if self.modules.contains(&module.name) {
            return Err(RegistryError::DuplicateModule(module.name));
        }
        self.modules.push(module.name);

        let parent = std::mem::replace(&mut self.current, module.name);
        let result = (module.register)(self);
        self.current = parent;
        result?;

        debug!(module = module.name, "Module registered");
        Ok(self)
    }

    /// Adds a handler owned by the module currently registering.
    pub fn handler(&mut self, descriptor: HandlerDescriptor) -> &mut Self {
        self.handlers.push((self.current, descriptor));
        self
    }

    /// Adds a startup initializer.
    pub fn initializer(&mut self, initializer: Initializer) -> &mut Self {
        self.initializers.push(initializer);
        self
    }

    /// Name of the module currently registering.
    pub fn current_module(&self) -> &'static str {
        self.current
    }

    /// Freezes the registrations.
    pub fn build(self) -> RegistryResult<(HandlerRegistry, InitializerChain)> {
        let mut routes: HashMap<RouteKey, (&'static str, Arc<HandlerDescriptor>)> =
            HashMap::with_capacity(self.handlers.len());
        let mut order = Vec::with_capacity(self.handlers.len());

        for (module, descriptor) in self.handlers {
            if descriptor.key.is_empty() {
                return Err(RegistryError::EmptyKey {
                    kind: descriptor.kind,
                    module,
                });
            }
            if descriptor.kind == HandlerKind::Modal && descriptor.key.contains(':') {
                return Err(RegistryError::InvalidKey {
                    kind: descriptor.kind,
                    key: descriptor.key,
                    module,
                });
            }
            let key = RouteKey::new(descriptor.kind, descriptor.key.clone());
            match routes.entry(key.clone()) {
                Entry::Occupied(existing) => {
                    return Err(RegistryError::DuplicateKey {
                        kind: key.kind,
                        key: key.key,
                        first: existing.get().0,
                        second: module,
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert((module, Arc::new(descriptor)));
                    order.push(key);
                }
            }
        }

        let registry = HandlerRegistry {
            routes: routes
                .into_iter()
                .map(|(key, (_, descriptor))| (key, descriptor))
                .collect(),
            order,
            modules: self.modules,
        };
        Ok((registry, self.initializers))
    }
}

// ─── HandlerRegistry ──────────────────────────────────────────────────────────

/// The frozen routing table. Read-only after startup.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    routes: HashMap<RouteKey, Arc<HandlerDescriptor>>,
    order: Vec<RouteKey>,
    modules: Vec<&'static str>,
}

impl HandlerRegistry {
    /// Builds a registry from a list of modules.
    pub fn from_modules(
        modules: &[&ModuleDescriptor],
    ) -> RegistryResult<(HandlerRegistry, InitializerChain)> {
        let mut builder = RegistryBuilder::new();
        for module in modules {
            builder.include(module)?;
        }
        builder.build()
    }

    /// Looks up a handler.
    pub fn get(&self, kind: HandlerKind, key: &str) -> Option<&Arc<HandlerDescriptor>> {
        self.routes.get(&RouteKey::new(kind, key))
    }

    /// Iterates handlers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<HandlerDescriptor>> {
        self.order.iter().filter_map(|key| self.routes.get(key))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Number of handlers of one kind.
    pub fn len_of(&self, kind: HandlerKind) -> usize {
        self.routes.keys().filter(|k| k.kind == kind).count()
    }

    /// Names of all registered modules, in include order.
    pub fn modules(&self) -> &[&'static str] {
        &self.modules
    }

    /// Wire descriptors of every command and context-menu handler.
    pub fn command_data(&self) -> Vec<Value> {
        self.iter().filter_map(|d| d.data()).collect()
    }

    /// Names of every command and context-menu handler.
    pub fn command_names(&self) -> Vec<&str> {
        self.iter()
            .filter(|d| d.is_deployable())
            .map(|d| d.key.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::InteractionContext;
    use crate::error::HandlerResult;
    use crate::handler::{button, command, modal};
    use cubebot_core::{ButtonSpec, CommandSpec, ModalSpec};

    async fn noop(_ctx: Arc<InteractionContext>) -> HandlerResult {
        Ok(())
    }

    static CHILD: ModuleDescriptor = ModuleDescriptor::new("child", |builder| {
        builder.handler(button(ButtonSpec::new("open", "Open")).run(noop));
        Ok(())
    });

    static PARENT: ModuleDescriptor = ModuleDescriptor::new("parent", |builder| {
        builder.handler(command(CommandSpec::new("open", "Open things")).run(noop));
        builder.include(&CHILD)?;
        builder.handler(modal(ModalSpec::new("open", "Open")).run(noop));
        Ok(())
    });

    static CLASH: ModuleDescriptor = ModuleDescriptor::new("clash", |builder| {
        builder.handler(button(ButtonSpec::new("open", "Again")).run(noop));
        Ok(())
    });

    static EMPTY: ModuleDescriptor = ModuleDescriptor::new("empty", |builder| {
        builder.handler(button(ButtonSpec::new("", "Nothing")).run(noop));
        Ok(())
    });

    #[test]
    fn test_same_key_across_kinds_is_allowed() {
        let (registry, _) = HandlerRegistry::from_modules(&[&PARENT]).unwrap();

        assert_eq!(registry.len(), 3);
        assert!(registry.get(HandlerKind::Command, "open").is_some());
        assert!(registry.get(HandlerKind::Button, "open").is_some());
        assert!(registry.get(HandlerKind::Modal, "open").is_some());
        assert!(registry.get(HandlerKind::ContextMenu, "open").is_none());
        assert_eq!(registry.modules(), &["parent", "child"]);
    }

    #[test]
    fn test_duplicate_key_names_both_modules() {
        let err = HandlerRegistry::from_modules(&[&PARENT, &CLASH]).unwrap_err();
        match err {
            RegistryError::DuplicateKey {
                kind,
                key,
                first,
                second,
            } => {
                assert_eq!(kind, HandlerKind::Button);
                assert_eq!(key, "open");
                assert_eq!(first, "child");
                assert_eq!(second, "clash");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let err = HandlerRegistry::from_modules(&[&EMPTY]).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::EmptyKey {
                kind: HandlerKind::Button,
                module: "empty"
            }
        ));
    }

    static DELIMITED: ModuleDescriptor = ModuleDescriptor::new("delimited", |builder| {
        builder.handler(modal(ModalSpec::new("feedback:v2", "Feedback")).run(noop));
        Ok(())
    });

    #[test]
    fn test_modal_key_with_delimiter_is_rejected() {
        let err = HandlerRegistry::from_modules(&[&DELIMITED]).unwrap_err();
        match err {
            RegistryError::InvalidKey { kind, key, module } => {
                assert_eq!(kind, HandlerKind::Modal);
                assert_eq!(key, "feedback:v2");
                assert_eq!(module, "delimited");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_module_included_twice() {
        let err = HandlerRegistry::from_modules(&[&CHILD, &PARENT]).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateModule("child")));
    }

    #[test]
    fn test_command_data_only_includes_deployables() {
        let (registry, _) = HandlerRegistry::from_modules(&[&PARENT]).unwrap();
        let data = registry.command_data();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["name"], "open");
        assert_eq!(registry.command_names(), vec!["open"]);
    }
}
