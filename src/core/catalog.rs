use crate::core::component::Component;
use crate::core::integration::Integration;
use crate::core::trigger::Trigger;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builder used to register integrations before serving or executing.
pub struct CatalogBuilder {
    integrations: BTreeMap<String, Arc<dyn Integration>>,
    components: BTreeMap<String, Arc<dyn Component>>,
    triggers: BTreeMap<String, Arc<dyn Trigger>>,
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self {
            integrations: BTreeMap::new(),
            components: BTreeMap::new(),
            triggers: BTreeMap::new(),
        }
    }

    /// Register an integration together with all of its components and triggers.
    pub fn register<T: Integration>(&mut self, integration: T) -> &mut Self {
        self.register_arc(Arc::new(integration))
    }

    pub fn register_arc(&mut self, integration: Arc<dyn Integration>) -> &mut Self {
        let name = integration.name();
        if self.integrations.contains_key(name) {
            panic!("duplicate integration registered: {}", name);
        }
        for component in integration.components() {
            self.register_component(component);
        }
        for trigger in integration.triggers() {
            let trigger_name = trigger.name();
            if self.triggers.contains_key(trigger_name) {
                panic!("duplicate trigger registered: {}", trigger_name);
            }
            self.triggers.insert(trigger_name.to_string(), trigger);
        }
        self.integrations.insert(name.to_string(), integration);
        self
    }

    /// Register a standalone component, mostly useful for tests.
    pub fn register_component(&mut self, component: Arc<dyn Component>) -> &mut Self {
        let name = component.name();
        if self.components.contains_key(name) {
            panic!("duplicate component registered: {}", name);
        }
        self.components.insert(name.to_string(), component);
        self
    }

    pub fn build(self) -> Catalog {
        Catalog {
            inner: Arc::new(CatalogInner {
                integrations: self.integrations,
                components: self.components,
                triggers: self.triggers,
            }),
        }
    }
}

struct CatalogInner {
    integrations: BTreeMap<String, Arc<dyn Integration>>,
    components: BTreeMap<String, Arc<dyn Component>>,
    triggers: BTreeMap<String, Arc<dyn Trigger>>,
}

/// Immutable catalog shared by the CLI and the webhook server.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        CatalogBuilder::new().build()
    }

    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    pub fn integration(&self, name: &str) -> Option<Arc<dyn Integration>> {
        self.inner.integrations.get(name).cloned()
    }

    pub fn component(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.inner.components.get(name).cloned()
    }

    pub fn trigger(&self, name: &str) -> Option<Arc<dyn Trigger>> {
        self.inner.triggers.get(name).cloned()
    }

    /// Integrations sorted by name.
    pub fn integrations(&self) -> impl Iterator<Item = &Arc<dyn Integration>> {
        self.inner.integrations.values()
    }

    pub fn components(&self) -> impl Iterator<Item = &Arc<dyn Component>> {
        self.inner.components.values()
    }

    pub fn triggers(&self) -> impl Iterator<Item = &Arc<dyn Trigger>> {
        self.inner.triggers.values()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.integrations.is_empty() && self.inner.components.is_empty()
    }
}
