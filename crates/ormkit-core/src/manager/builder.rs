use crate::{
    config::Configuration,
    event::{EventManager, InvokeMask, ListenerInvoker, ListenerResolver},
    factory::MetadataFactory,
    id::{IdGenerator, IdGeneratorRegistry},
    manager::{ObjectManager, Persister, Repository},
    mapper::{EmbeddedObjectFactory, JsonEmbeddedObjectFactory},
    traits::Path,
    uow::UnitOfWork,
};
use std::{collections::HashMap, rc::Rc, sync::Arc};

///
/// ObjectManagerBuilder
///

pub struct ObjectManagerBuilder {
    factory: Arc<MetadataFactory>,
    persisters: HashMap<String, Rc<dyn Persister>>,
    repositories: HashMap<String, Rc<dyn Repository>>,
    id_generators: IdGeneratorRegistry,
    resolver: Option<Rc<dyn ListenerResolver>>,
    event_manager: Option<Rc<dyn EventManager>>,
    mask: InvokeMask,
    embedded: Rc<dyn EmbeddedObjectFactory>,
}

impl ObjectManagerBuilder {
    pub(crate) fn new(factory: Arc<MetadataFactory>) -> Self {
        Self {
            factory,
            persisters: HashMap::new(),
            repositories: HashMap::new(),
            id_generators: IdGeneratorRegistry::new(),
            resolver: None,
            event_manager: None,
            mask: InvokeMask::ALL,
            embedded: Rc::new(JsonEmbeddedObjectFactory),
        }
    }

    #[must_use]
    pub fn persister(mut self, type_name: impl Into<String>, persister: Rc<dyn Persister>) -> Self {
        self.persisters.insert(type_name.into(), persister);
        self
    }

    #[must_use]
    pub fn repository(
        mut self,
        type_name: impl Into<String>,
        repository: Rc<dyn Repository>,
    ) -> Self {
        self.repositories.insert(type_name.into(), repository);
        self
    }

    /// Register one value as both persister and repository for `T`.
    #[must_use]
    pub fn store<T, S>(self, store: Rc<S>) -> Self
    where
        T: Path,
        S: Persister + Repository + 'static,
    {
        self.persister(T::PATH, store.clone())
            .repository(T::PATH, store)
    }

    #[must_use]
    pub fn id_generator(mut self, name: impl Into<String>, generator: Rc<dyn IdGenerator>) -> Self {
        self.id_generators.register(name, generator);
        self
    }

    #[must_use]
    pub fn listener_resolver(mut self, resolver: Rc<dyn ListenerResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn event_manager(mut self, event_manager: Rc<dyn EventManager>) -> Self {
        self.event_manager = Some(event_manager);
        self
    }

    #[must_use]
    pub fn invoke_mask(mut self, mask: InvokeMask) -> Self {
        self.mask = mask;
        self
    }

    /// Apply the manager-facing parts of a configuration.
    #[must_use]
    pub fn configuration(self, config: &Configuration) -> Self {
        self.invoke_mask(config.listeners)
    }

    #[must_use]
    pub fn embedded_objects(mut self, factory: Rc<dyn EmbeddedObjectFactory>) -> Self {
        self.embedded = factory;
        self
    }

    #[must_use]
    pub fn build(self) -> ObjectManager {
        let mut invoker = ListenerInvoker::new().with_mask(self.mask);
        if let Some(resolver) = self.resolver {
            invoker = invoker.with_resolver(resolver);
        }
        if let Some(event_manager) = self.event_manager {
            invoker = invoker.with_event_manager(event_manager);
        }

        ObjectManager {
            factory: self.factory,
            uow: UnitOfWork::new(),
            persisters: self.persisters,
            repositories: self.repositories,
            id_generators: self.id_generators,
            invoker,
            embedded: self.embedded,
        }
    }
}
