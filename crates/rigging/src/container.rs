//! ServiceContainer — единый тип для обоих уровней.
//!
//! Глобальный контейнер — без родителя; scene-контейнер держит ссылку на
//! глобальный и при `get`/разрешении параметров проваливается в него, если
//! тип не привязан локально. Исходная система дублировала этот алгоритм в
//! двух почти одинаковых классах — здесь он один, параметризованный scope.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::binding::{BindingEntry, BindingStore, ServiceHandle};
use crate::catalog::{Dependency, ServiceCatalog};
use crate::config::ContainerConfig;
use crate::errors::ContainerError;
use crate::host::{HostAdapter, HostQuery, SceneId};
use crate::lifecycle::Lifecycle;
use crate::resolver::ResolutionSession;
use crate::stats::{ContainerStats, StatsRecorder};

/// Граница жизни и видимости привязок.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Один на процесс, живёт до shutdown.
    Global,
    /// Привязан к внешней сцене; умирает вместе с ней.
    Scene(SceneId),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => f.write_str("global"),
            Scope::Scene(id) => write!(f, "scene:{id}"),
        }
    }
}

pub struct ServiceContainer {
    scope: Scope,
    parent: Option<Arc<ServiceContainer>>,
    catalog: Arc<ServiceCatalog>,
    host: Arc<dyn HostAdapter>,
    config: Arc<ContainerConfig>,
    store: RwLock<BindingStore>,
    stats: StatsRecorder,
}

impl ServiceContainer {
    /// Создать глобальный (process-lifetime) контейнер.
    pub fn global(
        catalog: Arc<ServiceCatalog>,
        host: Arc<dyn HostAdapter>,
        config: ContainerConfig,
    ) -> Arc<Self> {
        let track = config.track_stats;
        Arc::new(Self {
            scope: Scope::Global,
            parent: None,
            catalog,
            host,
            config: Arc::new(config),
            store: RwLock::new(BindingStore::new()),
            stats: StatsRecorder::new(track),
        })
    }

    /// Создать scene-контейнер поверх глобального.
    pub(crate) fn scene(id: SceneId, parent: Arc<ServiceContainer>) -> Arc<Self> {
        Arc::new(Self {
            scope: Scope::Scene(id),
            catalog: parent.catalog.clone(),
            host: parent.host.clone(),
            config: parent.config.clone(),
            store: RwLock::new(BindingStore::new()),
            stats: StatsRecorder::new(parent.config.track_stats),
            parent: Some(parent),
        })
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub(crate) fn scene_id(&self) -> Option<&SceneId> {
        match &self.scope {
            Scope::Global => None,
            Scope::Scene(id) => Some(id),
        }
    }

    // === Bind-операции ===

    /// Зарегистрировать готовый экземпляр (ContainerOwned).
    ///
    /// `initialize` выполняется до регистрации: упавший хук ничего не
    /// оставляет в хранилище.
    pub fn bind_instance<T: Lifecycle + 'static>(&self, value: T) -> Result<(), ContainerError> {
        self.ensure_vacant::<T>()?;
        let handle = ServiceHandle::owned(value);
        handle.initialize()?;
        self.insert_entry(
            TypeId::of::<T>(),
            std::any::type_name::<T>(),
            BindingEntry::container_owned(handle),
        )?;
        self.stats.record_bind();
        debug!(scope = %self.scope, service = std::any::type_name::<T>(), "instance bound");
        Ok(())
    }

    /// Зарегистрировать экземпляр, lifecycle которого принадлежит host-у
    /// или вызывающему коду: доступен через `get`, но dispose-exempt и не
    /// инициализируется контейнером.
    pub fn bind_unmanaged_instance<T: Send + Sync + 'static>(
        &self,
        value: T,
    ) -> Result<(), ContainerError> {
        self.ensure_vacant::<T>()?;
        self.insert_entry(
            TypeId::of::<T>(),
            std::any::type_name::<T>(),
            BindingEntry::host_owned(ServiceHandle::from_arc(Arc::new(value), None)),
        )?;
        self.stats.record_bind();
        debug!(scope = %self.scope, service = std::any::type_name::<T>(), "unmanaged instance bound");
        Ok(())
    }

    /// Сконструировать конкретный тип по каталогу и привязать под его же
    /// ключом. Конструирование eager — происходит прямо в bind-вызове.
    pub fn bind_concrete<T: Send + Sync + 'static>(&self) -> Result<(), ContainerError> {
        self.ensure_vacant::<T>()?;
        let mut session = ResolutionSession::new(self);
        let handle = session.construct(Dependency::of::<T>())?;
        self.commit_staged(session.into_staged());
        self.insert_entry(
            TypeId::of::<T>(),
            std::any::type_name::<T>(),
            BindingEntry::container_owned(handle),
        )?;
        self.stats.record_bind();
        debug!(scope = %self.scope, service = std::any::type_name::<T>(), "concrete service bound");
        Ok(())
    }

    /// Сконструировать `Impl` и привязать под ключом абстракции `I`.
    ///
    /// `coerce` — unsizing-переход `Arc<Impl> -> Arc<I>`; на месте вызова
    /// это всегда `|imp| imp`.
    pub fn bind_interface<I, Impl, F>(&self, coerce: F) -> Result<(), ContainerError>
    where
        I: ?Sized + Send + Sync + 'static,
        Impl: Send + Sync + 'static,
        F: FnOnce(Arc<Impl>) -> Arc<I>,
    {
        self.ensure_vacant::<I>()?;
        let mut session = ResolutionSession::new(self);
        let built = session.construct(Dependency::of::<Impl>())?;
        let hooks = built.hooks().cloned();
        let implementation = built.downcast::<Impl>().ok_or_else(|| {
            ContainerError::no_constructor(
                std::any::type_name::<Impl>(),
                0,
                "declared constructor produced an unexpected type",
            )
        })?;
        self.commit_staged(session.into_staged());
        self.insert_entry(
            TypeId::of::<I>(),
            std::any::type_name::<I>(),
            BindingEntry::container_owned(ServiceHandle::from_arc(coerce(implementation), hooks)),
        )?;
        self.stats.record_bind();
        debug!(
            scope = %self.scope,
            abstraction = std::any::type_name::<I>(),
            implementation = std::any::type_name::<Impl>(),
            "interface bound"
        );
        Ok(())
    }

    /// Найти существующий объект во внешнем графе и привязать как HostOwned.
    pub fn bind_from_host<T: Send + Sync + 'static>(
        &self,
        search_root: Option<&str>,
    ) -> Result<(), ContainerError> {
        self.ensure_vacant::<T>()?;
        let query = HostQuery::of::<T>(search_root);
        let found = self
            .host
            .find_existing(&query)
            .and_then(|any| any.downcast::<T>().ok());
        match found {
            Some(arc) => {
                self.stats.record_host_discovery();
                self.insert_entry(
                    TypeId::of::<T>(),
                    std::any::type_name::<T>(),
                    BindingEntry::host_owned(ServiceHandle::from_arc(arc, None)),
                )?;
                self.stats.record_bind();
                debug!(scope = %self.scope, service = std::any::type_name::<T>(), "host object bound");
                Ok(())
            }
            None => Err(ContainerError::host_lookup(
                std::any::type_name::<T>(),
                search_root,
            )),
        }
    }

    // === Доступ ===

    /// Получить привязанный экземпляр; в scene-scope — с fallback в global.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        let key = TypeId::of::<T>();
        let handle = self.lookup_local(key).or_else(|| self.lookup_parent(key));
        match handle.and_then(|h| h.downcast::<T>()) {
            Some(arc) => {
                self.stats.record_resolution(true);
                Ok(arc)
            }
            None => {
                self.stats.record_resolution(false);
                Err(ContainerError::not_found(
                    std::any::type_name::<T>(),
                    self.scope.to_string(),
                ))
            }
        }
    }

    pub fn try_get<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.get::<T>().ok()
    }

    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        let key = TypeId::of::<T>();
        self.store.read().contains(&key) || self.lookup_parent(key).is_some()
    }

    // === Teardown ===

    /// Снять привязку; ContainerOwned экземпляр получает dispose ровно один
    /// раз. Повторные вызовы после удаления — no-op (`false`).
    pub fn unbind<T: ?Sized + 'static>(&self) -> bool {
        let removed = self.store.write().remove(&TypeId::of::<T>());
        match removed {
            Some(entry) => {
                if entry.dispose() {
                    self.stats.record_disposals(1);
                }
                debug!(scope = %self.scope, service = std::any::type_name::<T>(), "binding removed");
                true
            }
            None => false,
        }
    }

    /// Снять все привязки scope; порядок dispose не специфицирован,
    /// teardown доходит до конца независимо от ошибок хуков.
    pub fn clear(&self) {
        let entries = self.store.write().drain();
        let total = entries.len();
        let mut disposed = 0u64;
        for entry in &entries {
            if entry.dispose() {
                disposed += 1;
            }
        }
        self.stats.record_disposals(disposed);
        debug!(scope = %self.scope, total, disposed, "scope cleared");
    }

    /// Снимок счётчиков scope.
    pub fn stats(&self) -> ContainerStats {
        self.stats.snapshot(self.store.read().len())
    }

    // === Внутренние шовные методы (резолвер) ===

    pub(crate) fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    pub(crate) fn host_adapter(&self) -> &dyn HostAdapter {
        self.host.as_ref()
    }

    pub(crate) fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub(crate) fn stats_recorder(&self) -> &StatsRecorder {
        &self.stats
    }

    pub(crate) fn lookup_local(&self, key: TypeId) -> Option<ServiceHandle> {
        self.store.read().get(&key).map(|entry| entry.handle().clone())
    }

    /// Поиск по цепочке родителей (только уже привязанные записи).
    pub(crate) fn lookup_parent(&self, key: TypeId) -> Option<ServiceHandle> {
        let mut current = self.parent.as_deref();
        while let Some(container) = current {
            if let Some(handle) = container.lookup_local(key) {
                return Some(handle);
            }
            current = container.parent.as_deref();
        }
        None
    }

    fn ensure_vacant<T: ?Sized + 'static>(&self) -> Result<(), ContainerError> {
        if self.store.read().contains(&TypeId::of::<T>()) {
            return Err(ContainerError::duplicate(
                std::any::type_name::<T>(),
                self.scope.to_string(),
            ));
        }
        Ok(())
    }

    fn insert_entry(
        &self,
        key: TypeId,
        key_name: &'static str,
        entry: BindingEntry,
    ) -> Result<(), ContainerError> {
        if self.store.write().try_insert(key, entry) {
            Ok(())
        } else {
            Err(ContainerError::duplicate(key_name, self.scope.to_string()))
        }
    }

    /// Закоммитить staged-зависимости успешной сессии в local scope.
    fn commit_staged(&self, staged: std::collections::HashMap<TypeId, BindingEntry>) {
        if staged.is_empty() {
            return;
        }
        let mut store = self.store.write();
        for (key, entry) in staged {
            if !store.try_insert(key, entry) {
                // Ключ занялся внутри этого же bind-вызова (re-entrant
                // фабрика); существующая привязка остаётся.
                debug!(scope = %self.scope, "staged dependency already bound, keeping existing");
            }
        }
    }
}

impl fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("scope", &self.scope)
            .field("bound", &self.store.read().len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
