//! ServiceRuntime — владелец глобального контейнера и scene-контейнеров.
//!
//! Runtime — явное значение, создаваемое точкой входа приложения; вместо
//! статического singleton-состояния есть один контролируемый аксессор
//! (`install`/`try_current`). Так init/teardown остаётся явным и
//! тестируемым в изоляции.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::debug;

use crate::catalog::ServiceCatalog;
use crate::config::ContainerConfig;
use crate::container::ServiceContainer;
use crate::host::{HostAdapter, SceneId};

pub struct ServiceRuntime {
    global: Arc<ServiceContainer>,
    scenes: RwLock<Vec<Arc<ServiceContainer>>>,
    catalog: Arc<ServiceCatalog>,
    host: Arc<dyn HostAdapter>,
    finished: AtomicBool,
}

impl ServiceRuntime {
    pub fn new(host: Arc<dyn HostAdapter>) -> Self {
        Self::with_config(host, ContainerConfig::default())
    }

    pub fn with_config(host: Arc<dyn HostAdapter>, config: ContainerConfig) -> Self {
        let catalog = Arc::new(ServiceCatalog::new());
        let global = ServiceContainer::global(catalog.clone(), host.clone(), config);
        Self {
            global,
            scenes: RwLock::new(Vec::new()),
            catalog,
            host,
            finished: AtomicBool::new(false),
        }
    }

    /// Общий каталог конструкторов и host-деклараций.
    pub fn catalog(&self) -> &Arc<ServiceCatalog> {
        &self.catalog
    }

    pub fn global(&self) -> &Arc<ServiceContainer> {
        &self.global
    }

    /// Контейнер конкретной сцены; создаётся лениво.
    pub fn scene(&self, id: &SceneId) -> Arc<ServiceContainer> {
        let mut scenes = self.scenes.write();
        if let Some(existing) = scenes.iter().find(|c| c.scene_id() == Some(id)) {
            return existing.clone();
        }
        let container = ServiceContainer::scene(id.clone(), self.global.clone());
        scenes.push(container.clone());
        debug!(scene = %id, "scene container created");
        container
    }

    /// "Текущий" scene-контейнер.
    ///
    /// Правило выбора: контейнер активной (по host-у) сцены → первый из
    /// существующих → лениво созданный новый (под активную сцену, либо
    /// анонимный, если host её не сообщил).
    pub fn current_scene(&self) -> Arc<ServiceContainer> {
        let active = self.host.active_scene();
        {
            let scenes = self.scenes.read();
            if let Some(id) = &active {
                if let Some(found) = scenes.iter().find(|c| c.scene_id() == Some(id)) {
                    return found.clone();
                }
            }
            if let Some(first) = scenes.first() {
                return first.clone();
            }
        }
        self.scene(&active.unwrap_or_else(SceneId::anonymous))
    }

    /// Внешняя сцена закончилась: её scope уничтожается, ContainerOwned
    /// привязки получают dispose.
    pub fn unload_scene(&self, id: &SceneId) -> bool {
        let removed = {
            let mut scenes = self.scenes.write();
            scenes
                .iter()
                .position(|c| c.scene_id() == Some(id))
                .map(|index| scenes.remove(index))
        };
        match removed {
            Some(container) => {
                container.clear();
                debug!(scene = %id, "scene container unloaded");
                true
            }
            None => false,
        }
    }

    pub fn loaded_scenes(&self) -> Vec<SceneId> {
        self.scenes
            .read()
            .iter()
            .filter_map(|c| c.scene_id().cloned())
            .collect()
    }

    /// Полный teardown: все сцены, затем глобальный scope. Идемпотентен;
    /// вызывается также из Drop, чтобы teardown нельзя было пропустить.
    pub fn shutdown(&self) {
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        let scenes: Vec<_> = self.scenes.write().drain(..).collect();
        for scene in scenes {
            scene.clear();
        }
        self.global.clear();
        debug!("service runtime shut down");
    }
}

impl Drop for ServiceRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ServiceRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRuntime")
            .field("scenes", &self.scenes.read().len())
            .field("finished", &self.finished.load(Ordering::SeqCst))
            .finish()
    }
}

static INSTALLED: OnceCell<Arc<ServiceRuntime>> = OnceCell::new();

/// Сделать runtime доступным через процессный аксессор.
///
/// `false`, если runtime уже установлен (существующий не заменяется).
pub fn install(runtime: Arc<ServiceRuntime>) -> bool {
    INSTALLED.set(runtime).is_ok()
}

/// Установленный runtime, если точка входа его публиковала.
pub fn try_current() -> Option<Arc<ServiceRuntime>> {
    INSTALLED.get().cloned()
}
