//! Binding Store — хранилище привязок одного scope.
//!
//! Ключ — `TypeId` запрошенной абстракции. Экземпляр хранится как `Arc<T>`,
//! стёртый внутрь `Arc<dyn Any>`: за счёт этого sized-типы и trait-object
//! ключи (`dyn Trait`) ведут себя одинаково при downcast на `get`.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::errors::ContainerError;
use crate::lifecycle::Lifecycle;

/// Кто владеет жизненным циклом экземпляра.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Сконструирован или принят контейнером; dispose — забота контейнера.
    ContainerOwned,
    /// Найден во внешнем окружении (или явно отдан под его lifecycle);
    /// контейнер никогда не вызывает dispose.
    HostOwned,
}

/// Type-erased хэндл сервиса: стёртый `Arc<T>` плюс lifecycle-хуки.
#[derive(Clone)]
pub struct ServiceHandle {
    /// Конкретный тип внутри — всегда `Arc<T>` (T может быть unsized).
    erased: Arc<dyn Any + Send + Sync>,
    /// Второй Arc на ту же аллокацию; `None` у host-найденных экземпляров.
    hooks: Option<Arc<dyn Lifecycle>>,
    type_name: &'static str,
}

impl ServiceHandle {
    /// Хэндл для значения, которым контейнер владеет целиком.
    pub fn owned<T: Lifecycle + 'static>(value: T) -> Self {
        let arc = Arc::new(value);
        let erased: Arc<dyn Any + Send + Sync> = Arc::new(arc.clone());
        Self {
            erased,
            hooks: Some(arc),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Хэндл из готового `Arc<T>` (T может быть trait object).
    pub fn from_arc<T: ?Sized + Send + Sync + 'static>(
        arc: Arc<T>,
        hooks: Option<Arc<dyn Lifecycle>>,
    ) -> Self {
        let erased: Arc<dyn Any + Send + Sync> = Arc::new(arc);
        Self {
            erased,
            hooks,
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.erased.downcast_ref::<Arc<T>>().cloned()
    }

    pub fn hooks(&self) -> Option<&Arc<dyn Lifecycle>> {
        self.hooks.as_ref()
    }

    /// Однократный вызов initialize-хука; ошибка прерывает bind-вызов.
    pub(crate) fn initialize(&self) -> Result<(), ContainerError> {
        if let Some(hooks) = &self.hooks {
            hooks.initialize().map_err(|err| {
                ContainerError::lifecycle(self.type_name, "initialize", err.to_string())
            })?;
        }
        Ok(())
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("type_name", &self.type_name)
            .field("has_hooks", &self.hooks.is_some())
            .finish()
    }
}

/// Одна привязка: хэндл плюс владение.
#[derive(Debug, Clone)]
pub struct BindingEntry {
    handle: ServiceHandle,
    ownership: Ownership,
}

impl BindingEntry {
    pub fn container_owned(handle: ServiceHandle) -> Self {
        Self {
            handle,
            ownership: Ownership::ContainerOwned,
        }
    }

    pub fn host_owned(handle: ServiceHandle) -> Self {
        Self {
            handle,
            ownership: Ownership::HostOwned,
        }
    }

    pub fn handle(&self) -> &ServiceHandle {
        &self.handle
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Вызвать dispose, если экземпляром владеет контейнер.
    ///
    /// Ошибки хука логируются и глотаются: teardown — терминальная
    /// операция и обязан дойти до конца. Возвращает `true`, если хук
    /// действительно вызывался.
    pub fn dispose(&self) -> bool {
        if self.ownership != Ownership::ContainerOwned {
            return false;
        }
        let Some(hooks) = &self.handle.hooks else {
            return false;
        };
        if let Err(err) = hooks.dispose() {
            warn!(
                service = self.handle.type_name,
                error = %err,
                "dispose hook failed, continuing teardown"
            );
        }
        true
    }
}

/// Duplicate-free map привязок одного scope.
#[derive(Debug, Default)]
pub struct BindingStore {
    entries: HashMap<TypeId, BindingEntry>,
}

impl BindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &TypeId) -> Option<&BindingEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &TypeId) -> bool {
        self.entries.contains_key(key)
    }

    /// Вставка без перезаписи: `false`, если ключ занят (существующая
    /// привязка при этом не изменяется).
    pub fn try_insert(&mut self, key: TypeId, entry: BindingEntry) -> bool {
        use std::collections::hash_map::Entry;
        match self.entries.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
        }
    }

    pub fn remove(&mut self, key: &TypeId) -> Option<BindingEntry> {
        self.entries.remove(key)
    }

    /// Забрать все привязки (порядок не специфицирован — teardown).
    pub fn drain(&mut self) -> Vec<BindingEntry> {
        self.entries.drain().map(|(_, entry)| entry).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Widget {
        id: u32,
    }
    impl Lifecycle for Widget {}

    #[test]
    fn test_handle_roundtrip_sized() {
        let handle = ServiceHandle::owned(Widget { id: 7 });
        let widget = handle.downcast::<Widget>().expect("downcast should succeed");
        assert_eq!(widget.id, 7);
        assert!(handle.downcast::<String>().is_none());
    }

    #[test]
    fn test_handle_roundtrip_trait_object() {
        trait Feed: Send + Sync {
            fn rounds(&self) -> u32;
        }
        struct BoxFeed;
        impl Feed for BoxFeed {
            fn rounds(&self) -> u32 {
                30
            }
        }

        let arc: Arc<dyn Feed> = Arc::new(BoxFeed);
        let handle = ServiceHandle::from_arc(arc, None);
        let feed = handle
            .downcast::<dyn Feed>()
            .expect("trait object downcast should succeed");
        assert_eq!(feed.rounds(), 30);
    }

    #[test]
    fn test_duplicate_insert_keeps_original() {
        let mut store = BindingStore::new();
        let key = TypeId::of::<Widget>();

        assert!(store.try_insert(
            key,
            BindingEntry::container_owned(ServiceHandle::owned(Widget { id: 1 })),
        ));
        assert!(!store.try_insert(
            key,
            BindingEntry::container_owned(ServiceHandle::owned(Widget { id: 2 })),
        ));

        let kept = store
            .get(&key)
            .and_then(|entry| entry.handle().downcast::<Widget>())
            .expect("original binding should remain");
        assert_eq!(kept.id, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_dispose_only_for_container_owned() {
        static DISPOSED: AtomicUsize = AtomicUsize::new(0);

        struct Tracked;
        impl Lifecycle for Tracked {
            fn dispose(&self) -> anyhow::Result<()> {
                DISPOSED.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let owned = BindingEntry::container_owned(ServiceHandle::owned(Tracked));
        assert!(owned.dispose());
        assert_eq!(DISPOSED.load(Ordering::SeqCst), 1);

        let host = BindingEntry::host_owned(ServiceHandle::from_arc(Arc::new(Tracked), None));
        assert!(!host.dispose());
        assert_eq!(DISPOSED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispose_error_is_swallowed() {
        struct Faulty;
        impl Lifecycle for Faulty {
            fn dispose(&self) -> anyhow::Result<()> {
                Err(anyhow!("resource already gone"))
            }
        }

        let entry = BindingEntry::container_owned(ServiceHandle::owned(Faulty));
        assert!(entry.dispose());
    }
}
