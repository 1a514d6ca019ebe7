//! Host Environment Adapter — шов к внешнему графу объектов движка.
//!
//! Контейнер никогда не конструирует host-объекты: он их только находит
//! через этот адаптер и кэширует как HostOwned. Реализация живёт в слое
//! интеграции с движком и в core не входит.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Идентификатор внешней сцены, к жизни которой привязан scene-scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SceneId(String);

impl SceneId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Id для scope, создаваемого когда host не сообщил активную сцену.
    pub fn anonymous() -> Self {
        Self("<anonymous>".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Запрос на поиск существующего объекта во внешнем графе.
#[derive(Debug, Clone)]
pub struct HostQuery {
    pub type_id: TypeId,
    pub type_name: &'static str,
    /// Ограничение поиска поддеревом внешнего графа; `None` — весь граф.
    pub search_root: Option<String>,
}

impl HostQuery {
    pub fn of<T: Send + Sync + 'static>(search_root: Option<&str>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            search_root: search_root.map(|s| s.to_string()),
        }
    }
}

/// Адаптер к живому внешнему окружению (граф сцены движка).
///
/// Возвращаемый `Arc<dyn Any>` должен скрывать ровно тот конкретный тип,
/// который указан в `query.type_id`, иначе находка будет отброшена.
pub trait HostAdapter: Send + Sync {
    /// Найти ноль-или-один существующий объект запрошенного типа.
    fn find_existing(&self, query: &HostQuery) -> Option<Arc<dyn Any + Send + Sync>>;

    /// Какая внешняя сцена сейчас активна (для выбора "текущего" scope).
    fn active_scene(&self) -> Option<SceneId> {
        None
    }
}

/// Адаптер-заглушка для окружений без host-графа (чистые тесты, tools).
#[derive(Debug, Default)]
pub struct NullHostAdapter;

impl HostAdapter for NullHostAdapter {
    fn find_existing(&self, _query: &HostQuery) -> Option<Arc<dyn Any + Send + Sync>> {
        None
    }
}
