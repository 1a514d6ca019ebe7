//! Service Catalog — реестр заявленных конструкторов.
//!
//! Замена runtime-рефлексии исходной системы: каждый тип декларирует свои
//! конструкторы явно — список зависимостей плюс build-замыкание. Каталог
//! общий для глобального и всех scene-контейнеров; резолвер берёт из него
//! кандидатов в порядке убывания числа параметров.

use std::any::TypeId;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::binding::ServiceHandle;
use crate::errors::ContainerError;
use crate::host::{HostAdapter, HostQuery};
use crate::lifecycle::Lifecycle;

/// Идентичность одного параметра конструктора (или цели конструирования).
#[derive(Debug, Clone, Copy)]
pub struct Dependency {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
}

impl Dependency {
    pub fn of<P: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            type_name: std::any::type_name::<P>(),
        }
    }
}

/// Аргументы, разрешённые для одного кандидата-конструктора.
///
/// Build-замыкание достаёт их по типу; к моменту вызова каждый заявленный
/// параметр уже разрешён резолвером, так что `get` промахивается только
/// при расхождении заявленного списка и фактических `get`-вызовов.
#[derive(Default)]
pub struct ResolvedArgs {
    values: HashMap<TypeId, ServiceHandle>,
}

impl ResolvedArgs {
    pub(crate) fn insert(&mut self, key: TypeId, handle: ServiceHandle) {
        self.values.insert(key, handle);
    }

    pub fn get<P: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<P>, ContainerError> {
        self.values
            .get(&TypeId::of::<P>())
            .and_then(|handle| handle.downcast::<P>())
            .ok_or_else(|| {
                ContainerError::unresolved(std::any::type_name::<P>(), "constructor argument list")
            })
    }
}

type BuildFn = Box<dyn Fn(&ResolvedArgs) -> Result<ServiceHandle, ContainerError> + Send + Sync>;

/// Один заявленный конструктор: целевой тип, параметры, build-замыкание.
pub struct ConstructorSpec {
    target: Dependency,
    params: Vec<Dependency>,
    build: BuildFn,
}

impl ConstructorSpec {
    /// Начать декларацию конструктора типа `T`.
    pub fn of<T: Lifecycle + 'static>() -> ConstructorBuilder<T> {
        ConstructorBuilder {
            params: Vec::new(),
            _target: PhantomData,
        }
    }

    pub(crate) fn target(&self) -> Dependency {
        self.target
    }

    pub(crate) fn params(&self) -> &[Dependency] {
        &self.params
    }

    pub(crate) fn build(&self, args: &ResolvedArgs) -> Result<ServiceHandle, ContainerError> {
        (self.build)(args)
    }
}

impl std::fmt::Debug for ConstructorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstructorSpec")
            .field("target", &self.target.type_name)
            .field("arity", &self.params.len())
            .finish()
    }
}

/// Builder декларации: параметры в порядке объявления, затем замыкание.
pub struct ConstructorBuilder<T> {
    params: Vec<Dependency>,
    _target: PhantomData<fn() -> T>,
}

impl<T: Lifecycle + 'static> ConstructorBuilder<T> {
    pub fn param<P: ?Sized + Send + Sync + 'static>(mut self) -> Self {
        self.params.push(Dependency::of::<P>());
        self
    }

    pub fn build_with<F>(self, make: F) -> ConstructorSpec
    where
        F: Fn(&ResolvedArgs) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        ConstructorSpec {
            target: Dependency::of::<T>(),
            params: self.params,
            build: Box::new(move |args| Ok(ServiceHandle::owned(make(args)?))),
        }
    }
}

type FetchFn = Box<dyn Fn(&dyn HostAdapter) -> Option<ServiceHandle> + Send + Sync>;

/// Декларация host-backed типа: объект обязан уже существовать во внешнем
/// графе; контейнер его только находит (в пределах назначенного корня).
pub(crate) struct HostSpec {
    search_root: Option<String>,
    fetch: FetchFn,
}

impl HostSpec {
    pub(crate) fn search_root(&self) -> Option<&str> {
        self.search_root.as_deref()
    }

    pub(crate) fn fetch(&self, adapter: &dyn HostAdapter) -> Option<ServiceHandle> {
        (self.fetch)(adapter)
    }
}

struct TypeRecipe {
    type_name: &'static str,
    /// Отсортированы по убыванию арности; порядок декларации — tie-break.
    constructors: Vec<Arc<ConstructorSpec>>,
    host: Option<Arc<HostSpec>>,
}

/// Реестр конструкторов и host-деклараций, общий для всех scope.
#[derive(Default)]
pub struct ServiceCatalog {
    recipes: RwLock<HashMap<TypeId, TypeRecipe>>,
}

impl ServiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавить кандидата-конструктора для его целевого типа.
    pub fn declare(&self, spec: ConstructorSpec) {
        let target = spec.target();
        let mut recipes = self.recipes.write();
        let recipe = recipes.entry(target.type_id).or_insert_with(|| TypeRecipe {
            type_name: target.type_name,
            constructors: Vec::new(),
            host: None,
        });
        recipe.constructors.push(Arc::new(spec));
        recipe
            .constructors
            .sort_by(|a, b| b.params().len().cmp(&a.params().len()));
        debug!(
            target_type = target.type_name,
            candidates = recipe.constructors.len(),
            "constructor declared"
        );
    }

    /// Пометить тип как host-backed с назначенным корнем поиска.
    pub fn declare_host<T: Send + Sync + 'static>(&self, search_root: Option<&str>) {
        let root_for_query = search_root.map(|s| s.to_string());
        let fetch: FetchFn = Box::new(move |adapter| {
            let query = HostQuery {
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                search_root: root_for_query.clone(),
            };
            adapter
                .find_existing(&query)
                .and_then(|found| found.downcast::<T>().ok())
                .map(|arc| ServiceHandle::from_arc(arc, None))
        });

        let mut recipes = self.recipes.write();
        let recipe = recipes
            .entry(TypeId::of::<T>())
            .or_insert_with(|| TypeRecipe {
                type_name: std::any::type_name::<T>(),
                constructors: Vec::new(),
                host: None,
            });
        recipe.host = Some(Arc::new(HostSpec {
            search_root: search_root.map(|s| s.to_string()),
            fetch,
        }));
        debug!(
            target_type = std::any::type_name::<T>(),
            search_root, "host-backed type declared"
        );
    }

    pub(crate) fn constructors_for(&self, key: TypeId) -> Vec<Arc<ConstructorSpec>> {
        self.recipes
            .read()
            .get(&key)
            .map(|recipe| recipe.constructors.clone())
            .unwrap_or_default()
    }

    pub(crate) fn host_for(&self, key: TypeId) -> Option<Arc<HostSpec>> {
        self.recipes.read().get(&key).and_then(|r| r.host.clone())
    }

    pub(crate) fn is_constructible(&self, key: TypeId) -> bool {
        self.recipes
            .read()
            .get(&key)
            .map(|recipe| !recipe.constructors.is_empty())
            .unwrap_or(false)
    }

    /// Список задекларированных типов — для диагностики bootstrap-а.
    pub fn declared_types(&self) -> Vec<(TypeId, &'static str)> {
        self.recipes
            .read()
            .iter()
            .map(|(id, recipe)| (*id, recipe.type_name))
            .collect()
    }
}

impl std::fmt::Debug for ServiceCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCatalog")
            .field("declared", &self.recipes.read().len())
            .finish()
    }
}
