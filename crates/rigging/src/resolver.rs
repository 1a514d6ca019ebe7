//! Resolver — алгоритм constructor-injection поверх каталога.
//!
//! Одна `ResolutionSession` живёт ровно один top-level bind-вызов: в ней
//! стек конструирования (детект циклов) и staging разрешённых зависимостей.
//! Staged-записи становятся видимыми хранилищу только при коммите успешной
//! сессии, поэтому упавший bind не оставляет частичных регистраций, а
//! "Constructing"-экземпляры никогда не видны `get`.

use std::any::TypeId;
use std::collections::HashMap;

use tracing::debug;

use crate::binding::{BindingEntry, ServiceHandle};
use crate::catalog::{ConstructorSpec, Dependency, ResolvedArgs};
use crate::container::ServiceContainer;
use crate::errors::ContainerError;

pub(crate) struct ResolutionSession<'a> {
    container: &'a ServiceContainer,
    /// Стек типов, находящихся в процессе конструирования.
    stack: Vec<Dependency>,
    /// Разрешённые по пути зависимости; коммитятся в local scope.
    staged: HashMap<TypeId, BindingEntry>,
}

impl<'a> ResolutionSession<'a> {
    pub(crate) fn new(container: &'a ServiceContainer) -> Self {
        Self {
            container,
            stack: Vec::new(),
            staged: HashMap::new(),
        }
    }

    /// Сконструировать `target` по заявленным кандидатам-конструкторам.
    ///
    /// Кандидаты перебираются от самого параметризованного к нулевому
    /// (greedy tie-break); цикл или превышение глубины прерывают всё
    /// разрешение, не давая перебору поглотить ошибку.
    pub(crate) fn construct(
        &mut self,
        target: Dependency,
    ) -> Result<ServiceHandle, ContainerError> {
        if self.stack.iter().any(|d| d.type_id == target.type_id) {
            let mut chain: Vec<String> =
                self.stack.iter().map(|d| d.type_name.to_string()).collect();
            chain.push(target.type_name.to_string());
            return Err(ContainerError::cyclic(chain));
        }

        let limit = self.container.config().max_construction_depth;
        if self.stack.len() >= limit {
            return Err(ContainerError::DepthExceeded {
                type_name: target.type_name.to_string(),
                limit,
            });
        }

        self.stack.push(target);
        let result = self.construct_inner(target);
        self.stack.pop();
        result
    }

    fn construct_inner(&mut self, target: Dependency) -> Result<ServiceHandle, ContainerError> {
        let candidates = self.container.catalog().constructors_for(target.type_id);
        if candidates.is_empty() {
            return Err(ContainerError::no_constructor(
                target.type_name,
                0,
                "no declared constructors",
            ));
        }

        let mut last_cause: Option<ContainerError> = None;
        for spec in &candidates {
            // Snapshot, чтобы брошенный кандидат не оставил следов в staging.
            let checkpoint = self.staged.clone();
            match self.try_candidate(spec) {
                Ok(handle) => return Ok(handle),
                Err(err) if err.aborts_resolution() => return Err(err),
                Err(err) => {
                    self.staged = checkpoint;
                    if self.container.config().log_resolutions {
                        debug!(
                            target_type = target.type_name,
                            arity = spec.params().len(),
                            cause = %err,
                            "constructor candidate failed, trying next"
                        );
                    }
                    last_cause = Some(err);
                }
            }
        }

        Err(ContainerError::no_constructor(
            target.type_name,
            candidates.len(),
            last_cause
                .map(|err| err.to_string())
                .unwrap_or_else(|| "no candidates tried".to_string()),
        ))
    }

    fn try_candidate(&mut self, spec: &ConstructorSpec) -> Result<ServiceHandle, ContainerError> {
        let mut args = ResolvedArgs::default();
        for dep in spec.params() {
            let handle = self.resolve_dependency(*dep)?;
            args.insert(dep.type_id, handle);
        }

        let handle = spec.build(&args)?;
        self.container.stats_recorder().record_construction();
        // initialize до того, как экземпляр станет доступен другим шагам.
        handle.initialize()?;
        Ok(handle)
    }

    /// Цепочка разрешения параметра: staged/local → parent → host → рекурсия.
    fn resolve_dependency(&mut self, dep: Dependency) -> Result<ServiceHandle, ContainerError> {
        if let Some(entry) = self.staged.get(&dep.type_id) {
            return Ok(entry.handle().clone());
        }
        if let Some(handle) = self.container.lookup_local(dep.type_id) {
            return Ok(handle);
        }
        if let Some(handle) = self.container.lookup_parent(dep.type_id) {
            return Ok(handle);
        }

        // Host-backed: найти во внешнем графе и закэшировать в local scope.
        if let Some(host_spec) = self.container.catalog().host_for(dep.type_id) {
            return match host_spec.fetch(self.container.host_adapter()) {
                Some(handle) => {
                    self.container.stats_recorder().record_host_discovery();
                    if self.container.config().log_resolutions {
                        debug!(
                            dependency = dep.type_name,
                            search_root = host_spec.search_root(),
                            "dependency discovered in host environment"
                        );
                    }
                    self.staged
                        .insert(dep.type_id, BindingEntry::host_owned(handle.clone()));
                    Ok(handle)
                }
                None => Err(ContainerError::host_lookup(
                    dep.type_name,
                    host_spec.search_root(),
                )),
            };
        }

        // Конструируемый тип: рекурсия + кэш в local scope.
        if self.container.catalog().is_constructible(dep.type_id) {
            let handle = self.construct(dep)?;
            self.staged
                .insert(dep.type_id, BindingEntry::container_owned(handle.clone()));
            return Ok(handle);
        }

        let dependent = self
            .stack
            .last()
            .map(|d| d.type_name.to_string())
            .unwrap_or_else(|| "<root>".to_string());
        Err(ContainerError::unresolved(dep.type_name, dependent))
    }

    /// Отдать staged-записи на коммит в хранилище инициировавшего scope.
    pub(crate) fn into_staged(self) -> HashMap<TypeId, BindingEntry> {
        self.staged
    }
}
