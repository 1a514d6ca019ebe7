//! Ошибки контейнера сервисов.
//!
//! Единый error type для всех операций bind/get/resolve. Все варианты —
//! ошибки разводки (wiring), а не переходящие runtime-условия: они
//! прерывают конкретный вызов bind, оставляя прежние привязки нетронутыми,
//! и должны громко валить bootstrap, а не ретраиться.

use thiserror::Error;

/// Основной error type для всех операций контейнера.
///
/// Содержит String-контекст вместо вложенных source-ошибок, чтобы оставаться
/// `Clone` и свободно переходить в `anyhow::Error` на границе приложения.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContainerError {
    /// Ключ уже занят в данном scope; существующая привязка не изменена.
    #[error("binding for {type_name} already exists in scope '{scope}'")]
    DuplicateBinding { type_name: String, scope: String },

    /// `get` по незарегистрированному ключу.
    #[error("service not found: {type_name} (scope '{scope}')")]
    ServiceNotFound { type_name: String, scope: String },

    /// Тип повторно вошёл в стек конструирования.
    #[error("cyclic dependency detected: {}", .chain.join(" -> "))]
    CyclicDependency { chain: Vec<String> },

    /// Ни один из заявленных конструкторов не разрешился полностью.
    #[error("no suitable constructor for {type_name} ({candidates} candidate(s) tried): {cause}")]
    NoSuitableConstructor {
        type_name: String,
        candidates: usize,
        cause: String,
    },

    /// Параметр без привязки, без host-декларации и без конструкторов.
    #[error("unresolved dependency {type_name} required by {dependent}")]
    UnresolvedDependency {
        type_name: String,
        dependent: String,
    },

    /// Host adapter не нашёл существующий объект запрошенного типа.
    #[error("host lookup failed for {type_name}")]
    HostLookupFailed {
        type_name: String,
        search_root: Option<String>,
    },

    /// Ошибка lifecycle-хука (initialize) при конструировании.
    #[error("lifecycle error during {operation} of {type_name}: {message}")]
    Lifecycle {
        type_name: String,
        operation: String,
        message: String,
    },

    /// Защита от неограниченной рекурсии конструирования.
    #[error("construction depth limit {limit} exceeded while resolving {type_name}")]
    DepthExceeded { type_name: String, limit: usize },
}

impl ContainerError {
    pub fn duplicate(type_name: impl Into<String>, scope: impl Into<String>) -> Self {
        ContainerError::DuplicateBinding {
            type_name: type_name.into(),
            scope: scope.into(),
        }
    }

    pub fn not_found(type_name: impl Into<String>, scope: impl Into<String>) -> Self {
        ContainerError::ServiceNotFound {
            type_name: type_name.into(),
            scope: scope.into(),
        }
    }

    pub fn cyclic(chain: Vec<String>) -> Self {
        ContainerError::CyclicDependency { chain }
    }

    pub fn no_constructor(
        type_name: impl Into<String>,
        candidates: usize,
        cause: impl Into<String>,
    ) -> Self {
        ContainerError::NoSuitableConstructor {
            type_name: type_name.into(),
            candidates,
            cause: cause.into(),
        }
    }

    pub fn unresolved(type_name: impl Into<String>, dependent: impl Into<String>) -> Self {
        ContainerError::UnresolvedDependency {
            type_name: type_name.into(),
            dependent: dependent.into(),
        }
    }

    pub fn host_lookup(type_name: impl Into<String>, search_root: Option<&str>) -> Self {
        ContainerError::HostLookupFailed {
            type_name: type_name.into(),
            search_root: search_root.map(|s| s.to_string()),
        }
    }

    pub fn lifecycle(
        type_name: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ContainerError::Lifecycle {
            type_name: type_name.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Категория для логирования и диагностики.
    pub fn category(&self) -> &'static str {
        match self {
            ContainerError::DuplicateBinding { .. } => "duplicate_binding",
            ContainerError::ServiceNotFound { .. } => "not_found",
            ContainerError::CyclicDependency { .. } => "cycle",
            ContainerError::NoSuitableConstructor { .. } => "no_constructor",
            ContainerError::UnresolvedDependency { .. } => "unresolved",
            ContainerError::HostLookupFailed { .. } => "host_lookup",
            ContainerError::Lifecycle { .. } => "lifecycle",
            ContainerError::DepthExceeded { .. } => "depth",
        }
    }

    /// Циклы и превышение глубины прерывают всё разрешение целиком:
    /// перебор следующих кандидатов-конструкторов их не поглощает.
    pub fn aborts_resolution(&self) -> bool {
        matches!(
            self,
            ContainerError::CyclicDependency { .. } | ContainerError::DepthExceeded { .. }
        )
    }
}
