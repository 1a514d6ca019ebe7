//! rigging — двухуровневый контейнер сервисов для движковых runtime-ов.
//!
//! Один глобальный scope на процесс плюс scene-scope на каждую загруженную
//! внешнюю сцену. Конструирование — eager, через явно задекларированные
//! конструкторы (список зависимостей + build-замыкание) вместо рефлексии;
//! параметры разрешаются по цепочке local → global → host-граф →
//! рекурсивное конструирование, с детектом циклов и транзакционным
//! кэшированием.
//!
//! Весь bootstrap синхронный и однопоточный: bind/get выполняются до конца
//! на треде host-окружения, асинхронных приостановок внутри контейнера нет.
//!
//! ```
//! use rigging::{ConstructorSpec, NullHostAdapter, Lifecycle, ServiceRuntime};
//! use std::sync::Arc;
//!
//! struct AmmoStore;
//! impl Lifecycle for AmmoStore {}
//!
//! struct Turret { ammo: Arc<AmmoStore> }
//! impl Lifecycle for Turret {}
//!
//! let runtime = ServiceRuntime::new(Arc::new(NullHostAdapter));
//! runtime.catalog().declare(ConstructorSpec::of::<AmmoStore>().build_with(|_| Ok(AmmoStore)));
//! runtime.catalog().declare(
//!     ConstructorSpec::of::<Turret>()
//!         .param::<AmmoStore>()
//!         .build_with(|args| Ok(Turret { ammo: args.get::<AmmoStore>()? })),
//! );
//!
//! runtime.global().bind_concrete::<Turret>().expect("turret wiring");
//! let turret = runtime.global().get::<Turret>().expect("turret bound");
//! assert!(runtime.global().try_get::<AmmoStore>().is_some());
//! # let _ = turret;
//! ```

mod binding;
mod catalog;
mod config;
mod container;
mod errors;
mod host;
mod lifecycle;
mod resolver;
mod runtime;
mod stats;

pub use catalog::{ConstructorBuilder, ConstructorSpec, Dependency, ResolvedArgs, ServiceCatalog};
pub use config::ContainerConfig;
pub use container::{Scope, ServiceContainer};
pub use errors::ContainerError;
pub use host::{HostAdapter, HostQuery, NullHostAdapter, SceneId};
pub use lifecycle::Lifecycle;
pub use runtime::{install, try_current, ServiceRuntime};
pub use stats::ContainerStats;
