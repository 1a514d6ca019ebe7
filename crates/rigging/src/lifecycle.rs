//! Lifecycle-контракт для сервисов, которыми владеет контейнер.
//!
//! Один opt-in trait вместо пары интерфейсов: Rust не умеет спрашивать тип
//! о реализованных интерфейсах во время исполнения, поэтому "не реализует
//! контракт" выражается no-op методом по умолчанию.

use anyhow::Result;

/// Хуки, которые контейнер вызывает вокруг конструирования и teardown.
///
/// `initialize` выполняется ровно один раз, синхронно, сразу после
/// конструирования и до того, как экземпляр станет виден другим
/// разрешениям; зависимости инициализируются раньше зависимых (callee
/// перед caller). Ошибка прерывает соответствующий bind-вызов, экземпляр
/// не регистрируется.
///
/// `dispose` выполняется ровно один раз при `unbind`/`clear`. Ошибки
/// логируются и не пробрасываются: teardown всегда доходит до конца.
/// Host-owned экземпляры контейнер не трогает ни одним из хуков.
pub trait Lifecycle: Send + Sync {
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn dispose(&self) -> Result<()> {
        Ok(())
    }
}
