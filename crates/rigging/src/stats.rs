//! Счётчики контейнера для диагностики bootstrap-а.

use parking_lot::RwLock;

/// Снимок счётчиков одного scope.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ContainerStats {
    /// Текущее число привязок (заполняется при снятии снимка).
    pub bound_services: usize,
    pub total_binds: u64,
    pub total_resolutions: u64,
    pub failed_resolutions: u64,
    /// Сконструировано экземпляров (включая авто-зависимости).
    pub constructed_instances: u64,
    /// Найдено объектов во внешнем графе.
    pub host_discoveries: u64,
    pub disposed_instances: u64,
}

/// Аккумулятор; при выключенном `track_stats` все записи — no-op.
pub(crate) struct StatsRecorder {
    enabled: bool,
    data: RwLock<ContainerStats>,
}

impl StatsRecorder {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            data: RwLock::new(ContainerStats::default()),
        }
    }

    pub(crate) fn record_bind(&self) {
        if self.enabled {
            self.data.write().total_binds += 1;
        }
    }

    pub(crate) fn record_resolution(&self, success: bool) {
        if self.enabled {
            let mut data = self.data.write();
            data.total_resolutions += 1;
            if !success {
                data.failed_resolutions += 1;
            }
        }
    }

    pub(crate) fn record_construction(&self) {
        if self.enabled {
            self.data.write().constructed_instances += 1;
        }
    }

    pub(crate) fn record_host_discovery(&self) {
        if self.enabled {
            self.data.write().host_discoveries += 1;
        }
    }

    pub(crate) fn record_disposals(&self, count: u64) {
        if self.enabled && count > 0 {
            self.data.write().disposed_instances += count;
        }
    }

    pub(crate) fn snapshot(&self, bound_now: usize) -> ContainerStats {
        let mut snapshot = self.data.read().clone();
        snapshot.bound_services = bound_now;
        snapshot
    }
}
