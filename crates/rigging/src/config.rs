//! Конфигурация контейнера: пресеты + загрузка из JSON.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Имя для логов и диагностики.
    pub name: String,
    /// Логировать каждый шаг разрешения (шумно; для отладки bootstrap-а).
    pub log_resolutions: bool,
    /// Вести счётчики `ContainerStats`.
    pub track_stats: bool,
    /// Предел глубины рекурсивного конструирования.
    pub max_construction_depth: usize,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            name: "rigging".to_string(),
            log_resolutions: false,
            track_stats: true,
            max_construction_depth: 32,
        }
    }
}

impl ContainerConfig {
    /// Полная диагностика: пошаговые логи разрешения и счётчики.
    pub fn development() -> Self {
        Self {
            name: "rigging-dev".to_string(),
            log_resolutions: true,
            track_stats: true,
            ..Self::default()
        }
    }

    /// Минимум накладных расходов.
    pub fn production() -> Self {
        Self {
            name: "rigging".to_string(),
            log_resolutions: false,
            track_stats: false,
            ..Self::default()
        }
    }

    /// Для unit-тестов: без логов и счётчиков.
    pub fn minimal() -> Self {
        Self {
            name: "rigging-minimal".to_string(),
            log_resolutions: false,
            track_stats: false,
            max_construction_depth: 16,
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(raw).context("failed to parse container config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read container config {}", path.display()))?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            bail!("container config: name must not be empty");
        }
        if self.max_construction_depth == 0 {
            bail!("container config: max_construction_depth must be positive");
        }
        Ok(())
    }
}
