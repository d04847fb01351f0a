// ============================================
// Streaming Config - Настройки стриминга чанков
// ============================================
// JSON файл, все поля необязательны (#[serde(default)]).

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::terrain::generation::WorldGenerator;

/// Дальность прорисовки по умолчанию
pub const DEFAULT_RENDER_DISTANCE: f32 = 200.0;

/// Настройки стриминга
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Радиус загрузки (по горизонтали, до угла чанка)
    pub load_radius: f32,
    /// Зазор между загрузкой и выгрузкой (гистерезис)
    pub unload_margin: f32,
    /// Потоки фонового пула
    pub worker_threads: usize,
    /// Папка архива. None - архив в памяти
    pub archive_dir: Option<PathBuf>,
    pub generator: WorldGenerator,
    /// Предел ожидания prime() и сброса архива
    pub prime_timeout_ms: u64,
    pub prime_poll_ms: u64,
    /// Радиус, в котором отдаются источники света
    pub light_radius: f32,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            load_radius: DEFAULT_RENDER_DISTANCE * 1.3,
            unload_margin: 128.0,
            worker_threads: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            archive_dir: None,
            generator: WorldGenerator::default(),
            prime_timeout_ms: 30_000,
            prime_poll_ms: 50,
            light_radius: 50.0,
        }
    }
}

impl StreamingConfig {
    /// Загрузить конфиг из JSON файла
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Проверить инварианты
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.load_radius.is_nan() || self.load_radius <= 0.0 {
            return Err(ConfigError::Invalid(format!("load_radius must be > 0, got {}", self.load_radius)));
        }
        if self.unload_margin.is_nan() || self.unload_margin <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "unload_margin must be > 0, got {}",
                self.unload_margin
            )));
        }
        if self.worker_threads == 0 {
            return Err(ConfigError::Invalid("worker_threads must be > 0".to_string()));
        }
        if self.prime_poll_ms == 0 {
            return Err(ConfigError::Invalid("prime_poll_ms must be > 0".to_string()));
        }
        Ok(())
    }

    /// Радиус выгрузки
    #[inline]
    pub fn unload_radius(&self) -> f32 {
        self.load_radius + self.unload_margin
    }
}

/// Ошибки конфига
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
    Invalid(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {}", e),
            ConfigError::Parse(e) => write!(f, "config parse error: {}", e),
            ConfigError::Invalid(e) => write!(f, "invalid config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            _ => None,
        }
    }
}
