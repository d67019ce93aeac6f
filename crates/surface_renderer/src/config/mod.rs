//! Configuration system
//!
//! Renderer and scene settings, loadable from TOML or RON files.

pub use serde::{Deserialize, Serialize};

use std::time::Duration;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is outside its accepted range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Preferred swapchain presentation mode.
///
/// FIFO is the only mode every Vulkan driver must support, so any other
/// preference falls back to it when the surface does not offer it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentModePreference {
    /// Vsync-locked queue
    Fifo,
    /// Low-latency triple buffering
    Mailbox,
    /// No vsync
    Immediate,
}

/// # Renderer Configuration
///
/// Settings for the renderer core, its graphics backend and the render loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Application name reported to the graphics driver
    pub application_name: String,
    /// Whether to enable Vulkan validation layers. `None` follows the build type.
    pub enable_validation: Option<bool>,
    /// Preferred presentation mode
    pub present_mode: PresentModePreference,
    /// Maximum frames the CPU may record ahead of the GPU
    pub max_frames_in_flight: usize,
    /// Upper bound on any single wait for the GPU, in milliseconds
    pub frame_timeout_ms: u64,
    /// Render loop tick interval, in milliseconds
    pub frame_interval_ms: u64,
    /// `env_logger` filter used by [`crate::foundation::logging::init_with_level`]
    pub log_level: String,
}

impl RendererConfig {
    /// Create a new renderer configuration
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            enable_validation: None,
            present_mode: PresentModePreference::Fifo,
            max_frames_in_flight: 2,
            frame_timeout_ms: 1000,
            frame_interval_ms: 16,
            log_level: "info".to_string(),
        }
    }

    /// Enable or disable validation layers
    #[must_use]
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = Some(enabled);
        self
    }

    /// Set the preferred presentation mode
    #[must_use]
    pub fn with_present_mode(mut self, mode: PresentModePreference) -> Self {
        self.present_mode = mode;
        self
    }

    /// Set maximum frames in flight
    #[must_use]
    pub fn with_max_frames_in_flight(mut self, frames: usize) -> Self {
        self.max_frames_in_flight = frames;
        self
    }

    /// Whether validation layers should be requested
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// GPU wait timeout in nanoseconds, as Vulkan expects it
    pub fn frame_timeout_ns(&self) -> u64 {
        self.frame_timeout_ms.saturating_mul(1_000_000)
    }

    /// Render loop tick interval
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application_name.is_empty() {
            return Err(ConfigError::Invalid("Application name cannot be empty".to_string()));
        }

        if self.max_frames_in_flight == 0 {
            return Err(ConfigError::Invalid("Max frames in flight must be at least 1".to_string()));
        }

        if self.max_frames_in_flight > 8 {
            return Err(ConfigError::Invalid(
                "Max frames in flight should not exceed 8".to_string(),
            ));
        }

        if self.frame_timeout_ms == 0 {
            return Err(ConfigError::Invalid("Frame timeout must be non-zero".to_string()));
        }

        if self.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid("Frame interval must be non-zero".to_string()));
        }

        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new("Surface Renderer")
    }
}

impl Config for RendererConfig {}

/// # Scene Configuration
///
/// Colours and animation parameters for the rectangle-and-line scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Background clear colour (RGBA)
    pub clear_color: [f32; 4],
    /// Rectangle colour (RGBA, drawn opaque)
    pub rect_color: [f32; 4],
    /// Line base colour (RGB); alpha comes from the gradient
    pub line_color: [f32; 3],
    /// Line offset advance per presented frame, in NDC units
    pub line_step: f32,
    /// Number of segments approximating the line's alpha gradient
    pub line_segments: u32,
}

impl SceneConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.line_step.is_finite() && self.line_step >= 0.0 && self.line_step <= 2.0) {
            return Err(ConfigError::Invalid(format!(
                "Line step must be within [0, 2], got {}",
                self.line_step
            )));
        }

        if self.line_segments == 0 {
            return Err(ConfigError::Invalid("Line needs at least one segment".to_string()));
        }

        let mut channels = self
            .clear_color
            .iter()
            .chain(self.rect_color.iter())
            .chain(self.line_color.iter());
        if channels.any(|c| !(0.0..=1.0).contains(c)) {
            return Err(ConfigError::Invalid("Colour channels must be within [0, 1]".to_string()));
        }

        Ok(())
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            rect_color: [1.0, 1.0, 1.0, 1.0],
            line_color: [1.0, 1.0, 1.0],
            line_step: 0.01,
            line_segments: 64,
        }
    }
}

impl Config for SceneConfig {}
