use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{PanelError, Result};

/// Location and invocation of the LED matrix tool suite.
///
/// Tool paths are relative to `path`, the root of the matrix library checkout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatrixConfig {
    /// Root of the matrix library installation
    pub path: PathBuf,
    /// Prefix every renderer invocation with `sudo` (GPIO access needs root)
    pub sudo: bool,
    /// Image and animation viewer
    pub image_viewer: PathBuf,
    /// Scrolling text tool
    pub text_scroller: PathBuf,
    /// Clock shown while idle
    pub clock: PathBuf,
    /// Font used for scrolling text
    pub text_font: PathBuf,
    /// Font used for the idle clock
    pub clock_font: PathBuf,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/home/pi/rpi-rgb-led-matrix"),
            sudo: true,
            image_viewer: PathBuf::from("utils/led-image-viewer"),
            text_scroller: PathBuf::from("utils/text-scroller"),
            clock: PathBuf::from("examples-api-use/clock"),
            text_font: PathBuf::from("fonts/10x20.bdf"),
            clock_font: PathBuf::from("fonts/8x13.bdf"),
        }
    }
}

impl MatrixConfig {
    /// Resolve a tool or font path against the installation root.
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.path.join(relative)
    }
}

/// Physical layout of the chained panels. Rendered once into `--led-*` flags.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PanelGeometry {
    pub rows: u32,
    pub cols: u32,
    pub chain: u32,
    pub gpio_mapping: String,
    pub pixel_mapper: Option<String>,
    pub slowdown_gpio: u32,
    pub pwm_bits: u32,
    pub brightness: u8,
}

impl Default for PanelGeometry {
    fn default() -> Self {
        Self {
            rows: 32,
            cols: 32,
            chain: 4,
            gpio_mapping: "adafruit-hat".to_string(),
            pixel_mapper: Some("U-mapper".to_string()),
            slowdown_gpio: 2,
            pwm_bits: 11,
            brightness: 84,
        }
    }
}

impl PanelGeometry {
    pub fn led_flags(&self) -> Vec<String> {
        let mut flags = vec![
            format!("--led-rows={}", self.rows),
            format!("--led-cols={}", self.cols),
            format!("--led-chain={}", self.chain),
            format!("--led-gpio-mapping={}", self.gpio_mapping),
        ];
        if let Some(ref mapper) = self.pixel_mapper {
            flags.push(format!("--led-pixel-mapper={}", mapper));
        }
        flags.push(format!("--led-slowdown-gpio={}", self.slowdown_gpio));
        flags.push(format!("--led-pwm-bits={}", self.pwm_bits));
        flags.push(format!("--led-brightness={}", self.brightness));
        flags
    }
}

/// Remote asset repository used by sync jobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssetConfig {
    /// Base URL; assets live under `{base_url}/pictures/` and `{base_url}/animations/`
    pub base_url: String,
    /// Local directory holding `pictures/` and `animations/`
    pub dir: PathBuf,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            base_url: "http://pxl.cedrichoechli.com/service/uploads".to_string(),
            dir: PathBuf::from("assets"),
        }
    }
}

/// HTTP message source settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SourceConfig {
    pub listen_addr: SocketAddr,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Maximum number of pending jobs before submissions are rejected
    pub max_queue_len: usize,
    /// Kill a render that runs longer than this. Unset means wait forever.
    pub render_timeout_secs: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_queue_len: 1000,
            render_timeout_secs: None,
        }
    }
}

impl SchedulerConfig {
    pub fn render_timeout(&self) -> Option<Duration> {
        self.render_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PanelConfig {
    /// Splash image shown once at startup
    pub logo: PathBuf,
    #[serde(alias = "ledMatrix")]
    pub matrix: MatrixConfig,
    pub geometry: PanelGeometry,
    pub assets: AssetConfig,
    pub source: SourceConfig,
    pub scheduler: SchedulerConfig,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            logo: PathBuf::from("logo.png"),
            matrix: MatrixConfig::default(),
            geometry: PanelGeometry::default(),
            assets: AssetConfig::default(),
            source: SourceConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl PanelConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON configuration file.
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            PanelError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scheduler.max_queue_len == 0 {
            return Err(PanelError::Config(
                "scheduler.maxQueueLen must be at least 1".to_string(),
            ));
        }
        if self.scheduler.render_timeout_secs == Some(0) {
            return Err(PanelError::Config(
                "scheduler.renderTimeoutSecs must be positive when set".to_string(),
            ));
        }
        if self.geometry.rows == 0 || self.geometry.cols == 0 || self.geometry.chain == 0 {
            return Err(PanelError::Config(
                "geometry rows, cols and chain must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
