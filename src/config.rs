use crate::barcode::{BarcodeFormat, CameraFacing, DetectionSpeed};
use crate::geometry::{FitMode, Rect};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ScanviewConfig {
    pub scanner: ScannerConfig,
    pub scan_window: ScanWindowConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ScannerConfig {
    /// Which camera to open
    #[serde(default)]
    pub facing: CameraFacing,

    /// Formats to detect; empty means all
    #[serde(default)]
    pub formats: Vec<BarcodeFormat>,

    /// Detection delivery policy
    #[serde(default)]
    pub detection_speed: DetectionSpeed,

    /// Minimum time between results with the normal detection speed
    #[serde(default = "default_detection_timeout_ms")]
    pub detection_timeout_ms: u64,

    /// Ask the native side to attach the analyzed image to results
    #[serde(default)]
    pub return_image: bool,

    /// Turn the torch on when the session opens
    #[serde(default)]
    pub torch_enabled: bool,

    /// Start scanning as soon as the view is attached
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,

    /// Wait this long before the very first start attempt
    #[serde(default)]
    pub start_delay_ms: Option<u64>,

    /// Requested camera resolution (width, height)
    #[serde(default)]
    pub camera_resolution: Option<(u32, u32)>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ScanWindowConfig {
    /// How the camera texture is fit into the preview box
    #[serde(default)]
    pub fit: FitMode,

    /// Scan window in preview coordinates: [left, top, right, bottom]
    #[serde(default)]
    pub window: Option<[f64; 4]>,

    /// Minimum width or height change before a new window is pushed
    #[serde(default)]
    pub update_threshold: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl ScanWindowConfig {
    pub fn window_rect(&self) -> Option<Rect> {
        self.window.map(Rect::from)
    }
}

impl ScanviewConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("scanner.facing", "back")?
            .set_default("scanner.formats", Vec::<String>::new())?
            .set_default("scanner.detection_speed", "normal")?
            .set_default(
                "scanner.detection_timeout_ms",
                default_detection_timeout_ms(),
            )?
            .set_default("scanner.return_image", false)?
            .set_default("scanner.torch_enabled", false)?
            .set_default("scanner.auto_start", default_auto_start())?
            .set_default("scan_window.fit", "cover")?
            .set_default("scan_window.update_threshold", 0.0)?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // SCANVIEW_SCANNER__AUTO_START=false
            .add_source(
                Environment::with_prefix("SCANVIEW")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: ScanviewConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scanner.detection_speed == DetectionSpeed::Normal
            && self.scanner.detection_timeout_ms == 0
        {
            return Err(ConfigError::Message(
                "Detection timeout must be greater than 0 for normal detection speed".to_string(),
            ));
        }

        if let Some((width, height)) = self.scanner.camera_resolution {
            if width == 0 || height == 0 {
                return Err(ConfigError::Message(
                    "Camera resolution must be greater than 0".to_string(),
                ));
            }
        }

        let threshold = self.scan_window.update_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::Message(
                "Scan window update threshold must be a non-negative number".to_string(),
            ));
        }

        if let Some(window) = self.scan_window.window_rect() {
            if !window.is_valid() {
                return Err(ConfigError::Message(format!(
                    "Scan window {} must have left <= right and top <= bottom",
                    window
                )));
            }
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            facing: CameraFacing::default(),
            formats: Vec::new(),
            detection_speed: DetectionSpeed::default(),
            detection_timeout_ms: default_detection_timeout_ms(),
            return_image: false,
            torch_enabled: false,
            auto_start: default_auto_start(),
            start_delay_ms: None,
            camera_resolution: None,
        }
    }
}

impl Default for ScanWindowConfig {
    fn default() -> Self {
        Self {
            fit: FitMode::default(),
            window: None,
            update_threshold: 0.0,
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            event_bus_capacity: default_event_bus_capacity(),
        }
    }
}

impl Default for ScanviewConfig {
    fn default() -> Self {
        Self {
            scanner: ScannerConfig::default(),
            scan_window: ScanWindowConfig::default(),
            system: SystemConfig::default(),
        }
    }
}

// Default value functions
fn default_detection_timeout_ms() -> u64 {
    250
}
fn default_auto_start() -> bool {
    true
}
fn default_event_bus_capacity() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ScanviewConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scan_window.fit, FitMode::Cover);
        assert!(config.scan_window.window_rect().is_none());
        assert!(config.scanner.auto_start);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ScanviewConfig::default();

        config.scan_window.update_threshold = -0.1;
        assert!(config.validate().is_err());
        config.scan_window.update_threshold = 0.05;
        assert!(config.validate().is_ok());

        config.scan_window.window = Some([100.0, 50.0, 10.0, 200.0]);
        assert!(config.validate().is_err());
        config.scan_window.window = Some([10.0, 50.0, 100.0, 200.0]);
        assert!(config.validate().is_ok());

        config.scanner.camera_resolution = Some((0, 480));
        assert!(config.validate().is_err());
        config.scanner.camera_resolution = Some((640, 480));

        config.scanner.detection_timeout_ms = 0;
        assert!(config.validate().is_err());
        config.scanner.detection_speed = DetectionSpeed::Unrestricted;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[scanner]
facing = "front"
formats = ["qr_code", "ean13"]
start_delay_ms = 500

[scan_window]
fit = "contain"
window = [20.0, 40.0, 280.0, 200.0]
update_threshold = 0.01
"#
        )
        .unwrap();

        let config = ScanviewConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.scanner.facing, CameraFacing::Front);
        assert_eq!(
            config.scanner.formats,
            vec![BarcodeFormat::QrCode, BarcodeFormat::Ean13]
        );
        assert_eq!(config.scanner.start_delay_ms, Some(500));
        assert_eq!(config.scanner.detection_timeout_ms, 250);
        assert_eq!(config.scan_window.fit, FitMode::Contain);
        assert_eq!(
            config.scan_window.window_rect(),
            Some(Rect::from_ltrb(20.0, 40.0, 280.0, 200.0))
        );
        assert_eq!(config.system.event_bus_capacity, 64);
    }

    #[test]
    fn test_default_config_renders_as_toml() {
        let rendered = ScanviewConfig::default().to_toml().unwrap();
        assert!(rendered.contains("[scan_window]"));
        assert!(rendered.contains("fit = \"cover\""));
    }
}
