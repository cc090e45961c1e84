// THEORY:
// Settings for the collaborators around the engine: which camera to open, how the
// frame is masked and edge-detected before contour tracing, and how long batch
// mode keeps each result on screen. The classifiers themselves have no knobs; their
// thresholds are part of what a shape or color *is*.
//
// Loading follows a fixed order: built-in defaults, then an optional TOML file
// (given explicitly or through `SEEKER_CONFIG`), then individual environment
// overrides, then validation. Every field of the file is optional.

use crate::error::{Result, SeekerError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "SEEKER_CONFIG";
pub const CAMERA_DEVICE_ENV: &str = "SEEKER_CAMERA_DEVICE";

const DEFAULT_CAMERA_DEVICE: i32 = 0;
const DEFAULT_WINDOW_TITLE: &str = "Shape Seeker";
const DEFAULT_INTERACTIVE_SCALE: f64 = 0.75;
const DEFAULT_KEY_POLL_MS: u64 = 30;
const DEFAULT_BATCH_SCALE: f64 = 0.5;
const DEFAULT_BATCH_DISPLAY_MS: u64 = 2500;
const DEFAULT_BATCH_PAUSE_MS: u64 = 3000;
const DEFAULT_HSV_LOWER: [u8; 3] = [93, 14, 44];
const DEFAULT_HSV_UPPER: [u8; 3] = [144, 255, 255];
const DEFAULT_CANNY_LOW: f64 = 150.0;
const DEFAULT_CANNY_HIGH: f64 = 200.0;
const DEFAULT_CANNY_APERTURE: i32 = 3;
// HighGUI takes its wait delay as an `i32` of milliseconds.
const MAX_DISPLAY_WAIT_MS: u128 = i32::MAX as u128;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SeekerConfigFile {
    capture: Option<CaptureConfigFile>,
    batch: Option<BatchConfigFile>,
    preprocess: Option<PreprocessConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CaptureConfigFile {
    device: Option<i32>,
    window_title: Option<String>,
    display_scale: Option<f64>,
    key_poll_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct BatchConfigFile {
    display_scale: Option<f64>,
    display_ms: Option<u64>,
    pause_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PreprocessConfigFile {
    hsv_lower: Option<[u8; 3]>,
    hsv_upper: Option<[u8; 3]>,
    canny_low: Option<f64>,
    canny_high: Option<f64>,
    canny_aperture: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SeekerConfig {
    pub capture: CaptureSettings,
    pub batch: BatchSettings,
    pub preprocess: PreprocessSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    /// Camera index handed to the capture backend.
    pub device: i32,
    pub window_title: String,
    /// Factor applied to the annotated frame before it is shown.
    pub display_scale: f64,
    /// How long the display waits for a key press per frame.
    pub key_poll: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchSettings {
    pub display_scale: f64,
    /// How long each batch result stays on screen.
    pub display: Duration,
    /// Idle time between two batch entries.
    pub pause: Duration,
}

/// Color mask and edge detection applied before contour tracing.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessSettings {
    /// Inclusive lower HSV bound of the mask (8-bit scale).
    pub hsv_lower: [u8; 3],
    pub hsv_upper: [u8; 3],
    pub canny_low: f64,
    pub canny_high: f64,
    pub canny_aperture: i32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            device: DEFAULT_CAMERA_DEVICE,
            window_title: DEFAULT_WINDOW_TITLE.to_string(),
            display_scale: DEFAULT_INTERACTIVE_SCALE,
            key_poll: Duration::from_millis(DEFAULT_KEY_POLL_MS),
        }
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            display_scale: DEFAULT_BATCH_SCALE,
            display: Duration::from_millis(DEFAULT_BATCH_DISPLAY_MS),
            pause: Duration::from_millis(DEFAULT_BATCH_PAUSE_MS),
        }
    }
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            hsv_lower: DEFAULT_HSV_LOWER,
            hsv_upper: DEFAULT_HSV_UPPER,
            canny_low: DEFAULT_CANNY_LOW,
            canny_high: DEFAULT_CANNY_HIGH,
            canny_aperture: DEFAULT_CANNY_APERTURE,
        }
    }
}

impl SeekerConfig {
    /// Loads from `path`, or from `$SEEKER_CONFIG` when no path is given, or from
    /// defaults when neither is set. Environment overrides and validation apply in
    /// every case.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let config_path = path.map(Path::to_path_buf).or(env_path);

        let file_cfg = match config_path.as_deref() {
            Some(path) => read_config_file(path)?,
            None => SeekerConfigFile::default(),
        };

        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate().map_err(|reason| SeekerError::Config {
            path: config_path,
            reason,
        })?;
        Ok(cfg)
    }

    /// Parses TOML text on top of the defaults and validates the result.
    pub fn from_toml(text: &str) -> Result<Self> {
        let file_cfg: SeekerConfigFile = toml::from_str(text).map_err(|err| SeekerError::Config {
            path: None,
            reason: err.to_string(),
        })?;
        let cfg = Self::from_file(file_cfg);
        cfg.validate()
            .map_err(|reason| SeekerError::Config { path: None, reason })?;
        Ok(cfg)
    }

    fn from_file(file: SeekerConfigFile) -> Self {
        let capture = file.capture.unwrap_or_default();
        let batch = file.batch.unwrap_or_default();
        let preprocess = file.preprocess.unwrap_or_default();

        Self {
            capture: CaptureSettings {
                device: capture.device.unwrap_or(DEFAULT_CAMERA_DEVICE),
                window_title: capture
                    .window_title
                    .unwrap_or_else(|| DEFAULT_WINDOW_TITLE.to_string()),
                display_scale: capture.display_scale.unwrap_or(DEFAULT_INTERACTIVE_SCALE),
                key_poll: Duration::from_millis(capture.key_poll_ms.unwrap_or(DEFAULT_KEY_POLL_MS)),
            },
            batch: BatchSettings {
                display_scale: batch.display_scale.unwrap_or(DEFAULT_BATCH_SCALE),
                display: Duration::from_millis(batch.display_ms.unwrap_or(DEFAULT_BATCH_DISPLAY_MS)),
                pause: Duration::from_millis(batch.pause_ms.unwrap_or(DEFAULT_BATCH_PAUSE_MS)),
            },
            preprocess: PreprocessSettings {
                hsv_lower: preprocess.hsv_lower.unwrap_or(DEFAULT_HSV_LOWER),
                hsv_upper: preprocess.hsv_upper.unwrap_or(DEFAULT_HSV_UPPER),
                canny_low: preprocess.canny_low.unwrap_or(DEFAULT_CANNY_LOW),
                canny_high: preprocess.canny_high.unwrap_or(DEFAULT_CANNY_HIGH),
                canny_aperture: preprocess.canny_aperture.unwrap_or(DEFAULT_CANNY_APERTURE),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var(CAMERA_DEVICE_ENV) {
            if !device.trim().is_empty() {
                self.capture.device = device.trim().parse().map_err(|_| SeekerError::Config {
                    path: None,
                    reason: format!("{CAMERA_DEVICE_ENV} must be an integer camera index"),
                })?;
            }
        }
        Ok(())
    }

    fn validate(&self) -> std::result::Result<(), String> {
        for (name, scale) in [
            ("capture.display_scale", self.capture.display_scale),
            ("batch.display_scale", self.batch.display_scale),
        ] {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(format!("{name} must be a positive number, got {scale}"));
            }
        }

        if self.capture.key_poll.is_zero() {
            return Err("capture.key_poll_ms must be greater than zero".to_string());
        }
        if self.batch.display.is_zero() {
            return Err("batch.display_ms must be greater than zero".to_string());
        }
        for (name, wait) in [
            ("capture.key_poll_ms", self.capture.key_poll),
            ("batch.display_ms", self.batch.display),
        ] {
            if wait.as_millis() > MAX_DISPLAY_WAIT_MS {
                return Err(format!(
                    "{name} must be at most {MAX_DISPLAY_WAIT_MS}, got {}",
                    wait.as_millis()
                ));
            }
        }

        let pre = &self.preprocess;
        if pre.hsv_lower[0] > 179 || pre.hsv_upper[0] > 179 {
            return Err("preprocess hue bounds must be within 0..=179".to_string());
        }
        if pre.hsv_lower.iter().zip(&pre.hsv_upper).any(|(low, high)| low > high) {
            return Err(format!(
                "preprocess.hsv_lower {:?} exceeds preprocess.hsv_upper {:?}",
                pre.hsv_lower, pre.hsv_upper
            ));
        }
        if pre.canny_low < 0.0 || pre.canny_low > pre.canny_high {
            return Err(format!(
                "canny thresholds must satisfy 0 <= low <= high, got {} / {}",
                pre.canny_low, pre.canny_high
            ));
        }
        if !matches!(pre.canny_aperture, 3 | 5 | 7) {
            return Err(format!(
                "preprocess.canny_aperture must be 3, 5 or 7, got {}",
                pre.canny_aperture
            ));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SeekerConfigFile> {
    let contents = std::fs::read_to_string(path).map_err(|err| SeekerError::Config {
        path: Some(path.to_path_buf()),
        reason: format!("failed to read config: {err}"),
    })?;
    toml::from_str(&contents).map_err(|err| SeekerError::Config {
        path: Some(path.to_path_buf()),
        reason: format!("failed to parse config: {err}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_calibrated_rig() {
        let cfg = SeekerConfig::default();
        assert_eq!(cfg.capture.device, 0);
        assert_eq!(cfg.capture.display_scale, 0.75);
        assert_eq!(cfg.capture.key_poll, Duration::from_millis(30));
        assert_eq!(cfg.batch.display_scale, 0.5);
        assert_eq!(cfg.batch.display, Duration::from_millis(2500));
        assert_eq!(cfg.batch.pause, Duration::from_millis(3000));
        assert_eq!(cfg.preprocess.hsv_lower, [93, 14, 44]);
        assert_eq!(cfg.preprocess.hsv_upper, [144, 255, 255]);
        assert_eq!((cfg.preprocess.canny_low, cfg.preprocess.canny_high), (150.0, 200.0));
        assert_eq!(cfg.preprocess.canny_aperture, 3);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_toml_overrides_only_what_it_names() {
        let cfg = SeekerConfig::from_toml(
            r#"
            [capture]
            device = 2

            [batch]
            pause_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.capture.device, 2);
        assert_eq!(cfg.capture.display_scale, 0.75);
        assert_eq!(cfg.batch.pause, Duration::ZERO);
        assert_eq!(cfg.batch.display, Duration::from_millis(2500));
        assert_eq!(cfg.preprocess, PreprocessSettings::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let inverted = "[preprocess]\nhsv_lower = [150, 0, 0]\nhsv_upper = [100, 255, 255]\n";
        assert!(matches!(SeekerConfig::from_toml(inverted), Err(SeekerError::Config { .. })));

        let aperture = "[preprocess]\ncanny_aperture = 4\n";
        assert!(SeekerConfig::from_toml(aperture).is_err());

        let scale = "[capture]\ndisplay_scale = 0.0\n";
        assert!(SeekerConfig::from_toml(scale).is_err());
    }

    #[test]
    fn display_waits_must_fit_a_highgui_delay() {
        let poll = "[capture]\nkey_poll_ms = 2147483648\n";
        assert!(matches!(SeekerConfig::from_toml(poll), Err(SeekerError::Config { .. })));

        let hold = "[batch]\ndisplay_ms = 4294967296\n";
        assert!(SeekerConfig::from_toml(hold).is_err());

        let longest = SeekerConfig::from_toml("[batch]\ndisplay_ms = 2147483647\n").unwrap();
        assert_eq!(longest.batch.display, Duration::from_millis(2_147_483_647));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(SeekerConfig::from_toml("[capture]\nfps = 30\n").is_err());
    }

    #[test]
    fn loads_from_an_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[batch]\ndisplay_ms = 500\ndisplay_scale = 1.0").unwrap();

        let cfg = SeekerConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.batch.display, Duration::from_millis(500));
        assert_eq!(cfg.batch.display_scale, 1.0);
    }

    #[test]
    fn missing_file_reports_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        match SeekerConfig::load(Some(&missing)) {
            Err(SeekerError::Config { path, .. }) => assert_eq!(path, Some(missing)),
            other => panic!("expected config error, got {other:?}"),
        }
    }
}
