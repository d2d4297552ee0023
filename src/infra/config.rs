//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! Every section is optional; missing keys take the defaults below.

use anyhow::{bail, Context};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    /// Random local proposals
    Simulated,
    /// Push feed from an MQTT topic
    Mqtt,
    /// No live updates
    Off,
}

impl FeedMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedMode::Simulated => "simulated",
            FeedMode::Mqtt => "mqtt",
            FeedMode::Off => "off",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_tour_file")]
    pub tour_file: String,
    #[serde(default = "default_true")]
    pub clear_selection_on_close: bool,
    #[serde(default = "default_true")]
    pub fullscreen_enabled: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tour_file: default_tour_file(),
            clear_selection_on_close: true,
            fullscreen_enabled: true,
        }
    }
}

fn default_tour_file() -> String {
    "tours/demo_bus.json".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_max_selectable_seats")]
    pub max_selectable_seats: usize,
    #[serde(default = "default_true")]
    pub show_recommendations: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { max_selectable_seats: default_max_selectable_seats(), show_recommendations: true }
    }
}

fn default_max_selectable_seats() -> usize {
    6
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_mode")]
    pub mode: FeedMode,
    #[serde(default = "default_feed_interval_ms")]
    pub interval_ms: u64,
    /// Chance per tick that a proposal is made at all
    #[serde(default = "default_flip_probability")]
    pub flip_probability: f64,
    /// Share of proposals that are `occupied` rather than `reserved`
    #[serde(default = "default_occupied_weight")]
    pub occupied_weight: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            mode: default_feed_mode(),
            interval_ms: default_feed_interval_ms(),
            flip_probability: default_flip_probability(),
            occupied_weight: default_occupied_weight(),
            seed: None,
        }
    }
}

fn default_feed_mode() -> FeedMode {
    FeedMode::Simulated
}

fn default_feed_interval_ms() -> u64 {
    5000
}

fn default_flip_probability() -> f64 {
    0.1
}

fn default_occupied_weight() -> f64 {
    0.7
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_rotate_step_deg")]
    pub rotate_step_deg: f64,
    #[serde(default = "default_pan_step_px")]
    pub pan_step_px: f64,
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f64,
    /// Degrees of rotation per dragged pixel
    #[serde(default = "default_drag_sensitivity")]
    pub drag_sensitivity: f64,
    /// Zoom change per wheel unit
    #[serde(default = "default_wheel_zoom_step")]
    pub wheel_zoom_step: f64,
    #[serde(default = "default_max_pan_px")]
    pub max_pan_px: f64,
    /// Frame tick driving auto-rotate
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    #[serde(default = "default_base_hfov_deg")]
    pub base_hfov_deg: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            rotate_step_deg: default_rotate_step_deg(),
            pan_step_px: default_pan_step_px(),
            zoom_step: default_zoom_step(),
            drag_sensitivity: default_drag_sensitivity(),
            wheel_zoom_step: default_wheel_zoom_step(),
            max_pan_px: default_max_pan_px(),
            frame_interval_ms: default_frame_interval_ms(),
            base_hfov_deg: default_base_hfov_deg(),
        }
    }
}

fn default_rotate_step_deg() -> f64 {
    5.0
}

fn default_pan_step_px() -> f64 {
    20.0
}

fn default_zoom_step() -> f64 {
    0.1
}

fn default_drag_sensitivity() -> f64 {
    0.25
}

fn default_wheel_zoom_step() -> f64 {
    0.001
}

fn default_max_pan_px() -> f64 {
    1000.0
}

fn default_frame_interval_ms() -> u64 {
    50
}

fn default_base_hfov_deg() -> f64 {
    90.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewportConfig {
    #[serde(default = "default_viewport_width")]
    pub width: f64,
    #[serde(default = "default_viewport_height")]
    pub height: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self { width: default_viewport_width(), height: default_viewport_height() }
    }
}

fn default_viewport_width() -> f64 {
    1280.0
}

fn default_viewport_height() -> f64 {
    720.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// File path for booking handoff (JSONL format)
    #[serde(default = "default_handoff_file")]
    pub handoff_file: String,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self { handoff_file: default_handoff_file() }
    }
}

fn default_handoff_file() -> String {
    "bookings.jsonl".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_mqtt_host")]
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    #[serde(default = "default_mqtt_topic")]
    pub topic: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            topic: default_mqtt_topic(),
            username: None,
            password: None,
        }
    }
}

fn default_mqtt_host() -> String {
    "localhost".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_mqtt_topic() -> String {
    "seatview/status".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub viewport: ViewportConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    config_file: String,
    tour_file: String,
    clear_selection_on_close: bool,
    fullscreen_enabled: bool,
    max_selectable_seats: usize,
    show_recommendations: bool,
    feed_mode: FeedMode,
    feed_interval_ms: u64,
    flip_probability: f64,
    occupied_weight: f64,
    feed_seed: Option<u64>,
    rotate_step_deg: f64,
    pan_step_px: f64,
    zoom_step: f64,
    drag_sensitivity: f64,
    wheel_zoom_step: f64,
    max_pan_px: f64,
    frame_interval_ms: u64,
    base_hfov_deg: f64,
    viewport_width: f64,
    viewport_height: f64,
    handoff_file: String,
    mqtt_host: String,
    mqtt_port: u16,
    mqtt_topic: String,
    mqtt_username: Option<String>,
    mqtt_password: Option<String>,
    metrics_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default")
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: &str) -> Self {
        let TomlConfig { session, selection, feed, camera, viewport, booking, mqtt, metrics } =
            toml_config;
        Self {
            config_file: config_file.to_string(),
            tour_file: session.tour_file,
            clear_selection_on_close: session.clear_selection_on_close,
            fullscreen_enabled: session.fullscreen_enabled,
            max_selectable_seats: selection.max_selectable_seats,
            show_recommendations: selection.show_recommendations,
            feed_mode: feed.mode,
            feed_interval_ms: feed.interval_ms,
            flip_probability: feed.flip_probability,
            occupied_weight: feed.occupied_weight,
            feed_seed: feed.seed,
            rotate_step_deg: camera.rotate_step_deg,
            pan_step_px: camera.pan_step_px,
            zoom_step: camera.zoom_step,
            drag_sensitivity: camera.drag_sensitivity,
            wheel_zoom_step: camera.wheel_zoom_step,
            max_pan_px: camera.max_pan_px,
            frame_interval_ms: camera.frame_interval_ms,
            base_hfov_deg: camera.base_hfov_deg,
            viewport_width: viewport.width,
            viewport_height: viewport.height,
            handoff_file: booking.handoff_file,
            mqtt_host: mqtt.host,
            mqtt_port: mqtt.port,
            mqtt_topic: mqtt.topic,
            mqtt_username: mqtt.username,
            mqtt_password: mqtt.password,
            metrics_interval_secs: metrics.interval_secs,
        }
    }

    /// Determine config file path from args or environment
    pub fn resolve_config_path(args: &[String]) -> String {
        for (i, arg) in args.iter().enumerate() {
            if arg == "--config" {
                if let Some(path) = args.get(i + 1) {
                    return path.clone();
                }
            }
            if let Some(path) = arg.strip_prefix("--config=") {
                return path.to_string();
            }
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let config = Self::from_toml(toml_config, &path.display().to_string());
        config
            .validate()
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from `path`, falling back to defaults on any error
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(config_file = %path, error = %format!("{:#}", e), "config_fallback_to_defaults");
                Self::default()
            }
        }
    }

    /// Range checks run once, at construction
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_selectable_seats == 0 {
            bail!("selection.max_selectable_seats must be at least 1");
        }
        for (name, p) in
            [("feed.flip_probability", self.flip_probability), ("feed.occupied_weight", self.occupied_weight)]
        {
            if !(0.0..=1.0).contains(&p) {
                bail!("{} must be within [0, 1], got {}", name, p);
            }
        }
        if self.feed_interval_ms == 0 {
            bail!("feed.interval_ms must be positive");
        }
        if self.frame_interval_ms == 0 {
            bail!("camera.frame_interval_ms must be positive");
        }
        if self.metrics_interval_secs == 0 {
            bail!("metrics.interval_secs must be positive");
        }
        for (name, v) in [
            ("camera.rotate_step_deg", self.rotate_step_deg),
            ("camera.pan_step_px", self.pan_step_px),
            ("camera.zoom_step", self.zoom_step),
            ("camera.drag_sensitivity", self.drag_sensitivity),
            ("camera.wheel_zoom_step", self.wheel_zoom_step),
            ("camera.max_pan_px", self.max_pan_px),
            ("viewport.width", self.viewport_width),
            ("viewport.height", self.viewport_height),
        ] {
            if !(v.is_finite() && v > 0.0) {
                bail!("{} must be a positive number, got {}", name, v);
            }
        }
        if !(self.base_hfov_deg > 0.0 && self.base_hfov_deg < 180.0) {
            bail!("camera.base_hfov_deg must be within (0, 180), got {}", self.base_hfov_deg);
        }
        Ok(())
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    pub fn tour_file(&self) -> &str {
        &self.tour_file
    }

    pub fn clear_selection_on_close(&self) -> bool {
        self.clear_selection_on_close
    }

    pub fn fullscreen_enabled(&self) -> bool {
        self.fullscreen_enabled
    }

    pub fn max_selectable_seats(&self) -> usize {
        self.max_selectable_seats
    }

    pub fn show_recommendations(&self) -> bool {
        self.show_recommendations
    }

    pub fn feed_mode(&self) -> FeedMode {
        self.feed_mode
    }

    pub fn feed_interval_ms(&self) -> u64 {
        self.feed_interval_ms
    }

    pub fn flip_probability(&self) -> f64 {
        self.flip_probability
    }

    pub fn occupied_weight(&self) -> f64 {
        self.occupied_weight
    }

    pub fn feed_seed(&self) -> Option<u64> {
        self.feed_seed
    }

    pub fn rotate_step_deg(&self) -> f64 {
        self.rotate_step_deg
    }

    pub fn pan_step_px(&self) -> f64 {
        self.pan_step_px
    }

    pub fn zoom_step(&self) -> f64 {
        self.zoom_step
    }

    pub fn drag_sensitivity(&self) -> f64 {
        self.drag_sensitivity
    }

    pub fn wheel_zoom_step(&self) -> f64 {
        self.wheel_zoom_step
    }

    pub fn max_pan_px(&self) -> f64 {
        self.max_pan_px
    }

    pub fn frame_interval_ms(&self) -> u64 {
        self.frame_interval_ms
    }

    pub fn base_hfov_deg(&self) -> f64 {
        self.base_hfov_deg
    }

    pub fn viewport_width(&self) -> f64 {
        self.viewport_width
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub fn handoff_file(&self) -> &str {
        &self.handoff_file
    }

    pub fn mqtt_host(&self) -> &str {
        &self.mqtt_host
    }

    pub fn mqtt_port(&self) -> u16 {
        self.mqtt_port
    }

    pub fn mqtt_topic(&self) -> &str {
        &self.mqtt_topic
    }

    pub fn mqtt_username(&self) -> Option<&str> {
        self.mqtt_username.as_deref()
    }

    pub fn mqtt_password(&self) -> Option<&str> {
        self.mqtt_password.as_deref()
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    /// Builder method for tests to set the selection limit
    pub fn with_max_selectable_seats(mut self, max: usize) -> Self {
        self.max_selectable_seats = max;
        self
    }

    /// Builder method for tests to choose the feed
    pub fn with_feed_mode(mut self, mode: FeedMode) -> Self {
        self.feed_mode = mode;
        self
    }

    /// Builder method for tests to keep the selection across close
    pub fn with_clear_selection_on_close(mut self, clear: bool) -> Self {
        self.clear_selection_on_close = clear;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tour_file(), "tours/demo_bus.json");
        assert_eq!(config.max_selectable_seats(), 6);
        assert_eq!(config.feed_mode(), FeedMode::Simulated);
        assert_eq!(config.feed_interval_ms(), 5000);
        assert_eq!(config.occupied_weight(), 0.7);
        assert_eq!(config.mqtt_topic(), "seatview/status");
        assert!(config.clear_selection_on_close());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_config_path_default() {
        let args: Vec<String> = vec!["seatview".to_string()];
        if env::var("CONFIG_FILE").is_err() {
            assert_eq!(Config::resolve_config_path(&args), "config/dev.toml");
        }
    }

    #[test]
    fn test_resolve_config_path_from_arg() {
        let args: Vec<String> =
            vec!["seatview".to_string(), "--config".to_string(), "config/kiosk.toml".to_string()];
        assert_eq!(Config::resolve_config_path(&args), "config/kiosk.toml");
    }

    #[test]
    fn test_resolve_config_path_from_arg_equals() {
        let args: Vec<String> =
            vec!["seatview".to_string(), "--config=config/kiosk.toml".to_string()];
        assert_eq!(Config::resolve_config_path(&args), "config/kiosk.toml");
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let toml_config: TomlConfig = toml::from_str(
            r#"
            [feed]
            mode = "off"
            "#,
        )
        .unwrap();
        let config = Config::from_toml(toml_config, "inline");
        assert_eq!(config.feed_mode(), FeedMode::Off);
        assert_eq!(config.feed_interval_ms(), 5000);
        assert_eq!(config.rotate_step_deg(), 5.0);
    }

    #[test]
    fn test_validate_rejects_zero_limit() {
        let config = Config::default().with_max_selectable_seats(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_probability() {
        let mut config = Config::default();
        config.flip_probability = 1.5;
        assert!(config.validate().is_err());
        config.flip_probability = 0.2;
        config.occupied_weight = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_degenerate_camera() {
        let mut config = Config::default();
        config.base_hfov_deg = 180.0;
        assert!(config.validate().is_err());
        config.base_hfov_deg = 90.0;
        config.viewport_width = 0.0;
        assert!(config.validate().is_err());
    }
}
