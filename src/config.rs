use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::controller::timed_loop::MIN_LOOP_INTERVAL;

#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: env!("CARGO_PKG_NAME").to_string(),
            width: 1280,
            height: 720,
            vsync: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub window: WindowConfig,
    /// Minimum iteration time of both the update and the main loop
    pub loop_interval: Duration,
    pub debug_overlay: bool,
    pub shader_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            loop_interval: MIN_LOOP_INTERVAL,
            debug_overlay: true,
            shader_dir: PathBuf::from("shaders"),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `GLSKEL_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `GLSKEL_*` keys.
    ///
    /// Values that fail to parse are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(title) = lookup("GLSKEL_TITLE") {
            config.window.title = title;
        }
        override_parsed(&lookup, "GLSKEL_WIDTH", &mut config.window.width);
        override_parsed(&lookup, "GLSKEL_HEIGHT", &mut config.window.height);
        override_flag(&lookup, "GLSKEL_VSYNC", &mut config.window.vsync);
        override_flag(&lookup, "GLSKEL_DEBUG_OVERLAY", &mut config.debug_overlay);
        if let Some(dir) = lookup("GLSKEL_SHADER_DIR") {
            config.shader_dir = PathBuf::from(dir);
        }

        let mut interval_ms = config.loop_interval.as_millis() as u64;
        override_parsed(&lookup, "GLSKEL_LOOP_INTERVAL_MS", &mut interval_ms);
        config.loop_interval = Duration::from_millis(interval_ms);
        if config.loop_interval < MIN_LOOP_INTERVAL {
            tracing::warn!(
                "loop interval must be at least {:?}, using {:?}",
                MIN_LOOP_INTERVAL,
                MIN_LOOP_INTERVAL
            );
            config.loop_interval = MIN_LOOP_INTERVAL;
        }

        if config.window.width == 0 || config.window.height == 0 {
            tracing::warn!("window size must be non-zero, using defaults");
            config.window.width = WindowConfig::default().width;
            config.window.height = WindowConfig::default().height;
        }

        config
    }
}

fn override_parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut T) {
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => tracing::warn!("ignoring {}={:?}: not a valid value", key, raw),
        }
    }
}

fn override_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut bool) {
    if let Some(raw) = lookup(key) {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => *target = true,
            "0" | "false" | "no" | "off" => *target = false,
            _ => tracing::warn!("ignoring {}={:?}: expected a boolean", key, raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::TimedLoop;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_overrides() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.loop_interval, Duration::from_millis(1));
        assert_eq!((config.window.width, config.window.height), (1280, 720));
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GLSKEL_TITLE", "demo"),
            ("GLSKEL_WIDTH", "640"),
            ("GLSKEL_HEIGHT", " 480 "),
            ("GLSKEL_VSYNC", "off"),
            ("GLSKEL_DEBUG_OVERLAY", "0"),
            ("GLSKEL_SHADER_DIR", "/tmp/shaders"),
            ("GLSKEL_LOOP_INTERVAL_MS", "4"),
        ]));

        assert_eq!(config.window.title, "demo");
        assert_eq!((config.window.width, config.window.height), (640, 480));
        assert!(!config.window.vsync);
        assert!(!config.debug_overlay);
        assert_eq!(config.shader_dir, PathBuf::from("/tmp/shaders"));
        assert_eq!(config.loop_interval, Duration::from_millis(4));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GLSKEL_WIDTH", "wide"),
            ("GLSKEL_HEIGHT", "0"),
            ("GLSKEL_VSYNC", "maybe"),
            ("GLSKEL_LOOP_INTERVAL_MS", "0"),
        ]));

        assert_eq!((config.window.width, config.window.height), (1280, 720));
        assert!(config.window.vsync);
        assert_eq!(config.loop_interval, MIN_LOOP_INTERVAL);

        // the floor holds all the way into the loop
        let mut shortest = f32::MAX;
        let mut remaining = 3;
        TimedLoop::new(config.loop_interval).run(
            || {
                remaining -= 1;
                remaining >= 0
            },
            |dt| shortest = shortest.min(dt),
        );
        assert!(shortest >= MIN_LOOP_INTERVAL.as_secs_f32());
    }
}
