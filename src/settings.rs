//! Typed view over the persisted preference keys.

use std::path::PathBuf;
use std::time::Duration;

use crate::prefs::Preferences;
use crate::printer::PaperWidth;

pub const KEY_BASE_URL: &str = "base_url";
pub const KEY_POLLING_INTERVAL: &str = "polling_interval_seconds";
pub const KEY_SOUND_ENABLED: &str = "sound_enabled";
pub const KEY_SOUND_URI: &str = "sound_uri";
pub const KEY_PRINTER_MAC: &str = "printer_mac";
pub const KEY_PAPER_WIDTH: &str = "paper_width_mm";
pub const KEY_VENDOR_PRINTER: &str = "use_vendor_printer";
pub const KEY_VENDOR_INTEGRATION: &str = "vendor_integration";
pub const KEY_SPOOL_DIR: &str = "print_spool_dir";
pub const KEY_SEEN_PRINTED: &str = "seen_printed";
pub const KEY_SEEN_ACKED: &str = "seen_acked";

/// Keys the `config set` command accepts.
pub const USER_KEYS: &[&str] = &[
    KEY_BASE_URL,
    KEY_POLLING_INTERVAL,
    KEY_SOUND_ENABLED,
    KEY_SOUND_URI,
    KEY_PRINTER_MAC,
    KEY_PAPER_WIDTH,
    KEY_VENDOR_PRINTER,
    KEY_VENDOR_INTEGRATION,
    KEY_SPOOL_DIR,
];

pub const DEFAULT_POLLING_INTERVAL_SECS: u64 = 10;
pub const MIN_POLLING_INTERVAL_SECS: u64 = 5;
pub const MAX_POLLING_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_VENDOR_INTEGRATION: &str = "lp";

/// Clamp a polling interval into the supported range.
pub fn clamp_interval(secs: i64) -> Duration {
    let clamped = secs.clamp(
        MIN_POLLING_INTERVAL_SECS as i64,
        MAX_POLLING_INTERVAL_SECS as i64,
    );
    Duration::from_secs(clamped as u64)
}

/// Snapshot of the engine configuration.
///
/// Read fresh at the start of each cycle and each dispatch, so edits made
/// while the engine runs take effect without a restart.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: Option<String>,
    pub polling_interval: Duration,
    pub sound_enabled: bool,
    pub sound_uri: Option<String>,
    /// Bluetooth MAC or device path; `None` means first bound device.
    pub printer_device: Option<String>,
    pub paper_width: PaperWidth,
    pub vendor_mode: bool,
    pub vendor_integration: String,
    pub spool_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: None,
            polling_interval: Duration::from_secs(DEFAULT_POLLING_INTERVAL_SECS),
            sound_enabled: true,
            sound_uri: None,
            printer_device: None,
            paper_width: PaperWidth::default(),
            vendor_mode: true,
            vendor_integration: DEFAULT_VENDOR_INTEGRATION.to_string(),
            spool_dir: None,
        }
    }
}

impl Settings {
    pub fn load(prefs: &Preferences) -> Self {
        let defaults = Self::default();
        let non_blank = |key: &str| {
            prefs
                .get_string(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        Self {
            base_url: non_blank(KEY_BASE_URL),
            polling_interval: prefs
                .get_i64(KEY_POLLING_INTERVAL)
                .map(clamp_interval)
                .unwrap_or(defaults.polling_interval),
            sound_enabled: prefs
                .get_bool(KEY_SOUND_ENABLED)
                .unwrap_or(defaults.sound_enabled),
            sound_uri: non_blank(KEY_SOUND_URI),
            printer_device: non_blank(KEY_PRINTER_MAC),
            paper_width: prefs
                .get_i64(KEY_PAPER_WIDTH)
                .and_then(|mm| u16::try_from(mm).ok())
                .map(PaperWidth::from_mm)
                .unwrap_or(defaults.paper_width),
            vendor_mode: prefs
                .get_bool(KEY_VENDOR_PRINTER)
                .unwrap_or(defaults.vendor_mode),
            vendor_integration: non_blank(KEY_VENDOR_INTEGRATION)
                .unwrap_or(defaults.vendor_integration),
            spool_dir: non_blank(KEY_SPOOL_DIR)
                .map(PathBuf::from)
                .or_else(|| prefs.dir().map(|dir| dir.join("spool"))),
        }
    }

    /// Sound reference to attach to alerts, if alerts should make sound.
    pub fn alert_sound(&self) -> Option<&str> {
        if self.sound_enabled {
            Some(self.sound_uri.as_deref().unwrap_or("default"))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::load(&Preferences::in_memory());
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.paper_width.mm(), 58);
        assert!(settings.vendor_mode);
        assert_eq!(settings.polling_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_interval_clamped() {
        assert_eq!(clamp_interval(1), Duration::from_secs(5));
        assert_eq!(clamp_interval(-20), Duration::from_secs(5));
        assert_eq!(clamp_interval(60), Duration::from_secs(60));
        assert_eq!(clamp_interval(3600), Duration::from_secs(300));

        let prefs = Preferences::in_memory();
        prefs.put(KEY_POLLING_INTERVAL, 2).unwrap();
        assert_eq!(
            Settings::load(&prefs).polling_interval,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_blank_values_are_unset() {
        let prefs = Preferences::in_memory();
        prefs.put(KEY_BASE_URL, "   ").unwrap();
        prefs.put(KEY_PRINTER_MAC, "").unwrap();
        let settings = Settings::load(&prefs);
        assert_eq!(settings.base_url, None);
        assert_eq!(settings.printer_device, None);
    }

    #[test]
    fn test_alert_sound() {
        let mut settings = Settings::default();
        assert_eq!(settings.alert_sound(), Some("default"));
        settings.sound_uri = Some("bell".into());
        assert_eq!(settings.alert_sound(), Some("bell"));
        settings.sound_enabled = false;
        assert_eq!(settings.alert_sound(), None);
    }
}
