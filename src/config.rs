use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Application configuration, loaded from `chatrelay.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub port: u16,
    pub max_history: usize,
    pub log_dir: String,
    pub log_to_file: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            max_history: 4,
            log_dir: "logs".to_string(),
            log_to_file: true,
        }
    }
}

impl AppConfig {
    /// Load configuration with the chain: `./chatrelay.toml` -> `~/chatrelay.toml`
    /// -> defaults, then `RELAY_PORT` / `RELAY_MAX_HISTORY` on top.
    pub fn load() -> Self {
        let mut cfg = Self::load_file_chain();
        cfg.apply_env_overrides();
        cfg
    }

    fn load_file_chain() -> Self {
        for path in Self::config_paths() {
            if let Ok(contents) = fs::read_to_string(&path) {
                match toml::from_str::<AppConfig>(&contents) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: failed to parse {}: {}", path.display(), e);
                    }
                }
            }
        }
        Self::default()
    }

    /// Environment beats file: a deployment can repoint the listen port or
    /// the history bound without editing `chatrelay.toml`.
    fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var("RELAY_PORT") {
            match raw.parse() {
                Ok(port) => self.port = port,
                Err(_) => eprintln!("Warning: ignoring invalid RELAY_PORT '{raw}'"),
            }
        }
        if let Ok(raw) = std::env::var("RELAY_MAX_HISTORY") {
            match raw.parse() {
                Ok(max) => self.max_history = max,
                Err(_) => eprintln!("Warning: ignoring invalid RELAY_MAX_HISTORY '{raw}'"),
            }
        }
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("chatrelay.toml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join("chatrelay.toml"));
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env vars are process-wide; serialize the tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.port, 3001);
        assert_eq!(cfg.max_history, 4);
        assert_eq!(cfg.log_dir, "logs");
        assert!(cfg.log_to_file);
    }

    #[test]
    fn test_partial_toml_deserialize() {
        let toml_str = r#"
            max_history = 10
        "#;
        let cfg: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.max_history, 10);
        // Other fields should be defaults
        assert_eq!(cfg.port, 3001);
        assert_eq!(cfg.log_dir, "logs");
    }

    #[test]
    fn test_full_toml_deserialize() {
        let toml_str = r#"
            port = 9000
            max_history = 1
            log_dir = "relay_logs"
            log_to_file = false
        "#;
        let cfg: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.max_history, 1);
        assert_eq!(cfg.log_dir, "relay_logs");
        assert!(!cfg.log_to_file);
    }

    #[test]
    fn test_env_overrides_applied() {
        let _guard = ENV_LOCK.lock().unwrap();
        let mut cfg = AppConfig::default();
        std::env::set_var("RELAY_PORT", "4242");
        std::env::set_var("RELAY_MAX_HISTORY", "7");
        cfg.apply_env_overrides();
        std::env::remove_var("RELAY_PORT");
        std::env::remove_var("RELAY_MAX_HISTORY");
        assert_eq!(cfg.port, 4242);
        assert_eq!(cfg.max_history, 7);
    }

    #[test]
    fn test_invalid_env_override_is_ignored() {
        let _guard = ENV_LOCK.lock().unwrap();
        let mut cfg = AppConfig::default();
        std::env::set_var("RELAY_MAX_HISTORY", "not-a-number");
        cfg.apply_env_overrides();
        std::env::remove_var("RELAY_MAX_HISTORY");
        assert_eq!(cfg.max_history, AppConfig::default().max_history);
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        // When no config file exists, load() returns defaults
        let cfg = AppConfig::load();
        assert_eq!(cfg.log_dir, AppConfig::default().log_dir);
    }
}
