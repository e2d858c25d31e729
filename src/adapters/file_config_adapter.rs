//! INI file configuration adapter.

use crate::domain::error::StratgateError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StratgateError> {
        let mut config = Ini::new();
        config
            .load(path.as_ref())
            .map_err(|e| StratgateError::ConfigParse {
                file: path.as_ref().display().to_string(),
                reason: e,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, StratgateError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|e| StratgateError::ConfigParse {
                file: "<inline>".to_string(),
                reason: e,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_typed_values() {
        let content = r#"
[pool]
max_size = 300
min_score = 40.0

[parameter_space]
prefer_atr_stops = yes
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(adapter.get_int("pool", "max_size", 0), 300);
        assert!((adapter.get_double("pool", "min_score", 0.0) - 40.0).abs() < f64::EPSILON);
        assert!(adapter.get_bool("parameter_space", "prefer_atr_stops", false));
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let adapter = FileConfigAdapter::from_string("[pool]\n").unwrap();
        assert_eq!(adapter.get_string("pool", "max_size"), None);
        assert_eq!(adapter.get_int("pool", "max_size", 300), 300);
        assert!(adapter.get_bool("shuffle", "enabled", true));
    }

    #[test]
    fn unparseable_bool_uses_default() {
        let adapter = FileConfigAdapter::from_string("[a]\nflag = maybe\n").unwrap();
        assert!(!adapter.get_bool("a", "flag", false));
    }

    #[test]
    fn loads_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[simulator]\nrisk_pct = 0.01\n").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert!((adapter.get_double("simulator", "risk_pct", 0.0) - 0.01).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_file_is_a_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/stratgate.ini").unwrap_err();
        assert!(matches!(err, StratgateError::ConfigParse { .. }));
    }
}
