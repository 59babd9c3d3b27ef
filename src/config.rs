use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub performance: PerformanceConfig,
}

/// Shape of the emitted features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Emit only geometry and validity interval per version
    pub geometry_only: bool,
    /// Attach `aA`/`aM`/`aD` diffs to the first minor of each major version
    pub include_diffs_on_major_versions: bool,
    pub include_full_properties_on_major_versions: bool,
    pub include_full_properties_on_minor_versions: bool,
    pub write_mode: WriteMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Worker threads (0 = all available)
    pub threads: usize,
    /// Lines decoded and reconstructed per parallel batch
    pub batch_size: usize,
}

/// How reconstructed versions are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// One feature per line for every version
    #[default]
    EveryGeometry,
    /// One JSON array per input record holding all its versions
    HistoryObject,
    /// One feature per input record with its versions encoded as a TopoJSON
    /// topology under `@history`
    Topology,
}

impl std::str::FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "every_geometry" => Ok(WriteMode::EveryGeometry),
            "history_object" => Ok(WriteMode::HistoryObject),
            "topology" | "topojson" => Ok(WriteMode::Topology),
            _ => Err(format!("Unknown write mode: {}", s)),
        }
    }
}

impl std::fmt::Display for WriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteMode::EveryGeometry => write!(f, "every_geometry"),
            WriteMode::HistoryObject => write!(f, "history_object"),
            WriteMode::Topology => write!(f, "topology"),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            geometry_only: false,
            include_diffs_on_major_versions: false,
            include_full_properties_on_major_versions: true,
            include_full_properties_on_minor_versions: true,
            write_mode: WriteMode::EveryGeometry,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            batch_size: 1000,
        }
    }
}

pub fn default_config() -> Config {
    Config::default()
}

/// `<config dir>/wayback/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("wayback").join("config.toml"))
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, crate::WaybackError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| crate::WaybackError::Config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), crate::WaybackError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| crate::WaybackError::Config(format!("Failed to serialize config: {}", e)))?;
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

/// Load `explicit` if given, else the default file if it exists, else defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config, crate::WaybackError> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match default_config_path() {
        Some(path) if path.exists() => load_config(path),
        _ => Ok(default_config()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = default_config();
        assert!(!config.output.geometry_only);
        assert!(!config.output.include_diffs_on_major_versions);
        assert!(config.output.include_full_properties_on_major_versions);
        assert!(config.output.include_full_properties_on_minor_versions);
        assert_eq!(config.output.write_mode, WriteMode::EveryGeometry);
        assert_eq!(config.performance.batch_size, 1000);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = default_config();
        config.output.write_mode = WriteMode::Topology;
        config.performance.threads = 4;
        save_config(&path, &config).unwrap();

        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[output]\ngeometry_only = true\n").unwrap();

        let config = load_config(&path).unwrap();
        assert!(config.output.geometry_only);
        assert!(config.output.include_full_properties_on_minor_versions);
        assert_eq!(config.performance, PerformanceConfig::default());
    }

    #[test]
    fn test_invalid_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[output]\nwrite_mode = \"shapefile\"\n").unwrap();

        assert!(matches!(
            load_config(&path),
            Err(crate::WaybackError::Config(_))
        ));
    }

    #[test]
    fn test_write_mode_from_str() {
        let cases = vec![
            ("every_geometry", Some(WriteMode::EveryGeometry)),
            ("history-object", Some(WriteMode::HistoryObject)),
            ("HISTORY_OBJECT", Some(WriteMode::HistoryObject)),
            ("topology", Some(WriteMode::Topology)),
            ("TopoJSON", Some(WriteMode::Topology)),
            ("shapefile", None),
        ];
        for (input, expected) in cases {
            assert_eq!(input.parse::<WriteMode>().ok(), expected, "input {}", input);
        }
    }
}
