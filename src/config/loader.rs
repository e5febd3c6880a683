use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker threads, one package per worker
    pub threads: usize,

    /// Wall-clock budget per package, in seconds
    pub timeout_secs: u64,

    /// jadx executable used for `.apk` inputs
    pub jadx_path: PathBuf,

    /// Keep analyzing packages that turn out not to be packed
    pub continue_unpacked: bool,

    /// Try to synthesize an unpacker from the entry point
    pub synthesize: bool,

    /// Write synthesized sources under `unpackers/`
    pub write_unpackers: bool,

    /// Unpacker synthesis configuration
    pub synthesis: SynthesisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Prefix of the synthesized class name
    pub class_prefix: String,

    /// How many characters of the package file stem follow the prefix
    pub max_name_len: usize,

    /// Expression that replaces the entry point's `Context` parameter
    pub context_stand_in: String,

    /// Import namespaces that only exist on the device
    pub platform_namespaces: Vec<String>,

    /// Value substituted for `Build.VERSION.SDK_INT`
    pub sdk_int: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threads: 20,
            timeout_secs: 600,
            jadx_path: PathBuf::from("jadx"),
            continue_unpacked: true,
            synthesize: true,
            write_unpackers: true,
            synthesis: SynthesisConfig::default(),
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            class_prefix: "Unpacker_".to_string(),
            max_name_len: 10,
            context_stand_in: "new Context()".to_string(),
            platform_namespaces: vec![
                "android".to_string(),
                "androidx".to_string(),
                "com.android".to_string(),
                "dalvik".to_string(),
                "com.xiaomi".to_string(),
            ],
            sdk_int: 30,
        }
    }
}

impl Config {
    /// Load configuration from a file (YAML or TOML)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse YAML config"),
            "toml" => toml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse TOML config"),
            _ => {
                // Try YAML first, then TOML
                if let Ok(config) = serde_yaml::from_str(&contents) {
                    Ok(config)
                } else {
                    toml::from_str(&contents)
                        .into_diagnostic()
                        .wrap_err("Failed to parse config file")
                }
            }
        }
    }

    /// Try to load configuration from default locations
    pub fn from_default_locations(dir: &Path) -> Result<Self> {
        let default_names = [
            ".apkunbox.yml",
            ".apkunbox.yaml",
            ".apkunbox.toml",
            "apkunbox.yml",
            "apkunbox.yaml",
            "apkunbox.toml",
        ];

        for name in &default_names {
            let path = dir.join(name);
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        // No config file found, use defaults
        Ok(Self::default())
    }

    /// Timeout as a duration; zero disables it
    pub fn timeout(&self) -> Option<std::time::Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(std::time::Duration::from_secs(self.timeout_secs))
        }
    }
}
