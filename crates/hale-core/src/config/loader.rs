use super::ConfigError;
use super::schema::HarnessConfig;
use serde_yaml::Value;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from the current directory for the given environment name.
    ///
    /// Merge order (later wins):
    /// 1. built-in defaults
    /// 2. `./hale.yaml`
    /// 3. `./hale.<env>.yaml`
    /// 4. `HALE_*` environment variables
    pub fn load_default(env: &str) -> Result<HarnessConfig, ConfigError> {
        Self::load(Path::new("."), env)
    }

    pub fn load(root: &Path, env: &str) -> Result<HarnessConfig, ConfigError> {
        let mut merged = Value::Mapping(Default::default());

        let base = root.join("hale.yaml");
        if base.exists() {
            merge(&mut merged, read_value(&base)?);
        } else {
            tracing::warn!(path = %base.display(), "base config not found, using built-in defaults");
        }

        let env_path = root.join(format!("hale.{env}.yaml"));
        if env_path.exists() {
            merge(&mut merged, read_value(&env_path)?);
        } else {
            tracing::debug!(path = %env_path.display(), "no environment config, base values apply");
        }

        let mut config: HarnessConfig =
            serde_yaml::from_value(merged).map_err(|source| ConfigError::Parse {
                path: format!("{} (merged)", base.display()),
                source,
            })?;
        apply_env_overrides(&mut config);
        Ok(config)
    }
}

fn read_value(path: &Path) -> Result<Value, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let value = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(value)
}

/// Deep-merge `overlay` into `base`: mappings merge key-wise, any other
/// value replaces outright.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base_slot, overlay_value) => *base_slot = overlay_value,
    }
}

/// Explicit overrides win over any file value.
fn apply_env_overrides(config: &mut HarnessConfig) {
    if let Ok(browser) = std::env::var("HALE_BROWSER") {
        config.browser = Some(browser);
    }
    if let Ok(headless) = std::env::var("HALE_HEADLESS") {
        config.headless = matches!(
            headless.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        );
    }
    if let Ok(workers) = std::env::var("HALE_WORKERS")
        && let Ok(n) = workers.trim().parse()
    {
        config.workers = n;
    }
    if let Ok(retry) = std::env::var("HALE_RETRY")
        && let Ok(n) = retry.trim().parse()
    {
        config.retry = n;
    }
}
