//! Layered loading: defaults, then file, then environment.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::app::AppConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::source::ConfigSource;

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "STRATUS";

/// Separator between path segments in an environment key.
const ENV_SEPARATOR: &str = "__";

/// Collects configuration sources and merges them into an [`AppConfig`].
///
/// Environment keys map onto the document by splitting on `__` after the
/// prefix: `STRATUS_SERVER__BIND` sets `server.bind`,
/// `STRATUS_LOG__FORMAT` sets `log.format`. Values that parse as JSON
/// numbers or booleans are typed; everything else is a string.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env: Option<Vec<(String, String)>>,
}

impl ConfigLoader {
    /// A loader with defaults only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer a TOML file over the defaults.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Layer the process environment on top.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_env_vars(std::env::vars())
    }

    /// Layer an explicit set of variables on top.
    #[must_use]
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Merge, deserialize and validate.
    pub fn load(self) -> ConfigResult<AppConfig> {
        self.load_with_sources().map(|(config, _)| config)
    }

    /// Like [`load`](Self::load), also reporting which layers applied.
    pub fn load_with_sources(self) -> ConfigResult<(AppConfig, Vec<ConfigSource>)> {
        let mut document = serde_json::to_value(AppConfig::default())?;
        let mut sources = vec![ConfigSource::Default];

        if let Some(path) = &self.file {
            merge(&mut document, read_file(path)?);
            sources.push(ConfigSource::File(path.clone()));
        }

        if let Some(vars) = self.env {
            let overrides = env_overrides(vars);
            if !overrides.is_empty() {
                tracing::debug!(keys = overrides.len(), "applying environment overrides");
                for (path, value) in overrides {
                    set_path(&mut document, &path, value);
                }
                sources.push(ConfigSource::Env(ENV_PREFIX.to_owned()));
            }
        }

        let config: AppConfig = serde_json::from_value(document)?;
        config.validate()?;
        Ok((config, sources))
    }
}

fn read_file(path: &Path) -> ConfigResult<Value> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::Parse {
        origin: ConfigSource::File(path.to_path_buf()),
        message: e.to_string(),
    })
}

fn env_overrides(vars: Vec<(String, String)>) -> Vec<(Vec<String>, Value)> {
    let prefix = format!("{ENV_PREFIX}_");
    let mut overrides: Vec<_> = vars
        .into_iter()
        .filter_map(|(key, raw)| {
            let rest = key.strip_prefix(&prefix)?;
            if !rest.contains(ENV_SEPARATOR) {
                return None;
            }
            let path = rest
                .split(ENV_SEPARATOR)
                .map(str::to_ascii_lowercase)
                .collect::<Vec<_>>();
            Some((path, scalar(&raw)))
        })
        .collect();
    // Deterministic order regardless of how the environment was iterated.
    overrides.sort_by(|a, b| a.0.cmp(&b.0));
    overrides
}

fn scalar(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Number(_) | Value::Bool(_))) => value,
        _ => Value::String(raw.to_owned()),
    }
}

fn merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}

fn set_path(target: &mut Value, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut cursor = target;
    for segment in parents {
        if !cursor.is_object() {
            *cursor = Value::Object(Map::new());
        }
        let Value::Object(map) = cursor else {
            return;
        };
        cursor = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if !cursor.is_object() {
        *cursor = Value::Object(Map::new());
    }
    if let Value::Object(map) = cursor {
        map.insert(last.clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn merge_overrides_leaves_and_keeps_siblings() {
        let mut doc = json!({"server": {"bind": "a", "base_url": "b"}});
        merge(&mut doc, json!({"server": {"bind": "c"}}));
        assert_eq!(doc, json!({"server": {"bind": "c", "base_url": "b"}}));
    }

    #[test]
    fn set_path_creates_missing_tables() {
        let mut doc = json!({});
        set_path(&mut doc, &["log".into(), "level".into()], json!("debug"));
        assert_eq!(doc, json!({"log": {"level": "debug"}}));
    }

    #[test]
    fn env_keys_need_a_separator() {
        let overrides = env_overrides(vec![
            ("STRATUS_LOG".into(), "debug".into()),
            ("STRATUS_ENGINE__EXECUTION_TIMEOUT_SECS".into(), "5".into()),
            ("OTHER__KEY".into(), "x".into()),
        ]);
        assert_eq!(
            overrides,
            vec![(
                vec!["engine".to_owned(), "execution_timeout_secs".to_owned()],
                json!(5)
            )]
        );
    }

    #[test]
    fn scalars_are_typed_when_possible() {
        assert_eq!(scalar("42"), json!(42));
        assert_eq!(scalar("false"), json!(false));
        assert_eq!(scalar("0.0.0.0:80"), json!("0.0.0.0:80"));
        assert_eq!(scalar("\"quoted\""), json!("\"quoted\""));
    }
}
