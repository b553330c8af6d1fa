use crate::error::GradebookError;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
}

impl Config {
    /// Reads configuration from the process environment. Call after `.env`
    /// has been loaded.
    pub fn from_env() -> Result<Self, GradebookError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, GradebookError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(GradebookError::MissingDatabaseUrl)?;

        let max_connections = match lookup("GRADEBOOK_MAX_CONNECTIONS") {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(value) if value > 0 => value,
                _ => return Err(GradebookError::InvalidPoolSize(raw)),
            },
        };

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_pool_size() {
        let config = Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/grades")]))
            .unwrap();
        assert_eq!(config.database_url, "postgres://localhost/grades");
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn reads_pool_size() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/grades"),
            ("GRADEBOOK_MAX_CONNECTIONS", "12"),
        ]))
        .unwrap();
        assert_eq!(config.max_connections, 12);
    }

    #[test]
    fn requires_database_url() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, GradebookError::MissingDatabaseUrl));

        let err = Config::from_lookup(lookup_from(&[("DATABASE_URL", "  ")])).unwrap_err();
        assert!(matches!(err, GradebookError::MissingDatabaseUrl));
    }

    #[test]
    fn rejects_bad_pool_size() {
        for raw in ["0", "-1", "many"] {
            let err = Config::from_lookup(lookup_from(&[
                ("DATABASE_URL", "postgres://localhost/grades"),
                ("GRADEBOOK_MAX_CONNECTIONS", raw),
            ]))
            .unwrap_err();
            assert!(matches!(err, GradebookError::InvalidPoolSize(ref v) if v == raw));
        }
    }
}
