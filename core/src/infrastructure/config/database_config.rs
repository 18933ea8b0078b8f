// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `DatabaseConfig` and its four-source resolver: CLI overrides,
//! process environment, the properties file at
//! `<home>/.blockchain-cli/database.properties`, and hard defaults.
//! Precedence is per-field: a field missing at a higher-precedence
//! source falls through to the next, not the whole source.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use blockchain_core_domain::value_objects::DatabaseKind;
use blockchain_core_domain::BlockchainError;

/// ORM-auto-update mode, carried over from the original system's
/// Hibernate-style `hbm2ddl` property. Only `Update`
/// has an effect here: it makes first startup create the baseline
/// tables (the same ones V1 creates) before the migration engine takes
/// over; `Validate`/`None` skip that step and rely entirely on the
/// migration engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Hbm2ddlMode {
    #[default]
    Update,
    Validate,
    None,
}

impl Hbm2ddlMode {
    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "update" => Some(Self::Update),
            "validate" => Some(Self::Validate),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub min_size: u32,
    pub max_size: u32,
    pub acquisition_timeout_ms: u64,
    pub idle_timeout_ms: u64,
    pub max_lifetime_ms: u64,
}

impl PoolConfig {
    fn defaults_for(kind: DatabaseKind) -> Self {
        let (min_size, max_size) = kind.default_pool_range();
        Self {
            min_size,
            max_size,
            acquisition_timeout_ms: 30_000,
            idle_timeout_ms: 600_000,
            max_lifetime_ms: 1_800_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub kind: DatabaseKind,
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub pool: PoolConfig,
    pub hbm2ddl: Hbm2ddlMode,
    pub show_sql: bool,
}

impl DatabaseConfig {
    /// The hard default: an embedded H2 file `./blockchain`.
    pub fn hard_default() -> Self {
        Self {
            kind: DatabaseKind::H2,
            url: Some("./blockchain".to_string()),
            host: None,
            port: None,
            database: None,
            user: None,
            password: None,
            pool: PoolConfig::defaults_for(DatabaseKind::H2),
            hbm2ddl: Hbm2ddlMode::Update,
            show_sql: false,
        }
    }

    /// Builds the `sqlx::Any`-compatible connection URL for this config.
    /// H2 is implemented underneath as an embedded SQLite file.
    pub fn connect_url(&self) -> Result<String, BlockchainError> {
        if let Some(ref url) = self.url {
            return Ok(normalise_url(self.kind, url));
        }
        match self.kind {
            DatabaseKind::H2 | DatabaseKind::Sqlite => Err(BlockchainError::config(
                "sqlite/h2 configuration requires a file path (db_url or the hard default)",
            )),
            DatabaseKind::Postgresql | DatabaseKind::Mysql => {
                let host = self.host.as_deref().unwrap_or("localhost");
                let port = self.port.unwrap_or(match self.kind {
                    DatabaseKind::Postgresql => 5432,
                    DatabaseKind::Mysql => 3306,
                    _ => unreachable!(),
                });
                let database = self
                    .database
                    .as_deref()
                    .ok_or_else(|| BlockchainError::config("database name is required for networked engines"))?;
                let scheme = match self.kind {
                    DatabaseKind::Postgresql => "postgres",
                    DatabaseKind::Mysql => "mysql",
                    _ => unreachable!(),
                };
                let creds = match (&self.user, &self.password) {
                    (Some(u), Some(p)) => format!("{u}:{p}@"),
                    (Some(u), None) => format!("{u}@"),
                    _ => String::new(),
                };
                Ok(format!("{scheme}://{creds}{host}:{port}/{database}"))
            }
        }
    }

    /// `--json`/`database show` masked view: every field rendered through
    /// [`crate::infrastructure::config::SensitiveDataMasker`].
    pub fn masked_properties(&self) -> Vec<(String, String)> {
        use crate::infrastructure::config::SensitiveDataMasker;
        let mut props = vec![("db_type".to_string(), self.kind.to_string())];
        if let Some(ref url) = self.url {
            props.push(("db_url".to_string(), SensitiveDataMasker::mask("db_url", url)));
        }
        if let Some(ref host) = self.host {
            props.push(("db_host".to_string(), host.clone()));
        }
        if let Some(port) = self.port {
            props.push(("db_port".to_string(), port.to_string()));
        }
        if let Some(ref db) = self.database {
            props.push(("db_name".to_string(), db.clone()));
        }
        if let Some(ref user) = self.user {
            props.push(("db_user".to_string(), user.clone()));
        }
        props.push(("db_password".to_string(), SensitiveDataMasker::mask_by_key("db_password", "***")));
        props.push(("pool_min".to_string(), self.pool.min_size.to_string()));
        props.push(("pool_max".to_string(), self.pool.max_size.to_string()));
        props
    }

    pub fn validate(&self) -> Result<(), BlockchainError> {
        if let Some(port) = self.port {
            if port == 0 {
                return Err(BlockchainError::config("db_port must be in 1..65535"));
            }
        }
        if self.pool.max_size < self.pool.min_size || self.pool.min_size < 1 {
            return Err(BlockchainError::config(format!(
                "invalid pool range: min={}, max={}",
                self.pool.min_size, self.pool.max_size
            )));
        }
        Ok(())
    }
}

fn normalise_url(kind: DatabaseKind, url: &str) -> String {
    if url.contains("://") {
        return url.to_string();
    }
    match kind {
        DatabaseKind::H2 | DatabaseKind::Sqlite => format!("sqlite://{url}"),
        DatabaseKind::Postgresql => format!("postgres://{url}"),
        DatabaseKind::Mysql => format!("mysql://{url}"),
    }
}

/// CLI-argument overrides, matching
/// `blockchain_core_bootstrap::ValidatedCli`'s global database flags.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub db_type: Option<String>,
    pub db_url: Option<String>,
    pub db_host: Option<String>,
    pub db_port: Option<u16>,
    pub db_name: Option<String>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
}

/// Resolves a [`DatabaseConfig`] from the four layered sources. Broad
/// file permissions and passwords found in the properties file are
/// logged as `tracing::warn!`, never rejected.
pub fn resolve(cli: &CliOverrides, home: Option<&Path>) -> Result<DatabaseConfig, BlockchainError> {
    let env_map = read_env();
    let file_map = home.map(properties_path).and_then(|path| read_properties_file(&path));

    let field = |cli_val: Option<&String>, env_key: &str, file_key: &str| -> Option<String> {
        cli_val
            .cloned()
            .or_else(|| env_map.get(env_key).cloned())
            .or_else(|| file_map.as_ref().and_then(|m| m.get(file_key).cloned()))
    };

    let kind_str = field(cli.db_type.as_ref(), "DB_TYPE", "db.type");
    let kind = match kind_str {
        Some(s) => s.parse()?,
        None => DatabaseKind::H2,
    };

    let url = field(cli.db_url.as_ref(), "DB_URL", "db.url").or_else(|| {
        if kind == DatabaseKind::H2 {
            Some("./blockchain".to_string())
        } else {
            None
        }
    });
    let host = field(cli.db_host.as_ref(), "DB_HOST", "db.host");
    let port = field(cli.db_port.map(|p| p.to_string()).as_ref(), "DB_PORT", "db.port")
        .map(|s| s.parse::<u16>().map_err(|_| BlockchainError::config(format!("invalid db_port '{s}'"))))
        .transpose()?;
    let database = field(cli.db_name.as_ref(), "DB_NAME", "db.name");
    let user = field(cli.db_user.as_ref(), "DB_USER", "db.user");
    let password = field(cli.db_password.as_ref(), "DB_PASSWORD", "db.password");

    let pool_min = field(None, "DB_POOL_MIN", "db.pool.min")
        .map(|s| s.parse::<u32>().unwrap_or(PoolConfig::defaults_for(kind).min_size));
    let pool_max = field(None, "DB_POOL_MAX", "db.pool.max")
        .map(|s| s.parse::<u32>().unwrap_or(PoolConfig::defaults_for(kind).max_size));
    let mut pool = PoolConfig::defaults_for(kind);
    if let Some(min) = pool_min {
        pool.min_size = min;
    }
    if let Some(max) = pool_max {
        pool.max_size = max;
    }

    let hbm2ddl = field(None, "DB_HBM2DDL_AUTO", "hibernate.hbm2ddl.auto")
        .and_then(|s| Hbm2ddlMode::parse(&s))
        .unwrap_or_default();
    let show_sql = field(None, "DB_SHOW_SQL", "hibernate.show_sql")
        .map(|s| s.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let config = DatabaseConfig {
        kind,
        url,
        host,
        port,
        database,
        user,
        password,
        pool,
        hbm2ddl,
        show_sql,
    };
    config.validate()?;
    Ok(config)
}

fn properties_path(home: &Path) -> PathBuf {
    home.join(".blockchain-cli").join("database.properties")
}

fn read_env() -> HashMap<String, String> {
    const KEYS: &[&str] = &[
        "DB_TYPE",
        "DB_URL",
        "DB_HOST",
        "DB_PORT",
        "DB_NAME",
        "DB_USER",
        "DB_PASSWORD",
        "DB_POOL_MIN",
        "DB_POOL_MAX",
        "DB_HBM2DDL_AUTO",
        "DB_SHOW_SQL",
    ];
    KEYS.iter().filter_map(|k| std::env::var(k).ok().map(|v| (k.to_string(), v))).collect()
}

/// Reads the `key=value` properties file, if present. Logs a warning
/// if its POSIX mode is broader than 0600, and another if
/// a password-shaped key is present in the file layer.
/// Never rejects on either condition.
fn read_properties_file(path: &Path) -> Option<HashMap<String, String>> {
    let contents = std::fs::read_to_string(path).ok()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = std::fs::metadata(path) {
            let mode = meta.permissions().mode() & 0o777;
            if mode & !0o600 != 0 {
                tracing::warn!(path = %path.display(), mode = format!("{mode:o}"), "database.properties permissions broader than 0600");
            }
        }
    }

    let mut map = HashMap::new();
    let mut password_seen = false;
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }
        if let Some((key, value)) = trimmed.split_once('=') {
            let key = key.trim().to_string();
            let value = value.trim().to_string();
            if key.to_lowercase().contains("password") {
                password_seen = true;
            }
            map.insert(key, value);
        }
    }

    if password_seen {
        tracing::warn!(path = %path.display(), "password-in-file");
    }

    Some(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn hard_default_is_embedded_h2_file() {
        let config = DatabaseConfig::hard_default();
        assert_eq!(config.kind, DatabaseKind::H2);
        assert_eq!(config.url.as_deref(), Some("./blockchain"));
    }

    #[test]
    fn cli_override_takes_precedence_over_env() {
        std::env::set_var("DB_HOST", "env-host");
        let cli = CliOverrides {
            db_host: Some("cli-host".to_string()),
            ..Default::default()
        };
        let config = resolve(&cli, None).unwrap();
        assert_eq!(config.host.as_deref(), Some("cli-host"));
        std::env::remove_var("DB_HOST");
    }

    #[test]
    fn missing_field_at_cli_falls_through_to_env() {
        std::env::set_var("DB_NAME", "from-env");
        let cli = CliOverrides::default();
        let config = resolve(&cli, None).unwrap();
        assert_eq!(config.database.as_deref(), Some("from-env"));
        std::env::remove_var("DB_NAME");
    }

    #[test]
    fn pool_validation_rejects_max_below_min() {
        let mut config = DatabaseConfig::hard_default();
        config.pool.min_size = 10;
        config.pool.max_size = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn properties_file_loads_and_flags_password() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path();
        let props_dir = home.join(".blockchain-cli");
        std::fs::create_dir_all(&props_dir).unwrap();
        let props_path = props_dir.join("database.properties");
        let mut f = std::fs::File::create(&props_path).unwrap();
        writeln!(f, "db.type=postgresql").unwrap();
        writeln!(f, "db.password=hunter2").unwrap();
        drop(f);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&props_path, std::fs::Permissions::from_mode(0o600)).unwrap();
        }

        let cli = CliOverrides::default();
        let config = resolve(&cli, Some(home)).unwrap();
        assert_eq!(config.kind, DatabaseKind::Postgresql);
        assert_eq!(config.password.as_deref(), Some("hunter2"));
    }
}
