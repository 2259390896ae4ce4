//! Application configuration loaded from environment variables.

pub const DEFAULT_SITE_TITLE: &str = "Anonymous Message Board";

/// Which [`crate::repo::ThreadRepo`] backend to run with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKind {
    Mongo { uri: String, db_name: String },
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Interface to bind (e.g. "0.0.0.0").
    pub host: String,
    pub port: u16,
    pub store: StoreKind,
    /// Shown in page headers and `<title>`.
    pub site_title: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// - `BIND_HOST` (default "0.0.0.0"), `PORT` (default 3000)
    /// - `BOARD_STORE`: "mongo" (default) or "memory"
    /// - `DB_CONN`: MongoDB connection string, required for "mongo"
    /// - `DB_NAME`: database name (default "message_board")
    /// - `SITE_TITLE`: page title (default "Anonymous Message Board")
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = get("BIND_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match get("PORT") {
            Some(p) => p.parse::<u16>().map_err(|e| anyhow::anyhow!("PORT must be a port number: {e}"))?,
            None => 3000,
        };

        let store = match get("BOARD_STORE").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("mongo") => {
                let uri = get("DB_CONN")
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| anyhow::anyhow!("DB_CONN must be set when BOARD_STORE=mongo"))?;
                let db_name = get("DB_NAME").unwrap_or_else(|| "message_board".to_string());
                StoreKind::Mongo { uri, db_name }
            }
            Some("memory") => StoreKind::Memory,
            Some(other) => anyhow::bail!("unknown BOARD_STORE '{other}' (expected mongo or memory)"),
        };

        let site_title = get("SITE_TITLE").unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string());

        tracing::info!(
            host = %host,
            port,
            memory_store = matches!(store, StoreKind::Memory),
            site_title = %site_title,
            "configuration loaded"
        );

        Ok(Self { host, port, store, site_title })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn mongo_requires_connection_string() {
        assert!(load(&[]).is_err());
        let cfg = load(&[("DB_CONN", "mongodb://localhost:27017")]).unwrap();
        assert_eq!(
            cfg.store,
            StoreKind::Mongo { uri: "mongodb://localhost:27017".into(), db_name: "message_board".into() }
        );
        assert_eq!(cfg.port, 3000);
    }

    #[test]
    fn memory_store_needs_nothing_else() {
        let cfg = load(&[("BOARD_STORE", "Memory"), ("PORT", "8080")]).unwrap();
        assert_eq!(cfg.store, StoreKind::Memory);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.site_title, DEFAULT_SITE_TITLE);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(load(&[("BOARD_STORE", "postgres")]).is_err());
        assert!(load(&[("BOARD_STORE", "memory"), ("PORT", "http")]).is_err());
    }
}
