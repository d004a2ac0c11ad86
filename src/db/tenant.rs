//! Tenant directory keyed by WhatsApp instance credential

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::DbPool;
use crate::{Error, Result};

/// Default greeting for tenants that never customized theirs
pub const DEFAULT_WELCOME_MESSAGE: &str = "Olá! Como posso ajudar?";

/// Assistant settings for an active tenant
#[derive(Debug, Clone)]
pub struct TenantConfig {
    pub id: String,
    pub name: String,
    pub api_key: String,
    pub welcome_message: String,
    pub description: Option<String>,
}

/// Outcome of resolving an instance credential
#[derive(Debug, Clone)]
pub enum TenantResolution {
    /// No establishment carries this credential
    NotFound,
    /// Establishment exists but the assistant must not act for it
    Disabled,
    /// Establishment with a usable assistant configuration
    Active(TenantConfig),
}

/// Establishment row as listed by the provisioning CLI
#[derive(Debug, Clone)]
pub struct TenantSummary {
    pub id: String,
    pub name: String,
    pub instance_token: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Lookup seam between the webhook dispatcher and tenant storage
pub trait TenantDirectory: Send + Sync {
    /// Resolve an instance credential to a tenant
    ///
    /// # Errors
    ///
    /// Returns error if the lookup itself fails; absence is not an error
    fn resolve(&self, instance_token: &str) -> Result<TenantResolution>;
}

/// Tenant repository backed by `SQLite`
#[derive(Clone)]
pub struct TenantRepo {
    pool: DbPool,
}

impl TenantRepo {
    /// Create a new tenant repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Register an establishment with its assistant settings
    ///
    /// Returns the new establishment id.
    ///
    /// # Errors
    ///
    /// Returns error if the credential is already taken or the write fails
    pub fn create(
        &self,
        name: &str,
        instance_token: &str,
        api_key: &str,
        welcome_message: Option<&str>,
        description: Option<&str>,
    ) -> Result<String> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO establishments (id, name, instance_token, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            rusqlite::params![&id, name, instance_token, &now],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO assistant_configs
                 (establishment_id, api_key, active, welcome_message, description, created_at, updated_at)
             VALUES (?1, ?2, 1, ?3, ?4, ?5, ?5)",
            rusqlite::params![
                &id,
                api_key,
                welcome_message.unwrap_or(DEFAULT_WELCOME_MESSAGE),
                description,
                &now
            ],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        Ok(id)
    }

    /// List all registered establishments
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list(&self) -> Result<Vec<TenantSummary>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT e.id, e.name, e.instance_token, COALESCE(c.active, 0), e.created_at
                 FROM establishments e
                 LEFT JOIN assistant_configs c ON c.establishment_id = e.id
                 ORDER BY e.created_at",
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        let tenants = stmt
            .query_map([], |row| {
                Ok(TenantSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    instance_token: row.get(2)?,
                    active: row.get::<_, i64>(3)? != 0,
                    created_at: parse_datetime(&row.get::<_, String>(4)?),
                })
            })
            .map_err(|e| Error::Database(e.to_string()))?
            .filter_map(std::result::Result::ok)
            .collect();

        Ok(tenants)
    }
}

impl TenantDirectory for TenantRepo {
    fn resolve(&self, instance_token: &str) -> Result<TenantResolution> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let result = conn.query_row(
            "SELECT e.id, e.name, c.api_key, c.active, c.welcome_message, c.description
             FROM establishments e
             LEFT JOIN assistant_configs c ON c.establishment_id = e.id
             WHERE e.instance_token = ?1",
            [instance_token],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            },
        );

        let (id, name, api_key, active, welcome_message, description) = match result {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(TenantResolution::NotFound),
            Err(e) => return Err(Error::Database(e.to_string())),
        };

        // No config row, inactive flag, or blank key all park the assistant
        let Some(api_key) = api_key else {
            return Ok(TenantResolution::Disabled);
        };
        if active.unwrap_or(0) == 0 || api_key.trim().is_empty() {
            return Ok(TenantResolution::Disabled);
        }

        Ok(TenantResolution::Active(TenantConfig {
            id,
            name,
            api_key,
            welcome_message: welcome_message.unwrap_or_else(|| DEFAULT_WELCOME_MESSAGE.to_string()),
            description,
        }))
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    fn setup() -> TenantRepo {
        TenantRepo::new(init_memory().unwrap())
    }

    #[test]
    fn test_resolve_unknown_token() {
        let repo = setup();

        let resolution = repo.resolve("no-such-instance").unwrap();
        assert!(matches!(resolution, TenantResolution::NotFound));
    }

    #[test]
    fn test_resolve_active_tenant() {
        let repo = setup();
        repo.create("Studio Bela", "inst-1", "sk-test", None, Some("Salão de beleza"))
            .unwrap();

        let resolution = repo.resolve("inst-1").unwrap();
        let TenantResolution::Active(config) = resolution else {
            panic!("expected active tenant");
        };
        assert_eq!(config.name, "Studio Bela");
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.welcome_message, DEFAULT_WELCOME_MESSAGE);
        assert_eq!(config.description.as_deref(), Some("Salão de beleza"));
    }

    #[test]
    fn test_resolve_inactive_tenant() {
        let repo = setup();
        let id = repo
            .create("Studio Bela", "inst-1", "sk-test", None, None)
            .unwrap();

        // Return the guard to the single-connection test pool before resolving
        let conn = repo.pool.get().unwrap();
        conn.execute(
            "UPDATE assistant_configs SET active = 0 WHERE establishment_id = ?1",
            [&id],
        )
        .unwrap();
        drop(conn);

        let resolution = repo.resolve("inst-1").unwrap();
        assert!(matches!(resolution, TenantResolution::Disabled));
    }

    #[test]
    fn test_resolve_blank_api_key() {
        let repo = setup();
        repo.create("Studio Bela", "inst-1", "  ", None, None).unwrap();

        let resolution = repo.resolve("inst-1").unwrap();
        assert!(matches!(resolution, TenantResolution::Disabled));
    }

    #[test]
    fn test_resolve_missing_config_row() {
        let repo = setup();

        let conn = repo.pool.get().unwrap();
        conn.execute(
            "INSERT INTO establishments (id, name, instance_token) VALUES ('e1', 'Solo', 'inst-9')",
            [],
        )
        .unwrap();
        drop(conn);

        let resolution = repo.resolve("inst-9").unwrap();
        assert!(matches!(resolution, TenantResolution::Disabled));
    }

    #[test]
    fn test_custom_welcome_kept() {
        let repo = setup();
        repo.create("Barba Fina", "inst-2", "sk-live", Some("Bem-vindo à Barba Fina!"), None)
            .unwrap();

        let TenantResolution::Active(config) = repo.resolve("inst-2").unwrap() else {
            panic!("expected active tenant");
        };
        assert_eq!(config.welcome_message, "Bem-vindo à Barba Fina!");
    }

    #[test]
    fn test_duplicate_token_rejected() {
        let repo = setup();
        repo.create("A", "inst-dup", "k1", None, None).unwrap();

        assert!(repo.create("B", "inst-dup", "k2", None, None).is_err());
    }

    #[test]
    fn test_list_tenants() {
        let repo = setup();
        repo.create("A", "inst-a", "k1", None, None).unwrap();
        repo.create("B", "inst-b", "k2", None, None).unwrap();

        let tenants = repo.list().unwrap();
        assert_eq!(tenants.len(), 2);
        assert!(tenants.iter().all(|t| t.active));
    }
}
