//! Store selection from the connection string.

use anyhow::Context;
use async_trait::async_trait;
use loadgen_core::{MemoryStore, Mutation, StoreError, TransactionBody, TransactionalStore};
use loadgen_mysql::MySqlStore;
use loadgen_postgresql::PostgreSqlStore;
use tracing::info;

use crate::logging::mask_connection_password;

/// Backend family named by a connection string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    PostgreSql,
    MySql,
    Memory,
}

impl StoreKind {
    /// `postgres://`, `postgresql://` and key-value strings (`host=...`) are
    /// PostgreSQL; `mysql://` is MySQL; `memory://` is the in-process store.
    pub fn from_connection_string(conn: &str) -> anyhow::Result<Self> {
        let conn = conn.trim();
        let scheme = conn
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase());

        match scheme.as_deref() {
            Some("postgres") | Some("postgresql") => Ok(StoreKind::PostgreSql),
            Some("mysql") => Ok(StoreKind::MySql),
            Some("memory") => Ok(StoreKind::Memory),
            Some(other) => anyhow::bail!("Unsupported connection string scheme '{other}'"),
            None if conn.contains("host=") => Ok(StoreKind::PostgreSql),
            None => anyhow::bail!(
                "Unrecognized connection string '{}'",
                mask_connection_password(conn)
            ),
        }
    }
}

/// Any of the supported stores behind one concrete type.
pub enum AnyStore {
    PostgreSql(PostgreSqlStore),
    MySql(MySqlStore),
    Memory(MemoryStore),
}

impl AnyStore {
    pub fn kind(&self) -> StoreKind {
        match self {
            AnyStore::PostgreSql(_) => StoreKind::PostgreSql,
            AnyStore::MySql(_) => StoreKind::MySql,
            AnyStore::Memory(_) => StoreKind::Memory,
        }
    }
}

/// Open the store named by `conn`, or an in-memory store when `dry_run` is set.
pub async fn connect(conn: &str, dry_run: bool) -> anyhow::Result<AnyStore> {
    if dry_run {
        info!("Dry run: using an in-memory store");
        return Ok(AnyStore::Memory(MemoryStore::new()));
    }

    let masked = mask_connection_password(conn);
    let store = match StoreKind::from_connection_string(conn)? {
        StoreKind::PostgreSql => AnyStore::PostgreSql(
            PostgreSqlStore::connect(conn)
                .await
                .with_context(|| format!("Failed to connect to PostgreSQL at {masked}"))?,
        ),
        StoreKind::MySql => AnyStore::MySql(
            MySqlStore::connect(conn)
                .await
                .with_context(|| format!("Failed to connect to MySQL at {masked}"))?,
        ),
        StoreKind::Memory => AnyStore::Memory(MemoryStore::new()),
    };

    info!("Connected to {masked}");
    Ok(store)
}

#[async_trait]
impl TransactionalStore for AnyStore {
    async fn read_write_transaction<B>(&self, body: &mut B) -> Result<B::Output, StoreError>
    where
        B: TransactionBody,
    {
        match self {
            AnyStore::PostgreSql(store) => store.read_write_transaction(body).await,
            AnyStore::MySql(store) => store.read_write_transaction(body).await,
            AnyStore::Memory(store) => store.read_write_transaction(body).await,
        }
    }

    async fn apply(&self, mutations: Vec<Mutation>) -> Result<(), StoreError> {
        match self {
            AnyStore::PostgreSql(store) => store.apply(mutations).await,
            AnyStore::MySql(store) => store.apply(mutations).await,
            AnyStore::Memory(store) => store.apply(mutations).await,
        }
    }

    async fn close(self) -> Result<(), StoreError> {
        match self {
            AnyStore::PostgreSql(store) => store.close().await,
            AnyStore::MySql(store) => store.close().await,
            AnyStore::Memory(store) => store.close().await,
        }
    }
}
