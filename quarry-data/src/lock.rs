use crate::model::TableMapping;
use crate::query::{quote_identifier, Dialect};

/// Provider name reported by PostgreSQL-backed contexts.
pub const POSTGRES: &str = "PostgreSQL";

/// Capability: produce the statement that takes an exclusive table lock
/// for the rest of the current transaction.
pub trait ExclusiveLock: Send + Sync {
    fn statement(&self, table: &TableMapping) -> String;
}

/// `LOCK TABLE ... IN ACCESS EXCLUSIVE MODE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresAccessExclusive;

impl ExclusiveLock for PostgresAccessExclusive {
    fn statement(&self, table: &TableMapping) -> String {
        let target = match &table.schema {
            Some(schema) => format!(
                "{}.{}",
                quote_identifier(schema, Dialect::Postgres),
                quote_identifier(&table.table, Dialect::Postgres)
            ),
            None => quote_identifier(&table.table, Dialect::Postgres),
        };
        format!("LOCK TABLE {target} IN ACCESS EXCLUSIVE MODE")
    }
}

/// The lock implementation known for a provider, if any.
pub fn for_provider(provider: &str) -> Option<&'static dyn ExclusiveLock> {
    static POSTGRES_LOCK: PostgresAccessExclusive = PostgresAccessExclusive;
    match provider {
        POSTGRES => Some(&POSTGRES_LOCK),
        _ => None,
    }
}
