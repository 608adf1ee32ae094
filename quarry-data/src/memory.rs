use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::context::{Change, DbContext, RowNotFound};
use crate::entity::{to_row, type_name_of, Entity};
use crate::error::DataError;
use crate::filter::LikePatterns;
use crate::model::{Model, TableMapping};
use crate::query::QueryBuilder;
use crate::value::{Row, Value};

/// Provider name of [`MemoryContext`].
pub const MEMORY: &str = "Memory";

/// Insert of a key that is already stored.
#[derive(Debug, Clone)]
pub struct DuplicateKey {
    pub table: String,
    pub key: Value,
}

impl std::fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "duplicate key {} in '{}'", self.key, self.table)
    }
}

impl std::error::Error for DuplicateKey {}

type Tables = HashMap<String, Vec<Row>>;

#[derive(Default)]
struct State {
    committed: Tables,
    /// Working copy while a transaction is open.
    working: Option<Tables>,
}

impl State {
    fn current(&self) -> &Tables {
        self.working.as_ref().unwrap_or(&self.committed)
    }

    fn current_mut(&mut self) -> &mut Tables {
        self.working.as_mut().unwrap_or(&mut self.committed)
    }
}

/// In-process store with snapshot transactions.
///
/// Rows live per `schema.table`; a transaction works on a copy of the
/// committed tables which `commit` publishes and `rollback` drops. There is
/// no exclusive lock statement for this provider.
pub struct MemoryContext {
    model: Model,
    state: Mutex<State>,
}

impl MemoryContext {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            state: Mutex::new(State::default()),
        }
    }

    /// Store `entities` directly as committed rows, bypassing validation.
    pub fn seed<T: Entity>(&self, entities: impl IntoIterator<Item = T>) -> Result<(), DataError> {
        let mapping = self.model.mapping_of::<T>().cloned().ok_or_else(|| {
            DataError::InvalidState(format!("{} is not part of the model", type_name_of::<T>()))
        })?;
        let mut changes = Vec::new();
        for entity in entities {
            changes.push(Change::Insert {
                mapping: mapping.clone(),
                row: to_row(&entity)?,
            });
        }
        let mut state = self.state();
        let mut tables = state.committed.clone();
        apply(&mut tables, changes)?;
        state.committed = tables;
        Ok(())
    }

    /// Committed rows of a table, in insertion order.
    pub fn committed_rows(&self, mapping: &TableMapping) -> Vec<Row> {
        self.state()
            .committed
            .get(&mapping.qualified_name())
            .cloned()
            .unwrap_or_default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn matching(&self, query: &QueryBuilder) -> Vec<Row> {
        let key = table_key(query.schema_name(), query.table());
        let state = self.state();
        let mut patterns = LikePatterns::default();
        state
            .current()
            .get(&key)
            .map(|rows| {
                rows.iter()
                    .filter(|row| {
                        query
                            .filter_ref()
                            .map_or(true, |f| f.matches_with(row, &mut patterns))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl DbContext for MemoryContext {
    fn provider_name(&self) -> &str {
        MEMORY
    }

    fn model(&self) -> &Model {
        &self.model
    }

    async fn fetch(&self, query: &QueryBuilder, columns: &[&str]) -> Result<Vec<Row>, DataError> {
        let mut rows = self.matching(query);

        if !query.ordering().is_empty() {
            rows.sort_by(|a, b| compare_rows(a, b, query.ordering()));
        }

        let offset = query.offset_value().unwrap_or(0);
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = query
            .limit_value()
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| project(row, columns))
            .collect())
    }

    async fn count(&self, query: &QueryBuilder) -> Result<u64, DataError> {
        Ok(self.matching(query).len() as u64)
    }

    async fn save_changes(&self, changes: Vec<Change>) -> Result<u64, DataError> {
        let mut state = self.state();
        let mut tables = state.current().clone();
        let affected = apply(&mut tables, changes)?;
        *state.current_mut() = tables;
        Ok(affected)
    }

    async fn execute(&self, _sql: &str) -> Result<u64, DataError> {
        Err(DataError::UnsupportedOperation(format!(
            "the {MEMORY} provider does not execute SQL statements"
        )))
    }

    async fn begin_transaction(&self) -> Result<(), DataError> {
        let mut state = self.state();
        if state.working.is_some() {
            return Err(DataError::InvalidState("a transaction is already active".into()));
        }
        state.working = Some(state.committed.clone());
        Ok(())
    }

    async fn commit_transaction(&self) -> Result<(), DataError> {
        let mut state = self.state();
        let working = state
            .working
            .take()
            .ok_or_else(|| DataError::InvalidState("no active transaction".into()))?;
        state.committed = working;
        Ok(())
    }

    async fn rollback_transaction(&self) -> Result<(), DataError> {
        let mut state = self.state();
        state
            .working
            .take()
            .ok_or_else(|| DataError::InvalidState("no active transaction".into()))?;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.state().working.is_some()
    }
}

fn table_key(schema: Option<&str>, table: &str) -> String {
    match schema {
        Some(schema) => format!("{schema}.{table}"),
        None => table.to_string(),
    }
}

fn key_of(row: &Row, mapping: &TableMapping) -> Value {
    row.get(&mapping.key_column).cloned().unwrap_or(Value::Null)
}

fn same_key(row: &Row, mapping: &TableMapping, key: &Value) -> bool {
    key_of(row, mapping).total_cmp(key) == Ordering::Equal
}

fn apply(tables: &mut Tables, changes: Vec<Change>) -> Result<u64, DataError> {
    let mut affected = 0u64;
    for change in changes {
        let table = change.mapping().qualified_name();
        let rows = tables.entry(table.clone()).or_default();
        match change {
            Change::Insert { mapping, row } => {
                let key = key_of(&row, &mapping);
                if rows.iter().any(|r| same_key(r, &mapping, &key)) {
                    return Err(DataError::database(DuplicateKey { table, key }));
                }
                rows.push(row);
                affected += 1;
            }
            Change::Update { mapping, row } => {
                let key = key_of(&row, &mapping);
                let Some(existing) = rows.iter_mut().find(|r| same_key(r, &mapping, &key)) else {
                    return Err(DataError::database(RowNotFound { table, key }));
                };
                *existing = row;
                affected += 1;
            }
            Change::Delete { mapping, key } => {
                let before = rows.len();
                rows.retain(|r| !same_key(r, &mapping, &key));
                affected += (before - rows.len()) as u64;
            }
        }
    }
    Ok(affected)
}

fn compare_rows(a: &Row, b: &Row, ordering: &[(String, bool)]) -> Ordering {
    for (column, ascending) in ordering {
        let left = a.get(column).unwrap_or(&Value::Null);
        let right = b.get(column).unwrap_or(&Value::Null);
        let ord = left.total_cmp(right);
        let ord = if *ascending { ord } else { ord.reverse() };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn project(row: Row, columns: &[&str]) -> Row {
    if columns.is_empty() {
        return row;
    }
    row.into_iter()
        .filter(|(k, _)| columns.contains(&k.as_str()))
        .collect()
}
