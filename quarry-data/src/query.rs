use crate::filter::Filter;
use crate::value::{Row, Value};

/// A query description over one table: filter, ordering and a window.
///
/// Backends either render it to SQL (`build_*_checked`) or interpret it
/// directly through the accessors.
///
/// # Example
///
/// ```ignore
/// let q = QueryBuilder::new("books")
///     .schema(Some("library"))
///     .filter(Filter::like("title", "%Dune%"))
///     .order_by("id", true)
///     .offset(20)
///     .limit(10);
/// let (sql, params) = q.build_select_checked(&["id", "title"])?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Generic SQL using `?` placeholders (default).
    Generic,
    /// SQLite-style `?` placeholders.
    Sqlite,
    /// MySQL-style `?` placeholders with backtick quoting.
    MySql,
    /// Postgres-style `$1, $2, ...` placeholders.
    Postgres,
}

impl Dialect {
    fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Generic | Dialect::Sqlite | Dialect::MySql => "?".to_string(),
        }
    }

    fn quote_char(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Generic | Dialect::Sqlite | Dialect::Postgres => '"',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierPolicy {
    /// Validate identifiers against a conservative pattern.
    Validate,
    /// Validate and quote identifiers using the dialect quoting style.
    Quote,
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    schema: Option<String>,
    table: String,
    filter: Option<Filter>,
    order: Vec<(String, bool)>,
    limit_val: Option<u64>,
    offset_val: Option<u64>,
    dialect: Dialect,
    identifier_policy: IdentifierPolicy,
}

impl QueryBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            schema: None,
            table: table.to_string(),
            filter: None,
            order: Vec::new(),
            limit_val: None,
            offset_val: None,
            dialect: Dialect::Generic,
            identifier_policy: IdentifierPolicy::Quote,
        }
    }

    /// Set the SQL dialect (affects placeholder style and quoting).
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Configure identifier quoting behavior.
    pub fn identifier_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.identifier_policy = policy;
        self
    }

    pub fn schema(mut self, schema: Option<&str>) -> Self {
        self.schema = schema.map(str::to_string);
        self
    }

    /// Add a condition; successive calls are combined with `AND`.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order.push((column.to_string(), ascending));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit_val = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset_val = Some(offset);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn filter_ref(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub fn ordering(&self) -> &[(String, bool)] {
        &self.order
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit_val
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset_val
    }

    /// Build a SELECT returning `(sql, bind_values)`.
    pub fn build_select_checked(&self, columns: &[&str]) -> Result<(String, Vec<Value>), QueryError> {
        let table = self.format_table_checked()?;
        let columns = self.format_column_list_checked(columns)?;

        let mut sql = format!("SELECT {columns} FROM {table}");
        let mut params = Vec::new();
        let mut placeholder_idx = 1usize;
        self.append_where_checked(&mut sql, &mut params, &mut placeholder_idx)?;
        self.append_order_checked(&mut sql)?;
        self.append_limit_offset(&mut sql);
        Ok((sql, params))
    }

    /// Build a COUNT query over the same filter; ordering and window are ignored.
    pub fn build_count_checked(&self) -> Result<(String, Vec<Value>), QueryError> {
        let table = self.format_table_checked()?;
        let mut sql = format!("SELECT COUNT(*) FROM {table}");
        let mut params = Vec::new();
        let mut placeholder_idx = 1usize;
        self.append_where_checked(&mut sql, &mut params, &mut placeholder_idx)?;
        Ok((sql, params))
    }

    pub fn build_insert_checked(&self, row: &Row) -> Result<(String, Vec<Value>), QueryError> {
        let table = self.format_table_checked()?;
        let mut columns = Vec::with_capacity(row.len());
        let mut placeholders = Vec::with_capacity(row.len());
        let mut params = Vec::with_capacity(row.len());
        for (idx, (column, value)) in row.iter().enumerate() {
            columns.push(self.format_identifier_checked(column, "column")?);
            placeholders.push(self.dialect.placeholder(idx + 1));
            params.push(value.clone());
        }
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );
        Ok((sql, params))
    }

    /// Build an UPDATE of every non-key column of `row`, matched on `key_column`.
    pub fn build_update_checked(
        &self,
        row: &Row,
        key_column: &str,
    ) -> Result<(String, Vec<Value>), QueryError> {
        let table = self.format_table_checked()?;
        let key = row.get(key_column).ok_or_else(|| QueryError::MissingKey {
            column: key_column.to_string(),
        })?;
        let mut assignments = Vec::with_capacity(row.len());
        let mut params = Vec::with_capacity(row.len());
        let mut placeholder_idx = 1usize;
        for (column, value) in row.iter().filter(|(c, _)| c.as_str() != key_column) {
            let column = self.format_identifier_checked(column, "column")?;
            assignments.push(format!("{column} = {}", self.dialect.placeholder(placeholder_idx)));
            placeholder_idx += 1;
            params.push(value.clone());
        }
        if assignments.is_empty() {
            return Err(QueryError::EmptyUpdate {
                table: self.table.clone(),
            });
        }
        let key_ident = self.format_identifier_checked(key_column, "column")?;
        let sql = format!(
            "UPDATE {table} SET {} WHERE {key_ident} = {}",
            assignments.join(", "),
            self.dialect.placeholder(placeholder_idx)
        );
        params.push(key.clone());
        Ok((sql, params))
    }

    pub fn build_delete_checked(
        &self,
        key_column: &str,
        key: Value,
    ) -> Result<(String, Vec<Value>), QueryError> {
        let table = self.format_table_checked()?;
        let key_ident = self.format_identifier_checked(key_column, "column")?;
        let sql = format!(
            "DELETE FROM {table} WHERE {key_ident} = {}",
            self.dialect.placeholder(1)
        );
        Ok((sql, vec![key]))
    }

    /// The qualified, checked table reference as it appears in generated SQL.
    pub fn format_table_checked(&self) -> Result<String, QueryError> {
        let table = self.format_identifier_checked(&self.table, "table")?;
        match &self.schema {
            Some(schema) => {
                let schema = self.format_identifier_checked(schema, "schema")?;
                Ok(format!("{schema}.{table}"))
            }
            None => Ok(table),
        }
    }

    fn append_where_checked(
        &self,
        sql: &mut String,
        params: &mut Vec<Value>,
        placeholder_idx: &mut usize,
    ) -> Result<(), QueryError> {
        let Some(filter) = &self.filter else {
            return Ok(());
        };
        sql.push_str(" WHERE ");
        self.render_filter(filter, sql, params, placeholder_idx)
    }

    fn render_filter(
        &self,
        filter: &Filter,
        sql: &mut String,
        params: &mut Vec<Value>,
        placeholder_idx: &mut usize,
    ) -> Result<(), QueryError> {
        match filter {
            Filter::Eq(col, val) => {
                self.render_binary(col, "=", val.clone(), sql, params, placeholder_idx)
            }
            Filter::NotEq(col, val) => {
                self.render_binary(col, "<>", val.clone(), sql, params, placeholder_idx)
            }
            Filter::Gt(col, val) => {
                self.render_binary(col, ">", val.clone(), sql, params, placeholder_idx)
            }
            Filter::Gte(col, val) => {
                self.render_binary(col, ">=", val.clone(), sql, params, placeholder_idx)
            }
            Filter::Lt(col, val) => {
                self.render_binary(col, "<", val.clone(), sql, params, placeholder_idx)
            }
            Filter::Lte(col, val) => {
                self.render_binary(col, "<=", val.clone(), sql, params, placeholder_idx)
            }
            Filter::Like(col, pat) => {
                self.render_binary(col, "LIKE", Value::Text(pat.clone()), sql, params, placeholder_idx)
            }
            Filter::In(_, vals) if vals.is_empty() => {
                sql.push_str("1 = 0");
                Ok(())
            }
            Filter::In(col, vals) => {
                let col = self.format_identifier_checked(col, "column")?;
                let placeholders: Vec<_> = vals
                    .iter()
                    .map(|_| {
                        let placeholder = self.dialect.placeholder(*placeholder_idx);
                        *placeholder_idx += 1;
                        placeholder
                    })
                    .collect();
                sql.push_str(&format!("{col} IN ({})", placeholders.join(", ")));
                params.extend(vals.iter().cloned());
                Ok(())
            }
            Filter::IsNull(col) => {
                let col = self.format_identifier_checked(col, "column")?;
                sql.push_str(&format!("{col} IS NULL"));
                Ok(())
            }
            Filter::IsNotNull(col) => {
                let col = self.format_identifier_checked(col, "column")?;
                sql.push_str(&format!("{col} IS NOT NULL"));
                Ok(())
            }
            Filter::And(items) => self.render_group(items, " AND ", "1 = 1", sql, params, placeholder_idx),
            Filter::Or(items) => self.render_group(items, " OR ", "1 = 0", sql, params, placeholder_idx),
            Filter::Not(inner) => {
                sql.push_str("NOT (");
                self.render_filter(inner, sql, params, placeholder_idx)?;
                sql.push(')');
                Ok(())
            }
        }
    }

    fn render_binary(
        &self,
        col: &str,
        op: &str,
        val: Value,
        sql: &mut String,
        params: &mut Vec<Value>,
        placeholder_idx: &mut usize,
    ) -> Result<(), QueryError> {
        let col = self.format_identifier_checked(col, "column")?;
        let placeholder = self.dialect.placeholder(*placeholder_idx);
        *placeholder_idx += 1;
        sql.push_str(&format!("{col} {op} {placeholder}"));
        params.push(val);
        Ok(())
    }

    fn render_group(
        &self,
        items: &[Filter],
        separator: &str,
        empty: &str,
        sql: &mut String,
        params: &mut Vec<Value>,
        placeholder_idx: &mut usize,
    ) -> Result<(), QueryError> {
        if items.is_empty() {
            sql.push_str(empty);
            return Ok(());
        }
        sql.push('(');
        for (idx, item) in items.iter().enumerate() {
            if idx > 0 {
                sql.push_str(separator);
            }
            self.render_filter(item, sql, params, placeholder_idx)?;
        }
        sql.push(')');
        Ok(())
    }

    fn append_order_checked(&self, sql: &mut String) -> Result<(), QueryError> {
        if self.order.is_empty() {
            return Ok(());
        }
        sql.push_str(" ORDER BY ");
        let mut clauses = Vec::with_capacity(self.order.len());
        for (col, asc) in &self.order {
            let col = self.format_identifier_checked(col, "column")?;
            if *asc {
                clauses.push(format!("{col} ASC"));
            } else {
                clauses.push(format!("{col} DESC"));
            }
        }
        sql.push_str(&clauses.join(", "));
        Ok(())
    }

    fn append_limit_offset(&self, sql: &mut String) {
        match (self.limit_val, self.offset_val) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            // SQLite and MySQL reject OFFSET without LIMIT.
            (None, Some(offset)) => {
                sql.push_str(&format!(" LIMIT {} OFFSET {offset}", i64::MAX))
            }
            (None, None) => {}
        }
    }

    fn format_column_list_checked(&self, columns: &[&str]) -> Result<String, QueryError> {
        if columns.is_empty() {
            return Ok("*".to_string());
        }
        let mut out = Vec::with_capacity(columns.len());
        for col in columns {
            out.push(self.format_identifier_checked(col, "column")?);
        }
        Ok(out.join(", "))
    }

    fn format_identifier_checked(&self, ident: &str, kind: &'static str) -> Result<String, QueryError> {
        if !is_valid_identifier(ident) {
            return Err(QueryError::InvalidIdentifier {
                kind,
                ident: ident.to_string(),
            });
        }
        match self.identifier_policy {
            IdentifierPolicy::Quote => Ok(quote_identifier(ident, self.dialect)),
            IdentifierPolicy::Validate => Ok(ident.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum QueryError {
    InvalidIdentifier { kind: &'static str, ident: String },
    MissingKey { column: String },
    /// An UPDATE with nothing to set besides the key.
    EmptyUpdate { table: String },
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::InvalidIdentifier { kind, ident } => {
                write!(f, "Invalid {kind} identifier: {ident}")
            }
            QueryError::MissingKey { column } => {
                write!(f, "Row has no value for key column '{column}'")
            }
            QueryError::EmptyUpdate { table } => {
                write!(f, "Update of '{table}' has no column to set")
            }
        }
    }
}

impl std::error::Error for QueryError {}

/// A single, unqualified SQL identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn quote_identifier(ident: &str, dialect: Dialect) -> String {
    let quote = dialect.quote_char();
    format!("{quote}{ident}{quote}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_select() {
        let (sql, params) = QueryBuilder::new("books").build_select_checked(&[]).unwrap();
        assert_eq!(sql, "SELECT * FROM \"books\"");
        assert!(params.is_empty());
    }

    #[test]
    fn test_complex_query() {
        let (sql, params) = QueryBuilder::new("books")
            .identifier_policy(IdentifierPolicy::Validate)
            .filter(Filter::eq("status", "active"))
            .filter(Filter::like("title", "%dune%"))
            .order_by("id", true)
            .limit(10)
            .offset(20)
            .build_select_checked(&["id", "title"])
            .unwrap();
        assert_eq!(
            sql,
            "SELECT id, title FROM books WHERE (status = ? AND title LIKE ?) ORDER BY id ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(params, vec![Value::from("active"), Value::from("%dune%")]);
    }

    #[test]
    fn test_count_ignores_window() {
        let (sql, params) = QueryBuilder::new("books")
            .filter(Filter::gt("pages", 100))
            .order_by("id", false)
            .limit(5)
            .build_count_checked()
            .unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM \"books\" WHERE \"pages\" > ?");
        assert_eq!(params, vec![Value::Int(100)]);
    }

    #[test]
    fn test_postgres_placeholders_and_schema() {
        let (sql, params) = QueryBuilder::new("books")
            .schema(Some("library"))
            .dialect(Dialect::Postgres)
            .filter(Filter::eq("status", "active").or(Filter::is_in("role", ["a", "b"])))
            .build_select_checked(&["id"])
            .unwrap();
        assert_eq!(
            sql,
            "SELECT \"id\" FROM \"library\".\"books\" WHERE (\"status\" = $1 OR \"role\" IN ($2, $3))"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_empty_groups_render_constants() {
        let (sql, _) = QueryBuilder::new("t")
            .identifier_policy(IdentifierPolicy::Validate)
            .filter(Filter::Or(vec![]))
            .build_count_checked()
            .unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM t WHERE 1 = 0");
    }

    #[test]
    fn test_offset_without_limit() {
        let (sql, _) = QueryBuilder::new("t")
            .identifier_policy(IdentifierPolicy::Validate)
            .offset(3)
            .build_select_checked(&[])
            .unwrap();
        assert!(sql.ends_with(&format!("LIMIT {} OFFSET 3", i64::MAX)));
    }

    #[test]
    fn test_write_statements() {
        let mut row = Row::new();
        row.insert("id".into(), Value::Int(1));
        row.insert("title".into(), Value::from("Dune"));
        let q = QueryBuilder::new("books").dialect(Dialect::Postgres);

        let (sql, params) = q.build_insert_checked(&row).unwrap();
        assert_eq!(sql, "INSERT INTO \"books\" (\"id\", \"title\") VALUES ($1, $2)");
        assert_eq!(params.len(), 2);

        let (sql, params) = q.build_update_checked(&row, "id").unwrap();
        assert_eq!(sql, "UPDATE \"books\" SET \"title\" = $1 WHERE \"id\" = $2");
        assert_eq!(params, vec![Value::from("Dune"), Value::Int(1)]);

        let (sql, _) = q.build_delete_checked("id", Value::Int(1)).unwrap();
        assert_eq!(sql, "DELETE FROM \"books\" WHERE \"id\" = $1");
    }

    #[test]
    fn test_update_of_key_only_row_is_rejected() {
        let mut row = Row::new();
        row.insert("id".into(), Value::Int(1));
        let err = QueryBuilder::new("tags").build_update_checked(&row, "id").unwrap_err();
        assert!(matches!(err, QueryError::EmptyUpdate { ref table } if table == "tags"));
    }

    #[test]
    fn test_checked_invalid_identifier() {
        let err = QueryBuilder::new("books;drop")
            .build_select_checked(&[])
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidIdentifier { .. }));
    }
}
