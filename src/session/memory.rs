//! Embedded wide-column engine.
//!
//! `MemoryCluster` holds keyspaces, tables, and partitions; `MemorySession`
//! is a cheap handle bound to one keyspace, implementing [`Session`]. The
//! engine executes the CQL subset from [`cql`] and enforces wide-column
//! discipline on every statement:
//!
//! - the partition key is fully restricted by equality, or the SELECT has no
//!   WHERE clause at all (full scan),
//! - clustering restrictions form a key prefix with at most one ranged
//!   column at the end,
//! - INSERT and UPDATE are upserts over individual cells,
//! - DELETE takes a full primary key or a whole partition,
//! - each statement touches exactly one row range in one table; there is no
//!   multi-statement atomicity.
//!
//! Rows within a partition are ordered by clustering key; partitions are
//! ordered by partition key, which stands in for token order.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use super::cql::{
    self, CmpOp, ColumnType, CqlStatement, CreateKeyspace, CreateTable, Delete, Insert, Predicate,
    Select, TableRef, Update,
};
use super::errors::{SessionError, SessionResult};
use super::statement::Statement;
use super::value::{Rows, Value};
use super::Session;

// ==================
// Schema and storage
// ==================

#[derive(Debug, Clone)]
struct TableSchema {
    columns: Vec<(String, ColumnType)>,
    partition_key: Vec<String>,
    clustering_key: Vec<String>,
    clustering_desc: bool,
}

impl TableSchema {
    fn from_create(create: &CreateTable) -> Self {
        Self {
            columns: create.columns.clone(),
            partition_key: create.partition_key.clone(),
            clustering_key: create.clustering_key.clone(),
            clustering_desc: create.clustering_desc,
        }
    }

    fn column_type(&self, column: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, column_type)| *column_type)
    }

    fn is_key_column(&self, column: &str) -> bool {
        self.partition_key.iter().any(|c| c == column)
            || self.clustering_key.iter().any(|c| c == column)
    }
}

/// Cells of one row, keyed by column name. Null cells are absent.
type Row = HashMap<String, Value>;

/// Rows of one partition, ordered by clustering key.
type Partition = BTreeMap<Vec<Value>, Row>;

struct Table {
    schema: TableSchema,
    partitions: BTreeMap<Vec<Value>, Partition>,
}

#[derive(Default)]
struct Keyspace {
    tables: HashMap<String, Table>,
}

#[derive(Default)]
struct ClusterState {
    keyspaces: HashMap<String, Keyspace>,
}

impl ClusterState {
    fn table(&self, keyspace: &str, table: &str) -> SessionResult<&Table> {
        self.keyspaces
            .get(keyspace)
            .ok_or_else(|| SessionError::UnknownKeyspace(keyspace.to_string()))?
            .tables
            .get(table)
            .ok_or_else(|| SessionError::UnknownTable(format!("{}.{}", keyspace, table)))
    }

    fn table_mut(&mut self, keyspace: &str, table: &str) -> SessionResult<&mut Table> {
        self.keyspaces
            .get_mut(keyspace)
            .ok_or_else(|| SessionError::UnknownKeyspace(keyspace.to_string()))?
            .tables
            .get_mut(table)
            .ok_or_else(|| SessionError::UnknownTable(format!("{}.{}", keyspace, table)))
    }
}

// ==================
// Cluster and session
// ==================

/// Process-wide store shared by all sessions.
pub struct MemoryCluster {
    state: RwLock<ClusterState>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ClusterState::default()),
        }
    }

    /// Open a session bound to a keyspace. The keyspace does not need to
    /// exist yet; statements fail with `UnknownKeyspace` until DDL creates it.
    pub fn session(self: &Arc<Self>, keyspace: &str) -> MemorySession {
        MemorySession {
            cluster: Arc::clone(self),
            keyspace: keyspace.to_lowercase(),
        }
    }
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

/// Session handle bound to one keyspace of a [`MemoryCluster`].
pub struct MemorySession {
    cluster: Arc<MemoryCluster>,
    keyspace: String,
}

impl MemorySession {
    /// Keyspace for unqualified table references.
    fn resolve<'a>(&'a self, table_ref: &'a TableRef) -> (&'a str, &'a str) {
        (
            table_ref.keyspace.as_deref().unwrap_or(&self.keyspace),
            table_ref.table.as_str(),
        )
    }

    fn read_state(&self) -> SessionResult<std::sync::RwLockReadGuard<'_, ClusterState>> {
        self.cluster
            .state
            .read()
            .map_err(|_| SessionError::Connection("cluster state lock poisoned".to_string()))
    }

    fn write_state(&self) -> SessionResult<std::sync::RwLockWriteGuard<'_, ClusterState>> {
        self.cluster
            .state
            .write()
            .map_err(|_| SessionError::Connection("cluster state lock poisoned".to_string()))
    }

    fn run(&self, parsed: &CqlStatement, params: &[Value]) -> SessionResult<Rows> {
        match parsed {
            CqlStatement::CreateKeyspace(statement) => self.create_keyspace(statement),
            CqlStatement::CreateTable(statement) => self.create_table(statement),
            CqlStatement::Insert(statement) => self.insert(statement, params),
            CqlStatement::Select(statement) => self.select(statement, params),
            CqlStatement::Update(statement) => self.update(statement, params),
            CqlStatement::Delete(statement) => self.delete(statement, params),
        }
    }

    // ==================
    // DDL
    // ==================

    fn create_keyspace(&self, statement: &CreateKeyspace) -> SessionResult<Rows> {
        let mut state = self.write_state()?;
        if state.keyspaces.contains_key(&statement.name) {
            if statement.if_not_exists {
                return Ok(Rows::empty());
            }
            return Err(SessionError::AlreadyExists(format!(
                "keyspace '{}'",
                statement.name
            )));
        }
        state
            .keyspaces
            .insert(statement.name.clone(), Keyspace::default());
        Ok(Rows::empty())
    }

    fn create_table(&self, statement: &CreateTable) -> SessionResult<Rows> {
        let (keyspace, table) = self.resolve(&statement.table);
        let mut state = self.write_state()?;
        let keyspace_state = state
            .keyspaces
            .get_mut(keyspace)
            .ok_or_else(|| SessionError::UnknownKeyspace(keyspace.to_string()))?;

        if keyspace_state.tables.contains_key(table) {
            if statement.if_not_exists {
                return Ok(Rows::empty());
            }
            return Err(SessionError::AlreadyExists(format!(
                "table '{}.{}'",
                keyspace, table
            )));
        }

        keyspace_state.tables.insert(
            table.to_string(),
            Table {
                schema: TableSchema::from_create(statement),
                partitions: BTreeMap::new(),
            },
        );
        Ok(Rows::empty())
    }

    // ==================
    // DML
    // ==================

    fn insert(&self, statement: &Insert, params: &[Value]) -> SessionResult<Rows> {
        let (keyspace, table_name) = self.resolve(&statement.table);
        let mut state = self.write_state()?;
        let table = state.table_mut(keyspace, table_name)?;

        check_insert(&table.schema, statement)?;
        bind(&table.schema, statement.columns.iter(), params, table_name)?;

        let cells: HashMap<&str, &Value> = statement
            .columns
            .iter()
            .map(String::as_str)
            .zip(params)
            .collect();
        let partition_key = key_values(&table.schema.partition_key, &cells);
        let clustering_key = key_values(&table.schema.clustering_key, &cells);

        let row = table
            .partitions
            .entry(partition_key)
            .or_default()
            .entry(clustering_key)
            .or_default();
        for (column, value) in cells {
            write_cell(row, column, value);
        }
        Ok(Rows::empty())
    }

    fn select(&self, statement: &Select, params: &[Value]) -> SessionResult<Rows> {
        let (keyspace, table_name) = self.resolve(&statement.table);
        let state = self.read_state()?;
        let table = state.table(keyspace, table_name)?;
        let schema = &table.schema;

        check_select(schema, statement)?;
        bind(
            schema,
            statement.predicates.iter().map(|p| &p.column),
            params,
            table_name,
        )?;

        let mut rows = Vec::new();
        if statement.predicates.is_empty() {
            // Full scan, partition by partition.
            for partition in table.partitions.values() {
                collect_rows(partition, schema, &[], &statement.columns, &mut rows);
            }
        } else {
            // Predicates and parameters are index-aligned.
            let (partition_pairs, clustering_pairs): (PredicatePairs, PredicatePairs) = statement
                .predicates
                .iter()
                .zip(params)
                .partition(|(p, _)| schema.partition_key.iter().any(|c| *c == p.column));
            let partition_key: Vec<Value> = schema
                .partition_key
                .iter()
                .map(|column| {
                    partition_pairs
                        .iter()
                        .find(|(p, _)| p.column == *column)
                        .map(|(_, value)| (*value).clone())
                        .unwrap_or(Value::Null)
                })
                .collect();
            if let Some(partition) = table.partitions.get(&partition_key) {
                collect_rows(
                    partition,
                    schema,
                    &clustering_pairs,
                    &statement.columns,
                    &mut rows,
                );
            }
        }

        Ok(Rows::new(statement.columns.clone(), rows))
    }

    fn update(&self, statement: &Update, params: &[Value]) -> SessionResult<Rows> {
        let (keyspace, table_name) = self.resolve(&statement.table);
        let mut state = self.write_state()?;
        let table = state.table_mut(keyspace, table_name)?;

        check_update(&table.schema, statement)?;
        let bound_columns: Vec<&String> = statement
            .assignments
            .iter()
            .chain(statement.predicates.iter().map(|p| &p.column))
            .collect();
        bind(
            &table.schema,
            bound_columns.iter().copied(),
            params,
            table_name,
        )?;

        let predicate_params = &params[statement.assignments.len()..];
        let cells: HashMap<&str, &Value> = statement
            .predicates
            .iter()
            .map(|p| p.column.as_str())
            .zip(predicate_params)
            .collect();
        let partition_key = key_values(&table.schema.partition_key, &cells);
        let clustering_key = key_values(&table.schema.clustering_key, &cells);

        // Upsert: an UPDATE of an absent row creates it.
        let row = table
            .partitions
            .entry(partition_key)
            .or_default()
            .entry(clustering_key)
            .or_default();
        for (column, value) in cells {
            write_cell(row, column, value);
        }
        for (column, value) in statement.assignments.iter().zip(params) {
            write_cell(row, column, value);
        }
        Ok(Rows::empty())
    }

    fn delete(&self, statement: &Delete, params: &[Value]) -> SessionResult<Rows> {
        let (keyspace, table_name) = self.resolve(&statement.table);
        let mut state = self.write_state()?;
        let table = state.table_mut(keyspace, table_name)?;

        let whole_partition = check_delete(&table.schema, statement)?;
        bind(
            &table.schema,
            statement.predicates.iter().map(|p| &p.column),
            params,
            table_name,
        )?;

        let cells: HashMap<&str, &Value> = statement
            .predicates
            .iter()
            .map(|p| p.column.as_str())
            .zip(params)
            .collect();
        let partition_key = key_values(&table.schema.partition_key, &cells);

        // Deletes of absent rows are no-ops, same as a real cluster.
        if whole_partition {
            table.partitions.remove(&partition_key);
        } else if let Some(partition) = table.partitions.get_mut(&partition_key) {
            let clustering_key = key_values(&table.schema.clustering_key, &cells);
            partition.remove(&clustering_key);
            if partition.is_empty() {
                table.partitions.remove(&partition_key);
            }
        }
        Ok(Rows::empty())
    }
}

impl Session for MemorySession {
    fn prepare(&self, cql: &str) -> SessionResult<Statement> {
        let parsed = cql::parse(cql)?;

        // Validate DML against the live schema so a malformed statement
        // fails at startup, not on first use. DDL may reference objects
        // that do not exist yet.
        match &parsed {
            CqlStatement::CreateKeyspace(_) | CqlStatement::CreateTable(_) => {}
            CqlStatement::Insert(statement) => {
                let (keyspace, table_name) = self.resolve(&statement.table);
                let state = self.read_state()?;
                check_insert(&state.table(keyspace, table_name)?.schema, statement)?;
            }
            CqlStatement::Select(statement) => {
                let (keyspace, table_name) = self.resolve(&statement.table);
                let state = self.read_state()?;
                check_select(&state.table(keyspace, table_name)?.schema, statement)?;
            }
            CqlStatement::Update(statement) => {
                let (keyspace, table_name) = self.resolve(&statement.table);
                let state = self.read_state()?;
                check_update(&state.table(keyspace, table_name)?.schema, statement)?;
            }
            CqlStatement::Delete(statement) => {
                let (keyspace, table_name) = self.resolve(&statement.table);
                let state = self.read_state()?;
                check_delete(&state.table(keyspace, table_name)?.schema, statement)?;
            }
        }

        Ok(Statement::new(cql, parsed))
    }

    fn execute(&self, statement: &Statement, params: &[Value]) -> SessionResult<Rows> {
        self.run(&statement.parsed, params)
    }

    fn execute_raw(&self, cql: &str, params: &[Value]) -> SessionResult<Rows> {
        let parsed = cql::parse(cql)?;
        self.run(&parsed, params)
    }
}

// ==================
// Statement checks
// ==================

fn unknown_column(table: &str, column: &str) -> SessionError {
    SessionError::UnknownColumn {
        table: table.to_string(),
        column: column.to_string(),
    }
}

fn check_insert(schema: &TableSchema, statement: &Insert) -> SessionResult<()> {
    for column in &statement.columns {
        if schema.column_type(column).is_none() {
            return Err(unknown_column(&statement.table.table, column));
        }
    }
    for key_column in schema
        .partition_key
        .iter()
        .chain(schema.clustering_key.iter())
    {
        if !statement.columns.contains(key_column) {
            return Err(SessionError::InvalidQuery(format!(
                "INSERT is missing primary key column '{}'",
                key_column
            )));
        }
    }
    Ok(())
}

fn check_select(schema: &TableSchema, statement: &Select) -> SessionResult<()> {
    for column in &statement.columns {
        if schema.column_type(column).is_none() {
            return Err(unknown_column(&statement.table.table, column));
        }
    }
    if statement.predicates.is_empty() {
        return Ok(());
    }
    check_partition_restriction(schema, &statement.table.table, &statement.predicates)?;
    check_clustering_restriction(schema, &statement.predicates, true)
}

fn check_update(schema: &TableSchema, statement: &Update) -> SessionResult<()> {
    for column in &statement.assignments {
        if schema.column_type(column).is_none() {
            return Err(unknown_column(&statement.table.table, column));
        }
        if schema.is_key_column(column) {
            return Err(SessionError::InvalidQuery(format!(
                "primary key column '{}' cannot be assigned",
                column
            )));
        }
    }
    check_partition_restriction(schema, &statement.table.table, &statement.predicates)?;
    check_full_clustering_restriction(schema, &statement.predicates)
}

/// Returns true when the statement deletes a whole partition.
fn check_delete(schema: &TableSchema, statement: &Delete) -> SessionResult<bool> {
    check_partition_restriction(schema, &statement.table.table, &statement.predicates)?;

    let clustering_restricted = statement
        .predicates
        .iter()
        .any(|p| schema.clustering_key.iter().any(|c| *c == p.column));
    if clustering_restricted {
        check_full_clustering_restriction(schema, &statement.predicates)?;
        Ok(false)
    } else {
        // Only the partition key is restricted: partition delete.
        Ok(true)
    }
}

/// Every predicate targets a key column; the partition key is fully
/// restricted by equality, one predicate per column.
fn check_partition_restriction(
    schema: &TableSchema,
    table: &str,
    predicates: &[Predicate],
) -> SessionResult<()> {
    for predicate in predicates {
        if schema.column_type(&predicate.column).is_none() {
            return Err(unknown_column(table, &predicate.column));
        }
        if !schema.is_key_column(&predicate.column) {
            return Err(SessionError::InvalidQuery(format!(
                "cannot restrict non-key column '{}'",
                predicate.column
            )));
        }
    }
    for key_column in &schema.partition_key {
        let matching: Vec<&Predicate> = predicates
            .iter()
            .filter(|p| p.column == *key_column)
            .collect();
        match matching.as_slice() {
            [predicate] if predicate.op == CmpOp::Eq => {}
            [] => {
                return Err(SessionError::InvalidQuery(format!(
                    "partition key column '{}' must be restricted",
                    key_column
                )))
            }
            _ => {
                return Err(SessionError::InvalidQuery(format!(
                    "partition key column '{}' requires a single '=' restriction",
                    key_column
                )))
            }
        }
    }
    Ok(())
}

/// Clustering restrictions form a key prefix: equality on leading columns,
/// optionally one ranged column after them, nothing beyond.
fn check_clustering_restriction(
    schema: &TableSchema,
    predicates: &[Predicate],
    allow_range: bool,
) -> SessionResult<()> {
    let mut past_range = false;
    let mut past_gap = false;
    for key_column in &schema.clustering_key {
        let matching: Vec<&Predicate> = predicates
            .iter()
            .filter(|p| p.column == *key_column)
            .collect();
        if matching.is_empty() {
            past_gap = true;
            continue;
        }
        if past_gap || past_range {
            return Err(SessionError::InvalidQuery(format!(
                "clustering column '{}' can only be restricted after its predecessors",
                key_column
            )));
        }
        if matching.len() == 1 && matching[0].op == CmpOp::Eq {
            continue;
        }
        if !allow_range {
            return Err(SessionError::InvalidQuery(format!(
                "clustering column '{}' requires a single '=' restriction",
                key_column
            )));
        }
        // Range form: at most one lower and one upper bound, no equality.
        let mut lower = 0usize;
        let mut upper = 0usize;
        for predicate in &matching {
            match predicate.op {
                CmpOp::Eq => {
                    return Err(SessionError::InvalidQuery(format!(
                        "clustering column '{}' mixes '=' with a range",
                        key_column
                    )))
                }
                CmpOp::Gt | CmpOp::Ge => lower += 1,
                CmpOp::Lt | CmpOp::Le => upper += 1,
            }
        }
        if lower > 1 || upper > 1 {
            return Err(SessionError::InvalidQuery(format!(
                "clustering column '{}' has conflicting range bounds",
                key_column
            )));
        }
        past_range = true;
    }
    Ok(())
}

/// Equality on every clustering column (row-level UPDATE and DELETE).
fn check_full_clustering_restriction(
    schema: &TableSchema,
    predicates: &[Predicate],
) -> SessionResult<()> {
    for key_column in &schema.clustering_key {
        let matching: Vec<&Predicate> = predicates
            .iter()
            .filter(|p| p.column == *key_column)
            .collect();
        match matching.as_slice() {
            [predicate] if predicate.op == CmpOp::Eq => {}
            _ => {
                return Err(SessionError::InvalidQuery(format!(
                    "clustering key column '{}' requires a single '=' restriction",
                    key_column
                )))
            }
        }
    }
    Ok(())
}

// ==================
// Binding and row assembly
// ==================

/// Check parameter count and types against the schema, in placeholder order.
fn bind<'a, I>(
    schema: &TableSchema,
    columns: I,
    params: &[Value],
    table: &str,
) -> SessionResult<()>
where
    I: Iterator<Item = &'a String>,
{
    let columns: Vec<&String> = columns.collect();
    if columns.len() != params.len() {
        return Err(SessionError::ParameterCount {
            expected: columns.len(),
            got: params.len(),
        });
    }
    for (column, value) in columns.into_iter().zip(params) {
        let Some(column_type) = schema.column_type(column) else {
            return Err(unknown_column(table, column));
        };
        if value.is_null() {
            if schema.is_key_column(column) {
                return Err(SessionError::InvalidQuery(format!(
                    "null value for primary key column '{}'",
                    column
                )));
            }
            continue;
        }
        if !value_matches(value, column_type) {
            return Err(SessionError::TypeMismatch {
                column: column.clone(),
                expected: column_type.name(),
                got: value.type_name(),
            });
        }
    }
    Ok(())
}

fn value_matches(value: &Value, column_type: ColumnType) -> bool {
    matches!(
        (value, column_type),
        (Value::Uuid(_), ColumnType::Uuid)
            | (Value::Text(_), ColumnType::Text)
            | (Value::Timestamp(_), ColumnType::Timestamp)
    )
}

/// Writing a null cell removes it; a read of an absent cell yields null.
fn write_cell(row: &mut Row, column: &str, value: &Value) {
    if value.is_null() {
        row.remove(column);
    } else {
        row.insert(column.to_string(), value.clone());
    }
}

/// Extract key column values (in key order) from named cells. Presence is
/// guaranteed by the statement checks.
fn key_values(key_columns: &[String], cells: &HashMap<&str, &Value>) -> Vec<Value> {
    key_columns
        .iter()
        .map(|column| match cells.get(column.as_str()) {
            Some(value) => (*value).clone(),
            None => Value::Null,
        })
        .collect()
}

/// Predicates paired with their bound parameters.
type PredicatePairs<'a> = Vec<(&'a Predicate, &'a Value)>;

/// Append matching rows of one partition in clustering order, projected to
/// the selected columns.
fn collect_rows(
    partition: &Partition,
    schema: &TableSchema,
    clustering_pairs: &[(&Predicate, &Value)],
    columns: &[String],
    output: &mut Vec<Vec<Value>>,
) {
    let matches = |row: &Row| {
        clustering_pairs.iter().all(|(predicate, bound)| {
            let cell = row.get(&predicate.column).unwrap_or(&Value::Null);
            if cell.is_null() {
                return false;
            }
            match predicate.op {
                CmpOp::Eq => cell == *bound,
                CmpOp::Gt => cell > *bound,
                CmpOp::Ge => cell >= *bound,
                CmpOp::Lt => cell < *bound,
                CmpOp::Le => cell <= *bound,
            }
        })
    };
    let project = |row: &Row| {
        columns
            .iter()
            .map(|column| row.get(column).cloned().unwrap_or(Value::Null))
            .collect::<Vec<Value>>()
    };

    if schema.clustering_desc {
        output.extend(partition.values().rev().filter(|r| matches(r)).map(project));
    } else {
        output.extend(partition.values().filter(|r| matches(r)).map(project));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn test_session() -> MemorySession {
        let cluster = Arc::new(MemoryCluster::new());
        let session = cluster.session("test_ks");
        session.execute_raw("CREATE KEYSPACE test_ks", &[]).unwrap();
        session
            .execute_raw(
                "CREATE TABLE tasks (\
                   id uuid PRIMARY KEY,\
                   title text,\
                   description text,\
                   status text,\
                   created_at timestamp,\
                   updated_at timestamp\
                 )",
                &[],
            )
            .unwrap();
        session
            .execute_raw(
                "CREATE TABLE tasks_by_status (\
                   status text,\
                   created_at timestamp,\
                   id uuid,\
                   title text,\
                   PRIMARY KEY ((status), created_at, id)\
                 ) WITH CLUSTERING ORDER BY (created_at ASC, id ASC)",
                &[],
            )
            .unwrap();
        session
    }

    fn ts(seconds: i64) -> Value {
        Value::timestamp(Utc.timestamp_opt(seconds, 0).unwrap())
    }

    fn insert_task(session: &MemorySession, id: Uuid, title: &str, status: &str, seconds: i64) {
        session
            .execute_raw(
                "INSERT INTO tasks (id, title, description, status, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
                &[
                    Value::Uuid(id),
                    Value::from(title),
                    Value::Null,
                    Value::from(status),
                    ts(seconds),
                    ts(seconds),
                ],
            )
            .unwrap();
    }

    #[test]
    fn test_insert_and_select_by_partition_key() {
        let session = test_session();
        let id = Uuid::new_v4();
        insert_task(&session, id, "write tests", "todo", 100);

        let rows = session
            .execute_raw(
                "SELECT id, title, status FROM tasks WHERE id = ?",
                &[Value::Uuid(id)],
            )
            .unwrap();
        let row = rows.one().expect("row should exist");
        assert_eq!(row[0], Value::Uuid(id));
        assert_eq!(row[1], Value::from("write tests"));
        assert_eq!(row[2], Value::from("todo"));
    }

    #[test]
    fn test_select_missing_row_returns_no_rows() {
        let session = test_session();
        let rows = session
            .execute_raw(
                "SELECT id FROM tasks WHERE id = ?",
                &[Value::Uuid(Uuid::new_v4())],
            )
            .unwrap();
        assert!(rows.is_empty());
        assert!(rows.one().is_none());
    }

    #[test]
    fn test_insert_is_an_upsert_over_cells() {
        let session = test_session();
        let id = Uuid::new_v4();
        insert_task(&session, id, "first", "todo", 100);

        // Second INSERT with the same key overwrites only the given cells.
        session
            .execute_raw(
                "INSERT INTO tasks (id, title) VALUES (?, ?)",
                &[Value::Uuid(id), Value::from("second")],
            )
            .unwrap();

        let rows = session
            .execute_raw(
                "SELECT title, status FROM tasks WHERE id = ?",
                &[Value::Uuid(id)],
            )
            .unwrap();
        let row = rows.one().unwrap();
        assert_eq!(row[0], Value::from("second"));
        assert_eq!(row[1], Value::from("todo"));
    }

    #[test]
    fn test_null_cell_reads_back_as_null() {
        let session = test_session();
        let id = Uuid::new_v4();
        insert_task(&session, id, "no description", "todo", 100);

        let rows = session
            .execute_raw(
                "SELECT description FROM tasks WHERE id = ?",
                &[Value::Uuid(id)],
            )
            .unwrap();
        assert_eq!(rows.one().unwrap()[0], Value::Null);
    }

    #[test]
    fn test_update_overwrites_and_upserts() {
        let session = test_session();
        let id = Uuid::new_v4();
        insert_task(&session, id, "task", "todo", 100);

        session
            .execute_raw(
                "UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?",
                &[Value::from("done"), ts(200), Value::Uuid(id)],
            )
            .unwrap();
        let rows = session
            .execute_raw(
                "SELECT status, updated_at FROM tasks WHERE id = ?",
                &[Value::Uuid(id)],
            )
            .unwrap();
        let row = rows.one().unwrap();
        assert_eq!(row[0], Value::from("done"));
        assert_eq!(row[1], ts(200));

        // Updating an absent key creates the row.
        let other = Uuid::new_v4();
        session
            .execute_raw(
                "UPDATE tasks SET status = ? WHERE id = ?",
                &[Value::from("todo"), Value::Uuid(other)],
            )
            .unwrap();
        let rows = session
            .execute_raw(
                "SELECT id, status FROM tasks WHERE id = ?",
                &[Value::Uuid(other)],
            )
            .unwrap();
        assert_eq!(rows.one().unwrap()[0], Value::Uuid(other));
    }

    #[test]
    fn test_clustering_order_within_partition() {
        let session = test_session();
        let early = Uuid::new_v4();
        let late = Uuid::new_v4();
        for (id, seconds) in [(late, 300), (early, 100)] {
            session
                .execute_raw(
                    "INSERT INTO tasks_by_status (status, created_at, id, title) \
                     VALUES (?, ?, ?, ?)",
                    &[Value::from("todo"), ts(seconds), Value::Uuid(id), Value::from("t")],
                )
                .unwrap();
        }

        let rows = session
            .execute_raw(
                "SELECT created_at, id FROM tasks_by_status WHERE status = ?",
                &[Value::from("todo")],
            )
            .unwrap();
        let collected: Vec<&[Value]> = rows.iter().collect();
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0][0], ts(100));
        assert_eq!(collected[0][1], Value::Uuid(early));
        assert_eq!(collected[1][0], ts(300));
    }

    #[test]
    fn test_clustering_range_scan() {
        let session = test_session();
        for seconds in [100, 200, 300, 400] {
            session
                .execute_raw(
                    "INSERT INTO tasks_by_status (status, created_at, id, title) \
                     VALUES (?, ?, ?, ?)",
                    &[
                        Value::from("todo"),
                        ts(seconds),
                        Value::Uuid(Uuid::new_v4()),
                        Value::from("t"),
                    ],
                )
                .unwrap();
        }

        let rows = session
            .execute_raw(
                "SELECT created_at FROM tasks_by_status \
                 WHERE status = ? AND created_at >= ? AND created_at < ?",
                &[Value::from("todo"), ts(200), ts(400)],
            )
            .unwrap();
        let stamps: Vec<Value> = rows.iter().map(|r| r[0].clone()).collect();
        assert_eq!(stamps, vec![ts(200), ts(300)]);
    }

    #[test]
    fn test_full_scan_without_where() {
        let session = test_session();
        insert_task(&session, Uuid::new_v4(), "a", "todo", 100);
        insert_task(&session, Uuid::new_v4(), "b", "done", 200);

        let rows = session.execute_raw("SELECT id FROM tasks", &[]).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_row_delete_and_partition_delete() {
        let session = test_session();
        let id = Uuid::new_v4();
        session
            .execute_raw(
                "INSERT INTO tasks_by_status (status, created_at, id, title) VALUES (?, ?, ?, ?)",
                &[Value::from("todo"), ts(100), Value::Uuid(id), Value::from("t")],
            )
            .unwrap();

        // Row delete takes the full primary key.
        session
            .execute_raw(
                "DELETE FROM tasks_by_status WHERE status = ? AND created_at = ? AND id = ?",
                &[Value::from("todo"), ts(100), Value::Uuid(id)],
            )
            .unwrap();
        let rows = session
            .execute_raw(
                "SELECT id FROM tasks_by_status WHERE status = ?",
                &[Value::from("todo")],
            )
            .unwrap();
        assert!(rows.is_empty());

        // Partition delete removes every row under the key, and deleting an
        // absent row is a no-op.
        session
            .execute_raw(
                "INSERT INTO tasks_by_status (status, created_at, id, title) VALUES (?, ?, ?, ?)",
                &[Value::from("done"), ts(100), Value::Uuid(id), Value::from("t")],
            )
            .unwrap();
        session
            .execute_raw(
                "DELETE FROM tasks_by_status WHERE status = ?",
                &[Value::from("done")],
            )
            .unwrap();
        session
            .execute_raw(
                "DELETE FROM tasks WHERE id = ?",
                &[Value::Uuid(Uuid::new_v4())],
            )
            .unwrap();
    }

    #[test]
    fn test_partial_partition_restriction_rejected() {
        let session = test_session();
        let err = session
            .execute_raw(
                "SELECT id FROM tasks_by_status WHERE created_at = ?",
                &[ts(100)],
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidQuery(_)));
    }

    #[test]
    fn test_non_key_restriction_rejected() {
        let session = test_session();
        let err = session
            .execute_raw(
                "SELECT id FROM tasks WHERE title = ?",
                &[Value::from("x")],
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidQuery(_)));
    }

    #[test]
    fn test_clustering_gap_rejected() {
        let session = test_session();
        let err = session
            .execute_raw(
                "SELECT id FROM tasks_by_status WHERE status = ? AND id = ?",
                &[Value::from("todo"), Value::Uuid(Uuid::new_v4())],
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidQuery(_)));
    }

    #[test]
    fn test_parameter_count_enforced() {
        let session = test_session();
        let err = session
            .execute_raw("SELECT id FROM tasks WHERE id = ?", &[])
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::ParameterCount {
                expected: 1,
                got: 0
            }
        ));
    }

    #[test]
    fn test_type_mismatch_reported() {
        let session = test_session();
        let err = session
            .execute_raw(
                "SELECT id FROM tasks WHERE id = ?",
                &[Value::from("not-a-uuid")],
            )
            .unwrap_err();
        match err {
            SessionError::TypeMismatch {
                column,
                expected,
                got,
            } => {
                assert_eq!(column, "id");
                assert_eq!(expected, "uuid");
                assert_eq!(got, "text");
            }
            other => panic!("expected TypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_null_primary_key_rejected() {
        let session = test_session();
        let err = session
            .execute_raw("SELECT id FROM tasks WHERE id = ?", &[Value::Null])
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidQuery(_)));
    }

    #[test]
    fn test_unknown_objects_reported() {
        let cluster = Arc::new(MemoryCluster::new());
        let session = cluster.session("nowhere");
        let err = session
            .execute_raw("SELECT id FROM tasks WHERE id = ?", &[Value::Uuid(Uuid::new_v4())])
            .unwrap_err();
        assert!(matches!(err, SessionError::UnknownKeyspace(_)));

        let session = test_session();
        let err = session
            .execute_raw("SELECT id FROM missing WHERE id = ?", &[Value::Uuid(Uuid::new_v4())])
            .unwrap_err();
        assert!(matches!(err, SessionError::UnknownTable(_)));

        let err = session
            .execute_raw(
                "SELECT nope FROM tasks WHERE id = ?",
                &[Value::Uuid(Uuid::new_v4())],
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::UnknownColumn { .. }));
    }

    #[test]
    fn test_prepare_validates_against_schema() {
        let session = test_session();
        assert!(session
            .prepare("SELECT id, title FROM tasks WHERE id = ?")
            .is_ok());
        assert!(session.prepare("SELECT id FROM missing WHERE id = ?").is_err());
        assert!(session
            .prepare("SELECT id FROM tasks WHERE title = ?")
            .is_err());

        let statement = session
            .prepare("INSERT INTO tasks_by_status (status, created_at, id, title) VALUES (?, ?, ?, ?)")
            .unwrap();
        assert_eq!(statement.placeholders(), 4);
        assert!(statement.cql().contains("tasks_by_status"));
    }

    #[test]
    fn test_create_if_not_exists_is_idempotent() {
        let session = test_session();
        session
            .execute_raw("CREATE KEYSPACE IF NOT EXISTS test_ks", &[])
            .unwrap();
        let err = session.execute_raw("CREATE KEYSPACE test_ks", &[]).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyExists(_)));

        session
            .execute_raw("CREATE TABLE IF NOT EXISTS tasks (id uuid PRIMARY KEY)", &[])
            .unwrap();
        let err = session
            .execute_raw("CREATE TABLE tasks (id uuid PRIMARY KEY)", &[])
            .unwrap_err();
        assert!(matches!(err, SessionError::AlreadyExists(_)));
    }

    #[test]
    fn test_sessions_share_cluster_state() {
        let cluster = Arc::new(MemoryCluster::new());
        let writer = cluster.session("shared");
        writer.execute_raw("CREATE KEYSPACE shared", &[]).unwrap();
        writer
            .execute_raw("CREATE TABLE items (id uuid PRIMARY KEY, name text)", &[])
            .unwrap();
        let id = Uuid::new_v4();
        writer
            .execute_raw(
                "INSERT INTO items (id, name) VALUES (?, ?)",
                &[Value::Uuid(id), Value::from("shared row")],
            )
            .unwrap();

        let reader = cluster.session("shared");
        let rows = reader
            .execute_raw("SELECT name FROM items WHERE id = ?", &[Value::Uuid(id)])
            .unwrap();
        assert_eq!(rows.one().unwrap()[0], Value::from("shared row"));
    }

    #[test]
    fn test_update_cannot_assign_key_column() {
        let session = test_session();
        let err = session
            .execute_raw(
                "UPDATE tasks SET id = ? WHERE id = ?",
                &[Value::Uuid(Uuid::new_v4()), Value::Uuid(Uuid::new_v4())],
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidQuery(_)));
    }
}
