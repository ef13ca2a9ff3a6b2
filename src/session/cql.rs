//! Parser for the CQL subset the service issues.
//!
//! Covers exactly what the repositories and the migration runner need:
//! keyspace/table DDL, and single-table INSERT / SELECT / UPDATE / DELETE
//! with `?` placeholders. Values never appear inline; every bound term is a
//! placeholder, which keeps the grammar small and the statements cacheable.

use super::errors::{SessionError, SessionResult};

/// Column types supported by the table schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnType {
    Uuid,
    Text,
    Timestamp,
}

impl ColumnType {
    fn parse(word: &str) -> SessionResult<Self> {
        match word {
            "uuid" => Ok(ColumnType::Uuid),
            "text" | "varchar" => Ok(ColumnType::Text),
            "timestamp" => Ok(ColumnType::Timestamp),
            other => Err(SessionError::Unsupported(format!(
                "column type '{}'",
                other
            ))),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            ColumnType::Uuid => "uuid",
            ColumnType::Text => "text",
            ColumnType::Timestamp => "timestamp",
        }
    }
}

/// Table reference, optionally keyspace-qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TableRef {
    pub keyspace: Option<String>,
    pub table: String,
}

/// Comparison operator in a WHERE predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

/// A `column <op> ?` predicate. The right-hand side is always a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Predicate {
    pub column: String,
    pub op: CmpOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CreateKeyspace {
    pub name: String,
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CreateTable {
    pub table: TableRef,
    pub if_not_exists: bool,
    /// Columns in declaration order.
    pub columns: Vec<(String, ColumnType)>,
    pub partition_key: Vec<String>,
    pub clustering_key: Vec<String>,
    /// True when CLUSTERING ORDER BY declares descending order. Directions
    /// must be uniform across the clustering key.
    pub clustering_desc: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Insert {
    pub table: TableRef,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Select {
    pub table: TableRef,
    pub columns: Vec<String>,
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Update {
    pub table: TableRef,
    /// SET column names, in statement order.
    pub assignments: Vec<String>,
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Delete {
    pub table: TableRef,
    pub predicates: Vec<Predicate>,
}

/// A parsed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CqlStatement {
    CreateKeyspace(CreateKeyspace),
    CreateTable(CreateTable),
    Insert(Insert),
    Select(Select),
    Update(Update),
    Delete(Delete),
}

impl CqlStatement {
    /// Number of `?` placeholders; bind parameters must match exactly.
    ///
    /// Binding order follows the statement text: INSERT binds in column-list
    /// order, UPDATE binds SET assignments then WHERE predicates, SELECT and
    /// DELETE bind WHERE predicates left to right.
    pub(crate) fn placeholders(&self) -> usize {
        match self {
            CqlStatement::CreateKeyspace(_) | CqlStatement::CreateTable(_) => 0,
            CqlStatement::Insert(s) => s.columns.len(),
            CqlStatement::Select(s) => s.predicates.len(),
            CqlStatement::Update(s) => s.assignments.len() + s.predicates.len(),
            CqlStatement::Delete(s) => s.predicates.len(),
        }
    }
}

/// Parse a single statement (a trailing `;` is tolerated).
pub(crate) fn parse(cql: &str) -> SessionResult<CqlStatement> {
    let tokens = tokenize(cql)?;
    let mut cursor = Cursor::new(tokens);

    let statement = match cursor.peek_word() {
        Some("create") => {
            cursor.advance();
            match cursor.peek_word() {
                Some("keyspace") => {
                    cursor.advance();
                    parse_create_keyspace(&mut cursor)?
                }
                Some("table") => {
                    cursor.advance();
                    parse_create_table(&mut cursor)?
                }
                _ => {
                    return Err(SessionError::Unsupported(
                        "only CREATE KEYSPACE and CREATE TABLE are supported".to_string(),
                    ))
                }
            }
        }
        Some("insert") => {
            cursor.advance();
            parse_insert(&mut cursor)?
        }
        Some("select") => {
            cursor.advance();
            parse_select(&mut cursor)?
        }
        Some("update") => {
            cursor.advance();
            parse_update(&mut cursor)?
        }
        Some("delete") => {
            cursor.advance();
            parse_delete(&mut cursor)?
        }
        Some(other) => {
            return Err(SessionError::Unsupported(format!(
                "statement '{}'",
                other.to_uppercase()
            )))
        }
        None => return Err(SessionError::Syntax("empty statement".to_string())),
    };

    cursor.expect_end()?;
    Ok(statement)
}

fn parse_create_keyspace(cursor: &mut Cursor) -> SessionResult<CqlStatement> {
    let if_not_exists = cursor.eat_if_not_exists()?;
    let name = cursor.expect_identifier("keyspace name")?;

    // Replication options are meaningless to the embedded engine; accept and
    // discard everything after WITH.
    if cursor.eat_word("with") {
        cursor.skip_to_end();
    }

    Ok(CqlStatement::CreateKeyspace(CreateKeyspace {
        name,
        if_not_exists,
    }))
}

fn parse_create_table(cursor: &mut Cursor) -> SessionResult<CqlStatement> {
    let if_not_exists = cursor.eat_if_not_exists()?;
    let table = parse_table_ref(cursor)?;

    cursor.expect_symbol('(')?;

    let mut columns: Vec<(String, ColumnType)> = Vec::new();
    let mut partition_key: Vec<String> = Vec::new();
    let mut clustering_key: Vec<String> = Vec::new();
    let mut saw_key_clause = false;

    loop {
        if cursor.peek_word() == Some("primary") {
            cursor.advance();
            cursor.expect_word("key")?;
            if saw_key_clause {
                return Err(SessionError::Syntax(
                    "duplicate PRIMARY KEY clause".to_string(),
                ));
            }
            saw_key_clause = true;
            let (pk, ck) = parse_primary_key(cursor)?;
            partition_key = pk;
            clustering_key = ck;
        } else {
            let name = cursor.expect_identifier("column name")?;
            let type_word = cursor.expect_identifier("column type")?;
            let column_type = ColumnType::parse(&type_word)?;
            if columns.iter().any(|(existing, _)| *existing == name) {
                return Err(SessionError::Syntax(format!(
                    "duplicate column '{}'",
                    name
                )));
            }
            columns.push((name.clone(), column_type));

            // Inline form: `id uuid PRIMARY KEY`
            if cursor.peek_word() == Some("primary") {
                cursor.advance();
                cursor.expect_word("key")?;
                if saw_key_clause {
                    return Err(SessionError::Syntax(
                        "duplicate PRIMARY KEY clause".to_string(),
                    ));
                }
                saw_key_clause = true;
                partition_key = vec![name];
            }
        }

        if cursor.eat_symbol(',') {
            continue;
        }
        cursor.expect_symbol(')')?;
        break;
    }

    if !saw_key_clause {
        return Err(SessionError::Syntax(
            "CREATE TABLE requires a PRIMARY KEY".to_string(),
        ));
    }
    for key_column in partition_key.iter().chain(clustering_key.iter()) {
        if !columns.iter().any(|(name, _)| name == key_column) {
            return Err(SessionError::Syntax(format!(
                "primary key column '{}' is not declared",
                key_column
            )));
        }
    }

    let clustering_desc = parse_table_options(cursor, &clustering_key)?;

    Ok(CqlStatement::CreateTable(CreateTable {
        table,
        if_not_exists,
        columns,
        partition_key,
        clustering_key,
        clustering_desc,
    }))
}

/// Parse the parenthesized PRIMARY KEY definition. Returns
/// (partition key columns, clustering key columns).
fn parse_primary_key(cursor: &mut Cursor) -> SessionResult<(Vec<String>, Vec<String>)> {
    cursor.expect_symbol('(')?;

    let partition_key = if cursor.eat_symbol('(') {
        // Composite partition key: ((a, b), c, ...)
        let mut parts = vec![cursor.expect_identifier("partition key column")?];
        while cursor.eat_symbol(',') {
            parts.push(cursor.expect_identifier("partition key column")?);
        }
        cursor.expect_symbol(')')?;
        parts
    } else {
        vec![cursor.expect_identifier("partition key column")?]
    };

    let mut clustering_key = Vec::new();
    while cursor.eat_symbol(',') {
        clustering_key.push(cursor.expect_identifier("clustering key column")?);
    }
    cursor.expect_symbol(')')?;

    Ok((partition_key, clustering_key))
}

/// Parse the optional WITH clause. Only CLUSTERING ORDER BY is honored; the
/// declared directions must be uniform.
fn parse_table_options(cursor: &mut Cursor, clustering_key: &[String]) -> SessionResult<bool> {
    if !cursor.eat_word("with") {
        return Ok(false);
    }
    cursor.expect_word("clustering")?;
    cursor.expect_word("order")?;
    cursor.expect_word("by")?;
    cursor.expect_symbol('(')?;

    let mut descending: Option<bool> = None;
    loop {
        let column = cursor.expect_identifier("clustering order column")?;
        if !clustering_key.contains(&column) {
            return Err(SessionError::Syntax(format!(
                "'{}' is not a clustering column",
                column
            )));
        }
        let direction = match cursor.next_word() {
            Some(word) if word == "asc" => false,
            Some(word) if word == "desc" => true,
            _ => {
                return Err(SessionError::Syntax(
                    "expected ASC or DESC in CLUSTERING ORDER BY".to_string(),
                ))
            }
        };
        match descending {
            None => descending = Some(direction),
            Some(previous) if previous != direction => {
                return Err(SessionError::Unsupported(
                    "mixed clustering order directions".to_string(),
                ))
            }
            Some(_) => {}
        }

        if cursor.eat_symbol(',') {
            continue;
        }
        cursor.expect_symbol(')')?;
        break;
    }

    Ok(descending.unwrap_or(false))
}

fn parse_insert(cursor: &mut Cursor) -> SessionResult<CqlStatement> {
    cursor.expect_word("into")?;
    let table = parse_table_ref(cursor)?;

    cursor.expect_symbol('(')?;
    let mut columns = vec![cursor.expect_identifier("column name")?];
    while cursor.eat_symbol(',') {
        columns.push(cursor.expect_identifier("column name")?);
    }
    cursor.expect_symbol(')')?;

    let mut seen = std::collections::HashSet::new();
    for column in &columns {
        if !seen.insert(column.as_str()) {
            return Err(SessionError::InvalidQuery(format!(
                "column '{}' listed twice in INSERT",
                column
            )));
        }
    }

    cursor.expect_word("values")?;
    cursor.expect_symbol('(')?;
    let mut placeholders = 0usize;
    loop {
        cursor.expect_placeholder()?;
        placeholders += 1;
        if cursor.eat_symbol(',') {
            continue;
        }
        cursor.expect_symbol(')')?;
        break;
    }

    if placeholders != columns.len() {
        return Err(SessionError::Syntax(format!(
            "INSERT lists {} columns but {} values",
            columns.len(),
            placeholders
        )));
    }

    Ok(CqlStatement::Insert(Insert { table, columns }))
}

fn parse_select(cursor: &mut Cursor) -> SessionResult<CqlStatement> {
    let mut columns = vec![cursor.expect_identifier("column name")?];
    while cursor.eat_symbol(',') {
        columns.push(cursor.expect_identifier("column name")?);
    }

    cursor.expect_word("from")?;
    let table = parse_table_ref(cursor)?;
    let predicates = parse_where(cursor)?;

    Ok(CqlStatement::Select(Select {
        table,
        columns,
        predicates,
    }))
}

fn parse_update(cursor: &mut Cursor) -> SessionResult<CqlStatement> {
    let table = parse_table_ref(cursor)?;
    cursor.expect_word("set")?;

    let mut assignments = Vec::new();
    loop {
        let column = cursor.expect_identifier("column name")?;
        cursor.expect_symbol('=')?;
        cursor.expect_placeholder()?;
        assignments.push(column);
        if !cursor.eat_symbol(',') {
            break;
        }
    }

    let predicates = parse_where(cursor)?;
    if predicates.is_empty() {
        return Err(SessionError::Syntax("UPDATE requires WHERE".to_string()));
    }

    Ok(CqlStatement::Update(Update {
        table,
        assignments,
        predicates,
    }))
}

fn parse_delete(cursor: &mut Cursor) -> SessionResult<CqlStatement> {
    cursor.expect_word("from")?;
    let table = parse_table_ref(cursor)?;

    let predicates = parse_where(cursor)?;
    if predicates.is_empty() {
        return Err(SessionError::Syntax("DELETE requires WHERE".to_string()));
    }

    Ok(CqlStatement::Delete(Delete { table, predicates }))
}

/// Parse an optional `WHERE col op ? [AND ...]` clause.
fn parse_where(cursor: &mut Cursor) -> SessionResult<Vec<Predicate>> {
    if !cursor.eat_word("where") {
        return Ok(Vec::new());
    }

    let mut predicates = Vec::new();
    loop {
        let column = cursor.expect_identifier("column name")?;
        let op = cursor.expect_comparison()?;
        cursor.expect_placeholder()?;
        predicates.push(Predicate { column, op });
        if !cursor.eat_word("and") {
            break;
        }
    }
    Ok(predicates)
}

fn parse_table_ref(cursor: &mut Cursor) -> SessionResult<TableRef> {
    let first = cursor.expect_identifier("table name")?;
    if cursor.eat_symbol('.') {
        let table = cursor.expect_identifier("table name")?;
        Ok(TableRef {
            keyspace: Some(first),
            table,
        })
    } else {
        Ok(TableRef {
            keyspace: None,
            table: first,
        })
    }
}

// ==================
// Tokenizer
// ==================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Keyword or identifier, lowercased (unquoted CQL identifiers are
    /// case-insensitive).
    Word(String),
    /// Single-quoted string literal (only appears in ignored option clauses).
    Literal(String),
    Placeholder,
    Symbol(char),
}

fn tokenize(cql: &str) -> SessionResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = cql.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '-' {
            chars.next();
            if chars.peek() == Some(&'-') {
                // Line comment: skip to end of line.
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            } else {
                return Err(SessionError::Syntax("unexpected '-'".to_string()));
            }
        } else if c == '\'' {
            chars.next();
            let mut literal = String::new();
            let mut closed = false;
            for next in chars.by_ref() {
                if next == '\'' {
                    closed = true;
                    break;
                }
                literal.push(next);
            }
            if !closed {
                return Err(SessionError::Syntax("unterminated string".to_string()));
            }
            tokens.push(Token::Literal(literal));
        } else if c == '?' {
            chars.next();
            tokens.push(Token::Placeholder);
        } else if c.is_alphanumeric() || c == '_' {
            let mut word = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_alphanumeric() || next == '_' {
                    word.push(next.to_ascii_lowercase());
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Word(word));
        } else {
            chars.next();
            tokens.push(Token::Symbol(c));
        }
    }

    Ok(tokens)
}

// ==================
// Token cursor
// ==================

struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
}

impl Cursor {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_word(&self) -> Option<&str> {
        match self.peek() {
            Some(Token::Word(w)) => Some(w.as_str()),
            _ => None,
        }
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn next_word(&mut self) -> Option<String> {
        match self.peek() {
            Some(Token::Word(w)) => {
                let word = w.clone();
                self.advance();
                Some(word)
            }
            _ => None,
        }
    }

    /// Consume the given keyword if it is next.
    fn eat_word(&mut self, keyword: &str) -> bool {
        if self.peek_word() == Some(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_word(&mut self, keyword: &str) -> SessionResult<()> {
        if self.eat_word(keyword) {
            Ok(())
        } else {
            Err(SessionError::Syntax(format!(
                "expected '{}'",
                keyword.to_uppercase()
            )))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> SessionResult<String> {
        self.next_word()
            .ok_or_else(|| SessionError::Syntax(format!("expected {}", what)))
    }

    fn eat_symbol(&mut self, symbol: char) -> bool {
        if self.peek() == Some(&Token::Symbol(symbol)) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, symbol: char) -> SessionResult<()> {
        if self.eat_symbol(symbol) {
            Ok(())
        } else {
            Err(SessionError::Syntax(format!("expected '{}'", symbol)))
        }
    }

    fn expect_placeholder(&mut self) -> SessionResult<()> {
        if self.peek() == Some(&Token::Placeholder) {
            self.advance();
            Ok(())
        } else {
            Err(SessionError::Syntax(
                "expected '?' placeholder (inline values are not supported)".to_string(),
            ))
        }
    }

    fn expect_comparison(&mut self) -> SessionResult<CmpOp> {
        let op = if self.eat_symbol('=') {
            CmpOp::Eq
        } else if self.eat_symbol('>') {
            if self.eat_symbol('=') {
                CmpOp::Ge
            } else {
                CmpOp::Gt
            }
        } else if self.eat_symbol('<') {
            if self.eat_symbol('=') {
                CmpOp::Le
            } else {
                CmpOp::Lt
            }
        } else {
            return Err(SessionError::Syntax(
                "expected comparison operator".to_string(),
            ));
        };
        Ok(op)
    }

    fn skip_to_end(&mut self) {
        self.pos = self.tokens.len();
    }

    /// Parse an optional IF NOT EXISTS qualifier.
    fn eat_if_not_exists(&mut self) -> SessionResult<bool> {
        if self.eat_word("if") {
            self.expect_word("not")?;
            self.expect_word("exists")?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// All tokens must be consumed (a trailing semicolon is tolerated).
    fn expect_end(&mut self) -> SessionResult<()> {
        self.eat_symbol(';');
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(SessionError::Syntax(
                "unexpected trailing input".to_string(),
            )),
        }
    }
}
