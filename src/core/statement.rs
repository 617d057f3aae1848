//! Statement descriptions accepted by the handle
//!
//! A [`Statement`] is anything that can describe itself as SQL text and say what
//! kind of statement it is. The handle only needs to tell transaction-control
//! statements apart from everything else; the remaining kinds exist for callers
//! and for logging.

use std::borrow::Cow;

/// Kind of a statement, derived from its leading keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementType {
    /// SELECT / WITH queries
    Select,
    /// INSERT / REPLACE
    Insert,
    /// UPDATE
    Update,
    /// DELETE
    Delete,
    /// CREATE TABLE / INDEX / VIEW / TRIGGER
    Create,
    /// DROP
    Drop,
    /// PRAGMA
    Pragma,
    /// BEGIN / COMMIT / END / ROLLBACK
    Transaction,
    /// Anything else
    Other,
}

/// Sub-type of a transaction-control statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionType {
    /// BEGIN
    Begin,
    /// COMMIT / END
    Commit,
    /// ROLLBACK
    Rollback,
}

/// Locking mode of a BEGIN statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransactionMode {
    /// BEGIN DEFERRED
    #[default]
    Deferred,
    /// BEGIN IMMEDIATE
    Immediate,
    /// BEGIN EXCLUSIVE
    Exclusive,
}

impl TransactionMode {
    fn as_sql(&self) -> &'static str {
        match self {
            TransactionMode::Deferred => "BEGIN DEFERRED",
            TransactionMode::Immediate => "BEGIN IMMEDIATE",
            TransactionMode::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}

/// A statement the handle can prepare or execute
pub trait Statement {
    /// Kind of this statement
    fn statement_type(&self) -> StatementType;

    /// The literal SQL text to compile or execute
    fn description(&self) -> Cow<'_, str>;

    /// Begin/Commit/Rollback for transaction-control statements
    fn transaction_type(&self) -> Option<TransactionType> {
        None
    }
}

/// Raw SQL text, classified by its leading keyword
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sql {
    text: String,
    statement_type: StatementType,
    transaction_type: Option<TransactionType>,
}

impl Sql {
    /// Wrap SQL text
    pub fn new<S: Into<String>>(text: S) -> Self {
        let text = text.into();
        let (statement_type, transaction_type) = classify(&text);
        Self {
            text,
            statement_type,
            transaction_type,
        }
    }

    /// The wrapped SQL text
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Statement for Sql {
    fn statement_type(&self) -> StatementType {
        self.statement_type
    }

    fn description(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.text)
    }

    fn transaction_type(&self) -> Option<TransactionType> {
        self.transaction_type
    }
}

impl Statement for str {
    fn statement_type(&self) -> StatementType {
        classify(self).0
    }

    fn description(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }

    fn transaction_type(&self) -> Option<TransactionType> {
        classify(self).1
    }
}

impl Statement for String {
    fn statement_type(&self) -> StatementType {
        self.as_str().statement_type()
    }

    fn description(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }

    fn transaction_type(&self) -> Option<TransactionType> {
        self.as_str().transaction_type()
    }
}

/// BEGIN, COMMIT or ROLLBACK
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementTransaction {
    transaction_type: TransactionType,
    mode: Option<TransactionMode>,
}

impl StatementTransaction {
    /// Plain `BEGIN`
    pub fn begin() -> Self {
        Self {
            transaction_type: TransactionType::Begin,
            mode: None,
        }
    }

    /// `BEGIN` with an explicit locking mode
    pub fn begin_with(mode: TransactionMode) -> Self {
        Self {
            transaction_type: TransactionType::Begin,
            mode: Some(mode),
        }
    }

    /// `COMMIT`
    pub fn commit() -> Self {
        Self {
            transaction_type: TransactionType::Commit,
            mode: None,
        }
    }

    /// `ROLLBACK`
    pub fn rollback() -> Self {
        Self {
            transaction_type: TransactionType::Rollback,
            mode: None,
        }
    }

    fn as_sql(&self) -> &'static str {
        match (self.transaction_type, self.mode) {
            (TransactionType::Begin, Some(mode)) => mode.as_sql(),
            (TransactionType::Begin, None) => "BEGIN",
            (TransactionType::Commit, _) => "COMMIT",
            (TransactionType::Rollback, _) => "ROLLBACK",
        }
    }
}

impl Statement for StatementTransaction {
    fn statement_type(&self) -> StatementType {
        StatementType::Transaction
    }

    fn description(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_sql())
    }

    fn transaction_type(&self) -> Option<TransactionType> {
        Some(self.transaction_type)
    }
}

/// Skip whitespace and SQL comments at the start of `sql`
fn skip_leading_trivia(mut sql: &str) -> &str {
    loop {
        sql = sql.trim_start();
        if let Some(rest) = sql.strip_prefix("--") {
            sql = rest.find('\n').map_or("", |end| &rest[end + 1..]);
        } else if let Some(rest) = sql.strip_prefix("/*") {
            sql = rest.find("*/").map_or("", |end| &rest[end + 2..]);
        } else {
            return sql;
        }
    }
}

/// Split `sql` into its words, skipping whitespace and comments.
///
/// Returns `None` unless the text is bare words, optionally ended by one `;`
/// with only whitespace or comments after it.
fn bare_words(sql: &str) -> Option<Vec<&str>> {
    let mut words = Vec::new();
    let mut rest = skip_leading_trivia(sql);
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix(';') {
            return skip_leading_trivia(after).is_empty().then_some(words);
        }
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if end == 0 {
            return None;
        }
        words.push(&rest[..end]);
        rest = skip_leading_trivia(&rest[end..]);
    }
    Some(words)
}

/// Classify SQL text by its leading keyword.
///
/// Text is only a transaction statement when it is a single bare
/// `BEGIN`/`COMMIT`/`END`/`ROLLBACK` (keywords only, optional trailing `;`,
/// comments anywhere).
/// `ROLLBACK TO` a savepoint does not end the transaction and is `Other`.
pub fn classify(sql: &str) -> (StatementType, Option<TransactionType>) {
    let body = skip_leading_trivia(sql);
    let keyword_end = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(body.len());
    let keyword = body[..keyword_end].to_ascii_uppercase();

    let statement_type = match keyword.as_str() {
        "SELECT" | "WITH" | "VALUES" => StatementType::Select,
        "INSERT" | "REPLACE" => StatementType::Insert,
        "UPDATE" => StatementType::Update,
        "DELETE" => StatementType::Delete,
        "CREATE" => StatementType::Create,
        "DROP" => StatementType::Drop,
        "PRAGMA" => StatementType::Pragma,
        "BEGIN" | "COMMIT" | "END" | "ROLLBACK" => StatementType::Transaction,
        _ => StatementType::Other,
    };
    if statement_type != StatementType::Transaction {
        return (statement_type, None);
    }

    match bare_words(body) {
        Some(words) if !words.iter().any(|word| word.eq_ignore_ascii_case("TO")) => {}
        _ => return (StatementType::Other, None),
    }

    let transaction_type = match keyword.as_str() {
        "BEGIN" => TransactionType::Begin,
        "ROLLBACK" => TransactionType::Rollback,
        _ => TransactionType::Commit,
    };
    (StatementType::Transaction, Some(transaction_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_basic() {
        assert_eq!(classify("SELECT 1").0, StatementType::Select);
        assert_eq!(classify("  insert into t values (1)").0, StatementType::Insert);
        assert_eq!(classify("UPDATE t SET a = 1").0, StatementType::Update);
        assert_eq!(classify("DELETE FROM t").0, StatementType::Delete);
        assert_eq!(classify("CREATE TABLE t (a)").0, StatementType::Create);
        assert_eq!(classify("PRAGMA journal_mode").0, StatementType::Pragma);
        assert_eq!(classify("VACUUM").0, StatementType::Other);
        assert_eq!(classify("").0, StatementType::Other);
    }

    #[test]
    fn test_classify_transactions() {
        assert_eq!(
            classify("BEGIN"),
            (StatementType::Transaction, Some(TransactionType::Begin))
        );
        assert_eq!(
            classify("begin immediate transaction;"),
            (StatementType::Transaction, Some(TransactionType::Begin))
        );
        assert_eq!(
            classify("END TRANSACTION"),
            (StatementType::Transaction, Some(TransactionType::Commit))
        );
        assert_eq!(
            classify("-- done\nCOMMIT;"),
            (StatementType::Transaction, Some(TransactionType::Commit))
        );
        assert_eq!(
            classify("/* undo */ ROLLBACK"),
            (StatementType::Transaction, Some(TransactionType::Rollback))
        );
    }

    #[test]
    fn test_classify_non_transactions() {
        assert_eq!(classify("ROLLBACK TO sp1"), (StatementType::Other, None));
        assert_eq!(
            classify("BEGIN; INSERT INTO t VALUES (1); COMMIT;"),
            (StatementType::Other, None)
        );
        assert_eq!(classify("SAVEPOINT sp1"), (StatementType::Other, None));
        assert_eq!(classify("COMMIT; COMMIT"), (StatementType::Other, None));
        assert_eq!(classify("ROLLBACK /* x */ TO sp1"), (StatementType::Other, None));
    }

    #[test]
    fn test_classify_trailing_comments() {
        assert_eq!(
            classify("COMMIT; -- done"),
            (StatementType::Transaction, Some(TransactionType::Commit))
        );
        assert_eq!(
            classify("BEGIN IMMEDIATE /* writer */;\n"),
            (StatementType::Transaction, Some(TransactionType::Begin))
        );
        assert_eq!(
            classify("ROLLBACK -- undo\n-- again"),
            (StatementType::Transaction, Some(TransactionType::Rollback))
        );
    }

    #[test]
    fn test_statement_transaction_sql() {
        assert_eq!(StatementTransaction::begin().description(), "BEGIN");
        assert_eq!(
            StatementTransaction::begin_with(TransactionMode::Immediate).description(),
            "BEGIN IMMEDIATE"
        );
        assert_eq!(StatementTransaction::commit().description(), "COMMIT");
        assert_eq!(StatementTransaction::rollback().description(), "ROLLBACK");
        assert_eq!(
            StatementTransaction::rollback().transaction_type(),
            Some(TransactionType::Rollback)
        );
    }

    #[test]
    fn test_sql_and_str_agree() {
        let sql = Sql::new("COMMIT");
        assert_eq!(sql.statement_type(), "COMMIT".statement_type());
        assert_eq!(sql.transaction_type(), Some(TransactionType::Commit));
        assert_eq!(sql.as_str(), "COMMIT");
        assert_eq!(String::from("SELECT 1").statement_type(), StatementType::Select);
    }
}
