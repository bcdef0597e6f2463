//! SQL rendering for the PostgreSQL dialect.

use loadgen_core::{InsertStatement, KeySet, ID_COLUMN};

/// Quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render `INSERT INTO "t" ("c1", ...) VALUES ($1, ...)`.
pub fn render_insert(statement: &InsertStatement) -> String {
    let columns: Vec<String> = statement.columns().map(quote_ident).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(&statement.table),
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// Render a DELETE for a key set. Explicit keys bind as one text array.
pub fn render_delete(table: &str, keys: &KeySet) -> String {
    match keys {
        KeySet::All => format!("DELETE FROM {}", quote_ident(table)),
        KeySet::Keys(_) => format!(
            "DELETE FROM {} WHERE {} = ANY($1)",
            quote_ident(table),
            quote_ident(ID_COLUMN)
        ),
    }
}
