//! SQL rendering for the MySQL dialect.

use loadgen_core::{InsertStatement, KeySet, ID_COLUMN};

/// Quote an identifier with backticks, doubling embedded backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Render ``INSERT INTO `t` (`c1`, ...) VALUES (?, ...)``.
pub fn render_insert(statement: &InsertStatement) -> String {
    let columns: Vec<String> = statement.columns().map(quote_ident).collect();
    let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(&statement.table),
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// Render a DELETE for a key set, or `None` when there is nothing to delete.
pub fn render_delete(table: &str, keys: &KeySet) -> Option<String> {
    match keys {
        KeySet::All => Some(format!("DELETE FROM {}", quote_ident(table))),
        KeySet::Keys(keys) if keys.is_empty() => None,
        KeySet::Keys(keys) => {
            let placeholders: Vec<&str> = keys.iter().map(|_| "?").collect();
            Some(format!(
                "DELETE FROM {} WHERE {} IN ({})",
                quote_ident(table),
                quote_ident(ID_COLUMN),
                placeholders.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadgen_core::Record;

    #[test]
    fn test_render_insert() {
        let record = Record::new("k".to_string(), "t".to_string());
        let sql = render_insert(&InsertStatement::for_record("test", &record));
        assert_eq!(
            sql,
            "INSERT INTO `test` (`id`, `name`, `time`) VALUES (?, ?, ?)"
        );
    }

    #[test]
    fn test_render_delete() {
        assert_eq!(
            render_delete("test", &KeySet::All).unwrap(),
            "DELETE FROM `test`"
        );
        assert_eq!(
            render_delete("test", &KeySet::Keys(vec!["a".into(), "b".into()])).unwrap(),
            "DELETE FROM `test` WHERE `id` IN (?, ?)"
        );
        assert_eq!(render_delete("test", &KeySet::Keys(vec![])), None);
    }
}
