//! Column name de-duplication.

use std::collections::HashMap;

/// Placeholder used for empty column names.
pub const EMPTY_COLUMN_NAME: &str = "column";

/// Makes every column name unique, keeping the first occurrence of each name
/// and suffixing later occurrences with `_1`, `_2`, ...
///
/// Names are compared case-insensitively, since `DuckDB` identifiers are,
/// and an empty name is replaced by [`EMPTY_COLUMN_NAME`]. Generated names
/// are themselves reserved, so a later literal column with the same name is
/// pushed further along (`["a", "a", "a_1"]` becomes `["a", "a_1", "a_1_1"]`).
#[must_use]
pub fn make_column_names_unique(columns: &[String]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut unique = Vec::with_capacity(columns.len());

    for col in columns {
        let col = if col.is_empty() {
            EMPTY_COLUMN_NAME
        } else {
            col.as_str()
        };
        let key = col.to_lowercase();

        let Some(&next) = seen.get(&key) else {
            seen.insert(key, 1);
            unique.push(col.to_string());
            continue;
        };

        let mut suffix = next;
        let mut candidate = format!("{col}_{suffix}");
        while seen.contains_key(&candidate.to_lowercase()) {
            suffix += 1;
            candidate = format!("{col}_{suffix}");
        }

        seen.insert(key, suffix + 1);
        seen.insert(candidate.to_lowercase(), 1);
        unique.push(candidate);
    }

    unique
}
