//! Rendering shared by the backends' `table_info`.

/// Sample values longer than this are cut.
pub const MAX_VALUE_CHARS: usize = 100;

/// Double-quote an identifier, escaping embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Split a comma-separated list of table names, dropping blanks.
pub fn parse_table_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Names in `requested` that are absent from `known`, in request order.
pub fn missing_tables(requested: &[String], known: &[String]) -> Vec<String> {
    requested
        .iter()
        .filter(|t| !known.contains(t))
        .cloned()
        .collect()
}

pub fn truncate_value(value: String) -> String {
    if value.chars().count() <= MAX_VALUE_CHARS {
        value
    } else {
        value.chars().take(MAX_VALUE_CHARS).collect()
    }
}

/// ```text
/// /*
/// 3 rows from users table:
/// id	name
/// 1	Alice
/// */
/// ```
pub fn sample_block(table: &str, sample_rows: usize, columns: &[String], rows: &[Vec<String>]) -> String {
    let mut out = format!("/*\n{sample_rows} rows from {table} table:\n{}", columns.join("\t"));
    for row in rows {
        out.push('\n');
        out.push_str(&row.join("\t"));
    }
    out.push_str("\n*/");
    out
}

/// One table's section: the definition, then samples when enabled.
pub fn table_section(create_sql: &str, sample: Option<String>) -> String {
    match sample {
        Some(block) => format!("{}\n\n{}", create_sql.trim(), block),
        None => create_sql.trim().to_string(),
    }
}
