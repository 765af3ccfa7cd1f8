const FENCE: &str = "```";

/// Trim model output down to bare SQL.
///
/// When the reply contains a markdown fence, the body of the first fenced
/// block is returned and any prose around it is dropped. Otherwise the reply
/// is returned trimmed and unchanged.
pub fn extract_sql(response: &str) -> String {
    let response = response.trim();

    let Some(open) = response.find(FENCE) else {
        return response.to_string();
    };
    let after_open = &response[open + FENCE.len()..];
    let block = match after_open.find(FENCE) {
        Some(close) => &after_open[..close],
        None => after_open,
    };

    strip_info_string(block).trim().to_string()
}

/// Drop a language tag (`sql`, `postgresql`, ...) sitting on the fence line.
fn strip_info_string(block: &str) -> &str {
    let Some((first, rest)) = block.split_once('\n') else {
        return block;
    };
    let first = first.trim();
    if first.is_empty() || first.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        rest
    } else {
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_sql_is_trimmed() {
        assert_eq!(extract_sql("  SELECT 1;\n"), "SELECT 1;");
    }

    #[test]
    fn fenced_with_language_tag() {
        let response = "```sql\nSELECT name\nFROM users\nORDER BY name;\n```";
        assert_eq!(extract_sql(response), "SELECT name\nFROM users\nORDER BY name;");
    }

    #[test]
    fn fenced_without_language_tag() {
        assert_eq!(extract_sql("```\nSELECT 1\n```\n"), "SELECT 1");
    }

    #[test]
    fn unterminated_fence() {
        assert_eq!(extract_sql("```sql\nSELECT 1"), "SELECT 1");
    }

    #[test]
    fn prose_around_fenced_block_is_dropped() {
        let response = "Here is the query:\n```sql\nSELECT COUNT(*) FROM users;\n```\nIt counts every row.";
        assert_eq!(extract_sql(response), "SELECT COUNT(*) FROM users;");
    }

    #[test]
    fn only_first_fenced_block_is_used() {
        let response = "```sql\nSELECT 1;\n```\nor alternatively\n```sql\nSELECT 2;\n```";
        assert_eq!(extract_sql(response), "SELECT 1;");
    }

    #[test]
    fn inline_fence_keeps_single_line_query() {
        assert_eq!(extract_sql("Use ```SELECT 1``` here"), "SELECT 1");
    }

    #[test]
    fn first_line_with_sql_is_not_an_info_string() {
        assert_eq!(extract_sql("```SELECT id\nFROM users```"), "SELECT id\nFROM users");
    }

    #[test]
    fn empty_fence_is_empty() {
        assert_eq!(extract_sql("```sql\n```"), "");
        assert_eq!(extract_sql("   "), "");
    }
}
