//! Section markers and idempotency rewriting for rendered DDL.

/// Comment prefix opening every generated section.
pub const SQL_START_PATTERN: &str = "-- start";
/// Comment prefix closing every generated section.
pub const SQL_END_PATTERN: &str = "-- end";

/// Controls how DDL text is rewritten before emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Rewrite leading `CREATE SEQUENCE` / `CREATE TABLE` keywords with an
    /// `IF NOT EXISTS` guard so the script replays against a non-empty target.
    pub add_if_not_exists: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            add_if_not_exists: true,
        }
    }
}

/// Inserts an existence guard after a leading `CREATE SEQUENCE` or
/// `CREATE TABLE`.
///
/// The input is trimmed first. Text that already carries a guard, or that
/// starts with anything else, passes through unchanged, so applying the
/// rewrite twice never doubles the guard.
pub fn add_if_not_exists(sql: &str) -> String {
    let trimmed = sql.trim();
    for prefix in ["CREATE SEQUENCE", "CREATE TABLE"] {
        let Some(rest) = trimmed.strip_prefix(prefix) else {
            continue;
        };
        // Reject keyword prefixes of longer words, e.g. CREATE TABLESPACE.
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            continue;
        }
        if rest.trim_start().starts_with("IF NOT EXISTS") {
            break;
        }
        return format!("{prefix} IF NOT EXISTS{rest}");
    }
    trimmed.to_string()
}

/// Wraps one object's rendered DDL in start and end marker comments.
///
/// `label` names the section kind (`sequence dump` or `table dump`) and
/// `name` the object, matching the marker convention of the data sections.
pub fn ddl_block(label: &str, name: &str, body: &str) -> String {
    let mut section = String::new();
    section.push_str("\n\n--\n");
    section.push_str(&format!("{SQL_START_PATTERN}  {label} : {name}\n"));
    section.push_str("--\n\n");
    section.push_str(body);
    section.push_str("\n\n--\n");
    section.push_str(&format!("{SQL_END_PATTERN}  {label} : {name}\n"));
    section.push_str("--\n\n");
    section
}
