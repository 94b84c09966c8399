//! Input record layouts
//!
//! Raw JSON is read with an explicit column list so that absent fields come
//! back as NULL and records the engine cannot parse are skipped, rather than
//! the schema drifting with whatever the first files contain.

use crate::session::quote_literal;

/// A named, typed column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: &'static str,
}

const fn col(name: &'static str, sql_type: &'static str) -> ColumnDef {
    ColumnDef { name, sql_type }
}

/// Fields of a catalog-entry record
pub const CATALOG_SOURCE: &[ColumnDef] = &[
    col("id", "VARCHAR"),
    col("title", "VARCHAR"),
    col("parent_id", "VARCHAR"),
    col("parent_name", "VARCHAR"),
    col("parent_location", "VARCHAR"),
    col("parent_lat", "DOUBLE"),
    col("parent_long", "DOUBLE"),
    col("year", "BIGINT"),
    col("duration", "DOUBLE"),
];

/// Fields of an activity-log record
pub const ACTIVITY_SOURCE: &[ColumnDef] = &[
    col("artist", "VARCHAR"),
    col("auth", "VARCHAR"),
    col("firstName", "VARCHAR"),
    col("gender", "VARCHAR"),
    col("itemInSession", "BIGINT"),
    col("lastName", "VARCHAR"),
    col("length", "DOUBLE"),
    col("level", "VARCHAR"),
    col("location", "VARCHAR"),
    col("method", "VARCHAR"),
    col("page", "VARCHAR"),
    col("registration", "DOUBLE"),
    col("sessionId", "BIGINT"),
    col("song", "VARCHAR"),
    col("status", "BIGINT"),
    col("ts", "BIGINT"),
    col("userAgent", "VARCHAR"),
    col("userId", "VARCHAR"),
];

/// Columns of the entity table, as written and as read back
pub const ENTITY_TABLE: &[ColumnDef] = &[
    col("id", "VARCHAR"),
    col("title", "VARCHAR"),
    col("parent_id", "VARCHAR"),
    col("year", "BIGINT"),
    col("duration", "DOUBLE"),
];

/// Table function reading JSON files matching `glob` with a fixed layout
pub fn read_json_sql(glob: &str, columns: &[ColumnDef]) -> String {
    let struct_fields = columns
        .iter()
        .map(|c| format!("{}: {}", quote_literal(c.name), quote_literal(c.sql_type)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "read_json({}, format = 'auto', columns = {{{struct_fields}}}, ignore_errors = true)",
        quote_literal(glob)
    )
}

/// `CREATE TABLE` for an empty table with the given layout
pub fn create_empty_sql(table: &str, columns: &[ColumnDef]) -> String {
    let defs = columns
        .iter()
        .map(|c| format!("\"{}\" {}", c.name, c.sql_type))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE OR REPLACE TABLE {table} ({defs});")
}

/// Comma-separated, quoted column names
pub fn column_list(columns: &[ColumnDef]) -> String {
    columns
        .iter()
        .map(|c| format!("\"{}\"", c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_json_sql() {
        let sql = read_json_sql("/in/*.json", &ENTITY_TABLE[..2]);
        assert_eq!(
            sql,
            "read_json('/in/*.json', format = 'auto', \
             columns = {'id': 'VARCHAR', 'title': 'VARCHAR'}, ignore_errors = true)"
        );
    }

    #[test]
    fn test_create_empty_sql() {
        assert_eq!(
            create_empty_sql("entities", &ENTITY_TABLE[3..]),
            "CREATE OR REPLACE TABLE entities (\"year\" BIGINT, \"duration\" DOUBLE);"
        );
    }

    #[test]
    fn test_column_list() {
        assert_eq!(
            column_list(ENTITY_TABLE),
            "\"id\", \"title\", \"parent_id\", \"year\", \"duration\""
        );
    }

    #[test]
    fn test_layouts_have_unique_names() {
        for layout in [CATALOG_SOURCE, ACTIVITY_SOURCE, ENTITY_TABLE] {
            let mut names: Vec<_> = layout.iter().map(|c| c.name).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), layout.len());
        }
    }
}
