//! Builders for the dblink command vocabulary.
//!
//! Every piece of SQL the engine sends through the executor is assembled
//! here. Identifiers (table, column, link, cursor names) are caller-owned
//! configuration; literal query text is escaped in this module and nowhere
//! else.

use sync_core::{column_list, table_definition, ColumnDef, ConnectionDescriptor};

/// Doubles single quotes so `text` can be embedded in a quoted SQL literal.
pub fn escape_literal(text: &str) -> String {
    text.replace('\'', "''")
}

/// Name of the staging table the staged-swap strategy builds next to `table`.
pub fn staging_table(table: &str) -> String {
    format!("{table}_temp")
}

/// Loads the dblink extension if the local database does not have it yet.
pub fn enable_extension() -> String {
    "CREATE EXTENSION IF NOT EXISTS dblink;".to_string()
}

/// Probe-or-open for a named link.
///
/// Probe and open run inside a single statement so that no other job on the
/// session can race between the check and the connect. The open only fires
/// when `dblink_get_connections()` does not already list the link.
pub fn ensure_link(link: &str, descriptor: &ConnectionDescriptor) -> String {
    format!(
        r#"DO $$
DECLARE
  conns text[] := dblink_get_connections();
BEGIN
  IF conns @> ARRAY['{link}'::text] THEN
    RAISE NOTICE 'using existing connection: %', conns;
  ELSE
    PERFORM dblink_connect('{link}', '{connection}');
  END IF;
END$$;"#,
        link = escape_literal(link),
        connection = escape_literal(&descriptor.connection_string()),
    )
}

/// Empties the destination table.
pub fn truncate_table(table: &str) -> String {
    format!("TRUNCATE TABLE {table};")
}

/// The single-statement cross-link insert-select used by the full and
/// truncate-reload strategies.
pub fn insert_select(table: &str, link: &str, query: &str, columns: &[ColumnDef]) -> String {
    let names = column_list(columns);
    format!(
        "INSERT INTO {table} ({names}) SELECT {names} FROM dblink('{link}', '{query}') AS t ({definition});",
        link = escape_literal(link),
        query = escape_literal(query),
        definition = table_definition(columns),
    )
}

/// Opens a named server-side cursor over `query` on the remote session.
pub fn open_cursor(link: &str, cursor: &str, query: &str) -> String {
    format!(
        "SELECT dblink_open('{link}', '{cursor}', '{query}');",
        link = escape_literal(link),
        cursor = escape_literal(cursor),
        query = escape_literal(query),
    )
}

/// Fetches up to `batch_size` rows from an open cursor and inserts them into
/// the destination, as one command.
pub fn fetch_into_table(
    table: &str,
    link: &str,
    cursor: &str,
    batch_size: u32,
    columns: &[ColumnDef],
) -> String {
    format!(
        "INSERT INTO {table} ({names}) SELECT * FROM dblink_fetch('{link}', '{cursor}', {batch_size}) AS ({definition});",
        names = column_list(columns),
        link = escape_literal(link),
        cursor = escape_literal(cursor),
        definition = table_definition(columns),
    )
}

/// Closes a cursor previously opened with [`open_cursor`].
pub fn close_cursor(link: &str, cursor: &str) -> String {
    format!(
        "SELECT dblink_close('{link}', '{cursor}');",
        link = escape_literal(link),
        cursor = escape_literal(cursor),
    )
}

/// Drops a leftover staging table from an earlier aborted swap.
pub fn drop_staging_table(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {staging} CASCADE;", staging = staging_table(table))
}

/// Creates the staging table from the remote query's result.
pub fn create_staging_table(table: &str, link: &str, query: &str, columns: &[ColumnDef]) -> String {
    format!(
        "CREATE TABLE {staging} AS SELECT {names} FROM dblink('{link}', '{query}') AS t ({definition});",
        staging = staging_table(table),
        names = column_list(columns),
        link = escape_literal(link),
        query = escape_literal(query),
        definition = table_definition(columns),
    )
}

/// Declares the primary key on the staging table.
pub fn add_staging_primary_key(table: &str, primary_key: &str) -> String {
    format!(
        "ALTER TABLE {staging} ADD PRIMARY KEY ({primary_key});",
        staging = staging_table(table),
    )
}

/// Creates the job's sequence when it does not exist yet. Guarded in one
/// statement for the same reason as [`ensure_link`].
pub fn ensure_sequence(sequence: &str) -> String {
    format!(
        r#"DO $$
BEGIN
  IF EXISTS (SELECT 1 FROM pg_class WHERE relname = '{sequence}') THEN
    RAISE NOTICE 'using existing sequence: {sequence}';
  ELSE
    CREATE SEQUENCE {ident} START WITH 1 INCREMENT BY 1 NO MINVALUE NO MAXVALUE CACHE 1;
  END IF;
END$$;"#,
        sequence = escape_literal(sequence),
        ident = sequence,
    )
}

/// Attaches the sequence to the staging table's primary key.
pub fn attach_sequence(table: &str, primary_key: &str, sequence: &str) -> String {
    format!(
        "ALTER SEQUENCE {sequence} OWNED BY {staging}.{primary_key};
ALTER TABLE ONLY {staging} ALTER COLUMN {primary_key} SET DEFAULT nextval('{literal}'::regclass);",
        staging = staging_table(table),
        literal = escape_literal(sequence),
    )
}

/// Renames the live table aside, moves the staging table into place, and
/// drops the old contents.
pub fn swap_staging_into_place(table: &str) -> String {
    format!(
        "ALTER TABLE {table} RENAME TO {table}_old;
ALTER TABLE {staging} RENAME TO {table};
DROP TABLE {table}_old CASCADE;",
        staging = staging_table(table),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_core::ColumnDef;

    fn columns() -> Vec<ColumnDef> {
        vec![ColumnDef::new("id", "bigint"), ColumnDef::new("body", "text")]
    }

    #[test]
    fn doubles_single_quotes() {
        assert_eq!(escape_literal("O'Brien's"), "O''Brien''s");
        assert_eq!(escape_literal("no quotes"), "no quotes");
    }

    #[test]
    fn ensure_link_opens_only_when_probe_misses() {
        let conn = ConnectionDescriptor::parse("postgres://source.example.com/missions").unwrap();
        let sql = ensure_link("missions_link", &conn);

        let probe = sql.find("dblink_get_connections()").unwrap();
        let guard = sql.find("IF conns @> ARRAY['missions_link'::text]").unwrap();
        let open = sql
            .find("dblink_connect('missions_link', 'host=source.example.com dbname=missions')")
            .unwrap();
        assert!(probe < guard && guard < open);
        assert!(sql.find("ELSE").unwrap() < open);
    }

    #[test]
    fn insert_select_embeds_escaped_query() {
        let sql = insert_select(
            "authors",
            "authors_link",
            "SELECT id, body FROM authors WHERE name = 'O''Brien'",
            &columns(),
        );
        assert_eq!(
            sql,
            "INSERT INTO authors (id, body) SELECT id, body FROM dblink('authors_link', \
             'SELECT id, body FROM authors WHERE name = ''O''''Brien''') AS t (id bigint, body text);"
        );
    }

    #[test]
    fn open_cursor_escapes_query_text() {
        let sql = open_cursor("the_conn", "the_table", "The remote 'query';");
        assert_eq!(
            sql,
            "SELECT dblink_open('the_conn', 'the_table', 'The remote ''query'';');"
        );
    }

    #[test]
    fn fetch_into_table_describes_record_shape() {
        let sql = fetch_into_table("authors", "the_conn", "authors", 10_000, &columns());
        assert_eq!(
            sql,
            "INSERT INTO authors (id, body) SELECT * FROM dblink_fetch('the_conn', 'authors', 10000) \
             AS (id bigint, body text);"
        );
    }

    #[test]
    fn close_cursor_names_link_and_cursor() {
        assert_eq!(
            close_cursor("the_conn", "the_table"),
            "SELECT dblink_close('the_conn', 'the_table');"
        );
    }

    #[test]
    fn staging_commands_target_the_temp_table() {
        assert_eq!(
            drop_staging_table("authors"),
            "DROP TABLE IF EXISTS authors_temp CASCADE;"
        );
        let create = create_staging_table("authors", "authors_link", "SELECT id, body FROM authors", &columns());
        assert!(create.starts_with("CREATE TABLE authors_temp AS SELECT id, body FROM dblink("));
        assert_eq!(
            add_staging_primary_key("authors", "id"),
            "ALTER TABLE authors_temp ADD PRIMARY KEY (id);"
        );
    }

    #[test]
    fn swap_renames_and_drops_old_table() {
        let sql = swap_staging_into_place("authors");
        let aside = sql.find("ALTER TABLE authors RENAME TO authors_old;").unwrap();
        let into_place = sql.find("ALTER TABLE authors_temp RENAME TO authors;").unwrap();
        let drop = sql.find("DROP TABLE authors_old CASCADE;").unwrap();
        assert!(aside < into_place && into_place < drop);
    }
}
