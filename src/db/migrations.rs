use anyhow::Context;
use rusqlite::Connection;

// Embedded so every connection, including in-memory test databases, gets
// the full schema without depending on the working directory.
const MIGRATIONS: &[(&str, &str)] = &[(
    "0001_init",
    "CREATE TABLE IF NOT EXISTS services (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        duration_minutes INTEGER NOT NULL,
        price REAL NOT NULL,
        description TEXT,
        is_active INTEGER NOT NULL DEFAULT 1
    );

    CREATE TABLE IF NOT EXISTS professionals (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        specialty TEXT NOT NULL,
        photo_url TEXT NOT NULL DEFAULT '',
        service_ids TEXT NOT NULL DEFAULT '[]',
        work_days TEXT NOT NULL DEFAULT '[]',
        work_hours_start TEXT NOT NULL,
        work_hours_end TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        description TEXT
    );

    CREATE TABLE IF NOT EXISTS appointments (
        id TEXT PRIMARY KEY,
        client_id TEXT NOT NULL,
        client_name TEXT NOT NULL,
        client_phone TEXT NOT NULL,
        professional_id TEXT NOT NULL REFERENCES professionals(id),
        service_id TEXT NOT NULL REFERENCES services(id),
        date TEXT NOT NULL,
        time TEXT NOT NULL,
        timestamp_utc TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'confirmed',
        created_at TEXT NOT NULL
    );

    -- The store-level guarantee against double booking: at most one live
    -- appointment per professional per slot.
    CREATE UNIQUE INDEX IF NOT EXISTS idx_appointments_slot
        ON appointments (professional_id, date, time)
        WHERE status != 'cancelled';

    CREATE INDEX IF NOT EXISTS idx_appointments_date
        ON appointments (professional_id, date);

    CREATE TABLE IF NOT EXISTS store_config (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        data TEXT NOT NULL
    );",
)];

pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .context("failed to create migrations table")?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .context("failed to check migration status")?;

        if already_applied {
            continue;
        }

        conn.execute_batch(sql)
            .with_context(|| format!("failed to apply migration: {name}"))?;

        conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])
            .with_context(|| format!("failed to record migration: {name}"))?;

        tracing::info!("applied migration: {name}");
    }

    Ok(())
}
