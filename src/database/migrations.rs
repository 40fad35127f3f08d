use crate::error::Result;
use sqlx::PgPool;
use tracing::info;

/// Run all database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    create_migrations_table(pool).await?;

    let migrations = get_migrations();

    for (version, name, sql) in migrations {
        if !is_migration_applied(pool, version).await? {
            info!(version = version, name = name, "Applying migration");

            sqlx::query(sql).execute(pool).await?;
            record_migration(pool, version, name).await?;

            info!(version = version, name = name, "Migration applied successfully");
        }
    }

    Ok(())
}

/// Create the migrations tracking table
async fn create_migrations_table(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Check if a migration has been applied
async fn is_migration_applied(pool: &PgPool, version: i32) -> Result<bool> {
    let result =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM schema_migrations WHERE version = $1")
            .bind(version)
            .fetch_one(pool)
            .await?;

    Ok(result > 0)
}

/// Record a migration as applied
async fn record_migration(pool: &PgPool, version: i32, name: &str) -> Result<()> {
    sqlx::query("INSERT INTO schema_migrations (version, name) VALUES ($1, $2)")
        .bind(version)
        .bind(name)
        .execute(pool)
        .await?;

    Ok(())
}

/// Get all migrations in order
fn get_migrations() -> Vec<(i32, &'static str, &'static str)> {
    vec![
        (1, "viewers_table", MIGRATION_001_VIEWERS),
        (2, "polls_tables", MIGRATION_002_POLLS),
        (3, "voted_polls_table", MIGRATION_003_VOTED_POLLS),
    ]
}

// Migration 1: Viewer accounts
const MIGRATION_001_VIEWERS: &str = r#"
CREATE TABLE IF NOT EXISTS viewers (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    username VARCHAR(255) NOT NULL,
    email VARCHAR(255) NOT NULL,
    password_hash TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT unique_viewer_username UNIQUE (username),
    CONSTRAINT unique_viewer_email UNIQUE (email)
);

CREATE INDEX IF NOT EXISTS idx_viewers_username ON viewers(username);
"#;

// Migration 2: Polls and their ordered options
const MIGRATION_002_POLLS: &str = r#"
CREATE TABLE IF NOT EXISTS polls (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    question TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Options live in their own table; position preserves display order.
CREATE TABLE IF NOT EXISTS poll_options (
    poll_id UUID NOT NULL REFERENCES polls(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    answer VARCHAR(255) NOT NULL,
    votes BIGINT NOT NULL DEFAULT 0 CHECK (votes >= 0),
    PRIMARY KEY (poll_id, position),
    CONSTRAINT unique_option_answer UNIQUE (poll_id, answer)
);

CREATE INDEX IF NOT EXISTS idx_poll_options_poll_id ON poll_options(poll_id);
"#;

// Migration 3: Per-viewer voted-polls record
const MIGRATION_003_VOTED_POLLS: &str = r#"
-- The (viewer_id, poll_id) primary key is what makes double votes
-- impossible to persist.
CREATE TABLE IF NOT EXISTS voted_polls (
    viewer_id UUID NOT NULL REFERENCES viewers(id) ON DELETE CASCADE,
    poll_id UUID NOT NULL REFERENCES polls(id) ON DELETE CASCADE,
    answer VARCHAR(255) NOT NULL,
    voted_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (viewer_id, poll_id)
);

CREATE INDEX IF NOT EXISTS idx_voted_polls_viewer_id ON voted_polls(viewer_id);
"#;
