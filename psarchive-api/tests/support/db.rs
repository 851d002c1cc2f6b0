use psarchive_api::{create_pool, ensure_schema, PgMetricStore, PoolSettings};

/// Store against `ARCHIVER_DSN`, with the schema in place.
pub async fn test_pg_store() -> PgMetricStore {
    let dsn = std::env::var("ARCHIVER_DSN").expect("ARCHIVER_DSN must be set for db-tests");
    let pool = create_pool(&dsn, &PoolSettings::default()).expect("Failed to create pool");
    ensure_schema(&pool, false)
        .await
        .expect("Failed to bootstrap schema");
    PgMetricStore::new(pool)
}

/// Run id unique to this process and call site.
pub fn unique_run_id(tag: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("test-{}-{}-{}", tag, std::process::id(), nanos)
}
