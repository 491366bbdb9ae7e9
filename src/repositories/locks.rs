use sqlx::PgExecutor;

/// Transaction-scoped advisory lock keyed by `scope` and the given ids. Released on commit or
/// rollback.
pub(crate) async fn acquire_xact_lock(
    executor: impl PgExecutor<'_>,
    scope: &str,
    ids: &[&str],
) -> Result<(), sqlx::Error> {
    let key = lock_key(scope, ids);
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(key)
        .execute(executor)
        .await?;
    Ok(())
}

fn lock_key(scope: &str, ids: &[&str]) -> String {
    let mut key = scope.to_string();
    for id in ids {
        key.push(':');
        key.push_str(id);
    }
    key
}
