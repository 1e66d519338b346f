use anyhow::Context;

// Advisory locks are scoped to the Postgres session. Guards against two workers recomputing the
// quality snapshot at the same time.
const LOCK_NAMESPACE: i64 = 0x4649_4E50_4943; // "FINPIC"

/// Named jobs that must not overlap across worker processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    QualityReport,
    SeedCatalog,
}

fn lock_key(job: Job) -> i64 {
    let salt = match job {
        Job::QualityReport => 1,
        Job::SeedCatalog => 2,
    };
    LOCK_NAMESPACE ^ salt
}

pub async fn try_acquire_job_lock(pool: &sqlx::PgPool, job: Job) -> anyhow::Result<bool> {
    let key = lock_key(job);
    let acquired: (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
        .persistent(false)
        .bind(key)
        .fetch_one(pool)
        .await
        .with_context(|| format!("failed to acquire advisory lock (job={job:?}, key={key})"))?;
    Ok(acquired.0)
}

pub async fn release_job_lock(pool: &sqlx::PgPool, job: Job) -> anyhow::Result<()> {
    let key = lock_key(job);
    sqlx::query("SELECT pg_advisory_unlock($1)")
        .persistent(false)
        .bind(key)
        .execute(pool)
        .await
        .with_context(|| format!("failed to release advisory lock (job={job:?}, key={key})"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobs_get_distinct_keys() {
        assert_ne!(lock_key(Job::QualityReport), lock_key(Job::SeedCatalog));
    }
}
