use sqlx::{query, query_scalar, Error, PgConnection};
use time::{Duration, OffsetDateTime};

/// The expiration a kickpoint issued at `date` should carry when its clan
/// lets kickpoints expire after `days` days. Agrees with
/// [`KickpointModel::recalculate_expires_at`] only for a UTC session; in
/// other time zones Postgres keeps the local wall-clock time across DST
/// changes while this adds fixed 24 hour days.
pub fn expiration_for(date: OffsetDateTime, days: i64) -> OffsetDateTime {
    date + Duration::days(days)
}

pub struct KickpointModel<'a> {
    pub conn: &'a mut PgConnection,
}

impl KickpointModel<'_> {
    /// Sets `expires_at` to `date` plus the clan's expiration window for every
    /// kickpoint whose value is missing or stale. Kickpoints of clans without
    /// settings are left alone. Returns the number of rows changed.
    pub async fn recalculate_expires_at(&mut self) -> Result<u64, Error> {
        // IS DISTINCT FROM also selects rows where expires_at is NULL
        let result = query(
            r#"UPDATE kickpoints AS kp
            SET expires_at = kp.date + (cs.kickpoints_expire_after_days * INTERVAL '1 day')
            FROM clan_settings AS cs
            WHERE kp.clan_tag = cs.clan_tag
                AND kp.expires_at IS DISTINCT FROM
                    kp.date + (cs.kickpoints_expire_after_days * INTERVAL '1 day')"#,
        )
        .execute(&mut *self.conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Number of kickpoints whose clan has no settings row.
    pub async fn count_without_settings(&mut self) -> Result<i64, Error> {
        query_scalar::<_, i64>(
            r#"SELECT COUNT(*)
            FROM kickpoints AS kp
            WHERE NOT EXISTS (
                SELECT 1 FROM clan_settings AS cs WHERE cs.clan_tag = kp.clan_tag
            )"#,
        )
        .fetch_one(&mut *self.conn)
        .await
    }
}
