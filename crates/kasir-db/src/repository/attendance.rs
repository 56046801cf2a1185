//! # Attendance Repository
//!
//! One row per employee per work date (UTC). Check-in creates the row,
//! check-out fills `check_out_at` exactly once on the latest open row, so a
//! shift may end on a later date than it started.

use chrono::{DateTime, NaiveDate, Utc};
use kasir_core::{Attendance, CoreError};
use sqlx::SqlitePool;
use tracing::info;

use super::generate_id;
use crate::error::{DbError, DbResult};

const ATTENDANCE_COLUMNS: &str = "id, user_id, branch_id, work_date, check_in_at, check_out_at";

/// Repository for attendance rows.
#[derive(Debug, Clone)]
pub struct AttendanceRepository {
    pool: SqlitePool,
}

impl AttendanceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AttendanceRepository { pool }
    }

    pub async fn check_in(&self, user_id: &str, branch_id: &str) -> DbResult<Attendance> {
        self.check_in_at(user_id, branch_id, Utc::now()).await
    }

    /// Opens the attendance row for the date of `at`.
    ///
    /// A second check-in on the same date fails with
    /// [`CoreError::AlreadyCheckedIn`].
    pub async fn check_in_at(
        &self,
        user_id: &str,
        branch_id: &str,
        at: DateTime<Utc>,
    ) -> DbResult<Attendance> {
        let record = Attendance {
            id: generate_id(),
            user_id: user_id.to_string(),
            branch_id: branch_id.to_string(),
            work_date: at.date_naive(),
            check_in_at: at,
            check_out_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO attendance (id, user_id, branch_id, work_date, check_in_at, check_out_at)
            VALUES (?1, ?2, ?3, ?4, ?5, NULL)
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.branch_id)
        .bind(record.work_date)
        .bind(record.check_in_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::Core(CoreError::AlreadyCheckedIn),
            other => other,
        })?;

        info!(user_id = %user_id, branch_id = %branch_id, date = %record.work_date, "Checked in");
        Ok(record)
    }

    pub async fn check_out(&self, user_id: &str) -> DbResult<Attendance> {
        self.check_out_at(user_id, Utc::now()).await
    }

    /// Closes the user's latest open row.
    ///
    /// Without an open row this is [`CoreError::AlreadyCheckedOut`] when the
    /// date of `at` already has a closed row, else [`CoreError::NotCheckedIn`].
    pub async fn check_out_at(&self, user_id: &str, at: DateTime<Utc>) -> DbResult<Attendance> {
        let Some(mut record) = self.open_for_user(user_id).await? else {
            return Err(match self.get_for_date(user_id, at.date_naive()).await? {
                Some(_) => CoreError::AlreadyCheckedOut.into(),
                None => CoreError::NotCheckedIn.into(),
            });
        };

        // Guarded on NULL so two concurrent check-outs cannot both succeed.
        let result = sqlx::query(
            "UPDATE attendance SET check_out_at = ?2 WHERE id = ?1 AND check_out_at IS NULL",
        )
        .bind(&record.id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::AlreadyCheckedOut.into());
        }

        record.check_out_at = Some(at);
        info!(
            user_id = %user_id,
            worked_minutes = record.worked_minutes().unwrap_or_default(),
            "Checked out"
        );
        Ok(record)
    }

    /// The user's most recent row without a check-out.
    pub async fn open_for_user(&self, user_id: &str) -> DbResult<Option<Attendance>> {
        let row = sqlx::query_as::<_, Attendance>(&format!(
            r#"
            SELECT {ATTENDANCE_COLUMNS}
            FROM attendance
            WHERE user_id = ?1 AND check_out_at IS NULL
            ORDER BY check_in_at DESC
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Today's (UTC) row for a user, if any.
    pub async fn today(&self, user_id: &str) -> DbResult<Option<Attendance>> {
        self.get_for_date(user_id, Utc::now().date_naive()).await
    }

    pub async fn get_for_date(
        &self,
        user_id: &str,
        work_date: NaiveDate,
    ) -> DbResult<Option<Attendance>> {
        let row = sqlx::query_as::<_, Attendance>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE user_id = ?1 AND work_date = ?2"
        ))
        .bind(user_id)
        .bind(work_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Everyone's rows for one branch and date, by check-in time.
    pub async fn list(&self, branch_id: &str, work_date: NaiveDate) -> DbResult<Vec<Attendance>> {
        let rows = sqlx::query_as::<_, Attendance>(&format!(
            r#"
            SELECT {ATTENDANCE_COLUMNS}
            FROM attendance
            WHERE branch_id = ?1 AND work_date = ?2
            ORDER BY check_in_at
            "#
        ))
        .bind(branch_id)
        .bind(work_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// A user's most recent rows.
    pub async fn list_for_user(&self, user_id: &str, limit: u32) -> DbResult<Vec<Attendance>> {
        let rows = sqlx::query_as::<_, Attendance>(&format!(
            r#"
            SELECT {ATTENDANCE_COLUMNS}
            FROM attendance
            WHERE user_id = ?1
            ORDER BY work_date DESC
            LIMIT ?2
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::Fixture;
    use chrono::{Duration, TimeZone};

    fn morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 1, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_check_in_then_out() {
        let fx = Fixture::new().await;
        let repo = fx.db.attendance();

        let opened = repo
            .check_in_at(&fx.cashier.id, &fx.branch.id, morning())
            .await
            .unwrap();
        assert_eq!(opened.work_date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert!(opened.check_out_at.is_none());

        let closed = repo
            .check_out_at(&fx.cashier.id, morning() + Duration::hours(8))
            .await
            .unwrap();
        assert_eq!(closed.worked_minutes(), Some(480));

        let rows = repo.list(&fx.branch.id, opened.work_date).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].check_out_at.is_some());
    }

    #[tokio::test]
    async fn test_double_check_in_rejected() {
        let fx = Fixture::new().await;
        let repo = fx.db.attendance();

        repo.check_in_at(&fx.cashier.id, &fx.branch.id, morning())
            .await
            .unwrap();
        let err = repo
            .check_in_at(&fx.cashier.id, &fx.branch.id, morning() + Duration::hours(2))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::AlreadyCheckedIn)));

        // Next day is a fresh row.
        repo.check_in_at(&fx.cashier.id, &fx.branch.id, morning() + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(repo.list_for_user(&fx.cashier.id, 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_check_out_rules() {
        let fx = Fixture::new().await;
        let repo = fx.db.attendance();

        let err = repo.check_out_at(&fx.cashier.id, morning()).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::NotCheckedIn)));

        repo.check_in_at(&fx.cashier.id, &fx.branch.id, morning())
            .await
            .unwrap();
        repo.check_out_at(&fx.cashier.id, morning() + Duration::hours(1))
            .await
            .unwrap();
        let err = repo
            .check_out_at(&fx.cashier.id, morning() + Duration::hours(2))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::AlreadyCheckedOut)));
    }

    #[tokio::test]
    async fn test_shift_across_midnight_closes() {
        let fx = Fixture::new().await;
        let repo = fx.db.attendance();
        let late = Utc.with_ymd_and_hms(2024, 3, 9, 23, 0, 0).unwrap();

        repo.check_in_at(&fx.cashier.id, &fx.branch.id, late)
            .await
            .unwrap();
        let closed = repo
            .check_out_at(&fx.cashier.id, late + Duration::hours(8))
            .await
            .unwrap();

        assert_eq!(closed.work_date, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(closed.worked_minutes(), Some(480));
        assert!(repo.open_for_user(&fx.cashier.id).await.unwrap().is_none());

        let err = repo
            .check_out_at(&fx.cashier.id, late + Duration::hours(9))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::NotCheckedIn)));
    }
}
