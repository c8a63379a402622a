use course_core::model::{CourseId, ModuleId, ModuleState};
use sqlx::SqliteConnection;

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_completion_row};
use crate::repository::{
    CompletionLogRepository, CompletionRecord, ProgressPersistence, StorageError,
};

#[async_trait::async_trait]
impl CompletionLogRepository for SqliteRepository {
    async fn completions_for_course(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<CompletionRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, course_id, module_id, completed_at
                FROM module_completions
                WHERE course_id = ?1
                ORDER BY completed_at ASC, id ASC
            ",
        )
        .bind(id_to_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_completion_row(&row)?);
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl ProgressPersistence for SqliteRepository {
    async fn record_completion(
        &self,
        completion: CompletionRecord,
        unlocked: Option<ModuleId>,
    ) -> Result<i64, StorageError> {
        if unlocked == Some(completion.module_id) {
            return Err(StorageError::Conflict);
        }
        let course_id = id_to_i64("course_id", completion.course_id.value())?;
        let module_id = id_to_i64("module_id", completion.module_id.value())?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        let course_exists: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM courses WHERE id = ?1")
                .bind(course_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(conn)?;
        if course_exists.is_none() {
            return Err(StorageError::NotFound);
        }

        move_state(
            &mut *tx,
            course_id,
            module_id,
            ModuleState::Unlocked,
            ModuleState::Completed,
        )
        .await?;
        if let Some(next) = unlocked {
            let next = id_to_i64("module_id", next.value())?;
            move_state(
                &mut *tx,
                course_id,
                next,
                ModuleState::Locked,
                ModuleState::Unlocked,
            )
            .await?;
        }

        let res = sqlx::query(
            r"
                INSERT INTO module_completions (course_id, module_id, completed_at)
                VALUES (?1, ?2, ?3)
            ",
        )
        .bind(course_id)
        .bind(module_id)
        .bind(completion.completed_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;
        Ok(res.last_insert_rowid())
    }
}

/// Move one module from `from` to `to`; the row must still be in `from`.
///
/// Runs inside the caller's transaction; an error rolls the whole write back.
async fn move_state(
    db: &mut SqliteConnection,
    course_id: i64,
    module_id: i64,
    from: ModuleState,
    to: ModuleState,
) -> Result<(), StorageError> {
    let res = sqlx::query(
        r"
            UPDATE modules SET state = ?4
            WHERE course_id = ?1 AND id = ?2 AND state = ?3
        ",
    )
    .bind(course_id)
    .bind(module_id)
    .bind(from.as_str())
    .bind(to.as_str())
    .execute(&mut *db)
    .await
    .map_err(conn)?;
    if res.rows_affected() > 0 {
        return Ok(());
    }

    let exists: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM modules WHERE course_id = ?1 AND id = ?2")
            .bind(course_id)
            .bind(module_id)
            .fetch_optional(&mut *db)
            .await
            .map_err(conn)?;
    if exists.is_some() {
        tracing::debug!(course_id, module_id, from = %from, "module state moved on");
        Err(StorageError::Conflict)
    } else {
        Err(StorageError::NotFound)
    }
}
