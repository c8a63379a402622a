use course_core::model::{CourseId, CourseLevel, Module, ModuleDuration, ModuleId, ModuleState};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{CompletionRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn module_id_from_i64(v: i64) -> Result<ModuleId, StorageError> {
    Ok(ModuleId::new(i64_to_u64("module_id", v)?))
}

pub(crate) fn parse_level(raw: &str) -> Result<CourseLevel, StorageError> {
    raw.parse::<CourseLevel>().map_err(ser)
}

/// Map a `modules` row into catalog data and its stored state.
pub(crate) fn map_module_row(row: &SqliteRow) -> Result<(Module, ModuleState), StorageError> {
    let id = module_id_from_i64(row.try_get("id").map_err(ser)?)?;

    let minutes_i64: i64 = row.try_get("duration_minutes").map_err(ser)?;
    let minutes = u32::try_from(minutes_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid duration: {minutes_i64}")))?;
    let duration = ModuleDuration::from_minutes(minutes).map_err(ser)?;

    let module = Module::new(
        id,
        row.try_get::<String, _>("title").map_err(ser)?,
        duration,
        row.try_get::<String, _>("description").map_err(ser)?,
        row.try_get::<Option<String>, _>("media_ref").map_err(ser)?,
    )
    .map_err(ser)?;

    let state = row
        .try_get::<String, _>("state")
        .map_err(ser)?
        .parse::<ModuleState>()
        .map_err(ser)?;

    Ok((module, state))
}

pub(crate) fn map_completion_row(row: &SqliteRow) -> Result<CompletionRecord, StorageError> {
    Ok(CompletionRecord {
        id: Some(row.try_get("id").map_err(ser)?),
        course_id: course_id_from_i64(row.try_get("course_id").map_err(ser)?)?,
        module_id: module_id_from_i64(row.try_get("module_id").map_err(ser)?)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
    })
}
