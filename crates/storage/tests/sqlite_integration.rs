use chrono::Duration;
use course_core::catalog::demo_catalog;
use course_core::model::{
    Course, CourseId, CourseLevel, Module, ModuleDuration, ModuleId, ModuleState,
};
use course_core::progress::CourseProgress;
use course_core::time::fixed_now;
use storage::repository::{
    CompletionLogRepository, CompletionRecord, CourseRepository, ProgressPersistence,
    StorageError,
};
use storage::sqlite::{SCHEMA_VERSION, SqliteRepository};

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn module(id: u64, title: &str) -> Module {
    Module::new(
        ModuleId::new(id),
        title,
        ModuleDuration::from_minutes(20).unwrap(),
        "",
        Some("videos/intro.mp4".into()),
    )
    .unwrap()
}

#[tokio::test]
async fn sqlite_round_trips_demo_catalog() {
    let repo = connect("memdb_catalog").await;
    for seed in demo_catalog().unwrap() {
        repo.upsert_course(&seed.course, &seed.progress)
            .await
            .unwrap();
    }

    let listed = repo.list_courses(10).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].course.id(), CourseId::new(1));
    assert_eq!(listed[0].progress.completed_count(), 8);
    assert_eq!(listed[1].course.title(), "BNCC com Atividades Criativas");

    let limited = repo.list_courses(1).await.unwrap();
    assert_eq!(limited.len(), 1);

    let expected = demo_catalog().unwrap().remove(0);
    let fetched = repo.get_course(CourseId::new(1)).await.unwrap().unwrap();
    assert_eq!(fetched.course, expected.course);
    assert_eq!(fetched.progress, expected.progress);
}

#[tokio::test]
async fn sqlite_preserves_module_order_and_media() {
    let repo = connect("memdb_order").await;
    let course = Course::new(
        CourseId::new(7),
        "Gestão de Sala de Aula",
        "",
        4.5,
        vec![module(30, "C"), module(10, "A"), module(20, "B")],
    )
    .unwrap();
    repo.upsert_course(&course, &CourseProgress::fresh(&course))
        .await
        .unwrap();

    let fetched = repo.get_course(course.id()).await.unwrap().unwrap();
    assert_eq!(
        fetched.course.module_ids(),
        vec![ModuleId::new(30), ModuleId::new(10), ModuleId::new(20)]
    );
    assert_eq!(
        fetched.course.modules()[0].media_ref(),
        Some("videos/intro.mp4")
    );
    assert_eq!(
        fetched.progress.state_of(ModuleId::new(30)),
        Some(ModuleState::Unlocked)
    );
}

#[tokio::test]
async fn sqlite_upsert_drops_removed_modules() {
    let repo = connect("memdb_upsert").await;
    let full = Course::new(
        CourseId::new(3),
        "Curso",
        "",
        4.0,
        vec![module(1, "A"), module(2, "B"), module(3, "C")],
    )
    .unwrap();
    repo.upsert_course(&full, &CourseProgress::fresh(&full))
        .await
        .unwrap();

    let trimmed = Course::new(
        CourseId::new(3),
        "Curso revisado",
        "",
        4.0,
        vec![module(1, "A"), module(2, "B")],
    )
    .unwrap();
    repo.upsert_course(&trimmed, &CourseProgress::fresh(&trimmed))
        .await
        .unwrap();

    let fetched = repo.get_course(CourseId::new(3)).await.unwrap().unwrap();
    assert_eq!(fetched.course.title(), "Curso revisado");
    assert_eq!(fetched.course.modules().len(), 2);
}

#[tokio::test]
async fn sqlite_records_completion_atomically() {
    let repo = connect("memdb_completion").await;
    let seed = demo_catalog().unwrap().remove(1);
    repo.upsert_course(&seed.course, &seed.progress)
        .await
        .unwrap();

    repo.record_completion(
        CompletionRecord::new(seed.course.id(), ModuleId::new(4), fixed_now()),
        Some(ModuleId::new(5)),
    )
    .await
    .unwrap();

    repo.record_completion(
        CompletionRecord::new(
            seed.course.id(),
            ModuleId::new(5),
            fixed_now() + Duration::minutes(40),
        ),
        Some(ModuleId::new(6)),
    )
    .await
    .unwrap();

    let fetched = repo.get_course(seed.course.id()).await.unwrap().unwrap();
    assert_eq!(fetched.progress.completed_count(), 5);
    assert_eq!(
        fetched.progress.state_of(ModuleId::new(6)),
        Some(ModuleState::Unlocked)
    );

    let log = repo.completions_for_course(seed.course.id()).await.unwrap();
    let modules: Vec<ModuleId> = log.iter().map(|c| c.module_id).collect();
    assert_eq!(modules, vec![ModuleId::new(4), ModuleId::new(5)]);
    assert!(log.iter().all(|c| c.id.is_some()));
}

#[tokio::test]
async fn sqlite_rejects_completion_for_unknown_course() {
    let repo = connect("memdb_unknown").await;
    let seed = demo_catalog().unwrap().remove(1);

    let err = repo
        .record_completion(
            CompletionRecord::new(seed.course.id(), ModuleId::new(4), fixed_now()),
            Some(ModuleId::new(5)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_stale_completion_is_rejected_without_side_effects() {
    let repo = connect("memdb_stale").await;
    let seed = demo_catalog().unwrap().remove(1);
    repo.upsert_course(&seed.course, &seed.progress)
        .await
        .unwrap();
    let course_id = seed.course.id();

    for (module, next) in [(4, 5), (5, 6)] {
        repo.record_completion(
            CompletionRecord::new(course_id, ModuleId::new(module), fixed_now()),
            Some(ModuleId::new(next)),
        )
        .await
        .unwrap();
    }

    let err = repo
        .record_completion(
            CompletionRecord::new(course_id, ModuleId::new(4), fixed_now()),
            Some(ModuleId::new(5)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let fetched = repo.get_course(course_id).await.unwrap().unwrap();
    assert_eq!(
        fetched.progress.state_of(ModuleId::new(5)),
        Some(ModuleState::Completed)
    );
    assert_eq!(
        fetched.progress.state_of(ModuleId::new(6)),
        Some(ModuleState::Unlocked)
    );
    assert_eq!(repo.completions_for_course(course_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn sqlite_failed_unlock_rolls_back_completion() {
    let repo = connect("memdb_rollback").await;
    let seed = demo_catalog().unwrap().remove(0);
    repo.upsert_course(&seed.course, &seed.progress)
        .await
        .unwrap();
    let course_id = seed.course.id();

    // Module 10 is already open, so the unlock guard fails after module 9 moved.
    let err = repo
        .record_completion(
            CompletionRecord::new(course_id, ModuleId::new(9), fixed_now()),
            Some(ModuleId::new(10)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let fetched = repo.get_course(course_id).await.unwrap().unwrap();
    assert_eq!(
        fetched.progress.state_of(ModuleId::new(9)),
        Some(ModuleState::Unlocked)
    );
    assert!(repo.completions_for_course(course_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_upsert_keeps_completion_history() {
    let repo = connect("memdb_history").await;
    let seed = demo_catalog().unwrap().remove(1);
    repo.upsert_course(&seed.course, &seed.progress)
        .await
        .unwrap();
    let course_id = seed.course.id();

    repo.record_completion(
        CompletionRecord::new(course_id, ModuleId::new(4), fixed_now()),
        Some(ModuleId::new(5)),
    )
    .await
    .unwrap();

    let stored = repo.get_course(course_id).await.unwrap().unwrap();
    let edited = Course::new(
        course_id,
        "BNCC com Atividades Criativas (2ª edição)",
        stored.course.description(),
        stored.course.rating(),
        stored.course.modules().to_vec(),
    )
    .unwrap();
    repo.upsert_course(&edited, &stored.progress).await.unwrap();

    let log = repo.completions_for_course(course_id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].module_id, ModuleId::new(4));

    let fetched = repo.get_course(course_id).await.unwrap().unwrap();
    assert_eq!(fetched.course.title(), "BNCC com Atividades Criativas (2ª edição)");
    assert_eq!(fetched.progress.completed_count(), 4);
}

#[tokio::test]
async fn sqlite_round_trips_category_and_level() {
    let repo = connect("memdb_badges").await;
    assert_eq!(repo.schema_version().await.unwrap(), SCHEMA_VERSION);

    let course = Course::new(CourseId::new(5), "Inclusão", "", 4.6, vec![module(1, "A")])
        .unwrap()
        .with_category("Inclusão")
        .with_level(CourseLevel::Advanced);
    repo.upsert_course(&course, &CourseProgress::fresh(&course))
        .await
        .unwrap();

    let fetched = repo.get_course(course.id()).await.unwrap().unwrap();
    assert_eq!(fetched.course.category(), Some("Inclusão"));
    assert_eq!(fetched.course.level(), Some(CourseLevel::Advanced));

    let plain = Course::new(CourseId::new(6), "Sem categoria", "", 4.0, vec![module(1, "A")])
        .unwrap();
    repo.upsert_course(&plain, &CourseProgress::fresh(&plain))
        .await
        .unwrap();
    let fetched = repo.get_course(plain.id()).await.unwrap().unwrap();
    assert_eq!(fetched.course.category(), None);
    assert_eq!(fetched.course.level(), None);
}

#[tokio::test]
async fn sqlite_migrations_run_once() {
    let repo = connect("memdb_migrations").await;
    assert_eq!(repo.migrate().await.unwrap(), 0);
    assert_eq!(repo.schema_version().await.unwrap(), SCHEMA_VERSION);
}
