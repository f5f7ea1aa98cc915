use chrono::Duration;
use quiz_core::model::{
    AnswerValue, ChoiceOption, ClassId, OptionId, Question, QuestionId, QuestionPayload, TestId,
    TestInfo,
};
use quiz_core::time::fixed_now;
use quiz_core::wire::SessionBundle;
use storage::repository::{AnswerMap, SessionCacheStore};
use storage::sqlite::SqliteCache;

fn build_bundle(test_id: &TestId) -> SessionBundle {
    SessionBundle {
        test_info: TestInfo {
            test_id: test_id.clone(),
            class_id: ClassId::new("c1"),
            title: "Midterm".into(),
            duration_minutes: 30,
            hard_end: fixed_now() + Duration::minutes(45),
            is_test: true,
        },
        questions: vec![Question {
            id: QuestionId::new("q1"),
            points: 1.0,
            prompt: "Pick one".into(),
            payload: QuestionPayload::SingleChoice {
                options: vec![ChoiceOption {
                    id: OptionId::new("o1"),
                    text: "A".into(),
                    is_correct: false,
                }],
            },
        }],
        submission: None,
    }
}

fn build_answers() -> AnswerMap {
    let mut answers = AnswerMap::new();
    answers.insert(
        QuestionId::new("q1"),
        AnswerValue::single(OptionId::new("o1")),
    );
    answers
}

#[tokio::test]
async fn sqlite_round_trips_all_four_records() {
    let cache = SqliteCache::connect("sqlite:file:memdb_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    cache.migrate().await.expect("migrate");

    let test_id = TestId::new("t1");
    let bundle = build_bundle(&test_id);
    let answers = build_answers();
    let started_at = fixed_now();
    let deadline = fixed_now() + Duration::minutes(30);

    cache.save_bundle(&test_id, &bundle).await.unwrap();
    cache.save_answers(&test_id, &answers).await.unwrap();
    cache.save_started_at(&test_id, started_at).await.unwrap();
    cache.save_deadline(&test_id, deadline).await.unwrap();

    let cached = cache.load(&test_id).await.unwrap();
    assert_eq!(cached.bundle, Some(bundle));
    assert_eq!(cached.answers, Some(answers));
    assert_eq!(cached.started_at, Some(started_at));
    assert_eq!(cached.deadline, Some(deadline));
}

#[tokio::test]
async fn sqlite_clear_drops_every_record_at_once() {
    let cache = SqliteCache::connect("sqlite:file:memdb_clear?mode=memory&cache=shared")
        .await
        .expect("connect");
    cache.migrate().await.expect("migrate");

    let test_id = TestId::new("t1");
    cache
        .save_bundle(&test_id, &build_bundle(&test_id))
        .await
        .unwrap();
    cache.save_answers(&test_id, &build_answers()).await.unwrap();

    cache.clear(&test_id).await.unwrap();
    let cached = cache.load(&test_id).await.unwrap();
    assert!(cached.is_empty());
}

#[tokio::test]
async fn sqlite_scopes_records_by_test_id() {
    let cache = SqliteCache::connect("sqlite:file:memdb_scoped?mode=memory&cache=shared")
        .await
        .expect("connect");
    cache.migrate().await.expect("migrate");

    let first = TestId::new("t1");
    let second = TestId::new("t2");
    cache.save_answers(&first, &build_answers()).await.unwrap();

    assert!(cache.load(&second).await.unwrap().is_empty());

    // replacing the snapshot is last-write-wins, never a merge
    let mut replaced = AnswerMap::new();
    replaced.insert(
        QuestionId::new("q1"),
        AnswerValue::single(OptionId::new("o2")),
    );
    cache.save_answers(&first, &replaced).await.unwrap();
    assert_eq!(cache.load(&first).await.unwrap().answers, Some(replaced));
}
