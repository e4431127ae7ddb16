use portal_core::model::{
    AnswerMap, AnswerValue, AssessmentId, CourseId, LearnerId, LessonId, ModuleId, OptionId,
    ProgressUpdate, QuestionId,
};
use portal_core::time::fixed_now;
use storage::repository::{AssessmentRepository, ProgressRepository, StorageError};
use storage::sqlite::SqliteRepository;

fn update(max: f64, seek: f64, percent: u8, completed: bool) -> ProgressUpdate {
    ProgressUpdate {
        learner_id: LearnerId::new("u1"),
        course_id: CourseId::new("c1"),
        module_id: ModuleId::new("m1"),
        lesson_id: LessonId::new("l1"),
        seek_position: seek,
        max_watched_second: max,
        percent,
        is_completed: completed,
    }
}

fn sample_answers() -> AnswerMap {
    let mut answers = AnswerMap::new();
    answers.insert(QuestionId::new("q1"), AnswerValue::Option(OptionId::new("a")));
    answers.insert(
        QuestionId::new("q2"),
        AnswerValue::Options(vec![OptionId::new("b"), OptionId::new("c")]),
    );
    answers.insert(QuestionId::new("q3"), AnswerValue::Text("hello".into()));
    answers
}

#[tokio::test]
async fn sqlite_progress_merges_instead_of_overwriting() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_progress?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.write_progress(&update(120.0, 120.0, 20, false), fixed_now())
        .await
        .unwrap();
    // A reordered delivery with a smaller high-water mark must not win.
    repo.write_progress(&update(40.0, 40.0, 5, false), fixed_now())
        .await
        .unwrap();

    let stored = repo
        .read_progress(
            &LearnerId::new("u1"),
            &CourseId::new("c1"),
            &ModuleId::new("m1"),
            &LessonId::new("l1"),
        )
        .await
        .unwrap()
        .expect("record exists");
    assert_eq!(stored.max_watched_second(), 120.0);
    assert_eq!(stored.seek_position(), 40.0);
    assert_eq!(stored.percent(), 20);
    assert!(!stored.is_completed());
}

#[tokio::test]
async fn sqlite_progress_completion_never_regresses() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_completion?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.write_progress(&update(500.0, 500.0, 85, true), fixed_now())
        .await
        .unwrap();
    repo.write_progress(&update(510.0, 510.0, 86, false), fixed_now())
        .await
        .unwrap();

    let stored = repo
        .read_progress(
            &LearnerId::new("u1"),
            &CourseId::new("c1"),
            &ModuleId::new("m1"),
            &LessonId::new("l1"),
        )
        .await
        .unwrap()
        .expect("record exists");
    assert!(stored.is_completed());
    assert_eq!(stored.percent(), 100);
    assert_eq!(stored.max_watched_second(), 510.0);

    let listed = repo
        .list_course_progress(&LearnerId::new("u1"), &CourseId::new("c1"))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn sqlite_draft_round_trips_answer_shapes() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_draft?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let learner = LearnerId::new("u1");
    let assessment = AssessmentId::new("a1");
    let answers = sample_answers();

    repo.save_draft(&learner, &assessment, &answers, fixed_now())
        .await
        .unwrap();

    let draft = repo
        .read_draft(&learner, &assessment)
        .await
        .unwrap()
        .expect("draft exists");
    assert_eq!(draft.answers, answers);
    assert_eq!(draft.last_saved_at, fixed_now());
}

#[tokio::test]
async fn sqlite_submission_is_one_shot_and_supersedes_draft() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_submit?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let learner = LearnerId::new("u1");
    let assessment = AssessmentId::new("a1");
    let answers = sample_answers();

    repo.save_draft(&learner, &assessment, &answers, fixed_now())
        .await
        .unwrap();
    let submission = repo
        .submit_assessment(&learner, &assessment, &answers, fixed_now())
        .await
        .unwrap();
    assert_eq!(submission.answers, answers);

    // Draft is gone, further drafts and submissions are rejected.
    assert!(
        repo.read_draft(&learner, &assessment)
            .await
            .unwrap()
            .is_none()
    );
    assert!(matches!(
        repo.save_draft(&learner, &assessment, &answers, fixed_now())
            .await
            .unwrap_err(),
        StorageError::Conflict
    ));
    assert!(matches!(
        repo.submit_assessment(&learner, &assessment, &answers, fixed_now())
            .await
            .unwrap_err(),
        StorageError::Conflict
    ));

    let stored = repo
        .read_submission(&learner, &assessment)
        .await
        .unwrap()
        .expect("submission exists");
    assert_eq!(stored.answers, answers);
}
