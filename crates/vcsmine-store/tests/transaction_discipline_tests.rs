// Integration tests for write-path discipline
// Covers rollback on failure, capability gating and the delete policy

use chrono::{DateTime, Utc};
use vcsmine_core::core_types::schema::{EVENT_ROLLBACK_FAILED, EVENT_SKIPPED};
use vcsmine_core::logging_facility::init_test_capture;
use vcsmine_core::{Branch, Commit, Entity, ExErrorKind, Identity};
use vcsmine_store::testing::{Call, ScriptedSession, SessionRecorder};
use vcsmine_store::{
    Adapter, BranchAdapter, Capability, CommitAdapter, DeletePolicy, HandleOptions,
    IdentityAdapter, StoreHandle,
};

fn at(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap()
}

fn scripted_store(options: HandleOptions) -> (StoreHandle, SessionRecorder) {
    let (session, recorder) = ScriptedSession::new();
    let handle = StoreHandle::with_session(Box::new(session), options);
    CommitAdapter::new(&handle).create_scheme().unwrap();
    IdentityAdapter::new(&handle).create_scheme().unwrap();
    BranchAdapter::new(&handle).create_scheme().unwrap();
    recorder.clear();
    (handle, recorder)
}

#[test]
fn test_backend_error_during_save_rolls_back_once() {
    // Given: the commit insert statement fails
    let (handle, recorder) = scripted_store(HandleOptions::default());
    recorder.fail_sql_containing("INSERT INTO commits");
    let adapter = CommitAdapter::new(&handle);
    let mut commits = vec![Commit::new("a", at(1)), Commit::new("b", at(2))];

    // When: the batch is saved
    let err = adapter.save(&mut commits).unwrap_err();

    // Then: the original backend error is returned after exactly one rollback
    assert_eq!(err.kind(), ExErrorKind::Backend);
    assert!(err.message().contains("INSERT INTO commits"));
    assert_eq!(recorder.rollbacks(), 1);
    assert_eq!(recorder.commits(), 0);

    // And: the batch stopped at the first failure
    let inserts = recorder
        .statements()
        .iter()
        .filter(|sql| sql.starts_with("INSERT INTO commits"))
        .count();
    assert_eq!(inserts, 1);

    // And: no entity received an identifier
    assert!(commits.iter().all(|c| !c.is_persisted()));
}

#[test]
fn test_rollback_failure_does_not_mask_write_failure() {
    // Given: both the write and the rollback fail
    let capture = init_test_capture();
    let (handle, recorder) = scripted_store(HandleOptions::default());
    recorder.fail_sql_containing("INSERT INTO identities");
    recorder.fail_rollback();
    let adapter = IdentityAdapter::new(&handle);
    let mut identities = vec![Identity::new("Ada")];

    // When: the identity is saved
    let err = adapter.save(&mut identities).unwrap_err();

    // Then: the write failure is what the caller sees
    assert_eq!(err.kind(), ExErrorKind::Backend);
    assert!(err.message().contains("INSERT INTO identities"));
    assert_eq!(recorder.rollbacks(), 1);

    // And: the rollback failure was reported
    assert!(!capture.find("save", EVENT_ROLLBACK_FAILED).is_empty());
}

#[test]
fn test_failed_commit_is_reported_and_ids_stay_unset() {
    let (handle, recorder) = scripted_store(HandleOptions::default());
    recorder.fail_commit();
    let adapter = BranchAdapter::new(&handle);
    let mut branches = vec![Branch::new("main", at(1))];

    let err = adapter.save(&mut branches).unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::Backend);
    assert_eq!(recorder.rollbacks(), 1);
    assert!(!branches[0].is_persisted());
}

#[test]
fn test_failed_batch_leaves_store_unchanged() {
    let (handle, recorder) = scripted_store(HandleOptions::default());
    let adapter = CommitAdapter::new(&handle);
    let mut first = vec![Commit::new("kept", at(1))];
    adapter.save(&mut first).unwrap();

    // The second insert of the next batch fails
    recorder.fail_sql_containing_after("INSERT INTO commits", 1);
    let mut batch = vec![Commit::new("fine", at(2)), Commit::new("doomed", at(3))];
    assert!(adapter.save(&mut batch).is_err());

    let stored = handle
        .read(|s| s.query_i64("SELECT COUNT(*) FROM commits", &[]))
        .unwrap();
    assert_eq!(stored, Some(1));
}

#[test]
fn test_delete_unsaved_entity_logs_and_skips() {
    // Given: a commit that was never saved
    let capture = init_test_capture();
    let (handle, recorder) = scripted_store(HandleOptions::default());
    let adapter = CommitAdapter::new(&handle);
    let unsaved = Commit::new("never-saved", at(1));
    assert_eq!(unsaved.raw_id(), -1);

    // When: it is deleted
    let removed = adapter.delete(&unsaved).unwrap();

    // Then: nothing happened at the backend
    assert!(!removed);
    assert!(recorder.calls().is_empty());

    // And: a warning was logged
    let skipped = capture.find("delete", EVENT_SKIPPED);
    assert!(skipped
        .iter()
        .any(|e| e.field("entity") == Some("commit") && e.level == tracing::Level::WARN));
}

#[test]
fn test_delete_unsaved_entity_rejected_by_policy() {
    let options = HandleOptions {
        delete_policy: DeletePolicy::Reject,
        ..HandleOptions::default()
    };
    let (handle, recorder) = scripted_store(options);

    let err = CommitAdapter::new(&handle)
        .delete(&Commit::new("never-saved", at(1)))
        .unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::InvalidArgument);
    assert_eq!(err.entity_id(), Some(-1));
    assert!(recorder.calls().is_empty());
}

#[test]
fn test_mixed_delete_batch_skips_only_unsaved() {
    let (handle, _recorder) = scripted_store(HandleOptions::default());
    let adapter = CommitAdapter::new(&handle);
    let mut saved = vec![Commit::new("saved", at(1))];
    adapter.save(&mut saved).unwrap();

    let batch = vec![saved[0].clone(), Commit::new("unsaved", at(2))];
    assert_eq!(adapter.delete_all(&batch).unwrap(), 1);
    assert!(adapter.load_all().unwrap().is_empty());
}

#[test]
fn test_unsupported_branch_operations_never_reach_backend() {
    // Given: a saved branch
    let (handle, recorder) = scripted_store(HandleOptions::default());
    let adapter = BranchAdapter::new(&handle);
    let mut branches = vec![Branch::new("main", at(1))];
    adapter.save(&mut branches).unwrap();
    recorder.clear();

    // When / Then: update, delete and indexes are unsupported
    let update = adapter.update(&mut branches).unwrap_err();
    assert_eq!(update.kind(), ExErrorKind::Unsupported);
    assert_eq!(update.op(), Some("update"));

    let delete = adapter.delete(&branches[0]).unwrap_err();
    assert_eq!(delete.kind(), ExErrorKind::Unsupported);

    let indexes = adapter.create_indexes().unwrap_err();
    assert_eq!(indexes.kind(), ExErrorKind::Unsupported);

    // Saving an already saved branch would be an update
    let resave = adapter.save(&mut branches).unwrap_err();
    assert_eq!(resave.kind(), ExErrorKind::Unsupported);

    assert!(recorder.calls().is_empty());
    assert!(!adapter.supports(Capability::Delete));
    assert!(adapter.supports(Capability::LoadByIds));
}

#[test]
fn test_write_batch_is_one_transaction() {
    let (handle, recorder) = scripted_store(HandleOptions::default());
    let adapter = CommitAdapter::new(&handle);
    let mut commits: Vec<Commit> = (0..4).map(|i| Commit::new(format!("r{}", i), at(i))).collect();

    adapter.save(&mut commits).unwrap();

    let calls = recorder.calls();
    assert_eq!(calls.first(), Some(&Call::Begin));
    assert_eq!(calls.last(), Some(&Call::Commit));
    assert_eq!(calls.iter().filter(|c| **c == Call::Begin).count(), 1);
    assert_eq!(recorder.rollbacks(), 0);
}

#[test]
fn test_reads_do_not_open_transactions() {
    let (handle, recorder) = scripted_store(HandleOptions::default());
    CommitAdapter::new(&handle).load_all().unwrap();
    assert!(recorder
        .calls()
        .iter()
        .all(|c| matches!(c, Call::Query(_))));
}
