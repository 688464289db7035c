//! Integration tests for collection reads and writes

mod support;

use std::collections::HashSet;

use http::StatusCode;
use serde_json::json;
use common::tag::MAX_LABEL_LEN;
use store::prelude::*;
use store::transport::{Call, IssueState, NewIssue, Operation, StateFilter};
use support::{doc, options, reopen, setup, setup_with, DB, REPO};

fn label(collection: &str) -> String {
    PartitionTag::new(DB, collection).encrypt(&Identity).unwrap()
}

#[tokio::test]
async fn test_find_empty() {
    let store = setup();
    let users = store.collection("users").unwrap();

    assert!(users.find().await.unwrap().is_empty());
    assert_eq!(store.transport().count(Operation::ListIssues), 1);
}

#[tokio::test]
async fn test_insert_then_find() {
    let store = setup();
    let test = store.collection("test").unwrap();

    let inserted = test
        .insert(doc(json!({ "testkey": "testvalue" })))
        .await
        .unwrap();
    assert_eq!(inserted.len(), 1);
    let id = inserted[0].id().unwrap();
    assert_eq!(inserted[0]["testkey"], "testvalue");

    let found = test.find().await.unwrap();
    assert_eq!(found, vec![doc(json!({ "testkey": "testvalue", "$id": id }))]);
}

#[tokio::test]
async fn test_created_issue_layout() {
    let store = setup();
    let test = store.collection("test").unwrap();

    let inserted = test
        .insert(doc(json!({ "$id": 99, "k": "v" })))
        .await
        .unwrap();

    let milestone = store.namespace().await.unwrap();
    let issue = store
        .transport()
        .issue(REPO, inserted[0].id().unwrap())
        .unwrap();
    assert_ne!(inserted[0].id(), Some(99));
    assert_eq!(issue.body.as_deref(), Some(r#"{"k":"v"}"#));
    assert_eq!(issue.labels.len(), 1);
    assert_eq!(issue.labels[0].name, label("test"));
    assert_eq!(issue.milestone, Some(milestone));

    let title: u32 = issue.title.parse().unwrap();
    assert!((1..=100).contains(&title));
}

#[tokio::test]
async fn test_find_filters_by_namespace_tag_and_state() {
    let store = setup();
    let test = store.collection("test").unwrap();
    test.find().await.unwrap();

    let milestone = store.namespace().await.unwrap();
    let query = store
        .transport()
        .calls()
        .into_iter()
        .find_map(|call| match call {
            Call::ListIssues { query, .. } => Some(query),
            _ => None,
        })
        .unwrap();

    assert_eq!(query.milestone, milestone.number);
    assert_eq!(query.labels, vec![label("test")]);
    assert_eq!(query.state, StateFilter::Open);
    assert_eq!(query.per_page, 100);
    assert_eq!(query.page, 0);
}

#[tokio::test]
async fn test_collections_are_disjoint() {
    let store = setup();
    let users = store.collection("users").unwrap();
    let posts = store.collection("posts").unwrap();

    users.insert(doc(json!({ "name": "a" }))).await.unwrap();
    posts.insert(doc(json!({ "title": "b" }))).await.unwrap();

    let found = users.find().await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], "a");

    let other_db = reopen(&store, options().with_db_name("otherdb"));
    let users = other_db.collection("users").unwrap();
    assert!(users.find().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_find_walks_every_page() {
    let store = setup();
    let test = store.collection("test").unwrap();
    let docs: Vec<Document> = (0..250).map(|n| doc(json!({ "n": n }))).collect();
    test.insert(docs).await.unwrap();
    store.transport().reset_calls();

    let found = test.find().await.unwrap();

    // pages 0, 2 and 3: page 0 is served as page 1 and links to page 2, and
    // the last page carries no `next`, so no trailing empty page is needed
    assert_eq!(found.len(), 250);
    let ids: HashSet<u64> = found.iter().filter_map(Document::id).collect();
    assert_eq!(ids.len(), 250);
    assert_eq!(store.transport().count(Operation::ListIssues), 3);
}

#[tokio::test]
async fn test_find_fails_on_page_error() {
    let store = setup();
    let test = store.collection("test").unwrap();
    let docs: Vec<Document> = (0..150).map(|n| doc(json!({ "n": n }))).collect();
    test.insert(docs).await.unwrap();

    store.transport().fail_after(
        Operation::ListIssues,
        1,
        TransportError::Status(StatusCode::BAD_GATEWAY, "bad gateway".into()),
    );

    let err = test.find().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
}

#[tokio::test]
async fn test_insert_many_keeps_order() {
    let store = setup();
    let test = store.collection("test").unwrap();

    let inserted = test
        .insert(vec![
            doc(json!({ "n": 1 })),
            doc(json!({ "n": 2 })),
            doc(json!({ "n": 3 })),
        ])
        .await
        .unwrap();

    let ns: Vec<_> = inserted.iter().map(|d| d["n"].clone()).collect();
    assert_eq!(ns, vec![json!(1), json!(2), json!(3)]);
    let ids: HashSet<u64> = inserted.iter().filter_map(Document::id).collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(store.transport().count(Operation::CreateIssue), 3);
}

#[tokio::test]
async fn test_insert_leaves_caller_documents_alone() {
    let store = setup();
    let test = store.collection("test").unwrap();
    let docs = vec![doc(json!({ "a": 1 })), doc(json!({ "b": 2 }))];

    test.insert(docs.as_slice()).await.unwrap();

    assert_eq!(docs, vec![doc(json!({ "a": 1 })), doc(json!({ "b": 2 }))]);
}

#[tokio::test]
async fn test_insert_each_reports_partial_failure() {
    let store = setup();
    let test = store.collection("test").unwrap();
    store.transport().fail_after(
        Operation::CreateIssue,
        2,
        TransportError::Status(StatusCode::FORBIDDEN, "rate limited".into()),
    );
    let docs: Vec<Document> = (0..4).map(|n| doc(json!({ "n": n }))).collect();

    let outcome = test.insert_each(docs.clone()).await.unwrap();

    assert_eq!(outcome.len(), 4);
    assert!(!outcome.is_success());
    assert_eq!(outcome.succeeded().count(), 2);
    assert_eq!(outcome.failures().count(), 2);
    // no rollback
    assert_eq!(store.transport().issues(REPO).len(), 2);

    let err = test.insert(docs).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
}

#[tokio::test]
async fn test_update_overwrites_body() {
    let store = setup();
    let test = store.collection("test").unwrap();
    let inserted = test.insert(doc(json!({ "k": "v1" }))).await.unwrap();
    let id = inserted[0].id().unwrap();

    let mut changed = inserted[0].clone();
    changed.insert("k", "v2");
    let updated = test.update(changed).await.unwrap();

    assert_eq!(updated, vec![doc(json!({ "k": "v2", "$id": id }))]);
    let patch = store
        .transport()
        .calls()
        .into_iter()
        .find_map(|call| match call {
            Call::UpdateIssue { number, patch, .. } => Some((number, patch)),
            _ => None,
        })
        .unwrap();
    assert_eq!(patch.0, id);
    assert_eq!(patch.1.body, r#"{"k":"v2"}"#);
    assert_eq!(patch.1.state, IssueState::Open);

    assert_eq!(test.find().await.unwrap(), updated);
}

#[tokio::test]
async fn test_update_requires_id() {
    let store = setup();
    let test = store.collection("test").unwrap();

    let err = test.update(doc(json!({ "k": "v" }))).await.unwrap_err();

    assert_eq!(err, StoreError::Codec(CodecError::MissingId));
    assert_eq!(store.transport().count(Operation::UpdateIssue), 0);
}

#[tokio::test]
async fn test_update_unknown_issue() {
    let store = setup();
    let test = store.collection("test").unwrap();

    let err = test
        .update(doc(json!({ "$id": 42, "k": "v" })))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn test_remove_closes_issue() {
    let store = setup();
    let test = store.collection("test").unwrap();
    let inserted = test
        .insert([doc(json!({ "n": 1 })), doc(json!({ "n": 2 }))])
        .await
        .unwrap();

    test.remove(inserted[0].clone()).await.unwrap();

    let found = test.find().await.unwrap();
    assert_eq!(found, vec![inserted[1].clone()]);
    let closed = store
        .transport()
        .issue(REPO, inserted[0].id().unwrap())
        .unwrap();
    assert_eq!(closed.state, IssueState::Closed);
}

#[tokio::test]
async fn test_remove_each_reports_missing_id() {
    let store = setup();
    let test = store.collection("test").unwrap();
    let inserted = test.insert(doc(json!({ "n": 1 }))).await.unwrap();

    let outcome = test
        .remove_each(vec![inserted[0].clone(), doc(json!({ "n": 2 }))])
        .await
        .unwrap();

    assert_eq!(
        outcome.succeeded().copied().collect::<Vec<_>>(),
        vec![inserted[0].id().unwrap()]
    );
    let failures: Vec<_> = outcome.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, 1);
    assert_eq!(failures[0].1, &StoreError::Codec(CodecError::MissingId));
    assert!(test.find().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_undecodable_issue_fails_find() {
    let store = setup();
    let test = store.collection("test").unwrap();
    test.insert(doc(json!({ "ok": true }))).await.unwrap();
    let milestone = store.namespace().await.unwrap();
    store
        .transport()
        .add_issue(
            REPO,
            NewIssue {
                title: "1".into(),
                body: "not json".into(),
                labels: vec![label("test")],
                milestone: milestone.number,
            },
        )
        .unwrap();

    let err = test.find().await.unwrap_err();
    assert!(matches!(err, StoreError::Codec(CodecError::Json(_))));

    let lenient = reopen(&store, options().with_decode_policy(DecodePolicy::Skip));
    let found = lenient.collection("test").unwrap().find().await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["ok"], true);
}

#[tokio::test]
async fn test_legacy_tags() {
    let store = setup();
    let test = store.collection("test").unwrap();
    let current = test.insert(doc(json!({ "v": "current" }))).await.unwrap();

    let tag = PartitionTag::new(DB, "test");
    let legacy = tag.encrypt_legacy(&Identity).unwrap();
    let milestone = store.namespace().await.unwrap();
    let add = |labels: Vec<String>, body: &str| {
        store
            .transport()
            .add_issue(
                REPO,
                NewIssue {
                    title: "1".into(),
                    body: body.into(),
                    labels,
                    milestone: milestone.number,
                },
            )
            .unwrap()
    };
    let old = add(vec![legacy.clone()], r#"{"v":"legacy"}"#);
    let both = add(vec![label("test"), legacy], r#"{"v":"both"}"#);

    let found = test.find().await.unwrap();
    let ids: Vec<u64> = found.iter().filter_map(Document::id).collect();
    assert_eq!(ids.len(), 2);
    assert!(!ids.contains(&old.number));

    let found = test.find_with(TagFilter::WithLegacy).await.unwrap();
    let ids: Vec<u64> = found.iter().filter_map(Document::id).collect();
    assert_eq!(ids.len(), 3);
    for id in [current[0].id().unwrap(), old.number, both.number] {
        assert!(ids.contains(&id));
    }
}

#[tokio::test]
async fn test_secret_cipher_round_trip() {
    let secret = Secret::generate();
    let store = setup_with(options().with_secret(secret.clone()));
    let test = store.collection("test").unwrap();

    let inserted = test
        .insert(doc(json!({ "password": "hunter2" })))
        .await
        .unwrap();

    let issue = store
        .transport()
        .issue(REPO, inserted[0].id().unwrap())
        .unwrap();
    assert!(!issue.body.unwrap().contains("hunter2"));
    assert!(!issue.labels[0].name.contains(DB));
    assert!(issue.labels[0].name.len() <= MAX_LABEL_LEN);
    assert!(!store.transport().milestones(REPO)[0].title.contains(DB));

    let again = reopen(&store, options().with_secret(secret));
    let found = again.collection("test").unwrap().find().await.unwrap();
    assert_eq!(found, inserted);

    let wrong_key = reopen(&store, options().with_secret(Secret::generate()));
    assert!(wrong_key
        .collection("test")
        .unwrap()
        .find()
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_secret_cipher_with_long_names() {
    let store = setup_with(
        options()
            .with_db_name("a_database_with_a_long_name")
            .with_base64(false)
            .with_secret(Secret::generate()),
    );
    let test = store
        .collection("a_collection_with_an_even_longer_name")
        .unwrap();

    let inserted = test.insert(doc(json!({ "k": "v" }))).await.unwrap();

    assert_eq!(test.find().await.unwrap(), inserted);
    assert_eq!(
        test.find_with(TagFilter::WithLegacy).await.unwrap(),
        inserted
    );
}

#[tokio::test]
async fn test_overlong_label_fails_before_any_issue_call() {
    let store = setup();
    let test = store
        .collection("a_collection_name_that_is_far_too_long")
        .unwrap();

    let err = test.insert(doc(json!({ "k": "v" }))).await.unwrap_err();
    assert!(matches!(err, StoreError::Codec(CodecError::LabelTooLong(_))));

    let err = test.find().await.unwrap_err();
    assert!(matches!(err, StoreError::Codec(CodecError::LabelTooLong(_))));

    assert_eq!(store.transport().count(Operation::CreateIssue), 0);
    assert_eq!(store.transport().count(Operation::ListIssues), 0);
}

#[tokio::test]
async fn test_custom_cipher() {
    let reverse = |s: &str| s.chars().rev().collect::<String>();
    let store = setup_with(options().with_cipher(FnCipher::new(reverse, reverse)));
    let test = store.collection("test").unwrap();

    let inserted = test.insert(doc(json!({ "a": "b" }))).await.unwrap();

    let issue = store
        .transport()
        .issue(REPO, inserted[0].id().unwrap())
        .unwrap();
    assert_eq!(issue.body.as_deref(), Some(r#"}"b":"a"{"#));
    assert_eq!(test.find().await.unwrap(), inserted);
}
