//! End-to-end response pipeline tests with mocked generation backends

use std::sync::{Arc, Mutex};
use std::time::Duration;

use helpdesk_gateway::db::KnowledgeRepo;
use helpdesk_gateway::knowledge::rank;
use helpdesk_gateway::pipeline::normalize;
use helpdesk_gateway::prompt::{
    GREETING_MESSAGE, HOSTED_SYSTEM_PROMPT, LOCAL_SYSTEM_PROMPT, REFUSAL_MESSAGE, apology_reply,
};
use helpdesk_gateway::{BackendKind, KnowledgeEntry, KnowledgeStore, Pipeline, Resolution};

mod common;
use common::{Behavior, CallLog, MockBackend, entry, setup_test_db};

const TIMEOUT: Duration = Duration::from_secs(2);

const REFUND_NO_KNOWLEDGE: &str = "- I don't have that information yet in my knowledge base.\n- Please contact us directly at info@kenmarkitan.com or visit our website for more details.";

fn hosting_corpus() -> Arc<dyn KnowledgeStore> {
    Arc::new(vec![entry(
        "Services",
        Some("hosting"),
        "We offer web hosting and VPS hosting.",
    )])
}

fn empty_corpus() -> Arc<dyn KnowledgeStore> {
    Arc::new(Vec::<KnowledgeEntry>::new())
}

fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

#[tokio::test]
async fn test_forbidden_input_is_refused() {
    let log = new_log();
    let local = MockBackend::new("local", Behavior::Reply("should not run"), &log);
    let pipeline = Pipeline::new(hosting_corpus(), 5).with_local(local.clone(), TIMEOUT);

    for input in ["fuck this", "Do you host PORN sites?", "hello, nude pics?"] {
        assert_eq!(pipeline.respond(input).await, REFUSAL_MESSAGE);
    }
    assert_eq!(local.calls(), 0);
}

#[tokio::test]
async fn test_small_talk_makes_no_backend_calls() {
    let log = new_log();
    let local = MockBackend::new("local", Behavior::Reply("x"), &log);
    let hosted = MockBackend::new("hosted", Behavior::Reply("x"), &log);
    let pipeline = Pipeline::new(hosting_corpus(), 5)
        .with_local(local.clone(), TIMEOUT)
        .with_hosted(hosted.clone(), TIMEOUT);

    for input in ["Hello", "good evening!", "how are you?", "What's up"] {
        let reply = pipeline.respond_detailed(input).await;
        assert_eq!(reply.text, GREETING_MESSAGE);
        assert_eq!(reply.resolution, Resolution::SmallTalk);
    }
    assert_eq!(local.calls(), 0);
    assert_eq!(hosted.calls(), 0);
}

#[tokio::test]
async fn test_extractive_fallback_when_models_fail() {
    let log = new_log();
    let local = MockBackend::new("local", Behavior::Fail, &log);
    let hosted = MockBackend::new("hosted", Behavior::Malformed, &log);
    let pipeline = Pipeline::new(hosting_corpus(), 5)
        .with_local(local.clone(), TIMEOUT)
        .with_hosted(hosted.clone(), TIMEOUT);

    let reply = pipeline.respond_detailed("Do you offer hosting?").await;

    assert_eq!(reply.text, "- We offer web hosting and VPS hosting.");
    assert_eq!(reply.resolution, Resolution::Extractive);
    assert_eq!(*log.lock().unwrap(), vec!["local", "hosted"]);

    let kinds: Vec<BackendKind> = reply.attempts.iter().map(|a| a.backend).collect();
    assert_eq!(
        kinds,
        vec![BackendKind::Local, BackendKind::Hosted, BackendKind::Extractive]
    );
    assert!(!reply.attempts[0].succeeded);
    assert!(!reply.attempts[1].succeeded);
    assert!(reply.attempts[2].succeeded);
}

#[tokio::test]
async fn test_extractive_without_any_backend() {
    let pipeline = Pipeline::new(hosting_corpus(), 5);
    assert_eq!(
        pipeline.respond("Do you offer hosting?").await,
        "- We offer web hosting and VPS hosting."
    );
}

#[tokio::test]
async fn test_empty_corpus_without_hosted_backend() {
    let log = new_log();
    let local = MockBackend::new("local", Behavior::Reply("invented answer"), &log);
    let pipeline = Pipeline::new(empty_corpus(), 5).with_local(local.clone(), TIMEOUT);

    let reply = pipeline.respond_detailed("What is your refund policy?").await;

    assert_eq!(reply.text, REFUND_NO_KNOWLEDGE);
    assert_eq!(reply.resolution, Resolution::NoKnowledge);
    assert_eq!(local.calls(), 0);
}

#[tokio::test]
async fn test_empty_corpus_uses_hosted_with_raw_query() {
    let log = new_log();
    let hosted = MockBackend::new("hosted", Behavior::Reply("Refunds take 7 days."), &log);
    let pipeline = Pipeline::new(empty_corpus(), 5).with_hosted(hosted.clone(), TIMEOUT);

    let reply = pipeline.respond_detailed("What is your refund policy?").await;

    assert_eq!(reply.text, "- Refunds take 7 days.");
    assert_eq!(reply.resolution, Resolution::Hosted);

    let prompt = hosted.last_prompt().unwrap();
    assert_eq!(prompt.system, HOSTED_SYSTEM_PROMPT);
    assert!(prompt.user.contains("What is your refund policy?"));
    assert!(!prompt.user.contains("knowledge base:"));
}

#[tokio::test]
async fn test_local_failure_falls_back_to_hosted_once() {
    let log = new_log();
    let local = MockBackend::new("local", Behavior::Fail, &log);
    let hosted = MockBackend::new("hosted", Behavior::Reply("Yes, we provide 24/7 support."), &log);
    let corpus: Arc<dyn KnowledgeStore> = Arc::new(vec![entry(
        "Support",
        Some("Do you provide support?"),
        "Support is available around the clock.",
    )]);
    let pipeline = Pipeline::new(corpus, 5)
        .with_local(local.clone(), TIMEOUT)
        .with_hosted(hosted.clone(), TIMEOUT);

    let reply = pipeline.respond_detailed("Do you provide support?").await;

    assert_eq!(reply.text, "- Yes, we provide 24/7 support.");
    assert_eq!(reply.resolution, Resolution::Hosted);
    assert_eq!(local.calls(), 1);
    assert_eq!(hosted.calls(), 1);
    assert_eq!(*log.lock().unwrap(), vec!["local", "hosted"]);
}

#[tokio::test]
async fn test_local_success_gets_grounded_prompt() {
    let log = new_log();
    let local = MockBackend::new(
        "local",
        Behavior::Reply("We offer web hosting. We also offer VPS hosting."),
        &log,
    );
    let hosted = MockBackend::new("hosted", Behavior::Reply("unused"), &log);
    let pipeline = Pipeline::new(hosting_corpus(), 5)
        .with_local(local.clone(), TIMEOUT)
        .with_hosted(hosted.clone(), TIMEOUT);

    let reply = pipeline.respond_detailed("Do you offer hosting?").await;

    assert_eq!(
        reply.text,
        "- We offer web hosting.\n- We also offer VPS hosting."
    );
    assert_eq!(reply.resolution, Resolution::Local);
    assert_eq!(hosted.calls(), 0);
    assert_eq!(reply.sources.len(), 1);

    let prompt = local.last_prompt().unwrap();
    assert_eq!(prompt.system, LOCAL_SYSTEM_PROMPT);
    assert!(prompt.user.contains("[1] Category: Services"));
    assert!(prompt.user.contains("Content: We offer web hosting and VPS hosting."));
    assert!(prompt.user.contains("User Question: Do you offer hosting?"));
}

#[tokio::test]
async fn test_bulleted_backend_output_passes_through() {
    let log = new_log();
    let local = MockBackend::new("local", Behavior::Reply("- Web hosting\n- VPS hosting"), &log);
    let pipeline = Pipeline::new(hosting_corpus(), 5).with_local(local, TIMEOUT);

    assert_eq!(
        pipeline.respond("Do you offer hosting?").await,
        "- Web hosting\n- VPS hosting"
    );
}

#[tokio::test]
async fn test_slow_backend_times_out_and_advances() {
    let log = new_log();
    let local = MockBackend::new("local", Behavior::Hang(Duration::from_secs(30)), &log);
    let hosted = MockBackend::new("hosted", Behavior::Reply("Hosting is available."), &log);
    let pipeline = Pipeline::new(hosting_corpus(), 5)
        .with_local(local.clone(), Duration::from_millis(50))
        .with_hosted(hosted.clone(), TIMEOUT);

    let reply = tokio::time::timeout(
        Duration::from_secs(5),
        pipeline.respond_detailed("Do you offer hosting?"),
    )
    .await
    .expect("pipeline must not wait on a hung backend");

    assert_eq!(reply.text, "- Hosting is available.");
    assert_eq!(reply.resolution, Resolution::Hosted);
    assert!(
        reply.attempts[0]
            .error
            .as_deref()
            .unwrap()
            .contains("timed out")
    );
}

#[tokio::test]
async fn test_panicking_local_backend_falls_through_to_hosted() {
    let log = new_log();
    let local = MockBackend::new("local", Behavior::Panic, &log);
    let hosted = MockBackend::new("hosted", Behavior::Reply("Hosting is available."), &log);
    let pipeline = Pipeline::new(hosting_corpus(), 5)
        .with_local(local, TIMEOUT)
        .with_hosted(hosted.clone(), TIMEOUT);

    let reply = pipeline.respond_detailed("Do you offer hosting?").await;
    assert_eq!(reply.resolution, Resolution::Hosted);
    assert_eq!(reply.text, "- Hosting is available.");
    assert_eq!(hosted.calls(), 1);
    assert!(!reply.attempts[0].succeeded);
}

#[tokio::test]
async fn test_panicking_backends_fall_through_to_extractive() {
    let log = new_log();
    let local = MockBackend::new("local", Behavior::Panic, &log);
    let hosted = MockBackend::new("hosted", Behavior::Panic, &log);
    let pipeline = Pipeline::new(hosting_corpus(), 5)
        .with_local(local, TIMEOUT)
        .with_hosted(hosted, TIMEOUT);

    let reply = pipeline.respond_detailed("Do you offer hosting?").await;
    assert_eq!(reply.resolution, Resolution::Extractive);
    assert_eq!(reply.text, "- We offer web hosting and VPS hosting.");
    assert_ne!(reply.text, apology_reply());
}

#[tokio::test]
async fn test_unexpected_local_error_still_tries_hosted() {
    let log = new_log();
    let local = MockBackend::new("local", Behavior::Broken, &log);
    let hosted = MockBackend::new("hosted", Behavior::Reply("Ok1"), &log);
    let pipeline = Pipeline::new(hosting_corpus(), 5)
        .with_local(local.clone(), TIMEOUT)
        .with_hosted(hosted.clone(), TIMEOUT);

    let reply = pipeline.respond_detailed("Do you offer hosting?").await;
    assert_eq!(reply.resolution, Resolution::Hosted);
    assert_eq!(reply.text, "- Ok1");
    assert_eq!(*log.lock().unwrap(), vec!["local", "hosted"]);
    assert!(
        reply.attempts[0]
            .error
            .as_deref()
            .unwrap()
            .contains("broken pipe")
    );
}

#[tokio::test]
async fn test_responses_are_never_empty_and_idempotent_under_normalize() {
    let log = new_log();
    let local = MockBackend::new("local", Behavior::Fail, &log);
    let pipeline = Pipeline::new(hosting_corpus(), 5).with_local(local, TIMEOUT);

    for input in [
        "Do you offer hosting?",
        "What is your refund policy?",
        "",
        "   ",
        "xyz",
    ] {
        let text = pipeline.respond(input).await;
        assert!(!text.trim().is_empty(), "empty reply for {input:?}");
        if text != REFUSAL_MESSAGE {
            assert_eq!(normalize(&text), text);
        }
    }
}

#[tokio::test]
async fn test_pipeline_over_sqlite_corpus() {
    let repo = KnowledgeRepo::new(setup_test_db());
    repo.upsert(
        "Services",
        Some("What do you build?"),
        "We build mobile apps. We also design websites.",
        helpdesk_gateway::KnowledgeSource::Excel,
        &serde_json::Value::Null,
    )
    .unwrap();
    repo.upsert(
        "Contact",
        Some("Where are you?"),
        "Our office is in Mumbai.",
        helpdesk_gateway::KnowledgeSource::Excel,
        &serde_json::Value::Null,
    )
    .unwrap();

    let corpus = repo.list_knowledge().unwrap();
    let ranked = rank("mobile apps", &corpus, 5);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].category, "Services");

    let pipeline = Pipeline::new(Arc::new(repo), 5);
    assert_eq!(
        pipeline.respond("mobile apps").await,
        "- We build mobile apps."
    );
}
