use chat_core::{ChatEngine, EngineConfig, EngineError, ReplySource, ScriptedModel};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const LONG_QUESTION: &str = "please describe photosynthesis in green plants today";

fn quick_config() -> EngineConfig {
    EngineConfig {
        stream_delay_ms: 0,
        ..EngineConfig::default()
    }
}

fn engine(model: ScriptedModel) -> ChatEngine {
    let config = quick_config();
    let table = config.response_table().unwrap();
    ChatEngine::with_model(config, table, model).unwrap()
}

async fn ready_engine(model: ScriptedModel) -> ChatEngine {
    let engine = engine(model);
    assert!(engine.wait_until_ready().await);
    engine
}

#[tokio::test]
async fn short_greeting_stays_canned_when_model_is_ready() {
    let mut engine = ready_engine(ScriptedModel::new("should not be used")).await;
    let mut chunks = Vec::new();

    let reply = engine.resolve("Hello", |c| chunks.push(c.to_string())).await.unwrap();
    match reply.source {
        ReplySource::Canned { pattern, score } => {
            assert_eq!(pattern, "hello");
            assert!(score >= 35, "score was {score}");
        }
        other => panic!("expected a canned reply, got {:?}", other),
    }
    assert_eq!(chunks.last(), Some(&reply.text));
    assert_eq!(engine.context().snapshot(), vec!["hello"]);
}

#[tokio::test]
async fn slang_is_folded_before_matching() {
    let mut engine = engine(ScriptedModel::new("unused"));
    let reply = engine.resolve("thx!!", |_| {}).await.unwrap();
    assert!(matches!(reply.source, ReplySource::Canned { ref pattern, .. } if pattern == "thanks"));
}

#[tokio::test]
async fn unmatched_input_warms_up_while_model_loads() {
    let mut engine = engine(ScriptedModel::new("unused").failing_load("no weights"));
    let mut chunks: Vec<String> = Vec::new();

    let reply = engine
        .resolve("describe photosynthesis", |c| chunks.push(c.to_string()))
        .await
        .unwrap();
    assert_eq!(reply.source, ReplySource::WarmingUp);
    assert_eq!(reply.text, quick_config().warming_up_reply);
    assert!(chunks.is_empty());
    assert!(!engine.is_ready());
    assert_eq!(engine.context().len(), 1);
}

#[tokio::test]
async fn long_input_goes_to_the_generator() {
    let mut engine = ready_engine(ScriptedModel::new("Plants turn light into sugar")).await;
    let mut chunks = Vec::new();

    let reply = engine
        .resolve(LONG_QUESTION, |c| chunks.push(c.to_string()))
        .await
        .unwrap();
    assert_eq!(reply.source, ReplySource::Generated);
    assert_eq!(reply.text, "Plants turn light into sugar");
    assert_eq!(chunks.first().map(String::as_str), Some("Plants"));
    assert_eq!(chunks.len(), 5);
    assert_eq!(engine.context().snapshot(), vec![LONG_QUESTION]);
}

#[tokio::test]
async fn punctuation_only_input_gets_fallback() {
    let mut engine = ready_engine(ScriptedModel::new("unused")).await;
    let reply = engine.resolve("!!! ...", |_| {}).await.unwrap();
    assert_eq!(reply.source, ReplySource::EmptyInput);
    assert_eq!(reply.text, "I didn't catch that.");
}

#[tokio::test]
async fn context_keeps_last_five_utterances() {
    let mut engine = engine(ScriptedModel::new("unused"));
    for utterance in ["Hello", "thanks", "lol", "ok", "bye", "good night", "joke"] {
        engine.resolve(utterance, |_| {}).await.unwrap();
    }
    assert_eq!(
        engine.context().snapshot(),
        vec!["lol", "ok", "bye", "good night", "joke"]
    );
}

#[tokio::test]
async fn stop_ends_generation_with_last_partial() {
    let words = vec!["word"; 60].join(" ");
    let model = ScriptedModel::new(words).with_step_delay(Duration::from_millis(5));
    let mut engine = ready_engine(model).await;
    let stop = engine.stop_handle();

    let mut chunks: Vec<String> = Vec::new();
    let result = engine
        .resolve(LONG_QUESTION, |c| {
            if chunks.is_empty() {
                assert!(stop.stop());
            }
            chunks.push(c.to_string());
        })
        .await;

    match result {
        Err(EngineError::Aborted { partial }) => assert_eq!(Some(&partial), chunks.last()),
        other => panic!("expected abort, got {:?}", other),
    }
    assert!(chunks.len() < 60);
    // Aborted exchanges still count as conversation.
    assert_eq!(engine.context().len(), 1);

    // The generator is free for the next request.
    let reply = engine.resolve("Hello", |_| {}).await.unwrap();
    assert!(matches!(reply.source, ReplySource::Canned { .. }));
}

#[tokio::test]
async fn generation_failure_surfaces_detail() {
    let model = ScriptedModel::new("one two three").failing_at_step(2, "out of memory");
    let mut engine = ready_engine(model).await;

    match engine.resolve(LONG_QUESTION, |_| {}).await {
        Err(EngineError::Generation(detail)) => assert_eq!(detail, "out of memory"),
        other => panic!("expected a generation error, got {:?}", other),
    }
    assert!(engine.context().is_empty());
}

#[tokio::test]
async fn custom_table_from_config() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "synonyms": [{{ "canonical": "ping", "synonyms": ["knock knock"] }}],
            "patterns": [{{ "pattern": "ping", "replies": ["pong"] }}]
        }}"#
    )
    .unwrap();

    let config = EngineConfig {
        stream_delay_ms: 0,
        table_path: Some(file.path().to_path_buf()),
        ..EngineConfig::default()
    };
    let table = config.response_table().unwrap();
    let mut engine = ChatEngine::with_model(config, table, ScriptedModel::new("unused")).unwrap();

    let reply = engine.resolve("Knock knock!", |_| {}).await.unwrap();
    assert_eq!(reply.text, "pong");
}
