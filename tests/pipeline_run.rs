//! End-to-end runs of the pipeline against a mock feed and a mock chat service.
//!
//! Each test starts its own `MockServer` serving both the RSS feed and the
//! chat-completions endpoint, and writes its own prompt file, so tests are
//! isolated from the environment (`OPENAI_KEY`, `YML_CONFIG` are never read).

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use std::path::PathBuf;
use wiremock::matchers::{any, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use postwright::config::ModelSettings;
use postwright::pipeline::{DraftMode, ErrorKind, ErrorPolicy, Pipeline, PipelineError};

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Stories by Jane on Medium</title>
    <item>
      <title><![CDATA[Another Article]]></title>
      <category>Rust</category>
      <content:encoded><![CDATA[<p>Not this one.</p>]]></content:encoded>
      <guid isPermaLink="false">https://e/0</guid>
    </item>
    <item>
      <title>X</title>
      <category>Data</category>
      <category>Google-Cloud</category>
      <content:encoded><![CDATA[<p>Hi</p>]]></content:encoded>
      <guid isPermaLink="false">https://e/1</guid>
    </item>
  </channel>
</rss>"#;

const PROMPTS: &str =
    "writer_system_message: Write a LinkedIn post.\nreviewer_system_message: Pick the best post.\n";

fn prompts_file(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("postwright_pipeline_test_{name}"));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("system_prompts.yml");
    std::fs::write(&path, PROMPTS).unwrap();
    path
}

fn settings(server: &MockServer, name: &str, key: Option<&str>) -> ModelSettings {
    ModelSettings {
        api_base: server.uri(),
        model: "gpt-4o".to_string(),
        prompts_path: prompts_file(name),
        api_key: key.map(SecretString::from),
    }
}

fn chat_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    }))
}

async fn mount_feed(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/feed/@jane"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .mount(server)
        .await;
}

/// Writer calls answer "Draft one", "Draft two", "Draft three" in turn.
async fn mount_writer(server: &MockServer) {
    for reply in ["Draft one", "Draft two", "Draft three"] {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_string_contains("<article> X\\n<p>Hi</p> <article>"))
            .respond_with(chat_reply(reply))
            .up_to_n_times(1)
            .expect(1)
            .mount(server)
            .await;
    }
}

fn feed_url(server: &MockServer) -> String {
    format!("{}/feed/@jane", server.uri())
}

#[tokio::test]
async fn test_full_run_prints_drafts_and_final_post() {
    let server = MockServer::start().await;
    mount_feed(&server).await;
    mount_writer(&server).await;
    Mock::given(method("POST"))
        .and(body_string_contains("Pick the best post."))
        .and(body_string_contains(
            "# POST #1 <post> Draft one <post>\\n\\n# POST #2 <post> Draft two <post>\\n\\n# POST #3 <post> Draft three <post>",
        ))
        .respond_with(chat_reply("Draft two"))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(reqwest::Client::new(), settings(&server, "full", Some("key")));
    let mut out = Vec::new();
    let result = pipeline.run(&feed_url(&server), "X", &mut out).await.unwrap();

    assert_eq!(result.article.tags, vec!["Data", "Google-Cloud"]);
    assert_eq!(result.drafts, vec!["Draft one", "Draft two", "Draft three"]);
    assert_eq!(result.selection.index, Some(1));

    let expected_post = "Draft two\n\n\
        Check out the article here --> https://e/1\n\n\
        Until next time… ☟\n\
        https://www.beardeddata.com\n\n\
        #Data #GoogleCloud";
    assert_eq!(result.text, expected_post);

    let expected_output = format!(
        "Option #1\nDraft one\n\n\n\
         Option #2\nDraft two\n\n\n\
         Option #3\nDraft three\n\n\n\
         Final Draft\nDraft two\n\n\n\
         !------------------ Final Post ------------------!\n{expected_post}\n\n\n"
    );
    assert_eq!(String::from_utf8(out).unwrap(), expected_output);
}

#[tokio::test]
async fn test_concurrent_drafts_keep_three_result_contract() {
    let server = MockServer::start().await;
    mount_feed(&server).await;
    Mock::given(method("POST"))
        .and(body_string_contains("<article>"))
        .respond_with(chat_reply("Same draft"))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("# POST #1"))
        .respond_with(chat_reply("Same draft"))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(reqwest::Client::new(), settings(&server, "concurrent", Some("key")))
        .with_draft_mode(DraftMode::Concurrent);
    let mut out = Vec::new();
    let result = pipeline.run(&feed_url(&server), "X", &mut out).await.unwrap();

    assert_eq!(result.drafts.len(), 3);
    assert_eq!(result.selection.index, Some(0));
    let output = String::from_utf8(out).unwrap();
    let first = output.find("Option #1").unwrap();
    let second = output.find("Option #2").unwrap();
    let third = output.find("Option #3").unwrap();
    assert!(first < second && second < third);
}

#[tokio::test]
async fn test_missing_title_is_not_found_and_skips_chat() {
    let server = MockServer::start().await;
    mount_feed(&server).await;
    Mock::given(method("POST"))
        .respond_with(chat_reply("unused"))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(reqwest::Client::new(), settings(&server, "not_found", Some("key")));
    let mut out = Vec::new();
    let err = pipeline
        .run(&feed_url(&server), "Nonexistent Article", &mut out)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(
        err.to_string(),
        format!("Article 'Nonexistent Article' not found in feed: {}", feed_url(&server))
    );
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_missing_credential_makes_no_chat_request() {
    let server = MockServer::start().await;
    mount_feed(&server).await;
    Mock::given(method("POST"))
        .respond_with(chat_reply("unused"))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(reqwest::Client::new(), settings(&server, "no_key", None));
    let mut out = Vec::new();
    let err = pipeline.run(&feed_url(&server), "X", &mut out).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("OPENAI_KEY"));
}

#[tokio::test]
async fn test_empty_review_reply_is_data_error() {
    let server = MockServer::start().await;
    mount_feed(&server).await;
    mount_writer(&server).await;
    Mock::given(method("POST"))
        .and(body_string_contains("# POST #1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(reqwest::Client::new(), settings(&server, "empty_review", Some("key")));
    let mut out = Vec::new();
    let err = pipeline.run(&feed_url(&server), "X", &mut out).await.unwrap_err();

    assert!(matches!(err, PipelineError::Data(_)));
    // The drafts were already printed before the review failed.
    let output = String::from_utf8(out).unwrap();
    assert!(output.contains("Option #3\nDraft three"));
    assert!(!output.contains("Final Draft"));
}

#[tokio::test]
async fn test_feed_server_error_aborts_run() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(reqwest::Client::new(), settings(&server, "feed_503", Some("key")));
    let mut out = Vec::new();
    let result = pipeline.run(&feed_url(&server), "X", &mut out).await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Service);

    // Under the default policy the same failure is logged, not returned.
    let swallowed = ErrorPolicy::Log.settle(Err::<(), _>(err));
    assert!(matches!(swallowed, Ok(None)));
}
