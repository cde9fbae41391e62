use telepress::translate::chat::ChatTranslator;
use telepress::translate::http::HttpTranslator;
use telepress::translate::{TranslationError, Translator};

#[tokio::test]
async fn test_http_backend_translates_pair() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"translatedText": ["عنوان", "توضیحات"]}"#)
        .create_async()
        .await;

    let translator = HttpTranslator::new(server.url(), "en", "fa");

    let pair = translator
        .translate("Title", "Description")
        .await
        .expect("translate");

    assert_eq!(pair.title, "عنوان");
    assert_eq!(pair.description, "توضیحات");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_http_backend_rejects_wrong_count() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"translatedText": ["only one"]}"#)
        .create_async()
        .await;

    let translator = HttpTranslator::new(server.url(), "en", "fa");

    let result = translator.translate("Title", "Description").await;
    assert!(matches!(result, Err(TranslationError::Malformed(_))));
}

#[tokio::test]
async fn test_http_backend_surfaces_api_errors() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/")
        .with_status(403)
        .with_body(r#"{"error": "Invalid API key"}"#)
        .create_async()
        .await;

    let translator = HttpTranslator::new(server.url(), "en", "fa");

    let result = translator.translate("Title", "Description").await;
    match result {
        Err(TranslationError::Api { status, body }) => {
            assert_eq!(status.as_u16(), 403);
            assert!(body.contains("Invalid API key"));
        }
        other => panic!("expected Api error, got {:?}", other.map(|p| p.title)),
    }
}

#[tokio::test]
async fn test_chat_backend_splits_on_delimiter() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "model": "gpt-4o-mini",
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "عنوان ||| توضیحات"
                    },
                    "finish_reason": "stop"
                }]
            }"#,
        )
        .create_async()
        .await;

    let translator = ChatTranslator::new(server.url(), "fake-api-key", "gpt-4o-mini", "en", "fa");

    let pair = translator
        .translate("Title", "Description")
        .await
        .expect("translate");

    assert_eq!(pair.title, "عنوان");
    assert_eq!(pair.description, "توضیحات");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_chat_backend_rejects_missing_delimiter() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "Here are your translations: first one, second one"
                    }
                }]
            }"#,
        )
        .create_async()
        .await;

    let translator = ChatTranslator::new(server.url(), "fake-api-key", "gpt-4o-mini", "en", "fa");

    let result = translator.translate("Title", "Description").await;
    assert!(matches!(result, Err(TranslationError::Malformed(_))));
}

#[tokio::test]
async fn test_chat_backend_rejects_empty_half() {
    let mut server = mockito::Server::new_async().await;

    // One translation missing: the pair must be rejected, never padded.
    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "عنوان |||   "
                    }
                }]
            }"#,
        )
        .create_async()
        .await;

    let translator = ChatTranslator::new(server.url(), "fake-api-key", "gpt-4o-mini", "en", "fa");

    let result = translator.translate("Title", "Description").await;
    assert!(matches!(result, Err(TranslationError::Malformed(_))));
}

#[tokio::test]
async fn test_chat_backend_error_status() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/")
        .with_status(429)
        .with_body(r#"{"error": {"message": "Rate limit exceeded"}}"#)
        .create_async()
        .await;

    let translator = ChatTranslator::new(server.url(), "fake-api-key", "gpt-4o-mini", "en", "fa");

    let result = translator.translate("Title", "Description").await;
    match result {
        Err(TranslationError::Api { status, .. }) => assert_eq!(status.as_u16(), 429),
        other => panic!("expected Api error, got {:?}", other.map(|p| p.title)),
    }
}
