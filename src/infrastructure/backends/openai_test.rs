use anyhow::Result;
use mockito::Matcher;
use serde_json::json;

use super::CompletionChoiceResponse;
use super::CompletionMessageResponse;
use super::CompletionResponse;
use super::Model;
use super::ModelListResponse;
use super::OpenAI;
use crate::domain::models::Backend;
use crate::domain::models::ChatMessage;
use crate::domain::models::Role;

impl OpenAI {
    fn with_url(url: String) -> OpenAI {
        return OpenAI {
            url,
            token: "abc".to_string(),
            timeout: "200".to_string(),
        };
    }
}

fn conversation() -> Vec<ChatMessage> {
    return vec![
        ChatMessage::new(Role::System, "You write Python."),
        ChatMessage::new(Role::User, "print hello world"),
    ];
}

#[tokio::test]
async fn it_successfully_health_checks() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .with_status(200)
        .create_async()
        .await;

    let backend = OpenAI::with_url(server.url());
    let res = backend.health_check().await;

    assert!(res.is_ok());
    mock.assert_async().await;
}

#[tokio::test]
async fn it_successfully_health_checks_418() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .with_status(418)
        .create_async()
        .await;

    let backend = OpenAI::with_url(server.url());
    let res = backend.health_check().await;

    assert!(res.is_ok());
    mock.assert_async().await;
}

#[tokio::test]
async fn it_fails_health_checks() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .with_status(500)
        .create_async()
        .await;

    let backend = OpenAI::with_url(server.url());
    let res = backend.health_check().await;

    assert!(res.is_err());
    mock.assert_async().await;
}

#[tokio::test]
async fn it_fails_health_checks_without_a_token() {
    let mut backend = OpenAI::with_url("http://localhost:1".to_string());
    backend.token = "".to_string();

    let res = backend.health_check().await;
    assert_eq!(res.unwrap_err().to_string(), "OpenAI token is not defined");
}

#[tokio::test]
async fn it_lists_models() -> Result<()> {
    let body = serde_json::to_string(&ModelListResponse {
        data: vec![
            Model {
                id: "second".to_string(),
            },
            Model {
                id: "first".to_string(),
            },
        ],
    })?;

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/models")
        .match_header("Authorization", "Bearer abc")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let backend = OpenAI::with_url(server.url());
    let res = backend.list_models().await?;
    mock.assert_async().await;

    assert_eq!(res, vec!["first".to_string(), "second".to_string()]);

    return Ok(());
}

#[tokio::test]
async fn it_gets_completions_for_the_whole_conversation() -> Result<()> {
    let body = serde_json::to_string(&CompletionResponse {
        choices: vec![CompletionChoiceResponse {
            message: CompletionMessageResponse {
                content: "```python\nprint('hello world')\n```".to_string(),
            },
        }],
    })?;

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("Authorization", "Bearer abc")
        .match_body(Matcher::Json(json!({
            "model": "gpt-4o-mini",
            "stream": false,
            "messages": [
                { "role": "system", "content": "You write Python." },
                { "role": "user", "content": "print hello world" }
            ]
        })))
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let backend = OpenAI::with_url(server.url());
    let res = backend
        .get_completion("gpt-4o-mini", &conversation())
        .await?;

    mock.assert_async().await;
    assert_eq!(res, "```python\nprint('hello world')\n```");

    return Ok(());
}

#[tokio::test]
async fn it_fails_completions_on_error_status() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(401)
        .with_body(r#"{"error":{"message":"Incorrect API key provided"}}"#)
        .create_async()
        .await;

    let backend = OpenAI::with_url(server.url());
    let res = backend.get_completion("gpt-4o-mini", &conversation()).await;

    mock.assert_async().await;
    insta::assert_snapshot!(res.unwrap_err().to_string(), @"Failed to make completion request to OpenAI (status 401)");

    return Ok(());
}

#[tokio::test]
async fn it_fails_completions_without_choices() -> Result<()> {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices":[]}"#)
        .create_async()
        .await;

    let backend = OpenAI::with_url(server.url());
    let res = backend.get_completion("gpt-4o-mini", &conversation()).await;

    mock.assert_async().await;
    assert!(res.is_err());

    return Ok(());
}
