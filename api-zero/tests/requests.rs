#![cfg(feature = "tls")]

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use api_zero::{
    ApiClient, ArrayFormat, Blob, CredentialPolicy, Json, Logger, Params, RequestBody,
    RequestOptions, ResponseData, ResponseType,
};
use bytes::Bytes;
use http::Method;
use serde::Deserialize;
use serde_json::{Value, json};

use common::TestServer;

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: u32,
    name: String,
}

#[tokio::test]
async fn get_deserializes_json() {
    let server = TestServer::start().await;
    let client = server.client();

    let user: User = client.get("/users/7", RequestOptions::new()).await.unwrap();
    assert_eq!(
        user,
        User {
            id: 7,
            name: "Ada".into()
        }
    );
}

#[tokio::test]
async fn post_sends_json_body() {
    let server = TestServer::start().await;
    let client = server.client();

    let echo: Value = client
        .post("/echo", Json(json!({ "name": "Ada" })), RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(echo["method"], "POST");
    assert_eq!(echo["body"], json!({ "name": "Ada" }));
    assert_eq!(echo["headers"]["content-type"], "application/json");
}

#[tokio::test]
async fn verbs_use_their_methods() {
    let server = TestServer::start().await;
    let client = server.client();

    let put: Value = client.put("/echo", json!(1), RequestOptions::new()).await.unwrap();
    let patch: Value = client.patch("/echo", json!(2), RequestOptions::new()).await.unwrap();
    let delete: Value = client.delete("/echo", RequestOptions::new()).await.unwrap();
    assert_eq!(put["method"], "PUT");
    assert_eq!(patch["method"], "PATCH");
    assert_eq!(delete["method"], "DELETE");
    assert_eq!(patch["body"], 2);
}

#[tokio::test]
async fn form_and_binary_bodies() {
    let server = TestServer::start().await;
    let client = server.client();

    let echo: Value = client
        .post(
            "/echo",
            RequestBody::form([("a", "1"), ("b", "x y")]),
            RequestOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(echo["body"], "a=1&b=x+y");
    assert_eq!(
        echo["headers"]["content-type"],
        "application/x-www-form-urlencoded"
    );

    let blob = Blob::new(Bytes::from_static(b"raw")).with_content_type("text/plain");
    let echo: Value = client.post("/echo", blob, RequestOptions::new()).await.unwrap();
    assert_eq!(echo["body"], "raw");
    assert_eq!(echo["headers"]["content-type"], "text/plain");
}

#[tokio::test]
async fn default_and_call_headers_merge_by_key() {
    let server = TestServer::start().await;
    let client = ApiClient::builder(&server.base_url)
        .header("x-client", "tests")
        .header("x-mode", "default")
        .build()
        .unwrap();

    let options = RequestOptions::new().header("x-mode", "call");
    let echo: Value = client.get("/echo", options).await.unwrap();
    assert_eq!(echo["headers"]["x-client"], "tests");
    assert_eq!(echo["headers"]["x-mode"], "call");
}

#[tokio::test]
async fn params_are_serialized_into_the_query() {
    let server = TestServer::start().await;
    let client = server.client();

    let options = RequestOptions::new()
        .param("page", 2)
        .param("ids", vec![1, 2])
        .param("missing", None::<u32>);
    let echo: Value = client.get("/echo", options).await.unwrap();
    assert_eq!(echo["query"], "page=2&ids%5B%5D=1&ids%5B%5D=2");

    let options = RequestOptions::new()
        .params(Params::new().with("tags", ["a", "b"]))
        .params_array_format(ArrayFormat::Comma);
    let echo: Value = client.get("/echo", options).await.unwrap();
    assert_eq!(echo["query"], "tags=a%2Cb");

    let echo: Value = client.get("/echo", RequestOptions::new()).await.unwrap();
    assert_eq!(echo["query"], Value::Null);
}

#[tokio::test]
async fn auth_helpers_set_and_clear_header() {
    let server = TestServer::start().await;
    let client = server.client();

    client.set_auth_token("t0ken").unwrap();
    let echo: Value = client.get("/echo", RequestOptions::new()).await.unwrap();
    assert_eq!(echo["headers"]["authorization"], "Bearer t0ken");

    client.set_basic_auth("user", "pass").unwrap();
    let echo: Value = client.get("/echo", RequestOptions::new()).await.unwrap();
    assert_eq!(echo["headers"]["authorization"], "Basic dXNlcjpwYXNz");

    let omit = RequestOptions::new()
        .credentials(CredentialPolicy::Omit)
        .header("cookie", "session=1");
    let echo: Value = client.get("/echo", omit).await.unwrap();
    assert_eq!(echo["headers"]["authorization"], "Basic dXNlcjpwYXNz");
    assert_eq!(echo["headers"]["cookie"], Value::Null);

    client.clear_auth();
    let echo: Value = client.get("/echo", RequestOptions::new()).await.unwrap();
    assert_eq!(echo["headers"]["authorization"], Value::Null);
}

#[tokio::test]
async fn response_types() {
    let server = TestServer::start().await;
    let client = server.client();

    let text = client
        .request(
            Method::GET,
            "/text",
            (),
            RequestOptions::new().response_type(ResponseType::Text),
        )
        .await
        .unwrap();
    assert_eq!(text.data.as_text(), Some("plain text"));

    let blob = client
        .request(
            Method::GET,
            "/text",
            (),
            RequestOptions::new().response_type(ResponseType::Blob),
        )
        .await
        .unwrap();
    match blob.into_data() {
        ResponseData::Blob(blob) => {
            assert!(blob.content_type().unwrap().starts_with("text/plain"));
            assert_eq!(blob.bytes().as_ref(), b"plain text");
        }
        other => panic!("expected blob, got {other:?}"),
    }

    let bytes = client
        .request(
            Method::GET,
            "/large",
            (),
            RequestOptions::new().response_type(ResponseType::Bytes),
        )
        .await
        .unwrap();
    assert_eq!(bytes.data.as_bytes().unwrap().len(), common::LARGE_BODY);

    let empty = client
        .request(Method::GET, "/empty", (), RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(empty.status, http::StatusCode::NO_CONTENT);
    assert!(empty.data.is_null());
}

#[tokio::test]
async fn transforms_run_around_the_exchange() {
    let server = TestServer::start().await;
    let client = ApiClient::builder(&server.base_url)
        .transform_request(|body| {
            body.map(|body| match body {
                RequestBody::Json(value) => RequestBody::Json(json!({ "wrapped": value })),
                other => other,
            })
        })
        .transform_response(|data| match data {
            ResponseData::Json(value) => ResponseData::Json(value["body"].clone()),
            other => other,
        })
        .build()
        .unwrap();

    let body: Value = client.post("/echo", json!(5), RequestOptions::new()).await.unwrap();
    assert_eq!(body, json!({ "wrapped": 5 }));
}

#[tokio::test]
async fn logger_hooks_observe_each_call() {
    let server = TestServer::start().await;
    let requests = Arc::new(AtomicU32::new(0));
    let responses = Arc::new(AtomicU32::new(0));
    let errors = Arc::new(AtomicU32::new(0));

    let logger = {
        let (requests, responses, errors) = (requests.clone(), responses.clone(), errors.clone());
        Logger::new()
            .request(move |config| {
                assert!(config.url.starts_with("http://"));
                requests.fetch_add(1, Ordering::SeqCst);
            })
            .response(move |_| {
                responses.fetch_add(1, Ordering::SeqCst);
            })
            .error(move |_| {
                errors.fetch_add(1, Ordering::SeqCst);
            })
    };
    let client = ApiClient::builder(&server.base_url)
        .logger(logger)
        .debug(true)
        .build()
        .unwrap();

    let _: Value = client.get("/users/1", RequestOptions::new()).await.unwrap();
    let _ = client.get::<Value>("/error/text", RequestOptions::new()).await;

    assert_eq!(requests.load(Ordering::SeqCst), 2);
    assert_eq!(responses.load(Ordering::SeqCst), 1);
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn config_changes_apply_to_later_requests() {
    let server = TestServer::start().await;
    let client = server.client();

    let echo: Value = client.get("/echo", RequestOptions::new()).await.unwrap();
    assert_eq!(echo["headers"]["x-version"], Value::Null);

    client.set_header("x-version", "2").unwrap();
    let echo: Value = client.get("/echo", RequestOptions::new()).await.unwrap();
    assert_eq!(echo["headers"]["x-version"], "2");

    client.set_config(|config| config.base_url = format!("{}/", server.base_url));
    let user: Value = client.get("users/3", RequestOptions::new()).await.unwrap();
    assert_eq!(user["id"], 3);
}

#[tokio::test]
async fn in_flight_request_keeps_its_snapshot() {
    let server = TestServer::start().await;
    let client = server.client();
    client.set_header("x-phase", "before").unwrap();

    let entered = Arc::new(tokio::sync::Notify::new());
    let release = Arc::new(tokio::sync::Notify::new());
    {
        let (entered, release) = (entered.clone(), release.clone());
        client.interceptors().request.register(
            api_zero::Interceptor::new().on_fulfilled(move |config| {
                let (entered, release) = (entered.clone(), release.clone());
                async move {
                    entered.notify_one();
                    release.notified().await;
                    Ok(config)
                }
            }),
        );
    }

    let in_flight = {
        let client = client.clone();
        tokio::spawn(async move { client.get::<Value>("/echo", RequestOptions::new()).await })
    };

    entered.notified().await;
    client.set_header("x-phase", "after").unwrap();
    release.notify_one();

    let echo = in_flight.await.unwrap().unwrap();
    assert_eq!(echo["headers"]["x-phase"], "before");
}
