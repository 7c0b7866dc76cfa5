use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde_json::Value;

#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum ReplyBehavior {
    /// Reply with `model=<model>; last=<content of last message>`.
    EchoLastMessage,
    /// Valid JSON without `choices`.
    MissingChoices,
    /// A body that is not JSON at all.
    NotJson,
}

pub struct CompletionStub {
    pub base_url: String,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CompletionStub {
    pub fn spawn(expected_api_key: &'static str, behavior: ReplyBehavior) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start completion stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/v1");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let path = request.url().to_string();
                if request.method() != &tiny_http::Method::Post || path != "/v1/chat/completions" {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                }

                let expected_auth = format!("Bearer {expected_api_key}");
                let authorized = request
                    .headers()
                    .iter()
                    .any(|h| h.field.equiv("Authorization") && h.value.as_str() == expected_auth);
                if !authorized {
                    let _ = request.respond(
                        tiny_http::Response::from_string(r#"{"error":{"message":"bad key"}}"#)
                            .with_status_code(401),
                    );
                    continue;
                }

                let mut body = String::new();
                if request.as_reader().read_to_string(&mut body).is_err() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid request body")
                            .with_status_code(400),
                    );
                    continue;
                }

                let parsed: Value = match serde_json::from_str(&body) {
                    Ok(value) => value,
                    Err(_) => {
                        let _ = request.respond(
                            tiny_http::Response::from_string("invalid json").with_status_code(400),
                        );
                        continue;
                    }
                };

                if parsed.get("stream") != Some(&Value::Bool(false)) {
                    let _ = request.respond(
                        tiny_http::Response::from_string("stream must be false")
                            .with_status_code(400),
                    );
                    continue;
                }

                let response_body = match behavior {
                    ReplyBehavior::EchoLastMessage => {
                        let model = parsed.get("model").and_then(|v| v.as_str()).unwrap_or("");
                        let last = parsed
                            .get("messages")
                            .and_then(|v| v.as_array())
                            .and_then(|m| m.last())
                            .and_then(|m| m.get("content"))
                            .and_then(|v| v.as_str())
                            .unwrap_or("");
                        serde_json::json!({
                            "id": "chatcmpl_stub",
                            "object": "chat.completion",
                            "choices": [
                                {
                                    "index": 0,
                                    "message": {
                                        "role": "assistant",
                                        "content": format!("model={model}; last={last}"),
                                    },
                                    "finish_reason": "stop"
                                }
                            ]
                        })
                        .to_string()
                    }
                    ReplyBehavior::MissingChoices => {
                        serde_json::json!({ "error": { "message": "quota exceeded" } })
                            .to_string()
                    }
                    ReplyBehavior::NotJson => "<html>bad gateway</html>".to_owned(),
                };

                let mut response =
                    tiny_http::Response::from_string(response_body).with_status_code(200);
                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                response = response.with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for CompletionStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
