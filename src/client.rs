//! Transports for talking to a zcashd node
//!
//! [`CliNodeClient`] shells out to `zcash-cli`, which is how the tool is
//! normally run next to a node. [`HttpNodeClient`] speaks JSON-RPC directly to
//! the node's RPC port.
use std::process::Stdio;

use async_trait::async_trait;
use rand::random;
use serde_json::Value;
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::report::Reporter;
use crate::rpc::{NodeRpc, RpcCall, RpcOutput, RpcRequest, RpcResponse};

/// Wrap `arg` in single quotes for a POSIX shell.
///
/// Embedded single quotes close the quoted run, emit an escaped quote and
/// reopen it: `it's` becomes `'it'\''s'`.
pub fn escape_shell_arg(arg: &str) -> String {
    arg.split('\'')
        .map(|part| format!("'{}'", part))
        .collect::<Vec<_>>()
        .join("\\'")
}

/// Render one RPC argument for the command line.
///
/// Strings are quoted, scalars go in as their literal text and arrays/objects
/// are JSON-encoded and then quoted, which is what `zcash-cli` expects for
/// structured parameters.
pub fn render_arg(arg: &Value) -> String {
    match arg {
        Value::String(s) => escape_shell_arg(s),
        Value::Array(_) | Value::Object(_) => escape_shell_arg(&arg.to_string()),
        scalar => scalar.to_string(),
    }
}

/// Node client that runs `zcash-cli` once per call.
#[derive(Debug, Clone)]
pub struct CliNodeClient {
    /// Inserted verbatim, so it may carry extra flags such as `-testnet`
    node_cli: String,
    reporter: Reporter,
}

impl CliNodeClient {
    pub fn new(node_cli: impl Into<String>, reporter: Reporter) -> Self {
        Self {
            node_cli: node_cli.into(),
            reporter,
        }
    }

    /// The literal shell command line for `call`.
    pub fn command_line(&self, call: &RpcCall) -> String {
        let mut line = format!("{} {}", self.node_cli, call.method);
        for arg in &call.args {
            line.push(' ');
            line.push_str(&render_arg(arg));
        }
        line
    }
}

#[async_trait]
impl NodeRpc for CliNodeClient {
    async fn call(&self, call: &RpcCall) -> Result<RpcOutput> {
        let line = self.command_line(call);
        self.reporter.command(&line);
        tracing::debug!(method = %call.method, args = call.args.len(), "invoking node cli");

        let output = Command::new("sh")
            .arg("-c")
            .arg(&line)
            .stdin(Stdio::null())
            .output()
            .await?;

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);
        let combined = String::from_utf8_lossy(&combined).into_owned();

        if !output.status.success() {
            tracing::debug!(method = %call.method, status = ?output.status.code(), "node cli failed");
            return Err(Error::Process {
                command: line,
                status: output.status.code(),
                output: combined.trim().to_string(),
            });
        }

        RpcOutput::classify(&combined)
    }
}

/// Node client speaking JSON-RPC over HTTP to `zcashd`.
pub struct HttpNodeClient {
    endpoint: String,
    http: reqwest::Client,
    auth: Option<String>,
    reporter: Reporter,
}

impl HttpNodeClient {
    /// Create a new RPC client without authentication.
    pub fn new(endpoint: impl Into<String>, reporter: Reporter) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::new(),
            auth: None,
            reporter,
        }
    }

    /// Create a new RPC client with HTTP basic authentication.
    ///
    /// This is the standard authentication method for zcashd RPC endpoints.
    pub fn with_auth(
        endpoint: impl Into<String>,
        username: &str,
        password: &str,
        reporter: Reporter,
    ) -> Self {
        use base64::Engine;
        let mut client = Self::new(endpoint, reporter);
        let credentials = format!("{}:{}", username, password);
        client.auth = Some(base64::engine::general_purpose::STANDARD.encode(credentials));
        client
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl NodeRpc for HttpNodeClient {
    async fn call(&self, call: &RpcCall) -> Result<RpcOutput> {
        let request = RpcRequest {
            jsonrpc: "1.0",
            id: random::<u64>(),
            method: &call.method,
            params: &call.args,
        };
        self.reporter.command(&format!(
            "POST {} {}",
            self.endpoint,
            serde_json::to_string(&request)?
        ));
        tracing::debug!(method = %call.method, endpoint = %self.endpoint, "sending json-rpc request");

        let mut req = self.http.post(&self.endpoint).json(&request);
        if let Some(ref auth) = self.auth {
            req = req.header("Authorization", format!("Basic {}", auth));
        }

        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await?;

        // zcashd answers RPC-level failures with HTTP 500 and a JSON error body
        let rpc_response: RpcResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(Error::Rpc(format!(
                    "RPC request failed with status: {}",
                    status
                )));
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(error) = rpc_response.error {
            return Err(Error::Rpc(format!(
                "RPC error {}: {}",
                error.code, error.message
            )));
        }
        if !status.is_success() {
            return Err(Error::Rpc(format!(
                "RPC request failed with status: {}",
                status
            )));
        }

        Ok(RpcOutput::from_value(
            rpc_response.result.unwrap_or(Value::Null),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{SharedBuffer, Verbosity};
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_escape_plain_and_quoted() {
        assert_eq!(escape_shell_arg("abc"), "'abc'");
        assert_eq!(escape_shell_arg("it's"), "'it'\\''s'");
        assert_eq!(escape_shell_arg(""), "''");
    }

    #[test]
    fn test_render_args() {
        assert_eq!(render_arg(&json!("raw")), "'raw'");
        assert_eq!(render_arg(&json!(5.0)), "5.0");
        assert_eq!(render_arg(&json!(0.1)), "0.1");
        assert_eq!(render_arg(&json!(true)), "true");
        assert_eq!(render_arg(&json!({})), "'{}'");
        assert_eq!(
            render_arg(&json!([{"txid": "t1", "vout": 0}])),
            r#"'[{"txid":"t1","vout":0}]'"#
        );
    }

    #[test]
    fn test_command_line() {
        let client = CliNodeClient::new("./src/zcash-cli -testnet", Reporter::silent());
        let call = RpcCall::new("zcrawreceive", vec![json!("sk'1"), json!("bucket")]);
        assert_eq!(
            client.command_line(&call),
            "./src/zcash-cli -testnet zcrawreceive 'sk'\\''1' 'bucket'"
        );
        let call = RpcCall::new("listunspent", vec![]);
        assert_eq!(client.command_line(&call), "./src/zcash-cli -testnet listunspent");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cli_call_round_trips_through_shell() {
        let buf = SharedBuffer::new();
        let client = CliNodeClient::new("echo", Reporter::with_writer(Verbosity::Debug, buf.clone()));
        let out = client
            .call(&RpcCall::new("hello", vec![json!("it's"), json!(2)]))
            .await
            .unwrap();
        assert_eq!(out, RpcOutput::Text("hello it's 2".to_string()));
        assert!(buf.contents().contains("executing: echo hello 'it'\\''s' 2"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cli_call_parses_json_output() {
        let client = CliNodeClient::new(r#"printf '{"hex":"00"}'; :"#, Reporter::silent());
        let out = client
            .call(&RpcCall::new("signrawtransaction", vec![json!("raw")]))
            .await
            .unwrap();
        assert_eq!(out, RpcOutput::Json(json!({"hex": "00"})));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cli_failure_carries_combined_output() {
        let client = CliNodeClient::new("sh -c 'echo boom >&2; exit 3'", Reporter::silent());
        match client.call(&RpcCall::new("getinfo", vec![])).await {
            Err(Error::Process {
                command,
                status,
                output,
            }) => {
                assert_eq!(status, Some(3));
                assert_eq!(output, "boom");
                assert!(command.ends_with("getinfo"));
            }
            other => panic!("expected process error, got {:?}", other),
        }
    }

    async fn serve_once(body: &'static str, status: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text[..split]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= split + 4 + length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{}", addr), handle)
    }

    #[tokio::test]
    async fn test_http_call_sends_params_and_auth() {
        let (url, server) = serve_once(r#"{"result":"0123abcd","error":null,"id":1}"#, "200 OK").await;
        let client = HttpNodeClient::with_auth(url, "user", "pass", Reporter::silent());
        let out = client
            .call(&RpcCall::new("sendrawtransaction", vec![json!("00ff")]))
            .await
            .unwrap();
        assert_eq!(out, RpcOutput::Text("0123abcd".to_string()));

        let request = server.await.unwrap();
        // base64("user:pass")
        assert!(request.contains("Basic dXNlcjpwYXNz"));
        assert!(request.contains(r#""method":"sendrawtransaction""#));
        assert!(request.contains(r#""params":["00ff"]"#));
    }

    #[tokio::test]
    async fn test_http_rpc_error_object() {
        let (url, server) = serve_once(
            r#"{"result":null,"error":{"code":-25,"message":"Missing inputs"},"id":1}"#,
            "500 Internal Server Error",
        )
        .await;
        let client = HttpNodeClient::new(url, Reporter::silent());
        let err = client
            .call(&RpcCall::new("sendrawtransaction", vec![json!("00")]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "RPC error: RPC error -25: Missing inputs");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_http_structured_result() {
        let (url, server) = serve_once(
            r#"{"result":[{"txid":"t1","amount":1.0}],"error":null,"id":1}"#,
            "200 OK",
        )
        .await;
        let client = HttpNodeClient::new(url, Reporter::silent());
        let out = client.call(&RpcCall::new("listunspent", vec![])).await.unwrap();
        assert_eq!(out, RpcOutput::Json(json!([{"txid": "t1", "amount": 1.0}])));
        server.await.unwrap();
    }
}
