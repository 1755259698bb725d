// server.rs — The reverse-proxy HTTP server.
//
// One axum fallback handler sees every method and path. Routes matching
// the inspection gate run the decision pipeline (403 on BLOCK, 400 on a
// payload the adapter refuses); everything — inspected or not — is then
// forwarded to the upstream gateway with hop-by-hop headers stripped and
// the response body streamed back. Upstream failures become 502s, and
// every inspected request leaves exactly one audit record.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::json;

use agentsafe_approvals::GrantStore;
use agentsafe_audit::AuditLedger;
use agentsafe_policy::{load_backend, PolicyBackend};

use crate::adapters::AdapterKind;
use crate::config::{ProxyConfig, RouteMatcher};
use crate::error::ProxyError;
use crate::pipeline::{build_audit_event, process_tool_request};

/// Upstream calls get a generous but bounded budget.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(20);

/// Request bodies are buffered for policy inspection; cap them.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

const DEFAULT_ACTOR: &str = "openclaw-agent";

/// Everything a request handler needs, shared for the server's lifetime.
pub struct ProxyState {
    config: ProxyConfig,
    matcher: RouteMatcher,
    backend: Box<dyn PolicyBackend>,
    ledger: AuditLedger,
    grants: GrantStore,
    adapter: AdapterKind,
    client: reqwest::Client,
    workspace_root: PathBuf,
}

impl ProxyState {
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let matcher = RouteMatcher::new(&config.path_regexes)?;
        let backend = load_backend(&config.policy_backend, &config.policy_path)?;
        let ledger = AuditLedger::new(&config.audit_dir)?;
        let grants = GrantStore::new(config.audit_dir.join("grants.jsonl"))?;
        let adapter = AdapterKind::parse(&config.adapter)?;
        let client = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()
            .map_err(ProxyError::Client)?;
        let workspace_root = PathBuf::from(&config.workspace)
            .canonicalize()
            .unwrap_or_else(|_| PathBuf::from(&config.workspace));
        Ok(Self {
            config,
            matcher,
            backend,
            ledger,
            grants,
            adapter,
            client,
            workspace_root,
        })
    }
}

/// Build the router: a single fallback handler over every method/path.
pub fn router(state: Arc<ProxyState>) -> Router {
    Router::new().fallback(handle).with_state(state)
}

/// Load config, bind, and serve until the process is stopped.
pub async fn run_proxy(config: ProxyConfig, host: &str, port: u16) -> Result<(), ProxyError> {
    tracing::info!(
        upstream = %config.upstream,
        policy = %config.policy_path,
        backend = %config.policy_backend,
        adapter = %config.adapter,
        "agentsafe proxy starting"
    );
    let state = Arc::new(ProxyState::new(config)?);
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!("listening on {host}:{port}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn handle(State(state): State<Arc<ProxyState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());

    let generated_request_id = state.ledger.new_request_id();
    let actor = parts
        .headers
        .get(state.config.actor_header.as_str())
        .and_then(|value| value.to_str().ok())
        .unwrap_or(DEFAULT_ACTOR)
        .to_string();

    let body_bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return json_response(
                StatusCode::BAD_REQUEST,
                json!({"error": "bad_request", "reason": "unreadable request body", "request_id": generated_request_id}),
            )
        }
    };

    if state.matcher.matches(&path) {
        // Tool routes always get a verdict; an undecodable body is an
        // empty payload for the adapter to judge, not a bypass.
        let payload: serde_json::Value =
            serde_json::from_slice(&body_bytes).unwrap_or_else(|_| json!({}));

        let evaluation = match process_tool_request(
            &path,
            &payload,
            &actor,
            state.adapter,
            state.backend.as_ref(),
            &state.grants,
            &state.workspace_root,
        )
        .await
        {
            Ok(evaluation) => evaluation,
            Err(adapter_error) => {
                return json_response(
                    StatusCode::BAD_REQUEST,
                    json!({
                        "error": "bad_request",
                        "reason": adapter_error.to_string(),
                        "request_id": generated_request_id,
                    }),
                )
            }
        };

        let request_id = if evaluation.action.request_id.is_empty() {
            generated_request_id.clone()
        } else {
            evaluation.action.request_id.clone()
        };

        tracing::info!(
            request_id = %request_id,
            actor = %evaluation.action.actor,
            tool = %evaluation.action.tool,
            allowed = evaluation.allowed,
            rule_id = %evaluation.rule_id,
            "proxy decision"
        );

        if let Err(e) = state
            .ledger
            .write_event(build_audit_event(&evaluation, &state.config, &request_id))
        {
            // A decision that cannot be audited must not go through.
            tracing::error!(error = %e, "audit write failed");
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "audit_unavailable", "request_id": request_id}),
            );
        }

        if !evaluation.allowed {
            return json_response(
                StatusCode::FORBIDDEN,
                json!({
                    "error": "blocked",
                    "reason": evaluation.reason,
                    "rule_id": evaluation.rule_id,
                    "request_id": request_id,
                }),
            );
        }
    }

    forward(
        &state,
        parts.method,
        &path_and_query,
        parts.headers,
        body_bytes,
        &generated_request_id,
    )
    .await
}

/// Forward the original request to the upstream and stream back the reply.
async fn forward(
    state: &ProxyState,
    method: Method,
    path_and_query: &str,
    mut headers: HeaderMap,
    body: axum::body::Bytes,
    request_id: &str,
) -> Response {
    let upstream_url = format!(
        "{}/{}",
        state.config.upstream.trim_end_matches('/'),
        path_and_query.trim_start_matches('/')
    );
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);

    let upstream = match state
        .client
        .request(method, &upstream_url)
        .headers(headers)
        .body(body)
        .send()
        .await
    {
        Ok(upstream) => upstream,
        Err(e) => {
            tracing::warn!(url = %upstream_url, error = %e, "upstream request failed");
            return json_response(
                StatusCode::BAD_GATEWAY,
                json!({
                    "error": "upstream_unavailable",
                    "reason": e.to_string(),
                    "request_id": request_id,
                }),
            );
        }
    };

    let mut builder = Response::builder().status(upstream.status());
    for (name, value) in upstream.headers() {
        // Hop-by-hop headers describe the upstream connection, not ours;
        // the content length is recomputed for the streamed body.
        if matches!(
            name.as_str(),
            "transfer-encoding" | "connection" | "content-length"
        ) {
            continue;
        }
        builder = builder.header(name, value);
    }
    builder
        .body(Body::from_stream(upstream.bytes_stream()))
        .unwrap_or_else(|_| {
            json_response(
                StatusCode::BAD_GATEWAY,
                json!({"error": "upstream_unavailable", "request_id": request_id}),
            )
        })
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn test_config(dir: &tempfile::TempDir) -> ProxyConfig {
        let policy_path = dir.path().join("policy.yaml");
        let mut file = std::fs::File::create(&policy_path).unwrap();
        file.write_all(
            br#"
policy_id: server-test
tools:
  commands:
    - binary: ls
      rule_id: cmd_ls
  paths:
    allow: ["."]
  network:
    mode: allow_proxy
    domains: [github.com]
    ports: [443]
"#,
        )
        .unwrap();
        ProxyConfig {
            upstream: "http://127.0.0.1:1".to_string(),
            policy_path: policy_path.to_string_lossy().into_owned(),
            policy_backend: "yaml".to_string(),
            workspace: dir.path().to_string_lossy().into_owned(),
            adapter: "light_gateway".to_string(),
            audit_dir: dir.path().join("audit"),
            ..ProxyConfig::default()
        }
    }

    #[test]
    fn state_builds_from_a_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let state = ProxyState::new(test_config(&dir)).unwrap();
        assert!(state.matcher.matches("/v1/tools/execute"));
        assert_eq!(state.adapter, AdapterKind::LightGateway);
    }

    #[test]
    fn state_rejects_bad_route_regexes() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir);
        config.path_regexes = vec!["([broken".to_string()];
        assert!(matches!(
            ProxyState::new(config),
            Err(ProxyError::InvalidRouteRegex { .. })
        ));
    }

    #[test]
    fn state_rejects_unknown_adapters() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir);
        config.adapter = "smoke_signals".to_string();
        assert!(ProxyState::new(config).is_err());
    }

    #[tokio::test]
    async fn blocked_tool_call_gets_403_and_an_audit_record() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let state = Arc::new(ProxyState::new(config).unwrap());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/v1/tools/execute")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({
                    "request_id": "req-blocked",
                    "tool": "shell.run",
                    "args": {"command": "rm -rf /"},
                })
                .to_string(),
            ))
            .unwrap();

        let response = handle(State(state.clone()), request).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let events = state.ledger.tail(10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].request_id, "req-blocked");
        assert_eq!(events[0].rule_id, "cmd_not_allowlisted");
    }

    #[tokio::test]
    async fn malformed_tool_payload_gets_400() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(ProxyState::new(test_config(&dir)).unwrap());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/v1/tools/execute")
            .body(Body::from("{\"tool\": \"shell.run\"}"))
            .unwrap();

        let response = handle(State(state), request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn allowed_tool_call_reaches_the_upstream() {
        // The upstream is unreachable, so an ALLOW comes back as 502 —
        // after the audit record proves the decision was made.
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(ProxyState::new(test_config(&dir)).unwrap());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/v1/tools/execute")
            .body(Body::from(
                serde_json::json!({
                    "request_id": "req-allowed",
                    "tool": "shell.run",
                    "args": {"command": "ls"},
                })
                .to_string(),
            ))
            .unwrap();

        let response = handle(State(state.clone()), request).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let events = state.ledger.tail(10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].rule_id, "cmd_ls");
    }

    #[tokio::test]
    async fn uninspected_routes_skip_policy_and_audit() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(ProxyState::new(test_config(&dir)).unwrap());

        let request = Request::builder()
            .method(Method::GET)
            .uri("/healthz")
            .body(Body::empty())
            .unwrap();

        let response = handle(State(state.clone()), request).await;
        // Forwarded (and the fake upstream is down) — but never audited.
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(state.ledger.tail(10).unwrap().is_empty());
    }
}
