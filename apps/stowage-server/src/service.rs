//! The hyper service tying routing, handlers and response plumbing together.
//!
//! Every request flows through [`ApiService`]: CORS preflight interception,
//! body collection, route resolution, handler dispatch, then common response
//! headers (`x-request-id` and the CORS grant for allow-listed origins).

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::{Method, Request};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::Service;
use stowage_client::ObjectStorageClient;
use stowage_directory::DirectoryClient;
use tracing::{debug, error};
use uuid::Uuid;

use crate::audit::AuditLog;
use crate::handlers::{self, ApiResponse};
use crate::router::{self, Route};

/// Shared state handed to every request.
#[derive(Debug)]
pub struct AppState {
    /// Signed Object Storage and Identity client.
    pub storage: ObjectStorageClient,
    /// Directory client, absent when the registration is not configured.
    pub directory: Option<DirectoryClient>,
    /// Audit trail sink.
    pub audit: AuditLog,
    /// Origins the CORS layer answers for.
    pub allowed_origins: Vec<String>,
}

/// The hyper service dispatching requests to route handlers.
#[derive(Debug, Clone)]
pub struct ApiService {
    state: Arc<AppState>,
}

impl ApiService {
    /// Wrap shared state into a cloneable service.
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }
}

impl Service<Request<Incoming>> for ApiService {
    type Response = ApiResponse;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, request: Request<Incoming>) -> Self::Future {
        let state = Arc::clone(&self.state);

        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();
            let origin = request
                .headers()
                .get(http::header::ORIGIN)
                .and_then(|value| value.to_str().ok())
                .map(ToOwned::to_owned);

            let response = if request.method() == Method::OPTIONS {
                preflight_response()
            } else {
                process_request(&state, request, &request_id).await
            };

            Ok(finalize(response, &state, origin.as_deref(), &request_id))
        })
    }
}

/// Route and dispatch one request.
async fn process_request(
    state: &AppState,
    request: Request<Incoming>,
    request_id: &str,
) -> ApiResponse {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    debug!(%method, path, request_id, "Processing request");

    let Some(route) = router::resolve(&method, &path) else {
        return handlers::not_found();
    };

    let (parts, incoming) = request.into_parts();
    let body = match incoming.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            error!(error = %err, request_id, "Failed to read request body");
            return handlers::internal_error("Failed to read request body");
        }
    };

    match route {
        Route::ServiceInfo => handlers::service_info(),
        Route::Health => handlers::health(),
        Route::RouteTable => handlers::route_table(),
        Route::Login => handlers::login(state, &body).await,
        Route::UserGroups => handlers::user_groups(state, &parts).await,
        Route::Namespace => handlers::namespace(state, &parts).await,
        Route::CreateBucket => handlers::create_bucket(state, &parts, &body).await,
        Route::ListBuckets => handlers::list_buckets(state, &parts).await,
        Route::DeleteBucket(bucket) => handlers::delete_bucket(state, &parts, &bucket).await,
        Route::ListObjects(bucket) => handlers::list_objects(state, &parts, &bucket).await,
        Route::DeleteObject(bucket, object) => {
            handlers::delete_object(state, &parts, &bucket, &object).await
        }
        Route::Upload(bucket) => handlers::upload(state, &parts, &bucket, &body).await,
    }
}

/// The response to an OPTIONS preflight. The origin grant itself is added in
/// [`finalize`], and only for allow-listed origins.
fn preflight_response() -> ApiResponse {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header(
            http::header::ACCESS_CONTROL_ALLOW_METHODS,
            "GET, POST, PUT, DELETE, OPTIONS",
        )
        .header(
            http::header::ACCESS_CONTROL_ALLOW_HEADERS,
            "Authorization, Content-Type, X-Object-Name",
        )
        .header(http::header::ACCESS_CONTROL_MAX_AGE, "86400")
        .body(http_body_util::Full::new(bytes::Bytes::new()))
        .expect("static preflight response should build")
}

/// Append the request id and, for allow-listed origins, the CORS grant.
fn finalize(
    mut response: ApiResponse,
    state: &AppState,
    origin: Option<&str>,
    request_id: &str,
) -> ApiResponse {
    let headers = response.headers_mut();

    if let Ok(value) = http::HeaderValue::from_str(request_id) {
        headers.insert("x-request-id", value);
    }

    if let Some(origin) = origin {
        if state.allowed_origins.iter().any(|allowed| allowed == origin) {
            if let Ok(value) = http::HeaderValue::from_str(origin) {
                headers.insert(http::header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
                headers.insert(
                    http::header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                    http::HeaderValue::from_static("true"),
                );
                headers.insert(http::header::VARY, http::HeaderValue::from_static("Origin"));
            }
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use stowage_auth::CredentialRegistry;
    use stowage_client::StorageConfig;

    use super::*;

    fn test_state(origins: Vec<String>) -> AppState {
        let registry = CredentialRegistry::new("ocid1.tenancy.oc1..testtenancy", Vec::new());
        AppState {
            storage: ObjectStorageClient::new(StorageConfig::builder().build(), registry),
            directory: None,
            audit: AuditLog::new("./logs"),
            allowed_origins: origins,
        }
    }

    fn empty_response() -> ApiResponse {
        http::Response::builder()
            .status(http::StatusCode::OK)
            .body(http_body_util::Full::new(bytes::Bytes::new()))
            .expect("should build response")
    }

    #[test]
    fn test_should_add_request_id_header() {
        let state = test_state(Vec::new());
        let response = finalize(empty_response(), &state, None, "req-123");
        assert_eq!(
            response.headers().get("x-request-id").map(|v| v.as_bytes()),
            Some(b"req-123".as_ref())
        );
    }

    #[test]
    fn test_should_grant_cors_for_allow_listed_origin() {
        let state = test_state(vec!["http://localhost:5173".to_owned()]);
        let response = finalize(
            empty_response(),
            &state,
            Some("http://localhost:5173"),
            "req-1",
        );
        assert_eq!(
            response
                .headers()
                .get(http::header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .map(|v| v.as_bytes()),
            Some(b"http://localhost:5173".as_ref())
        );
        assert_eq!(
            response
                .headers()
                .get(http::header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .map(|v| v.as_bytes()),
            Some(b"true".as_ref())
        );
    }

    #[test]
    fn test_should_not_grant_cors_for_unknown_origin() {
        let state = test_state(vec!["http://localhost:5173".to_owned()]);
        let response = finalize(empty_response(), &state, Some("https://evil.test"), "req-1");
        assert!(
            response
                .headers()
                .get(http::header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }

    #[test]
    fn test_should_answer_preflight_with_allowed_methods() {
        let response = preflight_response();
        assert_eq!(response.status(), http::StatusCode::OK);
        let methods = response
            .headers()
            .get(http::header::ACCESS_CONTROL_ALLOW_METHODS)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        assert!(methods.contains("DELETE"));
    }
}
