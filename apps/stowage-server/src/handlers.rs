//! Route handlers for the bucket-provisioning API.
//!
//! Every handler returns a complete JSON response. Failures use a uniform
//! `{"detail": ...}` body with the status derived from the underlying error.

use std::sync::LazyLock;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http::request::Parts;
use http::{Response, StatusCode};
use http_body_util::Full;
use regex::Regex;
use serde::Serialize;
use stowage_auth::{AuthError, Environment};
use stowage_client::{StorageError, is_compartment_ocid};
use stowage_model::api::{
    ApiError, BucketCreated, BucketDeleted, BucketList, Health, LoginRequest, LoginResponse,
    MembershipEntry, NamespaceResponse, ObjectDeleted, ObjectList, ServiceInfo, UploadJson,
    UploadResult, UserGroups,
};
use tracing::{info, warn};

use crate::multipart;
use crate::router;
use crate::service::AppState;

/// Response type produced by every handler.
pub type ApiResponse = Response<Full<Bytes>>;

/// Prefix of the development tokens issued by the login route.
const DEV_TOKEN_PREFIX: &str = "dev-token-for-";

/// Compartment token embedded in directory group labels, e.g.
/// `Equipe CP-UploadFotos` carries `CP-UploadFotos`.
static GROUP_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)cp[-_][A-Za-z0-9\-_]+").expect("group token pattern should compile")
});

/// Serialize a body into a JSON response.
fn json_response<T: Serialize>(status: StatusCode, body: &T) -> ApiResponse {
    let payload = serde_json::to_vec(body).unwrap_or_default();
    Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(payload)))
        .expect("response with static headers should build")
}

fn error_response(status: StatusCode, detail: impl Into<String>) -> ApiResponse {
    json_response(status, &ApiError::new(detail))
}

/// The 404 response for unmatched routes.
#[must_use]
pub fn not_found() -> ApiResponse {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

/// A 500 response with the given detail.
#[must_use]
pub fn internal_error(detail: &str) -> ApiResponse {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, detail)
}

/// Map a storage error to its response.
fn storage_error_response(error: &StorageError) -> ApiResponse {
    let status = match error {
        StorageError::Auth(
            AuthError::UnresolvedEnvironment(_) | AuthError::UnknownEnvironment(_),
        ) => StatusCode::UNPROCESSABLE_ENTITY,
        StorageError::CompartmentNotFound(_) => StatusCode::NOT_FOUND,
        StorageError::BucketNotEmpty(_) => StatusCode::CONFLICT,
        StorageError::Api { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        StorageError::Transport(_) => StatusCode::BAD_GATEWAY,
        StorageError::Auth(_) | StorageError::NamespaceUnavailable | StorageError::Serialization(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, error.to_string())
}

/// Parse a query or urlencoded-form string into key/value pairs.
fn parse_pairs(input: &[u8]) -> Vec<(String, String)> {
    form_urlencoded::parse(input)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

fn query_params(parts: &Parts) -> Vec<(String, String)> {
    parse_pairs(parts.uri.query().unwrap_or("").as_bytes())
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Trim a parameter and treat the textual placeholders `null`, `none` and
/// `undefined` the same as an absent value.
pub fn sanitize_param(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("null")
        || trimmed.eq_ignore_ascii_case("none")
        || trimmed.eq_ignore_ascii_case("undefined")
    {
        return None;
    }
    Some(trimmed.to_owned())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|value| !value.is_empty()).map(ToOwned::to_owned)
}

/// Pull the compartment token out of a directory group label.
pub fn compartment_from_group(label: &str) -> Option<String> {
    GROUP_TOKEN.find(label).map(|token| token.as_str().to_owned())
}

/// Extract the email from a `Bearer dev-token-for-...` Authorization header.
fn bearer_email(parts: &Parts) -> Result<String, ApiResponse> {
    let Some(header) = parts
        .headers
        .get(http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    else {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Authorization header required",
        ));
    };

    let mut pieces = header.split_whitespace();
    let (Some(scheme), Some(token), None) = (pieces.next(), pieces.next(), pieces.next()) else {
        return Err(error_response(StatusCode::UNAUTHORIZED, "Invalid auth header"));
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(error_response(StatusCode::UNAUTHORIZED, "Invalid auth header"));
    }

    token
        .strip_prefix(DEV_TOKEN_PREFIX)
        .map(ToOwned::to_owned)
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "Unsupported token"))
}

fn audit_user(parts: &Parts) -> String {
    bearer_email(parts).unwrap_or_else(|_| "anonymous".to_owned())
}

fn is_plausible_email(email: &str) -> bool {
    email
        .rsplit_once('@')
        .is_some_and(|(_, domain)| domain.contains('.'))
}

/// Parse the `env` query parameter, required on routes that carry no
/// classifiable compartment name.
fn required_environment(params: &[(String, String)]) -> Result<Environment, ApiResponse> {
    let Some(value) = sanitize_param(param(params, "env")) else {
        return Err(error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Provide 'env' (dev or prd) to select signing credentials",
        ));
    };
    parse_environment(&value)
}

fn parse_environment(value: &str) -> Result<Environment, ApiResponse> {
    value.parse().map_err(|_| {
        error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Unknown environment '{value}', expected dev or prd"),
        )
    })
}

/// The `env` parameter with a fallback to the first registered environment.
fn selected_environment(
    state: &AppState,
    params: &[(String, String)],
) -> Result<Environment, ApiResponse> {
    match sanitize_param(param(params, "env")) {
        Some(value) => parse_environment(&value),
        None => default_environment(state).ok_or_else(|| {
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "No credential environments are configured",
            )
        }),
    }
}

fn default_environment(state: &AppState) -> Option<Environment> {
    state.storage.registry().environments().next()
}

/// Form fields from an urlencoded or multipart body, when one was sent.
fn form_fields(parts: &Parts, body: &Bytes) -> Option<Vec<(String, String)>> {
    let content_type = parts
        .headers
        .get(http::header::CONTENT_TYPE)?
        .to_str()
        .ok()?;
    let lower = content_type.to_ascii_lowercase();

    if lower.starts_with("application/x-www-form-urlencoded") {
        return Some(parse_pairs(body));
    }
    if lower.starts_with("multipart/form-data") {
        let boundary = multipart::extract_boundary(content_type).ok()?;
        let form = multipart::parse_form(body, &boundary);
        return Some(form.fields.into_iter().collect());
    }
    None
}

/// JSON object body, when the request declared one.
fn json_object(parts: &Parts, body: &Bytes) -> Option<serde_json::Value> {
    let content_type = parts
        .headers
        .get(http::header::CONTENT_TYPE)?
        .to_str()
        .ok()?;
    if !content_type.to_ascii_lowercase().contains("application/json") {
        return None;
    }
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .filter(serde_json::Value::is_object)
}

/// `GET /` service banner.
#[must_use]
pub fn service_info() -> ApiResponse {
    json_response(
        StatusCode::OK,
        &ServiceInfo {
            name: env!("CARGO_PKG_NAME").to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            ok: true,
            health: "/health".to_owned(),
            routes: "/__routes".to_owned(),
        },
    )
}

/// `GET /health` liveness probe.
#[must_use]
pub fn health() -> ApiResponse {
    json_response(StatusCode::OK, &Health { ok: true })
}

/// `GET /__routes` route listing.
#[must_use]
pub fn route_table() -> ApiResponse {
    json_response(StatusCode::OK, &router::route_table())
}

/// `POST /login` issues a development bearer token for a plausible email.
pub async fn login(state: &AppState, body: &Bytes) -> ApiResponse {
    let request = match serde_json::from_slice::<LoginRequest>(body) {
        Ok(request) => request,
        Err(_) => return error_response(StatusCode::UNPROCESSABLE_ENTITY, "email required"),
    };
    let Some(email) = request
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty())
    else {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "email required");
    };
    if !is_plausible_email(email) {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "invalid email");
    }

    state.audit.login(email).await;
    info!(email, "Issued development token");
    json_response(
        StatusCode::OK,
        &LoginResponse {
            access_token: format!("{DEV_TOKEN_PREFIX}{email}"),
            token_type: "bearer".to_owned(),
        },
    )
}

/// `GET /user/groups` looks up directory memberships for the caller.
pub async fn user_groups(state: &AppState, parts: &Parts) -> ApiResponse {
    let email = match bearer_email(parts) {
        Ok(email) => email,
        Err(response) => return response,
    };
    let Some(directory) = state.directory.as_ref() else {
        return error_response(
            StatusCode::BAD_GATEWAY,
            "Directory lookups are not configured",
        );
    };

    match directory.member_of(&email).await {
        Ok(items) => {
            let member_of = items
                .into_iter()
                .map(|item| MembershipEntry {
                    id: item.id,
                    display_name: item.display_name,
                    odata_type: item.odata_type,
                })
                .collect();
            json_response(StatusCode::OK, &UserGroups { email, member_of })
        }
        Err(error) => {
            warn!(%error, email, "Directory lookup failed");
            error_response(
                StatusCode::BAD_GATEWAY,
                format!("Directory lookup failed: {error}"),
            )
        }
    }
}

/// `GET /namespace` returns the Object Storage namespace.
pub async fn namespace(state: &AppState, parts: &Parts) -> ApiResponse {
    let params = query_params(parts);
    let environment = match selected_environment(state, &params) {
        Ok(environment) => environment,
        Err(response) => return response,
    };
    match state.storage.namespace(environment).await {
        Ok(namespace) => json_response(StatusCode::OK, &NamespaceResponse { namespace }),
        Err(error) => storage_error_response(&error),
    }
}

/// `POST /buckets` creates a bucket in the compartment named by `child` or
/// extracted from a `group` label.
///
/// Each field is taken from the first of query, form and JSON body that
/// carries a non-empty value.
pub async fn create_bucket(state: &AppState, parts: &Parts, body: &Bytes) -> ApiResponse {
    let params = query_params(parts);
    let form = form_fields(parts, body);
    let json = json_object(parts, body);

    let raw_field = |name: &str| -> Option<String> {
        non_empty(param(&params, name))
            .or_else(|| {
                form.as_deref()
                    .and_then(|form| non_empty(param(form, name)))
            })
            .or_else(|| {
                json.as_ref()
                    .and_then(|json| json.get(name))
                    .and_then(serde_json::Value::as_str)
                    .and_then(|value| non_empty(Some(value)))
            })
    };

    let Some(bucket_name) = sanitize_param(raw_field("name").as_deref()) else {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Provide 'name' (bucket name) via query, form or JSON body",
        );
    };

    let child = sanitize_param(raw_field("child").as_deref());
    let group = sanitize_param(raw_field("group").as_deref());
    let child = child.or_else(|| group.as_deref().and_then(compartment_from_group));
    let Some(child) = child else {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Provide 'child' (compartment OCID or name) or 'group' (group label)",
        );
    };

    let (environment, compartment_ocid) = if is_compartment_ocid(&child) {
        match required_environment(&params) {
            Ok(environment) => (environment, child.clone()),
            Err(response) => return response,
        }
    } else {
        match state.storage.resolve_compartment(&child).await {
            Ok(resolved) => resolved,
            Err(StorageError::CompartmentNotFound(_)) => {
                return error_response(
                    StatusCode::NOT_FOUND,
                    format!("Compartment '{child}' not found"),
                );
            }
            Err(error) => return storage_error_response(&error),
        }
    };

    if let Err(error) = state
        .storage
        .create_bucket(environment, &bucket_name, &compartment_ocid)
        .await
    {
        return storage_error_response(&error);
    }

    state
        .audit
        .bucket_created(&audit_user(parts), &bucket_name, &compartment_ocid)
        .await;
    info!(bucket = bucket_name, compartment = compartment_ocid, "Created bucket");
    json_response(
        StatusCode::OK,
        &BucketCreated {
            created: true,
            bucket: bucket_name,
            compartment_ocid,
        },
    )
}

/// `GET /buckets` lists buckets in the selected compartment.
///
/// With no `child` or `group` parameter the configured fallback compartment
/// is listed. An unresolvable compartment name yields an empty listing with
/// a warning instead of an error.
pub async fn list_buckets(state: &AppState, parts: &Parts) -> ApiResponse {
    let params = query_params(parts);
    let child = sanitize_param(param(&params, "child"));
    let group = sanitize_param(param(&params, "group"));
    let child = child.or_else(|| group.as_deref().and_then(compartment_from_group));

    let Some(child) = child else {
        let environment = match required_environment(&params) {
            Ok(environment) => environment,
            Err(response) => return response,
        };
        let compartment = state.storage.fallback_compartment().to_owned();
        return match state.storage.list_buckets(environment, &compartment).await {
            Ok(buckets) => json_response(StatusCode::OK, &BucketList { buckets, warning: None }),
            Err(error) => storage_error_response(&error),
        };
    };

    let (environment, compartment_ocid) = if is_compartment_ocid(&child) {
        match required_environment(&params) {
            Ok(environment) => (environment, child.clone()),
            Err(response) => return response,
        }
    } else {
        match state.storage.resolve_compartment(&child).await {
            Ok(resolved) => resolved,
            Err(StorageError::CompartmentNotFound(_)) => {
                return json_response(
                    StatusCode::OK,
                    &BucketList {
                        buckets: Vec::new(),
                        warning: Some(format!("Compartment '{child}' not found")),
                    },
                );
            }
            Err(StorageError::Auth(error @ AuthError::UnresolvedEnvironment(_))) => {
                return json_response(
                    StatusCode::OK,
                    &BucketList {
                        buckets: Vec::new(),
                        warning: Some(error.to_string()),
                    },
                );
            }
            Err(error) => return storage_error_response(&error),
        }
    };

    match state
        .storage
        .list_buckets(environment, &compartment_ocid)
        .await
    {
        Ok(buckets) => json_response(StatusCode::OK, &BucketList { buckets, warning: None }),
        Err(error) => storage_error_response(&error),
    }
}

/// `DELETE /buckets/{bucket}` deletes an empty bucket.
pub async fn delete_bucket(state: &AppState, parts: &Parts, bucket: &str) -> ApiResponse {
    let params = query_params(parts);
    let environment = match required_environment(&params) {
        Ok(environment) => environment,
        Err(response) => return response,
    };

    match state.storage.delete_bucket(environment, bucket).await {
        Ok(()) => {
            state.audit.bucket_deleted(&audit_user(parts), bucket).await;
            info!(bucket, "Deleted bucket");
            json_response(
                StatusCode::OK,
                &BucketDeleted {
                    deleted: true,
                    bucket: bucket.to_owned(),
                },
            )
        }
        Err(error) => storage_error_response(&error),
    }
}

/// `GET /buckets/{bucket}/objects` lists objects in a bucket.
pub async fn list_objects(state: &AppState, parts: &Parts, bucket: &str) -> ApiResponse {
    let params = query_params(parts);
    let environment = match required_environment(&params) {
        Ok(environment) => environment,
        Err(response) => return response,
    };

    match state.storage.list_objects(environment, bucket).await {
        Ok(objects) => json_response(
            StatusCode::OK,
            &ObjectList {
                bucket: bucket.to_owned(),
                objects,
            },
        ),
        Err(error) => storage_error_response(&error),
    }
}

/// `DELETE /buckets/{bucket}/objects/{object}` deletes one object.
pub async fn delete_object(
    state: &AppState,
    parts: &Parts,
    bucket: &str,
    object: &str,
) -> ApiResponse {
    let params = query_params(parts);
    let environment = match required_environment(&params) {
        Ok(environment) => environment,
        Err(response) => return response,
    };

    match state.storage.delete_object(environment, bucket, object).await {
        Ok(()) => json_response(
            StatusCode::OK,
            &ObjectDeleted {
                deleted: true,
                bucket: bucket.to_owned(),
                object: object.to_owned(),
            },
        ),
        Err(error) => storage_error_response(&error),
    }
}

/// `POST /buckets/{bucket}/upload` stores an object from one of three body
/// shapes: a multipart file, JSON with base64 content, or the raw body.
///
/// The object name is taken from the first of the `object_name` query
/// parameter, the `X-Object-Name` header, the form field or JSON field, and
/// the uploaded filename.
pub async fn upload(state: &AppState, parts: &Parts, bucket: &str, body: &Bytes) -> ApiResponse {
    let params = query_params(parts);
    let environment = match required_environment(&params) {
        Ok(environment) => environment,
        Err(response) => return response,
    };

    let name_from_query = sanitize_param(param(&params, "object_name"));
    let name_from_header = sanitize_param(
        parts
            .headers
            .get("x-object-name")
            .and_then(|value| value.to_str().ok()),
    );

    let content_type = parts
        .headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if content_type
        .to_ascii_lowercase()
        .starts_with("multipart/form-data")
    {
        let boundary = match multipart::extract_boundary(content_type) {
            Ok(boundary) => boundary,
            Err(message) => return error_response(StatusCode::UNPROCESSABLE_ENTITY, message),
        };
        let form = multipart::parse_form(body, &boundary);
        let Some(file) = form.file else {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Multipart upload requires a 'file' part",
            );
        };
        let object_name = name_from_query
            .or(name_from_header)
            .or_else(|| sanitize_param(form.fields.get("object_name").map(String::as_str)))
            .or_else(|| sanitize_param(file.filename.as_deref()))
            .unwrap_or_else(|| "upload.bin".to_owned());
        return store_object(state, environment, bucket, &object_name, file.data.to_vec()).await;
    }

    if content_type.to_ascii_lowercase().contains("application/json") {
        if let Ok(json) = serde_json::from_slice::<UploadJson>(body) {
            if let Some(encoded) = json.content_b64.as_deref().filter(|value| !value.is_empty()) {
                let data = match STANDARD.decode(encoded) {
                    Ok(data) => data,
                    Err(_) => {
                        return error_response(
                            StatusCode::UNPROCESSABLE_ENTITY,
                            "Invalid 'content_b64', expected base64",
                        );
                    }
                };
                let Some(object_name) = name_from_query
                    .or(name_from_header)
                    .or_else(|| sanitize_param(json.object_name.as_deref()))
                else {
                    return error_response(
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "Provide 'object_name' in the JSON body or via ?object_name=/X-Object-Name",
                    );
                };
                return store_object(state, environment, bucket, &object_name, data).await;
            }
        }
        // A JSON body without content_b64 falls through to the raw path.
    }

    if !body.is_empty() {
        let Some(object_name) = name_from_query.or(name_from_header) else {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Provide 'object_name' via query (?object_name=) or the X-Object-Name header",
            );
        };
        return store_object(state, environment, bucket, &object_name, body.to_vec()).await;
    }

    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Send a multipart file, JSON with content_b64 and object_name, or a raw body with object_name",
    )
}

/// Store object bytes with a content type guessed from the object name.
async fn store_object(
    state: &AppState,
    environment: Environment,
    bucket: &str,
    object_name: &str,
    content: Vec<u8>,
) -> ApiResponse {
    let content_type = mime_guess::from_path(object_name)
        .first_or_octet_stream()
        .essence_str()
        .to_owned();

    match state
        .storage
        .put_object(environment, bucket, object_name, &content_type, content)
        .await
    {
        Ok(()) => {
            info!(bucket, object = object_name, "Stored object");
            json_response(
                StatusCode::OK,
                &UploadResult {
                    uploaded: true,
                    bucket: bucket.to_owned(),
                    object: object_name.to_owned(),
                },
            )
        }
        Err(error) => storage_error_response(&error),
    }
}
