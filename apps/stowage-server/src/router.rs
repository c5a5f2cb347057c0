//! Request routing for the bucket-provisioning API.
//!
//! Routes are matched on the method and the percent-decoded path. Object
//! names may contain slashes, so the object delete route captures the whole
//! path remainder after `/objects/`.

use http::Method;
use percent_encoding::percent_decode_str;
use stowage_model::api::RouteInfo;

/// A matched route with its extracted path parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `GET /` service banner.
    ServiceInfo,
    /// `GET /health` liveness probe.
    Health,
    /// `GET /__routes` route listing.
    RouteTable,
    /// `POST /login` development token issuance.
    Login,
    /// `GET /user/groups` directory membership lookup.
    UserGroups,
    /// `GET /namespace` Object Storage namespace.
    Namespace,
    /// `POST /buckets` bucket creation.
    CreateBucket,
    /// `GET /buckets` bucket listing.
    ListBuckets,
    /// `DELETE /buckets/{bucket}` bucket deletion.
    DeleteBucket(String),
    /// `GET /buckets/{bucket}/objects` object listing.
    ListObjects(String),
    /// `DELETE /buckets/{bucket}/objects/{object}` object deletion. The
    /// object name is the full remainder, slashes included.
    DeleteObject(String, String),
    /// `POST /buckets/{bucket}/upload` object upload.
    Upload(String),
}

/// Match a request method and path to a route.
#[must_use]
pub fn resolve(method: &Method, path: &str) -> Option<Route> {
    match path {
        "/" => (method == Method::GET).then_some(Route::ServiceInfo),
        "/health" => (method == Method::GET).then_some(Route::Health),
        "/__routes" => (method == Method::GET).then_some(Route::RouteTable),
        "/login" => (method == Method::POST).then_some(Route::Login),
        "/user/groups" => (method == Method::GET).then_some(Route::UserGroups),
        "/namespace" => (method == Method::GET).then_some(Route::Namespace),
        "/buckets" | "/buckets/" => {
            if method == Method::POST {
                Some(Route::CreateBucket)
            } else if method == Method::GET {
                Some(Route::ListBuckets)
            } else {
                None
            }
        }
        _ => resolve_bucket_scoped(method, path),
    }
}

/// Match the `/buckets/{bucket}/...` routes.
fn resolve_bucket_scoped(method: &Method, path: &str) -> Option<Route> {
    let remainder = path.strip_prefix("/buckets/")?;
    let (bucket, rest) = match remainder.find('/') {
        Some(pos) => (&remainder[..pos], &remainder[pos..]),
        None => (remainder, ""),
    };
    if bucket.is_empty() {
        return None;
    }
    let bucket = decode_segment(bucket);

    match rest {
        "" => (method == Method::DELETE).then_some(Route::DeleteBucket(bucket)),
        "/objects" | "/objects/" => (method == Method::GET).then_some(Route::ListObjects(bucket)),
        "/upload" => (method == Method::POST).then_some(Route::Upload(bucket)),
        _ => {
            let object = rest.strip_prefix("/objects/")?;
            if object.is_empty() {
                return None;
            }
            (method == Method::DELETE)
                .then(|| Route::DeleteObject(bucket, decode_segment(object)))
        }
    }
}

fn decode_segment(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// The table served by `GET /__routes`.
#[must_use]
pub fn route_table() -> Vec<RouteInfo> {
    let entry = |path: &str, methods: &[&str]| RouteInfo {
        path: path.to_owned(),
        methods: methods.iter().map(ToString::to_string).collect(),
    };
    vec![
        entry("/", &["GET"]),
        entry("/health", &["GET"]),
        entry("/__routes", &["GET"]),
        entry("/login", &["POST"]),
        entry("/user/groups", &["GET"]),
        entry("/namespace", &["GET"]),
        entry("/buckets", &["GET", "POST"]),
        entry("/buckets/{bucket}", &["DELETE"]),
        entry("/buckets/{bucket}/objects", &["GET"]),
        entry("/buckets/{bucket}/objects/{object}", &["DELETE"]),
        entry("/buckets/{bucket}/upload", &["POST"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_resolve_fixed_routes() {
        assert_eq!(resolve(&Method::GET, "/"), Some(Route::ServiceInfo));
        assert_eq!(resolve(&Method::GET, "/health"), Some(Route::Health));
        assert_eq!(resolve(&Method::GET, "/__routes"), Some(Route::RouteTable));
        assert_eq!(resolve(&Method::POST, "/login"), Some(Route::Login));
        assert_eq!(resolve(&Method::GET, "/user/groups"), Some(Route::UserGroups));
        assert_eq!(resolve(&Method::GET, "/namespace"), Some(Route::Namespace));
    }

    #[test]
    fn test_should_resolve_bucket_collection_by_method() {
        assert_eq!(resolve(&Method::POST, "/buckets"), Some(Route::CreateBucket));
        assert_eq!(resolve(&Method::GET, "/buckets"), Some(Route::ListBuckets));
        assert_eq!(resolve(&Method::GET, "/buckets/"), Some(Route::ListBuckets));
        assert_eq!(resolve(&Method::PUT, "/buckets"), None);
    }

    #[test]
    fn test_should_resolve_bucket_scoped_routes() {
        assert_eq!(
            resolve(&Method::DELETE, "/buckets/logs"),
            Some(Route::DeleteBucket("logs".to_owned()))
        );
        assert_eq!(
            resolve(&Method::GET, "/buckets/logs/objects"),
            Some(Route::ListObjects("logs".to_owned()))
        );
        assert_eq!(
            resolve(&Method::POST, "/buckets/logs/upload"),
            Some(Route::Upload("logs".to_owned()))
        );
    }

    #[test]
    fn test_should_capture_object_path_remainder() {
        assert_eq!(
            resolve(&Method::DELETE, "/buckets/logs/objects/2024/07/app.log"),
            Some(Route::DeleteObject(
                "logs".to_owned(),
                "2024/07/app.log".to_owned()
            ))
        );
    }

    #[test]
    fn test_should_percent_decode_path_parameters() {
        assert_eq!(
            resolve(&Method::DELETE, "/buckets/my%20bucket"),
            Some(Route::DeleteBucket("my bucket".to_owned()))
        );
        assert_eq!(
            resolve(&Method::DELETE, "/buckets/b/objects/dir%2Ffile.txt"),
            Some(Route::DeleteObject("b".to_owned(), "dir/file.txt".to_owned()))
        );
    }

    #[test]
    fn test_should_reject_wrong_methods_on_bucket_routes() {
        assert_eq!(resolve(&Method::GET, "/buckets/logs"), None);
        assert_eq!(resolve(&Method::POST, "/buckets/logs/objects"), None);
        assert_eq!(resolve(&Method::GET, "/buckets/logs/upload"), None);
    }

    #[test]
    fn test_should_reject_unknown_paths() {
        assert_eq!(resolve(&Method::GET, "/unknown"), None);
        assert_eq!(resolve(&Method::DELETE, "/buckets//objects"), None);
        assert_eq!(resolve(&Method::DELETE, "/buckets/b/objects/"), None);
        assert_eq!(resolve(&Method::GET, "/buckets/b/extra"), None);
    }

    #[test]
    fn test_should_list_every_route_once() {
        let table = route_table();
        assert_eq!(table.len(), 11);
        let buckets = table
            .iter()
            .find(|entry| entry.path == "/buckets")
            .expect("should list /buckets");
        assert_eq!(buckets.methods, vec!["GET", "POST"]);
    }
}
