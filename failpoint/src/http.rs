//! The optional admin HTTP surface (`http` feature). Lets an operator
//! enable/disable/inspect failpoints in a running process without a
//! redeploy, mirroring the upstream `failpoint-ctl http` verb table.
//!
//! | Method | Path      | Effect                                   |
//! |--------|-----------|-------------------------------------------|
//! | GET    | `/`       | newline-separated `NAME=TERMS` list       |
//! | GET    | `/:name`  | the terms string installed on `name`      |
//! | PUT    | `/:name`  | enable `name` with the request body       |
//! | DELETE | `/:name`  | disable `name`                            |
//! | other  | any       | `405 Method Not Allowed`                  |

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Router, body::Bytes};
use tracing::{info, warn};

use crate::error::FailpointError;
use crate::registry::Registry;

fn status_code_for(err: &FailpointError) -> StatusCode {
    match err {
        FailpointError::NotExist(_) => StatusCode::NOT_FOUND,
        FailpointError::Disabled(_) => StatusCode::NOT_FOUND,
        FailpointError::NotAllowed(_) => StatusCode::BAD_REQUEST,
        FailpointError::Parse(_) => StatusCode::BAD_REQUEST,
    }
}

async fn list() -> String {
    let registry = Registry::global();
    registry
        .list()
        .into_iter()
        .filter_map(|name| {
            let terms = registry.status(&name).ok()?;
            Some(format!("{name}={terms}"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

async fn get_one(Path(name): Path<String>) -> (StatusCode, String) {
    match Registry::global().status(&name) {
        Ok(terms) => (StatusCode::OK, terms),
        Err(e) => (status_code_for(&e), e.to_string()),
    }
}

async fn put_one(Path(name): Path<String>, body: Bytes) -> (StatusCode, String) {
    let terms = String::from_utf8_lossy(&body);
    match Registry::global().enable(&name, &terms) {
        Ok(()) => (StatusCode::NO_CONTENT, String::new()),
        Err(e) => (status_code_for(&e), e.to_string()),
    }
}

async fn delete_one(Path(name): Path<String>) -> (StatusCode, String) {
    match Registry::global().disable(&name) {
        Ok(()) => (StatusCode::NO_CONTENT, String::new()),
        // Disabling an already-disabled or never-enabled failpoint is
        // a client error, not a server one: 400, as specified.
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()),
    }
}

fn router() -> Router {
    Router::new()
        .route("/", get(list))
        .route("/{name}", get(get_one).put(put_one).delete(delete_one))
}

/// Starts the admin server on its own background OS thread, each
/// running a single-threaded Tokio runtime. The rest of `failpoint` is
/// synchronous; this is the one component that legitimately needs an
/// async runtime, so it gets the smallest one that will do the job
/// rather than pulling the whole crate onto `tokio`.
pub(crate) fn spawn_admin_server(addr: String) {
    std::thread::Builder::new()
        .name("failpoint-http".into())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_io()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    warn!(error = %e, "failed to start failpoint admin runtime");
                    return;
                }
            };
            rt.block_on(async move {
                let listener = match tokio::net::TcpListener::bind(&addr).await {
                    Ok(l) => l,
                    Err(e) => {
                        warn!(%addr, error = %e, "failed to bind failpoint admin listener");
                        return;
                    }
                };
                info!(%addr, "failpoint admin server listening");
                if let Err(e) = axum::serve(listener, router()).await {
                    warn!(error = %e, "failpoint admin server exited");
                }
            });
        })
        .expect("failed to spawn failpoint-http thread");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn get_one_reports_404_for_an_unknown_name() {
        let (status, _) = get_one(Path("http::tests::never-enabled".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn put_then_get_round_trips_the_terms_string() {
        let name = "http::tests::round-trip".to_string();
        let (put_status, _) = put_one(Path(name.clone()), Bytes::from_static(b"return(1)")).await;
        assert_eq!(put_status, StatusCode::NO_CONTENT);

        let (get_status, body) = get_one(Path(name.clone())).await;
        assert_eq!(get_status, StatusCode::OK);
        assert_eq!(body, "return(1)");

        let (del_status, _) = delete_one(Path(name)).await;
        assert_eq!(del_status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn put_with_unparseable_terms_is_a_400() {
        let name = "http::tests::bad-terms".to_string();
        let (status, _) = put_one(Path(name), Bytes::from_static(b"not a term")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_on_an_absent_name_is_a_400() {
        let (status, _) = delete_one(Path("http::tests::never-existed".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_includes_enabled_names_and_excludes_deleted_ones() {
        let name = "http::tests::listed".to_string();
        put_one(Path(name.clone()), Bytes::from_static(b"return(1)")).await;
        assert!(list().await.lines().any(|l| l.starts_with(&name)));

        delete_one(Path(name.clone())).await;
        assert!(!list().await.lines().any(|l| l.starts_with(&name)));
    }
}
