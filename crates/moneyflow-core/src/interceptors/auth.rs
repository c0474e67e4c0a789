use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::auth::Session;
use crate::cache::CacheRegistry;
use crate::rpc::{Interceptor, Next, RpcMethod, RpcRequest, RpcResult};

const AUTHORIZATION: &str = "authorization";

/// Adds the session's bearer token and expires the session when the
/// backend rejects it. Cached responses belong to the expired identity and
/// are dropped with it.
pub struct AuthInterceptor {
    session: Arc<Session>,
    caches: Arc<CacheRegistry>,
}

impl AuthInterceptor {
    pub fn new(session: Arc<Session>, caches: Arc<CacheRegistry>) -> Self {
        Self { session, caches }
    }
}

#[async_trait]
impl Interceptor for AuthInterceptor {
    async fn intercept(&self, mut request: RpcRequest, next: Next<'_>) -> RpcResult<Value> {
        if let Some(token) = self.session.token() {
            request
                .metadata
                .insert(AUTHORIZATION.to_string(), format!("Bearer {}", token));
        }
        let method = request.method;

        match next.run(request).await {
            // A rejected login is a bad password, not an expired session
            Err(e) if e.is_unauthenticated() && method != RpcMethod::Login => {
                warn!(method = %method, "Backend rejected credentials, login required");
                if let Err(clear_err) = self.session.expire() {
                    warn!(error = %clear_err, "Failed to remove expired session");
                }
                self.caches.clear_all();
                Err(e)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthState, SessionData};
    use crate::cache::CacheProfile;
    use crate::rpc::testing::FakeTransport;
    use crate::rpc::{Code, Pipeline};
    use serde_json::json;

    fn signed_in(dir: &tempfile::TempDir) -> Arc<Session> {
        let session = Arc::new(Session::new(dir.path().to_path_buf()));
        session
            .update(SessionData::new("secret".to_string(), "alice".to_string()))
            .unwrap();
        session
    }

    #[tokio::test]
    async fn test_adds_bearer_token() {
        let dir = tempfile::tempdir().unwrap();
        let session = signed_in(&dir);
        let transport = Arc::new(FakeTransport::new(json!({})));
        let pipeline = Pipeline::new(transport.clone())
            .with(AuthInterceptor::new(session, Arc::new(CacheRegistry::new())));

        pipeline
            .call(RpcRequest::new("http://api", RpcMethod::ListTags, json!({})))
            .await
            .unwrap();

        let sent = transport.last_request().unwrap();
        assert_eq!(
            sent.metadata.get(AUTHORIZATION).map(String::as_str),
            Some("Bearer secret")
        );
    }

    #[tokio::test]
    async fn test_no_header_when_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let session = Arc::new(Session::new(dir.path().to_path_buf()));
        let transport = Arc::new(FakeTransport::new(json!({})));
        let pipeline = Pipeline::new(transport.clone())
            .with(AuthInterceptor::new(session, Arc::new(CacheRegistry::new())));

        pipeline
            .call(RpcRequest::new("http://api", RpcMethod::Login, json!({})))
            .await
            .unwrap();

        assert!(transport.last_request().unwrap().metadata.is_empty());
    }

    #[tokio::test]
    async fn test_unauthenticated_expires_session() {
        let dir = tempfile::tempdir().unwrap();
        let session = signed_in(&dir);
        let transport = Arc::new(FakeTransport::new(json!({})));
        transport.fail_next(Code::Unauthenticated);
        let caches = Arc::new(CacheRegistry::new());
        caches
            .get(CacheProfile::Default)
            .set("k", json!({"tags": []}));
        let pipeline = Pipeline::new(transport.clone())
            .with(AuthInterceptor::new(session.clone(), caches.clone()));

        let err = pipeline
            .call(RpcRequest::new("http://api", RpcMethod::ListAccounts, json!({})))
            .await
            .unwrap_err();

        assert!(err.is_unauthenticated());
        assert_eq!(session.token(), None);
        assert_eq!(session.state(), AuthState::LoginRequired);
        assert!(caches.get(CacheProfile::Default).is_empty());
    }

    #[tokio::test]
    async fn test_other_errors_keep_session() {
        let dir = tempfile::tempdir().unwrap();
        let session = signed_in(&dir);
        let transport = Arc::new(FakeTransport::new(json!({})));
        transport.fail_next(Code::NotFound);
        let pipeline = Pipeline::new(transport.clone())
            .with(AuthInterceptor::new(session.clone(), Arc::new(CacheRegistry::new())));

        let err = pipeline
            .call(RpcRequest::new("http://api", RpcMethod::ListAccounts, json!({})))
            .await
            .unwrap_err();

        assert_eq!(err.code(), Code::NotFound);
        assert_eq!(session.state(), AuthState::Authenticated);
    }

    #[tokio::test]
    async fn test_rejected_login_keeps_existing_session() {
        let dir = tempfile::tempdir().unwrap();
        let session = signed_in(&dir);
        let transport = Arc::new(FakeTransport::new(json!({})));
        transport.fail_next(Code::Unauthenticated);
        let caches = Arc::new(CacheRegistry::new());
        caches.get(CacheProfile::Default).set("k", json!({"tags": []}));
        let pipeline = Pipeline::new(transport.clone())
            .with(AuthInterceptor::new(session.clone(), caches.clone()));

        let err = pipeline
            .call(RpcRequest::new("http://api", RpcMethod::Login, json!({"username": "alice"})))
            .await
            .unwrap_err();

        assert!(err.is_unauthenticated());
        assert_eq!(session.token().as_deref(), Some("secret"));
        assert_eq!(session.state(), AuthState::Authenticated);
        assert_eq!(caches.get(CacheProfile::Default).len(), 1);
    }
}
