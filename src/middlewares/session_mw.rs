use std::future::{Ready, ready};

use actix_web::{
    Error, HttpMessage, HttpRequest,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;

pub const SESSION_COOKIE: &str = "sessionId";
pub const SESSION_HEADER: &str = "x-session-id";

/// Session token carried by the request itself rather than its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(pub String);

/// Lifts the session token from the `X-Session-Id` header or, failing that,
/// the `sessionId` cookie into request extensions. Never rejects a request;
/// handlers decide whether a missing token is an error.
pub struct SessionCredential;

impl<S, B> Transform<S, ServiceRequest> for SessionCredential
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = SessionCredentialMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionCredentialMiddleware { service }))
    }
}

pub struct SessionCredentialMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for SessionCredentialMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let from_header = req
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from);

        let token = from_header.or_else(|| {
            req.cookie(SESSION_COOKIE)
                .map(|c| c.value().trim().to_string())
                .filter(|v| !v.is_empty())
        });

        if let Some(token) = token {
            req.extensions_mut().insert(SessionToken(token));
        }

        Box::pin(self.service.call(req))
    }
}

/// Token from the request body if present, else the ambient credential.
pub fn resolve_session(body_token: Option<&str>, req: &HttpRequest) -> Option<String> {
    body_token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .or_else(|| req.extensions().get::<SessionToken>().map(|t| t.0.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::cookie::Cookie;
    use actix_web::{App, HttpResponse, test, web};

    async fn echo(req: HttpRequest) -> HttpResponse {
        match req.extensions().get::<SessionToken>() {
            Some(token) => HttpResponse::Ok().body(token.0.clone()),
            None => HttpResponse::NoContent().finish(),
        }
    }

    #[actix_web::test]
    async fn header_wins_over_cookie() {
        let app = test::init_service(
            App::new()
                .wrap(SessionCredential)
                .route("/", web::get().to(echo)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/")
            .insert_header(("X-Session-Id", "from-header"))
            .cookie(Cookie::new(SESSION_COOKIE, "from-cookie"))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, web::Bytes::from_static(b"from-header"));

        let req = test::TestRequest::get()
            .uri("/")
            .cookie(Cookie::new(SESSION_COOKIE, "from-cookie"))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, web::Bytes::from_static(b"from-cookie"));
    }

    #[actix_web::test]
    async fn missing_credential_passes_through() {
        let app = test::init_service(
            App::new()
                .wrap(SessionCredential)
                .route("/", web::get().to(echo)),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::NO_CONTENT);
    }
}
