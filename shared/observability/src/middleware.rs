//! HTTP request logging for actix-web.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    rc::Rc,
    time::Instant,
};
use tracing::{error, info, span, warn, Instrument, Level};

#[derive(Debug, Clone)]
pub struct RequestLoggerConfig {
    pub service_name: String,
    /// Paths logged at debug level only (e.g. health probes)
    pub quiet_paths: Vec<String>,
    pub slow_request_threshold_ms: u64,
}

impl RequestLoggerConfig {
    pub fn for_service(name: impl Into<String>) -> Self {
        Self {
            service_name: name.into(),
            quiet_paths: vec!["/health".to_string()],
            slow_request_threshold_ms: 1000,
        }
    }

    pub fn with_slow_threshold(mut self, ms: u64) -> Self {
        self.slow_request_threshold_ms = ms;
        self
    }
}

/// Logs one line per request. Only the route path is recorded; the query
/// string is dropped because it may carry a handshake token.
#[derive(Clone)]
pub struct RequestLogger {
    config: Rc<RequestLoggerConfig>,
}

impl RequestLogger {
    pub fn new(config: RequestLoggerConfig) -> Self {
        Self { config: Rc::new(config) }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggerService {
            service: Rc::new(service),
            config: Rc::clone(&self.config),
        }))
    }
}

pub struct RequestLoggerService<S> {
    service: Rc<S>,
    config: Rc<RequestLoggerConfig>,
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Ok,
    Slow,
    ClientError,
    ServerError,
}

fn classify(status: u16, duration_ms: u64, slow_threshold_ms: u64) -> Outcome {
    if status >= 500 {
        Outcome::ServerError
    } else if status >= 400 {
        Outcome::ClientError
    } else if duration_ms > slow_threshold_ms {
        Outcome::Slow
    } else {
        Outcome::Ok
    }
}

impl<S, B> Service<ServiceRequest> for RequestLoggerService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let config = Rc::clone(&self.config);
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let method = req.method().to_string();
            let path = req.path().to_string();
            let quiet = config.quiet_paths.iter().any(|p| path.starts_with(p.as_str()));

            let request_span = span!(
                Level::INFO,
                "http_request",
                service = %config.service_name,
                method = %method,
                path = %path,
            );

            let start = Instant::now();
            let result = service.call(req).instrument(request_span).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(res) => {
                    let status = res.status().as_u16();
                    match classify(status, duration_ms, config.slow_request_threshold_ms) {
                        Outcome::ServerError => {
                            error!(status, duration_ms, "{} {} {}", method, path, status)
                        }
                        Outcome::ClientError => {
                            warn!(status, duration_ms, "{} {} {}", method, path, status)
                        }
                        Outcome::Slow => {
                            warn!(status, duration_ms, "SLOW {} {} {}", method, path, status)
                        }
                        Outcome::Ok if quiet => {
                            tracing::debug!(status, duration_ms, "{} {} {}", method, path, status)
                        }
                        Outcome::Ok => info!(status, duration_ms, "{} {} {}", method, path, status),
                    }
                    Ok(res)
                }
                Err(e) => {
                    error!(duration_ms, error = %e, "{} {} failed", method, path);
                    Err(e)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test as atest, web, App, HttpResponse};

    #[test]
    fn status_classification() {
        assert_eq!(classify(200, 5, 1000), Outcome::Ok);
        assert_eq!(classify(201, 1500, 1000), Outcome::Slow);
        assert_eq!(classify(401, 5, 1000), Outcome::ClientError);
        assert_eq!(classify(500, 5, 1000), Outcome::ServerError);
    }

    #[actix_web::test]
    async fn passes_responses_through_unchanged() {
        let app = atest::init_service(
            App::new()
                .wrap(RequestLogger::new(RequestLoggerConfig::for_service("test").with_slow_threshold(50)))
                .route("/ping", web::get().to(|| async { HttpResponse::Accepted().finish() })),
        )
        .await;

        let req = atest::TestRequest::get().uri("/ping?token=secret").to_request();
        let res = atest::call_service(&app, req).await;
        assert_eq!(res.status().as_u16(), 202);
    }
}
