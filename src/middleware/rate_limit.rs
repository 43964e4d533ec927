/// Per-client-IP rate limiting
///
/// Token bucket per peer IP. A request that finds its bucket empty is
/// answered with 429 and never reaches the wrapped service.
///
/// The key is the TCP peer address, not `X-Forwarded-For`. Behind a reverse
/// proxy every client therefore shares the proxy's bucket, and requests
/// with no peer address at all share a single `unknown` bucket.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::configuration::RateLimitSettings;
use crate::error::AppError;

const UNKNOWN_CLIENT: &str = "unknown";

// Buckets idle this long are full again and can be dropped
const IDLE_BUCKET_TTL: Duration = Duration::from_secs(60);
const PRUNE_THRESHOLD: usize = 10_000;

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: u32) -> Self {
        Self {
            tokens: capacity as f64,
            last_refill: Instant::now(),
        }
    }

    fn try_take_token(&mut self, capacity: u32, refill_per_second: u32) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_per_second as f64).min(capacity as f64);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared bucket table; clone it into every worker
#[derive(Clone)]
pub struct RateLimiter {
    settings: RateLimitSettings,
    buckets: Arc<Mutex<HashMap<String, TokenBucket>>>,
}

impl RateLimiter {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            settings,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Take one token for `client`; `false` means the request must be refused
    pub fn check(&self, client: &str) -> bool {
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if buckets.len() > PRUNE_THRESHOLD {
            buckets.retain(|_, bucket| bucket.last_refill.elapsed() < IDLE_BUCKET_TTL);
        }

        let burst = self.settings.burst.max(1);
        buckets
            .entry(client.to_string())
            .or_insert_with(|| TokenBucket::new(burst))
            .try_take_token(burst, self.settings.login_requests_per_second)
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RateLimitService {
            service: Rc::new(service),
            limiter: self.clone(),
        }))
    }
}

/// Bucket key for a request: the peer IP, ports ignored
fn client_key(req: &ServiceRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

pub struct RateLimitService<S> {
    service: Rc<S>,
    limiter: RateLimiter,
}

impl<S, B> Service<ServiceRequest> for RateLimitService<S>
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
        let client = client_key(&req);

        if !self.limiter.check(&client) {
            tracing::warn!(client = %client, path = %req.path(), "Rate limit exceeded");
            return Box::pin(async move { Err(Error::from(AppError::RateLimited)) });
        }

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}
