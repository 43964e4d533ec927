use actix_web::dev::Server;
use actix_web::{guard, middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;

use crate::auth::AuthService;
use crate::configuration::{RateLimitSettings, WebhookSettings};
use crate::middleware::{JwtMiddleware, RateLimiter};
use crate::routes::{
    create_user, get_current_user, health_check, login, polka_webhook, refresh, revoke, update_user,
};

pub fn run(
    listener: TcpListener,
    auth: AuthService,
    webhooks: WebhookSettings,
    rate_limit: RateLimitSettings,
) -> Result<Server, std::io::Error> {
    let auth_data = web::Data::new(auth.clone());
    let webhook_data = web::Data::new(webhooks);
    // Built once so every worker shares the same buckets
    let login_limiter = RateLimiter::new(rate_limit);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(auth_data.clone())
            .app_data(webhook_data.clone())

            // Public routes
            .route("/api/healthz", web::get().to(health_check))
            .service(
                web::resource("/api/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(login)),
            )
            .route("/api/refresh", web::post().to(refresh))
            .route("/api/revoke", web::post().to(revoke))
            .route("/api/polka/webhooks", web::post().to(polka_webhook))

            // Protected routes (require a valid access token)
            .service(
                web::resource("/api/users/me")
                    .wrap(JwtMiddleware::new(auth.clone()))
                    .route(web::get().to(get_current_user)),
            )
            .service(
                web::resource("/api/users")
                    .guard(guard::Put())
                    .wrap(JwtMiddleware::new(auth.clone()))
                    .route(web::put().to(update_user)),
            )
            .route("/api/users", web::post().to(create_user))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
