//! Kitbag JSON API Server

use std::{process, sync::Arc};

use salvo::{
    affix_state::inject,
    oapi::{
        OpenApi,
        security::{Http, HttpAuthScheme, SecurityScheme},
        swagger_ui::SwaggerUi,
    },
    prelude::*,
    trailing_slash::remove_slash,
};
use tracing::{error, info};

use kitbag_app::{context::AppContext, domain::payments::HttpPaymentGateway};

use crate::{config::ServerConfig, state::State};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod admin;
mod auth;
mod carts;
mod config;
mod extensions;
mod healthcheck;
mod logging;
mod orders;
mod responses;
mod shutdown;
mod state;
#[cfg(test)]
mod test_helpers;
mod wallet;

/// Kitbag JSON API Server entry point
///
/// # Panics
///
/// Panics if the server fails to bind or serve requests
#[tokio::main]
pub async fn main() {
    // Load configuration from .env and CLI arguments
    let config = ServerConfig::load().unwrap_or_else(|e| {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized yet, must use eprintln for config errors"
        )]
        {
            eprintln!("Configuration error: {e}");
        }

        process::exit(1);
    });

    // Initialize logging
    if let Err(init_error) = logging::init_subscriber(&config.logging) {
        #[expect(
            clippy::print_stderr,
            reason = "logging failed to initialize, must use eprintln"
        )]
        {
            eprintln!("Failed to initialize logging: {init_error}");
        }

        process::exit(1);
    }

    let addr = config.socket_addr();

    info!("Starting server on {addr}");

    // Bind server
    let listener = TcpListener::new(addr).bind().await;

    let gateway = Arc::new(HttpPaymentGateway::new(config.gateway.to_gateway_config()));

    let app = match AppContext::from_database_url(
        &config.database.database_url,
        config.checkout.to_policy(),
        gateway,
    )
    .await
    {
        Ok(app) => app,
        Err(init_error) => {
            error!("failed to initialize app context: {init_error}");

            process::exit(1);
        }
    };

    let router = Router::new()
        .hoop(CatchPanic::new())
        .hoop(remove_slash())
        .hoop(inject(State::from_app_context(app)))
        .push(Router::with_path("healthcheck").get(healthcheck::handler))
        .push(
            Router::new()
                .hoop(auth::middleware::handler)
                .push(cart_router())
                .push(orders_router())
                .push(Router::with_path("wallet").get(wallet::handlers::get::handler))
                .push(
                    Router::with_path("admin")
                        .hoop(auth::middleware::require_admin)
                        .push(admin_orders_router()),
                ),
        );

    let doc = OpenApi::new("Kitbag API", "0.1.0")
        .add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
        .merge_router(&router);

    let router = router
        .push(doc.into_router("/api-doc/openapi.json"))
        .push(SwaggerUi::new("/api-doc/openapi.json").into_router("docs"));

    let server = Server::new(listener);

    let handle = server.handle();

    // Listen for shutdown signal
    tokio::spawn(async move {
        if let Err(error) = shutdown::listen(handle).await {
            error!("failed to listen for shutdown signal: {error}");
        }
    });

    // Start serving requests
    server.serve(router).await;
}

fn cart_router() -> Router {
    Router::with_path("cart")
        .get(carts::handlers::get::handler)
        .delete(carts::handlers::clear::handler)
        .push(
            Router::with_path("items")
                .post(carts::items::handlers::create::handler)
                .push(
                    Router::with_path("{item}")
                        .delete(carts::items::handlers::delete::handler)
                        .push(
                            Router::with_path("increment")
                                .patch(carts::items::handlers::increment::handler),
                        )
                        .push(
                            Router::with_path("decrement")
                                .patch(carts::items::handlers::decrement::handler),
                        ),
                ),
        )
        .push(
            Router::with_path("coupon")
                .post(carts::coupon::handlers::apply::handler)
                .delete(carts::coupon::handlers::remove::handler),
        )
}

fn orders_router() -> Router {
    Router::with_path("orders")
        .get(orders::handlers::index::handler)
        .push(Router::with_path("cod").post(orders::handlers::create_cod::handler))
        .push(Router::with_path("wallet").post(orders::handlers::create_wallet::handler))
        .push(
            Router::with_path("gateway")
                .post(orders::handlers::create_gateway::handler)
                .push(Router::with_path("verify").post(orders::handlers::verify_gateway::handler)),
        )
        .push(
            Router::with_path("{order}")
                .get(orders::handlers::get::handler)
                .push(
                    Router::with_path("cancel")
                        .post(orders::handlers::cancel::handler)
                        .push(
                            Router::with_path("preview")
                                .post(orders::handlers::cancel_preview::handler),
                        ),
                )
                .push(
                    Router::with_path("items/{item}")
                        .push(
                            Router::with_path("cancel")
                                .post(orders::handlers::item_cancel::handler)
                                .push(
                                    Router::with_path("preview")
                                        .post(orders::handlers::item_cancel_preview::handler),
                                ),
                        )
                        .push(
                            Router::with_path("return")
                                .put(orders::handlers::return_request::handler),
                        ),
                ),
        )
}

fn admin_orders_router() -> Router {
    Router::with_path("orders/{order}")
        .push(Router::with_path("status").patch(admin::orders::status::handler))
        .push(
            Router::with_path("items/{item}")
                .push(
                    Router::with_path("return/approve")
                        .patch(admin::orders::return_approve::handler),
                )
                .push(
                    Router::with_path("return/reject").patch(admin::orders::return_reject::handler),
                )
                .push(
                    Router::with_path("confirm-received")
                        .patch(admin::orders::confirm_received::handler),
                ),
        )
}
