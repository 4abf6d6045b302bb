use crate::api::routes;
use crate::client::Sig0Client;
use crate::config::Shared;
use std::future::Future;
use std::net::SocketAddr;

#[derive(Clone)]
pub(super) struct AppState {
    pub config: Shared,
    pub client: Sig0Client,
}

pub fn new(config: Shared, client: Sig0Client) -> impl Future<Output = hyper::Result<()>> {
    axum::Server::bind(&config.api_bind_addr).serve(
        routes::new(AppState { config, client })
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
}
