//! `ClanforgeServer` builder and server loop.
//!
//! This is the entry point for running a Clanforge server. It ties
//! together all the layers: transport → protocol → session → clan,
//! matchmaking, arena, and war.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clanforge_session::{Authenticator, LoginAuthenticator};
use clanforge_transport::{TcpTransport, Transport};
use tokio::time::MissedTickBehavior;

use crate::connection::handle_connection;
use crate::handlers::run_match_pass;
use crate::router::Router;
use crate::state::ServerState;
use crate::{ClanforgeError, ServerConfig};

/// Builder for configuring and starting a Clanforge server.
///
/// # Example
///
/// ```rust,no_run
/// use clanforge::prelude::*;
///
/// # async fn start() -> Result<(), ClanforgeError> {
/// let server = ClanforgeServer::builder()
///     .bind("0.0.0.0:8888")
///     .clan_file("clans.json")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClanforgeServerBuilder {
    config: ServerConfig,
}

impl ClanforgeServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every setting with `config`.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Persists the clan table to `path`.
    pub fn clan_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.clan_file = Some(path.into());
        self
    }

    /// Binds the listener with the default [`LoginAuthenticator`].
    pub async fn build(self) -> Result<ClanforgeServer<LoginAuthenticator>, ClanforgeError> {
        self.build_with(LoginAuthenticator).await
    }

    /// Binds the listener, validating logins with `auth`.
    pub async fn build_with<A: Authenticator>(
        self,
        auth: A,
    ) -> Result<ClanforgeServer<A>, ClanforgeError> {
        let state = Arc::new(ServerState::new(auth, &self.config)?);
        let transport = TcpTransport::bind(&self.config.bind_addr)
            .await?
            .with_max_frame_len(self.config.max_frame_len);

        Ok(ClanforgeServer {
            transport,
            state,
            router: Arc::new(Router::standard()),
            config: self.config,
        })
    }
}

/// A bound Clanforge server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ClanforgeServer<A: Authenticator> {
    transport: TcpTransport,
    state: Arc<ServerState<A>>,
    router: Arc<Router<A>>,
    config: ServerConfig,
}

impl ClanforgeServer<LoginAuthenticator> {
    /// Creates a new builder.
    pub fn builder() -> ClanforgeServerBuilder {
        ClanforgeServerBuilder::new()
    }
}

impl<A: Authenticator> ClanforgeServer<A> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ClanforgeError> {
        Ok(self.transport.local_addr()?)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Runs the server.
    ///
    /// Starts the matchmaking ticker and the expired-war sweep, then
    /// accepts connections and spawns a handler task for each. Runs
    /// until the process is terminated.
    pub async fn run(mut self) -> Result<(), ClanforgeError> {
        tracing::info!(addr = %self.local_addr()?, "Clanforge server running");

        let state = Arc::clone(&self.state);
        let match_interval = self.config.match_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(match_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                run_match_pass(&state).await;
            }
        });

        let state = Arc::clone(&self.state);
        let sweep_interval = self.config.war_sweep_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let ended = state.war.sweep_expired().await;
                if !ended.is_empty() {
                    tracing::info!(count = ended.len(), "expired wars ended");
                }
            }
        });

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    let router = Arc::clone(&self.router);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state, router).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
