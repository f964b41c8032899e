//! `fixit serve`.

use crate::cli::ServeArgs;
use crate::config::{self, CliOverrides, ServerConfig};
use crate::error::Result;
use crate::server;

/// Resolve the server config and run until Ctrl-C.
///
/// # Errors
///
/// Missing token secret, unparsable config, an unopenable database or an
/// unbindable address.
pub async fn execute(args: &ServeArgs, overrides: &CliOverrides) -> Result<()> {
    let overrides = CliOverrides {
        bind: args.bind.clone(),
        database: args.database.clone(),
        ..overrides.clone()
    };
    let layer = config::load_config(&overrides)?;
    let server_config = ServerConfig::from_layer(&layer)?;
    tracing::info!(
        bind = %server_config.bind,
        storage = ?server_config.storage.backend,
        "starting server"
    );
    server::serve(server_config).await
}
