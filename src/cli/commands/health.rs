//! `fixit health`.

use super::{ClientContext, print_json};
use crate::error::Result;

/// # Errors
///
/// The server is unreachable or unhealthy.
pub async fn execute(ctx: &ClientContext) -> Result<()> {
    let health = ctx.api.health().await?;
    if ctx.output.json {
        return print_json(&health);
    }
    ctx.output
        .say(format!("{}: {} ({})", health.status, health.message, ctx.api.base_url()));
    Ok(())
}
