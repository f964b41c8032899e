//! `fixit register`, `login`, `logout` and `whoami`.

use serde_json::json;

use super::{ClientContext, print_json, resolve_password};
use crate::cli::{LoginArgs, RegisterArgs};
use crate::error::{AuthFailure, FixitError, Result};
use crate::model::PublicUser;

fn describe(user: &PublicUser) -> String {
    format!("{} <{}> ({})", user.name, user.email, user.role)
}

fn report_signed_in(ctx: &ClientContext, user: &PublicUser) -> Result<()> {
    if ctx.output.json {
        return print_json(&json!({ "user": user }));
    }
    ctx.output.say(format!("Signed in as {}", describe(user)));
    Ok(())
}

/// # Errors
///
/// Validation, duplicate email, network failures or an unwritable cache.
pub async fn register(ctx: &mut ClientContext, args: RegisterArgs) -> Result<()> {
    let password = resolve_password(args.password)?;
    let user = ctx
        .session
        .register(&ctx.api, &args.name, &args.email, &password)
        .await?
        .clone();
    report_signed_in(ctx, &user)
}

/// # Errors
///
/// Bad credentials, network failures or an unwritable cache.
pub async fn login(ctx: &mut ClientContext, args: LoginArgs) -> Result<()> {
    let password = resolve_password(args.password)?;
    let user = ctx
        .session
        .login(&ctx.api, &args.email, &password)
        .await?
        .clone();
    report_signed_in(ctx, &user)
}

/// Never fails; cache removal problems are logged.
///
/// # Errors
///
/// Only JSON output failures.
pub async fn logout(ctx: &mut ClientContext) -> Result<()> {
    let was_signed_in = ctx.session.is_authenticated();
    ctx.session.logout().await;
    if ctx.output.json {
        return print_json(&json!({ "signed_out": was_signed_in }));
    }
    ctx.output.say(if was_signed_in {
        "Signed out"
    } else {
        "Not signed in"
    });
    Ok(())
}

/// Print the cached user. Makes no request.
///
/// # Errors
///
/// [`FixitError::Unauthorized`] when nobody is signed in.
pub fn whoami(ctx: &ClientContext) -> Result<()> {
    let Some(user) = ctx.session.user() else {
        return Err(FixitError::Unauthorized(AuthFailure::MissingToken));
    };
    if ctx.output.json {
        return print_json(user);
    }
    ctx.output.say(describe(user));
    Ok(())
}
