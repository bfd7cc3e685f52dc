use std::io::{self, Write};

use anyhow::{Result, bail};
use noticeboard::prelude::*;
use serde_json::json;

use crate::{cli::AppContext, output::OutputFormat};

pub async fn handle(ctx: &AppContext, args: super::AuthArgs) -> Result<()> {
    match args.command {
        super::AuthCommands::Signup { name, email } => signup(ctx, name, email).await,
        super::AuthCommands::Signin { email } => signin(ctx, email).await,
        super::AuthCommands::Signout => signout(ctx),
        super::AuthCommands::Status => status(ctx),
    }
}

async fn signup(ctx: &AppContext, name: String, email: String) -> Result<()> {
    let password = read_password()?;
    let response = ctx
        .client
        .sign_up(SignUpRequest::new(name, email, password))
        .await?;

    if ctx.output.format() == OutputFormat::Quiet {
        return Ok(());
    }
    ctx.output.emit_json(&json!({
        "created": true,
        "message": response.message,
        "user": response.user,
    }))
}

async fn signin(ctx: &AppContext, email: String) -> Result<()> {
    let password = read_password()?;
    let response = ctx
        .client
        .sign_in(SignInRequest::new(email, password))
        .await?;

    if ctx.output.format() == OutputFormat::Quiet {
        return Ok(());
    }
    ctx.output.emit_json(&json!({
        "authenticated": true,
        "user": response.user,
    }))
}

fn signout(ctx: &AppContext) -> Result<()> {
    ctx.client.sign_out()?;

    if ctx.output.format() == OutputFormat::Quiet {
        return Ok(());
    }
    ctx.output.emit_json(&json!({ "authenticated": false }))
}

fn status(ctx: &AppContext) -> Result<()> {
    let status = ctx.client.auth_status();
    ctx.output.emit_json(&json!({
        "status": status,
        "authenticated": status.is_authenticated(),
    }))
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut password = String::new();
    io::stdin().read_line(&mut password)?;
    let password = password.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("password is empty");
    }
    Ok(password)
}
