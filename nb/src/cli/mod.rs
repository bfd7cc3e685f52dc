/*
 * nb - read the departmental notice board from the terminal
 *
 * SPDX-FileCopyrightText: 2026 Noticeboard contributors
 * SPDX-License-Identifier: Apache-2.0
 */
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use noticeboard::prelude::*;
use tracing::{debug, warn};

use crate::{
    config::CliConfig,
    output::{Output, OutputFormat},
};

pub mod auth;
pub mod notices;

// keystore service name, and token file name under the config dir
const APP_NAME: &str = "nb";

#[derive(Parser, Debug)]
#[command(name = "nb")]
#[command(author, version, about = "nb: read the departmental notice board", long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// API endpoint URL. Default: `url` from cli.json, or <http://127.0.0.1:4000>
    #[arg(short = 'u', long, env = "NOTICEBOARD_URL", global = true)]
    pub url: Option<String>,

    /// Token file. Default: `<config_dir>/noticeboard/nb.token`
    #[arg(long, value_name = "FILE", global = true)]
    pub token_file: Option<PathBuf>,

    /// Write output to file (default: stdout)
    #[arg(short = 'o', long, value_name = "FILE", global = true)]
    pub output: Option<PathBuf>,

    /// JSON output (default)
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Table output format
    #[arg(short, long, global = true)]
    pub table: bool,

    /// Date format for tables and the browser, defined by [chrono-strftime format](https://docs.rs/chrono/latest/chrono/format/strftime/index.html). Defaults to "%b %-d, %Y"
    #[arg(long, env = "NOTICEBOARD_DATE_FORMAT", global = true)]
    pub date_format: Option<String>,

    /// Quiet mode - suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (repeat for more: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn is_browse(&self) -> bool {
        matches!(self.command, Commands::Browse)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign up, sign in, and token management
    Auth(AuthArgs),

    /// List and show notices
    #[command(alias = "notice")]
    Notices(NoticesArgs),

    /// Interactive notice browser
    Browse,

    /// Persistent settings (cli.json)
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Create an account. The password is read from stdin
    Signup {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,
    },

    /// Sign in and save the token. The password is read from stdin
    #[command(alias = "login")]
    Signin {
        #[arg(long)]
        email: String,
    },

    /// Discard the saved token
    #[command(alias = "logout")]
    Signout,

    /// Display endpoint and token status
    Status,
}

#[derive(Args, Debug)]
pub struct NoticesArgs {
    #[command(subcommand)]
    pub command: NoticesCommands,
}

#[derive(Subcommand, Debug)]
pub enum NoticesCommands {
    /// List notices, newest data from the server
    List {
        /// only notices in this category ("All" for every notice)
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Show one notice with its images and attachments
    Show {
        /// 1-based position in the (filtered) list
        position: usize,

        /// category the position refers to
        #[arg(short, long)]
        category: Option<String>,
    },

    /// List categories in order of first appearance
    Categories,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print current settings and the file they are stored in
    Show,

    /// Set a setting: url, token_file or date_format. An empty value clears it
    Set { key: String, value: String },

    /// Remove the settings file
    Reset,
}

pub struct AppContext {
    pub client: NoticeClient,
    pub output: Output,
    pub date_format: String,
}

impl AppContext {
    /// Formats a notice date with the configured format; "" when missing.
    pub fn format_date(&self, notice: &Notice) -> String {
        crate::text::format_date(notice, &self.date_format)
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let output = Output::new(resolve_output_format(&cli), cli.output.clone());
    let settings = CliConfig::load()?;

    if let Commands::Config(args) = cli.command {
        return handle_config(&output, settings, args);
    }

    let date_format = resolve_date_format(&cli, &settings);
    let client = build_client(&cli, &settings)?;
    let ctx = AppContext {
        client,
        output,
        date_format,
    };

    match cli.command {
        Commands::Auth(args) => auth::handle(&ctx, args).await,
        Commands::Notices(args) => notices::handle(&ctx, args).await,
        Commands::Browse => crate::browse::run(&ctx).await,
        Commands::Config(_) => Ok(()),
    }
}

fn resolve_output_format(cli: &Cli) -> OutputFormat {
    if cli.quiet {
        OutputFormat::Quiet
    } else if cli.pretty {
        if cli.table {
            warn!("--pretty conflicts with --table. Using json pretty format");
        }
        OutputFormat::Pretty
    } else if cli.json {
        if cli.table {
            warn!("--json conflicts with --table. Using json format");
        }
        OutputFormat::Json
    } else if cli.table {
        OutputFormat::Table
    } else {
        OutputFormat::Json
    }
}

fn resolve_date_format(cli: &Cli, settings: &CliConfig) -> String {
    cli.date_format
        .clone()
        .or_else(|| settings.date_format.clone())
        .unwrap_or_else(|| Notice::DATE_FORMAT.to_string())
}

fn client_config(cli: &Cli, settings: &CliConfig) -> ClientConfig {
    let mut config = ClientConfig::default().app_name(APP_NAME);
    if let Some(url) = cli.url.as_ref().or(settings.url.as_ref()) {
        config = config.base_url(url.clone());
    }
    if let Some(path) = cli.token_file.as_ref().or(settings.token_file.as_ref()) {
        config = config.keystore_path(path.clone());
    }
    config
}

fn build_client(cli: &Cli, settings: &CliConfig) -> Result<NoticeClient> {
    let client = NoticeClient::with_config(client_config(cli, settings))?;
    let found = client.load_token()?;
    debug!(url = %client.get_config().base_url, token = found, "client ready");
    Ok(client)
}

fn handle_config(output: &Output, mut settings: CliConfig, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => output.emit_json(&serde_json::json!({
            "path": CliConfig::path(),
            "settings": settings,
        })),
        ConfigCommands::Set { key, value } => {
            settings.set(&key, &value)?;
            settings.save()?;
            output.emit_json(&settings)
        }
        ConfigCommands::Reset => {
            CliConfig::reset()?;
            output.emit_json(&serde_json::json!({ "reset": true }))
        }
    }
}
