//! Takeout - A self-hosted media server for music, movies, TV and podcasts

mod api;
mod auth;
mod bucket;
mod client;
mod config;
mod core;
mod db;
mod error;
mod models;
mod search;
mod spiff;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use crate::api::AppState;
use crate::auth::Auth;
use crate::config::{Config, Paths};
use crate::core::{Job, MediaRegistry, Scheduler};
use crate::db::{DbEngine, Schema};

/// Takeout - Self-hosted media server
#[derive(Parser, Debug)]
#[command(name = "takeout")]
#[command(version)]
#[command(about = "A self-hosted media server for music, movies, TV and podcasts")]
struct Args {
    /// Enable debug mode
    #[arg(long, global = true)]
    debug: bool,

    /// Configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server and scheduled jobs
    Serve {
        /// Host address to bind to
        #[arg(long)]
        listen: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
    /// Run one job now
    Job { name: String },
    /// List job names
    Jobs,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Create a user
    Add { name: String, password: String },
    /// Set a new password
    Password { name: String, password: String },
    /// Set an otpauth:// URI; an empty value removes TOTP
    Totp { name: String, uri: String },
    /// Assign media collections, comma separated; the first is active
    Media { name: String, media: String },
}

/// Everything the server and jobs share
struct Runtime {
    config: Config,
    server: DbEngine,
    auth: Auth,
    registry: MediaRegistry,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // keep dependency chatter out of the log unless asked for
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "{},sqlx=warn,hyper=warn,reqwest=warn,aws_config=warn,aws_smithy_runtime=warn,aws_sdk_s3=warn",
            log_level
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let paths = Paths::new(args.data)?;
    info!("Data directory: {:?}", paths.data_dir());

    let ctx = setup(paths, args.config).await?;

    match args.command.unwrap_or(Command::Serve {
        listen: None,
        port: None,
    }) {
        Command::Serve { listen, port } => serve(ctx, listen, port).await,
        Command::User { command } => user_command(&ctx.auth, command).await,
        Command::Job { name } => run_job(ctx, &name).await,
        Command::Jobs => {
            for job in Job::ALL {
                println!("{}", job);
            }
            Ok(())
        }
    }
}

async fn setup(paths: Paths, config_file: Option<PathBuf>) -> Result<Runtime> {
    let config = Config::load(config_file.as_deref(), &paths)?;

    let server = DbEngine::open(&paths.server_db_path(), Schema::Server)
        .await
        .context("Failed to open server database")?;

    let auth = Auth::new(server.clone(), config.auth.clone())?;
    let registry = MediaRegistry::new(config.clone(), paths);

    Ok(Runtime {
        config,
        server,
        auth,
        registry,
    })
}

async fn serve(ctx: Runtime, listen: Option<String>, port: Option<u16>) -> Result<()> {
    let Runtime {
        config,
        server,
        auth,
        registry,
    } = ctx;

    info!("Starting background jobs...");
    Scheduler::new(auth.clone(), registry.clone()).start()?;

    let state = web::Data::new(AppState {
        auth,
        registry,
        server,
        http: reqwest::Client::new(),
    });

    let addr = format!(
        "{}:{}",
        listen.unwrap_or(config.server.listen),
        port.unwrap_or(config.server.port)
    );
    info!("Server listening on http://{}", addr);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(api::configure)
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}

async fn user_command(auth: &Auth, command: UserCommand) -> Result<()> {
    match command {
        UserCommand::Add { name, password } => {
            auth.add_user(&name, &password).await?;
            info!("Added user {}", name);
        }
        UserCommand::Password { name, password } => {
            auth.change_password(&name, &password).await?;
            let expired = auth.expire_all(&name).await?;
            info!("Changed password for {}, {} sessions expired", name, expired);
        }
        UserCommand::Totp { name, uri } => {
            auth.assign_totp(&name, &uri).await?;
            info!("Updated TOTP for {}", name);
        }
        UserCommand::Media { name, media } => {
            let media: Vec<String> = media
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect();
            auth.assign_media(&name, &media).await?;
            info!("Assigned media {:?} to {}", media, name);
        }
    }
    Ok(())
}

async fn run_job(ctx: Runtime, name: &str) -> Result<()> {
    let Some(job) = Job::parse(name) else {
        bail!("Unknown job '{}'; see `takeout jobs`", name);
    };
    let scheduler = Scheduler::new(ctx.auth, ctx.registry);
    if !scheduler.run(job).await? {
        bail!("Job {} is already running", job);
    }
    info!("Job {} finished", job);
    Ok(())
}
