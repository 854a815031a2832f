//! Vellum CLI: media maintenance against the Vellum database.
//!
//! Reads DATABASE_URL and the other settings from the environment (or `.env`).

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::process::ExitCode;
use std::sync::Arc;
use uuid::Uuid;
use vellum_cli::{connect, init_tracing, media_service, principal};
use vellum_core::{Config, ErrorMetadata};
use vellum_services::BroadcastEventPublisher;

#[derive(Parser)]
#[command(name = "vellum", about = "Vellum media maintenance CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate,
    /// Delete a media item; folders are deleted with their whole subtree
    Delete(MediaArgs),
    /// Archive a media item and everything below it
    Archive(MediaArgs),
    /// Unarchive a media item and everything below it
    Unarchive(MediaArgs),
}

#[derive(Args)]
struct MediaArgs {
    /// Media UUID
    id: Uuid,
    /// Fail if the stored version differs (0 disables the check)
    #[arg(long)]
    expected_version: Option<i32>,
    /// Do not check access rules
    #[arg(long)]
    skip_security: bool,
    /// Acting user
    #[arg(long, default_value = "cli")]
    principal: String,
    /// Role of the acting user, repeatable
    #[arg(long = "role")]
    roles: Vec<String>,
}

enum Action {
    Delete,
    Archive,
    Unarchive,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let pool = connect(&config).await?;

    let (action, args) = match cli.command {
        Commands::Migrate => {
            vellum_db::run_migrations(&pool).await?;
            print_json(&serde_json::json!({ "success": true }))?;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Delete(args) => (Action::Delete, args),
        Commands::Archive(args) => (Action::Archive, args),
        Commands::Unarchive(args) => (Action::Unarchive, args),
    };

    let events = Arc::new(BroadcastEventPublisher::new(64));
    let service = media_service(&config, pool, events).await?;
    let acting = principal(&args.principal, &args.roles);
    let enforce = !args.skip_security;

    let result = match action {
        Action::Delete => service
            .delete(args.id, args.expected_version, enforce, &acting)
            .await
            .map(|deleted| serde_json::json!({ "id": args.id, "deleted": deleted })),
        Action::Archive => service
            .archive_media(args.id, args.expected_version, enforce, &acting)
            .await
            .map(|changed| serde_json::json!({ "id": args.id, "changed": changed })),
        Action::Unarchive => service
            .unarchive_media(args.id, args.expected_version, enforce, &acting)
            .await
            .map(|changed| serde_json::json!({ "id": args.id, "changed": changed })),
    };

    match result {
        Ok(output) => {
            print_json(&output)?;
            if output.get("deleted") == Some(&serde_json::Value::Bool(false)) {
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(error = %e, code = e.error_code(), "Command failed");
            print_json(&serde_json::json!({
                "error": e.client_message(),
                "code": e.error_code(),
                "suggested_action": e.suggested_action(),
            }))?;
            Ok(ExitCode::FAILURE)
        }
    }
}
