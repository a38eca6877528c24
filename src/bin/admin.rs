//! Administrative tasks that have no HTTP surface: managing groups and removing users.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use yatube::{
    db_helpers::{delete_group_in_db, delete_user_in_db, insert_group, list_groups_in_db, NewGroup},
    errors::RequestError,
    init_db,
};

#[derive(Debug, Parser)]
#[command(name = "yatube-admin", about = "Manage yatube groups and users")]
struct Cli {
    /// Database to operate on; defaults to DATABASE_URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a group posts can be filed under.
    CreateGroup {
        #[arg(long)]
        title: String,
        #[arg(long)]
        slug: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Delete a group. Its posts are kept without a group.
    DeleteGroup { slug: String },
    /// Delete a user with their posts, comments and follow edges.
    DeleteUser { username: String },
    ListGroups,
}

fn describe(error: RequestError) -> anyhow::Error {
    match error {
        RequestError::NotFound(message) => anyhow!(message),
        RequestError::Validation(errors) => {
            let details = errors
                .iter()
                .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
                .collect::<Vec<_>>()
                .join("; ");
            anyhow!("invalid input: {}", details)
        }
        RequestError::DatabaseError(e) => anyhow!(e).context("database error"),
        other => anyhow!("{:?}", other),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let pool = init_db(&cli.database_url).await?;
    match cli.command {
        Command::CreateGroup {
            title,
            slug,
            description,
        } => {
            let group = insert_group(
                &pool,
                NewGroup {
                    title,
                    slug,
                    description,
                },
            )
            .await
            .map_err(describe)?;
            println!("created group {} ({})", group, group.slug);
        }
        Command::DeleteGroup { slug } => {
            let detached = delete_group_in_db(&pool, &slug).await.map_err(describe)?;
            println!("deleted group {}; {} posts no longer grouped", slug, detached);
        }
        Command::DeleteUser { username } => {
            delete_user_in_db(&pool, &username)
                .await
                .map_err(describe)?;
            println!("deleted user {}", username);
        }
        Command::ListGroups => {
            for group in list_groups_in_db(&pool).await.map_err(describe)? {
                println!("{}\t{}\t{}", group.id, group.slug, group);
            }
        }
    }
    pool.close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
    run(Cli::parse()).await.context("yatube-admin failed")
}
