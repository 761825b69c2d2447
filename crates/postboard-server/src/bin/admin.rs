use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use postboard_server::{
    config::Settings,
    database::{BlogRepository, DbPool, NewGroup, PgRepository},
    telemetry,
};

#[derive(Parser, Debug)]
#[command(name = "postboard-admin", version, about = "Postboard moderation tools")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new group
    CreateGroup {
        #[arg(long)]
        title: String,

        /// URL name, must be unique
        #[arg(long)]
        slug: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// List all groups
    ListGroups,

    /// Delete a post and its comments.
    ///
    /// The cached index page keeps showing it until its entry expires.
    DeletePost {
        #[arg(long)]
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load()?;
    telemetry::init_logging(&settings.logging)?;

    let pool = DbPool::new(&settings.database).await?;
    pool.migrate().await?;
    let repository = PgRepository::new(pool.clone());

    let result = run(&repository, args.command).await;
    pool.close().await;
    result
}

async fn run(repository: &dyn BlogRepository, command: Command) -> Result<()> {
    match command {
        Command::CreateGroup {
            title,
            slug,
            description,
        } => {
            let slug = slug.trim().to_string();
            if slug.is_empty() {
                bail!("slug must not be empty");
            }
            if repository.find_group_by_slug(&slug).await?.is_some() {
                bail!("group with slug '{}' already exists", slug);
            }

            let group = repository
                .create_group(NewGroup {
                    title: title.trim().to_string(),
                    slug,
                    description,
                })
                .await?;
            info!("Created group {} ({})", group.slug, group.id);
            println!("{}\t{}\t{}", group.id, group.slug, group.title);
        }
        Command::ListGroups => {
            for group in repository.list_groups().await? {
                println!("{}\t{}\t{}", group.id, group.slug, group.title);
            }
        }
        Command::DeletePost { id } => {
            if !repository.delete_post(id).await? {
                bail!("post {} not found", id);
            }
            info!("Deleted post {}", id);
            println!("deleted post {}", id);
        }
    }

    Ok(())
}
