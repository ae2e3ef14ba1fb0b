use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use aperture::backend::HttpBackend;
use aperture::cli::{CacheCmd, Cli, Commands, ContentCmd, ContentKind, FeedCmd};
use aperture::config::Config;
use aperture::content::ContentService;
use aperture::db::Database;
use aperture::feed::SortOrder;
use aperture::media;
use aperture::server::{self, AppState};
use aperture::storage::{current_epoch, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    let backend = HttpBackend::new(config.backend_base()?);
    let db = Database::connect(config.database_url.as_deref()).await?;
    db.run_migrations().await?;
    let service =
        ContentService::new(Arc::new(backend), Arc::new(db.clone()), config.content_ttl_secs);

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.bind.clone());
            let state = Arc::new(AppState {
                service,
                revalidate_secret: config.revalidate_secret.clone(),
            });
            server::serve(state, &bind).await?;
        }
        Commands::Feed { cmd } => match cmd {
            FeedCmd::Ls { order, limit, offset } => {
                let order = SortOrder::parse(&order);
                let page = service.feed_page_or_empty(order, limit, offset).await;
                for item in &page.data {
                    println!("[{}] {} ({})", item.id, media::caption(item), item.src);
                }
                println!("{} item(s), has_more={}", page.data.len(), page.has_more);
            }
        },
        Commands::Content { cmd } => run_content(&service, cmd).await,
        Commands::Cache { cmd } => match cmd {
            CacheCmd::Clear { prefix, expired } => {
                let removed = if expired {
                    db.purge_expired(current_epoch()).await?
                } else {
                    db.delete_prefix(prefix.as_deref()).await?
                };
                println!("Removed {removed} cache entries");
            }
            CacheCmd::Warm => {
                let (articles, poems, journals, projects, uses) = futures::join!(
                    service.articles(),
                    service.poems(),
                    service.photo_journals(),
                    service.projects(),
                    service.uses()
                );
                println!(
                    "Warmed cache: {} articles, {} poems, {} journals, {} projects, {} uses categories",
                    articles.len(),
                    poems.len(),
                    journals.len(),
                    projects.len(),
                    uses.len()
                );
            }
        },
    }

    Ok(())
}

async fn run_content(service: &ContentService, cmd: ContentCmd) {
    match cmd {
        ContentCmd::Ls { kind } => match kind {
            ContentKind::Articles => {
                for a in service.articles().await {
                    println!("{} — {} ({})", a.date, a.title, a.slug);
                }
            }
            ContentKind::Poems => {
                for p in service.poems().await {
                    println!("{} — {} ({})", p.date, p.title, p.slug);
                }
            }
            ContentKind::Journals => {
                for j in service.photo_journals().await {
                    println!("{} — {} [{}] ({})", j.date, j.title, j.section, j.slug);
                }
            }
            ContentKind::Projects => {
                for p in service.projects().await {
                    println!("{} — {} ({})", p.name, p.description, p.link.href);
                }
            }
            ContentKind::Uses => {
                for cat in service.uses().await {
                    println!("{}:", cat.title);
                    for tool in &cat.tools {
                        println!("  - {}", tool.title);
                    }
                }
            }
        },
        ContentCmd::Get { kind, slug } => match kind {
            ContentKind::Articles => match service.article_by_slug(&slug).await {
                Some(a) => {
                    println!("# {}\n{}\n\n{}", a.title, a.description, a.content.unwrap_or_default());
                }
                None => println!("No article found for slug: {slug}"),
            },
            ContentKind::Poems => match service.poem_by_slug(&slug).await {
                Some(p) => {
                    println!("# {}\n\n{}", p.title, p.content.unwrap_or_default());
                }
                None => println!("No poem found for slug: {slug}"),
            },
            ContentKind::Journals => match service.photo_journal_by_slug(&slug).await {
                Some(j) => {
                    println!("# {} [{}]\n{}\n\n{}", j.title, j.section, j.description, j.content.unwrap_or_default());
                }
                None => println!("No photo journal found for slug: {slug}"),
            },
            ContentKind::Projects => match service.project_by_slug(&slug).await {
                Some(p) => println!("{} — {} ({})", p.name, p.description, p.link.href),
                None => println!("No project found for slug: {slug}"),
            },
            ContentKind::Uses => println!("uses has no per-slug entries"),
        },
    }
}
