use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::PgPool;

mod application;
mod data;
mod domain;
mod infrastructure;
mod presentation;
mod server;

use application::admin_service::AdminService;
use application::post_service::PostService;
use data::group_repository::GroupRepository;
use data::post_repository::PostRepository;
use data::repositories::postgres::group_repository::PostgresGroupRepository;
use data::repositories::postgres::post_repository::PostgresPostRepository;
use data::repositories::postgres::user_repository::PostgresUserRepository;
use data::user_repository::UserRepository;
use domain::group::NewGroupRequest;
use domain::pagination::Paginator;
use infrastructure::database::{create_pool, run_migrations};
use infrastructure::jwt::JwtService;
use infrastructure::logging::init_logging;
use infrastructure::settings::Settings;
use presentation::AppState;

#[derive(Debug, Parser)]
#[command(name = "yatube-server", version, about = "Сервер ленты постов Yatube")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Запуск HTTP-сервера (по умолчанию).
    Serve,
    /// Создание пользователя.
    CreateUser {
        #[arg(long)]
        username: String,
    },
    /// Создание группы.
    CreateGroup {
        #[arg(long)]
        slug: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Выпуск токена доступа для существующего пользователя.
    IssueToken {
        #[arg(long)]
        username: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    init_logging(&settings.log_level)?;

    let pool = create_pool(&settings.database_url, settings.database_max_connections).await?;
    run_migrations(&pool).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&settings, pool).await,
        Command::CreateUser { username } => {
            let user = admin(&settings, pool).create_user(&username).await?;
            println!("user #{} '{}' created", user.id, user.username);
            Ok(())
        }
        Command::CreateGroup {
            slug,
            title,
            description,
        } => {
            let req = NewGroupRequest {
                title,
                slug,
                description,
            };
            let group = admin(&settings, pool).create_group(req).await?;
            println!("group #{} '{}' created at /group/{}/", group.id, group.title, group.slug);
            Ok(())
        }
        Command::IssueToken { username } => {
            let issued = admin(&settings, pool)
                .issue_token(&username)
                .await
                .with_context(|| format!("cannot issue token for '{username}'"))?;
            eprintln!(
                "token for user #{} '{}':",
                issued.user.id, issued.user.username
            );
            println!("{}", issued.access_token);
            Ok(())
        }
    }
}

async fn serve(settings: &Settings, pool: PgPool) -> Result<()> {
    let posts: Arc<dyn PostRepository> = Arc::new(PostgresPostRepository::new(pool.clone()));
    let groups: Arc<dyn GroupRepository> = Arc::new(PostgresGroupRepository::new(pool.clone()));
    let users: Arc<dyn UserRepository> = Arc::new(PostgresUserRepository::new(pool));
    let post_service = PostService::new(
        posts,
        groups,
        users,
        Paginator::new(settings.posts_per_page),
    );
    let jwt = JwtService::new(&settings.jwt_secret, settings.jwt_ttl_seconds);
    let state = AppState::new(Arc::new(post_service), Arc::new(jwt), &settings.login_url);

    server::run_http(settings, state).await
}

fn admin(
    settings: &Settings,
    pool: PgPool,
) -> AdminService<PostgresUserRepository, PostgresGroupRepository> {
    AdminService::new(
        PostgresUserRepository::new(pool.clone()),
        PostgresGroupRepository::new(pool),
        JwtService::new(&settings.jwt_secret, settings.jwt_ttl_seconds),
    )
}
