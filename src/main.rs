use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use amumal::{
    Config, FileSessionStore, HeaderAction, HeaderMenu, LoginPage, PostsPage, SessionStore,
    SubmitResult,
};
use amumal_client::{EmailAvailability, ForumClient, NicknameAvailability};
use amumal_core::{
    EmailFormat, FieldStatus, LoadOutcome, NicknameFormat, ScrollMetrics, ValidationField,
};

#[derive(Parser)]
#[command(name = "amumal", about = "Terminal client for the amumal forum")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Log out and forget the session
    Logout,
    /// List posts, page by page
    Posts {
        /// Stop after this many pages
        #[arg(long, default_value_t = 3)]
        pages: usize,
    },
    /// Check whether an email is free to register
    CheckEmail { email: String },
    /// Check whether a nickname is free to register
    CheckNickname { nickname: String },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            eprintln!("Optional: AMUMAL_API_BASE_URL (default: http://localhost:8000)");
            eprintln!("Optional: AMUMAL_PAGE_SIZE, AMUMAL_SESSION_PATH, AMUMAL_SCROLL_THRESHOLD");
            std::process::exit(1);
        }
    };
    tracing::debug!("API base URL: {}", config.api_base_url);

    let client = match ForumClient::new(config.api_base_url.clone()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Client error: {}", e);
            std::process::exit(1);
        }
    };
    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(&config.session_path));

    let ok = match cli.command {
        Command::Login { email, password } => login(client, store, email, password).await,
        Command::Logout => logout(client, store).await,
        Command::Posts { pages } => posts(client, store, &config, pages).await,
        Command::CheckEmail { email } => {
            let field = ValidationField::with_checker(
                "email",
                EmailFormat,
                Arc::new(EmailAvailability(client)),
            );
            check(field, email).await
        }
        Command::CheckNickname { nickname } => {
            let field = ValidationField::with_checker(
                "nickname",
                NicknameFormat,
                Arc::new(NicknameAvailability(client)),
            );
            check(field, nickname).await
        }
    };

    if !ok {
        std::process::exit(1);
    }
}

async fn login(
    client: ForumClient,
    store: Arc<dyn SessionStore>,
    email: String,
    password: String,
) -> bool {
    let page = LoginPage::new(client, store);
    page.email.set_value(email);
    page.password.set_value(password);

    for field in [&page.email, &page.password] {
        if let Some(message) = field.commit().await.message() {
            println!("{}: {}", field.name(), message);
        }
    }

    match page.submit().await {
        SubmitResult::Done { .. } => {
            println!("Logged in.");
            true
        }
        SubmitResult::Blocked => false,
        SubmitResult::Failed(message) => {
            println!("{}", message);
            false
        }
    }
}

async fn logout(client: ForumClient, store: Arc<dyn SessionStore>) -> bool {
    let session = match amumal::require_session(store.as_ref()) {
        Ok(session) => session,
        Err(_) => {
            println!("Not logged in.");
            return true;
        }
    };
    HeaderMenu::new(client, store, session)
        .dispatch(HeaderAction::Logout)
        .await;
    println!("Logged out.");
    true
}

async fn posts(
    client: ForumClient,
    store: Arc<dyn SessionStore>,
    config: &Config,
    pages: usize,
) -> bool {
    let page = match PostsPage::mount(client, store, config) {
        Ok(page) => page,
        Err(_) => {
            println!("Not logged in. Run `amumal login` first.");
            return false;
        }
    };

    let mut printed = 0;
    let mut outcome = page.load_initial().await;
    for _ in 1..pages {
        if !matches!(outcome, LoadOutcome::Loaded { .. }) {
            break;
        }
        // A terminal has no scroll position; always ask as if at the bottom.
        let at_bottom = ScrollMetrics {
            viewport_height: 0.0,
            scroll_offset: 0.0,
            content_height: 0.0,
        };
        outcome = page.on_scroll(&at_bottom).await;
    }

    for post in page.posts() {
        printed += 1;
        println!("#{} {}", post.post_id, post.display_title());
        println!("    {}  {}", post.meta_line(), post.created_at);
        println!("    by {}", post.author_nickname);
    }
    println!("{} posts. {}", printed, page.footer());

    !matches!(outcome, LoadOutcome::Failed(_))
}

async fn check(field: ValidationField, value: String) -> bool {
    field.set_value(value);
    let status = field.commit().await;
    match &status {
        FieldStatus::Valid => println!("Available."),
        other => println!(
            "{}",
            other.message().unwrap_or_else(|| format!("{:?}", other))
        ),
    }
    status.is_pass()
}
