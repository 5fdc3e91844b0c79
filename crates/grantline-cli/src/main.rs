use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use grantline_core::crypto;
use grantline_core::db::{self, NewClient};
use grantline_core::grants::GrantRegistry;

#[derive(Parser)]
#[command(name = "grantline", about = "OAuth2 token endpoint")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve,
    /// Run database migrations
    Migrate,
    /// Check config and database connectivity
    Validate,
    /// Register a new OAuth client
    RegisterClient {
        /// Client display name
        name: String,
        /// Scope the client may request (repeatable)
        #[arg(long = "scope")]
        scopes: Vec<String>,
        /// Grant type the client may use (repeatable)
        #[arg(long = "grant-type", default_value = "password")]
        grant_types: Vec<String>,
        /// Register a public client with no secret
        #[arg(long)]
        public: bool,
        #[arg(long)]
        redirect_uri: Option<String>,
    },
    /// List registered OAuth clients
    ListClients,
    /// Remove an OAuth client
    RemoveClient {
        /// Client ID to remove
        client_id: String,
    },
    /// Create a resource owner account
    CreateUser {
        username: String,
        /// Password; read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// List resource owner accounts
    ListUsers,
    /// Delete expired access tokens
    CleanupTokens,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("grantline=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    let config = grantline_core::config::resolve_config(cli.config.as_deref())?;
    let pool = db::connect(&config.database).await?;

    match cli.command {
        Command::Serve => {
            db::migrate(&pool).await?;
            tracing::info!("migrations complete");
            grantline_api::serve(config, pool).await?;
        }
        Command::Migrate => {
            db::migrate(&pool).await?;
            tracing::info!("migrations complete");
        }
        Command::Validate => {
            tracing::info!("config loaded successfully");
            let registry = GrantRegistry::from_config(&config.grants)?;
            tracing::info!(grant_types = ?registry.grant_types(), "grant types enabled");
            sqlx::query("SELECT 1").execute(&pool).await?;
            tracing::info!("database connection successful");
        }
        Command::RegisterClient { name, scopes, grant_types, public, redirect_uri } => {
            let mut id_bytes = [0u8; 16];
            rand::RngCore::fill_bytes(&mut rand::rng(), &mut id_bytes);
            let client_id = hex::encode(id_bytes);

            let client_secret = (!public).then(crypto::generate_client_secret);

            let client = db::create_client(
                &pool,
                NewClient {
                    name,
                    client_id: client_id.clone(),
                    client_secret_hash: client_secret.as_deref().map(crypto::hash_token),
                    allowed_scopes: scopes,
                    grant_types,
                    default_redirect_uri: redirect_uri,
                },
            )
            .await?;

            println!("Client registered:");
            println!("  ID:             {}", client.id);
            println!("  Name:           {}", client.name);
            println!("  Client ID:      {}", client_id);
            match &client_secret {
                Some(secret) => println!("  Client Secret:  {}", secret),
                None => println!("  Client Secret:  (public client)"),
            }
            println!("  Scopes:         {}", client.allowed_scopes.join(" "));
            println!("  Grant types:    {}", client.grant_types.join(" "));
            if client_secret.is_some() {
                println!("\nSave the client secret, it cannot be retrieved later.");
            }
        }
        Command::ListClients => {
            let clients = db::list_clients(&pool).await?;
            if clients.is_empty() {
                println!("No clients registered.");
            } else {
                println!("{:<24} {:<34} {:<13} {}", "Name", "Client ID", "Type", "Scopes");
                println!("{}", "-".repeat(100));
                for client in &clients {
                    let kind = if client.is_confidential { "confidential" } else { "public" };
                    println!(
                        "{:<24} {:<34} {:<13} {}",
                        client.name,
                        client.client_id,
                        kind,
                        client.allowed_scopes.join(" "),
                    );
                }
                println!("\n{} client(s)", clients.len());
            }
        }
        Command::RemoveClient { client_id } => {
            let client = db::find_client_by_client_id(&pool, &client_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("client '{}' not found", client_id))?;
            db::delete_client(&pool, client.id).await?;
            println!("Client '{}' ({}) removed", client.name, client_id);
        }
        Command::CreateUser { username, password } => {
            let password = match password {
                Some(p) => p,
                None => read_password()?,
            };
            if password.is_empty() {
                anyhow::bail!("password cannot be empty");
            }
            let hash = crypto::hash_password(&password)?;
            let user = db::create_user(&pool, &username, &hash).await?;
            println!("User '{}' created ({})", user.username, user.id);
        }
        Command::ListUsers => {
            let users = db::list_users(&pool, 100, 0).await?;
            if users.is_empty() {
                println!("No users found.");
            } else {
                println!("{:<38} {:<24} {}", "ID", "Username", "Created");
                println!("{}", "-".repeat(80));
                for user in &users {
                    println!(
                        "{:<38} {:<24} {}",
                        user.id,
                        user.username,
                        user.created_at.format("%Y-%m-%d %H:%M"),
                    );
                }
                println!("\n{} user(s)", users.len());
            }
        }
        Command::CleanupTokens => {
            let removed = db::cleanup_expired_tokens(&pool).await?;
            println!("Removed {} expired token(s)", removed);
        }
    }

    Ok(())
}

fn read_password() -> anyhow::Result<String> {
    print!("Password: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
