//! Vitrine - command-line front end for the storefront session client.
//!
//! Signs in against the storefront backend, keeps the session on disk, and
//! issues authenticated API requests that refresh the token transparently.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vitrine_core::config::BASE_URL_ENV;
use vitrine_core::{
    ApiError, Config, DispatchError, OutboundRequest, PasswordReset, Registration,
    SessionManager, SessionState,
};

#[derive(Debug, Parser)]
#[command(name = "vitrine", version, about, long_about = None)]
struct Cli {
    /// Backend origin, overriding the config file
    #[arg(long, global = true, env = BASE_URL_ENV)]
    base_url: Option<String>,

    /// Browser-style cookie header used to seed the CSRF token
    #[arg(long, global = true, env = "VITRINE_COOKIES")]
    cookies: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
        /// Keep the "remember me" flag set
        #[arg(long)]
        remember: bool,
    },
    /// Create an account and sign in
    Register(RegisterArgs),
    /// Sign out and clear the stored session
    Logout,
    /// Show whether the stored session is still valid
    Status,
    /// Fetch and print the signed-in user's profile
    Profile,
    /// Send an authenticated GET request to an API path
    Get { path: String },
    /// Send an authenticated POST request with an optional JSON body
    Post {
        path: String,
        #[arg(long)]
        json: Option<String>,
    },
    /// Request a password recovery email
    ResetPassword {
        #[arg(long)]
        email: String,
    },
    /// Set a new password using the uid/token from the recovery email
    ConfirmReset {
        #[arg(long)]
        uid: String,
        #[arg(long)]
        token: String,
    },
}

#[derive(Debug, clap::Args)]
struct RegisterArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    cpf: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    cep: Option<String>,
    #[arg(long)]
    street: Option<String>,
    #[arg(long)]
    number: Option<String>,
    #[arg(long)]
    complement: Option<String>,
    #[arg(long)]
    district: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    state: Option<String>,
    /// Accept the terms of use
    #[arg(long)]
    accept_terms: bool,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let _guard = init_tracing();

    let cli = Cli::parse();
    let mut config = Config::load()?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    let manager = SessionManager::from_config(config)?;
    if let Some(ref cookies) = cli.cookies {
        manager.csrf().seed_from_cookie_header(cookies);
    }

    info!(command = ?cli.command, "Running command");
    run(&manager, cli.command).await
}

async fn run(manager: &SessionManager, command: Command) -> Result<()> {
    match command {
        Command::Login { email, remember } => {
            let email = match email {
                Some(email) => email,
                None => prompt("Email: ")?,
            };
            let password = rpassword::prompt_password("Password: ")?;
            let session = manager.login(&email, &password).await?;
            manager.set_remember(remember)?;
            println!("Signed in as {}", session.user_name().unwrap_or(&email));
        }
        Command::Register(args) => {
            let password = rpassword::prompt_password("Password: ")?;
            let password_confirmation = rpassword::prompt_password("Confirm password: ")?;
            let registration = Registration {
                nome: args.name,
                email: args.email,
                cpf: args.cpf,
                telefone: args.phone,
                cep: args.cep,
                logradouro: args.street,
                numero: args.number,
                complemento: args.complement,
                bairro: args.district,
                cidade: args.city,
                estado: args.state,
                password,
                password_confirmation,
                accepted_terms: args.accept_terms,
            };
            manager.register(&registration).await?;
            println!("Account created");
        }
        Command::Logout => {
            manager.logout().await;
            println!("Signed out");
        }
        Command::Status => print_status(manager).await,
        Command::Profile => match manager.fetch_profile().await {
            Ok(user) => println!("{}", serde_json::to_string_pretty(&user)?),
            Err(ApiError::Dispatch(DispatchError::AuthExpired)) => session_expired(),
            Err(e) => return Err(e.into()),
        },
        Command::Get { path } => send(manager, OutboundRequest::get(path)).await?,
        Command::Post { path, json } => {
            let mut request = OutboundRequest::post(path);
            if let Some(body) = json {
                let value: serde_json::Value =
                    serde_json::from_str(&body).context("--json is not valid JSON")?;
                request = request.json(&value);
            }
            send(manager, request).await?;
        }
        Command::ResetPassword { email } => {
            manager.request_password_reset(&email).await?;
            println!("Recovery email sent");
        }
        Command::ConfirmReset { uid, token } => {
            let nova_senha = rpassword::prompt_password("New password: ")?;
            let nova_senha_confirmacao = rpassword::prompt_password("Confirm new password: ")?;
            let reset = PasswordReset {
                uid,
                token,
                nova_senha,
                nova_senha_confirmacao,
            };
            manager.confirm_password_reset(&reset).await?;
            println!("Password changed - sign in with the new password");
        }
    }
    Ok(())
}

async fn print_status(manager: &SessionManager) {
    match manager.check_auth().await {
        SessionState::Anonymous => println!("Not signed in"),
        SessionState::Authenticated => {
            let session = manager.session();
            let name = manager
                .current_user()
                .and_then(|u| u.get("nome").and_then(|n| n.as_str()).map(str::to_string))
                .unwrap_or_else(|| "unknown user".to_string());
            println!("Signed in as {}", name);
            if let Some(minutes) = session.as_ref().and_then(|s| s.minutes_until_expiry()) {
                println!("Access token expires in {} min", minutes);
            }
            if manager.remember() {
                println!("Remember me: on");
            }
        }
    }
}

async fn send(manager: &SessionManager, request: OutboundRequest) -> Result<()> {
    match manager.dispatch(request).await {
        Ok(response) => {
            println!("HTTP {}", response.status);
            let text = response.text();
            match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                Err(_) => println!("{}", text),
            }
            Ok(())
        }
        Err(DispatchError::AuthExpired) => {
            session_expired();
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn session_expired() {
    eprintln!("Session expired - run `vitrine login` to sign in again");
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
