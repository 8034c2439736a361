//! RelayCRM CLI — the main entry point.
//!
//! Commands:
//! - `serve`   — Start the HTTP webhook gateway
//! - `encrypt` — Encrypt a credential to its storage envelope
//! - `decrypt` — Decrypt a stored credential envelope
//! - `sign`    — Compute the signature header value for a payload

use clap::{Parser, Subcommand};

use relaycrm_config::AppConfig;
use relaycrm_security::{CredentialCipher, sign_payload};

#[derive(Parser)]
#[command(
    name = "relaycrm",
    about = "RelayCRM — messaging-CRM webhook gateway and credential vault",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP webhook gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Encrypt a credential value to its storage envelope
    Encrypt {
        /// The cleartext value to encrypt
        value: String,
    },

    /// Decrypt a stored credential envelope
    Decrypt {
        /// The `<iv-hex>:<ciphertext-hex>` envelope
        envelope: String,
    },

    /// Compute the x-hub-signature-256 value for a payload (integration debugging)
    Sign {
        /// The exact payload bytes to sign
        payload: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => serve(port).await?,
        Commands::Encrypt { value } => encrypt(&value)?,
        Commands::Decrypt { envelope } => decrypt(&envelope)?,
        Commands::Sign { payload } => sign(&payload)?,
    }

    Ok(())
}

async fn serve(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("RelayCRM gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "   Webhook verification: {}",
        if config.webhook.signing_secret.is_some() {
            "enabled"
        } else {
            "NOT CONFIGURED — all deliveries will be rejected"
        }
    );

    relaycrm_gateway::start(config).await?;

    Ok(())
}

fn encrypt(value: &str) -> Result<(), Box<dyn std::error::Error>> {
    let cipher = load_cipher()?;
    match cipher.encrypt(value) {
        Some(envelope) => {
            println!("{envelope}");
            Ok(())
        }
        None => Err("nothing to encrypt — value is empty".into()),
    }
}

fn decrypt(envelope: &str) -> Result<(), Box<dyn std::error::Error>> {
    let cipher = load_cipher()?;
    match cipher.decrypt(envelope) {
        Some(plaintext) => {
            println!("{plaintext}");
            Ok(())
        }
        None => Err("decrypt failed — malformed envelope or wrong master secret".into()),
    }
}

fn sign(payload: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let secret = config
        .webhook
        .signing_secret
        .ok_or("webhook.signing_secret not configured")?;

    println!("{}", sign_payload(&secret, payload.as_bytes()));
    Ok(())
}

fn load_cipher() -> Result<CredentialCipher, Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    // validate() guarantees the master secret is present after load()
    let master = config
        .secrets
        .master_secret
        .ok_or("secrets.master_secret not configured")?;
    Ok(CredentialCipher::new(&master))
}
