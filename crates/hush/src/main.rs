use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use hush_core::expiry::Expiration;
use hush_core::{limits, link, share};
use hush_server::store::gateway::{classify, SecretKind};

// ── CLI definition ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "hush",
    about = "hush — share a secret over a link that can be read exactly once",
    version
)]
struct Cli {
    /// hush server URL (default: http://localhost:8080 or $HUSH_SERVER)
    #[arg(long, env = "HUSH_SERVER", default_value = "http://localhost:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the hush HTTP server
    Serve {
        /// Port to listen on (default: $HUSH_PORT or 8080)
        #[arg(long, env = "HUSH_PORT", default_value = "8080")]
        port: u16,
        /// Host to bind (default: $HUSH_HOST or 0.0.0.0)
        #[arg(long, env = "HUSH_HOST", default_value = "0.0.0.0")]
        host: String,
    },
    /// Encrypt a secret locally and print its one-time link
    Share {
        /// Secret text; read from stdin when omitted
        secret: Option<String>,
        /// Share a file instead of text
        #[arg(long, conflicts_with = "secret")]
        file: Option<PathBuf>,
        /// Lifetime, e.g. 1h, 1d, 1w (60s minimum, 1 year maximum)
        #[arg(long, default_value = "1d")]
        ttl: String,
    },
    /// Fetch a shared secret, decrypt it locally, and print or save it
    Reveal {
        /// Share link, or its trailing `storageKey#key` part
        link: String,
        /// Where to write a revealed file (default: the original filename)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Generate a random password
    Password {
        /// Password length
        #[arg(long, default_value = "20")]
        length: usize,
        /// Letters and digits only
        #[arg(long)]
        no_symbols: bool,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("HUSH_LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host } => cmd_serve(host, port).await,
        Commands::Share { secret, file, ttl } => {
            cmd_share(&cli.server, secret, file.as_deref(), &ttl).await
        }
        Commands::Reveal { link, output } => cmd_reveal(&cli.server, &link, output).await,
        Commands::Password { length, no_symbols } => cmd_password(length, no_symbols),
    }
}

// ── Command implementations ───────────────────────────────────────────────────

async fn cmd_serve(host: String, port: u16) -> Result<()> {
    let cfg = hush_server::ServerConfig {
        host,
        port,
        ..Default::default()
    };
    hush_server::run(cfg).await
}

async fn cmd_share(
    server: &str,
    secret: Option<String>,
    file: Option<&Path>,
    ttl: &str,
) -> Result<()> {
    let ttl_seconds = parse_ttl(ttl)?;

    let (storage_key, fragment_key) = match file {
        Some(path) => share_file(server, path, ttl_seconds).await?,
        None => {
            let plaintext = match secret {
                Some(s) => s,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("read secret from stdin")?;
                    buf.trim_end_matches('\n').to_owned()
                }
            };
            share_text(server, &plaintext, ttl_seconds).await?
        }
    };

    // The fragment never leaves this process except on stdout.
    println!("{}", link::format_share_link(server, &storage_key, &fragment_key));
    Ok(())
}

/// Encrypt locally and upload the envelope. Returns (storage key, fragment key).
async fn share_text(server: &str, plaintext: &str, ttl_seconds: u64) -> Result<(String, String)> {
    let prepared = share::create_text_share(plaintext, limits::DEFAULT_MAX_PLAINTEXT_BYTES)?;
    let expires = Expiration::from_seconds(ttl_seconds);

    let client = Client::new();
    let resp = client
        .post(format!("{}/api/secrets", server.trim_end_matches('/')))
        .json(&serde_json::json!({
            "ciphertext": prepared.envelope,
            "expires": expires,
        }))
        .send()
        .await
        .context("HTTP request failed")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        anyhow::bail!("server returned {status}: {text}");
    }

    let json: Value = resp.json().await.context("parse response")?;
    let id = json["id"]
        .as_str()
        .context("response is missing the storage id")?;
    Ok((id.to_owned(), prepared.key))
}

async fn share_file(server: &str, path: &Path, ttl_seconds: u64) -> Result<(String, String)> {
    let content = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("file path has no filename")?;
    let content_type = mime_guess::from_path(path).first_or_octet_stream();

    let prepared = share::create_file_share(&content, &filename, content_type.as_ref())?;

    let client = Client::new();
    let resp = client
        .post(format!("{}/api/files", server.trim_end_matches('/')))
        .json(&serde_json::json!({
            "metadata": prepared.payload.metadata,
            "encryptedDataBase64": prepared.payload.encrypted_data_base64,
            "ttlSeconds": ttl_seconds,
        }))
        .send()
        .await
        .context("HTTP request failed")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        anyhow::bail!("server returned {status}: {text}");
    }

    let json: Value = resp.json().await.context("parse response")?;
    let id = json["id"]
        .as_str()
        .context("response is missing the file id")?;
    Ok((id.to_owned(), prepared.key))
}

async fn cmd_reveal(server: &str, raw_link: &str, output: Option<PathBuf>) -> Result<()> {
    let (storage_key, fragment_key) = link::parse_share_link(raw_link)?;

    match classify(&storage_key) {
        Some(SecretKind::Text) => reveal_text(server, &storage_key, &fragment_key).await,
        Some(SecretKind::File) => reveal_file(server, &storage_key, &fragment_key, output).await,
        None => anyhow::bail!("{storage_key:?} is not a valid hush storage key"),
    }
}

async fn reveal_text(server: &str, storage_key: &str, fragment_key: &str) -> Result<()> {
    let client = Client::new();
    let resp = client
        .get(format!(
            "{}/api/secrets/{storage_key}",
            server.trim_end_matches('/')
        ))
        .send()
        .await
        .context("HTTP request failed")?;

    if resp.status() == reqwest::StatusCode::NOT_FOUND {
        anyhow::bail!("not found — the link may have expired or already been revealed");
    }
    if !resp.status().is_success() {
        anyhow::bail!("server returned {}", resp.status());
    }

    let json: Value = resp.json().await.context("parse response")?;
    let envelope = json["ciphertext"]
        .as_str()
        .context("response is missing the ciphertext")?;

    let plaintext = share::open_text_share(envelope, fragment_key)?;
    println!("{plaintext}");
    Ok(())
}

async fn reveal_file(
    server: &str,
    storage_key: &str,
    fragment_key: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let client = Client::new();
    let base = server.trim_end_matches('/');

    let resp = client
        .get(format!("{base}/api/files/{storage_key}"))
        .send()
        .await
        .context("HTTP request failed")?;

    if resp.status() == reqwest::StatusCode::NOT_FOUND {
        anyhow::bail!("not found — the link may have expired or already been revealed");
    }
    if !resp.status().is_success() {
        anyhow::bail!("server returned {}", resp.status());
    }

    let payload: share::FilePayload = resp.json().await.context("parse file payload")?;
    let content = share::open_file_share(&payload, fragment_key)?;

    let target =
        output.unwrap_or_else(|| PathBuf::from(&payload.metadata.original_filename));
    std::fs::write(&target, &content)
        .with_context(|| format!("write {}", target.display()))?;

    // Confirm receipt so the record is gone even if the fetch-side delete
    // ever changes; the server treats this as an idempotent no-op.
    let confirm = client
        .delete(format!("{base}/api/files/{storage_key}"))
        .send()
        .await;
    if let Err(e) = confirm {
        tracing::warn!(error = %e, "post-download delete confirmation failed");
    }

    println!("wrote {} bytes to {}", content.len(), target.display());
    Ok(())
}

fn cmd_password(length: usize, no_symbols: bool) -> Result<()> {
    use rand::Rng;

    const LETTERS_DIGITS: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    const SYMBOLS: &[u8] = b"!@#$%^&*-_=+?";

    if length == 0 {
        anyhow::bail!("password length must be at least 1");
    }

    let mut alphabet = LETTERS_DIGITS.to_vec();
    if !no_symbols {
        alphabet.extend_from_slice(SYMBOLS);
    }

    let mut rng = rand::thread_rng();
    let password: String = (0..length)
        .map(|_| char::from(alphabet[rng.gen_range(0..alphabet.len())]))
        .collect();

    println!("{password}");
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Parse human duration strings like "1h", "30m", "7d" into seconds, and
/// reject values the server would refuse anyway.
fn parse_ttl(s: &str) -> Result<u64> {
    let d: humantime::Duration = s
        .parse()
        .with_context(|| format!("invalid duration: {s}"))?;
    let seconds = Expiration::from_seconds(d.as_secs()).ttl_seconds()?;
    Ok(seconds)
}
