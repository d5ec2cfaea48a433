use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Management CLI for the relay control daemon", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:2515")]
    url: String,

    /// Language for validation messages (en, zh).
    #[arg(short, long, default_value = "en")]
    lang: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daemon version, pool phase and flag values
    Status,
    /// Per-upstream traffic over the display window
    Proxies,
    /// Clear died state on every live proxy
    Refresh,
    /// Turn a feature flag on (tcp-scrambler, google-scrambler, china-shortcut,
    /// direct-access, goagent-public-servers, ss-public-servers)
    Enable { flag: String },
    /// Turn a feature flag off
    Disable { flag: String },
    /// Add a private server, e.g. `add SSH host=h port=22 username=u`
    Add {
        proxy_type: String,
        #[arg(value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Replace (or create) the private server stored under an id
    Update {
        proxy_id: String,
        proxy_type: String,
        #[arg(value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Remove a private server
    Delete { proxy_id: String },
    /// Show one stored private server
    Get { proxy_id: String },
    /// Replace the DNS bypass list with the contents of a file
    DnsBypass { file: PathBuf },
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{s}'"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_str(&cli.lang)?);
    let client = reqwest::Client::builder().default_headers(headers).build()?;
    let url = |path: &str| format!("{}{}", cli.url.trim_end_matches('/'), path);

    let res = match cli.command {
        Commands::Status => client.get(url("/status")).send().await?,
        Commands::Proxies => client.get(url("/proxies")).send().await?,
        Commands::Refresh => client.post(url("/refresh-proxies")).send().await?,
        Commands::Enable { flag } => client.post(url(&format!("/{flag}/enable"))).send().await?,
        Commands::Disable { flag } => client.post(url(&format!("/{flag}/disable"))).send().await?,
        Commands::Add { proxy_type, mut fields } => {
            fields.push(("proxy_type".into(), proxy_type));
            client.post(url("/proxies/add")).form(&fields).send().await?
        }
        Commands::Update {
            proxy_id,
            proxy_type,
            mut fields,
        } => {
            fields.push(("proxy_id".into(), proxy_id));
            fields.push(("proxy_type".into(), proxy_type));
            client.post(url("/proxies/update")).form(&fields).send().await?
        }
        Commands::Delete { proxy_id } => {
            client
                .post(url("/proxies/delete"))
                .form(&[("proxy_id", proxy_id)])
                .send()
                .await?
        }
        Commands::Get { proxy_id } => {
            client
                .get(url("/proxy"))
                .query(&[("proxy_id", proxy_id)])
                .send()
                .await?
        }
        Commands::DnsBypass { file } => {
            let content = tokio::fs::read_to_string(&file).await?;
            client
                .post(url("/dns-bypass/save"))
                .form(&[("content", content)])
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: daemon returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) if text.is_empty() => println!("OK"),
        // Validation rejections come back as 200 with plain text.
        Err(_) => println!("{}", text),
    }
    Ok(())
}
