use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "connscope-cli")]
#[command(about = "Query a connscope instance about your own connection", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Accept self-signed server certificates
    #[arg(long)]
    insecure: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the full connection report
    Report,
    /// Print the MSS and where it came from
    Mss,
    /// Print the negotiated TLS version and cipher suite
    Tls,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(cli.insecure)
        .build()?;

    let res = client.get(&cli.url).send().await?;
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let report: Value = res.json().await?;

    match cli.command {
        Commands::Report => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Mss => {
            println!(
                "mss: {} ({}, {})",
                report["incoming_mss"],
                field(&report, "mss_source"),
                field(&report, "mss_status"),
            );
            if let Some(mtu) = report.get("mtu") {
                println!("mtu: {}", mtu);
            }
        }
        Commands::Tls => {
            let cipher = field(&report, "cipher_suite");
            println!("version: {}", field(&report, "tls_version"));
            println!("cipher:  {}", if cipher.is_empty() { "-" } else { cipher });
        }
    }

    Ok(())
}

fn field<'a>(report: &'a Value, name: &str) -> &'a str {
    report.get(name).and_then(Value::as_str).unwrap_or("")
}
