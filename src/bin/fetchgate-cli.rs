use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "fetchgate-cli")]
#[command(about = "Send a URL list to a fetchgate server and print the lengths", long_about = None)]
struct Cli {
    /// Server address.
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// File with one URL per line.
    #[arg(short, long, conflicts_with = "urls")]
    file: Option<PathBuf>,

    /// URLs to fetch.
    #[arg(required_unless_present = "file")]
    urls: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let body = match &cli.file {
        Some(path) => std::fs::read_to_string(path)?.trim_end().to_string(),
        None => cli.urls.join("\n"),
    };

    let client = reqwest::Client::new();
    let res = client.post(&cli.url).body(body).send().await?;

    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        eprintln!("Response: {}", text);
        std::process::exit(1);
    }

    println!("{}", text);
    Ok(())
}
