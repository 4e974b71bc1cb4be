use cast_client::{CastClient, CastClientConfig};
use castlens_core::AppConfig;
use std::io::{self, Write};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    println!("=== Cast Search Manual Test ===\n");

    let config = AppConfig::load(None)?;
    if config.api_key().is_none() {
        println!("❌ NEYNAR_API_KEY is not set. Export it and run again.");
        return Ok(());
    }

    print!("Enter a Farcaster fid: ");
    io::stdout().flush()?;
    let mut fid = String::new();
    io::stdin().read_line(&mut fid)?;
    let fid = fid.trim().to_string();

    let client = CastClient::new(CastClientConfig::from(&config))?;
    println!("🔍 Keywords: {}", client.keywords().query_param());

    match client.fetch_casts(&fid).await {
        Ok(casts) => {
            println!("✅ Retrieved {} casts\n", casts.len());
            for cast in casts.iter().take(10) {
                println!("   [{}] {}", cast.timestamp, cast.text.replace('\n', " "));
            }
        }
        Err(e) => {
            println!("❌ Fetch failed: {}", e);
        }
    }

    Ok(())
}
