//! Seed catalog tables from JSON files.
//!
//! Events are upserted (re-running the command refreshes titles, dates, and
//! image URLs of existing rows); products are inserted as new rows.

use std::path::Path;

use secrecy::SecretString;
use tracing::info;

use mirabel_core::EventRecord;
use mirabel_proxy::supabase::SupabaseClient;

/// Upsert events from a JSON file into the `events` table.
///
/// # Errors
///
/// Returns an error if environment variables are missing, the file cannot be
/// read or parsed, or the upsert fails.
pub async fn events(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = client_from_env()?;
    let content = read_file(file_path).await?;

    let events: Vec<EventRecord> = serde_json::from_str(&content)?;
    info!(path = %file_path, count = events.len(), "Parsed events file");

    let stored: Vec<EventRecord> = client.upsert("events", &events).await?;
    info!(stored = stored.len(), "Seeded events");
    Ok(())
}

/// Insert products from a JSON file into the `products` table.
///
/// # Errors
///
/// Returns an error if environment variables are missing, the file cannot be
/// read or parsed, or the insert fails.
pub async fn products(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = client_from_env()?;
    let content = read_file(file_path).await?;

    let products: Vec<serde_json::Value> = serde_json::from_str(&content)?;
    if products.iter().any(|p| !p.is_object()) {
        return Err("products file must be a JSON array of objects".into());
    }
    info!(path = %file_path, count = products.len(), "Parsed products file");

    let stored: Vec<serde_json::Value> = client.insert("products", &products).await?;
    info!(stored = stored.len(), "Seeded products");
    Ok(())
}

/// Build a Supabase client from `SUPABASE_URL` / `SUPABASE_SERVICE_ROLE_KEY`.
fn client_from_env() -> Result<SupabaseClient, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let supabase_url = std::env::var("SUPABASE_URL").map_err(|_| "SUPABASE_URL not set")?;
    let service_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
        .map(SecretString::from)
        .map_err(|_| "SUPABASE_SERVICE_ROLE_KEY not set")?;

    Ok(SupabaseClient::with_url(&supabase_url, service_key))
}

/// Read a seed file, with a friendlier error when it does not exist.
async fn read_file(file_path: &str) -> Result<String, Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }
    Ok(tokio::fs::read_to_string(path).await?)
}
