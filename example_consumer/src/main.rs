//! Example consumer: a separate Rust project that uses safedb as a dependency.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Expects a `users` table with an auto-increment `id` plus `name`, `email` and `role` columns.

use safedb::{fields_from_json, AllowList, Db, DbConfig, Params, WhereClause};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("safedb=info,example_consumer=info")),
        )
        .init();

    let config = DbConfig::from_env()?;
    let db = Db::connect(&config).await?;

    // Untrusted request body: `role` is submitted but not in the allow-list.
    let body = json!({"name": "Ann", "email": "a@x.com", "role": "admin"});
    let data = fields_from_json(body.as_object().ok_or("body must be an object")?);
    let id = db.insert("users", &data, &AllowList::only(["name", "email"])).await?;
    tracing::info!(id, "inserted user");

    let patch = json!({"email": "b@x.com"});
    let data = fields_from_json(patch.as_object().ok_or("patch must be an object")?);
    let rows = db
        .update("users", &data, &WhereClause::new().eq("id", id), &AllowList::only(["email"]))
        .await?;
    tracing::info!(rows, "updated user");

    let out = db.run("SELECT `id`, `name`, `email`, `role` FROM `users` ORDER BY `id` DESC LIMIT 5", &Params::new()).await?;
    for row in &out.rows {
        tracing::info!(%row, "user");
    }
    Ok(())
}
