//! Process-wide database handle, created on first access and kept for the life of the process.

use crate::config::DbConfig;
use crate::error::DbResult;
use crate::service::Db;
use tokio::sync::OnceCell;

static SHARED: OnceCell<Db> = OnceCell::const_new();

/// The shared handle. The first call loads `.env`, reads `DB_*` settings and connects;
/// concurrent first callers wait for that single initialisation.
pub async fn shared() -> DbResult<&'static Db> {
    SHARED
        .get_or_try_init(|| async {
            dotenvy::dotenv().ok();
            let config = DbConfig::from_env()?;
            Db::connect(&config).await
        })
        .await
}

/// Install an already-built handle as the shared one. Gives the handle back if one is already set.
pub fn init_shared(db: Db) -> Result<(), Db> {
    SHARED.set(db).map_err(|e| match e {
        tokio::sync::SetError::AlreadyInitializedError(db) => db,
        tokio::sync::SetError::InitializingError(db) => db,
    })
}
