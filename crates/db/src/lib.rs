use std::str::FromStr;

use sqlx::{
    Error, Pool, Sqlite, SqlitePool,
    sqlite::SqliteConnectOptions,
};
use utils::assets::asset_dir;

pub mod models;

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct DBService {
    pub pool: Pool<Sqlite>,
}

impl DBService {
    /// Open (creating on first run) the file-backed database and apply
    /// migrations.
    pub async fn new() -> Result<DBService, Error> {
        let dir = asset_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
        }
        let database_url = format!("sqlite://{}", dir.join("db.sqlite").to_string_lossy());
        let options = SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        MIGRATOR.run(&pool).await?;
        Ok(DBService { pool })
    }
}
