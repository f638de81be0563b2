use sea_orm::Database;
use sea_orm_migration::prelude::*;

const USAGE: &str = "Usage: cargo run -p migration -- [up|down|fresh|status]

The database is DATABASE_URL when set, otherwise the SQLite file the server
uses: BEFRIEND__DATABASE__SQLITE, falling back to ./befriend.db.";

/// Resolve the database to migrate, preferring an explicit url over the
/// server's `[database] sqlite` path.
fn database_url(explicit: Option<String>, sqlite_path: Option<String>) -> String {
    if let Some(url) = explicit.filter(|url| !url.trim().is_empty()) {
        return url;
    }
    let path = sqlite_path
        .filter(|path| !path.trim().is_empty())
        .unwrap_or_else(|| "./befriend.db".to_string());
    format!("sqlite:{path}?mode=rwc")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut args = std::env::args().skip(1);
    let cmd = args.next().unwrap_or_else(|| "up".to_string());

    let db_url = database_url(
        std::env::var("DATABASE_URL").ok(),
        std::env::var("BEFRIEND__DATABASE__SQLITE").ok(),
    );

    let db = Database::connect(&db_url).await?;

    match cmd.as_str() {
        "up" => migration::Migrator::up(&db, None).await?,
        "down" => migration::Migrator::down(&db, None).await?,
        "fresh" => migration::Migrator::fresh(&db).await?,
        "status" => {
            migration::Migrator::status(&db).await?;
        }
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}
