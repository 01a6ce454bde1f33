use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::{info, trace};

use crate::errors::{AppError, AppResult};
use crate::item::{Item, ItemParams};

pub struct DatabaseContext {
    pub connection: Connection,
    pub path: PathBuf,
}

pub fn bootstrap<P: AsRef<Path>>(data_dir: P, database_file: &str) -> AppResult<DatabaseContext> {
    let data_dir = data_dir.as_ref();
    std::fs::create_dir_all(data_dir)?;
    if database_file.trim().is_empty() {
        return Err(AppError::Path("database file name is empty".into()));
    }
    let db_path = data_dir.join(database_file);

    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
    let connection = Connection::open_with_flags(&db_path, flags)?;
    configure(&connection)?;
    run_migrations(&connection)?;

    info!(
        target: "database_bootstrap",
        path = %db_path.display(),
        "item store ready"
    );
    Ok(DatabaseContext {
        connection,
        path: db_path,
    })
}

fn configure(connection: &Connection) -> AppResult<()> {
    connection.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA foreign_keys = ON;
        "#,
    )?;
    Ok(())
}

fn run_migrations(connection: &Connection) -> AppResult<()> {
    connection.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            item_id TEXT PRIMARY KEY NOT NULL,
            name TEXT,
            rating REAL,
            address TEXT,
            image_url TEXT,
            url TEXT,
            distance REAL
        );

        CREATE TABLE IF NOT EXISTS users (
            user_id TEXT PRIMARY KEY NOT NULL,
            password TEXT NOT NULL,
            first_name TEXT,
            last_name TEXT
        );

        CREATE TABLE IF NOT EXISTS categories (
            item_id TEXT NOT NULL,
            category TEXT NOT NULL,
            PRIMARY KEY (item_id, category),
            FOREIGN KEY (item_id) REFERENCES items(item_id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS history (
            user_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            last_favor_time TEXT NOT NULL DEFAULT (DATETIME('now')),
            PRIMARY KEY (user_id, item_id),
            FOREIGN KEY (user_id) REFERENCES users(user_id),
            FOREIGN KEY (item_id) REFERENCES items(item_id)
        );

        CREATE INDEX IF NOT EXISTS idx_categories_category ON categories(category);
        "#,
    )?;
    Ok(())
}

/// Persists normalized items and their category sets.
#[derive(Clone)]
pub struct ItemStore {
    db: Arc<Mutex<Connection>>,
}

impl ItemStore {
    pub fn new(connection: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(connection)),
        }
    }

    /// Upserts every item and replaces its categories, in one transaction.
    pub fn save_items(&self, items: &[Item]) -> AppResult<usize> {
        let mut conn = self.db.lock();
        let tx = conn.transaction()?;
        {
            let mut upsert = tx.prepare(
                "INSERT INTO items (item_id, name, rating, address, image_url, url, distance)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(item_id) DO UPDATE SET
                    name = excluded.name,
                    rating = excluded.rating,
                    address = excluded.address,
                    image_url = excluded.image_url,
                    url = excluded.url,
                    distance = excluded.distance",
            )?;
            let mut clear = tx.prepare("DELETE FROM categories WHERE item_id = ?1")?;
            let mut insert_category =
                tx.prepare("INSERT OR IGNORE INTO categories (item_id, category) VALUES (?1, ?2)")?;

            for item in items {
                upsert.execute(params![
                    item.item_id(),
                    item.name(),
                    item.rating(),
                    item.address(),
                    item.image_url(),
                    item.url(),
                    item.distance(),
                ])?;
                clear.execute([item.item_id()])?;
                for category in item.categories() {
                    insert_category.execute(params![item.item_id(), category])?;
                }
                trace!(item_id = item.item_id(), "item persisted");
            }
        }
        tx.commit()?;
        Ok(items.len())
    }

    pub fn load_item(&self, item_id: &str) -> AppResult<Option<Item>> {
        let conn = self.db.lock();
        let row = conn
            .query_row(
                "SELECT item_id, name, rating, address, image_url, url, distance
                FROM items
                WHERE item_id = ?1",
                [item_id],
                |row| {
                    Ok(ItemParams {
                        item_id: row.get(0)?,
                        name: row.get(1)?,
                        rating: row.get(2)?,
                        address: row.get(3)?,
                        image_url: row.get(4)?,
                        url: row.get(5)?,
                        distance: row.get(6)?,
                        categories: None,
                    })
                },
            )
            .optional()?;

        let Some(mut params) = row else {
            return Ok(None);
        };

        let mut stmt =
            conn.prepare("SELECT category FROM categories WHERE item_id = ?1 ORDER BY category")?;
        let categories = stmt
            .query_map([item_id], |row| row.get::<_, String>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        params.categories = Some(categories);
        Ok(Some(Item::new(params)))
    }

    pub fn item_ids_for_category(&self, category: &str) -> AppResult<Vec<String>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(
            "SELECT item_id FROM categories WHERE category = ?1 ORDER BY item_id ASC",
        )?;
        let ids = stmt
            .query_map([category], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }
}
