use std::time::{SystemTime, UNIX_EPOCH};

use {
    async_trait::async_trait,
    sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction},
    tracing::{debug, warn},
};

use beacon_channels::{ChannelConfig, ChannelEdit, ChannelStore, Error, Result, gating};

/// Internal row type for sqlx mapping.
#[derive(sqlx::FromRow)]
struct ChannelRow {
    channel_id: i64,
    owner_id: Option<i64>,
    on_images: Option<String>,
    off_images: Option<String>,
    display_username: Option<String>,
    display_title: Option<String>,
    text_on: Option<String>,
    text_off: Option<String>,
}

impl From<ChannelRow> for ChannelConfig {
    fn from(r: ChannelRow) -> Self {
        Self {
            channel_id: r.channel_id,
            owner_id: r.owner_id,
            on_images: decode_images(r.on_images.as_deref()),
            off_images: decode_images(r.off_images.as_deref()),
            display_username: r.display_username,
            display_title: r.display_title,
            text_on: r.text_on,
            text_off: r.text_off,
        }
    }
}

const SELECT_CHANNEL: &str = "SELECT channel_id, owner_id, on_images, off_images, \
     display_username, display_title, text_on, text_off FROM channels";

/// Decode a stored image list.
///
/// Accepts the JSON array written today, a JSON-array string, and the legacy
/// bare single reference. NULL and blank values decode to an empty list.
pub fn decode_images(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Vec::new();
    };
    if raw.starts_with('[') {
        match serde_json::from_str::<Vec<String>>(raw) {
            Ok(images) => return images,
            Err(e) => warn!(error = %e, "malformed image list, treating as single reference"),
        }
    }
    vec![raw.to_string()]
}

/// Whether a stored value is in a shape other than a JSON array.
fn is_legacy_images(raw: Option<&str>) -> bool {
    match raw.map(str::trim) {
        None => true,
        Some(s) => serde_json::from_str::<Vec<String>>(s).is_err(),
    }
}

fn encode_images(images: &[String]) -> Result<String> {
    serde_json::to_string(images).map_err(|e| Error::external("encode image list", e))
}

fn db(context: &'static str) -> impl FnOnce(sqlx::Error) -> Error {
    move |e| Error::external(context, e)
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// SQLite-backed channel store.
pub struct SqliteChannelStore {
    pool: SqlitePool,
}

impl SqliteChannelStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the channels table schema.
    ///
    /// Schema is managed by sqlx migrations; this is kept for tests that use
    /// in-memory databases.
    #[doc(hidden)]
    pub async fn init(pool: &SqlitePool) -> anyhow::Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS channels (
                channel_id        INTEGER PRIMARY KEY,
                owner_id          INTEGER,
                on_images         TEXT    NOT NULL DEFAULT '[]',
                off_images        TEXT    NOT NULL DEFAULT '[]',
                display_username  TEXT,
                display_title     TEXT,
                text_on           TEXT,
                text_off          TEXT,
                created_at        INTEGER NOT NULL,
                updated_at        INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Start a write transaction holding the database lock from the first
    /// read. Dropping it without commit rolls back.
    async fn begin_immediate(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(db("begin transaction"))
    }

    /// Rewrite every image list still stored in a legacy shape as a JSON
    /// array. Returns the number of rows rewritten.
    pub async fn normalize_legacy_rows(&self) -> Result<u64> {
        let rows = sqlx::query_as::<_, (i64, Option<String>, Option<String>)>(
            "SELECT channel_id, on_images, off_images FROM channels",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db("scan image lists"))?;

        let mut rewritten = 0;
        for (channel_id, on_raw, off_raw) in rows {
            if !is_legacy_images(on_raw.as_deref()) && !is_legacy_images(off_raw.as_deref()) {
                continue;
            }
            let on = encode_images(&decode_images(on_raw.as_deref()))?;
            let off = encode_images(&decode_images(off_raw.as_deref()))?;
            sqlx::query("UPDATE channels SET on_images = ?, off_images = ? WHERE channel_id = ?")
                .bind(&on)
                .bind(&off)
                .bind(channel_id)
                .execute(&self.pool)
                .await
                .map_err(db("normalize image lists"))?;
            rewritten += 1;
        }
        if rewritten > 0 {
            debug!(rewritten, "normalized legacy image lists");
        }
        Ok(rewritten)
    }

    /// Import channels from a legacy bot database.
    ///
    /// The legacy table is `channels(channel_id, owner_id, red_image,
    /// green_image)`; red maps to the off collection and green to the on
    /// collection. Channels already present here are left untouched.
    pub async fn import_legacy(&self, legacy: &SqlitePool) -> Result<u64> {
        let rows = sqlx::query_as::<_, (i64, Option<i64>, Option<String>, Option<String>)>(
            "SELECT channel_id, owner_id, red_image, green_image FROM channels",
        )
        .fetch_all(legacy)
        .await
        .map_err(db("read legacy channels"))?;

        let mut imported = 0;
        for (channel_id, owner_id, red, green) in rows {
            let off = encode_images(&decode_images(red.as_deref()))?;
            let on = encode_images(&decode_images(green.as_deref()))?;
            let t = now();
            let result = sqlx::query(
                r#"INSERT INTO channels (channel_id, owner_id, on_images, off_images, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?, ?)
                   ON CONFLICT(channel_id) DO NOTHING"#,
            )
            .bind(channel_id)
            .bind(owner_id)
            .bind(&on)
            .bind(&off)
            .bind(t)
            .bind(t)
            .execute(&self.pool)
            .await
            .map_err(db("import legacy channel"))?;
            imported += result.rows_affected();
        }
        Ok(imported)
    }
}

async fn fetch(conn: &mut SqliteConnection, channel_id: i64) -> Result<Option<ChannelConfig>> {
    let row = sqlx::query_as::<_, ChannelRow>(&format!("{SELECT_CHANNEL} WHERE channel_id = ?"))
        .bind(channel_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db("load channel"))?;
    Ok(row.map(Into::into))
}

/// Body of [`ChannelStore::apply`]; runs inside an immediate transaction.
/// Returning early drops the transaction and rolls it back.
async fn apply_locked(
    conn: &mut SqliteConnection,
    channel_id: i64,
    acting_user: i64,
    edit: ChannelEdit,
) -> Result<ChannelConfig> {
    let mut config = fetch(conn, channel_id)
        .await?
        .ok_or(Error::NotFound { channel_id })?;
    if !gating::is_authorized(&config, acting_user) {
        return Err(Error::OwnershipConflict { channel_id });
    }
    edit.apply(&mut config)?;

    sqlx::query(
        r#"UPDATE channels SET
             owner_id = ?, on_images = ?, off_images = ?, text_on = ?, text_off = ?,
             updated_at = ?
           WHERE channel_id = ?"#,
    )
    .bind(config.owner_id)
    .bind(encode_images(&config.on_images)?)
    .bind(encode_images(&config.off_images)?)
    .bind(&config.text_on)
    .bind(&config.text_off)
    .bind(now())
    .bind(channel_id)
    .execute(&mut *conn)
    .await
    .map_err(db("update channel"))?;
    Ok(config)
}

async fn delete_locked(conn: &mut SqliteConnection, channel_id: i64, acting_user: i64) -> Result<()> {
    let config = fetch(conn, channel_id)
        .await?
        .ok_or(Error::NotFound { channel_id })?;
    if !gating::is_authorized(&config, acting_user) {
        return Err(Error::OwnershipConflict { channel_id });
    }
    sqlx::query("DELETE FROM channels WHERE channel_id = ?")
        .bind(channel_id)
        .execute(&mut *conn)
        .await
        .map_err(db("delete channel"))?;
    Ok(())
}

#[async_trait]
impl ChannelStore for SqliteChannelStore {
    async fn list(&self) -> Result<Vec<ChannelConfig>> {
        let rows = sqlx::query_as::<_, ChannelRow>(&format!("{SELECT_CHANNEL} ORDER BY channel_id"))
            .fetch_all(&self.pool)
            .await
            .map_err(db("list channels"))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get(&self, channel_id: i64) -> Result<Option<ChannelConfig>> {
        let mut conn = self.pool.acquire().await.map_err(db("acquire connection"))?;
        fetch(&mut conn, channel_id).await
    }

    async fn claim(&self, channel_id: i64, user_id: i64) -> Result<ChannelConfig> {
        let t = now();
        // Single statement: the row is created owned, or an unclaimed row is
        // taken over. An owned row keeps its owner.
        sqlx::query(
            r#"INSERT INTO channels (channel_id, owner_id, on_images, off_images, created_at, updated_at)
               VALUES (?, ?, '[]', '[]', ?, ?)
               ON CONFLICT(channel_id) DO UPDATE SET
                 owner_id = excluded.owner_id,
                 updated_at = excluded.updated_at
               WHERE channels.owner_id IS NULL"#,
        )
        .bind(channel_id)
        .bind(user_id)
        .bind(t)
        .bind(t)
        .execute(&self.pool)
        .await
        .map_err(db("claim channel"))?;

        self.get(channel_id)
            .await?
            .ok_or(Error::NotFound { channel_id })
    }

    async fn apply(
        &self,
        channel_id: i64,
        acting_user: i64,
        edit: ChannelEdit,
    ) -> Result<ChannelConfig> {
        let mut tx = self.begin_immediate().await?;
        let config = apply_locked(&mut tx, channel_id, acting_user, edit).await?;
        tx.commit().await.map_err(db("commit channel edit"))?;
        Ok(config)
    }

    async fn update_display(
        &self,
        channel_id: i64,
        username: Option<&str>,
        title: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE channels SET display_username = ?, display_title = ?, updated_at = ? \
             WHERE channel_id = ?",
        )
        .bind(username)
        .bind(title)
        .bind(now())
        .bind(channel_id)
        .execute(&self.pool)
        .await
        .map_err(db("update channel metadata"))?;
        Ok(())
    }

    async fn delete(&self, channel_id: i64, acting_user: i64) -> Result<()> {
        let mut tx = self.begin_immediate().await?;
        delete_locked(&mut tx, channel_id, acting_user).await?;
        tx.commit().await.map_err(db("commit channel delete"))
    }
}
