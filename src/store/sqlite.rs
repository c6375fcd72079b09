use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const USER_COLUMNS: &str =
    "user_id, first_name, surname, email, password_hash, created_at, is_premium, memory_limit";
const NODE_COLUMNS: &str = "node_id, user_id, title, description, image_id, tags, position_x, position_y, custom_date, created_at, updated_at";
const IMAGE_COLUMNS: &str = "image_id, user_id, file_path, is_inline, created_at";
const LINK_COLUMNS: &str = "link_id, user_id, source_node_id, target_node_id, created_at";
const RESET_TOKEN_COLUMNS: &str = "token_id, user_id, token_hash, created_at, expires_at, used";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn serialize_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

fn parse_tags(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!("Invalid tags in database: '{}' - {}", raw, e);
        Vec::new()
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        first_name: row.get(1)?,
        surname: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        is_premium: row.get(6)?,
        memory_limit: row.get(7)?,
    })
}

fn node_from_row(row: &Row<'_>) -> rusqlite::Result<Node> {
    Ok(Node {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        image_id: row.get(4)?,
        tags: parse_tags(&row.get::<_, String>(5)?),
        position_x: row.get(6)?,
        position_y: row.get(7)?,
        custom_date: row.get::<_, Option<String>>(8)?.map(|s| parse_datetime(&s)),
        created_at: parse_datetime(&row.get::<_, String>(9)?),
        updated_at: parse_datetime(&row.get::<_, String>(10)?),
    })
}

fn image_from_row(row: &Row<'_>) -> rusqlite::Result<Image> {
    Ok(Image {
        id: row.get(0)?,
        user_id: row.get(1)?,
        file_path: row.get(2)?,
        is_inline: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn link_from_row(row: &Row<'_>) -> rusqlite::Result<NodeLink> {
    Ok(NodeLink {
        link_id: row.get(0)?,
        user_id: row.get(1)?,
        source_node_id: row.get(2)?,
        target_node_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn reset_token_from_row(row: &Row<'_>) -> rusqlite::Result<PasswordResetToken> {
    Ok(PasswordResetToken {
        id: row.get(0)?,
        user_id: row.get(1)?,
        token_hash: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        expires_at: parse_datetime(&row.get::<_, String>(4)?),
        used: row.get(5)?,
    })
}

/// Turns the supplied fields of `changes` into `(column, value)` pairs.
fn node_assignments(changes: &NodeChanges) -> Vec<(&'static str, Value)> {
    let mut assignments = Vec::new();

    if let Some(title) = &changes.title {
        assignments.push(("title", Value::Text(title.clone())));
    }
    if let Some(description) = &changes.description {
        assignments.push(("description", Value::Text(description.clone())));
    }
    if let Some(image_id) = &changes.image_id {
        assignments.push(("image_id", Value::Text(image_id.clone())));
    }
    if let Some(tags) = &changes.tags {
        assignments.push(("tags", Value::Text(serialize_tags(tags))));
    }
    if let Some(x) = changes.position_x {
        assignments.push(("position_x", Value::Real(x)));
    }
    if let Some(y) = changes.position_y {
        assignments.push(("position_y", Value::Real(y)));
    }
    if let Some(date) = &changes.custom_date {
        assignments.push(("custom_date", Value::Text(format_datetime(date))));
    }

    assignments.push(("updated_at", Value::Text(format_datetime(&Utc::now()))));
    assignments
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO users (user_id, first_name, surname, email, password_hash, created_at, is_premium, memory_limit)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user.id,
                user.first_name,
                user.surname,
                user.email,
                user.password_hash,
                format_datetime(&user.created_at),
                user.is_premium,
                user.memory_limit,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::DuplicateEmail),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_user_field(&self, id: &str, field: UserField, value: &str) -> Result<()> {
        let sql = format!("UPDATE users SET {} = ?1 WHERE user_id = ?2", field.column());
        let rows = match self.conn().execute(&sql, params![value, id]) {
            Ok(rows) => rows,
            Err(e) if field == UserField::Email && is_unique_violation(&e) => {
                return Err(Error::DuplicateEmail);
            }
            Err(e) => return Err(Error::from(e)),
        };

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn set_user_plan(&self, id: &str, is_premium: bool, memory_limit: i64) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET is_premium = ?1, memory_limit = ?2 WHERE user_id = ?3",
            params![is_premium, memory_limit, id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Node operations

    fn create_node(&self, node: &Node) -> Result<()> {
        self.conn().execute(
            "INSERT INTO nodes (node_id, user_id, title, description, image_id, tags, position_x, position_y, custom_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                node.id,
                node.user_id,
                node.title,
                node.description,
                node.image_id,
                serialize_tags(&node.tags),
                node.position_x,
                node.position_y,
                node.custom_date.as_ref().map(format_datetime),
                format_datetime(&node.created_at),
                format_datetime(&node.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_node(&self, user_id: &str, node_id: &str) -> Result<Option<Node>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {NODE_COLUMNS} FROM nodes WHERE user_id = ?1 AND node_id = ?2"),
            params![user_id, node_id],
            node_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_nodes(&self, user_id: &str, limit: i64, offset: i64) -> Result<Vec<Node>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {NODE_COLUMNS} FROM nodes WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3"
        ))?;

        let rows = stmt.query_map(params![user_id, limit, offset], node_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_nodes(&self, user_id: &str) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM nodes WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn update_node(&self, user_id: &str, node_id: &str, changes: &NodeChanges) -> Result<bool> {
        let assignments = node_assignments(changes);
        let set_clause = assignments
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{column} = ?{}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let n = assignments.len();
        let sql = format!(
            "UPDATE nodes SET {set_clause} WHERE user_id = ?{} AND node_id = ?{}",
            n + 1,
            n + 2
        );

        let mut values: Vec<Value> = assignments.into_iter().map(|(_, v)| v).collect();
        values.push(Value::Text(user_id.to_string()));
        values.push(Value::Text(node_id.to_string()));

        let rows = self.conn().execute(&sql, params_from_iter(values.iter()))?;
        Ok(rows > 0)
    }

    fn delete_node(&self, user_id: &str, node_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM nodes WHERE user_id = ?1 AND node_id = ?2",
            params![user_id, node_id],
        )?;
        Ok(rows > 0)
    }

    fn find_node_by_image(&self, user_id: &str, image_id: &str) -> Result<Option<String>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT node_id FROM nodes WHERE user_id = ?1 AND image_id = ?2 LIMIT 1",
            params![user_id, image_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    // Image operations

    fn create_image(&self, image: &Image) -> Result<()> {
        self.conn().execute(
            "INSERT INTO images (image_id, user_id, file_path, is_inline, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                image.id,
                image.user_id,
                image.file_path,
                image.is_inline,
                format_datetime(&image.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_image(&self, user_id: &str, image_id: &str) -> Result<Option<Image>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {IMAGE_COLUMNS} FROM images WHERE user_id = ?1 AND image_id = ?2"),
            params![user_id, image_id],
            image_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_image_by_path(&self, user_id: &str, file_path: &str) -> Result<Option<Image>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {IMAGE_COLUMNS} FROM images
                 WHERE user_id = ?1 AND file_path = ?2 AND is_inline = 0
                 ORDER BY created_at DESC LIMIT 1"
            ),
            params![user_id, file_path],
            image_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_image(&self, user_id: &str, image_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM images WHERE user_id = ?1 AND image_id = ?2",
            params![user_id, image_id],
        )?;
        Ok(rows > 0)
    }

    // Link operations

    fn create_link(&self, link: &NodeLink) -> Result<()> {
        self.conn().execute(
            "INSERT INTO nodelinks (link_id, user_id, source_node_id, target_node_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                link.link_id,
                link.user_id,
                link.source_node_id,
                link.target_node_id,
                format_datetime(&link.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_links(&self, user_id: &str) -> Result<Vec<NodeLink>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {LINK_COLUMNS} FROM nodelinks WHERE user_id = ?1 ORDER BY created_at"
        ))?;

        let rows = stmt.query_map(params![user_id], link_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_link(&self, user_id: &str, link_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM nodelinks WHERE user_id = ?1 AND link_id = ?2",
            params![user_id, link_id],
        )?;
        Ok(rows > 0)
    }

    fn delete_links_for_node(&self, user_id: &str, node_id: &str) -> Result<usize> {
        let rows = self.conn().execute(
            "DELETE FROM nodelinks
             WHERE user_id = ?1 AND (source_node_id = ?2 OR target_node_id = ?2)",
            params![user_id, node_id],
        )?;
        Ok(rows)
    }

    // Password reset token operations

    fn create_reset_token(&self, token: &PasswordResetToken) -> Result<()> {
        self.conn().execute(
            "INSERT INTO password_reset_tokens (token_id, user_id, token_hash, created_at, expires_at, used)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                token.id,
                token.user_id,
                token.token_hash,
                format_datetime(&token.created_at),
                format_datetime(&token.expires_at),
                token.used,
            ],
        )?;
        Ok(())
    }

    fn get_reset_token(&self, token_hash: &str) -> Result<Option<PasswordResetToken>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {RESET_TOKEN_COLUMNS} FROM password_reset_tokens WHERE token_hash = ?1"),
            params![token_hash],
            reset_token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn mark_reset_token_used(&self, token_hash: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "UPDATE password_reset_tokens SET used = 1 WHERE token_hash = ?1 AND used = 0",
            params![token_hash],
        )?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn test_user(id: &str, email: &str) -> User {
        User {
            id: id.to_string(),
            first_name: "Ada".to_string(),
            surname: "Lovelace".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
            is_premium: false,
            memory_limit: FREE_MEMORY_LIMIT,
        }
    }

    fn test_node(id: &str, user_id: &str) -> Node {
        let now = Utc::now();
        Node {
            id: id.to_string(),
            user_id: user_id.to_string(),
            title: DEFAULT_NODE_TITLE.to_string(),
            description: "first".to_string(),
            image_id: None,
            tags: vec!["trip".to_string(), "2024".to_string()],
            position_x: Some(1.5),
            position_y: None,
            custom_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, store) = test_store();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"nodes".to_string()));
        assert!(tables.contains(&"images".to_string()));
        assert!(tables.contains(&"nodelinks".to_string()));
        assert!(tables.contains(&"password_reset_tokens".to_string()));
    }

    #[test]
    fn test_duplicate_email() {
        let (_temp, store) = test_store();

        store.create_user(&test_user("u-1", "ada@example.com")).unwrap();
        let result = store.create_user(&test_user("u-2", "ada@example.com"));
        assert!(matches!(result, Err(Error::DuplicateEmail)));
    }

    #[test]
    fn test_update_user_field() {
        let (_temp, store) = test_store();
        store.create_user(&test_user("u-1", "ada@example.com")).unwrap();
        store.create_user(&test_user("u-2", "grace@example.com")).unwrap();

        store
            .update_user_field("u-1", UserField::Surname, "King")
            .unwrap();
        assert_eq!(store.get_user("u-1").unwrap().unwrap().surname, "King");

        let taken = store.update_user_field("u-1", UserField::Email, "grace@example.com");
        assert!(matches!(taken, Err(Error::DuplicateEmail)));

        let missing = store.update_user_field("nobody", UserField::FirstName, "X");
        assert!(matches!(missing, Err(Error::NotFound)));
    }

    #[test]
    fn test_node_tags_round_trip() {
        let (_temp, store) = test_store();
        store.create_user(&test_user("u-1", "ada@example.com")).unwrap();
        store.create_node(&test_node("n-1", "u-1")).unwrap();

        let node = store.get_node("u-1", "n-1").unwrap().unwrap();
        assert_eq!(node.tags, vec!["trip", "2024"]);
        assert_eq!(node.position_x, Some(1.5));
        assert_eq!(node.position_y, None);

        assert!(store.get_node("u-2", "n-1").unwrap().is_none());
    }

    #[test]
    fn test_update_node_only_touches_supplied_columns() {
        let (_temp, store) = test_store();
        store.create_user(&test_user("u-1", "ada@example.com")).unwrap();
        let mut node = test_node("n-1", "u-1");
        node.image_id = Some("img-1".to_string());
        store.create_node(&node).unwrap();

        let changes = NodeChanges {
            description: Some("second".to_string()),
            ..Default::default()
        };
        assert!(store.update_node("u-1", "n-1", &changes).unwrap());

        let updated = store.get_node("u-1", "n-1").unwrap().unwrap();
        assert_eq!(updated.description, "second");
        assert_eq!(updated.image_id.as_deref(), Some("img-1"));
        assert_eq!(updated.tags, node.tags);

        assert!(!store.update_node("u-2", "n-1", &changes).unwrap());
    }

    #[test]
    fn test_list_nodes_newest_first() {
        let (_temp, store) = test_store();
        store.create_user(&test_user("u-1", "ada@example.com")).unwrap();

        for (i, id) in ["n-1", "n-2", "n-3"].iter().enumerate() {
            let mut node = test_node(id, "u-1");
            node.created_at = Utc::now() + chrono::Duration::seconds(i as i64);
            store.create_node(&node).unwrap();
        }

        let page = store.list_nodes("u-1", 2, 0).unwrap();
        let ids: Vec<_> = page.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["n-3", "n-2"]);

        let rest = store.list_nodes("u-1", 2, 2).unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, "n-1");

        assert_eq!(store.count_nodes("u-1").unwrap(), 3);
    }

    #[test]
    fn test_delete_links_for_node() {
        let (_temp, store) = test_store();
        store.create_user(&test_user("u-1", "ada@example.com")).unwrap();

        for (id, source, target) in [("l-1", "a", "b"), ("l-2", "c", "a"), ("l-3", "b", "c")] {
            store
                .create_link(&NodeLink {
                    link_id: id.to_string(),
                    user_id: "u-1".to_string(),
                    source_node_id: source.to_string(),
                    target_node_id: target.to_string(),
                    created_at: Utc::now(),
                })
                .unwrap();
        }

        assert_eq!(store.delete_links_for_node("u-1", "a").unwrap(), 2);
        let remaining = store.list_links("u-1").unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].link_id, "l-3");
    }

    #[test]
    fn test_reset_token_marked_used_once() {
        let (_temp, store) = test_store();
        store.create_user(&test_user("u-1", "ada@example.com")).unwrap();

        let now = Utc::now();
        store
            .create_reset_token(&PasswordResetToken {
                id: "t-1".to_string(),
                user_id: "u-1".to_string(),
                token_hash: "digest".to_string(),
                created_at: now,
                expires_at: now + chrono::Duration::hours(1),
                used: false,
            })
            .unwrap();

        assert!(store.mark_reset_token_used("digest").unwrap());
        assert!(!store.mark_reset_token_used("digest").unwrap());
        assert!(store.get_reset_token("digest").unwrap().unwrap().used);
    }
}
