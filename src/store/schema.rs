pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY,
    first_name TEXT NOT NULL,
    surname TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),

    -- Plan
    is_premium INTEGER NOT NULL DEFAULT 0,
    memory_limit INTEGER NOT NULL DEFAULT 30
);

-- Images are owned by a user and attached to at most one node
CREATE TABLE IF NOT EXISTS images (
    image_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(user_id),
    file_path TEXT NOT NULL,      -- storage path, or the encoded picture when is_inline = 1
    is_inline INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Nodes reference images without a foreign key; the application cascades deletes
CREATE TABLE IF NOT EXISTS nodes (
    node_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(user_id),
    title TEXT NOT NULL DEFAULT 'Untitled',
    description TEXT NOT NULL DEFAULT '',
    image_id TEXT,
    tags TEXT NOT NULL DEFAULT '[]',  -- JSON array of strings
    position_x REAL,
    position_y REAL,
    custom_date TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS nodelinks (
    link_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(user_id),
    source_node_id TEXT NOT NULL,
    target_node_id TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS password_reset_tokens (
    token_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(user_id),
    token_hash TEXT NOT NULL UNIQUE,  -- sha256 of the emailed token
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT NOT NULL,
    used INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_nodes_user_created ON nodes(user_id, created_at);
CREATE INDEX IF NOT EXISTS idx_nodes_image ON nodes(image_id);
CREATE INDEX IF NOT EXISTS idx_images_user_path ON images(user_id, file_path);
CREATE INDEX IF NOT EXISTS idx_nodelinks_user ON nodelinks(user_id);
CREATE INDEX IF NOT EXISTS idx_nodelinks_source ON nodelinks(source_node_id);
CREATE INDEX IF NOT EXISTS idx_nodelinks_target ON nodelinks(target_node_id);
CREATE INDEX IF NOT EXISTS idx_reset_tokens_user ON password_reset_tokens(user_id);
"#;
