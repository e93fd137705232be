//! SQLite schema definition

/// SQL schema for a content store file
pub const SCHEMA_SQL: &str = r#"
-- Candidate items; one row per (title, content_type, source_module)
CREATE TABLE IF NOT EXISTS content_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    url TEXT,
    content_type TEXT NOT NULL CHECK (content_type IN ('quote', 'article', 'news', 'image')),
    category TEXT,
    source_module TEXT NOT NULL,
    posted INTEGER NOT NULL DEFAULT 0 CHECK (posted IN (0, 1)),
    post_date TEXT,
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    UNIQUE (title, content_type, source_module),
    CHECK ((posted = 0 AND post_date IS NULL) OR (posted = 1 AND post_date IS NOT NULL))
);

CREATE INDEX IF NOT EXISTS idx_content_items_unposted ON content_items(posted, content_type);
CREATE INDEX IF NOT EXISTS idx_content_items_category ON content_items(category);
CREATE INDEX IF NOT EXISTS idx_content_items_post_date ON content_items(post_date);

-- Published rows are frozen
CREATE TRIGGER IF NOT EXISTS content_items_posted_immutable
BEFORE UPDATE ON content_items
WHEN OLD.posted = 1
BEGIN
    SELECT RAISE(ABORT, 'posted content items are immutable');
END;

CREATE TRIGGER IF NOT EXISTS content_items_never_deleted
BEFORE DELETE ON content_items
BEGIN
    SELECT RAISE(ABORT, 'content items are never deleted');
END;
"#;
