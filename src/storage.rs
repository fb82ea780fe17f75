use rusqlite::{params, OptionalExtension};
use anyhow::{Result, Context, bail};
use serde::Serialize;
use std::path::Path;
use r2d2_sqlite::SqliteConnectionManager;
use r2d2::Pool;
use crate::graph::AnnotationGraph;

// Validation constants
const MAX_URI_LENGTH: usize = 2048;
const MAX_TEXT_LENGTH: usize = 1 << 20;

/// Validate content item URI
fn validate_uri(uri: &str) -> Result<()> {
    if uri.is_empty() {
        bail!("Content URI cannot be empty");
    }
    if uri.len() > MAX_URI_LENGTH {
        bail!("Content URI too long (max {} chars)", MAX_URI_LENGTH);
    }
    // Check for whitespace, control characters and null bytes
    if uri.chars().any(|c| c.is_control() || c.is_whitespace()) {
        bail!("Content URI contains invalid characters");
    }
    Ok(())
}

/// Validate stored text
fn validate_text(text: &str) -> Result<()> {
    if text.len() > MAX_TEXT_LENGTH {
        bail!("Content text too long (max {} bytes)", MAX_TEXT_LENGTH);
    }
    if text.contains('\0') {
        bail!("Content text contains null bytes");
    }
    Ok(())
}

/// Build SQL placeholders for IN queries (?1, ?2, ?3, ...)
/// offset: starting placeholder number (default 1)
fn build_placeholders(count: usize, offset: usize) -> String {
    (offset..offset + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validate database file path
fn validate_db_path(path: &Path) -> Result<()> {
    // Check file extension FIRST (before any filesystem operations)
    if let Some(ext) = path.extension() {
        if ext != "db" {
            bail!("Invalid database file extension (must be .db)");
        }
    } else {
        bail!("Database path must have .db extension");
    }
    Ok(())
}

const SCHEMA: &str = r#"
-- Enhanced content items, graph stored as JSON
CREATE TABLE IF NOT EXISTS contents (
    uri TEXT PRIMARY KEY NOT NULL,
    mime_type TEXT NOT NULL,
    text TEXT NOT NULL,
    language TEXT,
    graph TEXT NOT NULL
) STRICT;

-- Entity index with FOREIGN KEY for cascade delete
CREATE TABLE IF NOT EXISTS entities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content_uri TEXT NOT NULL,
    label TEXT,
    reference TEXT,
    entity_type TEXT,
    confidence REAL,
    FOREIGN KEY(content_uri) REFERENCES contents(uri) ON DELETE CASCADE
) STRICT;

-- Indexes for lookups by content and by linked resource
CREATE INDEX IF NOT EXISTS idx_contents_language ON contents(language);
CREATE INDEX IF NOT EXISTS idx_entities_content ON entities(content_uri);
CREATE INDEX IF NOT EXISTS idx_entities_reference ON entities(reference);

-- FTS5 virtual table for full-text search over content text
CREATE VIRTUAL TABLE IF NOT EXISTS contents_fts USING fts5(
    uri,
    text,
    content='contents',
    content_rowid='rowid'
);

-- Triggers to keep FTS5 in sync with contents table
CREATE TRIGGER IF NOT EXISTS contents_ai AFTER INSERT ON contents BEGIN
    INSERT INTO contents_fts(rowid, uri, text)
    VALUES (new.rowid, new.uri, new.text);
END;

CREATE TRIGGER IF NOT EXISTS contents_ad AFTER DELETE ON contents BEGIN
    INSERT INTO contents_fts(contents_fts, rowid, uri, text)
    VALUES ('delete', old.rowid, old.uri, old.text);
END;

CREATE TRIGGER IF NOT EXISTS contents_au AFTER UPDATE ON contents BEGIN
    INSERT INTO contents_fts(contents_fts, rowid, uri, text)
    VALUES ('delete', old.rowid, old.uri, old.text);
    INSERT INTO contents_fts(rowid, uri, text)
    VALUES (new.rowid, new.uri, new.text);
END;
"#;

/// Enhanced content item as read back from the store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredContent {
    pub uri: String,
    pub mime_type: String,
    pub text: String,
    pub language: Option<String>,
    pub graph: AnnotationGraph,
}

/// Search hit: one content item and how many entities it mentions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentSummary {
    pub uri: String,
    pub language: Option<String>,
    pub entity_count: usize,
}

/// Row of the entity index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityMention {
    pub content_uri: String,
    pub label: Option<String>,
    pub reference: Option<String>,
    pub entity_type: Option<String>,
    pub confidence: Option<f64>,
}

pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open or create database with connection pool
    pub fn open(path: &Path) -> Result<Self> {
        validate_db_path(path)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // FOREIGN KEY enforcement is per connection (off by default!)
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(15)
            .build(manager)
            .context("Failed to create connection pool")?;

        {
            let conn = pool.get().context("Failed to get connection from pool")?;

            // WAL mode for concurrent reads
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;

            conn.execute_batch(SCHEMA)?;
        }

        Ok(Self { pool })
    }

    /// Store the enhancements of one content item, replacing any earlier
    /// version. Returns the number of indexed entities.
    /// Wrapped in transaction for atomicity
    pub fn save_enhancements(
        &self,
        uri: &str,
        mime_type: &str,
        text: &str,
        graph: &AnnotationGraph,
    ) -> Result<usize> {
        validate_uri(uri)?;
        validate_text(text)?;

        let language = graph
            .language_annotations()
            .into_iter()
            .find_map(|anno| anno.language);
        let graph_json = serde_json::to_string(graph)
            .with_context(|| format!("Failed to serialize graph for '{}'", uri))?;
        let entities = graph.entity_annotations();

        let conn = self.pool.get()
            .context("Failed to get database connection from pool")?;
        let tx = conn.unchecked_transaction()
            .context("Failed to start transaction for saving enhancements")?;

        // CASCADE drops the old entity rows
        tx.execute("DELETE FROM contents WHERE uri = ?1", params![uri])
            .with_context(|| format!("Failed to replace content '{}'", uri))?;
        tx.execute(
            "INSERT INTO contents (uri, mime_type, text, language, graph) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![uri, mime_type, text, &language, &graph_json],
        )
        .with_context(|| format!("Failed to insert content '{}'", uri))?;

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO entities (content_uri, label, reference, entity_type, confidence)
                 VALUES (?1, ?2, ?3, ?4, ?5)"
            )
            .context("Failed to prepare insert statement for entities")?;

            for entity in &entities {
                stmt.execute(params![
                    uri,
                    &entity.label,
                    &entity.reference,
                    &entity.entity_type,
                    &entity.confidence,
                ])
                .with_context(|| format!("Failed to index entity {:?} of '{}'", entity.label, uri))?;
            }
        }

        tx.commit()
            .context("Failed to commit transaction for saving enhancements")?;
        Ok(entities.len())
    }

    /// Read back one content item
    pub fn load_content(&self, uri: &str) -> Result<Option<StoredContent>> {
        validate_uri(uri)?;

        let conn = self.pool.get()?;
        let row = conn.query_row(
            "SELECT uri, mime_type, text, language, graph FROM contents WHERE uri = ?1",
            params![uri],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()
        .with_context(|| format!("Database error querying content '{}'", uri))?;

        let Some((uri, mime_type, text, language, graph_json)) = row else {
            return Ok(None);
        };
        let graph = serde_json::from_str(&graph_json)
            .with_context(|| format!("Corrupted graph data for content '{}'", uri))?;
        Ok(Some(StoredContent { uri, mime_type, text, language, graph }))
    }

    /// Search content text using FTS5, or list everything without a query
    pub fn search_contents(&self, query: Option<&str>) -> Result<Vec<ContentSummary>> {
        let conn = self.pool.get()?;
        let map_row = |row: &rusqlite::Row<'_>| {
            Ok(ContentSummary {
                uri: row.get(0)?,
                language: row.get(1)?,
                entity_count: row.get::<_, i64>(2)? as usize,
            })
        };

        let mut results = Vec::new();
        if let Some(q) = query {
            let mut stmt = conn.prepare(
                "SELECT c.uri, c.language,
                        (SELECT COUNT(*) FROM entities e WHERE e.content_uri = c.uri)
                 FROM contents c
                 INNER JOIN contents_fts fts ON c.rowid = fts.rowid
                 WHERE contents_fts MATCH ?1
                 ORDER BY c.uri"
            )?;
            let rows = stmt.query_map(params![q], map_row)?;
            for row in rows {
                results.push(row?);
            }
        } else {
            let mut stmt = conn.prepare(
                "SELECT c.uri, c.language,
                        (SELECT COUNT(*) FROM entities e WHERE e.content_uri = c.uri)
                 FROM contents c
                 ORDER BY c.uri"
            )?;
            let rows = stmt.query_map([], map_row)?;
            for row in rows {
                results.push(row?);
            }
        }
        Ok(results)
    }

    /// Entity rows linking to `reference`, across all content items
    pub fn contents_mentioning(&self, reference: &str) -> Result<Vec<EntityMention>> {
        validate_uri(reference)?;

        let conn = self.pool.get()?;
        let mut stmt = conn.prepare_cached(
            "SELECT content_uri, label, reference, entity_type, confidence
             FROM entities WHERE reference = ?1
             ORDER BY content_uri, id"
        )?;
        let rows = stmt.query_map(params![reference], |row| {
            Ok(EntityMention {
                content_uri: row.get(0)?,
                label: row.get(1)?,
                reference: row.get(2)?,
                entity_type: row.get(3)?,
                confidence: row.get(4)?,
            })
        })?;

        let mut mentions = Vec::new();
        for row in rows {
            mentions.push(row?);
        }
        Ok(mentions)
    }

    /// Delete content items (cascade delete of their entities via FOREIGN KEY)
    pub fn delete_contents(&self, uris: &[String]) -> Result<usize> {
        if uris.is_empty() {
            return Ok(0);
        }

        for uri in uris {
            validate_uri(uri)?;
        }

        let conn = self.pool.get()
            .context("Failed to get database connection from pool")?;

        let placeholders = build_placeholders(uris.len(), 1);
        let query = format!("DELETE FROM contents WHERE uri IN ({})", placeholders);

        let params: Vec<&dyn rusqlite::ToSql> = uris.iter()
            .map(|s| s as &dyn rusqlite::ToSql)
            .collect();

        let count = conn.execute(&query, params.as_slice())
            .context(format!("Failed to delete {} contents", uris.len()))?;

        Ok(count)
    }
}
