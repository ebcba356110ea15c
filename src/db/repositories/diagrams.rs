use sqlx::{Row, SqlitePool};

use crate::{
    core::{
        errors::{AppError, AppResult},
        types::NetworkDiagram,
    },
    db::parse_timestamp,
};

#[derive(Debug, Clone)]
pub struct NewDiagram<'a> {
    pub id: &'a str,
    pub folder: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub bucket: &'a str,
    pub object_path: &'a str,
    pub section_number: Option<i64>,
    pub source_file: Option<&'a str>,
    pub checksum: &'a str,
}

pub async fn insert_diagram(pool: &SqlitePool, diagram: &NewDiagram<'_>) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO network_diagrams (
          id, folder, title, description, bucket, object_path, section_number, source_file, checksum
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(diagram.id)
    .bind(diagram.folder)
    .bind(diagram.title)
    .bind(diagram.description)
    .bind(diagram.bucket)
    .bind(diagram.object_path)
    .bind(diagram.section_number)
    .bind(diagram.source_file)
    .bind(diagram.checksum)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_diagrams(pool: &SqlitePool, folder: Option<&str>) -> AppResult<Vec<NetworkDiagram>> {
    let rows = if let Some(folder) = folder {
        sqlx::query(
            r#"
            SELECT id, folder, title, description, bucket, object_path, section_number, source_file, checksum, created_at
            FROM network_diagrams
            WHERE folder = ?1
            ORDER BY created_at ASC, section_number ASC
            "#,
        )
        .bind(folder)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query(
            r#"
            SELECT id, folder, title, description, bucket, object_path, section_number, source_file, checksum, created_at
            FROM network_diagrams
            ORDER BY created_at ASC, section_number ASC
            "#,
        )
        .fetch_all(pool)
        .await?
    };

    rows.into_iter().map(map_diagram).collect()
}

pub async fn get_diagram(pool: &SqlitePool, id: &str) -> AppResult<NetworkDiagram> {
    let row = sqlx::query(
        r#"
        SELECT id, folder, title, description, bucket, object_path, section_number, source_file, checksum, created_at
        FROM network_diagrams
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("diagram {id}")))?;

    map_diagram(row)
}

pub async fn delete_diagram(pool: &SqlitePool, id: &str) -> AppResult<bool> {
    let affected = sqlx::query("DELETE FROM network_diagrams WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(affected > 0)
}

fn map_diagram(row: sqlx::sqlite::SqliteRow) -> AppResult<NetworkDiagram> {
    let created_at: String = row.try_get("created_at")?;
    Ok(NetworkDiagram {
        id: row.try_get("id")?,
        folder: row.try_get("folder")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        bucket: row.try_get("bucket")?,
        object_path: row.try_get("object_path")?,
        section_number: row.try_get("section_number")?,
        source_file: row.try_get("source_file")?,
        checksum: row.try_get("checksum")?,
        created_at: parse_timestamp(created_at)?,
    })
}
