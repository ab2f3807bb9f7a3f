/// Project document model
///
/// Stores metadata only; file bytes live in object storage at `file_path`.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Document categories, stored as text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Drawing,
    Report,
    Contract,
    Permit,
    Invoice,
    Specification,
    Other,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Drawing => "drawing",
            DocumentType::Report => "report",
            DocumentType::Contract => "contract",
            DocumentType::Permit => "permit",
            DocumentType::Invoice => "invoice",
            DocumentType::Specification => "specification",
            DocumentType::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "drawing" => Some(DocumentType::Drawing),
            "report" => Some(DocumentType::Report),
            "contract" => Some(DocumentType::Contract),
            "permit" => Some(DocumentType::Permit),
            "invoice" => Some(DocumentType::Invoice),
            "specification" => Some(DocumentType::Specification),
            "other" => Some(DocumentType::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub document_type: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const DOCUMENT_COLUMNS: &str = "id, project_id, name, document_type, file_path, file_size, \
     mime_type, uploaded_by, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct CreateDocument {
    pub project_id: Uuid,
    pub name: String,
    pub document_type: DocumentType,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub uploaded_by: Uuid,
}

impl Document {
    pub fn document_type(&self) -> DocumentType {
        DocumentType::from_str(&self.document_type).unwrap_or(DocumentType::Other)
    }

    pub async fn create(pool: &PgPool, data: CreateDocument) -> Result<Self, sqlx::Error> {
        let document = sqlx::query_as::<_, Document>(&format!(
            r#"
            INSERT INTO documents (project_id, name, document_type, file_path, file_size, mime_type, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {DOCUMENT_COLUMNS}
            "#,
        ))
        .bind(data.project_id)
        .bind(data.name)
        .bind(data.document_type.as_str())
        .bind(data.file_path)
        .bind(data.file_size)
        .bind(data.mime_type)
        .bind(data.uploaded_by)
        .fetch_one(pool)
        .await?;

        Ok(document)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let document = sqlx::query_as::<_, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(document)
    }

    pub async fn list_by_project(
        pool: &PgPool,
        project_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let documents = sqlx::query_as::<_, Document>(&format!(
            r#"
            SELECT {DOCUMENT_COLUMNS} FROM documents
            WHERE project_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        ))
        .bind(project_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(documents)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_round_trip() {
        for dt in [
            DocumentType::Drawing,
            DocumentType::Report,
            DocumentType::Contract,
            DocumentType::Permit,
            DocumentType::Invoice,
            DocumentType::Specification,
            DocumentType::Other,
        ] {
            assert_eq!(DocumentType::from_str(dt.as_str()), Some(dt));
        }
    }
}
