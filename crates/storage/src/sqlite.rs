use anyhow::{bail, Context, Result};
use plano_core::{
    normalize, DocumentChunk, Filter, HazardRow, Row, SortOrder, SourceKind, SourceRequest,
    ZoningRow,
};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row as _, Sqlite, SqlitePool};

use crate::{Dataset, EntityDirectory, RegulationRepository};

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .with_context(|| format!("failed connecting to sqlite at {}", database_url))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS regime_urbanistico (
              zone TEXT NOT NULL,
              zone_norm TEXT NOT NULL,
              neighborhood TEXT NOT NULL,
              neighborhood_norm TEXT NOT NULL,
              max_height REAL,
              basic_coefficient REAL,
              max_coefficient REAL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        for table in ["document_embeddings", "document_sections"] {
            sqlx::query(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                  id INTEGER PRIMARY KEY AUTOINCREMENT,
                  content TEXT NOT NULL,
                  content_norm TEXT NOT NULL,
                  metadata_json TEXT NOT NULL
                );
                "#
            ))
            .execute(&self.pool)
            .await?;
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bairros_risco_desastre (
              neighborhood TEXT NOT NULL,
              neighborhood_norm TEXT NOT NULL,
              description TEXT NOT NULL,
              description_norm TEXT NOT NULL,
              flood_risk INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_dataset(&self, dataset: &Dataset) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for row in &dataset.zoning {
            sqlx::query(
                r#"
                INSERT INTO regime_urbanistico
                  (zone, zone_norm, neighborhood, neighborhood_norm, max_height, basic_coefficient, max_coefficient)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&row.zone)
            .bind(normalize(&row.zone))
            .bind(&row.neighborhood)
            .bind(normalize(&row.neighborhood))
            .bind(row.max_height)
            .bind(row.basic_coefficient)
            .bind(row.max_coefficient)
            .execute(&mut *tx)
            .await?;
        }

        for (table, chunks) in [
            ("document_embeddings", &dataset.chunks),
            ("document_sections", &dataset.sections),
        ] {
            for chunk in chunks {
                sqlx::query(&format!(
                    "INSERT INTO {table} (content, content_norm, metadata_json) VALUES (?1, ?2, ?3)"
                ))
                .bind(&chunk.content)
                .bind(normalize(&chunk.content))
                .bind(serde_json::to_string(&chunk.metadata)?)
                .execute(&mut *tx)
                .await?;
            }
        }

        for row in &dataset.hazards {
            sqlx::query(
                r#"
                INSERT INTO bairros_risco_desastre
                  (neighborhood, neighborhood_norm, description, description_norm, flood_risk)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&row.neighborhood)
            .bind(normalize(&row.neighborhood))
            .bind(&row.description)
            .bind(normalize(&row.description))
            .bind(row.flood_risk)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

impl RegulationRepository for SqliteStore {
    async fn fetch(&self, request: &SourceRequest) -> Result<Vec<Row>> {
        let source = request.source;
        let columns = match source {
            SourceKind::Zoning => "zone, neighborhood, max_height, basic_coefficient, max_coefficient",
            SourceKind::LegalChunks | SourceKind::DocumentSections => "content, metadata_json",
            SourceKind::Hazards => "neighborhood, description, flood_risk",
        };

        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT {columns} FROM {}", source.table()));
        push_filter(&mut builder, source, &request.filter)?;
        builder.push(order_clause(source, request.order)?);
        if let Some(limit) = request.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("query against {} failed", source.table()))?;

        rows.iter().map(|row| decode_row(source, row)).collect()
    }
}

impl EntityDirectory for SqliteStore {
    async fn list_entities(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT neighborhood
            FROM regime_urbanistico
            ORDER BY neighborhood
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.get::<String, _>("neighborhood"))
            .collect())
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, source: SourceKind, filter: &Filter) -> Result<()> {
    match (source, filter) {
        (_, Filter::All) => {}
        (SourceKind::LegalChunks | SourceKind::DocumentSections | SourceKind::Hazards, Filter::TextLike(patterns)) => {
            let column = if source == SourceKind::Hazards {
                "description_norm"
            } else {
                "content_norm"
            };
            if patterns.is_empty() {
                builder.push(" WHERE 0");
                return Ok(());
            }
            builder.push(" WHERE (");
            for (idx, pattern) in patterns.iter().enumerate() {
                if idx > 0 {
                    builder.push(" OR ");
                }
                builder
                    .push(format!("{column} LIKE "))
                    .push_bind(pattern.to_sql())
                    .push(" ESCAPE '\\'");
            }
            builder.push(")");
        }
        (SourceKind::Zoning | SourceKind::Hazards, Filter::EntityLike(pattern)) => {
            builder
                .push(" WHERE neighborhood_norm LIKE ")
                .push_bind(pattern.to_sql())
                .push(" ESCAPE '\\'");
        }
        (SourceKind::Zoning, Filter::ZoneLike(pattern)) => {
            builder
                .push(" WHERE zone_norm LIKE ")
                .push_bind(pattern.to_sql())
                .push(" ESCAPE '\\'");
        }
        (SourceKind::Zoning, Filter::HeightPresent) => {
            builder.push(" WHERE max_height IS NOT NULL");
        }
        (SourceKind::Hazards, Filter::FloodRisk(flag)) => {
            builder.push(" WHERE flood_risk = ").push_bind(*flag);
        }
        (source, filter) => bail!("filter {filter:?} is not supported by {}", source.table()),
    }
    Ok(())
}

fn order_clause(source: SourceKind, order: SortOrder) -> Result<&'static str> {
    Ok(match (source, order) {
        (_, SortOrder::Natural) => " ORDER BY rowid",
        (SourceKind::Zoning, SortOrder::ByZone) => " ORDER BY zone",
        (SourceKind::Zoning, SortOrder::HeightDesc) => " ORDER BY max_height DESC",
        (SourceKind::Zoning | SourceKind::Hazards, SortOrder::ByNeighborhood) => {
            " ORDER BY neighborhood_norm"
        }
        (source, order) => bail!("ordering {order:?} is not supported by {}", source.table()),
    })
}

fn decode_row(source: SourceKind, row: &SqliteRow) -> Result<Row> {
    Ok(match source {
        SourceKind::Zoning => Row::Zoning(ZoningRow {
            zone: row.try_get("zone")?,
            neighborhood: row.try_get("neighborhood")?,
            max_height: row.try_get("max_height")?,
            basic_coefficient: row.try_get("basic_coefficient")?,
            max_coefficient: row.try_get("max_coefficient")?,
        }),
        SourceKind::LegalChunks | SourceKind::DocumentSections => {
            let metadata_json: String = row.try_get("metadata_json")?;
            Row::Chunk(DocumentChunk {
                content: row.try_get("content")?,
                metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
            })
        }
        SourceKind::Hazards => Row::Hazard(HazardRow {
            neighborhood: row.try_get("neighborhood")?,
            description: row.try_get("description")?,
            flood_risk: row.try_get("flood_risk")?,
        }),
    })
}
