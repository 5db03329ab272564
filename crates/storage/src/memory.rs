use std::cmp::Ordering;
use std::sync::Arc;

use anyhow::{bail, Result};
use parking_lot::RwLock;
use plano_core::{
    normalize, DocumentChunk, Filter, HazardRow, Row, SortOrder, SourceKind, SourceRequest,
    ZoningRow,
};

use crate::{Dataset, EntityDirectory, RegulationRepository};

#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<Dataset>>,
}

impl MemoryStore {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            data: Arc::new(RwLock::new(dataset)),
        }
    }

    pub fn replace(&self, dataset: Dataset) {
        *self.data.write() = dataset;
    }
}

impl RegulationRepository for MemoryStore {
    async fn fetch(&self, request: &SourceRequest) -> Result<Vec<Row>> {
        let data = self.data.read();
        let mut rows = match request.source {
            SourceKind::Zoning => filter_zoning(&data.zoning, &request.filter)?,
            SourceKind::LegalChunks => filter_chunks(&data.chunks, &request.filter)?,
            SourceKind::DocumentSections => filter_chunks(&data.sections, &request.filter)?,
            SourceKind::Hazards => filter_hazards(&data.hazards, &request.filter)?,
        };

        sort_rows(&mut rows, request.order);
        if let Some(limit) = request.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }
}

impl EntityDirectory for MemoryStore {
    async fn list_entities(&self) -> Result<Vec<String>> {
        Ok(self.data.read().neighborhoods())
    }
}

fn filter_zoning(rows: &[ZoningRow], filter: &Filter) -> Result<Vec<Row>> {
    let keep = |row: &ZoningRow| -> Result<bool> {
        Ok(match filter {
            Filter::All => true,
            Filter::EntityLike(pattern) => pattern.matches(&row.neighborhood),
            Filter::ZoneLike(pattern) => pattern.matches(&row.zone),
            Filter::HeightPresent => row.max_height.is_some(),
            other => bail!("filter {other:?} is not supported by regime_urbanistico"),
        })
    };

    let mut kept = Vec::new();
    for row in rows {
        if keep(row)? {
            kept.push(Row::Zoning(row.clone()));
        }
    }
    Ok(kept)
}

fn filter_chunks(chunks: &[DocumentChunk], filter: &Filter) -> Result<Vec<Row>> {
    let mut kept = Vec::new();
    for chunk in chunks {
        let keep = match filter {
            Filter::All => true,
            Filter::TextLike(patterns) => {
                let content = normalize(&chunk.content);
                patterns
                    .iter()
                    .any(|pattern| pattern.matches_normalized(&content))
            }
            other => bail!("filter {other:?} is not supported by document stores"),
        };
        if keep {
            kept.push(Row::Chunk(chunk.clone()));
        }
    }
    Ok(kept)
}

fn filter_hazards(rows: &[HazardRow], filter: &Filter) -> Result<Vec<Row>> {
    let mut kept = Vec::new();
    for row in rows {
        let keep = match filter {
            Filter::All => true,
            Filter::TextLike(patterns) => {
                let description = normalize(&row.description);
                patterns
                    .iter()
                    .any(|pattern| pattern.matches_normalized(&description))
            }
            Filter::EntityLike(pattern) => pattern.matches(&row.neighborhood),
            Filter::FloodRisk(flag) => row.flood_risk == *flag,
            other => bail!("filter {other:?} is not supported by bairros_risco_desastre"),
        };
        if keep {
            kept.push(Row::Hazard(row.clone()));
        }
    }
    Ok(kept)
}

fn sort_rows(rows: &mut [Row], order: SortOrder) {
    match order {
        SortOrder::Natural => {}
        SortOrder::ByZone => rows.sort_by(|a, b| zone_key(a).cmp(&zone_key(b))),
        SortOrder::ByNeighborhood => {
            rows.sort_by(|a, b| neighborhood_key(a).cmp(&neighborhood_key(b)))
        }
        SortOrder::HeightDesc => rows.sort_by(|a, b| {
            let lhs = a.as_zoning().and_then(|row| row.max_height);
            let rhs = b.as_zoning().and_then(|row| row.max_height);
            rhs.partial_cmp(&lhs).unwrap_or(Ordering::Equal)
        }),
    }
}

fn zone_key(row: &Row) -> String {
    row.as_zoning()
        .map(|row| row.zone.clone())
        .unwrap_or_default()
}

fn neighborhood_key(row: &Row) -> String {
    match row {
        Row::Zoning(row) => normalize(&row.neighborhood),
        Row::Hazard(row) => normalize(&row.neighborhood),
        Row::Chunk(_) => String::new(),
    }
}
