mod memory;
mod sqlite;

use anyhow::Result;
use plano_core::{DocumentChunk, HazardRow, Row, SourceRequest, ZoningRow};
use serde::{Deserialize, Serialize};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub trait RegulationRepository: Send + Sync {
    async fn fetch(&self, request: &SourceRequest) -> Result<Vec<Row>>;
}

pub trait EntityDirectory: Send + Sync {
    async fn list_entities(&self) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub zoning: Vec<ZoningRow>,
    pub chunks: Vec<DocumentChunk>,
    pub sections: Vec<DocumentChunk>,
    pub hazards: Vec<HazardRow>,
}

impl Dataset {
    pub fn neighborhoods(&self) -> Vec<String> {
        let mut names = self
            .zoning
            .iter()
            .map(|row| row.neighborhood.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>();
        names.sort();
        names.dedup();
        names
    }
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl Store {
    pub fn memory(dataset: Dataset) -> Self {
        Self::Memory(MemoryStore::new(dataset))
    }

    pub async fn sqlite(database_url: &str) -> Result<Self> {
        let sqlite = SqliteStore::connect(database_url).await?;
        Ok(Self::Sqlite(sqlite))
    }
}

impl RegulationRepository for Store {
    async fn fetch(&self, request: &SourceRequest) -> Result<Vec<Row>> {
        match self {
            Store::Memory(store) => store.fetch(request).await,
            Store::Sqlite(store) => store.fetch(request).await,
        }
    }
}

impl EntityDirectory for Store {
    async fn list_entities(&self) -> Result<Vec<String>> {
        match self {
            Store::Memory(store) => store.list_entities().await,
            Store::Sqlite(store) => store.list_entities().await,
        }
    }
}
