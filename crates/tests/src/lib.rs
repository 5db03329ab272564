use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use plano_agents::{AgentConfig, RegulationAgent};
use plano_core::{DocumentChunk, HazardRow, Row, SourceRequest, ZoningRow};
use plano_observability::AppMetrics;
use plano_storage::{Dataset, EntityDirectory, RegulationRepository, Store};

pub fn data_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data")
}

pub fn zoning(zone: &str, neighborhood: &str, height: Option<f64>, basic: Option<f64>, max: Option<f64>) -> ZoningRow {
    ZoningRow {
        zone: zone.to_string(),
        neighborhood: neighborhood.to_string(),
        max_height: height,
        basic_coefficient: basic,
        max_coefficient: max,
    }
}

pub fn chunk(content: &str, title: &str) -> DocumentChunk {
    DocumentChunk {
        content: content.to_string(),
        metadata: serde_json::json!({ "title": title, "source_path": format!("legal/{}.md", title.to_lowercase()) }),
    }
}

pub fn hazard(neighborhood: &str, description: &str, flood_risk: bool) -> HazardRow {
    HazardRow {
        neighborhood: neighborhood.to_string(),
        description: description.to_string(),
        flood_risk,
    }
}

pub fn dataset() -> Dataset {
    Dataset {
        zoning: vec![
            zoning("ZOT 07", "PETRÓPOLIS", Some(60.0), Some(1.3), Some(2.0)),
            zoning("ZOT 08.3-C", "PETRÓPOLIS", Some(90.0), Some(1.3), Some(3.0)),
            zoning("ZOT 04", "TRÊS FIGUEIRAS", Some(18.0), Some(1.0), None),
            zoning("ZOT 08.1-E", "CENTRO HISTÓRICO", Some(130.0), Some(1.9), Some(4.0)),
            zoning("ZOT 02", "ARQUIPÉLAGO", Some(9.0), None, None),
        ],
        chunks: vec![
            chunk(
                "Art. 1º Esta Lei estabelece as normas de uso e ocupação do solo no Município de Porto Alegre.",
                "LUOS",
            ),
            chunk(
                "Art. 2º São objetivos desta Lei: I - promover a ocupação equilibrada do território.",
                "LUOS",
            ),
            chunk(
                "Art. 81. Os empreendimentos com certificação em sustentabilidade ambiental recebem acréscimo no coeficiente.",
                "LUOS",
            ),
        ],
        sections: vec![chunk(
            "O Plano Diretor organiza o território em Zonas de Ordenamento Territorial.",
            "Caderno",
        )],
        hazards: vec![
            hazard("MENINO DEUS", "Protegidos pelo sistema atual de diques.", true),
            hazard("CENTRO HISTÓRICO", "Protegidos pelo sistema atual de diques.", true),
            hazard("ARQUIPÉLAGO", "Em área de estudo para proteção.", true),
            hazard("LAMI", "Em área de estudo para proteção contra cheias.", true),
            hazard("PETRÓPOLIS", "Risco de deslizamento.", false),
        ],
    }
}

pub async fn memory_agent() -> RegulationAgent<Store> {
    agent_over(Store::memory(dataset())).await
}

pub async fn sqlite_agent() -> Result<RegulationAgent<Store>> {
    let store = Store::sqlite("sqlite::memory:").await?;
    if let Store::Sqlite(sqlite) = &store {
        sqlite.insert_dataset(&dataset()).await?;
    }
    RegulationAgent::bootstrap(Arc::new(store), AppMetrics::shared(), AgentConfig::default()).await
}

pub async fn agent_over<S>(store: S) -> RegulationAgent<S>
where
    S: RegulationRepository + EntityDirectory,
{
    RegulationAgent::bootstrap(Arc::new(store), AppMetrics::shared(), AgentConfig::default())
        .await
        .unwrap_or_else(|error| panic!("fixture agent failed to bootstrap: {error:#}"))
}

/// Repository answering each call from a script, recording every request it sees.
/// `Some(n)` yields `n` rows, `None` fails the call; calls past the script are empty.
pub struct ScriptedRepository {
    script: Vec<Option<usize>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<SourceRequest>>,
    entities: Vec<String>,
}

impl ScriptedRepository {
    pub fn new(script: Vec<Option<usize>>) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            entities: Vec::new(),
        }
    }

    pub fn with_entities<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities = entities.into_iter().map(Into::into).collect();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<SourceRequest> {
        self.seen.lock().clone()
    }
}

impl RegulationRepository for ScriptedRepository {
    async fn fetch(&self, request: &SourceRequest) -> Result<Vec<Row>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(request.clone());

        match self.script.get(call) {
            Some(Some(count)) => Ok((0..*count)
                .map(|idx| Row::Chunk(chunk(&format!("Art. {}º trecho roteirizado", idx + 1), "ROTEIRO")))
                .collect()),
            Some(None) => Err(anyhow!("scripted failure on call {call}")),
            None => Ok(Vec::new()),
        }
    }
}

impl EntityDirectory for ScriptedRepository {
    async fn list_entities(&self) -> Result<Vec<String>> {
        Ok(self.entities.clone())
    }
}
