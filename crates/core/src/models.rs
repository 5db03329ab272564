use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PipelineError;
use crate::pattern::LikePattern;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: Option<String>,
    pub message: Option<String>,
    pub session_id: Option<String>,
    pub model: Option<String>,
}

impl QueryRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            query: Some(text.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub text: String,
    pub session_id: String,
    pub model: String,
}

impl Query {
    pub fn from_request(
        request: &QueryRequest,
        default_session: impl FnOnce() -> String,
        default_model: &str,
    ) -> Result<Self, PipelineError> {
        let text = request
            .query
            .as_deref()
            .or(request.message.as_deref())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .ok_or(PipelineError::EmptyQuery)?;

        Ok(Self {
            text: text.to_string(),
            session_id: request
                .session_id
                .clone()
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(default_session),
            model: request
                .model
                .clone()
                .filter(|model| !model.trim().is_empty())
                .unwrap_or_else(|| default_model.to_string()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntentTag {
    GeneralSummary,
    GeneralMaxHeight,
    FloodRisk,
    Listing,
    Article,
    Neighborhood,
    Conceptual,
    Fallback,
}

impl IntentTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GeneralSummary => "general-summary",
            Self::GeneralMaxHeight => "general-max-height",
            Self::FloodRisk => "flood-risk",
            Self::Listing => "listing",
            Self::Article => "article",
            Self::Neighborhood => "neighborhood",
            Self::Conceptual => "conceptual",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardCriterion {
    ProtectedBySystem,
    StudyArea,
    FloodRisk,
}

impl HazardCriterion {
    pub fn describe(self) -> &'static str {
        match self {
            Self::ProtectedBySystem => "protegidos pelo sistema atual de proteção contra enchentes",
            Self::StudyArea => "em área de estudo para proteção contra enchentes",
            Self::FloodRisk => "com risco de inundação",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    #[serde(rename = "type")]
    pub intent: IntentTag,
    pub entity_name: Option<String>,
    pub article_number: Option<String>,
    pub article_topic: Option<String>,
    pub zone_code: Option<String>,
    pub hazard_criterion: Option<HazardCriterion>,
    pub counting: bool,
    pub keywords: Vec<String>,
}

impl Classification {
    pub fn new(intent: IntentTag) -> Self {
        Self {
            intent,
            entity_name: None,
            article_number: None,
            article_topic: None,
            zone_code: None,
            hazard_criterion: None,
            counting: false,
            keywords: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Zoning,
    LegalChunks,
    DocumentSections,
    Hazards,
}

impl SourceKind {
    pub fn table(self) -> &'static str {
        match self {
            Self::Zoning => "regime_urbanistico",
            Self::LegalChunks => "document_embeddings",
            Self::DocumentSections => "document_sections",
            Self::Hazards => "bairros_risco_desastre",
        }
    }

    pub fn is_structured(self) -> bool {
        matches!(self, Self::Zoning | Self::Hazards)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    TextLike(Vec<LikePattern>),
    EntityLike(LikePattern),
    ZoneLike(LikePattern),
    FloodRisk(bool),
    HeightPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Natural,
    ByZone,
    ByNeighborhood,
    HeightDesc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRequest {
    pub source: SourceKind,
    pub filter: Filter,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoningRow {
    pub zone: String,
    pub neighborhood: String,
    pub max_height: Option<f64>,
    pub basic_coefficient: Option<f64>,
    pub max_coefficient: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub content: String,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardRow {
    pub neighborhood: String,
    pub description: String,
    pub flood_risk: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Row {
    Zoning(ZoningRow),
    Chunk(DocumentChunk),
    Hazard(HazardRow),
}

impl Row {
    pub fn as_zoning(&self) -> Option<&ZoningRow> {
        match self {
            Self::Zoning(row) => Some(row),
            _ => None,
        }
    }

    pub fn as_chunk(&self) -> Option<&DocumentChunk> {
        match self {
            Self::Chunk(chunk) => Some(chunk),
            _ => None,
        }
    }

    pub fn as_hazard(&self) -> Option<&HazardRow> {
        match self {
            Self::Hazard(row) => Some(row),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyResult {
    pub source_label: String,
    pub source: SourceKind,
    pub purpose: String,
    pub rows: Vec<Row>,
    pub strategy_label: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounts {
    #[serde(rename = "tabular")]
    pub structured: usize,
    #[serde(rename = "conceptual")]
    pub document: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMetadata {
    pub pipeline: String,
    pub timestamp: String,
    pub session_id: String,
    pub model: String,
    pub total_queries: usize,
    pub has_valid_results: bool,
    pub query_classification: Option<IntentTag>,
    pub strategy_used: Option<String>,
    pub is_hardcoded: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    #[serde(rename = "response")]
    pub text: String,
    pub confidence: f32,
    pub sources: SourceCounts,
    #[serde(rename = "executionTime")]
    pub execution_time_ms: u64,
    pub metadata: EnvelopeMetadata,
}
