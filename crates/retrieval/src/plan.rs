use plano_core::intent::article_topic;
use plano_core::{
    detect_by_words, normalize, Classification, EntityList, Filter, HazardCriterion, IntentTag,
    LikePattern, SortOrder, SourceKind, SourceRequest,
};

const CHUNK_LIMIT: usize = 5;
const SUMMARY_LIMIT: usize = 3;
const ZONING_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub label: String,
    pub purpose: String,
    pub request: SourceRequest,
}

impl Strategy {
    pub fn new(label: impl Into<String>, purpose: impl Into<String>, request: SourceRequest) -> Self {
        Self {
            label: label.into(),
            purpose: purpose.into(),
            request,
        }
    }

    pub fn source(&self) -> SourceKind {
        self.request.source
    }
}

/// Ordered retrieval attempts for a classification, most specific first.
pub fn plan_for(classification: &Classification, entities: &EntityList) -> Vec<Strategy> {
    match classification.intent {
        IntentTag::GeneralSummary => summary_plan(),
        IntentTag::GeneralMaxHeight => max_height_plan(),
        IntentTag::Article => article_plan(classification),
        IntentTag::FloodRisk => hazard_plan(classification),
        IntentTag::Neighborhood => neighborhood_plan(classification, entities),
        IntentTag::Listing | IntentTag::Conceptual | IntentTag::Fallback => {
            keyword_plan(&classification.keywords)
        }
    }
}

fn summary_plan() -> Vec<Strategy> {
    vec![
        Strategy::new(
            "summary_phrasing",
            "Buscar trechos que resumem ou apresentam os objetivos do Plano Diretor",
            text_like(
                SourceKind::LegalChunks,
                &["%resumo%plano diretor%", "%objetivo%plano diretor%", "%esta lei estabelece%"],
                SUMMARY_LIMIT,
            ),
        ),
        Strategy::new(
            "summary_mentions",
            "Buscar qualquer trecho que mencione o Plano Diretor",
            text_like(SourceKind::LegalChunks, &["%plano diretor%"], SUMMARY_LIMIT),
        ),
        Strategy::new(
            "summary_sections",
            "Buscar seções de documentos sobre o Plano Diretor",
            text_like(SourceKind::DocumentSections, &["%plano diretor%"], SUMMARY_LIMIT),
        ),
    ]
}

fn max_height_plan() -> Vec<Strategy> {
    vec![Strategy::new(
        "zoning_max_height",
        "Obter a maior altura máxima entre todas as zonas do município",
        SourceRequest {
            source: SourceKind::Zoning,
            filter: Filter::HeightPresent,
            order: SortOrder::HeightDesc,
            limit: Some(1),
        },
    )]
}

fn article_plan(classification: &Classification) -> Vec<Strategy> {
    let mut plan = Vec::new();

    if let Some(number) = classification.article_number.as_deref() {
        plan.push(Strategy::new(
            "article_literal",
            format!("Buscar o texto literal do Artigo {number}"),
            text_like(
                SourceKind::LegalChunks,
                &[
                    format!("art. {number}º%"),
                    format!("art. {number} %"),
                    format!("art. {number}.%"),
                    format!("artigo {number}º%"),
                    format!("artigo {number} %"),
                ],
                CHUNK_LIMIT,
            ),
        ));
        plan.push(Strategy::new(
            "article_reference",
            format!("Buscar referências ao Artigo {number} dentro dos trechos"),
            text_like(
                SourceKind::LegalChunks,
                &[
                    format!("%art. {number}º%"),
                    format!("%art. {number} %"),
                    format!("%art. {number}.%"),
                    format!("%artigo {number}º%"),
                    format!("%artigo {number} %"),
                ],
                CHUNK_LIMIT,
            ),
        ));
    }

    if let Some(topic) = classification
        .article_topic
        .as_deref()
        .and_then(article_topic)
    {
        plan.push(Strategy::new(
            "article_topic",
            format!("Buscar o artigo sobre o tema {}", topic.key),
            text_like(SourceKind::LegalChunks, topic.patterns, CHUNK_LIMIT),
        ));
    }

    if let Some(number) = classification.article_number.as_deref() {
        plan.push(Strategy::new(
            "article_loose",
            format!("Busca ampla por menções ao artigo {number}"),
            text_like(SourceKind::LegalChunks, &[format!("%art%{number}%")], CHUNK_LIMIT),
        ));
    }

    plan.extend(keyword_cascade(
        SourceKind::DocumentSections,
        &classification.keywords,
        "article_sections",
    ));
    plan
}

fn hazard_plan(classification: &Classification) -> Vec<Strategy> {
    let mut plan = Vec::new();

    match classification.hazard_criterion {
        Some(HazardCriterion::ProtectedBySystem) => plan.push(Strategy::new(
            "hazard_protected_phrase",
            "Listar bairros protegidos pelo sistema atual de proteção contra enchentes",
            SourceRequest {
                source: SourceKind::Hazards,
                filter: Filter::TextLike(vec![LikePattern::contains("protegidos pelo sistema atual")]),
                order: SortOrder::ByNeighborhood,
                limit: None,
            },
        )),
        Some(HazardCriterion::StudyArea) => plan.push(Strategy::new(
            "hazard_study_area",
            "Listar bairros em área de estudo para proteção contra enchentes",
            SourceRequest {
                source: SourceKind::Hazards,
                filter: Filter::TextLike(vec![LikePattern::contains("em area de estudo")]),
                order: SortOrder::ByNeighborhood,
                limit: None,
            },
        )),
        Some(HazardCriterion::FloodRisk) | None => {}
    }

    plan.push(Strategy::new(
        "hazard_flood_flag",
        "Listar bairros marcados com risco de inundação",
        SourceRequest {
            source: SourceKind::Hazards,
            filter: Filter::FloodRisk(true),
            order: SortOrder::ByNeighborhood,
            limit: None,
        },
    ));
    plan
}

fn neighborhood_plan(classification: &Classification, entities: &EntityList) -> Vec<Strategy> {
    let entity = classification.entity_name.clone().or_else(|| {
        let hint = classification.keywords.join(" ");
        let wants_regulation = classification
            .keywords
            .iter()
            .any(|word| word.starts_with("altura") || word.starts_with("coeficiente"));
        wants_regulation
            .then(|| detect_by_words(&hint, entities))
            .flatten()
            .map(str::to_string)
    });

    let mut plan = Vec::new();
    if let Some(entity) = entity {
        plan.push(Strategy::new(
            "zoning_exact_entity",
            format!("Obter altura máxima e coeficientes do bairro {entity} para cada zona"),
            SourceRequest {
                source: SourceKind::Zoning,
                filter: Filter::EntityLike(LikePattern::new(&entity)),
                order: SortOrder::ByZone,
                limit: Some(ZONING_LIMIT),
            },
        ));
        plan.push(Strategy::new(
            "zoning_partial_entity",
            format!("Busca parcial pelo nome do bairro {entity}"),
            SourceRequest {
                source: SourceKind::Zoning,
                filter: Filter::EntityLike(LikePattern::contains(&entity)),
                order: SortOrder::ByZone,
                limit: Some(ZONING_LIMIT),
            },
        ));
    }

    if let Some(zone) = classification.zone_code.as_deref() {
        plan.push(Strategy::new(
            "zoning_zone_code",
            format!("Obter os parâmetros urbanísticos da {zone}"),
            SourceRequest {
                source: SourceKind::Zoning,
                filter: Filter::ZoneLike(LikePattern::new(&format!("{}%", normalize(zone)))),
                order: SortOrder::ByNeighborhood,
                limit: Some(ZONING_LIMIT),
            },
        ));
    }

    plan
}

fn keyword_plan(keywords: &[String]) -> Vec<Strategy> {
    let mut plan = keyword_cascade(SourceKind::LegalChunks, keywords, "keywords");
    plan.extend(keyword_cascade(
        SourceKind::DocumentSections,
        &keywords[..keywords.len().min(1)],
        "sections_keywords",
    ));
    plan
}

/// One strategy per prefix of the keyword list, longest prefix first.
fn keyword_cascade(source: SourceKind, keywords: &[String], label: &str) -> Vec<Strategy> {
    (1..=keywords.len())
        .rev()
        .map(|count| {
            let used = &keywords[..count];
            let pattern = format!("%{}%", used.join("%"));
            Strategy::new(
                format!("{label}_{count}"),
                format!("Buscar em {} por: {}", source.table(), used.join(", ")),
                SourceRequest {
                    source,
                    filter: Filter::TextLike(vec![LikePattern::new(&pattern)]),
                    order: SortOrder::Natural,
                    limit: Some(CHUNK_LIMIT),
                },
            )
        })
        .collect()
}

fn text_like(source: SourceKind, patterns: &[impl AsRef<str>], limit: usize) -> SourceRequest {
    SourceRequest {
        source,
        filter: Filter::TextLike(
            patterns
                .iter()
                .map(|pattern| LikePattern::new(pattern.as_ref()))
                .collect(),
        ),
        order: SortOrder::Natural,
        limit: Some(limit),
    }
}
