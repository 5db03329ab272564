use std::sync::Arc;

use plano_core::{
    Filter, HazardCriterion, IntentTag, QueryRequest, SortOrder, SourceKind, SourceRequest,
};
use plano_retrieval::{load_data_dir, Strategy, StrategyExecutor};
use plano_storage::{Dataset, MemoryStore, Store};
use plano_tests::{agent_over, data_root, dataset, memory_agent, sqlite_agent, zoning, ScriptedRepository};

const SCENARIOS: &[&str] = &[
    "artigo 1 da luos",
    "qual a altura máxima em Petrópolis",
    "altura máxima em porto alegre",
    "quantos bairros estão protegidos pelo sistema atual",
    "xyz123 nonsense query",
];

#[tokio::test]
async fn article_question_quotes_the_legal_text() {
    let agent = memory_agent().await;

    let classification = agent.classify("artigo 1 da luos");
    assert_eq!(classification.intent, IntentTag::Article);
    assert_eq!(classification.article_number.as_deref(), Some("1"));

    let envelope = agent.answer(QueryRequest::text("artigo 1 da luos")).await;
    assert!(envelope.text.contains("Artigo 1"), "{}", envelope.text);
    assert!(envelope.text.contains("Esta Lei estabelece"));
    assert_eq!(envelope.metadata.strategy_used.as_deref(), Some("article_literal"));
    assert!(envelope.sources.document >= 1);
    assert_eq!(envelope.sources.structured, 0);
}

#[tokio::test]
async fn neighborhood_question_lists_zone_rows() {
    let agent = memory_agent().await;

    let classification = agent.classify("qual a altura máxima em Petrópolis");
    assert_eq!(classification.intent, IntentTag::Neighborhood);
    assert_eq!(classification.entity_name.as_deref(), Some("PETRÓPOLIS"));

    let envelope = agent
        .answer(QueryRequest::text("qual a altura máxima em Petrópolis"))
        .await;
    assert!(envelope.text.contains("ZOT 07"));
    assert!(envelope.text.contains("ZOT 08.3-C"));
    assert!(envelope.text.contains("Altura Máxima: 60 metros"));
    assert!(envelope.text.contains("Coeficiente de Aproveitamento Básico: 1.3"));
    assert!(!envelope.text.contains("CENTRO HISTÓRICO"));
    assert_eq!(envelope.sources.structured, 2);
    assert_eq!(envelope.confidence, 0.9);
}

#[tokio::test]
async fn city_wide_height_reports_a_single_maximum() {
    let agent = memory_agent().await;

    let classification = agent.classify("altura máxima em porto alegre");
    assert_eq!(classification.intent, IntentTag::GeneralMaxHeight);
    assert_eq!(classification.entity_name, None);

    let envelope = agent.answer(QueryRequest::text("altura máxima em porto alegre")).await;
    assert!(envelope.text.contains("**130 metros**"), "{}", envelope.text);
    assert!(envelope.text.contains("ZOT 08.1-E"));
    assert_eq!(envelope.sources.structured, 1);
    assert_eq!(envelope.metadata.total_queries, 1);
}

#[tokio::test]
async fn protected_count_enumerates_neighborhoods() {
    let agent = memory_agent().await;
    let question = "quantos bairros estão protegidos pelo sistema atual";

    let classification = agent.classify(question);
    assert_eq!(classification.intent, IntentTag::FloodRisk);
    assert_eq!(classification.hazard_criterion, Some(HazardCriterion::ProtectedBySystem));
    assert!(classification.counting);

    let envelope = agent.answer(QueryRequest::text(question)).await;
    assert!(envelope.text.contains("**2 bairros**"), "{}", envelope.text);
    assert!(envelope.text.contains("CENTRO HISTÓRICO, MENINO DEUS"));
    assert!(!envelope.text.contains("ARQUIPÉLAGO"));
    assert_eq!(envelope.confidence, 0.95);
    assert_eq!(envelope.metadata.strategy_used.as_deref(), Some("hazard_protected_phrase"));
}

#[tokio::test]
async fn study_area_count_uses_the_study_phrase() {
    let agent = memory_agent().await;
    let question = "quantos bairros estão em área de estudo?";

    let classification = agent.classify(question);
    assert_eq!(classification.intent, IntentTag::FloodRisk);
    assert_eq!(classification.hazard_criterion, Some(HazardCriterion::StudyArea));
    assert!(classification.counting);

    let envelope = agent.answer(QueryRequest::text(question)).await;
    assert!(envelope.text.contains("**2 bairros**"), "{}", envelope.text);
    assert!(envelope.text.contains("em área de estudo para proteção contra enchentes"));
    assert!(envelope.text.contains("ARQUIPÉLAGO, LAMI"));
    assert!(!envelope.text.contains("MENINO DEUS"));
    assert_eq!(envelope.confidence, 0.95);
    assert_eq!(envelope.metadata.strategy_used.as_deref(), Some("hazard_study_area"));
}

#[tokio::test]
async fn flood_risk_listing_uses_the_flag() {
    let agent = memory_agent().await;
    let question = "quais bairros têm risco de inundação?";

    let classification = agent.classify(question);
    assert_eq!(classification.intent, IntentTag::FloodRisk);
    assert_eq!(classification.hazard_criterion, Some(HazardCriterion::FloodRisk));
    assert!(!classification.counting);

    let envelope = agent.answer(QueryRequest::text(question)).await;
    assert!(
        envelope.text.starts_with("Bairros com risco de inundação:"),
        "{}",
        envelope.text
    );
    for name in ["ARQUIPÉLAGO", "CENTRO HISTÓRICO", "LAMI", "MENINO DEUS"] {
        assert!(envelope.text.contains(&format!("- {name}")), "{name}");
    }
    assert!(!envelope.text.contains("PETRÓPOLIS"));
    assert_eq!(envelope.confidence, 0.9);
    assert_eq!(envelope.metadata.total_queries, 1);
    assert_eq!(envelope.metadata.strategy_used.as_deref(), Some("hazard_flood_flag"));
}

#[tokio::test]
async fn listing_miss_hint_matches_the_listing() {
    let agent = memory_agent().await;
    let question = "quais são as alturas de Petrópolis?";

    let classification = agent.classify(question);
    assert_eq!(classification.intent, IntentTag::Listing);
    assert_eq!(classification.entity_name.as_deref(), Some("PETRÓPOLIS"));

    let envelope = agent.answer(QueryRequest::text(question)).await;
    assert_eq!(envelope.confidence, 0.1, "{}", envelope.text);
    assert!(!envelope.text.contains("regime urbanístico"));
    assert!(envelope.text.contains("PETRÓPOLIS"));
    assert!(envelope.text.contains("Tente reformular"));
}

#[tokio::test]
async fn nonsense_query_gets_a_rephrasing_hint() {
    let agent = memory_agent().await;

    let envelope = agent.answer(QueryRequest::text("xyz123 nonsense query")).await;
    assert_eq!(envelope.confidence, 0.1);
    assert!(envelope.text.contains("Tente reformular"));
    assert!(!envelope.metadata.has_valid_results);
    assert_eq!(envelope.metadata.strategy_used, None);
    assert_eq!(envelope.metadata.total_queries, 4);
    assert!(!envelope.metadata.error);
}

#[tokio::test]
async fn executor_stops_at_the_first_strategy_with_rows() {
    let source = Arc::new(ScriptedRepository::new(vec![Some(0), Some(2), Some(5)]));
    let executor = StrategyExecutor::new(source.clone());

    let plan = ["first", "second", "third"]
        .into_iter()
        .map(|label| {
            Strategy::new(
                label,
                "contagem de chamadas",
                SourceRequest {
                    source: SourceKind::LegalChunks,
                    filter: Filter::All,
                    order: SortOrder::Natural,
                    limit: Some(5),
                },
            )
        })
        .collect::<Vec<_>>();

    let execution = executor.execute(&plan).await;

    let committed = execution.committed.expect("second strategy should commit");
    assert_eq!(committed.strategy_label, "second");
    assert_eq!(committed.rows.len(), 2);
    assert_eq!(execution.attempted, 2);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn empty_sources_never_raise() {
    let source = ScriptedRepository::new(Vec::new()).with_entities(["PETRÓPOLIS"]);
    let agent = agent_over(source).await;

    for question in SCENARIOS {
        let envelope = agent.answer(QueryRequest::text(*question)).await;
        assert_eq!(envelope.confidence, 0.1, "{question}");
        assert!(!envelope.text.is_empty());
        assert!(envelope.text.contains("Tente reformular"), "{question}");
        assert!(!envelope.metadata.error);
    }
}

#[tokio::test]
async fn failing_sources_fall_through_to_the_next_strategy() {
    let source = ScriptedRepository::new(vec![None, Some(1)]);
    let agent = agent_over(source).await;

    let envelope = agent.answer(QueryRequest::text("artigo 1 da luos")).await;
    assert_eq!(envelope.metadata.strategy_used.as_deref(), Some("article_reference"));
    assert_eq!(envelope.metadata.total_queries, 2);
    assert_eq!(agent.metrics().snapshot().strategy_failures_total, 1);
}

#[tokio::test]
async fn empty_request_returns_the_degraded_envelope() {
    let agent = memory_agent().await;

    let envelope = agent
        .answer(QueryRequest {
            query: Some("   ".to_string()),
            session_id: Some("session_fixed".to_string()),
            ..QueryRequest::default()
        })
        .await;

    let payload = serde_json::to_value(&envelope).unwrap();
    assert_eq!(payload["confidence"], 0.0);
    assert_eq!(payload["sources"]["tabular"], 0);
    assert_eq!(payload["sources"]["conceptual"], 0);
    assert_eq!(payload["metadata"]["error"], true);
    assert_eq!(payload["metadata"]["sessionId"], "session_fixed");
    assert!(payload["metadata"]["errorMessage"].is_string());
    assert!(payload["response"].as_str().unwrap().starts_with("Desculpe"));
}

#[tokio::test]
async fn envelope_serializes_with_wire_names() {
    let agent = memory_agent().await;
    let envelope = agent
        .answer(QueryRequest {
            message: Some("qual a altura máxima em Petrópolis".to_string()),
            model: Some("modelo-teste".to_string()),
            ..QueryRequest::default()
        })
        .await;

    let payload = serde_json::to_value(&envelope).unwrap();
    assert!(payload["response"].is_string());
    assert!(payload["executionTime"].is_u64());
    assert_eq!(payload["sources"]["tabular"], 2);
    assert_eq!(payload["metadata"]["model"], "modelo-teste");
    assert_eq!(payload["metadata"]["queryClassification"], "neighborhood");
    assert_eq!(payload["metadata"]["strategyUsed"], "zoning_exact_entity");
    assert_eq!(payload["metadata"]["hasValidResults"], true);
    assert_eq!(payload["metadata"]["isHardcoded"], false);
    assert!(payload["metadata"].get("error").is_none());
    assert!(payload["metadata"]["sessionId"]
        .as_str()
        .unwrap()
        .starts_with("session_"));
}

#[tokio::test]
async fn sqlite_store_answers_like_memory_store() {
    let memory = memory_agent().await;
    let sqlite = sqlite_agent().await.expect("sqlite agent should build");

    assert_eq!(memory.entities().names(), sqlite.entities().names());

    for question in SCENARIOS {
        let from_memory = memory.answer(QueryRequest::text(*question)).await;
        let from_sqlite = sqlite.answer(QueryRequest::text(*question)).await;

        assert_eq!(from_memory.text, from_sqlite.text, "{question}");
        assert_eq!(from_memory.confidence, from_sqlite.confidence, "{question}");
        assert_eq!(from_memory.sources, from_sqlite.sources, "{question}");
        assert_eq!(
            from_memory.metadata.strategy_used, from_sqlite.metadata.strategy_used,
            "{question}"
        );
    }
}

#[tokio::test]
async fn refresh_picks_up_new_neighborhoods() {
    let memory = MemoryStore::new(dataset());
    let agent = agent_over(Store::Memory(memory.clone())).await;
    assert_eq!(agent.classify("altura em Belém Novo").entity_name, None);

    let mut updated: Dataset = dataset();
    updated
        .zoning
        .push(zoning("ZOT 03", "BELÉM NOVO", Some(12.5), Some(1.0), Some(1.0)));
    memory.replace(updated);

    assert_eq!(agent.refresh_entities().await.unwrap(), 5);
    assert_eq!(
        agent.classify("altura em Belém Novo").entity_name.as_deref(),
        Some("BELÉM NOVO")
    );

    let envelope = agent.answer(QueryRequest::text("qual a altura em Belém Novo")).await;
    assert!(envelope.text.contains("12.5 metros"), "{}", envelope.text);
}

#[tokio::test]
async fn shipped_data_directory_loads_and_answers() {
    let dataset = load_data_dir(data_root()).expect("data directory should load");
    assert!(!dataset.zoning.is_empty());
    assert!(!dataset.hazards.is_empty());
    assert!(dataset
        .chunks
        .iter()
        .any(|chunk| chunk.content.starts_with("Art. 81.")));

    let agent = agent_over(Store::memory(dataset)).await;
    let envelope = agent.answer(QueryRequest::text("o que diz o artigo 81?")).await;
    assert!(envelope.text.contains("**Artigo 81, Inciso I**"), "{}", envelope.text);
    assert!(envelope.text.contains("Fonte: LUOS"));
}
