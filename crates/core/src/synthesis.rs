use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{
    Classification, DocumentChunk, EnvelopeMetadata, HazardCriterion, IntentTag, ResponseEnvelope,
    Row, SourceCounts, StrategyResult, ZoningRow,
};

pub const CONFIDENCE_COMMITTED: f32 = 0.9;
pub const CONFIDENCE_COUNTED: f32 = 0.95;
pub const CONFIDENCE_MISS: f32 = 0.1;

const SUMMARY_EXCERPT_CHARS: usize = 150;
const ARTICLE_EXCERPT_CHARS: usize = 300;
const CHUNK_EXCERPT_CHARS: usize = 200;
const MAX_LISTED_CHUNKS: usize = 2;

static ARTICLE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bart(?:igo)?\.?\s*(\d+)").expect("valid article id regex"));
static INCISO_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\binciso\s+([IVXLC]+)\b").expect("valid inciso regex"));

const SUMMARY_PREAMBLE: &str = "O Plano Diretor de Porto Alegre é o conjunto de leis que estabelece as normas de uso e ocupação do solo urbano, orientando o desenvolvimento sustentável e o ordenamento territorial do município.";

pub const DEGRADED_RESPONSE: &str =
    "Desculpe, ocorreu um erro ao processar sua solicitação. Por favor, tente novamente.";

pub fn synthesize(classification: &Classification, result: Option<&StrategyResult>) -> ResponseEnvelope {
    let Some(result) = result.filter(|result| !result.rows.is_empty()) else {
        return envelope(
            no_result_hint(classification),
            CONFIDENCE_MISS,
            SourceCounts::default(),
            classification,
            None,
        );
    };

    let (text, confidence) = match classification.intent {
        IntentTag::GeneralSummary => (render_summary(result), CONFIDENCE_COMMITTED),
        IntentTag::GeneralMaxHeight => (render_max_height(result), CONFIDENCE_COMMITTED),
        IntentTag::Article => (render_article(result), CONFIDENCE_COMMITTED),
        IntentTag::FloodRisk => render_hazards(classification, result),
        IntentTag::Neighborhood => (render_zoning(classification, result), CONFIDENCE_COMMITTED),
        IntentTag::Listing | IntentTag::Conceptual | IntentTag::Fallback => {
            (render_chunks(result), CONFIDENCE_COMMITTED)
        }
    };

    let text = if text.trim().is_empty() {
        render_chunks(result)
    } else {
        text
    };

    envelope(
        text,
        confidence,
        source_counts(result),
        classification,
        Some(result.strategy_label.clone()),
    )
}

pub fn degraded_envelope(message: &str) -> ResponseEnvelope {
    ResponseEnvelope {
        text: DEGRADED_RESPONSE.to_string(),
        confidence: 0.0,
        sources: SourceCounts::default(),
        execution_time_ms: 0,
        metadata: EnvelopeMetadata {
            error: true,
            error_message: Some(message.to_string()),
            ..EnvelopeMetadata::default()
        },
    }
}

pub fn source_counts(result: &StrategyResult) -> SourceCounts {
    if result.source.is_structured() {
        SourceCounts {
            structured: result.rows.len(),
            document: 0,
        }
    } else {
        SourceCounts {
            structured: 0,
            document: result.rows.len(),
        }
    }
}

fn envelope(
    text: String,
    confidence: f32,
    sources: SourceCounts,
    classification: &Classification,
    strategy: Option<String>,
) -> ResponseEnvelope {
    ResponseEnvelope {
        text,
        confidence,
        sources,
        execution_time_ms: 0,
        metadata: EnvelopeMetadata {
            has_valid_results: strategy.is_some(),
            query_classification: Some(classification.intent),
            strategy_used: strategy,
            ..EnvelopeMetadata::default()
        },
    }
}

fn render_summary(result: &StrategyResult) -> String {
    let excerpt = chunks(result)
        .next()
        .map(|chunk| excerpt(&chunk.content, SUMMARY_EXCERPT_CHARS))
        .unwrap_or_default();

    format!("{SUMMARY_PREAMBLE}\n\nTrecho relevante: \"{excerpt}\"")
}

fn render_max_height(result: &StrategyResult) -> String {
    let Some(row) = zoning(result).find(|row| row.max_height.is_some()) else {
        return String::new();
    };

    format!(
        "A altura máxima permitida em Porto Alegre é de **{} metros**, na zona **{}** (bairro {}).",
        number(row.max_height),
        row.zone,
        row.neighborhood
    )
}

fn render_article(result: &StrategyResult) -> String {
    let Some(first) = chunks(result).next() else {
        return String::new();
    };

    let Some(article) = ARTICLE_ID
        .captures(&first.content)
        .and_then(|captures| captures.get(1))
        .map(|number| number.as_str().trim_start_matches('0').to_string())
        .filter(|number| !number.is_empty())
    else {
        return render_chunks(result);
    };

    let mut header = format!("Artigo {article}");
    if let Some(inciso) = INCISO_ID
        .captures(&first.content)
        .and_then(|captures| captures.get(1))
    {
        header.push_str(&format!(", Inciso {}", inciso.as_str().to_uppercase()));
    }

    format!(
        "**{header}**\n\n{}\n\nFonte: {}",
        excerpt(&first.content, ARTICLE_EXCERPT_CHARS),
        chunk_origin(first)
    )
}

fn render_hazards(classification: &Classification, result: &StrategyResult) -> (String, f32) {
    let names = hazards_names(result);
    let criterion = criterion_for(classification, &result.strategy_label);

    if classification.counting {
        (
            format!(
                "**{} bairros** atendem ao critério \"{}\": {}.",
                names.len(),
                criterion.describe(),
                names.join(", ")
            ),
            CONFIDENCE_COUNTED,
        )
    } else {
        let list = names
            .iter()
            .map(|name| format!("- {name}"))
            .collect::<Vec<_>>()
            .join("\n");
        (
            format!("Bairros {}:\n\n{list}", criterion.describe()),
            CONFIDENCE_COMMITTED,
        )
    }
}

fn render_zoning(classification: &Classification, result: &StrategyResult) -> String {
    let rows = zoning(result).collect::<Vec<_>>();
    let subject = classification
        .entity_name
        .clone()
        .or_else(|| rows.first().map(|row| row.neighborhood.clone()))
        .unwrap_or_else(|| "consultado".to_string());

    let mut text = format!("**Dados urbanísticos para o bairro {subject}:**\n\n");
    for row in rows {
        text.push_str(&format!("**{}** ({}):\n", row.zone, row.neighborhood));
        text.push_str(&format!("• Altura Máxima: {} metros\n", number(row.max_height)));
        text.push_str(&format!(
            "• Coeficiente de Aproveitamento Básico: {}\n",
            number(row.basic_coefficient)
        ));
        text.push_str(&format!(
            "• Coeficiente de Aproveitamento Máximo: {}\n\n",
            number(row.max_coefficient)
        ));
    }
    text.trim_end().to_string()
}

fn render_chunks(result: &StrategyResult) -> String {
    let mut text =
        "Com base nos documentos do Plano Diretor, encontrei as seguintes informações relevantes:\n\n"
            .to_string();
    for (idx, chunk) in chunks(result).take(MAX_LISTED_CHUNKS).enumerate() {
        text.push_str(&format!(
            "**{}.** {}\n\n",
            idx + 1,
            excerpt(&chunk.content, CHUNK_EXCERPT_CHARS)
        ));
    }
    text.trim_end().to_string()
}

fn no_result_hint(classification: &Classification) -> String {
    let entity = classification.entity_name.as_deref();
    let detail = match classification.intent {
        IntentTag::Neighborhood => match entity {
            Some(entity) => format!(
                "Não encontrei dados de regime urbanístico para o bairro {entity}. Verifique a grafia do bairro ou informe a zona (por exemplo, ZOT 07)."
            ),
            None => "Não encontrei dados de altura ou coeficiente para essa consulta. Indique o nome do bairro ou a zona desejada.".to_string(),
        },
        IntentTag::Article => match &classification.article_number {
            Some(article) => format!(
                "Não encontrei o Artigo {article} na base de documentos. Informe a lei de referência (LUOS ou PDUS) ou descreva o tema do artigo."
            ),
            None => "Não encontrei o artigo solicitado na base de documentos. Informe o número do artigo e a lei de referência.".to_string(),
        },
        IntentTag::Listing => match entity {
            Some(entity) => format!(
                "Não encontrei nos documentos do Plano Diretor uma lista sobre {entity}. Para altura e coeficientes do bairro, pergunte, por exemplo, qual a altura máxima em {entity}."
            ),
            None => "Não encontrei nos documentos do Plano Diretor uma lista para esse tema.".to_string(),
        },
        IntentTag::FloodRisk => "Não encontrei bairros para esse critério de risco de inundação. Pergunte, por exemplo, quais bairros estão protegidos pelo sistema atual.".to_string(),
        IntentTag::GeneralMaxHeight => "Não encontrei dados de altura para as zonas do município. Indique o nome do bairro ou a zona desejada.".to_string(),
        IntentTag::GeneralSummary | IntentTag::Conceptual => "Não encontrei trechos do Plano Diretor sobre esse tema. Use termos presentes na lei, como objetivos, princípios ou instrumentos.".to_string(),
        IntentTag::Fallback => "Não foi possível encontrar informações específicas para sua consulta.".to_string(),
    };

    format!("{detail} Tente reformular sua pergunta com outras palavras ou consulte diretamente os documentos oficiais do Plano Diretor de Porto Alegre.")
}

fn criterion_for(classification: &Classification, strategy_label: &str) -> HazardCriterion {
    match strategy_label {
        "hazard_protected_phrase" => HazardCriterion::ProtectedBySystem,
        "hazard_study_area" => HazardCriterion::StudyArea,
        "hazard_flood_flag" => HazardCriterion::FloodRisk,
        _ => classification
            .hazard_criterion
            .unwrap_or(HazardCriterion::FloodRisk),
    }
}

fn chunks(result: &StrategyResult) -> impl Iterator<Item = &DocumentChunk> {
    result.rows.iter().filter_map(Row::as_chunk)
}

fn zoning(result: &StrategyResult) -> impl Iterator<Item = &ZoningRow> {
    result.rows.iter().filter_map(Row::as_zoning)
}

fn hazards_names(result: &StrategyResult) -> Vec<String> {
    let mut names = result
        .rows
        .iter()
        .filter_map(Row::as_hazard)
        .map(|row| row.neighborhood.clone())
        .collect::<Vec<_>>();
    names.dedup();
    names
}

fn chunk_origin(chunk: &DocumentChunk) -> String {
    chunk
        .metadata
        .get("title")
        .or_else(|| chunk.metadata.get("source_path"))
        .and_then(|value| value.as_str())
        .unwrap_or("documentos do Plano Diretor")
        .to_string()
}

fn number(value: Option<f64>) -> String {
    value
        .map(|value| value.to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn excerpt(input: &str, max_chars: usize) -> String {
    let compact = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if compact.chars().count() <= max_chars {
        compact
    } else {
        compact.chars().take(max_chars).collect::<String>() + "..."
    }
}
