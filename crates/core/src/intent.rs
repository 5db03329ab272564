use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::entities::{detect_by_words, extract_from_phrase, resolve_contained, EntityList};
use crate::models::{Classification, HazardCriterion, IntentTag};
use crate::normalize::{normalize, normalize_zone_name};

const MAX_KEYWORDS: usize = 5;

static ARTICLE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:art|artigo)\s*\.?\s*(\d+)").expect("valid article regex"));

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)\s*(?:º|o)?\s+(?:da|do|de)\s+(?:luos|pdus|lei|coe)\b")
        .expect("valid leading number regex")
});

const QUESTION_WORDS: &[&str] = &[
    "qual", "quais", "quanto", "quantos", "quantas", "como", "onde", "quando", "sobre", "para",
    "pela", "pelo", "esta", "estao", "sera", "porque", "existe", "existem", "voce",
];

pub struct ArticleTopic {
    pub key: &'static str,
    pub cues: &'static [&'static str],
    pub patterns: &'static [&'static str],
    pub article: Option<&'static str>,
}

pub const ARTICLE_TOPICS: &[ArticleTopic] = &[
    ArticleTopic {
        key: "certificacao-sustentabilidade",
        cues: &["certificacao", "sustentabilidade"],
        patterns: &["%certificacao%sustentabilidade%", "%art. 81%"],
        article: Some("81"),
    },
    ArticleTopic {
        key: "regime-volumetrico",
        cues: &["volumetrico"],
        patterns: &["%regime volumetrico%", "%art. 75%"],
        article: Some("75"),
    },
];

pub fn article_topic(key: &str) -> Option<&'static ArticleTopic> {
    ARTICLE_TOPICS.iter().find(|topic| topic.key == key)
}

struct RuleContext<'a> {
    text: &'a str,
    entity: Option<&'a str>,
    entities: &'a EntityList,
}

struct Rule {
    tag: IntentTag,
    applies: fn(&RuleContext<'_>) -> bool,
    extract: fn(&RuleContext<'_>, &mut Classification),
}

const RULES: &[Rule] = &[
    Rule {
        tag: IntentTag::GeneralSummary,
        applies: asks_for_summary,
        extract: no_extra,
    },
    Rule {
        tag: IntentTag::GeneralMaxHeight,
        applies: asks_city_wide_height,
        extract: no_extra,
    },
    Rule {
        tag: IntentTag::FloodRisk,
        applies: asks_about_flooding,
        extract: extract_hazard,
    },
    Rule {
        tag: IntentTag::Listing,
        applies: asks_for_listing,
        extract: extract_entity,
    },
    Rule {
        tag: IntentTag::Article,
        applies: asks_for_article,
        extract: extract_article,
    },
    Rule {
        tag: IntentTag::Neighborhood,
        applies: asks_about_neighborhood,
        extract: extract_neighborhood,
    },
    Rule {
        tag: IntentTag::Conceptual,
        applies: asks_conceptual,
        extract: no_extra,
    },
];

fn asks_for_summary(ctx: &RuleContext<'_>) -> bool {
    contains_any(ctx.text, &["resumo", "resuma"]) && contains_any(ctx.text, &["lei", "plano diretor"])
}

fn asks_city_wide_height(ctx: &RuleContext<'_>) -> bool {
    ctx.text.contains("altura maxima")
        && contains_any(ctx.text, &["porto alegre", "predios", "construcao"])
        && ctx.entity.is_none()
}

fn asks_about_flooding(ctx: &RuleContext<'_>) -> bool {
    contains_any(ctx.text, &["enchente", "inundacao", "area de risco", "area de estudo"])
        || (ctx.text.contains("quantos bairros")
            && contains_any(ctx.text, &["protegidos", "sistema atual", "estudo"]))
}

fn asks_for_listing(ctx: &RuleContext<'_>) -> bool {
    contains_any(ctx.text, &["quais sao", "quantos", "quantas", "liste", "listar"])
        || contains_any(ctx.text, &["todos os bairros", "todas as zonas", "lista de"])
}

fn asks_for_article(ctx: &RuleContext<'_>) -> bool {
    extract_article_number(ctx.text).is_some() || matching_topic(ctx.text).is_some()
}

fn asks_about_neighborhood(ctx: &RuleContext<'_>) -> bool {
    ctx.entity.is_some()
        || (contains_any(ctx.text, &["altura", "coeficiente", "zot"])
            && (detect_by_words(ctx.text, ctx.entities).is_some()
                || normalize_zone_name(ctx.text).is_some()))
}

fn asks_conceptual(ctx: &RuleContext<'_>) -> bool {
    contains_any(ctx.text, &["objetivo", "principio", "definicao", "regido por"])
}

fn extract_hazard(ctx: &RuleContext<'_>, classification: &mut Classification) {
    classification.hazard_criterion = Some(hazard_criterion(ctx.text));
}

fn extract_entity(ctx: &RuleContext<'_>, classification: &mut Classification) {
    classification.entity_name = ctx.entity.map(str::to_string);
}

fn extract_article(ctx: &RuleContext<'_>, classification: &mut Classification) {
    let topic = matching_topic(ctx.text);
    classification.article_number = extract_article_number(ctx.text)
        .or_else(|| topic.and_then(|topic| topic.article.map(str::to_string)));
    classification.article_topic = topic.map(|topic| topic.key.to_string());
}

fn extract_neighborhood(ctx: &RuleContext<'_>, classification: &mut Classification) {
    classification.entity_name = ctx
        .entity
        .or_else(|| detect_by_words(ctx.text, ctx.entities))
        .map(str::to_string);
}

pub fn classify(text: &str, entities: &EntityList) -> Classification {
    let normalized = normalize(text);
    let entity = extract_from_phrase(&normalized, entities)
        .or_else(|| resolve_contained(&normalized, entities));

    let ctx = RuleContext {
        text: &normalized,
        entity,
        entities,
    };

    let mut classification = RULES
        .iter()
        .find(|rule| (rule.applies)(&ctx))
        .map(|rule| {
            let mut classification = Classification::new(rule.tag);
            (rule.extract)(&ctx, &mut classification);
            classification
        })
        .unwrap_or_else(|| Classification::new(IntentTag::Fallback));

    classification.keywords = extract_keywords(&normalized);
    classification.zone_code = normalize_zone_name(&normalized);
    classification.counting = normalized.contains("quantos") || normalized.contains("quantas");
    classification
}

pub fn extract_article_number(text: &str) -> Option<String> {
    let normalized = normalize(text);
    ARTICLE_NUMBER
        .captures(&normalized)
        .or_else(|| LEADING_NUMBER.captures(&normalized))
        .and_then(|captures| captures.get(1))
        .map(|number| number.as_str().trim_start_matches('0'))
        .filter(|number| !number.is_empty())
        .map(str::to_string)
}

pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut keywords = Vec::new();
    for word in normalize(text).unicode_words() {
        if word.chars().count() <= 3 || QUESTION_WORDS.contains(&word) {
            continue;
        }
        if !keywords.iter().any(|existing| existing == word) {
            keywords.push(word.to_string());
        }
        if keywords.len() == MAX_KEYWORDS {
            break;
        }
    }
    keywords
}

fn matching_topic(text: &str) -> Option<&'static ArticleTopic> {
    ARTICLE_TOPICS
        .iter()
        .find(|topic| contains_any(text, topic.cues))
}

fn hazard_criterion(text: &str) -> HazardCriterion {
    if contains_any(text, &["protegido", "sistema atual"]) {
        HazardCriterion::ProtectedBySystem
    } else if text.contains("estudo") {
        HazardCriterion::StudyArea
    } else {
        HazardCriterion::FloodRisk
    }
}

fn no_extra(_: &RuleContext<'_>, _: &mut Classification) {}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| input.contains(needle))
}
