use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;

use crate::normalize::normalize;

pub const DEFAULT_MIN_OVERLAP: usize = 2;

const GENERIC_VOCABULARY: &[&str] = &[
    "plano diretor",
    "lei",
    "luos",
    "pdus",
    "artigo",
    "art.",
    "inciso",
    "altura",
    "zona",
    "zonas",
    "zot",
    "coeficiente",
    "aproveitamento",
    "regime",
    "urbanistico",
    "porto alegre",
    "cidade",
    "municipio",
    "construcao",
    "predio",
    "predios",
    "enchente",
    "enchentes",
    "inundacao",
    "risco",
    "sistema",
    "certificacao",
    "sustentabilidade",
    "resumo",
];

const NOT_A_PLACE: &[&str] = &["porto alegre", "centro", "cidade"];

static PREPOSITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:bairro|no|na|nos|nas|do|da|dos|das|em|de)\s+").expect("valid preposition regex")
});

static LEADING_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)[,\s]+(?:qual|quais|quanto|quantos|quantas|como|onde|o que)\b")
        .expect("valid clause regex")
});

/// Canonical place names with their normalized forms.
#[derive(Debug, Clone, Default)]
pub struct EntityList {
    names: Vec<String>,
    normalized: Vec<String>,
}

impl EntityList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::default();
        for name in names {
            let name = name.into();
            let key = normalize(&name);
            if key.is_empty() || list.normalized.contains(&key) {
                continue;
            }
            list.names.push(name);
            list.normalized.push(key);
        }
        list
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|candidate| candidate == name)
    }

    fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.normalized.iter().map(String::as_str))
    }
}

/// Process-wide, read-mostly entity snapshot replaced wholesale on refresh.
#[derive(Debug, Default)]
pub struct EntityCatalog {
    current: RwLock<Arc<EntityList>>,
}

impl EntityCatalog {
    pub fn new(list: EntityList) -> Self {
        Self {
            current: RwLock::new(Arc::new(list)),
        }
    }

    pub fn snapshot(&self) -> Arc<EntityList> {
        self.current.read().clone()
    }

    pub fn replace(&self, list: EntityList) -> usize {
        let count = list.len();
        *self.current.write() = Arc::new(list);
        count
    }
}

pub fn resolve<'a>(text: &str, entities: &'a EntityList) -> Option<&'a str> {
    resolve_with(text, entities, DEFAULT_MIN_OVERLAP)
}

pub fn resolve_with<'a>(text: &str, entities: &'a EntityList, min_overlap: usize) -> Option<&'a str> {
    let key = normalize(text);
    if key.is_empty() {
        return None;
    }

    resolve_contained(&key, entities)
        .or_else(|| {
            if key.chars().count() < 3 {
                return None;
            }
            entities
                .entries()
                .find(|(_, entity)| entity.contains(key.as_str()))
                .map(|(name, _)| name)
        })
        .or_else(|| resolve_fuzzy(&key, entities, min_overlap))
}

/// Exact match, then the longest entity appearing in the text as a phrase.
pub fn resolve_contained<'a>(text: &str, entities: &'a EntityList) -> Option<&'a str> {
    let key = normalize(text);
    if key.is_empty() {
        return None;
    }

    if let Some((name, _)) = entities.entries().find(|(_, entity)| *entity == key) {
        return Some(name);
    }

    entities
        .entries()
        .filter(|(_, entity)| contains_phrase(&key, entity))
        .max_by_key(|(_, entity)| entity.len())
        .map(|(name, _)| name)
}

fn resolve_fuzzy<'a>(key: &str, entities: &'a EntityList, min_overlap: usize) -> Option<&'a str> {
    let query_words = significant_words(key, 2);
    if query_words.is_empty() {
        return None;
    }
    let threshold = query_words.len().min(min_overlap).max(1);

    let mut best: Option<(&str, usize)> = None;
    for (name, entity) in entities.entries() {
        let entity_words = significant_words(entity, 2);
        let overlap = query_words
            .iter()
            .filter(|word| {
                entity_words
                    .iter()
                    .any(|candidate| partial_word_match(word, candidate))
            })
            .count();

        if overlap > best.map(|(_, score)| score).unwrap_or(0) {
            best = Some((name, overlap));
        }
    }

    best.filter(|(_, score)| *score >= threshold)
        .map(|(name, _)| name)
}

/// Equal words, or one a prefix of the other covering at least two thirds of it.
fn partial_word_match(lhs: &str, rhs: &str) -> bool {
    if lhs == rhs {
        return true;
    }
    let (shorter, longer) = if lhs.len() <= rhs.len() { (lhs, rhs) } else { (rhs, lhs) };
    longer.starts_with(shorter) && shorter.chars().count() * 3 >= longer.chars().count() * 2
}

pub fn extract_from_phrase<'a>(text: &str, entities: &'a EntityList) -> Option<&'a str> {
    let key = normalize(text);

    let mut candidates = PREPOSITION
        .find_iter(&key)
        .map(|found| clause_at(&key[found.end()..]))
        .collect::<Vec<_>>();

    if let Some(leading) = LEADING_CLAUSE.captures(&key).and_then(|captures| captures.get(1)) {
        candidates.push(clause_at(leading.as_str()));
    }

    candidates
        .into_iter()
        .filter(|candidate| !candidate.is_empty() && !is_generic(candidate))
        .find_map(|candidate| resolve(candidate, entities))
}

/// Per-word detection used when no phrase resolves: a query word of five or
/// more letters that equals or prefixes a word of some entity.
pub fn detect_by_words<'a>(text: &str, entities: &'a EntityList) -> Option<&'a str> {
    let key = normalize(text);
    let words = significant_words(&key, 4)
        .into_iter()
        .filter(|word| !is_generic(word))
        .collect::<Vec<_>>();

    words.iter().find_map(|word| {
        entities
            .entries()
            .find(|(_, entity)| {
                significant_words(entity, 2)
                    .iter()
                    .any(|candidate| candidate.starts_with(word.as_str()))
            })
            .map(|(name, _)| name)
    })
}

pub fn is_generic(candidate: &str) -> bool {
    let key = normalize(candidate);
    NOT_A_PLACE.contains(&key.as_str())
        || GENERIC_VOCABULARY
            .iter()
            .any(|term| contains_phrase(&key, term))
}

fn clause_at(rest: &str) -> &str {
    let end = rest
        .find(|ch: char| matches!(ch, '?' | ',' | '.' | '!' | ';' | ':'))
        .unwrap_or(rest.len());
    rest[..end].trim()
}

fn significant_words(text: &str, min_len: usize) -> Vec<String> {
    text.split(|ch: char| !ch.is_alphanumeric() && ch != '\'')
        .filter(|word| word.chars().count() > min_len)
        .map(str::to_string)
        .collect()
}

pub(crate) fn contains_phrase(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }

    haystack.match_indices(needle).any(|(start, matched)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + matched.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
