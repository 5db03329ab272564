use once_cell::sync::Lazy;
use regex::Regex;

const ABBREVIATIONS: &[(&str, &str)] = &[
    ("cel.", "coronel"),
    ("av.", "avenida"),
    ("sta.", "santa"),
    ("sto.", "santo"),
    ("jd.", "jardim"),
    ("vl.", "vila"),
    ("pq.", "parque"),
    ("dr.", "doutor"),
    ("prof.", "professor"),
    ("pres.", "presidente"),
    ("gal.", "general"),
];

static ZONE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:zot|zona)\s*-?\s*0*(\d{1,2})((?:\.\d+)?(?:-[a-z])?)\b").expect("valid zone regex"));

pub fn normalize(input: &str) -> String {
    let folded = fold_diacritics(&input.to_lowercase());

    folded
        .split_whitespace()
        .map(|token| {
            ABBREVIATIONS
                .iter()
                .find(|(abbreviation, _)| *abbreviation == token)
                .map(|(_, expansion)| *expansion)
                .unwrap_or(token)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn fold_diacritics(input: &str) -> String {
    input
        .chars()
        .map(|ch| match ch {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            'ñ' => 'n',
            'Ñ' => 'N',
            other => other,
        })
        .collect()
}

/// Canonical zone code (`zona 7`, `ZOT7`, `zot 07` all become `ZOT 07`).
pub fn normalize_zone_name(input: &str) -> Option<String> {
    let captures = ZONE_CODE.captures(input)?;
    let number = captures.get(1)?.as_str().parse::<u32>().ok()?;
    let suffix = captures
        .get(2)
        .map(|value| value.as_str().to_uppercase())
        .unwrap_or_default();

    Some(format!("ZOT {number:02}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_accents_and_case() {
        assert_eq!(normalize("  Três   FIGUEIRAS "), "tres figueiras");
        assert_eq!(normalize("Inundação"), "inundacao");
    }

    #[test]
    fn expands_abbreviations_after_folding() {
        assert_eq!(
            normalize("Bairro Cel. Aparício Borges"),
            "bairro coronel aparicio borges"
        );
        assert_eq!(normalize("JD. Botânico"), "jardim botanico");
    }

    #[test]
    fn keeps_article_prefix_intact() {
        assert_eq!(normalize("Art. 81 da LUOS"), "art. 81 da luos");
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "Qual a altura máxima em Petrópolis?",
            "cel.  Aparício",
            "ZOT 07 - São João",
            "",
            "Ñandu Çedilha ÂÊÎ",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn canonical_zone_codes() {
        assert_eq!(normalize_zone_name("zona 7").as_deref(), Some("ZOT 07"));
        assert_eq!(normalize_zone_name("ZOT7").as_deref(), Some("ZOT 07"));
        assert_eq!(normalize_zone_name("zot 08.1-e").as_deref(), Some("ZOT 08.1-E"));
        assert_eq!(normalize_zone_name("zoneamento"), None);
    }
}
