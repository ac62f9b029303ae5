use crate::dsl::{Node, ParseOptions, Record, TypePolicy, evaluate_with, parse_filter_with};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One `match`/`value` pair as written in the settings file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MappingRule {
    #[serde(rename = "match")]
    pub match_expr: String,
    pub value: String,
}

/// Settings-file form of a mapping: ordered rules plus an optional fallback.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MappingConfig {
    pub rules: Vec<MappingRule>,
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Debug)]
pub struct LabelRule {
    pub filter: Node,
    pub label: String,
}

/// A named classifier whose filters are parsed once at startup.
#[derive(Debug)]
pub struct Mapping {
    pub name: String,
    pub rules: Vec<LabelRule>,
    pub fallback: Option<String>,
}

impl Mapping {
    pub fn from_config(name: &str, config: &MappingConfig, options: &ParseOptions) -> Result<Self> {
        let rules = config
            .rules
            .iter()
            .enumerate()
            .map(|(index, rule)| {
                let filter = parse_filter_with(&rule.match_expr, options).with_context(|| {
                    format!("Error parsing rule {} in mapping '{}'", index + 1, name)
                })?;
                Ok(LabelRule {
                    filter,
                    label: rule.value.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: name.to_string(),
            rules,
            fallback: config.default.clone(),
        })
    }

    /// Label of the first rule `record` satisfies, else the fallback.
    ///
    /// A rule that cannot be evaluated against the record (a field it lacks,
    /// or a strict type mismatch) is passed over.
    pub fn label<R: Record + ?Sized>(&self, record: &R, policy: TypePolicy) -> Option<&str> {
        let hit = self.rules.iter().enumerate().find(|(index, rule)| {
            evaluate_with(&rule.filter, record, policy).unwrap_or_else(|err| {
                tracing::trace!("mapping '{}' rule {}: {}", self.name, index + 1, err);
                false
            })
        });

        match hit {
            Some((_, rule)) => Some(rule.label.as_str()),
            None => self.fallback.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Object, parse_line};

    fn shelf() -> Mapping {
        let yaml_rules = [
            ("Genre IN (Detective, Thriller)", "crime"),
            ("Year < 1900", "classic"),
            ("Genre == Romance OR Genre == Poetry", "literary"),
        ];
        let config = MappingConfig {
            rules: yaml_rules
                .iter()
                .map(|(filter, value)| MappingRule {
                    match_expr: filter.to_string(),
                    value: value.to_string(),
                })
                .collect(),
            default: None,
        };
        Mapping::from_config("shelf", &config, &ParseOptions::default()).unwrap()
    }

    fn label_of(mapping: &Mapping, line: &str) -> Option<String> {
        let record: Object = parse_line(line);
        mapping
            .label(&record, TypePolicy::Ordered)
            .map(str::to_string)
    }

    #[test]
    fn test_earlier_rules_take_priority() {
        let shelf = shelf();
        assert_eq!(label_of(&shelf, "Genre=Detective, Year=1850").as_deref(), Some("crime"));
        assert_eq!(label_of(&shelf, "Genre=Romance, Year=1850").as_deref(), Some("classic"));
        assert_eq!(label_of(&shelf, "Genre=Romance, Year=1950").as_deref(), Some("literary"));
    }

    #[test]
    fn test_unevaluable_rule_is_passed_over() {
        // No Year: the second rule errors and the third still applies.
        assert_eq!(label_of(&shelf(), "Genre=Poetry").as_deref(), Some("literary"));
    }

    #[test]
    fn test_fallback_applies_when_nothing_matches() {
        let mut shelf = shelf();
        assert_eq!(label_of(&shelf, "Genre=Cooking, Year=2001"), None);

        shelf.fallback = Some("general".into());
        assert_eq!(label_of(&shelf, "Genre=Cooking, Year=2001").as_deref(), Some("general"));
    }

    #[test]
    fn test_bad_rule_is_reported_by_position() {
        let config = MappingConfig {
            rules: vec![
                MappingRule {
                    match_expr: "Genre == Poetry".into(),
                    value: "ok".into(),
                },
                MappingRule {
                    match_expr: "Genre ==".into(),
                    value: "broken".into(),
                },
            ],
            default: None,
        };

        let err = Mapping::from_config("shelf", &config, &ParseOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "Error parsing rule 2 in mapping 'shelf'");
        assert!(format!("{:#}", err).contains("empty value"));
    }
}
