//! Named first-match-wins classifiers that label matched records.

mod rules;

pub use rules::{LabelRule, Mapping, MappingConfig, MappingRule};
