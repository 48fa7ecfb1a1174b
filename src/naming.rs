//! Name variants and the strategies that derive them.
//!
//! Every named entity carries a [`Names`] triple: the raw, human-authored
//! name plus a storage (SQL) and a model (source code) identifier derived
//! from it by per-entity-kind [`Namer`]s.

use convert_case::{Case, Casing};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NamingError {
    #[error("Unknown naming strategy: {0:?}")]
    UnknownStrategy(String),
    #[error("entity has no name")]
    Unnamed,
}

/// Derives identifiers from raw names and recovers raw names from them.
pub trait Namer {
    fn apply(&self, raw: &str) -> String;
    fn parse(&self, derived: &str) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategy {
    /// Leave names untouched
    #[default]
    Identity,
    /// `customer order`
    Lower,
    /// `CUSTOMER ORDER`
    Upper,
    /// `customer_order`
    Snake,
    /// `CUSTOMER_ORDER`
    ScreamingSnake,
    /// `customer-order`
    Kebab,
    /// `customerOrder`
    Camel,
    /// `CustomerOrder`
    Pascal,
    /// `Customer Order`
    Title,
}

impl Namer for NamingStrategy {
    fn apply(&self, raw: &str) -> String {
        match self {
            Self::Identity => raw.to_string(),
            Self::Lower => raw.to_case(Case::Lower),
            Self::Upper => raw.to_case(Case::Upper),
            Self::Snake => raw.to_case(Case::Snake),
            Self::ScreamingSnake => raw.to_case(Case::Snake).to_uppercase(),
            Self::Kebab => raw.to_case(Case::Kebab),
            Self::Camel => raw.to_case(Case::Camel),
            Self::Pascal => raw.to_case(Case::Pascal),
            Self::Title => raw.to_case(Case::Title),
        }
    }

    fn parse(&self, derived: &str) -> String {
        match self {
            Self::Identity => derived.to_string(),
            _ => derived.to_case(Case::Lower),
        }
    }
}

impl FromStr for NamingStrategy {
    type Err = NamingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "" | "identity" | "none" => Ok(Self::Identity),
            "lower" => Ok(Self::Lower),
            "upper" => Ok(Self::Upper),
            "snake" => Ok(Self::Snake),
            "screaming_snake" | "constant" => Ok(Self::ScreamingSnake),
            "kebab" => Ok(Self::Kebab),
            "camel" => Ok(Self::Camel),
            "pascal" => Ok(Self::Pascal),
            "title" => Ok(Self::Title),
            _ => Err(NamingError::UnknownStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for NamingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Identity => "identity",
            Self::Lower => "lower",
            Self::Upper => "upper",
            Self::Snake => "snake",
            Self::ScreamingSnake => "screaming_snake",
            Self::Kebab => "kebab",
            Self::Camel => "camel",
            Self::Pascal => "pascal",
            Self::Title => "title",
        };
        f.write_str(s)
    }
}

/// The storage and model namers of one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Namers {
    #[serde(default)]
    pub sql: NamingStrategy,
    #[serde(default)]
    pub model: NamingStrategy,
}

impl Namers {
    pub const fn new(sql: NamingStrategy, model: NamingStrategy) -> Self {
        Self { sql, model }
    }
}

/// Partial override of a [`Namers`] pair; unset variants fall through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NamersOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<NamingStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<NamingStrategy>,
}

impl NamersOverride {
    pub fn over(self, base: Namers) -> Namers {
        Namers {
            sql: self.sql.unwrap_or(base.sql),
            model: self.model.unwrap_or(base.model),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_none() && self.model.is_none()
    }
}

/// Namers for each kind of entity owned by a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NamerSet {
    pub schema: Namers,
    pub table: Namers,
    pub column: Namers,
    /// Key members (single-column keys and composite key parts)
    pub id: Namers,
    /// Composite keys
    pub key: Namers,
}

/// Per-kind overrides as they appear in declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NamerSetOverride {
    #[serde(default, skip_serializing_if = "NamersOverride::is_empty")]
    pub schema: NamersOverride,
    #[serde(default, skip_serializing_if = "NamersOverride::is_empty")]
    pub table: NamersOverride,
    #[serde(default, skip_serializing_if = "NamersOverride::is_empty")]
    pub column: NamersOverride,
    #[serde(default, skip_serializing_if = "NamersOverride::is_empty")]
    pub id: NamersOverride,
    #[serde(default, skip_serializing_if = "NamersOverride::is_empty")]
    pub key: NamersOverride,
}

impl NamerSetOverride {
    pub fn over(&self, base: NamerSet) -> NamerSet {
        NamerSet {
            schema: self.schema.over(base.schema),
            table: self.table.over(base.table),
            column: self.column.over(base.column),
            id: self.id.over(base.id),
            key: self.key.over(base.key),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.schema.is_empty()
            && self.table.is_empty()
            && self.column.is_empty()
            && self.id.is_empty()
            && self.key.is_empty()
    }
}

/// The raw, storage and model names of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Names {
    #[serde(default, alias = "name")]
    pub raw_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sql_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model_name: String,
}

impl Names {
    pub fn raw(raw_name: impl Into<String>) -> Self {
        Self {
            raw_name: raw_name.into(),
            ..Self::default()
        }
    }

    /// Fill in every empty variant from the others using `namers`.
    ///
    /// A missing raw name is recovered from the storage name, then the model
    /// name. Explicit storage and model names are kept as given.
    pub fn init(mut self, namers: &Namers) -> Result<Self, NamingError> {
        if self.raw_name.is_empty() {
            self.raw_name = if !self.sql_name.is_empty() {
                namers.sql.parse(&self.sql_name)
            } else if !self.model_name.is_empty() {
                namers.model.parse(&self.model_name)
            } else {
                return Err(NamingError::Unnamed);
            };
        }
        if self.sql_name.is_empty() {
            self.sql_name = namers.sql.apply(&self.raw_name);
        }
        if self.model_name.is_empty() {
            self.model_name = namers.model.apply(&self.raw_name);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_by_default() {
        let names = Names::raw("customer id").init(&Namers::default()).unwrap();
        assert_eq!(names.sql_name, "customer id");
        assert_eq!(names.model_name, "customer id");
    }

    #[test]
    fn test_strategies() {
        assert_eq!(NamingStrategy::Snake.apply("Customer Order"), "customer_order");
        assert_eq!(NamingStrategy::ScreamingSnake.apply("customer order"), "CUSTOMER_ORDER");
        assert_eq!(NamingStrategy::Pascal.apply("customer order"), "CustomerOrder");
        assert_eq!(NamingStrategy::Camel.apply("customer order"), "customerOrder");
        assert_eq!(NamingStrategy::Kebab.apply("customer order"), "customer-order");
    }

    #[test]
    fn test_parse_recovers_words() {
        assert_eq!(NamingStrategy::Pascal.parse("CustomerOrder"), "customer order");
        assert_eq!(NamingStrategy::Snake.parse("customer_order"), "customer order");
        assert_eq!(NamingStrategy::Identity.parse("Customer_Order"), "Customer_Order");
    }

    #[test]
    fn test_init_keeps_explicit_names() {
        let names = Names {
            raw_name: "order".into(),
            sql_name: "tblOrder".into(),
            model_name: String::new(),
        }
        .init(&Namers::new(NamingStrategy::Snake, NamingStrategy::Pascal))
        .unwrap();
        assert_eq!(names.sql_name, "tblOrder");
        assert_eq!(names.model_name, "Order");
    }

    #[test]
    fn test_init_recovers_raw_name() {
        let names = Names {
            raw_name: String::new(),
            sql_name: "line_item".into(),
            model_name: String::new(),
        }
        .init(&Namers::new(NamingStrategy::Snake, NamingStrategy::Pascal))
        .unwrap();
        assert_eq!(names.raw_name, "line item");
        assert_eq!(names.model_name, "LineItem");

        assert_eq!(
            Names::default().init(&Namers::default()),
            Err(NamingError::Unnamed)
        );
    }

    #[test]
    fn test_override_falls_through() {
        let base = NamerSet {
            table: Namers::new(NamingStrategy::Snake, NamingStrategy::Pascal),
            ..NamerSet::default()
        };
        let overrides = NamerSetOverride {
            table: NamersOverride {
                sql: Some(NamingStrategy::ScreamingSnake),
                model: None,
            },
            ..NamerSetOverride::default()
        };
        let merged = overrides.over(base);
        assert_eq!(merged.table.sql, NamingStrategy::ScreamingSnake);
        assert_eq!(merged.table.model, NamingStrategy::Pascal);
        assert_eq!(merged.column, Namers::default());
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("Pascal".parse(), Ok(NamingStrategy::Pascal));
        assert_eq!("screaming-snake".parse(), Ok(NamingStrategy::ScreamingSnake));
        assert!("shouty".parse::<NamingStrategy>().is_err());
    }
}
