//! Raw schema declarations, as produced by input parsers.
//!
//! Declarations are loosely connected: foreign keys are dotted path
//! strings and types are unparsed descriptors. [`crate::builder`] turns
//! them into a linked [`crate::model::Model`].

use crate::naming::{NamerSet, NamerSetOverride, Names, Namers};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    /// Namespace (package, module) of the generated artifact.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default)]
    pub database_namers: Namers,
    /// Defaults for every database that does not override a kind.
    #[serde(default, skip_serializing_if = "NamerSetOverride::is_empty")]
    pub namers: NamerSetOverride,
    #[serde(default)]
    pub databases: Vec<DatabaseDecl>,
}

impl Config {
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn default_namers(&self) -> NamerSet {
        self.namers.over(NamerSet::default())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatabaseDecl {
    #[serde(flatten)]
    pub names: Names,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default, skip_serializing_if = "NamerSetOverride::is_empty")]
    pub namers: NamerSetOverride,
    #[serde(default)]
    pub schemas: Vec<SchemaDecl>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaDecl {
    #[serde(flatten)]
    pub names: Names,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default)]
    pub tables: Vec<TableDecl>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableDecl {
    #[serde(flatten)]
    pub names: Names,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnDecl>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnDecl {
    #[serde(flatten)]
    pub names: Names,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    /// Unparsed type descriptor; see [`crate::types::parse_type`].
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub pk: bool,
    /// Dotted path to the referenced key column.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fk: String,
}

impl ColumnDecl {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            names: Names::raw(name),
            ty: ty.into(),
            ..Self::default()
        }
    }

    pub fn pk(mut self) -> Self {
        self.pk = true;
        self
    }

    pub fn fk(mut self, path: impl Into<String>) -> Self {
        self.fk = path.into();
        self
    }
}

impl TableDecl {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDecl>) -> Self {
        Self {
            names: Names::raw(name),
            doc: None,
            columns,
        }
    }
}

impl SchemaDecl {
    pub fn new(name: impl Into<String>, tables: Vec<TableDecl>) -> Self {
        Self {
            names: Names::raw(name),
            doc: None,
            tables,
        }
    }
}

impl DatabaseDecl {
    pub fn new(name: impl Into<String>, schemas: Vec<SchemaDecl>) -> Self {
        Self {
            names: Names::raw(name),
            schemas,
            ..Self::default()
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Switches that change how declarations are linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Flag every column that gains a foreign key as a primary key column.
    pub mark_fk_columns_pk: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            mark_fk_columns_pk: true,
        }
    }
}
