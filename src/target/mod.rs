//! Output targets: type mapping, namespace capabilities and writers.

mod cs;
mod ddl;
mod go;
mod json;

pub use cs::CSharp;
pub use ddl::{Ddl, Dialect};
pub use go::{GoFlavor, GoModels};
pub use json::{Json, declarations};

use crate::model::Model;
use crate::namespace::{NamespaceEnsurer, NamespaceOrganizer};
use crate::types::ValueType;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TargetError {
    #[error("{target} has no representation for {ty}")]
    Unsupported { target: &'static str, ty: String },
    #[error("Unknown target: {0:?} (expected one of: {targets})", targets = Target::names())]
    UnknownTarget(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to map type of column {column}")]
    ModelType {
        column: String,
        #[source]
        source: TargetError,
    },
    #[error("column {0} has no type and {1} requires one")]
    Untyped(String, &'static str),
    #[error("failed to serialize model: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to format output")]
    Fmt(#[from] fmt::Error),
}

/// A value type as spelled in a target, plus the namespace it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelType {
    pub namespace: Option<String>,
    pub type_name: String,
}

impl ModelType {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            type_name: type_name.into(),
        }
    }

    pub fn in_namespace(namespace: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            type_name: type_name.into(),
        }
    }
}

/// What the model builder and writers need to know about an output target.
pub trait TargetContext {
    fn model_type(&self, ty: &ValueType) -> Result<ModelType, TargetError>;

    fn namespace_ensurer(&self) -> Option<&dyn NamespaceEnsurer> {
        None
    }

    fn namespace_organizer(&self) -> Option<&dyn NamespaceOrganizer> {
        None
    }
}

/// Built-in targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Go data structs
    GoModels,
    /// Go structs with database/sql accessors
    GoSql,
    /// C# classes
    CSharp,
    /// SQLite DDL
    Sqlite,
    /// SQL Server DDL
    Mssql,
    /// Interchange JSON
    Json,
}

const GO_MODELS: GoModels = GoModels::new(GoFlavor::Models);
const GO_SQL: GoModels = GoModels::new(GoFlavor::Sql);
const SQLITE: Ddl = Ddl::new(Dialect::Sqlite);
const MSSQL: Ddl = Ddl::new(Dialect::Mssql);

impl Target {
    pub const ALL: [Target; 6] = [
        Self::GoModels,
        Self::GoSql,
        Self::CSharp,
        Self::Sqlite,
        Self::Mssql,
        Self::Json,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::GoModels => "go-models",
            Self::GoSql => "go-sql",
            Self::CSharp => "cs",
            Self::Sqlite => "sqlite",
            Self::Mssql => "mssql",
            Self::Json => "json",
        }
    }

    fn names() -> String {
        Self::ALL
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn context(self) -> &'static dyn TargetContext {
        match self {
            Self::GoModels => &GO_MODELS,
            Self::GoSql => &GO_SQL,
            Self::CSharp => &CSharp,
            Self::Sqlite => &SQLITE,
            Self::Mssql => &MSSQL,
            Self::Json => &Json,
        }
    }

    /// Render a model built against this target.
    pub fn render(self, model: &Model) -> Result<String, RenderError> {
        match self {
            Self::GoModels => GO_MODELS.write(model),
            Self::GoSql => GO_SQL.write(model),
            Self::CSharp => CSharp.write(model),
            Self::Sqlite => SQLITE.write(model),
            Self::Mssql => MSSQL.write(model),
            Self::Json => Json.write(model),
        }
    }
}

impl TargetContext for Target {
    fn model_type(&self, ty: &ValueType) -> Result<ModelType, TargetError> {
        self.context().model_type(ty)
    }

    fn namespace_ensurer(&self) -> Option<&dyn NamespaceEnsurer> {
        self.context().namespace_ensurer()
    }

    fn namespace_organizer(&self) -> Option<&dyn NamespaceOrganizer> {
        self.context().namespace_organizer()
    }
}

impl FromStr for Target {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "go-models" | "gomodels" => Ok(Self::GoModels),
            "go-sql" | "gosql" => Ok(Self::GoSql),
            "cs" | "csharp" | "c#" => Ok(Self::CSharp),
            "json" => Ok(Self::Json),
            _ => Dialect::from_str(s)
                .map(Self::from)
                .ok_or_else(|| TargetError::UnknownTarget(s.to_string())),
        }
    }
}

impl From<Dialect> for Target {
    fn from(dialect: Dialect) -> Self {
        match dialect {
            Dialect::Sqlite => Self::Sqlite,
            Dialect::Mssql => Self::Mssql,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map a column's type, failing with the column's path.
pub(crate) fn column_type(
    context: &dyn TargetContext,
    model: &Model,
    column: crate::model::ColumnId,
) -> Result<Option<ModelType>, RenderError> {
    model
        .column(column)
        .ty
        .as_ref()
        .map(|ty| context.model_type(ty))
        .transpose()
        .map_err(|source| RenderError::ModelType {
            column: model.column_path(column),
            source,
        })
}
