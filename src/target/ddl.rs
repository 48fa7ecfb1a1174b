//! SQL DDL generation.

use super::{ModelType, RenderError, TargetContext, TargetError, column_type};
use crate::model::{ColumnId, Model, TableId};
use crate::types::{Length, ValueType};
use std::collections::{HashMap, HashSet};
use std::fmt::Write;
use unicode_width::UnicodeWidthStr;

/// Longest MSSQL nvarchar/varbinary length before switching to `max`.
const MSSQL_MAX_INLINE: u32 = 4000;

/// SQL dialect variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// SQLite 3
    #[default]
    Sqlite,
    /// Microsoft SQL Server
    Mssql,
}

impl Dialect {
    /// Parse dialect from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            "mssql" | "sqlserver" | "tsql" => Some(Self::Mssql),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Mssql => "mssql",
        }
    }

    fn quote(self, ident: &str) -> String {
        match self {
            Self::Sqlite => format!("\"{}\"", ident.replace('"', "\"\"")),
            Self::Mssql => format!("[{}]", ident.replace(']', "]]")),
        }
    }

    /// Map a value type to this dialect's data type, ignoring nullability.
    fn data_type(self, ty: &ValueType) -> Result<String, TargetError> {
        let unsupported = || TargetError::Unsupported {
            target: self.name(),
            ty: ty.to_string(),
        };
        let name = match (self, ty.base()) {
            (Self::Sqlite, ValueType::Boolean | ValueType::Integer { .. }) => "INTEGER".into(),
            (Self::Sqlite, ValueType::Float { .. }) => "REAL".into(),
            (Self::Sqlite, ValueType::String(_) | ValueType::Time { .. }) => "TEXT".into(),
            (Self::Sqlite, ValueType::Bytes(_)) => "BLOB".into(),
            (Self::Sqlite, ValueType::Decimal { .. }) => "NUMERIC".into(),

            (Self::Mssql, ValueType::Boolean) => "BIT".into(),
            (Self::Mssql, ValueType::Integer { bits }) => match bits {
                1..=8 => "TINYINT".into(),
                9..=16 => "SMALLINT".into(),
                17..=32 => "INT".into(),
                33..=64 => "BIGINT".into(),
                _ => return Err(unsupported()),
            },
            (Self::Mssql, ValueType::Float { mantissa }) => match mantissa {
                1..=24 => "REAL".into(),
                25..=53 => "FLOAT".into(),
                _ => return Err(unsupported()),
            },
            (Self::Mssql, ValueType::String(length)) => mssql_sized("NCHAR", "NVARCHAR", *length),
            (Self::Mssql, ValueType::Bytes(length)) => mssql_sized("BINARY", "VARBINARY", *length),
            (Self::Mssql, ValueType::Time { .. }) => match ty.time_digits() {
                Some(digits) => format!("DATETIME2({})", digits.min(7)),
                None => "DATE".into(),
            },
            (Self::Mssql, ValueType::Decimal { precision, scale }) => {
                format!("DECIMAL({precision},{scale})")
            }

            (_, ValueType::Nullable(_)) => return Err(unsupported()),
        };
        Ok(name)
    }
}

fn mssql_sized(fixed: &str, variable: &str, length: Length) -> String {
    match length {
        Length::Fixed(n) => format!("{fixed}({n})"),
        Length::Variable(Some(n)) if n <= MSSQL_MAX_INLINE => format!("{variable}({n})"),
        Length::Variable(_) => format!("{variable}(MAX)"),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Ddl {
    dialect: Dialect,
}

impl Ddl {
    pub const fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn write(&self, model: &Model) -> Result<String, RenderError> {
        let mut out = String::new();
        for (i, table) in creation_order(model).into_iter().enumerate() {
            if i > 0 {
                writeln!(out)?;
            }
            self.write_table(&mut out, model, table)?;
        }
        Ok(out)
    }

    fn qualified(&self, model: &Model, table: TableId) -> String {
        let t = model.table(table);
        let name = self.dialect.quote(&t.names.sql_name);
        match self.dialect {
            Dialect::Sqlite => name,
            Dialect::Mssql => {
                let schema = &model.schema(t.schema).names.sql_name;
                if schema.is_empty() {
                    name
                } else {
                    format!("{}.{name}", self.dialect.quote(schema))
                }
            }
        }
    }

    fn column_definition(&self, model: &Model, column: ColumnId) -> Result<(String, String), RenderError> {
        let c = model.column(column);
        let name = self.dialect.quote(&c.names.sql_name);
        let ty = match column_type(self, model, column)? {
            Some(ty) => {
                let null = if c.ty.as_ref().is_some_and(ValueType::is_nullable) {
                    "NULL"
                } else {
                    "NOT NULL"
                };
                format!("{} {null}", ty.type_name)
            }
            None if self.dialect == Dialect::Sqlite => String::new(),
            None => {
                return Err(RenderError::Untyped(model.column_path(column), self.dialect.name()));
            }
        };
        Ok((name, ty))
    }

    fn write_table(&self, out: &mut String, model: &Model, table: TableId) -> Result<(), RenderError> {
        let t = model.table(table);
        if let Some(doc) = t.doc.as_deref().filter(|d| !d.trim().is_empty()) {
            for line in doc.lines() {
                writeln!(out, "-- {line}")?;
            }
        }

        let mut lines = Vec::new();
        let definitions = t
            .columns
            .iter()
            .map(|&c| self.column_definition(model, c))
            .collect::<Result<Vec<_>, _>>()?;
        let width = definitions.iter().map(|(n, _)| n.width()).max().unwrap_or(0);
        for (name, ty) in definitions {
            if ty.is_empty() {
                lines.push(name);
            } else {
                let pad = " ".repeat(width - name.width() + 1);
                lines.push(format!("{name}{pad}{ty}"));
            }
        }

        let members = model.key_members(table);
        if !members.is_empty() {
            let columns: Vec<String> = members
                .iter()
                .map(|&m| {
                    let column = model.key_member(m).column;
                    self.dialect.quote(&model.column(column).names.sql_name)
                })
                .collect();
            lines.push(format!(
                "CONSTRAINT {} PRIMARY KEY ({})",
                self.dialect.quote(&format!("PK_{}", t.names.sql_name)),
                columns.join(", ")
            ));
        }

        for &column in &t.columns {
            let Some(target) = model.fk_target(column) else {
                continue;
            };
            let c = model.column(column);
            let target_table = model.column(target).table;
            lines.push(format!(
                "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                self.dialect
                    .quote(&format!("FK_{}_{}", t.names.sql_name, c.names.sql_name)),
                self.dialect.quote(&c.names.sql_name),
                self.qualified(model, target_table),
                self.dialect.quote(&model.column(target).names.sql_name),
            ));
        }

        writeln!(out, "CREATE TABLE {} (", self.qualified(model, table))?;
        let last = lines.len().saturating_sub(1);
        for (i, line) in lines.iter().enumerate() {
            let sep = if i == last { "" } else { "," };
            writeln!(out, "    {line}{sep}")?;
        }
        writeln!(out, ");")?;
        Ok(())
    }
}

impl TargetContext for Ddl {
    fn model_type(&self, ty: &ValueType) -> Result<ModelType, TargetError> {
        Ok(ModelType::new(self.dialect.data_type(ty)?))
    }
}

/// Order tables so that referenced tables are created first.
/// Tables in a reference cycle come last, in declaration order.
fn creation_order(model: &Model) -> Vec<TableId> {
    let tables: Vec<TableId> = model.tables().collect();

    // Dependency graph: child -> parents (FK targets)
    let mut parents: HashMap<TableId, HashSet<TableId>> = HashMap::new();
    for &table in &tables {
        let deps = model
            .table(table)
            .columns
            .iter()
            .filter_map(|&c| model.fk_target(c))
            .map(|target| model.column(target).table)
            .filter(|&parent| parent != table)
            .collect();
        parents.insert(table, deps);
    }

    // Level 0 = no dependencies (root tables)
    let mut levels: HashMap<TableId, usize> = HashMap::new();
    let mut changed = true;
    while changed {
        changed = false;
        for &table in &tables {
            if levels.contains_key(&table) {
                continue;
            }
            let deps = &parents[&table];
            let parent_levels: Vec<usize> =
                deps.iter().filter_map(|p| levels.get(p).copied()).collect();
            if parent_levels.len() == deps.len() {
                let level = parent_levels.iter().max().map_or(0, |l| l + 1);
                levels.insert(table, level);
                changed = true;
            }
        }
    }

    let max_level = levels.values().copied().max().unwrap_or(0);
    for &table in &tables {
        levels.entry(table).or_insert(max_level + 1);
    }

    let mut ordered = tables;
    // Stable sort keeps declaration order within a level.
    ordered.sort_by_key(|t| levels[t]);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_type;

    fn mssql(descriptor: &str) -> String {
        Ddl::new(Dialect::Mssql)
            .model_type(&parse_type(descriptor).unwrap())
            .unwrap()
            .type_name
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!(Dialect::from_str("SQLite3"), Some(Dialect::Sqlite));
        assert_eq!(Dialect::from_str("sqlserver"), Some(Dialect::Mssql));
        assert_eq!(Dialect::from_str("oracle"), None);
    }

    #[test]
    fn test_mssql_types() {
        assert_eq!(mssql("bool"), "BIT");
        assert_eq!(mssql("int(12)"), "SMALLINT");
        assert_eq!(mssql("float(20)"), "REAL");
        assert_eq!(mssql("varchar(40)"), "NVARCHAR(40)");
        assert_eq!(mssql("varchar(8000)"), "NVARCHAR(MAX)");
        assert_eq!(mssql("text"), "NVARCHAR(MAX)");
        assert_eq!(mssql("char(2)"), "NCHAR(2)");
        assert_eq!(mssql("date"), "DATE");
        assert_eq!(mssql("datetime(3)"), "DATETIME2(3)");
        assert_eq!(mssql("datetime(9)"), "DATETIME2(7)");
        assert_eq!(mssql("decimal(10,2)?"), "DECIMAL(10,2)");
    }

    #[test]
    fn test_sqlite_types() {
        let ddl = Ddl::new(Dialect::Sqlite);
        let name = |d: &str| ddl.model_type(&parse_type(d).unwrap()).unwrap().type_name;
        assert_eq!(name("bool"), "INTEGER");
        assert_eq!(name("double"), "REAL");
        assert_eq!(name("timestamp"), "TEXT");
        assert_eq!(name("blob?"), "BLOB");
    }

    #[test]
    fn test_quoting() {
        assert_eq!(Dialect::Sqlite.quote("order"), "\"order\"");
        assert_eq!(Dialect::Sqlite.quote("a\"b"), "\"a\"\"b\"");
        assert_eq!(Dialect::Mssql.quote("a]b"), "[a]]b]");
    }
}
