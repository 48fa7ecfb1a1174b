//! Go model generation.

use super::{ModelType, RenderError, TargetContext, TargetError, column_type};
use crate::model::{ColumnId, ColumnRole, Model, TableId};
use crate::namespace::{NamespaceEnsurer, NamespaceOrganizer, StdlibFirst};
use crate::naming::{Namer, NamingStrategy};
use crate::types::{Length, ValueType};
use std::fmt::Write;
use unicode_width::UnicodeWidthStr;

const SQL_PACKAGE: &str = "database/sql";
const CONTEXT_PACKAGE: &str = "context";
const TIME_PACKAGE: &str = "time";
const UNTYPED: &str = "interface{}";
const DEFAULT_PACKAGE: &str = "models";

const KEYWORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range",
    "return", "select", "struct", "switch", "type", "var",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoFlavor {
    /// Plain structs
    Models,
    /// Structs plus `database/sql` scan and lookup functions
    Sql,
}

#[derive(Debug, Clone, Copy)]
pub struct GoModels {
    flavor: GoFlavor,
}

impl GoModels {
    pub const fn new(flavor: GoFlavor) -> Self {
        Self { flavor }
    }

    fn go_type(&self, ty: &ValueType) -> Result<ModelType, TargetError> {
        let unsupported = || TargetError::Unsupported {
            target: "go",
            ty: ty.to_string(),
        };
        match ty {
            ValueType::Nullable(inner) => {
                let base = self.go_type(inner)?;
                let nullable = match base.type_name.as_str() {
                    "bool" => "sql.NullBool",
                    "float64" => "sql.NullFloat64",
                    "int32" | "int16" | "int8" => "sql.NullInt32",
                    "int64" => "sql.NullInt64",
                    "string" => "sql.NullString",
                    "time.Time" => "sql.NullTime",
                    _ => return Ok(base),
                };
                Ok(ModelType::in_namespace(SQL_PACKAGE, nullable))
            }
            ValueType::Boolean => Ok(ModelType::new("bool")),
            ValueType::Integer { bits } => match bits {
                0 => Err(unsupported()),
                1..=8 => Ok(ModelType::new("int8")),
                9..=16 => Ok(ModelType::new("int16")),
                17..=32 => Ok(ModelType::new("int32")),
                33..=64 => Ok(ModelType::new("int64")),
                _ => Err(unsupported()),
            },
            ValueType::Float { mantissa } => match mantissa {
                0 => Err(unsupported()),
                1..=24 => Ok(ModelType::new("float32")),
                25..=53 => Ok(ModelType::new("float64")),
                _ => Err(unsupported()),
            },
            ValueType::String(_) => Ok(ModelType::new("string")),
            ValueType::Time { .. } => Ok(ModelType::in_namespace(TIME_PACKAGE, "time.Time")),
            ValueType::Bytes(Length::Fixed(n)) => Ok(ModelType::new(format!("[{n}]byte"))),
            ValueType::Bytes(_) => Ok(ModelType::new("[]byte")),
            ValueType::Decimal { .. } => Ok(ModelType::new(UNTYPED)),
        }
    }

    fn type_name(&self, model: &Model, column: ColumnId) -> Result<String, RenderError> {
        Ok(column_type(self, model, column)?
            .map(|t| t.type_name)
            .unwrap_or_else(|| UNTYPED.to_string()))
    }

    pub fn write(&self, model: &Model) -> Result<String, RenderError> {
        let mut out = String::new();
        writeln!(out, "// Code generated by schemagen. DO NOT EDIT.")?;
        writeln!(out)?;
        let package = if model.namespace.is_empty() {
            DEFAULT_PACKAGE
        } else {
            model.namespace.as_str()
        };
        writeln!(out, "package {package}")?;
        write_imports(&mut out, &model.namespaces)?;

        for table in model.tables() {
            writeln!(out)?;
            self.write_table(&mut out, model, table)?;
            if self.flavor == GoFlavor::Sql {
                self.write_accessors(&mut out, model, table)?;
            }
        }
        Ok(out)
    }

    fn write_table(&self, out: &mut String, model: &Model, table: TableId) -> Result<(), RenderError> {
        let t = model.table(table);
        let name = &t.names.model_name;

        if let Some(key) = t.key() {
            let key = model.table_key(key);
            let mut fields = Vec::new();
            for &member in &key.members {
                let m = model.key_member(member);
                fields.push((m.names.model_name.clone(), self.type_name(model, m.column)?, None));
            }
            writeln!(out, "// {} is the primary key of {name}.", key.names.model_name)?;
            write_struct(out, &key.names.model_name, &fields)?;
            writeln!(out)?;
        }

        let mut fields = Vec::new();
        let mut key_written = false;
        for &column in &t.columns {
            let c = model.column(column);
            let tag = (self.flavor == GoFlavor::Sql).then(|| c.names.sql_name.clone());
            match model.role(column) {
                ColumnRole::Pk(member) => fields.push((
                    model.key_member(member).names.model_name.clone(),
                    self.type_name(model, column)?,
                    tag,
                )),
                ColumnRole::KeyPart(key, _) => {
                    // Embedded once, where the first key column is declared.
                    if !key_written {
                        let key_name = model.table_key(key).names.model_name.clone();
                        fields.push((key_name, String::new(), None));
                        key_written = true;
                    }
                }
                ColumnRole::ForeignKey(_) | ColumnRole::Data => fields.push((
                    c.names.model_name.clone(),
                    self.type_name(model, column)?,
                    tag,
                )),
            }
        }

        write_doc(out, t.doc.as_deref(), name)?;
        write_struct(out, name, &fields)
    }

    fn write_accessors(&self, out: &mut String, model: &Model, table: TableId) -> Result<(), RenderError> {
        let t = model.table(table);
        let name = &t.names.model_name;
        let qualified = qualified_name(model, table);

        writeln!(out)?;
        writeln!(out, "// TableName is the qualified storage name of {name}.")?;
        writeln!(out, "func ({name}) TableName() string {{ return {qualified:?} }}")?;

        let targets: Vec<String> = t
            .columns
            .iter()
            .map(|&column| format!("&x.{}", field_path(model, column)))
            .collect();
        writeln!(out)?;
        writeln!(
            out,
            "// Scan reads a {name} from a row whose columns are in declaration order."
        )?;
        writeln!(out, "func (x *{name}) Scan(row *sql.Row) error {{")?;
        writeln!(out, "\treturn row.Scan({})", targets.join(", "))?;
        writeln!(out, "}}")?;

        let members = model.key_members(table);
        if members.is_empty() {
            return Ok(());
        }

        let mut params = Vec::new();
        let mut args = Vec::new();
        let mut conditions = Vec::new();
        for member in members {
            let m = model.key_member(member);
            let param = param_name(&m.names.raw_name);
            params.push(format!("{param} {}", self.type_name(model, m.column)?));
            conditions.push(format!("{} = ?", model.column(m.column).names.sql_name));
            args.push(param);
        }
        let columns: Vec<&str> = t
            .columns
            .iter()
            .map(|&c| model.column(c).names.sql_name.as_str())
            .collect();
        let query = format!(
            "SELECT {} FROM {qualified} WHERE {}",
            columns.join(", "),
            conditions.join(" AND ")
        );

        writeln!(out)?;
        writeln!(out, "// Get{name} loads one {name} by primary key.")?;
        writeln!(
            out,
            "func Get{name}(ctx context.Context, db *sql.DB, {}) (*{name}, error) {{",
            params.join(", ")
        )?;
        writeln!(out, "\tx := new({name})")?;
        writeln!(
            out,
            "\trow := db.QueryRowContext(ctx, {query:?}, {})",
            args.join(", ")
        )?;
        writeln!(out, "\tif err := x.Scan(row); err != nil {{")?;
        writeln!(out, "\t\treturn nil, err")?;
        writeln!(out, "\t}}")?;
        writeln!(out, "\treturn x, nil")?;
        writeln!(out, "}}")?;
        Ok(())
    }
}

impl TargetContext for GoModels {
    fn model_type(&self, ty: &ValueType) -> Result<ModelType, TargetError> {
        self.go_type(ty)
    }

    fn namespace_ensurer(&self) -> Option<&dyn NamespaceEnsurer> {
        match self.flavor {
            GoFlavor::Models => None,
            GoFlavor::Sql => Some(self),
        }
    }

    fn namespace_organizer(&self) -> Option<&dyn NamespaceOrganizer> {
        Some(&StdlibFirst)
    }
}

impl NamespaceEnsurer for GoModels {
    fn ensure_namespaces(&self, model: &Model) -> Vec<String> {
        let mut namespaces = vec![SQL_PACKAGE.to_string()];
        if model.tables().any(|t| model.table(t).primary_key.is_some()) {
            namespaces.push(CONTEXT_PACKAGE.to_string());
        }
        namespaces
    }
}

fn write_imports(out: &mut String, namespaces: &[String]) -> Result<(), RenderError> {
    match namespaces {
        [] => {}
        [single] => {
            writeln!(out)?;
            writeln!(out, "import {single:?}")?;
        }
        many => {
            writeln!(out)?;
            writeln!(out, "import (")?;
            for ns in many {
                if ns.is_empty() {
                    writeln!(out)?;
                } else {
                    writeln!(out, "\t{ns:?}")?;
                }
            }
            writeln!(out, ")")?;
        }
    }
    Ok(())
}

fn write_doc(out: &mut String, doc: Option<&str>, name: &str) -> Result<(), RenderError> {
    if let Some(doc) = doc.filter(|d| !d.trim().is_empty()) {
        for (i, line) in doc.lines().enumerate() {
            if i == 0 {
                writeln!(out, "// {name}: {line}")?;
            } else {
                writeln!(out, "// {line}")?;
            }
        }
    }
    Ok(())
}

/// Fields are (name, type, storage tag); an empty type embeds the name.
fn write_struct(
    out: &mut String,
    name: &str,
    fields: &[(String, String, Option<String>)],
) -> Result<(), RenderError> {
    let name_width = fields
        .iter()
        .filter(|(_, ty, _)| !ty.is_empty())
        .map(|(n, _, _)| n.width())
        .max()
        .unwrap_or(0);
    let type_width = fields.iter().map(|(_, ty, _)| ty.width()).max().unwrap_or(0);

    writeln!(out, "type {name} struct {{")?;
    for (field, ty, tag) in fields {
        if ty.is_empty() {
            writeln!(out, "\t{field}")?;
            continue;
        }
        let pad = " ".repeat(name_width - field.width() + 1);
        match tag {
            Some(tag) => {
                let type_pad = " ".repeat(type_width - ty.width() + 1);
                writeln!(out, "\t{field}{pad}{ty}{type_pad}`sql:{tag:?}`")?;
            }
            None => writeln!(out, "\t{field}{pad}{ty}")?,
        }
    }
    writeln!(out, "}}")?;
    Ok(())
}

fn qualified_name(model: &Model, table: TableId) -> String {
    let t = model.table(table);
    let schema = model.schema(t.schema);
    if schema.names.sql_name.is_empty() {
        t.names.sql_name.clone()
    } else {
        format!("{}.{}", schema.names.sql_name, t.names.sql_name)
    }
}

/// Selector of a column's field within its table struct.
fn field_path(model: &Model, column: ColumnId) -> String {
    match model.role(column) {
        ColumnRole::Pk(member) => model.key_member(member).names.model_name.clone(),
        ColumnRole::KeyPart(key, member) => format!(
            "{}.{}",
            model.table_key(key).names.model_name,
            model.key_member(member).names.model_name
        ),
        ColumnRole::ForeignKey(_) | ColumnRole::Data => {
            model.column(column).names.model_name.clone()
        }
    }
}

fn param_name(raw: &str) -> String {
    let name = NamingStrategy::Camel.apply(raw);
    if KEYWORDS.contains(&name.as_str()) {
        format!("{name}_")
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_type;

    fn go(descriptor: &str) -> ModelType {
        GoModels::new(GoFlavor::Models)
            .model_type(&parse_type(descriptor).unwrap())
            .unwrap()
    }

    #[test]
    fn test_go_types() {
        assert_eq!(go("tinyint").type_name, "int8");
        assert_eq!(go("int").type_name, "int32");
        assert_eq!(go("int(33)").type_name, "int64");
        assert_eq!(go("real").type_name, "float32");
        assert_eq!(go("float").type_name, "float64");
        assert_eq!(go("varchar(10)").type_name, "string");
        assert_eq!(go("binary(16)").type_name, "[16]byte");
        assert_eq!(go("decimal(10,2)").type_name, "interface{}");
        assert_eq!(go("datetime"), ModelType::in_namespace("time", "time.Time"));
    }

    #[test]
    fn test_go_nullable_types() {
        assert_eq!(go("int?"), ModelType::in_namespace("database/sql", "sql.NullInt32"));
        assert_eq!(go("bigint?").type_name, "sql.NullInt64");
        assert_eq!(go("nullable(date)").type_name, "sql.NullTime");
        assert_eq!(go("varbinary?"), ModelType::new("[]byte"));
    }

    #[test]
    fn test_param_names_avoid_keywords() {
        assert_eq!(param_name("customer"), "customer");
        assert_eq!(param_name("order line"), "orderLine");
        assert_eq!(param_name("type"), "type_");
    }

    #[test]
    fn test_struct_alignment() {
        let mut out = String::new();
        write_struct(
            &mut out,
            "Customer",
            &[
                ("ID".into(), "int32".into(), None),
                ("Name".into(), "string".into(), None),
            ],
        )
        .unwrap();
        assert_eq!(out, "type Customer struct {\n\tID   int32\n\tName string\n}\n");
    }
}
