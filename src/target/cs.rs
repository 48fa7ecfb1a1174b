//! C# model classes.

use super::{ModelType, RenderError, TargetContext, TargetError, column_type};
use crate::model::{ColumnRole, Model, TableId};
use crate::types::ValueType;
use std::fmt::Write;

const SYSTEM: &str = "System";
const DEFAULT_NAMESPACE: &str = "Models";

#[derive(Debug, Clone, Copy, Default)]
pub struct CSharp;

impl CSharp {
    fn cs_type(&self, ty: &ValueType) -> Result<ModelType, TargetError> {
        let unsupported = || TargetError::Unsupported {
            target: "cs",
            ty: ty.to_string(),
        };
        match ty {
            ValueType::Nullable(inner) => {
                let mut base = self.cs_type(inner)?;
                if !is_reference_type(&base.type_name) {
                    base.type_name.push('?');
                }
                Ok(base)
            }
            ValueType::Boolean => Ok(ModelType::new("bool")),
            ValueType::Integer { bits } => match bits {
                0 => Err(unsupported()),
                1..=8 => Ok(ModelType::new("byte")),
                9..=16 => Ok(ModelType::new("short")),
                17..=32 => Ok(ModelType::new("int")),
                33..=64 => Ok(ModelType::new("long")),
                _ => Err(unsupported()),
            },
            ValueType::Float { mantissa } => match mantissa {
                0 => Err(unsupported()),
                1..=24 => Ok(ModelType::new("float")),
                25..=53 => Ok(ModelType::new("double")),
                _ => Err(unsupported()),
            },
            ValueType::String(_) => Ok(ModelType::new("string")),
            ValueType::Time { .. } => Ok(ModelType::in_namespace(SYSTEM, "DateTime")),
            ValueType::Bytes(_) => Ok(ModelType::new("byte[]")),
            ValueType::Decimal { .. } => Ok(ModelType::new("decimal")),
        }
    }

    pub fn write(&self, model: &Model) -> Result<String, RenderError> {
        let mut out = String::new();
        for ns in model.namespaces.iter().filter(|ns| !ns.is_empty()) {
            writeln!(out, "using {ns};")?;
        }
        if !model.namespaces.is_empty() {
            writeln!(out)?;
        }

        let namespace = if model.namespace.is_empty() {
            DEFAULT_NAMESPACE
        } else {
            model.namespace.as_str()
        };
        writeln!(out, "namespace {namespace}")?;
        writeln!(out, "{{")?;
        for (i, table) in model.tables().enumerate() {
            if i > 0 {
                writeln!(out)?;
            }
            self.write_table(&mut out, model, table)?;
        }
        writeln!(out, "}}")?;
        Ok(out)
    }

    fn write_table(&self, out: &mut String, model: &Model, table: TableId) -> Result<(), RenderError> {
        let t = model.table(table);
        let name = &t.names.model_name;

        if let Some(key) = t.key() {
            let key = model.table_key(key);
            writeln!(out, "    public class {}", key.names.model_name)?;
            writeln!(out, "    {{")?;
            for &member in &key.members {
                let m = model.key_member(member);
                let ty = self.type_name(model, m.column)?;
                writeln!(out, "        public {ty} {} {{ get; set; }}", m.names.model_name)?;
            }
            writeln!(out, "    }}")?;
            writeln!(out)?;
        }

        if let Some(doc) = t.doc.as_deref().filter(|d| !d.trim().is_empty()) {
            writeln!(out, "    /// <summary>")?;
            for line in doc.lines() {
                writeln!(out, "    /// {line}")?;
            }
            writeln!(out, "    /// </summary>")?;
        }
        writeln!(out, "    public class {name}")?;
        writeln!(out, "    {{")?;
        let mut key_written = false;
        for &column in &t.columns {
            let (field, ty) = match model.role(column) {
                ColumnRole::Pk(member) => (
                    model.key_member(member).names.model_name.clone(),
                    self.type_name(model, column)?,
                ),
                ColumnRole::KeyPart(key, _) => {
                    if key_written {
                        continue;
                    }
                    key_written = true;
                    let key_name = model.table_key(key).names.model_name.clone();
                    (key_name.clone(), key_name)
                }
                ColumnRole::ForeignKey(_) | ColumnRole::Data => (
                    model.column(column).names.model_name.clone(),
                    self.type_name(model, column)?,
                ),
            };
            writeln!(out, "        public {ty} {field} {{ get; set; }}")?;
        }
        writeln!(out, "    }}")?;
        Ok(())
    }

    fn type_name(&self, model: &Model, column: crate::model::ColumnId) -> Result<String, RenderError> {
        Ok(column_type(self, model, column)?
            .map(|t| t.type_name)
            .unwrap_or_else(|| "object".to_string()))
    }
}

fn is_reference_type(name: &str) -> bool {
    matches!(name, "string" | "byte[]" | "object")
}

impl TargetContext for CSharp {
    fn model_type(&self, ty: &ValueType) -> Result<ModelType, TargetError> {
        self.cs_type(ty)
    }
}
