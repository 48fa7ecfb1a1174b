//! Interchange JSON: the linked model written back as declarations.

use super::{ModelType, RenderError, TargetContext, TargetError};
use crate::config::{ColumnDecl, Config, DatabaseDecl, SchemaDecl, TableDecl};
use crate::model::{ColumnId, Model, TableId};
use crate::naming::{NamerSet, NamerSetOverride, Namers, NamersOverride};
use crate::types::ValueType;

#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl Json {
    pub fn write(&self, model: &Model) -> Result<String, RenderError> {
        Ok(serde_json::to_string_pretty(&declarations(model))?)
    }
}

impl TargetContext for Json {
    fn model_type(&self, ty: &ValueType) -> Result<ModelType, TargetError> {
        Ok(ModelType::new(ty.to_string()))
    }
}

/// Re-emit a linked model as fully named declarations.
///
/// Every name variant is spelled out, foreign keys use absolute paths and
/// inherited types are written explicitly, so building the result again
/// yields the same model.
pub fn declarations(model: &Model) -> Config {
    let databases = model
        .databases
        .iter()
        .map(|&db| {
            let d = model.database(db);
            DatabaseDecl {
                names: d.names.clone(),
                doc: d.doc.clone(),
                namers: explicit(&d.namers),
                schemas: d
                    .schemas
                    .iter()
                    .map(|&s| {
                        let schema = model.schema(s);
                        SchemaDecl {
                            names: schema.names.clone(),
                            doc: schema.doc.clone(),
                            tables: schema.tables.iter().map(|&t| table_decl(model, t)).collect(),
                        }
                    })
                    .collect(),
            }
        })
        .collect();

    Config {
        namespace: model.namespace.clone(),
        databases,
        ..Config::default()
    }
}

fn table_decl(model: &Model, table: TableId) -> TableDecl {
    let t = model.table(table);
    TableDecl {
        names: t.names.clone(),
        doc: t.doc.clone(),
        columns: t.columns.iter().map(|&c| column_decl(model, c)).collect(),
    }
}

fn column_decl(model: &Model, column: ColumnId) -> ColumnDecl {
    let c = model.column(column);
    ColumnDecl {
        names: c.names.clone(),
        doc: c.doc.clone(),
        ty: c.ty.as_ref().map(ValueType::to_string).unwrap_or_default(),
        pk: model.key_member_of(column).is_some(),
        fk: model
            .fk_target(column)
            .map(|target| model.column_path(target))
            .unwrap_or_default(),
    }
}

/// Key and key-member names are derived, so the namers travel along.
fn explicit(namers: &NamerSet) -> NamerSetOverride {
    let pin = |n: Namers| NamersOverride {
        sql: Some(n.sql),
        model: Some(n.model),
    };
    NamerSetOverride {
        schema: pin(namers.schema),
        table: pin(namers.table),
        column: pin(namers.column),
        id: pin(namers.id),
        key: pin(namers.key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::naming::NamingStrategy;
    use crate::target::Target;

    fn shop() -> Config {
        Config::from_json(
            r#"{
                "namespace": "shop",
                "namers": {
                    "table": { "sql": "snake", "model": "pascal" },
                    "column": { "sql": "snake", "model": "pascal" },
                    "id": { "model": "pascal" },
                    "key": { "model": "pascal" }
                },
                "databases": [{ "name": "main", "schemas": [{ "name": "sales", "tables": [
                    { "name": "customer", "doc": "Buyers", "columns": [
                        { "name": "customer id", "type": "bigint", "pk": true },
                        { "name": "name", "type": "varchar(80)?" }
                    ]},
                    { "name": "order line", "columns": [
                        { "name": "order id", "type": "int", "pk": true },
                        { "name": "line", "type": "smallint", "pk": true },
                        { "name": "buyer", "fk": "customer.customer id" }
                    ]}
                ]}]}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_declarations_are_explicit() {
        let model = Builder::new(&Target::Json).build(&shop()).unwrap();
        let config = declarations(&model);

        let db = &config.databases[0];
        assert_eq!(db.namers.table.model, Some(NamingStrategy::Pascal));
        let line = &db.schemas[0].tables[1];
        assert_eq!(line.names.sql_name, "order_line");
        assert_eq!(line.names.model_name, "OrderLine");

        let buyer = &line.columns[2];
        assert_eq!(buyer.ty, "int(64)");
        assert_eq!(buyer.fk, "main.sales.customer.customer id");
        // Foreign keys are not key members, whatever the pk flag says.
        assert!(!buyer.pk);
        assert!(line.columns[0].pk && line.columns[1].pk);
    }

    #[test]
    fn test_rebuild_from_output_is_stable() {
        let model = Builder::new(&Target::Json).build(&shop()).unwrap();
        let first = declarations(&model);

        let json = Json.write(&model).unwrap();
        let again = Builder::new(&Target::Json)
            .build(&Config::from_json(&json).unwrap())
            .unwrap();
        assert_eq!(declarations(&again), first);
    }

    #[test]
    fn test_json_model_type_is_canonical() {
        let ty: ValueType = "Decimal(10, 2)?".parse().unwrap();
        let mapped = Json.model_type(&ty).unwrap();
        assert_eq!(mapped.type_name, "nullable(decimal(10,2))");
        assert_eq!(mapped.namespace, None);
    }
}
