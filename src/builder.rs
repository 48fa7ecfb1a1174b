//! Turns raw declarations into a linked [`Model`].
//!
//! Building runs in four passes:
//!
//! 1. create databases, schemas, tables, columns and keys, deriving every
//!    name and parsing every declared type;
//! 2. resolve foreign keys ([`crate::link::link_foreign_keys`]);
//! 3. classify the remaining data columns;
//! 4. collect the namespaces the target needs.
//!
//! Any failure aborts the build; no partial model is returned.

use crate::config::{BuildOptions, Config, DatabaseDecl, SchemaDecl, TableDecl};
use crate::link::{self, LinkError, PendingLink};
use crate::model::{
    Column, ColumnId, Database, DatabaseId, KeyMember, KeyMemberId, Model, PrimaryKey, Schema,
    SchemaId, Table, TableId, TableKey,
};
use crate::namespace::NamespaceCollector;
use crate::naming::{NamerSet, Names, Namers, NamingError};
use crate::target::{TargetContext, TargetError};
use crate::types::{TypeParseError, parse_type};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, trace};

/// Suffix dropped from a column's raw name when naming its key member.
const ID_SUFFIX: &str = " id";
/// Suffix appended to a table's raw name to name its composite key.
const KEY_SUFFIX: &str = " key";
const KEY_MODEL_SUFFIX: &str = "Key";

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to name {kind} {path}")]
    Naming {
        kind: &'static str,
        path: String,
        #[source]
        source: NamingError,
    },
    #[error("duplicate {kind} {path}")]
    Duplicate { kind: &'static str, path: String },
    #[error("invalid type for column {column}")]
    InvalidType {
        column: String,
        #[source]
        source: TypeParseError,
    },
    #[error("unsupported type for column {column}")]
    ModelType {
        column: String,
        #[source]
        source: TargetError,
    },
    #[error("failed to link column {column} to {path:?}")]
    ForeignKey {
        column: String,
        path: String,
        #[source]
        source: LinkError,
    },
}

/// Builds models against one target context.
pub struct Builder<'a> {
    context: &'a dyn TargetContext,
    options: BuildOptions,
}

impl<'a> Builder<'a> {
    pub fn new(context: &'a dyn TargetContext) -> Self {
        Self {
            context,
            options: BuildOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(&self, config: &Config) -> Result<Model, BuildError> {
        let mut pass = Pass {
            model: Model {
                namespace: config.namespace.clone(),
                ..Model::default()
            },
            collector: NamespaceCollector::new(self.context),
            pending: Vec::new(),
        };

        let defaults = config.default_namers();
        for (i, decl) in config.databases.iter().enumerate() {
            pass.database(decl, i, &config.database_namers, defaults)?;
        }

        let Pass {
            mut model,
            collector,
            pending,
        } = pass;

        let links = link::link_foreign_keys(&mut model, &pending, self.options)?;
        link::classify_data_columns(&mut model);
        model.namespaces = collector
            .collect(&model)
            .map_err(|(column, source)| BuildError::ModelType { column, source })?;

        info!(
            databases = model.databases.len(),
            tables = model.tables().count(),
            columns = model.column_count(),
            links,
            namespaces = model.namespaces.iter().filter(|ns| !ns.is_empty()).count(),
            "built model"
        );
        Ok(model)
    }
}

/// Working state of the first pass.
struct Pass<'a> {
    model: Model,
    collector: NamespaceCollector<'a>,
    pending: Vec<PendingLink>,
}

impl Pass<'_> {
    fn database(
        &mut self,
        decl: &DatabaseDecl,
        index: usize,
        database_namers: &Namers,
        defaults: NamerSet,
    ) -> Result<(), BuildError> {
        let names = name("database", decl.names.clone(), database_namers, || {
            format!("[{index}]")
        })?;
        let path = names.raw_name.clone();
        if self.model.databases_by_name.contains_key(&path) {
            return Err(BuildError::Duplicate {
                kind: "database",
                path,
            });
        }

        let namers = decl.namers.over(defaults);
        let id = self.model.database_store.alloc(Database {
            names,
            doc: decl.doc.clone(),
            namers,
            schemas: Vec::new(),
            schemas_by_name: HashMap::new(),
        });
        self.model.databases.push(id);
        self.model.databases_by_name.insert(path.clone(), id);
        debug!(database = %path, "building database");

        for (i, schema) in decl.schemas.iter().enumerate() {
            let schema_id = self.schema(schema, i, id, &path, &namers)?;
            let raw = self.model.schema(schema_id).names.raw_name.clone();
            let db = &mut self.model.database_store[id];
            db.schemas.push(schema_id);
            db.schemas_by_name.insert(raw, schema_id);
        }
        Ok(())
    }

    fn schema(
        &mut self,
        decl: &SchemaDecl,
        index: usize,
        database: DatabaseId,
        parent: &str,
        namers: &NamerSet,
    ) -> Result<SchemaId, BuildError> {
        let names = name("schema", decl.names.clone(), &namers.schema, || {
            format!("{parent}.[{index}]")
        })?;
        let path = format!("{parent}.{}", names.raw_name);
        if self
            .model
            .database(database)
            .schemas_by_name
            .contains_key(&names.raw_name)
        {
            return Err(BuildError::Duplicate { kind: "schema", path });
        }

        let id = self.model.schema_store.alloc(Schema {
            names,
            doc: decl.doc.clone(),
            database,
            tables: Vec::new(),
            tables_by_name: HashMap::new(),
        });

        for (i, table) in decl.tables.iter().enumerate() {
            let table_id = self.table(table, i, id, &path, namers)?;
            let raw = self.model.table(table_id).names.raw_name.clone();
            let schema = &mut self.model.schema_store[id];
            if schema.tables_by_name.contains_key(&raw) {
                return Err(BuildError::Duplicate {
                    kind: "table",
                    path: format!("{path}.{raw}"),
                });
            }
            schema.tables.push(table_id);
            schema.tables_by_name.insert(raw, table_id);
        }
        Ok(id)
    }

    fn table(
        &mut self,
        decl: &TableDecl,
        index: usize,
        schema: SchemaId,
        parent: &str,
        namers: &NamerSet,
    ) -> Result<TableId, BuildError> {
        let names = name("table", decl.names.clone(), &namers.table, || {
            format!("{parent}.[{index}]")
        })?;
        let path = format!("{parent}.{}", names.raw_name);
        let id = self.model.table_store.alloc(Table {
            names,
            doc: decl.doc.clone(),
            schema,
            columns: Vec::new(),
            columns_by_name: HashMap::new(),
            primary_key: None,
            data_columns: Vec::new(),
        });
        debug!(table = %path, columns = decl.columns.len(), "building table");

        let mut key_columns = Vec::new();
        for (i, column) in decl.columns.iter().enumerate() {
            let names = name("column", column.names.clone(), &namers.column, || {
                format!("{path}.[{i}]")
            })?;
            let column_path = format!("{path}.{}", names.raw_name);
            if self.model.table(id).columns_by_name.contains_key(&names.raw_name) {
                return Err(BuildError::Duplicate {
                    kind: "column",
                    path: column_path,
                });
            }

            let ty = if column.ty.trim().is_empty() {
                None
            } else {
                let ty = parse_type(&column.ty).map_err(|source| BuildError::InvalidType {
                    column: column_path.clone(),
                    source,
                })?;
                self.collector
                    .record_type(&ty)
                    .map_err(|source| BuildError::ModelType {
                        column: column_path.clone(),
                        source,
                    })?;
                Some(ty)
            };
            trace!(column = %column_path, ty = ?ty, pk = column.pk, "column");

            let raw = names.raw_name.clone();
            let column_id = self.model.column_store.alloc(Column {
                names,
                doc: column.doc.clone(),
                table: id,
                ty,
                pk: column.pk,
                fk: None,
                fk_cols: Vec::new(),
            });
            let table = &mut self.model.table_store[id];
            table.columns.push(column_id);
            table.columns_by_name.insert(raw, column_id);

            if column.pk {
                key_columns.push(column_id);
            }
            if !column.fk.trim().is_empty() {
                self.pending.push(PendingLink {
                    column: column_id,
                    path: column.fk.trim().to_string(),
                });
            }
        }

        let primary_key = self.primary_key(id, &key_columns, namers, &path)?;
        self.model.table_store[id].primary_key = primary_key;
        Ok(id)
    }

    /// One flagged column makes a single key, several make a composite key
    /// in declaration order.
    fn primary_key(
        &mut self,
        table: TableId,
        columns: &[ColumnId],
        namers: &NamerSet,
        path: &str,
    ) -> Result<Option<PrimaryKey>, BuildError> {
        match columns {
            [] => Ok(None),
            [column] => Ok(Some(PrimaryKey::Single(self.key_member(*column, namers, path)?))),
            _ => {
                let members = columns
                    .iter()
                    .map(|&c| self.key_member(c, namers, path))
                    .collect::<Result<Vec<_>, _>>()?;
                let names = key_names(&self.model.table(table).names)
                    .init(&namers.key)
                    .map_err(|source| BuildError::Naming {
                        kind: "key",
                        path: path.to_string(),
                        source,
                    })?;
                let key = self.model.key_store.alloc(TableKey {
                    names,
                    table,
                    members,
                });
                Ok(Some(PrimaryKey::Composite(key)))
            }
        }
    }

    fn key_member(
        &mut self,
        column: ColumnId,
        namers: &NamerSet,
        path: &str,
    ) -> Result<KeyMemberId, BuildError> {
        let c = self.model.column(column);
        let raw = member_name(&c.names.raw_name);
        let names = Names::raw(raw)
            .init(&namers.id)
            .map_err(|source| BuildError::Naming {
                kind: "key member",
                path: format!("{path}.{}", c.names.raw_name),
                source,
            })?;
        let doc = c.doc.clone();
        Ok(self.model.member_store.alloc(KeyMember {
            names,
            doc,
            column,
        }))
    }
}

fn name(
    kind: &'static str,
    names: Names,
    namers: &Namers,
    path: impl FnOnce() -> String,
) -> Result<Names, BuildError> {
    names.init(namers).map_err(|source| BuildError::Naming {
        kind,
        path: path(),
        source,
    })
}

/// A composite key is named after its table: `order line` gives
/// `order line key`, and explicit storage or model names gain `Key`.
fn key_names(table: &Names) -> Names {
    let suffixed = |name: &str| {
        if name.is_empty() {
            String::new()
        } else {
            format!("{name}{KEY_MODEL_SUFFIX}")
        }
    };
    Names {
        raw_name: format!("{}{KEY_SUFFIX}", table.raw_name),
        sql_name: suffixed(&table.sql_name),
        model_name: suffixed(&table.model_name),
    }
}

/// `"customer id"` names its key member `"customer"`.
fn member_name(raw: &str) -> &str {
    match raw.strip_suffix(ID_SUFFIX) {
        Some(stem) if !stem.trim().is_empty() => stem,
        _ => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnDecl, TableDecl};
    use crate::model::ColumnRole;
    use crate::naming::NamingStrategy;
    use crate::target::Target;
    use proptest::prelude::*;

    fn config(tables: Vec<TableDecl>) -> Config {
        Config {
            databases: vec![DatabaseDecl::new("shop", vec![SchemaDecl::new("dbo", tables)])],
            ..Config::default()
        }
    }

    fn build(tables: Vec<TableDecl>) -> Result<Model, BuildError> {
        Builder::new(&Target::Json).build(&config(tables))
    }

    fn table(model: &Model, name: &str) -> TableId {
        let schema = model.database(model.databases[0]).schemas[0];
        model.schema(schema).tables_by_name[name]
    }

    fn column(model: &Model, t: &str, c: &str) -> ColumnId {
        model.table(table(model, t)).columns_by_name[c]
    }

    fn order_and_customer() -> Vec<TableDecl> {
        vec![
            TableDecl::new(
                "order",
                vec![
                    ColumnDecl::new("id", "int").pk(),
                    ColumnDecl::new("customer_id", "").fk("customer.id"),
                ],
            ),
            TableDecl::new(
                "customer",
                vec![
                    ColumnDecl::new("id", "bigint").pk(),
                    ColumnDecl::new("name", "varchar(100)"),
                ],
            ),
        ]
    }

    #[test]
    fn test_order_customer_link() {
        let model = build(order_and_customer()).unwrap();
        let customer_id = column(&model, "order", "customer_id");
        let id = column(&model, "customer", "id");

        let customer = model.table(table(&model, "customer"));
        assert_eq!(model.column(customer_id).fk, customer.pk());
        assert_eq!(model.column(id).fk_cols, vec![customer_id]);
        assert_eq!(model.column(customer_id).ty, model.column(id).ty);
        assert_eq!(model.role(customer_id), ColumnRole::ForeignKey(customer.pk().unwrap()));
        assert_eq!(
            customer.data_columns,
            vec![column(&model, "customer", "name")]
        );
        assert!(model.table(table(&model, "order")).data_columns.is_empty());
    }

    #[test]
    fn test_composite_key_in_declaration_order() {
        let model = build(vec![TableDecl::new(
            "line",
            vec![
                ColumnDecl::new("c", "int").pk(),
                ColumnDecl::new("note", "text"),
                ColumnDecl::new("a", "int").pk(),
                ColumnDecl::new("b", "int").pk(),
            ],
        )])
        .unwrap();
        let t = model.table(table(&model, "line"));
        assert!(t.pk().is_none());
        let key = model.table_key(t.key().unwrap());
        assert_eq!(key.names.raw_name, "line key");

        let members: Vec<&str> = key
            .members
            .iter()
            .map(|&m| model.column(model.key_member(m).column).names.raw_name.as_str())
            .collect();
        assert_eq!(members, ["c", "a", "b"]);
        assert_eq!(t.data_columns, vec![column(&model, "line", "note")]);
    }

    #[test]
    fn test_composite_key_follows_table_names() {
        let mut cfg = config(vec![TableDecl::new(
            "order line",
            vec![ColumnDecl::new("order id", "int").pk(), ColumnDecl::new("line", "int").pk()],
        )]);
        cfg.namers.table.sql = Some(NamingStrategy::Snake);
        cfg.namers.table.model = Some(NamingStrategy::Pascal);
        let model = Builder::new(&Target::GoModels).build(&cfg).unwrap();

        let t = model.table(table(&model, "order line"));
        let key = model.table_key(t.key().unwrap());
        assert_eq!(key.names.raw_name, "order line key");
        assert_eq!(key.names.sql_name, "order_lineKey");
        assert_eq!(key.names.model_name, "OrderLineKey");

        let go = Target::GoModels.render(&model).unwrap();
        assert!(go.contains("type OrderLineKey struct {"));
        assert!(go.contains("\tOrderLineKey\n"));
    }

    #[test]
    fn test_fk_to_data_column_fails() {
        let mut tables = order_and_customer();
        tables[0].columns[1].fk = "customer.name".into();
        let err = build(tables).unwrap_err();

        let BuildError::ForeignKey { column, path, source } = &err else {
            panic!("unexpected error {err:?}");
        };
        assert_eq!(column, "shop.dbo.order.customer_id");
        assert_eq!(path, "customer.name");
        assert_eq!(
            *source,
            LinkError::NotKeyMember {
                column: "name".into(),
                table: "customer".into()
            }
        );
    }

    #[test]
    fn test_member_name_strips_id() {
        assert_eq!(member_name("customer id"), "customer");
        assert_eq!(member_name("customer"), "customer");
        assert_eq!(member_name("id"), "id");
        assert_eq!(member_name(" id"), " id");

        let mut cfg = config(vec![TableDecl::new(
            "customer",
            vec![ColumnDecl::new("customer id", "int").pk()],
        )]);
        cfg.databases[0].namers.id.model = Some(NamingStrategy::Pascal);
        let model = Builder::new(&Target::Json).build(&cfg).unwrap();
        let t = model.table(table(&model, "customer"));
        let member = model.key_member(t.pk().unwrap());
        assert_eq!(member.names.raw_name, "customer");
        assert_eq!(member.names.sql_name, "customer");
        assert_eq!(member.names.model_name, "Customer");
    }

    #[test]
    fn test_namers_cascade() {
        let mut cfg = config(vec![TableDecl::new(
            "order line",
            vec![ColumnDecl::new("unit price", "decimal(9,2)")],
        )]);
        cfg.namers.table.sql = Some(NamingStrategy::Snake);
        cfg.namers.column.sql = Some(NamingStrategy::Snake);
        cfg.databases[0].namers.column.sql = Some(NamingStrategy::ScreamingSnake);
        let model = Builder::new(&Target::Json).build(&cfg).unwrap();

        let t = table(&model, "order line");
        assert_eq!(model.table(t).names.sql_name, "order_line");
        let c = column(&model, "order line", "unit price");
        assert_eq!(model.column(c).names.sql_name, "UNIT_PRICE");
    }

    #[test]
    fn test_duplicates_rejected() {
        let err = build(vec![
            TableDecl::new("t", vec![ColumnDecl::new("a", "int"), ColumnDecl::new("a", "int")]),
        ])
        .unwrap_err();
        assert!(matches!(err, BuildError::Duplicate { kind: "column", .. }));
        assert_eq!(err.to_string(), "duplicate column shop.dbo.t.a");

        let err = build(vec![TableDecl::new("t", vec![]), TableDecl::new("t", vec![])]).unwrap_err();
        assert!(matches!(err, BuildError::Duplicate { kind: "table", .. }));
    }

    #[test]
    fn test_unnamed_column_reports_position() {
        let mut tables = vec![TableDecl::new("t", vec![ColumnDecl::new("a", "int")])];
        tables[0].columns.push(ColumnDecl::default());
        let err = build(tables).unwrap_err();
        assert_eq!(err.to_string(), "failed to name column shop.dbo.t.[1]");
    }

    #[test]
    fn test_invalid_type_names_column() {
        let err = build(vec![TableDecl::new("t", vec![ColumnDecl::new("a", "int(128)")])])
            .unwrap_err();
        let BuildError::InvalidType { column, source } = err else {
            panic!("unexpected error");
        };
        assert_eq!(column, "shop.dbo.t.a");
        assert_eq!(source, TypeParseError::IntWidth(128));
    }

    #[test]
    fn test_go_namespaces_collected() {
        let cfg = config(vec![TableDecl::new(
            "event",
            vec![
                ColumnDecl::new("id", "int").pk(),
                ColumnDecl::new("at", "datetime"),
                ColumnDecl::new("note", "text?"),
            ],
        )]);
        let model = Builder::new(&Target::GoSql).build(&cfg).unwrap();
        assert_eq!(model.namespaces, ["context", "database/sql", "time"]);

        let model = Builder::new(&Target::Json).build(&cfg).unwrap();
        assert!(model.namespaces.is_empty());
    }

    fn arb_tables() -> impl Strategy<Value = Vec<TableDecl>> {
        prop::collection::vec(prop::collection::vec((any::<bool>(), any::<bool>()), 1..5), 1..4)
            .prop_map(|tables| {
                tables
                    .into_iter()
                    .enumerate()
                    .map(|(t, columns)| {
                        let columns = columns
                            .into_iter()
                            .enumerate()
                            .map(|(c, (pk, link))| {
                                let mut decl = ColumnDecl::new(format!("c{c}"), "int");
                                if pk {
                                    decl = decl.pk();
                                }
                                // Every table references the first column of table 0.
                                if link && t > 0 && c > 0 {
                                    decl = decl.fk("t0.c0");
                                }
                                decl
                            })
                            .collect();
                        TableDecl::new(format!("t{t}"), columns)
                    })
                    .collect()
            })
    }

    proptest! {
        #[test]
        fn key_and_data_columns_partition(tables in arb_tables()) {
            let Ok(model) = build(tables) else {
                // t0.c0 may not be a key; linking then fails by design.
                return Ok(());
            };
            for t in model.tables() {
                let table = model.table(t);
                prop_assert!(!(table.pk().is_some() && table.key().is_some()));

                let expected: Vec<ColumnId> = table
                    .columns
                    .iter()
                    .copied()
                    .filter(|&c| model.role(c) == ColumnRole::Data)
                    .collect();
                prop_assert_eq!(&table.data_columns, &expected);

                for &c in &table.columns {
                    let in_key = model.key_member_of(c).is_some();
                    let linked = model.column(c).fk.is_some();
                    let data = table.data_columns.contains(&c);
                    prop_assert!(in_key || linked || data);
                    prop_assert!(!data || !(in_key || linked));
                }
            }
        }
    }
}
