//! Dotted reference resolution.
//!
//! A reference is resolved relative to the table that declares it: each dot
//! climbs one level (table, schema, database, root) before the segments are
//! looked up on the way back down.

use crate::model::{ColumnId, DatabaseId, Model, SchemaId, TableId};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("{path:?} does not seem to be a path ({hops} dots, at most 3 supported)")]
    Shape { path: String, hops: usize },
    #[error("failed to get {segment:?} from {within}")]
    Missing { segment: String, within: String },
}

/// A position in the model hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Root,
    Database(DatabaseId),
    Schema(SchemaId),
    Table(TableId),
    Column(ColumnId),
}

impl Node {
    pub fn kind(self) -> &'static str {
        match self {
            Self::Root => "model",
            Self::Database(_) => "database",
            Self::Schema(_) => "schema",
            Self::Table(_) => "table",
            Self::Column(_) => "column",
        }
    }

    pub fn describe(self, model: &Model) -> String {
        let name = match self {
            Self::Root => return "model root".to_string(),
            Self::Database(id) => &model.database(id).names.raw_name,
            Self::Schema(id) => &model.schema(id).names.raw_name,
            Self::Table(id) => &model.table(id).names.raw_name,
            Self::Column(id) => &model.column(id).names.raw_name,
        };
        format!("{} {:?}", self.kind(), name)
    }

    /// Look up a direct child by raw name.
    pub fn descend(self, model: &Model, name: &str) -> Result<Node, PathError> {
        let found = match self {
            Self::Root => model.databases_by_name.get(name).copied().map(Self::Database),
            Self::Database(id) => model
                .database(id)
                .schemas_by_name
                .get(name)
                .copied()
                .map(Self::Schema),
            Self::Schema(id) => model
                .schema(id)
                .tables_by_name
                .get(name)
                .copied()
                .map(Self::Table),
            Self::Table(id) => model
                .table(id)
                .columns_by_name
                .get(name)
                .copied()
                .map(Self::Column),
            Self::Column(_) => None,
        };
        found.ok_or_else(|| PathError::Missing {
            segment: name.to_string(),
            within: self.describe(model),
        })
    }

    /// One level up; the root is its own parent.
    pub fn ascend(self, model: &Model) -> Node {
        match self {
            Self::Root | Self::Database(_) => Self::Root,
            Self::Schema(id) => Self::Database(model.schema(id).database),
            Self::Table(id) => Self::Schema(model.table(id).schema),
            Self::Column(id) => Self::Table(model.column(id).table),
        }
    }
}

/// Resolve `path` relative to the table `start`.
pub fn resolve(model: &Model, path: &str, start: TableId) -> Result<Node, PathError> {
    let hops = path.matches('.').count();
    if hops > 3 {
        return Err(PathError::Shape {
            path: path.to_string(),
            hops,
        });
    }

    let mut node = Node::Table(start);
    for _ in 0..hops {
        node = node.ascend(model);
    }
    path.split('.')
        .try_fold(node, |node, segment| node.descend(model, segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::config::{ColumnDecl, Config, DatabaseDecl, SchemaDecl, TableDecl};
    use crate::target::Target;

    fn model() -> Model {
        let config = Config {
            databases: vec![
                DatabaseDecl::new(
                    "shop",
                    vec![
                        SchemaDecl::new(
                            "sales",
                            vec![
                                TableDecl::new("order", vec![ColumnDecl::new("id", "int").pk()]),
                                TableDecl::new("customer", vec![ColumnDecl::new("id", "int").pk()]),
                            ],
                        ),
                        SchemaDecl::new(
                            "hr",
                            vec![TableDecl::new("employee", vec![ColumnDecl::new("id", "int").pk()])],
                        ),
                    ],
                ),
                DatabaseDecl::new(
                    "crm",
                    vec![SchemaDecl::new(
                        "dbo",
                        vec![TableDecl::new("lead", vec![ColumnDecl::new("id", "int").pk()])],
                    )],
                ),
            ],
            ..Config::default()
        };
        Builder::new(&Target::Json).build(&config).unwrap()
    }

    fn table(model: &Model, db: &str, schema: &str, table: &str) -> TableId {
        let db = model.databases_by_name[db];
        let schema = model.database(db).schemas_by_name[schema];
        model.schema(schema).tables_by_name[table]
    }

    fn column_name(model: &Model, node: Node) -> String {
        match node {
            Node::Column(id) => model.column_path(id),
            other => panic!("expected a column, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_each_hop_count() {
        let model = model();
        let order = table(&model, "shop", "sales", "order");

        let same_table = resolve(&model, "id", order).unwrap();
        assert_eq!(column_name(&model, same_table), "shop.sales.order.id");

        let same_schema = resolve(&model, "customer.id", order).unwrap();
        assert_eq!(column_name(&model, same_schema), "shop.sales.customer.id");

        let same_db = resolve(&model, "hr.employee.id", order).unwrap();
        assert_eq!(column_name(&model, same_db), "shop.hr.employee.id");

        let other_db = resolve(&model, "crm.dbo.lead.id", order).unwrap();
        assert_eq!(column_name(&model, other_db), "crm.dbo.lead.id");
    }

    #[test]
    fn test_unsupported_hop_count() {
        let model = model();
        let order = table(&model, "shop", "sales", "order");
        assert_eq!(
            resolve(&model, "a.b.c.d.e", order),
            Err(PathError::Shape {
                path: "a.b.c.d.e".into(),
                hops: 4
            })
        );
    }

    #[test]
    fn test_missing_segment_names_parent() {
        let model = model();
        let order = table(&model, "shop", "sales", "order");

        let err = resolve(&model, "invoice.id", order).unwrap_err();
        assert_eq!(
            err,
            PathError::Missing {
                segment: "invoice".into(),
                within: "schema \"sales\"".into(),
            }
        );

        let err = resolve(&model, "customer.email", order).unwrap_err();
        assert!(err.to_string().contains("table \"customer\""));

        let err = resolve(&model, "erp.dbo.x.id", order).unwrap_err();
        assert!(err.to_string().contains("model root"));
    }

    #[test]
    fn test_columns_have_no_children() {
        let model = model();
        let order = table(&model, "shop", "sales", "order");
        let id = resolve(&model, "id", order).unwrap();
        let err = id.descend(&model, "anything").unwrap_err();
        assert!(err.to_string().contains("column \"id\""));
        assert_eq!(id.ascend(&model), Node::Table(order));
    }
}
