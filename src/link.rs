//! Foreign-key linking and column classification.

use crate::builder::BuildError;
use crate::config::BuildOptions;
use crate::model::{ColumnId, Model};
use crate::path::{self, Node, PathError};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error(transparent)]
    Path(#[from] PathError),
    /// The reference names an existing entity of the wrong kind. Paths
    /// resolve one level per segment, so this only fires if that changes.
    #[error("reference resolves to {target}, not a column ({kind})")]
    NotAColumn { target: String, kind: &'static str },
    #[error("column {column:?} is not key within primary table {table:?}")]
    NotKeyMember { column: String, table: String },
}

/// A declared foreign key waiting for its target.
#[derive(Debug, Clone)]
pub struct PendingLink {
    pub column: ColumnId,
    pub path: String,
}

/// Resolve every pending foreign key, record back-references and carry
/// key types over to untyped referencing columns. Returns the number of
/// links made.
pub fn link_foreign_keys(
    model: &mut Model,
    pending: &[PendingLink],
    options: BuildOptions,
) -> Result<usize, BuildError> {
    for link in pending {
        let target = resolve_target(model, link).map_err(|source| BuildError::ForeignKey {
            column: model.column_path(link.column),
            path: link.path.clone(),
            source,
        })?;

        let Some(member) = model.key_member_of(target) else {
            let t = model.column(target);
            return Err(BuildError::ForeignKey {
                column: model.column_path(link.column),
                path: link.path.clone(),
                source: LinkError::NotKeyMember {
                    column: t.names.raw_name.clone(),
                    table: model.table(t.table).names.raw_name.clone(),
                },
            });
        };

        let source = &mut model.column_store[link.column];
        source.fk = Some(member);
        if options.mark_fk_columns_pk {
            source.pk = true;
        }
        model.column_store[target].fk_cols.push(link.column);
        debug!(
            column = %model.column_path(link.column),
            target = %model.column_path(target),
            "linked foreign key"
        );
    }

    inherit_types(model, pending);
    Ok(pending.len())
}

fn resolve_target(model: &Model, link: &PendingLink) -> Result<ColumnId, LinkError> {
    let start = model.column(link.column).table;
    match path::resolve(model, &link.path, start)? {
        Node::Column(column) => Ok(column),
        other => Err(LinkError::NotAColumn {
            target: other.describe(model),
            kind: other.kind(),
        }),
    }
}

/// Untyped referencing columns take their target's type. Repeats until
/// nothing changes so chains of foreign keys are filled in.
fn inherit_types(model: &mut Model, pending: &[PendingLink]) {
    loop {
        let mut changed = false;
        for link in pending {
            if model.column(link.column).ty.is_some() {
                continue;
            }
            let inherited = model
                .fk_target(link.column)
                .and_then(|target| model.column(target).ty.clone());
            if let Some(ty) = inherited {
                trace!(column = %model.column_path(link.column), ty = %ty, "inherited type");
                model.column_store[link.column].ty = Some(ty);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

/// Fill each table's data columns: those neither in the key nor linked.
pub fn classify_data_columns(model: &mut Model) {
    let tables: Vec<_> = model.tables().collect();
    for table in tables {
        let data: Vec<ColumnId> = model
            .table(table)
            .columns
            .iter()
            .copied()
            .filter(|&c| model.key_member_of(c).is_none() && model.column(c).fk.is_none())
            .collect();
        model.table_store[table].data_columns = data;
    }
}
