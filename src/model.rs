//! The linked schema model.
//!
//! Databases own schemas, schemas own tables and tables own columns. Each
//! entity is stored once in an [`Arena`] and refers to its owner and to
//! foreign-key targets through handles. The model is read-only once
//! [`crate::builder::Builder::build`] returns it.

use crate::arena::{Arena, Id};
use crate::naming::{NamerSet, Names};
use crate::types::ValueType;
use std::collections::HashMap;

pub type DatabaseId = Id<Database>;
pub type SchemaId = Id<Schema>;
pub type TableId = Id<Table>;
pub type ColumnId = Id<Column>;
pub type KeyMemberId = Id<KeyMember>;
pub type KeyId = Id<TableKey>;

#[derive(Debug, Clone)]
pub struct Database {
    pub names: Names,
    pub doc: Option<String>,
    pub namers: NamerSet,
    pub schemas: Vec<SchemaId>,
    pub schemas_by_name: HashMap<String, SchemaId>,
}

#[derive(Debug, Clone)]
pub struct Schema {
    pub names: Names,
    pub doc: Option<String>,
    pub database: DatabaseId,
    pub tables: Vec<TableId>,
    pub tables_by_name: HashMap<String, TableId>,
}

/// A table's primary key: one column, or an ordered composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryKey {
    Single(KeyMemberId),
    Composite(KeyId),
}

#[derive(Debug, Clone)]
pub struct Table {
    pub names: Names,
    pub doc: Option<String>,
    pub schema: SchemaId,
    pub columns: Vec<ColumnId>,
    pub columns_by_name: HashMap<String, ColumnId>,
    pub primary_key: Option<PrimaryKey>,
    /// Columns that are neither key members nor foreign keys.
    pub data_columns: Vec<ColumnId>,
}

impl Table {
    /// The single-column key, if the table has one.
    pub fn pk(&self) -> Option<KeyMemberId> {
        match self.primary_key {
            Some(PrimaryKey::Single(id)) => Some(id),
            _ => None,
        }
    }

    /// The composite key, if the table has one.
    pub fn key(&self) -> Option<KeyId> {
        match self.primary_key {
            Some(PrimaryKey::Composite(key)) => Some(key),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub names: Names,
    pub doc: Option<String>,
    pub table: TableId,
    /// `None` until declared or inherited through a foreign key.
    pub ty: Option<ValueType>,
    pub pk: bool,
    /// The key member this column references.
    pub fk: Option<KeyMemberId>,
    /// Columns referencing this one, in linking order.
    pub fk_cols: Vec<ColumnId>,
}

/// A primary-key column, alone or as part of a composite key.
#[derive(Debug, Clone)]
pub struct KeyMember {
    pub names: Names,
    pub doc: Option<String>,
    pub column: ColumnId,
}

/// Composite primary key; member order is declaration order.
#[derive(Debug, Clone)]
pub struct TableKey {
    pub names: Names,
    pub table: TableId,
    pub members: Vec<KeyMemberId>,
}

/// Column classification used by writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    /// The table's single-column key.
    Pk(KeyMemberId),
    /// A member of the table's composite key.
    KeyPart(KeyId, KeyMemberId),
    ForeignKey(KeyMemberId),
    Data,
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    pub namespace: String,
    pub databases: Vec<DatabaseId>,
    pub databases_by_name: HashMap<String, DatabaseId>,
    /// External namespaces required by the rendered artifact, in output order.
    /// Empty entries separate groups.
    pub namespaces: Vec<String>,
    pub(crate) database_store: Arena<Database>,
    pub(crate) schema_store: Arena<Schema>,
    pub(crate) table_store: Arena<Table>,
    pub(crate) column_store: Arena<Column>,
    pub(crate) member_store: Arena<KeyMember>,
    pub(crate) key_store: Arena<TableKey>,
}

impl Model {
    pub fn database(&self, id: DatabaseId) -> &Database {
        &self.database_store[id]
    }

    pub fn schema(&self, id: SchemaId) -> &Schema {
        &self.schema_store[id]
    }

    pub fn table(&self, id: TableId) -> &Table {
        &self.table_store[id]
    }

    pub fn column(&self, id: ColumnId) -> &Column {
        &self.column_store[id]
    }

    pub fn key_member(&self, id: KeyMemberId) -> &KeyMember {
        &self.member_store[id]
    }

    pub fn table_key(&self, id: KeyId) -> &TableKey {
        &self.key_store[id]
    }

    /// Every table in declaration order across all databases and schemas.
    pub fn tables(&self) -> impl Iterator<Item = TableId> + '_ {
        self.databases.iter().flat_map(move |&db| {
            self.database(db)
                .schemas
                .iter()
                .flat_map(move |&s| self.schema(s).tables.iter().copied())
        })
    }

    /// Every column in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = ColumnId> + '_ {
        self.tables()
            .flat_map(move |t| self.table(t).columns.iter().copied())
    }

    pub fn column_count(&self) -> usize {
        self.column_store.len()
    }

    /// The column a foreign key points at.
    pub fn fk_target(&self, column: ColumnId) -> Option<ColumnId> {
        self.column(column).fk.map(|m| self.key_member(m).column)
    }

    /// Key members of a table in key order; empty for keyless tables.
    pub fn key_members(&self, table: TableId) -> Vec<KeyMemberId> {
        match self.table(table).primary_key {
            Some(PrimaryKey::Single(member)) => vec![member],
            Some(PrimaryKey::Composite(key)) => self.table_key(key).members.clone(),
            None => Vec::new(),
        }
    }

    /// The key member wrapping `column`, if it belongs to its table's key.
    pub fn key_member_of(&self, column: ColumnId) -> Option<KeyMemberId> {
        let table = self.column(column).table;
        self.key_members(table)
            .into_iter()
            .find(|&m| self.key_member(m).column == column)
    }

    pub fn role(&self, column: ColumnId) -> ColumnRole {
        let table = self.table(self.column(column).table);
        match table.primary_key {
            Some(PrimaryKey::Single(member)) if self.key_member(member).column == column => {
                return ColumnRole::Pk(member);
            }
            Some(PrimaryKey::Composite(key)) => {
                if let Some(&member) = self
                    .table_key(key)
                    .members
                    .iter()
                    .find(|&&m| self.key_member(m).column == column)
                {
                    return ColumnRole::KeyPart(key, member);
                }
            }
            _ => {}
        }
        match self.column(column).fk {
            Some(target) => ColumnRole::ForeignKey(target),
            None => ColumnRole::Data,
        }
    }

    /// Raw-name path `database.schema.table.column`.
    pub fn column_path(&self, column: ColumnId) -> String {
        let col = self.column(column);
        format!(
            "{}.{}",
            self.table_path(col.table),
            col.names.raw_name
        )
    }

    /// Raw-name path `database.schema.table`.
    pub fn table_path(&self, table: TableId) -> String {
        let t = self.table(table);
        let s = self.schema(t.schema);
        let d = self.database(s.database);
        format!(
            "{}.{}.{}",
            d.names.raw_name, s.names.raw_name, t.names.raw_name
        )
    }
}
