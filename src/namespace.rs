//! Namespaces (imports, usings) required by a rendered artifact.

use crate::model::Model;
use crate::target::{TargetContext, TargetError};
use crate::types::ValueType;
use indexmap::IndexSet;
use tracing::debug;

/// Target capability: namespaces that must always be present.
pub trait NamespaceEnsurer {
    fn ensure_namespaces(&self, model: &Model) -> Vec<String>;
}

/// Target capability: final ordering of the collected namespaces.
///
/// Receives deduplicated, non-empty namespaces. Blank entries in the
/// result separate groups.
pub trait NamespaceOrganizer {
    fn organize_namespaces(&self, namespaces: Vec<String>) -> Vec<String>;
}

/// Standard-library namespaces first, then host-qualified ones, each group
/// sorted, with a blank entry between the groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdlibFirst;

impl NamespaceOrganizer for StdlibFirst {
    fn organize_namespaces(&self, namespaces: Vec<String>) -> Vec<String> {
        let (mut external, mut stdlib): (Vec<String>, Vec<String>) = namespaces
            .into_iter()
            .filter(|ns| !ns.is_empty())
            .partition(|ns| is_hosted(ns));
        stdlib.sort();
        stdlib.dedup();
        external.sort();
        external.dedup();

        let mut out = stdlib;
        if !out.is_empty() && !external.is_empty() {
            out.push(String::new());
        }
        out.extend(external);
        out
    }
}

/// A first path segment containing a dot is taken to be a host name.
fn is_hosted(namespace: &str) -> bool {
    let first = namespace.split('/').next().unwrap_or(namespace);
    first.contains('.')
}

/// Accumulates the namespaces of a model's types.
pub struct NamespaceCollector<'a> {
    context: &'a dyn TargetContext,
    seen: IndexSet<String>,
}

impl<'a> NamespaceCollector<'a> {
    pub fn new(context: &'a dyn TargetContext) -> Self {
        Self {
            context,
            seen: IndexSet::new(),
        }
    }

    pub fn insert(&mut self, namespace: impl Into<String>) {
        let namespace = namespace.into();
        if !namespace.is_empty() {
            self.seen.insert(namespace);
        }
    }

    /// Record the namespace `ty` needs in the active target.
    pub fn record_type(&mut self, ty: &ValueType) -> Result<(), TargetError> {
        if let Some(namespace) = self.context.model_type(ty)?.namespace {
            self.insert(namespace);
        }
        Ok(())
    }

    /// Record every column type in `model`, then apply the target's
    /// ensured namespaces and ordering. Returns the column path of the
    /// first type the target cannot represent.
    pub fn collect(mut self, model: &Model) -> Result<Vec<String>, (String, TargetError)> {
        for column in model.columns() {
            if let Some(ty) = &model.column(column).ty {
                self.record_type(ty)
                    .map_err(|e| (model.column_path(column), e))?;
            }
        }

        if let Some(ensurer) = self.context.namespace_ensurer() {
            for namespace in ensurer.ensure_namespaces(model) {
                self.insert(namespace);
            }
        }

        let namespaces: Vec<String> = self.seen.into_iter().collect();
        debug!(count = namespaces.len(), "collected namespaces");
        Ok(match self.context.namespace_organizer() {
            Some(organizer) => organizer.organize_namespaces(namespaces),
            None => namespaces,
        })
    }
}
