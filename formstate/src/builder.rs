//! Construction of field trees from declarations.

use std::sync::Arc;

use log::trace;

use crate::context::FormContext;
use crate::declaration::{Declaration, Declarations, join};
use crate::field::Field;

/// Builds fields under a parent, consulting the form's override store.
pub struct FieldTreeBuilder<'a> {
    context: &'a Arc<FormContext>,
}

impl<'a> FieldTreeBuilder<'a> {
    pub(crate) fn new(context: &'a Arc<FormContext>) -> Self {
        Self { context }
    }

    /// Create the declared children of `parent` that don't exist yet.
    ///
    /// Existing children are kept, but their own nested declarations are
    /// still visited so a refresh can add fields deeper in the tree.
    pub fn init_fields(&self, parent: &Field, decls: &Declarations, update: bool) {
        for (key, decl) in decls {
            let existing = parent.fields().get(key).cloned();
            match existing {
                Some(child) => {
                    if let Some(nested) = decl.fields() {
                        self.init_fields(&child, nested, update);
                    }
                }
                None => {
                    self.init_field(parent, key, Some(decl), update);
                }
            }
        }
    }

    /// Create one child of `parent` and its declared subtree.
    pub fn init_field(&self, parent: &Field, key: &str, decl: Option<&Declaration>, update: bool) -> Field {
        let path = join(parent.path(), key);
        let props = self.context.overrides().resolve(&path);
        trace!("init field '{}'", path);

        let field = Field::new(key, &path, decl, props, update, Arc::clone(self.context));
        parent.attach_child(field.clone());

        if let Some(nested) = decl.and_then(Declaration::fields) {
            self.init_fields(&field, nested, update);
            field.capture_initial();
        }
        field
    }
}
