//! Reactive form state with sync and async validation.
//!
//! A [`Form`] owns a tree of [`Field`]s built from declarations. Every field
//! keeps its value, interaction state and validation state in observable
//! cells, and the form's [`Orchestrator`](validation::Orchestrator) runs the
//! declared rules whenever a value changes.

pub(crate) mod builder;
pub(crate) mod context;
pub mod declaration;
pub mod error;
pub mod field;
pub mod form;
pub mod options;
pub mod overrides;
pub mod state;
pub mod validation;
pub mod value;

pub use declaration::{Declaration, Declarations, FieldDecl};
pub use error::{FormError, Result, StructuralError};
pub use field::{AsyncOutcome, Change, EventTarget, Field, Fields, InputEvent};
pub use form::{Form, FormBuilder};
pub use options::FormOptions;
pub use overrides::{Category, Overrides};

pub mod prelude {
    pub use crate::declaration::{Declaration, Declarations, FieldDecl};
    pub use crate::error::{FormError, StructuralError};
    pub use crate::field::{AsyncOutcome, Change, Field, InputEvent};
    pub use crate::form::{Form, FormBuilder};
    pub use crate::options::FormOptions;
    pub use crate::overrides::{Category, Overrides};
    pub use crate::state::{Computed, State, batch};
    pub use crate::validation::{AsyncRuleInput, RuleEngine, Rules, ValidationResult};
}
