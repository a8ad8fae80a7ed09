//! Validation for field trees.
//!
//! The [`Orchestrator`] decides, per field, which declared rules run
//! synchronously and which are awaited, and writes both outcomes back onto
//! the field. Rules themselves are evaluated by a [`RuleEngine`]; [`Rules`]
//! is the built-in one.
//!
//! # Example
//!
//! ```
//! use formstate::prelude::*;
//! use serde_json::json;
//!
//! let form = Form::builder()
//!     .with_field("username", FieldDecl::new().with_value("").with_rules("required|min:3"))
//!     .with_options(FormOptions::manual())
//!     .build();
//!
//! let username = form.select("username").unwrap();
//! username.set_value("ab").unwrap();
//! form.validate_field("username").unwrap();
//!
//! assert!(username.has_error());
//! assert_eq!(username.error().as_deref(), Some("The username must be at least 3 characters."));
//! # let _ = json!(null);
//! ```

mod engine;
mod orchestrator;
mod result;
mod rules;
mod validator;

pub use engine::{AsyncRuleFn, AsyncRuleInput, BoxFuture, Check, DataMap, ErrorBag, RuleEngine};
pub use orchestrator::Orchestrator;
pub use result::{ErrorKind, FieldError, ValidationResult};
pub use rules::{Rule, RuleSpec, partition};
pub use validator::{RuleContext, Rules};
