//! Tests for building field trees from declarations and overrides.

use formstate::prelude::*;
use serde_json::json;

// =============================================================================
// Declarations
// =============================================================================

#[test]
fn test_properties_from_declaration() {
    let form = Form::builder()
        .with_field(
            "email",
            FieldDecl::new()
                .with_name("contact")
                .with_value("a@example.com")
                .with_label("E-mail")
                .with_disabled(true)
                .with_rules("required|email")
                .with_validate(json!({ "remote": true }))
                .with_related(["confirm"]),
        )
        .with_field("confirm", Declaration::scalar(""))
        .build();
    let email = form.select("email").unwrap();

    assert_eq!(email.key(), "email");
    assert_eq!(email.name(), "contact");
    assert_eq!(email.label(), "E-mail");
    assert!(email.disabled());
    assert!(email.rules().is_some_and(|rules| rules.contains("email")));
    assert_eq!(email.validate(), Some(&json!({ "remote": true })));
    assert_eq!(email.related(), ["confirm"]);

    let confirm = form.select("confirm").unwrap();
    assert_eq!(confirm.label(), "confirm");
    assert!(!confirm.disabled());
    assert!(confirm.rules().is_none());
}

#[test]
fn test_label_defaults_to_name() {
    let form = Form::builder()
        .with_field("first", FieldDecl::new().with_name("given_name"))
        .build();
    assert_eq!(form.select("first").unwrap().label(), "given_name");
}

#[test]
fn test_invalid_declaration() {
    let err = Form::builder()
        .with_declaration(&json!({ "tags": { "fields": "nope" } }))
        .err()
        .expect("fields must be an object");
    assert!(matches!(err, FormError::InvalidDeclaration { ref path, .. } if path == "tags"));

    assert!(Form::builder().with_declaration(&json!(["a"])).is_err());
}

#[test]
fn test_declarations_deserialize() {
    let fields: Declarations = serde_json::from_str(
        r#"{ "name": "Ada", "address": { "fields": { "city": { "value": "Paris" } } } }"#,
    )
    .unwrap();
    let form = Form::builder().with_fields(fields).build();
    assert_eq!(form.values(), json!({ "name": "Ada", "address": { "city": "Paris" } }));
}

// =============================================================================
// Overrides
// =============================================================================

#[test]
fn test_overrides_win_over_declaration() {
    let overrides = Overrides::from_json_str(
        r#"{
            "values": { "user": { "name": "Grace" }, "user.age": 0 },
            "labels": { "user.name": "Full name" },
            "defaults": { "user": { "name": "Anonymous" } },
            "disabled": { "user.age": true }
        }"#,
    )
    .unwrap();

    let form = Form::builder()
        .with_declaration(&json!({
            "user": { "fields": {
                "name": { "value": "Ada", "label": "Name" },
                "age": { "value": 36 },
            } },
        }))
        .unwrap()
        .with_overrides(overrides)
        .build();

    let name = form.select("user.name").unwrap();
    assert_eq!(name.value(), json!("Grace"));
    assert_eq!(name.label(), "Full name");
    assert_eq!(name.default(), json!("Anonymous"));
    assert!(name.is_dirty());

    let age = form.select("user.age").unwrap();
    assert_eq!(age.value(), json!(0));
    assert!(age.disabled());
}

#[test]
fn test_overrides_apply_to_added_entries() {
    let overrides = Overrides::new().with(Category::Values, "items.1", "preset");
    let form = Form::builder()
        .with_declaration(&json!({ "items": { "fields": { "0": "a" } } }))
        .unwrap()
        .with_overrides(overrides)
        .with_options(FormOptions::manual())
        .build();

    form.root().add(Some("items")).unwrap();
    assert_eq!(form.values()["items"], json!(["a", "preset"]));
}

#[test]
fn test_reset_prefers_distinct_default() {
    let form = Form::builder()
        .with_field("a", FieldDecl::new().with_value("x").with_default("y"))
        .with_field("b", FieldDecl::new().with_value("x"))
        .with_options(FormOptions::manual())
        .build();

    form.set_value("a", "z").unwrap();
    form.set_value("b", "z").unwrap();
    form.reset();
    assert_eq!(form.values(), json!({ "a": "y", "b": "x" }));
}

// =============================================================================
// Update
// =============================================================================

#[test]
fn test_update_adds_missing_fields_only() {
    let form = Form::builder()
        .with_declaration(&json!({ "user": { "fields": { "name": "Ada" } } }))
        .unwrap()
        .with_options(FormOptions::manual())
        .build();
    form.set_value("user.name", "Grace").unwrap();

    let refresh = Declaration::map_from_json(
        &json!({
            "user": { "fields": { "name": "ignored", "email": "g@example.com" } },
            "notes": { "value": "hi" },
        }),
        "",
    )
    .unwrap();
    form.update(&refresh);

    assert_eq!(form.select("user.name").unwrap().value(), json!("Grace"));

    let email = form.select("user.email").unwrap();
    assert_eq!(email.value(), json!("g@example.com"));
    assert_eq!(email.default(), json!(""));
    assert!(email.is_dirty());

    assert_eq!(form.select("notes").unwrap().value(), json!("hi"));

    form.update(&refresh);
    assert_eq!(form.select("user").unwrap().fields().len(), 2);
}
