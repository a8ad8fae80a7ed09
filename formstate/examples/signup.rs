//! Sign-up form driven from the terminal.
//!
//! Run with `cargo run --example signup`. Debug logs go to `signup.log`.

use std::fs::File;
use std::time::Duration;

use formstate::prelude::*;
use serde_json::json;
use simplelog::{Config, LevelFilter, WriteLogger};

const TAKEN: &[&str] = &["admin", "root"];

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Ok(log_file) = File::create("signup.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, Config::default(), log_file);
    }

    let builder = match Form::builder().with_declaration(&json!({
        "username": { "label": "Username", "rules": "required|alpha_dash|min:3|available" },
        "email": { "label": "E-mail", "rules": "required|email" },
        "password": { "label": "Password", "rules": "required|min:8", "related": ["confirm"] },
        "confirm": { "label": "Confirmation", "rules": "same:password" },
        "age": { "label": "Age", "value": 0, "rules": "numeric|min:18" },
        "tags": { "fields": { "0": "rust" } },
    })) {
        Ok(builder) => builder,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };

    let form = builder
        .with_async_rule("available", "The :attribute is already taken.", |input| async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            !TAKEN.contains(&input.value.as_str().unwrap_or_default())
        })
        .build();

    let valid = form.computed(Form::is_valid);

    println!("-- first attempt");
    fill(
        &form,
        [
            ("username", json!("admin")),
            ("email", json!("not-an-email")),
            ("password", json!("hunter22")),
            ("confirm", json!("hunter2")),
            ("age", json!("17")),
        ],
    );
    form.settle().await;
    report(&form);
    println!("valid: {}", valid.get());

    println!("-- second attempt");
    fill(
        &form,
        [
            ("username", json!("ada")),
            ("email", json!("ada@example.com")),
            ("confirm", json!("hunter22")),
            ("age", json!("36")),
        ],
    );
    if let Some(tags) = form.select("tags")
        && let Ok(key) = tags.add(None)
        && let Err(e) = form.set_value(&format!("tags.{key}"), "forms")
    {
        eprintln!("Error: {}", e);
    }

    let result = form.validate().await;
    report(&form);
    println!("valid: {} ({} errors)", result.is_valid(), result.errors().len());
    println!("{}", form.values());
}

fn fill<const N: usize>(form: &Form, inputs: [(&str, serde_json::Value); N]) {
    for (path, value) in inputs {
        if let Err(e) = form.set_value(path, value) {
            eprintln!("Error: {}", e);
        }
    }
}

fn report(form: &Form) {
    form.each(|field| {
        if let Some(error) = field.error() {
            println!("{:>12}: {}", field.path(), error);
        }
    });
}
