//! Per-field validation dispatch.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, RwLock};

use log::{debug, trace};
use tokio::runtime::Handle;

use super::engine::{AsyncRuleFn, AsyncRuleInput, BoxFuture, Check, DataMap, RuleEngine};
use super::rules::{Rule, RuleSpec, partition};
use crate::field::Field;

/// Runs a field's rules and writes the outcomes back onto it.
///
/// Rules registered through [`Orchestrator::register_async_rule`] are
/// asynchronous; every other rule runs synchronously. Async checks run on
/// the ambient Tokio runtime when there is one, and otherwise wait for
/// [`Orchestrator::settle`].
pub struct Orchestrator {
    engine: Arc<dyn RuleEngine>,
    async_rules: RwLock<HashSet<String>>,
    pending: Mutex<Vec<BoxFuture<'static, ()>>>,
    drain: tokio::sync::Mutex<()>,
}

impl Orchestrator {
    pub fn new(engine: Arc<dyn RuleEngine>) -> Self {
        Self {
            engine,
            async_rules: RwLock::new(HashSet::new()),
            pending: Mutex::new(Vec::new()),
            drain: tokio::sync::Mutex::new(()),
        }
    }

    pub fn engine(&self) -> &Arc<dyn RuleEngine> {
        &self.engine
    }

    /// Register an asynchronous rule under `name`.
    pub fn register_async_rule<F, Fut>(&self, name: &str, message: &str, rule: F)
    where
        F: Fn(AsyncRuleInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let rule: AsyncRuleFn =
            Arc::new(move |input: AsyncRuleInput| -> BoxFuture<'static, bool> { Box::pin(rule(input)) });
        self.register_async_rule_fn(name, message, rule);
    }

    /// Register an already boxed asynchronous rule.
    pub fn register_async_rule_fn(&self, name: &str, message: &str, rule: AsyncRuleFn) {
        if let Ok(mut names) = self.async_rules.write() {
            names.insert(name.to_string());
        }
        self.engine.register_async(name, message, rule);
    }

    pub fn is_async_rule(&self, name: &str) -> bool {
        self.async_rules
            .read()
            .map(|names| names.contains(name))
            .unwrap_or(false)
    }

    /// Split a rule spec into its (sync, async) rules.
    pub fn partition(&self, spec: Option<&RuleSpec>) -> (Vec<Rule>, Vec<Rule>) {
        let Some(spec) = spec else {
            return (Vec::new(), Vec::new());
        };
        match self.async_rules.read() {
            Ok(names) => partition(spec.rules(), &names),
            Err(poisoned) => partition(spec.rules(), &poisoned.into_inner()),
        }
    }

    /// Flat `path → value` snapshot of every field under `root`.
    pub fn snapshot(root: &Field) -> DataMap {
        let mut data = DataMap::new();
        root.each(|field| {
            data.insert(field.path().to_string(), field.value());
        });
        data
    }

    /// Validate one field against the current state of the tree.
    ///
    /// Async checks are dispatched first and not awaited; sync results are
    /// applied before this returns. With `apply` unset, results are
    /// computed but not written to the field. Returns whether the sync
    /// rules passed.
    pub fn validate_field(&self, field: &Field, root: &Field, apply: bool) -> bool {
        let labels = labels(root);
        let data = Arc::new(Self::snapshot(root));
        let (sync, asynchronous) = self.partition(field.rules());

        self.validate_field_async(field, asynchronous, Arc::clone(&data), &labels, apply);
        self.validate_field_sync(field, sync, data, &labels, apply)
    }

    /// Run the synchronous rules of `field`.
    pub fn validate_field_sync(
        &self,
        field: &Field,
        rules: Vec<Rule>,
        data: Arc<DataMap>,
        labels: &[(String, String)],
        apply: bool,
    ) -> bool {
        if rules.is_empty() {
            return true;
        }

        let check = self.check_for(field, rules, data, labels);
        let errors = self.engine.check(&check);
        match errors.first(field.path()) {
            None => true,
            Some(message) => {
                trace!("'{}' failed: {}", field.path(), message);
                if apply {
                    field.invalidate(message);
                }
                false
            }
        }
    }

    /// Dispatch the asynchronous rules of `field`.
    pub fn validate_field_async(
        &self,
        field: &Field,
        rules: Vec<Rule>,
        data: Arc<DataMap>,
        labels: &[(String, String)],
        apply: bool,
    ) {
        if rules.is_empty() {
            return;
        }

        let check = self.check_for(field, rules, data, labels);
        let generation = field.begin_async(apply);
        let outcome = self.engine.check_async(check);
        let owner = field.clone();
        let task = async move {
            let errors = outcome.await;
            let message = errors.first(owner.path()).map(str::to_string);
            owner.finish_async(generation, message, apply);
        };

        let pending: BoxFuture<'static, ()> = match Handle::try_current() {
            Ok(handle) => {
                let join = handle.spawn(task);
                let field = field.clone();
                Box::pin(async move {
                    if let Err(err) = join.await {
                        log::warn!("async validation of '{}' failed: {}", field.path(), err);
                        field.abandon_async();
                    }
                })
            }
            Err(_) => {
                debug!("no runtime, deferring async validation until settle");
                Box::pin(task)
            }
        };

        if let Ok(mut list) = self.pending.lock() {
            list.push(pending);
        }
    }

    /// Number of dispatched checks not yet drained by [`settle`](Self::settle).
    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|list| list.len()).unwrap_or(0)
    }

    /// Wait for every dispatched async check, including checks dispatched
    /// while waiting.
    pub async fn settle(&self) {
        let _drain = self.drain.lock().await;
        loop {
            let batch = match self.pending.lock() {
                Ok(mut list) => std::mem::take(&mut *list),
                Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
            };
            if batch.is_empty() {
                return;
            }
            trace!("settling {} async checks", batch.len());
            futures::future::join_all(batch).await;
        }
    }

    fn check_for(&self, field: &Field, rules: Vec<Rule>, data: Arc<DataMap>, labels: &[(String, String)]) -> Check {
        let referenced: Vec<String> = rules
            .iter()
            .filter(|rule| matches!(rule.name.as_str(), "same" | "different"))
            .filter_map(|rule| rule.arg(0).map(str::to_string))
            .collect();

        let mut check = Check::new(data)
            .with_rules(field.path(), rules)
            .with_attribute(field.path(), field.label());
        for (path, label) in labels {
            if referenced.contains(path) {
                check = check.with_attribute(path.as_str(), label.as_str());
            }
        }
        check
    }
}

fn labels(root: &Field) -> Vec<(String, String)> {
    let mut labels = Vec::new();
    root.each(|field| labels.push((field.path().to_string(), field.label())));
    labels
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("async_rules", &self.async_rules)
            .field("pending", &self.pending_count())
            .finish()
    }
}
