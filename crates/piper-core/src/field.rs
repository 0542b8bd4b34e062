// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Field resolution for incoming lines.
//!
//! Every event a sink builds carries a handful of metadata fields (a source, a type, a
//! timestamp...). Each field is configured once per run with a [`FieldSpec`]: either a
//! literal copied into every event, or a JMESPath query (prefixed with `jp:`) evaluated
//! against the JSON of each line.
//!
//! ```text
//!   FieldSpec "jp:type" ──compile once per field──┐
//!                                                 v
//!   raw line ──parse once per line──> Variable ──search──> String
//! ```

use std::cell::OnceCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use jmespath::{Expression, Rcvar, Variable};

use crate::error::FieldError;

/// Marks a field specification as a JMESPath query.
pub const QUERY_PREFIX: &str = "jp:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSpec {
    /// Used verbatim for every line.
    Literal(String),
    /// JMESPath expression, without the `jp:` prefix.
    Query(String),
}

impl FieldSpec {
    pub fn parse(spec: &str) -> Self {
        match spec.strip_prefix(QUERY_PREFIX) {
            Some(query) => FieldSpec::Query(query.to_string()),
            None => FieldSpec::Literal(spec.to_string()),
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self, FieldSpec::Query(_))
    }
}

impl From<&str> for FieldSpec {
    fn from(spec: &str) -> Self {
        FieldSpec::parse(spec)
    }
}

/// A raw input line with its JSON parsed lazily, at most once.
///
/// Fields that never query the line never pay for parsing it, and a line that fails to
/// parse reports the same error to every field that asks.
pub struct LineData<'a> {
    raw: &'a str,
    parsed: OnceCell<Result<Rcvar, Arc<serde_json::Error>>>,
}

impl<'a> LineData<'a> {
    pub fn new(raw: &'a str) -> Self {
        LineData {
            raw,
            parsed: OnceCell::new(),
        }
    }

    pub fn parsed(&self) -> Result<&Rcvar, FieldError> {
        self.parsed
            .get_or_init(|| {
                serde_json::from_str::<Variable>(self.raw)
                    .map(Rcvar::new)
                    .map_err(Arc::new)
            })
            .as_ref()
            .map_err(|e| FieldError::LineParse(Arc::clone(e)))
    }
}

/// Resolves configured fields against lines, caching compiled queries by field name.
pub struct FieldResolver {
    specs: HashMap<String, FieldSpec>,
    compiled: Mutex<HashMap<String, Arc<Expression<'static>>>>,
}

impl FieldResolver {
    pub fn new<I, K, V>(specs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        FieldResolver {
            specs: specs
                .into_iter()
                .map(|(name, spec)| (name.into(), FieldSpec::parse(spec.as_ref())))
                .collect(),
            compiled: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the value of `name` for `line`. Unconfigured fields resolve to an empty
    /// string.
    pub fn value(&self, name: &str, line: &LineData<'_>) -> Result<String, FieldError> {
        match self.specs.get(name) {
            None => Ok(String::new()),
            Some(FieldSpec::Literal(value)) => Ok(value.clone()),
            Some(FieldSpec::Query(query)) => {
                let expression = self.compiled(name, query)?;
                let data = line.parsed()?;
                let found = expression
                    .search(Rcvar::clone(data))
                    .map_err(|source| FieldError::Eval {
                        field: name.to_string(),
                        source,
                    })?;
                Ok(stringify(&found))
            }
        }
    }

    fn compiled(&self, name: &str, query: &str) -> Result<Arc<Expression<'static>>, FieldError> {
        #[allow(clippy::expect_used)]
        let mut compiled = self.compiled.lock().expect("lock poisoned");
        if let Some(expression) = compiled.get(name) {
            return Ok(Arc::clone(expression));
        }
        let expression = jmespath::compile(query).map_err(|source| FieldError::Compile {
            field: name.to_string(),
            source,
        })?;
        let expression = Arc::new(expression);
        compiled.insert(name.to_string(), Arc::clone(&expression));
        Ok(expression)
    }
}

impl std::fmt::Debug for FieldResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldResolver")
            .field("specs", &self.specs)
            .finish_non_exhaustive()
    }
}

// Numbers are rendered without a fraction or exponent so epoch timestamps survive intact.
fn stringify(value: &Variable) -> String {
    if let Some(s) = value.as_string() {
        return s.clone();
    }
    if let Some(n) = value.as_number() {
        return format!("{n:.0}");
    }
    if value.is_null() {
        return String::new();
    }
    if let Some(b) = value.as_boolean() {
        return b.to_string();
    }
    serde_json::to_string(value).unwrap_or_default()
}
