//! Query pairs and dependent right-hand queries.
//!
//! A [`SourcePair`] binds a left query to a left source and, optionally, a
//! right query to a right source. The left query always runs first because the
//! right query may embed `{{ column }}` placeholders, each of which is replaced
//! with the left result's column rendered as a SQL list:
//!
//! ```text
//! SELECT * FROM t WHERE id IN {{ id }}   ->   SELECT * FROM t WHERE id IN (1, 4)
//! ```

use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::error::{ComparatorError, Result};
use crate::result::QueryResult;
use crate::source::Source;

/// `{{ name }}` with optional inner whitespace; names are `[A-Za-z0-9_]+`.
static TEMPLATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("Invalid query template regex")
});

/// Replace every `{{ name }}` placeholder in `template` with column `name` of
/// `lresult` rendered as a parenthesized SQL list.
///
/// Fails with [`ComparatorError::QueryFormat`] naming the first placeholder
/// (left to right) whose column is absent from `lresult`.
pub fn format_query(template: &str, lresult: &QueryResult) -> Result<String> {
    let keys: Vec<&str> = TEMPLATE_RE
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    if keys.is_empty() {
        return Ok(template.to_string());
    }

    debug!(?keys, "formatting right query placeholders");
    if let Some(missing) = keys.iter().find(|key| !lresult.has_column(key)) {
        return Err(ComparatorError::QueryFormat {
            key: missing.to_string(),
        });
    }

    let formatted = TEMPLATE_RE.replace_all(template, |caps: &Captures<'_>| {
        lresult
            .get(&caps[1])
            .map(|col| col.sql_literal())
            .unwrap_or_default()
    });
    Ok(formatted.into_owned())
}

fn check_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(ComparatorError::invalid_query("queries must be non-empty strings"));
    }
    Ok(())
}

/// Two sources, their queries, and the cached results of running them.
pub struct SourcePair {
    left: Rc<dyn Source>,
    lquery: String,
    right: Option<Rc<dyn Source>>,
    rquery: Option<String>,
    lresult: Option<QueryResult>,
    rresult: Option<QueryResult>,
}

impl SourcePair {
    /// Build a pair. With a right source and no `rquery`, the right side runs
    /// `lquery` as well.
    pub fn new(
        left: Rc<dyn Source>,
        lquery: impl Into<String>,
        right: Option<Rc<dyn Source>>,
        rquery: Option<String>,
    ) -> Result<Self> {
        let lquery = lquery.into();
        check_query(&lquery)?;

        let rquery = match (&right, rquery) {
            (Some(_), None) => Some(lquery.clone()),
            (_, rquery) => rquery,
        };
        if let Some(rquery) = &rquery {
            check_query(rquery)?;
        }

        Ok(Self {
            left,
            lquery,
            right,
            rquery,
            lresult: None,
            rresult: None,
        })
    }

    /// A pair with only a left source.
    pub fn left_only(left: Rc<dyn Source>, lquery: impl Into<String>) -> Result<Self> {
        Self::new(left, lquery, None, None)
    }

    pub fn left(&self) -> &Rc<dyn Source> {
        &self.left
    }

    pub fn right(&self) -> Option<&Rc<dyn Source>> {
        self.right.as_ref()
    }

    pub fn lquery(&self) -> &str {
        &self.lquery
    }

    /// The unformatted right query.
    pub fn rquery(&self) -> Option<&str> {
        self.rquery.as_deref()
    }

    pub fn lresult(&self) -> Option<&QueryResult> {
        self.lresult.as_ref()
    }

    pub fn rresult(&self) -> Option<&QueryResult> {
        self.rresult.as_ref()
    }

    /// One slot per configured source: `[left]` or `[left, right]`.
    pub fn query_results(&self) -> Vec<Option<&QueryResult>> {
        match self.right {
            Some(_) => vec![self.lresult.as_ref(), self.rresult.as_ref()],
            None => vec![self.lresult.as_ref()],
        }
    }

    /// True until a query has run (or after [`clear`](Self::clear)).
    pub fn is_empty(&self) -> bool {
        self.lresult.is_none() && self.rresult.is_none()
    }

    /// The right query with placeholders filled from the cached left result.
    /// `None` when the pair has no right query.
    pub fn resolved_rquery(&self) -> Result<Option<String>> {
        let Some(rquery) = &self.rquery else {
            return Ok(None);
        };
        let lresult = self
            .lresult
            .as_ref()
            .ok_or_else(|| ComparatorError::missing_source("left query has not run"))?;
        format_query(rquery, lresult).map(Some)
    }

    /// Run the left query, then the formatted right query if there is a
    /// right source. Results are only cached when every query succeeds.
    pub fn get_query_results(&mut self) -> Result<()> {
        debug!(source = self.left.name(), query = %self.lquery, "running left query");
        let lresult = self.left.query(&self.lquery)?;

        let rresult = match (&self.right, &self.rquery) {
            (Some(right), Some(rquery)) => {
                let rquery = format_query(rquery, &lresult)?;
                debug!(source = right.name(), query = %rquery, "running right query");
                Some(right.query(&rquery)?)
            }
            _ => None,
        };

        self.lresult = Some(lresult);
        self.rresult = rresult;
        Ok(())
    }

    /// Run the queries unless results are already cached, and return them.
    pub fn ensure_query_results(&mut self) -> Result<(&QueryResult, Option<&QueryResult>)> {
        if self.is_empty() {
            self.get_query_results()?;
        }
        let lresult = self
            .lresult
            .as_ref()
            .ok_or_else(|| ComparatorError::missing_source("left query has not run"))?;
        Ok((lresult, self.rresult.as_ref()))
    }

    /// Drop cached results so the next run re-executes both queries.
    pub fn clear(&mut self) {
        self.lresult = None;
        self.rresult = None;
    }
}

impl fmt::Display for SourcePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let right = self.right.as_ref().map_or("None", |r| r.name());
        write!(f, "<SourcePair: {} || {}>", self.left.name(), right)
    }
}

impl fmt::Debug for SourcePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
