//! Running comparisons over one source pair.
//!
//! A [`Comparator`] owns a [`SourcePair`] and an ordered list of predicates.
//! [`Comparator::compare`] evaluates them lazily: the first pull runs the
//! queries, each outcome is cached as it is produced, and later passes replay
//! the cache instead of re-querying or re-evaluating.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::comps::{BuiltinComp, CompSpec, Predicate, DEFAULT_COMP};
use crate::error::{ComparatorError, Result};
use crate::pair::SourcePair;
use crate::result::QueryResult;
use crate::source::Source;
use crate::value::Value;

/// The named outcome of one predicate.
#[derive(Debug, Clone)]
pub struct ComparatorResult {
    comparator_name: Option<String>,
    name: String,
    result: Value,
}

/// Positional or named access into a [`ComparatorResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKey<'a> {
    Index(i64),
    Key(&'a str),
}

/// A field read through [`ComparatorResult::field`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutcomeField<'a> {
    Name(&'a str),
    Result(&'a Value),
}

impl From<i64> for OutcomeKey<'_> {
    fn from(index: i64) -> Self {
        OutcomeKey::Index(index)
    }
}

impl From<i32> for OutcomeKey<'_> {
    fn from(index: i32) -> Self {
        OutcomeKey::Index(i64::from(index))
    }
}

impl<'a> From<&'a str> for OutcomeKey<'a> {
    fn from(key: &'a str) -> Self {
        OutcomeKey::Key(key)
    }
}

impl ComparatorResult {
    pub fn new(comparator_name: Option<String>, name: impl Into<String>, result: Value) -> Self {
        Self {
            comparator_name,
            name: name.into(),
            result,
        }
    }

    /// Name of the comparator that produced this outcome.
    pub fn comparator_name(&self) -> Option<&str> {
        self.comparator_name.as_deref()
    }

    /// Name of the predicate.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn result(&self) -> &Value {
        &self.result
    }

    /// Pass/fail: the truthiness of the raw result.
    pub fn is_truthy(&self) -> bool {
        self.result.is_truthy()
    }

    /// `0` or `"name"` is the predicate name, `1` or `"result"` the value.
    pub fn field<'a>(&self, key: impl Into<OutcomeKey<'a>>) -> Result<OutcomeField<'_>> {
        match key.into() {
            OutcomeKey::Index(0) | OutcomeKey::Key("name") => Ok(OutcomeField::Name(&self.name)),
            OutcomeKey::Index(1) | OutcomeKey::Key("result") => {
                Ok(OutcomeField::Result(&self.result))
            }
            OutcomeKey::Index(index) => Err(ComparatorError::index_out_of_range(index, 2)),
            OutcomeKey::Key(key) => Err(ComparatorError::KeyNotFound {
                key: key.to_string(),
            }),
        }
    }

    pub fn into_parts(self) -> (String, Value) {
        (self.name, self.result)
    }
}

impl fmt::Display for ComparatorResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.name, self.result)
    }
}

/// Outcomes compare by their raw result only.
impl PartialEq for ComparatorResult {
    fn eq(&self, other: &Self) -> bool {
        self.result == other.result
    }
}

impl PartialEq<Value> for ComparatorResult {
    fn eq(&self, other: &Value) -> bool {
        self.result == *other
    }
}

impl PartialEq<bool> for ComparatorResult {
    fn eq(&self, other: &bool) -> bool {
        self.result == Value::Bool(*other)
    }
}

impl PartialOrd for ComparatorResult {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.result.partial_cmp(&other.result)
    }
}

impl PartialOrd<Value> for ComparatorResult {
    fn partial_cmp(&self, other: &Value) -> Option<Ordering> {
        self.result.partial_cmp(other)
    }
}

impl PartialOrd<bool> for ComparatorResult {
    fn partial_cmp(&self, other: &bool) -> Option<Ordering> {
        self.result.partial_cmp(&Value::Bool(*other))
    }
}

/// Evaluates a list of predicates against one [`SourcePair`].
///
/// Not safe to share between threads; sources are `Rc`.
#[derive(Debug)]
pub struct Comparator {
    sp: SourcePair,
    comps: Vec<Predicate>,
    name: Option<String>,
    results: Vec<ComparatorResult>,
    complete: bool,
}

impl Comparator {
    /// Build a comparator over `sp`.
    ///
    /// Unknown comparison names are dropped with a warning. When nothing is
    /// left (including an empty `comps`) the default comparison is used and
    /// the fallback is logged.
    pub fn new(sp: SourcePair, comps: Vec<CompSpec>, name: Option<String>) -> Self {
        let requested = comps.len();
        let mut resolved = Vec::with_capacity(requested);
        for spec in &comps {
            match spec.resolve() {
                Some(predicate) => resolved.push(predicate),
                None => warn!(comp = %spec, "ignoring unrecognized comparison"),
            }
        }

        if resolved.is_empty() {
            warn!(requested, "No valid comparisons found, falling back to default ({DEFAULT_COMP})");
            resolved.push(Predicate::Builtin(BuiltinComp::DEFAULT));
        }

        Self {
            sp,
            comps: resolved,
            name,
            results: Vec::new(),
            complete: false,
        }
    }

    /// Build the [`SourcePair`] and the comparator in one go.
    pub fn from_sources(
        left: Rc<dyn Source>,
        lquery: impl Into<String>,
        right: Option<Rc<dyn Source>>,
        rquery: Option<String>,
        comps: Vec<CompSpec>,
        name: Option<String>,
    ) -> Result<Self> {
        let sp = SourcePair::new(left, lquery, right, rquery)?;
        Ok(Self::new(sp, comps, name))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn comps(&self) -> &[Predicate] {
        &self.comps
    }

    pub fn source_pair(&self) -> &SourcePair {
        &self.sp
    }

    /// Outcomes produced so far.
    pub fn results(&self) -> &[ComparatorResult] {
        &self.results
    }

    pub fn query_results(&self) -> Vec<Option<&QueryResult>> {
        self.sp.query_results()
    }

    pub fn lresult(&self) -> Option<&QueryResult> {
        self.sp.lresult()
    }

    pub fn rresult(&self) -> Option<&QueryResult> {
        self.sp.rresult()
    }

    /// True once every predicate has a cached outcome.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// The pair's results, running the queries first if `run` is set and
    /// nothing is cached yet.
    pub fn get_query_results(&mut self, run: bool) -> Result<Vec<Option<&QueryResult>>> {
        if run && self.sp.is_empty() {
            self.sp.get_query_results()?;
        }
        Ok(self.sp.query_results())
    }

    /// Lazily evaluate every predicate, in order.
    pub fn compare(&mut self) -> Compare<'_> {
        Compare {
            comparator: self,
            index: 0,
            done: false,
        }
    }

    /// Evaluate everything and return an owned copy of the outcomes.
    pub fn run_comparisons(&mut self) -> Result<Vec<ComparatorResult>> {
        self.compare().collect()
    }

    /// Forget cached query results and outcomes.
    pub fn clear(&mut self) {
        self.sp.clear();
        self.results.clear();
        self.complete = false;
    }

    fn evaluate(&mut self, index: usize) -> Result<ComparatorResult> {
        let (lresult, rresult) = self.sp.ensure_query_results()?;
        let predicate = &self.comps[index];
        let result = predicate.apply(lresult, rresult)?;
        debug!(
            comparator = self.name.as_deref().unwrap_or(""),
            comp = predicate.name(),
            %result,
            "comparison evaluated"
        );
        Ok(ComparatorResult::new(
            self.name.clone(),
            predicate.name(),
            result,
        ))
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "<Comparator({name})>"),
            None => write!(f, "<Comparator()>"),
        }
    }
}

/// Iterator returned by [`Comparator::compare`].
///
/// Yields one outcome per predicate. The first error is yielded and ends the
/// iteration; outcomes cached before it are kept.
pub struct Compare<'a> {
    comparator: &'a mut Comparator,
    index: usize,
    done: bool,
}

impl Iterator for Compare<'_> {
    type Item = Result<ComparatorResult>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let comparator = &mut *self.comparator;
        if let Some(cached) = comparator.results.get(self.index) {
            self.index += 1;
            return Some(Ok(cached.clone()));
        }
        if self.index >= comparator.comps.len() {
            comparator.complete = true;
            self.done = true;
            return None;
        }

        match comparator.evaluate(self.index) {
            Ok(outcome) => {
                comparator.results.push(outcome.clone());
                self.index += 1;
                if comparator.results.len() == comparator.comps.len() {
                    comparator.complete = true;
                }
                Some(Ok(outcome))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        let remaining = self.comparator.comps.len().saturating_sub(self.index);
        (0, Some(remaining))
    }
}
