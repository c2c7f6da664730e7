//! Building many comparators at once.
//!
//! [`ComparatorSet`] turns a list of source pairs (or plain configuration
//! records) into one [`Comparator`] each. Unlike a lone `Comparator`, the set
//! validates its comparison names eagerly: an unknown name is a configuration
//! error rather than a silent fallback.

use std::ops::Index;
use std::rc::Rc;

use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::compare::{Comparator, ComparatorResult};
use crate::comps::{default_comps, BuiltinComp, CompSpec};
use crate::error::{ComparatorError, Result};
use crate::pair::SourcePair;
use crate::source::Source;

/// One comparison as read from configuration.
///
/// `lquery` is required unless a prebuilt `sp` is supplied; `sp` can only be
/// set programmatically.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComparisonConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub lquery: Option<String>,
    #[serde(default)]
    pub rquery: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub comps: Option<Vec<CompSpec>>,
    #[serde(skip)]
    pub sp: Option<SourcePair>,
}

impl ComparisonConfig {
    pub fn query(lquery: impl Into<String>) -> Self {
        Self {
            lquery: Some(lquery.into()),
            ..Default::default()
        }
    }

    pub fn pair(sp: SourcePair) -> Self {
        Self {
            sp: Some(sp),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_rquery(mut self, rquery: impl Into<String>) -> Self {
        self.rquery = Some(rquery.into());
        self
    }

    pub fn with_comps(mut self, comps: Vec<CompSpec>) -> Self {
        self.comps = Some(comps);
        self
    }
}

/// `comps: first` and `comps: [first, len]` are both accepted.
pub(crate) fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<CompSpec>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(CompSpec),
        Many(Vec<CompSpec>),
    }

    Ok(Option::<OneOrMany>::deserialize(deserializer)?.map(|comps| match comps {
        OneOrMany::One(comp) => vec![comp],
        OneOrMany::Many(comps) => comps,
    }))
}

/// An ordered collection of comparators.
#[derive(Debug)]
pub struct ComparatorSet {
    comparisons: Vec<Comparator>,
}

impl ComparatorSet {
    /// Build one comparator per source pair.
    ///
    /// `comps` and `names`, when given, must have one entry per pair. Without
    /// `comps`, every pair gets `default_comp` (or [`DEFAULT_COMP`](crate::DEFAULT_COMP)).
    pub fn new(
        source_pairs: impl IntoIterator<Item = SourcePair>,
        comps: Option<Vec<Vec<CompSpec>>>,
        names: Option<Vec<Option<String>>>,
        default_comp: Option<Vec<CompSpec>>,
    ) -> Result<Self> {
        let source_pairs: Vec<SourcePair> = source_pairs.into_iter().collect();
        let count = source_pairs.len();

        let comps = match comps {
            Some(comps) => comps,
            None => vec![default_comp.unwrap_or_else(default_comps); count],
        };
        for spec in comps.iter().flatten() {
            if !spec.is_valid() {
                return Err(ComparatorError::invalid_configuration(format!(
                    "each comp must be a predicate or one of {:?}; problem at: {spec}",
                    BuiltinComp::ALL.map(BuiltinComp::as_str)
                )));
            }
        }
        if comps.len() != count {
            return Err(ComparatorError::invalid_configuration(format!(
                "queries and comparison mapping is mismatched: there are {count} source pairs and {} comparisons",
                comps.len()
            )));
        }

        let names = names.unwrap_or_else(|| vec![None; count]);
        if names.len() != count {
            return Err(ComparatorError::invalid_configuration(format!(
                "queries and name mapping is mismatched: there are {count} source pairs and {} names",
                names.len()
            )));
        }

        let comparisons = source_pairs
            .into_iter()
            .zip(comps)
            .zip(names)
            .map(|((sp, comps), name)| Comparator::new(sp, comps, name))
            .collect();

        debug!(count, "built comparator set");
        Ok(Self { comparisons })
    }

    /// Build a set from configuration records.
    ///
    /// Records that carry only queries are paired with `left` / `right`.
    pub fn from_dict(
        configs: impl IntoIterator<Item = ComparisonConfig>,
        left: Option<Rc<dyn Source>>,
        right: Option<Rc<dyn Source>>,
        default_comp: Option<Vec<CompSpec>>,
    ) -> Result<Self> {
        let configs: Vec<ComparisonConfig> = configs.into_iter().collect();
        if let Some(bad) = configs.iter().find(|c| c.lquery.is_none() && c.sp.is_none()) {
            return Err(ComparatorError::invalid_configuration(format!(
                "each comparison needs an lquery or a source pair; problem with: {bad:?}"
            )));
        }

        let default_comp = default_comp.unwrap_or_else(default_comps);
        let mut names = Vec::with_capacity(configs.len());
        let mut pairs = Vec::with_capacity(configs.len());
        let mut comps = Vec::with_capacity(configs.len());

        for config in configs {
            let sp = match config.sp {
                Some(sp) => sp,
                None => {
                    let lquery = config.lquery.ok_or_else(|| {
                        ComparatorError::invalid_configuration("comparison has no lquery")
                    })?;
                    let left = left.clone().ok_or_else(|| {
                        ComparatorError::missing_source(format!(
                            "no left source to run {lquery:?} against"
                        ))
                    })?;
                    SourcePair::new(left, lquery, right.clone(), config.rquery)?
                }
            };
            names.push(config.name);
            pairs.push(sp);
            comps.push(config.comps.unwrap_or_else(|| default_comp.clone()));
        }

        Self::new(pairs, Some(comps), Some(names), None)
    }

    /// Build a set from query tuples:
    ///
    /// * `[lquery, rquery]`
    /// * `[lquery, rquery, comp]` when `comp` is a built-in constant, otherwise
    ///   `[name, lquery, rquery]`
    /// * `[name, lquery, rquery, comp]`
    pub fn from_list<R, S>(
        rows: impl IntoIterator<Item = R>,
        left: Option<Rc<dyn Source>>,
        right: Option<Rc<dyn Source>>,
        default_comp: Option<Vec<CompSpec>>,
    ) -> Result<Self>
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut configs = Vec::new();
        for row in rows {
            let row: Vec<String> = row.into_iter().map(Into::into).collect();
            let config = match <[String; 2]>::try_from(row) {
                Ok([lquery, rquery]) => ComparisonConfig::query(lquery).with_rquery(rquery),
                Err(row) => match <[String; 3]>::try_from(row) {
                    Ok([lquery, rquery, comp]) if BuiltinComp::from_name(&comp).is_some() => {
                        ComparisonConfig::query(lquery)
                            .with_rquery(rquery)
                            .with_comps(vec![comp.into()])
                    }
                    Ok([name, lquery, rquery]) => ComparisonConfig::query(lquery)
                        .with_rquery(rquery)
                        .with_name(name),
                    Err(row) => match <[String; 4]>::try_from(row) {
                        Ok([name, lquery, rquery, comp]) => ComparisonConfig::query(lquery)
                            .with_rquery(rquery)
                            .with_name(name)
                            .with_comps(vec![comp.into()]),
                        Err(row) => {
                            return Err(ComparatorError::invalid_configuration(format!(
                                "too many or too few elements to build a comparison; problem with: {row:?}"
                            )))
                        }
                    },
                },
            };
            configs.push(config);
        }

        Self::from_dict(configs, left, right, default_comp)
    }

    pub fn len(&self) -> usize {
        self.comparisons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comparisons.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Comparator> {
        self.comparisons.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Comparator> {
        self.comparisons.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Comparator> {
        self.comparisons.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Comparator> {
        self.comparisons.iter_mut()
    }

    /// Lazily compare every comparator in turn.
    pub fn compare(&mut self) -> impl Iterator<Item = Result<ComparatorResult>> + '_ {
        self.comparisons.iter_mut().flat_map(Comparator::compare)
    }

    /// Outcomes grouped per comparator, in set order.
    pub fn run_comparisons(&mut self) -> Result<Vec<Vec<ComparatorResult>>> {
        self.comparisons
            .iter_mut()
            .map(Comparator::run_comparisons)
            .collect()
    }

    pub fn clear(&mut self) {
        self.comparisons.iter_mut().for_each(Comparator::clear);
    }
}

impl Index<usize> for ComparatorSet {
    type Output = Comparator;

    fn index(&self, index: usize) -> &Comparator {
        &self.comparisons[index]
    }
}

impl<'a> IntoIterator for &'a ComparatorSet {
    type Item = &'a Comparator;
    type IntoIter = std::slice::Iter<'a, Comparator>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &'a mut ComparatorSet {
    type Item = &'a mut Comparator;
    type IntoIter = std::slice::IterMut<'a, Comparator>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
