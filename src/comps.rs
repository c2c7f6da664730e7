//! Comparison predicates.
//!
//! A predicate takes the left result and (when the pair has a right source)
//! the right result, and returns a [`Value`] whose truthiness is the outcome.
//! Built-ins are addressed by the constants below; anything else is a
//! [`Predicate::Custom`] closure carrying its own display name.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Deserializer};

use crate::error::{ComparatorError, Result};
use crate::result::QueryResult;
use crate::value::Value;

pub const BASIC_COMP: &str = "basic";
pub const LEN_COMP: &str = "len";
pub const FIRST_COMP: &str = "first";

/// The comparison used when none is configured.
pub const DEFAULT_COMP: &str = FIRST_COMP;

/// Signature shared by every predicate.
pub type PredicateFn = dyn Fn(&QueryResult, Option<&QueryResult>) -> Result<Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinComp {
    /// Whole results are equal.
    Basic,
    /// Results have the same number of rows.
    Len,
    /// First rows are equal.
    First,
}

impl BuiltinComp {
    pub const ALL: [BuiltinComp; 3] = [BuiltinComp::Basic, BuiltinComp::Len, BuiltinComp::First];

    /// The built-in named by [`DEFAULT_COMP`].
    pub const DEFAULT: BuiltinComp = BuiltinComp::First;

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|comp| comp.as_str() == name)
    }

    /// The configuration constant.
    pub fn as_str(self) -> &'static str {
        match self {
            BuiltinComp::Basic => BASIC_COMP,
            BuiltinComp::Len => LEN_COMP,
            BuiltinComp::First => FIRST_COMP,
        }
    }

    /// The name reported on outcomes.
    pub fn fn_name(self) -> &'static str {
        match self {
            BuiltinComp::Basic => "basic_comp",
            BuiltinComp::Len => "len_comp",
            BuiltinComp::First => "first_eq_comp",
        }
    }

    pub fn apply(self, left: &QueryResult, right: Option<&QueryResult>) -> Result<Value> {
        let right = right.ok_or_else(|| {
            ComparatorError::missing_source(format!(
                "{} compares two results but the pair has no right source",
                self.fn_name()
            ))
        })?;

        let equal = match self {
            BuiltinComp::Basic => left == right,
            BuiltinComp::Len => left.len() == right.len(),
            BuiltinComp::First => left.first()? == right.first()?,
        };
        Ok(Value::Bool(equal))
    }
}

impl fmt::Display for BuiltinComp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved comparison.
#[derive(Clone)]
pub enum Predicate {
    Builtin(BuiltinComp),
    Custom { name: String, func: Rc<PredicateFn> },
}

impl Predicate {
    /// A user predicate with an explicit name.
    pub fn custom<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&QueryResult, Option<&QueryResult>) -> Result<Value> + 'static,
    {
        Predicate::Custom {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    /// An anonymous predicate, named after its definition text:
    /// `Predicate::lambda("x, y: len(x) < len(y)", f)` is reported as
    /// `lambda x, y: len(x) < len(y)`.
    pub fn lambda<F>(definition: &str, func: F) -> Self
    where
        F: Fn(&QueryResult, Option<&QueryResult>) -> Result<Value> + 'static,
    {
        Self::custom(format!("lambda {}", definition.trim()), func)
    }

    pub fn name(&self) -> &str {
        match self {
            Predicate::Builtin(comp) => comp.fn_name(),
            Predicate::Custom { name, .. } => name,
        }
    }

    pub fn apply(&self, left: &QueryResult, right: Option<&QueryResult>) -> Result<Value> {
        match self {
            Predicate::Builtin(comp) => comp.apply(left, right),
            Predicate::Custom { func, .. } => func(left, right),
        }
    }
}

impl From<BuiltinComp> for Predicate {
    fn from(comp: BuiltinComp) -> Self {
        Predicate::Builtin(comp)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Builtin(comp) => f.debug_tuple("Builtin").field(comp).finish(),
            Predicate::Custom { name, .. } => f.debug_struct("Custom").field("name", name).finish(),
        }
    }
}

/// A comparison as configured: a constant naming a built-in, or a predicate.
#[derive(Debug, Clone)]
pub enum CompSpec {
    Named(String),
    Predicate(Predicate),
}

impl CompSpec {
    /// The predicate this spec stands for, or `None` for an unknown name.
    pub fn resolve(&self) -> Option<Predicate> {
        match self {
            CompSpec::Named(name) => BuiltinComp::from_name(name).map(Predicate::Builtin),
            CompSpec::Predicate(predicate) => Some(predicate.clone()),
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            CompSpec::Named(name) => BuiltinComp::from_name(name).is_some(),
            CompSpec::Predicate(_) => true,
        }
    }
}

impl fmt::Display for CompSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompSpec::Named(name) => write!(f, "{name:?}"),
            CompSpec::Predicate(predicate) => f.write_str(predicate.name()),
        }
    }
}

impl From<&str> for CompSpec {
    fn from(name: &str) -> Self {
        CompSpec::Named(name.to_string())
    }
}

impl From<String> for CompSpec {
    fn from(name: String) -> Self {
        CompSpec::Named(name)
    }
}

impl From<BuiltinComp> for CompSpec {
    fn from(comp: BuiltinComp) -> Self {
        CompSpec::Predicate(Predicate::Builtin(comp))
    }
}

impl From<Predicate> for CompSpec {
    fn from(predicate: Predicate) -> Self {
        CompSpec::Predicate(predicate)
    }
}

impl<'de> Deserialize<'de> for CompSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(CompSpec::Named)
    }
}

/// The default comparison as a one-element spec list.
pub fn default_comps() -> Vec<CompSpec> {
    vec![CompSpec::from(DEFAULT_COMP)]
}
