//! End-to-end comparisons between two SQLite databases.

mod common;

use std::rc::Rc;

use comparator::{
    Comparator, ComparatorError, ComparatorSet, ComparisonConfig, ComparisonPlan, DbConfig,
    Predicate, Source, SourcePair, SqliteSource, Value, BASIC_COMP, FIRST_COMP, LEN_COMP,
};
use common::Fixture;

fn sources(fixture: &Fixture) -> (Rc<dyn Source>, Rc<dyn Source>) {
    let dir = fixture.dir.path();
    let left = SqliteSource::open(&dir.join("warehouse.db"), true)
        .expect("Failed to open warehouse")
        .with_name("warehouse");
    let right = SqliteSource::open(&dir.join("replica.db"), true)
        .expect("Failed to open replica")
        .with_name("replica");
    (Rc::new(left), Rc::new(right))
}

#[test]
fn test_dependent_right_query() {
    let fixture = Fixture::new();
    let (left, right) = sources(&fixture);

    let mut comparator = Comparator::from_sources(
        left,
        "SELECT id FROM orders WHERE total > 5 ORDER BY id",
        Some(right),
        Some("SELECT id FROM orders WHERE id IN {{ id }} ORDER BY id".to_string()),
        vec![LEN_COMP.into(), FIRST_COMP.into()],
        Some("big orders".to_string()),
    )
    .unwrap();

    let outcomes = comparator.run_comparisons().unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].name(), "len_comp");
    assert!(!outcomes[0].is_truthy());
    assert_eq!(outcomes[1].name(), "first_eq_comp");
    assert!(outcomes[1].is_truthy());
    assert_eq!(outcomes[1].comparator_name(), Some("big orders"));

    assert_eq!(comparator.lresult().unwrap().len(), 4);
    assert_eq!(comparator.rresult().unwrap().len(), 3);
    assert!(comparator.is_complete());
}

#[test]
fn test_basic_comp_detects_changed_value() {
    let fixture = Fixture::new();
    let (left, right) = sources(&fixture);

    let mut same = Comparator::from_sources(
        left.clone(),
        "SELECT id, customer, total FROM orders WHERE id <= 2 ORDER BY id",
        Some(right.clone()),
        None,
        vec![BASIC_COMP.into()],
        None,
    )
    .unwrap();
    assert!(same.run_comparisons().unwrap()[0].is_truthy());

    let mut changed = Comparator::from_sources(
        left,
        "SELECT id, total FROM orders WHERE id = 3",
        Some(right),
        None,
        vec![BASIC_COMP.into()],
        None,
    )
    .unwrap();
    assert!(!changed.run_comparisons().unwrap()[0].is_truthy());
}

#[test]
fn test_custom_predicate_over_real_results() {
    let fixture = Fixture::new();
    let (left, right) = sources(&fixture);

    let totals_close = Predicate::custom("totals_within_one", |l, r| {
        let sum = |qr: &comparator::QueryResult| -> f64 {
            qr.column("total")
                .map(|col| col.iter().filter_map(Value::as_f64).sum())
                .unwrap_or_default()
        };
        let r = r.ok_or_else(|| ComparatorError::missing_source("needs a right result"))?;
        Ok(Value::Bool((sum(l) - sum(r)).abs() < 1.0))
    });

    let sp = SourcePair::new(
        left,
        "SELECT total FROM orders WHERE id < 5",
        Some(right),
        None,
    )
    .unwrap();
    let mut comparator = Comparator::new(sp, vec![totals_close.into()], None);

    let outcomes = comparator.run_comparisons().unwrap();
    assert_eq!(outcomes[0].name(), "totals_within_one");
    assert!(outcomes[0].is_truthy());
}

#[test]
fn test_missing_placeholder_column() {
    let fixture = Fixture::new();
    let (left, right) = sources(&fixture);

    let mut comparator = Comparator::from_sources(
        left,
        "SELECT id FROM orders",
        Some(right),
        Some("SELECT * FROM orders WHERE customer IN {{ customer }}".to_string()),
        Vec::new(),
        None,
    )
    .unwrap();

    match comparator.run_comparisons() {
        Err(ComparatorError::QueryFormat { key }) => assert_eq!(key, "customer"),
        other => panic!("expected a query format error, got {other:?}"),
    }
    assert!(comparator.results().is_empty());
}

#[test]
fn test_set_from_list() {
    let fixture = Fixture::new();
    let (left, right) = sources(&fixture);

    let mut set = ComparatorSet::from_list(
        vec![
            vec!["SELECT count(*) AS n FROM orders", "SELECT count(*) AS n FROM orders"],
            vec![
                "customers",
                "SELECT customer FROM orders ORDER BY id",
                "SELECT customer FROM orders ORDER BY id",
                LEN_COMP,
            ],
        ],
        Some(left),
        Some(right),
        Some(vec![BASIC_COMP.into()]),
    )
    .unwrap();

    assert_eq!(set.len(), 2);
    assert_eq!(set[1].name(), Some("customers"));

    let outcomes = set.run_comparisons().unwrap();
    assert!(!outcomes[0][0].is_truthy());
    assert_eq!(outcomes[1][0].name(), "len_comp");
    assert!(!outcomes[1][0].is_truthy());
}

#[test]
fn test_set_from_configs_is_lazy() {
    let fixture = Fixture::new();
    let (left, right) = sources(&fixture);

    let mut set = ComparatorSet::from_dict(
        vec![
            ComparisonConfig::query("SELECT id FROM orders WHERE id = 1").with_name("one"),
            ComparisonConfig::query("SELECT id FROM orders WHERE id = 5").with_name("five"),
        ],
        Some(left),
        Some(right),
        None,
    )
    .unwrap();

    let mut outcomes = set.compare();
    let first = outcomes.next().unwrap().unwrap();
    assert_eq!(first.comparator_name(), Some("one"));
    assert!(first.is_truthy());
    // The replica has no order 5, so `first` has nothing to compare.
    assert!(matches!(
        outcomes.next(),
        Some(Err(ComparatorError::EmptyResult))
    ));
    drop(outcomes);

    assert!(set[0].is_complete());
    assert!(!set[1].is_complete());
}

#[test]
fn test_plan_from_config_files() {
    let fixture = Fixture::new();
    let plan_path = fixture.plan(
        r#"
left: warehouse
right: replica
default_comp: [len, first]
comparisons:
  - name: small orders
    lquery: SELECT id, customer FROM orders WHERE total < 25 ORDER BY id
  - name: same customers
    lquery: SELECT customer FROM orders WHERE id IN (1, 2) ORDER BY id
    comps: basic
"#,
    );

    let dbs = DbConfig::from_path(&fixture.config).unwrap();
    assert_eq!(dbs.names().collect::<Vec<_>>(), ["warehouse", "replica"]);

    let plan = ComparisonPlan::from_path(&plan_path).unwrap();
    let mut set = plan.build(&dbs).unwrap();
    let outcomes = set.run_comparisons().unwrap();

    let small: Vec<bool> = outcomes[0].iter().map(|o| o.is_truthy()).collect();
    assert_eq!(small, [true, true]);
    assert_eq!(outcomes[1].len(), 1);
    assert!(outcomes[1][0].is_truthy());
}
