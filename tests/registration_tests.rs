/// Registration-time validation tests
///
/// Declaration mistakes must surface when the repository is built, not
/// when the query is first invoked.
/// Run with: cargo test --test registration_tests
mod common;

use common::Person;
use repoflow::driver::stub::StubDriver;
use repoflow::repository;
use repoflow::{QueryDefinition, RepoError, RepositoryFactory, ReturnShape};
use std::sync::Arc;

fn factory() -> RepositoryFactory {
    RepositoryFactory::new(Arc::new(StubDriver::new()))
}

#[test]
fn test_modifying_query_with_row_shape_rejected() {
    let err = factory()
        .repository::<Person>()
        .query(
            QueryDefinition::new("touch", "UPDATE person SET age = :age")
                .unwrap()
                .modifying()
                .returns(ReturnShape::Collection),
        )
        .build()
        .unwrap_err();

    assert!(err.is_configuration());
    assert!(err.to_string().contains("touch"));
}

#[test]
fn test_read_query_with_void_shape_rejected() {
    let err = factory()
        .repository::<Person>()
        .query(
            QueryDefinition::new("q", "SELECT * FROM person")
                .unwrap()
                .returns(ReturnShape::Void),
        )
        .build()
        .unwrap_err();

    assert!(err.is_configuration());
}

#[test]
fn test_duplicate_query_names_rejected() {
    let err = factory()
        .repository::<Person>()
        .query(QueryDefinition::new("q", "SELECT * FROM person").unwrap())
        .query(QueryDefinition::new("q", "SELECT * FROM person WHERE id = :id").unwrap())
        .build()
        .unwrap_err();

    assert!(err.to_string().contains("declared twice"));
}

#[test]
fn test_expression_and_positional_mix_rejected_at_parse() {
    let err = QueryDefinition::new("q", "SELECT * FROM person WHERE a = $1 AND b = :#{[0]}")
        .unwrap_err();

    assert!(err.is_binding());
}

#[test]
fn test_declared_parameter_mismatch_rejected() {
    let err = factory()
        .repository::<Person>()
        .query(
            QueryDefinition::new("q", "SELECT * FROM person WHERE lastname = :lastname")
                .unwrap()
                .parameters(["firstname"]),
        )
        .build()
        .unwrap_err();

    assert!(err.is_configuration());
    assert!(err.to_string().contains("lastname"));
}

#[test]
fn test_global_factory_registration() {
    repository::initialize(factory());

    let global = repository::global().unwrap();
    assert!(global.repository::<Person>().build().is_ok());
}

#[tokio::test]
async fn test_declared_queries_usable_after_build() {
    let driver = StubDriver::new();
    driver.script_rows(vec![]);

    let repo = RepositoryFactory::new(Arc::new(driver.clone()))
        .repository::<Person>()
        .query(
            QueryDefinition::new(
                "adults",
                "SELECT * FROM person WHERE age >= :age",
            )
            .unwrap()
            .parameters(["age"]),
        )
        .build()
        .unwrap();

    let people = repo
        .query("adults")
        .unwrap()
        .bind("age", 18i64)
        .fetch_all()
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    assert!(people.is_empty());
    assert_eq!(driver.executed().len(), 1);
}

#[test]
fn test_error_matching_helpers() {
    let err = RepoError::Binding("x".into());
    assert!(err.is_binding());
    assert!(!err.is_configuration());
}
