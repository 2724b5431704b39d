//! Manifest-driven reconciliation against a database file.

use autoschema_core::prelude::*;
use autoschema_sqlite::SqliteDriver;

const MANIFEST: &str = r#"{
    "entities": [
        {
            "name": "Pet",
            "table": "pets",
            "timestamps": true,
            "columns": [
                { "name": "name", "index": true },
                { "name": "owner", "type": "references" }
            ]
        },
        { "name": "Dog", "table": "pets", "columns": [{ "name": "bau" }] },
        {
            "name": "Gender",
            "table": "genders",
            "primary_key": "name",
            "columns": [{ "name": "name", "limit": 32 }]
        }
    ]
}"#;

#[tokio::test]
async fn manifest_schema_survives_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let manifest_path = dir.path().join("autoschema.json");
    std::fs::write(&manifest_path, MANIFEST).unwrap();
    let url = format!("sqlite://{}", dir.path().join("app.db").display());

    let json = std::fs::read_to_string(&manifest_path).unwrap();
    let registry = Manifest::from_json(&json).unwrap().into_registry().unwrap();

    {
        let reconciler = Reconciler::new(SqliteDriver::connect(&url).await.unwrap());
        for (entity, result) in reconciler.auto_upgrade_all(&registry).await {
            assert!(result.is_ok(), "{entity}: {result:?}");
        }
        assert_eq!(
            reconciler.live_columns("pets").await.unwrap(),
            vec!["id", "name", "owner_id", "created_at", "updated_at", "bau", "type"]
        );
        reconciler.driver().pool().close().await;
    }

    let reconciler = Reconciler::new(SqliteDriver::connect(&url).await.unwrap());
    for entity in ["Pet", "Dog", "Gender"] {
        assert!(reconciler.plan(&registry, entity).await.unwrap().is_empty());
    }
    assert_eq!(
        reconciler.live_indexes("pets").await.unwrap(),
        vec!["index_pets_on_name"]
    );
    let genders = reconciler.live_schema("genders").await.unwrap().unwrap();
    assert_eq!(genders.primary_key.as_deref(), Some("name"));
    assert_eq!(genders.columns[0].options.limit, Some(32));
}

#[test]
fn unknown_manifest_keys_are_configuration_errors() {
    let json = r#"{"entities":[{"name":"Pet","table":"pets","colums":[]}]}"#;
    assert!(matches!(
        Manifest::from_json(json),
        Err(ConfigError::Manifest(_))
    ));
}

async fn memory_reconciler() -> Reconciler<SqliteDriver> {
    Reconciler::new(SqliteDriver::connect("sqlite::memory:").await.unwrap())
}

#[tokio::test]
async fn decimal_scale_without_precision_is_rejected() {
    let json = r#"{"entities":[{"name":"Account","table":"accounts",
        "columns":[{"name":"balance","type":"decimal","scale":2}]}]}"#;
    let registry = Manifest::from_json(json).unwrap().into_registry().unwrap();
    let reconciler = memory_reconciler().await;

    let err = reconciler.auto_upgrade(&registry, "Account").await.unwrap_err();
    assert!(matches!(
        err,
        SchemaError::Configuration(ConfigError::InvalidOption { option: "scale", .. })
    ));
    assert!(reconciler.live_schema("accounts").await.unwrap().is_none());
}

#[tokio::test]
async fn decimal_and_float_defaults_settle_after_one_pass() {
    let json = r#"{"entities":[{"name":"Account","table":"accounts","columns":[
        {"name":"balance","type":"decimal","precision":12},
        {"name":"rate","type":"decimal","precision":5,"scale":3},
        {"name":"ratio","type":"float","default":{"float":-0.0}}
    ]}]}"#;
    let registry = Manifest::from_json(json).unwrap().into_registry().unwrap();
    let reconciler = memory_reconciler().await;

    let first = reconciler.auto_upgrade(&registry, "Account").await.unwrap();
    assert!(first.created);
    for _ in 0..2 {
        let again = reconciler.auto_upgrade(&registry, "Account").await.unwrap();
        assert!(again.is_noop(), "{:?}", again.operations);
    }
}
