use std::{fs, path::Path};

use atmc::{Atmc, Error, Record};
use pretty_assertions::assert_eq;

fn write(dir: &Path, name: &str, src: &str) {
    let path = dir.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, src).unwrap();
}

#[derive(Debug, Default, PartialEq, Record)]
struct Database {
    host: String,
    port: u16,
    #[tag(atmc = "pool_size")]
    pool: Option<u32>,
}

#[derive(Debug, Default, PartialEq, Record)]
struct Config {
    database: Database,
    features: Vec<String>,
}

#[test]
fn test_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "defaults/db.atmc",
        r#"{ host: "localhost", port: 5432, pool_size: 4 }"#,
    );
    write(
        dir.path(),
        "features.atmc",
        r#"{ list: ["a", "b"] }"#,
    );
    write(
        dir.path(),
        "app/config.atmc",
        r#"
            // the database comes from the shared defaults
            db ./../defaults/db.atmc
            f ./../features.atmc

            {
                database: { db..., host: "db.internal" }
                features: [f.list..., "c"]
            }
        "#,
    );

    let mut config = Config::default();
    Atmc::new()
        .load(dir.path().join("app/config.atmc"))
        .unwrap()
        .scan(&mut config)
        .unwrap();

    assert_eq!(
        config,
        Config {
            database: Database {
                host: "db.internal".into(),
                port: 5432,
                pool: Some(4),
            },
            features: vec!["a".into(), "b".into(), "c".into()],
        }
    );
}

#[test]
fn test_json_from_disk_with_absolute_import() {
    let dir = tempfile::tempdir().unwrap();
    let shared = dir.path().join("shared.atmc");
    fs::write(&shared, "{ retries: 3, backoff: 0.5 }").unwrap();
    write(
        dir.path(),
        "main.atmc",
        &format!("s {} {{ s..., retries: 5 }}", shared.display()),
    );

    let json = Atmc::new().json(dir.path().join("main.atmc")).unwrap();
    assert_eq!(
        String::from_utf8(json).unwrap(),
        r#"{"retries":5,"backoff":0.5}"#
    );
}

#[test]
fn test_missing_import_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "main.atmc", "x ./missing.atmc { a: x.b }");

    let error = Atmc::new().load(dir.path().join("main.atmc")).unwrap_err();
    let Error::Read { path, source } = error.root_cause() else {
        panic!("expected a read error, got {error:?}");
    };
    assert!(path.ends_with("missing.atmc"));
    assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
}
