// ABOUTME: Tests for environment and YAML database configuration loading
// ABOUTME: Runs serially because the environment variables are process-wide
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use pierre_datastore::config::{DatabaseConfig, DatabaseUrl, PoolConfig};
use pierre_datastore::errors::ErrorCode;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

const DB_VARS: &[&str] = &[
    "DATABASE_URL",
    "DB_HOST",
    "DB_PORT",
    "DB_USER",
    "DB_PASSWORD",
    "DB_NAME",
    "DB_MAX_OPEN_CONNS",
    "DB_MIN_CONNS",
    "DB_IDLE_TIMEOUT_SECS",
    "DB_MAX_LIFETIME_SECS",
    "DB_ACQUIRE_TIMEOUT_SECS",
    "DB_TEST_BEFORE_ACQUIRE",
];

fn clear_db_env() {
    for key in DB_VARS {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_from_env_defaults_to_memory() {
    clear_db_env();
    let config = DatabaseConfig::from_env().unwrap();
    assert_eq!(config.url, DatabaseUrl::Memory);
    assert_eq!(config.pool, PoolConfig::default());
}

#[test]
#[serial]
fn test_from_env_database_url_wins() {
    clear_db_env();
    env::set_var("DATABASE_URL", "sqlite:./data/blog.db");
    env::set_var("DB_HOST", "ignored.example");

    let config = DatabaseConfig::from_env().unwrap();
    assert_eq!(
        config.url,
        DatabaseUrl::SQLite {
            path: PathBuf::from("./data/blog.db")
        }
    );
    clear_db_env();
}

#[test]
#[serial]
fn test_from_env_assembles_mysql_components() {
    clear_db_env();
    env::set_var("DB_HOST", "db.internal");
    env::set_var("DB_PORT", "3307");
    env::set_var("DB_USER", "blog");
    env::set_var("DB_PASSWORD", "s3cret");
    env::set_var("DB_NAME", "backed");

    let config = DatabaseConfig::from_env().unwrap();
    assert_eq!(
        config.url,
        DatabaseUrl::mysql("db.internal", 3307, "blog", "s3cret", "backed")
    );
    assert!(!config.url.to_string().contains("s3cret"));

    env::remove_var("DB_NAME");
    let err = DatabaseConfig::from_env().unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigError);
    clear_db_env();
}

#[test]
#[serial]
fn test_pool_env_overrides() {
    clear_db_env();
    env::set_var("DB_MAX_OPEN_CONNS", "8");
    env::set_var("DB_MIN_CONNS", "2");
    env::set_var("DB_IDLE_TIMEOUT_SECS", "0");
    env::set_var("DB_ACQUIRE_TIMEOUT_SECS", "15");

    let pool = PoolConfig::from_env().unwrap();
    assert_eq!(pool.max_connections, 8);
    assert_eq!(pool.min_connections, 2);
    assert_eq!(pool.idle_timeout_secs, None);
    assert_eq!(pool.acquire_timeout_secs, Some(15));
    assert_eq!(
        pool.max_lifetime_secs,
        PoolConfig::default().max_lifetime_secs
    );

    env::set_var("DB_MAX_OPEN_CONNS", "many");
    assert!(PoolConfig::from_env().is_err());

    env::set_var("DB_MAX_OPEN_CONNS", "1");
    env::set_var("DB_MIN_CONNS", "4");
    assert!(DatabaseConfig::from_env().is_err());
    clear_db_env();
}

#[test]
fn test_yaml_with_components_and_pool() {
    let yaml = r"
database:
  host: localhost
  port: 3306
  user: root
  password: ''
  dbname: backed
  pool:
    max_connections: 10
    acquire_timeout_secs: 5
";
    let config = DatabaseConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(
        config.url,
        DatabaseUrl::mysql("localhost", 3306, "root", "", "backed")
    );
    assert_eq!(config.pool.max_connections, 10);
    assert_eq!(config.pool.acquire_timeout_secs, Some(5));
    assert_eq!(
        config.pool.min_connections,
        PoolConfig::default().min_connections
    );
}

#[test]
fn test_yaml_file_with_url() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "database:\n  url: \"sqlite::memory:\"").unwrap();

    let config = DatabaseConfig::load_yaml(file.path()).unwrap();
    assert!(config.url.is_memory());
}

#[test]
fn test_yaml_errors() {
    assert!(DatabaseConfig::from_yaml_str("database: [").is_err());
    assert!(DatabaseConfig::from_yaml_str("other: {}").is_err());
    assert!(DatabaseConfig::from_yaml_str("database:\n  port: 3306\n").is_err());
    assert!(DatabaseConfig::from_yaml_str("database:\n  host: db\n").is_err());
    assert!(DatabaseConfig::load_yaml("/nonexistent/config.yaml").is_err());
}
