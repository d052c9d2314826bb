/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 * http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::fs;

use libhwid::codec::decoder::decode;
use libhwid::database::error::DatabaseSchemaError;
use libhwid::loader::{DatabaseLoader, FsDatabaseLoader, LoaderError};
use tempfile::TempDir;

#[path = "../common/mod.rs"]
mod common;

use common::{SCENARIO_A_HWID, create_test_database, modified_database_yaml};

#[test]
fn test_database_path() {
    let loader = FsDatabaseLoader::new("/var/hwid");
    assert_eq!(loader.root().to_str(), Some("/var/hwid"));
    assert_eq!(
        loader.database_path("chromebook", false).to_str(),
        Some("/var/hwid/CHROMEBOOK")
    );
    assert_eq!(
        loader.database_path("Chromebook", true).to_str(),
        Some("/var/hwid/CHROMEBOOK.internal")
    );
}

#[test]
fn test_store_and_load() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let loader = FsDatabaseLoader::new(dir.path().join("v3"));
    let database = create_test_database();
    loader.store(&database, false).expect("database should be stored");
    assert!(dir.path().join("v3").join("CHROMEBOOK").is_file());

    let loaded = loader.load("chromebook", false).expect("database should load");
    assert_eq!(loaded.project(), "CHROMEBOOK");
    assert!(loaded.checksum().is_some());
    assert_eq!(loaded.to_yaml_string().unwrap(), database.to_yaml_string().unwrap());
    assert!(decode(&loaded, SCENARIO_A_HWID).is_ok());
}

#[test]
fn test_internal_variant_is_separate() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let loader = FsDatabaseLoader::new(dir.path());
    loader
        .store(&create_test_database(), true)
        .expect("database should be stored");
    assert!(dir.path().join("CHROMEBOOK.internal").is_file());

    assert!(loader.load("CHROMEBOOK", true).is_ok());
    match loader.load("CHROMEBOOK", false) {
        Err(LoaderError::NotFound { project, path }) => {
            assert_eq!(project, "CHROMEBOOK");
            assert_eq!(path, dir.path().join("CHROMEBOOK"));
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn test_load_verifies_checksum() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let loader = FsDatabaseLoader::new(dir.path());
    loader
        .store(&create_test_database(), false)
        .expect("database should be stored");

    let path = loader.database_path("CHROMEBOOK", false);
    let stored = fs::read_to_string(&path).unwrap();
    fs::write(&path, stored.replacen("  0: PROTO\n", "  0: PROTO2\n", 1)).unwrap();

    assert!(matches!(
        loader.load("CHROMEBOOK", false),
        Err(LoaderError::Schema {
            source: DatabaseSchemaError::ChecksumMismatch { .. },
            ..
        })
    ));

    let loaded = loader
        .clone()
        .with_verify_checksum(false)
        .load("CHROMEBOOK", false)
        .expect("unverified load should succeed");
    assert_eq!(loaded.get_image_name(0), Some("PROTO2"));
}

#[test]
fn test_load_rejects_other_project() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let loader = FsDatabaseLoader::new(dir.path()).with_verify_checksum(false);
    fs::write(
        dir.path().join("CHROMEBOOK"),
        modified_database_yaml("project: CHROMEBOOK", "project: OTHER"),
    )
    .unwrap();

    match loader.load("chromebook", false) {
        Err(LoaderError::ProjectMismatch { expected, actual }) => {
            assert_eq!(expected, "chromebook");
            assert_eq!(actual, "OTHER");
        }
        other => panic!("expected ProjectMismatch, got {other:?}"),
    }
}

#[test]
fn test_load_reports_schema_errors() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let loader = FsDatabaseLoader::new(dir.path()).with_verify_checksum(false);
    fs::write(dir.path().join("CHROMEBOOK"), "project: [unterminated\n").unwrap();

    let error = loader.load("CHROMEBOOK", false).unwrap_err();
    assert!(error.to_string().starts_with("Failed to load database for project 'CHROMEBOOK'"));
}
