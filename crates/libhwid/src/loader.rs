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

// src/loader.rs
// DatabaseLoader abstracts where HWID databases are stored. The
// file-system loader keeps one file per project, named after the
// project, with an ".internal" variant that may carry extra
// information not meant for release.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::database::database::Database;
use crate::database::error::DatabaseSchemaError;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Database for project '{project}' not found at {}", path.display())]
    NotFound { project: String, path: PathBuf },

    #[error("Failed to load database for project '{project}': {source}")]
    Schema {
        project: String,
        #[source]
        source: DatabaseSchemaError,
    },

    #[error("Loaded database is for project '{actual}', expected '{expected}'")]
    ProjectMismatch { expected: String, actual: String },
}

pub type LoaderResult<T> = Result<T, LoaderError>;

pub trait DatabaseLoader {
    // load returns the database of a project, or its internal
    // variant when internal is set.
    fn load(&self, project: &str, internal: bool) -> LoaderResult<Database>;

    // store persists a database under its own project name.
    fn store(&self, database: &Database, internal: bool) -> LoaderResult<()>;
}

// FsDatabaseLoader stores databases as YAML files in a directory.
#[derive(Debug, Clone)]
pub struct FsDatabaseLoader {
    root: PathBuf,
    verify_checksum: bool,
}

impl FsDatabaseLoader {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            verify_checksum: true,
        }
    }

    // with_verify_checksum controls whether stored checksums are
    // checked on load (on by default).
    pub fn with_verify_checksum(mut self, verify_checksum: bool) -> Self {
        self.verify_checksum = verify_checksum;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // database_path returns the file a project's database lives in.
    pub fn database_path(&self, project: &str, internal: bool) -> PathBuf {
        let project = project.to_ascii_uppercase();
        if internal {
            self.root.join(format!("{project}.internal"))
        } else {
            self.root.join(project)
        }
    }
}

impl DatabaseLoader for FsDatabaseLoader {
    fn load(&self, project: &str, internal: bool) -> LoaderResult<Database> {
        let path = self.database_path(project, internal);
        if !path.is_file() {
            return Err(LoaderError::NotFound {
                project: project.to_string(),
                path,
            });
        }
        let database =
            Database::load_file(&path, self.verify_checksum).map_err(|source| LoaderError::Schema {
                project: project.to_string(),
                source,
            })?;
        if !database.project().eq_ignore_ascii_case(project) {
            return Err(LoaderError::ProjectMismatch {
                expected: project.to_string(),
                actual: database.project().to_string(),
            });
        }
        tracing::info!(project = %database.project(), path = %path.display(), internal, "Loaded database");
        Ok(database)
    }

    fn store(&self, database: &Database, internal: bool) -> LoaderResult<()> {
        let path = self.database_path(database.project(), internal);
        let schema_error = |source| LoaderError::Schema {
            project: database.project().to_string(),
            source,
        };
        std::fs::create_dir_all(&self.root)
            .map_err(|e| schema_error(DatabaseSchemaError::from(e)))?;
        database.save_file(&path).map_err(schema_error)?;
        tracing::info!(project = %database.project(), path = %path.display(), internal, "Stored database");
        Ok(())
    }
}
