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

// src/database/error.rs
// Error types for loading, validating and building HWID databases.

use thiserror::Error;

use crate::rule::error::RuleParseError;

#[derive(Debug, Error)]
pub enum DatabaseSchemaError {
    // MissingSection is returned when a required top level
    // section is absent from the persisted database.
    #[error("Missing required section '{section}'")]
    MissingSection { section: String },

    // InvalidSection is returned when a section is present
    // but doesn't have the expected shape.
    #[error("Invalid section '{section}': {message}")]
    InvalidSection { section: String, message: String },

    // UndefinedComponent is returned when an encoded field
    // combination names a component that doesn't exist.
    #[error(
        "Encoded field '{field}' index {index} references undefined component '{class}/{name}'"
    )]
    UndefinedComponent {
        field: String,
        index: u32,
        class: String,
        name: String,
    },

    // UndefinedEncodedField is returned when a pattern
    // allocates bits to an encoded field that doesn't exist.
    #[error("Pattern {pattern_idx} references undefined encoded field '{field}'")]
    UndefinedEncodedField { pattern_idx: usize, field: String },

    // MissingDefaultIndex is returned when an encoded field
    // doesn't define index 0.
    #[error("Encoded field '{field}' does not define index 0")]
    MissingDefaultIndex { field: String },

    // InconsistentClasses is returned when the combinations
    // of an encoded field don't all cover the same classes.
    #[error("Encoded field '{field}' covers different component classes at index {index}")]
    InconsistentClasses { field: String, index: u32 },

    // InvalidImageId is returned for image ids that are out
    // of range, unbound, or bound to more than one pattern.
    #[error("Image id {image_id}: {message}")]
    InvalidImageId { image_id: u64, message: String },

    // InvalidRule is returned when a rule expression fails to parse.
    #[error("Rule '{rule}' has an invalid expression: {error}")]
    InvalidRule { rule: String, error: RuleParseError },

    // ChecksumMismatch is returned when checksum verification
    // was requested and the stored checksum is stale.
    #[error("Database checksum mismatch: stored '{stored}', computed '{computed}'")]
    ChecksumMismatch { stored: String, computed: String },

    // YamlParsing is returned when the document isn't valid YAML.
    #[error("YAML parsing error: {error}")]
    YamlParsing { error: serde_yaml::Error },

    #[error("Serialization error: {error}")]
    Serialization { error: String },

    #[error("I/O error: {error}")]
    Io { error: std::io::Error },
}

impl DatabaseSchemaError {
    // missing_section creates a missing section error.
    pub fn missing_section<T: Into<String>>(section: T) -> Self {
        Self::MissingSection {
            section: section.into(),
        }
    }

    // invalid_section creates an invalid section error.
    pub fn invalid_section<S: Into<String>, M: Into<String>>(section: S, message: M) -> Self {
        Self::InvalidSection {
            section: section.into(),
            message: message.into(),
        }
    }

    // invalid_image_id creates an invalid image id error.
    pub fn invalid_image_id<M: Into<String>>(image_id: u64, message: M) -> Self {
        Self::InvalidImageId {
            image_id,
            message: message.into(),
        }
    }
}

impl From<serde_yaml::Error> for DatabaseSchemaError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::YamlParsing { error }
    }
}

impl From<std::io::Error> for DatabaseSchemaError {
    fn from(error: std::io::Error) -> Self {
        Self::Io { error }
    }
}

// DatabaseResult is a result type alias for database operations.
pub type DatabaseResult<T> = Result<T, DatabaseSchemaError>;

// BuilderError is returned when the DatabaseBuilder refuses a change.
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("Component '{class}/{name}' already exists")]
    ComponentExists { class: String, name: String },

    #[error("Component '{class}/{name}' not found")]
    ComponentNotFound { class: String, name: String },

    #[error("Encoded field '{field}' already exists")]
    EncodedFieldExists { field: String },

    #[error("Encoded field '{field}' not found")]
    EncodedFieldNotFound { field: String },

    // ClassMismatch is returned when adding a combination of a class
    // the encoded field doesn't exclusively cover.
    #[error("Encoded field '{field}' does not exclusively cover class '{class}'")]
    ClassMismatch { field: String, class: String },

    #[error("Encoded field '{field}' already has this combination at index {index}")]
    DuplicateCombination { field: String, index: u32 },

    #[error("Pattern {pattern_idx} not found")]
    PatternNotFound { pattern_idx: usize },

    #[error("Bit length for encoded field '{field}' must be positive")]
    InvalidBitLength { field: String },

    #[error("Encoded field '{field}' would exceed {max} bits in pattern {pattern_idx}", max = u32::BITS)]
    FieldTooWide { field: String, pattern_idx: usize },

    #[error("Image id {image_id} already exists")]
    ImageIdExists { image_id: u8 },

    #[error("Image name '{name}' already exists")]
    ImageNameExists { name: String },

    #[error("Image id {image_id} is out of range")]
    ImageIdOutOfRange { image_id: u8 },

    // Validation is returned by build() when the finished draft
    // doesn't satisfy the database invariants.
    #[error("Draft validation failed: {0}")]
    Validation(#[from] DatabaseSchemaError),
}

// BuilderResult is a result type alias for builder operations.
pub type BuilderResult<T> = Result<T, BuilderError>;
