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

// src/change_unit/error.rs
// Error types for extracting and applying change units.

use thiserror::Error;

use crate::database::component::SupportStatus;
use crate::database::error::BuilderError;
use crate::database::pattern::EncodingScheme;

// SchemaChangeRejectedError is returned when a new database makes a
// change that could break HWIDs encoded with the old one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaChangeRejectedError {
    #[error("Project renamed from '{old}' to '{new}'")]
    ProjectRenamed { old: String, new: String },

    #[error("Pattern count decreased from {old} to {new}")]
    PatternRemoved { old: usize, new: usize },

    #[error("Encoded field '{field}' was removed")]
    EncodedFieldRemoved { field: String },

    #[error("Encoded field '{field}' changed the component classes it covers")]
    ClassesChanged { field: String },

    // MultiClassFieldGrown is returned when combinations are added to
    // a field covering several classes, which can't be expressed as
    // single class additions.
    #[error("Encoded field '{field}' covers more than one class and can't gain combinations")]
    MultiClassFieldGrown { field: String },

    #[error("Encoded field '{field}' index {index} now selects different components")]
    CombinationChanged { field: String, index: u32 },

    #[error("Encoded field '{field}' index {index} was removed")]
    CombinationRemoved { field: String, index: u32 },

    #[error("Encoded field '{field}' index {index} is not the next free index")]
    NonSequentialIndex { field: String, index: u32 },

    #[error("Component '{class}/{name}' was removed")]
    ComponentRemoved { class: String, name: String },

    // ComponentRenameCycle is returned when components of a class
    // trade names, so that every rename takes a name still in use.
    #[error("Component '{class}/{name}' is renamed to a name that stays in use")]
    ComponentRenameCycle { class: String, name: String },

    #[error("Component '{class}/{name}' status moved backward from {old} to {new}")]
    StatusDowngraded {
        class: String,
        name: String,
        old: SupportStatus,
        new: SupportStatus,
    },

    #[error("Image id {image_id} was removed")]
    ImageIdRemoved { image_id: u8 },

    #[error("Image id {image_id} was renamed from '{old}' to '{new}'")]
    ImageIdRenamed { image_id: u8, old: String, new: String },

    #[error("Image id {image_id} moved from pattern {old} to pattern {new}")]
    ImageIdMoved { image_id: u8, old: usize, new: usize },

    #[error("New pattern {pattern_idx} lists image id or name '{image}' more than once")]
    DuplicateImage { pattern_idx: usize, image: String },

    #[error("Pattern {pattern_idx} changed encoding scheme from {old} to {new}")]
    EncodingSchemeChanged {
        pattern_idx: usize,
        old: EncodingScheme,
        new: EncodingScheme,
    },

    #[error("Pattern {pattern_idx} changed existing bit allocations")]
    PatternRewritten { pattern_idx: usize },

    // UnattributedBits is returned when bits appended to a pattern
    // can't be explained by the combinations added to the database.
    #[error("Bits appended to pattern {pattern_idx} can't be attributed to a combination addition")]
    UnattributedBits { pattern_idx: usize },
}

// ApplyChangeUnitError is returned when replaying a change unit on a
// builder fails.
#[derive(Debug, Error)]
#[error("Failed to apply change unit {unit}: {source}")]
pub struct ApplyChangeUnitError {
    pub unit: String,
    #[source]
    pub source: BuilderError,
}

impl ApplyChangeUnitError {
    pub fn new<U: ToString>(unit: &U, source: BuilderError) -> Self {
        Self {
            unit: unit.to_string(),
            source,
        }
    }
}

pub type ExtractResult<T> = Result<T, SchemaChangeRejectedError>;
