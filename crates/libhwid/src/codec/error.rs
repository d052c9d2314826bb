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

// src/codec/error.rs
// Error types for encoding and decoding HWIDs.

use thiserror::Error;

// CodecError is returned when a BOM can't be encoded, or an HWID
// string can't be decoded, with a given database.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    // NoMatchingEncodedField is returned when no combination of a
    // field selects exactly the components in the BOM.
    #[error("No combination of encoded field '{field}' matches the BOM")]
    NoMatchingEncodedField { field: String },

    #[error("Encoded field '{field}' has no combination with index {index}")]
    UndefinedCombination { field: String, index: u32 },

    #[error("Checksum mismatch: expected '{expected}', found '{actual}'")]
    Checksum { expected: String, actual: String },

    #[error(
        "Encoded field '{field}' index {index} needs {required} bits but the pattern only allocates {available}"
    )]
    InsufficientBitLength {
        field: String,
        index: u32,
        required: u32,
        available: u32,
    },

    #[error("Image id {image_id} is not defined")]
    UnknownImageId { image_id: u8 },

    #[error("Invalid HWID format: {message}")]
    InvalidFormat { message: String },

    #[error("Project mismatch: database is '{expected}', HWID is '{actual}'")]
    ProjectMismatch { expected: String, actual: String },
}

impl CodecError {
    pub fn invalid_format<M: Into<String>>(message: M) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }
}

pub type CodecResult<T> = Result<T, CodecError>;
