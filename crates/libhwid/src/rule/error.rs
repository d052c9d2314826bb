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

// src/rule/error.rs
// Error types for parsing and evaluating rule expressions.

use thiserror::Error;

use crate::codec::error::CodecError;

// RuleParseError is returned when a rule expression can't be parsed.
// Expressions are parsed when the database is loaded, so this always
// surfaces as a schema error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset} of `{expression}`")]
pub struct RuleParseError {
    pub message: String,
    pub offset: usize,
    pub expression: String,
}

impl RuleParseError {
    pub fn new<M: Into<String>>(message: M, offset: usize, expression: &str) -> Self {
        Self {
            message: message.into(),
            offset,
            expression: expression.to_string(),
        }
    }
}

// EvaluationFailure says why evaluating an expression failed.
#[derive(Debug, Error)]
pub enum EvaluationFailure {
    // AssertionFailed is raised by Assert() when its argument is falsy.
    #[error("{message}")]
    AssertionFailed { message: String },

    #[error("type error: {0}")]
    TypeError(String),

    #[error("device info '{0}' is not available")]
    MissingDeviceInfo(String),

    #[error("unknown VPD section '{0}', expected 'ro' or 'rw'")]
    UnknownVpdSection(String),

    #[error("invalid registration code: {0}")]
    InvalidRegistrationCode(String),

    #[error("image id {0} is not defined")]
    UnknownImageId(i64),

    #[error("division by zero")]
    DivisionByZero,

    // Codec is returned when re-encoding the HWID after
    // SetComponent() or SetImageId() fails.
    #[error("re-encoding failed: {0}")]
    Codec(#[from] CodecError),
}

impl EvaluationFailure {
    pub fn type_error<T: Into<String>>(message: T) -> Self {
        Self::TypeError(message.into())
    }
}

// RuleEvaluationError carries the rule name and the text of the
// sub-expression that failed, for operator diagnosis.
#[derive(Debug, Error)]
#[error("Rule '{rule}' failed at `{expression}`: {failure}")]
pub struct RuleEvaluationError {
    pub rule: String,
    pub expression: String,
    pub failure: EvaluationFailure,
}
