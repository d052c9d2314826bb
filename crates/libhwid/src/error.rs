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

// src/error.rs
// HwidError collects the errors of every module, for callers such as
// the CLI that drive several of them in one operation.

use thiserror::Error;

use crate::change_unit::error::{ApplyChangeUnitError, SchemaChangeRejectedError};
use crate::codec::error::CodecError;
use crate::database::error::{BuilderError, DatabaseSchemaError};
use crate::loader::LoaderError;
use crate::rule::error::{RuleEvaluationError, RuleParseError};

#[derive(Debug, Error)]
pub enum HwidError {
    #[error(transparent)]
    Schema(#[from] DatabaseSchemaError),

    #[error(transparent)]
    Builder(#[from] BuilderError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    RuleParse(#[from] RuleParseError),

    #[error(transparent)]
    RuleEvaluation(#[from] RuleEvaluationError),

    #[error(transparent)]
    SchemaChangeRejected(#[from] SchemaChangeRejectedError),

    #[error(transparent)]
    ApplyChangeUnit(#[from] ApplyChangeUnitError),

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl HwidError {
    pub fn invalid_input<M: Into<String>>(message: M) -> Self {
        Self::InvalidInput(message.into())
    }
}

pub type HwidResult<T> = Result<T, HwidError>;
