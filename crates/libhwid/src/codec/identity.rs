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

// src/codec/identity.rs

use std::collections::BTreeMap;

use serde::Serialize;

use crate::codec::bom::EncodingMode;

// Identity is an encoded HWID: the field indices it was built from,
// the binary string and the final text form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub project: String,
    pub encoding_mode: EncodingMode,
    pub image_id: u8,
    pub encoded_fields: BTreeMap<String, u32>,
    pub binary_string: String,
    pub encoded_string: String,
}

impl Identity {
    pub fn get_index(&self, field: &str) -> Option<u32> {
        self.encoded_fields.get(field).copied()
    }
}
