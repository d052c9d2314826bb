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

// src/codec/bom.rs
// The bill of materials a device is encoded from.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// EncodingMode is the first bit of the HWID header. RMA marks
// devices re-manufactured after a return.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingMode {
    #[default]
    Normal,
    Rma,
}

impl EncodingMode {
    pub fn bit(&self) -> char {
        match self {
            EncodingMode::Normal => '0',
            EncodingMode::Rma => '1',
        }
    }

    pub fn from_bit(bit: char) -> Self {
        if bit == '1' {
            EncodingMode::Rma
        } else {
            EncodingMode::Normal
        }
    }
}

impl fmt::Display for EncodingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingMode::Normal => write!(f, "normal"),
            EncodingMode::Rma => write!(f, "rma"),
        }
    }
}

// Bom selects, per component class, the names of the components
// installed on a device. Names are kept sorted; an empty list means
// the class is present but has nothing installed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bom {
    #[serde(default)]
    pub encoding_mode: EncodingMode,
    #[serde(default)]
    pub image_id: u8,
    #[serde(default)]
    pub components: BTreeMap<String, Vec<String>>,
}

impl Bom {
    pub fn new(image_id: u8) -> Self {
        Self {
            image_id,
            ..Default::default()
        }
    }

    pub fn with_encoding_mode(mut self, encoding_mode: EncodingMode) -> Self {
        self.encoding_mode = encoding_mode;
        self
    }

    // with_component selects components for a class (builder pattern).
    pub fn with_component<C, I, N>(mut self, class: C, names: I) -> Self
    where
        C: Into<String>,
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.set_components(class, names);
        self
    }

    pub fn set_components<C, I, N>(&mut self, class: C, names: I)
    where
        C: Into<String>,
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        self.components.insert(class.into(), names);
    }

    // names returns the components selected for a class.
    pub fn names(&self, class: &str) -> &[String] {
        self.components
            .get(class)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    // normalized returns a copy with every name list sorted, for BOMs
    // that were deserialized rather than built.
    pub fn normalized(mut self) -> Self {
        for names in self.components.values_mut() {
            names.sort();
        }
        self
    }
}
