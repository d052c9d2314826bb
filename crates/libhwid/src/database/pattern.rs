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

// src/database/pattern.rs
// Patterns describe how encoded field indices are packed into the
// binary string for a set of image ids, and which text encoding
// scheme the resulting HWID uses.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// IMAGE_ID_BIT_LENGTH is the width of the image id in the HWID header.
pub const IMAGE_ID_BIT_LENGTH: usize = 4;

// MAX_IMAGE_ID is the largest image id the header can carry.
pub const MAX_IMAGE_ID: u8 = (1 << IMAGE_ID_BIT_LENGTH) - 1;

// MAX_FIELD_BIT_LENGTH is the most bits a pattern can give one encoded
// field, since indices are u32.
pub const MAX_FIELD_BIT_LENGTH: u32 = u32::BITS;

// EncodingScheme selects the converter between the binary string and
// the human-typeable HWID text.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingScheme {
    #[default]
    Base32,
    Base8192,
}

impl EncodingScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncodingScheme::Base32 => "base32",
            EncodingScheme::Base8192 => "base8192",
        }
    }
}

impl FromStr for EncodingScheme {
    type Err = String;

    fn from_str(scheme: &str) -> Result<Self, Self::Err> {
        match scheme {
            "base32" => Ok(EncodingScheme::Base32),
            "base8192" => Ok(EncodingScheme::Base8192),
            _ => Err(format!(
                "Unknown encoding scheme '{scheme}'. Valid schemes: base32, base8192"
            )),
        }
    }
}

impl fmt::Display for EncodingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// PatternField is one (encoded field, bit length) entry of a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatternField {
    pub name: String,
    pub bit_length: u32,
}

impl PatternField {
    pub fn new<N: Into<String>>(name: N, bit_length: u32) -> Self {
        Self {
            name: name.into(),
            bit_length,
        }
    }
}

// BitEntry says which bit of which field sits at a given position
// of the binary string body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitEntry {
    pub field: String,
    pub bit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pattern {
    pub image_ids: Vec<u8>,
    pub encoding_scheme: EncodingScheme,
    pub fields: Vec<PatternField>,
}

impl Pattern {
    pub fn new(encoding_scheme: EncodingScheme) -> Self {
        Self {
            image_ids: Vec::new(),
            encoding_scheme,
            fields: Vec::new(),
        }
    }

    pub fn with_image_id(mut self, image_id: u8) -> Self {
        self.image_ids.push(image_id);
        self
    }

    pub fn with_field<N: Into<String>>(mut self, name: N, bit_length: u32) -> Self {
        self.fields.push(PatternField::new(name, bit_length));
        self
    }

    // field_bit_length returns the total number of bits allocated to
    // a field across all of its entries.
    pub fn field_bit_length(&self, field: &str) -> u32 {
        self.fields
            .iter()
            .filter(|entry| entry.name == field)
            .map(|entry| entry.bit_length)
            .sum()
    }

    // total_bit_length returns the size of the binary string body.
    pub fn total_bit_length(&self) -> usize {
        self.fields
            .iter()
            .map(|entry| entry.bit_length as usize)
            .sum()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|entry| entry.name == field)
    }

    // bit_mapping lays out the body bit by bit. Every entry takes the
    // next bit_length bits of its field, most significant bit first,
    // so that appending an entry for a field only ever adds higher
    // order bits to it.
    pub fn bit_mapping(&self) -> Vec<BitEntry> {
        let mut allocated: HashMap<&str, u32> = HashMap::new();
        let mut mapping = Vec::with_capacity(self.total_bit_length());
        for entry in &self.fields {
            let offset = allocated.entry(entry.name.as_str()).or_insert(0);
            for bit in (*offset..*offset + entry.bit_length).rev() {
                mapping.push(BitEntry {
                    field: entry.name.clone(),
                    bit,
                });
            }
            *offset += entry.bit_length;
        }
        mapping
    }
}
