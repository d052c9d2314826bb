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

// src/codec/encoder.rs
// Encodes a BOM into an HWID.

use std::collections::BTreeMap;

use crate::codec::bom::{Bom, EncodingMode};
use crate::codec::error::{CodecError, CodecResult};
use crate::codec::identity::Identity;
use crate::codec::scheme;
use crate::database::database::Database;
use crate::database::encoded_field::bit_length_for_index;

// bom_to_encoded_fields selects the index of every encoded field
// from the components in a BOM. A field none of whose classes appear
// in the BOM gets index 0.
pub fn bom_to_encoded_fields(database: &Database, bom: &Bom) -> CodecResult<BTreeMap<String, u32>> {
    let mut encoded_fields = BTreeMap::new();
    for (name, field) in database.encoded_fields() {
        let touched = field
            .classes()
            .iter()
            .any(|class| bom.components.contains_key(*class));
        let index = if touched {
            field
                .find_index(&bom.components)
                .ok_or_else(|| CodecError::NoMatchingEncodedField {
                    field: name.clone(),
                })?
        } else {
            0
        };
        tracing::debug!(field = %name, index, "Selected encoded field index");
        encoded_fields.insert(name.clone(), index);
    }
    Ok(encoded_fields)
}

// encoded_fields_to_binary_string builds the binary string: the
// encoding mode bit and the image id, the pattern body and a stop bit.
pub fn encoded_fields_to_binary_string(
    database: &Database,
    encoding_mode: EncodingMode,
    image_id: u8,
    encoded_fields: &BTreeMap<String, u32>,
) -> CodecResult<String> {
    let pattern = database
        .get_pattern(image_id)
        .ok_or(CodecError::UnknownImageId { image_id })?;

    for (field, index) in encoded_fields {
        let available = pattern.field_bit_length(field);
        let required = bit_length_for_index(*index);
        if required > available {
            return Err(CodecError::InsufficientBitLength {
                field: field.clone(),
                index: *index,
                required,
                available,
            });
        }
    }

    let mut binary = String::with_capacity(pattern.total_bit_length() + 6);
    binary.push(encoding_mode.bit());
    binary.push_str(&format!("{image_id:04b}"));
    for entry in pattern.bit_mapping() {
        let index = encoded_fields.get(&entry.field).copied().unwrap_or(0);
        binary.push(if (index >> entry.bit) & 1 == 1 { '1' } else { '0' });
    }
    binary.push('1');
    Ok(binary)
}

// binary_string_to_encoded_string renders a binary string as the
// final "<PROJECT> <text>" form, using the encoding scheme of the
// image's pattern.
pub fn binary_string_to_encoded_string(
    database: &Database,
    image_id: u8,
    binary_string: &str,
) -> CodecResult<String> {
    let pattern = database
        .get_pattern(image_id)
        .ok_or(CodecError::UnknownImageId { image_id })?;
    let text = scheme::converter(pattern.encoding_scheme).encode(database.project(), binary_string);
    Ok(format!("{} {}", database.project(), text))
}

// encode_fields produces an identity from already selected indices.
pub fn encode_fields(
    database: &Database,
    encoding_mode: EncodingMode,
    image_id: u8,
    encoded_fields: BTreeMap<String, u32>,
) -> CodecResult<Identity> {
    let binary_string =
        encoded_fields_to_binary_string(database, encoding_mode, image_id, &encoded_fields)?;
    let encoded_string = binary_string_to_encoded_string(database, image_id, &binary_string)?;
    Ok(Identity {
        project: database.project().to_string(),
        encoding_mode,
        image_id,
        encoded_fields,
        binary_string,
        encoded_string,
    })
}

// encode encodes a BOM into an HWID identity.
pub fn encode(database: &Database, bom: &Bom) -> CodecResult<Identity> {
    let encoded_fields = bom_to_encoded_fields(database, bom)?;
    let identity = encode_fields(database, bom.encoding_mode, bom.image_id, encoded_fields)?;
    tracing::debug!(
        project = %identity.project,
        image_id = identity.image_id,
        hwid = %identity.encoded_string,
        "Encoded BOM"
    );
    Ok(identity)
}
