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

// src/codec/decoder.rs
// Decodes an HWID string back into its identity and BOM.

use std::collections::BTreeMap;

use crate::codec::bom::{Bom, EncodingMode};
use crate::codec::encoder;
use crate::codec::error::{CodecError, CodecResult};
use crate::codec::identity::Identity;
use crate::codec::scheme;
use crate::database::database::Database;
use crate::database::pattern::IMAGE_ID_BIT_LENGTH;

const HEADER_BIT_LENGTH: usize = 1 + IMAGE_ID_BIT_LENGTH;

// decode parses an HWID string. The checksum is verified before any
// bits are interpreted.
pub fn decode(database: &Database, encoded_string: &str) -> CodecResult<(Identity, Bom)> {
    let (project, text) = encoded_string
        .trim()
        .split_once(' ')
        .ok_or_else(|| CodecError::invalid_format("expected '<PROJECT> <code>'"))?;
    if !project.eq_ignore_ascii_case(database.project()) {
        return Err(CodecError::ProjectMismatch {
            expected: database.project().to_string(),
            actual: project.to_string(),
        });
    }

    // The header selects the scheme whose checksum is checked. When it
    // selects nothing, the text must still carry a valid checksum in
    // some scheme before the header is reported as wrong.
    let header = scheme::header_bits(text);
    let image_id = header.as_deref().ok().map(image_id_of);
    let selected = image_id
        .and_then(|image_id| database.get_pattern(image_id).map(|pattern| (image_id, pattern)));
    let Some((image_id, pattern)) = selected else {
        scheme::verify_any_checksum(database.project(), text)?;
        let image_id = image_id_of(&header?);
        return Err(CodecError::UnknownImageId { image_id });
    };
    let padded = scheme::converter(pattern.encoding_scheme).decode(database.project(), text)?;

    // Drop the zero padding and the stop bit in front of it.
    let stop = padded
        .rfind('1')
        .ok_or_else(|| CodecError::invalid_format("missing stop bit"))?;
    let binary_string = &padded[..=stop];
    let (identity, bom) = binary_string_to_identity(database, &binary_string[..stop])?;

    let identity = Identity {
        binary_string: binary_string.to_string(),
        encoded_string: encoder::binary_string_to_encoded_string(database, image_id, binary_string)?,
        ..identity
    };
    tracing::debug!(
        project = %identity.project,
        image_id = identity.image_id,
        hwid = %identity.encoded_string,
        "Decoded HWID"
    );
    Ok((identity, bom))
}

fn image_id_of(header: &str) -> u8 {
    header
        .bytes()
        .skip(1)
        .take(IMAGE_ID_BIT_LENGTH)
        .fold(0, |id, bit| (id << 1) | u8::from(bit == b'1'))
}

// binary_string_to_identity splits a binary string without its stop
// bit into encoded field indices and resolves them to a BOM. A body
// shorter than the pattern is zero extended, so strings encoded before
// bits were appended to the pattern keep decoding.
pub fn binary_string_to_identity(
    database: &Database,
    binary_string: &str,
) -> CodecResult<(Identity, Bom)> {
    if binary_string.len() < HEADER_BIT_LENGTH {
        return Err(CodecError::invalid_format("binary string is shorter than the header"));
    }
    let (header, body) = binary_string.split_at(HEADER_BIT_LENGTH);
    let encoding_mode = EncodingMode::from_bit(header.chars().next().unwrap_or('0'));
    let image_id = image_id_of(header);
    let pattern = database
        .get_pattern(image_id)
        .ok_or(CodecError::UnknownImageId { image_id })?;

    let mapping = pattern.bit_mapping();
    if body.len() > mapping.len() {
        return Err(CodecError::invalid_format(format!(
            "body has {} bits but the pattern of image {image_id} only has {}",
            body.len(),
            mapping.len()
        )));
    }

    let mut encoded_fields: BTreeMap<String, u32> = database
        .encoded_field_names()
        .into_iter()
        .map(|name| (name.to_string(), 0))
        .collect();
    for (entry, bit) in mapping.iter().zip(body.bytes()) {
        if bit == b'1' {
            *encoded_fields.entry(entry.field.clone()).or_insert(0) |= 1 << entry.bit;
        }
    }

    let mut bom = Bom::new(image_id).with_encoding_mode(encoding_mode);
    for (field, index) in &encoded_fields {
        let combination = database
            .get_encoded_field(field)
            .and_then(|encoded_field| encoded_field.get(*index))
            .ok_or_else(|| CodecError::UndefinedCombination {
                field: field.clone(),
                index: *index,
            })?;
        for (class, names) in combination.iter() {
            bom.set_components(class.clone(), names.iter().cloned());
        }
    }

    let identity = Identity {
        project: database.project().to_string(),
        encoding_mode,
        image_id,
        encoded_fields,
        binary_string: format!("{binary_string}1"),
        encoded_string: String::new(),
    };
    Ok((identity, bom))
}
