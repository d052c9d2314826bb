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

// src/codec/scheme.rs
// Converters between the binary string and the text form of an HWID.
// Both schemes append a checksum over "<PROJECT> <chars>" so that
// typos are caught before the string is decoded, and group the
// result with dashes for readability.

use crate::codec::error::{CodecError, CodecResult};
use crate::database::pattern::EncodingScheme;

const ALPHA_CHARS: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
const DIGIT_CHARS: &[u8; 8] = b"23456789";

// SchemeConverter renders and parses the text following the project
// name in an HWID string.
pub trait SchemeConverter {
    // encode turns a binary string into checksummed, dash separated
    // text.
    fn encode(&self, project: &str, binary_string: &str) -> String;

    // verify_checksum checks the trailing checksum characters of the
    // text, without interpreting the rest of it.
    fn verify_checksum(&self, project: &str, text: &str) -> CodecResult<()>;

    // decode verifies the checksum of the text and returns the binary
    // string it carries, including any zero padding.
    fn decode(&self, project: &str, text: &str) -> CodecResult<String>;
}

// Base32 uses 5 bits per character and a 10 bit checksum.
pub struct Base32;

// Base8192 uses 13 bit groups written as a letter, a digit and a
// letter, with an 8 bit checksum.
pub struct Base8192;

pub fn converter(scheme: EncodingScheme) -> &'static dyn SchemeConverter {
    match scheme {
        EncodingScheme::Base32 => &Base32,
        EncodingScheme::Base8192 => &Base8192,
    }
}

// verify_any_checksum succeeds if the text carries a valid checksum in
// any scheme. It is used when the header doesn't select a pattern, so
// that a typo in the first character is still reported as a checksum
// error.
pub fn verify_any_checksum(project: &str, text: &str) -> CodecResult<()> {
    let mut first_error = None;
    for scheme in [EncodingScheme::Base32, EncodingScheme::Base8192] {
        match converter(scheme).verify_checksum(project, text) {
            Ok(()) => return Ok(()),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    Err(first_error.unwrap_or_else(|| CodecError::invalid_format("no encoding scheme")))
}

// header_bits decodes the first character of an HWID text, which
// holds the 5 header bits in every scheme.
pub fn header_bits(text: &str) -> CodecResult<String> {
    let first = normalize(text)
        .chars()
        .next()
        .ok_or_else(|| CodecError::invalid_format("empty HWID"))?;
    Ok(bits_of(alpha_value(first)?, 5))
}

impl SchemeConverter for Base32 {
    fn encode(&self, project: &str, binary_string: &str) -> String {
        let mut bits = binary_string.as_bytes().to_vec();
        bits.resize(bits.len().div_ceil(5) * 5, b'0');

        let mut chars: String = bits.chunks(5).map(|chunk| alpha_char(value_of(chunk))).collect();
        let checksum = checksum(project, &chars) & 0x3ff;
        chars.push(alpha_char(checksum >> 5));
        chars.push(alpha_char(checksum & 0x1f));
        insert_dashes(&chars, 4)
    }

    fn verify_checksum(&self, project: &str, text: &str) -> CodecResult<()> {
        let text = normalize(text);
        let (data, actual) = split_checksum(&text)?;
        let checksum = checksum(project, data) & 0x3ff;
        let expected: String = [alpha_char(checksum >> 5), alpha_char(checksum & 0x1f)]
            .into_iter()
            .collect();
        compare_checksum(expected, actual)
    }

    fn decode(&self, project: &str, text: &str) -> CodecResult<String> {
        self.verify_checksum(project, text)?;
        let text = normalize(text);
        let values = text
            .chars()
            .map(alpha_value)
            .collect::<CodecResult<Vec<u32>>>()?;

        Ok(values[..values.len() - 2]
            .iter()
            .map(|value| bits_of(*value, 5))
            .collect())
    }
}

impl Base8192 {
    // char_width returns the number of bits carried by the character
    // at a position: the middle of every 3 character group is a digit.
    fn char_width(position: usize) -> usize {
        if position % 3 == 1 { 3 } else { 5 }
    }
}

impl SchemeConverter for Base8192 {
    fn encode(&self, project: &str, binary_string: &str) -> String {
        let mut bits = binary_string.as_bytes().to_vec();
        while (bits.len() + 8) % 13 != 0 {
            bits.push(b'0');
        }

        let mut chars = String::new();
        let mut offset = 0;
        while offset < bits.len() {
            let width = Self::char_width(chars.len());
            let value = value_of(&bits[offset..offset + width]);
            chars.push(if width == 3 {
                digit_char(value)
            } else {
                alpha_char(value)
            });
            offset += width;
        }

        let checksum = checksum(project, &chars) & 0xff;
        chars.push(digit_char(checksum >> 5));
        chars.push(alpha_char(checksum & 0x1f));
        insert_dashes(&chars, 3)
    }

    fn verify_checksum(&self, project: &str, text: &str) -> CodecResult<()> {
        let text = normalize(text);
        let (data, actual) = split_checksum(&text)?;
        let checksum = checksum(project, data) & 0xff;
        let expected: String = [digit_char(checksum >> 5), alpha_char(checksum & 0x1f)]
            .into_iter()
            .collect();
        compare_checksum(expected, actual)
    }

    fn decode(&self, project: &str, text: &str) -> CodecResult<String> {
        self.verify_checksum(project, text)?;
        let text = normalize(text);
        if text.len() % 3 != 0 {
            return Err(CodecError::invalid_format(format!(
                "'{text}' is not a valid base8192 string"
            )));
        }

        let mut bits = String::new();
        for (position, c) in text.chars().enumerate() {
            let width = Self::char_width(position);
            let value = if width == 3 {
                digit_value(c)?
            } else {
                alpha_value(c)?
            };
            bits.push_str(&bits_of(value, width));
        }

        bits.truncate(bits.len() - 8);
        Ok(bits)
    }
}

fn checksum(project: &str, chars: &str) -> u32 {
    crc32fast::hash(format!("{project} {chars}").as_bytes())
}

// split_checksum splits normalized text into its data characters and
// the two trailing checksum characters.
fn split_checksum(text: &str) -> CodecResult<(&str, &str)> {
    match text.char_indices().rev().nth(1) {
        Some((split, _)) if split > 0 => Ok(text.split_at(split)),
        _ => Err(CodecError::invalid_format(format!("'{text}' is too short"))),
    }
}

fn compare_checksum(expected: String, actual: &str) -> CodecResult<()> {
    if actual != expected {
        return Err(CodecError::Checksum {
            expected,
            actual: actual.to_string(),
        });
    }
    Ok(())
}

// normalize drops dashes and surrounding whitespace, and upper-cases
// the text so that hand-typed HWIDs decode.
fn normalize(text: &str) -> String {
    text.trim()
        .chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

fn insert_dashes(chars: &str, interval: usize) -> String {
    let mut text = String::with_capacity(chars.len() + chars.len() / interval);
    for (i, c) in chars.chars().enumerate() {
        if i > 0 && i % interval == 0 {
            text.push('-');
        }
        text.push(c);
    }
    text
}

fn value_of(bits: &[u8]) -> u32 {
    bits.iter()
        .fold(0, |value, bit| (value << 1) | u32::from(*bit == b'1'))
}

fn bits_of(value: u32, width: usize) -> String {
    format!("{value:0width$b}")
}

fn alpha_char(value: u32) -> char {
    char::from(ALPHA_CHARS[(value & 0x1f) as usize])
}

fn digit_char(value: u32) -> char {
    char::from(DIGIT_CHARS[(value & 0x7) as usize])
}

fn alpha_value(c: char) -> CodecResult<u32> {
    ALPHA_CHARS
        .iter()
        .position(|alpha| char::from(*alpha) == c)
        .map(|value| value as u32)
        .ok_or_else(|| CodecError::invalid_format(format!("unexpected character '{c}'")))
}

fn digit_value(c: char) -> CodecResult<u32> {
    DIGIT_CHARS
        .iter()
        .position(|digit| char::from(*digit) == c)
        .map(|value| value as u32)
        .ok_or_else(|| CodecError::invalid_format(format!("expected a digit, found '{c}'")))
}
