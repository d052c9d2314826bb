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

// src/rule/registration.rs
// Validation of legacy registration codes: 72 lowercase hex digits,
// where the last 8 are the big-endian CRC-32 of the 32 bytes encoded
// by the first 64.

use crate::rule::error::EvaluationFailure;

const PAYLOAD_HEX_LENGTH: usize = 64;
const CODE_HEX_LENGTH: usize = PAYLOAD_HEX_LENGTH + 8;

pub fn check_registration_code(code: &str) -> Result<(), EvaluationFailure> {
    let invalid = |message: &str| EvaluationFailure::InvalidRegistrationCode(message.to_string());

    if code.len() != CODE_HEX_LENGTH {
        return Err(invalid(&format!(
            "expected {CODE_HEX_LENGTH} characters, found {}",
            code.len()
        )));
    }
    if !code.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
        return Err(invalid("expected lowercase hex digits"));
    }

    let (payload, crc) = code.split_at(PAYLOAD_HEX_LENGTH);
    let payload = hex::decode(payload).map_err(|e| invalid(&e.to_string()))?;
    let crc = hex::decode(crc).map_err(|e| invalid(&e.to_string()))?;
    let expected = crc32fast::hash(&payload).to_be_bytes();
    if crc != expected {
        return Err(invalid("checksum mismatch"));
    }
    Ok(())
}
