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

// src/rule/context.rs
// The explicit state rules are evaluated against: the database, the
// HWID being generated or verified, and read-only facts about the
// device.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::bom::Bom;
use crate::codec::encoder;
use crate::codec::error::{CodecError, CodecResult};
use crate::codec::identity::Identity;
use crate::database::database::Database;

// Phase is the build phase of the device.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Proto,
    Evt,
    Dvt,
    PvtDogfood,
    #[default]
    Pvt,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Proto => "PROTO",
            Phase::Evt => "EVT",
            Phase::Dvt => "DVT",
            Phase::PvtDogfood => "PVT_DOGFOOD",
            Phase::Pvt => "PVT",
        }
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(phase: &str) -> Result<Self, Self::Err> {
        match phase.to_ascii_uppercase().as_str() {
            "PROTO" => Ok(Phase::Proto),
            "EVT" => Ok(Phase::Evt),
            "DVT" => Ok(Phase::Dvt),
            "PVT_DOGFOOD" => Ok(Phase::PvtDogfood),
            "PVT" => Ok(Phase::Pvt),
            _ => Err(format!("Invalid phase: {phase}")),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Vpd holds the read-only and read-write vital product data sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vpd {
    #[serde(default)]
    pub ro: BTreeMap<String, String>,
    #[serde(default)]
    pub rw: BTreeMap<String, String>,
}

impl Vpd {
    pub fn with_ro<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.ro.insert(key.into(), value.into());
        self
    }

    pub fn with_rw<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.rw.insert(key.into(), value.into());
        self
    }

    // section returns the "ro" or "rw" section by name.
    pub fn section(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        match name {
            "ro" => Some(&self.ro),
            "rw" => Some(&self.rw),
            _ => None,
        }
    }
}

// Context is threaded through rule evaluation. The identity is kept
// consistent with the BOM: every change to the BOM re-encodes it.
#[derive(Debug, Clone)]
pub struct Context<'db> {
    database: &'db Database,
    identity: Identity,
    bom: Bom,
    device_info: serde_json::Value,
    vpd: Vpd,
    phase: Phase,
}

impl<'db> Context<'db> {
    // new creates a context by encoding a BOM.
    pub fn new(database: &'db Database, bom: Bom) -> CodecResult<Self> {
        let identity = encoder::encode(database, &bom)?;
        Ok(Self::from_decoded(database, identity, bom))
    }

    // from_decoded creates a context for an already decoded HWID.
    pub fn from_decoded(database: &'db Database, identity: Identity, bom: Bom) -> Self {
        Self {
            database,
            identity,
            bom,
            device_info: serde_json::Value::Object(Default::default()),
            vpd: Vpd::default(),
            phase: Phase::default(),
        }
    }

    pub fn with_device_info(mut self, device_info: serde_json::Value) -> Self {
        self.device_info = device_info;
        self
    }

    pub fn with_vpd(mut self, vpd: Vpd) -> Self {
        self.vpd = vpd;
        self
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    pub fn database(&self) -> &'db Database {
        self.database
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn bom(&self) -> &Bom {
        &self.bom
    }

    pub fn vpd(&self) -> &Vpd {
        &self.vpd
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    // get_device_info looks up a dotted path such as "cpu.cores" in
    // the device info document. Numeric path segments index arrays.
    pub fn get_device_info(&self, key: &str) -> Option<&serde_json::Value> {
        key.split('.').try_fold(&self.device_info, |value, segment| match value {
            serde_json::Value::Object(map) => map.get(segment),
            serde_json::Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index)),
            _ => None,
        })
    }

    // set_component replaces the components selected for a class and
    // re-encodes the HWID. Nothing changes if encoding fails.
    pub fn set_component(&mut self, class: &str, names: Vec<String>) -> CodecResult<()> {
        let mut bom = self.bom.clone();
        bom.set_components(class, names);
        self.reencode(bom)
    }

    // set_image_id moves the HWID to another image id and re-encodes it.
    pub fn set_image_id(&mut self, image_id: u8) -> CodecResult<()> {
        if self.database.get_pattern(image_id).is_none() {
            return Err(CodecError::UnknownImageId { image_id });
        }
        let mut bom = self.bom.clone();
        bom.image_id = image_id;
        self.reencode(bom)
    }

    fn reencode(&mut self, bom: Bom) -> CodecResult<()> {
        self.identity = encoder::encode(self.database, &bom)?;
        self.bom = bom;
        tracing::debug!(hwid = %self.identity.encoded_string, "Re-encoded HWID");
        Ok(())
    }

    // into_parts returns the final identity and BOM.
    pub fn into_parts(self) -> (Identity, Bom) {
        (self.identity, self.bom)
    }
}
