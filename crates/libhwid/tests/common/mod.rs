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

// tests/common/mod.rs
// Shared fixtures for libhwid tests.

#![allow(dead_code)]

use libhwid::codec::bom::Bom;
use libhwid::database::builder::DatabaseBuilder;
use libhwid::database::component::Component;
use libhwid::database::database::Database;

// TEST_DATABASE is a CHROMEBOOK database with two patterns: a base32
// pattern for images 0 (PROTO) and 1 (EVT), and a base8192 pattern for
// image 2 (DVT).
pub const TEST_DATABASE: &str = include_str!("../data/test_database.yaml");

// SCENARIO_A_BINARY and SCENARIO_A_HWID are the encoding of
// create_scenario_a_bom() with the test database.
pub const SCENARIO_A_BINARY: &str = "0000000000111010000011";
pub const SCENARIO_A_HWID: &str = "CHROMEBOOK AA5A-Y6L";

// SCENARIO_B_BINARY and SCENARIO_B_HWID are the scenario A BOM with
// dram_1 instead of dram_0.
pub const SCENARIO_B_BINARY: &str = "0000000000111011000011";
pub const SCENARIO_B_HWID: &str = "CHROMEBOOK AA5Q-YM2";

// create_test_database loads the shared test database.
pub fn create_test_database() -> Database {
    Database::from_yaml(TEST_DATABASE).expect("test database should load")
}

// modified_database_yaml returns the test database document with one
// occurrence of `from` replaced by `to`.
pub fn modified_database_yaml(from: &str, to: &str) -> String {
    assert!(
        TEST_DATABASE.contains(from),
        "fixture does not contain {from:?}"
    );
    TEST_DATABASE.replacen(from, to, 1)
}

// create_modified_database loads the test database with one textual
// replacement applied.
pub fn create_modified_database(from: &str, to: &str) -> Database {
    Database::from_yaml(&modified_database_yaml(from, to)).expect("modified database should load")
}

// create_edited_database loads the test database with several textual
// replacements applied in order.
pub fn create_edited_database(edits: &[(&str, &str)]) -> Database {
    let yaml = edits.iter().fold(TEST_DATABASE.to_string(), |yaml, (from, to)| {
        assert!(yaml.contains(from), "fixture does not contain {from:?}");
        yaml.replacen(from, to, 1)
    });
    Database::from_yaml(&yaml).expect("edited database should load")
}

// create_test_builder returns a builder drafted from the test database.
pub fn create_test_builder() -> DatabaseBuilder {
    DatabaseBuilder::from_database(&create_test_database())
}

// add_combinations adds one component per name to a class, each
// with its own new combination of the given single class field.
pub fn add_combinations(builder: &mut DatabaseBuilder, field: &str, class: &str, new_names: &[&str]) {
    for name in new_names {
        builder
            .add_component(class, *name, Component::new().with_value("model", *name))
            .expect("component should be added");
        builder
            .add_encoded_field_components(field, class, &names(&[*name]))
            .expect("combination should be added");
    }
}

// create_grown_database adds cpu_6..cpu_8 and dram_2 to the test
// database, and grows pattern 0 by a dram_field bit followed by a
// cpu_field bit.
pub fn create_grown_database() -> Database {
    let mut builder = create_test_builder();
    add_combinations(&mut builder, "cpu_field", "cpu", &["cpu_6", "cpu_7", "cpu_8"]);
    add_combinations(&mut builder, "dram_field", "dram", &["dram_2"]);
    builder
        .append_encoded_field_bit("dram_field", 1, 0)
        .expect("pattern should grow");
    builder
        .append_encoded_field_bit("cpu_field", 1, 0)
        .expect("pattern should grow");
    builder.build().expect("grown database should build")
}

// create_scenario_a_bom selects cpu_5 and the fixed components that
// produce the scenario A HWID on image 0.
pub fn create_scenario_a_bom() -> Bom {
    Bom::new(0)
        .with_component("audio_codec", ["codec_1", "hdmi_1"])
        .with_component("battery", ["battery_small"])
        .with_component("cellular", Vec::<String>::new())
        .with_component("keyboard", ["keyboard_us"])
        .with_component("bluetooth", ["bluetooth_1"])
        .with_component("camera", ["camera_1"])
        .with_component("cpu", ["cpu_5"])
        .with_component("dram", ["dram_0"])
        .with_component("display_panel", ["display_panel_0"])
        .with_component("firmware_keys", ["firmware_keys_premp"])
        .with_component("storage", ["storage_0"])
        .with_component("ro_main_firmware", ["ro_main_firmware_1"])
}

// names is a shorthand for building component name lists.
pub fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

// legacy_registration_code builds a valid legacy registration code for
// a payload.
pub fn legacy_registration_code(payload: &[u8; 32]) -> String {
    let crc = crc32fast::hash(payload).to_be_bytes();
    format!("{}{}", hex::encode(payload), hex::encode(crc))
}
