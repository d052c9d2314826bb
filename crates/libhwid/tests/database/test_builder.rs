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

use libhwid::database::builder::{DatabaseBuilder, ImageTarget};
use libhwid::database::component::{Component, SupportStatus};
use libhwid::database::error::{BuilderError, DatabaseSchemaError};
use libhwid::database::pattern::EncodingScheme;

#[path = "../common/mod.rs"]
mod common;

use common::{create_test_builder, create_test_database, names};

#[test]
fn test_build_unchanged_draft() {
    let database = create_test_database();
    let rebuilt = create_test_builder().build().expect("unchanged draft should build");
    assert_eq!(rebuilt, database);
}

#[test]
fn test_build_from_scratch() {
    let mut builder = DatabaseBuilder::new("PROJ");
    assert_eq!(builder.project(), "PROJ");
    builder
        .add_component("cpu", "cpu_a", Component::new().with_value("model", "a"))
        .unwrap();
    builder
        .add_component("cpu", "cpu_b", Component::new().with_value("model", "b"))
        .unwrap();
    builder
        .add_new_encoded_field("cpu_field", "cpu", &names(&["cpu_a"]))
        .unwrap();
    assert_eq!(
        builder
            .add_encoded_field_components("cpu_field", "cpu", &names(&["cpu_b"]))
            .unwrap(),
        1
    );
    assert_eq!(
        builder
            .add_image(0, "PROTO", ImageTarget::NewPattern(EncodingScheme::Base32))
            .unwrap(),
        0
    );
    assert_eq!(builder.fill_encoded_field_bit("cpu_field", 0).unwrap(), 1);

    let database = builder.build().expect("draft should build");
    assert_eq!(database.project(), "PROJ");
    assert_eq!(database.get_image_name(0), Some("PROTO"));
    assert_eq!(database.get_field_bit_length(0, "cpu_field"), Some(1));
    assert_eq!(database.checksum(), None);
}

#[test]
fn test_add_component_refuses_existing() {
    let mut builder = create_test_builder();
    let err = builder
        .add_component("cpu", "cpu_0", Component::new())
        .unwrap_err();
    assert!(matches!(
        err,
        BuilderError::ComponentExists { class, name } if class == "cpu" && name == "cpu_0"
    ));
}

#[test]
fn test_update_component_status() {
    let mut builder = create_test_builder();
    let updated = Component::new()
        .with_status(SupportStatus::Deprecated)
        .with_value("model", "Intel(R) Celeron(R) 0");
    builder
        .update_component("cpu", "cpu_0", "cpu_0", updated.clone())
        .unwrap();
    let database = builder.build().unwrap();
    assert_eq!(database.get_component("cpu", "cpu_0"), Some(&updated));
}

#[test]
fn test_update_component_rename_propagates() {
    let mut builder = create_test_builder();
    let component = create_test_database()
        .get_component("cpu", "cpu_3")
        .cloned()
        .unwrap();
    builder
        .update_component("cpu", "cpu_3", "cpu_3_renamed", component)
        .unwrap();
    let database = builder.build().unwrap();

    // The renamed component keeps its position in the class.
    let cpu_names: Vec<&str> = database
        .get_components("cpu")
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(
        cpu_names,
        vec!["cpu_0", "cpu_1", "cpu_2", "cpu_3_renamed", "cpu_4", "cpu_5"]
    );
    assert!(database.get_component("cpu", "cpu_3").is_none());
    assert_eq!(
        database
            .get_encoded_field("cpu_field")
            .unwrap()
            .get(3)
            .unwrap()
            .names("cpu"),
        ["cpu_3_renamed".to_string()]
    );
}

#[test]
fn test_update_component_refusals() {
    let mut builder = create_test_builder();
    assert!(matches!(
        builder.update_component("cpu", "cpu_9", "cpu_9", Component::new()),
        Err(BuilderError::ComponentNotFound { .. })
    ));
    assert!(matches!(
        builder.update_component("gpu", "gpu_0", "gpu_0", Component::new()),
        Err(BuilderError::ComponentNotFound { .. })
    ));
    assert!(matches!(
        builder.update_component("cpu", "cpu_0", "cpu_1", Component::new()),
        Err(BuilderError::ComponentExists { name, .. }) if name == "cpu_1"
    ));
}

#[test]
fn test_add_new_encoded_field_refusals() {
    let mut builder = create_test_builder();
    assert!(matches!(
        builder.add_new_encoded_field("cpu_field", "cpu", &names(&["cpu_0"])),
        Err(BuilderError::EncodedFieldExists { field }) if field == "cpu_field"
    ));
    assert!(matches!(
        builder.add_new_encoded_field("gpu_field", "gpu", &names(&["gpu_0"])),
        Err(BuilderError::ComponentNotFound { class, .. }) if class == "gpu"
    ));
}

#[test]
fn test_add_encoded_field_components_refusals() {
    let mut builder = create_test_builder();
    assert!(matches!(
        builder.add_encoded_field_components("gpu_field", "cpu", &names(&["cpu_0"])),
        Err(BuilderError::EncodedFieldNotFound { .. })
    ));
    assert!(matches!(
        builder.add_encoded_field_components("mainboard_field", "mainboard", &names(&["rev1"])),
        Err(BuilderError::ClassMismatch { field, .. }) if field == "mainboard_field"
    ));
    assert!(matches!(
        builder.add_encoded_field_components("cpu_field", "dram", &names(&["dram_0"])),
        Err(BuilderError::ClassMismatch { .. })
    ));
    assert!(matches!(
        builder.add_encoded_field_components("cpu_field", "cpu", &names(&["cpu_4"])),
        Err(BuilderError::DuplicateCombination { index: 4, .. })
    ));
    assert!(matches!(
        builder.add_encoded_field_components("cpu_field", "cpu", &names(&["cpu_7"])),
        Err(BuilderError::ComponentNotFound { name, .. }) if name == "cpu_7"
    ));
}

#[test]
fn test_add_encoded_field_components_uses_next_index() {
    let mut builder = create_test_builder();
    let index = builder
        .add_encoded_field_components("cpu_field", "cpu", &names(&["cpu_0", "cpu_1"]))
        .unwrap();
    assert_eq!(index, 6);
    let database = builder.build().unwrap();
    assert_eq!(
        database
            .get_encoded_field("cpu_field")
            .unwrap()
            .get(6)
            .unwrap()
            .names("cpu"),
        ["cpu_0".to_string(), "cpu_1".to_string()]
    );
}

#[test]
fn test_fill_encoded_field_bit() {
    let mut builder = create_test_builder();
    // cpu_field already has 3 bits in both patterns.
    assert_eq!(builder.fill_encoded_field_bit("cpu_field", 0).unwrap(), 0);

    builder
        .add_component("cpu", "cpu_6", Component::new().with_value("model", "six"))
        .unwrap();
    builder
        .add_component("cpu", "cpu_7", Component::new().with_value("model", "seven"))
        .unwrap();
    builder
        .add_component("cpu", "cpu_8", Component::new().with_value("model", "eight"))
        .unwrap();
    for name in ["cpu_6", "cpu_7", "cpu_8"] {
        builder
            .add_encoded_field_components("cpu_field", "cpu", &names(&[name]))
            .unwrap();
    }
    assert_eq!(builder.fill_encoded_field_bit("cpu_field", 0).unwrap(), 1);
    assert_eq!(builder.fill_encoded_field_bit("cpu_field", 0).unwrap(), 0);

    let database = builder.build().unwrap();
    let pattern = database.get_pattern_by_index(0).unwrap();
    assert_eq!(pattern.field_bit_length("cpu_field"), 4);
    let last = pattern.fields.last().unwrap();
    assert_eq!((last.name.as_str(), last.bit_length), ("cpu_field", 1));
    assert_eq!(database.get_field_bit_length(2, "cpu_field"), Some(3));
}

#[test]
fn test_append_encoded_field_bit() {
    let mut builder = create_test_builder();
    assert!(matches!(
        builder.append_encoded_field_bit("cpu_field", 0, 0),
        Err(BuilderError::InvalidBitLength { .. })
    ));
    assert!(matches!(
        builder.append_encoded_field_bit("cpu_field", 1, 7),
        Err(BuilderError::PatternNotFound { pattern_idx: 7 })
    ));
    assert!(matches!(
        builder.append_encoded_field_bit("gpu_field", 1, 0),
        Err(BuilderError::EncodedFieldNotFound { .. })
    ));
    builder.append_encoded_field_bit("mainboard_field", 2, 0).unwrap();
    let database = builder.build().unwrap();
    assert_eq!(database.get_field_bit_length(0, "mainboard_field"), Some(2));
    assert_eq!(database.get_field_bit_length(1, "mainboard_field"), Some(2));
}

#[test]
fn test_append_encoded_field_bit_limits_width() {
    let mut builder = create_test_builder();
    match builder.append_encoded_field_bit("cpu_field", 30, 0) {
        Err(BuilderError::FieldTooWide { field, pattern_idx }) => {
            assert_eq!(field, "cpu_field");
            assert_eq!(pattern_idx, 0);
        }
        other => panic!("expected FieldTooWide, got {other:?}"),
    }
    assert!(matches!(
        builder.append_encoded_field_bit("cpu_field", u32::MAX, 1),
        Err(BuilderError::FieldTooWide { .. })
    ));

    builder.append_encoded_field_bit("cpu_field", 29, 0).unwrap();
    let database = builder.build().unwrap();
    assert_eq!(database.get_field_bit_length(0, "cpu_field"), Some(32));
}

#[test]
fn test_add_image() {
    let mut builder = create_test_builder();
    assert_eq!(
        builder
            .add_image(3, "PVT", ImageTarget::ExistingPattern(1))
            .unwrap(),
        1
    );
    assert_eq!(
        builder
            .add_image(4, "MP", ImageTarget::NewPattern(EncodingScheme::Base8192))
            .unwrap(),
        2
    );
    let database = builder.build().unwrap();
    assert_eq!(database.get_pattern_index(3), Some(1));
    assert_eq!(database.get_pattern_index(4), Some(2));
    assert_eq!(database.get_pattern(4).unwrap().total_bit_length(), 0);
}

#[test]
fn test_add_image_refusals() {
    let mut builder = create_test_builder();
    assert!(matches!(
        builder.add_image(16, "MP", ImageTarget::ExistingPattern(0)),
        Err(BuilderError::ImageIdOutOfRange { image_id: 16 })
    ));
    assert!(matches!(
        builder.add_image(2, "MP", ImageTarget::ExistingPattern(0)),
        Err(BuilderError::ImageIdExists { image_id: 2 })
    ));
    assert!(matches!(
        builder.add_image(3, "EVT", ImageTarget::ExistingPattern(0)),
        Err(BuilderError::ImageNameExists { name }) if name == "EVT"
    ));
    assert!(matches!(
        builder.add_image(3, "PVT", ImageTarget::ExistingPattern(5)),
        Err(BuilderError::PatternNotFound { pattern_idx: 5 })
    ));
}

#[test]
fn test_replace_rules() {
    let mut builder = create_test_builder();
    builder.replace_rules(Vec::new());
    let database = builder.build().unwrap();
    assert!(database.raw_rules().is_empty());
}

#[test]
fn test_build_validates_draft() {
    // Images bound to empty patterns are a valid draft.
    let mut builder = DatabaseBuilder::new("PROJ");
    builder
        .add_image(0, "PROTO", ImageTarget::NewPattern(EncodingScheme::Base32))
        .unwrap();
    builder
        .add_image(2, "EVT", ImageTarget::NewPattern(EncodingScheme::Base32))
        .unwrap();
    assert!(builder.clone().build().is_ok());

    let builder = DatabaseBuilder::new("my project");
    assert!(matches!(
        builder.build(),
        Err(BuilderError::Validation(DatabaseSchemaError::InvalidSection { section, .. }))
            if section == "project"
    ));
}
