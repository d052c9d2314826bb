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

use libhwid::change_unit::error::SchemaChangeRejectedError;
use libhwid::change_unit::extract::extract_change_units;
use libhwid::change_unit::unit::{ChangeUnit, Growth};
use libhwid::database::builder::ImageTarget;
use libhwid::database::component::{Component, SupportStatus};
use libhwid::database::database::Database;
use libhwid::database::pattern::{EncodingScheme, PatternField};

#[path = "../common/mod.rs"]
mod common;

use common::{
    add_combinations, create_edited_database, create_grown_database, create_test_builder,
    create_test_database,
};

fn rejection(new: &Database) -> SchemaChangeRejectedError {
    extract_change_units(&create_test_database(), new).expect_err("change should be rejected")
}

// summary reduces combination additions to (field, first name, growth).
fn combination_summary(units: &[ChangeUnit]) -> Vec<(String, String, Vec<(usize, Growth)>)> {
    units
        .iter()
        .filter_map(|unit| match unit {
            ChangeUnit::AddEncodingCombination {
                field,
                combination,
                pattern_growth,
                ..
            } => {
                let (_, names) = combination.iter().next()?;
                Some((
                    field.clone(),
                    names.first().cloned().unwrap_or_default(),
                    pattern_growth.clone(),
                ))
            }
            _ => None,
        })
        .collect()
}

#[test]
fn test_identical_databases() {
    let database = create_test_database();
    assert!(extract_change_units(&database, &database).unwrap().is_empty());
}

#[test]
fn test_component_additions_and_ordered_growth() {
    let units = extract_change_units(&create_test_database(), &create_grown_database()).unwrap();

    let added: Vec<String> = units
        .iter()
        .filter_map(|unit| match unit {
            ChangeUnit::CompChange {
                old_name: None,
                new_name,
                ..
            } => Some(new_name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(added, vec!["cpu_6", "cpu_7", "cpu_8", "dram_2"]);

    // cpu_8 needs the cpu bit, which sits behind the dram bit, so the
    // dram addition has to be replayed first.
    assert_eq!(
        combination_summary(&units),
        vec![
            ("cpu_field".to_string(), "cpu_6".to_string(), vec![]),
            ("cpu_field".to_string(), "cpu_7".to_string(), vec![]),
            ("dram_field".to_string(), "dram_2".to_string(), vec![(0, Growth::Fill)]),
            ("cpu_field".to_string(), "cpu_8".to_string(), vec![(0, Growth::Fill)]),
        ]
    );
    assert_eq!(units.len(), 8);
}

#[test]
fn test_new_encoded_field() {
    let mut builder = create_test_builder();
    builder
        .add_component("touchpad", "touchpad_0", Component::new().with_value("id", "0"))
        .unwrap();
    builder
        .add_new_encoded_field("touchpad_field", "touchpad", &["touchpad_0".to_string()])
        .unwrap();
    add_combinations(&mut builder, "touchpad_field", "touchpad", &["touchpad_1"]);
    builder.append_encoded_field_bit("touchpad_field", 1, 0).unwrap();
    let new = builder.build().unwrap();

    let units = extract_change_units(&create_test_database(), &new).unwrap();
    assert_eq!(units.len(), 4);
    assert!(matches!(
        &units[2],
        ChangeUnit::AddEncodingCombination { field, is_first: true, pattern_growth, .. }
            if field == "touchpad_field" && pattern_growth.is_empty()
    ));
    assert!(matches!(
        &units[3],
        ChangeUnit::AddEncodingCombination { is_first: false, pattern_growth, .. }
            if *pattern_growth == vec![(0, Growth::Fill)]
    ));
}

#[test]
fn test_wide_append_is_kept() {
    // Two bits for a field that needs one are replayed as an append.
    let mut builder = create_test_builder();
    add_combinations(&mut builder, "cpu_field", "cpu", &["cpu_6"]);
    builder.append_encoded_field_bit("cpu_field", 2, 1).unwrap();
    let new = builder.build().unwrap();

    let units = extract_change_units(&create_test_database(), &new).unwrap();
    assert_eq!(
        combination_summary(&units),
        vec![("cpu_field".to_string(), "cpu_6".to_string(), vec![(1, Growth::Append(2))])]
    );
}

#[test]
fn test_component_rename_and_status_upgrade() {
    let database = create_test_database();
    let mut builder = create_test_builder();
    let cpu_3 = database.get_component("cpu", "cpu_3").cloned().unwrap();
    builder
        .update_component("cpu", "cpu_3", "cpu_3_b", cpu_3.clone())
        .unwrap();
    let retired = cpu_3.clone().with_status(SupportStatus::Unsupported);
    builder
        .update_component("cpu", "cpu_0", "cpu_0", retired.clone())
        .unwrap();
    let new = builder.build().unwrap();

    let units = extract_change_units(&database, &new).unwrap();
    assert_eq!(
        units,
        vec![
            ChangeUnit::CompChange {
                class: "cpu".to_string(),
                old_name: Some("cpu_0".to_string()),
                new_name: "cpu_0".to_string(),
                component: retired,
            },
            ChangeUnit::CompChange {
                class: "cpu".to_string(),
                old_name: Some("cpu_3".to_string()),
                new_name: "cpu_3_b".to_string(),
                component: cpu_3,
            },
        ]
    );
}

#[test]
fn test_component_name_swap_rejected() {
    let swapped = create_edited_database(&[
        ("      camera_0:\n", "      camera_x:\n"),
        ("      camera_1:\n", "      camera_0:\n"),
        ("      camera_x:\n", "      camera_1:\n"),
        ("      camera: camera_0\n", "      camera: camera_x\n"),
        ("      camera: camera_1\n", "      camera: camera_0\n"),
        ("      camera: camera_x\n", "      camera: camera_1\n"),
    ]);
    assert_eq!(
        rejection(&swapped),
        SchemaChangeRejectedError::ComponentRenameCycle {
            class: "camera".to_string(),
            name: "camera_1".to_string(),
        }
    );
}

#[test]
fn test_chained_renames_are_ordered() {
    let database = create_test_database();
    let mut builder = create_test_builder();
    let camera_0 = database.get_component("camera", "camera_0").cloned().unwrap();
    let camera_1 = database.get_component("camera", "camera_1").cloned().unwrap();
    builder
        .update_component("camera", "camera_1", "camera_2", camera_1)
        .unwrap();
    builder
        .update_component("camera", "camera_0", "camera_1", camera_0)
        .unwrap();
    let new = builder.build().unwrap();

    // camera_1 has to be freed before camera_0 can take its name.
    let renames: Vec<(String, String)> = extract_change_units(&database, &new)
        .unwrap()
        .into_iter()
        .filter_map(|unit| match unit {
            ChangeUnit::CompChange {
                old_name: Some(old_name),
                new_name,
                ..
            } => Some((old_name, new_name)),
            _ => None,
        })
        .collect();
    assert_eq!(
        renames,
        vec![
            ("camera_1".to_string(), "camera_2".to_string()),
            ("camera_0".to_string(), "camera_1".to_string()),
        ]
    );
}

#[test]
fn test_new_images() {
    let mut builder = create_test_builder();
    builder
        .add_image(3, "PVT", ImageTarget::ExistingPattern(1))
        .unwrap();
    builder
        .add_image(4, "MP", ImageTarget::NewPattern(EncodingScheme::Base8192))
        .unwrap();
    builder.append_encoded_field_bit("cpu_field", 3, 2).unwrap();
    builder.append_encoded_field_bit("dram_field", 1, 2).unwrap();
    let new = builder.build().unwrap();

    let units = extract_change_units(&create_test_database(), &new).unwrap();
    assert_eq!(
        units,
        vec![
            ChangeUnit::NewImageIdToExistingEncodingPattern {
                image_id: 3,
                name: "PVT".to_string(),
                pattern_idx: 1,
            },
            ChangeUnit::NewImageIdToNewEncodingPattern {
                pattern_idx: 2,
                images: vec![(4, "MP".to_string())],
                encoding_scheme: EncodingScheme::Base8192,
                fields: vec![
                    PatternField::new("cpu_field", 3),
                    PatternField::new("dram_field", 1),
                ],
            },
        ]
    );
}

#[test]
fn test_rules_replaced() {
    let mut builder = create_test_builder();
    builder.replace_rules(Vec::new());
    let new = builder.build().unwrap();
    assert_eq!(
        extract_change_units(&create_test_database(), &new).unwrap(),
        vec![ChangeUnit::ReplaceRules { rules: Vec::new() }]
    );
}

#[test]
fn test_project_renamed() {
    let new = create_edited_database(&[("project: CHROMEBOOK", "project: LAPTOP")]);
    assert_eq!(
        rejection(&new),
        SchemaChangeRejectedError::ProjectRenamed {
            old: "CHROMEBOOK".to_string(),
            new: "LAPTOP".to_string(),
        }
    );
}

#[test]
fn test_pattern_removed() {
    let new = create_edited_database(&[
        ("  2: DVT\n", ""),
        (
            "- image_ids:\n  - 2\n  encoding_scheme: base8192\n  fields:\n  - cpu_field: 3\n  - dram_field: 1\n  - bluetooth_field: 1\n  - camera_field: 1\n  - storage_field: 2\n  - ro_main_firmware_field: 1\n  - mainboard_field: 1\n",
            "",
        ),
    ]);
    assert_eq!(
        rejection(&new),
        SchemaChangeRejectedError::PatternRemoved { old: 2, new: 1 }
    );
}

#[test]
fn test_component_removed() {
    let new = create_edited_database(&[
        ("    5:\n      cpu: cpu_5\n", ""),
        (
            "      cpu_5:\n        values:\n          model: !re 'Intel\\(R\\) Core\\(TM\\) i5-5.*'\n",
            "",
        ),
    ]);
    assert_eq!(
        rejection(&new),
        SchemaChangeRejectedError::ComponentRemoved {
            class: "cpu".to_string(),
            name: "cpu_5".to_string(),
        }
    );
}

#[test]
fn test_status_downgraded() {
    let mut builder = create_test_builder();
    let large = create_test_database()
        .get_component("battery", "battery_large")
        .cloned()
        .unwrap()
        .with_status(SupportStatus::Supported);
    builder
        .update_component("battery", "battery_large", "battery_large", large)
        .unwrap();
    assert_eq!(
        rejection(&builder.build().unwrap()),
        SchemaChangeRejectedError::StatusDowngraded {
            class: "battery".to_string(),
            name: "battery_large".to_string(),
            old: SupportStatus::Deprecated,
            new: SupportStatus::Supported,
        }
    );
}

#[test]
fn test_encoded_field_removed() {
    let new = create_edited_database(&[
        ("  - display_panel_field: 1\n", "  - panel_field: 1\n"),
        ("  display_panel_field:\n", "  panel_field:\n"),
    ]);
    assert_eq!(
        rejection(&new),
        SchemaChangeRejectedError::EncodedFieldRemoved {
            field: "display_panel_field".to_string(),
        }
    );
}

#[test]
fn test_classes_changed() {
    let new = create_edited_database(&[(
        "    0:\n      dram: dram_0\n    1:\n      dram: dram_1\n",
        "    0:\n      storage: storage_0\n    1:\n      storage: storage_1\n",
    )]);
    assert_eq!(
        rejection(&new),
        SchemaChangeRejectedError::ClassesChanged {
            field: "dram_field".to_string(),
        }
    );
}

#[test]
fn test_combination_changed() {
    let new = create_edited_database(&[("      cpu: cpu_5\n", "      cpu: cpu_4\n")]);
    assert_eq!(
        rejection(&new),
        SchemaChangeRejectedError::CombinationChanged {
            field: "cpu_field".to_string(),
            index: 5,
        }
    );
}

#[test]
fn test_combination_removed() {
    let new = create_edited_database(&[("    5:\n      cpu: cpu_5\n", "")]);
    assert_eq!(
        rejection(&new),
        SchemaChangeRejectedError::CombinationRemoved {
            field: "cpu_field".to_string(),
            index: 5,
        }
    );
}

#[test]
fn test_non_sequential_index() {
    let new = create_edited_database(&[(
        "      cpu: cpu_5\n",
        "      cpu: cpu_5\n    7:\n      cpu: cpu_0\n",
    )]);
    assert_eq!(
        rejection(&new),
        SchemaChangeRejectedError::NonSequentialIndex {
            field: "cpu_field".to_string(),
            index: 7,
        }
    );
}

#[test]
fn test_multi_class_field_grown() {
    let new = create_edited_database(&[(
        "      mainboard: rev2\n",
        "      mainboard: rev2\n    2:\n      chassis: chassis_0\n      mainboard: rev1\n",
    )]);
    assert_eq!(
        rejection(&new),
        SchemaChangeRejectedError::MultiClassFieldGrown {
            field: "mainboard_field".to_string(),
        }
    );
}

#[test]
fn test_image_changes_rejected() {
    let renamed = create_edited_database(&[("  1: EVT\n", "  1: EVT2\n")]);
    assert_eq!(
        rejection(&renamed),
        SchemaChangeRejectedError::ImageIdRenamed {
            image_id: 1,
            old: "EVT".to_string(),
            new: "EVT2".to_string(),
        }
    );

    let removed = create_edited_database(&[("  1: EVT\n", ""), ("  - 0\n  - 1\n", "  - 0\n")]);
    assert_eq!(
        rejection(&removed),
        SchemaChangeRejectedError::ImageIdRemoved { image_id: 1 }
    );

    let moved = create_edited_database(&[
        ("- image_ids:\n  - 0\n  - 1\n", "- image_ids:\n  - 0\n"),
        ("- image_ids:\n  - 2\n", "- image_ids:\n  - 2\n  - 1\n"),
    ]);
    assert_eq!(
        rejection(&moved),
        SchemaChangeRejectedError::ImageIdMoved {
            image_id: 1,
            old: 0,
            new: 1,
        }
    );
}

#[test]
fn test_pattern_changes_rejected() {
    let rescheme = create_edited_database(&[(
        "  encoding_scheme: base8192\n",
        "  encoding_scheme: base32\n",
    )]);
    assert_eq!(
        rejection(&rescheme),
        SchemaChangeRejectedError::EncodingSchemeChanged {
            pattern_idx: 1,
            old: EncodingScheme::Base8192,
            new: EncodingScheme::Base32,
        }
    );

    let rewritten = create_edited_database(&[("  - battery_field: 2\n", "  - battery_field: 3\n")]);
    assert_eq!(
        rejection(&rewritten),
        SchemaChangeRejectedError::PatternRewritten { pattern_idx: 0 }
    );
}

#[test]
fn test_unattributed_bits() {
    let mut builder = create_test_builder();
    builder.append_encoded_field_bit("cpu_field", 1, 1).unwrap();
    assert_eq!(
        rejection(&builder.build().unwrap()),
        SchemaChangeRejectedError::UnattributedBits { pattern_idx: 1 }
    );

    // Bits for a field added in front of bits nothing needs.
    let mut builder = create_test_builder();
    add_combinations(&mut builder, "dram_field", "dram", &["dram_2"]);
    builder.append_encoded_field_bit("cpu_field", 1, 0).unwrap();
    builder.append_encoded_field_bit("dram_field", 1, 0).unwrap();
    assert_eq!(
        rejection(&builder.build().unwrap()),
        SchemaChangeRejectedError::UnattributedBits { pattern_idx: 0 }
    );
}
