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

// src/database/database.rs
// Database is the aggregate root of an HWID schema. Once loaded or
// built it is immutable value data: every accessor here is a read-only
// projection, and all changes go through the DatabaseBuilder so that
// they can be captured as change units.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use indexmap::IndexMap;

use crate::database::component::Component;
use crate::database::encoded_field::EncodedField;
use crate::database::error::{DatabaseResult, DatabaseSchemaError};
use crate::database::pattern::{MAX_FIELD_BIT_LENGTH, MAX_IMAGE_ID, Pattern};
use crate::rule::rule::Rule;

#[derive(Debug, Clone, PartialEq)]
pub struct Database {
    pub(crate) project: String,
    pub(crate) checksum: Option<String>,
    pub(crate) image_ids: BTreeMap<u8, String>,
    pub(crate) patterns: Vec<Pattern>,
    pub(crate) encoded_fields: IndexMap<String, EncodedField>,
    pub(crate) components: IndexMap<String, IndexMap<String, Component>>,
    pub(crate) rules: Vec<Rule>,
}

impl Database {
    // project returns the project (board) name, which prefixes
    // every HWID string encoded with this database.
    pub fn project(&self) -> &str {
        &self.project
    }

    // checksum returns the checksum stored in the persisted document
    // this database was loaded from, if any.
    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    pub fn image_ids(&self) -> &BTreeMap<u8, String> {
        &self.image_ids
    }

    pub fn get_image_name(&self, image_id: u8) -> Option<&str> {
        self.image_ids.get(&image_id).map(String::as_str)
    }

    // max_image_id returns the newest image id, which is the one
    // new HWIDs get unless a rule says otherwise.
    pub fn max_image_id(&self) -> Option<u8> {
        self.image_ids.keys().next_back().copied()
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn get_pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn get_pattern_by_index(&self, pattern_idx: usize) -> Option<&Pattern> {
        self.patterns.get(pattern_idx)
    }

    // get_pattern_index returns the index of the pattern bound
    // to the given image id.
    pub fn get_pattern_index(&self, image_id: u8) -> Option<usize> {
        self.patterns
            .iter()
            .position(|pattern| pattern.image_ids.contains(&image_id))
    }

    // get_pattern returns the pattern bound to the given image id.
    pub fn get_pattern(&self, image_id: u8) -> Option<&Pattern> {
        self.get_pattern_index(image_id)
            .and_then(|pattern_idx| self.patterns.get(pattern_idx))
    }

    // get_field_bit_length returns the number of bits the pattern of
    // an image id allocates to a field.
    pub fn get_field_bit_length(&self, image_id: u8, field: &str) -> Option<u32> {
        self.get_pattern(image_id)
            .map(|pattern| pattern.field_bit_length(field))
    }

    pub fn encoded_fields(&self) -> &IndexMap<String, EncodedField> {
        &self.encoded_fields
    }

    pub fn encoded_field_names(&self) -> Vec<&str> {
        self.encoded_fields.keys().map(String::as_str).collect()
    }

    pub fn get_encoded_field(&self, field: &str) -> Option<&EncodedField> {
        self.encoded_fields.get(field)
    }

    // get_component_classes returns the classes covered by an
    // encoded field, or an empty set for an unknown field.
    pub fn get_component_classes(&self, field: &str) -> BTreeSet<&str> {
        self.encoded_fields
            .get(field)
            .map(EncodedField::classes)
            .unwrap_or_default()
    }

    // get_fields_for_class returns the encoded fields covering a class.
    pub fn get_fields_for_class(&self, class: &str) -> Vec<&str> {
        self.encoded_fields
            .iter()
            .filter(|(_, field)| field.classes().contains(class))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    // component_classes returns every class with at least one
    // component defined, in document order.
    pub fn component_classes(&self) -> Vec<&str> {
        self.components.keys().map(String::as_str).collect()
    }

    // encoded_classes returns every class covered by any encoded field.
    pub fn encoded_classes(&self) -> BTreeSet<&str> {
        self.encoded_fields
            .values()
            .flat_map(EncodedField::classes)
            .collect()
    }

    pub fn get_components(&self, class: &str) -> Option<&IndexMap<String, Component>> {
        self.components.get(class)
    }

    pub fn get_component(&self, class: &str, name: &str) -> Option<&Component> {
        self.components
            .get(class)
            .and_then(|components| components.get(name))
    }

    // raw_rules returns the rules in evaluation order, each keeping
    // the original text of its expressions.
    pub fn raw_rules(&self) -> &[Rule] {
        &self.rules
    }

    // validate checks every invariant a database must satisfy. It runs
    // when a document is loaded and when a builder draft is finalized.
    pub fn validate(&self) -> DatabaseResult<()> {
        self.validate_project()?;
        self.validate_image_ids()?;
        self.validate_encoded_fields()?;
        self.validate_patterns()?;
        Ok(())
    }

    fn validate_project(&self) -> DatabaseResult<()> {
        if self.project.is_empty() || self.project.chars().any(char::is_whitespace) {
            return Err(DatabaseSchemaError::invalid_section(
                "project",
                format!("'{}' is not a valid project name", self.project),
            ));
        }
        Ok(())
    }

    fn validate_image_ids(&self) -> DatabaseResult<()> {
        let mut seen_names = BTreeSet::new();
        for (image_id, name) in &self.image_ids {
            if *image_id > MAX_IMAGE_ID {
                return Err(DatabaseSchemaError::invalid_image_id(
                    u64::from(*image_id),
                    format!("exceeds the maximum image id {MAX_IMAGE_ID}"),
                ));
            }
            if !seen_names.insert(name.as_str()) {
                return Err(DatabaseSchemaError::invalid_image_id(
                    u64::from(*image_id),
                    format!("duplicate image name '{name}'"),
                ));
            }
        }

        let mut bound: HashMap<u8, usize> = HashMap::new();
        for (pattern_idx, pattern) in self.patterns.iter().enumerate() {
            if pattern.image_ids.is_empty() {
                return Err(DatabaseSchemaError::invalid_section(
                    "pattern",
                    format!("pattern {pattern_idx} is not bound to any image id"),
                ));
            }
            for image_id in &pattern.image_ids {
                if !self.image_ids.contains_key(image_id) {
                    return Err(DatabaseSchemaError::invalid_image_id(
                        u64::from(*image_id),
                        format!("listed by pattern {pattern_idx} but not defined"),
                    ));
                }
                if let Some(previous) = bound.insert(*image_id, pattern_idx) {
                    return Err(DatabaseSchemaError::invalid_image_id(
                        u64::from(*image_id),
                        format!("bound to both pattern {previous} and pattern {pattern_idx}"),
                    ));
                }
            }
        }

        if let Some(unbound) = self.image_ids.keys().find(|id| !bound.contains_key(id)) {
            return Err(DatabaseSchemaError::invalid_image_id(
                u64::from(*unbound),
                "not bound to any pattern",
            ));
        }
        Ok(())
    }

    fn validate_encoded_fields(&self) -> DatabaseResult<()> {
        for (field_name, field) in &self.encoded_fields {
            let Some(default) = field.get(0) else {
                return Err(DatabaseSchemaError::MissingDefaultIndex {
                    field: field_name.clone(),
                });
            };
            let classes = default.classes();
            for (index, combination) in field.combinations() {
                if combination.classes() != classes {
                    return Err(DatabaseSchemaError::InconsistentClasses {
                        field: field_name.clone(),
                        index: *index,
                    });
                }
                for (class, names) in combination.iter() {
                    for name in names {
                        if self.get_component(class, name).is_none() {
                            return Err(DatabaseSchemaError::UndefinedComponent {
                                field: field_name.clone(),
                                index: *index,
                                class: class.clone(),
                                name: name.clone(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_patterns(&self) -> DatabaseResult<()> {
        for (pattern_idx, pattern) in self.patterns.iter().enumerate() {
            let mut widths: HashMap<&str, u64> = HashMap::new();
            for entry in &pattern.fields {
                if !self.encoded_fields.contains_key(&entry.name) {
                    return Err(DatabaseSchemaError::UndefinedEncodedField {
                        pattern_idx,
                        field: entry.name.clone(),
                    });
                }
                if entry.bit_length == 0 {
                    return Err(DatabaseSchemaError::invalid_section(
                        "pattern",
                        format!(
                            "pattern {pattern_idx} allocates zero bits to '{}'",
                            entry.name
                        ),
                    ));
                }
                let width = widths.entry(entry.name.as_str()).or_insert(0);
                *width += u64::from(entry.bit_length);
                if *width > u64::from(MAX_FIELD_BIT_LENGTH) {
                    return Err(DatabaseSchemaError::invalid_section(
                        "pattern",
                        format!(
                            "pattern {pattern_idx} allocates more than {MAX_FIELD_BIT_LENGTH} bits to '{}'",
                            entry.name
                        ),
                    ));
                }
            }
        }
        Ok(())
    }
}
