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

// src/database/builder.rs
// DatabaseBuilder derives a new database from an existing one. It owns
// a private draft that callers can only change through the operations
// below; build() validates the draft and hands back an immutable
// Database, so a half-applied set of changes never escapes.

use indexmap::IndexMap;

use crate::database::component::Component;
use crate::database::database::Database;
use crate::database::encoded_field::{Combination, EncodedField, bit_length_for_index};
use crate::database::error::{BuilderError, BuilderResult};
use crate::database::pattern::{
    EncodingScheme, MAX_FIELD_BIT_LENGTH, MAX_IMAGE_ID, Pattern, PatternField,
};
use crate::rule::rule::Rule;

// ImageTarget says which pattern a new image id is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageTarget {
    // ExistingPattern shares the bit layout of an existing pattern.
    ExistingPattern(usize),
    // NewPattern starts a new, initially empty, pattern.
    NewPattern(EncodingScheme),
}

#[derive(Debug, Clone)]
pub struct DatabaseBuilder {
    draft: Database,
}

impl DatabaseBuilder {
    // new creates a builder for an empty database of the given project.
    pub fn new<P: Into<String>>(project: P) -> Self {
        Self {
            draft: Database {
                project: project.into(),
                checksum: None,
                image_ids: Default::default(),
                patterns: Vec::new(),
                encoded_fields: IndexMap::new(),
                components: IndexMap::new(),
                rules: Vec::new(),
            },
        }
    }

    // from_database creates a builder whose draft starts as a copy
    // of an existing database.
    pub fn from_database(database: &Database) -> Self {
        Self {
            draft: database.clone(),
        }
    }

    pub fn project(&self) -> &str {
        &self.draft.project
    }

    // add_component adds a new component to a class, creating the
    // class if needed.
    pub fn add_component<C: Into<String>, N: Into<String>>(
        &mut self,
        class: C,
        name: N,
        component: Component,
    ) -> BuilderResult<()> {
        let (class, name) = (class.into(), name.into());
        let items = self.draft.components.entry(class.clone()).or_default();
        if items.contains_key(&name) {
            return Err(BuilderError::ComponentExists { class, name });
        }
        tracing::debug!(class = %class, name = %name, status = %component.status, "Adding component");
        items.insert(name, component);
        Ok(())
    }

    // update_component replaces the attributes of an existing component
    // and optionally renames it. A renamed component keeps its position
    // within the class, and every combination naming it is updated.
    pub fn update_component(
        &mut self,
        class: &str,
        old_name: &str,
        new_name: &str,
        component: Component,
    ) -> BuilderResult<()> {
        let not_found = || BuilderError::ComponentNotFound {
            class: class.to_string(),
            name: old_name.to_string(),
        };
        let items = self.draft.components.get_mut(class).ok_or_else(not_found)?;
        if !items.contains_key(old_name) {
            return Err(not_found());
        }

        if old_name == new_name {
            items.insert(new_name.to_string(), component);
            tracing::debug!(class = %class, name = %new_name, "Updated component");
            return Ok(());
        }

        if items.contains_key(new_name) {
            return Err(BuilderError::ComponentExists {
                class: class.to_string(),
                name: new_name.to_string(),
            });
        }
        let mut component = Some(component);
        *items = std::mem::take(items)
            .into_iter()
            .map(|(name, existing)| {
                if name == old_name {
                    (new_name.to_string(), component.take().unwrap_or(existing))
                } else {
                    (name, existing)
                }
            })
            .collect();

        for field in self.draft.encoded_fields.values_mut() {
            for combination in field.combinations_mut() {
                combination.rename_component(class, old_name, new_name);
            }
        }
        tracing::debug!(class = %class, old_name = %old_name, new_name = %new_name, "Renamed component");
        Ok(())
    }

    fn check_components_exist(&self, class: &str, names: &[String]) -> BuilderResult<()> {
        match names
            .iter()
            .find(|name| self.draft.get_component(class, name).is_none())
        {
            Some(missing) => Err(BuilderError::ComponentNotFound {
                class: class.to_string(),
                name: missing.clone(),
            }),
            None => Ok(()),
        }
    }

    // add_new_encoded_field creates an encoded field covering a single
    // class, with the given components as its index 0 combination.
    pub fn add_new_encoded_field(
        &mut self,
        field: &str,
        class: &str,
        names: &[String],
    ) -> BuilderResult<()> {
        if self.draft.encoded_fields.contains_key(field) {
            return Err(BuilderError::EncodedFieldExists {
                field: field.to_string(),
            });
        }
        self.check_components_exist(class, names)?;
        let combination = Combination::new().with(class, names.iter().cloned());
        self.draft.encoded_fields.insert(
            field.to_string(),
            EncodedField::new().with_combination(0, combination),
        );
        tracing::debug!(field = %field, class = %class, "Added encoded field");
        Ok(())
    }

    // add_encoded_field_components adds a new combination to a field
    // that covers exactly the given class, returning its index.
    pub fn add_encoded_field_components(
        &mut self,
        field: &str,
        class: &str,
        names: &[String],
    ) -> BuilderResult<u32> {
        self.check_components_exist(class, names)?;
        let encoded_field = self.draft.encoded_fields.get_mut(field).ok_or_else(|| {
            BuilderError::EncodedFieldNotFound {
                field: field.to_string(),
            }
        })?;
        let classes = encoded_field.classes();
        if classes.len() != 1 || !classes.contains(class) {
            return Err(BuilderError::ClassMismatch {
                field: field.to_string(),
                class: class.to_string(),
            });
        }

        let combination = Combination::new().with(class, names.iter().cloned());
        if let Some(index) = encoded_field.contains_combination(&combination) {
            return Err(BuilderError::DuplicateCombination {
                field: field.to_string(),
                index,
            });
        }
        let index = encoded_field.next_index();
        encoded_field.insert(index, combination);
        tracing::debug!(field = %field, index, "Added encoded field combination");
        Ok(index)
    }

    fn pattern_mut(&mut self, field: &str, pattern_idx: usize) -> BuilderResult<&mut Pattern> {
        if !self.draft.encoded_fields.contains_key(field) {
            return Err(BuilderError::EncodedFieldNotFound {
                field: field.to_string(),
            });
        }
        self.draft
            .patterns
            .get_mut(pattern_idx)
            .ok_or(BuilderError::PatternNotFound { pattern_idx })
    }

    // fill_encoded_field_bit appends just enough bits for a field to a
    // pattern so that its highest index can be encoded. Returns the
    // number of bits appended, which is 0 if the pattern is already
    // wide enough.
    pub fn fill_encoded_field_bit(&mut self, field: &str, pattern_idx: usize) -> BuilderResult<u32> {
        let required = self
            .draft
            .encoded_fields
            .get(field)
            .and_then(EncodedField::max_index)
            .map_or(0, bit_length_for_index);
        let pattern = self.pattern_mut(field, pattern_idx)?;
        let current = pattern.field_bit_length(field);
        if required <= current {
            return Ok(0);
        }
        let appended = required - current;
        pattern.fields.push(PatternField::new(field, appended));
        tracing::debug!(field = %field, pattern_idx, bits = appended, "Filled encoded field bits");
        Ok(appended)
    }

    // append_encoded_field_bit appends an entry of bit_length bits for
    // a field at the end of a pattern.
    pub fn append_encoded_field_bit(
        &mut self,
        field: &str,
        bit_length: u32,
        pattern_idx: usize,
    ) -> BuilderResult<()> {
        if bit_length == 0 {
            return Err(BuilderError::InvalidBitLength {
                field: field.to_string(),
            });
        }
        let pattern = self.pattern_mut(field, pattern_idx)?;
        let width = u64::from(pattern.field_bit_length(field)) + u64::from(bit_length);
        if width > u64::from(MAX_FIELD_BIT_LENGTH) {
            return Err(BuilderError::FieldTooWide {
                field: field.to_string(),
                pattern_idx,
            });
        }
        pattern.fields.push(PatternField::new(field, bit_length));
        tracing::debug!(field = %field, pattern_idx, bits = bit_length, "Appended encoded field bits");
        Ok(())
    }

    // add_image adds a new image id, bound either to an existing
    // pattern or to a new one. Returns the pattern index it ended up
    // bound to.
    pub fn add_image<N: Into<String>>(
        &mut self,
        image_id: u8,
        name: N,
        target: ImageTarget,
    ) -> BuilderResult<usize> {
        let name = name.into();
        if image_id > MAX_IMAGE_ID {
            return Err(BuilderError::ImageIdOutOfRange { image_id });
        }
        if self.draft.image_ids.contains_key(&image_id) {
            return Err(BuilderError::ImageIdExists { image_id });
        }
        if self.draft.image_ids.values().any(|existing| *existing == name) {
            return Err(BuilderError::ImageNameExists { name });
        }

        let pattern_idx = match target {
            ImageTarget::ExistingPattern(pattern_idx) => {
                self.draft
                    .patterns
                    .get_mut(pattern_idx)
                    .ok_or(BuilderError::PatternNotFound { pattern_idx })?
                    .image_ids
                    .push(image_id);
                pattern_idx
            }
            ImageTarget::NewPattern(encoding_scheme) => {
                self.draft
                    .patterns
                    .push(Pattern::new(encoding_scheme).with_image_id(image_id));
                self.draft.patterns.len() - 1
            }
        };
        tracing::debug!(image_id, name = %name, pattern_idx, "Added image id");
        self.draft.image_ids.insert(image_id, name);
        Ok(pattern_idx)
    }

    // replace_rules replaces the whole rule list.
    pub fn replace_rules(&mut self, rules: Vec<Rule>) {
        tracing::debug!(count = rules.len(), "Replacing rules");
        self.draft.rules = rules;
    }

    // build validates the draft and returns it as a finished database.
    // The stored checksum is dropped, since it only describes the
    // document the original database was loaded from.
    pub fn build(self) -> BuilderResult<Database> {
        let mut database = self.draft;
        database.checksum = None;
        database.validate()?;
        Ok(database)
    }
}
