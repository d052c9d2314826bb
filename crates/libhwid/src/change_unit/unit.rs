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

// src/change_unit/unit.rs

use std::fmt;

use crate::change_unit::error::ApplyChangeUnitError;
use crate::database::builder::{DatabaseBuilder, ImageTarget};
use crate::database::component::Component;
use crate::database::database::Database;
use crate::database::encoded_field::Combination;
use crate::database::error::BuilderError;
use crate::database::pattern::{EncodingScheme, PatternField};
use crate::rule::rule::Rule;

// Growth describes how a pattern grows when a combination is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Growth {
    // Fill appends exactly the bits the field is missing to encode
    // its highest index.
    Fill,
    // Append appends an entry of the given width.
    Append(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeUnit {
    // CompChange adds a component (old_name is None) or updates an
    // existing one, possibly renaming it.
    CompChange {
        class: String,
        old_name: Option<String>,
        new_name: String,
        component: Component,
    },
    // AddEncodingCombination adds a combination to an encoded field,
    // creating the field when is_first is set, and grows the given
    // patterns so they can encode it.
    AddEncodingCombination {
        field: String,
        is_first: bool,
        combination: Combination,
        pattern_growth: Vec<(usize, Growth)>,
    },
    NewImageIdToExistingEncodingPattern {
        image_id: u8,
        name: String,
        pattern_idx: usize,
    },
    // NewImageIdToNewEncodingPattern starts a new pattern for one or
    // more new image ids, with its full bit layout.
    NewImageIdToNewEncodingPattern {
        pattern_idx: usize,
        images: Vec<(u8, String)>,
        encoding_scheme: EncodingScheme,
        fields: Vec<PatternField>,
    },
    ReplaceRules {
        rules: Vec<Rule>,
    },
}

impl ChangeUnit {
    // apply replays the change on a builder.
    pub fn apply(&self, builder: &mut DatabaseBuilder) -> Result<(), ApplyChangeUnitError> {
        self.apply_inner(builder)
            .map_err(|source| ApplyChangeUnitError::new(self, source))
    }

    fn apply_inner(&self, builder: &mut DatabaseBuilder) -> Result<(), BuilderError> {
        match self {
            ChangeUnit::CompChange {
                class,
                old_name: None,
                new_name,
                component,
            } => builder.add_component(class.as_str(), new_name.as_str(), component.clone()),
            ChangeUnit::CompChange {
                class,
                old_name: Some(old_name),
                new_name,
                component,
            } => builder.update_component(class, old_name, new_name, component.clone()),
            ChangeUnit::AddEncodingCombination {
                field,
                is_first,
                combination,
                pattern_growth,
            } => {
                let mut entries = combination.iter();
                let (class, names) = match (entries.next(), entries.next()) {
                    (Some(entry), None) => entry,
                    _ => {
                        return Err(BuilderError::ClassMismatch {
                            field: field.clone(),
                            class: combination
                                .classes()
                                .into_iter()
                                .collect::<Vec<_>>()
                                .join(","),
                        });
                    }
                };
                if *is_first {
                    builder.add_new_encoded_field(field, class, names)?;
                } else {
                    builder.add_encoded_field_components(field, class, names)?;
                }
                for (pattern_idx, growth) in pattern_growth {
                    match growth {
                        Growth::Fill => {
                            builder.fill_encoded_field_bit(field, *pattern_idx)?;
                        }
                        Growth::Append(bit_length) => {
                            builder.append_encoded_field_bit(field, *bit_length, *pattern_idx)?
                        }
                    }
                }
                Ok(())
            }
            ChangeUnit::NewImageIdToExistingEncodingPattern {
                image_id,
                name,
                pattern_idx,
            } => builder
                .add_image(*image_id, name.as_str(), ImageTarget::ExistingPattern(*pattern_idx))
                .map(|_| ()),
            ChangeUnit::NewImageIdToNewEncodingPattern {
                pattern_idx,
                images,
                encoding_scheme,
                fields,
            } => {
                let mut images = images.iter();
                let Some((image_id, name)) = images.next() else {
                    return Err(BuilderError::PatternNotFound {
                        pattern_idx: *pattern_idx,
                    });
                };
                let created =
                    builder.add_image(*image_id, name.as_str(), ImageTarget::NewPattern(*encoding_scheme))?;
                if created != *pattern_idx {
                    return Err(BuilderError::PatternNotFound {
                        pattern_idx: *pattern_idx,
                    });
                }
                for (image_id, name) in images {
                    builder.add_image(*image_id, name.as_str(), ImageTarget::ExistingPattern(created))?;
                }
                for entry in fields {
                    builder.append_encoded_field_bit(&entry.name, entry.bit_length, created)?;
                }
                Ok(())
            }
            ChangeUnit::ReplaceRules { rules } => {
                builder.replace_rules(rules.clone());
                Ok(())
            }
        }
    }
}

impl fmt::Display for ChangeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeUnit::CompChange {
                class,
                old_name: None,
                new_name,
                component,
            } => write!(f, "CompChange(add {class}/{new_name}, {})", component.status),
            ChangeUnit::CompChange {
                class,
                old_name: Some(old_name),
                new_name,
                component,
            } if old_name == new_name => {
                write!(f, "CompChange(update {class}/{new_name}, {})", component.status)
            }
            ChangeUnit::CompChange {
                class,
                old_name: Some(old_name),
                new_name,
                ..
            } => write!(f, "CompChange(rename {class}/{old_name} to {new_name})"),
            ChangeUnit::AddEncodingCombination {
                field,
                is_first,
                combination,
                ..
            } => {
                let selection = combination
                    .iter()
                    .map(|(class, names)| format!("{class}=[{}]", names.join(",")))
                    .collect::<Vec<_>>()
                    .join(" ");
                let kind = if *is_first { "new field" } else { "add" };
                write!(f, "AddEncodingCombination({kind} {field}: {selection})")
            }
            ChangeUnit::NewImageIdToExistingEncodingPattern {
                image_id,
                name,
                pattern_idx,
            } => write!(
                f,
                "NewImageIdToExistingEncodingPattern({image_id} '{name}' -> pattern {pattern_idx})"
            ),
            ChangeUnit::NewImageIdToNewEncodingPattern {
                pattern_idx,
                images,
                ..
            } => {
                let images = images
                    .iter()
                    .map(|(image_id, name)| format!("{image_id} '{name}'"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "NewImageIdToNewEncodingPattern({images} -> pattern {pattern_idx})")
            }
            ChangeUnit::ReplaceRules { rules } => {
                write!(f, "ReplaceRules({} rules)", rules.len())
            }
        }
    }
}

// apply_change_units replays change units on a fresh draft of a
// database. The new database is only returned if every unit applies
// and the result validates.
pub fn apply_change_units(
    database: &Database,
    units: &[ChangeUnit],
) -> Result<Database, ApplyChangeUnitError> {
    let mut builder = DatabaseBuilder::from_database(database);
    for unit in units {
        tracing::debug!(unit = %unit, "Applying change unit");
        unit.apply(&mut builder)?;
    }
    let database = builder
        .build()
        .map_err(|source| ApplyChangeUnitError::new(&"build", source))?;
    tracing::info!(
        project = %database.project(),
        units = units.len(),
        "Applied change units"
    );
    Ok(database)
}
