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

// src/change_unit/extract.rs
// Extracts the change units that turn one database into another, and
// rejects changes that would alter how existing HWIDs decode.
//
// Combination additions are ordered so that replaying them grows every
// existing pattern exactly as in the new database: each pattern's
// appended entries are walked with a cursor, and a combination is only
// emitted once every entry in front of its own has been accounted for.

use std::collections::{BTreeSet, HashMap, VecDeque};

use indexmap::IndexMap;

use crate::change_unit::error::{ExtractResult, SchemaChangeRejectedError};
use crate::change_unit::unit::{ChangeUnit, Growth};
use crate::database::component::Component;
use crate::database::database::Database;
use crate::database::encoded_field::{Combination, bit_length_for_index};
use crate::database::pattern::PatternField;

// extract_change_units returns the change units that turn old into
// new, in the order they have to be applied.
pub fn extract_change_units(old: &Database, new: &Database) -> ExtractResult<Vec<ChangeUnit>> {
    if old.project() != new.project() {
        return Err(SchemaChangeRejectedError::ProjectRenamed {
            old: old.project().to_string(),
            new: new.project().to_string(),
        });
    }
    if new.get_pattern_count() < old.get_pattern_count() {
        return Err(SchemaChangeRejectedError::PatternRemoved {
            old: old.get_pattern_count(),
            new: new.get_pattern_count(),
        });
    }

    let mut units = extract_component_changes(old, new)?;
    let pending = extract_combinations(old, new)?;
    let image_units = extract_images(old, new)?;
    units.extend(order_combinations(old, new, pending)?);
    units.extend(image_units);
    if old.raw_rules() != new.raw_rules() {
        units.push(ChangeUnit::ReplaceRules {
            rules: new.raw_rules().to_vec(),
        });
    }

    tracing::info!(
        project = %new.project(),
        units = units.len(),
        "Extracted change units"
    );
    Ok(units)
}

fn extract_component_changes(old: &Database, new: &Database) -> ExtractResult<Vec<ChangeUnit>> {
    let mut units = Vec::new();
    let no_items: IndexMap<String, Component> = IndexMap::new();

    for (class, old_items) in &old.components {
        let new_items = new.components.get(class).unwrap_or(&no_items);
        let mut updates = Vec::new();
        for (position, (old_name, old_component)) in old_items.iter().enumerate() {
            let Some((new_name, new_component)) = new_items.get_index(position) else {
                return Err(SchemaChangeRejectedError::ComponentRemoved {
                    class: class.clone(),
                    name: old_name.clone(),
                });
            };
            if new_component.status < old_component.status {
                return Err(SchemaChangeRejectedError::StatusDowngraded {
                    class: class.clone(),
                    name: new_name.clone(),
                    old: old_component.status,
                    new: new_component.status,
                });
            }
            if new_name != old_name || new_component != old_component {
                updates.push(ChangeUnit::CompChange {
                    class: class.clone(),
                    old_name: Some(old_name.clone()),
                    new_name: new_name.clone(),
                    component: new_component.clone(),
                });
            }
        }
        units.extend(order_renames(class, updates)?);
    }

    for (class, new_items) in &new.components {
        let existing = old.components.get(class).map_or(0, IndexMap::len);
        for (name, component) in new_items.iter().skip(existing) {
            units.push(ChangeUnit::CompChange {
                class: class.clone(),
                old_name: None,
                new_name: name.clone(),
                component: component.clone(),
            });
        }
    }
    Ok(units)
}

// order_renames orders the updates of one class so that no rename
// takes a name another component still holds. Renames that form a
// cycle, such as two components swapping names, can't be replayed one
// at a time and are rejected.
fn order_renames(class: &str, mut pending: Vec<ChangeUnit>) -> ExtractResult<Vec<ChangeUnit>> {
    let held_by_other = |pending: &[ChangeUnit], unit: &ChangeUnit| {
        let ChangeUnit::CompChange {
            old_name: Some(old_name),
            new_name,
            ..
        } = unit
        else {
            return false;
        };
        new_name != old_name
            && pending.iter().any(|other| {
                matches!(other, ChangeUnit::CompChange { old_name: Some(held), .. } if held == new_name)
            })
    };

    let mut ordered = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let Some(next) = pending.iter().position(|unit| !held_by_other(pending.as_slice(), unit)) else {
            let name = match &pending[0] {
                ChangeUnit::CompChange { new_name, .. } => new_name.clone(),
                _ => String::new(),
            };
            return Err(SchemaChangeRejectedError::ComponentRenameCycle {
                class: class.to_string(),
                name,
            });
        };
        ordered.push(pending.remove(next));
    }
    Ok(ordered)
}

// combination_identity identifies a combination by the positions of
// its components, which survive renames.
fn combination_identity(database: &Database, combination: &Combination) -> BTreeSet<(String, Option<usize>)> {
    combination
        .iter()
        .flat_map(|(class, names)| {
            let items = database.components.get(class);
            names.iter().map(move |name| {
                (
                    class.clone(),
                    items.and_then(|items| items.get_index_of(name)),
                )
            })
        })
        .collect()
}

struct PendingCombination {
    index: u32,
    is_first: bool,
    combination: Combination,
}

// extract_combinations checks existing combinations are unchanged and
// collects the added ones, keyed by field in the new database's order.
fn extract_combinations(
    old: &Database,
    new: &Database,
) -> ExtractResult<IndexMap<String, VecDeque<PendingCombination>>> {
    for (field, old_field) in old.encoded_fields() {
        let Some(new_field) = new.get_encoded_field(field) else {
            return Err(SchemaChangeRejectedError::EncodedFieldRemoved {
                field: field.clone(),
            });
        };
        if old_field.classes() != new_field.classes() {
            return Err(SchemaChangeRejectedError::ClassesChanged {
                field: field.clone(),
            });
        }
        for (index, old_combination) in old_field.combinations() {
            let Some(new_combination) = new_field.get(*index) else {
                return Err(SchemaChangeRejectedError::CombinationRemoved {
                    field: field.clone(),
                    index: *index,
                });
            };
            if combination_identity(old, old_combination) != combination_identity(new, new_combination) {
                return Err(SchemaChangeRejectedError::CombinationChanged {
                    field: field.clone(),
                    index: *index,
                });
            }
        }
    }

    let mut pending = IndexMap::new();
    for (field, new_field) in new.encoded_fields() {
        let old_field = old.get_encoded_field(field);
        let mut expected = old_field.map_or(0, |old_field| old_field.next_index());
        let mut added = VecDeque::new();
        for (index, combination) in new_field.combinations() {
            if old_field.is_some_and(|old_field| old_field.get(*index).is_some()) {
                continue;
            }
            if *index != expected {
                return Err(SchemaChangeRejectedError::NonSequentialIndex {
                    field: field.clone(),
                    index: *index,
                });
            }
            if new_field.classes().len() != 1 {
                return Err(SchemaChangeRejectedError::MultiClassFieldGrown {
                    field: field.clone(),
                });
            }
            added.push_back(PendingCombination {
                index: *index,
                is_first: old_field.is_none() && *index == 0,
                combination: combination.clone(),
            });
            expected += 1;
        }
        if !added.is_empty() {
            pending.insert(field.clone(), added);
        }
    }
    Ok(pending)
}

// PatternTail tracks how much of the entries appended to an existing
// pattern has been attributed to emitted combinations.
struct PatternTail<'a> {
    pattern_idx: usize,
    entries: &'a [PatternField],
    cursor: usize,
    widths: HashMap<String, u32>,
}

enum Step {
    Blocked,
    Skip,
    Consume {
        growth: Vec<Growth>,
        consumed: usize,
        bits: u32,
    },
}

impl PatternTail<'_> {
    fn width(&self, field: &str) -> u32 {
        self.widths.get(field).copied().unwrap_or(0)
    }

    // plan decides what adding a combination at index does to this
    // pattern. The entries at the cursor are consumed when the field
    // needs more bits, or when this is the field's last addition and
    // the entries would be left over otherwise.
    fn plan(&self, field: &str, index: u32, is_last: bool) -> Step {
        let width = self.width(field);
        let required = bit_length_for_index(index);
        let remaining = &self.entries[self.cursor..];
        let run: Vec<&PatternField> = remaining
            .iter()
            .take_while(|entry| entry.name == field)
            .collect();

        if !run.is_empty() && (width < required || is_last) {
            let bits: u32 = run.iter().map(|entry| entry.bit_length).sum();
            let growth = if run.len() == 1 && width < required && run[0].bit_length == required - width {
                vec![Growth::Fill]
            } else {
                run.iter().map(|entry| Growth::Append(entry.bit_length)).collect()
            };
            return Step::Consume {
                growth,
                consumed: run.len(),
                bits,
            };
        }
        if (width < required || is_last) && remaining.iter().any(|entry| entry.name == field) {
            return Step::Blocked;
        }
        Step::Skip
    }
}

fn order_combinations(
    old: &Database,
    new: &Database,
    mut pending: IndexMap<String, VecDeque<PendingCombination>>,
) -> ExtractResult<Vec<ChangeUnit>> {
    let mut tails = Vec::with_capacity(old.get_pattern_count());
    for (pattern_idx, (old_pattern, new_pattern)) in old.patterns().iter().zip(new.patterns()).enumerate() {
        if old_pattern.encoding_scheme != new_pattern.encoding_scheme {
            return Err(SchemaChangeRejectedError::EncodingSchemeChanged {
                pattern_idx,
                old: old_pattern.encoding_scheme,
                new: new_pattern.encoding_scheme,
            });
        }
        if !new_pattern.fields.starts_with(&old_pattern.fields) {
            return Err(SchemaChangeRejectedError::PatternRewritten { pattern_idx });
        }
        let mut widths = HashMap::new();
        for entry in &old_pattern.fields {
            *widths.entry(entry.name.clone()).or_insert(0) += entry.bit_length;
        }
        tails.push(PatternTail {
            pattern_idx,
            entries: &new_pattern.fields[old_pattern.fields.len()..],
            cursor: 0,
            widths,
        });
    }

    let mut units = Vec::new();
    while !pending.is_empty() {
        let mut blocked_at = None;
        let mut chosen = None;
        for (field, queue) in &pending {
            let Some(head) = queue.front() else {
                continue;
            };
            let is_last = queue.len() == 1;
            let steps: Vec<Step> = tails
                .iter()
                .map(|tail| tail.plan(field, head.index, is_last))
                .collect();
            match steps.iter().position(|step| matches!(step, Step::Blocked)) {
                Some(position) => {
                    blocked_at.get_or_insert(tails[position].pattern_idx);
                }
                None => {
                    chosen = Some((field.clone(), steps));
                    break;
                }
            }
        }

        let Some((field, steps)) = chosen else {
            return Err(SchemaChangeRejectedError::UnattributedBits {
                pattern_idx: blocked_at.unwrap_or_default(),
            });
        };
        let Some(queue) = pending.get_mut(&field) else {
            break;
        };
        let Some(head) = queue.pop_front() else {
            break;
        };
        if queue.is_empty() {
            pending.shift_remove(&field);
        }

        let mut pattern_growth = Vec::new();
        for (tail, step) in tails.iter_mut().zip(steps) {
            if let Step::Consume {
                growth,
                consumed,
                bits,
            } = step
            {
                tail.cursor += consumed;
                *tail.widths.entry(field.clone()).or_insert(0) += bits;
                pattern_growth.extend(growth.into_iter().map(|growth| (tail.pattern_idx, growth)));
            }
        }
        tracing::debug!(field = %field, index = head.index, "Ordered combination addition");
        units.push(ChangeUnit::AddEncodingCombination {
            field,
            is_first: head.is_first,
            combination: head.combination,
            pattern_growth,
        });
    }

    if let Some(tail) = tails.iter().find(|tail| tail.cursor < tail.entries.len()) {
        return Err(SchemaChangeRejectedError::UnattributedBits {
            pattern_idx: tail.pattern_idx,
        });
    }
    Ok(units)
}

fn extract_images(old: &Database, new: &Database) -> ExtractResult<Vec<ChangeUnit>> {
    for (image_id, old_name) in old.image_ids() {
        let image_id = *image_id;
        let Some(new_name) = new.get_image_name(image_id) else {
            return Err(SchemaChangeRejectedError::ImageIdRemoved { image_id });
        };
        if new_name != old_name.as_str() {
            return Err(SchemaChangeRejectedError::ImageIdRenamed {
                image_id,
                old: old_name.clone(),
                new: new_name.to_string(),
            });
        }
        let old_pattern = old.get_pattern_index(image_id).unwrap_or_default();
        let new_pattern = new.get_pattern_index(image_id).unwrap_or_default();
        if old_pattern != new_pattern {
            return Err(SchemaChangeRejectedError::ImageIdMoved {
                image_id,
                old: old_pattern,
                new: new_pattern,
            });
        }
    }

    let image_name = |image_id: u8| new.get_image_name(image_id).unwrap_or_default().to_string();
    let mut existing = Vec::new();
    let mut created = Vec::new();
    for (pattern_idx, pattern) in new.patterns().iter().enumerate() {
        if pattern_idx < old.get_pattern_count() {
            for image_id in &pattern.image_ids {
                if !old.image_ids().contains_key(image_id) {
                    existing.push(ChangeUnit::NewImageIdToExistingEncodingPattern {
                        image_id: *image_id,
                        name: image_name(*image_id),
                        pattern_idx,
                    });
                }
            }
            continue;
        }

        let mut seen_ids = BTreeSet::new();
        let mut seen_names = BTreeSet::new();
        let mut images = Vec::with_capacity(pattern.image_ids.len());
        for image_id in &pattern.image_ids {
            let name = image_name(*image_id);
            if !seen_ids.insert(*image_id) || !seen_names.insert(name.clone()) {
                return Err(SchemaChangeRejectedError::DuplicateImage {
                    pattern_idx,
                    image: name,
                });
            }
            images.push((*image_id, name));
        }
        created.push(ChangeUnit::NewImageIdToNewEncodingPattern {
            pattern_idx,
            images,
            encoding_scheme: pattern.encoding_scheme,
            fields: pattern.fields.clone(),
        });
    }

    existing.extend(created);
    Ok(existing)
}
