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

// src/database/encoded_field.rs
// An encoded field is a named slot of the HWID bit pattern. Its value
// is an index into a table of component combinations, where each
// combination names the components chosen together for every class
// the field covers.

use std::collections::{BTreeMap, BTreeSet};

// Combination maps each component class covered by an encoded field
// to the names of the components selected for it. Names are kept
// sorted so that two selections of the same components compare equal
// regardless of the order they were written in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct Combination {
    components: BTreeMap<String, Vec<String>>,
}

impl Combination {
    pub fn new() -> Self {
        Self::default()
    }

    // with sets the components selected for a class (builder pattern).
    pub fn with<C, I, N>(mut self, class: C, names: I) -> Self
    where
        C: Into<String>,
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.set(class, names);
        self
    }

    // set sets the components selected for a class.
    pub fn set<C, I, N>(&mut self, class: C, names: I)
    where
        C: Into<String>,
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        self.components.insert(class.into(), names);
    }

    // names returns the components selected for a class, or an
    // empty slice if the class isn't part of the combination.
    pub fn names(&self, class: &str) -> &[String] {
        self.components
            .get(class)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn classes(&self) -> BTreeSet<&str> {
        self.components.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.components.iter()
    }

    // rename_component replaces a component name in the selection of
    // a class, keeping the names sorted. Returns whether anything
    // changed.
    pub(crate) fn rename_component(&mut self, class: &str, old_name: &str, new_name: &str) -> bool {
        let Some(names) = self.components.get_mut(class) else {
            return false;
        };
        let mut changed = false;
        for name in names.iter_mut() {
            if name == old_name {
                *name = new_name.to_string();
                changed = true;
            }
        }
        if changed {
            names.sort();
        }
        changed
    }
}

// EncodedField is an index -> combination table. Index 0 is always
// defined so that patterns without bits for this field still decode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodedField {
    combinations: BTreeMap<u32, Combination>,
}

impl EncodedField {
    pub fn new() -> Self {
        Self::default()
    }

    // with_combination inserts a combination at the given index
    // (builder pattern).
    pub fn with_combination(mut self, index: u32, combination: Combination) -> Self {
        self.combinations.insert(index, combination);
        self
    }

    pub(crate) fn insert(&mut self, index: u32, combination: Combination) {
        self.combinations.insert(index, combination);
    }

    pub fn get(&self, index: u32) -> Option<&Combination> {
        self.combinations.get(&index)
    }

    pub fn combinations(&self) -> &BTreeMap<u32, Combination> {
        &self.combinations
    }

    pub(crate) fn combinations_mut(&mut self) -> impl Iterator<Item = &mut Combination> {
        self.combinations.values_mut()
    }

    pub fn len(&self) -> usize {
        self.combinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }

    // max_index returns the highest defined index.
    pub fn max_index(&self) -> Option<u32> {
        self.combinations.keys().next_back().copied()
    }

    // next_index returns the index a newly added combination gets.
    pub fn next_index(&self) -> u32 {
        self.max_index().map_or(0, |index| index + 1)
    }

    // classes returns the component classes covered by this field,
    // which is the union over all of its combinations.
    pub fn classes(&self) -> BTreeSet<&str> {
        self.combinations
            .values()
            .flat_map(|combination| combination.classes())
            .collect()
    }

    // find_index returns the lowest index whose combination selects
    // exactly the given component names for every covered class.
    // Classes missing from the selection are treated as selecting
    // nothing.
    pub fn find_index(&self, selection: &BTreeMap<String, Vec<String>>) -> Option<u32> {
        let classes = self.classes();
        self.combinations
            .iter()
            .find(|(_, combination)| {
                classes.iter().all(|class| {
                    let mut selected: Vec<&str> = selection
                        .get(*class)
                        .map(|names| names.iter().map(String::as_str).collect())
                        .unwrap_or_default();
                    selected.sort_unstable();
                    let names: Vec<&str> =
                        combination.names(class).iter().map(String::as_str).collect();
                    selected == names
                })
            })
            .map(|(index, _)| *index)
    }

    // contains_combination returns the index of an identical
    // combination, if one exists.
    pub fn contains_combination(&self, combination: &Combination) -> Option<u32> {
        self.combinations
            .iter()
            .find(|(_, existing)| *existing == combination)
            .map(|(index, _)| *index)
    }
}

// bit_length_for_index returns the number of bits needed to represent
// the given index.
pub fn bit_length_for_index(index: u32) -> u32 {
    u32::BITS - index.leading_zeros()
}
