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

// src/database/component.rs
// Components are the individual parts a BOM is made of. Each one is
// identified by its (class, name) pair and carries a support status,
// the probe values used to recognize it on a device, and free-form
// information.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

// SupportStatus is the lifecycle state of a component. Variants are
// declared in their allowed transition order, so the derived Ord can
// be used to check that a status only ever moves forward.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SupportStatus {
    Unqualified,
    #[default]
    Supported,
    Deprecated,
    Unsupported,
}

impl SupportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupportStatus::Unqualified => "unqualified",
            SupportStatus::Supported => "supported",
            SupportStatus::Deprecated => "deprecated",
            SupportStatus::Unsupported => "unsupported",
        }
    }
}

impl FromStr for SupportStatus {
    type Err = String;

    fn from_str(status: &str) -> Result<Self, Self::Err> {
        match status {
            "unqualified" => Ok(SupportStatus::Unqualified),
            "supported" => Ok(SupportStatus::Supported),
            "deprecated" => Ok(SupportStatus::Deprecated),
            "unsupported" => Ok(SupportStatus::Unsupported),
            _ => Err(format!(
                "Unknown support status '{status}'. Valid statuses: unqualified, supported, deprecated, unsupported"
            )),
        }
    }
}

impl fmt::Display for SupportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// AvlLink is a probe value that is maintained by an external approved
// vendor list. The database only keeps a snapshot of the original
// values and whether the probed value was matched when linked.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AvlLink {
    pub converter: String,
    pub original_values: IndexMap<String, String>,
    pub probe_value_matched: bool,
}

// ValueMatcher matches a single probed field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueMatcher {
    // Plain requires the probed value to be exactly this string.
    Plain(String),
    // Regex requires the whole probed value to match the pattern.
    Regex(String),
    // AvlLink defers to the values snapshotted from the AVL entry.
    AvlLink(AvlLink),
}

impl ValueMatcher {
    // matches checks a probed value against this matcher. A field of
    // an AVL link matches when the original value for the same field
    // matches exactly.
    pub fn matches(&self, field: &str, probed: &str) -> bool {
        match self {
            ValueMatcher::Plain(expected) => expected == probed,
            ValueMatcher::Regex(pattern) => Regex::new(&format!("^(?:{pattern})$"))
                .map(|re| re.is_match(probed))
                .unwrap_or(false),
            ValueMatcher::AvlLink(link) => link
                .original_values
                .get(field)
                .is_some_and(|original| original == probed),
        }
    }
}

impl fmt::Display for ValueMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueMatcher::Plain(value) => write!(f, "{value}"),
            ValueMatcher::Regex(pattern) => write!(f, "!re {pattern}"),
            ValueMatcher::AvlLink(link) => write!(f, "!link_avl {}", link.converter),
        }
    }
}

// Component is a single item of a component class. The name is not
// stored here, since components are always kept keyed by name within
// their class.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Component {
    pub status: SupportStatus,
    // values is None for components that can't be probed.
    pub values: Option<IndexMap<String, ValueMatcher>>,
    pub information: Option<IndexMap<String, String>>,
}

impl Component {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: SupportStatus) -> Self {
        self.status = status;
        self
    }

    // with_value adds a plain probe value (builder pattern).
    pub fn with_value<K: Into<String>, V: Into<String>>(mut self, field: K, value: V) -> Self {
        self.values
            .get_or_insert_with(IndexMap::new)
            .insert(field.into(), ValueMatcher::Plain(value.into()));
        self
    }

    // with_matcher adds an arbitrary probe value matcher (builder pattern).
    pub fn with_matcher<K: Into<String>>(mut self, field: K, matcher: ValueMatcher) -> Self {
        self.values
            .get_or_insert_with(IndexMap::new)
            .insert(field.into(), matcher);
        self
    }

    pub fn with_information<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.information
            .get_or_insert_with(IndexMap::new)
            .insert(key.into(), value.into());
        self
    }

    // is_probeable returns whether this component carries probe values.
    pub fn is_probeable(&self) -> bool {
        self.values.is_some()
    }

    // matches_probed_values returns true when every probe value of this
    // component is present in the probed results and matches. Components
    // without probe values never match.
    pub fn matches_probed_values(&self, probed: &BTreeMap<String, String>) -> bool {
        match &self.values {
            Some(values) if !values.is_empty() => values.iter().all(|(field, matcher)| {
                probed
                    .get(field)
                    .is_some_and(|value| matcher.matches(field, value))
            }),
            _ => false,
        }
    }
}
