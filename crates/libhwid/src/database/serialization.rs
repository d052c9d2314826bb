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

// src/database/serialization.rs
// YAML persistence for HWID databases.
//
// Documents are read into a serde_yaml::Value tree and converted into
// the strongly-typed Database eagerly, so a malformed document fails
// at load time rather than at first use. Writing goes the other way
// and always produces the same canonical text for the same database.
// The checksum is the SHA-256 of the document with the checksum line
// blanked out.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Value};
use sha2::{Digest, Sha256};

use crate::database::component::{AvlLink, Component, SupportStatus, ValueMatcher};
use crate::database::database::Database;
use crate::database::encoded_field::{Combination, EncodedField};
use crate::database::error::{DatabaseResult, DatabaseSchemaError};
use crate::database::pattern::{EncodingScheme, Pattern, PatternField};
use crate::rule::rule::Rule;

const REGEX_TAG: &str = "re";
const AVL_LINK_TAG: &str = "link_avl";

static CHECKSUM_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^checksum:.*$").expect("checksum line pattern is valid")
});

impl Database {
    // from_yaml loads a database from its persisted YAML form
    // without checking the stored checksum.
    pub fn from_yaml(yaml: &str) -> DatabaseResult<Self> {
        let root: Value = serde_yaml::from_str(yaml)?;
        parse_database(&root)
    }

    // from_yaml_verified loads a database and additionally requires
    // the stored checksum to match the document contents.
    pub fn from_yaml_verified(yaml: &str) -> DatabaseResult<Self> {
        let database = Self::from_yaml(yaml)?;
        let computed = compute_checksum(yaml);
        let stored = database.checksum().unwrap_or_default();
        if stored != computed {
            return Err(DatabaseSchemaError::ChecksumMismatch {
                stored: stored.to_string(),
                computed,
            });
        }
        Ok(database)
    }

    // load_file reads and parses a database file.
    pub fn load_file(path: &Path, verify_checksum: bool) -> DatabaseResult<Self> {
        let yaml = fs::read_to_string(path)?;
        let database = if verify_checksum {
            Self::from_yaml_verified(&yaml)?
        } else {
            Self::from_yaml(&yaml)?
        };
        tracing::debug!(
            path = %path.display(),
            project = %database.project(),
            "Loaded HWID database"
        );
        Ok(database)
    }

    // to_yaml_string renders the canonical document, with a freshly
    // computed checksum on the first line.
    pub fn to_yaml_string(&self) -> DatabaseResult<String> {
        let body = serde_yaml::to_string(&Value::Mapping(self.to_mapping()))
            .map_err(|e| DatabaseSchemaError::Serialization {
                error: e.to_string(),
            })?;
        let checksum = checksum_of_body(&body);
        Ok(format!("checksum: {checksum}\n{body}"))
    }

    // save_file writes the canonical document to a file.
    pub fn save_file(&self, path: &Path) -> DatabaseResult<()> {
        fs::write(path, self.to_yaml_string()?)?;
        tracing::debug!(path = %path.display(), project = %self.project, "Saved HWID database");
        Ok(())
    }

    fn to_mapping(&self) -> Mapping {
        let mut root = Mapping::new();
        root.insert("project".into(), Value::String(self.project.clone()));
        root.insert("image_id".into(), Value::Mapping(image_ids_to_mapping(self)));
        root.insert(
            "pattern".into(),
            Value::Sequence(self.patterns.iter().map(pattern_to_value).collect()),
        );
        root.insert(
            "encoded_fields".into(),
            Value::Mapping(encoded_fields_to_mapping(self)),
        );
        root.insert("components".into(), Value::Mapping(components_to_mapping(self)));
        root.insert(
            "rules".into(),
            Value::Sequence(self.rules.iter().map(rule_to_value).collect()),
        );
        root
    }
}

// compute_checksum computes the checksum of a persisted document, with
// whatever value the checksum line currently carries blanked out.
pub fn compute_checksum(yaml: &str) -> String {
    let blanked = CHECKSUM_LINE.replace(yaml, "checksum:");
    format!("{:x}", Sha256::digest(blanked.as_bytes()))
}

fn checksum_of_body(body: &str) -> String {
    format!("{:x}", Sha256::digest(format!("checksum:\n{body}").as_bytes()))
}

fn parse_database(root: &Value) -> DatabaseResult<Database> {
    let document = root
        .as_mapping()
        .ok_or_else(|| DatabaseSchemaError::invalid_section("<root>", "expected a mapping"))?;

    let project = scalar_to_string(required(document, "project")?)
        .ok_or_else(|| DatabaseSchemaError::invalid_section("project", "expected a string"))?;
    let checksum = document.get("checksum").and_then(scalar_to_string);

    let database = Database {
        project,
        checksum,
        image_ids: parse_image_ids(required(document, "image_id")?)?,
        patterns: parse_patterns(required(document, "pattern")?)?,
        encoded_fields: parse_encoded_fields(required(document, "encoded_fields")?)?,
        components: parse_components(required(document, "components")?)?,
        rules: match document.get("rules") {
            Some(rules) => parse_rules(rules)?,
            None => Vec::new(),
        },
    };
    database.validate()?;
    Ok(database)
}

fn required<'a>(document: &'a Mapping, section: &str) -> DatabaseResult<&'a Value> {
    document
        .get(section)
        .ok_or_else(|| DatabaseSchemaError::missing_section(section))
}

// scalar_to_string converts a YAML scalar to its string form. Probe
// values and names are strings even when written unquoted as numbers.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_mapping<'a>(value: &'a Value, section: &str, what: &str) -> DatabaseResult<&'a Mapping> {
    match value {
        Value::Mapping(mapping) => Ok(mapping),
        _ => Err(DatabaseSchemaError::invalid_section(
            section,
            format!("{what} must be a mapping"),
        )),
    }
}

fn parse_index(key: &Value, section: &str) -> DatabaseResult<u64> {
    key.as_u64().ok_or_else(|| {
        DatabaseSchemaError::invalid_section(
            section,
            format!("expected a non-negative integer key, got {key:?}"),
        )
    })
}

fn parse_image_ids(value: &Value) -> DatabaseResult<BTreeMap<u8, String>> {
    let mut image_ids = BTreeMap::new();
    for (key, name) in as_mapping(value, "image_id", "image_id")? {
        let image_id = parse_index(key, "image_id")?;
        let image_id = u8::try_from(image_id).map_err(|_| {
            DatabaseSchemaError::invalid_image_id(image_id, "exceeds the maximum image id")
        })?;
        let name = scalar_to_string(name).ok_or_else(|| {
            DatabaseSchemaError::invalid_image_id(u64::from(image_id), "name must be a string")
        })?;
        image_ids.insert(image_id, name);
    }
    Ok(image_ids)
}

fn parse_patterns(value: &Value) -> DatabaseResult<Vec<Pattern>> {
    let entries = value
        .as_sequence()
        .ok_or_else(|| DatabaseSchemaError::invalid_section("pattern", "expected a list"))?;

    let mut patterns = Vec::with_capacity(entries.len());
    for (pattern_idx, entry) in entries.iter().enumerate() {
        let entry = as_mapping(entry, "pattern", &format!("pattern {pattern_idx}"))?;

        let image_ids = entry
            .get("image_ids")
            .and_then(Value::as_sequence)
            .ok_or_else(|| {
                DatabaseSchemaError::invalid_section(
                    "pattern",
                    format!("pattern {pattern_idx} needs an image_ids list"),
                )
            })?
            .iter()
            .map(|id| {
                let id = parse_index(id, "pattern")?;
                u8::try_from(id).map_err(|_| {
                    DatabaseSchemaError::invalid_image_id(id, "exceeds the maximum image id")
                })
            })
            .collect::<DatabaseResult<Vec<u8>>>()?;

        let encoding_scheme = match entry.get("encoding_scheme") {
            Some(scheme) => scalar_to_string(scheme)
                .ok_or_else(|| {
                    DatabaseSchemaError::invalid_section("pattern", "encoding_scheme must be a string")
                })
                .and_then(|scheme| {
                    EncodingScheme::from_str(&scheme)
                        .map_err(|e| DatabaseSchemaError::invalid_section("pattern", e))
                })?,
            None => EncodingScheme::default(),
        };

        let mut fields = Vec::new();
        let field_entries = match entry.get("fields") {
            Some(Value::Sequence(field_entries)) => field_entries.as_slice(),
            Some(Value::Null) | None => &[],
            Some(_) => {
                return Err(DatabaseSchemaError::invalid_section(
                    "pattern",
                    format!("fields of pattern {pattern_idx} must be a list"),
                ));
            }
        };
        for field in field_entries {
            let field = as_mapping(field, "pattern", "a pattern field entry")?;
            if field.len() != 1 {
                return Err(DatabaseSchemaError::invalid_section(
                    "pattern",
                    "each pattern field entry must have exactly one field",
                ));
            }
            for (name, bit_length) in field {
                let name = scalar_to_string(name).ok_or_else(|| {
                    DatabaseSchemaError::invalid_section("pattern", "field name must be a string")
                })?;
                let bit_length = parse_index(bit_length, "pattern")?;
                let bit_length = u32::try_from(bit_length).map_err(|_| {
                    DatabaseSchemaError::invalid_section("pattern", "bit length is too large")
                })?;
                fields.push(PatternField::new(name, bit_length));
            }
        }

        patterns.push(Pattern {
            image_ids,
            encoding_scheme,
            fields,
        });
    }
    Ok(patterns)
}

fn parse_names(value: &Value, field: &str) -> DatabaseResult<Vec<String>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(names) => names
            .iter()
            .map(|name| {
                scalar_to_string(name).ok_or_else(|| {
                    DatabaseSchemaError::invalid_section(
                        "encoded_fields",
                        format!("component names of '{field}' must be strings"),
                    )
                })
            })
            .collect(),
        scalar => scalar_to_string(scalar).map(|name| vec![name]).ok_or_else(|| {
            DatabaseSchemaError::invalid_section(
                "encoded_fields",
                format!("component names of '{field}' must be strings"),
            )
        }),
    }
}

fn parse_encoded_fields(value: &Value) -> DatabaseResult<IndexMap<String, EncodedField>> {
    let mut encoded_fields = IndexMap::new();
    for (name, table) in as_mapping(value, "encoded_fields", "encoded_fields")? {
        let name = scalar_to_string(name).ok_or_else(|| {
            DatabaseSchemaError::invalid_section("encoded_fields", "field name must be a string")
        })?;
        let mut field = EncodedField::new();
        for (index, combination) in as_mapping(table, "encoded_fields", &name)? {
            let index = parse_index(index, "encoded_fields")?;
            let index = u32::try_from(index).map_err(|_| {
                DatabaseSchemaError::invalid_section("encoded_fields", "index is too large")
            })?;
            let mut parsed = Combination::new();
            for (class, names) in as_mapping(combination, "encoded_fields", &name)? {
                let class = scalar_to_string(class).ok_or_else(|| {
                    DatabaseSchemaError::invalid_section(
                        "encoded_fields",
                        "component class must be a string",
                    )
                })?;
                parsed.set(class, parse_names(names, &name)?);
            }
            field.insert(index, parsed);
        }
        encoded_fields.insert(name, field);
    }
    Ok(encoded_fields)
}

fn parse_string_mapping(value: &Value, section: &str) -> DatabaseResult<IndexMap<String, String>> {
    let mut parsed = IndexMap::new();
    for (key, entry) in as_mapping(value, section, "information")? {
        match (scalar_to_string(key), scalar_to_string(entry)) {
            (Some(key), Some(entry)) => {
                parsed.insert(key, entry);
            }
            _ => {
                return Err(DatabaseSchemaError::invalid_section(
                    section,
                    "expected a mapping of strings",
                ));
            }
        }
    }
    Ok(parsed)
}

fn parse_matcher(value: &Value) -> DatabaseResult<ValueMatcher> {
    match value {
        Value::Tagged(tagged) if tagged.tag == REGEX_TAG => {
            let pattern = scalar_to_string(&tagged.value).ok_or_else(|| {
                DatabaseSchemaError::invalid_section("components", "!re expects a string")
            })?;
            Regex::new(&pattern).map_err(|e| {
                DatabaseSchemaError::invalid_section(
                    "components",
                    format!("invalid regular expression '{pattern}': {e}"),
                )
            })?;
            Ok(ValueMatcher::Regex(pattern))
        }
        Value::Tagged(tagged) if tagged.tag == AVL_LINK_TAG => {
            let link = as_mapping(&tagged.value, "components", "!link_avl")?;
            let converter = link
                .get("converter")
                .and_then(scalar_to_string)
                .unwrap_or_default();
            let original_values = match link.get("original_values") {
                Some(values) => parse_string_mapping(values, "components")?,
                None => IndexMap::new(),
            };
            let probe_value_matched = link
                .get("probe_value_matched")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            Ok(ValueMatcher::AvlLink(AvlLink {
                converter,
                original_values,
                probe_value_matched,
            }))
        }
        Value::Tagged(tagged) => Err(DatabaseSchemaError::invalid_section(
            "components",
            format!("unknown tag '{}'", tagged.tag),
        )),
        scalar => scalar_to_string(scalar)
            .map(ValueMatcher::Plain)
            .ok_or_else(|| {
                DatabaseSchemaError::invalid_section("components", "probe values must be scalars")
            }),
    }
}

fn parse_component(value: &Value, class: &str, name: &str) -> DatabaseResult<Component> {
    let what = format!("component '{class}/{name}'");
    let entry = as_mapping(value, "components", &what)?;

    let status = match entry.get("status").and_then(scalar_to_string) {
        Some(status) => SupportStatus::from_str(&status)
            .map_err(|e| DatabaseSchemaError::invalid_section("components", e))?,
        None => SupportStatus::default(),
    };

    let values = match entry.get("values") {
        None | Some(Value::Null) => None,
        Some(values) => {
            let mut matchers = IndexMap::new();
            for (field, matcher) in as_mapping(values, "components", &what)? {
                let field = scalar_to_string(field).ok_or_else(|| {
                    DatabaseSchemaError::invalid_section("components", "probe field must be a string")
                })?;
                matchers.insert(field, parse_matcher(matcher)?);
            }
            Some(matchers)
        }
    };

    let information = match entry.get("information") {
        None | Some(Value::Null) => None,
        Some(information) => Some(parse_string_mapping(information, "components")?),
    };

    Ok(Component {
        status,
        values,
        information,
    })
}

fn parse_components(
    value: &Value,
) -> DatabaseResult<IndexMap<String, IndexMap<String, Component>>> {
    let mut components = IndexMap::new();
    for (class, class_entry) in as_mapping(value, "components", "components")? {
        let class = scalar_to_string(class).ok_or_else(|| {
            DatabaseSchemaError::invalid_section("components", "class must be a string")
        })?;
        let class_entry = as_mapping(class_entry, "components", &class)?;
        let mut items = IndexMap::new();
        match class_entry.get("items") {
            None | Some(Value::Null) => {}
            Some(entries) => {
                for (name, component) in as_mapping(entries, "components", &class)? {
                    let name = scalar_to_string(name).ok_or_else(|| {
                        DatabaseSchemaError::invalid_section(
                            "components",
                            "component name must be a string",
                        )
                    })?;
                    let component = parse_component(component, &class, &name)?;
                    if items.insert(name.clone(), component).is_some() {
                        return Err(DatabaseSchemaError::invalid_section(
                            "components",
                            format!("duplicate component '{class}/{name}'"),
                        ));
                    }
                }
            }
        }
        components.insert(class, items);
    }
    Ok(components)
}

fn parse_expression_list(value: Option<&Value>, rule: &str) -> DatabaseResult<Vec<String>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(expression)) => Ok(vec![expression.clone()]),
        Some(Value::Sequence(expressions)) => expressions
            .iter()
            .map(|expression| {
                expression.as_str().map(str::to_string).ok_or_else(|| {
                    DatabaseSchemaError::invalid_section(
                        "rules",
                        format!("expressions of rule '{rule}' must be strings"),
                    )
                })
            })
            .collect(),
        Some(_) => Err(DatabaseSchemaError::invalid_section(
            "rules",
            format!("expressions of rule '{rule}' must be a string or a list"),
        )),
    }
}

fn parse_rules(value: &Value) -> DatabaseResult<Vec<Rule>> {
    let entries = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Sequence(entries) => entries,
        _ => return Err(DatabaseSchemaError::invalid_section("rules", "expected a list")),
    };

    let mut rules = Vec::with_capacity(entries.len());
    for entry in entries {
        let entry = as_mapping(entry, "rules", "rule")?;
        let name = entry
            .get("name")
            .and_then(scalar_to_string)
            .ok_or_else(|| DatabaseSchemaError::invalid_section("rules", "rule needs a name"))?;
        let when = match entry.get("when") {
            None | Some(Value::Null) => None,
            Some(when) => Some(scalar_to_string(when).ok_or_else(|| {
                DatabaseSchemaError::invalid_section(
                    "rules",
                    format!("'when' of rule '{name}' must be a string"),
                )
            })?),
        };
        let evaluate = parse_expression_list(entry.get("evaluate"), &name)?;
        let otherwise = parse_expression_list(entry.get("otherwise"), &name)?;

        let rule = Rule::parse(&name, when.as_deref(), &evaluate, &otherwise).map_err(|error| {
            DatabaseSchemaError::InvalidRule {
                rule: name.clone(),
                error,
            }
        })?;
        rules.push(rule);
    }
    Ok(rules)
}

fn image_ids_to_mapping(database: &Database) -> Mapping {
    database
        .image_ids
        .iter()
        .map(|(image_id, name)| (Value::from(*image_id), Value::String(name.clone())))
        .collect()
}

fn pattern_to_value(pattern: &Pattern) -> Value {
    let mut entry = Mapping::new();
    entry.insert(
        "image_ids".into(),
        Value::Sequence(pattern.image_ids.iter().map(|id| Value::from(*id)).collect()),
    );
    entry.insert(
        "encoding_scheme".into(),
        Value::String(pattern.encoding_scheme.to_string()),
    );
    entry.insert(
        "fields".into(),
        Value::Sequence(
            pattern
                .fields
                .iter()
                .map(|field| {
                    let mut single = Mapping::new();
                    single.insert(
                        Value::String(field.name.clone()),
                        Value::from(field.bit_length),
                    );
                    Value::Mapping(single)
                })
                .collect(),
        ),
    );
    Value::Mapping(entry)
}

// names_to_value writes a single component as a scalar and anything
// else as a list.
fn names_to_value(names: &[String]) -> Value {
    match names {
        [name] => Value::String(name.clone()),
        names => Value::Sequence(names.iter().cloned().map(Value::String).collect()),
    }
}

fn encoded_fields_to_mapping(database: &Database) -> Mapping {
    database
        .encoded_fields
        .iter()
        .map(|(name, field)| {
            let table: Mapping = field
                .combinations()
                .iter()
                .map(|(index, combination)| {
                    let classes: Mapping = combination
                        .iter()
                        .map(|(class, names)| (Value::String(class.clone()), names_to_value(names)))
                        .collect();
                    (Value::from(*index), Value::Mapping(classes))
                })
                .collect();
            (Value::String(name.clone()), Value::Mapping(table))
        })
        .collect()
}

fn matcher_to_value(matcher: &ValueMatcher) -> Value {
    match matcher {
        ValueMatcher::Plain(value) => Value::String(value.clone()),
        ValueMatcher::Regex(pattern) => Value::Tagged(Box::new(TaggedValue {
            tag: Tag::new(REGEX_TAG),
            value: Value::String(pattern.clone()),
        })),
        ValueMatcher::AvlLink(link) => {
            let mut entry = Mapping::new();
            entry.insert("converter".into(), Value::String(link.converter.clone()));
            entry.insert(
                "original_values".into(),
                Value::Mapping(string_mapping_to_mapping(&link.original_values)),
            );
            entry.insert(
                "probe_value_matched".into(),
                Value::Bool(link.probe_value_matched),
            );
            Value::Tagged(Box::new(TaggedValue {
                tag: Tag::new(AVL_LINK_TAG),
                value: Value::Mapping(entry),
            }))
        }
    }
}

fn string_mapping_to_mapping(values: &IndexMap<String, String>) -> Mapping {
    values
        .iter()
        .map(|(key, value)| (Value::String(key.clone()), Value::String(value.clone())))
        .collect()
}

fn components_to_mapping(database: &Database) -> Mapping {
    database
        .components
        .iter()
        .map(|(class, items)| {
            let items: Mapping = items
                .iter()
                .map(|(name, component)| {
                    let mut entry = Mapping::new();
                    entry.insert(
                        "status".into(),
                        Value::String(component.status.to_string()),
                    );
                    entry.insert(
                        "values".into(),
                        match &component.values {
                            Some(values) => Value::Mapping(
                                values
                                    .iter()
                                    .map(|(field, matcher)| {
                                        (Value::String(field.clone()), matcher_to_value(matcher))
                                    })
                                    .collect(),
                            ),
                            None => Value::Null,
                        },
                    );
                    if let Some(information) = &component.information {
                        entry.insert(
                            "information".into(),
                            Value::Mapping(string_mapping_to_mapping(information)),
                        );
                    }
                    (Value::String(name.clone()), Value::Mapping(entry))
                })
                .collect();
            let mut class_entry = Mapping::new();
            class_entry.insert("items".into(), Value::Mapping(items));
            (Value::String(class.clone()), Value::Mapping(class_entry))
        })
        .collect()
}

fn rule_to_value(rule: &Rule) -> Value {
    let mut entry = Mapping::new();
    entry.insert("name".into(), Value::String(rule.name.clone()));
    if let Some(when) = &rule.when {
        entry.insert("when".into(), Value::String(when.source().to_string()));
    }
    entry.insert(
        "evaluate".into(),
        Value::Sequence(
            rule.evaluate
                .iter()
                .map(|expression| Value::String(expression.source().to_string()))
                .collect(),
        ),
    );
    if !rule.otherwise.is_empty() {
        entry.insert(
            "otherwise".into(),
            Value::Sequence(
                rule.otherwise
                    .iter()
                    .map(|expression| Value::String(expression.source().to_string()))
                    .collect(),
            ),
        );
    }
    Value::Mapping(entry)
}
