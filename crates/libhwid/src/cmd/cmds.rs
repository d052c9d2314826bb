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

// src/cmd/cmds.rs

use std::fs;
use std::path::Path;

use prettytable::{Cell, Row, Table};
use serde::Serialize;

use crate::change_unit::extract::extract_change_units;
use crate::change_unit::unit::apply_change_units;
use crate::cmd::args::{Cli, Commands, DatabaseArgs, OutputFormat};
use crate::codec::bom::Bom;
use crate::codec::decoder;
use crate::codec::encoder;
use crate::codec::identity::Identity;
use crate::database::database::Database;
use crate::error::{HwidError, HwidResult};
use crate::loader::{DatabaseLoader, FsDatabaseLoader};
use crate::rule::context::{Context, Phase, Vpd};
use crate::rule::rule::evaluate_rules;

pub fn run_cli(cli: Cli) -> HwidResult<()> {
    let format = cli.format;
    match cli.command {
        Some(Commands::Version) | None => cmd_version(),
        Some(Commands::VerifyDb { file }) => cmd_verify_db(&file)?,
        Some(Commands::ShowDb { file }) => cmd_show_db(&file, format)?,
        Some(Commands::Encode { database, bom }) => {
            let database = load_database(&database)?;
            cmd_encode(&database, &bom, format)?;
        }
        Some(Commands::Decode { database, hwid }) => {
            let database = load_database(&database)?;
            cmd_decode(&database, &hwid, format)?;
        }
        Some(Commands::Evaluate {
            database,
            hwid,
            device_info,
            vpd,
            phase,
            namespace,
        }) => {
            let database = load_database(&database)?;
            let device_info = match device_info {
                Some(path) => serde_json::from_str(&fs::read_to_string(path)?)
                    .map_err(|e| HwidError::invalid_input(format!("Invalid device info: {e}")))?,
                None => serde_json::Value::Object(Default::default()),
            };
            let vpd: Vpd = match vpd {
                Some(path) => serde_yaml::from_str(&fs::read_to_string(path)?)
                    .map_err(|e| HwidError::invalid_input(format!("Invalid VPD file: {e}")))?,
                None => Vpd::default(),
            };
            cmd_evaluate(
                &database,
                &hwid,
                device_info,
                vpd,
                phase,
                namespace.as_deref(),
                format,
            )?;
        }
        Some(Commands::Diff { old, new }) => cmd_diff(&old, &new, format)?,
        Some(Commands::Apply { old, new, output }) => cmd_apply(&old, &new, &output)?,
    }
    Ok(())
}

fn cmd_version() {
    println!("hwid-tool version {}", env!("CARGO_PKG_VERSION"));
}

// load_database loads the database selected on the command line.
fn load_database(args: &DatabaseArgs) -> HwidResult<Database> {
    if let Some(path) = &args.database {
        return Ok(Database::load_file(path, !args.skip_checksum)?);
    }
    match (&args.project, &args.database_dir) {
        (Some(project), Some(database_dir)) => {
            let loader = FsDatabaseLoader::new(database_dir).with_verify_checksum(!args.skip_checksum);
            Ok(loader.load(project, args.internal)?)
        }
        _ => Err(HwidError::invalid_input(
            "Either --database or --project with --database-dir is required",
        )),
    }
}

fn print_serialized<T: Serialize>(value: &T, format: OutputFormat) -> HwidResult<()> {
    match format {
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(value)
                .map_err(|e| HwidError::invalid_input(format!("Failed to serialize: {e}")))?;
            print!("{yaml}");
        }
        _ => {
            let json = serde_json::to_string_pretty(value)
                .map_err(|e| HwidError::invalid_input(format!("Failed to serialize: {e}")))?;
            println!("{json}");
        }
    }
    Ok(())
}

fn cmd_verify_db(file: &Path) -> HwidResult<()> {
    let database = Database::load_file(file, true)?;
    println!("Database is valid!");
    println!("Project: '{}'", database.project());
    println!("Checksum: {}", database.checksum().unwrap_or("(none)"));
    Ok(())
}

#[derive(Serialize)]
struct DatabaseSummary<'a> {
    project: &'a str,
    image_ids: Vec<(u8, &'a str)>,
    patterns: usize,
    encoded_fields: Vec<(&'a str, usize)>,
    component_classes: Vec<(&'a str, usize)>,
    rules: Vec<&'a str>,
}

fn cmd_show_db(file: &Path, format: OutputFormat) -> HwidResult<()> {
    let database = Database::load_file(file, false)?;
    let summary = DatabaseSummary {
        project: database.project(),
        image_ids: database
            .image_ids()
            .iter()
            .map(|(image_id, name)| (*image_id, name.as_str()))
            .collect(),
        patterns: database.get_pattern_count(),
        encoded_fields: database
            .encoded_fields()
            .iter()
            .map(|(name, field)| (name.as_str(), field.len()))
            .collect(),
        component_classes: database
            .component_classes()
            .into_iter()
            .map(|class| (class, database.get_components(class).map_or(0, |items| items.len())))
            .collect(),
        rules: database.raw_rules().iter().map(|rule| rule.name.as_str()).collect(),
    };

    if !matches!(format, OutputFormat::AsciiTable) {
        return print_serialized(&summary, format);
    }

    println!("Project: {}", summary.project);
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Image ID"),
        Cell::new("Name"),
        Cell::new("Pattern"),
        Cell::new("Scheme"),
        Cell::new("Bits"),
    ]));
    for (image_id, name) in &summary.image_ids {
        let pattern = database.get_pattern(*image_id);
        table.add_row(Row::new(vec![
            Cell::new(&image_id.to_string()),
            Cell::new(name),
            Cell::new(
                &database
                    .get_pattern_index(*image_id)
                    .map_or_else(|| "-".to_string(), |idx| idx.to_string()),
            ),
            Cell::new(pattern.map_or("-", |pattern| pattern.encoding_scheme.as_str())),
            Cell::new(
                &pattern.map_or(0, |pattern| pattern.total_bit_length()).to_string(),
            ),
        ]));
    }
    table.printstd();

    let mut fields = Table::new();
    fields.add_row(Row::new(vec![
        Cell::new("Encoded Field"),
        Cell::new("Classes"),
        Cell::new("Combinations"),
    ]));
    for (name, field) in database.encoded_fields() {
        fields.add_row(Row::new(vec![
            Cell::new(name),
            Cell::new(&field.classes().into_iter().collect::<Vec<_>>().join(", ")),
            Cell::new(&field.len().to_string()),
        ]));
    }
    fields.printstd();
    println!("Rules: {}", summary.rules.len());
    Ok(())
}

fn show_identity(identity: &Identity, bom: &Bom, format: OutputFormat) -> HwidResult<()> {
    if !matches!(format, OutputFormat::AsciiTable) {
        #[derive(Serialize)]
        struct Output<'a> {
            identity: &'a Identity,
            bom: &'a Bom,
        }
        return print_serialized(&Output { identity, bom }, format);
    }

    println!("HWID: {}", identity.encoded_string);
    println!("Binary: {}", identity.binary_string);
    println!(
        "Image ID: {} ({})",
        identity.image_id, identity.encoding_mode
    );
    let mut table = Table::new();
    table.add_row(Row::new(vec![Cell::new("Class"), Cell::new("Components")]));
    for (class, names) in &bom.components {
        table.add_row(Row::new(vec![Cell::new(class), Cell::new(&names.join(", "))]));
    }
    table.printstd();
    Ok(())
}

fn cmd_encode(database: &Database, bom_file: &Path, format: OutputFormat) -> HwidResult<()> {
    let bom: Bom = serde_yaml::from_str(&fs::read_to_string(bom_file)?)
        .map_err(|e| HwidError::invalid_input(format!("Invalid BOM file: {e}")))?;
    let bom = bom.normalized();
    let identity = encoder::encode(database, &bom)?;
    show_identity(&identity, &bom, format)
}

fn cmd_decode(database: &Database, hwid: &str, format: OutputFormat) -> HwidResult<()> {
    let (identity, bom) = decoder::decode(database, hwid)?;
    show_identity(&identity, &bom, format)
}

fn cmd_evaluate(
    database: &Database,
    hwid: &str,
    device_info: serde_json::Value,
    vpd: Vpd,
    phase: Phase,
    namespace: Option<&str>,
    format: OutputFormat,
) -> HwidResult<()> {
    let (identity, bom) = decoder::decode(database, hwid)?;
    let context = Context::from_decoded(database, identity, bom)
        .with_device_info(device_info)
        .with_vpd(vpd)
        .with_phase(phase);
    let context = evaluate_rules(context, namespace)?;
    let (identity, bom) = context.into_parts();
    show_identity(&identity, &bom, format)
}

fn cmd_diff(old: &Path, new: &Path, format: OutputFormat) -> HwidResult<()> {
    let old = Database::load_file(old, false)?;
    let new = Database::load_file(new, false)?;
    let units = extract_change_units(&old, &new)?;

    if !matches!(format, OutputFormat::AsciiTable) {
        let units: Vec<String> = units.iter().map(ToString::to_string).collect();
        return print_serialized(&units, format);
    }

    let mut table = Table::new();
    table.add_row(Row::new(vec![Cell::new("#"), Cell::new("Change Unit")]));
    for (i, unit) in units.iter().enumerate() {
        table.add_row(Row::new(vec![
            Cell::new(&(i + 1).to_string()),
            Cell::new(&unit.to_string()),
        ]));
    }
    table.printstd();
    Ok(())
}

fn cmd_apply(old: &Path, new: &Path, output: &Path) -> HwidResult<()> {
    let old = Database::load_file(old, false)?;
    let new = Database::load_file(new, false)?;
    let units = extract_change_units(&old, &new)?;
    let database = apply_change_units(&old, &units)?;
    database.save_file(output)?;
    println!(
        "Applied {} change units, wrote {}",
        units.len(),
        output.display()
    );
    Ok(())
}
