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

// src/cmd/args.rs

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::rule::context::Phase;

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    #[value(name = "table")]
    AsciiTable,
    #[value(name = "json")]
    Json,
    #[value(name = "yaml")]
    Yaml,
}

#[derive(Debug, Clone, ValueEnum, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser)]
#[command(name = "hwid-tool")]
#[command(about = "Encode, decode and evolve HWID databases")]
#[command(version)]
pub struct Cli {
    // --log-level controls the tracing output level (default: info).
    // Can be overridden by the RUST_LOG environment variable.
    #[arg(long, default_value = "info", global = true)]
    pub log_level: LogLevel,

    // --format selects how results are printed.
    #[arg(long, default_value = "table", global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

// DatabaseArgs selects the database a command works on: either a
// file given directly, or a project looked up in a database directory.
#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    // --database is the path of a database file.
    #[arg(long, conflicts_with_all = ["project", "database_dir"])]
    pub database: Option<PathBuf>,

    // --project is the project to load from --database-dir.
    #[arg(long, requires = "database_dir")]
    pub project: Option<String>,

    // --database-dir is the directory holding one database per project.
    #[arg(long, requires = "project")]
    pub database_dir: Option<PathBuf>,

    // --internal loads the internal variant of the project database.
    #[arg(long, requires = "project")]
    pub internal: bool,

    // --skip-checksum loads databases whose stored checksum is stale.
    #[arg(long)]
    pub skip_checksum: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    // Version shows `version` information.
    Version,
    // VerifyDb loads a database file, checking its schema and checksum.
    VerifyDb {
        file: PathBuf,
    },
    // ShowDb prints a summary of a database file.
    ShowDb {
        file: PathBuf,
    },
    // Encode encodes a BOM file into an HWID.
    Encode {
        #[command(flatten)]
        database: DatabaseArgs,

        // --bom is a YAML file with encoding_mode, image_id and the
        // components selected per class.
        #[arg(long)]
        bom: PathBuf,
    },
    // Decode decodes an HWID string.
    Decode {
        #[command(flatten)]
        database: DatabaseArgs,

        hwid: String,
    },
    // Evaluate decodes an HWID and runs the database rules on it.
    Evaluate {
        #[command(flatten)]
        database: DatabaseArgs,

        hwid: String,

        // --device-info is a JSON file of probed device facts.
        #[arg(long)]
        device_info: Option<PathBuf>,

        // --vpd is a YAML file with "ro" and "rw" VPD sections.
        #[arg(long)]
        vpd: Option<PathBuf>,

        // --phase is the build phase of the device.
        #[arg(long, default_value = "PVT", value_parser = parse_phase)]
        phase: Phase,

        // --namespace only runs rules whose name matches; a trailing
        // '*' matches any suffix.
        #[arg(long)]
        namespace: Option<String>,
    },
    // Diff lists the change units between two database files.
    Diff {
        old: PathBuf,
        new: PathBuf,
    },
    // Apply replays the change units between two database files onto
    // the old one and writes the result.
    Apply {
        old: PathBuf,
        new: PathBuf,

        // --output is where the resulting database is written.
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn parse_phase(phase: &str) -> Result<Phase, String> {
    phase.parse()
}
