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

// src/lib.rs
// libhwid implements the HWID (hardware id) database model, the
// BOM <-> HWID string codec, the rule evaluation language used to
// derive or verify an HWID from device facts, and the change unit
// engine used to evolve a database without breaking HWIDs that are
// already out in the field.

pub mod change_unit;
pub mod cmd;
pub mod codec;
pub mod database;
pub mod error;
pub mod loader;
pub mod rule;
