/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

use chrono::NaiveDateTime;
use uuid::Uuid;

/// A stored file: submitted source code or an assignment's reference data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub id: Uuid,
    pub name: String,
    /// Path inside the object store
    pub path: String,
    pub file_type: String,
}

/// A programming assignment with its reference input and expected output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub id: Uuid,
    pub name: String,
    pub assigned_by: Uuid,
    pub deadline_at: NaiveDateTime,
    /// Input fed to the program on stdin, one test case per line
    pub case_input_file_id: Uuid,
    /// Expected stdout, one line per test case
    pub case_output_file_id: Uuid,
}
