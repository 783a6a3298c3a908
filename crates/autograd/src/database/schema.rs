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

// Diesel table definitions shared by both backends. Identifiers are stored as
// text (ULIDs for outbox records, UUIDs for domain rows) so the same schema
// compiles against PostgreSQL and SQLite.

diesel::table! {
    outbox_items (id) {
        id -> Text,
        idempotent_key -> Text,
        status -> Text,
        job_type -> Text,
        payload -> Binary,
        version -> Integer,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    users (id) {
        id -> Text,
        name -> Text,
        email -> Text,
        active -> Bool,
        activation_token -> Text,
    }
}

diesel::table! {
    files (id) {
        id -> Text,
        name -> Text,
        path -> Text,
        file_type -> Text,
    }
}

diesel::table! {
    assignments (id) {
        id -> Text,
        name -> Text,
        assigned_by -> Text,
        deadline_at -> Timestamp,
        case_input_file_id -> Text,
        case_output_file_id -> Text,
    }
}

diesel::table! {
    submissions (id) {
        id -> Text,
        assignment_id -> Text,
        submitted_by -> Text,
        file_id -> Text,
        grade -> Integer,
        feedback -> Text,
        is_graded -> Bool,
        updated_at -> Timestamp,
    }
}

diesel::joinable!(submissions -> assignments (assignment_id));

diesel::allow_tables_to_appear_in_same_query!(outbox_items, users, files, assignments, submissions);
