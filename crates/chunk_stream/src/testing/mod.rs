// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Utilities for testing code that uses `chunk_stream` abstractions.

mod fake_resource;

pub use fake_resource::*;
