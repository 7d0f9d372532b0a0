// SPDX-FileCopyrightText: 2024 Ohin "Kazani" Taylor <kazani@kazani.dev>
// SPDX-License-Identifier: MIT

pub mod access;
pub mod admin;
pub mod calculators;
pub mod config;
pub mod content;
pub mod enrich;
pub mod error;
pub mod feed;
pub mod files;
pub mod handler;
pub mod listing;
pub mod metadata;
pub mod pages;
pub mod pdf;
pub mod relevance;
pub mod schema;
pub mod server;
pub mod site;
pub mod store;
pub mod template;
