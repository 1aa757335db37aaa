//! Cross-cutting helpers.

pub mod log;
