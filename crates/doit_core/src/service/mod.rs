//! Core use-case services.
//!
//! # Responsibility
//! - Own the live task/project/section/label state behind one mutation API.
//! - Keep tree traversal and AI-assisted capture out of UI code.

pub mod board;
pub mod capture;
pub mod forest;
