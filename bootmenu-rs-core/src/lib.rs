// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The `bootmenu-rs` library crate.
//!
//! This holds everything needed to decide which target a dual-boot device starts next, and to hand control over
//! to the vendor scripts that actually perform the switch. The persistent default mode, the one-shot next-boot
//! mode, the signature bypass flag and the script runner all live here, so that different frontends (the
//! command line one, or the minimal text menu) can share the exact same boot logic.
//!
//! An example frontend of this core can be found in `bootmenu-rs-minimal`.
//!
//! ## MSRV
//!
//! The minimum supported rust version is 1.88.0.

/// The primary result type that wraps around [`crate::error::BootError`].
pub type BootResult<T> = Result<T, crate::error::BootError>;

pub mod boot;
pub mod error;
pub mod system;
