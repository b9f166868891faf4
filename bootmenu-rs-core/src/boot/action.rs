// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides actions that end the current boot outside of a script, like rebooting.

pub mod reboot;
