// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

#![no_main]

use bootmenu_rs_core::boot::mode::BootMode;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(token) = str::from_utf8(data) {
        let mode = BootMode::decode(token);
        assert_eq!(BootMode::decode(mode.encode()), mode);
    }
});
