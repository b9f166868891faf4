// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The menus of the boot menu, independent of how they are drawn.
//!
//! A frontend implements [`MenuDispatcher`] to present a list of labels and return what the operator picked. Every
//! menu is rebuilt from scratch each time it is shown. Items declare whether they are available (usually whether their
//! script exists on this device), and unavailable items are left out of the list entirely, so the index returned by
//! the dispatcher always maps to an item that can actually be used.

use std::{
    io,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use crate::{
    boot::{
        BootMgr,
        action::reboot,
        mode::{BootMode, MODES_COUNT},
    },
    error::BootError,
    system::fs::sync,
};

/// The label of the item that leaves a menu.
const GO_BACK: &str = "<--Go Back";

/// The amount of modes, from the start, that can be made the default.
const DEFAULT_MODES: usize = MODES_COUNT - 1;

/// The delay around switching the USB gadget into mass storage mode.
const USB_SWITCH_DELAY: Duration = Duration::from_millis(500);

/// The result of presenting a menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuResult {
    /// The operator backed out of the menu.
    GoBack,

    /// The operator picked the item at this index of the presented labels.
    Selected(usize),
}

/// Something that can present a menu to the operator.
pub trait MenuDispatcher {
    /// Presents `labels` under `headers`, with `selected` initially highlighted, and returns the choice.
    fn select(&mut self, headers: &[&str], labels: &[&str], selected: usize) -> MenuResult;
}

/// An item of a menu, with the action it stands for.
pub struct MenuItem<A> {
    /// The text shown for the item.
    label: String,

    /// The action taken when the item is picked.
    action: A,

    /// Whether the item is shown at all.
    available: bool,
}

impl<A> MenuItem<A> {
    /// Creates a new, available [`MenuItem`].
    pub fn new(label: impl Into<String>, action: A) -> Self {
        Self {
            label: label.into(),
            action,
            available: true,
        }
    }

    /// Makes the item available only if `available` is true.
    #[must_use = "Has no effect if the result is unused"]
    pub fn available_if(mut self, available: bool) -> Self {
        self.available &= available;
        self
    }
}

/// A menu, holding only the items that are available.
pub struct Menu<A> {
    /// The header lines shown above the items.
    headers: &'static [&'static str],

    /// The available items.
    items: Vec<MenuItem<A>>,
}

impl<A: Copy + PartialEq> Menu<A> {
    /// Creates a new [`Menu`], dropping any unavailable items.
    pub fn new(headers: &'static [&'static str], items: impl IntoIterator<Item = MenuItem<A>>) -> Self {
        Self {
            headers,
            items: items.into_iter().filter(|x| x.available).collect(),
        }
    }

    /// Returns the labels of the items, in order.
    #[must_use = "Has no effect if the result is unused"]
    pub fn labels(&self) -> Vec<&str> {
        self.items.iter().map(|x| x.label.as_str()).collect()
    }

    /// Maps a [`MenuResult`] back to the action of the picked item.
    ///
    /// Backing out, or an index outside of the menu, gives `None`.
    #[must_use = "Has no effect if the result is unused"]
    pub fn action(&self, result: MenuResult) -> Option<A> {
        match result {
            MenuResult::GoBack => None,
            MenuResult::Selected(idx) => self.items.get(idx).map(|x| x.action),
        }
    }

    /// Finds the index of the item with the given action, or 0 if there is none.
    #[must_use = "Has no effect if the result is unused"]
    pub fn position(&self, action: A) -> usize {
        self.items.iter().position(|x| x.action == action).unwrap_or(0)
    }

    /// Presents the menu through a dispatcher and returns the action that was picked.
    pub fn show(&self, dispatcher: &mut dyn MenuDispatcher, selected: usize) -> Option<A> {
        self.action(dispatcher.select(self.headers, &self.labels(), selected))
    }
}

/// The items of the main menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MainAction {
    /// Open the boot menu.
    Boot,

    /// Open the recovery menu.
    Recovery,

    /// Open the tools menu.
    Tools,

    /// Restart the device.
    Reboot,

    /// Leave the boot menu and continue the normal boot.
    Exit,
}

/// The items of the boot menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootMenuAction {
    /// Open the default mode menu.
    SetDefault,

    /// Boot a mode right now.
    Boot(BootMode),

    /// Go back.
    Back,
}

/// The items of the default mode menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefaultMenuAction {
    /// Make a mode the default.
    Set(BootMode),

    /// Go back.
    Back,
}

/// The items of the recovery menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Run the custom recovery script.
    Custom,

    /// Restart into the stock vendor recovery.
    Stock,

    /// Go back.
    Back,
}

/// The items of the tools menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolAction {
    /// Start the ADB daemon.
    Adbd,

    /// Open the USB mount tools.
    UsbTools,

    /// Open the filesystem tools.
    FsTools,

    /// Go back.
    Back,
}

/// The items of the USB mount tools menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UsbAction {
    /// Share something over USB through the named script.
    Share(&'static str),

    /// Share the whole memory card block device.
    ShareMmc,

    /// Stop sharing anything.
    Stop,

    /// Go back.
    Back,
}

/// The items of the filesystem tools menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FsAction {
    /// Format data and cache through the named script.
    Format(&'static str),

    /// Go back.
    Back,
}

/// Builds the main menu.
#[must_use = "Has no effect if the result is unused"]
pub fn main_menu() -> Menu<MainAction> {
    Menu::new(
        &[" # Main Menu -->", ""],
        [
            MenuItem::new("Boot", MainAction::Boot),
            MenuItem::new("Recovery", MainAction::Recovery),
            MenuItem::new("Tools", MainAction::Tools),
            MenuItem::new("Reboot", MainAction::Reboot),
            MenuItem::new("<--Continue Normal Boot", MainAction::Exit),
        ],
    )
}

/// Builds the boot menu. Modes whose script is missing are left out.
#[must_use = "Has no effect if the result is unused"]
pub fn boot_menu(mgr: &BootMgr) -> Menu<BootMenuAction> {
    let default = mgr.default_mode().unwrap_or_default();

    let items = [MenuItem::new(
        format!("Set Default: [{default}]"),
        BootMenuAction::SetDefault,
    )]
    .into_iter()
    .chain(
        [
            BootMode::SecondBoot,
            BootMode::SecondBootUart,
            BootMode::SecondSystem,
        ]
        .map(|mode| {
            MenuItem::new(mode.encode(), BootMenuAction::Boot(mode)).available_if(mgr.is_available(mode))
        }),
    )
    .chain([MenuItem::new(GO_BACK, BootMenuAction::Back)]);

    Menu::new(&[" # Boot -->", ""], items)
}

/// Builds the default mode menu. The current default is marked with a `*`.
#[must_use = "Has no effect if the result is unused"]
pub fn default_menu(mgr: &BootMgr) -> Menu<DefaultMenuAction> {
    let current = mgr.default_mode();

    let items = BootMode::ALL[..DEFAULT_MODES]
        .iter()
        .map(|&mode| {
            let mark = if current == Some(mode) { '*' } else { ' ' };
            MenuItem::new(format!("{mark}[{mode}]"), DefaultMenuAction::Set(mode))
                .available_if(mgr.is_available(mode))
        })
        .chain([MenuItem::new(GO_BACK, DefaultMenuAction::Back)]);

    Menu::new(&[" # Boot --> Set Default -->", ""], items)
}

/// Builds the recovery menu.
#[must_use = "Has no effect if the result is unused"]
pub fn recovery_menu(mgr: &BootMgr) -> Menu<RecoveryAction> {
    Menu::new(
        &[" # Recovery -->", ""],
        [
            MenuItem::new("Custom Recovery", RecoveryAction::Custom)
                .available_if(mgr.is_available(BootMode::Recovery)),
            MenuItem::new("Stock Recovery", RecoveryAction::Stock),
            MenuItem::new(GO_BACK, RecoveryAction::Back),
        ],
    )
}

/// Builds the tools menu.
#[must_use = "Has no effect if the result is unused"]
pub fn tools_menu(mgr: &BootMgr) -> Menu<ToolAction> {
    Menu::new(
        &["", " # USB Tools -->", ""],
        [
            MenuItem::new("ADB Daemon", ToolAction::Adbd).available_if(mgr.has_tool("adbd")),
            MenuItem::new("USB Mount tools", ToolAction::UsbTools),
            MenuItem::new("File System Tools", ToolAction::FsTools),
            MenuItem::new(GO_BACK, ToolAction::Back),
        ],
    )
}

/// Builds the USB mount tools menu.
#[must_use = "Has no effect if the result is unused"]
pub fn usb_menu(mgr: &BootMgr) -> Menu<UsbAction> {
    let share = |label: &str, name: &'static str| {
        MenuItem::new(label, UsbAction::Share(name)).available_if(mgr.has_tool(name))
    };

    Menu::new(
        &["", " # USB Mount Tools -->", ""],
        [
            share("Share SD Card", "sdcard"),
            share("Share Drivers", "cdrom"),
            share("Share system", "system"),
            share("Share data", "data"),
            MenuItem::new("Share MMC - Dangerous!", UsbAction::ShareMmc),
            MenuItem::new("Stop USB Share", UsbAction::Stop),
            MenuItem::new(GO_BACK, UsbAction::Back),
        ],
    )
}

/// Builds the filesystem tools menu.
#[must_use = "Has no effect if the result is unused"]
pub fn fs_menu(mgr: &BootMgr) -> Menu<FsAction> {
    Menu::new(
        &["", " # File System Tools -->", ""],
        [
            MenuItem::new("Format DATA and CACHE to ext4", FsAction::Format("format_ext4"))
                .available_if(mgr.has_tool("format_ext4")),
            MenuItem::new("Format DATA and CACHE to ext3", FsAction::Format("format_ext3"))
                .available_if(mgr.has_tool("format_ext3")),
            MenuItem::new(GO_BACK, FsAction::Back),
        ],
    )
}

/// Runs the main menu until something was booted or the operator leaves.
///
/// Returns true if a boot attempt or recovery returned successfully.
pub fn show_main_menu(mgr: &mut BootMgr, dispatcher: &mut dyn MenuDispatcher) -> bool {
    loop {
        let menu = main_menu();
        let booted = match menu.show(dispatcher, 0) {
            Some(MainAction::Boot) => show_boot_menu(mgr, dispatcher),
            Some(MainAction::Recovery) => show_recovery_menu(mgr, dispatcher),
            Some(MainAction::Tools) => {
                show_tools_menu(mgr, dispatcher);
                false
            }
            Some(MainAction::Reboot) => {
                mgr.report(true, format_args!("Rebooting...\n"));
                let e = reboot::reset();
                mgr.report(true, format_args!("E:Reboot failed ({e})\n"));
                false
            }
            Some(MainAction::Exit) | None => return false,
        };
        if booted {
            return true;
        }
    }
}

/// Runs the boot menu.
///
/// Returns true if a boot attempt returned successfully. A failed attempt also leaves the menu, after it was
/// reported.
pub fn show_boot_menu(mgr: &mut BootMgr, dispatcher: &mut dyn MenuDispatcher) -> bool {
    loop {
        let menu = boot_menu(mgr);
        match menu.show(dispatcher, 0) {
            Some(BootMenuAction::SetDefault) => show_default_menu(mgr, dispatcher),
            Some(BootMenuAction::Boot(mode)) => {
                return match mgr.attempt_boot(mode, true) {
                    Ok(()) => true,
                    Err(e) => {
                        mgr.report(true, format_args!("E:Boot {mode} failed: {e}\n"));
                        false
                    }
                };
            }
            Some(BootMenuAction::Back) | None => return false,
        }
    }
}

/// Runs the default mode menu until the operator goes back, or a default could not be written.
pub fn show_default_menu(mgr: &mut BootMgr, dispatcher: &mut dyn MenuDispatcher) {
    loop {
        let menu = default_menu(mgr);
        let selected = mgr
            .default_mode()
            .map_or(0, |mode| menu.position(DefaultMenuAction::Set(mode)));

        let Some(DefaultMenuAction::Set(mode)) = menu.show(dispatcher, selected) else {
            return;
        };

        match mgr.set_default(mode.index()) {
            Ok(()) => mgr.report(true, format_args!("Done..\n")),
            Err(BootError::BadMode(_)) => {
                let script = mgr.boot_config.mode_script(mode);
                mgr.report(true, format_args!("Script not found :\n{}\n", script.display()));
            }
            Err(e) => {
                mgr.report(true, format_args!("Failed to setup default boot mode. ({e})\n"));
                return;
            }
        }
    }
}

/// Runs the recovery menu once.
///
/// Returns true if the custom recovery returned successfully.
pub fn show_recovery_menu(mgr: &mut BootMgr, dispatcher: &mut dyn MenuDispatcher) -> bool {
    match recovery_menu(mgr).show(dispatcher, 0) {
        Some(RecoveryAction::Custom) => {
            mgr.report(true, format_args!("Starting Recovery..\n"));
            mgr.report(true, format_args!("This can take a couple of seconds.\n"));
            let script = mgr.boot_config.mode_script(BootMode::Recovery);
            match mgr.runner().run(&script) {
                Ok(_) => true,
                Err(e) => {
                    mgr.report(true, format_args!("E:{e}\n"));
                    false
                }
            }
        }
        Some(RecoveryAction::Stock) => {
            mgr.report(true, format_args!("Rebooting to Stock Recovery..\n"));
            let e = reboot::stock_recovery();
            mgr.report(true, format_args!("E:Reboot failed ({e})\n"));
            false
        }
        Some(RecoveryAction::Back) | None => false,
    }
}

/// Runs the tools menu once.
pub fn show_tools_menu(mgr: &mut BootMgr, dispatcher: &mut dyn MenuDispatcher) {
    match tools_menu(mgr).show(dispatcher, 0) {
        Some(ToolAction::Adbd) => run_tool_reported(mgr, "ADB Daemon....", "adbd"),
        Some(ToolAction::UsbTools) => show_usb_menu(mgr, dispatcher),
        Some(ToolAction::FsTools) => show_fs_menu(mgr, dispatcher),
        Some(ToolAction::Back) | None => (),
    }
}

/// Runs the USB mount tools menu once.
pub fn show_usb_menu(mgr: &mut BootMgr, dispatcher: &mut dyn MenuDispatcher) {
    let device = mgr.device();
    match usb_menu(mgr).show(dispatcher, 0) {
        Some(UsbAction::Share(name)) => run_tool_reported(mgr, "Sharing over USB....", name),
        Some(UsbAction::ShareMmc) => {
            mgr.report(true, format_args!("Set USB device mode..."));
            let mmc: PathBuf = mgr.boot_config.mmc_device.clone();
            sync();
            report_failure(mgr, device.mount_usb_storage(&mmc));
            thread::sleep(USB_SWITCH_DELAY);
            report_failure(mgr, device.set_usb_device_mode("msc_adb"));
            thread::sleep(USB_SWITCH_DELAY);
            report_failure(mgr, device.mount_usb_storage(&mmc));
            mgr.report(true, format_args!("Done..\n"));
        }
        Some(UsbAction::Stop) => {
            mgr.report(true, format_args!("Stopping USB share..."));
            sync();
            report_failure(mgr, device.mount_usb_storage(Path::new("")));
            report_failure(mgr, device.set_usb_device_mode("acm"));
            mgr.report(true, format_args!("Done..\n"));
        }
        Some(UsbAction::Back) | None => (),
    }
}

/// Runs the filesystem tools menu once.
pub fn show_fs_menu(mgr: &mut BootMgr, dispatcher: &mut dyn MenuDispatcher) {
    match fs_menu(mgr).show(dispatcher, 0) {
        Some(FsAction::Format(name)) => run_tool_reported(mgr, "Format DATA and CACHE....", name),
        Some(FsAction::Back) | None => (),
    }
}

/// Shows a failed device write on the console. The write itself has already been logged.
fn report_failure(mgr: &mut BootMgr, result: io::Result<()>) {
    if let Err(e) = result {
        mgr.report(true, format_args!("\nE:{e}\n"));
    }
}

/// Runs a tool script, reporting its start and end to the console.
fn run_tool_reported(mgr: &mut BootMgr, message: &str, name: &str) {
    mgr.report(true, format_args!("{message}"));
    if let Err(e) = mgr.run_tool(name) {
        mgr.report(true, format_args!("\nE:{e}\n"));
    }
    mgr.report(true, format_args!("Done..\n"));
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, fs as stdfs};

    use tempfile::TempDir;

    use super::*;
    use crate::{
        boot::{config::BootConfig, report::RecordingReporter},
        system::runner::tests::{exec_lock, write_script},
    };

    /// Answers menus from a fixed list of results, remembering what was shown.
    #[derive(Default)]
    struct ScriptedDispatcher {
        results: VecDeque<MenuResult>,
        shown: Vec<(Vec<String>, usize)>,
    }

    impl ScriptedDispatcher {
        fn new(results: impl IntoIterator<Item = MenuResult>) -> Self {
            Self {
                results: results.into_iter().collect(),
                shown: Vec::new(),
            }
        }
    }

    impl MenuDispatcher for ScriptedDispatcher {
        fn select(&mut self, _headers: &[&str], labels: &[&str], selected: usize) -> MenuResult {
            self.shown
                .push((labels.iter().map(|&x| x.to_owned()).collect(), selected));
            self.results.pop_front().unwrap_or(MenuResult::GoBack)
        }
    }

    fn mgr() -> (TempDir, BootMgr, RecordingReporter) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let root = dir.path();
        stdfs::create_dir(root.join("script")).expect("Failed to create script dir");
        let config = BootConfig {
            default_mode_file: root.join("default_bootmode.conf"),
            next_mode_file: root.join("bootmode.conf"),
            bypass_file: root.join("bypass"),
            script_dir: root.join("script"),
            bin_dir: root.join("bin"),
            tick: Duration::ZERO,
            ..BootConfig::default()
        };
        let console = RecordingReporter::default();
        let mgr = BootMgr::with_reporters(
            config,
            Box::new(console.clone()),
            Box::new(RecordingReporter::default()),
        );
        (dir, mgr, console)
    }

    #[test]
    fn test_menu_mapping() {
        let menu = Menu::new(
            &[],
            [
                MenuItem::new("a", 1),
                MenuItem::new("b", 2).available_if(false),
                MenuItem::new("c", 3),
            ],
        );
        assert_eq!(menu.labels(), ["a", "c"]);
        assert_eq!(menu.action(MenuResult::Selected(1)), Some(3));
        assert_eq!(menu.action(MenuResult::Selected(2)), None);
        assert_eq!(menu.action(MenuResult::GoBack), None);
        assert_eq!(menu.position(3), 1);
        assert_eq!(menu.position(2), 0);
    }

    #[test]
    fn test_boot_menu_hides_missing_scripts() {
        let (_dir, mgr, _) = mgr();
        assert_eq!(boot_menu(&mgr).labels(), ["Set Default: [bootmenu]", GO_BACK]);

        write_script(&mgr.boot_config.mode_script(BootMode::SecondSystem), "exit 0");
        assert_eq!(
            boot_menu(&mgr).labels(),
            ["Set Default: [bootmenu]", "2nd-system", GO_BACK]
        );
    }

    #[test]
    fn test_default_menu_marks_current() -> crate::BootResult<()> {
        let (_dir, mut mgr, _) = mgr();
        write_script(&mgr.boot_config.mode_script(BootMode::SecondBoot), "exit 0");
        write_script(&mgr.boot_config.mode_script(BootMode::Recovery), "exit 0");
        mgr.set_default(BootMode::SecondBoot.index())?;

        let menu = default_menu(&mgr);
        assert_eq!(menu.labels(), [" [bootmenu]", "*[2nd-boot]", GO_BACK]); // recovery is never a default
        assert_eq!(menu.position(DefaultMenuAction::Set(BootMode::SecondBoot)), 1);
        Ok(())
    }

    #[test]
    fn test_set_default_through_menus() {
        let (_dir, mut mgr, console) = mgr();
        write_script(&mgr.boot_config.mode_script(BootMode::SecondBootUart), "exit 0");

        // boot menu -> set default -> 2nd-boot-uart -> back -> back
        let mut dispatcher = ScriptedDispatcher::new([
            MenuResult::Selected(0),
            MenuResult::Selected(1),
            MenuResult::GoBack,
            MenuResult::GoBack,
        ]);
        assert!(!show_boot_menu(&mut mgr, &mut dispatcher));
        assert_eq!(mgr.default_mode(), Some(BootMode::SecondBootUart));
        assert_eq!(console.lines(), ["Done..\n"]);

        // the labels are rebuilt after the default changed
        let (labels, selected) = &dispatcher.shown[2];
        assert_eq!(labels, &[" [bootmenu]", "*[2nd-boot-uart]", GO_BACK]);
        assert_eq!(*selected, 1);
        assert_eq!(dispatcher.shown[3].0[0], "Set Default: [2nd-boot-uart]");
    }

    #[test]
    fn test_boot_from_menu() {
        let _lock = exec_lock();
        let (_dir, mut mgr, console) = mgr();
        write_script(&mgr.boot_config.mode_script(BootMode::SecondBoot), "exit 0");

        let mut dispatcher = ScriptedDispatcher::new([MenuResult::Selected(0), MenuResult::Selected(1)]);
        assert!(show_main_menu(&mut mgr, &mut dispatcher));
        assert_eq!(console.lines(), ["Start 2nd-boot boot....\n", "2..\n", "1..\n"]);
        assert!(!mgr.is_bypassed());
    }

    #[test]
    fn test_failed_boot_from_menu() {
        let _lock = exec_lock();
        let (_dir, mut mgr, console) = mgr();
        write_script(&mgr.boot_config.mode_script(BootMode::SecondBoot), "exit 2");

        let mut dispatcher = ScriptedDispatcher::new([MenuResult::Selected(1)]);
        assert!(!show_boot_menu(&mut mgr, &mut dispatcher));
        let lines = console.lines();
        assert_eq!(lines[0], "Start 2nd-boot boot....\n");
        assert!(lines[1].starts_with("E:Boot 2nd-boot failed"));
        assert!(!mgr.is_bypassed());
    }

    #[test]
    fn test_tools_menu_runs_script() {
        let _lock = exec_lock();
        let (dir, mut mgr, console) = mgr();
        let marker = dir.path().join("adbd_ran");
        write_script(&mgr.boot_config.tool_script("adbd"), &format!("touch {}", marker.display()));

        let mut dispatcher = ScriptedDispatcher::new([MenuResult::Selected(0)]);
        show_tools_menu(&mut mgr, &mut dispatcher);
        assert!(marker.exists());
        assert_eq!(console.lines(), ["ADB Daemon....", "Done..\n"]);
    }

    #[test]
    fn test_stop_usb_share() -> io::Result<()> {
        let (dir, mut mgr, console) = mgr();
        let lun = dir.path().join("lun0_file");
        let usb_mode = dir.path().join("usb_device_mode");
        stdfs::write(&lun, "/dev/block/mmcblk0")?;
        mgr.boot_config.ums_lun_file = lun.clone();
        mgr.boot_config.usb_mode_switch = usb_mode.clone();

        // without tool scripts, only the MMC share comes before stop
        let mut dispatcher = ScriptedDispatcher::new([MenuResult::Selected(1)]);
        show_usb_menu(&mut mgr, &mut dispatcher);
        assert_eq!(dispatcher.shown[0].0[1], "Stop USB Share");
        assert_eq!(stdfs::read_to_string(&lun)?, "");
        assert_eq!(stdfs::read_to_string(&usb_mode)?, "acm");
        assert_eq!(console.lines(), ["Stopping USB share...", "Done..\n"]);
        Ok(())
    }

    #[test]
    fn test_stop_usb_share_reports_failures() {
        let (dir, mut mgr, console) = mgr();
        mgr.boot_config.ums_lun_file = dir.path().join("missing").join("lun0_file");
        mgr.boot_config.usb_mode_switch = dir.path().join("usb_device_mode");

        let mut dispatcher = ScriptedDispatcher::new([MenuResult::Selected(1)]);
        show_usb_menu(&mut mgr, &mut dispatcher);

        let lines = console.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Stopping USB share...");
        assert!(lines[1].starts_with("\nE:"));
        assert_eq!(lines[2], "Done..\n");
        assert!(dir.path().join("usb_device_mode").exists()); // a failed step does not stop the rest
    }

    #[test]
    fn test_exit_main_menu() {
        let (_dir, mut mgr, _) = mgr();
        let mut dispatcher = ScriptedDispatcher::new([MenuResult::Selected(4)]);
        assert!(!show_main_menu(&mut mgr, &mut dispatcher));
        assert_eq!(dispatcher.shown.len(), 1);
    }
}
