//! The command mapping table.
//!
//! One declarative entry per command in the vocabulary, mapping it onto
//! protocol-specific invocation recipes. Adding a command or covering a
//! new protocol variant is a one-entry change here; no dispatch logic
//! lives anywhere else.
//!
//! An entry with `legacy: None` is a modern-only operation and must name
//! an `unsupported_message` — invoking it on a legacy connection is a
//! contract violation reported as unsupported, not attempted on the
//! wire. The table is consistency-checked by tests over the whole
//! vocabulary.

use forgekit_core::{CommandError, Result};
use futures::future::BoxFuture;

use crate::commands::{Command, CommandKind, CommandOutput};
use crate::transport::{LegacyClient, ModernHandle};

/// The legacy recent-files listing has no native limit parameter; the
/// raw result is cut to this many entries after the call returns.
pub const RECENT_FILES_LIMIT: usize = 10;

/// Dispatch function against the modern client bundle.
pub type ModernDispatchFn =
    for<'a> fn(&'a ModernHandle, &'a Command) -> BoxFuture<'a, Result<CommandOutput>>;

/// Dispatch function against the legacy client.
pub type LegacyDispatchFn =
    for<'a> fn(&'a dyn LegacyClient, &'a Command) -> BoxFuture<'a, Result<CommandOutput>>;

/// Adjustment applied to a raw legacy result after the call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcess {
    /// Keep only the first [`RECENT_FILES_LIMIT`] entries of a listing.
    FirstTen,
}

impl PostProcess {
    /// Apply this adjustment to a command output.
    pub fn apply(&self, output: CommandOutput) -> CommandOutput {
        match (self, output) {
            (PostProcess::FirstTen, CommandOutput::Files(mut files)) => {
                files.truncate(RECENT_FILES_LIMIT);
                CommandOutput::Files(files)
            }
            (_, other) => other,
        }
    }
}

/// Legacy half of a mapping entry.
pub struct LegacyDispatch {
    /// The invocation recipe.
    pub invoke: LegacyDispatchFn,
    /// Adjustment applied to the raw result.
    pub post_process: Option<PostProcess>,
}

/// One row of the command mapping table.
pub struct CommandSpec {
    /// The command this entry covers.
    pub kind: CommandKind,
    /// Modern invocation recipe, if the modern API can perform it.
    pub modern: Option<ModernDispatchFn>,
    /// Legacy invocation recipe, if the legacy dialect can perform it.
    pub legacy: Option<LegacyDispatch>,
    /// Message reported when the active variant has no recipe.
    pub unsupported_message: Option<&'static str>,
    /// Override recipe used on modern connections when manual LED
    /// control is configured; routes through the raw TCP bypass.
    pub custom_leds_fallback: Option<ModernDispatchFn>,
}

impl CommandSpec {
    /// Whether the legacy dialect supports this command.
    pub fn legacy_supported(&self) -> bool {
        self.legacy.is_some()
    }
}

/// Find the table row for a command.
pub fn command_spec(kind: CommandKind) -> Option<&'static CommandSpec> {
    COMMAND_TABLE.iter().find(|spec| spec.kind == kind)
}

fn wrong_args(command: &Command) -> forgekit_core::Error {
    CommandError::InvalidArguments {
        command: command.name().to_string(),
        reason: "argument shape does not match the operation".to_string(),
    }
    .into()
}

// Modern recipes

fn modern_home<'a>(h: &'a ModernHandle, _cmd: &'a Command) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move { h.control.home_axes().await.map(|_| CommandOutput::Ack) })
}

fn modern_led_on<'a>(h: &'a ModernHandle, _cmd: &'a Command) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move { h.control.set_led(true).await.map(|_| CommandOutput::Ack) })
}

fn modern_led_off<'a>(h: &'a ModernHandle, _cmd: &'a Command) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move { h.control.set_led(false).await.map(|_| CommandOutput::Ack) })
}

fn modern_led_on_bypass<'a>(
    h: &'a ModernHandle,
    _cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move { h.tcp.led_on().await.map(|_| CommandOutput::Ack) })
}

fn modern_led_off_bypass<'a>(
    h: &'a ModernHandle,
    _cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move { h.tcp.led_off().await.map(|_| CommandOutput::Ack) })
}

fn modern_set_bed<'a>(h: &'a ModernHandle, cmd: &'a Command) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move {
        let Command::SetBedTemperature { celsius } = cmd else {
            return Err(wrong_args(cmd));
        };
        h.temp_control
            .set_bed_temperature(*celsius)
            .await
            .map(|_| CommandOutput::Ack)
    })
}

fn modern_cancel_bed<'a>(
    h: &'a ModernHandle,
    _cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move {
        h.temp_control
            .cancel_bed_temperature()
            .await
            .map(|_| CommandOutput::Ack)
    })
}

fn modern_set_extruder<'a>(
    h: &'a ModernHandle,
    cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move {
        let Command::SetExtruderTemperature { celsius } = cmd else {
            return Err(wrong_args(cmd));
        };
        h.temp_control
            .set_extruder_temperature(*celsius)
            .await
            .map(|_| CommandOutput::Ack)
    })
}

fn modern_cancel_extruder<'a>(
    h: &'a ModernHandle,
    _cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move {
        h.temp_control
            .cancel_extruder_temperature()
            .await
            .map(|_| CommandOutput::Ack)
    })
}

fn modern_pause<'a>(h: &'a ModernHandle, _cmd: &'a Command) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move { h.job_control.pause_job().await.map(|_| CommandOutput::Ack) })
}

fn modern_resume<'a>(h: &'a ModernHandle, _cmd: &'a Command) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move { h.job_control.resume_job().await.map(|_| CommandOutput::Ack) })
}

fn modern_cancel<'a>(h: &'a ModernHandle, _cmd: &'a Command) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move { h.job_control.cancel_job().await.map(|_| CommandOutput::Ack) })
}

fn modern_start_job<'a>(h: &'a ModernHandle, cmd: &'a Command) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move {
        let Command::StartJob { file_name } = cmd else {
            return Err(wrong_args(cmd));
        };
        h.job_control
            .start_local_job(file_name)
            .await
            .map(|_| CommandOutput::Ack)
    })
}

fn modern_clear_platform<'a>(
    h: &'a ModernHandle,
    _cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move { h.control.clear_platform().await.map(|_| CommandOutput::Ack) })
}

fn modern_filtration_external<'a>(
    h: &'a ModernHandle,
    _cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move {
        h.control
            .set_filtration(true, false)
            .await
            .map(|_| CommandOutput::Ack)
    })
}

fn modern_filtration_internal<'a>(
    h: &'a ModernHandle,
    _cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move {
        h.control
            .set_filtration(false, true)
            .await
            .map(|_| CommandOutput::Ack)
    })
}

fn modern_filtration_off<'a>(
    h: &'a ModernHandle,
    _cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move {
        h.control
            .set_filtration(false, false)
            .await
            .map(|_| CommandOutput::Ack)
    })
}

fn modern_list_recent<'a>(
    h: &'a ModernHandle,
    _cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move {
        h.files
            .list_recent_files(RECENT_FILES_LIMIT)
            .await
            .map(CommandOutput::Files)
    })
}

fn modern_list_local<'a>(
    h: &'a ModernHandle,
    _cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move { h.files.list_local_files().await.map(CommandOutput::Files) })
}

fn modern_upload<'a>(h: &'a ModernHandle, cmd: &'a Command) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move {
        let (Command::UploadFile { request } | Command::UploadFileWithMaterials { request }) = cmd
        else {
            return Err(wrong_args(cmd));
        };
        h.files.upload_file(request).await.map(|_| CommandOutput::Ack)
    })
}

// Legacy recipes

fn legacy_home<'a>(
    c: &'a dyn LegacyClient,
    _cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move { c.home_axes().await.map(|_| CommandOutput::Ack) })
}

fn legacy_led_on<'a>(
    c: &'a dyn LegacyClient,
    _cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move { c.led_on().await.map(|_| CommandOutput::Ack) })
}

fn legacy_led_off<'a>(
    c: &'a dyn LegacyClient,
    _cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move { c.led_off().await.map(|_| CommandOutput::Ack) })
}

fn legacy_set_bed<'a>(
    c: &'a dyn LegacyClient,
    cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move {
        let Command::SetBedTemperature { celsius } = cmd else {
            return Err(wrong_args(cmd));
        };
        c.set_bed_temperature(*celsius).await.map(|_| CommandOutput::Ack)
    })
}

fn legacy_cancel_bed<'a>(
    c: &'a dyn LegacyClient,
    _cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move { c.cancel_bed_temperature().await.map(|_| CommandOutput::Ack) })
}

fn legacy_set_extruder<'a>(
    c: &'a dyn LegacyClient,
    cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move {
        let Command::SetExtruderTemperature { celsius } = cmd else {
            return Err(wrong_args(cmd));
        };
        c.set_extruder_temperature(*celsius)
            .await
            .map(|_| CommandOutput::Ack)
    })
}

fn legacy_cancel_extruder<'a>(
    c: &'a dyn LegacyClient,
    _cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move {
        c.cancel_extruder_temperature()
            .await
            .map(|_| CommandOutput::Ack)
    })
}

fn legacy_pause<'a>(
    c: &'a dyn LegacyClient,
    _cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move { c.pause_job().await.map(|_| CommandOutput::Ack) })
}

fn legacy_resume<'a>(
    c: &'a dyn LegacyClient,
    _cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move { c.resume_job().await.map(|_| CommandOutput::Ack) })
}

fn legacy_cancel<'a>(
    c: &'a dyn LegacyClient,
    _cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move { c.cancel_job().await.map(|_| CommandOutput::Ack) })
}

fn legacy_start_job<'a>(
    c: &'a dyn LegacyClient,
    cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move {
        let Command::StartJob { file_name } = cmd else {
            return Err(wrong_args(cmd));
        };
        c.start_local_job(file_name).await.map(|_| CommandOutput::Ack)
    })
}

fn legacy_list_files<'a>(
    c: &'a dyn LegacyClient,
    _cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move { c.list_files().await.map(CommandOutput::Files) })
}

fn legacy_upload<'a>(
    c: &'a dyn LegacyClient,
    cmd: &'a Command,
) -> BoxFuture<'a, Result<CommandOutput>> {
    Box::pin(async move {
        let Command::UploadFile { request } = cmd else {
            return Err(wrong_args(cmd));
        };
        c.upload_file(request).await.map(|_| CommandOutput::Ack)
    })
}

/// The command mapping table, one row per vocabulary entry.
pub const COMMAND_TABLE: &[CommandSpec] = &[
    CommandSpec {
        kind: CommandKind::HomeAxes,
        modern: Some(modern_home),
        legacy: Some(LegacyDispatch {
            invoke: legacy_home,
            post_process: None,
        }),
        unsupported_message: None,
        custom_leds_fallback: None,
    },
    CommandSpec {
        kind: CommandKind::LedOn,
        modern: Some(modern_led_on),
        legacy: Some(LegacyDispatch {
            invoke: legacy_led_on,
            post_process: None,
        }),
        unsupported_message: None,
        custom_leds_fallback: Some(modern_led_on_bypass),
    },
    CommandSpec {
        kind: CommandKind::LedOff,
        modern: Some(modern_led_off),
        legacy: Some(LegacyDispatch {
            invoke: legacy_led_off,
            post_process: None,
        }),
        unsupported_message: None,
        custom_leds_fallback: Some(modern_led_off_bypass),
    },
    CommandSpec {
        kind: CommandKind::SetBedTemperature,
        modern: Some(modern_set_bed),
        legacy: Some(LegacyDispatch {
            invoke: legacy_set_bed,
            post_process: None,
        }),
        unsupported_message: None,
        custom_leds_fallback: None,
    },
    CommandSpec {
        kind: CommandKind::CancelBedTemperature,
        modern: Some(modern_cancel_bed),
        legacy: Some(LegacyDispatch {
            invoke: legacy_cancel_bed,
            post_process: None,
        }),
        unsupported_message: None,
        custom_leds_fallback: None,
    },
    CommandSpec {
        kind: CommandKind::SetExtruderTemperature,
        modern: Some(modern_set_extruder),
        legacy: Some(LegacyDispatch {
            invoke: legacy_set_extruder,
            post_process: None,
        }),
        unsupported_message: None,
        custom_leds_fallback: None,
    },
    CommandSpec {
        kind: CommandKind::CancelExtruderTemperature,
        modern: Some(modern_cancel_extruder),
        legacy: Some(LegacyDispatch {
            invoke: legacy_cancel_extruder,
            post_process: None,
        }),
        unsupported_message: None,
        custom_leds_fallback: None,
    },
    CommandSpec {
        kind: CommandKind::PauseJob,
        modern: Some(modern_pause),
        legacy: Some(LegacyDispatch {
            invoke: legacy_pause,
            post_process: None,
        }),
        unsupported_message: None,
        custom_leds_fallback: None,
    },
    CommandSpec {
        kind: CommandKind::ResumeJob,
        modern: Some(modern_resume),
        legacy: Some(LegacyDispatch {
            invoke: legacy_resume,
            post_process: None,
        }),
        unsupported_message: None,
        custom_leds_fallback: None,
    },
    CommandSpec {
        kind: CommandKind::CancelJob,
        modern: Some(modern_cancel),
        legacy: Some(LegacyDispatch {
            invoke: legacy_cancel,
            post_process: None,
        }),
        unsupported_message: None,
        custom_leds_fallback: None,
    },
    CommandSpec {
        kind: CommandKind::StartJob,
        modern: Some(modern_start_job),
        legacy: Some(LegacyDispatch {
            invoke: legacy_start_job,
            post_process: None,
        }),
        unsupported_message: None,
        custom_leds_fallback: None,
    },
    CommandSpec {
        kind: CommandKind::ClearPlatform,
        modern: Some(modern_clear_platform),
        legacy: None,
        unsupported_message: Some("Clear platform requires the modern printer API"),
        custom_leds_fallback: None,
    },
    CommandSpec {
        kind: CommandKind::SetExternalFiltrationOn,
        modern: Some(modern_filtration_external),
        legacy: None,
        unsupported_message: Some("Filtration control requires the modern printer API"),
        custom_leds_fallback: None,
    },
    CommandSpec {
        kind: CommandKind::SetInternalFiltrationOn,
        modern: Some(modern_filtration_internal),
        legacy: None,
        unsupported_message: Some("Filtration control requires the modern printer API"),
        custom_leds_fallback: None,
    },
    CommandSpec {
        kind: CommandKind::SetFiltrationOff,
        modern: Some(modern_filtration_off),
        legacy: None,
        unsupported_message: Some("Filtration control requires the modern printer API"),
        custom_leds_fallback: None,
    },
    CommandSpec {
        kind: CommandKind::ListRecentFiles,
        modern: Some(modern_list_recent),
        legacy: Some(LegacyDispatch {
            invoke: legacy_list_files,
            post_process: Some(PostProcess::FirstTen),
        }),
        unsupported_message: None,
        custom_leds_fallback: None,
    },
    CommandSpec {
        kind: CommandKind::ListLocalFiles,
        modern: Some(modern_list_local),
        legacy: Some(LegacyDispatch {
            invoke: legacy_list_files,
            post_process: None,
        }),
        unsupported_message: None,
        custom_leds_fallback: None,
    },
    CommandSpec {
        kind: CommandKind::UploadFile,
        modern: Some(modern_upload),
        legacy: Some(LegacyDispatch {
            invoke: legacy_upload,
            post_process: None,
        }),
        unsupported_message: None,
        custom_leds_fallback: None,
    },
    CommandSpec {
        kind: CommandKind::UploadFileWithMaterials,
        modern: Some(modern_upload),
        legacy: None,
        unsupported_message: Some("Material station upload requires the modern printer API"),
        custom_leds_fallback: None,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_command_has_exactly_one_entry() {
        for &kind in CommandKind::ALL {
            let matching = COMMAND_TABLE.iter().filter(|s| s.kind == kind).count();
            assert_eq!(matching, 1, "{} must have exactly one table row", kind);
        }
        assert_eq!(COMMAND_TABLE.len(), CommandKind::ALL.len());
    }

    #[test]
    fn test_unsupported_entries_carry_a_message() {
        for spec in COMMAND_TABLE {
            if spec.legacy.is_none() {
                assert!(
                    spec.unsupported_message.is_some(),
                    "{} has no legacy recipe and must carry an unsupported message",
                    spec.kind
                );
            }
            // Every command is reachable on the modern protocol
            assert!(spec.modern.is_some(), "{} lacks a modern recipe", spec.kind);
        }
    }

    #[test]
    fn test_modern_only_set() {
        let modern_only: Vec<CommandKind> = COMMAND_TABLE
            .iter()
            .filter(|s| !s.legacy_supported())
            .map(|s| s.kind)
            .collect();
        assert_eq!(
            modern_only,
            vec![
                CommandKind::ClearPlatform,
                CommandKind::SetExternalFiltrationOn,
                CommandKind::SetInternalFiltrationOn,
                CommandKind::SetFiltrationOff,
                CommandKind::UploadFileWithMaterials,
            ]
        );
    }

    #[test]
    fn test_led_commands_carry_the_bypass() {
        for kind in [CommandKind::LedOn, CommandKind::LedOff] {
            let spec = command_spec(kind).unwrap();
            assert!(spec.custom_leds_fallback.is_some());
        }
        let home = command_spec(CommandKind::HomeAxes).unwrap();
        assert!(home.custom_leds_fallback.is_none());
    }

    #[test]
    fn test_first_ten_post_process() {
        let files: Vec<String> = (0..25).map(|i| format!("file-{}.gx", i)).collect();
        let output = PostProcess::FirstTen.apply(CommandOutput::Files(files));
        let files = output.into_files().unwrap();
        assert_eq!(files.len(), RECENT_FILES_LIMIT);
        assert_eq!(files[0], "file-0.gx");
        assert_eq!(files[9], "file-9.gx");
    }

    #[test]
    fn test_recent_files_declares_first_ten() {
        let spec = command_spec(CommandKind::ListRecentFiles).unwrap();
        assert_eq!(
            spec.legacy.as_ref().unwrap().post_process,
            Some(PostProcess::FirstTen)
        );
        let local = command_spec(CommandKind::ListLocalFiles).unwrap();
        assert!(local.legacy.as_ref().unwrap().post_process.is_none());
    }
}
