// Composekey Integration Tests
//
// These tests verify the pipeline from files on disk to typed text:
// settings TOML -> sequence files -> layout -> Composer -> sink
//
// Run with: cargo test --test integration_test

mod support;

mod tests {
    use std::path::PathBuf;

    use super::support::{Event, RecordingSink};
    use composekey_core::window::connect_first;
    use composekey_core::{
        Composer, ComposerSettings, FocusSource, Key, KeyCode, KeySequence, KeyboardLayout,
        RawKeyEvent, SequenceTable, SettingsError, TableError, WindowError, WindowInfo,
        WindowTracker,
    };

    /// A file in the temp directory, removed on drop
    struct TempFile(PathBuf);

    impl TempFile {
        fn new(name: &str, content: &str) -> Self {
            let path = std::env::temp_dir()
                .join(format!("composekey-{}-{}", std::process::id(), name));
            std::fs::write(&path, content).unwrap();
            Self(path)
        }

        fn path_str(&self) -> &str {
            self.0.to_str().unwrap()
        }
    }

    impl Drop for TempFile {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    fn tap_key(composer: &Composer, code: KeyCode) {
        composer.process_event(RawKeyEvent::press(code));
        composer.process_event(RawKeyEvent::release(code));
    }

    fn sequence(keys: &[&str]) -> KeySequence {
        keys.iter().map(|k| Key::text(*k)).collect()
    }

    #[test]
    fn test_builtin_table() {
        let table = SequenceTable::builtin().unwrap();
        assert!(!table.is_empty());
        assert_eq!(table.result(&sequence(&["o", "e"]), false), Some("œ"));
        assert!(table.is_valid_prefix(&sequence(&["'"]), false));

        let entry = table.entry(&sequence(&["a", "e"])).unwrap();
        assert_eq!(entry.result, "æ");
        assert_eq!(
            entry.description.as_deref(),
            Some("LATIN SMALL LETTER AE")
        );
    }

    #[test]
    fn test_user_file_overrides_builtin() {
        let user = TempFile::new(
            "override.XCompose",
            "<Multi_key> <o> <e> : \"OE!\"\n<Multi_key> <h> <h> : \"ħ\" # custom\n",
        );
        let config = TempFile::new(
            "override.toml",
            &format!("[sequences]\nfiles = [\"{}\"]\n", user.path_str()),
        );

        let settings = ComposerSettings::from_file(&config.0).unwrap();
        assert_eq!(settings.source_path.as_ref(), Some(&config.0));
        let table = settings.load_sequences().unwrap();

        assert_eq!(table.result(&sequence(&["o", "e"]), false), Some("OE!"));
        assert_eq!(table.result(&sequence(&["h", "h"]), false), Some("ħ"));
        // Untouched built-in sequences survive
        assert_eq!(table.result(&sequence(&["a", "e"]), false), Some("æ"));
    }

    #[test]
    fn test_missing_sequence_file_is_skipped() {
        let settings = ComposerSettings::from_toml(
            r#"
            [sequences]
            files = ["/nonexistent/composekey/missing.XCompose"]
            include_default = false
            "#,
        )
        .unwrap();

        let table = settings.load_sequences().unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_malformed_sequence_file_is_an_error() {
        let user = TempFile::new("broken.XCompose", "<Multi_key> <a> <b> \"missing colon\"\n");
        let settings = ComposerSettings::from_toml(&format!(
            "[sequences]\nfiles = [\"{}\"]\ninclude_default = false\n",
            user.path_str()
        ))
        .unwrap();

        match settings.load_sequences() {
            Err(TableError::Syntax { line, .. }) => assert_eq!(line, 1),
            other => panic!("expected a syntax error, got {:?}", other.map(|t| t.len())),
        }
    }

    #[test]
    fn test_validate_rejects_printable_compose_key() {
        let settings = ComposerSettings::from_toml("[compose]\nkeys = [\"SEMICOLON\"]").unwrap();
        let layout = settings.build_layout();
        assert!(matches!(
            settings.validate(&layout),
            Err(SettingsError::InvalidValue(_))
        ));

        let settings = ComposerSettings::from_toml("[compose]\nkeys = [\"CapsLock\", \"Menu\"]")
            .unwrap();
        assert!(settings.validate(&settings.build_layout()).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_window_pattern() {
        let settings =
            ComposerSettings::from_toml("[windows]\ngtk = [\"(unclosed\"]").unwrap();
        assert!(matches!(
            settings.validate(&settings.build_layout()),
            Err(SettingsError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_settings_reload() {
        let config = TempFile::new("reload.toml", "[compose]\nreset_delay_ms = 500\n");
        let mut settings = ComposerSettings::from_file(&config.0).unwrap();
        assert_eq!(settings.reset_delay_ms, 500);

        std::fs::write(&config.0, "[compose]\nreset_delay_ms = 1500\n").unwrap();
        settings.reload().unwrap();
        assert_eq!(settings.reset_delay_ms, 1500);

        assert!(ComposerSettings::new().reload().is_err());
    }

    #[test]
    fn test_configured_pipeline() {
        let user = TempFile::new(
            "pipeline.XCompose",
            "<Multi_key> <e> <e> : \"ə\" # schwa\n",
        );
        let config = TempFile::new(
            "pipeline.toml",
            &format!(
                r#"
                [compose]
                keys = ["CapsLock"]

                [behavior]
                swap_on_invalid = true

                [layout.altgr]
                E = ["€", "¢"]

                [sequences]
                files = ["{}"]
                "#,
                user.path_str()
            ),
        );

        let settings = ComposerSettings::from_file(&config.0).unwrap();
        let layout = settings.build_layout();
        assert!(layout.has_altgr());
        settings.validate(&layout).unwrap();
        let table = settings.load_sequences().unwrap();

        let tracker = WindowTracker::new(settings.build_classifier().unwrap());
        let sink = RecordingSink::new();
        let composer = Composer::new(settings, table, sink.clone())
            .with_layout(layout)
            .with_window(tracker.clone());

        // Caps Lock composes and right Alt is left alone
        tap_key(&composer, KeyCode::CAPSLOCK);
        tap_key(&composer, KeyCode::E);
        tap_key(&composer, KeyCode::E);
        assert_eq!(sink.typed_text(), "ə");
        assert!(!sink.caps());

        // e o resolves through the swapped o e
        tap_key(&composer, KeyCode::CAPSLOCK);
        tap_key(&composer, KeyCode::E);
        tap_key(&composer, KeyCode::O);
        assert_eq!(sink.typed_text(), "əœ");

        // A remote desktop client gets every key untouched
        tracker.set_active(WindowInfo::with_details(
            Some("org.remmina.Remmina".to_string()),
            None,
        ));
        assert!(!composer.process_event(RawKeyEvent::press(KeyCode::CAPSLOCK)));
        assert!(!composer.is_composing());
    }

    /// Focus source that reports one window as soon as it connects
    struct FixedFocus {
        tracker: WindowTracker,
        window: WindowInfo,
        connected: bool,
    }

    impl FocusSource for FixedFocus {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn connect(&mut self) -> Result<(), WindowError> {
            self.connected = true;
            self.tracker.set_active(self.window.clone());
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    #[test]
    fn test_focus_source_selects_output_strategy() {
        let settings = ComposerSettings::new();
        let table = settings.load_sequences().unwrap();
        let tracker = WindowTracker::new(settings.build_classifier().unwrap());
        let sink = RecordingSink::new();
        let composer = Composer::new(settings, table, sink.clone()).with_window(tracker.clone());

        let focus = connect_first(vec![Box::new(FixedFocus {
            tracker: tracker.clone(),
            window: WindowInfo::with_details(Some("gimp".to_string()), Some("GIMP".to_string())),
            connected: false,
        })])
        .unwrap();
        assert!(focus.is_connected());

        // A GTK-class window gets code point entry instead of a batch
        tap_key(&composer, KeyCode::RIGHT_ALT);
        tap_key(&composer, KeyCode::O);
        tap_key(&composer, KeyCode::E);
        let events = sink.events();
        assert!(!events.iter().any(|event| matches!(event, Event::Batch(_))));
        assert_eq!(events.first(), Some(&Event::Down(KeyCode::LEFT_CTRL)));

        // Focus moving to a remote desktop client turns composing off
        tracker.set_active(WindowInfo::with_details(
            Some("org.remmina.Remmina".to_string()),
            None,
        ));
        assert!(!composer.process_event(RawKeyEvent::press(KeyCode::RIGHT_ALT)));
    }
}
