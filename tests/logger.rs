use std::{
    fs,
    time::{SystemTime, UNIX_EPOCH},
};

use ontquery::{
    config::{LoggerFileAppender, LoggerSettings},
    logger::{self, Format, LogLevel, Rotation},
    Error,
};

#[test]
fn file_appender_writes_and_second_init_fails() {
    let run = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("ontquery-logs-{run}"));
    let config = LoggerSettings {
        enable: false,
        level: LogLevel::Debug,
        format: Format::Compact,
        override_filter: Some("logger=info,ontquery=debug".to_owned()),
        file_appender: Some(LoggerFileAppender {
            enable: true,
            non_blocking: false,
            level: LogLevel::Debug,
            format: Format::Json,
            rotation: Rotation::Never,
            dir: Some(dir.display().to_string()),
            filename_prefix: Some("test".to_owned()),
            filename_suffix: Some("log".to_owned()),
            max_log_files: 1,
        }),
    };

    logger::init(&config).expect("first init");
    tracing::info!(run = %run, "logger_test_event");

    let written = fs::read_dir(&dir)
        .expect("log dir")
        .filter_map(Result::ok)
        .map(|entry| fs::read_to_string(entry.path()).unwrap_or_default())
        .collect::<String>();
    if std::env::var_os("RUST_LOG").is_none() {
        assert!(written.contains("logger_test_event"));
    }

    assert!(matches!(logger::init(&config), Err(Error::Logger(_))));
    let _ = fs::remove_dir_all(dir);
}
