/// FFmpeg command assertion utilities
#[allow(dead_code)]
pub fn assert_cmd_contains(cmd: &str, flag: &str) {
    assert!(
        cmd.contains(flag),
        "Expected FFmpeg command to contain '{}' but it didn't.\nCommand: {}",
        flag,
        cmd
    );
}

#[allow(dead_code)]
pub fn assert_cmd_not_contains(cmd: &str, flag: &str) {
    assert!(
        !cmd.contains(flag),
        "Expected FFmpeg command to NOT contain '{}' but it did.\nCommand: {}",
        flag,
        cmd
    );
}

/// Check the argv directly so values containing spaces still match
#[allow(dead_code)]
pub fn assert_argv_has_flag_value(argv: &[String], flag: &str, value: &str) {
    assert_eq!(
        get_flag_value(argv, flag),
        Some(value),
        "Expected '{} {}' in argv: {:?}",
        flag,
        value,
        argv
    );
}

/// Value following the first occurrence of `flag`
#[allow(dead_code)]
pub fn get_flag_value<'a>(argv: &'a [String], flag: &str) -> Option<&'a str> {
    argv.iter()
        .position(|a| a == flag)
        .and_then(|i| argv.get(i + 1))
        .map(String::as_str)
}

/// Every occurrence of `flag` appears exactly once
#[allow(dead_code)]
pub fn assert_flag_once(argv: &[String], flag: &str) {
    let count = argv.iter().filter(|a| *a == flag).count();
    assert_eq!(count, 1, "Expected '{}' exactly once in argv: {:?}", flag, argv);
}
