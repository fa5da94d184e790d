const ON: [&str; 4] = ["1", "true", "yes", "on"];
const OFF: [&str; 4] = ["0", "false", "no", "off"];

/// Reads an on/off setting, case-insensitively. A missing or unrecognised value gives `default`.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let Some(value) = value.map(|v| v.trim().to_ascii_lowercase()) else {
        return default;
    };
    if ON.contains(&value.as_str()) {
        true
    } else if OFF.contains(&value.as_str()) {
        false
    } else {
        default
    }
}
