use std::{env, env::VarError};

/// There's no real CLI for the server. Any argument prints the help text and the current configuration.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Secrets are deliberately left off this list
    const DISPLAY_ENVS: [&str; 18] = [
        "RUST_LOG",
        "TKO_HOST",
        "TKO_PORT",
        "TKO_DATABASE_URL",
        "TKO_DB_MAX_CONNECTIONS",
        "TKO_RUN_MIGRATIONS",
        "TKO_JWT_USER_HEADER",
        "TKO_JWT_ADMIN_HEADER",
        "TKO_JWT_TTL_MINS",
        "TKO_PAYMENT_MODE",
        "TKO_PENDING_PAYMENT_TIMEOUT_MINS",
        "TKO_STUCK_DELIVERY_TIMEOUT_MINS",
        "TKO_TIMEOUT_SWEEP_INTERVAL_SECS",
        "TKO_DELIVERY_SWEEP_HOUR",
        "TKO_WXPAY_APP_ID",
        "TKO_WXPAY_MCH_ID",
        "TKO_WXPAY_BASE_URL",
        "TKO_WXPAY_NOTIFY_URL",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
