use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
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
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 11] = [
        "RUST_LOG",
        "TSG_HOST",
        "TSG_PORT",
        "TSG_DATABASE_URL",
        "TSG_MIN_CONFIRMATIONS",
        "TSG_REFERRAL_RATES",
        "TSG_UNPAID_ORDER_TIMEOUT",
        "TSG_IPN_HMAC_CHECKS",
        "TSG_CP_MERCHANT_ID",
        "TSG_STRIPE_API_URL",
        "TSG_MAIL_API_URL",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(v) => v,
            Err(VarError::NotPresent) => "(not set)".to_string(),
            Err(VarError::NotUnicode(_)) => "(not unicode)".to_string(),
        };
        println!("  {name} = {val}");
    });
}
