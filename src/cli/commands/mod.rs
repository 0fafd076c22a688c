use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("redakto")
        .about("Content back office API")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("REDAKTO_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("supabase-url")
                .long("supabase-url")
                .help("Base URL of the Supabase project, example: https://<project>.supabase.co")
                .env("REDAKTO_SUPABASE_URL")
                .required(true),
        )
        .arg(
            Arg::new("anon-key")
                .long("anon-key")
                .help("Publishable (anon) API key, used for caller-scoped requests")
                .env("REDAKTO_SUPABASE_ANON_KEY")
                .required(true),
        )
        .arg(
            Arg::new("service-role-key")
                .long("service-role-key")
                .help("Service-role API key for role lookups and profile mutations (bypasses row-level security; never sent to browsers)")
                .env("REDAKTO_SUPABASE_SERVICE_ROLE_KEY"),
        )
        .arg(
            Arg::new("environment")
                .long("environment")
                .help("Deployment environment, the admin bootstrap route is disabled in production")
                .env("REDAKTO_ENVIRONMENT")
                .default_value("development")
                .value_parser(["development", "production"]),
        )
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Admin frontend base URL, used as the allowed CORS origin")
                .env("REDAKTO_FRONTEND_BASE_URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new("upload-dir")
                .long("upload-dir")
                .help("Directory where uploaded images are stored")
                .env("REDAKTO_UPLOAD_DIR")
                .default_value("public"),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("REDAKTO_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
