use crate::cli::{
    actions::Action,
    globals::{Environment, GlobalArgs},
};
use anyhow::{anyhow, Result};
use secrecy::SecretString;
use std::path::PathBuf;

pub fn handler(matches: &clap::ArgMatches) -> Result<(Action, GlobalArgs)> {
    let supabase_url = matches
        .get_one::<String>("supabase-url")
        .map(String::to_string)
        .ok_or_else(|| anyhow!("missing required argument: --supabase-url"))?;

    let anon_key = matches
        .get_one::<String>("anon-key")
        .map(String::to_string)
        .ok_or_else(|| anyhow!("missing required argument: --anon-key"))?;

    let mut globals = GlobalArgs::new(supabase_url, anon_key);

    if let Some(key) = matches.get_one::<String>("service-role-key") {
        globals.set_service_role_key(SecretString::from(key.to_string()));
    }

    let environment = matches
        .get_one::<String>("environment")
        .map(String::as_str)
        .unwrap_or("development")
        .parse::<Environment>()
        .map_err(|err| anyhow!(err))?;

    let action = Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        environment,
        frontend_base_url: matches
            .get_one::<String>("frontend-base-url")
            .map(String::to_string)
            .unwrap_or_else(|| "http://localhost:3000".to_string()),
        upload_dir: matches
            .get_one::<String>("upload-dir")
            .map_or_else(|| PathBuf::from("public"), PathBuf::from),
    };

    Ok((action, globals))
}
