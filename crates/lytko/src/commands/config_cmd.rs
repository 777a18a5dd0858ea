//! Config subcommand handlers.

use owo_colors::OwoColorize;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::commands::Loaded;
use crate::error::CliError;

const REDACTED: &str = "********";

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            let path = global
                .config
                .clone()
                .unwrap_or_else(lytko_config::config_path);
            println!("{}", path.display());
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show { json } => {
            let mut loaded = Loaded::from_global(global)?;
            for profile in loaded.config.profiles.values_mut() {
                if profile.alice_password.is_some() {
                    profile.alice_password = Some(REDACTED.into());
                }
            }

            let rendered = if json {
                serde_json::to_string_pretty(&loaded.config)
                    .map_err(|e| CliError::Render(e.to_string()))?
            } else {
                toml::to_string_pretty(&loaded.config)
                    .map_err(|e| CliError::Render(e.to_string()))?
            };
            println!("{rendered}");
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let loaded = Loaded::from_global(global)?;
            let cfg = &loaded.config;
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured in {}", loaded.path.display());
            } else {
                let mut names: Vec<_> = cfg.profiles.iter().collect();
                names.sort_by(|a, b| a.0.cmp(b.0));
                for (name, profile) in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}\t{}", profile.address);
                }
            }
            Ok(())
        }

        // ── SetPassword ─────────────────────────────────────────────
        ConfigCommand::SetPassword => {
            let loaded = Loaded::from_global(global)?;
            let (profile_name, _) = loaded.profile(global)?;

            let password = rpassword::prompt_password("Voice assistant password: ")
                .map_err(|e| CliError::Validation {
                    field: "interactive".into(),
                    reason: format!("prompt failed: {e}"),
                })?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }

            let entry = keyring::Entry::new("lytko", &format!("{profile_name}/alice-password"))
                .map_err(|e| CliError::Validation {
                    field: "keyring".into(),
                    reason: format!("failed to access keyring: {e}"),
                })?;
            entry
                .set_password(&password)
                .map_err(|e| CliError::Validation {
                    field: "keyring".into(),
                    reason: format!("failed to store password: {e}"),
                })?;

            eprintln!(
                "{} Password stored in system keyring for profile '{profile_name}'",
                "✓".green()
            );
            Ok(())
        }
    }
}
