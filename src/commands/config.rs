use crate::SyncerContext;
use crate::config::Config;
use crate::output;
use anyhow::{Context, Result};
use colored::Colorize;

/// `syncer config [key] [value] [--list]`
///
/// With no key (or `--list`) every option is shown. With a key only, its value
/// is printed. With a key and a value, the option is validated, set, and saved.
///
/// # Errors
///
/// Returns an error if the key is unknown, the value is invalid, or the
/// settings file cannot be saved.
pub fn execute(
    ctx: &mut SyncerContext,
    key: Option<&str>,
    value: Option<&str>,
    list: bool,
) -> Result<()> {
    let Some(key) = key.filter(|_| !list) else {
        show_all_config(&ctx.config);
        return Ok(());
    };

    if let Some(value) = value {
        ctx.config.set(key, value)?;
        ctx.config.save(&ctx.config_path)?;
        output::success(&format!("Set {key} = {value}"));
    } else {
        let value = ctx
            .config
            .get(key)
            .with_context(|| format!("Unknown configuration key: {key}"))?;
        println!("{value}");
    }
    Ok(())
}

fn show_all_config(config: &Config) {
    let mut section = "";
    for key in Config::keys() {
        let Some((name, field)) = key.split_once('.') else {
            continue;
        };
        if name != section {
            if !section.is_empty() {
                println!();
            }
            println!("{}", format!("[{name}]").bold());
            section = name;
        }
        println!("  {field} = {}", config.get(key).unwrap_or_default());
    }
}
