//! Configuration display command.

use console::style;

use storyarc::config::Config;

pub fn cmd_config(config: &Config) -> anyhow::Result<()> {
    match config.source_path {
        Some(ref path) => println!("{} Loaded from {}", style("→").cyan(), path.display()),
        None => println!(
            "{} No config file found, using defaults and environment",
            style("→").cyan()
        ),
    }
    println!();
    print!("{}", config.to_display_toml());
    Ok(())
}
