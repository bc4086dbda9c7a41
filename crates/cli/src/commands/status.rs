//! `scenewright status`: Show configuration status.

use scenewright_config::{Api, AppConfig};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("scenewright status");
    println!("==================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  API key:      {}", if config.has_api_key() { "set" } else { "missing" });
    println!("  Memory:       {}", config.memory.backend);
    println!("  User:         {}", config.persona.user_name);
    println!("  Character:    {}", config.persona.character_name);
    println!();

    let mut names: Vec<&String> = config.profiles.keys().collect();
    names.sort();
    for name in names {
        let profile = &config.profiles[name];
        let marker = if *name == config.default_profile { "*" } else { " " };
        let endpoint = match profile.api {
            Api::OpenAi => format!("{} ({})", profile.openai.api_url, profile.openai.model),
            Api::Oobabooga if profile.stream => profile.oobabooga.stream_url.clone(),
            Api::Oobabooga => profile.oobabooga.api_url.clone(),
        };
        println!(
            "  {marker} {name:<12} {:<10} {:<6} ctx {:>5} (prompt {:>5})  {endpoint}",
            profile.api.to_string(),
            if profile.stream { "stream" } else { "batch" },
            profile.context_size(),
            profile.context_budget(),
        );
    }

    // Check config file existence
    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file; run `scenewright config > {}`", config_path.display());
    }

    if config.profile(&config.default_profile).is_err() {
        println!("  Default profile '{}' is not defined", config.default_profile);
    }

    Ok(())
}
