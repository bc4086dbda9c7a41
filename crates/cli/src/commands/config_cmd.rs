//! `scenewright config`: Print a default configuration file.

use scenewright_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", AppConfig::default_toml());
    Ok(())
}

#[cfg(test)]
mod tests {
    use scenewright_config::AppConfig;

    #[test]
    fn config_path_is_valid() {
        let path = AppConfig::config_dir().join("config.toml");
        assert!(path.to_str().unwrap().contains("config.toml"));
    }

    #[test]
    fn default_toml_parses_back() {
        let parsed: AppConfig = toml::from_str(&AppConfig::default_toml()).unwrap();
        assert!(parsed.profiles.contains_key(&parsed.default_profile));
    }
}
