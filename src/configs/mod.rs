use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::io::prelude::*;
use std::io::{Error, ErrorKind};
use std::path;

/// A structure to hold environment settings. Backed by settings.json file in
/// the directory the process is launched from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Configs {
    pub verbose_mode: bool,
    pub working_directory: String,
    pub max_procs: isize,
}

impl Configs {
    pub fn new() -> Configs {
        Configs {
            verbose_mode: false,
            working_directory: String::new(),
            max_procs: -1,
        }
    }
}

impl Default for Configs {
    fn default() -> Configs {
        Configs::new()
    }
}

fn settings_file() -> Result<String, Error> {
    let dir = std::env::current_dir()?;
    let dir = dir.to_str().unwrap_or(".").to_string();
    Ok(format!("{}{}settings.json", dir, path::MAIN_SEPARATOR))
}

/// Reads settings.json. A missing file yields the default settings; a file
/// that cannot be parsed is an error.
pub fn get_configs() -> Result<Configs, Error> {
    read_configs(&settings_file()?)
}

pub fn read_configs(file_name: &str) -> Result<Configs, Error> {
    match fs::read_to_string(file_name) {
        Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
            Error::new(
                ErrorKind::InvalidData,
                format!("Failed to parse {}: {}", file_name, e),
            )
        }),
        Err(_) => Ok(Configs::new()),
    }
}

pub fn save_configs(configs: &Configs) -> Result<(), Error> {
    write_configs(configs, &settings_file()?)
}

pub fn write_configs(configs: &Configs, file_name: &str) -> Result<(), Error> {
    let configs_json = serde_json::to_string_pretty(configs)
        .map_err(|e| Error::new(ErrorKind::Other, e.to_string()))?;
    let mut file = File::create(file_name)?;
    file.write_all(configs_json.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_missing_settings_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("settings.json");
        let configs = read_configs(f.to_str().unwrap()).unwrap();
        assert_eq!(configs, Configs::new());
    }

    #[test]
    fn test_settings_saved_and_reread() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("settings.json");
        let f = f.to_str().unwrap();
        let mut configs = Configs::new();
        configs.max_procs = 2;
        configs.verbose_mode = true;
        write_configs(&configs, f).unwrap();
        assert_eq!(read_configs(f).unwrap(), configs);
    }

    #[test]
    fn test_partial_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("settings.json");
        std::fs::write(&f, "{\"max_procs\": 3}").unwrap();
        let configs = read_configs(f.to_str().unwrap()).unwrap();
        assert_eq!(configs.max_procs, 3);
        assert!(!configs.verbose_mode);
    }
}
