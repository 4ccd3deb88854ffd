pub mod hydro_analysis;
pub mod terrain_analysis;
pub mod workflows;

use serde::{Deserialize, Serialize};
use std::io::{Error, ErrorKind};
use std::path;
use std::path::Path;

/// Runs the named tools with command-style argument vectors. The same
/// engine backs the command line front end and the land surface parameter
/// workflow.
#[derive(Default)]
pub struct ToolManager {
    pub working_dir: String,
    pub verbose: bool,
    tool_names: Vec<String>,
}

impl ToolManager {
    pub fn new(working_directory: &str, verbose_mode: &bool) -> Result<ToolManager, Error> {
        let mut tool_names = vec![];
        // hydro_analysis
        tool_names.push("FillDepressions".to_string());
        tool_names.push("FlowAccumulation".to_string());
        tool_names.push("SpecificCatchmentArea".to_string());

        // terrain_analysis
        tool_names.push("Hillshade".to_string());
        tool_names.push("RelativeElevation".to_string());
        tool_names.push("Slope".to_string());
        tool_names.push("SolarRadiation".to_string());
        tool_names.push("TopographicPositionIndex".to_string());
        tool_names.push("WetnessIndex".to_string());

        // workflows
        tool_names.push("LandSurfaceParameters".to_string());

        tool_names.sort();

        let sep = path::MAIN_SEPARATOR.to_string();
        let mut working_dir = working_directory.trim().to_string();
        if !working_dir.is_empty() && !working_dir.ends_with(&sep) && !working_dir.ends_with('/') {
            working_dir.push_str(&sep);
        }

        Ok(ToolManager {
            working_dir,
            verbose: *verbose_mode,
            tool_names,
        })
    }

    /// Looks a tool up by name, ignoring case and underscores.
    pub fn get_tool(&self, tool_name: &str) -> Option<Box<dyn LspTool + 'static>> {
        match tool_name.to_lowercase().replace('_', "").as_ref() {
            // hydro_analysis
            "filldepressions" => Some(Box::new(hydro_analysis::FillDepressions::new())),
            "flowaccumulation" => Some(Box::new(hydro_analysis::FlowAccumulation::new())),
            "specificcatchmentarea" => Some(Box::new(hydro_analysis::SpecificCatchmentArea::new())),

            // terrain_analysis
            "hillshade" => Some(Box::new(terrain_analysis::Hillshade::new())),
            "relativeelevation" => Some(Box::new(terrain_analysis::RelativeElevation::new())),
            "slope" => Some(Box::new(terrain_analysis::Slope::new())),
            "solarradiation" => Some(Box::new(terrain_analysis::SolarRadiation::new())),
            "topographicpositionindex" => {
                Some(Box::new(terrain_analysis::TopographicPositionIndex::new()))
            }
            "wetnessindex" => Some(Box::new(terrain_analysis::WetnessIndex::new())),

            // workflows
            "landsurfaceparameters" => Some(Box::new(workflows::LandSurfaceParameters::new())),

            _ => None,
        }
    }

    fn unrecognized(tool_name: &str) -> Error {
        Error::new(
            ErrorKind::NotFound,
            format!("Unrecognized tool name {}.", tool_name),
        )
    }

    pub fn run_tool(&self, tool_name: String, args: Vec<String>) -> Result<(), Error> {
        match self.get_tool(tool_name.as_ref()) {
            Some(tool) => tool.run(args, &self.working_dir, self.verbose),
            None => Err(ToolManager::unrecognized(&tool_name)),
        }
    }

    pub fn tool_help(&self, tool_name: String) -> Result<(), Error> {
        if !tool_name.is_empty() {
            match self.get_tool(tool_name.as_ref()) {
                Some(tool) => println!("{}", get_help(tool)?),
                None => return Err(ToolManager::unrecognized(&tool_name)),
            }
        } else {
            for (i, val) in self.tool_names.iter().enumerate() {
                if let Some(tool) = self.get_tool(val) {
                    println!("{}. {}\n", i + 1, get_help(tool)?);
                }
            }
        }
        Ok(())
    }

    pub fn tool_parameters(&self, tool_name: String) -> Result<String, Error> {
        match self.get_tool(tool_name.as_ref()) {
            Some(tool) => Ok(tool.get_tool_parameters()),
            None => Err(ToolManager::unrecognized(&tool_name)),
        }
    }

    pub fn toolbox(&self, tool_name: String) -> Result<(), Error> {
        if !tool_name.is_empty() {
            match self.get_tool(tool_name.as_ref()) {
                Some(tool) => println!("{}", tool.get_toolbox()),
                None => return Err(ToolManager::unrecognized(&tool_name)),
            }
        } else {
            for val in &self.tool_names {
                if let Some(tool) = self.get_tool(val) {
                    println!("{}: {}\n", val, tool.get_toolbox());
                }
            }
        }
        Ok(())
    }

    pub fn list_tools(&self) -> Vec<(String, String)> {
        self.tool_names
            .iter()
            .filter_map(|val| self.get_tool(val))
            .map(|tool| (tool.get_tool_name(), tool.get_tool_description()))
            .collect()
    }

    pub fn list_tools_with_keywords(&self, keywords: Vec<String>) -> Vec<(String, String)> {
        let mut tool_details = vec![];
        for val in &self.tool_names {
            if let Some(tool) = self.get_tool(val) {
                let toolbox = tool.get_toolbox().to_lowercase();
                let nm = tool.get_tool_name();
                let des = tool.get_tool_description();
                if keywords.iter().any(|kw| {
                    let kw = kw.to_lowercase();
                    nm.to_lowercase().contains(&kw)
                        || des.to_lowercase().contains(&kw)
                        || toolbox.contains(&kw)
                }) {
                    tool_details.push((nm, des));
                }
            }
        }
        tool_details
    }
}

pub trait LspTool {
    fn get_tool_name(&self) -> String;
    fn get_tool_description(&self) -> String;
    fn get_tool_parameters(&self) -> String;
    fn get_example_usage(&self) -> String;
    fn get_toolbox(&self) -> String;
    fn run<'a>(&self, args: Vec<String>, working_directory: &'a str, verbose: bool) -> Result<(), Error>;
}

fn get_help(wt: Box<dyn LspTool>) -> Result<String, Error> {
    let parameters: serde_json::Value = serde_json::from_str(&wt.get_tool_parameters())
        .map_err(|e| Error::new(ErrorKind::InvalidData, e.to_string()))?;
    let mut p = String::new();
    p.push_str("Flag               Description\n");
    p.push_str("-----------------  -----------\n");
    if let Some(a) = parameters["parameters"].as_array() {
        for d in a {
            let flags = d["flags"]
                .as_array()
                .map(|f| {
                    f.iter()
                        .filter_map(|s| s.as_str())
                        .collect::<Vec<&str>>()
                        .join(", ")
                })
                .unwrap_or_default();
            p.push_str(&format!(
                "{:width$} {}\n",
                flags,
                d["description"].as_str().unwrap_or(""),
                width = 18
            ));
        }
    }
    Ok(format!(
        "{}\nDescription:\n{}\nToolbox: {}\nParameters:\n\n{}\n\nExample usage:\n{}\n",
        wt.get_tool_name(),
        wt.get_tool_description(),
        wt.get_toolbox(),
        p,
        wt.get_example_usage()
    ))
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ToolParameter {
    pub name: String,
    pub flags: Vec<String>,
    pub description: String,
    pub parameter_type: ParameterType,
    pub default_value: Option<String>,
    pub optional: bool,
}

impl ToolParameter {
    pub fn to_string(&self) -> String {
        match serde_json::to_string(&self) {
            Ok(json_str) => json_str,
            Err(err) => format!("{:?}", err),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub enum ParameterType {
    Boolean,
    String,
    Integer,
    Float,
    ExistingFile(ParameterFileType),
    NewFile(ParameterFileType),
    Directory,
    OptionList(Vec<String>),
}

#[derive(Serialize, Deserialize, Debug)]
pub enum ParameterFileType {
    Any,
    Raster,
    Text,
}

/// Serializes a tool's parameter list as `{"parameters": [...]}`.
pub fn parameters_to_json(parameters: &[ToolParameter]) -> String {
    let list = parameters
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<String>>()
        .join(",");
    format!("{{\"parameters\": [{}]}}", list)
}

/// Builds the example command line shown by `--toolhelp`.
pub fn example_usage(tool_name: &str, args: &str) -> String {
    let sep = path::MAIN_SEPARATOR.to_string();
    format!(
        ">>.*lsp_tools -r={} -v --wd=\"*path*to*data*\" {}",
        tool_name, args
    )
    .replace('*', &sep)
}

/// Splits a tool's argument vector into lower-cased flags and their values.
/// Flags are normalised to a single leading dash (`--dem` becomes `-dem`).
/// Both `--flag=value` and `--flag value` are accepted; a flag followed by
/// another flag, or by nothing, has no value and acts as a switch.
pub fn parse_args(args: &[String]) -> Result<Vec<(String, Option<String>)>, Error> {
    if args.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "Tool run with no parameters.",
        ));
    }
    let mut parsed = vec![];
    let mut i = 0;
    while i < args.len() {
        let arg = unquote(&args[i]);
        if !arg.starts_with('-') {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("Unexpected argument {}.", arg),
            ));
        }
        let (flag, value) = match arg.split_once('=') {
            Some((f, v)) => (f.to_string(), Some(unquote(v))),
            None => {
                let next = args
                    .get(i + 1)
                    .map(|a| unquote(a))
                    .filter(|a| !a.starts_with('-') || a.parse::<f64>().is_ok());
                if next.is_some() {
                    i += 1;
                }
                (arg.clone(), next)
            }
        };
        let flag = format!("-{}", flag.trim_start_matches('-').to_lowercase());
        parsed.push((flag, value));
        i += 1;
    }
    Ok(parsed)
}

/// Removes one pair of matching quotes enclosing `s`; inner quotes are kept.
pub fn unquote(s: &str) -> String {
    let t = s.trim();
    for q in ['"', '\''] {
        if t.len() >= 2 && t.starts_with(q) && t.ends_with(q) {
            return t[1..t.len() - 1].to_string();
        }
    }
    t.to_string()
}

/// The value of a flag that requires one.
pub fn required_value(flag: &str, value: Option<String>) -> Result<String, Error> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(Error::new(
            ErrorKind::InvalidInput,
            format!("No value was provided for {}.", flag),
        )),
    }
}

pub fn parse_value<T: std::str::FromStr>(flag: &str, value: Option<String>) -> Result<T, Error> {
    let v = required_value(flag, value)?;
    v.parse::<T>().map_err(|_| {
        Error::new(
            ErrorKind::InvalidInput,
            format!("Error parsing {} value '{}'.", flag, v),
        )
    })
}

/// Switches accept an optional `true`/`false` value.
pub fn parse_switch(value: Option<String>) -> bool {
    match value {
        Some(v) => !v.trim().to_lowercase().starts_with('f'),
        None => true,
    }
}

/// Resolves a bare file name against the working directory.
pub fn resolve_path(working_directory: &str, file_name: &str) -> String {
    let sep = path::MAIN_SEPARATOR.to_string();
    if !file_name.contains(&sep) && !file_name.contains('/') {
        format!("{}{}", working_directory, file_name)
    } else {
        file_name.to_string()
    }
}

/// Resolves an output grid name; a name without an extension is written as a
/// SAGA grid.
pub fn resolve_output(working_directory: &str, file_name: &str) -> String {
    let mut f = resolve_path(working_directory, file_name);
    if Path::new(&f).extension().is_none() {
        f.push_str(".sgrd");
    }
    f
}

/// Resolves an input grid name; a bare name refers to a SAGA grid.
pub fn resolve_input(working_directory: &str, file_name: &str) -> String {
    resolve_output(working_directory, file_name)
}

pub fn check_required(flag: &str, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("The {} parameter is required.", flag),
        ));
    }
    Ok(())
}

pub fn print_welcome(tool_name: &str) {
    let welcome_len = format!("* Welcome to {} *", tool_name).len().max(25);
    println!("{}", "*".repeat(welcome_len));
    println!(
        "* Welcome to {} {}*",
        tool_name,
        " ".repeat(welcome_len - 15 - tool_name.len())
    );
    println!("* Powered by lsp_tools {}*", " ".repeat(welcome_len - 24));
    println!("{}", "*".repeat(welcome_len));
}

/// Prints "Performing analysis" progress when the percentage changes.
pub(crate) struct Progress {
    label: &'static str,
    total: usize,
    old_progress: usize,
    verbose: bool,
}

impl Progress {
    pub fn new(label: &'static str, total: usize, verbose: bool) -> Progress {
        Progress {
            label,
            total: total.max(2),
            old_progress: usize::MAX,
            verbose,
        }
    }

    pub fn update(&mut self, done: usize) {
        if self.verbose {
            let progress = (100.0_f64 * done as f64 / (self.total - 1) as f64) as usize;
            if progress != self.old_progress {
                println!("{}: {}%", self.label, progress.min(100));
                self.old_progress = progress;
            }
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_args_forms() {
        let args: Vec<String> = vec![
            "--dem=dem.sgrd".to_string(),
            "-o".to_string(),
            "out".to_string(),
            "--Radius".to_string(),
            "-5".to_string(),
            "--standardize".to_string(),
            "--zfactor=\"2\"".to_string(),
        ];
        let parsed = parse_args(&args).unwrap();
        assert_eq!(parsed[0], ("-dem".to_string(), Some("dem.sgrd".to_string())));
        assert_eq!(parsed[1], ("-o".to_string(), Some("out".to_string())));
        assert_eq!(parsed[2], ("-radius".to_string(), Some("-5".to_string())));
        assert_eq!(parsed[3], ("-standardize".to_string(), None));
        assert_eq!(parsed[4], ("-zfactor".to_string(), Some("2".to_string())));
    }

    #[test]
    fn test_apostrophes_inside_names_survive() {
        let parsed = parse_args(&test_support::args(&["--dem='o'neill dem.sgrd'", "--output", "o'neill"])).unwrap();
        assert_eq!(parsed[0].1, Some("o'neill dem.sgrd".to_string()));
        assert_eq!(parsed[1].1, Some("o'neill".to_string()));
        assert_eq!(unquote("\"a\""), "a");
        assert_eq!(unquote("\""), "\"");
    }

    #[test]
    fn test_no_arguments_is_invalid_input() {
        let err = parse_args(&[]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_bad_numeric_value() {
        let err = parse_value::<f64>("-radius", Some("abc".to_string())).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(parse_value::<f64>("-radius", None).is_err());
    }

    #[test]
    fn test_output_names_get_saga_extension() {
        let wd = format!("wd{}", path::MAIN_SEPARATOR);
        assert_eq!(resolve_output(&wd, "slope"), format!("{}slope.sgrd", wd));
        assert_eq!(resolve_output(&wd, "slope.asc"), format!("{}slope.asc", wd));
        assert_eq!(resolve_output(&wd, "/tmp/slope"), "/tmp/slope.sgrd");
    }

    #[test]
    fn test_tool_lookup_is_case_insensitive() {
        let tm = ToolManager::new("", &false).unwrap();
        assert!(tm.get_tool("slope").is_some());
        assert!(tm.get_tool("Fill_Depressions").is_some());
        assert!(tm.get_tool("Viewshed").is_none());
        let err = tm.run_tool("Viewshed".to_string(), vec![]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_every_tool_has_valid_parameter_json() {
        let tm = ToolManager::new("", &false).unwrap();
        let tools = tm.list_tools();
        assert_eq!(tools.len(), 10);
        for (name, _) in tools {
            let json = tm.tool_parameters(name.clone()).unwrap();
            let v: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert!(v["parameters"].as_array().unwrap().len() > 0, "{}", name);
        }
    }

    #[test]
    fn test_keyword_search() {
        let tm = ToolManager::new("", &false).unwrap();
        let found = tm.list_tools_with_keywords(vec!["catchment".to_string()]);
        assert!(found.iter().any(|(n, _)| n == "SpecificCatchmentArea"));
        assert!(found.iter().all(|(n, _)| n != "Hillshade"));
    }

    #[test]
    fn test_working_dir_gets_separator() {
        let tm = ToolManager::new("/data", &false).unwrap();
        assert!(tm.working_dir.ends_with('/') || tm.working_dir.ends_with(path::MAIN_SEPARATOR));
    }
}
