/*!
Land surface parameter workflow.

`compute_lsps` derives a set of land surface parameters (LSPs) from a DEM by
running a fixed sequence of engine tools, each addressed by name with a
command-style argument list. Outputs that already exist are never
recomputed; the call is skipped and a notice is written to the console and
the log file.
*/

mod log;

pub use self::log::LspLog;

use crate::tools::{resolve_path, ToolManager};
use crate::utils::strip_grid_extension;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Error, ErrorKind};
use std::path::Path;

/// Window radius, in map units, used when none is given.
pub const DEFAULT_RADIUS: f64 = 50.0;
/// Site latitude, in degrees, used for solar radiation when none is given.
pub const DEFAULT_LATITUDE: f64 = 53.0;

/// Options of a `compute_lsps` run. Every output is optional; only the
/// parameters that are named (or all of them, with `all`) are computed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LspOptions {
    pub dem: String,
    pub hillshade: Option<String>,
    pub slope: Option<String>,
    pub twi: Option<String>,
    pub tpi: Option<String>,
    pub relative_elevation: Option<String>,
    pub pisr: Option<String>,
    pub tpi_radius: Option<f64>,
    pub relative_elevation_radius: Option<f64>,
    /// Use the true specific catchment area (catchment area over an
    /// aspect-dependent flow width) for the wetness index rather than the
    /// pseudo one (catchment area over the cell size).
    pub true_sca: bool,
    pub pisr_start_date: String,
    pub pisr_end_date: String,
    pub pisr_day_step: u32,
    pub pisr_hour_step: f64,
    pub latitude: Option<f64>,
    pub all: bool,
    pub delete_intermediates: bool,
    pub log_file: String,
    pub working_directory: String,
    pub verbose: bool,
}

impl Default for LspOptions {
    fn default() -> LspOptions {
        LspOptions {
            dem: String::new(),
            hillshade: None,
            slope: None,
            twi: None,
            tpi: None,
            relative_elevation: None,
            pisr: None,
            tpi_radius: None,
            relative_elevation_radius: None,
            true_sca: false,
            pisr_start_date: "2024-01-01".to_string(),
            pisr_end_date: "2024-12-31".to_string(),
            pisr_day_step: 5,
            pisr_hour_step: 0.5,
            latitude: None,
            all: false,
            delete_intermediates: false,
            log_file: "lsp.log".to_string(),
            working_directory: String::new(),
            verbose: false,
        }
    }
}

impl LspOptions {
    pub fn new(dem: &str) -> LspOptions {
        LspOptions {
            dem: dem.to_string(),
            ..Default::default()
        }
    }

    /// Reads options from a JSON file; missing fields take their defaults.
    pub fn from_json_file(file_name: &str) -> Result<LspOptions, Error> {
        let contents = fs::read_to_string(file_name)?;
        serde_json::from_str(&contents).map_err(|e| {
            Error::new(
                ErrorKind::InvalidData,
                format!("Failed to parse {}: {}", file_name, e),
            )
        })
    }

    fn output_name(&self, name: &Option<String>, default_name: &str) -> Option<String> {
        match name {
            Some(n) if !n.trim().is_empty() => Some(n.trim().to_string()),
            _ if self.all => Some(default_name.to_string()),
            _ => None,
        }
    }
}

/// What a `compute_lsps` run did. Names are the grid names used for the
/// engine calls, without file extension.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LspReport {
    pub computed: Vec<String>,
    pub skipped: Vec<String>,
    pub warnings: Vec<String>,
    pub deleted: Vec<String>,
}

/// The header and data files of the SAGA grid `name`.
pub fn grid_file_set(working_directory: &str, name: &str) -> (String, String) {
    let base = resolve_path(working_directory, strip_grid_extension(name.trim()));
    (format!("{}.sgrd", base), format!("{}.sdat", base))
}

/// An output exists when either file of its grid file set exists.
pub fn output_exists(working_directory: &str, name: &str) -> bool {
    let (header, data) = grid_file_set(working_directory, name);
    Path::new(&header).exists() || Path::new(&data).exists()
}

/// One engine call. `output` names the grid the call writes; optional
/// `side_outputs` are extra grids passed by flag, and only those that do not
/// exist yet are requested from the tool.
struct ToolCall {
    tool: &'static str,
    output: String,
    args: Vec<String>,
    side_outputs: Vec<(&'static str, String)>,
}

impl ToolCall {
    fn new(tool: &'static str, output: &str) -> ToolCall {
        ToolCall {
            tool,
            output: output.to_string(),
            args: vec![format!("--output={}.sgrd", output)],
            side_outputs: vec![],
        }
    }

    fn arg<T: std::fmt::Display>(mut self, flag: &str, value: T) -> ToolCall {
        self.args.push(format!("--{}={}", flag, value));
        self
    }

    fn side_output(mut self, flag: &'static str, name: &str) -> ToolCall {
        self.side_outputs.push((flag, name.to_string()));
        self
    }
}

/// The calls producing one land surface parameter.
struct Variable {
    label: &'static str,
    output: String,
    calls: Vec<ToolCall>,
    intermediates: Vec<String>,
}

struct Workflow {
    manager: ToolManager,
    log: LspLog,
    report: LspReport,
}

impl Workflow {
    fn info(&mut self, message: &str) -> Result<(), Error> {
        if self.manager.verbose {
            println!("{}", message);
        }
        self.log.write(message)
    }

    fn notice(&mut self, message: &str) -> Result<(), Error> {
        println!("{}", message);
        self.log.write(message)
    }

    fn warn(&mut self, message: &str) -> Result<(), Error> {
        let message = format!("WARNING: {}", message);
        println!("{}", message);
        self.report.warnings.push(message.clone());
        self.log.write(&message)
    }

    fn exists(&self, name: &str) -> bool {
        output_exists(&self.manager.working_dir, name)
    }

    fn run_variable(&mut self, variable: Variable) -> Result<(), Error> {
        if self.exists(&variable.output) {
            self.notice(&format!(
                "The {} output '{}' already exists; skipping.",
                variable.label, variable.output
            ))?;
            self.report.skipped.push(variable.output);
            return Ok(());
        }
        self.info(&format!("Computing {} ({})", variable.label, variable.output))?;
        for call in variable.calls {
            if self.exists(&call.output) {
                self.notice(&format!(
                    "The {} output '{}' already exists; skipping.",
                    call.tool, call.output
                ))?;
                self.report.skipped.push(call.output);
                continue;
            }
            let mut args = call.args;
            let mut written = vec![call.output];
            for (flag, name) in call.side_outputs {
                if self.exists(&name) {
                    self.notice(&format!(
                        "The {} output '{}' already exists; it will not be written.",
                        call.tool, name
                    ))?;
                    self.report.skipped.push(name);
                } else {
                    args.push(format!("--{}={}.sgrd", flag, name));
                    written.push(name);
                }
            }
            self.log.write(&format!("Running {} {}", call.tool, args.join(" ")))?;
            if let Err(e) = self.manager.run_tool(call.tool.to_string(), args) {
                self.log.write(&format!("ERROR: {} failed: {}", call.tool, e))?;
                return Err(e);
            }
            self.report.computed.extend(written);
        }
        Ok(())
    }

    fn delete_grid(&mut self, name: &str) -> Result<(), Error> {
        let (header, data) = grid_file_set(&self.manager.working_dir, name);
        let mut removed = false;
        for f in [header, data] {
            if Path::new(&f).exists() {
                fs::remove_file(&f)?;
                removed = true;
            }
        }
        if removed {
            self.info(&format!("Deleted intermediate grid {}", name))?;
            self.report.deleted.push(name.to_string());
        }
        Ok(())
    }
}

fn plan(options: &LspOptions, tpi_radius: f64, rel_radius: f64, latitude: f64) -> Vec<Variable> {
    let dem = options.dem.trim();
    let mut variables = vec![];

    if let Some(out) = options.output_name(&options.hillshade, "hillshade") {
        let out = strip_grid_extension(&out).to_string();
        variables.push(Variable {
            label: "hillshade",
            calls: vec![ToolCall::new("Hillshade", &out)
                .arg("dem", dem)
                .arg("azimuth", 315.0)
                .arg("altitude", 45.0)],
            output: out,
            intermediates: vec![],
        });
    }

    if let Some(out) = options.output_name(&options.slope, "slope") {
        let out = strip_grid_extension(&out).to_string();
        variables.push(Variable {
            label: "slope",
            calls: vec![ToolCall::new("Slope", &out).arg("dem", dem).arg("units", "degrees")],
            output: out,
            intermediates: vec![],
        });
    }

    if let Some(out) = options.output_name(&options.twi, "twi") {
        let out = strip_grid_extension(&out).to_string();
        let filled = format!("{}_filled", out);
        let tca = format!("{}_tca", out);
        let sca = format!("{}_sca", out);
        let slope = format!("{}_slope", out);
        let mut calls = vec![
            ToolCall::new("FillDepressions", &filled).arg("dem", dem),
            ToolCall::new("FlowAccumulation", &tca)
                .arg("dem", format!("{}.sgrd", filled))
                .arg("out_type", "ca"),
        ];
        let mut intermediates = vec![filled.clone(), tca.clone()];
        let (area, conversion) = if options.true_sca {
            calls.push(
                ToolCall::new("SpecificCatchmentArea", &sca)
                    .arg("dem", format!("{}.sgrd", filled))
                    .arg("tca", format!("{}.sgrd", tca)),
            );
            intermediates.push(sca.clone());
            (sca, "none")
        } else {
            (tca, "pseudo")
        };
        calls.push(
            ToolCall::new("Slope", &slope)
                .arg("dem", format!("{}.sgrd", filled))
                .arg("units", "degrees"),
        );
        intermediates.push(slope.clone());
        calls.push(
            ToolCall::new("WetnessIndex", &out)
                .arg("sca", format!("{}.sgrd", area))
                .arg("slope", format!("{}.sgrd", slope))
                .arg("conversion", conversion),
        );
        variables.push(Variable {
            label: "wetness index",
            output: out,
            calls,
            intermediates,
        });
    }

    if let Some(out) = options.output_name(&options.tpi, "tpi") {
        let out = strip_grid_extension(&out).to_string();
        variables.push(Variable {
            label: "topographic position index",
            calls: vec![ToolCall::new("TopographicPositionIndex", &out)
                .arg("dem", dem)
                .arg("radius", tpi_radius)],
            output: out,
            intermediates: vec![],
        });
    }

    if let Some(out) = options.output_name(&options.relative_elevation, "relative_elevation") {
        let out = strip_grid_extension(&out).to_string();
        variables.push(Variable {
            label: "relative elevation",
            calls: vec![ToolCall::new("RelativeElevation", &out)
                .arg("dem", dem)
                .arg("radius", rel_radius)],
            output: out,
            intermediates: vec![],
        });
    }

    if let Some(out) = options.output_name(&options.pisr, "pisr") {
        let out = strip_grid_extension(&out).to_string();
        let direct = format!("{}_direct", out);
        let diffuse = format!("{}_diffuse", out);
        variables.push(Variable {
            label: "potential incoming solar radiation",
            calls: vec![ToolCall::new("SolarRadiation", &out)
                .arg("dem", dem)
                .arg("latitude", latitude)
                .arg("start_date", options.pisr_start_date.trim())
                .arg("end_date", options.pisr_end_date.trim())
                .arg("day_step", options.pisr_day_step)
                .arg("hour_step", options.pisr_hour_step)
                .side_output("direct", &direct)
                .side_output("diffuse", &diffuse)],
            output: out,
            intermediates: vec![direct, diffuse],
        });
    }

    variables
}

/// Fails with `InvalidInput` when one grid would serve as two outputs of the
/// plan, e.g. a requested slope named like the wetness index's slope grid.
fn check_output_names(working_directory: &str, variables: &[Variable]) -> Result<(), Error> {
    let mut seen: Vec<(String, &str)> = vec![];
    let names = variables.iter().flat_map(|v| {
        std::iter::once(v.output.as_str()).chain(v.intermediates.iter().map(|n| n.as_str()))
    });
    for name in names {
        let (header, _) = grid_file_set(working_directory, name);
        if let Some((_, other)) = seen.iter().find(|(h, _)| *h == header) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!(
                    "The output names '{}' and '{}' refer to the same grid; choose distinct names.",
                    other, name
                ),
            ));
        }
        seen.push((header, name));
    }
    Ok(())
}

/// Computes the requested land surface parameters from `options.dem`.
///
/// The log file must not exist yet; when it does, the run fails with
/// `ErrorKind::AlreadyExists` before anything else happens. Parameters are
/// computed in the order hillshade, slope, wetness index, topographic
/// position index, relative elevation, solar radiation. A parameter whose
/// output already exists is skipped as a whole; otherwise each engine call
/// whose output exists is skipped. Output names that would refer to the same
/// grid are rejected with `ErrorKind::InvalidInput` before any tool runs.
/// Engine errors are returned unchanged.
pub fn compute_lsps(options: &LspOptions) -> Result<LspReport, Error> {
    let manager = ToolManager::new(&options.working_directory, &options.verbose)?;
    let log_file = resolve_path(&manager.working_dir, options.log_file.trim());
    let log = LspLog::create(&log_file)?;
    let mut workflow = Workflow {
        manager,
        log,
        report: LspReport::default(),
    };
    workflow.info(&format!("Land surface parameters for DEM '{}'", options.dem))?;
    workflow.info(&format!("Log file: {}", workflow.log.file_name()))?;

    let variables = plan(
        options,
        options.tpi_radius.unwrap_or(DEFAULT_RADIUS),
        options.relative_elevation_radius.unwrap_or(DEFAULT_RADIUS),
        options.latitude.unwrap_or(DEFAULT_LATITUDE),
    );
    if let Err(e) = check_output_names(&workflow.manager.working_dir, &variables) {
        workflow.log.write(&format!("ERROR: {}", e))?;
        return Err(e);
    }

    let wants = |name: &Option<String>| options.all || name.as_ref().map_or(false, |n| !n.trim().is_empty());

    if options.tpi_radius.is_none() && wants(&options.tpi) {
        workflow.warn(&format!(
            "No TPI radius was given; using the default of {} map units.",
            DEFAULT_RADIUS
        ))?;
    }
    if options.relative_elevation_radius.is_none() && wants(&options.relative_elevation) {
        workflow.warn(&format!(
            "No relative elevation radius was given; using the default of {} map units.",
            DEFAULT_RADIUS
        ))?;
    }
    if options.latitude.is_none() && wants(&options.pisr) {
        workflow.warn(&format!(
            "No latitude was given; using the default of {} degrees.",
            DEFAULT_LATITUDE
        ))?;
    }

    let mut intermediates = vec![];
    for variable in variables {
        intermediates.extend(variable.intermediates.iter().cloned());
        workflow.run_variable(variable)?;
    }

    // only grids written by this run are removed
    if options.delete_intermediates {
        for name in &intermediates {
            if workflow.report.computed.contains(name) {
                workflow.delete_grid(name)?;
            }
        }
    }

    workflow.info(&format!(
        "Finished: {} computed, {} skipped, {} deleted.",
        workflow.report.computed.len(),
        workflow.report.skipped.len(),
        workflow.report.deleted.len()
    ))?;
    Ok(workflow.report)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tools::test_support::*;

    fn valley_dem(dir: &Path) {
        // a V-shaped valley draining to the south
        write_dem(dir, "dem.sgrd", 10, 9, 10.0, |row, col| {
            100.0 + 3.0 * (col - 4).abs() as f64 - row as f64
        });
    }

    fn options(dir: &Path, log_file: &str) -> LspOptions {
        LspOptions {
            working_directory: dir.to_string_lossy().to_string(),
            log_file: log_file.to_string(),
            ..LspOptions::new("dem.sgrd")
        }
    }

    #[test]
    fn test_grid_file_set() {
        let (h, d) = grid_file_set("/data/", "slope.sgrd");
        assert_eq!(h, "/data/slope.sgrd");
        assert_eq!(d, "/data/slope.sdat");
        let (h, _) = grid_file_set("/data/", "/other/slope");
        assert_eq!(h, "/other/slope.sgrd");
    }

    #[test]
    fn test_either_file_counts_as_existing() {
        let dir = tempfile::tempdir().unwrap();
        let wd = working_dir(dir.path());
        assert!(!output_exists(&wd, "slope"));
        fs::write(dir.path().join("slope.sdat"), b"").unwrap();
        assert!(output_exists(&wd, "slope"));
        assert!(output_exists(&wd, "slope.sgrd"));
    }

    #[test]
    fn test_nothing_requested() {
        let dir = tempfile::tempdir().unwrap();
        let report = compute_lsps(&options(dir.path(), "run.log")).unwrap();
        assert_eq!(report, LspReport::default());
        assert!(dir.path().join("run.log").exists());
    }

    #[test]
    fn test_existing_log_file_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        valley_dem(dir.path());
        fs::write(dir.path().join("run.log"), "previous run").unwrap();
        let opts = LspOptions {
            slope: Some("slope".to_string()),
            ..options(dir.path(), "run.log")
        };
        let err = compute_lsps(&opts).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert!(!output_exists(&working_dir(dir.path()), "slope"));
        assert_eq!(fs::read_to_string(dir.path().join("run.log")).unwrap(), "previous run");
    }

    #[test]
    fn test_second_run_skips_everything() {
        let dir = tempfile::tempdir().unwrap();
        valley_dem(dir.path());
        let opts = LspOptions {
            hillshade: Some("hs".to_string()),
            slope: Some("slope.sgrd".to_string()),
            tpi: Some("tpi".to_string()),
            tpi_radius: Some(20.0),
            relative_elevation: Some("rel".to_string()),
            relative_elevation_radius: Some(20.0),
            ..options(dir.path(), "first.log")
        };
        let first = compute_lsps(&opts).unwrap();
        assert_eq!(first.computed, vec!["hs", "slope", "tpi", "rel"]);
        assert!(first.skipped.is_empty());
        assert!(first.warnings.is_empty());
        let before = fs::read(dir.path().join("slope.sdat")).unwrap();

        let second = compute_lsps(&LspOptions {
            log_file: "second.log".to_string(),
            ..opts
        })
        .unwrap();
        assert!(second.computed.is_empty());
        assert_eq!(second.skipped, vec!["hs", "slope", "tpi", "rel"]);
        assert_eq!(fs::read(dir.path().join("slope.sdat")).unwrap(), before);
        let log = fs::read_to_string(dir.path().join("second.log")).unwrap();
        assert!(log.contains("already exists"));
    }

    #[test]
    fn test_default_radius_warns() {
        let dir = tempfile::tempdir().unwrap();
        valley_dem(dir.path());
        let opts = LspOptions {
            relative_elevation: Some("rel".to_string()),
            ..options(dir.path(), "run.log")
        };
        let report = compute_lsps(&opts).unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("WARNING:"));
        assert!(report.warnings[0].contains("50"));
        assert_eq!(report.computed, vec!["rel"]);
        let log = fs::read_to_string(dir.path().join("run.log")).unwrap();
        assert!(log.contains("WARNING: No relative elevation radius"));
        assert!(log.contains("--radius=50"));
    }

    #[test]
    fn test_wetness_index_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        valley_dem(dir.path());
        let wd = working_dir(dir.path());
        let opts = LspOptions {
            twi: Some("twi".to_string()),
            true_sca: true,
            delete_intermediates: true,
            ..options(dir.path(), "run.log")
        };
        let report = compute_lsps(&opts).unwrap();
        assert_eq!(
            report.computed,
            vec!["twi_filled", "twi_tca", "twi_sca", "twi_slope", "twi"]
        );
        assert_eq!(report.deleted, vec!["twi_filled", "twi_tca", "twi_sca", "twi_slope"]);
        assert!(output_exists(&wd, "twi"));
        assert!(dir.path().join("dem.sgrd").exists());
        for name in &report.deleted {
            assert!(!output_exists(&wd, name));
        }
    }

    #[test]
    fn test_pseudo_sca_keeps_intermediates() {
        let dir = tempfile::tempdir().unwrap();
        valley_dem(dir.path());
        let wd = working_dir(dir.path());
        let opts = LspOptions {
            twi: Some("twi".to_string()),
            ..options(dir.path(), "run.log")
        };
        let report = compute_lsps(&opts).unwrap();
        assert_eq!(report.computed, vec!["twi_filled", "twi_tca", "twi_slope", "twi"]);
        assert!(report.deleted.is_empty());
        assert!(output_exists(&wd, "twi_tca"));
        let log = fs::read_to_string(dir.path().join("run.log")).unwrap();
        assert!(log.contains("--conversion=pseudo"));
    }

    #[test]
    fn test_solar_radiation_with_default_latitude() {
        let dir = tempfile::tempdir().unwrap();
        valley_dem(dir.path());
        let wd = working_dir(dir.path());
        let opts = LspOptions {
            pisr: Some("pisr".to_string()),
            pisr_start_date: "2024-06-01".to_string(),
            pisr_end_date: "2024-06-10".to_string(),
            pisr_hour_step: 1.0,
            ..options(dir.path(), "run.log")
        };
        let report = compute_lsps(&opts).unwrap();
        assert_eq!(report.computed, vec!["pisr", "pisr_direct", "pisr_diffuse"]);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("latitude"));
        assert!(output_exists(&wd, "pisr_direct"));
        assert!(output_exists(&wd, "pisr_diffuse"));
    }

    #[test]
    fn test_all_uses_default_names_in_order() {
        let dir = tempfile::tempdir().unwrap();
        valley_dem(dir.path());
        let wd = working_dir(dir.path());
        let opts = LspOptions {
            all: true,
            pisr_start_date: "2024-03-18".to_string(),
            pisr_end_date: "2024-03-22".to_string(),
            pisr_hour_step: 2.0,
            ..options(dir.path(), "run.log")
        };
        let report = compute_lsps(&opts).unwrap();
        assert_eq!(
            report.computed,
            vec![
                "hillshade",
                "slope",
                "twi_filled",
                "twi_tca",
                "twi_slope",
                "twi",
                "tpi",
                "relative_elevation",
                "pisr",
                "pisr_direct",
                "pisr_diffuse"
            ]
        );
        assert!(report.skipped.is_empty());
        assert_eq!(report.warnings.len(), 3);
        assert!(report.warnings[0].contains("TPI radius"));
        assert!(report.warnings[1].contains("relative elevation radius"));
        assert!(report.warnings[2].contains("latitude"));
        for name in ["hillshade", "slope", "twi", "tpi", "relative_elevation", "pisr"] {
            assert!(output_exists(&wd, name));
        }
    }

    #[test]
    fn test_output_named_like_an_intermediate_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        valley_dem(dir.path());
        let wd = working_dir(dir.path());
        let opts = LspOptions {
            slope: Some("twi_slope".to_string()),
            twi: Some("twi".to_string()),
            delete_intermediates: true,
            ..options(dir.path(), "run.log")
        };
        let err = compute_lsps(&opts).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(!output_exists(&wd, "twi_slope"));
        assert!(!output_exists(&wd, "twi_filled"));
        let log = fs::read_to_string(dir.path().join("run.log")).unwrap();
        assert!(log.contains("ERROR"));
        assert!(!log.contains("Running"));

        // two parameters sharing one name
        let opts = LspOptions {
            slope: Some("terrain".to_string()),
            tpi: Some("terrain.sgrd".to_string()),
            tpi_radius: Some(20.0),
            ..options(dir.path(), "second.log")
        };
        let err = compute_lsps(&opts).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_existing_side_output_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        valley_dem(dir.path());
        let wd = working_dir(dir.path());
        write_dem(dir.path(), "pisr_direct.sgrd", 3, 3, 10.0, |_, _| 7.0);
        let before = fs::read(dir.path().join("pisr_direct.sdat")).unwrap();
        let opts = LspOptions {
            pisr: Some("pisr".to_string()),
            latitude: Some(45.0),
            pisr_start_date: "2024-06-01".to_string(),
            pisr_end_date: "2024-06-05".to_string(),
            pisr_hour_step: 2.0,
            delete_intermediates: true,
            ..options(dir.path(), "run.log")
        };
        let report = compute_lsps(&opts).unwrap();
        assert_eq!(report.computed, vec!["pisr", "pisr_diffuse"]);
        assert_eq!(report.skipped, vec!["pisr_direct"]);
        assert_eq!(report.deleted, vec!["pisr_diffuse"]);
        assert_eq!(fs::read(dir.path().join("pisr_direct.sdat")).unwrap(), before);
        assert!(output_exists(&wd, "pisr"));
        assert!(!output_exists(&wd, "pisr_diffuse"));
        let log = fs::read_to_string(dir.path().join("run.log")).unwrap();
        assert!(!log.contains("--direct="));
    }

    #[test]
    fn test_missing_dem_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let opts = LspOptions {
            slope: Some("slope".to_string()),
            ..options(dir.path(), "run.log")
        };
        let err = compute_lsps(&opts).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_options_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("lsp.json");
        fs::write(&f, r#"{"dem": "dem.sgrd", "all": true, "tpi_radius": 100}"#).unwrap();
        let opts = LspOptions::from_json_file(f.to_str().unwrap()).unwrap();
        assert!(opts.all);
        assert_eq!(opts.tpi_radius, Some(100.0));
        assert_eq!(opts.pisr_day_step, 5);
        assert_eq!(opts.log_file, "lsp.log");
        assert_eq!(opts.output_name(&opts.slope, "slope"), Some("slope".to_string()));
    }
}
