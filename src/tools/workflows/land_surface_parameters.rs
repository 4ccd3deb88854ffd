/*
This tool is part of the lsp_tools terrain analysis library.
Authors: lsp_tools developers
Created: 19/10/2026
Last Modified: 19/10/2026
License: MIT
*/

use crate::lsp::{compute_lsps, LspOptions};
use crate::tools::*;
use crate::utils::get_formatted_elapsed_time;
use std::io::{Error, ErrorKind};
use std::time::Instant;

/// Derives a set of land surface parameters from a DEM in a single run:
/// hillshade, slope, topographic wetness index (TWI), topographic position
/// index (TPI), relative elevation and potential incoming solar radiation
/// (PISR). Each parameter is computed only when an output name is given for
/// it, or for all of them with `--all` (default names `hillshade`, `slope`,
/// `twi`, `tpi`, `relative_elevation` and `pisr`).
///
/// Options can be read from a JSON file (`--config`) whose fields are named
/// like the flags below (`dem`, `tpi_radius`, `pisr_start_date`, ...); flags
/// given on the command line override the file.
///
/// Outputs that already exist are not recomputed. The run is logged to
/// `--log_file` (default `lsp.log`), which must not exist yet. The wetness
/// index is based on the pseudo specific catchment area unless `--true_sca`
/// is specified; its intermediate grids (`<twi>_filled`, `<twi>_tca`,
/// `<twi>_sca`, `<twi>_slope`) and the direct and diffuse radiation grids
/// (`<pisr>_direct`, `<pisr>_diffuse`) are removed with
/// `--delete_intermediates`.
///
/// # See Also
/// `Hillshade`, `Slope`, `WetnessIndex`, `TopographicPositionIndex`,
/// `RelativeElevation`, `SolarRadiation`
pub struct LandSurfaceParameters {
    name: String,
    description: String,
    toolbox: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl LandSurfaceParameters {
    pub fn new() -> LandSurfaceParameters {
        // public constructor
        let name = "LandSurfaceParameters".to_string();
        let toolbox = "Workflows".to_string();
        let description =
            "Computes hillshade, slope, TWI, TPI, relative elevation and solar radiation from a DEM."
                .to_string();

        let mut parameters = vec![];
        parameters.push(ToolParameter {
            name: "Options File".to_owned(),
            flags: vec!["--config".to_owned()],
            description: "Optional JSON file of workflow options.".to_owned(),
            parameter_type: ParameterType::ExistingFile(ParameterFileType::Text),
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Input DEM File".to_owned(),
            flags: vec!["-i".to_owned(), "--dem".to_owned()],
            description: "Input raster DEM file.".to_owned(),
            parameter_type: ParameterType::ExistingFile(ParameterFileType::Raster),
            default_value: None,
            optional: false,
        });

        for (flag, label) in [
            ("hillshade", "Hillshade"),
            ("slope", "Slope"),
            ("twi", "Wetness Index"),
            ("tpi", "Topographic Position Index"),
            ("relative_elevation", "Relative Elevation"),
            ("pisr", "Solar Radiation"),
        ] {
            parameters.push(ToolParameter {
                name: format!("Output {} File", label),
                flags: vec![format!("--{}", flag)],
                description: format!("Optional output {} raster.", label.to_lowercase()),
                parameter_type: ParameterType::NewFile(ParameterFileType::Raster),
                default_value: None,
                optional: true,
            });
        }

        parameters.push(ToolParameter {
            name: "TPI Radius (map units)".to_owned(),
            flags: vec!["--tpi_radius".to_owned()],
            description: "Neighbourhood radius of the TPI.".to_owned(),
            parameter_type: ParameterType::Float,
            default_value: Some("50.0".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Relative Elevation Radius (map units)".to_owned(),
            flags: vec!["--relative_elevation_radius".to_owned()],
            description: "Window radius of the relative elevation filter.".to_owned(),
            parameter_type: ParameterType::Float,
            default_value: Some("50.0".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Use true specific catchment area?".to_owned(),
            flags: vec!["--true_sca".to_owned()],
            description: "Base the wetness index on the true rather than the pseudo specific catchment area.".to_owned(),
            parameter_type: ParameterType::Boolean,
            default_value: Some("false".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Start Date".to_owned(),
            flags: vec!["--start_date".to_owned()],
            description: "First day of the solar radiation period (YYYY-MM-DD).".to_owned(),
            parameter_type: ParameterType::String,
            default_value: Some("2024-01-01".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "End Date".to_owned(),
            flags: vec!["--end_date".to_owned()],
            description: "Last day of the solar radiation period (YYYY-MM-DD).".to_owned(),
            parameter_type: ParameterType::String,
            default_value: Some("2024-12-31".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Day Step".to_owned(),
            flags: vec!["--day_step".to_owned()],
            description: "Days between sampled days.".to_owned(),
            parameter_type: ParameterType::Integer,
            default_value: Some("5".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Hour Step".to_owned(),
            flags: vec!["--hour_step".to_owned()],
            description: "Hours between sampled sun positions.".to_owned(),
            parameter_type: ParameterType::Float,
            default_value: Some("0.5".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Latitude (degrees)".to_owned(),
            flags: vec!["--latitude".to_owned()],
            description: "Site latitude for solar radiation.".to_owned(),
            parameter_type: ParameterType::Float,
            default_value: Some("53.0".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Compute all parameters?".to_owned(),
            flags: vec!["--all".to_owned()],
            description: "Compute every parameter, using default names for those not named.".to_owned(),
            parameter_type: ParameterType::Boolean,
            default_value: Some("false".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Delete intermediate files?".to_owned(),
            flags: vec!["--delete_intermediates".to_owned()],
            description: "Delete intermediate grids after the run.".to_owned(),
            parameter_type: ParameterType::Boolean,
            default_value: Some("false".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Log File".to_owned(),
            flags: vec!["--log_file".to_owned()],
            description: "Log file; must not already exist.".to_owned(),
            parameter_type: ParameterType::NewFile(ParameterFileType::Text),
            default_value: Some("lsp.log".to_owned()),
            optional: true,
        });

        let usage = example_usage(
            &name,
            "--dem=DEM.sgrd --slope=slope --twi=twi --tpi=tpi --tpi_radius=100 --log_file=lsp.log",
        );

        LandSurfaceParameters {
            name,
            description,
            toolbox,
            parameters,
            example_usage: usage,
        }
    }
}

impl LspTool for LandSurfaceParameters {
    fn get_tool_name(&self) -> String {
        self.name.clone()
    }

    fn get_tool_description(&self) -> String {
        self.description.clone()
    }

    fn get_tool_parameters(&self) -> String {
        parameters_to_json(&self.parameters)
    }

    fn get_example_usage(&self) -> String {
        self.example_usage.clone()
    }

    fn get_toolbox(&self) -> String {
        self.toolbox.clone()
    }

    fn run<'a>(&self, args: Vec<String>, working_directory: &'a str, verbose: bool) -> Result<(), Error> {
        let parsed = parse_args(&args)?;

        let mut options = LspOptions::default();
        for (flag, value) in &parsed {
            if flag == "-config" {
                let config_file = resolve_path(working_directory, &required_value(flag, value.clone())?);
                options = LspOptions::from_json_file(&config_file)?;
            }
        }

        for (flag, value) in parsed {
            match flag.as_str() {
                "-i" | "-input" | "-dem" => options.dem = required_value(&flag, value)?,
                "-hillshade" => options.hillshade = Some(required_value(&flag, value)?),
                "-slope" => options.slope = Some(required_value(&flag, value)?),
                "-twi" => options.twi = Some(required_value(&flag, value)?),
                "-tpi" => options.tpi = Some(required_value(&flag, value)?),
                "-relative_elevation" => {
                    options.relative_elevation = Some(required_value(&flag, value)?)
                }
                "-pisr" => options.pisr = Some(required_value(&flag, value)?),
                "-tpi_radius" => options.tpi_radius = Some(parse_value(&flag, value)?),
                "-relative_elevation_radius" => {
                    options.relative_elevation_radius = Some(parse_value(&flag, value)?)
                }
                "-true_sca" => options.true_sca = parse_switch(value),
                "-start_date" => options.pisr_start_date = required_value(&flag, value)?,
                "-end_date" => options.pisr_end_date = required_value(&flag, value)?,
                "-day_step" => options.pisr_day_step = parse_value(&flag, value)?,
                "-hour_step" => options.pisr_hour_step = parse_value(&flag, value)?,
                "-latitude" => options.latitude = Some(parse_value(&flag, value)?),
                "-all" => options.all = parse_switch(value),
                "-delete_intermediates" => options.delete_intermediates = parse_switch(value),
                "-log_file" => options.log_file = required_value(&flag, value)?,
                _ => {}
            }
        }
        if options.dem.trim().is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "The --dem parameter is required.",
            ));
        }
        if options.working_directory.is_empty() {
            options.working_directory = working_directory.to_string();
        }
        options.verbose = options.verbose || verbose;

        if verbose {
            print_welcome(&self.get_tool_name());
        }

        let start = Instant::now();
        let report = compute_lsps(&options)?;
        let elapsed_time = get_formatted_elapsed_time(start);

        if verbose {
            println!("Computed: {}", report.computed.join(", "));
            println!("Skipped: {}", report.skipped.join(", "));
            if !report.deleted.is_empty() {
                println!("Deleted: {}", report.deleted.join(", "));
            }
            println!("Elapsed Time: {}", elapsed_time);
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lsp::output_exists;
    use crate::tools::test_support::*;
    use std::fs;

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        write_dem(dir.path(), "dem.sgrd", 8, 8, 5.0, |row, col| (row * col) as f64);
        fs::write(
            dir.path().join("lsp.json"),
            r#"{"dem": "dem.sgrd", "slope": "slope_from_config", "log_file": "config.log"}"#,
        )
        .unwrap();
        let wd = working_dir(dir.path());
        LandSurfaceParameters::new()
            .run(
                args(&["--config=lsp.json", "--slope=slope", "--tpi=tpi", "--tpi_radius=10"]),
                &wd,
                false,
            )
            .unwrap();
        assert!(output_exists(&wd, "slope"));
        assert!(output_exists(&wd, "tpi"));
        assert!(!output_exists(&wd, "slope_from_config"));
        assert!(dir.path().join("config.log").exists());
    }

    #[test]
    fn test_dem_is_required() {
        let dir = tempfile::tempdir().unwrap();
        let wd = working_dir(dir.path());
        let err = LandSurfaceParameters::new()
            .run(args(&["--slope=slope"]), &wd, false)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(!dir.path().join("lsp.log").exists());
    }
}
