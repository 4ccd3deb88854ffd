/*
This tool is part of the lsp_tools terrain analysis library.
Authors: lsp_tools developers
Created: 19/10/2026
Last Modified: 19/10/2026
License: MIT
*/

use super::{geographic_z_factor, horn_gradient, slope_aspect};
use crate::raster::*;
use crate::tools::*;
use crate::utils::{get_formatted_elapsed_time, get_num_procs};
use std::f64;
use std::io::{Error, ErrorKind};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// This tool performs a hillshade operation (also called shaded relief) on an
/// input digital elevation model (DEM). The illumination source azimuth
/// (`--azimuth`, 0-360 degrees clockwise from north) and altitude
/// (`--altitude`, 0-90 degrees above the horizon) default to 315 and 45. The
/// hillshade value (*HS*) of a grid cell is:
///
/// > *HS* = cos(*Z*) cos(*s*) + sin(*Z*) sin(*s*) cos(*Az* - *a*)
///
/// where *Z* is the zenith angle of the illumination source, *s* and *a* are
/// the local slope and aspect calculated with Horn's (1981) method, and *Az*
/// is the source azimuth. Output values are scaled to 0-32767 and stored as
/// 16-bit integers; cells facing away from the source are zero.
///
/// # Reference
/// Gallant, J. C., and J. P. Wilson, 2000, Primary topographic attributes, in
/// Terrain Analysis: Principles and Applications, edited by J. P. Wilson and
/// J. C. Gallant pp. 51-86, John Wiley, Hoboken, N.J.
///
/// # See Also
/// `Slope`, `SolarRadiation`
pub struct Hillshade {
    name: String,
    description: String,
    toolbox: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl Hillshade {
    pub fn new() -> Hillshade {
        // public constructor
        let name = "Hillshade".to_string();
        let toolbox = "Geomorphometric Analysis".to_string();
        let description = "Calculates a hillshade raster from an input DEM.".to_string();

        let mut parameters = vec![];
        parameters.push(ToolParameter {
            name: "Input DEM File".to_owned(),
            flags: vec!["-i".to_owned(), "--dem".to_owned()],
            description: "Input raster DEM file.".to_owned(),
            parameter_type: ParameterType::ExistingFile(ParameterFileType::Raster),
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Output File".to_owned(),
            flags: vec!["-o".to_owned(), "--output".to_owned()],
            description: "Output raster file.".to_owned(),
            parameter_type: ParameterType::NewFile(ParameterFileType::Raster),
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Azimuth (degrees)".to_owned(),
            flags: vec!["--azimuth".to_owned()],
            description: "Illumination source azimuth in degrees.".to_owned(),
            parameter_type: ParameterType::Float,
            default_value: Some("315.0".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Altitude (degrees)".to_owned(),
            flags: vec!["--altitude".to_owned()],
            description: "Illumination source altitude in degrees.".to_owned(),
            parameter_type: ParameterType::Float,
            default_value: Some("45.0".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Z Conversion Factor".to_owned(),
            flags: vec!["--zfactor".to_owned()],
            description:
                "Optional multiplier for when the vertical and horizontal units are not the same."
                    .to_owned(),
            parameter_type: ParameterType::Float,
            default_value: None,
            optional: true,
        });

        let usage = example_usage(&name, "-i=DEM.sgrd -o=output.sgrd --azimuth=315.0 --altitude=45.0");

        Hillshade {
            name,
            description,
            toolbox,
            parameters,
            example_usage: usage,
        }
    }
}

impl LspTool for Hillshade {
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
        let mut input_file = String::new();
        let mut output_file = String::new();
        let mut azimuth = 315.0f64;
        let mut altitude = 45.0f64;
        let mut z_factor = 1f64;

        for (flag, value) in parse_args(&args)? {
            match flag.as_str() {
                "-i" | "-input" | "-dem" => input_file = required_value(&flag, value)?,
                "-o" | "-output" => output_file = required_value(&flag, value)?,
                "-azimuth" => azimuth = parse_value(&flag, value)?,
                "-altitude" => altitude = parse_value(&flag, value)?,
                "-zfactor" => z_factor = parse_value(&flag, value)?,
                _ => {}
            }
        }
        check_required("--dem", &input_file)?;
        check_required("--output", &output_file)?;
        if !(0.0..=90.0).contains(&altitude) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "The --altitude value must be between 0 and 90 degrees.",
            ));
        }

        if verbose {
            print_welcome(&self.get_tool_name());
        }

        let input_file = resolve_input(working_directory, &input_file);
        let output_file = resolve_output(working_directory, &output_file);

        if verbose {
            println!("Reading data...")
        };

        let input = Arc::new(Raster::new(&input_file, "r")?);

        let start = Instant::now();

        if z_factor == 1f64 {
            if let Some(zf) = geographic_z_factor(&input) {
                z_factor = zf;
            }
        }

        let rows = input.configs.rows as isize;
        let columns = input.configs.columns as isize;
        let azimuth_rad = azimuth.rem_euclid(360.0).to_radians();
        let zenith = (90.0 - altitude).to_radians();
        let (sin_zenith, cos_zenith) = zenith.sin_cos();

        let mut configs = input.configs.clone();
        configs.data_type = DataType::I16;
        configs.nodata = -32768f64;
        configs.title = String::new();
        configs.metadata = vec![];
        let mut output = Raster::initialize_using_config(&output_file, &configs);
        let out_nodata = output.configs.nodata;

        let num_procs = get_num_procs();
        let (tx, rx) = mpsc::channel();
        for tid in 0..num_procs {
            let input = input.clone();
            let tx = tx.clone();
            thread::spawn(move || {
                let mut val: f64;
                for row in (0..rows).filter(|r| r % num_procs == tid) {
                    let mut data = vec![out_nodata; columns as usize];
                    for col in 0..columns {
                        if let Some((fx, fy)) = horn_gradient(&input, row, col, z_factor) {
                            let (slope, aspect) = slope_aspect(fx, fy);
                            val = cos_zenith * slope.cos()
                                + sin_zenith * slope.sin() * (azimuth_rad - aspect).cos();
                            data[col as usize] = (val.max(0.0) * 32767.0).round();
                        }
                    }
                    if tx.send((row, data)).is_err() {
                        return;
                    }
                }
            });
        }
        drop(tx);

        let mut progress = Progress::new("Performing analysis", rows as usize, verbose);
        for r in 0..rows {
            let (row, data) = rx.recv().map_err(|_| {
                Error::new(ErrorKind::Other, "Error receiving data from worker thread.")
            })?;
            output.set_row_data(row, data);
            progress.update(r as usize);
        }

        let elapsed_time = get_formatted_elapsed_time(start);
        output.add_metadata_entry(format!(
            "Created by lsp_tools' {} tool",
            self.get_tool_name()
        ));
        output.add_metadata_entry(format!("Input file: {}", input_file));
        output.add_metadata_entry(format!("Azimuth: {}", azimuth));
        output.add_metadata_entry(format!("Altitude: {}", altitude));
        output.add_metadata_entry(format!("Z-factor: {}", z_factor));
        output.add_metadata_entry(format!("Elapsed Time (excluding I/O): {}", elapsed_time));

        if verbose {
            println!("Saving data...")
        };
        output.write()?;
        if verbose {
            println!("Output file written");
            println!("Elapsed Time (excluding I/O): {}", elapsed_time);
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tools::test_support::*;

    #[test]
    fn test_flat_surface_value() {
        let dir = tempfile::tempdir().unwrap();
        write_dem(dir.path(), "dem.sgrd", 4, 4, 5.0, |_, _| 100.0);
        let wd = working_dir(dir.path());
        Hillshade::new()
            .run(args(&["--dem=dem", "--output=hs", "--azimuth=315", "--altitude=45"]), &wd, false)
            .unwrap();
        let hs = Raster::new(&format!("{}hs.sgrd", wd), "r").unwrap();
        assert_eq!(hs.configs.data_type, DataType::I16);
        let expected = (45f64.to_radians().sin() * 32767.0).round();
        assert_eq!(hs.get_value(1, 1), expected);
    }

    #[test]
    fn test_slopes_facing_the_source_are_brighter() {
        let dir = tempfile::tempdir().unwrap();
        // west half faces north-west, east half faces south-east
        write_dem(dir.path(), "dem.sgrd", 9, 9, 10.0, |row, col| {
            let d = (row + col) as f64;
            if d < 8.0 {
                50.0 + 5.0 * d
            } else {
                130.0 - 5.0 * d
            }
        });
        let wd = working_dir(dir.path());
        Hillshade::new()
            .run(args(&["--dem=dem", "--output=hs"]), &wd, false)
            .unwrap();
        let hs = Raster::new(&format!("{}hs.sgrd", wd), "r").unwrap();
        assert!(hs.get_value(2, 2) > hs.get_value(6, 6));
    }

    #[test]
    fn test_invalid_altitude() {
        let err = Hillshade::new()
            .run(args(&["--dem=dem", "--output=hs", "--altitude=120"]), "", false)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
