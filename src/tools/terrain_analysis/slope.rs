/*
This tool is part of the lsp_tools terrain analysis library.
Authors: lsp_tools developers
Created: 19/10/2026
Last Modified: 19/10/2026
License: MIT
*/

use super::{geographic_z_factor, horn_gradient};
use crate::raster::*;
use crate::tools::*;
use crate::utils::{get_formatted_elapsed_time, get_num_procs};
use std::f64;
use std::io::{Error, ErrorKind};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// This tool calculates slope gradient (i.e. slope steepness) for each grid
/// cell in an input digital elevation model (DEM). Slope is calculated from
/// the partial derivatives of Horn's (1981) 3rd-order finite difference
/// method and is reported in degrees (default), radians or percent
/// (`--units`). The *Z conversion factor* (`--zfactor`) is only important when
/// the vertical and horizontal units are not the same in the DEM; for DEMs in
/// geographic coordinates it is calculated from the latitude of the grid
/// centre.
///
/// Edge cells and cells next to nodata use the centre cell elevation in place
/// of their missing neighbours.
///
/// # Reference
/// Horn, B. K. P. (1981). Hill shading and the reflectance map. Proceedings of
/// the IEEE, 69(1), 14-47.
///
/// # See Also
/// `Hillshade`, `WetnessIndex`
pub struct Slope {
    name: String,
    description: String,
    toolbox: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl Slope {
    pub fn new() -> Slope {
        // public constructor
        let name = "Slope".to_string();
        let toolbox = "Geomorphometric Analysis".to_string();
        let description = "Calculates a slope raster from an input DEM.".to_string();

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
            name: "Units".to_owned(),
            flags: vec!["--units".to_owned()],
            description: "Units of output raster; options include 'degrees', 'radians', 'percent'".to_owned(),
            parameter_type: ParameterType::OptionList(vec![
                "degrees".to_owned(),
                "radians".to_owned(),
                "percent".to_owned(),
            ]),
            default_value: Some("degrees".to_owned()),
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

        let usage = example_usage(&name, "--dem=DEM.sgrd -o=output.sgrd --units=degrees");

        Slope {
            name,
            description,
            toolbox,
            parameters,
            example_usage: usage,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum SlopeUnits {
    Degrees,
    Radians,
    Percent,
}

impl LspTool for Slope {
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
        let mut z_factor = 1f64;
        let mut units = SlopeUnits::Degrees;

        for (flag, value) in parse_args(&args)? {
            match flag.as_str() {
                "-i" | "-input" | "-dem" => input_file = required_value(&flag, value)?,
                "-o" | "-output" => output_file = required_value(&flag, value)?,
                "-zfactor" => z_factor = parse_value(&flag, value)?,
                "-units" => {
                    let v = required_value(&flag, value)?.to_lowercase();
                    units = if v.starts_with("deg") {
                        SlopeUnits::Degrees
                    } else if v.starts_with("rad") {
                        SlopeUnits::Radians
                    } else if v.starts_with("per") {
                        SlopeUnits::Percent
                    } else {
                        return Err(Error::new(
                            ErrorKind::InvalidInput,
                            format!("Unrecognized --units value '{}'.", v),
                        ));
                    };
                }
                _ => {}
            }
        }
        check_required("--dem", &input_file)?;
        check_required("--output", &output_file)?;

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

        let mut output = Raster::initialize_using_file(&output_file, &input);
        if !output.configs.data_type.is_float() {
            output.configs.data_type = DataType::F32;
        }
        output.configs.z_units = match units {
            SlopeUnits::Degrees => "degrees",
            SlopeUnits::Radians => "radians",
            SlopeUnits::Percent => "percent",
        }
        .to_string();
        let rows = input.configs.rows as isize;

        let num_procs = get_num_procs();
        let (tx, rx) = mpsc::channel();
        for tid in 0..num_procs {
            let input = input.clone();
            let tx = tx.clone();
            thread::spawn(move || {
                let nodata = input.configs.nodata;
                let columns = input.configs.columns as isize;
                for row in (0..rows).filter(|r| r % num_procs == tid) {
                    let mut data = vec![nodata; columns as usize];
                    for col in 0..columns {
                        if let Some((fx, fy)) = horn_gradient(&input, row, col, z_factor) {
                            let tan_slope = (fx * fx + fy * fy).sqrt();
                            data[col as usize] = match units {
                                SlopeUnits::Degrees => tan_slope.atan().to_degrees(),
                                SlopeUnits::Radians => tan_slope.atan(),
                                SlopeUnits::Percent => tan_slope * 100f64,
                            };
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
    fn test_inclined_plane() {
        let dir = tempfile::tempdir().unwrap();
        // rises 1 m every 10 m cell to the east
        write_dem(dir.path(), "dem.sgrd", 6, 6, 10.0, |_, col| 50.0 + col as f64);
        let wd = working_dir(dir.path());
        let tool = Slope::new();
        tool.run(args(&["--dem=dem", "--output=deg", "--units=degrees"]), &wd, false)
            .unwrap();
        tool.run(args(&["--dem=dem", "--output=pct", "--units", "percent"]), &wd, false)
            .unwrap();
        let deg = Raster::new(&format!("{}deg.sgrd", wd), "r").unwrap();
        let pct = Raster::new(&format!("{}pct.sgrd", wd), "r").unwrap();
        assert!((deg.get_value(2, 2) - 0.1f64.atan().to_degrees()).abs() < 1e-4);
        assert!((pct.get_value(3, 3) - 10.0).abs() < 1e-4);
        assert_eq!(deg.configs.z_units, "degrees");
    }

    #[test]
    fn test_flat_surface_has_zero_slope() {
        let dir = tempfile::tempdir().unwrap();
        write_dem(dir.path(), "dem.sgrd", 4, 4, 1.0, |_, _| 7.0);
        let wd = working_dir(dir.path());
        Slope::new()
            .run(args(&["--dem=dem", "--output=slope"]), &wd, false)
            .unwrap();
        let slope = Raster::new(&format!("{}slope.sgrd", wd), "r").unwrap();
        assert_eq!(slope.configs.maximum, 0.0);
    }

    #[test]
    fn test_bad_units() {
        let err = Slope::new()
            .run(args(&["--dem=dem", "--output=slope", "--units=grads"]), "", false)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
