/*
This tool is part of the lsp_tools terrain analysis library.
Authors: lsp_tools developers
Created: 19/10/2026
Last Modified: 19/10/2026
License: MIT
*/

use crate::raster::*;
use crate::structures::Array2D;
use crate::tools::*;
use crate::utils::{get_formatted_elapsed_time, get_num_procs};
use std::f64;
use std::io::{Error, ErrorKind};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Topographic position index (TPI; Guisan et al., 1999; Weiss, 2001) is the
/// difference between the elevation of a cell and the mean elevation of a
/// circular neighbourhood around it. Positive values indicate locations that
/// are higher than their surroundings (ridges, hill tops), negative values
/// lower locations (valleys), and values near zero flat areas or mid-slopes.
///
/// The neighbourhood radius (`--radius`) is given in map units and defaults to
/// 50. With `--standardize` the index is divided by the standard deviation of
/// the neighbourhood elevations. Nodata cells are excluded from the
/// neighbourhood statistics.
///
/// Neighbourhood sums are taken from per-row cumulative sums, so the cost per
/// cell grows with the radius rather than its square.
///
/// # Reference
/// Weiss, A. 2001. Topographic position and landforms analysis. Poster
/// presentation, ESRI User Conference, San Diego, CA.
///
/// # See Also
/// `RelativeElevation`
pub struct TopographicPositionIndex {
    name: String,
    description: String,
    toolbox: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl TopographicPositionIndex {
    pub fn new() -> TopographicPositionIndex {
        // public constructor
        let name = "TopographicPositionIndex".to_string();
        let toolbox = "Geomorphometric Analysis".to_string();
        let description =
            "Calculates the difference between elevation and the mean elevation of a circular neighbourhood."
                .to_string();

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
            name: "Radius (map units)".to_owned(),
            flags: vec!["--radius".to_owned()],
            description: "Neighbourhood radius in map units.".to_owned(),
            parameter_type: ParameterType::Float,
            default_value: Some("50.0".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Standardize?".to_owned(),
            flags: vec!["--standardize".to_owned()],
            description: "Divide by the neighbourhood standard deviation.".to_owned(),
            parameter_type: ParameterType::Boolean,
            default_value: Some("false".to_owned()),
            optional: true,
        });

        let usage = example_usage(&name, "--dem=DEM.sgrd -o=tpi.sgrd --radius=50");

        TopographicPositionIndex {
            name,
            description,
            toolbox,
            parameters,
            example_usage: usage,
        }
    }
}

impl LspTool for TopographicPositionIndex {
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
        let mut radius = 50f64;
        let mut standardize = false;

        for (flag, value) in parse_args(&args)? {
            match flag.as_str() {
                "-i" | "-input" | "-dem" => input_file = required_value(&flag, value)?,
                "-o" | "-output" => output_file = required_value(&flag, value)?,
                "-radius" => radius = parse_value(&flag, value)?,
                "-standardize" => standardize = parse_switch(value),
                _ => {}
            }
        }
        check_required("--dem", &input_file)?;
        check_required("--output", &output_file)?;
        if !(radius > 0.0) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "The --radius value must be greater than zero.",
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

        let input = Raster::new(&input_file, "r")?;

        let start = Instant::now();
        let rows = input.configs.rows as isize;
        let columns = input.configs.columns as isize;
        let nodata = input.configs.nodata;
        let res = (input.configs.resolution_x + input.configs.resolution_y) / 2.0;
        let radius_cells = (radius / res).max(1.0);
        let r = radius_cells.floor() as isize;
        // half-width of the circle on each row offset
        let half_widths: Vec<(isize, isize)> = (-r..=r)
            .map(|dy| {
                let dx = (radius_cells * radius_cells - (dy * dy) as f64).max(0.0).sqrt().floor() as isize;
                (dy, dx)
            })
            .collect();

        // per-row cumulative sums; column c holds the sum of cells 0..c
        let mut sums: Array2D<f64> = Array2D::new(rows, columns + 1, 0f64, 0f64)?;
        let mut sums_sqr: Array2D<f64> = Array2D::new(rows, columns + 1, 0f64, 0f64)?;
        let mut counts: Array2D<i32> = Array2D::new(rows, columns + 1, 0i32, 0i32)?;
        let mut progress = Progress::new("Calculating cumulative sums", rows as usize, verbose);
        for row in 0..rows {
            let (mut sum, mut sum_sqr, mut n) = (0f64, 0f64, 0i32);
            for col in 0..columns {
                let z = input.get_value(row, col);
                if z != nodata {
                    sum += z;
                    sum_sqr += z * z;
                    n += 1;
                }
                sums.set_value(row, col + 1, sum);
                sums_sqr.set_value(row, col + 1, sum_sqr);
                counts.set_value(row, col + 1, n);
            }
            progress.update(row as usize);
        }

        let input = Arc::new(input);
        let sums = Arc::new(sums);
        let sums_sqr = Arc::new(sums_sqr);
        let counts = Arc::new(counts);
        let half_widths = Arc::new(half_widths);

        let mut output = Raster::initialize_using_file(&output_file, &input);
        output.configs.data_type = DataType::F32;
        let num_procs = get_num_procs();
        let (tx, rx) = mpsc::channel();
        for tid in 0..num_procs {
            let input = input.clone();
            let sums = sums.clone();
            let sums_sqr = sums_sqr.clone();
            let counts = counts.clone();
            let half_widths = half_widths.clone();
            let tx = tx.clone();
            thread::spawn(move || {
                let (mut x1, mut x2, mut y): (isize, isize, isize);
                for row in (0..rows).filter(|r| r % num_procs == tid) {
                    let mut data = vec![nodata; columns as usize];
                    for col in 0..columns {
                        let z = input.get_value(row, col);
                        if z == nodata {
                            continue;
                        }
                        let (mut sum, mut sum_sqr, mut n) = (0f64, 0f64, 0i32);
                        for &(dy, dx) in half_widths.iter() {
                            y = row + dy;
                            if y < 0 || y >= rows {
                                continue;
                            }
                            x1 = (col - dx).max(0);
                            x2 = (col + dx + 1).min(columns);
                            sum += sums.get_value(y, x2) - sums.get_value(y, x1);
                            sum_sqr += sums_sqr.get_value(y, x2) - sums_sqr.get_value(y, x1);
                            n += counts.get_value(y, x2) - counts.get_value(y, x1);
                        }
                        if n > 0 {
                            let mean = sum / n as f64;
                            let mut tpi = z - mean;
                            if standardize {
                                let variance = (sum_sqr / n as f64 - mean * mean).max(0.0);
                                let sd = variance.sqrt();
                                tpi = if sd > 1e-10 { tpi / sd } else { 0.0 };
                            }
                            data[col as usize] = tpi;
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
        output.add_metadata_entry(format!("Radius: {}", radius));
        output.add_metadata_entry(format!("Standardized: {}", standardize));
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
    fn test_flat_surface_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        write_dem(dir.path(), "dem.sgrd", 8, 8, 10.0, |_, _| 250.0);
        let wd = working_dir(dir.path());
        TopographicPositionIndex::new()
            .run(args(&["--dem=dem", "--output=tpi", "--radius=30"]), &wd, false)
            .unwrap();
        let tpi = Raster::new(&format!("{}tpi.sgrd", wd), "r").unwrap();
        assert_eq!(tpi.configs.minimum, 0.0);
        assert_eq!(tpi.configs.maximum, 0.0);
    }

    #[test]
    fn test_peak_is_positive_and_pit_negative() {
        let dir = tempfile::tempdir().unwrap();
        write_dem(dir.path(), "dem.sgrd", 9, 9, 1.0, |row, col| match (row, col) {
            (2, 2) => 20.0,
            (6, 6) => 0.0,
            _ => 10.0,
        });
        let wd = working_dir(dir.path());
        TopographicPositionIndex::new()
            .run(args(&["--dem=dem", "--output=tpi", "--radius=1"]), &wd, false)
            .unwrap();
        let tpi = Raster::new(&format!("{}tpi.sgrd", wd), "r").unwrap();
        // radius of one cell: the centre and its four cardinal neighbours
        assert!((tpi.get_value(2, 2) - 8.0).abs() < 1e-5);
        assert!((tpi.get_value(6, 6) + 8.0).abs() < 1e-5);
        assert!((tpi.get_value(2, 3) + 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_standardized_plane() {
        let dir = tempfile::tempdir().unwrap();
        write_dem(dir.path(), "dem.sgrd", 7, 7, 1.0, |_, col| col as f64);
        let wd = working_dir(dir.path());
        TopographicPositionIndex::new()
            .run(args(&["--dem=dem", "--output=tpi", "--radius=2", "--standardize"]), &wd, false)
            .unwrap();
        let tpi = Raster::new(&format!("{}tpi.sgrd", wd), "r").unwrap();
        // a symmetric neighbourhood on a plane averages to the centre value
        assert!(tpi.get_value(3, 3).abs() < 1e-5);
    }

    #[test]
    fn test_zero_radius_rejected() {
        let err = TopographicPositionIndex::new()
            .run(args(&["--dem=dem", "--output=tpi", "--radius=0"]), "", false)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
