/*
This tool is part of the lsp_tools terrain analysis library.
Authors: lsp_tools developers
Created: 19/10/2026
Last Modified: 19/10/2026
License: MIT
*/

use crate::raster::*;
use crate::tools::*;
use crate::utils::{get_formatted_elapsed_time, get_num_procs};
use std::collections::VecDeque;
use std::f64;
use std::io::{Error, ErrorKind};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Calculates the elevation of each grid cell above the lowest cell of its
/// neighbourhood, i.e. the DEM minus a moving-window minimum filter of the
/// DEM. The square window has an odd side length of
///
/// > *w* = 2 × round(*radius* / *res*) + 1
///
/// cells (at least 3), where `--radius` is given in map units (default 50).
/// Nodata cells are ignored when the minimum is taken and remain nodata in
/// the output. Windows are clipped at the grid edges. Because the centre cell
/// is part of its own window the output is never negative.
///
/// # See Also
/// `TopographicPositionIndex`
pub struct RelativeElevation {
    name: String,
    description: String,
    toolbox: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl RelativeElevation {
    pub fn new() -> RelativeElevation {
        // public constructor
        let name = "RelativeElevation".to_string();
        let toolbox = "Geomorphometric Analysis".to_string();
        let description =
            "Calculates elevation above the minimum of a moving window.".to_string();

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
            description: "Half the window size, in map units.".to_owned(),
            parameter_type: ParameterType::Float,
            default_value: Some("50.0".to_owned()),
            optional: true,
        });

        let usage = example_usage(&name, "--dem=DEM.sgrd -o=rel_elev.sgrd --radius=50");

        RelativeElevation {
            name,
            description,
            toolbox,
            parameters,
            example_usage: usage,
        }
    }
}

/// Odd window size, in cells, for a radius in map units.
fn window_size(radius: f64, resolution: f64) -> usize {
    let half = (radius / resolution).round().max(1.0) as usize;
    2 * half + 1
}

impl LspTool for RelativeElevation {
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

        for (flag, value) in parse_args(&args)? {
            match flag.as_str() {
                "-i" | "-input" | "-dem" => input_file = required_value(&flag, value)?,
                "-o" | "-output" => output_file = required_value(&flag, value)?,
                "-radius" => radius = parse_value(&flag, value)?,
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

        let input = Arc::new(Raster::new(&input_file, "r")?);

        let start = Instant::now();
        let rows = input.configs.rows as isize;
        let columns = input.configs.columns as isize;
        let nodata = input.configs.nodata;
        let res = (input.configs.resolution_x + input.configs.resolution_y) / 2.0;
        let filter_size = window_size(radius, res);
        let midpoint = (filter_size / 2) as isize;

        let mut output = Raster::initialize_using_file(&output_file, &input);
        if !output.configs.data_type.is_float() {
            output.configs.data_type = DataType::F32;
        }

        let num_procs = get_num_procs();
        let (tx, rx) = mpsc::channel();
        for tid in 0..num_procs {
            let input = input.clone();
            let tx = tx.clone();
            thread::spawn(move || {
                let (mut z_n, mut z, mut min_val): (f64, f64, f64);
                // the minimum of each column of the window
                let column_min = |col: isize, start_row: isize, end_row: isize| -> f64 {
                    let mut min_val = f64::INFINITY;
                    for row2 in start_row..end_row + 1 {
                        let z_n = input.get_value(row2, col);
                        if z_n != nodata && z_n < min_val {
                            min_val = z_n;
                        }
                    }
                    min_val
                };
                for row in (0..rows).filter(|r| r % num_procs == tid) {
                    let start_row = row - midpoint;
                    let end_row = row + midpoint;
                    let mut filter_min_vals: VecDeque<f64> = VecDeque::with_capacity(filter_size);
                    for col2 in -midpoint..midpoint + 1 {
                        filter_min_vals.push_back(column_min(col2, start_row, end_row));
                    }
                    let mut data = vec![nodata; columns as usize];
                    for col in 0..columns {
                        if col > 0 {
                            filter_min_vals.pop_front();
                            z_n = column_min(col + midpoint, start_row, end_row);
                            filter_min_vals.push_back(z_n);
                        }
                        z = input.get_value(row, col);
                        if z != nodata {
                            min_val = filter_min_vals.iter().cloned().fold(f64::INFINITY, f64::min);
                            if min_val < f64::INFINITY {
                                data[col as usize] = z - min_val;
                            }
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
        output.add_metadata_entry(format!("Window size: {}", filter_size));
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
    fn test_window_size() {
        assert_eq!(window_size(50.0, 10.0), 11);
        assert_eq!(window_size(1.0, 10.0), 3);
        assert_eq!(window_size(14.0, 10.0), 3);
        assert_eq!(window_size(16.0, 10.0), 5);
    }

    #[test]
    fn test_plane_with_known_minimum() {
        let dir = tempfile::tempdir().unwrap();
        // rises 2 m per cell to the east
        write_dem(dir.path(), "dem.sgrd", 7, 9, 1.0, |_, col| 2.0 * col as f64);
        let wd = working_dir(dir.path());
        RelativeElevation::new()
            .run(args(&["--dem=dem", "--output=rel", "--radius=2"]), &wd, false)
            .unwrap();
        let rel = Raster::new(&format!("{}rel.sgrd", wd), "r").unwrap();
        // a 5 x 5 window reaches two cells to the west
        assert_eq!(rel.get_value(3, 4), 4.0);
        assert_eq!(rel.get_value(3, 8), 4.0);
        // clipped at the western edge
        assert_eq!(rel.get_value(3, 1), 2.0);
        assert_eq!(rel.get_value(3, 0), 0.0);
        assert!(rel.configs.minimum >= 0.0);
    }

    #[test]
    fn test_nodata_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_dem(dir.path(), "dem.sgrd", 5, 5, 1.0, |row, col| {
            if row == 2 && col == 1 {
                -9999.0
            } else {
                10.0 + row as f64
            }
        });
        let wd = working_dir(dir.path());
        RelativeElevation::new()
            .run(args(&["--dem=dem", "--output=rel", "--radius=1"]), &wd, false)
            .unwrap();
        let rel = Raster::new(&format!("{}rel.sgrd", wd), "r").unwrap();
        assert_eq!(rel.get_value(2, 1), rel.configs.nodata);
        assert_eq!(rel.get_value(2, 2), 1.0);
        assert_eq!(rel.get_value(0, 0), 0.0);
    }
}
