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
use std::f64;
use std::io::{Error, ErrorKind};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Converts a total catchment area (TCA) raster into specific catchment area
/// (SCA), the upslope area per unit contour width. The effective contour
/// (flow) width of a cell depends on its aspect, *a*, calculated from the DEM
/// using Horn's (1981) method:
///
/// > w = res × (|sin a| + |cos a|)
///
/// which equals the grid resolution for cardinal aspects and reaches
/// res × √2 for diagonal aspects (Quinn et al., 1991). Cells without a
/// defined aspect use a width of one grid resolution.
///
/// # See Also
/// `FlowAccumulation`, `WetnessIndex`
pub struct SpecificCatchmentArea {
    name: String,
    description: String,
    toolbox: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl SpecificCatchmentArea {
    pub fn new() -> SpecificCatchmentArea {
        // public constructor
        let name = "SpecificCatchmentArea".to_string();
        let toolbox = "Hydrological Analysis".to_string();
        let description =
            "Divides total catchment area by an aspect-dependent flow width to give specific catchment area."
                .to_string();

        let mut parameters = vec![];
        parameters.push(ToolParameter {
            name: "Input DEM File".to_owned(),
            flags: vec!["-i".to_owned(), "--dem".to_owned()],
            description: "Input raster DEM file, used for aspect.".to_owned(),
            parameter_type: ParameterType::ExistingFile(ParameterFileType::Raster),
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Input Total Catchment Area File".to_owned(),
            flags: vec!["--tca".to_owned()],
            description: "Input raster total catchment area file (squared map units).".to_owned(),
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

        let usage = example_usage(&name, "--dem=filled.sgrd --tca=tca.sgrd -o=sca.sgrd");

        SpecificCatchmentArea {
            name,
            description,
            toolbox,
            parameters,
            example_usage: usage,
        }
    }
}

impl LspTool for SpecificCatchmentArea {
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
        let mut dem_file = String::new();
        let mut tca_file = String::new();
        let mut output_file = String::new();

        for (flag, value) in parse_args(&args)? {
            match flag.as_str() {
                "-i" | "-input" | "-dem" => dem_file = required_value(&flag, value)?,
                "-tca" => tca_file = required_value(&flag, value)?,
                "-o" | "-output" => output_file = required_value(&flag, value)?,
                _ => {}
            }
        }
        check_required("--dem", &dem_file)?;
        check_required("--tca", &tca_file)?;
        check_required("--output", &output_file)?;

        if verbose {
            print_welcome(&self.get_tool_name());
        }

        let dem_file = resolve_input(working_directory, &dem_file);
        let tca_file = resolve_input(working_directory, &tca_file);
        let output_file = resolve_output(working_directory, &output_file);

        if verbose {
            println!("Reading data...")
        };

        let dem = Arc::new(Raster::new(&dem_file, "r")?);
        let tca = Arc::new(Raster::new(&tca_file, "r")?);

        let rows = dem.configs.rows as isize;
        let columns = dem.configs.columns as isize;
        if tca.configs.rows as isize != rows || tca.configs.columns as isize != columns {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "The input DEM and catchment area files must have the same number of rows and columns.",
            ));
        }

        let start = Instant::now();
        let nodata = dem.configs.nodata;
        let tca_nodata = tca.configs.nodata;
        let res_x = dem.configs.resolution_x;
        let res_y = dem.configs.resolution_y;
        let res = (res_x + res_y) / 2.0;

        let mut output = Raster::initialize_using_file(&output_file, &tca);
        output.configs.data_type = DataType::F32;
        let out_nodata = output.configs.nodata;

        let num_procs = get_num_procs();
        let (tx, rx) = mpsc::channel();
        for tid in 0..num_procs {
            let dem = dem.clone();
            let tca = tca.clone();
            let tx = tx.clone();
            thread::spawn(move || {
                let d_x = [1, 1, 1, 0, -1, -1, -1, 0];
                let d_y = [-1, 0, 1, 1, 1, 0, -1, -1];
                let mut n = [0f64; 8];
                let (mut z, mut a): (f64, f64);
                let (mut fx, mut fy): (f64, f64);
                for row in (0..rows).filter(|r| r % num_procs == tid) {
                    let mut data = vec![out_nodata; columns as usize];
                    for col in 0..columns {
                        z = dem.get_value(row, col);
                        a = tca.get_value(row, col);
                        if z != nodata && a != tca_nodata {
                            for c in 0..8 {
                                n[c] = dem.get_value(row + d_y[c], col + d_x[c]);
                                if n[c] == nodata {
                                    n[c] = z;
                                }
                            }
                            fy = (n[6] - n[4] + 2.0 * (n[7] - n[3]) + n[0] - n[2]) / (8.0 * res_y);
                            fx = (n[2] - n[4] + 2.0 * (n[1] - n[5]) + n[0] - n[6]) / (8.0 * res_x);
                            let width = if fx != 0.0 || fy != 0.0 {
                                let aspect = fx.atan2(fy);
                                res * (aspect.sin().abs() + aspect.cos().abs())
                            } else {
                                res
                            };
                            data[col as usize] = a / width;
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
        output.add_metadata_entry(format!("DEM file: {}", dem_file));
        output.add_metadata_entry(format!("TCA file: {}", tca_file));
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
    fn test_cardinal_and_diagonal_widths() {
        let dir = tempfile::tempdir().unwrap();
        write_dem(dir.path(), "south.sgrd", 5, 5, 10.0, |row, _| 100.0 - row as f64);
        write_dem(dir.path(), "diag.sgrd", 5, 5, 10.0, |row, col| {
            100.0 - row as f64 - col as f64
        });
        write_dem(dir.path(), "tca.sgrd", 5, 5, 10.0, |_, _| 1000.0);
        let wd = working_dir(dir.path());
        let tool = SpecificCatchmentArea::new();
        tool.run(args(&["--dem=south", "--tca=tca", "--output=sca1"]), &wd, false)
            .unwrap();
        tool.run(args(&["--dem=diag", "--tca=tca", "--output=sca2"]), &wd, false)
            .unwrap();
        let sca1 = Raster::new(&format!("{}sca1.sgrd", wd), "r").unwrap();
        let sca2 = Raster::new(&format!("{}sca2.sgrd", wd), "r").unwrap();
        assert!((sca1.get_value(2, 2) - 100.0).abs() < 1e-3);
        assert!((sca2.get_value(2, 2) - 1000.0 / (10.0 * 2f64.sqrt())).abs() < 1e-3);
    }

    #[test]
    fn test_mismatched_grids() {
        let dir = tempfile::tempdir().unwrap();
        write_dem(dir.path(), "dem.sgrd", 5, 5, 10.0, |_, _| 1.0);
        write_dem(dir.path(), "tca.sgrd", 4, 5, 10.0, |_, _| 1.0);
        let wd = working_dir(dir.path());
        let err = SpecificCatchmentArea::new()
            .run(args(&["--dem=dem", "--tca=tca", "--output=sca"]), &wd, false)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
