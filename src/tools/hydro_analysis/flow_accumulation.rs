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

/// This tool calculates flow accumulation (contributing area) using the FD8
/// multiple-flow-direction algorithm (Freeman, 1991; Quinn et al., 1995). Flow
/// entering a cell is divided among all of its downslope neighbours in
/// proportion to `slope^p`, where `p` is the `--exponent` parameter (default
/// 1.1). Cells are processed from the top of the landscape downward, a cell
/// being released once all of its upslope neighbours have been solved.
///
/// The DEM must be hydrologically conditioned, e.g. with `FillDepressions`.
///
/// The output type (`--out_type`) is one of:
///
/// - `cells`: the number of upslope grid cells, including the cell itself;
/// - `ca`: total catchment area, in squared map units;
/// - `sca`: specific catchment area, the catchment area divided by the grid
///   resolution (a pseudo SCA; see `SpecificCatchmentArea` for an
///   aspect-based flow width).
///
/// # Reference
/// Freeman, T. G. (1991). Calculating catchment area with divergent flow based
/// on a regular grid. Computers and Geosciences, 17(3), 413-422.
///
/// Quinn, P. F., K. J. Beven, Lamb, R. 1995. The in(a/tanβ) index: how to
/// calculate it and how to use it within the topmodel framework. Hydrological
/// Processes 9(2): 161-182.
///
/// # See Also
/// `FillDepressions`, `SpecificCatchmentArea`, `WetnessIndex`
pub struct FlowAccumulation {
    name: String,
    description: String,
    toolbox: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl FlowAccumulation {
    pub fn new() -> FlowAccumulation {
        // public constructor
        let name = "FlowAccumulation".to_string();
        let toolbox = "Hydrological Analysis".to_string();
        let description =
            "Calculates an FD8 flow accumulation (contributing area) raster from an input DEM."
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
            name: "Output Type".to_owned(),
            flags: vec!["--out_type".to_owned()],
            description: "Output type; one of 'cells', 'ca' (catchment area), and 'sca' (specific catchment area).".to_owned(),
            parameter_type: ParameterType::OptionList(vec![
                "cells".to_owned(),
                "ca".to_owned(),
                "sca".to_owned(),
            ]),
            default_value: Some("ca".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Exponent Parameter".to_owned(),
            flags: vec!["--exponent".to_owned()],
            description: "Optional exponent parameter; default is 1.1.".to_owned(),
            parameter_type: ParameterType::Float,
            default_value: Some("1.1".to_owned()),
            optional: true,
        });

        let usage = example_usage(&name, "--dem=DEM.sgrd -o=tca.sgrd --out_type=ca --exponent=1.1");

        FlowAccumulation {
            name,
            description,
            toolbox,
            parameters,
            example_usage: usage,
        }
    }
}

impl LspTool for FlowAccumulation {
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
        let mut out_type = String::from("ca");
        let mut exponent = 1.1;

        for (flag, value) in parse_args(&args)? {
            match flag.as_str() {
                "-i" | "-input" | "-dem" => input_file = required_value(&flag, value)?,
                "-o" | "-output" => output_file = required_value(&flag, value)?,
                "-out_type" => {
                    let v = required_value(&flag, value)?.to_lowercase();
                    out_type = if v.contains("specific") || v == "sca" {
                        "sca".to_string()
                    } else if v.contains("cell") {
                        "cells".to_string()
                    } else if v.contains("catchment") || v == "ca" {
                        "ca".to_string()
                    } else {
                        return Err(Error::new(
                            ErrorKind::InvalidInput,
                            format!("Unrecognized --out_type value '{}'.", v),
                        ));
                    };
                }
                "-exponent" => exponent = parse_value(&flag, value)?,
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
        let rows = input.configs.rows as isize;
        let columns = input.configs.columns as isize;
        let num_cells = (rows * columns) as usize;
        let nodata = input.configs.nodata;
        let cell_size_x = input.configs.resolution_x;
        let cell_size_y = input.configs.resolution_y;
        let diag_cell_size = (cell_size_x * cell_size_x + cell_size_y * cell_size_y).sqrt();

        let mut output = Raster::initialize_using_file(&output_file, &input);
        output.configs.data_type = DataType::F32;
        output.configs.nodata = -32768f64;
        output.reinitialize_values(1.0);
        let mut stack = Vec::with_capacity(num_cells);
        let mut num_inflowing: Array2D<i8> = Array2D::new(rows, columns, -1, -1)?;
        let num_procs = get_num_procs();

        // calculate the number of inflowing cells
        let (tx, rx) = mpsc::channel();
        for tid in 0..num_procs {
            let input = input.clone();
            let tx = tx.clone();
            thread::spawn(move || {
                let d_x = [1, 1, 1, 0, -1, -1, -1, 0];
                let d_y = [-1, 0, 1, 1, 1, 0, -1, -1];
                let mut z: f64;
                let mut zn: f64;
                let mut count: i8;
                for row in (0..rows).filter(|r| r % num_procs == tid) {
                    let mut data: Vec<i8> = vec![-1i8; columns as usize];
                    for col in 0..columns {
                        z = input.get_value(row, col);
                        if z != nodata {
                            count = 0i8;
                            for i in 0..8 {
                                zn = input.get_value(row + d_y[i], col + d_x[i]);
                                if zn > z && zn != nodata {
                                    count += 1;
                                }
                            }
                            data[col as usize] = count;
                        }
                    }
                    if tx.send((row, data)).is_err() {
                        return;
                    }
                }
            });
        }
        drop(tx);

        let mut progress = Progress::new("Num. inflowing neighbours", rows as usize, verbose);
        for r in 0..rows {
            let (row, data) = rx.recv().map_err(|_| {
                Error::new(ErrorKind::Other, "Error receiving data from worker thread.")
            })?;
            num_inflowing.set_row_data(row, data);
            for col in 0..columns {
                if num_inflowing[(row, col)] == 0i8 {
                    stack.push((row, col));
                }
            }
            progress.update(r as usize);
        }

        let d_x = [1, 1, 1, 0, -1, -1, -1, 0];
        let d_y = [-1, 0, 1, 1, 1, 0, -1, -1];
        let grid_lengths = [
            diag_cell_size,
            cell_size_x,
            diag_cell_size,
            cell_size_y,
            diag_cell_size,
            cell_size_x,
            diag_cell_size,
            cell_size_y,
        ];
        let (mut row_n, mut col_n): (isize, isize);
        let (mut z, mut z_n): (f64, f64);
        let mut fa: f64;
        let mut slope: f64;
        let mut total_weights: f64;
        let mut num_solved_cells = 0usize;
        let mut progress = Progress::new("Flow accumulation", num_cells, verbose);
        while let Some((row, col)) = stack.pop() {
            z = input[(row, col)];
            fa = output[(row, col)];
            num_inflowing[(row, col)] = -1i8;

            total_weights = 0.0;
            let mut weights: [f64; 8] = [0.0; 8];
            for i in 0..8 {
                z_n = input[(row + d_y[i], col + d_x[i])];
                if z_n < z && z_n != nodata {
                    slope = (z - z_n) / grid_lengths[i];
                    weights[i] = slope.powf(exponent);
                    total_weights += weights[i];
                }
            }

            if total_weights > 0.0 {
                for i in 0..8 {
                    if weights[i] > 0.0 {
                        row_n = row + d_y[i];
                        col_n = col + d_x[i];
                        output.increment(row_n, col_n, fa * (weights[i] / total_weights));
                        num_inflowing.decrement(row_n, col_n, 1i8);
                        if num_inflowing[(row_n, col_n)] == 0i8 {
                            stack.push((row_n, col_n));
                        }
                    }
                }
            }

            num_solved_cells += 1;
            progress.update(num_solved_cells);
        }

        let mut cell_area = cell_size_x * cell_size_y;
        let mut avg_cell_size = (cell_size_x + cell_size_y) / 2.0;
        if out_type == "cells" {
            cell_area = 1.0;
            avg_cell_size = 1.0;
        } else if out_type == "ca" {
            avg_cell_size = 1.0;
        }

        let out_nodata = output.configs.nodata;
        for row in 0..rows {
            for col in 0..columns {
                if input[(row, col)] == nodata {
                    output[(row, col)] = out_nodata;
                } else {
                    output[(row, col)] = output[(row, col)] * cell_area / avg_cell_size;
                }
            }
        }

        let elapsed_time = get_formatted_elapsed_time(start);
        output.add_metadata_entry(format!(
            "Created by lsp_tools' {} tool",
            self.get_tool_name()
        ));
        output.add_metadata_entry(format!("Input file: {}", input_file));
        output.add_metadata_entry(format!("Output type: {}", out_type));
        output.add_metadata_entry(format!("Exponent: {}", exponent));
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
