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

/// This tool calculates the topographic wetness index, commonly used in the
/// TOPMODEL rainfall-runoff framework:
///
/// > *WI* = Ln(*A* / tan(*slope*))
///
/// where *A* is the catchment area raster (`--sca`) and *slope* is a slope
/// gradient raster in degrees (`--slope`). When *A* is a specific catchment
/// area (area per unit contour width) no conversion is needed
/// (`--conversion=none`, the default). When *A* is a total catchment area,
/// `--conversion=pseudo` divides it by the grid resolution first, giving a
/// pseudo specific catchment area.
///
/// Cells with a slope of zero, a non-positive catchment area, or nodata in
/// either input are assigned nodata. Both inputs must have the same number of
/// rows and columns.
///
/// # See Also
/// `FlowAccumulation`, `SpecificCatchmentArea`, `Slope`
pub struct WetnessIndex {
    name: String,
    description: String,
    toolbox: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl WetnessIndex {
    pub fn new() -> WetnessIndex {
        // public constructor
        let name = "WetnessIndex".to_string();
        let toolbox = "Geomorphometric Analysis".to_string();
        let description =
            "Calculates the topographic wetness index, Ln(A / tan(slope)).".to_string();

        let mut parameters = vec![];
        parameters.push(ToolParameter {
            name: "Input Specific Catchment Area (SCA) File".to_owned(),
            flags: vec!["--sca".to_owned()],
            description: "Input raster specific (or total) catchment area file.".to_owned(),
            parameter_type: ParameterType::ExistingFile(ParameterFileType::Raster),
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Input Slope File".to_owned(),
            flags: vec!["--slope".to_owned()],
            description: "Input raster slope file (in degrees).".to_owned(),
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
            name: "Area Conversion".to_owned(),
            flags: vec!["--conversion".to_owned()],
            description: "Catchment area conversion; 'none' for specific catchment area input, 'pseudo' to divide a total catchment area by the cell size.".to_owned(),
            parameter_type: ParameterType::OptionList(vec!["none".to_owned(), "pseudo".to_owned()]),
            default_value: Some("none".to_owned()),
            optional: true,
        });

        let usage = example_usage(&name, "--sca='flow_accum.sgrd' --slope='slope.sgrd' -o=output.sgrd --conversion=none");

        WetnessIndex {
            name,
            description,
            toolbox,
            parameters,
            example_usage: usage,
        }
    }
}

impl LspTool for WetnessIndex {
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
        let mut sca_file = String::new();
        let mut slope_file = String::new();
        let mut output_file = String::new();
        let mut pseudo = false;

        for (flag, value) in parse_args(&args)? {
            match flag.as_str() {
                "-sca" => sca_file = required_value(&flag, value)?,
                "-slope" => slope_file = required_value(&flag, value)?,
                "-o" | "-output" => output_file = required_value(&flag, value)?,
                "-conversion" => {
                    let v = required_value(&flag, value)?.to_lowercase();
                    pseudo = match v.as_str() {
                        "none" => false,
                        "pseudo" => true,
                        _ => {
                            return Err(Error::new(
                                ErrorKind::InvalidInput,
                                format!("Unrecognized --conversion value '{}'.", v),
                            ))
                        }
                    };
                }
                _ => {}
            }
        }
        check_required("--sca", &sca_file)?;
        check_required("--slope", &slope_file)?;
        check_required("--output", &output_file)?;

        if verbose {
            print_welcome(&self.get_tool_name());
        }

        let sca_file = resolve_input(working_directory, &sca_file);
        let slope_file = resolve_input(working_directory, &slope_file);
        let output_file = resolve_output(working_directory, &output_file);

        if verbose {
            println!("Reading data...")
        };

        let sca = Arc::new(Raster::new(&sca_file, "r")?);
        let slope = Arc::new(Raster::new(&slope_file, "r")?);

        let start = Instant::now();
        let rows = sca.configs.rows as isize;
        let columns = sca.configs.columns as isize;
        let sca_nodata = sca.configs.nodata;
        let slope_nodata = slope.configs.nodata;

        // make sure the input files have the same size
        if sca.configs.rows != slope.configs.rows || sca.configs.columns != slope.configs.columns {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "The input files must have the same number of rows and columns and spatial extent.",
            ));
        }

        let cell_size = if pseudo {
            (sca.configs.resolution_x + sca.configs.resolution_y) / 2.0
        } else {
            1.0
        };

        let mut output = Raster::initialize_using_file(&output_file, &sca);
        output.configs.data_type = DataType::F32;
        output.configs.nodata = -32768f64;
        output.configs.z_units = String::from("not specified");
        let out_nodata = output.configs.nodata;

        let num_procs = get_num_procs();
        let (tx, rx) = mpsc::channel();
        for tid in 0..num_procs {
            let sca = sca.clone();
            let slope = slope.clone();
            let tx = tx.clone();
            thread::spawn(move || {
                let mut sca_val: f64;
                let mut slope_val: f64;
                for row in (0..rows).filter(|r| r % num_procs == tid) {
                    let mut data: Vec<f64> = vec![out_nodata; columns as usize];
                    for col in 0..columns {
                        sca_val = sca[(row, col)];
                        slope_val = slope[(row, col)];
                        if sca_val != sca_nodata && slope_val != slope_nodata && sca_val > 0.0 {
                            let tan_slope = slope_val.to_radians().tan();
                            if tan_slope > 0.0 {
                                data[col as usize] = (sca_val / cell_size / tan_slope).ln();
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
        output.add_metadata_entry(format!("Input SCA file: {}", sca_file));
        output.add_metadata_entry(format!("Input slope file: {}", slope_file));
        output.add_metadata_entry(format!("Area conversion: {}", if pseudo { "pseudo" } else { "none" }));
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
