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
use crate::utils::get_formatted_elapsed_time;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::f64;
use std::io::Error;
use std::time::Instant;

/// This tool fills all of the depressions in a digital elevation model (DEM)
/// using the Priority-Flood approach (Wang and Liu, 2006; Barnes et al., 2014).
/// Cells are flooded inward from the edges of the valid data, so interior
/// nodata areas act as outlets and remain nodata in the output.
///
/// Flat areas, including the surfaces of filled depressions, are given a small
/// gradient towards their outlets so that every filled cell has a lower
/// neighbour. The increment (`--flat_increment`) is calculated from the
/// elevation range and grid resolution when it is not specified; in that case
/// the output is stored as 64-bit floating point values so that the increments
/// are not lost to rounding.
///
/// # Reference
/// Wang, L. and Liu, H. 2006. An efficient method for identifying and filling
/// surface depressions in digital elevation models for hydrologic analysis and
/// modelling. International Journal of Geographical Information Science,
/// 20(2): 193-213.
///
/// Barnes, R., Lehman, C., and Mulla, D. 2014. Priority-flood: An optimal
/// depression-filling and watershed-labeling algorithm for digital elevation
/// models. Computers and Geosciences, 62: 117-127.
///
/// # See Also
/// `FlowAccumulation`
pub struct FillDepressions {
    name: String,
    description: String,
    toolbox: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl FillDepressions {
    pub fn new() -> FillDepressions {
        // public constructor
        let name = "FillDepressions".to_string();
        let toolbox = "Hydrological Analysis".to_string();
        let description = "Fills all of the depressions in a DEM. Depression breaching should be preferred in most cases.".to_string();

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
            name: "Flat increment value (z units)".to_owned(),
            flags: vec!["--flat_increment".to_owned()],
            description: "Optional elevation increment applied to flat areas.".to_owned(),
            parameter_type: ParameterType::Float,
            default_value: None,
            optional: true,
        });

        let usage = example_usage(&name, "--dem=DEM.sgrd -o=filled.sgrd --flat_increment=0.001");

        FillDepressions {
            name,
            description,
            toolbox,
            parameters,
            example_usage: usage,
        }
    }
}

impl LspTool for FillDepressions {
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
        let mut flat_increment = f64::NAN;

        for (flag, value) in parse_args(&args)? {
            match flag.as_str() {
                "-i" | "-input" | "-dem" => input_file = required_value(&flag, value)?,
                "-o" | "-output" => output_file = required_value(&flag, value)?,
                "-flat_increment" => flat_increment = parse_value(&flag, value)?,
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

        let input = Raster::new(&input_file, "r")?;

        let start = Instant::now();
        let rows = input.configs.rows as isize;
        let columns = input.configs.columns as isize;
        let nodata = input.configs.nodata;
        let resx = input.configs.resolution_x;
        let resy = input.configs.resolution_y;
        let diagres = (resx * resx + resy * resy).sqrt();

        let mut output = Raster::initialize_using_file(&output_file, &input);
        // integer grids would round the flat increments away
        output.configs.data_type = DataType::F64;
        let small_num = if !flat_increment.is_nan() {
            flat_increment.max(0f64)
        } else {
            let elev_digits = (input.configs.maximum.abs() as i64).to_string().len();
            let elev_multiplier = 10.0_f64.powi((9 - elev_digits as i32).max(0));
            1.0_f64 / elev_multiplier * diagres.ceil()
        };
        for row in 0..rows {
            output.set_row_data(row, input.get_row_data(row));
        }

        let dx = [1, 1, 1, 0, -1, -1, -1, 0];
        let dy = [-1, 0, 1, 1, 1, 0, -1, -1];

        // solved: 0 = not yet reached, 1 = solved
        let mut solved: Array2D<i8> = Array2D::new(rows, columns, 0, -1)?;
        let mut minheap = BinaryHeap::with_capacity((2 * (rows + columns)) as usize);
        let mut pit_queue: VecDeque<(isize, isize)> = VecDeque::new();
        let mut num_solved = 0usize;
        let num_cells = (rows * columns) as usize;

        // seed the queue with every valid cell that borders the grid edge or nodata
        for row in 0..rows {
            for col in 0..columns {
                let z = output.get_value(row, col);
                if z == nodata {
                    solved.set_value(row, col, 1);
                    num_solved += 1;
                    continue;
                }
                if (0..8).any(|n| output.get_value(row + dy[n], col + dx[n]) == nodata) {
                    solved.set_value(row, col, 1);
                    num_solved += 1;
                    minheap.push(GridCell {
                        row,
                        column: col,
                        priority: z,
                    });
                }
            }
        }

        let mut progress = Progress::new("Filling depressions", num_cells, verbose);
        let (mut rn, mut cn): (isize, isize);
        let (mut z, mut zn): (f64, f64);
        loop {
            let (row, col) = if let Some(cell) = pit_queue.pop_front() {
                cell
            } else if let Some(cell) = minheap.pop() {
                (cell.row, cell.column)
            } else {
                break;
            };
            z = output.get_value(row, col);
            for n in 0..8 {
                rn = row + dy[n];
                cn = col + dx[n];
                if solved.get_value(rn, cn) == 0 {
                    solved.set_value(rn, cn, 1);
                    num_solved += 1;
                    zn = output.get_value(rn, cn);
                    if zn <= z + small_num && (small_num > 0f64 || zn < z) {
                        output.set_value(rn, cn, z + small_num);
                        pit_queue.push_back((rn, cn));
                    } else if zn <= z {
                        // flat, not raised
                        pit_queue.push_back((rn, cn));
                    } else {
                        minheap.push(GridCell {
                            row: rn,
                            column: cn,
                            priority: zn,
                        });
                    }
                }
            }
            progress.update(num_solved);
        }

        let elapsed_time = get_formatted_elapsed_time(start);
        output.add_metadata_entry(format!(
            "Created by lsp_tools' {} tool",
            self.get_tool_name()
        ));
        output.add_metadata_entry(format!("Input file: {}", input_file));
        output.add_metadata_entry(format!("Flat increment value: {}", small_num));
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

#[derive(PartialEq, Debug)]
struct GridCell {
    row: isize,
    column: isize,
    priority: f64,
}

impl Eq for GridCell {}

impl PartialOrd for GridCell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GridCell {
    // reversed so that the BinaryHeap pops the lowest cell first
    fn cmp(&self, other: &GridCell) -> Ordering {
        other
            .priority
            .partial_cmp(&self.priority)
            .unwrap_or(Ordering::Equal)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tools::test_support::*;

    fn cone_with_pit(row: isize, col: isize) -> f64 {
        // a plane tilted to the south with a pit in the middle
        if row == 3 && col == 3 {
            50.0
        } else {
            100.0 - 2.0 * row as f64
        }
    }

    #[test]
    fn test_single_pit_is_filled() {
        let dir = tempfile::tempdir().unwrap();
        write_dem(dir.path(), "dem.sgrd", 7, 7, 10.0, cone_with_pit);
        let wd = working_dir(dir.path());
        FillDepressions::new()
            .run(args(&["--dem=dem.sgrd", "--output=filled"]), &wd, false)
            .unwrap();
        let filled = Raster::new(&format!("{}filled.sgrd", wd), "r").unwrap();
        assert_eq!(filled.configs.data_type, DataType::F64);
        // the pit is raised above its lowest neighbour
        assert!(filled.get_value(3, 3) > 100.0 - 2.0 * 4.0);
        // every interior cell now drains to a lower neighbour
        let dx = [1, 1, 1, 0, -1, -1, -1, 0];
        let dy = [-1, 0, 1, 1, 1, 0, -1, -1];
        for row in 1..6isize {
            for col in 1..6isize {
                let z = filled.get_value(row, col);
                assert!((0..8).any(|n| filled.get_value(row + dy[n], col + dx[n]) < z));
            }
        }
        // untouched cells keep their elevation
        assert_eq!(filled.get_value(0, 0), 100.0);
        assert_eq!(filled.get_value(5, 5), 90.0);
    }

    #[test]
    fn test_zero_increment_leaves_flat_fill() {
        let dir = tempfile::tempdir().unwrap();
        write_dem(dir.path(), "dem.sgrd", 7, 7, 10.0, cone_with_pit);
        let wd = working_dir(dir.path());
        FillDepressions::new()
            .run(args(&["--dem=dem.sgrd", "--output=filled", "--flat_increment=0.0"]), &wd, false)
            .unwrap();
        let filled = Raster::new(&format!("{}filled.sgrd", wd), "r").unwrap();
        assert_eq!(filled.get_value(3, 3), 92.0);
    }

    #[test]
    fn test_integer_dem_keeps_flat_increment() {
        let dir = tempfile::tempdir().unwrap();
        write_typed_dem(dir.path(), "dem.sgrd", 7, 7, 10.0, DataType::I16, cone_with_pit);
        let wd = working_dir(dir.path());
        FillDepressions::new()
            .run(args(&["--dem=dem.sgrd", "--output=filled", "--flat_increment=0.01"]), &wd, false)
            .unwrap();
        let filled = Raster::new(&format!("{}filled.sgrd", wd), "r").unwrap();
        assert_eq!(filled.configs.data_type, DataType::F64);
        // strictly above the pour point at (4, 3)
        assert!(filled.get_value(3, 3) > filled.get_value(4, 3));
        assert!(filled.get_value(3, 3) < 92.5);
    }

    #[test]
    fn test_interior_nodata_stays_nodata() {
        let dir = tempfile::tempdir().unwrap();
        write_dem(dir.path(), "dem.sgrd", 5, 5, 1.0, |r, c| {
            if r == 2 && c == 2 {
                -9999.0
            } else {
                10.0
            }
        });
        let wd = working_dir(dir.path());
        FillDepressions::new()
            .run(args(&["--dem=dem.sgrd", "--output=filled"]), &wd, false)
            .unwrap();
        let filled = Raster::new(&format!("{}filled.sgrd", wd), "r").unwrap();
        assert_eq!(filled.get_value(2, 2), filled.configs.nodata);
    }

    #[test]
    fn test_missing_output_flag() {
        let err = FillDepressions::new()
            .run(args(&["--dem=dem.sgrd"]), "", false)
            .err()
            .unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }
}
