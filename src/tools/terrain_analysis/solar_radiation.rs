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
use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use std::f64;
use std::f64::consts::PI;
use std::io::{Error, ErrorKind};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

const NUM_DIRECTIONS: usize = 36;

/// This tool estimates the potential incoming solar radiation (PISR) received
/// by each cell of a DEM over a range of days, in kWh/m². The position of the
/// sun is calculated from the solar declination (Spencer, 1971) and the hour
/// angle for the site `--latitude`. Days between `--start_date` and
/// `--end_date` (inclusive, `YYYY-MM-DD`) are sampled every `--day_step` days
/// and each sampled day stands for the days up to the next sample. Within a
/// day the sun is sampled every `--hour_step` hours.
///
/// For each sun position the direct (beam) irradiance on the slope is
///
/// > *I_b* = *S0* × *τ*^*m* × cos(*i*)
///
/// where *S0* is the solar constant (`--solar_constant`, 1367 W/m²) corrected
/// for the Earth-Sun distance, *τ* the atmospheric transmittance
/// (`--transmittance`, 0.7), *m* the relative optical air mass
/// (Kasten & Young, 1989) and *i* the angle between the sun and the surface
/// normal, from Horn (1981) slope and aspect. The diffuse irradiance is
///
/// > *I_d* = *S0* × sin(*h*) × (0.271 - 0.294 × *τ*^*m*) × (1 + cos *s*) / 2
///
/// with *h* the solar altitude and *s* the slope. Unless `--no_shadows` is
/// specified, cells whose horizon in the direction of the sun is higher than
/// the sun receive no direct radiation. Horizon angles are calculated in 36
/// directions up to `--max_dist` map units (100 grid cells by default) and
/// interpolated between directions.
///
/// The total radiation is written to `--output`; the direct and diffuse
/// components can also be written (`--direct`, `--diffuse`). When no
/// latitude is given and the DEM is in geographic coordinates, the latitude
/// of the grid centre is used.
///
/// # References
/// Kasten, F., and Young, A. T. (1989). Revised optical air mass tables and
/// approximation formula. Applied Optics, 28(22), 4735-4738.
///
/// Spencer, J. W. (1971). Fourier series representation of the position of
/// the sun. Search, 2(5), 172.
///
/// # See Also
/// `Hillshade`
pub struct SolarRadiation {
    name: String,
    description: String,
    toolbox: String,
    parameters: Vec<ToolParameter>,
    example_usage: String,
}

impl SolarRadiation {
    pub fn new() -> SolarRadiation {
        // public constructor
        let name = "SolarRadiation".to_string();
        let toolbox = "Geomorphometric Analysis".to_string();
        let description =
            "Calculates potential incoming solar radiation (kWh/m2) over a range of days.".to_string();

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
            name: "Output Total Radiation File".to_owned(),
            flags: vec!["-o".to_owned(), "--output".to_owned()],
            description: "Output raster file of total (direct + diffuse) radiation.".to_owned(),
            parameter_type: ParameterType::NewFile(ParameterFileType::Raster),
            default_value: None,
            optional: false,
        });

        parameters.push(ToolParameter {
            name: "Output Direct Radiation File".to_owned(),
            flags: vec!["--direct".to_owned()],
            description: "Optional output raster file of direct radiation.".to_owned(),
            parameter_type: ParameterType::NewFile(ParameterFileType::Raster),
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Output Diffuse Radiation File".to_owned(),
            flags: vec!["--diffuse".to_owned()],
            description: "Optional output raster file of diffuse radiation.".to_owned(),
            parameter_type: ParameterType::NewFile(ParameterFileType::Raster),
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Latitude (degrees)".to_owned(),
            flags: vec!["--latitude".to_owned()],
            description: "Site latitude in degrees; north is positive.".to_owned(),
            parameter_type: ParameterType::Float,
            default_value: None,
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Start Date".to_owned(),
            flags: vec!["--start_date".to_owned()],
            description: "First day of the period (YYYY-MM-DD).".to_owned(),
            parameter_type: ParameterType::String,
            default_value: Some("2024-01-01".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "End Date".to_owned(),
            flags: vec!["--end_date".to_owned()],
            description: "Last day of the period, inclusive (YYYY-MM-DD).".to_owned(),
            parameter_type: ParameterType::String,
            default_value: Some("2024-12-31".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Day Step".to_owned(),
            flags: vec!["--day_step".to_owned()],
            description: "Number of days between sampled days.".to_owned(),
            parameter_type: ParameterType::Integer,
            default_value: Some("5".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Hour Step".to_owned(),
            flags: vec!["--hour_step".to_owned()],
            description: "Number of hours between sampled sun positions.".to_owned(),
            parameter_type: ParameterType::Float,
            default_value: Some("0.5".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Atmospheric Transmittance".to_owned(),
            flags: vec!["--transmittance".to_owned()],
            description: "Fraction of radiation passing through the atmosphere at zenith.".to_owned(),
            parameter_type: ParameterType::Float,
            default_value: Some("0.7".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Solar Constant (W/m2)".to_owned(),
            flags: vec!["--solar_constant".to_owned()],
            description: "Solar constant in W/m2.".to_owned(),
            parameter_type: ParameterType::Float,
            default_value: Some("1367.0".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Ignore cast shadows?".to_owned(),
            flags: vec!["--no_shadows".to_owned()],
            description: "Do not calculate shadows cast by surrounding terrain.".to_owned(),
            parameter_type: ParameterType::Boolean,
            default_value: Some("false".to_owned()),
            optional: true,
        });

        parameters.push(ToolParameter {
            name: "Maximum Horizon Distance".to_owned(),
            flags: vec!["--max_dist".to_owned()],
            description: "Maximum search distance for horizon angles, in map units.".to_owned(),
            parameter_type: ParameterType::Float,
            default_value: None,
            optional: true,
        });

        let usage = example_usage(
            &name,
            "--dem=DEM.sgrd -o=pisr.sgrd --latitude=53.0 --start_date=2024-01-01 --end_date=2024-12-31 --day_step=5 --hour_step=0.5",
        );

        SolarRadiation {
            name,
            description,
            toolbox,
            parameters,
            example_usage: usage,
        }
    }
}

/// A sampled sun position and the number of hours it stands for.
#[derive(Clone, Copy, Debug)]
struct SunPosition {
    altitude: f64,
    azimuth: f64,
    sin_altitude: f64,
    /// Extraterrestrial irradiance (W/m2) after the Earth-Sun distance correction.
    irradiance: f64,
    hours: f64,
}

fn parse_date(flag: &str, value: &str) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        Error::new(
            ErrorKind::InvalidInput,
            format!("The {} value '{}' is not a YYYY-MM-DD date.", flag, value),
        )
    })
}

/// Solar declination in radians for a day of the year.
fn declination(day_of_year: u32) -> f64 {
    let g = 2.0 * PI * (day_of_year as f64 - 1.0) / 365.0;
    0.006918 - 0.399912 * g.cos() + 0.070257 * g.sin() - 0.006758 * (2.0 * g).cos()
        + 0.000907 * (2.0 * g).sin()
        - 0.002697 * (3.0 * g).cos()
        + 0.00148 * (3.0 * g).sin()
}

/// Sun positions above the horizon for the sampled days and times, each
/// weighted by the hours (times days) it represents.
fn sun_positions(
    latitude: f64,
    start: NaiveDate,
    end: NaiveDate,
    day_step: i64,
    hour_step: f64,
    solar_constant: f64,
) -> Vec<SunPosition> {
    let lat = latitude.to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let num_times = (24.0 / hour_step).ceil() as usize;
    let mut positions = vec![];
    let mut day = start;
    while day <= end {
        let days_covered = ((end - day).num_days() + 1).min(day_step) as f64;
        let doy = day.ordinal();
        let decl = declination(doy);
        let (sin_decl, cos_decl) = decl.sin_cos();
        let irradiance = solar_constant * (1.0 + 0.033 * (2.0 * PI * doy as f64 / 365.0).cos());
        for k in 0..num_times {
            let t0 = k as f64 * hour_step;
            let t1 = (t0 + hour_step).min(24.0);
            let time = (t0 + t1) / 2.0;
            let hour_angle = ((time - 12.0) * 15.0).to_radians();
            let sin_alt = sin_lat * sin_decl + cos_lat * cos_decl * hour_angle.cos();
            if sin_alt <= 0.0 {
                continue;
            }
            let altitude = sin_alt.asin();
            let denom = cos_lat * altitude.cos();
            let mut azimuth = if denom.abs() > 1e-10 {
                ((sin_decl - sin_lat * sin_alt) / denom).max(-1.0).min(1.0).acos()
            } else {
                PI
            };
            if hour_angle > 0.0 {
                azimuth = 2.0 * PI - azimuth;
            }
            positions.push(SunPosition {
                altitude,
                azimuth,
                sin_altitude: sin_alt,
                irradiance,
                hours: (t1 - t0) * days_covered,
            });
        }
        day = match day.checked_add_signed(chrono::Duration::days(day_step)) {
            Some(d) => d,
            None => break,
        };
    }
    positions
}

/// Relative optical air mass (Kasten & Young, 1989).
fn air_mass(altitude: f64, sin_altitude: f64) -> f64 {
    1.0 / (sin_altitude + 0.50572 * (altitude.to_degrees() + 6.07995).powf(-1.6364))
}

/// Horizon angles (radians) of one row, stored direction by direction.
fn row_horizons(input: &Raster, row: isize, z_factor: f64, max_steps: isize) -> Vec<f32> {
    let columns = input.configs.columns as isize;
    let rows = input.configs.rows as isize;
    let nodata = input.configs.nodata;
    let res_x = input.configs.resolution_x;
    let res_y = input.configs.resolution_y;
    let mut data = vec![0f32; NUM_DIRECTIONS * columns as usize];
    for col in 0..columns {
        let z = input.get_value(row, col);
        if z == nodata {
            continue;
        }
        for d in 0..NUM_DIRECTIONS {
            let azimuth = 2.0 * PI * d as f64 / NUM_DIRECTIONS as f64;
            let (dx, dy) = (azimuth.sin(), -azimuth.cos());
            let mut max_angle = 0f64;
            for k in 1..=max_steps {
                let c = col + (k as f64 * dx).round() as isize;
                let r = row + (k as f64 * dy).round() as isize;
                if r < 0 || r >= rows || c < 0 || c >= columns {
                    break;
                }
                let zn = input.get_value(r, c);
                if zn == nodata {
                    continue;
                }
                let dist = (((c - col) as f64 * res_x).powi(2) + ((r - row) as f64 * res_y).powi(2)).sqrt();
                let angle = ((zn - z) * z_factor / dist).atan();
                if angle > max_angle {
                    max_angle = angle;
                }
            }
            data[d * columns as usize + col as usize] = max_angle as f32;
        }
    }
    data
}

/// Horizon angle towards `azimuth`, linearly interpolated between the two
/// nearest sampled directions.
fn interpolate_horizon(horizons: &[f32], columns: usize, col: usize, azimuth: f64) -> f64 {
    let step = 2.0 * PI / NUM_DIRECTIONS as f64;
    let idx = azimuth.rem_euclid(2.0 * PI) / step;
    let i0 = idx.floor() as usize % NUM_DIRECTIONS;
    let i1 = (i0 + 1) % NUM_DIRECTIONS;
    let frac = idx - idx.floor();
    let h0 = horizons[i0 * columns + col] as f64;
    let h1 = horizons[i1 * columns + col] as f64;
    h0 * (1.0 - frac) + h1 * frac
}

impl LspTool for SolarRadiation {
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
        let mut direct_file = String::new();
        let mut diffuse_file = String::new();
        let mut latitude: Option<f64> = None;
        let mut start_date = String::from("2024-01-01");
        let mut end_date = String::from("2024-12-31");
        let mut day_step = 5i64;
        let mut hour_step = 0.5f64;
        let mut transmittance = 0.7f64;
        let mut solar_constant = 1367f64;
        let mut shadows = true;
        let mut max_dist: Option<f64> = None;

        for (flag, value) in parse_args(&args)? {
            match flag.as_str() {
                "-i" | "-input" | "-dem" => input_file = required_value(&flag, value)?,
                "-o" | "-output" => output_file = required_value(&flag, value)?,
                "-direct" => direct_file = required_value(&flag, value)?,
                "-diffuse" => diffuse_file = required_value(&flag, value)?,
                "-latitude" => latitude = Some(parse_value(&flag, value)?),
                "-start_date" => start_date = required_value(&flag, value)?,
                "-end_date" => end_date = required_value(&flag, value)?,
                "-day_step" => day_step = parse_value(&flag, value)?,
                "-hour_step" => hour_step = parse_value(&flag, value)?,
                "-transmittance" => transmittance = parse_value(&flag, value)?,
                "-solar_constant" => solar_constant = parse_value(&flag, value)?,
                "-no_shadows" => shadows = !parse_switch(value),
                "-max_dist" => max_dist = Some(parse_value(&flag, value)?),
                _ => {}
            }
        }
        check_required("--dem", &input_file)?;
        check_required("--output", &output_file)?;

        let start_day = parse_date("--start_date", &start_date)?;
        let end_day = parse_date("--end_date", &end_date)?;
        if end_day < start_day {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "The --end_date must not be earlier than the --start_date.",
            ));
        }
        if day_step < 1 {
            return Err(Error::new(ErrorKind::InvalidInput, "The --day_step must be at least 1."));
        }
        if !(hour_step > 0.0 && hour_step <= 24.0) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "The --hour_step must be greater than 0 and no more than 24.",
            ));
        }
        if !(transmittance > 0.0 && transmittance <= 1.0) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "The --transmittance must be greater than 0 and no more than 1.",
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

        let latitude = match latitude {
            Some(lat) => lat,
            None if input.is_in_geographic_coordinates() => {
                (input.configs.north + input.configs.south) / 2.0
            }
            None => {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    "A --latitude is required for DEMs in projected coordinates.",
                ))
            }
        };
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "The --latitude must be between -90 and 90 degrees.",
            ));
        }

        let start = Instant::now();
        let rows = input.configs.rows as isize;
        let columns = input.configs.columns as isize;
        let nodata = input.configs.nodata;
        let res = (input.configs.resolution_x + input.configs.resolution_y) / 2.0;
        let z_factor = geographic_z_factor(&input).unwrap_or(1f64);

        let positions = Arc::new(sun_positions(
            latitude,
            start_day,
            end_day,
            day_step,
            hour_step,
            solar_constant,
        ));
        if verbose {
            println!("Number of sun positions: {}", positions.len());
        }

        let horizons: Arc<Vec<Vec<f32>>> = if shadows {
            if verbose {
                println!("Calculating horizon angles...");
            }
            let max_steps = match max_dist {
                Some(d) if d > 0.0 => (d / res).ceil().max(1.0) as isize,
                _ => 100,
            };
            let input = input.clone();
            Arc::new(
                (0..rows)
                    .into_par_iter()
                    .map(|row| row_horizons(&input, row, z_factor, max_steps))
                    .collect(),
            )
        } else {
            Arc::new(vec![])
        };

        let num_procs = get_num_procs();
        let (tx, rx) = mpsc::channel();
        for tid in 0..num_procs {
            let input = input.clone();
            let positions = positions.clone();
            let horizons = horizons.clone();
            let tx = tx.clone();
            thread::spawn(move || {
                for row in (0..rows).filter(|r| r % num_procs == tid) {
                    let mut direct = vec![nodata; columns as usize];
                    let mut diffuse = vec![nodata; columns as usize];
                    for col in 0..columns {
                        let (fx, fy) = match horn_gradient(&input, row, col, z_factor) {
                            Some(g) => g,
                            None => continue,
                        };
                        let (slope, aspect) = slope_aspect(fx, fy);
                        let (sin_slope, cos_slope) = slope.sin_cos();
                        let sky_view = (1.0 + cos_slope) / 2.0;
                        let (mut direct_wh, mut diffuse_wh) = (0f64, 0f64);
                        for p in positions.iter() {
                            let tau_m = transmittance.powf(air_mass(p.altitude, p.sin_altitude));
                            diffuse_wh += p.irradiance
                                * p.sin_altitude
                                * (0.271 - 0.294 * tau_m).max(0.0)
                                * sky_view
                                * p.hours;
                            let cos_inc = p.sin_altitude * cos_slope
                                + p.altitude.cos() * sin_slope * (p.azimuth - aspect).cos();
                            if cos_inc <= 0.0 {
                                continue;
                            }
                            if shadows
                                && p.altitude
                                    <= interpolate_horizon(
                                        &horizons[row as usize],
                                        columns as usize,
                                        col as usize,
                                        p.azimuth,
                                    )
                            {
                                continue;
                            }
                            direct_wh += p.irradiance * tau_m * cos_inc * p.hours;
                        }
                        direct[col as usize] = direct_wh / 1000.0;
                        diffuse[col as usize] = diffuse_wh / 1000.0;
                    }
                    if tx.send((row, direct, diffuse)).is_err() {
                        return;
                    }
                }
            });
        }
        drop(tx);

        let mut configs = input.configs.clone();
        configs.data_type = DataType::F32;
        configs.z_units = String::from("kWh/m2");
        configs.title = String::new();
        configs.metadata = vec![];
        let direct_file = match direct_file.is_empty() {
            true => None,
            false => Some(resolve_output(working_directory, &direct_file)),
        };
        let diffuse_file = match diffuse_file.is_empty() {
            true => None,
            false => Some(resolve_output(working_directory, &diffuse_file)),
        };
        let mut total_output = Raster::initialize_using_config(&output_file, &configs);
        let mut direct_output =
            Raster::initialize_using_config(direct_file.as_deref().unwrap_or(&output_file), &configs);
        let mut diffuse_output =
            Raster::initialize_using_config(diffuse_file.as_deref().unwrap_or(&output_file), &configs);

        let mut progress = Progress::new("Performing analysis", rows as usize, verbose);
        for r in 0..rows {
            let (row, direct, diffuse) = rx.recv().map_err(|_| {
                Error::new(ErrorKind::Other, "Error receiving data from worker thread.")
            })?;
            let total = direct
                .iter()
                .zip(diffuse.iter())
                .map(|(&b, &d)| if b != nodata { b + d } else { nodata })
                .collect();
            total_output.set_row_data(row, total);
            direct_output.set_row_data(row, direct);
            diffuse_output.set_row_data(row, diffuse);
            progress.update(r as usize);
        }

        let elapsed_time = get_formatted_elapsed_time(start);
        let mut outputs = vec![(&mut total_output, "total")];
        if direct_file.is_some() {
            outputs.push((&mut direct_output, "direct"));
        }
        if diffuse_file.is_some() {
            outputs.push((&mut diffuse_output, "diffuse"));
        }
        for (output, component) in outputs {
            output.add_metadata_entry(format!(
                "Created by lsp_tools' {} tool",
                self.get_tool_name()
            ));
            output.add_metadata_entry(format!("Input file: {}", input_file));
            output.add_metadata_entry(format!("Component: {}", component));
            output.add_metadata_entry(format!("Latitude: {}", latitude));
            output.add_metadata_entry(format!("Period: {} to {}", start_day, end_day));
            output.add_metadata_entry(format!("Day step: {}; hour step: {}", day_step, hour_step));
            output.add_metadata_entry(format!("Transmittance: {}", transmittance));
            output.add_metadata_entry(format!("Cast shadows: {}", shadows));
            output.add_metadata_entry(format!("Elapsed Time (excluding I/O): {}", elapsed_time));

            if verbose {
                println!("Saving {} radiation...", component)
            };
            output.write()?;
        }
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
    fn test_declination_extremes() {
        // near the June and December solstices
        assert!((declination(172).to_degrees() - 23.44).abs() < 0.5);
        assert!((declination(355).to_degrees() + 23.44).abs() < 0.5);
    }

    #[test]
    fn test_noon_sun_is_due_south() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let positions = sun_positions(53.0, day, day, 1, 1.0, 1367.0);
        // about twelve hours of daylight at the equinox
        let total_hours: f64 = positions.iter().map(|p| p.hours).sum();
        assert!(total_hours > 11.0 && total_hours < 13.0);
        // the 11:30 and 12:30 samples straddle solar noon
        let mut by_altitude = positions.clone();
        by_altitude.sort_by(|a, b| b.altitude.partial_cmp(&a.altitude).unwrap());
        let (a, b) = (by_altitude[0].azimuth, by_altitude[1].azimuth);
        assert!((a + b - 2.0 * PI).abs() < 1e-6);
        assert!((a - PI).abs() < 0.3);
    }

    #[test]
    fn test_day_weights_cover_the_period() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        // polar day: the sun never sets, so every sample is kept
        let positions = sun_positions(89.0, start, end, 5, 1.0, 1367.0);
        let total_hours: f64 = positions.iter().map(|p| p.hours).sum();
        assert!((total_hours - 12.0 * 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_summer_exceeds_winter() {
        let dir = tempfile::tempdir().unwrap();
        write_dem(dir.path(), "dem.sgrd", 5, 5, 10.0, |_, _| 100.0);
        let wd = working_dir(dir.path());
        let tool = SolarRadiation::new();
        tool.run(
            args(&[
                "--dem=dem",
                "--output=june",
                "--latitude=53",
                "--start_date=2024-06-01",
                "--end_date=2024-06-30",
            ]),
            &wd,
            false,
        )
        .unwrap();
        tool.run(
            args(&[
                "--dem=dem",
                "--output=december",
                "--latitude=53",
                "--start_date=2024-12-01",
                "--end_date=2024-12-31",
            ]),
            &wd,
            false,
        )
        .unwrap();
        let june = Raster::new(&format!("{}june.sgrd", wd), "r").unwrap();
        let december = Raster::new(&format!("{}december.sgrd", wd), "r").unwrap();
        assert!(june.get_value(2, 2) > 0.0);
        assert!(june.get_value(2, 2) > 3.0 * december.get_value(2, 2));
    }

    #[test]
    fn test_shadows_never_increase_radiation() {
        let dir = tempfile::tempdir().unwrap();
        // an east-west ridge across the south of the grid
        write_dem(dir.path(), "dem.sgrd", 12, 8, 10.0, |row, _| if row == 9 { 160.0 } else { 100.0 });
        let wd = working_dir(dir.path());
        let tool = SolarRadiation::new();
        let common = [
            "--dem=dem",
            "--latitude=53",
            "--start_date=2024-12-01",
            "--end_date=2024-12-31",
            "--day_step=10",
            "--hour_step=1",
        ];
        let mut a = args(&common);
        a.push("--output=shaded".to_string());
        a.push("--direct=shaded_direct".to_string());
        a.push("--diffuse=shaded_diffuse".to_string());
        tool.run(a, &wd, false).unwrap();
        let mut a = args(&common);
        a.push("--output=open".to_string());
        a.push("--no_shadows".to_string());
        tool.run(a, &wd, false).unwrap();

        let shaded = Raster::new(&format!("{}shaded.sgrd", wd), "r").unwrap();
        let open = Raster::new(&format!("{}open.sgrd", wd), "r").unwrap();
        for row in 0..12 {
            for col in 0..8 {
                assert!(shaded.get_value(row, col) <= open.get_value(row, col) + 1e-3);
            }
        }
        // the cell just north of the ridge is in its winter shadow
        assert!(shaded.get_value(7, 4) < open.get_value(7, 4));

        let direct = Raster::new(&format!("{}shaded_direct.sgrd", wd), "r").unwrap();
        let diffuse = Raster::new(&format!("{}shaded_diffuse.sgrd", wd), "r").unwrap();
        let sum = direct.get_value(2, 2) + diffuse.get_value(2, 2);
        assert!((sum - shaded.get_value(2, 2)).abs() < 1e-3);
    }

    #[test]
    fn test_bad_dates() {
        let err = SolarRadiation::new()
            .run(
                args(&["--dem=dem", "--output=pisr", "--start_date=2024-05-01", "--end_date=2024-04-01"]),
                "",
                false,
            )
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = SolarRadiation::new()
            .run(args(&["--dem=dem", "--output=pisr", "--start_date=May 1"]), "", false)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
