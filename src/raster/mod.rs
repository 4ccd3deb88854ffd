pub mod arcascii_raster;
pub mod saga_raster;

use self::arcascii_raster::*;
use self::saga_raster::*;
use std::f64;
use std::io::{Error, ErrorKind};
use std::ops::{Index, IndexMut};
use std::path::Path;

/// An in-memory raster grid. Data are stored row-major from the north edge
/// down, whatever the on-disk row order. Reading outside of the grid returns
/// the nodata value.
#[derive(Default, Clone)]
pub struct Raster {
    pub file_name: String,
    file_mode: String,
    pub raster_type: RasterType,
    pub configs: RasterConfigs,
    data: Vec<f64>,
}

impl Index<(isize, isize)> for Raster {
    type Output = f64;

    fn index(&self, index: (isize, isize)) -> &f64 {
        let (row, column) = index;
        if row < 0 || column < 0 {
            return &self.configs.nodata;
        }
        let (r, c) = (row as usize, column as usize);
        if r >= self.configs.rows || c >= self.configs.columns {
            return &self.configs.nodata;
        }
        &self.data[r * self.configs.columns + c]
    }
}

impl IndexMut<(isize, isize)> for Raster {
    fn index_mut(&mut self, index: (isize, isize)) -> &mut f64 {
        let (row, column) = index;
        if row < 0 || column < 0 {
            return &mut self.configs.nodata;
        }
        let (r, c) = (row as usize, column as usize);
        if r >= self.configs.rows || c >= self.configs.columns {
            return &mut self.configs.nodata;
        }
        &mut self.data[r * self.configs.columns + c]
    }
}

impl Raster {
    /// Opens a raster. In read mode (`"r"`) the file is read from disk; in
    /// write mode (`"w"`) an empty raster bound to the file name is returned
    /// and is expected to be configured before `write` is called.
    pub fn new(file_name: &str, file_mode: &str) -> Result<Raster, Error> {
        let fm = file_mode.to_lowercase();
        let mut r = Raster {
            file_name: file_name.to_string(),
            file_mode: fm.clone(),
            raster_type: get_raster_type_from_file(file_name),
            ..Default::default()
        };
        if fm.contains('r') {
            if !Path::new(file_name).exists()
                && !(r.raster_type == RasterType::SagaBinary
                    && Path::new(&saga_header_file(file_name)).exists())
            {
                return Err(Error::new(
                    ErrorKind::NotFound,
                    format!("Raster file {} does not exist.", file_name),
                ));
            }
            match r.raster_type {
                RasterType::SagaBinary => read_saga(&r.file_name, &mut r.configs, &mut r.data)?,
                RasterType::ArcAscii => read_arcascii(&r.file_name, &mut r.configs, &mut r.data)?,
                RasterType::Unknown => {
                    return Err(Error::new(
                        ErrorKind::InvalidInput,
                        format!("Unrecognized raster type for file {}.", file_name),
                    ))
                }
            }
            if r.data.len() != r.configs.rows * r.configs.columns {
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    format!("Raster file {} holds fewer cells than its header declares.", file_name),
                ));
            }
            r.update_min_max();
        }
        Ok(r)
    }

    /// Creates a new output raster with the same extent, resolution, nodata
    /// value and data type as `input`, filled with nodata.
    pub fn initialize_using_file(file_name: &str, input: &Raster) -> Raster {
        let mut configs = input.configs.clone();
        configs.title = String::new();
        configs.metadata = vec![];
        Raster::initialize_using_config(file_name, &configs)
    }

    pub fn initialize_using_config(file_name: &str, configs: &RasterConfigs) -> Raster {
        let mut output = Raster {
            file_name: file_name.to_string(),
            file_mode: "w".to_string(),
            raster_type: get_raster_type_from_file(file_name),
            configs: configs.clone(),
            ..Default::default()
        };
        output.configs.minimum = f64::INFINITY;
        output.configs.maximum = f64::NEG_INFINITY;
        output.data = vec![output.configs.nodata; output.configs.rows * output.configs.columns];
        output
    }

    pub fn num_cells(&self) -> usize {
        self.configs.rows * self.configs.columns
    }

    pub fn get_value(&self, row: isize, column: isize) -> f64 {
        self[(row, column)]
    }

    pub fn set_value(&mut self, row: isize, column: isize, value: f64) {
        if row >= 0 && column >= 0 {
            let (r, c) = (row as usize, column as usize);
            if r < self.configs.rows && c < self.configs.columns {
                self.data[r * self.configs.columns + c] = value;
            }
        }
    }

    /// Adds `value` to a cell; a nodata cell takes the value.
    pub fn increment(&mut self, row: isize, column: isize, value: f64) {
        if row >= 0 && column >= 0 {
            let (r, c) = (row as usize, column as usize);
            if r < self.configs.rows && c < self.configs.columns {
                let idx = r * self.configs.columns + c;
                if self.data[idx] != self.configs.nodata {
                    self.data[idx] += value;
                } else {
                    self.data[idx] = value;
                }
            }
        }
    }

    pub fn get_row_data(&self, row: isize) -> Vec<f64> {
        let mut values = vec![self.configs.nodata; self.configs.columns];
        if row >= 0 && (row as usize) < self.configs.rows {
            let start = row as usize * self.configs.columns;
            values.copy_from_slice(&self.data[start..start + self.configs.columns]);
        }
        values
    }

    pub fn set_row_data(&mut self, row: isize, values: Vec<f64>) {
        if row < 0 || row as usize >= self.configs.rows {
            return;
        }
        let start = row as usize * self.configs.columns;
        for (c, v) in values.into_iter().enumerate().take(self.configs.columns) {
            self.data[start + c] = v;
        }
    }

    pub fn reinitialize_values(&mut self, value: f64) {
        self.data = vec![value; self.configs.rows * self.configs.columns];
    }

    /// The x coordinate of a column's cell centre.
    pub fn get_x_from_column(&self, column: isize) -> f64 {
        self.configs.west + self.configs.resolution_x / 2f64 + column as f64 * self.configs.resolution_x
    }

    /// The y coordinate of a row's cell centre.
    pub fn get_y_from_row(&self, row: isize) -> f64 {
        self.configs.north - self.configs.resolution_y / 2f64 - row as f64 * self.configs.resolution_y
    }

    pub fn update_min_max(&mut self) {
        self.configs.minimum = f64::INFINITY;
        self.configs.maximum = f64::NEG_INFINITY;
        let nodata = self.configs.nodata;
        for &v in self.data.iter().filter(|&&v| v != nodata && !v.is_nan()) {
            if v < self.configs.minimum {
                self.configs.minimum = v;
            }
            if v > self.configs.maximum {
                self.configs.maximum = v;
            }
        }
    }

    pub fn add_metadata_entry(&mut self, value: String) {
        self.configs.metadata.push(value);
    }

    pub fn get_metadata_entry(&self, idx: usize) -> String {
        self.configs.metadata.get(idx).cloned().unwrap_or_default()
    }

    /// Guesses whether the grid's coordinates are geographic (degrees).
    pub fn is_in_geographic_coordinates(&self) -> bool {
        let wkt = self.configs.coordinate_ref_system_wkt.to_lowercase();
        if wkt.contains("projcs[") {
            return false;
        }
        if wkt.contains("geogcs[") {
            return true;
        }
        self.configs.xy_units.to_lowercase().contains("deg")
    }

    pub fn write(&mut self) -> Result<(), Error> {
        if !self.file_mode.contains('w') {
            return Err(Error::new(
                ErrorKind::PermissionDenied,
                format!("Raster {} was not opened for writing.", self.file_name),
            ));
        }
        self.update_min_max();
        match self.raster_type {
            RasterType::SagaBinary => write_saga(self),
            RasterType::ArcAscii => write_arcascii(self),
            RasterType::Unknown => Err(Error::new(
                ErrorKind::InvalidInput,
                format!("Unrecognized raster type for file {}.", self.file_name),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RasterConfigs {
    pub title: String,
    pub rows: usize,
    pub columns: usize,
    pub nodata: f64,
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub resolution_x: f64,
    pub resolution_y: f64,
    pub minimum: f64,
    pub maximum: f64,
    pub endian: Endianness,
    pub data_type: DataType,
    pub z_units: String,
    pub xy_units: String,
    pub coordinate_ref_system_wkt: String,
    pub metadata: Vec<String>,
}

impl Default for RasterConfigs {
    fn default() -> RasterConfigs {
        RasterConfigs {
            title: String::new(),
            rows: 0,
            columns: 0,
            nodata: -32768.0,
            north: f64::NEG_INFINITY,
            south: f64::INFINITY,
            east: f64::NEG_INFINITY,
            west: f64::INFINITY,
            resolution_x: f64::NEG_INFINITY,
            resolution_y: f64::NEG_INFINITY,
            minimum: f64::INFINITY,
            maximum: f64::NEG_INFINITY,
            endian: Endianness::LittleEndian,
            data_type: DataType::Unknown,
            z_units: "not specified".to_string(),
            xy_units: "not specified".to_string(),
            coordinate_ref_system_wkt: "not specified".to_string(),
            metadata: vec![],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RasterType {
    #[default]
    Unknown,
    ArcAscii,
    SagaBinary,
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum DataType {
    F64,
    F32,
    I32,
    U32,
    I16,
    U16,
    I8,
    U8,
    #[default]
    Unknown,
}

impl DataType {
    pub fn get_data_size(&self) -> usize {
        match *self {
            DataType::F64 => 8usize,
            DataType::F32 | DataType::I32 | DataType::U32 => 4usize,
            DataType::I16 | DataType::U16 => 2usize,
            DataType::I8 | DataType::U8 => 1usize,
            DataType::Unknown => 0usize,
        }
    }

    pub fn is_float(&self) -> bool {
        *self == DataType::F64 || *self == DataType::F32
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum Endianness {
    #[default]
    LittleEndian,
    BigEndian,
}

fn get_raster_type_from_file(file_name: &str) -> RasterType {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    match extension.as_str() {
        "sdat" | "sgrd" => RasterType::SagaBinary,
        "asc" | "txt" => RasterType::ArcAscii,
        _ => RasterType::Unknown,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn small_configs() -> RasterConfigs {
        RasterConfigs {
            rows: 3,
            columns: 4,
            north: 30.0,
            south: 0.0,
            east: 40.0,
            west: 0.0,
            resolution_x: 10.0,
            resolution_y: 10.0,
            nodata: -9999.0,
            data_type: DataType::F32,
            ..Default::default()
        }
    }

    #[test]
    fn test_raster_type_from_extension() {
        assert_eq!(get_raster_type_from_file("dem.sgrd"), RasterType::SagaBinary);
        assert_eq!(get_raster_type_from_file("dem.SDAT"), RasterType::SagaBinary);
        assert_eq!(get_raster_type_from_file("dem.asc"), RasterType::ArcAscii);
        assert_eq!(get_raster_type_from_file("dem.tif"), RasterType::Unknown);
        assert_eq!(get_raster_type_from_file("dem"), RasterType::Unknown);
    }

    #[test]
    fn test_indexing_outside_grid() {
        let mut r = Raster::initialize_using_config("a.sgrd", &small_configs());
        r.set_value(1, 1, 5.0);
        assert_eq!(r[(1, 1)], 5.0);
        assert_eq!(r[(-1, 0)], -9999.0);
        assert_eq!(r.get_value(3, 0), -9999.0);
        r.increment(2, 2, 1.5);
        r.increment(2, 2, 1.5);
        assert_eq!(r.get_value(2, 2), 3.0);
    }

    #[test]
    fn test_cell_centre_coordinates() {
        let r = Raster::initialize_using_config("a.sgrd", &small_configs());
        assert_eq!(r.get_x_from_column(0), 5.0);
        assert_eq!(r.get_y_from_row(0), 25.0);
        assert_eq!(r.get_y_from_row(2), 5.0);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("missing.sgrd");
        let err = Raster::new(f.to_str().unwrap(), "r").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_geographic_guess() {
        let mut c = small_configs();
        c.xy_units = "degree".to_string();
        let r = Raster::initialize_using_config("a.sgrd", &c);
        assert!(r.is_in_geographic_coordinates());
        let r = Raster::initialize_using_config("a.sgrd", &small_configs());
        assert!(!r.is_in_geographic_coordinates());
    }
}
