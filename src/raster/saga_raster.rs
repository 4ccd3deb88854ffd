use super::*;
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter, Cursor, Error, ErrorKind, SeekFrom};
use std::path::Path;

/// The `.sgrd` header belonging to a SAGA grid given by either of its files.
pub fn saga_header_file(file_name: &str) -> String {
    Path::new(file_name)
        .with_extension("sgrd")
        .to_string_lossy()
        .to_string()
}

/// The `.sdat` data file belonging to a SAGA grid given by either of its files.
pub fn saga_data_file(file_name: &str) -> String {
    Path::new(file_name)
        .with_extension("sdat")
        .to_string_lossy()
        .to_string()
}

fn parse_header_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value.trim().parse::<T>().map_err(|_| {
        Error::new(
            ErrorKind::InvalidData,
            format!("Invalid value '{}' for SAGA header entry {}.", value.trim(), key),
        )
    })
}

pub fn read_saga(file_name: &str, configs: &mut RasterConfigs, data: &mut Vec<f64>) -> Result<(), Error> {
    // read the header file
    let f = File::open(saga_header_file(file_name))?;
    let f = BufReader::new(f);
    let mut data_file_offset = 0u64;
    let mut top_to_bottom = false;
    let mut z_factor = 1.0;
    let mut xmin = f64::NAN;
    let mut ymin = f64::NAN;
    for line in f.lines() {
        let line = line?;
        let (key, value) = match line.split_once('=') {
            Some((k, v)) => (k.trim().to_lowercase(), v.trim().to_string()),
            None => continue,
        };
        match key.as_str() {
            "name" => configs.title = value,
            "description" => {
                if !value.is_empty() {
                    configs.metadata.push(value);
                }
            }
            "unit" => {
                if !value.is_empty() {
                    configs.z_units = value;
                }
            }
            "datafile_offset" => data_file_offset = parse_header_value(&key, &value)?,
            "dataformat" => {
                configs.data_type = match value.to_lowercase().as_str() {
                    "byte_unsigned" => DataType::U8,
                    "byte" => DataType::I8,
                    "shortint_unsigned" => DataType::U16,
                    "shortint" => DataType::I16,
                    "integer_unsigned" => DataType::U32,
                    "integer" => DataType::I32,
                    "float" => DataType::F32,
                    "double" => DataType::F64,
                    _ => {
                        return Err(Error::new(
                            ErrorKind::InvalidData,
                            format!("Reading of SAGA DATAFORMAT {} is not supported.", value),
                        ))
                    }
                }
            }
            "byteorder_big" => {
                configs.endian = if value.to_lowercase().starts_with('t') {
                    Endianness::BigEndian
                } else {
                    Endianness::LittleEndian
                };
            }
            "position_xmin" => xmin = parse_header_value(&key, &value)?,
            "position_ymin" => ymin = parse_header_value(&key, &value)?,
            "cellcount_x" => configs.columns = parse_header_value(&key, &value)?,
            "cellcount_y" => configs.rows = parse_header_value(&key, &value)?,
            "cellsize" => {
                configs.resolution_x = parse_header_value(&key, &value)?;
                configs.resolution_y = configs.resolution_x;
            }
            "z_factor" => z_factor = parse_header_value(&key, &value)?,
            "nodata_value" => {
                // newer headers may give a range, `a;b`
                let v = value.split(';').next().unwrap_or("");
                configs.nodata = parse_header_value(&key, v)?;
            }
            "toptobottom" => top_to_bottom = value.to_lowercase().starts_with('t'),
            _ => {}
        }
    }

    if configs.data_type == DataType::Unknown
        || configs.rows == 0
        || configs.columns == 0
        || !configs.resolution_x.is_finite()
        || xmin.is_nan()
        || ymin.is_nan()
    {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!("Incomplete SAGA grid header for {}.", file_name),
        ));
    }

    // POSITION_XMIN/YMIN locate the centre of the lower-left cell
    configs.west = xmin - configs.resolution_x / 2.0;
    configs.south = ymin - configs.resolution_y / 2.0;
    configs.north = configs.south + configs.resolution_y * configs.rows as f64;
    configs.east = configs.west + configs.resolution_x * configs.columns as f64;

    // read the data file
    let mut f = File::open(saga_data_file(file_name))?;
    f.seek(SeekFrom::Start(data_file_offset))?;
    let num_cells = configs.rows * configs.columns;
    let mut buffer = vec![0u8; num_cells * configs.data_type.get_data_size()];
    f.read_exact(&mut buffer)?;

    data.clear();
    data.reserve(num_cells);
    let mut cursor = Cursor::new(buffer);
    match configs.endian {
        Endianness::LittleEndian => read_values::<LittleEndian>(&mut cursor, configs.data_type, num_cells, data)?,
        Endianness::BigEndian => read_values::<BigEndian>(&mut cursor, configs.data_type, num_cells, data)?,
    }

    let nodata = configs.nodata;
    if z_factor != 1.0 {
        for v in data.iter_mut().filter(|v| **v != nodata) {
            *v *= z_factor;
        }
    }

    if !top_to_bottom {
        // on disk the first row is the southern one
        let columns = configs.columns;
        let rows: Vec<Vec<f64>> = data.chunks(columns).rev().map(|r| r.to_vec()).collect();
        *data = rows.concat();
    }

    Ok(())
}

fn read_values<B: ByteOrder>(
    cursor: &mut Cursor<Vec<u8>>,
    data_type: DataType,
    num_cells: usize,
    data: &mut Vec<f64>,
) -> Result<(), Error> {
    for _ in 0..num_cells {
        let v = match data_type {
            DataType::F64 => cursor.read_f64::<B>()?,
            DataType::F32 => cursor.read_f32::<B>()? as f64,
            DataType::I32 => cursor.read_i32::<B>()? as f64,
            DataType::U32 => cursor.read_u32::<B>()? as f64,
            DataType::I16 => cursor.read_i16::<B>()? as f64,
            DataType::U16 => cursor.read_u16::<B>()? as f64,
            DataType::I8 => cursor.read_i8()? as f64,
            DataType::U8 => cursor.read_u8()? as f64,
            DataType::Unknown => {
                return Err(Error::new(ErrorKind::InvalidData, "Raster data type is unknown."))
            }
        };
        data.push(v);
    }
    Ok(())
}

pub fn write_saga(r: &mut Raster) -> Result<(), Error> {
    let data_format = match r.configs.data_type {
        DataType::F64 => "DOUBLE",
        DataType::F32 => "FLOAT",
        DataType::I32 => "INTEGER",
        DataType::U32 => "INTEGER_UNSIGNED",
        DataType::I16 => "SHORTINT",
        DataType::U16 => "SHORTINT_UNSIGNED",
        DataType::U8 => "BYTE_UNSIGNED",
        DataType::I8 => "BYTE",
        DataType::Unknown => {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("Raster data type of {} is not set.", r.file_name),
            ))
        }
    };

    // Save the header file
    let header_file = saga_header_file(&r.file_name);
    let f = File::create(&header_file)?;
    let mut writer = BufWriter::new(f);

    let short_name = Path::new(&header_file)
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string();
    writer.write_all(format!("NAME\t= {}\n", short_name).as_bytes())?;
    writer.write_all(format!("DESCRIPTION\t= {}\n", r.configs.metadata.join("; ")).as_bytes())?;
    if r.configs.z_units != "not specified" {
        writer.write_all(format!("UNIT\t= {}\n", r.configs.z_units).as_bytes())?;
    } else {
        writer.write_all("UNIT\t=\n".as_bytes())?;
    }
    writer.write_all("DATAFILE_OFFSET\t= 0\n".as_bytes())?;
    writer.write_all(format!("DATAFORMAT\t= {}\n", data_format).as_bytes())?;
    if r.configs.endian == Endianness::LittleEndian {
        writer.write_all("BYTEORDER_BIG\t= FALSE\n".as_bytes())?;
    } else {
        writer.write_all("BYTEORDER_BIG\t= TRUE\n".as_bytes())?;
    }
    writer.write_all(
        format!("POSITION_XMIN\t= {}\n", r.configs.west + r.configs.resolution_x / 2.0).as_bytes(),
    )?;
    writer.write_all(
        format!("POSITION_YMIN\t= {}\n", r.configs.south + r.configs.resolution_y / 2.0).as_bytes(),
    )?;
    writer.write_all(format!("CELLCOUNT_X\t= {}\n", r.configs.columns).as_bytes())?;
    writer.write_all(format!("CELLCOUNT_Y\t= {}\n", r.configs.rows).as_bytes())?;
    writer.write_all(
        format!("CELLSIZE\t= {}\n", (r.configs.resolution_x + r.configs.resolution_y) / 2.0).as_bytes(),
    )?;
    writer.write_all("Z_FACTOR\t= 1.000000\n".as_bytes())?;
    writer.write_all(format!("NODATA_VALUE\t= {}\n", r.configs.nodata).as_bytes())?;
    writer.write_all("TOPTOBOTTOM\t= FALSE\n".as_bytes())?;
    writer.flush()?;

    // write the data file, southern row first
    let f = File::create(saga_data_file(&r.file_name))?;
    let mut writer = BufWriter::new(f);
    match r.configs.endian {
        Endianness::LittleEndian => write_values::<LittleEndian, _>(&mut writer, r)?,
        Endianness::BigEndian => write_values::<BigEndian, _>(&mut writer, r)?,
    }
    writer.flush()?;

    Ok(())
}

fn write_values<B: ByteOrder, W: Write>(writer: &mut W, r: &Raster) -> Result<(), Error> {
    for row in (0..r.configs.rows as isize).rev() {
        for v in r.get_row_data(row) {
            match r.configs.data_type {
                DataType::F64 => writer.write_f64::<B>(v)?,
                DataType::F32 => writer.write_f32::<B>(v as f32)?,
                DataType::I32 => writer.write_i32::<B>(v.round() as i32)?,
                DataType::U32 => writer.write_u32::<B>(v.round() as u32)?,
                DataType::I16 => writer.write_i16::<B>(v.round() as i16)?,
                DataType::U16 => writer.write_u16::<B>(v.round() as u16)?,
                DataType::I8 => writer.write_i8(v.round() as i8)?,
                DataType::U8 => writer.write_u8(v.round() as u8)?,
                DataType::Unknown => {
                    return Err(Error::new(ErrorKind::InvalidInput, "Raster data type is unknown."))
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn ramp(file_name: &str, data_type: DataType, endian: Endianness) -> Raster {
        let configs = RasterConfigs {
            rows: 3,
            columns: 2,
            north: 130.0,
            south: 100.0,
            east: 20.0,
            west: 0.0,
            resolution_x: 10.0,
            resolution_y: 10.0,
            nodata: -9999.0,
            data_type,
            endian,
            ..Default::default()
        };
        let mut r = Raster::initialize_using_config(file_name, &configs);
        for row in 0..3isize {
            for col in 0..2isize {
                r.set_value(row, col, (row * 2 + col) as f64);
            }
        }
        r.set_value(2, 1, -9999.0);
        r
    }

    #[test]
    fn test_header_positions_are_cell_centres() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("ramp.sgrd");
        let mut r = ramp(f.to_str().unwrap(), DataType::F32, Endianness::LittleEndian);
        r.write().unwrap();
        let header = std::fs::read_to_string(&f).unwrap();
        assert!(header.contains("POSITION_XMIN\t= 5\n"));
        assert!(header.contains("POSITION_YMIN\t= 105\n"));
        assert!(header.contains("DATAFORMAT\t= FLOAT\n"));
        assert!(header.contains("TOPTOBOTTOM\t= FALSE\n"));
        // southern row (row index 2) is written first
        let bytes = std::fs::read(dir.path().join("ramp.sdat")).unwrap();
        assert_eq!(bytes.len(), 6 * 4);
        assert_eq!(LittleEndian::read_f32(&bytes[0..4]), 4.0);
    }

    #[test]
    fn test_written_grid_is_read_back_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("ramp.sgrd");
        let mut r = ramp(f.to_str().unwrap(), DataType::I16, Endianness::BigEndian);
        r.write().unwrap();
        // either file of the pair opens the grid
        let sdat = dir.path().join("ramp.sdat");
        let input = Raster::new(sdat.to_str().unwrap(), "r").unwrap();
        assert_eq!(input.configs.rows, 3);
        assert_eq!(input.configs.columns, 2);
        assert_eq!(input.configs.data_type, DataType::I16);
        assert_eq!(input.configs.endian, Endianness::BigEndian);
        assert_eq!(input.configs.west, 0.0);
        assert_eq!(input.configs.north, 130.0);
        assert_eq!(input.get_value(0, 1), 1.0);
        assert_eq!(input.get_value(2, 0), 4.0);
        assert_eq!(input.get_value(2, 1), -9999.0);
        assert_eq!(input.configs.maximum, 4.0);
    }

    #[test]
    fn test_top_to_bottom_and_z_factor() {
        let dir = tempfile::tempdir().unwrap();
        let hdr = dir.path().join("t.sgrd");
        std::fs::write(
            &hdr,
            "NAME\t= t\nDATAFILE_OFFSET\t= 2\nDATAFORMAT\t= BYTE_UNSIGNED\nBYTEORDER_BIG\t= FALSE\n\
             POSITION_XMIN\t= 0.5\nPOSITION_YMIN\t= 0.5\nCELLCOUNT_X\t= 2\nCELLCOUNT_Y\t= 2\n\
             CELLSIZE\t= 1\nZ_FACTOR\t= 2.0\nNODATA_VALUE\t= 255.0;255.0\nTOPTOBOTTOM\t= TRUE\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("t.sdat"), [0u8, 0, 1, 2, 3, 255]).unwrap();
        let r = Raster::new(hdr.to_str().unwrap(), "r").unwrap();
        assert_eq!(r.get_value(0, 0), 2.0);
        assert_eq!(r.get_value(0, 1), 4.0);
        assert_eq!(r.get_value(1, 0), 6.0);
        assert_eq!(r.get_value(1, 1), 255.0);
        assert_eq!(r.configs.west, 0.0);
    }

    #[test]
    fn test_truncated_data_file() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("ramp.sgrd");
        let mut r = ramp(f.to_str().unwrap(), DataType::F64, Endianness::LittleEndian);
        r.write().unwrap();
        std::fs::write(dir.path().join("ramp.sdat"), [0u8; 10]).unwrap();
        assert!(Raster::new(f.to_str().unwrap(), "r").is_err());
    }
}
