use super::*;
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter, Error, ErrorKind};

fn parse_value<T: std::str::FromStr>(file_name: &str, token: &str) -> Result<T, Error> {
    token.trim().parse::<T>().map_err(|_| {
        Error::new(
            ErrorKind::InvalidData,
            format!("Invalid value '{}' in ASCII grid {}.", token.trim(), file_name),
        )
    })
}

pub fn read_arcascii(file_name: &str, configs: &mut RasterConfigs, data: &mut Vec<f64>) -> Result<(), Error> {
    let f = File::open(file_name)?;
    let f = BufReader::new(f);

    let mut xllcenter = f64::NEG_INFINITY;
    let mut yllcenter = f64::NEG_INFINITY;
    let mut xllcorner = f64::NEG_INFINITY;
    let mut yllcorner = f64::NEG_INFINITY;
    configs.nodata = -9999.0;
    configs.data_type = DataType::F32;
    data.clear();
    for line in f.lines() {
        let line = line?;
        let vec = line.split_whitespace().collect::<Vec<&str>>();
        if vec.is_empty() {
            continue;
        }
        let key = vec[0].to_lowercase();
        if vec.len() == 2 && key.chars().next().map_or(false, |c| c.is_alphabetic()) {
            match key.as_str() {
                "nrows" => configs.rows = parse_value(file_name, vec[1])?,
                "ncols" => configs.columns = parse_value(file_name, vec[1])?,
                "xllcorner" => xllcorner = parse_value(file_name, vec[1])?,
                "yllcorner" => yllcorner = parse_value(file_name, vec[1])?,
                "xllcenter" => xllcenter = parse_value(file_name, vec[1])?,
                "yllcenter" => yllcenter = parse_value(file_name, vec[1])?,
                "cellsize" => {
                    configs.resolution_x = parse_value(file_name, vec[1])?;
                    configs.resolution_y = configs.resolution_x;
                }
                "nodata_value" => configs.nodata = parse_value(file_name, vec[1])?,
                _ => {}
            }
        } else {
            for val in vec {
                data.push(parse_value(file_name, val)?);
            }
        }
    }

    if xllcorner != f64::NEG_INFINITY && yllcorner != f64::NEG_INFINITY {
        configs.west = xllcorner;
        configs.south = yllcorner;
    } else if xllcenter != f64::NEG_INFINITY && yllcenter != f64::NEG_INFINITY {
        configs.west = xllcenter - 0.5 * configs.resolution_x;
        configs.south = yllcenter - 0.5 * configs.resolution_y;
    } else {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!("ASCII grid {} has no lower-left coordinate.", file_name),
        ));
    }
    configs.east = configs.west + configs.columns as f64 * configs.resolution_x;
    configs.north = configs.south + configs.rows as f64 * configs.resolution_y;

    Ok(())
}

pub fn write_arcascii(r: &mut Raster) -> Result<(), Error> {
    let f = File::create(&r.file_name)?;
    let mut writer = BufWriter::new(f);

    writer.write_all(format!("NCOLS {}\n", r.configs.columns).as_bytes())?;
    writer.write_all(format!("NROWS {}\n", r.configs.rows).as_bytes())?;
    writer.write_all(format!("XLLCORNER {}\n", r.configs.west).as_bytes())?;
    writer.write_all(format!("YLLCORNER {}\n", r.configs.south).as_bytes())?;
    writer.write_all(
        format!("CELLSIZE {}\n", (r.configs.resolution_x + r.configs.resolution_y) / 2.0).as_bytes(),
    )?;
    writer.write_all(format!("NODATA_VALUE {}\n", r.configs.nodata).as_bytes())?;

    for row in 0..r.configs.rows as isize {
        let line = r
            .get_row_data(row)
            .iter()
            .map(|v| {
                if r.configs.data_type.is_float() {
                    format!("{}", v)
                } else {
                    format!("{}", v.round())
                }
            })
            .collect::<Vec<String>>()
            .join(" ");
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_read_centre_registered_grid() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("dem.asc");
        std::fs::write(
            &f,
            "ncols 3\nnrows 2\nxllcenter 0.5\nyllcenter 10.5\ncellsize 1\nNODATA_value -1\n1 2 3\n4 -1 6\n",
        )
        .unwrap();
        let r = Raster::new(f.to_str().unwrap(), "r").unwrap();
        assert_eq!(r.configs.columns, 3);
        assert_eq!(r.configs.west, 0.0);
        assert_eq!(r.configs.north, 12.0);
        assert_eq!(r.get_value(1, 2), 6.0);
        assert_eq!(r.get_value(1, 1), r.configs.nodata);
        assert_eq!(r.configs.minimum, 1.0);
    }

    #[test]
    fn test_write_corner_registered_grid() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("out.asc");
        let configs = RasterConfigs {
            rows: 1,
            columns: 2,
            north: 1.0,
            south: 0.0,
            east: 2.0,
            west: 0.0,
            resolution_x: 1.0,
            resolution_y: 1.0,
            nodata: -9999.0,
            data_type: DataType::I32,
            ..Default::default()
        };
        let mut r = Raster::initialize_using_config(f.to_str().unwrap(), &configs);
        r.set_row_data(0, vec![1.4, 2.6]);
        r.write().unwrap();
        let text = std::fs::read_to_string(&f).unwrap();
        assert!(text.contains("XLLCORNER 0\n"));
        assert!(text.ends_with("1 3\n"));
    }

    #[test]
    fn test_missing_origin_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("bad.asc");
        std::fs::write(&f, "ncols 1\nnrows 1\ncellsize 1\n5\n").unwrap();
        assert!(Raster::new(f.to_str().unwrap(), "r").is_err());
    }
}
