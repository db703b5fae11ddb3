use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Write};
use std::path::Path;

use crate::error::Result;
use crate::viewsheet::Viewsheet;

pub fn save_viewsheet(viewsheet: &Viewsheet, path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path)?;
    write_viewsheet(viewsheet, file)
}

pub fn load_viewsheet(path: impl AsRef<Path>) -> Result<Viewsheet> {
    let file = File::open(path)?;
    read_viewsheet(file)
}

/// Serialize a viewsheet to a gzip compressed buffer
pub fn serialize_to_memory(viewsheet: &Viewsheet) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_viewsheet(viewsheet, &mut buffer)?;
    Ok(buffer)
}

pub fn deserialize_from_memory(buffer: &[u8]) -> Result<Viewsheet> {
    read_viewsheet(Cursor::new(buffer))
}

fn write_viewsheet(viewsheet: &Viewsheet, sink: impl Write) -> Result<()> {
    let encoder = GzEncoder::new(sink, Compression::default());
    let mut writer = BufWriter::new(encoder);

    serialize_into(&mut writer, viewsheet)?;

    let encoder = writer.into_inner().map_err(|e| e.into_error())?;
    encoder.finish()?;
    Ok(())
}

fn read_viewsheet(source: impl std::io::Read) -> Result<Viewsheet> {
    let decoder = GzDecoder::new(source);
    let mut reader = BufReader::new(decoder);

    Ok(deserialize_from(&mut reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{Assembly, AssemblyKind, ColumnRef};
    use crate::format::DynamicColor;
    use crate::viewsheet::{ColumnDef, DataType, TableSchema};
    use chrono::NaiveDate;

    fn sample() -> Viewsheet {
        let mut vs = Viewsheet::new("Sales");
        vs.add_table(TableSchema {
            name: "Orders".to_string(),
            columns: vec![ColumnDef {
                name: "OrderDate".to_string(),
                data_type: DataType::Date,
            }],
        });

        let mut calendar = Assembly::create(AssemblyKind::Calendar, "Calendar1");
        if let Assembly::Calendar(info) = &mut calendar {
            info.dates = vec![NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()];
            info.info.binding.table = Some("Orders".to_string());
            info.info.binding.dimensions = vec![ColumnRef::new("OrderDate")];
            info.info.format.background = DynamicColor::from_expression("=$(bg)");
        }
        vs.add_assembly(calendar).unwrap();
        vs.add_assembly(Assembly::create(AssemblyKind::Chart, "Chart1"))
            .unwrap();
        vs
    }

    #[test]
    fn memory_round_trip() {
        let vs = sample();
        let bytes = serialize_to_memory(&vs).unwrap();
        assert_eq!(deserialize_from_memory(&bytes).unwrap(), vs);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.bin.gz");
        let vs = sample();

        save_viewsheet(&vs, &path).unwrap();
        assert_eq!(load_viewsheet(&path).unwrap(), vs);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(deserialize_from_memory(b"not a viewsheet").is_err());
    }
}
