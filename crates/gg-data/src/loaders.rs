use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use gg_types::{DataError, GgResult, VehicleRecord, CANONICAL_COLUMNS};

/// Default location of the fuel consumption dataset, relative to the working directory.
pub const DEFAULT_DATA_PATH: &str = "data/Fuel_Consumption_2000-2022.csv";

/// CSV loader for the fuel consumption dataset
#[derive(Debug, Clone)]
pub struct VehicleLoader {
    delimiter: u8,
}

impl VehicleLoader {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Load all rows of a CSV file, renaming its 13 columns positionally to
    /// the canonical names. Rows that fail to parse are skipped.
    pub fn load_csv_file<P: AsRef<Path>>(&self, file_path: P) -> GgResult<Vec<VehicleRecord>> {
        let path = file_path.as_ref();
        tracing::info!("Loading vehicle data from: {}", path.display());

        if !path.exists() {
            return Err(DataError::SourceNotFound(path.display().to_string()).into());
        }

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .trim(Trim::All)
            .from_path(path)
            .map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to open CSV file {}: {}", path.display(), e),
            })?;

        let headers = rdr
            .headers()
            .map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to read CSV headers: {}", e),
            })?
            .clone();

        if headers.len() != CANONICAL_COLUMNS.len() {
            return Err(DataError::InvalidFormat {
                message: format!(
                    "expected {} columns, found {} in {}",
                    CANONICAL_COLUMNS.len(),
                    headers.len(),
                    path.display()
                ),
            }
            .into());
        }

        tracing::debug!("CSV headers: {:?}", headers);
        rdr.set_headers(StringRecord::from(CANONICAL_COLUMNS.to_vec()));

        let mut records = Vec::new();
        for (line_num, result) in rdr.deserialize::<VehicleRecord>().enumerate() {
            match result {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping invalid record at line {}: {}", line_num + 2, e);
                    continue;
                }
            }
        }

        if records.is_empty() {
            return Err(DataError::InsufficientData {
                message: format!("no valid rows in {}", path.display()),
            }
            .into());
        }

        tracing::info!("Loaded {} vehicle records", records.len());
        Ok(records)
    }
}

impl Default for VehicleLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Load the dataset with the default loader settings.
pub fn load_data<P: AsRef<Path>>(path: P) -> GgResult<Vec<VehicleRecord>> {
    VehicleLoader::new().load_csv_file(path)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use gg_types::GgError;
    use std::io::Write;

    pub(crate) const RAW_HEADER: &str = "YEAR,MAKE,MODEL,VEHICLE CLASS,ENGINE SIZE,CYLINDERS,TRANSMISSION,FUEL,FUEL CONSUMPTION,HWY (L/100 km),COMB (L/100 km),COMB (mpg),EMISSIONS";

    pub(crate) fn write_csv(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{RAW_HEADER}").unwrap();
        write!(file, "{body}").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn renames_columns_positionally() {
        let file = write_csv(
            "2000,ACURA,1.6EL,COMPACT,1.6,4,A4,X,9.2,6.7,8.1,35,186\n\
             2000,ACURA,3.2TL,MID-SIZE,3.2,6,AS5,Z,12.2,7.4,10,28,230\n",
        );

        let records = load_data(file.path()).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.year, 2000);
        assert_eq!(first.make, "ACURA");
        assert_eq!(first.vehicle_class, "COMPACT");
        assert_eq!(first.engine_size_l, 1.6);
        assert_eq!(first.cylinders, 4.0);
        assert_eq!(first.fuel_type, "X");
        assert_eq!(first.fuel_comb_l_100km, 8.1);
        assert_eq!(first.co2_emissions_g_km, 186.0);
        assert_eq!(records[1].transmission, "AS5");
    }

    #[test]
    fn skips_unparseable_rows() {
        let file = write_csv(
            "2000,ACURA,1.6EL,COMPACT,1.6,4,A4,X,9.2,6.7,8.1,35,186\n\
             2000,ACURA,BROKEN,COMPACT,n/a,4,A4,X,9.2,6.7,8.1,35,186\n",
        );

        let records = load_data(file.path()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn rejects_wrong_column_count() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a,b,c").unwrap();
        writeln!(file, "1,2,3").unwrap();
        file.flush().unwrap();

        match load_data(file.path()) {
            Err(GgError::Data(DataError::InvalidFormat { message })) => {
                assert!(message.contains("expected 13 columns"));
            }
            other => panic!("expected invalid format, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_source_not_found() {
        let result = load_data("/nonexistent/fuel.csv");
        assert!(matches!(
            result,
            Err(GgError::Data(DataError::SourceNotFound(_)))
        ));
    }
}
