//! Dataset records and the small tabular types shared by the data and model crates.

use serde::{Deserialize, Serialize};

use crate::errors::{DataError, GgResult};

/// Canonical column names, in file order. The raw CSV headers are replaced
/// positionally by these on load.
pub const CANONICAL_COLUMNS: [&str; 13] = [
    "Year",
    "Make",
    "Model",
    "Vehicle_Class",
    "Engine_Size_L",
    "Cylinders",
    "Transmission",
    "Fuel_Type",
    "Fuel_City_L_100km",
    "Fuel_Hwy_L_100km",
    "Fuel_Comb_L_100km",
    "Fuel_Comb_mpg",
    "CO2_Emissions_g_km",
];

/// Numeric model inputs.
pub const NUMERIC_FEATURES: [&str; 3] = ["Engine_Size_L", "Cylinders", "Fuel_Comb_L_100km"];

/// Categorical model inputs.
pub const CATEGORICAL_FEATURES: [&str; 3] = ["Vehicle_Class", "Transmission", "Fuel_Type"];

/// Regression target.
pub const TARGET_COLUMN: &str = "CO2_Emissions_g_km";

/// One row of the fuel consumption dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Make")]
    pub make: String,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "Vehicle_Class")]
    pub vehicle_class: String,
    #[serde(rename = "Engine_Size_L")]
    pub engine_size_l: f64,
    #[serde(rename = "Cylinders")]
    pub cylinders: f64,
    #[serde(rename = "Transmission")]
    pub transmission: String,
    #[serde(rename = "Fuel_Type")]
    pub fuel_type: String,
    #[serde(rename = "Fuel_City_L_100km")]
    pub fuel_city_l_100km: f64,
    #[serde(rename = "Fuel_Hwy_L_100km")]
    pub fuel_hwy_l_100km: f64,
    #[serde(rename = "Fuel_Comb_L_100km")]
    pub fuel_comb_l_100km: f64,
    #[serde(rename = "Fuel_Comb_mpg")]
    pub fuel_comb_mpg: f64,
    #[serde(rename = "CO2_Emissions_g_km")]
    pub co2_emissions_g_km: f64,
}

/// Values held by a single named column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self, indices: &[usize]) -> Self {
        match self {
            Self::Numeric(v) => Self::Numeric(indices.iter().map(|&i| v[i]).collect()),
            Self::Categorical(v) => {
                Self::Categorical(indices.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

/// Column-oriented table with equal-length named columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    columns: Vec<Column>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. All columns must have the same number of rows.
    pub fn push_column(&mut self, name: impl Into<String>, data: ColumnData) -> GgResult<()> {
        let name = name.into();
        if let Some(first) = self.columns.first() {
            let expected = first.data.len();
            if data.len() != expected {
                return Err(DataError::LengthMismatch {
                    column: name,
                    expected,
                    actual: data.len(),
                }
                .into());
            }
        }
        self.columns.push(Column { name, data });
        Ok(())
    }

    pub fn with_numeric(mut self, name: impl Into<String>, values: Vec<f64>) -> GgResult<Self> {
        self.push_column(name, ColumnData::Numeric(values))?;
        Ok(self)
    }

    pub fn with_categorical(
        mut self,
        name: impl Into<String>,
        values: Vec<String>,
    ) -> GgResult<Self> {
        self.push_column(name, ColumnData::Categorical(values))?;
        Ok(self)
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> GgResult<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                DataError::ColumnNotFound {
                    column: name.to_string(),
                }
                .into()
            })
    }

    pub fn numeric(&self, name: &str) -> GgResult<&[f64]> {
        match &self.column(name)?.data {
            ColumnData::Numeric(v) => Ok(v),
            ColumnData::Categorical(_) => Err(DataError::InvalidFormat {
                message: format!("column {name} is categorical, expected numeric"),
            }
            .into()),
        }
    }

    pub fn categorical(&self, name: &str) -> GgResult<&[String]> {
        match &self.column(name)?.data {
            ColumnData::Categorical(v) => Ok(v),
            ColumnData::Numeric(_) => Err(DataError::InvalidFormat {
                message: format!("column {name} is numeric, expected categorical"),
            }
            .into()),
        }
    }

    /// New frame holding the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    data: c.data.take(indices),
                })
                .collect(),
        }
    }
}

/// Dense row-major numeric matrix produced by preprocessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl FeatureMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> GgResult<Self> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(DataError::LengthMismatch {
                    column: format!("row {i}"),
                    expected: cols,
                    actual: row.len(),
                }
                .into());
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Self {
            rows: indices.len(),
            cols: self.cols,
            data,
        }
    }
}
